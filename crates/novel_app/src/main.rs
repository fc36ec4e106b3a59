mod platform;

use std::path::PathBuf;

use anyhow::Context;
use clap::{Parser, Subcommand};
use engine_logging::engine_info;
use novel_core::{ChapterId, NovelId};
use novel_engine::{CodeBlockStyle, HeadingStyle, LinkReferenceStyle, LinkStyle};

use platform::commands::{self, StyleOverrides};
use platform::logging::{self, LogDestination};

/// Download web novels and store their chapters as Markdown
#[derive(Parser, Debug)]
#[command(name = "novel")]
#[command(version, about, long_about = None)]
struct Args {
    /// Where log output goes
    #[arg(long, value_enum, default_value_t = LogDestination::File, global = true)]
    log: LogDestination,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Convert an HTML file to Markdown
    Convert {
        /// HTML file to convert
        file: PathBuf,

        /// RON file with conversion options
        #[arg(long, value_name = "FILE")]
        options: Option<PathBuf>,

        /// setext or atx
        #[arg(long, value_name = "STYLE")]
        heading_style: Option<HeadingStyle>,

        /// indented or fenced
        #[arg(long, value_name = "STYLE")]
        code_block_style: Option<CodeBlockStyle>,

        /// inlined or referenced
        #[arg(long, value_name = "STYLE")]
        link_style: Option<LinkStyle>,

        /// full, collapsed or shortcut
        #[arg(long, value_name = "STYLE")]
        link_reference_style: Option<LinkReferenceStyle>,
    },

    /// Clean up the element matching SELECTOR and print it as Markdown
    Extract {
        /// HTML file to read
        file: PathBuf,

        /// CSS selector of the chapter container
        selector: String,

        /// RON source file whose filter and conversion settings apply
        #[arg(long, value_name = "FILE")]
        source: Option<PathBuf>,

        /// Print the extracted paragraphs instead of Markdown
        #[arg(long)]
        html: bool,
    },

    /// Search a source for novels
    Search {
        /// Words to search for
        query: String,

        /// RON source file (default: built-in LightNovelPub)
        #[arg(long, value_name = "FILE")]
        source: Option<PathBuf>,
    },

    /// Download a novel into OUT_DIR, skipping chapters already stored
    Crawl {
        /// Address of the novel's main page
        novel_url: String,

        /// Library directory
        out_dir: PathBuf,

        /// RON source file (default: built-in LightNovelPub)
        source: Option<PathBuf>,
    },

    /// Print a stored chapter
    Read {
        /// Library directory
        out_dir: PathBuf,

        novel_id: NovelId,

        chapter_id: ChapterId,
    },
}

fn main() -> anyhow::Result<()> {
    let args = Args::parse();
    logging::initialize(args.log);
    engine_info!("novel {} started", env!("CARGO_PKG_VERSION"));

    match args.command {
        Command::Convert {
            file,
            options,
            heading_style,
            code_block_style,
            link_style,
            link_reference_style,
        } => {
            let overrides = StyleOverrides {
                heading_style,
                code_block_style,
                link_style,
                link_reference_style,
            };
            println!("{}", commands::convert(&file, options.as_deref(), &overrides)?);
        }
        Command::Extract {
            file,
            selector,
            source,
            html,
        } => {
            println!(
                "{}",
                commands::extract(&file, &selector, source.as_deref(), html)?
            );
        }
        Command::Search { query, source } => {
            let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
            let hits = commands::search(&runtime, &query, source.as_deref())?;
            if hits.is_empty() {
                println!("No novels found for {query:?}");
            }
            for hit in hits {
                println!("{}\n  {}\n  {}", hit.title, hit.url, hit.info);
            }
        }
        Command::Crawl {
            novel_url,
            out_dir,
            source,
        } => {
            let runtime = tokio::runtime::Runtime::new().context("starting tokio runtime")?;
            let summary = commands::crawl(&runtime, &novel_url, &out_dir, source.as_deref())?;
            println!(
                "{} (novel {}): {} of {} chapters stored in {}, {} new",
                summary.novel.title,
                summary.novel.id,
                summary.stored,
                summary.listed,
                summary.directory.display(),
                summary.chapter_jobs.completed
            );
            if summary.chapter_jobs.no_data > 0 {
                println!(
                    "{} chapters could not be downloaded; run again to retry",
                    summary.chapter_jobs.no_data
                );
            }
        }
        Command::Read {
            out_dir,
            novel_id,
            chapter_id,
        } => {
            println!("{}", commands::read_chapter(&out_dir, novel_id, chapter_id)?);
        }
    }
    Ok(())
}
