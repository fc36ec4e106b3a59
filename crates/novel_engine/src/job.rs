use std::sync::Arc;

use engine_logging::{engine_debug, engine_warn};
use novel_core::{
    advance, ChapterInfo, ChapterListInput, ChapterListState, JobKind, JobOutcome, JobStatus,
    NovelId, NovelRef, PageRequest, Prioritized,
};

use crate::crawler::SourceCrawler;
use crate::markdown::Converter;
use crate::repository::NovelRepository;

/// Collaborators shared by every job.
#[derive(Clone)]
pub struct JobContext {
    pub crawler: Arc<dyn SourceCrawler>,
    pub repository: Arc<dyn NovelRepository>,
    pub converter: Arc<dyn Converter>,
}

/// A background job. Each variant owns its novel's identity and its own
/// progress; nothing is shared with other jobs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NovelJob {
    /// Single step: read title, author and cover.
    NovelInfo { novel: NovelRef, status: JobStatus },
    /// One step per chapter-list page.
    ChapterList {
        novel: NovelRef,
        status: JobStatus,
        list: ChapterListState,
        outcome: JobOutcome,
    },
    /// Single step: download, extract and convert one chapter.
    Chapter {
        novel: NovelRef,
        chapter: ChapterInfo,
        status: JobStatus,
    },
}

impl NovelJob {
    pub fn novel_info(novel: NovelRef) -> Self {
        NovelJob::NovelInfo {
            novel,
            status: JobStatus::Pending,
        }
    }

    pub fn chapter_list(novel: NovelRef) -> Self {
        NovelJob::ChapterList {
            novel,
            status: JobStatus::Pending,
            list: ChapterListState::Start,
            outcome: JobOutcome::Completed,
        }
    }

    pub fn chapter(novel: NovelRef, chapter: ChapterInfo) -> Self {
        NovelJob::Chapter {
            novel,
            chapter,
            status: JobStatus::Pending,
        }
    }

    pub fn novel(&self) -> &NovelRef {
        match self {
            NovelJob::NovelInfo { novel, .. }
            | NovelJob::ChapterList { novel, .. }
            | NovelJob::Chapter { novel, .. } => novel,
        }
    }

    pub fn kind(&self) -> JobKind {
        match self {
            NovelJob::NovelInfo { .. } => JobKind::NovelInfo,
            NovelJob::ChapterList { .. } => JobKind::ChapterList,
            NovelJob::Chapter { .. } => JobKind::ChapterContent,
        }
    }

    pub fn status(&self) -> JobStatus {
        match self {
            NovelJob::NovelInfo { status, .. }
            | NovelJob::ChapterList { status, .. }
            | NovelJob::Chapter { status, .. } => *status,
        }
    }

    pub fn is_done(&self) -> bool {
        self.status().is_done()
    }

    /// Runs one step and returns the new status. A done job does nothing.
    /// Failures end the job with [`JobOutcome::NoData`]; nothing is retried.
    pub async fn execute_next_step(&mut self, ctx: &JobContext) -> JobStatus {
        if self.is_done() {
            return JobStatus::Done;
        }
        let kind = self.kind();
        let finished = match self {
            NovelJob::NovelInfo { novel, status } => {
                let outcome = fetch_novel_info(novel, ctx).await;
                *status = status.after_step(true);
                Some(outcome)
            }
            NovelJob::ChapterList {
                novel,
                status,
                list,
                outcome,
            } => {
                let step_outcome = fetch_chapter_list_step(novel, list, ctx).await;
                if step_outcome == JobOutcome::NoData {
                    *outcome = JobOutcome::NoData;
                }
                *status = status.after_step(list.is_done());
                status.is_done().then_some(*outcome)
            }
            NovelJob::Chapter {
                novel,
                chapter,
                status,
            } => {
                let outcome = download_chapter(novel, chapter, ctx).await;
                *status = status.after_step(true);
                Some(outcome)
            }
        };

        if let Some(outcome) = finished {
            engine_debug!("{} job for novel {} finished: {:?}", kind, self.novel().id, outcome);
            ctx.repository.on_job_complete(self.novel(), kind, outcome);
        }
        self.status()
    }
}

impl Prioritized for NovelJob {
    fn novel_id(&self) -> NovelId {
        self.novel().id
    }

    fn kind(&self) -> JobKind {
        NovelJob::kind(self)
    }
}

async fn fetch_novel_info(novel: &NovelRef, ctx: &JobContext) -> JobOutcome {
    match ctx.crawler.novel_info(&novel.url).await {
        Ok(info) if info.is_empty() => {
            engine_warn!("No novel info found for {}", novel.url);
            JobOutcome::NoData
        }
        Ok(info) => {
            ctx.repository.on_novel_info(novel.id, info);
            JobOutcome::Completed
        }
        Err(err) => {
            engine_warn!("Failed to read novel info for {}: {}", novel.url, err);
            JobOutcome::NoData
        }
    }
}

/// Fetches whatever the pagination state asks for next and advances it.
async fn fetch_chapter_list_step(
    novel: &NovelRef,
    list: &mut ChapterListState,
    ctx: &JobContext,
) -> JobOutcome {
    let input = match list.next_request() {
        None => return JobOutcome::Completed,
        Some(PageRequest::ListInfo) => ctx
            .crawler
            .chapter_list_info(&novel.url)
            .await
            .map(ChapterListInput::ListInfo),
        Some(PageRequest::Page(page)) => ctx
            .crawler
            .chapter_list_page(&novel.url, page)
            .await
            .map(ChapterListInput::Page),
    };

    let input = match input {
        Ok(input) => input,
        Err(err) => {
            // Later pages would be numbered wrongly without this one.
            engine_warn!("Chapter list of {} stopped: {}", novel.url, err);
            *list = ChapterListState::Done;
            return JobOutcome::NoData;
        }
    };

    let empty_list = matches!(&input, ChapterListInput::ListInfo(info) if info.total_pages == 0);
    let (next, report) = advance(list.clone(), input);
    *list = next;
    if let Some(chapters) = report {
        engine_debug!("Novel {}: {} chapters listed", novel.id, chapters.len());
        ctx.repository.on_chapter_list(novel.id, chapters);
    }
    if empty_list {
        engine_warn!("Can't get chapter list info for {}", novel.title);
        JobOutcome::NoData
    } else {
        JobOutcome::Completed
    }
}

async fn download_chapter(novel: &NovelRef, chapter: &ChapterInfo, ctx: &JobContext) -> JobOutcome {
    let extracted = match ctx.crawler.download_chapter(&chapter.url).await {
        Ok(Some(extracted)) => extracted,
        Ok(None) => {
            engine_warn!("Chapter {} of {} has no body", chapter.id, novel.title);
            return JobOutcome::NoData;
        }
        Err(err) => {
            engine_warn!("Failed to download chapter {}: {}", chapter.url, err);
            return JobOutcome::NoData;
        }
    };

    let markdown = ctx.converter.to_markdown(&extracted);
    if markdown.trim().is_empty() {
        engine_warn!("Chapter {} of {} converted to nothing", chapter.id, novel.title);
        return JobOutcome::NoData;
    }
    ctx.repository
        .on_chapter_downloaded(novel.id, chapter.id, markdown);
    JobOutcome::Completed
}
