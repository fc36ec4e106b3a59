//! File-backed [`NovelRepository`].
//!
//! Layout below the output directory:
//!
//! ```text
//! <out>/<novel_id>/novel.ron       metadata and chapter list
//! <out>/<novel_id>/<chapter:05>.md chapter text
//! ```

use std::collections::HashMap;
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use anyhow::Context;
use chrono::Utc;
use engine_logging::{engine_debug, engine_error, engine_info, engine_warn};
use novel_core::{ChapterId, ChapterInfo, JobKind, JobOutcome, NovelId, NovelInfo, NovelRef};
use novel_engine::{ensure_output_dir, AtomicFileWriter, NovelRepository};
use serde::{Deserialize, Serialize};

const MANIFEST_FILENAME: &str = "novel.ron";

/// Text returned for chapters that are listed but not on disk.
pub(crate) const NOT_DOWNLOADED: &str = "Isn't downloaded yet.";

/// Produces the `updated_utc` stamp written into manifests.
pub(crate) type Clock = Arc<dyn Fn() -> String + Send + Sync>;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct ManifestChapter {
    id: ChapterId,
    title: String,
    url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
struct NovelManifest {
    id: NovelId,
    url: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    author: Option<String>,
    #[serde(default)]
    cover_url: Option<String>,
    #[serde(default)]
    chapters: Vec<ManifestChapter>,
    #[serde(default)]
    updated_utc: String,
}

impl NovelManifest {
    fn new(id: NovelId, url: &str) -> Self {
        Self {
            id,
            url: url.to_string(),
            title: None,
            author: None,
            cover_url: None,
            chapters: Vec::new(),
            updated_utc: String::new(),
        }
    }

    fn novel_ref(&self) -> NovelRef {
        let title = self.title.clone().unwrap_or_else(|| self.url.clone());
        NovelRef::new(self.id, self.url.clone(), title)
    }

    /// Chapters with a known id are replaced, new ones appended; the list
    /// stays sorted by id.
    fn merge_chapters(&mut self, chapters: Vec<ChapterInfo>) {
        for chapter in chapters {
            let entry = ManifestChapter {
                id: chapter.id,
                title: chapter.title,
                url: chapter.url,
            };
            match self.chapters.iter_mut().find(|known| known.id == entry.id) {
                Some(known) => *known = entry,
                None => self.chapters.push(entry),
            }
        }
        self.chapters.sort_by_key(|chapter| chapter.id);
    }
}

/// Finished jobs of one kind, split by outcome.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub(crate) struct Tally {
    pub completed: usize,
    pub no_data: usize,
}

pub(crate) struct FileRepository {
    writer: AtomicFileWriter,
    clock: Clock,
    novels: Mutex<HashMap<NovelId, NovelManifest>>,
    tallies: Mutex<HashMap<JobKind, Tally>>,
}

impl FileRepository {
    /// Opens `root`, creating it when missing, and loads every manifest found
    /// one level below it. Unreadable manifests are skipped with a warning.
    pub(crate) fn open(root: &Path) -> anyhow::Result<Self> {
        ensure_output_dir(root)?;
        let writer = AtomicFileWriter::new(PathBuf::from(root));

        let mut novels = HashMap::new();
        let entries =
            fs::read_dir(root).with_context(|| format!("listing {}", root.display()))?;
        for entry in entries {
            let entry = entry?;
            if !entry.file_type()?.is_dir() {
                continue;
            }
            let relative = Path::new(&entry.file_name()).join(MANIFEST_FILENAME);
            if let Some(manifest) = load_manifest(&writer, &relative) {
                novels.insert(manifest.id, manifest);
            }
        }
        engine_info!("Loaded {} novels from {:?}", novels.len(), root);

        Ok(Self {
            writer,
            clock: Arc::new(|| Utc::now().to_rfc3339()),
            novels: Mutex::new(novels),
            tallies: Mutex::new(HashMap::new()),
        })
    }

    pub(crate) fn with_clock(mut self, clock: Clock) -> Self {
        self.clock = clock;
        self
    }

    fn novels(&self) -> MutexGuard<'_, HashMap<NovelId, NovelManifest>> {
        self.novels
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn tallies(&self) -> MutexGuard<'_, HashMap<JobKind, Tally>> {
        self.tallies
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// The stored novel `same_novel` matches with `url`, or a new one with the
    /// next free id.
    pub(crate) fn novel_for_url(
        &self,
        url: &str,
        same_novel: impl Fn(&str, &str) -> bool,
    ) -> anyhow::Result<NovelRef> {
        let mut novels = self.novels();
        if let Some(known) = novels.values().find(|manifest| same_novel(&manifest.url, url)) {
            engine_debug!("{} is stored as novel {}", url, known.id);
            return Ok(known.novel_ref());
        }

        let id = novels.keys().max().copied().unwrap_or(0) + 1;
        let mut manifest = NovelManifest::new(id, url);
        self.save(&mut manifest)?;
        let novel = manifest.novel_ref();
        novels.insert(id, manifest);
        engine_info!("Added novel {} for {}", id, url);
        Ok(novel)
    }

    pub(crate) fn chapters(&self, novel_id: NovelId) -> Vec<ChapterInfo> {
        self.novels()
            .get(&novel_id)
            .map(|manifest| {
                manifest
                    .chapters
                    .iter()
                    .map(|chapter| ChapterInfo {
                        id: chapter.id,
                        title: chapter.title.clone(),
                        url: chapter.url.clone(),
                    })
                    .collect()
            })
            .unwrap_or_default()
    }

    pub(crate) fn title(&self, novel_id: NovelId) -> Option<String> {
        self.novels()
            .get(&novel_id)
            .and_then(|manifest| manifest.title.clone())
    }

    pub(crate) fn has_chapter(&self, novel_id: NovelId, chapter_id: ChapterId) -> bool {
        self.writer.exists(chapter_path(novel_id, chapter_id))
    }

    /// Chapter text, or [`NOT_DOWNLOADED`] when it is not on disk.
    pub(crate) fn read_chapter(&self, novel_id: NovelId, chapter_id: ChapterId) -> String {
        match self.writer.read(chapter_path(novel_id, chapter_id)) {
            Ok(Some(text)) => text,
            Ok(None) => NOT_DOWNLOADED.to_string(),
            Err(err) => {
                engine_warn!("Failed to read chapter {} of novel {}: {}", chapter_id, novel_id, err);
                NOT_DOWNLOADED.to_string()
            }
        }
    }

    pub(crate) fn tally(&self, kind: JobKind) -> Tally {
        self.tallies().get(&kind).copied().unwrap_or_default()
    }

    fn save(&self, manifest: &mut NovelManifest) -> anyhow::Result<()> {
        manifest.updated_utc = (self.clock)();
        let pretty = ron::ser::PrettyConfig::new();
        let content = ron::ser::to_string_pretty(manifest, pretty)
            .context("serializing novel manifest")?;
        self.writer
            .write(manifest_path(manifest.id), &content)
            .with_context(|| format!("writing manifest of novel {}", manifest.id))?;
        Ok(())
    }

    /// Applies `change` to a stored manifest and saves it. Errors are logged;
    /// repository callbacks have nobody to report to.
    fn update(&self, novel_id: NovelId, change: impl FnOnce(&mut NovelManifest)) {
        let mut novels = self.novels();
        let Some(manifest) = novels.get_mut(&novel_id) else {
            engine_warn!("Update for unknown novel {} ignored", novel_id);
            return;
        };
        change(manifest);
        if let Err(err) = self.save(manifest) {
            engine_error!("Failed to save novel {}: {:#}", novel_id, err);
        }
    }
}

impl NovelRepository for FileRepository {
    fn on_novel_info(&self, novel_id: NovelId, info: NovelInfo) {
        self.update(novel_id, |manifest| {
            manifest.title = info.title.or(manifest.title.take());
            manifest.author = info.author.or(manifest.author.take());
            manifest.cover_url = info.cover_url.or(manifest.cover_url.take());
        });
    }

    fn on_chapter_list(&self, novel_id: NovelId, chapters: Vec<ChapterInfo>) {
        engine_debug!("Storing {} chapters of novel {}", chapters.len(), novel_id);
        self.update(novel_id, |manifest| manifest.merge_chapters(chapters));
    }

    fn on_chapter_downloaded(&self, novel_id: NovelId, chapter_id: ChapterId, markdown: String) {
        match self.writer.write(chapter_path(novel_id, chapter_id), &markdown) {
            Ok(path) => engine_debug!("Wrote {:?}", path),
            Err(err) => engine_error!(
                "Failed to write chapter {} of novel {}: {}",
                chapter_id,
                novel_id,
                err
            ),
        }
    }

    fn on_job_complete(&self, novel: &NovelRef, kind: JobKind, outcome: JobOutcome) {
        let mut tallies = self.tallies();
        let tally = tallies.entry(kind).or_default();
        match outcome {
            JobOutcome::Completed => tally.completed += 1,
            JobOutcome::NoData => {
                tally.no_data += 1;
                engine_warn!("{} job for {} returned no data", kind, novel.title);
            }
        }
    }
}

fn manifest_path(novel_id: NovelId) -> PathBuf {
    Path::new(&novel_id.to_string()).join(MANIFEST_FILENAME)
}

fn chapter_path(novel_id: NovelId, chapter_id: ChapterId) -> PathBuf {
    Path::new(&novel_id.to_string()).join(format!("{chapter_id:05}.md"))
}

fn load_manifest(writer: &AtomicFileWriter, relative: &Path) -> Option<NovelManifest> {
    let content = match writer.read(relative) {
        Ok(Some(text)) => text,
        Ok(None) => return None,
        Err(err) => {
            engine_warn!("Failed to read manifest {:?}: {}", relative, err);
            return None;
        }
    };
    match ron::from_str(&content) {
        Ok(manifest) => Some(manifest),
        Err(err) => {
            engine_warn!("Failed to parse manifest {:?}: {}", relative, err);
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use tempfile::TempDir;

    fn fixed_clock() -> Clock {
        Arc::new(|| "2026-01-02T03:04:05+00:00".to_string())
    }

    fn open(dir: &TempDir) -> FileRepository {
        FileRepository::open(dir.path())
            .unwrap()
            .with_clock(fixed_clock())
    }

    fn chapter(id: ChapterId) -> ChapterInfo {
        ChapterInfo {
            id,
            title: format!("Chapter {id}"),
            url: format!("https://novels.test/c/{id}"),
        }
    }

    #[test]
    fn new_novels_get_increasing_ids() {
        let dir = TempDir::new().unwrap();
        let repo = open(&dir);

        let first = repo
            .novel_for_url("https://novels.test/a", novel_core::same_novel)
            .unwrap();
        let second = repo
            .novel_for_url("https://novels.test/b", novel_core::same_novel)
            .unwrap();
        let again = repo
            .novel_for_url("https://www.novels.test/a/", novel_core::same_novel)
            .unwrap();

        assert_eq!((first.id, second.id, again.id), (1, 2, 1));
        assert!(dir.path().join("1").join("novel.ron").is_file());
    }

    #[test]
    fn chapters_are_written_with_padded_names() {
        let dir = TempDir::new().unwrap();
        let repo = open(&dir);
        let novel = repo
            .novel_for_url("https://novels.test/a", novel_core::same_novel)
            .unwrap();

        repo.on_chapter_downloaded(novel.id, 7, "# Seven".to_string());

        let path = dir.path().join("1").join("00007.md");
        assert_eq!(fs::read_to_string(path).unwrap(), "# Seven");
        assert!(repo.has_chapter(novel.id, 7));
        assert_eq!(repo.read_chapter(novel.id, 7), "# Seven");
    }

    #[test]
    fn missing_chapter_reads_as_placeholder() {
        let dir = TempDir::new().unwrap();
        let repo = open(&dir);
        assert!(!repo.has_chapter(1, 1));
        assert_eq!(repo.read_chapter(1, 1), NOT_DOWNLOADED);
    }

    #[test]
    fn manifest_survives_reopening() {
        let dir = TempDir::new().unwrap();
        {
            let repo = open(&dir);
            let novel = repo
                .novel_for_url("https://novels.test/a", novel_core::same_novel)
                .unwrap();
            repo.on_novel_info(
                novel.id,
                NovelInfo {
                    title: Some("A Novel".to_string()),
                    author: Some("Someone".to_string()),
                    cover_url: None,
                },
            );
            repo.on_chapter_list(novel.id, vec![chapter(1), chapter(2)]);
        }

        let reopened = open(&dir);
        assert_eq!(reopened.title(1).as_deref(), Some("A Novel"));
        assert_eq!(reopened.chapters(1), vec![chapter(1), chapter(2)]);

        let manifest = fs::read_to_string(dir.path().join("1").join("novel.ron")).unwrap();
        assert!(manifest.contains("2026-01-02T03:04:05+00:00"));
        assert_eq!(
            reopened
                .novel_for_url("https://novels.test/a", novel_core::same_novel)
                .unwrap()
                .title,
            "A Novel"
        );
    }

    #[test]
    fn chapter_lists_merge_by_id() {
        let dir = TempDir::new().unwrap();
        let repo = open(&dir);
        let novel = repo
            .novel_for_url("https://novels.test/a", novel_core::same_novel)
            .unwrap();

        repo.on_chapter_list(novel.id, vec![chapter(3), chapter(1)]);
        let mut renamed = chapter(1);
        renamed.title = "Prologue".to_string();
        repo.on_chapter_list(novel.id, vec![renamed.clone(), chapter(2)]);

        assert_eq!(repo.chapters(novel.id), vec![renamed, chapter(2), chapter(3)]);
    }

    #[test]
    fn partial_info_keeps_known_fields() {
        let dir = TempDir::new().unwrap();
        let repo = open(&dir);
        let novel = repo
            .novel_for_url("https://novels.test/a", novel_core::same_novel)
            .unwrap();

        repo.on_novel_info(
            novel.id,
            NovelInfo {
                title: Some("Title".to_string()),
                ..NovelInfo::default()
            },
        );
        repo.on_novel_info(
            novel.id,
            NovelInfo {
                author: Some("Author".to_string()),
                ..NovelInfo::default()
            },
        );
        assert_eq!(repo.title(novel.id).as_deref(), Some("Title"));
    }

    #[test]
    fn broken_manifest_is_skipped() {
        let dir = TempDir::new().unwrap();
        fs::create_dir(dir.path().join("9")).unwrap();
        fs::write(dir.path().join("9").join("novel.ron"), "not ron at all (").unwrap();

        let repo = open(&dir);
        let novel = repo
            .novel_for_url("https://novels.test/a", novel_core::same_novel)
            .unwrap();
        assert_eq!(novel.id, 1);
    }

    #[test]
    fn outcomes_are_tallied_per_kind() {
        let dir = TempDir::new().unwrap();
        let repo = open(&dir);
        let novel = NovelRef::new(1, "https://novels.test/a", "A");

        repo.on_job_complete(&novel, JobKind::ChapterContent, JobOutcome::Completed);
        repo.on_job_complete(&novel, JobKind::ChapterContent, JobOutcome::NoData);
        repo.on_job_complete(&novel, JobKind::ChapterContent, JobOutcome::Completed);

        assert_eq!(
            repo.tally(JobKind::ChapterContent),
            Tally {
                completed: 2,
                no_data: 1
            }
        );
        assert_eq!(repo.tally(JobKind::NovelInfo), Tally::default());
    }
}
