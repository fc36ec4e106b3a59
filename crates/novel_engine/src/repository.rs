use novel_core::{ChapterId, ChapterInfo, JobKind, JobOutcome, NovelId, NovelInfo, NovelRef};

/// Receives everything the background jobs produce.
///
/// Jobs only ever write through this trait. A callback for a novel that no
/// longer exists must be a harmless no-op.
pub trait NovelRepository: Send + Sync {
    fn on_novel_info(&self, novel_id: NovelId, info: NovelInfo);

    /// Chapters of one list page, already numbered across the whole novel.
    fn on_chapter_list(&self, novel_id: NovelId, chapters: Vec<ChapterInfo>);

    fn on_chapter_downloaded(&self, novel_id: NovelId, chapter_id: ChapterId, markdown: String);

    /// Called once per job after its last step.
    fn on_job_complete(&self, _novel: &NovelRef, _kind: JobKind, _outcome: JobOutcome) {}
}
