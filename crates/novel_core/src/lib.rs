//! Novel core: pure domain types and job state machines.
mod job;
mod novel;
mod pagination;
mod priority;

pub use job::{JobKind, JobOutcome, JobStatus};
pub use novel::{
    same_novel, ChapterId, ChapterInfo, ChapterListInfo, NovelId, NovelInfo, NovelRef, SearchHit,
};
pub use pagination::{advance, ChapterListInput, ChapterListState, PageRequest};
pub use priority::{compare_jobs, reorder, Prioritized, SchedulingHints};
