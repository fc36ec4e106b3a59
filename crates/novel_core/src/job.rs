use std::fmt;

/// Kind of background job. The derived order is the scheduling priority:
/// novel info runs before chapter lists, which run before chapter content.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum JobKind {
    NovelInfo,
    ChapterList,
    ChapterContent,
}

impl fmt::Display for JobKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobKind::NovelInfo => write!(f, "novel-info"),
            JobKind::ChapterList => write!(f, "chapter-list"),
            JobKind::ChapterContent => write!(f, "chapter-content"),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobStatus {
    Pending,
    /// Number of steps already executed.
    Running(u32),
    Done,
}

impl JobStatus {
    pub fn is_done(self) -> bool {
        self == JobStatus::Done
    }

    /// Status after one more step ran; `finished` says whether that step completed the job.
    pub fn after_step(self, finished: bool) -> JobStatus {
        if finished {
            return JobStatus::Done;
        }
        match self {
            JobStatus::Pending => JobStatus::Running(1),
            JobStatus::Running(steps) => JobStatus::Running(steps + 1),
            JobStatus::Done => JobStatus::Done,
        }
    }
}

/// How a finished job ended, as reported to the repository.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobOutcome {
    Completed,
    /// Upstream returned nothing usable; no retry is attempted.
    NoData,
}
