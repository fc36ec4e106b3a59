use std::cmp::{Ordering, Reverse};
use std::collections::{HashSet, VecDeque};

use crate::{JobKind, NovelId};

/// Anything the scheduler queue can order.
pub trait Prioritized {
    fn novel_id(&self) -> NovelId;
    fn kind(&self) -> JobKind;
}

impl Prioritized for (NovelId, JobKind) {
    fn novel_id(&self) -> NovelId {
        self.0
    }

    fn kind(&self) -> JobKind {
        self.1
    }
}

/// What the user is currently looking at. Set from the outside, only read here.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct SchedulingHints {
    pub active_novel: Option<NovelId>,
    pub active_search: HashSet<NovelId>,
}

type PriorityKey = (bool, bool, JobKind, Reverse<NovelId>);

fn priority_key<T: Prioritized + ?Sized>(job: &T, hints: &SchedulingHints) -> PriorityKey {
    let id = job.novel_id();
    (
        hints.active_novel != Some(id),
        !hints.active_search.contains(&id),
        job.kind(),
        Reverse(id),
    )
}

/// Total order over pending jobs: active novel, then active search results,
/// then job kind, then most recently added novel (highest id) first.
pub fn compare_jobs<T: Prioritized + ?Sized>(a: &T, b: &T, hints: &SchedulingHints) -> Ordering {
    priority_key(a, hints).cmp(&priority_key(b, hints))
}

/// Stable in-place reorder; jobs that compare equal keep their queue order.
pub fn reorder<T: Prioritized>(jobs: &mut VecDeque<T>, hints: &SchedulingHints) {
    jobs.make_contiguous()
        .sort_by(|a, b| compare_jobs(a, b, hints));
}

#[cfg(test)]
mod tests {
    use super::*;

    fn queue(items: &[(NovelId, JobKind)]) -> VecDeque<(NovelId, JobKind)> {
        items.iter().copied().collect()
    }

    #[test]
    fn without_hints_orders_by_kind_then_descending_id() {
        let mut jobs = queue(&[
            (1, JobKind::ChapterContent),
            (2, JobKind::ChapterList),
            (1, JobKind::NovelInfo),
            (3, JobKind::ChapterList),
        ]);
        reorder(&mut jobs, &SchedulingHints::default());
        assert_eq!(
            Vec::from(jobs),
            vec![
                (1, JobKind::NovelInfo),
                (3, JobKind::ChapterList),
                (2, JobKind::ChapterList),
                (1, JobKind::ChapterContent),
            ]
        );
    }

    #[test]
    fn active_search_beats_kind_but_not_active_novel() {
        let hints = SchedulingHints {
            active_novel: Some(5),
            active_search: [7].into_iter().collect(),
        };
        let mut jobs = queue(&[
            (9, JobKind::NovelInfo),
            (7, JobKind::ChapterContent),
            (5, JobKind::ChapterContent),
        ]);
        reorder(&mut jobs, &hints);
        let ids: Vec<_> = jobs.iter().map(|job| job.0).collect();
        assert_eq!(ids, vec![5, 7, 9]);
    }

    #[test]
    fn equal_jobs_keep_insertion_order() {
        let mut jobs: VecDeque<(NovelId, JobKind, u8)> = VecDeque::new();
        impl Prioritized for (NovelId, JobKind, u8) {
            fn novel_id(&self) -> NovelId {
                self.0
            }
            fn kind(&self) -> JobKind {
                self.1
            }
        }
        jobs.push_back((4, JobKind::ChapterContent, 1));
        jobs.push_back((4, JobKind::ChapterContent, 2));
        jobs.push_back((4, JobKind::ChapterContent, 3));
        reorder(&mut jobs, &SchedulingHints::default());
        let tags: Vec<_> = jobs.iter().map(|job| job.2).collect();
        assert_eq!(tags, vec![1, 2, 3]);
    }
}
