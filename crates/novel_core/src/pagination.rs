//! Chapter-list pagination as an explicit state machine.
//!
//! The engine asks [`ChapterListState::next_request`] what to fetch, performs
//! the fetch, and feeds the result back through [`advance`]. Chapters are
//! renumbered from 1 across all pages; the ids coming from the source are
//! discarded.

use crate::{ChapterInfo, ChapterListInfo};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChapterListState {
    Start,
    Paging {
        next_page: u32,
        total_pages: u32,
        numbered: u64,
    },
    Done,
}

/// What the next step has to fetch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PageRequest {
    /// Page 1 together with the total page count.
    ListInfo,
    Page(u32),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChapterListInput {
    ListInfo(ChapterListInfo),
    Page(Vec<ChapterInfo>),
}

impl ChapterListState {
    pub fn next_request(&self) -> Option<PageRequest> {
        match self {
            ChapterListState::Start => Some(PageRequest::ListInfo),
            ChapterListState::Paging { next_page, .. } => Some(PageRequest::Page(*next_page)),
            ChapterListState::Done => None,
        }
    }

    pub fn is_done(&self) -> bool {
        matches!(self, ChapterListState::Done)
    }
}

/// Applies one fetched result. Returns the new state and the renumbered
/// chapters to report, if any.
///
/// An input that does not answer the state's pending request leaves the state unchanged.
pub fn advance(
    state: ChapterListState,
    input: ChapterListInput,
) -> (ChapterListState, Option<Vec<ChapterInfo>>) {
    match (state, input) {
        (ChapterListState::Start, ChapterListInput::ListInfo(info)) => {
            if info.total_pages == 0 {
                return (ChapterListState::Done, None);
            }
            match info.first_page_chapters {
                Some(chapters) => {
                    let (numbered, report) = renumber(0, chapters);
                    let next = if info.total_pages == 1 {
                        ChapterListState::Done
                    } else {
                        ChapterListState::Paging {
                            next_page: 2,
                            total_pages: info.total_pages,
                            numbered,
                        }
                    };
                    (next, non_empty(report))
                }
                None => (
                    ChapterListState::Paging {
                        next_page: 1,
                        total_pages: info.total_pages,
                        numbered: 0,
                    },
                    None,
                ),
            }
        }
        (
            ChapterListState::Paging {
                next_page,
                total_pages,
                numbered,
            },
            ChapterListInput::Page(chapters),
        ) => {
            let (numbered, report) = renumber(numbered, chapters);
            let next_page = next_page + 1;
            let next = if next_page > total_pages {
                ChapterListState::Done
            } else {
                ChapterListState::Paging {
                    next_page,
                    total_pages,
                    numbered,
                }
            };
            (next, non_empty(report))
        }
        (state, _) => (state, None),
    }
}

fn renumber(already: u64, chapters: Vec<ChapterInfo>) -> (u64, Vec<ChapterInfo>) {
    let mut count = already;
    let renumbered = chapters
        .into_iter()
        .map(|chapter| {
            count += 1;
            ChapterInfo { id: count, ..chapter }
        })
        .collect();
    (count, renumbered)
}

fn non_empty(chapters: Vec<ChapterInfo>) -> Option<Vec<ChapterInfo>> {
    if chapters.is_empty() {
        None
    } else {
        Some(chapters)
    }
}
