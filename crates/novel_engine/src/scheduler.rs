//! Priority queue of [`NovelJob`]s with a single runner.
//!
//! Two locks are involved. The queue lock guards the pending jobs and the
//! scheduling hints and is never held across an await. The runner lock is
//! taken with `try_lock` for a whole drain, so at most one drain runs at any
//! time; callers that lose the race only enqueue.

use std::collections::{HashSet, VecDeque};
use std::pin::pin;
use std::sync::{Arc, Mutex, MutexGuard};

use engine_logging::{engine_debug, engine_info, engine_trace};
use novel_core::{reorder, JobKind, NovelId, SchedulingHints};
use tokio::runtime::Handle;
use tokio::sync::Notify;

use crate::job::{JobContext, NovelJob};

#[derive(Debug, Default)]
struct QueueState {
    queue: VecDeque<NovelJob>,
    hints: SchedulingHints,
}

impl QueueState {
    fn reorder(&mut self) {
        reorder(&mut self.queue, &self.hints);
    }
}

struct Shared {
    state: Mutex<QueueState>,
    runner: tokio::sync::Mutex<()>,
    idle: Notify,
    ctx: JobContext,
}

impl Shared {
    fn lock_state(&self) -> MutexGuard<'_, QueueState> {
        // A poisoned queue means a job panicked mid-update; nothing sensible
        // can continue from there.
        self.state.lock().expect("scheduler queue lock poisoned")
    }

    fn pop_next(&self) -> Option<NovelJob> {
        self.lock_state().queue.pop_front()
    }

    /// Puts an unfinished job back at the head, then lets the ordering decide
    /// whether it keeps that place.
    fn requeue(&self, job: NovelJob) {
        let mut state = self.lock_state();
        state.queue.push_front(job);
        state.reorder();
    }

    async fn drain(self: Arc<Self>) {
        loop {
            let Ok(runner) = self.runner.try_lock() else {
                engine_trace!("Drain already in progress");
                return;
            };
            let mut steps = 0usize;
            while let Some(mut job) = self.pop_next() {
                engine_debug!(
                    "Running {} step for novel {} ({:?})",
                    job.kind(),
                    job.novel().id,
                    job.status()
                );
                let status = job.execute_next_step(&self.ctx).await;
                steps += 1;
                if !status.is_done() {
                    self.requeue(job);
                }
            }
            drop(runner);
            engine_info!("Scheduler drained after {} steps", steps);
            self.idle.notify_waiters();

            // A job scheduled after the last pop but before the runner was
            // released found the runner busy and did not start a drain.
            if self.lock_state().queue.is_empty() {
                return;
            }
        }
    }
}

/// Cheap to clone; clones share the same queue.
#[derive(Clone)]
pub struct NovelScheduler {
    shared: Arc<Shared>,
    runtime: Handle,
}

impl NovelScheduler {
    /// Drains are spawned onto `runtime`.
    pub fn new(ctx: JobContext, runtime: Handle) -> Self {
        Self {
            shared: Arc::new(Shared {
                state: Mutex::new(QueueState::default()),
                runner: tokio::sync::Mutex::new(()),
                idle: Notify::new(),
                ctx,
            }),
            runtime,
        }
    }

    /// Appends `job`, reorders and starts a drain unless one is running.
    pub fn schedule(&self, job: NovelJob) {
        self.enqueue(job);
        self.runtime.spawn(self.shared.clone().drain());
    }

    /// Appends `job` and reorders without starting a drain.
    pub fn enqueue(&self, job: NovelJob) {
        engine_debug!("Scheduling {} job for novel {}", job.kind(), job.novel().id);
        let mut state = self.shared.lock_state();
        state.queue.push_back(job);
        state.reorder();
    }

    /// Runs the queue to completion on the calling task. Returns immediately
    /// when another drain holds the runner.
    pub async fn drain(&self) {
        self.shared.clone().drain().await;
    }

    pub fn set_active_novel(&self, novel_id: Option<NovelId>) {
        let mut state = self.shared.lock_state();
        if state.hints.active_novel != novel_id {
            engine_debug!("Active novel set to {:?}", novel_id);
            state.hints.active_novel = novel_id;
            state.reorder();
        }
    }

    pub fn set_active_search(&self, novel_ids: HashSet<NovelId>) {
        let mut state = self.shared.lock_state();
        engine_debug!("Active search set to {} novels", novel_ids.len());
        state.hints.active_search = novel_ids;
        state.reorder();
    }

    pub fn hints(&self) -> SchedulingHints {
        self.shared.lock_state().hints.clone()
    }

    /// Pending jobs in run order. The job currently executing is not listed.
    pub fn pending(&self) -> Vec<(NovelId, JobKind)> {
        self.shared
            .lock_state()
            .queue
            .iter()
            .map(|job| (job.novel().id, job.kind()))
            .collect()
    }

    pub fn len(&self) -> usize {
        self.shared.lock_state().queue.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// True when nothing is queued and no drain is running.
    pub fn is_idle(&self) -> bool {
        self.is_empty() && self.shared.runner.try_lock().is_ok()
    }

    /// Resolves once the queue is empty and no drain is running.
    pub async fn wait_idle(&self) {
        loop {
            let mut notified = pin!(self.shared.idle.notified());
            notified.as_mut().enable();
            if self.is_idle() {
                return;
            }
            notified.await;
        }
    }
}
