//! Cancellable delayed and periodic work.
//!
//! Every piece of deferred work (countdown ticks, reveal stages, the scoring
//! round trip, the leaderboard post, the end-of-round redirect) is spawned as
//! a tokio task that delivers one event back to the owner through a single
//! channel. Tasks belong to a [`TaskGroup`]; cancelling a group aborts its
//! tasks and bumps the group's generation, so an event a task managed to
//! queue before it was aborted is still discarded by [`Scheduler::accept`].
//!
//! ```text
//!  after/every/spawn ──► tokio task ──► Scheduled { group, generation, event }
//!                                              │
//!  owner loop ◄── accept() (generation check) ◄┘
//! ```

use std::collections::HashMap;
use std::future::Future;
use std::time::Duration;

use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tokio::time::{interval_at, sleep, Instant, MissedTickBehavior};

/// Families of deferred work that are cancelled together.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum TaskGroup {
    /// Hard-mode countdown ticks.
    Countdown,
    /// Staged result reveal.
    Reveal,
    /// The in-flight scoring request.
    Submission,
    /// Leaderboard report.
    Report,
    /// Post-resolution modal and redirect.
    Redirect,
    /// Daily target hint fetch.
    DailyHint,
}

/// An event delivered by a scheduled task.
#[derive(Debug)]
pub struct Scheduled<E> {
    /// Group the producing task belonged to.
    pub group: TaskGroup,
    /// Group generation at spawn time.
    pub generation: u64,
    /// The payload.
    pub event: E,
}

/// Owner of all deferred work for one controller.
///
/// Dropping the scheduler aborts everything still pending.
#[derive(Debug)]
pub struct Scheduler<E: Send + 'static> {
    tx: mpsc::UnboundedSender<Scheduled<E>>,
    generations: HashMap<TaskGroup, u64>,
    tasks: HashMap<TaskGroup, Vec<JoinHandle<()>>>,
}

impl<E: Send + 'static> Scheduler<E> {
    /// Create a scheduler and the receiving end its tasks deliver to.
    #[must_use]
    pub fn new() -> (Self, mpsc::UnboundedReceiver<Scheduled<E>>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (
            Self {
                tx,
                generations: HashMap::new(),
                tasks: HashMap::new(),
            },
            rx,
        )
    }

    fn generation(&self, group: TaskGroup) -> u64 {
        self.generations.get(&group).copied().unwrap_or(0)
    }

    fn track(&mut self, group: TaskGroup, handle: JoinHandle<()>) {
        let handles = self.tasks.entry(group).or_default();
        handles.retain(|h| !h.is_finished());
        handles.push(handle);
    }

    /// Deliver `event` once after `delay`.
    pub fn after(&mut self, group: TaskGroup, delay: Duration, event: E) {
        let tx = self.tx.clone();
        let generation = self.generation(group);
        let handle = tokio::spawn(async move {
            sleep(delay).await;
            let _ = tx.send(Scheduled {
                group,
                generation,
                event,
            });
        });
        self.track(group, handle);
    }

    /// Deliver `make()` every `period`, first after one full period.
    pub fn every<F>(&mut self, group: TaskGroup, period: Duration, make: F)
    where
        F: Fn() -> E + Send + 'static,
    {
        let tx = self.tx.clone();
        let generation = self.generation(group);
        let handle = tokio::spawn(async move {
            let mut ticker = interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            loop {
                ticker.tick().await;
                let sent = tx.send(Scheduled {
                    group,
                    generation,
                    event: make(),
                });
                if sent.is_err() {
                    break;
                }
            }
        });
        self.track(group, handle);
    }

    /// Run `work` in the background and deliver its output.
    pub fn spawn<F>(&mut self, group: TaskGroup, work: F)
    where
        F: Future<Output = E> + Send + 'static,
    {
        let tx = self.tx.clone();
        let generation = self.generation(group);
        let handle = tokio::spawn(async move {
            let event = work.await;
            let _ = tx.send(Scheduled {
                group,
                generation,
                event,
            });
        });
        self.track(group, handle);
    }

    /// Abort every task in `group` and invalidate events it already queued.
    pub fn cancel(&mut self, group: TaskGroup) {
        *self.generations.entry(group).or_insert(0) += 1;
        if let Some(handles) = self.tasks.remove(&group) {
            for handle in handles {
                handle.abort();
            }
        }
    }

    /// Cancel every group.
    pub fn cancel_all(&mut self) {
        let groups: Vec<TaskGroup> = self.tasks.keys().copied().collect();
        for group in groups {
            self.cancel(group);
        }
    }

    /// Unwrap an event if its group has not been cancelled since it was
    /// scheduled.
    pub fn accept(&self, scheduled: Scheduled<E>) -> Option<E> {
        if scheduled.generation == self.generation(scheduled.group) {
            Some(scheduled.event)
        } else {
            tracing::trace!(group = ?scheduled.group, "dropping stale scheduled event");
            None
        }
    }

    /// Whether `group` has tasks that have not finished.
    #[must_use]
    pub fn pending(&self, group: TaskGroup) -> bool {
        self.tasks
            .get(&group)
            .is_some_and(|handles| handles.iter().any(|h| !h.is_finished()))
    }
}

impl<E: Send + 'static> Drop for Scheduler<E> {
    fn drop(&mut self) {
        for handles in self.tasks.values() {
            for handle in handles {
                handle.abort();
            }
        }
    }
}
