//! Bounded worker pool.
//!
//! Admission control has two limits:
//!
//! - a bounded queue of accepted tickets (`queue_capacity`); submitters
//!   reserve a slot with [`WorkerPool::reserve`] and get
//!   [`PoolError::QueueFull`] when none is left
//! - a semaphore capping how many workers run at once (`max_concurrent`)
//!
//! The [`Dispatcher`] is a single long-lived task that waits for a semaphore
//! permit before pulling the next ticket off the queue, so a ticket leaves
//! the queue only when a worker can start on it. At most `queue_capacity`
//! accepted jobs ever wait.

use std::sync::Arc;

use tokio::sync::{mpsc, oneshot, Semaphore};
use tokio_util::sync::CancellationToken;
use tokio_util::task::TaskTracker;

use crate::error::PoolError;
use crate::worker::{JobOutcome, JobTicket, SeparationWorker};

/// Failure reason recorded for jobs still queued when the dispatcher stops.
pub const SHUTDOWN_REASON: &str = "service shut down before the job started";

struct Dispatch {
    ticket: JobTicket,
    done: oneshot::Sender<JobOutcome>,
}

/// Submission side of the pool. Cheap to clone.
#[derive(Clone)]
pub struct WorkerPool {
    sender: mpsc::Sender<Dispatch>,
    tasks: TaskTracker,
    max_concurrent: usize,
    queue_capacity: usize,
}

/// A reserved queue slot. Dropping it gives the slot back.
pub struct Reservation {
    permit: mpsc::OwnedPermit<Dispatch>,
}

/// Resolves to a job's outcome once its worker finishes.
pub struct JobCompletion {
    receiver: oneshot::Receiver<JobOutcome>,
}

impl JobCompletion {
    /// Wait for the job. `None` if the pool dropped it without an outcome.
    pub async fn outcome(self) -> Option<JobOutcome> {
        self.receiver.await.ok()
    }
}

impl Reservation {
    /// Queue `ticket` in the reserved slot.
    pub fn dispatch(self, ticket: JobTicket) -> JobCompletion {
        let (done, receiver) = oneshot::channel();
        self.permit.send(Dispatch { ticket, done });
        JobCompletion { receiver }
    }
}

impl WorkerPool {
    /// Create the pool and its dispatcher. Both limits are clamped to at
    /// least 1.
    pub fn new(
        worker: Arc<SeparationWorker>,
        max_concurrent: usize,
        queue_capacity: usize,
    ) -> (Self, Dispatcher) {
        let max_concurrent = max_concurrent.max(1);
        let queue_capacity = queue_capacity.max(1);

        let (sender, receiver) = mpsc::channel(queue_capacity);
        let tasks = TaskTracker::new();

        let pool = Self {
            sender,
            tasks: tasks.clone(),
            max_concurrent,
            queue_capacity,
        };
        let dispatcher = Dispatcher {
            receiver,
            semaphore: Arc::new(Semaphore::new(max_concurrent)),
            worker,
            tasks,
        };
        (pool, dispatcher)
    }

    /// Reserve a queue slot without waiting.
    pub fn reserve(&self) -> Result<Reservation, PoolError> {
        match self.sender.clone().try_reserve_owned() {
            Ok(permit) => Ok(Reservation { permit }),
            Err(mpsc::error::TrySendError::Full(_)) => Err(PoolError::QueueFull {
                capacity: self.queue_capacity,
            }),
            Err(mpsc::error::TrySendError::Closed(_)) => Err(PoolError::Closed),
        }
    }

    /// Workers spawned and not yet finished.
    pub fn running(&self) -> usize {
        self.tasks.len()
    }

    /// Tickets accepted but not yet picked up by the dispatcher.
    pub fn queued(&self) -> usize {
        self.queue_capacity.saturating_sub(self.sender.capacity())
    }

    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    pub fn queue_capacity(&self) -> usize {
        self.queue_capacity
    }
}

/// Receiving side of the pool.
pub struct Dispatcher {
    receiver: mpsc::Receiver<Dispatch>,
    semaphore: Arc<Semaphore>,
    worker: Arc<SeparationWorker>,
    tasks: TaskTracker,
}

impl Dispatcher {
    /// Run the dispatch loop until `cancel` fires or every [`WorkerPool`]
    /// handle is dropped.
    ///
    /// On cancellation, tickets still queued are failed with
    /// [`SHUTDOWN_REASON`]. Returns the tracker of spawned workers; await
    /// `tracker.wait()` to let running jobs finish.
    pub async fn run(mut self, cancel: CancellationToken) -> TaskTracker {
        tracing::info!("Job dispatcher started");

        loop {
            let permit = tokio::select! {
                _ = cancel.cancelled() => break,
                permit = Arc::clone(&self.semaphore).acquire_owned() => match permit {
                    Ok(p) => p,
                    Err(_) => break,
                },
            };

            let dispatch = tokio::select! {
                _ = cancel.cancelled() => break,
                next = self.receiver.recv() => match next {
                    Some(dispatch) => dispatch,
                    None => break,
                },
            };

            let worker = Arc::clone(&self.worker);
            self.tasks.spawn(async move {
                let outcome = worker.run(dispatch.ticket).await;
                drop(permit);
                // The submitter may not be waiting.
                let _ = dispatch.done.send(outcome);
            });
        }

        tracing::info!("Job dispatcher shutting down");

        self.receiver.close();
        while let Ok(dispatch) = self.receiver.try_recv() {
            self.abandon(dispatch).await;
        }

        self.tasks.close();
        self.tasks
    }

    async fn abandon(&self, dispatch: Dispatch) {
        tracing::warn!(job_id = %dispatch.ticket.id, "Abandoning queued job");
        let outcome = self.worker.abandon(dispatch.ticket, SHUTDOWN_REASON).await;
        let _ = dispatch.done.send(outcome);
    }
}
