// ============================================================================
// encq-core/src/queue.rs
// ============================================================================
//
// JOB QUEUE: Ordered, pausable collection of jobs
//
// The queue owns every job it has been given, including the ones that are
// already finished or cancelled so an observer can keep showing them. Only
// Waiting jobs are runnable, and their relative order is the order the
// supervisor starts them in.
//
// All mutation happens behind one lock. Operations validate first and mutate
// second, so a failed call leaves the queue exactly as it was.
//
// The supervisor is woken through a one-slot notification channel whenever
// something it could act on changes (a job is added, the queue is resumed or
// reordered).

use std::collections::HashSet;

use crossbeam_channel::{Receiver, Sender, bounded};
use log::debug;
use parking_lot::Mutex;

use crate::error::{CoreError, CoreResult, invalid_state};
use crate::job::{Job, JobId, JobStatus};

struct QueueState {
    jobs: Vec<Job>,
    paused: bool,
}

impl QueueState {
    fn position(&self, id: JobId) -> Option<usize> {
        self.jobs.iter().position(|job| job.id() == id)
    }

    fn waiting_position(&self, id: JobId) -> CoreResult<usize> {
        self.position(id)
            .filter(|&index| self.jobs[index].status() == JobStatus::Waiting)
            .ok_or(CoreError::NotFound(id))
    }
}

/// Shared job queue. Wrap it in an `Arc` to hand it to the supervisor.
pub struct JobQueue {
    state: Mutex<QueueState>,
    wake_tx: Sender<()>,
    wake_rx: Receiver<()>,
}

impl Default for JobQueue {
    fn default() -> Self {
        Self::new(false)
    }
}

impl JobQueue {
    /// Creates an empty queue, optionally starting out paused.
    pub fn new(paused: bool) -> Self {
        let (wake_tx, wake_rx) = bounded(1);
        Self {
            state: Mutex::new(QueueState {
                jobs: Vec::new(),
                paused,
            }),
            wake_tx,
            wake_rx,
        }
    }

    /// Appends a waiting job to the tail.
    pub fn enqueue(&self, job: Job) -> CoreResult<JobId> {
        let id = job.id();
        {
            let mut state = self.state.lock();
            if state.position(id).is_some() {
                return Err(invalid_state(id, "job is already queued"));
            }
            if job.status() != JobStatus::Waiting {
                return Err(invalid_state(id, "only waiting jobs can be queued"));
            }
            if job.command().is_empty() {
                return Err(CoreError::EmptyCommand(id));
            }
            debug!("Queued job {} ({})", id, job.title());
            state.jobs.push(job);
        }
        self.notify();
        Ok(id)
    }

    /// Removes a job in any state except Running and returns it.
    pub fn remove(&self, id: JobId) -> CoreResult<Job> {
        let mut state = self.state.lock();
        let index = state.position(id).ok_or(CoreError::NotFound(id))?;
        if state.jobs[index].status() == JobStatus::Running {
            return Err(invalid_state(id, "a running job cannot be removed"));
        }
        Ok(state.jobs.remove(index))
    }

    /// Swaps a waiting job with the closest waiting job before it.
    ///
    /// Entries that are not waiting are stepped over. Does nothing when the
    /// job is already the first waiting one.
    pub fn move_up(&self, id: JobId) -> CoreResult<()> {
        let mut state = self.state.lock();
        let index = state.waiting_position(id)?;
        let neighbor = state.jobs[..index]
            .iter()
            .rposition(|job| job.status() == JobStatus::Waiting);
        if let Some(neighbor) = neighbor {
            state.jobs.swap(index, neighbor);
        }
        Ok(())
    }

    /// Swaps a waiting job with the closest waiting job after it.
    pub fn move_down(&self, id: JobId) -> CoreResult<()> {
        let mut state = self.state.lock();
        let index = state.waiting_position(id)?;
        let neighbor = state.jobs[index + 1..]
            .iter()
            .position(|job| job.status() == JobStatus::Waiting)
            .map(|offset| index + 1 + offset);
        if let Some(neighbor) = neighbor {
            state.jobs.swap(index, neighbor);
        }
        Ok(())
    }

    /// Reorders the queue to follow `order`.
    ///
    /// Jobs missing from `order` keep their relative order and go after the
    /// listed ones. Finished and cancelled jobs stay in the list for display
    /// but are never runnable again. Unknown ids fail with `NotFound`,
    /// repeated ids with `InvalidState`.
    pub fn rebuild(&self, order: &[JobId]) -> CoreResult<()> {
        {
            let mut state = self.state.lock();

            let mut seen = HashSet::with_capacity(order.len());
            for &id in order {
                if state.position(id).is_none() {
                    return Err(CoreError::NotFound(id));
                }
                if !seen.insert(id) {
                    return Err(invalid_state(id, "listed more than once"));
                }
            }

            let mut remaining = std::mem::take(&mut state.jobs);
            let mut rebuilt = Vec::with_capacity(remaining.len());
            for &id in order {
                if let Some(index) = remaining.iter().position(|job| job.id() == id) {
                    rebuilt.push(remaining.remove(index));
                }
            }
            rebuilt.append(&mut remaining);
            state.jobs = rebuilt;
        }
        self.notify();
        Ok(())
    }

    /// Withholds the next job. A running job is not affected.
    pub fn pause(&self) {
        self.state.lock().paused = true;
    }

    pub fn resume(&self) {
        self.state.lock().paused = false;
        self.notify();
    }

    pub fn is_paused(&self) -> bool {
        self.state.lock().paused
    }

    /// Copies of every job, in queue order.
    pub fn snapshot(&self) -> Vec<Job> {
        self.state.lock().jobs.clone()
    }

    pub fn get(&self, id: JobId) -> Option<Job> {
        let state = self.state.lock();
        state.position(id).map(|index| state.jobs[index].clone())
    }

    /// Ids of the waiting jobs, in the order they will run.
    pub fn waiting_ids(&self) -> Vec<JobId> {
        self.state
            .lock()
            .jobs
            .iter()
            .filter(|job| job.status() == JobStatus::Waiting)
            .map(Job::id)
            .collect()
    }

    /// Id of the job marked Running, if any.
    pub(crate) fn running_id(&self) -> Option<JobId> {
        self.state
            .lock()
            .jobs
            .iter()
            .find(|job| job.status() == JobStatus::Running)
            .map(Job::id)
    }

    /// Whether any job is still waiting or running.
    pub fn has_pending(&self) -> bool {
        self.state
            .lock()
            .jobs
            .iter()
            .any(|job| !job.status().is_terminal())
    }

    pub fn len(&self) -> usize {
        self.state.lock().jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state.lock().jobs.is_empty()
    }

    /// Marks the head waiting job Running and returns a copy of it.
    ///
    /// Returns `None` when paused, when nothing is waiting, or when another
    /// job is still running.
    pub(crate) fn start_next(&self) -> Option<Job> {
        let mut state = self.state.lock();
        if state.paused
            || state
                .jobs
                .iter()
                .any(|job| job.status() == JobStatus::Running)
        {
            return None;
        }

        let job = state
            .jobs
            .iter_mut()
            .find(|job| job.status() == JobStatus::Waiting)?;
        job.transition(JobStatus::Running).ok()?;
        Some(job.clone())
    }

    /// Moves a running job to its terminal status.
    pub(crate) fn complete(&self, id: JobId, status: JobStatus) -> CoreResult<()> {
        let mut state = self.state.lock();
        let index = state.position(id).ok_or(CoreError::NotFound(id))?;
        state.jobs[index].transition(status)
    }

    /// Receiver that gets a token whenever the supervisor should look again.
    pub(crate) fn changed(&self) -> Receiver<()> {
        self.wake_rx.clone()
    }

    fn notify(&self) {
        // A pending token already covers this change.
        let _ = self.wake_tx.try_send(());
    }
}
