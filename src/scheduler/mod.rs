/// Lifecycle control for the repeating background jobs
use async_trait::async_trait;
use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;
use tokio::sync::Notify;
use tokio::task::JoinHandle;
use tracing::info;

/// A unit of work repeated on a timer while its running flag is set
#[async_trait]
pub trait PollJob: Send + Sync + 'static {
    fn name(&self) -> &'static str;

    fn is_running(&self) -> bool;

    fn set_running(&self, running: bool);

    /// Sleep between iterations, re-read after every tick
    fn interval(&self) -> Duration;

    /// One iteration; failures are recorded by the job itself
    async fn tick(&self);
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StartOutcome {
    Started,
    AlreadyRunning,
}

struct LoopTask {
    id: u64,
    handle: JoinHandle<()>,
    wake: Arc<Notify>,
}

type TaskSlot = Arc<Mutex<Option<LoopTask>>>;

fn lock(slot: &TaskSlot) -> MutexGuard<'_, Option<LoopTask>> {
    slot.lock().unwrap_or_else(PoisonError::into_inner)
}

static NEXT_TASK_ID: AtomicU64 = AtomicU64::new(1);

/// Owns at most one background loop for a job
pub struct Scheduler<J: PollJob> {
    job: Arc<J>,
    task: TaskSlot,
}

impl<J: PollJob> Scheduler<J> {
    pub fn new(job: J) -> Self {
        Self {
            job: Arc::new(job),
            task: Arc::new(Mutex::new(None)),
        }
    }

    pub fn job(&self) -> &J {
        &self.job
    }

    /// Set the running flag and spawn the loop unless one is still alive.
    ///
    /// A loop that is winding down after `stop` sees the flag again at its next
    /// iteration boundary and keeps going, so no second task is spawned for it.
    pub fn start(&self) -> StartOutcome {
        let mut slot = lock(&self.task);
        self.job.set_running(true);

        if let Some(task) = slot.as_ref() {
            if !task.handle.is_finished() {
                return StartOutcome::AlreadyRunning;
            }
        }

        let id = NEXT_TASK_ID.fetch_add(1, Ordering::Relaxed);
        let wake = Arc::new(Notify::new());
        let handle = tokio::spawn(run_loop(
            self.job.clone(),
            self.task.clone(),
            id,
            wake.clone(),
        ));
        *slot = Some(LoopTask { id, handle, wake });

        info!(job = self.job.name(), "Scheduler started");
        StartOutcome::Started
    }

    /// Clear the running flag and cut the current sleep short.
    /// An in-flight iteration is allowed to finish.
    pub fn stop(&self) {
        let slot = lock(&self.task);
        self.job.set_running(false);
        if let Some(task) = slot.as_ref() {
            // No stored permit: a restart inside the stopping window must not skip a sleep.
            task.wake.notify_waiters();
        }
        info!(job = self.job.name(), "Scheduler stop requested");
    }

    pub fn is_alive(&self) -> bool {
        lock(&self.task)
            .as_ref()
            .map(|task| !task.handle.is_finished())
            .unwrap_or(false)
    }
}

async fn run_loop<J: PollJob>(job: Arc<J>, slot: TaskSlot, id: u64, wake: Arc<Notify>) {
    info!(job = job.name(), "Background loop running");
    loop {
        {
            let mut current = lock(&slot);
            if !job.is_running() {
                if current.as_ref().map(|task| task.id) == Some(id) {
                    *current = None;
                }
                break;
            }
        }

        job.tick().await;

        // Register for wake-ups before re-checking the flag so a stop issued from here on
        // cannot be missed.
        let woken = wake.notified();
        tokio::pin!(woken);
        woken.as_mut().enable();
        if !job.is_running() {
            continue;
        }

        let interval = job.interval();
        tokio::select! {
            _ = tokio::time::sleep(interval) => {}
            _ = &mut woken => {}
        }
    }
    info!(job = job.name(), "Background loop stopped");
}
