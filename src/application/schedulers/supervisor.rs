//! Spawns the schedulers and stops them together.

use std::sync::Arc;

use tokio::sync::watch;
use tokio::task::JoinHandle;

use super::ScheduledJob;

/// Owns the running scheduler tasks.
pub struct SchedulerSupervisor {
    shutdown_tx: watch::Sender<bool>,
    handles: Vec<(&'static str, JoinHandle<()>)>,
}

impl SchedulerSupervisor {
    /// Spawn one task per job, all sharing a shutdown channel.
    pub fn start(jobs: Vec<Arc<dyn ScheduledJob>>) -> Self {
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        let handles = jobs
            .into_iter()
            .map(|job| {
                let name = job.name();
                let rx = shutdown_rx.clone();
                let handle = tokio::spawn(async move { job.run(rx).await });
                (name, handle)
            })
            .collect::<Vec<_>>();

        tracing::info!(jobs = handles.len(), "Schedulers started");
        Self {
            shutdown_tx,
            handles,
        }
    }

    pub fn job_count(&self) -> usize {
        self.handles.len()
    }

    /// Signal shutdown and wait for every job to finish its current iteration.
    pub async fn shutdown(self) {
        // Ignored: all receivers gone means every job already exited.
        let _ = self.shutdown_tx.send(true);

        for (name, handle) in self.handles {
            if let Err(err) = handle.await {
                tracing::error!(job = name, error = %err, "Scheduler task panicked");
            }
        }
        tracing::info!("Schedulers stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::application::schedulers::Schedule;
    use crate::domain::foundation::DomainError;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::time::Duration;

    struct Tick {
        runs: Arc<AtomicUsize>,
    }

    #[async_trait]
    impl ScheduledJob for Tick {
        fn name(&self) -> &'static str {
            "tick"
        }

        fn schedule(&self) -> Schedule {
            Schedule::every(Duration::from_secs(1))
        }

        async fn run_once(&self) -> Result<usize, DomainError> {
            self.runs.fetch_add(1, Ordering::SeqCst);
            Ok(0)
        }
    }

    #[tokio::test(start_paused = true)]
    async fn shutdown_stops_all_jobs() {
        let runs = Arc::new(AtomicUsize::new(0));
        let jobs: Vec<Arc<dyn ScheduledJob>> = vec![
            Arc::new(Tick { runs: runs.clone() }),
            Arc::new(Tick { runs: runs.clone() }),
        ];

        let supervisor = SchedulerSupervisor::start(jobs);
        assert_eq!(supervisor.job_count(), 2);
        tokio::time::sleep(Duration::from_millis(2_500)).await;

        supervisor.shutdown().await;
        let after_shutdown = runs.load(Ordering::SeqCst);
        assert_eq!(after_shutdown, 6);

        tokio::time::sleep(Duration::from_secs(10)).await;
        assert_eq!(runs.load(Ordering::SeqCst), after_shutdown);
    }
}
