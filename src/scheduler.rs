use std::future::Future;
use std::time::Duration;

use log::{error, info};

use crate::error::StatsError;

/// Run `job` once immediately, then (unless `run_once`) keep re-running it
/// every `interval` until `shutdown` resolves.
///
/// The first pass propagates its error so a broken deployment fails at
/// startup; later passes are logged and the next tick is the retry.  The
/// job body is blocking and runs on the blocking pool, one pass at a time;
/// `shutdown` is only consulted between passes.
pub async fn run_scheduled<J, S>(
    job: J,
    interval: Duration,
    run_once: bool,
    shutdown: S,
) -> Result<(), StatsError>
where
    J: Fn() -> Result<(), StatsError> + Clone + Send + 'static,
    S: Future<Output = ()>,
{
    run_pass(job.clone()).await?;
    if run_once {
        return Ok(());
    }

    tokio::pin!(shutdown);
    loop {
        tokio::select! {
            _ = &mut shutdown => {
                info!("shutting down");
                return Ok(());
            }
            _ = tokio::time::sleep(interval) => {
                if let Err(e) = run_pass(job.clone()).await {
                    error!("scheduled run failed: {}", e);
                }
            }
        }
    }
}

async fn run_pass<J>(job: J) -> Result<(), StatsError>
where
    J: FnOnce() -> Result<(), StatsError> + Send + 'static,
{
    match tokio::task::spawn_blocking(job).await {
        Ok(result) => result,
        Err(e) => Err(StatsError::Job(e.to_string())),
    }
}

/// Resolves when the process receives SIGINT or, on Unix, SIGTERM.
pub async fn shutdown_signal() {
    #[cfg(unix)]
    {
        use tokio::signal::unix::{signal, SignalKind};
        let mut sigterm =
            signal(SignalKind::terminate()).expect("failed to install SIGTERM handler");
        tokio::select! {
            _ = tokio::signal::ctrl_c() => info!("received SIGINT"),
            _ = sigterm.recv() => info!("received SIGTERM"),
        }
    }
    #[cfg(not(unix))]
    {
        let _ = tokio::signal::ctrl_c().await;
        info!("received shutdown signal");
    }
}

#[cfg(test)]
mod tests {
    use std::future;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    use super::*;

    fn counting_job(count: &Arc<AtomicUsize>) -> impl Fn() -> Result<(), StatsError> + Clone {
        let count = count.clone();
        move || {
            count.fetch_add(1, Ordering::SeqCst);
            Ok(())
        }
    }

    #[tokio::test]
    async fn run_once_executes_a_single_pass() {
        let count = Arc::new(AtomicUsize::new(0));
        run_scheduled(
            counting_job(&count),
            Duration::from_millis(5),
            true,
            future::pending(),
        )
        .await
        .unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn run_once_propagates_a_failed_pass() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let job = move || {
            c.fetch_add(1, Ordering::SeqCst);
            Err(StatsError::Job("boom".to_string()))
        };
        let res = run_scheduled(job, Duration::from_millis(5), true, future::pending()).await;
        assert!(res.is_err());
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn interval_mode_repeats_until_shutdown() {
        let count = Arc::new(AtomicUsize::new(0));
        run_scheduled(
            counting_job(&count),
            Duration::from_millis(20),
            false,
            tokio::time::sleep(Duration::from_millis(110)),
        )
        .await
        .unwrap();
        let passes = count.load(Ordering::SeqCst);
        // one immediate pass plus ~5 scheduled ones
        assert!(passes >= 3, "expected at least 3 passes, got {}", passes);
        assert!(passes <= 7, "expected at most 7 passes, got {}", passes);
    }

    #[tokio::test]
    async fn shutdown_while_idle_exits_without_another_pass() {
        let count = Arc::new(AtomicUsize::new(0));
        run_scheduled(
            counting_job(&count),
            Duration::from_secs(3600),
            false,
            tokio::time::sleep(Duration::from_millis(30)),
        )
        .await
        .unwrap();
        assert_eq!(count.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn failed_scheduled_passes_do_not_stop_the_loop() {
        let count = Arc::new(AtomicUsize::new(0));
        let c = count.clone();
        let job = move || {
            // first pass succeeds, every scheduled pass fails
            if c.fetch_add(1, Ordering::SeqCst) == 0 {
                Ok(())
            } else {
                Err(StatsError::Job("flaky".to_string()))
            }
        };
        run_scheduled(
            job,
            Duration::from_millis(20),
            false,
            tokio::time::sleep(Duration::from_millis(90)),
        )
        .await
        .unwrap();
        assert!(count.load(Ordering::SeqCst) >= 3);
    }
}
