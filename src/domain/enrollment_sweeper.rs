//! Background task that expires lapsed enrollments.
//!
//! Access checks already treat an enrollment past `expires_at` as inactive;
//! the sweeper only brings the stored status in line so listings and reports
//! stay accurate.

use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio_retry::Retry;
use tokio_retry::strategy::{ExponentialBackoff, jitter};

use crate::domain::repositories::EnrollmentRepository;

const MAX_RETRIES: usize = 3;

/// Runs one sweep, retrying transient database failures.
///
/// Returns the number of enrollments marked expired.
pub async fn sweep_once<E: EnrollmentRepository + ?Sized>(repository: &E) -> u64 {
    let strategy = ExponentialBackoff::from_millis(10)
        .max_delay(Duration::from_secs(2))
        .map(jitter)
        .take(MAX_RETRIES);

    match Retry::start(strategy, || repository.expire_due(Utc::now())).await {
        Ok(expired) => {
            if expired > 0 {
                metrics::counter!("enrollments_expired_total").increment(expired);
                tracing::info!(expired, "Expired lapsed enrollments");
            }
            expired
        }
        Err(e) => {
            tracing::error!(error = %e, "Enrollment sweep failed");
            0
        }
    }
}

/// Sweeps every `interval` until `shutdown` flips to `true`.
pub async fn run_enrollment_sweeper<E: EnrollmentRepository + ?Sized>(
    repository: Arc<E>,
    interval: Duration,
    mut shutdown: watch::Receiver<bool>,
) {
    let mut ticker = tokio::time::interval(interval);
    ticker.set_missed_tick_behavior(tokio::time::MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            _ = ticker.tick() => {
                sweep_once(repository.as_ref()).await;
            }
            changed = shutdown.changed() => {
                if changed.is_err() || *shutdown.borrow() {
                    break;
                }
            }
        }
    }

    tracing::info!("Enrollment sweeper stopped");
}
