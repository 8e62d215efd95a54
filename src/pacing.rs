//! Settle delays between dependent backend calls
//!
//! Every pair of dependent calls in a run is separated by a small pause so
//! backend-side state (inventory, progress counters) settles before the next
//! decision is read. The join/share and calendar enter/complete sequences are
//! both instances of the same two-phase shape, implemented once in
//! [`two_phase`].

use crate::config::PacingConfig;
use rand::Rng;
use std::future::Future;
use std::time::Duration;

/// Sleep for `base` plus a random jitter in `0..=jitter`
pub async fn pause(base: Duration, jitter: Duration) {
    let extra = if jitter.is_zero() {
        Duration::ZERO
    } else {
        Duration::from_millis(rand::thread_rng().gen_range(0..=jitter.as_millis() as u64))
    };
    tokio::time::sleep(base + extra).await;
}

/// The standard inter-action pause from the pacing configuration
pub async fn settle(pacing: &PacingConfig) {
    pause(pacing.settle, pacing.jitter).await;
}

/// Run a two-phase backend action with an interstitial settle delay
///
/// Executes `first`; on failure the second phase is never attempted and the
/// error is returned. On success, waits `wait`, then runs `second` and returns
/// both results - the second phase's failure is handed back to the caller
/// rather than propagated, because a failed second phase after a successful
/// first phase is reported separately, not treated as a failure of the whole
/// item.
pub async fn two_phase<T, U, E, FutA, FutB, MkB>(
    first: FutA,
    wait: Duration,
    second: MkB,
) -> Result<(T, Result<U, E>), E>
where
    FutA: Future<Output = Result<T, E>>,
    MkB: FnOnce() -> FutB,
    FutB: Future<Output = Result<U, E>>,
{
    let first_result = first.await?;
    tokio::time::sleep(wait).await;
    let second_result = second().await;
    Ok((first_result, second_result))
}
