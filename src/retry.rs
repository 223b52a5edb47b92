//! Fixed-count, fixed-delay retry for user-triggered quiz generation.

use std::{fmt::Display, future::Future, time::Duration};

use tracing::warn;

pub const GENERATE_ATTEMPTS: u32 = 3;
pub const GENERATE_DELAY: Duration = Duration::from_secs(2);

/// Run `op` up to `attempts` times (at least once), sleeping `delay`
/// between failures. Errors for which `retryable` is false end the loop
/// immediately. Returns the first success or the last error.
pub async fn retry_fixed<T, E, R, F, Fut>(attempts: u32, delay: Duration, retryable: R, mut op: F) -> Result<T, E>
where
  R: Fn(&E) -> bool,
  F: FnMut(u32) -> Fut,
  Fut: Future<Output = Result<T, E>>,
  E: Display,
{
  let attempts = attempts.max(1);
  let mut attempt = 1;
  loop {
    match op(attempt).await {
      Ok(v) => return Ok(v),
      Err(e) if attempt < attempts && retryable(&e) => {
        warn!(target: "quiz", attempt, attempts, error = %e, "Attempt failed; retrying");
        tokio::time::sleep(delay).await;
        attempt += 1;
      }
      Err(e) => return Err(e),
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;
  use std::sync::atomic::{AtomicU32, Ordering};

  const TICK: Duration = Duration::from_millis(1);

  #[tokio::test]
  async fn stops_at_first_success() {
    let calls = AtomicU32::new(0);
    let out: Result<u32, String> = retry_fixed(3, TICK, |_| true, |n| {
      calls.fetch_add(1, Ordering::SeqCst);
      async move { if n == 2 { Ok(n) } else { Err(format!("fail {n}")) } }
    })
    .await;
    assert_eq!(out, Ok(2));
    assert_eq!(calls.load(Ordering::SeqCst), 2);
  }

  #[tokio::test]
  async fn returns_last_error_after_exhausting() {
    let calls = AtomicU32::new(0);
    let out: Result<(), String> = retry_fixed(3, TICK, |_| true, |n| {
      calls.fetch_add(1, Ordering::SeqCst);
      async move { Err(format!("fail {n}")) }
    })
    .await;
    assert_eq!(out, Err("fail 3".to_string()));
    assert_eq!(calls.load(Ordering::SeqCst), 3);
  }

  #[tokio::test]
  async fn non_retryable_error_stops_immediately() {
    let calls = AtomicU32::new(0);
    let out: Result<(), String> = retry_fixed(3, TICK, |e: &String| !e.starts_with("bad"), |_| {
      calls.fetch_add(1, Ordering::SeqCst);
      async { Err("bad request".to_string()) }
    })
    .await;
    assert!(out.is_err());
    assert_eq!(calls.load(Ordering::SeqCst), 1);
  }

  #[tokio::test]
  async fn zero_attempts_still_runs_once() {
    let out: Result<(), String> = retry_fixed(0, TICK, |_| true, |_| async { Err("x".to_string()) }).await;
    assert!(out.is_err());
  }
}
