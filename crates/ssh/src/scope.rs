//! Scoped use of an opened resource.

use std::fmt::Display;
use std::future::Future;
use std::pin::Pin;

use tracing::warn;

/// Runs `body` against `resource`, then hands it to `close`.
///
/// `close` runs whether `body` succeeds or fails. The body's result is
/// returned unchanged; a close failure is only logged.
pub async fn run_scoped<S, T, E, B, C, CF, CE>(resource: S, body: B, close: C) -> Result<T, E>
where
    B: for<'s> FnOnce(&'s S) -> Pin<Box<dyn Future<Output = Result<T, E>> + Send + 's>>,
    C: FnOnce(S) -> CF,
    CF: Future<Output = Result<(), CE>>,
    CE: Display,
{
    let result = body(&resource).await;
    if let Err(e) = close(resource).await {
        warn!(error = %e, "failed to close session cleanly");
    }
    result
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    struct FakeSession {
        value: u32,
        closes: Arc<AtomicUsize>,
    }

    fn session(closes: &Arc<AtomicUsize>) -> FakeSession {
        FakeSession {
            value: 7,
            closes: Arc::clone(closes),
        }
    }

    async fn close_ok(s: FakeSession) -> Result<(), String> {
        s.closes.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn close_err(s: FakeSession) -> Result<(), String> {
        s.closes.fetch_add(1, Ordering::SeqCst);
        Err("disconnect failed".into())
    }

    #[tokio::test]
    async fn closes_after_successful_body() {
        let closes = Arc::new(AtomicUsize::new(0));
        let result: Result<u32, String> = run_scoped(
            session(&closes),
            |s| Box::pin(async move { Ok(s.value * 2) }),
            close_ok,
        )
        .await;

        assert_eq!(result, Ok(14));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn closes_after_failing_body() {
        let closes = Arc::new(AtomicUsize::new(0));
        let result: Result<u32, String> = run_scoped(
            session(&closes),
            |_| Box::pin(async move { Err("upload failed".to_string()) }),
            close_ok,
        )
        .await;

        assert_eq!(result, Err("upload failed".to_string()));
        assert_eq!(closes.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn close_failure_keeps_body_result() {
        let closes = Arc::new(AtomicUsize::new(0));
        let ok: Result<u32, String> = run_scoped(
            session(&closes),
            |s| Box::pin(async move { Ok(s.value) }),
            close_err,
        )
        .await;
        assert_eq!(ok, Ok(7));

        let err: Result<u32, String> = run_scoped(
            session(&closes),
            |_| Box::pin(async move { Err("body".to_string()) }),
            close_err,
        )
        .await;
        assert_eq!(err, Err("body".to_string()));
        assert_eq!(closes.load(Ordering::SeqCst), 2);
    }
}
