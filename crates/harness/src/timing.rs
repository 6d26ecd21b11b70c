//! Wall-clock duration helpers

use std::future::Future;
use std::time::{Duration, Instant};

/// Run `f` and return its result with the time it took
pub fn timed<T>(f: impl FnOnce() -> T) -> (T, Duration) {
    let start = Instant::now();
    let value = f();
    (value, start.elapsed())
}

/// Await `fut` and return its output with the time it took
pub async fn timed_async<F: Future>(fut: F) -> (F::Output, Duration) {
    let start = Instant::now();
    let value = fut.await;
    (value, start.elapsed())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_timed_returns_value() {
        let (value, elapsed) = timed(|| {
            std::thread::sleep(Duration::from_millis(20));
            7
        });
        assert_eq!(value, 7);
        assert!(elapsed >= Duration::from_millis(20));
    }

    #[tokio::test]
    async fn test_timed_async_measures_await() {
        let (value, elapsed) = timed_async(async {
            tokio::time::sleep(Duration::from_millis(20)).await;
            "done"
        })
        .await;
        assert_eq!(value, "done");
        assert!(elapsed >= Duration::from_millis(20));
    }
}
