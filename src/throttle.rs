use std::time::Duration;
use tokio::sync::Mutex;
use tokio::time::Instant;

/// Enforces a minimum spacing between consecutive outbound calls.
///
/// The first call passes straight through; every later call waits until
/// `delay` has elapsed since the previous one was released.
pub struct Throttle {
    delay: Duration,
    last: Mutex<Option<Instant>>,
}

impl Throttle {
    pub fn new(delay: Duration) -> Self {
        Self {
            delay,
            last: Mutex::new(None),
        }
    }

    pub async fn wait(&self) {
        let mut last = self.last.lock().await;
        if let Some(prev) = *last {
            let ready_at = prev + self.delay;
            if ready_at > Instant::now() {
                tokio::time::sleep_until(ready_at).await;
            }
        }
        *last = Some(Instant::now());
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_first_call_does_not_wait() {
        let throttle = Throttle::new(Duration::from_secs(60));
        let started = Instant::now();
        throttle.wait().await;
        assert!(started.elapsed() < Duration::from_secs(1));
    }

    #[tokio::test]
    async fn test_spaces_consecutive_calls() {
        let throttle = Throttle::new(Duration::from_millis(30));
        let started = Instant::now();
        throttle.wait().await;
        throttle.wait().await;
        throttle.wait().await;
        assert!(started.elapsed() >= Duration::from_millis(60));
    }

    #[tokio::test]
    async fn test_zero_delay_never_sleeps() {
        let throttle = Throttle::new(Duration::ZERO);
        let started = Instant::now();
        for _ in 0..100 {
            throttle.wait().await;
        }
        assert!(started.elapsed() < Duration::from_secs(1));
    }
}
