use std::future::Future;
use std::time::Duration;

use thirtyfour::{By, WebDriver, WebElement};
use tokio::time::{sleep, Instant};

use crate::error::StepError;

/// Fixed-interval bounded poll. Runs `probe` until it yields a value or the
/// deadline passes. Every step that waits on asynchronous rendering goes
/// through here instead of rolling its own loop.
pub async fn poll_until<T, F, Fut>(timeout: Duration, interval: Duration, mut probe: F) -> Option<T>
where
    F: FnMut() -> Fut,
    Fut: Future<Output = Option<T>>,
{
    let deadline = Instant::now() + timeout;
    loop {
        if let Some(value) = probe().await {
            return Some(value);
        }
        if Instant::now() >= deadline {
            return None;
        }
        sleep(interval).await;
    }
}

/// Wait until the element matched by `by` is rendered and displayed.
pub async fn wait_displayed(
    driver: &WebDriver,
    by: By,
    what: &'static str,
    timeout: Duration,
    interval: Duration,
) -> Result<WebElement, StepError> {
    poll_until(timeout, interval, || {
        let driver = driver.clone();
        let by = by.clone();
        async move {
            match driver.find(by).await {
                Ok(elem) => match elem.is_displayed().await {
                    Ok(true) => Some(elem),
                    _ => None,
                },
                Err(_) => None,
            }
        }
    })
    .await
    .ok_or_else(|| StepError::ElementNotReady {
        what,
        selector: format!("{:?}", by),
    })
}

/// Wait until the element is displayed and enabled, for action controls.
pub async fn wait_clickable(
    driver: &WebDriver,
    by: By,
    what: &'static str,
    timeout: Duration,
    interval: Duration,
) -> Result<WebElement, StepError> {
    poll_until(timeout, interval, || {
        let driver = driver.clone();
        let by = by.clone();
        async move {
            match driver.find(by).await {
                Ok(elem) => match elem.is_clickable().await {
                    Ok(true) => Some(elem),
                    _ => None,
                },
                Err(_) => None,
            }
        }
    })
    .await
    .ok_or_else(|| StepError::ElementNotReady {
        what,
        selector: format!("{:?}", by),
    })
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;

    #[tokio::test(start_paused = true)]
    async fn returns_as_soon_as_probe_succeeds() {
        let calls = AtomicUsize::new(0);
        let result = poll_until(Duration::from_secs(5), Duration::from_millis(100), || {
            let n = calls.fetch_add(1, Ordering::SeqCst) + 1;
            async move { (n >= 3).then_some(n) }
        })
        .await;
        assert_eq!(result, Some(3));
        assert_eq!(calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test(start_paused = true)]
    async fn gives_up_at_the_deadline() {
        let calls = AtomicUsize::new(0);
        let result: Option<()> =
            poll_until(Duration::from_millis(500), Duration::from_millis(100), || {
                calls.fetch_add(1, Ordering::SeqCst);
                async { None }
            })
            .await;
        assert_eq!(result, None);
        assert!(calls.load(Ordering::SeqCst) >= 5);
    }
}
