//! How many times a provider request may go out.
//!
//! Provider steps are POSTs that advance server-side state. Once a step
//! request has left the client, a lost answer says nothing about whether it
//! was applied, so steps are sent exactly once and the caller decides what
//! to do with the failure. Only reads are resent.

use std::future::Future;
use std::time::Duration;

use crate::error::ProviderError;

/// Pauses before each resend of a read.
const READ_BACKOFF: [Duration; 3] = [
    Duration::from_millis(200),
    Duration::from_millis(400),
    Duration::from_millis(800),
];

/// Resend policy for one request.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub(crate) enum Delivery {
    /// State-changing step: a single attempt.
    Once,
    /// Side-effect-free read: resent after any transport failure, pausing
    /// per [`READ_BACKOFF`].
    Resendable,
}

impl Delivery {
    fn pauses(self) -> &'static [Duration] {
        match self {
            Self::Once => &[],
            Self::Resendable => &READ_BACKOFF,
        }
    }

    /// Send the request built by `build`, honouring the policy.
    ///
    /// `build` runs once per attempt; correlation headers and multipart
    /// bodies cannot be reused. HTTP statuses are the caller's concern and
    /// never trigger a resend.
    pub(crate) async fn send<F, Fut>(self, endpoint: &str, build: F) -> Result<reqwest::Response, ProviderError>
    where
        F: Fn() -> Fut,
        Fut: Future<Output = Result<reqwest::Response, reqwest::Error>>,
    {
        let mut pauses = self.pauses().iter();
        loop {
            let err = match build().await {
                Ok(resp) => return Ok(resp),
                Err(e) => ProviderError::from_send(endpoint, e),
            };
            let Some(pause) = pauses.next() else {
                return Err(err);
            };
            tracing::warn!(
                endpoint,
                pause_ms = pause.as_millis() as u64,
                "provider read failed, sending again: {err}"
            );
            tokio::time::sleep(*pause).await;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::{AtomicUsize, Ordering};

    async fn attempts_against_closed_port(delivery: Delivery) -> (usize, ProviderError) {
        let attempts = AtomicUsize::new(0);
        let client = reqwest::Client::new();
        let err = delivery
            .send("GET /closed", || {
                attempts.fetch_add(1, Ordering::SeqCst);
                // Port 1 is closed: connection refused.
                client.get("http://127.0.0.1:1/").send()
            })
            .await
            .unwrap_err();
        (attempts.load(Ordering::SeqCst), err)
    }

    #[tokio::test]
    async fn step_is_sent_once() {
        let (attempts, err) = attempts_against_closed_port(Delivery::Once).await;
        assert_eq!(attempts, 1);
        assert!(err.never_sent());
    }

    #[tokio::test(start_paused = true)]
    async fn read_is_resent_after_each_pause() {
        let (attempts, err) = attempts_against_closed_port(Delivery::Resendable).await;
        assert_eq!(attempts, READ_BACKOFF.len() + 1);
        assert_eq!(err.endpoint(), Some("GET /closed"));
    }
}
