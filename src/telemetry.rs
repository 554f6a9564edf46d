//! Best-effort usage pings
//!
//! Each ping is a single GET with a short timeout, spawned onto the runtime and
//! never awaited by the action that triggered it. Failures are logged and dropped.

use std::sync::Mutex;
use std::time::Duration;

use reqwest::redirect::Policy;
use reqwest::{Client, StatusCode};
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::user_agent;
use crate::config::TelemetryConfig;
use crate::error::{Result, TaxiError};

/// Upper bound on a single ping
pub const PING_TIMEOUT: Duration = Duration::from_secs(5);

/// Usage ping client, built once at startup and shared by reference
#[derive(Debug)]
pub struct TelemetryClient {
    inner: Option<Pinger>,
    pending: Mutex<Vec<JoinHandle<()>>>,
}

#[derive(Debug, Clone)]
struct Pinger {
    client: Client,
    endpoint: String,
    token: String,
    user_agent: String,
}

impl TelemetryClient {
    pub fn new(config: &TelemetryConfig) -> Result<Self> {
        if !config.enabled {
            return Ok(Self::disabled());
        }

        let client = Client::builder()
            .timeout(PING_TIMEOUT)
            .redirect(Policy::none())
            .build()
            .map_err(TaxiError::from)?;

        Ok(Self {
            inner: Some(Pinger {
                client,
                endpoint: config.endpoint.clone(),
                token: obfuscated_token(),
                user_agent: user_agent(),
            }),
            pending: Mutex::new(Vec::new()),
        })
    }

    /// A client that never sends anything
    pub fn disabled() -> Self {
        Self {
            inner: None,
            pending: Mutex::new(Vec::new()),
        }
    }

    pub fn is_enabled(&self) -> bool {
        self.inner.is_some()
    }

    /// Fire a ping for `action` without waiting for it.
    /// Must be called from within a tokio runtime.
    pub fn ping(&self, action: &str) {
        let Some(pinger) = self.inner.clone() else {
            return;
        };
        let action = action.to_string();
        let handle = tokio::spawn(async move {
            if let Err(e) = pinger.send(&action).await {
                warn!("usage ping for {} failed: {}", action, e);
            }
        });

        if let Ok(mut pending) = self.pending.lock() {
            pending.retain(|h| !h.is_finished());
            pending.push(handle);
        }
    }

    /// Wait for outstanding pings. Each one is bounded by [`PING_TIMEOUT`].
    pub async fn flush(&self) {
        let handles = match self.pending.lock() {
            Ok(mut pending) => std::mem::take(&mut *pending),
            Err(_) => return,
        };
        for handle in handles {
            let _ = handle.await;
        }
    }
}

impl Pinger {
    async fn send(&self, action: &str) -> Result<()> {
        let response = self
            .client
            .get(&self.endpoint)
            .header("Foo", &self.token)
            .header("Action", action)
            .header(reqwest::header::USER_AGENT, &self.user_agent)
            .send()
            .await?;

        if response.status() != StatusCode::OK {
            debug!("usage ping for {} returned {}", action, response.status());
        }
        Ok(())
    }
}

/// Constant shared with the analytics collector
pub fn obfuscated_token() -> String {
    let m1: u64 = 3u64.pow(11);
    let m2: u64 = 7u64.pow(5);
    let m3 = m1 * m2;
    let m4 = m1 + m2;
    let m5 = m3 - m1;
    [m1, m2, m3, m4, m5].iter().map(|n| to_base36(*n)).collect()
}

fn to_base36(mut n: u64) -> String {
    const DIGITS: &[u8; 36] = b"0123456789abcdefghijklmnopqrstuvwxyz";
    if n == 0 {
        return "0".to_string();
    }
    let mut out = Vec::new();
    while n > 0 {
        out.push(DIGITS[(n % 36) as usize]);
        n /= 36;
    }
    out.reverse();
    String::from_utf8_lossy(&out).into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_to_base36() {
        assert_eq!(to_base36(0), "0");
        assert_eq!(to_base36(35), "z");
        assert_eq!(to_base36(36), "10");
        assert_eq!(to_base36(177147), "3sor");
    }

    #[test]
    fn test_token_is_stable() {
        let token = obfuscated_token();
        assert!(token.starts_with("3sor"));
        assert_eq!(token, obfuscated_token());
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[tokio::test]
    async fn test_disabled_client_is_noop() {
        let client = TelemetryClient::new(&TelemetryConfig {
            enabled: false,
            ..Default::default()
        })
        .unwrap();
        assert!(!client.is_enabled());
        client.ping("activate");
        client.flush().await;
    }

    #[tokio::test]
    async fn test_unreachable_endpoint_is_swallowed() {
        let client = TelemetryClient::new(&TelemetryConfig {
            enabled: true,
            endpoint: "http://127.0.0.1:9/".to_string(),
        })
        .unwrap();
        client.ping("automated_test");
        client.flush().await;
    }
}
