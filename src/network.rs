//! Reachability checks.
//!
//! The orchestrator asks a [`Connectivity`] whether the device is online
//! before a full sync when the caller opted to skip offline runs. The check
//! is advisory: an "online" answer does not guarantee the remote will
//! accept requests.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;

use tracing::debug;

use crate::remote::RemoteError;

/// Boxed future returned by [`Connectivity::is_online`].
pub type OnlineFuture<'a> = Pin<Box<dyn Future<Output = bool> + Send + 'a>>;

/// Reports whether the network is currently reachable.
pub trait Connectivity: Send + Sync + std::fmt::Debug {
    fn is_online(&self) -> OnlineFuture<'_>;
}

/// Probes a URL with a short `HEAD` request.
///
/// Any HTTP response, including an error status, counts as online. Only a
/// transport failure or timeout counts as offline.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: reqwest::Client,
    url: String,
}

impl HttpProbe {
    /// Default probe timeout.
    pub const TIMEOUT: Duration = Duration::from_secs(3);

    /// Probe `url` with [`Self::TIMEOUT`].
    ///
    /// # Errors
    ///
    /// Returns an error if the HTTP client cannot be built.
    pub fn new(url: impl Into<String>) -> Result<Self, RemoteError> {
        let client = reqwest::Client::builder().timeout(Self::TIMEOUT).build()?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }
}

impl Connectivity for HttpProbe {
    fn is_online(&self) -> OnlineFuture<'_> {
        Box::pin(async move {
            match self.client.head(&self.url).send().await {
                Ok(response) => {
                    debug!(url = %self.url, status = %response.status(), "Connectivity probe answered");
                    true
                }
                Err(e) => {
                    debug!(url = %self.url, error = %e, "Connectivity probe failed");
                    false
                }
            }
        })
    }
}

/// Fixed answer, switchable at runtime. Clones share the flag.
#[derive(Debug, Clone)]
pub struct StaticConnectivity {
    online: Arc<AtomicBool>,
}

impl StaticConnectivity {
    #[must_use]
    pub fn online() -> Self {
        Self {
            online: Arc::new(AtomicBool::new(true)),
        }
    }

    #[must_use]
    pub fn offline() -> Self {
        Self {
            online: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn set_online(&self, online: bool) {
        self.online.store(online, Ordering::SeqCst);
    }
}

impl Connectivity for StaticConnectivity {
    fn is_online(&self) -> OnlineFuture<'_> {
        let online = self.online.load(Ordering::SeqCst);
        Box::pin(async move { online })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_static_connectivity_toggles() {
        let net = StaticConnectivity::offline();
        assert!(!net.is_online().await);

        let shared = net.clone();
        shared.set_online(true);
        assert!(net.is_online().await);
    }

    #[tokio::test]
    async fn test_probe_of_unroutable_host_is_offline() {
        // Port 9 on localhost is the discard service; nothing listens there in CI.
        let probe = HttpProbe::new("http://127.0.0.1:9/").unwrap();
        assert!(!probe.is_online().await);
    }

    #[test]
    fn test_new_builds_client_with_timeout() {
        let probe = HttpProbe::new("https://example.invalid").unwrap();
        assert_eq!(probe.url, "https://example.invalid");
        assert_eq!(HttpProbe::TIMEOUT, Duration::from_secs(3));
    }
}
