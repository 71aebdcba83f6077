//! Online/offline status.
//!
//! [`NetworkStatus`] holds the current connectivity flag and tells
//! subscribers when it flips. Something has to feed it: [`spawn_monitor`]
//! polls a [`ConnectivityProbe`] on an interval, and callers that learn
//! about connectivity some other way can call [`NetworkStatus::set_online`]
//! directly.

use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError, Weak};
use std::time::Duration;

use async_trait::async_trait;
use futures::future::join_all;
use reqwest::Client;
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info};

use crate::config::ClientConfig;
use crate::error::ApiError;

type Callback = Arc<dyn Fn(bool) + Send + Sync>;

#[derive(Default)]
struct Registry {
    next_id: u64,
    callbacks: BTreeMap<u64, Callback>,
}

struct Inner {
    state: watch::Sender<bool>,
    registry: Mutex<Registry>,
}

// ============================================================================
// Network Status
// ============================================================================

/// Process-wide connectivity flag with change notification.
///
/// Cloning is cheap; clones observe and update the same state.
#[derive(Clone)]
pub struct NetworkStatus {
    inner: Arc<Inner>,
}

impl NetworkStatus {
    /// Creates a status with the given initial value.
    pub fn new(online: bool) -> Self {
        let (state, _) = watch::channel(online);
        Self {
            inner: Arc::new(Inner {
                state,
                registry: Mutex::new(Registry::default()),
            }),
        }
    }

    /// Current connectivity.
    pub fn is_online(&self) -> bool {
        *self.inner.state.borrow()
    }

    /// Registers `callback` to run on every transition.
    ///
    /// The registration lasts until the returned [`Subscription`] is
    /// unsubscribed or dropped, and removing it leaves every other
    /// registration in place.
    pub fn on_change<F>(&self, callback: F) -> Subscription
    where
        F: Fn(bool) + Send + Sync + 'static,
    {
        let mut registry = self.registry();
        let id = registry.next_id;
        registry.next_id += 1;
        registry.callbacks.insert(id, Arc::new(callback));
        debug!(id, subscribers = registry.callbacks.len(), "Network subscriber added");

        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Async view of the flag for `changed().await` style consumers.
    pub fn subscribe(&self) -> watch::Receiver<bool> {
        self.inner.state.subscribe()
    }

    /// Records the current connectivity.
    ///
    /// Callbacks fire only if the value changed. Returns true on a change.
    pub fn set_online(&self, online: bool) -> bool {
        let changed = self.inner.state.send_if_modified(|current| {
            if *current == online {
                false
            } else {
                *current = online;
                true
            }
        });

        if changed {
            info!(online, "Network status changed");
            // Snapshot so callbacks can (un)subscribe without deadlocking.
            let callbacks: Vec<(u64, Callback)> = self
                .registry()
                .callbacks
                .iter()
                .map(|(id, callback)| (*id, callback.clone()))
                .collect();
            for (id, callback) in callbacks {
                // Skip registrations removed by an earlier callback in this round.
                let live = self.registry().callbacks.contains_key(&id);
                if live {
                    callback(online);
                }
            }
        }

        changed
    }

    /// Number of live callback registrations.
    pub fn subscriber_count(&self) -> usize {
        self.registry().callbacks.len()
    }

    /// Probes once and records the result.
    pub async fn refresh(&self, probe: &dyn ConnectivityProbe) -> bool {
        let online = probe.check().await;
        self.set_online(online);
        online
    }

    fn registry(&self) -> std::sync::MutexGuard<'_, Registry> {
        self.inner
            .registry
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

impl Default for NetworkStatus {
    /// Starts online, matching a freshly loaded page.
    fn default() -> Self {
        Self::new(true)
    }
}

impl fmt::Debug for NetworkStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NetworkStatus")
            .field("online", &self.is_online())
            .field("subscribers", &self.subscriber_count())
            .finish()
    }
}

// ============================================================================
// Subscription
// ============================================================================

/// Handle to one [`NetworkStatus::on_change`] registration.
#[must_use = "dropping a Subscription unregisters its callback"]
pub struct Subscription {
    id: u64,
    inner: Weak<Inner>,
}

impl Subscription {
    /// Removes this registration.
    ///
    /// Once this returns the callback is not started again, including by a
    /// dispatch already in progress. A call already running on another
    /// thread is allowed to finish.
    pub fn unsubscribe(self) {
        // Drop does the work.
    }

    /// Keeps the callback registered for as long as the status lives.
    pub fn detach(mut self) {
        self.inner = Weak::new();
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            let mut registry = inner.registry.lock().unwrap_or_else(PoisonError::into_inner);
            registry.callbacks.remove(&self.id);
            debug!(id = self.id, "Network subscriber removed");
        }
    }
}

impl fmt::Debug for Subscription {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}

// ============================================================================
// Connectivity Probe
// ============================================================================

/// Answers "are we online right now?".
#[async_trait]
pub trait ConnectivityProbe: Send + Sync {
    /// Returns true if the network is reachable.
    async fn check(&self) -> bool;
}

/// Probes by sending `HEAD` to a URL. Any HTTP response, whatever its
/// status, counts as online; only transport failures count as offline.
#[derive(Debug, Clone)]
pub struct HttpProbe {
    client: Client,
    url: String,
}

/// Default probe timeout.
pub const DEFAULT_PROBE_TIMEOUT: Duration = Duration::from_secs(3);

impl HttpProbe {
    /// Probes `url` with the given timeout.
    pub fn new(url: impl Into<String>, timeout: Duration) -> Result<Self, ApiError> {
        let client = Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| ApiError::Unknown(format!("Failed to build probe client: {e}")))?;
        Ok(Self {
            client,
            url: url.into(),
        })
    }

    /// Probes the API base URL.
    pub fn for_config(config: &ClientConfig) -> Result<Self, ApiError> {
        Self::new(config.base_url.as_str(), DEFAULT_PROBE_TIMEOUT.min(config.timeout))
    }
}

#[async_trait]
impl ConnectivityProbe for HttpProbe {
    async fn check(&self) -> bool {
        match self.client.head(&self.url).send().await {
            Ok(response) => {
                debug!(url = %self.url, status = %response.status(), "Probe reached host");
                true
            }
            Err(e) => {
                debug!(url = %self.url, error = %e, "Probe failed");
                false
            }
        }
    }
}

/// Online if any of its probes is. All probes run concurrently.
#[derive(Clone, Default)]
pub struct AnyProbe {
    probes: Vec<Arc<dyn ConnectivityProbe>>,
}

impl AnyProbe {
    /// Creates an empty set, which always reports offline.
    pub fn new() -> Self {
        Self::default()
    }

    /// Adds a probe.
    #[must_use]
    pub fn with(mut self, probe: Arc<dyn ConnectivityProbe>) -> Self {
        self.probes.push(probe);
        self
    }

    /// Number of probes in the set.
    pub fn len(&self) -> usize {
        self.probes.len()
    }

    /// Returns true if the set has no probes.
    pub fn is_empty(&self) -> bool {
        self.probes.is_empty()
    }
}

impl fmt::Debug for AnyProbe {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("AnyProbe").field("probes", &self.probes.len()).finish()
    }
}

#[async_trait]
impl ConnectivityProbe for AnyProbe {
    async fn check(&self) -> bool {
        let results = join_all(self.probes.iter().map(|p| p.check())).await;
        results.into_iter().any(|online| online)
    }
}

/// Polls `probe` every `interval` and feeds the result into `status`.
///
/// The first probe runs immediately. Abort the returned handle to stop.
pub fn spawn_monitor(
    status: NetworkStatus,
    probe: Arc<dyn ConnectivityProbe>,
    interval: Duration,
) -> JoinHandle<()> {
    tokio::spawn(async move {
        let mut ticker = tokio::time::interval(interval);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        loop {
            ticker.tick().await;
            status.refresh(probe.as_ref()).await;
        }
    })
}
