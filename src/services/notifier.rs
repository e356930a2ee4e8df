use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::watch;
use tracing::{debug, instrument};

/// Name of the cart change channel
pub const CART_CHANNEL: &str = "cartUpdated";

/// Callback invoked on every change pulse
pub type Listener = Arc<dyn Fn() + Send + Sync>;

/// Process-wide "cart changed, re-read" broadcast.
///
/// Pulses carry no payload. Listeners registered with [`ChangeNotifier::subscribe`]
/// run synchronously inside [`ChangeNotifier::publish`], in registration order
/// and outside the registry lock. Async consumers can await
/// [`ChangeNotifier::changes`] instead; that receiver sees a pulse counter and
/// may coalesce pulses.
#[derive(Clone)]
pub struct ChangeNotifier {
    inner: Arc<NotifierInner>,
}

struct NotifierInner {
    channel: String,
    listeners: Mutex<Vec<(u64, Listener)>>,
    next_id: AtomicU64,
    pulses: watch::Sender<u64>,
}

/// Registration handle; dropping it deregisters the listener
#[must_use = "dropping a Subscription deregisters its listener"]
pub struct Subscription {
    id: u64,
    inner: Weak<NotifierInner>,
}

impl ChangeNotifier {
    /// Create a notifier on the cart channel
    pub fn new() -> Self {
        Self::named(CART_CHANNEL)
    }

    /// Create a notifier on a named channel
    pub fn named(channel: impl Into<String>) -> Self {
        let (pulses, _) = watch::channel(0);
        Self {
            inner: Arc::new(NotifierInner {
                channel: channel.into(),
                listeners: Mutex::new(Vec::new()),
                next_id: AtomicU64::new(1),
                pulses,
            }),
        }
    }

    pub fn channel(&self) -> &str {
        &self.inner.channel
    }

    /// Register a listener until the returned subscription is dropped
    pub fn subscribe<F>(&self, listener: F) -> Subscription
    where
        F: Fn() + Send + Sync + 'static,
    {
        let id = self.inner.next_id.fetch_add(1, Ordering::Relaxed);
        self.inner.listeners().push((id, Arc::new(listener)));
        debug!(channel = %self.inner.channel, subscription_id = id, "Listener subscribed");
        Subscription {
            id,
            inner: Arc::downgrade(&self.inner),
        }
    }

    /// Signal every subscriber that the cart changed
    #[instrument(skip(self), fields(channel = %self.inner.channel))]
    pub fn publish(&self) {
        self.inner.pulses.send_modify(|count| *count += 1);

        let listeners: Vec<Listener> = self
            .inner
            .listeners()
            .iter()
            .map(|(_, listener)| Arc::clone(listener))
            .collect();

        debug!(listener_count = listeners.len(), "Publishing change pulse");
        for listener in listeners {
            listener();
        }
    }

    /// Receiver for async consumers; `changed().await` resolves after the next pulse
    pub fn changes(&self) -> watch::Receiver<u64> {
        self.inner.pulses.subscribe()
    }

    /// Number of pulses published so far
    pub fn pulse_count(&self) -> u64 {
        *self.inner.pulses.borrow()
    }

    pub fn listener_count(&self) -> usize {
        self.inner.listeners().len()
    }
}

impl Default for ChangeNotifier {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for ChangeNotifier {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ChangeNotifier")
            .field("channel", &self.inner.channel)
            .field("listener_count", &self.listener_count())
            .field("pulse_count", &self.pulse_count())
            .finish()
    }
}

impl NotifierInner {
    fn listeners(&self) -> MutexGuard<'_, Vec<(u64, Listener)>> {
        self.listeners.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Subscription {
    /// Deregister the listener now
    pub fn unsubscribe(self) {}

    pub fn id(&self) -> u64 {
        self.id
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        if let Some(inner) = self.inner.upgrade() {
            inner.listeners().retain(|(id, _)| *id != self.id);
            debug!(channel = %inner.channel, subscription_id = self.id, "Listener unsubscribed");
        }
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription").field("id", &self.id).finish()
    }
}
