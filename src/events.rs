//! Rate-limit event registry shared between the client and UI-level subscribers.
//!
//! Every HTTP 429 observed by an [`ApiClient`](crate::client::ApiClient) is broadcast to the
//! listeners registered on its [`RateLimitEvents`]. Listeners run synchronously, in registration
//! order, on the task that received the rejection and before the error is returned to the caller.
//! The registry is cheap to clone; clones share the same listener set, so one registry can be
//! handed to several clients and to whatever component renders the "slow down" banner.

// std
use std::sync::{
	Weak,
	atomic::{AtomicU64, Ordering},
};
// self
use crate::{_prelude::*, rate_limit::RateLimitInfo};

type Listener = Arc<dyn Fn(&RateLimitInfo) + Send + Sync>;

#[derive(Default)]
struct Registry {
	next_id: AtomicU64,
	listeners: Mutex<BTreeMap<u64, Listener>>,
}

/// Listener set notified whenever the backend rejects a request with HTTP 429.
#[derive(Clone, Default)]
pub struct RateLimitEvents(Arc<Registry>);
impl RateLimitEvents {
	/// Registers `listener` and returns the handle that removes it again.
	///
	/// Dropping the [`Subscription`] keeps the listener registered; call
	/// [`Subscription::unsubscribe`] to remove it.
	pub fn subscribe<F>(&self, listener: F) -> Subscription
	where
		F: 'static + Fn(&RateLimitInfo) + Send + Sync,
	{
		let id = self.0.next_id.fetch_add(1, Ordering::Relaxed);

		self.0.listeners.lock().insert(id, Arc::new(listener));

		Subscription { id, registry: Arc::downgrade(&self.0) }
	}

	/// Invokes every registered listener with `info` and returns how many were called.
	///
	/// The listener set is snapshotted before the first call, so listeners may subscribe or
	/// unsubscribe while being notified; such changes apply to the next emission. A panicking
	/// listener propagates to the caller and the remaining listeners are skipped.
	pub fn emit(&self, info: &RateLimitInfo) -> usize {
		let snapshot = self.0.listeners.lock().values().cloned().collect::<Vec<_>>();

		for listener in &snapshot {
			listener(info);
		}

		snapshot.len()
	}

	/// Number of registered listeners.
	pub fn len(&self) -> usize {
		self.0.listeners.lock().len()
	}

	/// Whether no listener is registered.
	pub fn is_empty(&self) -> bool {
		self.0.listeners.lock().is_empty()
	}
}
impl Debug for RateLimitEvents {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_struct("RateLimitEvents").field("listeners", &self.len()).finish()
	}
}

/// Handle returned by [`RateLimitEvents::subscribe`].
#[derive(Debug)]
pub struct Subscription {
	id: u64,
	registry: Weak<Registry>,
}
impl Subscription {
	/// Removes the listener; returns `false` when it was already gone.
	pub fn unsubscribe(self) -> bool {
		self.registry
			.upgrade()
			.map(|registry| registry.listeners.lock().remove(&self.id).is_some())
			.unwrap_or(false)
	}
}
