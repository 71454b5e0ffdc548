//! Server-reported quota telemetry and its observer bus.
//!
//! Whenever a response carries the rate-limit trio of headers, the client parses them
//! into a [`QuotaSnapshot`] and publishes it through the [`QuotaBus`] exactly once.
//! Snapshots are forwarded, never stored; a UI indicator is a downstream subscriber,
//! not part of this crate.

// self
use crate::_prelude::*;

/// Server-reported quota state parsed from response headers.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct QuotaSnapshot {
	/// Maximum requests allowed per server-defined window.
	pub limit: u64,
	/// Requests left in the current server window.
	pub remaining: u64,
	/// Raw server reset marker; the format is server-defined, so it is carried opaque.
	pub reset_at: Option<String>,
}

/// Observer notified for every published [`QuotaSnapshot`].
pub trait QuotaObserver
where
	Self: Send + Sync,
{
	/// Receives one server quota snapshot.
	fn on_snapshot(&self, snapshot: &QuotaSnapshot);
}

/// Decoupled broadcast channel for quota snapshots.
///
/// The bus is owned by the client that publishes into it; subscribers are held behind
/// `Arc` so a dropped subscriber simply stops being called. Publishing with no
/// subscribers is a no-op.
#[derive(Clone, Default)]
pub struct QuotaBus(Arc<RwLock<Vec<Arc<dyn QuotaObserver>>>>);
impl QuotaBus {
	/// Registers an observer for future snapshots.
	pub fn subscribe(&self, observer: Arc<dyn QuotaObserver>) {
		self.0.write().push(observer);
	}

	/// Broadcasts one snapshot to every registered observer.
	pub fn publish(&self, snapshot: &QuotaSnapshot) {
		for observer in self.0.read().iter() {
			observer.on_snapshot(snapshot);
		}
	}
}
impl Debug for QuotaBus {
	fn fmt(&self, f: &mut Formatter) -> FmtResult {
		f.debug_tuple("QuotaBus").field(&self.0.read().len()).finish()
	}
}
