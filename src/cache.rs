//! Two-tier cache: client credentials from the secret store feeding a short-lived token.
//!
//! Both tiers keep one optional value in a generation-tagged slot and serialize refreshes
//! behind an async mutex. A caller that queued behind an in-flight refresh compares the slot
//! generation it observed on entry with the current one, and reuses the fresh value instead
//! of issuing a second external call.

pub mod credentials;
pub mod token;

pub use credentials::*;
pub use token::*;

// self
use crate::_prelude::*;

/// Optional cached value plus a counter bumped on every replacement or invalidation.
#[derive(Debug)]
pub(crate) struct Slot<T> {
	value: Option<T>,
	generation: u64,
}
impl<T> Default for Slot<T> {
	fn default() -> Self {
		Self { value: None, generation: 0 }
	}
}

/// Slot guarded for concurrent readers plus the single-flight refresh lock.
#[derive(Debug)]
pub(crate) struct SharedSlot<T> {
	slot: RwLock<Slot<T>>,
	refresh: AsyncMutex<()>,
}
impl<T> SharedSlot<T>
where
	T: Clone,
{
	/// Returns the cached value and the generation it belongs to.
	pub(crate) fn snapshot(&self) -> (Option<T>, u64) {
		let slot = self.slot.read();

		(slot.value.clone(), slot.generation)
	}

	pub(crate) fn value(&self) -> Option<T> {
		self.slot.read().value.clone()
	}

	/// Replaces the value wholesale.
	pub(crate) fn store(&self, value: T) {
		let mut slot = self.slot.write();

		slot.value = Some(value);
		slot.generation += 1;
	}

	pub(crate) fn clear(&self) {
		let mut slot = self.slot.write();

		slot.value = None;
		slot.generation += 1;
	}

	/// Waits for exclusive refresh rights.
	pub(crate) async fn lock_refresh(&self) -> async_lock::MutexGuard<'_, ()> {
		self.refresh.lock().await
	}
}
impl<T> Default for SharedSlot<T> {
	fn default() -> Self {
		Self { slot: RwLock::new(Slot::default()), refresh: AsyncMutex::new(()) }
	}
}
