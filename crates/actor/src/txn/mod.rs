//! Interface to the transaction manager.
//!
//! The actor runtime never decides whether a transaction commits. It asks the
//! manager whether one is running on the calling thread, hands it deferred
//! spawns and becomes, and waits on [`DependencyToken`]s for outcomes.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::watch;

use crate::actor::ActorRef;
use crate::behavior::BehaviorUpdate;

pub mod local;

pub use local::{LocalTransactions, Transaction, TransactionGuard};

/// Lifecycle of one transaction as seen through its token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TxnState {
	Pending,
	Committed,
	Aborted,
}

/// Final outcome of a transaction. There is no pending case: it is only
/// produced once the outcome is known.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
	Committed,
	Aborted,
}

impl From<Resolution> for TxnState {
	fn from(resolution: Resolution) -> Self {
		match resolution {
			Resolution::Committed => Self::Committed,
			Resolution::Aborted => Self::Aborted,
		}
	}
}

static NEXT_TOKEN_ID: AtomicU64 = AtomicU64::new(1);

struct TokenInner {
	id: u64,
	state: watch::Sender<TxnState>,
}

/// Shared handle to one transaction's eventual outcome.
///
/// Owned and resolved by the transaction manager. Actors only read it and
/// wait on it. Clones refer to the same transaction; identity is checked with
/// [`DependencyToken::same`].
#[derive(Clone)]
pub struct DependencyToken {
	inner: Arc<TokenInner>,
}

impl Default for DependencyToken {
	fn default() -> Self {
		Self::new()
	}
}

impl DependencyToken {
	/// Creates a pending token.
	pub fn new() -> Self {
		let (state, _) = watch::channel(TxnState::Pending);
		Self {
			inner: Arc::new(TokenInner {
				id: NEXT_TOKEN_ID.fetch_add(1, Ordering::Relaxed),
				state,
			}),
		}
	}

	pub fn id(&self) -> u64 {
		self.inner.id
	}

	pub fn state(&self) -> TxnState {
		*self.inner.state.borrow()
	}

	pub fn is_resolved(&self) -> bool {
		self.state() != TxnState::Pending
	}

	pub fn is_committed(&self) -> bool {
		self.state() == TxnState::Committed
	}

	/// Returns `true` when both handles refer to the same transaction.
	pub fn same(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.inner, &other.inner)
	}

	/// Publishes the outcome. Only the first resolution takes effect; returns
	/// whether this call was it.
	pub fn resolve(&self, resolution: Resolution) -> bool {
		let next = TxnState::from(resolution);
		self.inner.state.send_if_modified(|state| {
			if *state == TxnState::Pending {
				*state = next;
				true
			} else {
				false
			}
		})
	}

	/// Waits until the transaction has committed or aborted.
	pub async fn wait_until_resolved(&self) -> Resolution {
		let mut rx = self.inner.state.subscribe();
		// The sender lives in `inner`, which `self` keeps alive.
		match rx.wait_for(|state| *state != TxnState::Pending).await {
			Ok(state) if *state == TxnState::Committed => Resolution::Committed,
			Ok(_) => Resolution::Aborted,
			Err(_) => Resolution::Aborted,
		}
	}
}

impl fmt::Debug for DependencyToken {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("DependencyToken")
			.field("id", &self.id())
			.field("state", &self.state())
			.finish()
	}
}

/// Transaction manager as seen by the actor runtime.
///
/// "Running" always means running on the calling thread.
pub trait TransactionManager: Send + Sync + 'static {
	/// Returns the token of the transaction running on this thread.
	fn current_info(&self) -> Option<DependencyToken>;

	fn is_running(&self) -> bool {
		self.current_info().is_some()
	}

	/// Defers starting `actor` until the running transaction commits.
	fn register_spawn(&self, actor: ActorRef);

	/// Defers a become of `actor` until the running transaction commits.
	/// The become applies to `actor` whichever thread commits.
	fn register_become(&self, actor: ActorRef, update: BehaviorUpdate);
}
