//! Thread-scoped transaction manager.
//!
//! A [`Transaction`] is "running" on a thread while one of its guards is
//! alive there. Its owner decides the outcome with [`Transaction::commit`] or
//! [`Transaction::abort`]; validation and retry belong to the caller.

use std::cell::RefCell;
use std::marker::PhantomData;
use std::sync::Arc;

use parking_lot::Mutex;

use super::{DependencyToken, Resolution, TransactionManager};
use crate::actor::ActorRef;
use crate::behavior::BehaviorUpdate;
use crate::context;
use crate::system::ActorSystem;

#[derive(Default)]
struct TxnRecord {
	token: DependencyToken,
	spawns: Mutex<Vec<ActorRef>>,
	becomes: Mutex<Vec<(ActorRef, BehaviorUpdate)>>,
}

thread_local! {
	static RUNNING: RefCell<Vec<Arc<TxnRecord>>> = const { RefCell::new(Vec::new()) };
}

fn innermost() -> Option<Arc<TxnRecord>> {
	RUNNING.with(|stack| stack.borrow().last().cloned())
}

/// [`TransactionManager`] backed by the transactions entered on the calling
/// thread. The innermost entered transaction is the running one.
#[derive(Debug, Default, Clone, Copy)]
pub struct LocalTransactions;

impl TransactionManager for LocalTransactions {
	fn current_info(&self) -> Option<DependencyToken> {
		innermost().map(|record| record.token.clone())
	}

	fn register_spawn(&self, actor: ActorRef) {
		match innermost() {
			Some(record) => record.spawns.lock().push(actor),
			None => tracing::warn!(actor = %actor.id(), "txn.register_spawn.no_transaction"),
		}
	}

	fn register_become(&self, actor: ActorRef, update: BehaviorUpdate) {
		match innermost() {
			Some(record) => record.becomes.lock().push((actor, update)),
			None => tracing::warn!(actor = %actor.id(), "txn.register_become.no_transaction"),
		}
	}
}

/// One transaction of the [`LocalTransactions`] manager.
///
/// Dropping a transaction that was neither committed nor aborted aborts it.
pub struct Transaction {
	record: Arc<TxnRecord>,
	system: ActorSystem,
}

impl Transaction {
	/// Begins a pending transaction whose deferred spawns start on `system`.
	pub fn begin(system: &ActorSystem) -> Self {
		let record = Arc::new(TxnRecord::default());
		tracing::trace!(txn = record.token.id(), "txn.begin");
		Self {
			record,
			system: system.clone(),
		}
	}

	/// The token messages sent inside this transaction depend on.
	pub fn info(&self) -> &DependencyToken {
		&self.record.token
	}

	/// Makes this the running transaction of the calling thread until the
	/// guard drops.
	pub fn enter(&self) -> TransactionGuard<'_> {
		RUNNING.with(|stack| stack.borrow_mut().push(Arc::clone(&self.record)));
		TransactionGuard {
			record: Arc::clone(&self.record),
			_txn: PhantomData,
		}
	}

	/// Runs `f` with this transaction running.
	pub fn run<R>(&self, f: impl FnOnce() -> R) -> R {
		let _guard = self.enter();
		f()
	}

	/// Commits: resolves the token, hands each registered become to the
	/// actor that issued it, then starts registered spawns.
	///
	/// Effects follow the context of the committing thread. With another
	/// transaction running here they move into that transaction. Otherwise
	/// spawns go through [`ActorSystem::start`], and a become joins the
	/// issuing actor's turn if it is the one running here, or is applied
	/// before that actor's next turn. Committing inside a tentative turn
	/// therefore ties both to that turn's own dependency.
	pub fn commit(self) {
		if !self.record.token.resolve(Resolution::Committed) {
			return;
		}
		let becomes = std::mem::take(&mut *self.record.becomes.lock());
		let spawns = std::mem::take(&mut *self.record.spawns.lock());
		tracing::debug!(
			txn = self.record.token.id(),
			becomes = becomes.len(),
			spawns = spawns.len(),
			"txn.commit"
		);

		let enclosing = innermost();
		for (actor, update) in becomes {
			if let Some(enclosing) = &enclosing {
				enclosing.becomes.lock().push((actor, update));
			} else if context::current_actor().is_some_and(|running| running == actor) {
				context::push_become(update);
			} else {
				actor.apply_committed_become(update);
			}
		}
		for actor in spawns {
			self.system.start(actor);
		}
	}

	/// Aborts: resolves the token and drops registered effects.
	pub fn abort(self) {
		self.discard();
	}

	fn discard(&self) {
		if self.record.token.resolve(Resolution::Aborted) {
			let spawns = std::mem::take(&mut *self.record.spawns.lock());
			let becomes = std::mem::take(&mut *self.record.becomes.lock());
			tracing::debug!(
				txn = self.record.token.id(),
				becomes = becomes.len(),
				spawns = spawns.len(),
				"txn.abort"
			);
		}
	}
}

impl Drop for Transaction {
	fn drop(&mut self) {
		self.discard();
	}
}

/// Keeps a [`Transaction`] running on the current thread.
///
/// Neither `Send` nor outliving its transaction: the running transaction is
/// per thread, and a transaction cannot be committed while entered.
pub struct TransactionGuard<'a> {
	record: Arc<TxnRecord>,
	_txn: PhantomData<(&'a Transaction, *const ())>,
}

impl Drop for TransactionGuard<'_> {
	fn drop(&mut self) {
		RUNNING.with(|stack| {
			let mut stack = stack.borrow_mut();
			if let Some(pos) = stack.iter().rposition(|entry| Arc::ptr_eq(entry, &self.record)) {
				stack.remove(pos);
			}
		});
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn running_only_while_entered() {
		let manager = LocalTransactions;
		let system = ActorSystem::builder().dispatcher(Arc::new(NoopDispatcher)).build();
		let txn = Transaction::begin(&system);

		assert!(!manager.is_running());
		{
			let _guard = txn.enter();
			assert!(manager.current_info().is_some_and(|info| info.same(txn.info())));
		}
		assert!(!manager.is_running());
	}

	#[test]
	fn innermost_transaction_wins() {
		let manager = LocalTransactions;
		let system = ActorSystem::builder().dispatcher(Arc::new(NoopDispatcher)).build();
		let outer = Transaction::begin(&system);
		let inner = Transaction::begin(&system);

		outer.run(|| {
			inner.run(|| {
				assert!(manager.current_info().is_some_and(|info| info.same(inner.info())));
			});
			assert!(manager.current_info().is_some_and(|info| info.same(outer.info())));
		});
	}

	#[test]
	fn dropping_pending_transaction_aborts() {
		let system = ActorSystem::builder().dispatcher(Arc::new(NoopDispatcher)).build();
		let txn = Transaction::begin(&system);
		let token = txn.info().clone();
		drop(txn);
		assert_eq!(token.state(), crate::txn::TxnState::Aborted);
	}

	struct NoopDispatcher;

	impl crate::dispatch::Dispatcher for NoopDispatcher {
		fn submit(&self, _actor: ActorRef) {}
	}
}
