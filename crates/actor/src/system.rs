//! Actor system: spawn, send and become, routed through the transaction
//! manager and the running turn.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::actor::{ActorId, ActorRef};
use crate::behavior::{Behavior, BehaviorBody, BehaviorUpdate};
use crate::config::SystemConfig;
use crate::context;
use crate::dispatch::{Dispatcher, TokioDispatcher};
use crate::error::{Error, Result};
use crate::fault::ActorFault;
use crate::message::Message;
use crate::txn::{LocalTransactions, TransactionManager};
use crate::value::Value;

pub(crate) struct SystemShared {
	config: SystemConfig,
	dispatcher: Arc<dyn Dispatcher>,
	transactions: Arc<dyn TransactionManager>,
	cancel: CancellationToken,
	faults: broadcast::Sender<ActorFault>,
	next_actor_id: AtomicU64,
}

impl SystemShared {
	pub(crate) fn next_actor_id(&self) -> ActorId {
		ActorId::new(self.next_actor_id.fetch_add(1, Ordering::Relaxed))
	}

	pub(crate) fn cancel_token(&self) -> &CancellationToken {
		&self.cancel
	}

	pub(crate) fn submit(&self, actor: ActorRef) {
		self.dispatcher.submit(actor);
	}

	pub(crate) fn report_fault(&self, fault: ActorFault) {
		// No subscribers is the common case.
		let _ = self.faults.send(fault);
	}
}

/// Cloneable handle to one actor system.
#[derive(Clone)]
pub struct ActorSystem {
	shared: Arc<SystemShared>,
}

impl std::fmt::Debug for ActorSystem {
	fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
		f.debug_struct("ActorSystem")
			.field("config", &self.shared.config)
			.field("shut_down", &self.is_shut_down())
			.finish_non_exhaustive()
	}
}

impl Default for ActorSystem {
	fn default() -> Self {
		Self::new(SystemConfig::default())
	}
}

impl ActorSystem {
	/// Creates a system with the Tokio dispatcher and the thread-scoped
	/// [`LocalTransactions`] manager.
	pub fn new(config: SystemConfig) -> Self {
		Self::builder().config(config).build()
	}

	pub fn builder() -> ActorSystemBuilder {
		ActorSystemBuilder::default()
	}

	pub(crate) fn from_shared(shared: Arc<SystemShared>) -> Self {
		Self { shared }
	}

	pub fn config(&self) -> &SystemConfig {
		&self.shared.config
	}

	/// Creates an actor and starts it per [`Self::start`]. Never waits on the
	/// new actor.
	pub fn spawn(&self, body: BehaviorBody, args: Vec<Value>) -> ActorRef {
		let actor = ActorRef::new(Arc::clone(&self.shared), Behavior::new(body, args));
		self.start(actor.clone());
		actor
	}

	/// Starts an actor, first match wins:
	///
	/// 1. a transaction is running on this thread: started when it commits;
	/// 2. a tentative turn is running on this thread: started when that
	///    turn's dependency commits;
	/// 3. otherwise: submitted to the dispatcher now.
	pub fn start(&self, actor: ActorRef) {
		if self.shared.transactions.is_running() {
			tracing::trace!(actor = %actor.id(), "actor.start.deferred_to_transaction");
			self.shared.transactions.register_spawn(actor);
			return;
		}
		match context::defer_spawn(actor) {
			Ok(()) => tracing::trace!("actor.start.deferred_to_turn"),
			Err(actor) => self.shared.submit(actor),
		}
	}

	/// Enqueues a message.
	///
	/// The message depends on the transaction running on this thread, else on
	/// the dependency of the running tentative turn, else on nothing.
	pub fn send(&self, receiver: &ActorRef, args: Vec<Value>) -> Result<()> {
		if self.is_shut_down() {
			return Err(Error::Interrupted);
		}
		let dependency = self.shared.transactions.current_info().or_else(context::tentative_dependency);
		tracing::trace!(
			receiver = %receiver.id(),
			dependency = dependency.as_ref().map(|dep| dep.id()),
			"actor.send"
		);
		receiver.deliver(Message::new(receiver.clone(), args, dependency));
		Ok(())
	}

	/// Replaces the behavior of the running actor.
	///
	/// Inside a transaction the become is handed to the transaction manager
	/// and only takes effect if it commits. Otherwise it applies to the
	/// running actor once its handler returns.
	pub fn become_behavior(&self, update: BehaviorUpdate) -> Result<()> {
		let actor = context::try_current_actor()?;
		if self.shared.transactions.is_running() {
			tracing::trace!(actor = %actor.id(), "actor.become.deferred_to_transaction");
			self.shared.transactions.register_become(actor, update);
			return Ok(());
		}
		context::push_become(update);
		Ok(())
	}

	/// Subscribes to swallowed handler failures.
	pub fn subscribe_faults(&self) -> broadcast::Receiver<ActorFault> {
		self.shared.faults.subscribe()
	}

	/// Interrupts every actor of this system. Later sends fail with
	/// [`Error::Interrupted`].
	pub fn shutdown(&self) {
		tracing::debug!("actor.system.shutdown");
		self.shared.cancel.cancel();
	}

	pub fn is_shut_down(&self) -> bool {
		self.shared.cancel.is_cancelled()
	}
}

/// Builder for [`ActorSystem`].
#[derive(Default)]
pub struct ActorSystemBuilder {
	config: SystemConfig,
	dispatcher: Option<Arc<dyn Dispatcher>>,
	transactions: Option<Arc<dyn TransactionManager>>,
}

impl ActorSystemBuilder {
	#[must_use]
	pub fn config(mut self, config: SystemConfig) -> Self {
		self.config = config;
		self
	}

	#[must_use]
	pub fn dispatcher(mut self, dispatcher: Arc<dyn Dispatcher>) -> Self {
		self.dispatcher = Some(dispatcher);
		self
	}

	#[must_use]
	pub fn transactions(mut self, transactions: Arc<dyn TransactionManager>) -> Self {
		self.transactions = Some(transactions);
		self
	}

	pub fn build(self) -> ActorSystem {
		let dispatcher = self
			.dispatcher
			.unwrap_or_else(|| Arc::new(TokioDispatcher::from_config(&self.config)) as Arc<dyn Dispatcher>);
		let transactions = self
			.transactions
			.unwrap_or_else(|| Arc::new(LocalTransactions) as Arc<dyn TransactionManager>);
		let (faults, _) = broadcast::channel(self.config.fault_buffer.max(1));
		ActorSystem::from_shared(Arc::new(SystemShared {
			config: self.config,
			dispatcher,
			transactions,
			cancel: CancellationToken::new(),
			faults,
			next_actor_id: AtomicU64::new(1),
		}))
	}
}
