//! Actor handles and the per-actor cell shared between them.

use std::fmt;
use std::sync::Arc;
use std::sync::atomic::{AtomicU8, AtomicU64, Ordering};

use parking_lot::Mutex;
use tokio_util::sync::CancellationToken;

use crate::behavior::{Behavior, BehaviorUpdate};
use crate::error::Result;
use crate::inbox::Inbox;
use crate::message::Message;
use crate::system::{ActorSystem, SystemShared};
use crate::value::Value;

mod turn;

/// Identifier for logs and diagnostics. Actors are identified by handle
/// identity; ids are unique within one system.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ActorId(u64);

impl ActorId {
	pub(crate) const fn new(raw: u64) -> Self {
		Self(raw)
	}

	pub const fn get(self) -> u64 {
		self.0
	}
}

impl fmt::Display for ActorId {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "actor#{}", self.0)
	}
}

/// Observable lifecycle of one actor.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum ActorState {
	/// Created, loop not started yet.
	Idle,
	/// Loop running; idle in its inbox or in a turn without dependency.
	Running,
	/// Inside a turn whose effects depend on a pending transaction.
	Tentative,
	/// Loop exited after interruption.
	Terminated,
}

impl ActorState {
	const fn from_u8(raw: u8) -> Self {
		match raw {
			0 => Self::Idle,
			1 => Self::Running,
			2 => Self::Tentative,
			_ => Self::Terminated,
		}
	}
}

/// Turn counters for one actor.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ActorStats {
	/// Turns whose effects were kept.
	pub committed: u64,
	/// Tentative turns undone because their dependency aborted.
	pub rolled_back: u64,
	/// Handler failures swallowed by the loop.
	pub failures: u64,
}

#[derive(Debug, Default)]
struct StatCounters {
	committed: AtomicU64,
	rolled_back: AtomicU64,
	failures: AtomicU64,
}

pub(crate) struct ActorCell {
	id: ActorId,
	inbox: Inbox<Message>,
	/// Behavior the loop starts from; taken by the first run.
	initial: Mutex<Option<Behavior>>,
	/// Committed becomes that arrived while no turn of this actor was
	/// running on the committing thread; applied before the next turn.
	committed_become: Mutex<Option<BehaviorUpdate>>,
	state: AtomicU8,
	cancel: CancellationToken,
	counters: StatCounters,
	system: Arc<SystemShared>,
}

/// Cloneable handle to one actor.
#[derive(Clone)]
pub struct ActorRef {
	cell: Arc<ActorCell>,
}

impl ActorRef {
	pub(crate) fn new(system: Arc<SystemShared>, behavior: Behavior) -> Self {
		Self {
			cell: Arc::new(ActorCell {
				id: system.next_actor_id(),
				inbox: Inbox::new(),
				initial: Mutex::new(Some(behavior)),
				committed_become: Mutex::new(None),
				state: AtomicU8::new(ActorState::Idle as u8),
				cancel: system.cancel_token().child_token(),
				counters: StatCounters::default(),
				system,
			}),
		}
	}

	pub fn id(&self) -> ActorId {
		self.cell.id
	}

	pub fn state(&self) -> ActorState {
		ActorState::from_u8(self.cell.state.load(Ordering::Acquire))
	}

	fn set_state(&self, state: ActorState) {
		self.cell.state.store(state as u8, Ordering::Release);
	}

	/// Returns `true` while the actor is inside a tentative turn.
	pub fn is_tentative(&self) -> bool {
		self.state() == ActorState::Tentative
	}

	pub fn stats(&self) -> ActorStats {
		let counters = &self.cell.counters;
		ActorStats {
			committed: counters.committed.load(Ordering::Acquire),
			rolled_back: counters.rolled_back.load(Ordering::Acquire),
			failures: counters.failures.load(Ordering::Acquire),
		}
	}

	/// Messages queued and not yet taken by the loop.
	pub fn pending(&self) -> usize {
		self.cell.inbox.len()
	}

	pub fn system(&self) -> ActorSystem {
		ActorSystem::from_shared(Arc::clone(&self.cell.system))
	}

	/// Sends a message to this actor. See [`ActorSystem::send`].
	pub fn send(&self, args: Vec<Value>) -> Result<()> {
		self.system().send(self, args)
	}

	/// Stops this actor's loop at its next suspension point. Messages sent
	/// afterwards stay queued with no consumer.
	pub fn interrupt(&self) {
		self.cell.cancel.cancel();
	}

	/// Queues a committed become for the next turn boundary.
	pub(crate) fn apply_committed_become(&self, update: BehaviorUpdate) {
		let mut slot = self.cell.committed_become.lock();
		*slot = Some(match slot.take() {
			Some(prev) => prev.then(update),
			None => update,
		});
	}

	fn take_committed_become(&self) -> Option<BehaviorUpdate> {
		self.cell.committed_become.lock().take()
	}

	pub(crate) fn deliver(&self, message: Message) {
		self.cell.inbox.push(message);
	}
}

impl PartialEq for ActorRef {
	fn eq(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.cell, &other.cell)
	}
}

impl Eq for ActorRef {}

impl fmt::Debug for ActorRef {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "ActorRef({})", self.cell.id)
	}
}
