//! The actor turn running on the current thread.
//!
//! While a handler executes, its actor's turn frame is installed in a
//! thread-local slot and removed again before the loop awaits anything, so
//! application code can look up the running actor without threading a
//! parameter through every call. Handlers also receive an explicit
//! [`Context`] that routes through the same frame.

use std::cell::RefCell;

use crate::actor::ActorRef;
use crate::behavior::{BehaviorBody, BehaviorUpdate};
use crate::error::{Error, Result};
use crate::system::ActorSystem;
use crate::txn::{DependencyToken, TxnState};
use crate::value::Value;

/// Per-turn state reachable from application code.
pub(crate) struct TurnFrame {
	actor: ActorRef,
	dependency: Option<DependencyToken>,
	spawned: Vec<ActorRef>,
	next: Option<BehaviorUpdate>,
}

/// What a finished turn asks the loop to apply.
pub(crate) struct TurnEffects {
	pub spawned: Vec<ActorRef>,
	pub next: Option<BehaviorUpdate>,
}

impl TurnFrame {
	pub(crate) fn new(actor: ActorRef, dependency: Option<DependencyToken>) -> Self {
		Self {
			actor,
			dependency,
			spawned: Vec::new(),
			next: None,
		}
	}

	pub(crate) fn into_effects(self) -> TurnEffects {
		TurnEffects {
			spawned: self.spawned,
			next: self.next,
		}
	}
}

thread_local! {
	static CURRENT_TURN: RefCell<Option<TurnFrame>> = const { RefCell::new(None) };
}

/// Guard that restores the previous frame on drop.
pub(crate) struct FrameGuard {
	prev: Option<Option<TurnFrame>>,
}

/// Installs `frame` as the running turn of this thread.
pub(crate) fn enter(frame: TurnFrame) -> FrameGuard {
	let prev = CURRENT_TURN.with(|slot| slot.borrow_mut().replace(frame));
	FrameGuard { prev: Some(prev) }
}

impl FrameGuard {
	/// Uninstalls the frame and hands it back.
	pub(crate) fn exit(mut self) -> TurnFrame {
		let prev = self.prev.take().flatten();
		let frame = CURRENT_TURN.with(|slot| std::mem::replace(&mut *slot.borrow_mut(), prev));
		frame.expect("turn frame installed by enter")
	}
}

impl Drop for FrameGuard {
	fn drop(&mut self) {
		if let Some(prev) = self.prev.take() {
			CURRENT_TURN.with(|slot| *slot.borrow_mut() = prev);
		}
	}
}

/// Runs `f` against the frame of the running turn, if any.
///
/// `f` must not call back into application code.
fn with_frame<R>(f: impl FnOnce(&mut TurnFrame) -> R) -> Option<R> {
	CURRENT_TURN.with(|slot| slot.borrow_mut().as_mut().map(f))
}

/// Returns the actor whose turn is running on this thread.
pub fn current_actor() -> Option<ActorRef> {
	with_frame(|frame| frame.actor.clone())
}

/// Like [`current_actor`], failing outside any turn.
pub fn try_current_actor() -> Result<ActorRef> {
	current_actor().ok_or(Error::NoRunningActor)
}

/// Returns `true` when the running turn is tentative.
pub fn is_tentative() -> bool {
	tentative_dependency().is_some()
}

pub(crate) fn tentative_dependency() -> Option<DependencyToken> {
	with_frame(|frame| frame.dependency.clone()).flatten()
}

/// Records `actor` as spawned during the running tentative turn. Hands the
/// actor back when there is no tentative turn to defer it to.
pub(crate) fn defer_spawn(actor: ActorRef) -> std::result::Result<(), ActorRef> {
	let mut pending = Some(actor);
	with_frame(|frame| {
		if frame.dependency.is_some() {
			frame.spawned.extend(pending.take());
		}
	});
	match pending {
		Some(actor) => Err(actor),
		None => Ok(()),
	}
}

/// Queues a become on the running turn. Returns `false` outside any turn.
pub(crate) fn push_become(update: BehaviorUpdate) -> bool {
	with_frame(|frame| {
		frame.next = Some(match frame.next.take() {
			Some(prev) => prev.then(update),
			None => update,
		});
	})
	.is_some()
}

/// Explicit view of the running turn, passed to every handler.
pub struct Context {
	actor: ActorRef,
}

impl Context {
	pub(crate) fn new(actor: ActorRef) -> Self {
		Self { actor }
	}

	/// The actor this turn belongs to.
	pub fn myself(&self) -> &ActorRef {
		&self.actor
	}

	pub fn system(&self) -> ActorSystem {
		self.actor.system()
	}

	/// Spawns a child actor. See [`ActorSystem::start`] for when it starts.
	pub fn spawn(&self, body: BehaviorBody, args: Vec<Value>) -> ActorRef {
		self.system().spawn(body, args)
	}

	pub fn send(&self, receiver: &ActorRef, args: Vec<Value>) -> Result<()> {
		self.system().send(receiver, args)
	}

	pub fn become_behavior(&self, update: BehaviorUpdate) -> Result<()> {
		self.system().become_behavior(update)
	}

	/// Keeps the current body and replaces its captured arguments.
	pub fn rearm(&self, args: Vec<Value>) -> Result<()> {
		self.become_behavior(BehaviorUpdate::same(args))
	}

	/// Token of the transaction this turn is contingent on.
	pub fn dependency(&self) -> Option<DependencyToken> {
		tentative_dependency()
	}

	pub fn is_tentative(&self) -> bool {
		is_tentative()
	}

	/// Returns `true` once this turn's dependency is known to have aborted.
	/// The turn will be rolled back whatever the handler does next.
	pub fn dependency_aborted(&self) -> bool {
		self.dependency().is_some_and(|dep| dep.state() == TxnState::Aborted)
	}
}
