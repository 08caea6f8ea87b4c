use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::Ordering;

use tokio_util::sync::CancellationToken;

use super::{ActorRef, ActorState};
use crate::behavior::Behavior;
use crate::context::{self, Context, TurnEffects, TurnFrame};
use crate::fault::{ActorFault, panic_message};
use crate::message::Message;
use crate::txn::{DependencyToken, Resolution};
use crate::value::Value;

/// Bookkeeping of one tentative turn. Created when a message with a
/// dependency is taken, consumed when the dependency resolves.
struct TentativeScope {
	dependency: DependencyToken,
	/// Behavior to restore if the dependency aborts.
	rollback: Behavior,
}

enum TurnEnd {
	Committed,
	RolledBack,
	Interrupted,
}

impl ActorRef {
	/// Runs this actor's loop until it is interrupted.
	///
	/// Only the first call runs the loop; any other call returns immediately,
	/// so one actor never executes two turns at once.
	pub async fn run(self) {
		let Some(mut behavior) = self.cell.initial.lock().take() else {
			tracing::warn!(actor = %self.id(), "actor.run.already_started");
			return;
		};
		self.set_state(ActorState::Running);
		tracing::debug!(actor = %self.id(), "actor.start");

		let cancel = self.cell.cancel.clone();
		loop {
			let message = tokio::select! {
				biased;
				_ = cancel.cancelled() => break,
				message = self.cell.inbox.recv() => message,
			};
			if let TurnEnd::Interrupted = self.turn(&mut behavior, message, &cancel).await {
				break;
			}
		}

		self.set_state(ActorState::Terminated);
		tracing::debug!(actor = %self.id(), pending = self.pending(), "actor.terminated");
	}

	async fn turn(&self, behavior: &mut Behavior, message: Message, cancel: &CancellationToken) -> TurnEnd {
		if let Some(update) = self.take_committed_become() {
			tracing::trace!(actor = %self.id(), "actor.turn.committed_become");
			*behavior = update.apply_to(behavior);
		}
		let (args, dependency) = message.into_parts();
		let scope = dependency.map(|dependency| TentativeScope {
			dependency,
			rollback: behavior.clone(),
		});
		if scope.is_some() {
			self.set_state(ActorState::Tentative);
		}

		let frame = TurnFrame::new(self.clone(), scope.as_ref().map(|s| s.dependency.clone()));
		let (frame, outcome) = self.invoke(behavior, frame, &args);
		let TurnEffects { spawned, next } = frame.into_effects();
		if let Some(update) = next {
			*behavior = update.apply_to(behavior);
		}
		if let Err(message) = outcome {
			self.record_failure(message, scope.is_some());
		}

		let Some(scope) = scope else {
			self.commit(spawned);
			return TurnEnd::Committed;
		};

		let resolution = tokio::select! {
			biased;
			_ = cancel.cancelled() => {
				tracing::warn!(
					actor = %self.id(),
					dependency = scope.dependency.id(),
					discarded_spawns = spawned.len(),
					"actor.turn.interrupted"
				);
				return TurnEnd::Interrupted;
			}
			resolution = scope.dependency.wait_until_resolved() => resolution,
		};
		self.set_state(ActorState::Running);

		match resolution {
			Resolution::Committed => {
				tracing::debug!(actor = %self.id(), dependency = scope.dependency.id(), "actor.turn.commit");
				self.commit(spawned);
				TurnEnd::Committed
			}
			Resolution::Aborted => {
				tracing::debug!(
					actor = %self.id(),
					dependency = scope.dependency.id(),
					discarded_spawns = spawned.len(),
					"actor.turn.rollback"
				);
				*behavior = scope.rollback;
				self.cell.counters.rolled_back.fetch_add(1, Ordering::AcqRel);
				TurnEnd::RolledBack
			}
		}
	}

	/// Produces the handler from the current behavior and applies it to the
	/// message with this turn's frame installed.
	fn invoke(&self, behavior: &Behavior, frame: TurnFrame, args: &[Value]) -> (TurnFrame, Result<(), String>) {
		let ctx = Context::new(self.clone());
		let guard = context::enter(frame);
		let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
			let handler = behavior.instantiate();
			handler(&ctx, args)
		}));
		let frame = guard.exit();

		let outcome = match outcome {
			Ok(Ok(())) => Ok(()),
			Ok(Err(err)) => Err(format!("{err:#}")),
			Err(payload) => Err(panic_message(payload.as_ref())),
		};
		(frame, outcome)
	}

	/// Deferred spawns become real.
	fn commit(&self, spawned: Vec<ActorRef>) {
		for child in spawned {
			self.cell.system.submit(child);
		}
		self.cell.counters.committed.fetch_add(1, Ordering::AcqRel);
	}

	// TODO: swallowing keeps the actor alive but loses the failure for the
	// sender; route faults back once a reply channel exists.
	fn record_failure(&self, message: String, tentative: bool) {
		tracing::error!(actor = %self.id(), tentative, error = %message, "actor.handler.failed");
		self.cell.counters.failures.fetch_add(1, Ordering::AcqRel);
		self.cell.system.report_fault(ActorFault {
			actor: self.id(),
			message,
			tentative,
		});
	}
}
