//! Actors integrated with optimistic transactions.
//!
//! An actor owns an inbox and a behavior and processes one message at a
//! time. Messages sent from inside a running transaction, or from a turn that
//! is itself contingent on one, carry that transaction's [`DependencyToken`].
//! The receiving actor runs such a message as a *tentative turn*: it handles
//! the message right away, then waits for the transaction's outcome. On
//! commit the turn's becomes and spawns stand; on abort the actor's behavior
//! is restored and the actors it spawned are never started.
//!
//! ```no_run
//! use stm_actor::{ActorSystem, BehaviorBody, SystemConfig, Value, handler};
//!
//! let system = ActorSystem::new(SystemConfig::default());
//! let echo = BehaviorBody::new(|_captured| {
//! 	handler(|ctx, args| {
//! 		if let Some(reply_to) = args.first().and_then(Value::as_actor) {
//! 			ctx.send(reply_to, args[1..].to_vec())?;
//! 		}
//! 		Ok(())
//! 	})
//! });
//! let actor = system.spawn(echo, Vec::new());
//! # let _ = actor;
//! ```

/// Actor handles, lifecycle and the turn loop.
pub mod actor;
/// Two-stage behaviors and become requests.
pub mod behavior;
/// System configuration.
pub mod config;
/// The turn running on the current thread.
pub mod context;
/// Worker pools that run actor loops.
pub mod dispatch;
/// Caller-facing errors.
pub mod error;
/// Swallowed handler failures.
pub mod fault;
/// Per-actor message queue.
pub mod inbox;
mod message;
/// Actor system facade.
pub mod system;
/// Transaction manager interface and the thread-scoped manager.
pub mod txn;
/// Dynamic argument values.
pub mod value;

pub use actor::{ActorId, ActorRef, ActorState, ActorStats};
pub use behavior::{Behavior, BehaviorBody, BehaviorUpdate, Handler, handler};
pub use config::{ConfigError, SystemConfig};
pub use context::{Context, current_actor, is_tentative, try_current_actor};
pub use dispatch::{Dispatcher, TokioDispatcher};
pub use error::{Error, Result};
pub use fault::ActorFault;
pub use system::{ActorSystem, ActorSystemBuilder};
pub use txn::{DependencyToken, LocalTransactions, Resolution, Transaction, TransactionManager, TxnState};
pub use value::Value;
