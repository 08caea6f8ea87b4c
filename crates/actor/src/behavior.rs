//! Two-stage actor behaviors.
//!
//! A [`Behavior`] pairs a body with the arguments captured for it. Evaluating
//! the body against those arguments yields the [`Handler`] that is applied to
//! one incoming message. `become` swaps the pair, optionally keeping the body
//! and only replacing the captured arguments.

use std::fmt;
use std::sync::Arc;

use crate::context::Context;
use crate::value::Value;

/// Handler produced for one message: receives the turn context and the
/// message arguments.
pub type Handler = Box<dyn FnOnce(&Context, &[Value]) -> anyhow::Result<()> + Send>;

type BodyFn = dyn Fn(&[Value]) -> Handler + Send + Sync;

/// Boxes a closure as a [`Handler`].
pub fn handler<F>(f: F) -> Handler
where
	F: FnOnce(&Context, &[Value]) -> anyhow::Result<()> + Send + 'static,
{
	Box::new(f)
}

/// Callable that turns captured arguments into a message handler.
#[derive(Clone)]
pub struct BehaviorBody(Arc<BodyFn>);

impl BehaviorBody {
	pub fn new<F>(f: F) -> Self
	where
		F: Fn(&[Value]) -> Handler + Send + Sync + 'static,
	{
		Self(Arc::new(f))
	}

	/// Returns `true` when both bodies are the same callable.
	pub fn same(&self, other: &Self) -> bool {
		Arc::ptr_eq(&self.0, &other.0)
	}
}

impl fmt::Debug for BehaviorBody {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		write!(f, "BehaviorBody({:p})", Arc::as_ptr(&self.0))
	}
}

/// The body and captured state an actor uses for its next message.
#[derive(Clone, Debug)]
pub struct Behavior {
	body: BehaviorBody,
	args: Vec<Value>,
}

impl Behavior {
	pub fn new(body: BehaviorBody, args: Vec<Value>) -> Self {
		Self { body, args }
	}

	pub fn body(&self) -> &BehaviorBody {
		&self.body
	}

	pub fn args(&self) -> &[Value] {
		&self.args
	}

	/// Evaluates the body against the captured arguments.
	pub fn instantiate(&self) -> Handler {
		(self.body.0)(&self.args)
	}

	/// Returns `true` when the body is the same callable and the captured
	/// arguments are equal.
	pub fn same(&self, other: &Self) -> bool {
		self.body.same(&other.body) && self.args == other.args
	}
}

/// A become request.
///
/// A `None` body is the "unchanged" sentinel: the actor keeps its current
/// body and only the captured arguments are replaced.
#[derive(Clone, Debug)]
pub struct BehaviorUpdate {
	body: Option<BehaviorBody>,
	args: Vec<Value>,
}

impl BehaviorUpdate {
	/// Replaces both body and captured arguments.
	pub fn to(body: BehaviorBody, args: Vec<Value>) -> Self {
		Self { body: Some(body), args }
	}

	/// Keeps the current body, replaces the captured arguments.
	pub fn same(args: Vec<Value>) -> Self {
		Self { body: None, args }
	}

	pub fn new(body: Option<BehaviorBody>, args: Vec<Value>) -> Self {
		Self { body, args }
	}

	pub fn keeps_body(&self) -> bool {
		self.body.is_none()
	}

	/// Folds a later update issued in the same turn into this one.
	pub fn then(self, next: BehaviorUpdate) -> BehaviorUpdate {
		match next.body {
			Some(_) => next,
			None => Self {
				body: self.body,
				args: next.args,
			},
		}
	}

	/// Resolves this update against the behavior it replaces.
	pub fn apply_to(self, current: &Behavior) -> Behavior {
		let body = self.body.unwrap_or_else(|| current.body.clone());
		Behavior::new(body, self.args)
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	fn noop_body() -> BehaviorBody {
		BehaviorBody::new(|_captured| handler(|_ctx, _args| Ok(())))
	}

	#[test]
	fn sentinel_update_keeps_body() {
		let body = noop_body();
		let current = Behavior::new(body.clone(), vec![Value::Int(1)]);

		let next = BehaviorUpdate::same(vec![Value::Int(2)]).apply_to(&current);
		assert!(next.body().same(&body));
		assert_eq!(next.args(), &[Value::Int(2)]);
	}

	#[test]
	fn full_update_replaces_body() {
		let current = Behavior::new(noop_body(), vec![]);
		let replacement = noop_body();

		let next = BehaviorUpdate::to(replacement.clone(), vec![Value::Nil]).apply_to(&current);
		assert!(next.body().same(&replacement));
		assert!(!next.body().same(current.body()));
	}

	#[test]
	fn sentinel_after_full_update_keeps_new_body() {
		let current = Behavior::new(noop_body(), vec![]);
		let replacement = noop_body();

		let folded = BehaviorUpdate::to(replacement.clone(), vec![Value::Int(1)]).then(BehaviorUpdate::same(vec![Value::Int(2)]));
		let next = folded.apply_to(&current);
		assert!(next.body().same(&replacement));
		assert_eq!(next.args(), &[Value::Int(2)]);
	}

	#[test]
	fn instantiate_passes_captured_args() {
		let seen = std::sync::Arc::new(parking_lot::Mutex::new(Vec::new()));
		let probe = std::sync::Arc::clone(&seen);
		let body = BehaviorBody::new(move |captured| {
			probe.lock().extend_from_slice(captured);
			handler(|_ctx, _args| Ok(()))
		});

		let _handler = Behavior::new(body, vec![Value::from("state")]).instantiate();
		assert_eq!(*seen.lock(), vec![Value::from("state")]);
	}
}
