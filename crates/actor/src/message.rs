use std::fmt;

use crate::actor::ActorRef;
use crate::txn::DependencyToken;
use crate::value::Value;

/// Immutable envelope delivered to an actor's inbox.
///
/// A message with a dependency is processed as a tentative turn: its effects
/// stand only if that transaction commits.
pub(crate) struct Message {
	receiver: ActorRef,
	args: Vec<Value>,
	dependency: Option<DependencyToken>,
}

impl Message {
	pub(crate) fn new(receiver: ActorRef, args: Vec<Value>, dependency: Option<DependencyToken>) -> Self {
		Self { receiver, args, dependency }
	}

	pub(crate) fn into_parts(self) -> (Vec<Value>, Option<DependencyToken>) {
		(self.args, self.dependency)
	}
}

impl fmt::Debug for Message {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		f.debug_struct("Message")
			.field("receiver", &self.receiver.id())
			.field("args", &self.args)
			.field("dependency", &self.dependency.as_ref().map(DependencyToken::id))
			.finish()
	}
}
