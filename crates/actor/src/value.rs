//! Dynamic argument values carried by messages and behaviors.

use std::any::Any;
use std::fmt;
use std::sync::Arc;

use crate::actor::ActorRef;

/// One argument of a message or of a behavior's captured state.
///
/// Actors are untyped with respect to each other, so arguments are dynamic.
/// `Opaque` carries arbitrary shared application data; it compares by
/// identity, as do actor handles.
#[derive(Clone)]
pub enum Value {
	Nil,
	Bool(bool),
	Int(i64),
	Str(Arc<str>),
	List(Vec<Value>),
	Actor(ActorRef),
	Opaque(Arc<dyn Any + Send + Sync>),
}

impl Value {
	/// Wraps arbitrary shared data.
	pub fn opaque<T>(value: T) -> Self
	where
		T: Any + Send + Sync,
	{
		Self::Opaque(Arc::new(value))
	}

	pub fn is_nil(&self) -> bool {
		matches!(self, Self::Nil)
	}

	pub fn as_bool(&self) -> Option<bool> {
		match self {
			Self::Bool(b) => Some(*b),
			_ => None,
		}
	}

	pub fn as_int(&self) -> Option<i64> {
		match self {
			Self::Int(n) => Some(*n),
			_ => None,
		}
	}

	pub fn as_str(&self) -> Option<&str> {
		match self {
			Self::Str(s) => Some(s),
			_ => None,
		}
	}

	pub fn as_list(&self) -> Option<&[Value]> {
		match self {
			Self::List(items) => Some(items),
			_ => None,
		}
	}

	pub fn as_actor(&self) -> Option<&ActorRef> {
		match self {
			Self::Actor(actor) => Some(actor),
			_ => None,
		}
	}

	/// Borrows opaque data as `T`, if this is an opaque value of that type.
	pub fn downcast_ref<T: Any>(&self) -> Option<&T> {
		match self {
			Self::Opaque(data) => data.downcast_ref::<T>(),
			_ => None,
		}
	}
}

impl PartialEq for Value {
	fn eq(&self, other: &Self) -> bool {
		match (self, other) {
			(Self::Nil, Self::Nil) => true,
			(Self::Bool(a), Self::Bool(b)) => a == b,
			(Self::Int(a), Self::Int(b)) => a == b,
			(Self::Str(a), Self::Str(b)) => a == b,
			(Self::List(a), Self::List(b)) => a == b,
			(Self::Actor(a), Self::Actor(b)) => a == b,
			(Self::Opaque(a), Self::Opaque(b)) => Arc::ptr_eq(a, b),
			_ => false,
		}
	}
}

impl fmt::Debug for Value {
	fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
		match self {
			Self::Nil => f.write_str("nil"),
			Self::Bool(b) => write!(f, "{b}"),
			Self::Int(n) => write!(f, "{n}"),
			Self::Str(s) => write!(f, "{s:?}"),
			Self::List(items) => f.debug_list().entries(items).finish(),
			Self::Actor(actor) => write!(f, "{actor:?}"),
			Self::Opaque(_) => f.write_str("#<opaque>"),
		}
	}
}

impl From<bool> for Value {
	fn from(b: bool) -> Self {
		Self::Bool(b)
	}
}

impl From<i64> for Value {
	fn from(n: i64) -> Self {
		Self::Int(n)
	}
}

impl From<&str> for Value {
	fn from(s: &str) -> Self {
		Self::Str(Arc::from(s))
	}
}

impl From<String> for Value {
	fn from(s: String) -> Self {
		Self::Str(Arc::from(s))
	}
}

impl From<ActorRef> for Value {
	fn from(actor: ActorRef) -> Self {
		Self::Actor(actor)
	}
}

impl From<&ActorRef> for Value {
	fn from(actor: &ActorRef) -> Self {
		Self::Actor(actor.clone())
	}
}

impl From<Vec<Value>> for Value {
	fn from(items: Vec<Value>) -> Self {
		Self::List(items)
	}
}
