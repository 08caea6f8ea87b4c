use std::any::Any;

use crate::actor::ActorId;

/// A handler failure that was swallowed by an actor loop.
///
/// Published for observation only: the actor has already moved on to its
/// dependency check and will keep processing messages.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActorFault {
	pub actor: ActorId,
	pub message: String,
	/// Whether the failing turn was tentative.
	pub tentative: bool,
}

/// Extracts a readable message from a panic payload.
pub(crate) fn panic_message(payload: &(dyn Any + Send)) -> String {
	if let Some(s) = payload.downcast_ref::<&'static str>() {
		return (*s).to_string();
	}
	if let Some(s) = payload.downcast_ref::<String>() {
		return s.clone();
	}
	"<unknown panic>".to_string()
}

#[cfg(test)]
mod tests {
	use super::panic_message;

	#[test]
	fn extracts_static_str_payload() {
		let payload = std::panic::catch_unwind(|| panic!("boom-str")).unwrap_err();
		assert_eq!(panic_message(payload.as_ref()), "boom-str");
	}

	#[test]
	fn extracts_string_payload() {
		let payload = std::panic::catch_unwind(|| panic!("{}", String::from("boom-string"))).unwrap_err();
		assert_eq!(panic_message(payload.as_ref()), "boom-string");
	}

	#[test]
	fn falls_back_for_foreign_payloads() {
		let payload = std::panic::catch_unwind(|| std::panic::panic_any(42u8)).unwrap_err();
		assert_eq!(panic_message(payload.as_ref()), "<unknown panic>");
	}
}
