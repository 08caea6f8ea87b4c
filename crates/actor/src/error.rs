//! Error types surfaced to callers of the actor API.

use thiserror::Error;

/// Failures that reach the caller of an actor operation.
///
/// Everything else that can go wrong inside a turn (handler failures, the
/// dependency of a tentative turn aborting, interruption while waiting) is
/// absorbed at the actor loop boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum Error {
	/// Requested the current actor, or issued a become, outside any actor turn.
	#[error("no actor running")]
	NoRunningActor,
	/// The calling context was interrupted before the operation completed.
	#[error("interrupted")]
	Interrupted,
}

/// Result type for actor operations.
pub type Result<T> = std::result::Result<T, Error>;
