use std::sync::OnceLock;

use crate::actor::ActorRef;
use crate::config::SystemConfig;

/// Worker pool that runs actor loops.
///
/// `submit` is fire-and-forget: the dispatcher drives [`ActorRef::run`] to
/// completion somewhere. A loop that is already running refuses a second
/// run, so dispatchers need not deduplicate.
pub trait Dispatcher: Send + Sync + 'static {
	fn submit(&self, actor: ActorRef);
}

/// Runs each submitted actor loop as a task on a Tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioDispatcher {
	handle: tokio::runtime::Handle,
}

impl TokioDispatcher {
	/// Uses the given runtime.
	pub fn new(handle: tokio::runtime::Handle) -> Self {
		Self { handle }
	}

	/// Uses the ambient runtime, or a process-wide fallback runtime built
	/// from `config` when called outside one.
	pub fn from_config(config: &SystemConfig) -> Self {
		Self::new(runtime_handle(config))
	}
}

impl Dispatcher for TokioDispatcher {
	fn submit(&self, actor: ActorRef) {
		tracing::trace!(actor = %actor.id(), "actor.dispatch.submit");
		drop(self.handle.spawn(actor.run()));
	}
}

fn runtime_handle(config: &SystemConfig) -> tokio::runtime::Handle {
	if let Ok(handle) = tokio::runtime::Handle::try_current() {
		return handle;
	}

	static GLOBAL_RT: OnceLock<tokio::runtime::Runtime> = OnceLock::new();
	let runtime = GLOBAL_RT.get_or_init(|| {
		tokio::runtime::Builder::new_multi_thread()
			.enable_all()
			.worker_threads(config.worker_threads)
			.thread_name(config.thread_name.clone())
			.build()
			.expect("failed to build stm-actor fallback tokio runtime")
	});
	runtime.handle().clone()
}
