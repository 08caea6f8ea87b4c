//! Actor system configuration.

use serde::Deserialize;
use thiserror::Error;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
	#[error("failed to parse actor system config: {0}")]
	Parse(#[from] toml::de::Error),
	#[error("invalid value for '{field}': {reason}")]
	Invalid { field: &'static str, reason: &'static str },
}

/// Settings for an [`ActorSystem`](crate::ActorSystem).
///
/// ```toml
/// worker_threads = 4
/// thread_name = "stm-actor"
/// fault_buffer = 256
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct SystemConfig {
	/// Worker threads of the fallback runtime, used when the system is built
	/// outside a Tokio runtime. Only the first fallback runtime is ever built.
	pub worker_threads: usize,
	/// Thread name of the fallback runtime.
	pub thread_name: String,
	/// Capacity of the fault broadcast channel.
	pub fault_buffer: usize,
}

impl Default for SystemConfig {
	fn default() -> Self {
		Self {
			worker_threads: 2,
			thread_name: "stm-actor".to_string(),
			fault_buffer: 128,
		}
	}
}

impl SystemConfig {
	/// Parses and validates a TOML document. Missing keys take defaults.
	pub fn from_toml_str(src: &str) -> Result<Self, ConfigError> {
		let config: Self = toml::from_str(src)?;
		config.validate()?;
		Ok(config)
	}

	pub fn validate(&self) -> Result<(), ConfigError> {
		if self.worker_threads == 0 {
			return Err(ConfigError::Invalid {
				field: "worker_threads",
				reason: "must be > 0",
			});
		}
		if self.fault_buffer == 0 {
			return Err(ConfigError::Invalid {
				field: "fault_buffer",
				reason: "must be > 0",
			});
		}
		Ok(())
	}
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn empty_document_yields_defaults() {
		assert_eq!(SystemConfig::from_toml_str("").unwrap(), SystemConfig::default());
	}

	#[test]
	fn partial_document_overrides_given_keys() {
		let config = SystemConfig::from_toml_str("worker_threads = 8\nthread_name = \"bank\"").unwrap();
		assert_eq!(config.worker_threads, 8);
		assert_eq!(config.thread_name, "bank");
		assert_eq!(config.fault_buffer, 128);
	}

	#[test]
	fn unknown_keys_are_rejected() {
		let err = SystemConfig::from_toml_str("mailbox_capacity = 4").unwrap_err();
		assert!(matches!(err, ConfigError::Parse(_)));
	}

	#[test]
	fn zero_sizes_are_rejected() {
		let err = SystemConfig::from_toml_str("fault_buffer = 0").unwrap_err();
		assert!(matches!(err, ConfigError::Invalid { field: "fault_buffer", .. }));
	}
}
