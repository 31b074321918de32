//! Built-in defaults (layer 1)

use serde::{Deserialize, Serialize};

use mm_protocol::DEFAULT_PORT;

/// Built-in default configuration values
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BuiltinDefaults {
    /// Listen address (default: 127.0.0.1)
    pub host: String,

    /// Listen port (default: 1234)
    pub port: u16,

    /// Log filter used when `RUST_LOG` is unset (default: "info")
    pub log_level: String,

    /// Hard limit on one argument extraction (default: 120)
    pub extractor_timeout_seconds: u64,

    /// SIGTERM grace period before SIGKILL (default: 5)
    pub extractor_termination_grace_seconds: u64,
}

impl Default for BuiltinDefaults {
    fn default() -> Self {
        Self {
            host: "127.0.0.1".to_string(),
            port: DEFAULT_PORT,
            log_level: "info".to_string(),
            extractor_timeout_seconds: 120,
            extractor_termination_grace_seconds: 5,
        }
    }
}

impl BuiltinDefaults {
    /// Convert to JSON Value for merging
    pub fn to_value(&self) -> serde_json::Value {
        serde_json::json!({
            "host": self.host,
            "port": self.port,
            "log_level": self.log_level,
            "extractor": {
                "program": null,
                "args": [],
                "timeout_seconds": self.extractor_timeout_seconds,
                "termination_grace_seconds": self.extractor_termination_grace_seconds
            }
        })
    }
}
