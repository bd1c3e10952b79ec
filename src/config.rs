//! # Configuration Management
//!
//! Centralized configuration for envelope encoding, sealing and delivery.
//!
//! ## Configuration Sources
//! - TOML files via `from_file()`
//! - Direct instantiation with defaults
//! - Environment overrides via `from_env()`
//!
//! ## Defaults
//! - Schema id `1`, compression on (zstd), encryption off
//! - Batch handler mode with a 1024-byte chunk size when streaming

use crate::error::{EnvelopeError, Result};
use crate::utils::compression::{CompressionKind, DEFAULT_ZSTD_LEVEL};
use crate::utils::timeout;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fs::File;
use std::io::Read;
use std::path::Path;
use std::time::Duration;
use tracing::Level;

/// Magic tag identifying an envelope ("BJ")
pub const MAGIC_BYTES: [u8; 2] = [0x42, 0x4A];

/// Schema id used when the caller does not pick one
pub const DEFAULT_SCHEMA_ID: u32 = 1;

/// Chunk size used in stream mode when none is configured
pub const DEFAULT_CHUNK_SIZE: usize = 1024;

/// Upper bound on decompressed payloads (16 MB)
pub const MAX_PAYLOAD_SIZE: usize = 16 * 1024 * 1024;

/// Upper bound a parser accepts for the metadata length field (64 KB)
pub const MAX_METADATA_SIZE: usize = 64 * 1024;

/// Upper bound on a single framed chunk on stream transports
pub const MAX_FRAME_SIZE: usize = MAX_PAYLOAD_SIZE + MAX_METADATA_SIZE;

/// Whether to compress by default
pub const ENABLE_COMPRESSION: bool = true;

/// Whether to encrypt by default
pub const ENABLE_ENCRYPTION: bool = false;

/// How serialized envelopes are handed to a channel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Deserialize, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum HandlerMode {
    /// The whole envelope as one message
    #[default]
    Batch,
    /// Fixed-size chunks
    Stream,
}

/// Top-level configuration consumed by the orchestrator and stream sessions
#[derive(Debug, Clone, Deserialize, Serialize, Default)]
pub struct EnvelopeConfig {
    /// Encoding defaults and optional schema
    #[serde(default)]
    pub codec: CodecConfig,

    /// Encryption settings
    #[serde(default)]
    pub security: SecurityConfig,

    /// Batch/stream handling
    #[serde(default)]
    pub handler: HandlerConfig,

    /// Channel settings
    #[serde(default)]
    pub transport: TransportConfig,

    /// Logging configuration
    #[serde(default)]
    pub logging: LoggingConfig,
}

impl EnvelopeConfig {
    /// Load configuration from a TOML file
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self> {
        let mut file = File::open(path)
            .map_err(|e| EnvelopeError::Config(format!("Failed to open config file: {e}")))?;

        let mut contents = String::new();
        file.read_to_string(&mut contents)
            .map_err(|e| EnvelopeError::Config(format!("Failed to read config file: {e}")))?;

        Self::from_toml(&contents)
    }

    /// Load configuration from TOML string
    pub fn from_toml(content: &str) -> Result<Self> {
        toml::from_str::<Self>(content)
            .map_err(|e| EnvelopeError::Config(format!("Failed to parse TOML: {e}")))
    }

    /// Load configuration from environment variables on top of the defaults
    pub fn from_env() -> Result<Self> {
        let mut config = Self::default();

        if let Ok(id) = std::env::var("ENVELOPE_SCHEMA_ID") {
            config.codec.schema_id = id
                .parse::<u32>()
                .map_err(|e| EnvelopeError::Config(format!("ENVELOPE_SCHEMA_ID: {e}")))?;
        }

        if let Ok(flag) = std::env::var("ENVELOPE_COMPRESS") {
            config.codec.compress = parse_flag("ENVELOPE_COMPRESS", &flag)?;
        }

        if let Ok(flag) = std::env::var("ENVELOPE_ENCRYPT") {
            config.security.encrypt = parse_flag("ENVELOPE_ENCRYPT", &flag)?;
        }

        if let Ok(key) = std::env::var("ENVELOPE_SECURITY_KEY") {
            config.security.key_hex = Some(key);
        }

        if let Ok(mode) = std::env::var("ENVELOPE_HANDLER_MODE") {
            config.handler.mode = match mode.to_ascii_lowercase().as_str() {
                "batch" => HandlerMode::Batch,
                "stream" => HandlerMode::Stream,
                other => {
                    return Err(EnvelopeError::Config(format!(
                        "ENVELOPE_HANDLER_MODE: unknown mode '{other}'"
                    )))
                }
            };
        }

        if let Ok(size) = std::env::var("ENVELOPE_CHUNK_SIZE") {
            config.handler.chunk_size = size
                .parse::<usize>()
                .map_err(|e| EnvelopeError::Config(format!("ENVELOPE_CHUNK_SIZE: {e}")))?;
        }

        if let Ok(addr) = std::env::var("ENVELOPE_ADDRESS") {
            config.transport.address = addr;
        }

        Ok(config)
    }

    /// Apply overrides to the default configuration
    pub fn default_with_overrides<F>(mutator: F) -> Self
    where
        F: FnOnce(&mut Self),
    {
        let mut config = Self::default();
        mutator(&mut config);
        config
    }

    /// Generate example configuration file content
    pub fn example_config() -> String {
        toml::to_string_pretty(&Self::default())
            .unwrap_or_else(|_| String::from("# Failed to generate example config"))
    }

    /// Save configuration to a file
    pub fn save_to_file<P: AsRef<Path>>(&self, path: P) -> Result<()> {
        let content = toml::to_string_pretty(self)
            .map_err(|e| EnvelopeError::Config(format!("Failed to serialize config: {e}")))?;

        std::fs::write(path, content)
            .map_err(|e| EnvelopeError::Config(format!("Failed to write config file: {e}")))?;

        Ok(())
    }

    /// Validate the configuration for common issues and misconfigurations
    ///
    /// Returns a list of validation errors. Empty list means configuration is valid.
    pub fn validate(&self) -> Vec<String> {
        let mut errors = self.validate_pipeline();
        errors.extend(self.transport.validate());
        errors.extend(self.logging.validate());
        errors
    }

    /// Validate only the sections an `Orchestrator` consumes: codec, security and handler
    pub fn validate_pipeline(&self) -> Vec<String> {
        let mut errors = Vec::new();
        errors.extend(self.codec.validate());
        errors.extend(self.security.validate());
        errors.extend(self.handler.validate());
        errors
    }

    /// Validate and return Result - convenience method
    pub fn validate_strict(&self) -> Result<()> {
        into_result(self.validate())
    }

    /// [`validate_pipeline`](Self::validate_pipeline) as a `Result`
    pub fn validate_pipeline_strict(&self) -> Result<()> {
        into_result(self.validate_pipeline())
    }
}

fn into_result(errors: Vec<String>) -> Result<()> {
    if errors.is_empty() {
        Ok(())
    } else {
        Err(EnvelopeError::Config(format!(
            "Configuration validation failed:\n  - {}",
            errors.join("\n  - ")
        )))
    }
}

/// `host:port` with a non-empty host and a numeric port
fn is_host_port(address: &str) -> bool {
    match address.rsplit_once(':') {
        Some((host, port)) => !host.is_empty() && port.parse::<u16>().is_ok(),
        None => false,
    }
}

fn parse_flag(name: &str, raw: &str) -> Result<bool> {
    match raw.to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(EnvelopeError::Config(format!(
            "{name}: expected a boolean, got '{other}'"
        ))),
    }
}

/// Encoding defaults
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct CodecConfig {
    /// Schema id stamped into header and metadata
    pub schema_id: u32,

    /// Whether payloads are compressed
    pub compress: bool,

    /// Algorithm used when `compress` is set
    pub algorithm: CompressionKind,

    /// Zstd compression level (ignored for lz4)
    pub compression_level: i32,

    /// Optional JSON-Schema document values are validated against
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub schema: Option<Value>,
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            schema_id: DEFAULT_SCHEMA_ID,
            compress: ENABLE_COMPRESSION,
            algorithm: CompressionKind::Zstd,
            compression_level: DEFAULT_ZSTD_LEVEL,
            schema: None,
        }
    }
}

impl CodecConfig {
    /// Validate codec configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.compress
            && self.algorithm == CompressionKind::Zstd
            && !(1..=22).contains(&self.compression_level)
        {
            errors.push(format!(
                "Invalid compression level: {} (valid range: 1-22)",
                self.compression_level
            ));
        }

        if let Some(schema) = &self.schema {
            if !schema.is_object() {
                errors.push("Schema must be a table/object".to_string());
            }
        }

        errors
    }
}

/// Encryption settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct SecurityConfig {
    /// Whether payloads are sealed by default
    pub encrypt: bool,

    /// 32-byte key as hex; a fresh random key is generated when absent
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub key_hex: Option<String>,
}

impl Default for SecurityConfig {
    fn default() -> Self {
        Self {
            encrypt: ENABLE_ENCRYPTION,
            key_hex: None,
        }
    }
}

impl SecurityConfig {
    /// Validate security configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if let Some(ref key) = self.key_hex {
            match hex::decode(key) {
                Ok(bytes) if bytes.len() == 32 => {}
                Ok(bytes) => errors.push(format!(
                    "Security key must be 32 bytes, got {}",
                    bytes.len()
                )),
                Err(_) => errors.push("Security key is not valid hex".to_string()),
            }
        }

        errors
    }
}

/// Batch/stream handling
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct HandlerConfig {
    /// Batch (one message) or stream (fixed-size chunks)
    pub mode: HandlerMode,

    /// Chunk size in bytes for stream mode
    pub chunk_size: usize,
}

impl Default for HandlerConfig {
    fn default() -> Self {
        Self {
            mode: HandlerMode::Batch,
            chunk_size: DEFAULT_CHUNK_SIZE,
        }
    }
}

impl HandlerConfig {
    /// Validate handler configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.chunk_size == 0 {
            errors.push("Chunk size must be greater than 0".to_string());
        } else if self.chunk_size > MAX_FRAME_SIZE {
            errors.push(format!(
                "Chunk size too large: {} bytes (maximum: {MAX_FRAME_SIZE})",
                self.chunk_size
            ));
        }

        errors
    }
}

/// Channel settings
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct TransportConfig {
    /// Peer address for `TcpChannel::connect` (e.g. "127.0.0.1:9400")
    pub address: String,

    /// Timeout for connection attempts
    #[serde(with = "duration_serde")]
    pub connect_timeout: Duration,

    /// Timeout for a single chunk send
    #[serde(with = "duration_serde")]
    pub send_timeout: Duration,

    /// Capacity of in-process channel queues
    pub queue_capacity: usize,

    /// Largest frame accepted by the stream codec
    pub max_frame_size: usize,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            address: String::from("127.0.0.1:9400"),
            connect_timeout: timeout::DEFAULT_TIMEOUT,
            send_timeout: timeout::DEFAULT_TIMEOUT,
            queue_capacity: 64,
            max_frame_size: MAX_FRAME_SIZE,
        }
    }
}

impl TransportConfig {
    /// Validate transport configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.address.is_empty() {
            errors.push("Transport address cannot be empty".to_string());
        } else if !is_host_port(&self.address) {
            errors.push(format!(
                "Invalid transport address format: '{}' (expected 'host:port', e.g. '127.0.0.1:9400')",
                self.address
            ));
        }

        if self.connect_timeout.as_millis() < 100 {
            errors.push("Connect timeout too short (minimum: 100ms)".to_string());
        }

        if self.send_timeout.as_millis() < 10 {
            errors.push("Send timeout too short (minimum: 10ms)".to_string());
        }

        if self.queue_capacity == 0 {
            errors.push("Queue capacity must be greater than 0".to_string());
        }

        if self.max_frame_size == 0 {
            errors.push("Max frame size cannot be 0".to_string());
        }

        errors
    }
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Application name for logs
    pub app_name: String,

    /// Log level
    #[serde(with = "log_level_serde")]
    pub log_level: Level,

    /// Whether to use JSON formatting for logs
    pub json_format: bool,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            app_name: String::from("envelope-protocol"),
            log_level: Level::INFO,
            json_format: false,
        }
    }
}

impl LoggingConfig {
    /// Validate logging configuration
    pub fn validate(&self) -> Vec<String> {
        let mut errors = Vec::new();

        if self.app_name.is_empty() {
            errors.push("Application name cannot be empty".to_string());
        } else if self.app_name.len() > 64 {
            errors.push(format!(
                "Application name too long: {} characters (maximum: 64)",
                self.app_name.len()
            ));
        }

        errors
    }
}

/// Helper module for Duration serialization/deserialization
mod duration_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let millis = duration.as_millis() as u64;
        millis.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}

/// Helper module for tracing::Level serialization/deserialization
mod log_level_serde {
    use serde::{Deserialize, Deserializer, Serialize, Serializer};
    use std::str::FromStr;
    use tracing::Level;

    pub fn serialize<S>(level: &Level, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        let level_str = match *level {
            Level::TRACE => "trace",
            Level::DEBUG => "debug",
            Level::INFO => "info",
            Level::WARN => "warn",
            Level::ERROR => "error",
        };
        level_str.serialize(serializer)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Level, D::Error>
    where
        D: Deserializer<'de>,
    {
        let level_str = String::deserialize(deserializer)?;
        Level::from_str(&level_str)
            .map_err(|_| serde::de::Error::custom(format!("Invalid log level: {level_str}")))
    }
}
