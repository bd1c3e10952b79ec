//! # Orchestrator
//!
//! Sequences the pipeline in both directions:
//!
//! ```text
//! encode: value ─▶ validate ─▶ serialize + compress ─▶ seal payload ─▶ Envelope
//! decode: Envelope ─▶ open payload ─▶ decompress + deserialize ─▶ value
//! ```
//!
//! The orchestrator owns the key material and the compiled rule set for its
//! whole lifetime. Both are read-only after construction, so one instance can
//! be shared (e.g. behind an `Arc`) by any number of concurrent tasks.
//!
//! Whether a payload is sealed is not recorded in the envelope. Callers pass
//! `decrypt = true` to [`Orchestrator::decode`] exactly when they encoded
//! with encryption.

use crate::config::{EnvelopeConfig, HandlerMode, DEFAULT_SCHEMA_ID};
use crate::core::chunker::Chunker;
use crate::core::envelope::Envelope;
use crate::error::Result;
use crate::protocol::reassembly;
use crate::protocol::schema::{RuleSet, SchemaValidator};
use crate::utils::compression::CompressionKind;
use crate::utils::crypto::SecurityManager;
use crate::utils::metrics::{Metrics, MetricsSnapshot, Timer};
use bytes::Bytes;
use serde_json::Value;
use tracing::{debug, info, instrument, warn};

/// Per-call encoding choices
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EncodeOptions {
    pub schema_id: u32,
    /// `None` leaves the payload uncompressed
    pub compression: Option<CompressionKind>,
    /// Seal the payload after compression
    pub encrypt: bool,
}

impl Default for EncodeOptions {
    fn default() -> Self {
        Self {
            schema_id: DEFAULT_SCHEMA_ID,
            compression: Some(CompressionKind::Zstd),
            encrypt: false,
        }
    }
}

impl EncodeOptions {
    pub fn new(schema_id: u32) -> Self {
        Self {
            schema_id,
            ..Self::default()
        }
    }

    pub fn compression(mut self, compression: Option<CompressionKind>) -> Self {
        self.compression = compression;
        self
    }

    pub fn encrypt(mut self, encrypt: bool) -> Self {
        self.encrypt = encrypt;
        self
    }
}

/// Primary encode/decode entry point
pub struct Orchestrator {
    validator: Option<SchemaValidator>,
    security: SecurityManager,
    chunker: Chunker,
    defaults: EncodeOptions,
    compression_level: i32,
    metrics: Metrics,
}

impl Orchestrator {
    /// Build from configuration
    ///
    /// Compiles `codec.schema` when present and loads `security.key_hex`,
    /// generating a fresh random key when no key is configured. Only the
    /// codec, security and handler sections are validated.
    ///
    /// # Errors
    /// `EnvelopeError::Config` for an invalid configuration, schema or key.
    #[instrument(skip(config))]
    pub fn new(config: &EnvelopeConfig) -> Result<Self> {
        config.validate_pipeline_strict()?;

        let validator = config
            .codec
            .schema
            .as_ref()
            .map(SchemaValidator::compile)
            .transpose()?;

        let security = match &config.security.key_hex {
            Some(key_hex) => SecurityManager::from_hex(key_hex)?,
            None => SecurityManager::generate()?,
        };

        let orchestrator = Self {
            validator,
            security,
            chunker: Chunker::from_config(&config.handler)?,
            defaults: EncodeOptions {
                schema_id: config.codec.schema_id,
                compression: config.codec.compress.then_some(config.codec.algorithm),
                encrypt: config.security.encrypt,
            },
            compression_level: config.codec.compression_level,
            metrics: Metrics::new(),
        };

        info!(
            schema_id = orchestrator.defaults.schema_id,
            validated = orchestrator.validator.is_some(),
            encrypt = orchestrator.defaults.encrypt,
            mode = ?orchestrator.chunker.mode(),
            "Orchestrator ready"
        );
        Ok(orchestrator)
    }

    pub fn builder() -> OrchestratorBuilder {
        OrchestratorBuilder::default()
    }

    /// Encode with the configured defaults
    pub fn encode(&self, value: &Value) -> Result<Envelope> {
        self.encode_with(value, self.defaults)
    }

    /// Validate, encode, then optionally seal
    ///
    /// Validation runs first; a rejected value is never serialized,
    /// compressed or sealed.
    ///
    /// # Errors
    /// - `EnvelopeError::Schema` listing every violation
    /// - `EnvelopeError::Security` if sealing fails
    #[instrument(skip(self, value), fields(schema_id = options.schema_id), level = "debug")]
    pub fn encode_with(&self, value: &Value, options: EncodeOptions) -> Result<Envelope> {
        let _timer = Timer::start("encode");

        if let Some(validator) = &self.validator {
            if let Err(e) = validator.validate(value) {
                self.metrics.validation_failed();
                warn!(violations = e.violations().len(), "Value rejected by schema");
                return Err(e);
            }
        }

        let mut envelope = Envelope::encode_with(
            value,
            options.schema_id,
            options.compression,
            self.compression_level,
        )?;
        self.metrics.envelope_encoded(options.compression.is_some());

        if options.encrypt {
            let sealed = self.security.encrypt(envelope.payload())?;
            envelope.replace_payload(sealed.into_bytes());
            self.metrics.payload_sealed();
            debug!(sealed_len = envelope.payload().len(), "Payload sealed");
        }

        Ok(envelope)
    }

    /// Recover the value, opening the payload first when `decrypt` is set
    ///
    /// `envelope` is left untouched; decryption works on a copy.
    ///
    /// # Errors
    /// - `EnvelopeError::Security` when opening fails
    /// - `EnvelopeError::CorruptEnvelope` when decompression or
    ///   deserialization fails (including a sealed payload decoded with
    ///   `decrypt = false`)
    #[instrument(skip(self, envelope), fields(schema_id = envelope.schema_id()), level = "debug")]
    pub fn decode(&self, envelope: &Envelope, decrypt: bool) -> Result<Value> {
        let _timer = Timer::start("decode");

        let result = if decrypt {
            self.open(envelope).and_then(|opened| opened.decode())
        } else {
            envelope.decode()
        };

        match &result {
            Ok(_) => self.metrics.envelope_decoded(),
            Err(e) => {
                self.metrics.decode_failed();
                debug!(error = %e, "Decode failed");
            }
        }
        result
    }

    fn open(&self, envelope: &Envelope) -> Result<Envelope> {
        let plain = self.security.decrypt(envelope.payload())?;
        self.metrics.payload_opened();
        let mut opened = envelope.clone();
        opened.replace_payload(plain);
        Ok(opened)
    }

    /// Serialize `envelope` and split it with the configured chunker
    pub fn to_chunks(&self, envelope: &Envelope) -> Result<Vec<Bytes>> {
        reassembly::to_chunks(envelope, &self.chunker)
    }

    /// HMAC-SHA256 (hex) over the serialized envelope
    pub fn sign(&self, envelope: &Envelope) -> Result<String> {
        self.security.sign(&envelope.to_bytes()?)
    }

    /// Check a signature produced by [`Orchestrator::sign`]
    ///
    /// # Errors
    /// `EnvelopeError::Security` on mismatch
    pub fn verify(&self, envelope: &Envelope, signature_hex: &str) -> Result<()> {
        self.security.verify(&envelope.to_bytes()?, signature_hex)
    }

    /// Switch between batch and stream chunking
    pub fn set_handler_mode(&mut self, mode: HandlerMode, chunk_size: usize) -> Result<()> {
        self.chunker = Chunker::new(mode, chunk_size)?;
        debug!(?mode, chunk_size, "Handler mode changed");
        Ok(())
    }

    pub fn chunker(&self) -> &Chunker {
        &self.chunker
    }

    pub fn defaults(&self) -> EncodeOptions {
        self.defaults
    }

    pub fn security(&self) -> &SecurityManager {
        &self.security
    }

    pub fn metrics(&self) -> MetricsSnapshot {
        self.metrics.snapshot()
    }
}

impl std::fmt::Debug for Orchestrator {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Orchestrator")
            .field("validated", &self.validator.is_some())
            .field("security", &self.security)
            .field("chunker", &self.chunker)
            .field("defaults", &self.defaults)
            .finish()
    }
}

/// Programmatic alternative to [`Orchestrator::new`]
#[derive(Default)]
pub struct OrchestratorBuilder {
    config: EnvelopeConfig,
    validator: Option<SchemaValidator>,
    security: Option<SecurityManager>,
}

impl OrchestratorBuilder {
    /// Start from an existing configuration
    pub fn config(mut self, config: EnvelopeConfig) -> Self {
        self.config = config;
        self
    }

    /// JSON-Schema document compiled at `build`
    pub fn schema(mut self, schema: Value) -> Self {
        self.config.codec.schema = Some(schema);
        self
    }

    /// Custom rule set; takes precedence over `schema`
    pub fn rules(mut self, rules: impl RuleSet + 'static) -> Self {
        self.validator = Some(SchemaValidator::new(rules));
        self
    }

    pub fn security(mut self, security: SecurityManager) -> Self {
        self.security = Some(security);
        self
    }

    pub fn schema_id(mut self, schema_id: u32) -> Self {
        self.config.codec.schema_id = schema_id;
        self
    }

    /// `None` disables compression
    pub fn compression(mut self, compression: Option<CompressionKind>) -> Self {
        match compression {
            Some(kind) => {
                self.config.codec.compress = true;
                self.config.codec.algorithm = kind;
            }
            None => self.config.codec.compress = false,
        }
        self
    }

    pub fn compression_level(mut self, level: i32) -> Self {
        self.config.codec.compression_level = level;
        self
    }

    pub fn encrypt(mut self, encrypt: bool) -> Self {
        self.config.security.encrypt = encrypt;
        self
    }

    pub fn handler(mut self, mode: HandlerMode, chunk_size: usize) -> Self {
        self.config.handler.mode = mode;
        self.config.handler.chunk_size = chunk_size;
        self
    }

    pub fn build(self) -> Result<Orchestrator> {
        let mut config = self.config;
        let custom_rules = self.validator.is_some();
        if custom_rules {
            config.codec.schema = None;
        }
        if self.security.is_some() {
            config.security.key_hex = None;
        }

        let mut orchestrator = Orchestrator::new(&config)?;
        if custom_rules {
            orchestrator.validator = self.validator;
        }
        if let Some(security) = self.security {
            orchestrator.security = security;
        }
        Ok(orchestrator)
    }
}
