//! Observability counters
//!
//! Each orchestrator and stream session owns a [`Metrics`] instance. Counters
//! are atomics so a shared orchestrator can be used from many tasks at once.

use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;
use tracing::{debug, info};

/// Counters for one pipeline or session
#[derive(Debug)]
pub struct Metrics {
    /// Envelopes built by the codec
    pub envelopes_encoded: AtomicU64,
    /// Values recovered from envelopes
    pub envelopes_decoded: AtomicU64,
    /// Values rejected by the schema validator
    pub validation_failures: AtomicU64,
    /// Decode attempts that failed
    pub decode_failures: AtomicU64,
    /// Payloads compressed
    pub compression_total: AtomicU64,
    /// Payloads sealed
    pub encryption_total: AtomicU64,
    /// Sealed payloads opened
    pub decryption_total: AtomicU64,
    /// Chunks handed to a channel
    pub chunks_sent: AtomicU64,
    /// Chunks taken from a channel
    pub chunks_received: AtomicU64,
    /// Bytes handed to a channel
    pub bytes_sent: AtomicU64,
    /// Bytes taken from a channel
    pub bytes_received: AtomicU64,
    /// Streams abandoned before completion
    pub streams_discarded: AtomicU64,
    start_time: Instant,
}

impl Metrics {
    /// Create a new metrics collector
    pub fn new() -> Self {
        Self {
            envelopes_encoded: AtomicU64::new(0),
            envelopes_decoded: AtomicU64::new(0),
            validation_failures: AtomicU64::new(0),
            decode_failures: AtomicU64::new(0),
            compression_total: AtomicU64::new(0),
            encryption_total: AtomicU64::new(0),
            decryption_total: AtomicU64::new(0),
            chunks_sent: AtomicU64::new(0),
            chunks_received: AtomicU64::new(0),
            bytes_sent: AtomicU64::new(0),
            bytes_received: AtomicU64::new(0),
            streams_discarded: AtomicU64::new(0),
            start_time: Instant::now(),
        }
    }

    pub fn envelope_encoded(&self, compressed: bool) {
        self.envelopes_encoded.fetch_add(1, Ordering::Relaxed);
        if compressed {
            self.compression_total.fetch_add(1, Ordering::Relaxed);
        }
    }

    pub fn envelope_decoded(&self) {
        self.envelopes_decoded.fetch_add(1, Ordering::Relaxed);
    }

    pub fn validation_failed(&self) {
        self.validation_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn decode_failed(&self) {
        self.decode_failures.fetch_add(1, Ordering::Relaxed);
    }

    pub fn payload_sealed(&self) {
        self.encryption_total.fetch_add(1, Ordering::Relaxed);
    }

    pub fn payload_opened(&self) {
        self.decryption_total.fetch_add(1, Ordering::Relaxed);
    }

    /// Record a chunk handed to the channel
    pub fn chunk_sent(&self, byte_count: u64) {
        self.chunks_sent.fetch_add(1, Ordering::Relaxed);
        self.bytes_sent.fetch_add(byte_count, Ordering::Relaxed);
    }

    /// Record a chunk taken from the channel
    pub fn chunk_received(&self, byte_count: u64) {
        self.chunks_received.fetch_add(1, Ordering::Relaxed);
        self.bytes_received.fetch_add(byte_count, Ordering::Relaxed);
    }

    pub fn stream_discarded(&self) {
        self.streams_discarded.fetch_add(1, Ordering::Relaxed);
    }

    /// Get current metrics snapshot
    pub fn snapshot(&self) -> MetricsSnapshot {
        MetricsSnapshot {
            envelopes_encoded: self.envelopes_encoded.load(Ordering::Relaxed),
            envelopes_decoded: self.envelopes_decoded.load(Ordering::Relaxed),
            validation_failures: self.validation_failures.load(Ordering::Relaxed),
            decode_failures: self.decode_failures.load(Ordering::Relaxed),
            compression_total: self.compression_total.load(Ordering::Relaxed),
            encryption_total: self.encryption_total.load(Ordering::Relaxed),
            decryption_total: self.decryption_total.load(Ordering::Relaxed),
            chunks_sent: self.chunks_sent.load(Ordering::Relaxed),
            chunks_received: self.chunks_received.load(Ordering::Relaxed),
            bytes_sent: self.bytes_sent.load(Ordering::Relaxed),
            bytes_received: self.bytes_received.load(Ordering::Relaxed),
            streams_discarded: self.streams_discarded.load(Ordering::Relaxed),
            uptime_seconds: self.start_time.elapsed().as_secs(),
        }
    }

    /// Log current metrics
    pub fn log_metrics(&self) {
        let snapshot = self.snapshot();
        info!(
            envelopes_encoded = snapshot.envelopes_encoded,
            envelopes_decoded = snapshot.envelopes_decoded,
            validation_failures = snapshot.validation_failures,
            decode_failures = snapshot.decode_failures,
            compression_total = snapshot.compression_total,
            encryption_total = snapshot.encryption_total,
            decryption_total = snapshot.decryption_total,
            chunks_sent = snapshot.chunks_sent,
            chunks_received = snapshot.chunks_received,
            bytes_sent = snapshot.bytes_sent,
            bytes_received = snapshot.bytes_received,
            streams_discarded = snapshot.streams_discarded,
            uptime_seconds = snapshot.uptime_seconds,
            "Envelope metrics snapshot"
        );
    }
}

impl Default for Metrics {
    fn default() -> Self {
        Self::new()
    }
}

/// Snapshot of metrics at a point in time
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricsSnapshot {
    pub envelopes_encoded: u64,
    pub envelopes_decoded: u64,
    pub validation_failures: u64,
    pub decode_failures: u64,
    pub compression_total: u64,
    pub encryption_total: u64,
    pub decryption_total: u64,
    pub chunks_sent: u64,
    pub chunks_received: u64,
    pub bytes_sent: u64,
    pub bytes_received: u64,
    pub streams_discarded: u64,
    pub uptime_seconds: u64,
}

/// Timer for measuring operation duration
pub struct Timer {
    start: Instant,
    operation: &'static str,
}

impl Timer {
    /// Start timing an operation
    pub fn start(operation: &'static str) -> Self {
        Self {
            start: Instant::now(),
            operation,
        }
    }
}

impl Drop for Timer {
    fn drop(&mut self) {
        let duration = self.start.elapsed();
        debug!(
            operation = self.operation,
            duration_us = duration.as_micros() as u64,
            "Operation completed"
        );
    }
}
