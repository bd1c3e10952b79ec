//! # Protocol Layer
//!
//! Value validation on the way in and envelope reassembly on the way out.
//!
//! ## Components
//! - **Schema**: rule-set validation that gates every encode
//! - **Reassembly**: per-channel state machine rebuilding an envelope from chunks
//!
//! ## Receive Flow
//! ```text
//! chunk ─▶ Reassembler::push ─▶ … ─▶ Reassembler::finish ─▶ Envelope
//! ```
//!
//! Chunks carry no sequence numbers. Ordering and reliability are the
//! channel's job.

pub mod reassembly;
pub mod schema;
