//! Tamper-evident proof anchoring.
//!
//! Canonicalizes an object, hashes it, and embeds the digest in minimal
//! transactions on one or more external ledgers. Chains are independent
//! side effects: a failure on one never rolls back a submission on another,
//! and a deployment with no signing credentials runs in an explicit dry-run
//! mode rather than failing silently.

pub mod canonical;
pub mod chain;
pub mod service;

pub use canonical::{canonical_digest, canonicalize};
pub use chain::{AnchorMemo, LedgerClient, LedgerRegistry};
pub use service::{AnchorService, AnchorStatus, ChainStatus, ChainSubmission, ProofAnchor};
