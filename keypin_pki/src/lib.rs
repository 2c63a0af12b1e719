//! Public key pinning for TLS servers.
//!
//! A connection is accepted when two independent checks pass: the presented
//! chain is trusted for the expected host ([`PinningValidator::validate_chain_trust`]),
//! and at least one certificate in the chain carries a public key whose
//! fingerprint is pinned ([`PinningValidator::validate_trust_public_keys`]).
//!
//! Fingerprints are `base64(sha256(key))` where the key is the DER encoded
//! SubjectPublicKeyInfo by default, so pins published as HPKP style
//! `pin-sha256` values can be used as they are.

mod config;
mod diagnostics;
mod extract;
mod fingerprint;
mod trust;
mod validator;
#[cfg(feature = "rustls")]
pub mod verifier;

// Re-Exports
pub use rustls_pki_types::CertificateDer;

// Exports
pub use config::{PinConfiguration, PinConfigurationBuilder};
pub use diagnostics::{CollectingSink, DiagnosticEvent, DiagnosticSink, TracingSink};
pub use extract::{
    ChainKey, ExtractKeyError, ExtractedKey, KeyEncoding, KeyExtractor, PublicKeys,
    SpkiKeyExtractor,
};
pub use fingerprint::{FINGERPRINT_LEN, hash_public_key, is_well_formed};
pub use trust::{EvaluateTrustError, ServerTrust, TrustPolicy, TrustVerdict};
pub use validator::{ChainFingerprint, PinOutcome, PinningValidator, ValidationVerdict};
