use std::fmt::Display;

use rustls_pki_types::CertificateDer;
use thiserror::Error;

/// Policy a chain gets evaluated against.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustPolicy<'a> {
    /// Chain of trust plus hostname check for a TLS server.
    Ssl { hostname: &'a str },
    /// Chain of trust only.
    BasicX509,
}

impl Display for TrustPolicy<'_> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TrustPolicy::Ssl { hostname } => write!(f, "ssl({hostname})"),
            TrustPolicy::BasicX509 => write!(f, "basic-x509"),
        }
    }
}

/// Verdict of the external trust evaluator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TrustVerdict {
    Trusted,
    /// Trusted because the user or an administrator confirmed an exception.
    TrustedWithException,
    Untrusted,
    Error,
}

impl TrustVerdict {
    pub fn is_trusted(self) -> bool {
        matches!(self, TrustVerdict::Trusted | TrustVerdict::TrustedWithException)
    }
}

#[derive(Debug, Error)]
#[error("trust evaluation failed: {0}")]
pub struct EvaluateTrustError(pub String);

/// The chain a peer presented during a handshake, together with whatever
/// the TLS layer uses to evaluate it.
pub trait ServerTrust {
    /// The presented certificates, leaf first.
    fn certificates(&self) -> &[CertificateDer<'_>];

    fn evaluate(&self, policy: &TrustPolicy<'_>) -> Result<TrustVerdict, EvaluateTrustError>;
}

impl<T: ServerTrust + ?Sized> ServerTrust for &T {
    fn certificates(&self) -> &[CertificateDer<'_>] {
        (**self).certificates()
    }

    fn evaluate(&self, policy: &TrustPolicy<'_>) -> Result<TrustVerdict, EvaluateTrustError> {
        (**self).evaluate(policy)
    }
}
