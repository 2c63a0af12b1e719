use tracing::{debug, instrument};

use crate::{
    PinConfiguration,
    diagnostics::{DiagnosticEvent, DiagnosticSink, TracingSink},
    extract::{ChainKey, KeyEncoding, KeyExtractor, PublicKeys, SpkiKeyExtractor},
    fingerprint::hash_public_key,
    trust::{ServerTrust, TrustPolicy},
};

/// How the key pinning check came to its result.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PinOutcome {
    /// The key of the certificate at `chain_position` matches the pin at
    /// `pin_position`.
    Matched {
        chain_position: usize,
        pin_position: usize,
    },
    /// Keys were found, none of them is pinned.
    Mismatch,
    /// Not a single key could be taken out of the chain.
    NoKeys,
    /// Nothing is pinned, so any key is accepted. This keeps incremental
    /// rollouts working but does not protect anything.
    Unpinned,
}

impl PinOutcome {
    pub fn is_trusted(self) -> bool {
        matches!(self, PinOutcome::Matched { .. } | PinOutcome::Unpinned)
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationVerdict {
    pub outcome: PinOutcome,
    /// The chain's fingerprints, leaf first. Only filled in debug mode.
    pub fingerprints: Option<Vec<String>>,
}

impl ValidationVerdict {
    pub fn trusted(&self) -> bool {
        self.outcome.is_trusted()
    }
}

/// A fingerprint computed for one certificate of a chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainFingerprint {
    pub position: usize,
    pub subject: String,
    pub fingerprint: String,
    key: Vec<u8>,
}

impl ChainFingerprint {
    fn from_key(chain_key: ChainKey) -> Self {
        Self {
            position: chain_key.position,
            fingerprint: hash_public_key(&chain_key.key.key),
            subject: chain_key.key.subject,
            key: chain_key.key.key,
        }
    }

    /// The bytes that were hashed.
    pub fn key(&self) -> &[u8] {
        &self.key
    }
}

/// Decides whether a presented chain is acceptable for a [`PinConfiguration`].
///
/// The validator holds no state besides its extractor and diagnostic sink,
/// so a single instance can serve any number of concurrent handshakes.
#[derive(Debug, Clone, Default)]
pub struct PinningValidator<E = SpkiKeyExtractor, S = TracingSink> {
    extractor: E,
    sink: S,
}

impl PinningValidator {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_encoding(encoding: KeyEncoding) -> Self {
        Self::with_parts(SpkiKeyExtractor::new(encoding), TracingSink)
    }
}

impl<E, S> PinningValidator<E, S>
where
    E: KeyExtractor,
    S: DiagnosticSink,
{
    pub fn with_parts(extractor: E, sink: S) -> Self {
        Self { extractor, sink }
    }

    pub fn extractor(&self) -> &E {
        &self.extractor
    }

    pub fn sink(&self) -> &S {
        &self.sink
    }

    /// Standard chain of trust and hostname check.
    ///
    /// Fails closed without an expected host. Only the two success verdicts
    /// of the evaluator count as trusted; evaluation errors do not.
    #[instrument(skip_all, fields(host = config.expected_host.as_deref()))]
    pub fn validate_chain_trust<T>(&self, trust: &T, config: &PinConfiguration) -> bool
    where
        T: ServerTrust + ?Sized,
    {
        let Some(hostname) = config.host() else {
            debug!("no expected host configured, refusing chain");
            return false;
        };

        match trust.evaluate(&TrustPolicy::Ssl { hostname }) {
            Ok(verdict) => {
                debug!(?verdict, "chain evaluated");
                verdict.is_trusted()
            }
            Err(err) => {
                debug!(%err, "chain evaluation failed");
                false
            }
        }
    }

    /// Checks the chain's public keys against the pinned fingerprints.
    pub fn validate_trust_public_keys<T>(&self, trust: &T, config: &PinConfiguration) -> bool
    where
        T: ServerTrust + ?Sized,
    {
        self.check_public_keys(trust, config).trusted()
    }

    /// Like [`Self::validate_trust_public_keys`] but reports how the result
    /// was reached.
    #[instrument(skip_all, fields(host = config.expected_host.as_deref()))]
    pub fn check_public_keys<T>(&self, trust: &T, config: &PinConfiguration) -> ValidationVerdict
    where
        T: ServerTrust + ?Sized,
    {
        let chain: Vec<ChainFingerprint> = self.chain_fingerprints(trust.certificates()).collect();

        if chain.is_empty() {
            debug!("no public keys in chain, nothing to compare");
            return ValidationVerdict {
                outcome: PinOutcome::NoKeys,
                fingerprints: config.debug_mode.then(Vec::new),
            };
        }

        if config.debug_mode {
            for entry in &chain {
                self.sink.emit(DiagnosticEvent::ChainFingerprint {
                    position: entry.position,
                    subject: entry.subject.clone(),
                    fingerprint: entry.fingerprint.clone(),
                    key_hex: hex::encode(entry.key()),
                });
            }
        }

        let outcome = if config.is_pinned() {
            match_fingerprints(&chain, config.pinned_fingerprints())
        } else {
            self.sink.emit(DiagnosticEvent::UnpinnedTrustGranted {
                host: config.expected_host.clone(),
                fingerprints: chain.len(),
            });
            PinOutcome::Unpinned
        };

        debug!(?outcome, "public keys checked");

        ValidationVerdict {
            outcome,
            fingerprints: config
                .debug_mode
                .then(|| chain.into_iter().map(|entry| entry.fingerprint).collect()),
        }
    }

    /// Lazily computes the fingerprints of a chain, leaf first, skipping
    /// certificates without an extractable key.
    pub fn chain_fingerprints<'c>(
        &'c self,
        certificates: &'c [rustls_pki_types::CertificateDer<'c>],
    ) -> impl Iterator<Item = ChainFingerprint> + 'c {
        PublicKeys::new(&self.extractor, certificates).map(ChainFingerprint::from_key)
    }

    /// Fingerprint of a single DER encoded certificate that is not part of a
    /// live chain, e.g. to compute a pin before the certificate is deployed.
    pub fn hash_standalone_certificate(&self, der: &[u8]) -> Option<String> {
        match self.extractor.extract(der) {
            Ok(extracted) => Some(hash_public_key(&extracted.key)),
            Err(err) => {
                debug!(%err, "unable to fingerprint certificate");
                None
            }
        }
    }
}

/// First match in the cross product of chain (outer, leaf first) and pins
/// (inner, configured order). Comparison is exact string equality.
fn match_fingerprints(chain: &[ChainFingerprint], pins: &[String]) -> PinOutcome {
    for entry in chain {
        for (pin_position, pin) in pins.iter().enumerate() {
            if *pin == entry.fingerprint {
                return PinOutcome::Matched {
                    chain_position: entry.position,
                    pin_position,
                };
            }
        }
    }

    PinOutcome::Mismatch
}
