//! rustls integration: a [`ServerCertVerifier`] that only lets a handshake
//! through when the chain is trusted for the expected host *and* one of its
//! keys is pinned.

use std::sync::{Arc, LazyLock};

use rustls::{
    CertificateError, ClientConfig, RootCertStore,
    client::{
        VerifierBuilderError, WebPkiServerVerifier,
        danger::{HandshakeSignatureValid, ServerCertVerified, ServerCertVerifier},
    },
    crypto::CryptoProvider,
};
use rustls_pki_types::{CertificateDer, ServerName, UnixTime};
use thiserror::Error;
use tracing::{debug, warn};

use crate::{
    PinConfiguration, PinningValidator,
    diagnostics::{DiagnosticSink, TracingSink},
    extract::{KeyExtractor, SpkiKeyExtractor},
    trust::{EvaluateTrustError, ServerTrust, TrustPolicy, TrustVerdict},
};

static CRYPTO_PROVIDER: LazyLock<Arc<CryptoProvider>> =
    LazyLock::new(|| Arc::new(rustls::crypto::ring::default_provider()));

pub fn crypto_provider() -> Arc<CryptoProvider> {
    CRYPTO_PROVIDER.clone()
}

#[derive(Debug, Error)]
pub enum BuildVerifierError {
    #[error("error building webpki verifier: {0}")]
    WebPki(#[from] VerifierBuilderError),
    #[error("error building client config: {0}")]
    ClientConfig(#[from] rustls::Error),
}

/// Roots shipped with `webpki-roots`.
pub fn webpki_root_store() -> RootCertStore {
    RootCertStore {
        roots: webpki_roots::TLS_SERVER_ROOTS.to_vec(),
    }
}

/// A presented chain evaluated by rustls' webpki verifier.
#[derive(Debug)]
pub struct WebPkiTrust<'a> {
    verifier: &'a WebPkiServerVerifier,
    certificates: Vec<CertificateDer<'a>>,
    ocsp_response: &'a [u8],
    now: UnixTime,
}

impl<'a> WebPkiTrust<'a> {
    pub fn new(
        verifier: &'a WebPkiServerVerifier,
        end_entity: &'a CertificateDer<'a>,
        intermediates: &'a [CertificateDer<'a>],
        ocsp_response: &'a [u8],
        now: UnixTime,
    ) -> Self {
        let certificates = std::iter::once(end_entity)
            .chain(intermediates)
            .map(|cert| CertificateDer::from(cert.as_ref()))
            .collect();

        Self {
            verifier,
            certificates,
            ocsp_response,
            now,
        }
    }
}

impl ServerTrust for WebPkiTrust<'_> {
    fn certificates(&self) -> &[CertificateDer<'_>] {
        &self.certificates
    }

    fn evaluate(&self, policy: &TrustPolicy<'_>) -> Result<TrustVerdict, EvaluateTrustError> {
        let TrustPolicy::Ssl { hostname } = policy else {
            return Err(EvaluateTrustError(format!(
                "policy {policy} is not supported by the webpki evaluator"
            )));
        };

        let (end_entity, intermediates) = self
            .certificates
            .split_first()
            .ok_or_else(|| EvaluateTrustError("empty certificate chain".into()))?;

        let server_name = ServerName::try_from(*hostname)
            .map_err(|err| EvaluateTrustError(format!("invalid hostname {hostname}: {err}")))?;

        let verdict = match self.verifier.verify_server_cert(
            end_entity,
            intermediates,
            &server_name,
            self.ocsp_response,
            self.now,
        ) {
            Ok(_) => TrustVerdict::Trusted,
            Err(rustls::Error::InvalidCertificate(err)) => {
                debug!(?err, "webpki rejected chain");
                TrustVerdict::Untrusted
            }
            Err(err) => {
                debug!(%err, "webpki evaluation failed");
                TrustVerdict::Error
            }
        };

        Ok(verdict)
    }
}

/// Gates a handshake on chain trust for the configured host plus public key
/// pinning.
#[derive(Debug)]
pub struct PinnedServerVerifier<E = SpkiKeyExtractor, S = TracingSink> {
    inner: Arc<WebPkiServerVerifier>,
    validator: PinningValidator<E, S>,
    config: PinConfiguration,
}

impl PinnedServerVerifier {
    pub fn new(
        roots: Arc<RootCertStore>,
        config: PinConfiguration,
    ) -> Result<Self, BuildVerifierError> {
        Self::with_validator(roots, config, PinningValidator::new())
    }

    pub fn with_webpki_roots(config: PinConfiguration) -> Result<Self, BuildVerifierError> {
        Self::new(Arc::new(webpki_root_store()), config)
    }
}

impl<E, S> PinnedServerVerifier<E, S>
where
    E: KeyExtractor + 'static,
    S: DiagnosticSink + 'static,
{
    pub fn with_validator(
        roots: Arc<RootCertStore>,
        config: PinConfiguration,
        validator: PinningValidator<E, S>,
    ) -> Result<Self, BuildVerifierError> {
        if !config.is_pinned() {
            warn!(
                host = config.expected_host.as_deref(),
                "pinned verifier created without any pins"
            );
        }

        let inner = WebPkiServerVerifier::builder_with_provider(roots, crypto_provider()).build()?;

        Ok(Self {
            inner,
            validator,
            config,
        })
    }

    pub fn config(&self) -> &PinConfiguration {
        &self.config
    }

    /// Client config that uses this verifier for every server certificate.
    pub fn into_client_config(self) -> Result<ClientConfig, BuildVerifierError> {
        let config = ClientConfig::builder_with_provider(crypto_provider())
            .with_safe_default_protocol_versions()?
            .dangerous()
            .with_custom_certificate_verifier(Arc::new(self))
            .with_no_client_auth();

        Ok(config)
    }
}

impl<E, S> ServerCertVerifier for PinnedServerVerifier<E, S>
where
    E: KeyExtractor + 'static,
    S: DiagnosticSink + 'static,
{
    fn verify_server_cert(
        &self,
        end_entity: &CertificateDer<'_>,
        intermediates: &[CertificateDer<'_>],
        server_name: &ServerName<'_>,
        ocsp_response: &[u8],
        now: UnixTime,
    ) -> Result<ServerCertVerified, rustls::Error> {
        debug!(server_name = ?server_name, "verifying pinned server certificate");

        let trust = WebPkiTrust::new(&self.inner, end_entity, intermediates, ocsp_response, now);

        if !self.validator.validate_chain_trust(&trust, &self.config) {
            return Err(rustls::Error::InvalidCertificate(
                CertificateError::ApplicationVerificationFailure,
            ));
        }

        if !self.validator.validate_trust_public_keys(&trust, &self.config) {
            return Err(rustls::Error::General(
                "public key pinning failed".to_string(),
            ));
        }

        Ok(ServerCertVerified::assertion())
    }

    fn verify_tls12_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls12_signature(message, cert, dss)
    }

    fn verify_tls13_signature(
        &self,
        message: &[u8],
        cert: &CertificateDer<'_>,
        dss: &rustls::DigitallySignedStruct,
    ) -> Result<HandshakeSignatureValid, rustls::Error> {
        self.inner.verify_tls13_signature(message, cert, dss)
    }

    fn supported_verify_schemes(&self) -> Vec<rustls::SignatureScheme> {
        self.inner.supported_verify_schemes()
    }
}
