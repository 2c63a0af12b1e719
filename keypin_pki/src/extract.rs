use std::{fmt::Debug, iter::Enumerate, slice};

use rustls_pki_types::CertificateDer;
use serde::{Deserialize, Serialize};
use spki::{
    SubjectPublicKeyInfoRef,
    der::{Decode, Encode},
};
use thiserror::Error;
use tracing::debug;
use x509_parser::{
    certificate::X509Certificate, error::X509Error, oid_registry::asn1_rs::FromDer,
};

/// Which canonical byte form of a public key gets hashed.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum KeyEncoding {
    /// The complete DER encoded SubjectPublicKeyInfo, algorithm identifier
    /// included. This is what `openssl pkey -pubin -outform der` hashes.
    #[default]
    SubjectPublicKeyInfo,
    /// Only the contents of the subject public key bit string: PKCS#1
    /// `RSAPublicKey` for RSA, the encoded point for EC keys.
    SubjectPublicKey,
}

#[derive(Error, Debug)]
pub enum ExtractKeyError {
    #[error("X509 Parser Error: {0}")]
    X509ParserError(#[from] x509_parser::nom::Err<X509Error>),
    #[error("{0} trailing bytes after certificate")]
    TrailingData(usize),
    #[error("SPKI encoding error: {0}")]
    SpkiError(#[from] spki::der::Error),
}

/// A public key taken out of a single certificate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtractedKey {
    /// Human readable subject of the certificate the key belongs to.
    pub subject: String,
    pub key: Vec<u8>,
}

/// A key together with the position of its certificate in the chain.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainKey {
    pub position: usize,
    pub key: ExtractedKey,
}

/// Turns a certificate into the canonical bytes of its public key.
pub trait KeyExtractor: Send + Sync + Debug {
    fn extract(&self, certificate: &[u8]) -> Result<ExtractedKey, ExtractKeyError>;
}

/// Reads the public key straight from the certificate's ASN.1 structure.
#[derive(Debug, Clone, Copy, Default)]
pub struct SpkiKeyExtractor {
    encoding: KeyEncoding,
}

impl SpkiKeyExtractor {
    pub fn new(encoding: KeyEncoding) -> Self {
        Self { encoding }
    }

    pub fn encoding(&self) -> KeyEncoding {
        self.encoding
    }
}

impl KeyExtractor for SpkiKeyExtractor {
    fn extract(&self, certificate: &[u8]) -> Result<ExtractedKey, ExtractKeyError> {
        let (rest, cert) = X509Certificate::from_der(certificate)?;
        if !rest.is_empty() {
            return Err(ExtractKeyError::TrailingData(rest.len()));
        }

        // re-encoding drops any non-canonical DER the certificate may carry
        let spki = SubjectPublicKeyInfoRef::from_der(cert.public_key().raw)?;

        let key = match self.encoding {
            KeyEncoding::SubjectPublicKeyInfo => spki.to_der()?,
            KeyEncoding::SubjectPublicKey => spki.subject_public_key.raw_bytes().to_vec(),
        };

        Ok(ExtractedKey {
            subject: cert.subject().to_string(),
            key,
        })
    }
}

/// Lazily extracts the public keys of a chain in chain order, leaf first.
///
/// Certificates whose key cannot be extracted are skipped.
pub struct PublicKeys<'c, E: ?Sized> {
    extractor: &'c E,
    certificates: Enumerate<slice::Iter<'c, CertificateDer<'c>>>,
}

impl<'c, E: KeyExtractor + ?Sized> PublicKeys<'c, E> {
    pub fn new(extractor: &'c E, certificates: &'c [CertificateDer<'c>]) -> Self {
        Self {
            extractor,
            certificates: certificates.iter().enumerate(),
        }
    }
}

impl<E: KeyExtractor + ?Sized> Iterator for PublicKeys<'_, E> {
    type Item = ChainKey;

    fn next(&mut self) -> Option<Self::Item> {
        for (position, certificate) in self.certificates.by_ref() {
            match self.extractor.extract(certificate.as_ref()) {
                Ok(key) => return Some(ChainKey { position, key }),
                Err(err) => {
                    debug!(position, %err, "skipping certificate without extractable public key")
                }
            }
        }

        None
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        (0, self.certificates.size_hint().1)
    }
}
