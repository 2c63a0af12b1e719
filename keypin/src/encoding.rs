use clap::ValueEnum;
use keypin_pki::KeyEncoding;

/// Command line spelling of [`KeyEncoding`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, ValueEnum)]
pub enum Encoding {
    /// Hash the DER encoded SubjectPublicKeyInfo (openssl / HPKP style)
    #[default]
    Spki,
    /// Hash only the subject public key bits (mobile platform style)
    SubjectPublicKey,
}

impl From<Encoding> for KeyEncoding {
    fn from(value: Encoding) -> Self {
        match value {
            Encoding::Spki => KeyEncoding::SubjectPublicKeyInfo,
            Encoding::SubjectPublicKey => KeyEncoding::SubjectPublicKey,
        }
    }
}
