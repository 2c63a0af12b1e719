use serde::{Deserialize, Serialize};

/// Pinning policy for one logical endpoint.
///
/// Fingerprints are kept exactly as given: no deduplication, no
/// normalization. They are compared byte-for-byte against the computed
/// fingerprints, so callers must use the same encoding the hasher produces
/// (standard base64 with padding over a SHA-256 digest).
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PinConfiguration {
    pub expected_host: Option<String>,
    pub debug_mode: bool,
    pinned_fingerprints: Vec<String>,
}

impl PinConfiguration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn for_host(host: impl Into<String>) -> Self {
        Self {
            expected_host: Some(host.into()),
            ..Self::default()
        }
    }

    pub fn builder() -> PinConfigurationBuilder {
        PinConfigurationBuilder {
            config: Self::default(),
        }
    }

    /// Appends a fingerprint to the accepted set.
    pub fn add_fingerprint(&mut self, fingerprint: impl Into<String>) {
        self.pinned_fingerprints.push(fingerprint.into());
    }

    pub fn pinned_fingerprints(&self) -> &[String] {
        &self.pinned_fingerprints
    }

    pub fn is_pinned(&self) -> bool {
        !self.pinned_fingerprints.is_empty()
    }

    /// The expected host, if one is configured and non-empty.
    pub fn host(&self) -> Option<&str> {
        self.expected_host
            .as_deref()
            .filter(|host| !host.is_empty())
    }
}

pub struct PinConfigurationBuilder {
    config: PinConfiguration,
}

impl PinConfigurationBuilder {
    pub fn expected_host(mut self, host: impl Into<String>) -> Self {
        self.config.expected_host = Some(host.into());
        self
    }

    pub fn debug_mode(mut self, debug_mode: bool) -> Self {
        self.config.debug_mode = debug_mode;
        self
    }

    pub fn fingerprint(mut self, fingerprint: impl Into<String>) -> Self {
        self.config.add_fingerprint(fingerprint);
        self
    }

    pub fn fingerprints<I, S>(mut self, fingerprints: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        for fingerprint in fingerprints {
            self.config.add_fingerprint(fingerprint);
        }
        self
    }

    pub fn build(self) -> PinConfiguration {
        self.config
    }
}
