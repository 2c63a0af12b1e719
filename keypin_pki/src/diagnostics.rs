use std::{fmt::Debug, sync::Mutex};

use tracing::{info, warn};

/// Observability events emitted by the validator.
///
/// Events never influence a verdict.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DiagnosticEvent {
    /// A fingerprint computed for a certificate of the presented chain.
    /// Only emitted in debug mode.
    ChainFingerprint {
        position: usize,
        subject: String,
        fingerprint: String,
        key_hex: String,
    },
    /// Trust was granted because no fingerprints are pinned.
    UnpinnedTrustGranted {
        host: Option<String>,
        fingerprints: usize,
    },
}

pub trait DiagnosticSink: Send + Sync + Debug {
    fn emit(&self, event: DiagnosticEvent);
}

/// Forwards events to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingSink;

impl DiagnosticSink for TracingSink {
    fn emit(&self, event: DiagnosticEvent) {
        match event {
            DiagnosticEvent::ChainFingerprint {
                position,
                subject,
                fingerprint,
                key_hex,
            } => {
                info!(
                    position,
                    %subject,
                    key = %key_hex,
                    "hash: {fingerprint}"
                )
            }
            DiagnosticEvent::UnpinnedTrustGranted { host, fingerprints } => {
                warn!(
                    host = host.as_deref().unwrap_or("<unset>"),
                    fingerprints,
                    "certificate pinning is enabled but nothing is pinned, trusting any key. \
                     Turn on debug mode to find fingerprints to pin to"
                )
            }
        }
    }
}

/// Keeps every event in memory, for harvesting fingerprints or asserting on
/// emitted diagnostics.
#[derive(Debug, Default)]
pub struct CollectingSink {
    events: Mutex<Vec<DiagnosticEvent>>,
}

impl CollectingSink {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn events(&self) -> Vec<DiagnosticEvent> {
        self.events
            .lock()
            .map(|events| events.clone())
            .unwrap_or_else(|poisoned| poisoned.into_inner().clone())
    }

    /// Fingerprints reported so far, in the order they were emitted.
    pub fn fingerprints(&self) -> Vec<String> {
        self.events()
            .into_iter()
            .filter_map(|event| match event {
                DiagnosticEvent::ChainFingerprint { fingerprint, .. } => Some(fingerprint),
                _ => None,
            })
            .collect()
    }
}

impl DiagnosticSink for CollectingSink {
    fn emit(&self, event: DiagnosticEvent) {
        match self.events.lock() {
            Ok(mut events) => events.push(event),
            Err(poisoned) => poisoned.into_inner().push(event),
        }
    }
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for std::sync::Arc<T> {
    fn emit(&self, event: DiagnosticEvent) {
        (**self).emit(event)
    }
}

impl<T: DiagnosticSink + ?Sized> DiagnosticSink for &T {
    fn emit(&self, event: DiagnosticEvent) {
        (**self).emit(event)
    }
}
