use std::{path::PathBuf, process::ExitCode, sync::Arc};

use anyhow::{Context, Result, bail};
use clap::Args;
use keypin_pki::{
    CertificateDer, KeyEncoding, PinConfiguration, PinOutcome, PinningValidator,
    ValidationVerdict, is_well_formed,
    verifier::{WebPkiTrust, crypto_provider, webpki_root_store},
};
use rustls::{RootCertStore, client::WebPkiServerVerifier};
use rustls_pki_types::UnixTime;
use tracing::{debug, warn};

use crate::{
    encoding::Encoding,
    load::{read_certificates, read_config},
};

/// Runs both pinning checks against a chain stored on disk.
#[derive(Debug, Args)]
pub struct CheckArgs {
    /// Host the chain has to be valid for
    #[arg(long, env = "KEYPIN_HOST")]
    pub host: Option<String>,

    /// Accepted fingerprint, may be given multiple times
    #[arg(long = "pin")]
    pub pins: Vec<String>,

    /// JSON pin configuration, other flags are applied on top of it
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// DER encoded trust anchor, defaults to the webpki roots
    #[arg(long = "ca")]
    pub cas: Vec<PathBuf>,

    /// Print the fingerprint of every certificate in the chain
    #[arg(long, env = "KEYPIN_DEBUG")]
    pub debug: bool,

    /// Which bytes of the public key get hashed
    #[arg(long, value_enum, default_value_t)]
    pub encoding: Encoding,

    /// DER encoded chain, leaf first
    #[arg(required = true)]
    pub chain: Vec<PathBuf>,
}

#[derive(Debug)]
pub struct Report {
    pub chain_trusted: bool,
    pub keys: ValidationVerdict,
}

impl Report {
    pub fn passed(&self) -> bool {
        self.chain_trusted && self.keys.trusted()
    }
}

pub fn build_config(args: &CheckArgs) -> Result<PinConfiguration> {
    let mut config = match &args.config {
        Some(path) => read_config(path)?,
        None => PinConfiguration::new(),
    };

    if let Some(host) = &args.host {
        config.expected_host = Some(host.clone());
    }
    config.debug_mode |= args.debug;

    for pin in &args.pins {
        config.add_fingerprint(pin.clone());
    }

    for pin in config.pinned_fingerprints() {
        if !is_well_formed(pin) {
            warn!(pin = %pin, "pin is not a base64 encoded sha256 digest and will never match");
        }
    }

    Ok(config)
}

pub fn build_roots(cas: &[PathBuf]) -> Result<RootCertStore> {
    if cas.is_empty() {
        return Ok(webpki_root_store());
    }

    let mut roots = RootCertStore::empty();
    for (path, cert) in cas.iter().zip(read_certificates(cas)?) {
        roots
            .add(cert)
            .with_context(|| format!("unusable trust anchor {}", path.display()))?;
    }

    Ok(roots)
}

pub fn evaluate(
    config: &PinConfiguration,
    roots: RootCertStore,
    chain: &[CertificateDer<'_>],
    encoding: KeyEncoding,
) -> Result<Report> {
    let Some((leaf, intermediates)) = chain.split_first() else {
        bail!("certificate chain is empty");
    };

    let inner = WebPkiServerVerifier::builder_with_provider(Arc::new(roots), crypto_provider())
        .build()
        .context("failed to build webpki verifier")?;

    let trust = WebPkiTrust::new(&inner, leaf, intermediates, &[], UnixTime::now());
    let validator = PinningValidator::with_encoding(encoding);

    let chain_trusted = validator.validate_chain_trust(&trust, config);
    let keys = validator.check_public_keys(&trust, config);

    debug!(chain_trusted, outcome = ?keys.outcome, "chain checked");

    Ok(Report {
        chain_trusted,
        keys,
    })
}

fn describe(outcome: PinOutcome) -> String {
    match outcome {
        PinOutcome::Matched {
            chain_position,
            pin_position,
        } => format!("ok (certificate {chain_position} matches pin {pin_position})"),
        PinOutcome::Mismatch => "failed (no pinned key in chain)".to_string(),
        PinOutcome::NoKeys => "failed (no public key could be extracted)".to_string(),
        PinOutcome::Unpinned => "ok (nothing pinned, any key is accepted)".to_string(),
    }
}

pub fn run(args: CheckArgs) -> Result<ExitCode> {
    let config = build_config(&args)?;
    let roots = build_roots(&args.cas)?;
    let chain = read_certificates(&args.chain)?;

    let report = evaluate(&config, roots, &chain, args.encoding.into())?;

    if let Some(fingerprints) = &report.keys.fingerprints {
        println!(
            "hash order is usually most specific to least, so the first one is your domain, the last is the root CA"
        );
        for fingerprint in fingerprints {
            println!("hash: {fingerprint}");
        }
    }

    println!(
        "chain trust: {}",
        if report.chain_trusted { "ok" } else { "failed" }
    );
    println!("public keys: {}", describe(report.keys.outcome));

    Ok(if report.passed() {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    })
}
