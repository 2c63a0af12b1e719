use std::path::{Path, PathBuf};

use keypin_pki::{CertificateDer, KeyEncoding, PinOutcome, PinningValidator};
use rcgen::{
    BasicConstraints, CertificateParams, DistinguishedName, DnType, ExtendedKeyUsagePurpose,
    IsCa, KeyPair,
};
use rustls::RootCertStore;
use tempfile::TempDir;
use test_log::test;

use crate::{
    check::{CheckArgs, build_config, build_roots, evaluate},
    encoding::Encoding,
    hash::{HashArgs, hash_files},
};

/// Root and a leaf signed directly by it.
struct Chain {
    root: CertificateDer<'static>,
    leaf: CertificateDer<'static>,
}

impl Chain {
    fn generate(host: &str) -> Self {
        let root_key = KeyPair::generate().unwrap();
        let mut root_params = CertificateParams::default();
        root_params.is_ca = IsCa::Ca(BasicConstraints::Unconstrained);
        let mut dn = DistinguishedName::new();
        dn.push(DnType::CommonName, "keypin cli root");
        root_params.distinguished_name = dn;
        let root = root_params.self_signed(&root_key).unwrap();

        let leaf_key = KeyPair::generate().unwrap();
        let mut leaf_params = CertificateParams::new(vec![host.to_string()]).unwrap();
        leaf_params.extended_key_usages = vec![ExtendedKeyUsagePurpose::ServerAuth];
        let leaf = leaf_params.signed_by(&leaf_key, &root, &root_key).unwrap();

        Self {
            root: root.der().clone(),
            leaf: leaf.der().clone(),
        }
    }

    fn certificates(&self) -> Vec<CertificateDer<'static>> {
        vec![self.leaf.clone(), self.root.clone()]
    }

    fn roots(&self) -> RootCertStore {
        let mut roots = RootCertStore::empty();
        roots.add(self.root.clone()).unwrap();
        roots
    }

    fn pin(&self, certificate: &CertificateDer<'_>) -> String {
        PinningValidator::new()
            .hash_standalone_certificate(certificate.as_ref())
            .unwrap()
    }
}

fn write(dir: &TempDir, name: &str, content: &[u8]) -> PathBuf {
    let path = dir.path().join(name);
    std::fs::write(&path, content).unwrap();
    path
}

fn check_args(chain: &[&Path]) -> CheckArgs {
    CheckArgs {
        host: None,
        pins: Vec::new(),
        config: None,
        cas: Vec::new(),
        debug: false,
        encoding: Encoding::default(),
        chain: chain.iter().map(|path| path.to_path_buf()).collect(),
    }
}

#[test]
fn hash_reports_each_file() {
    let chain = Chain::generate("example.com");
    let dir = tempfile::tempdir().unwrap();
    let leaf = write(&dir, "leaf.der", chain.leaf.as_ref());
    let junk = write(&dir, "junk.der", b"certainly not der");

    let hashed = hash_files(&HashArgs {
        files: vec![leaf.clone(), junk.clone()],
        encoding: Encoding::Spki,
    })
    .unwrap();

    assert_eq!(hashed.len(), 2);
    assert_eq!(hashed[0].path, leaf);
    assert_eq!(hashed[0].fingerprint, Some(chain.pin(&chain.leaf)));
    assert_eq!(hashed[1].path, junk);
    assert_eq!(hashed[1].fingerprint, None);
}

#[test]
fn hash_honors_encoding() {
    let chain = Chain::generate("example.com");
    let dir = tempfile::tempdir().unwrap();
    let leaf = write(&dir, "leaf.der", chain.leaf.as_ref());

    let hashed = hash_files(&HashArgs {
        files: vec![leaf],
        encoding: Encoding::SubjectPublicKey,
    })
    .unwrap();

    let expected = PinningValidator::with_encoding(KeyEncoding::SubjectPublicKey)
        .hash_standalone_certificate(chain.leaf.as_ref());
    assert_eq!(hashed[0].fingerprint, expected);
    assert_ne!(hashed[0].fingerprint, Some(chain.pin(&chain.leaf)));
}

#[test]
fn hash_fails_on_missing_file() {
    let dir = tempfile::tempdir().unwrap();

    let result = hash_files(&HashArgs {
        files: vec![dir.path().join("missing.der")],
        encoding: Encoding::Spki,
    });

    let err = result.unwrap_err();
    assert!(format!("{err:#}").contains("missing.der"));
}

#[test]
fn check_passes_with_custom_ca_and_pin() {
    let chain = Chain::generate("example.com");
    let mut args = check_args(&[]);
    args.host = Some("example.com".into());
    args.pins = vec![chain.pin(&chain.root)];

    let config = build_config(&args).unwrap();
    let report = evaluate(
        &config,
        chain.roots(),
        &chain.certificates(),
        KeyEncoding::default(),
    )
    .unwrap();

    assert!(report.chain_trusted);
    assert_eq!(
        report.keys.outcome,
        PinOutcome::Matched {
            chain_position: 1,
            pin_position: 0
        }
    );
    assert!(report.passed());
}

#[test]
fn check_fails_on_wrong_pin() {
    let chain = Chain::generate("example.com");
    let other = Chain::generate("example.com");
    let mut args = check_args(&[]);
    args.host = Some("example.com".into());
    args.pins = vec![other.pin(&other.leaf)];

    let config = build_config(&args).unwrap();
    let report = evaluate(
        &config,
        chain.roots(),
        &chain.certificates(),
        KeyEncoding::default(),
    )
    .unwrap();

    assert!(report.chain_trusted);
    assert_eq!(report.keys.outcome, PinOutcome::Mismatch);
    assert!(!report.passed());
}

#[test]
fn check_fails_on_wrong_host() {
    let chain = Chain::generate("example.com");
    let mut args = check_args(&[]);
    args.host = Some("example.org".into());
    args.pins = vec![chain.pin(&chain.leaf)];

    let config = build_config(&args).unwrap();
    let report = evaluate(
        &config,
        chain.roots(),
        &chain.certificates(),
        KeyEncoding::default(),
    )
    .unwrap();

    assert!(!report.chain_trusted);
    assert!(report.keys.trusted());
    assert!(!report.passed());
}

#[test]
fn check_debug_lists_fingerprints() {
    let chain = Chain::generate("example.com");
    let mut args = check_args(&[]);
    args.host = Some("example.com".into());
    args.debug = true;

    let config = build_config(&args).unwrap();
    let report = evaluate(
        &config,
        chain.roots(),
        &chain.certificates(),
        KeyEncoding::default(),
    )
    .unwrap();

    assert_eq!(report.keys.outcome, PinOutcome::Unpinned);
    assert_eq!(
        report.keys.fingerprints,
        Some(vec![chain.pin(&chain.leaf), chain.pin(&chain.root)])
    );
}

#[test]
fn check_rejects_empty_chain() {
    let chain = Chain::generate("example.com");
    let config = build_config(&check_args(&[])).unwrap();

    assert!(evaluate(&config, chain.roots(), &[], KeyEncoding::default()).is_err());
}

#[test]
fn flags_extend_json_config() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write(
        &dir,
        "pins.json",
        br#"{
            "expected_host": "example.com",
            "pinned_fingerprints": ["47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU="]
        }"#,
    );

    let mut args = check_args(&[]);
    args.config = Some(config_path);
    args.pins = vec!["second".into()];
    args.debug = true;

    let config = build_config(&args).unwrap();

    assert_eq!(config.host(), Some("example.com"));
    assert!(config.debug_mode);
    assert_eq!(
        config.pinned_fingerprints(),
        ["47DEQpj8HBSa+/TImW+5JCeuQeRkm5NMpJWZG3hSuFU=", "second"]
    );

    args.host = Some("example.net".into());
    assert_eq!(build_config(&args).unwrap().host(), Some("example.net"));
}

#[test]
fn invalid_json_config_is_an_error() {
    let dir = tempfile::tempdir().unwrap();
    let config_path = write(&dir, "pins.json", b"{ not json");

    let mut args = check_args(&[]);
    args.config = Some(config_path);

    let err = build_config(&args).unwrap_err();
    assert!(format!("{err:#}").contains("invalid pin configuration"));
}

#[test]
fn roots_from_files() {
    let chain = Chain::generate("example.com");
    let dir = tempfile::tempdir().unwrap();
    let root = write(&dir, "root.der", chain.root.as_ref());
    let junk = write(&dir, "junk.der", b"junk");

    assert_eq!(build_roots(&[root]).unwrap().len(), 1);
    assert!(build_roots(&[junk]).is_err());
    assert!(!build_roots(&[]).unwrap().is_empty());
}

#[test]
fn check_args_accept_chain_files() {
    let chain = Chain::generate("example.com");
    let dir = tempfile::tempdir().unwrap();
    let leaf = write(&dir, "leaf.der", chain.leaf.as_ref());
    let root = write(&dir, "root.der", chain.root.as_ref());

    let mut args = check_args(&[&leaf, &root]);
    args.host = Some("example.com".into());
    args.cas = vec![root.clone()];
    args.pins = vec![chain.pin(&chain.leaf)];

    let certificates = crate::load::read_certificates(&args.chain).unwrap();
    assert_eq!(certificates, chain.certificates());

    let report = evaluate(
        &build_config(&args).unwrap(),
        build_roots(&args.cas).unwrap(),
        &certificates,
        args.encoding.into(),
    )
    .unwrap();
    assert!(report.passed());
}
