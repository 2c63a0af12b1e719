use std::{path::PathBuf, process::ExitCode};

use anyhow::Result;
use clap::Args;
use keypin_pki::PinningValidator;
use tracing::debug;

use crate::{encoding::Encoding, load::read_certificate};

/// Computes pins for certificates that are not deployed yet.
#[derive(Debug, Args)]
pub struct HashArgs {
    /// DER encoded certificate files
    #[arg(required = true)]
    pub files: Vec<PathBuf>,

    /// Which bytes of the public key get hashed
    #[arg(long, value_enum, default_value_t)]
    pub encoding: Encoding,
}

#[derive(Debug, PartialEq, Eq)]
pub struct HashedFile {
    pub path: PathBuf,
    pub fingerprint: Option<String>,
}

pub fn hash_files(args: &HashArgs) -> Result<Vec<HashedFile>> {
    let validator = PinningValidator::with_encoding(args.encoding.into());

    args.files
        .iter()
        .map(|path| {
            let der = read_certificate(path)?;

            debug!(path = %path.display(), len = der.len(), "hashing certificate");

            Ok(HashedFile {
                path: path.clone(),
                fingerprint: validator.hash_standalone_certificate(der.as_ref()),
            })
        })
        .collect()
}

pub fn run(args: HashArgs) -> Result<ExitCode> {
    let mut code = ExitCode::SUCCESS;

    for hashed in hash_files(&args)? {
        match hashed.fingerprint {
            Some(fingerprint) => println!("{fingerprint}  {}", hashed.path.display()),
            None => {
                eprintln!("could not calculate hash for {}", hashed.path.display());
                code = ExitCode::FAILURE;
            }
        }
    }

    Ok(code)
}
