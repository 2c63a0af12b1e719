use std::path::Path;

use anyhow::{Context, Result};
use keypin_pki::{CertificateDer, PinConfiguration};

pub(crate) fn read_certificate(path: &Path) -> Result<CertificateDer<'static>> {
    let der = std::fs::read(path)
        .with_context(|| format!("failed to read certificate {}", path.display()))?;

    Ok(CertificateDer::from(der))
}

pub(crate) fn read_certificates(paths: &[impl AsRef<Path>]) -> Result<Vec<CertificateDer<'static>>> {
    paths
        .iter()
        .map(|path| read_certificate(path.as_ref()))
        .collect()
}

pub(crate) fn read_config(path: &Path) -> Result<PinConfiguration> {
    let raw = std::fs::read(path)
        .with_context(|| format!("failed to read pin configuration {}", path.display()))?;

    serde_json::from_slice(&raw)
        .with_context(|| format!("invalid pin configuration {}", path.display()))
}
