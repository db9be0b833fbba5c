use crate::error::Result;
use crate::types::{CatalogFile, PerformerRecord, PerformerTableFile};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::fs;
use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

/// Flat-file home of the two sync artifacts
#[derive(Debug, Clone)]
pub struct ArtifactStore {
    catalog_path: PathBuf,
    performers_path: PathBuf,
}

impl ArtifactStore {
    pub fn new(catalog_path: impl Into<PathBuf>, performers_path: impl Into<PathBuf>) -> Self {
        Self {
            catalog_path: catalog_path.into(),
            performers_path: performers_path.into(),
        }
    }

    pub fn catalog_path(&self) -> &Path {
        &self.catalog_path
    }

    pub fn performers_path(&self) -> &Path {
        &self.performers_path
    }

    /// Previous catalog, or `None` when there is no usable one.
    pub fn load_catalog(&self) -> Result<Option<CatalogFile>> {
        read_json(&self.catalog_path)
    }

    /// Records of the previous performer table, in file order.
    pub fn load_performers(&self) -> Result<Vec<PerformerRecord>> {
        let table: Option<PerformerTableFile> = read_json(&self.performers_path)?;
        Ok(table.map(PerformerTableFile::records).unwrap_or_default())
    }

    pub fn write_catalog(&self, catalog: &CatalogFile) -> Result<()> {
        write_json_atomic(&self.catalog_path, catalog)
    }

    pub fn write_performers(&self, table: &PerformerTableFile) -> Result<()> {
        write_json_atomic(&self.performers_path, table)
    }
}

/// Missing files read as `None`. A file that exists but does not parse is
/// logged and also read as `None`, which makes the next run rebuild it.
fn read_json<T: DeserializeOwned>(path: &Path) -> Result<Option<T>> {
    let content = match fs::read_to_string(path) {
        Ok(content) => content,
        Err(e) if e.kind() == ErrorKind::NotFound => {
            debug!("No previous artifact at {}", path.display());
            return Ok(None);
        }
        Err(e) => return Err(e.into()),
    };
    match serde_json::from_str(&content) {
        Ok(value) => Ok(Some(value)),
        Err(e) => {
            warn!("Ignoring unreadable artifact {}: {}", path.display(), e);
            Ok(None)
        }
    }
}

/// Write pretty JSON via a sibling temp file and rename, so readers never see
/// a half-written artifact.
fn write_json_atomic<T: Serialize>(path: &Path, value: &T) -> Result<()> {
    if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
        fs::create_dir_all(parent)?;
    }
    let mut body = serde_json::to_vec_pretty(value)?;
    body.push(b'\n');

    let mut tmp_name = path.file_name().unwrap_or_default().to_os_string();
    tmp_name.push(".tmp");
    let tmp_path = path.with_file_name(tmp_name);

    fs::write(&tmp_path, &body)?;
    fs::rename(&tmp_path, path)?;
    debug!("Wrote {} bytes to {}", body.len(), path.display());
    Ok(())
}
