use log::info;
use serde::Serialize;
use std::fmt;
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tempfile::NamedTempFile;
use thiserror::Error;
use uuid::Uuid;

/// Every .xlsx is a zip archive
const XLSX_MAGIC: &[u8] = b"PK\x03\x04";

/// Identifier of an uploaded workbook
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(transparent)]
pub struct UploadId(Uuid);

impl UploadId {
    pub fn generate() -> Self {
        Self(Uuid::new_v4())
    }

    /// Parse an identifier received from a client
    ///
    /// Only UUIDs are accepted, so the result is always safe to use as a
    /// file name.
    pub fn parse(raw: &str) -> Result<Self, UploadError> {
        Uuid::parse_str(raw.trim())
            .map(Self)
            .map_err(|_| UploadError::InvalidId(raw.to_string()))
    }
}

impl fmt::Display for UploadId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0.hyphenated())
    }
}

impl FromStr for UploadId {
    type Err = UploadError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[derive(Debug, Error)]
pub enum UploadError {
    #[error("Invalid upload id: {0:?}")]
    InvalidId(String),

    #[error("No file data received")]
    Empty,

    #[error("Uploaded file is not an .xlsx workbook")]
    NotXlsx,

    #[error("Upload {0} not found")]
    NotFound(UploadId),

    #[error("Failed to store upload: {0}")]
    Io(#[from] std::io::Error),
}

/// Directory of uploaded workbooks, one `<id>.xlsx` file per upload
///
/// Files are never removed by the application.
#[derive(Debug, Clone)]
pub struct UploadStore {
    root: PathBuf,
}

impl UploadStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Where the workbook for `id` lives (whether or not it exists)
    pub fn path(&self, id: &UploadId) -> PathBuf {
        self.root.join(format!("{id}.xlsx"))
    }

    pub fn exists(&self, id: &UploadId) -> bool {
        self.path(id).is_file()
    }

    /// Path of an existing upload
    pub fn locate(&self, id: &UploadId) -> Result<PathBuf, UploadError> {
        let path = self.path(id);
        if path.is_file() {
            Ok(path)
        } else {
            Err(UploadError::NotFound(*id))
        }
    }

    /// Persist an uploaded workbook under a fresh identifier
    ///
    /// The bytes go to a temporary file in the store directory first and are
    /// renamed into place, so a reader never sees a partial workbook.
    ///
    /// # Examples
    /// ```no_run
    /// use workorder_report::saving::UploadStore;
    ///
    /// let store = UploadStore::new("uploads");
    /// let bytes = std::fs::read("time.xlsx").unwrap();
    /// let id = store.save(&bytes).unwrap();
    /// println!("stored at {}", store.path(&id).display());
    /// ```
    pub fn save(&self, bytes: &[u8]) -> Result<UploadId, UploadError> {
        if bytes.is_empty() {
            return Err(UploadError::Empty);
        }
        if !bytes.starts_with(XLSX_MAGIC) {
            return Err(UploadError::NotXlsx);
        }

        fs::create_dir_all(&self.root)?;

        let id = UploadId::generate();
        let mut file = NamedTempFile::new_in(&self.root)?;
        file.write_all(bytes)?;
        file.flush()?;
        file.persist(self.path(&id)).map_err(|e| e.error)?;

        info!("Stored upload {} ({} bytes)", id, bytes.len());
        Ok(id)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn saved_upload_can_be_located() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path().join("uploads"));

        let id = store.save(b"PK\x03\x04rest-of-zip").unwrap();
        let path = store.locate(&id).unwrap();

        assert_eq!(path, dir.path().join("uploads").join(format!("{id}.xlsx")));
        assert_eq!(fs::read(&path).unwrap(), b"PK\x03\x04rest-of-zip");
        assert!(store.exists(&id));
    }

    #[test]
    fn each_upload_gets_its_own_id() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        let first = store.save(b"PK\x03\x04a").unwrap();
        let second = store.save(b"PK\x03\x04a").unwrap();
        assert_ne!(first, second);
    }

    #[test]
    fn rejects_empty_and_non_xlsx() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());

        assert!(matches!(store.save(b""), Err(UploadError::Empty)));
        assert!(matches!(store.save(b"Type,Hours\n"), Err(UploadError::NotXlsx)));
        assert_eq!(fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[test]
    fn ids_must_be_uuids() {
        assert!(UploadId::parse("../../etc/passwd").is_err());
        assert!(UploadId::parse("").is_err());

        let id = UploadId::generate();
        let parsed: UploadId = id.to_string().parse().unwrap();
        assert_eq!(parsed, id);
    }

    #[test]
    fn unknown_upload_is_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let store = UploadStore::new(dir.path());
        let id = UploadId::generate();
        assert!(matches!(store.locate(&id), Err(UploadError::NotFound(_))));
    }
}
