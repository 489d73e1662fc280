use std::io::Read;
use std::path::{Path, PathBuf};

use async_trait::async_trait;

use super::record::OrgEmployeePayload;
use super::{OrgFetchError, OrgSnapshotProvider};
use crate::evaluations::domain::Employee;

/// Employee export saved from the organization platform as JSON.
#[derive(Debug, Clone)]
pub struct OrgExportFile {
    path: PathBuf,
}

impl OrgExportFile {
    pub fn new<P: AsRef<Path>>(path: P) -> Self {
        Self {
            path: path.as_ref().to_path_buf(),
        }
    }

    pub fn from_path<P: AsRef<Path>>(path: P) -> Result<Vec<Employee>, OrgFetchError> {
        let file = std::fs::File::open(path)?;
        Self::from_reader(file)
    }

    pub fn from_reader<R: Read>(reader: R) -> Result<Vec<Employee>, OrgFetchError> {
        let payload: OrgEmployeePayload = serde_json::from_reader(reader)
            .map_err(|err| OrgFetchError::Decode(err.to_string()))?;
        Ok(payload.into_employees())
    }
}

#[async_trait]
impl OrgSnapshotProvider for OrgExportFile {
    async fn fetch_employees(&self) -> Result<Vec<Employee>, OrgFetchError> {
        let bytes = tokio::fs::read(&self.path).await?;
        Self::from_reader(bytes.as_slice())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn from_reader_rejects_malformed_exports() {
        let result = OrgExportFile::from_reader(Cursor::new("{\"results\": 3}"));
        assert!(matches!(result, Err(OrgFetchError::Decode(_))));
    }

    #[tokio::test]
    async fn missing_export_surfaces_io_error() {
        let provider = OrgExportFile::new("/nonexistent/peer-eval/org.json");
        let result = provider.fetch_employees().await;
        assert!(matches!(result, Err(OrgFetchError::Io(_))));
    }
}
