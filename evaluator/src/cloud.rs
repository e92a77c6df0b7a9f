//! Detection of cloud-ingestion markers in candidate repositories.
//!
//! A repository that ingests from cloud blob storage is exempt from the local
//! raw-input file gate and earns the `cloud_ingestion` column score.

use crate::snapshot::Snapshot;

/// Max characters inspected per file when looking for markers.
const MARKER_READ_CAP: usize = 100_000;

/// Code or config references that indicate Azure/cloud blob ingestion.
const CLOUD_INGESTION_MARKERS: &[&str] = &[
    "azure",
    "azure_account_url",
    "blobserviceclient",
    "defaultazurecredential",
    "azure-storage-blob",
];

/// Config files checked for markers in addition to the ingestion sources.
const MARKER_CONFIG_FILES: &[&str] = &[".env.example", "config.py", "src/utils/config.py"];

/// True if the repository appears to ingest from cloud blob storage.
pub fn uses_cloud_ingestion(snap: &Snapshot) -> bool {
    let mut candidates = Vec::new();
    for dir in ["src/ingestion", "ingestion", "src"] {
        candidates.extend(snap.python_files(&snap.path(dir)));
    }
    for &name in MARKER_CONFIG_FILES {
        let path = snap.path(name);
        if path.is_file() {
            candidates.push(path);
        }
    }
    candidates.iter().any(|path| {
        let text = crate::snapshot::read_file_capped(path, MARKER_READ_CAP).to_lowercase();
        CLOUD_INGESTION_MARKERS
            .iter()
            .any(|marker| text.contains(marker))
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn detects_blob_client_in_ingestion_code() {
        let temp = tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("src/ingestion")).expect("dirs");
        fs::write(
            temp.path().join("src/ingestion/fetch.py"),
            "from azure.storage.blob import BlobServiceClient\n",
        )
        .expect("write");
        assert!(uses_cloud_ingestion(&Snapshot::new(temp.path())));
    }

    #[test]
    fn detects_marker_in_env_example() {
        let temp = tempdir().expect("tempdir");
        fs::write(
            temp.path().join(".env.example"),
            "AZURE_ACCOUNT_URL=https://example.blob.core.windows.net\n",
        )
        .expect("write");
        assert!(uses_cloud_ingestion(&Snapshot::new(temp.path())));
    }

    #[test]
    fn local_file_repo_has_no_markers() {
        let temp = tempdir().expect("tempdir");
        fs::create_dir_all(temp.path().join("src")).expect("dirs");
        fs::write(
            temp.path().join("src/main.py"),
            "with open('tickets_raw.json') as f:\n    pass\n",
        )
        .expect("write");
        assert!(!uses_cloud_ingestion(&Snapshot::new(temp.path())));
    }
}
