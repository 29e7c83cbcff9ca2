use spendscore_core::{CsvSample, FileHandle, FileSource, PipelineError};
use spendscore_ingest::read_sample;

/// Current bytes of the file. Path-backed files are read fresh on every call.
pub async fn load_bytes(file: &FileHandle) -> Result<Vec<u8>, PipelineError> {
    match &file.source {
        FileSource::Memory(bytes) => Ok(bytes.to_vec()),
        FileSource::Path(path) => tokio::fs::read(path)
            .await
            .map_err(|e| PipelineError::malformed(format!("Failed to read file {}: {e}", path.display()))),
    }
}

pub async fn read_file(file: &FileHandle) -> Result<CsvSample, PipelineError> {
    let bytes = load_bytes(file).await?;
    read_sample(&bytes)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_read_file_from_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("march.csv");
        std::fs::write(&path, "Date,Amount\n2026-03-01,4.50\n").unwrap();

        let file = FileHandle::from_path(&path);
        assert_eq!(file.name, "march.csv");
        let sample = read_file(&file).await.unwrap();
        assert_eq!(sample.headers, vec!["Date", "Amount"]);
    }

    #[tokio::test]
    async fn test_missing_path_is_malformed() {
        let dir = tempfile::tempdir().unwrap();
        let file = FileHandle::from_path(dir.path().join("gone.csv"));
        let err = read_file(&file).await.unwrap_err();
        assert!(matches!(err, PipelineError::MalformedInput(ref m) if m.starts_with("Failed to read file")));
    }

    #[tokio::test]
    async fn test_in_memory() {
        let file = FileHandle::in_memory("x.csv", b"Amount\n1\n".to_vec());
        assert_eq!(load_bytes(&file).await.unwrap(), b"Amount\n1\n");
        assert_eq!(read_file(&file).await.unwrap().total_rows, 1);
    }
}
