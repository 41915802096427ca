use cache::PhotoRecord;
use chrono::{DateTime, SecondsFormat, Utc};
use std::path::Path;
use walkdir::{DirEntry, WalkDir};

const SUPPORTED_EXTENSIONS: [&str; 5] = ["jpg", "jpeg", "png", "bmp", "gif"];

pub fn is_supported(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .map(|e| SUPPORTED_EXTENSIONS.contains(&e.to_lowercase().as_str()))
        .unwrap_or(false)
}

fn record_for(entry: &DirEntry) -> Option<PhotoRecord> {
    let path = entry.path();
    let id = path.file_name()?.to_string_lossy().into_owned();
    let metadata = match entry.metadata() {
        Ok(m) => Some(m),
        Err(e) => {
            tracing::warn!(path = %path.display(), error = %e, "Cannot read file metadata");
            None
        }
    };
    let captured_at = metadata
        .as_ref()
        .and_then(|m| m.modified().ok())
        .map(DateTime::<Utc>::from);
    let placeholder = path
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| id.clone());
    Some(PhotoRecord {
        id,
        path: Some(path.display().to_string()),
        captured_at,
        size_bytes: metadata.map(|m| m.len()),
        placeholder,
    })
}

/// Collect supported images below `dir`, ordered by path. Photos are keyed
/// by file name.
pub fn scan(dir: &Path) -> Result<Vec<PhotoRecord>, walkdir::Error> {
    let mut records = Vec::new();
    for entry in WalkDir::new(dir).sort_by_file_name() {
        let entry = entry?;
        if !entry.file_type().is_file() || !is_supported(entry.path()) {
            continue;
        }
        if let Some(record) = record_for(&entry) {
            records.push(record);
        }
    }
    tracing::debug!(dir = %dir.display(), found = records.len(), "Scanned directory");
    Ok(records)
}

/// Records not yet classified: modified after `checkpoint`, or with an
/// unknown modification time.
pub fn unclassified(records: &[PhotoRecord], checkpoint: Option<DateTime<Utc>>) -> Vec<&PhotoRecord> {
    records
        .iter()
        .filter(|r| match (r.captured_at, checkpoint) {
            (Some(mtime), Some(last)) => mtime > last,
            _ => true,
        })
        .collect()
}

/// The checkpoint to store after classifying `processed`.
pub fn advance_checkpoint(
    checkpoint: Option<DateTime<Utc>>,
    processed: &[&PhotoRecord],
) -> Option<DateTime<Utc>> {
    processed
        .iter()
        .filter_map(|r| r.captured_at)
        .chain(checkpoint)
        .max()
}

pub fn parse_checkpoint(raw: Option<&str>) -> Option<DateTime<Utc>> {
    let raw = raw?;
    match DateTime::parse_from_rfc3339(raw) {
        Ok(t) => Some(t.with_timezone(&Utc)),
        Err(e) => {
            tracing::warn!(value = raw, error = %e, "Ignoring unreadable import checkpoint");
            None
        }
    }
}

pub fn format_checkpoint(checkpoint: DateTime<Utc>) -> String {
    checkpoint.to_rfc3339_opts(SecondsFormat::Nanos, true)
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_scan_filters_by_extension() {
        let dir = TempDir::new().unwrap();
        std::fs::write(dir.path().join("beach.JPG"), b"1234").unwrap();
        std::fs::write(dir.path().join("notes.txt"), b"x").unwrap();
        std::fs::create_dir(dir.path().join("sub")).unwrap();
        std::fs::write(dir.path().join("sub").join("dog.png"), b"12").unwrap();

        let records = scan(dir.path()).unwrap();
        let ids: Vec<&str> = records.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["beach.JPG", "dog.png"]);
        assert_eq!(records[0].size_bytes, Some(4));
        assert_eq!(records[0].placeholder, "beach");
        assert!(records[1].captured_at.is_some());
    }

    fn record(id: &str, secs: Option<i64>) -> PhotoRecord {
        PhotoRecord {
            id: id.into(),
            path: None,
            captured_at: secs.and_then(|s| DateTime::from_timestamp(s, 0)),
            size_bytes: None,
            placeholder: id.into(),
        }
    }

    #[test]
    fn test_checkpoint_skips_processed_files() {
        let records = vec![record("old", Some(100)), record("new", Some(200)), record("odd", None)];
        assert_eq!(unclassified(&records, None).len(), 3);

        let last = DateTime::from_timestamp(100, 0);
        let pending = unclassified(&records, last);
        let ids: Vec<&str> = pending.iter().map(|r| r.id.as_str()).collect();
        assert_eq!(ids, vec!["new", "odd"]);

        let next = advance_checkpoint(last, &pending);
        assert_eq!(next, DateTime::from_timestamp(200, 0));
        assert_eq!(advance_checkpoint(last, &[]), last);
    }

    #[test]
    fn test_checkpoint_text_roundtrip() {
        let t = Utc::now();
        assert_eq!(parse_checkpoint(Some(&format_checkpoint(t))), Some(t));
        assert_eq!(parse_checkpoint(Some("yesterday")), None);
        assert_eq!(parse_checkpoint(None), None);
    }

    #[test]
    fn test_missing_directory_is_an_error() {
        let dir = TempDir::new().unwrap();
        assert!(scan(&dir.path().join("missing")).is_err());
    }
}
