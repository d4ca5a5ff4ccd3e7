// src/validate/mod.rs
use anyhow::{bail, Result};
use std::path::Path;

use crate::frame::CsvFrame;

/// Return the subset of `expected` that is not present as a file under
/// `dir`, preserving the input order.
pub fn missing_files(dir: &Path, expected: &[&str]) -> Vec<String> {
    expected
        .iter()
        .filter(|name| !dir.join(name).is_file())
        .map(|name| name.to_string())
        .collect()
}

/// Fatal precondition: every expected file must exist before anything is
/// loaded. The error lists the complete missing subset, not just the first.
pub fn ensure_files_present(dir: &Path, expected: &[&str]) -> Result<()> {
    let missing = missing_files(dir, expected);
    if !missing.is_empty() {
        bail!(
            "missing expected files in {}: {}",
            dir.display(),
            missing.join(", ")
        );
    }
    Ok(())
}

/// Shape assertions for the smoke test: enough rows to be a real download,
/// and the key column present.
pub fn check_frame_shape(frame: &CsvFrame, min_rows: usize, key_column: &str) -> Result<()> {
    if frame.num_rows() < min_rows {
        bail!(
            "frame has {} rows, expected at least {}; download may be truncated or the wrong version",
            frame.num_rows(),
            min_rows
        );
    }
    if !frame.has_column(key_column) {
        bail!(
            "key column {:?} missing; columns are [{}]",
            key_column,
            frame.column_names().join(", ")
        );
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::array::{ArrayRef, StringArray};
    use arrow::datatypes::{DataType, Field, Schema};
    use arrow::record_batch::RecordBatch;
    use std::fs;
    use std::sync::Arc;
    use tempfile::tempdir;

    fn frame_with_rows(column: &str, rows: usize) -> CsvFrame {
        let schema = Arc::new(Schema::new(vec![Field::new(column, DataType::Utf8, true)]));
        let values: Vec<String> = (0..rows).map(|i| format!("id_{}", i)).collect();
        let arr = Arc::new(StringArray::from(values)) as ArrayRef;
        let batch = RecordBatch::try_new(schema.clone(), vec![arr]).unwrap();
        CsvFrame::new(schema, vec![batch])
    }

    #[test]
    fn reports_all_missing_files_in_input_order() -> Result<()> {
        let dir = tempdir()?;
        fs::write(dir.path().join("b.csv"), "x\n1\n")?;
        let missing = missing_files(dir.path(), &["a.csv", "b.csv", "c.csv"]);
        assert_eq!(missing, vec!["a.csv".to_string(), "c.csv".to_string()]);
        Ok(())
    }

    #[test]
    fn passes_when_all_present_with_extras() -> Result<()> {
        let dir = tempdir()?;
        for name in ["a.csv", "b.csv", "extra.txt"] {
            fs::write(dir.path().join(name), "x\n")?;
        }
        assert!(missing_files(dir.path(), &["a.csv", "b.csv"]).is_empty());
        ensure_files_present(dir.path(), &["a.csv", "b.csv"])
    }

    #[test]
    fn a_directory_does_not_count_as_a_file() -> Result<()> {
        let dir = tempdir()?;
        fs::create_dir(dir.path().join("a.csv"))?;
        assert_eq!(missing_files(dir.path(), &["a.csv"]), vec!["a.csv"]);
        Ok(())
    }

    #[test]
    fn ensure_lists_every_missing_name() {
        let dir = tempdir().unwrap();
        let err = ensure_files_present(dir.path(), &["a.csv", "b.csv"]).unwrap_err();
        let msg = err.to_string();
        assert!(msg.contains("a.csv") && msg.contains("b.csv"));
    }

    #[test]
    fn row_threshold_is_inclusive() {
        let key = "order_id";
        assert!(check_frame_shape(&frame_with_rows(key, 999), 1000, key).is_err());
        assert!(check_frame_shape(&frame_with_rows(key, 1000), 1000, key).is_ok());
    }

    #[test]
    fn missing_key_column_fails_regardless_of_rows() {
        let frame = frame_with_rows("something_else", 5000);
        let err = check_frame_shape(&frame, 1000, "order_id").unwrap_err();
        assert!(err.to_string().contains("order_id"));
    }
}
