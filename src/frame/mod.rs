// src/frame/mod.rs
use anyhow::{Context, Result};
use arrow::array::Array;
use arrow::csv::reader::Format;
use arrow::csv::ReaderBuilder;
use arrow::datatypes::SchemaRef;
use arrow::record_batch::RecordBatch;
use arrow::util::display::array_value_to_string;
use serde_json::{Map, Value};
use std::collections::HashSet;
use std::fs::File;
use std::io::Seek;
use std::path::Path;
use std::sync::Arc;
use tracing::debug;

/// Rows sampled for schema inference. The Olist files declare their types
/// within the first few thousand rows.
const INFER_MAX_RECORDS: usize = 4096;

const BATCH_SIZE: usize = 8192;

/// A CSV file loaded fully into memory as Arrow record batches. Row data is
/// opaque payload: it is carried to the warehouse unmodified.
pub struct CsvFrame {
    schema: SchemaRef,
    batches: Vec<RecordBatch>,
}

impl CsvFrame {
    pub fn new(schema: SchemaRef, batches: Vec<RecordBatch>) -> Self {
        Self { schema, batches }
    }

    /// Read `path` with a header row, inferring column types from the data.
    pub fn read_csv(path: &Path) -> Result<Self> {
        let mut file =
            File::open(path).with_context(|| format!("opening {}", path.display()))?;
        let format = Format::default().with_header(true);
        let (schema, _) = format
            .infer_schema(&mut file, Some(INFER_MAX_RECORDS))
            .with_context(|| format!("inferring schema of {}", path.display()))?;
        file.rewind()?;

        let schema = Arc::new(schema);
        let reader = ReaderBuilder::new(schema.clone())
            .with_format(format)
            .with_batch_size(BATCH_SIZE)
            .build(file)
            .with_context(|| format!("opening csv reader for {}", path.display()))?;
        let batches = reader
            .collect::<Result<Vec<_>, _>>()
            .with_context(|| format!("decoding rows of {}", path.display()))?;

        let frame = Self::new(schema, batches);
        debug!(path = %path.display(), rows = frame.num_rows(), "read csv");
        Ok(frame)
    }

    pub fn schema(&self) -> &SchemaRef {
        &self.schema
    }

    pub fn num_rows(&self) -> usize {
        self.batches.iter().map(RecordBatch::num_rows).sum()
    }

    pub fn column_names(&self) -> Vec<String> {
        self.schema.fields().iter().map(|f| f.name().clone()).collect()
    }

    pub fn has_column(&self, name: &str) -> bool {
        self.schema.index_of(name).is_ok()
    }

    /// Count distinct non-null values of `column`, via each value's string
    /// rendering so the column's inferred type doesn't matter.
    pub fn distinct_count(&self, column: &str) -> Result<usize> {
        let idx = self
            .schema
            .index_of(column)
            .with_context(|| format!("no column named {:?}", column))?;
        let mut seen = HashSet::new();
        for batch in &self.batches {
            let array = batch.column(idx);
            for row in 0..array.len() {
                if !array.is_null(row) {
                    seen.insert(array_value_to_string(array.as_ref(), row)?);
                }
            }
        }
        Ok(seen.len())
    }

    /// One JSON object per row, keyed by column name. Null cells are
    /// omitted, which the warehouse treats as NULL for nullable columns.
    pub fn to_json_rows(&self) -> Result<Vec<Map<String, Value>>> {
        if self.num_rows() == 0 {
            return Ok(Vec::new());
        }
        let mut buf = Vec::new();
        let mut writer = arrow::json::ArrayWriter::new(&mut buf);
        let refs: Vec<&RecordBatch> = self.batches.iter().collect();
        writer
            .write_batches(&refs)
            .context("serializing frame rows")?;
        writer.finish().context("finishing row serialization")?;
        serde_json::from_slice(&buf).context("re-reading serialized rows")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{DataType, Field, Schema};
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write_csv(content: &str) -> Result<NamedTempFile> {
        let mut file = NamedTempFile::new()?;
        file.write_all(content.as_bytes())?;
        file.flush()?;
        Ok(file)
    }

    #[test]
    fn reads_rows_and_columns() -> Result<()> {
        let file = write_csv("order_id,price\no1,10.5\no2,7.0\no1,3.25\n")?;
        let frame = CsvFrame::read_csv(file.path())?;
        assert_eq!(frame.num_rows(), 3);
        assert_eq!(frame.column_names(), vec!["order_id", "price"]);
        assert!(frame.has_column("order_id"));
        assert!(!frame.has_column("customer_id"));
        Ok(())
    }

    #[test]
    fn infers_numeric_columns() -> Result<()> {
        let file = write_csv("id,qty,price\na,1,10.5\nb,2,7.0\n")?;
        let frame = CsvFrame::read_csv(file.path())?;
        let schema = frame.schema();
        assert_eq!(schema.field(0).data_type(), &DataType::Utf8);
        assert_eq!(schema.field(1).data_type(), &DataType::Int64);
        assert_eq!(schema.field(2).data_type(), &DataType::Float64);
        Ok(())
    }

    #[test]
    fn distinct_count_ignores_duplicates_and_nulls() -> Result<()> {
        let file = write_csv("order_id,note\no1,x\no2,\no1,y\n")?;
        let frame = CsvFrame::read_csv(file.path())?;
        assert_eq!(frame.distinct_count("order_id")?, 2);
        assert_eq!(frame.distinct_count("note")?, 2);
        assert!(frame.distinct_count("nope").is_err());
        Ok(())
    }

    #[test]
    fn json_rows_keyed_by_column() -> Result<()> {
        let file = write_csv("id,qty\na,1\nb,2\n")?;
        let frame = CsvFrame::read_csv(file.path())?;
        let rows = frame.to_json_rows()?;
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("id"), Some(&Value::from("a")));
        assert_eq!(rows[1].get("qty"), Some(&Value::from(2)));
        Ok(())
    }

    #[test]
    fn empty_frame_has_no_rows() {
        let schema = Arc::new(Schema::new(vec![Field::new("id", DataType::Utf8, true)]));
        let frame = CsvFrame::new(schema, vec![]);
        assert_eq!(frame.num_rows(), 0);
        assert!(frame.to_json_rows().unwrap().is_empty());
    }
}
