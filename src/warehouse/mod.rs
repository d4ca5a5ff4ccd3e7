// src/warehouse/mod.rs
use anyhow::{bail, Context, Result};
use arrow::datatypes::{DataType, Schema};
use google_cloud_bigquery::client::{Client, ClientConfig};
use google_cloud_bigquery::http::dataset::{Dataset, DatasetReference};
use google_cloud_bigquery::http::table::{
    Table, TableFieldMode, TableFieldSchema, TableFieldType, TableReference, TableSchema,
};
use google_cloud_bigquery::http::tabledata::insert_all::{InsertAllRequest, Row};
use std::io::Write;
use std::path::Path;
use tempfile::NamedTempFile;
use tracing::{debug, info};

use crate::config::WarehouseConfig;
use crate::frame::CsvFrame;
use crate::validate;

/// Region every dataset is created in.
static DATASET_LOCATION: &str = "US";

/// Rows per insertAll request, well under the service's payload cap.
const INSERT_CHUNK_ROWS: usize = 500;

/// Authenticated handle on one BigQuery project.
pub struct Warehouse {
    client: Client,
    project_id: String,
    // keeps the materialized service-account key on disk for the client's lifetime
    _credentials: NamedTempFile,
}

impl Warehouse {
    /// Authenticate with the service-account key carried in the config. The
    /// key is spooled to a scratch file so the Google default-credential
    /// flow can pick it up.
    pub async fn connect(cfg: &WarehouseConfig) -> Result<Self> {
        let mut credentials =
            NamedTempFile::new().context("creating credentials scratch file")?;
        credentials
            .write_all(cfg.sa_key_json.as_bytes())
            .context("writing service-account key")?;
        credentials.flush()?;
        std::env::set_var("GOOGLE_APPLICATION_CREDENTIALS", credentials.path());

        let (config, _) = ClientConfig::new_with_auth()
            .await
            .context("authenticating to BigQuery")?;
        let client = Client::new(config)
            .await
            .context("building BigQuery client")?;
        info!(project = %cfg.project_id, "connected to warehouse");
        Ok(Self {
            client,
            project_id: cfg.project_id.clone(),
            _credentials: credentials,
        })
    }

    pub fn project_id(&self) -> &str {
        &self.project_id
    }

    /// Create `dataset_id` in location "US" if it does not already exist.
    pub async fn ensure_dataset(&self, dataset_id: &str) -> Result<()> {
        let metadata = Dataset {
            dataset_reference: DatasetReference {
                project_id: self.project_id.clone(),
                dataset_id: dataset_id.to_string(),
                ..Default::default()
            },
            location: Some(DATASET_LOCATION.to_string()),
            ..Default::default()
        };
        match self.client.dataset().create(&metadata).await {
            Ok(_) => {
                info!(dataset = dataset_id, location = DATASET_LOCATION, "created dataset");
                Ok(())
            }
            Err(create_err) => {
                // creation races with itself across runs; an existing
                // dataset is success
                if self
                    .client
                    .dataset()
                    .get(&self.project_id, dataset_id)
                    .await
                    .is_ok()
                {
                    debug!(dataset = dataset_id, "dataset already exists");
                    Ok(())
                } else {
                    Err(create_err)
                        .with_context(|| format!("creating dataset {}", dataset_id))
                }
            }
        }
    }

    /// Replace `dataset_id.table_id` with the frame's contents: drop the
    /// table if present, recreate it with the schema detected from the
    /// frame, insert every row. Returns only once all rows are accepted.
    pub async fn load_frame(
        &self,
        frame: &CsvFrame,
        dataset_id: &str,
        table_id: &str,
    ) -> Result<usize> {
        let table_ref = format!("{}.{}.{}", self.project_id, dataset_id, table_id);

        if self
            .client
            .table()
            .get(&self.project_id, dataset_id, table_id)
            .await
            .is_ok()
        {
            self.client
                .table()
                .delete(&self.project_id, dataset_id, table_id)
                .await
                .with_context(|| format!("dropping {}", table_ref))?;
            debug!(table = %table_ref, "dropped existing table");
        }

        let metadata = Table {
            table_reference: TableReference {
                project_id: self.project_id.clone(),
                dataset_id: dataset_id.to_string(),
                table_id: table_id.to_string(),
                ..Default::default()
            },
            schema: Some(table_schema(frame.schema())),
            ..Default::default()
        };
        self.client
            .table()
            .create(&metadata)
            .await
            .with_context(|| format!("creating {}", table_ref))?;

        let rows = frame.to_json_rows()?;
        let total = rows.len();
        for chunk in rows.chunks(INSERT_CHUNK_ROWS) {
            let request = InsertAllRequest {
                rows: chunk
                    .iter()
                    .map(|row| Row {
                        insert_id: None,
                        json: row.clone(),
                    })
                    .collect(),
                ..Default::default()
            };
            let response = self
                .client
                .tabledata()
                .insert(&self.project_id, dataset_id, table_id, &request)
                .await
                .with_context(|| format!("inserting rows into {}", table_ref))?;
            if let Some(errors) = response.insert_errors {
                if !errors.is_empty() {
                    bail!(
                        "{} rejected {} rows, first: {:?}",
                        table_ref,
                        errors.len(),
                        errors[0]
                    );
                }
            }
        }
        debug!(table = %table_ref, rows = total, "all rows accepted");
        Ok(total)
    }
}

pub struct LoadOutcome {
    pub table: String,
    pub rows: usize,
}

/// Load every `(filename, table)` entry of `mapping` from `dataset_dir`, in
/// mapping order. All files are checked up front: either every file is
/// present or nothing is loaded. Once loading starts there is no cross-file
/// atomicity; a failure partway leaves earlier tables committed.
pub async fn load_mapping(
    warehouse: &Warehouse,
    dataset_dir: &Path,
    dataset_id: &str,
    mapping: &[(&str, &str)],
) -> Result<Vec<LoadOutcome>> {
    let expected: Vec<&str> = mapping.iter().map(|(file, _)| *file).collect();
    validate::ensure_files_present(dataset_dir, &expected)?;

    warehouse.ensure_dataset(dataset_id).await?;

    let mut outcomes = Vec::with_capacity(mapping.len());
    for (file, table) in mapping.iter().copied() {
        let frame = CsvFrame::read_csv(&dataset_dir.join(file))?;
        let rows = warehouse
            .load_frame(&frame, dataset_id, table)
            .await
            .with_context(|| format!("loading {} into {}", file, table))?;
        info!(file, table, rows, "table refreshed");
        outcomes.push(LoadOutcome {
            table: table.to_string(),
            rows,
        });
    }
    Ok(outcomes)
}

/// Column types detected from the frame. Every column is NULLABLE; CSV
/// inference cannot prove a column non-null.
fn table_schema(schema: &Schema) -> TableSchema {
    TableSchema {
        fields: schema
            .fields()
            .iter()
            .map(|field| TableFieldSchema {
                name: field.name().clone(),
                data_type: bigquery_field_type(field.data_type()),
                mode: Some(TableFieldMode::Nullable),
                ..Default::default()
            })
            .collect(),
    }
}

fn bigquery_field_type(data_type: &DataType) -> TableFieldType {
    match data_type {
        DataType::Boolean => TableFieldType::Boolean,
        DataType::Int8
        | DataType::Int16
        | DataType::Int32
        | DataType::Int64
        | DataType::UInt8
        | DataType::UInt16
        | DataType::UInt32
        | DataType::UInt64 => TableFieldType::Integer,
        DataType::Float16 | DataType::Float32 | DataType::Float64 => TableFieldType::Float,
        DataType::Decimal128(_, _) | DataType::Decimal256(_, _) => TableFieldType::Numeric,
        // a zone-less timestamp is a civil DATETIME, not an instant
        DataType::Timestamp(_, Some(_)) => TableFieldType::Timestamp,
        DataType::Timestamp(_, None) => TableFieldType::Datetime,
        DataType::Date32 | DataType::Date64 => TableFieldType::Date,
        DataType::Time32(_) | DataType::Time64(_) => TableFieldType::Time,
        _ => TableFieldType::String,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use arrow::datatypes::{Field, TimeUnit};

    #[test]
    fn detects_column_types_from_arrow_schema() {
        let schema = Schema::new(vec![
            Field::new("id", DataType::Utf8, true),
            Field::new("qty", DataType::Int64, true),
            Field::new("price", DataType::Float64, true),
            Field::new("approved", DataType::Boolean, true),
            Field::new(
                "purchased_at",
                DataType::Timestamp(TimeUnit::Second, None),
                true,
            ),
            Field::new("shipped_on", DataType::Date32, true),
        ]);
        let detected = table_schema(&schema);
        assert_eq!(detected.fields.len(), 6);
        assert!(matches!(detected.fields[0].data_type, TableFieldType::String));
        assert!(matches!(detected.fields[1].data_type, TableFieldType::Integer));
        assert!(matches!(detected.fields[2].data_type, TableFieldType::Float));
        assert!(matches!(detected.fields[3].data_type, TableFieldType::Boolean));
        assert!(matches!(detected.fields[4].data_type, TableFieldType::Datetime));
        assert!(matches!(detected.fields[5].data_type, TableFieldType::Date));
    }

    #[test]
    fn every_detected_column_is_nullable() {
        let schema = Schema::new(vec![Field::new("id", DataType::Utf8, false)]);
        let detected = table_schema(&schema);
        assert!(matches!(
            detected.fields[0].mode,
            Some(TableFieldMode::Nullable)
        ));
    }

    #[test]
    fn field_names_survive_detection() {
        let schema = Schema::new(vec![
            Field::new("order_id", DataType::Utf8, true),
            Field::new("order_status", DataType::Utf8, true),
        ]);
        let detected = table_schema(&schema);
        let names: Vec<&str> = detected.fields.iter().map(|f| f.name.as_str()).collect();
        assert_eq!(names, vec!["order_id", "order_status"]);
    }
}
