use std::path::Path;
use std::sync::Arc;

use anyhow::{Context, Result};
use arrow::array::{Float64Array, UInt32Array};
use arrow::datatypes::{DataType, Field, Schema};
use arrow::record_batch::RecordBatch;
use parquet::arrow::ArrowWriter;

use super::model::MergedDataset;

// ---------------------------------------------------------------------------
// Arrow view of a merged dataset
// ---------------------------------------------------------------------------

/// Flatten a merged dataset into one long table:
/// `time | x | <variable> | level`, ordered by time then coordinate.
pub fn to_record_batch(dataset: &MergedDataset) -> Result<RecordBatch> {
    let n = dataset.len();
    let mut time = Vec::with_capacity(n);
    let mut x = Vec::with_capacity(n);
    let mut value = Vec::with_capacity(n);
    let mut level = Vec::with_capacity(n);

    for slice in &dataset.slices {
        for s in &slice.samples {
            time.push(slice.time);
            x.push(s.x);
            value.push(s.value);
            level.push(s.level);
        }
    }

    let schema = Arc::new(Schema::new(vec![
        Field::new("time", DataType::Float64, false),
        Field::new("x", DataType::Float64, false),
        Field::new(&dataset.variable, DataType::Float64, false),
        Field::new("level", DataType::UInt32, false),
    ]));

    RecordBatch::try_new(
        schema,
        vec![
            Arc::new(Float64Array::from(time)),
            Arc::new(Float64Array::from(x)),
            Arc::new(Float64Array::from(value)),
            Arc::new(UInt32Array::from(level)),
        ],
    )
    .with_context(|| format!("building record batch for '{}'", dataset.variable))
}

// ---------------------------------------------------------------------------
// CSV writer
// ---------------------------------------------------------------------------

/// Write `time,x,<variable>,level` rows with a header line.
pub fn write_csv(dataset: &MergedDataset, path: &Path) -> Result<()> {
    let mut writer = csv::Writer::from_path(path)
        .with_context(|| format!("creating {}", path.display()))?;
    writer
        .write_record(["time", "x", dataset.variable.as_str(), "level"])
        .context("writing CSV header")?;

    for slice in &dataset.slices {
        for s in &slice.samples {
            writer
                .write_record([
                    slice.time.to_string(),
                    s.x.to_string(),
                    s.value.to_string(),
                    s.level.to_string(),
                ])
                .with_context(|| format!("writing CSV row t = {}, x = {}", slice.time, s.x))?;
        }
    }
    writer.flush().context("flushing CSV")?;
    Ok(())
}

// ---------------------------------------------------------------------------
// Parquet writer
// ---------------------------------------------------------------------------

pub fn write_parquet(dataset: &MergedDataset, path: &Path) -> Result<()> {
    let batch = to_record_batch(dataset)?;
    let file = std::fs::File::create(path)
        .with_context(|| format!("creating {}", path.display()))?;
    let mut writer =
        ArrowWriter::try_new(file, batch.schema(), None).context("creating parquet writer")?;
    writer.write(&batch).context("writing parquet batch")?;
    writer.close().context("closing parquet writer")?;
    Ok(())
}
