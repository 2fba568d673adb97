// src/flow.rs
use anyhow::{anyhow, Context, Result};
use arrow::{
    array::{Array, ArrayRef, Int64Array, StringArray},
    compute::cast,
    datatypes::{DataType, Field, Schema},
    record_batch::RecordBatch,
};
use bytes::Bytes;
use parquet::{
    arrow::{arrow_reader::ParquetRecordBatchReaderBuilder, ArrowWriter},
    basic::Compression,
    file::properties::WriterProperties,
};
use std::sync::Arc;
use tracing::debug;

/// Field count of a version 2 default-format flow log line:
/// `version account-id interface-id srcaddr dstaddr srcport dstport protocol packets bytes start end action log-status`
pub const FLOW_LOG_FIELDS: usize = 14;

const SRCADDR: usize = 3;
const DSTADDR: usize = 4;
const SRCPORT: usize = 5;
const DSTPORT: usize = 6;
const PROTOCOL: usize = 7;
const BYTES: usize = 9;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FlowRecord {
    pub srcaddr: String,
    pub dstaddr: String,
    pub srcport: i64,
    pub dstport: i64,
    /// Kept as text: `-` shows up on NODATA records.
    pub protocol: String,
    pub bytes: u64,
}

/// Parse one text line. Short lines are not flow records.
pub fn parse_flow_line(line: &str) -> Option<FlowRecord> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() < FLOW_LOG_FIELDS {
        return None;
    }
    Some(FlowRecord {
        srcaddr: fields[SRCADDR].to_string(),
        dstaddr: fields[DSTADDR].to_string(),
        srcport: fields[SRCPORT].parse().unwrap_or(0),
        dstport: fields[DSTPORT].parse().unwrap_or(0),
        protocol: fields[PROTOCOL].to_string(),
        bytes: fields[BYTES].parse().unwrap_or(0),
    })
}

pub fn parse_flow_text(text: &str) -> Vec<FlowRecord> {
    text.lines()
        .filter(|l| !l.trim().is_empty())
        .filter_map(parse_flow_line)
        .collect()
}

fn flow_schema() -> Arc<Schema> {
    Arc::new(Schema::new(vec![
        Field::new("srcaddr", DataType::Utf8, false),
        Field::new("dstaddr", DataType::Utf8, false),
        Field::new("srcport", DataType::Int64, true),
        Field::new("dstport", DataType::Int64, true),
        Field::new("protocol", DataType::Int64, true),
        Field::new("bytes", DataType::Int64, true),
    ]))
}

/// Encode records as a single-row-group, snappy-compressed parquet file.
pub fn write_flow_parquet(records: &[FlowRecord]) -> Result<Vec<u8>> {
    let schema = flow_schema();
    let columns: Vec<ArrayRef> = vec![
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.srcaddr.as_str()))),
        Arc::new(StringArray::from_iter_values(records.iter().map(|r| r.dstaddr.as_str()))),
        Arc::new(Int64Array::from_iter(records.iter().map(|r| Some(r.srcport)))),
        Arc::new(Int64Array::from_iter(records.iter().map(|r| Some(r.dstport)))),
        Arc::new(Int64Array::from_iter(
            records.iter().map(|r| r.protocol.parse::<i64>().ok()),
        )),
        Arc::new(Int64Array::from_iter(
            records.iter().map(|r| i64::try_from(r.bytes).ok()),
        )),
    ];
    let batch = RecordBatch::try_new(schema.clone(), columns)?;

    let props = WriterProperties::builder()
        .set_compression(Compression::SNAPPY)
        .build();
    let mut buf = Vec::new();
    let mut writer = ArrowWriter::try_new(&mut buf, schema, Some(props))?;
    writer.write(&batch)?;
    writer.close()?;
    Ok(buf)
}

/// Column `name` cast to `to`, or `None` when the file lacks it.
fn column_as(batch: &RecordBatch, name: &str, to: &DataType) -> Result<Option<ArrayRef>> {
    match batch.column_by_name(name) {
        Some(col) => Ok(Some(
            cast(col.as_ref(), to).with_context(|| format!("casting column {name} to {to}"))?,
        )),
        None => Ok(None),
    }
}

fn strings<'a>(arr: &'a ArrayRef, name: &str) -> Result<&'a StringArray> {
    arr.as_any()
        .downcast_ref::<StringArray>()
        .ok_or_else(|| anyhow!("column {name} is not utf8 after cast"))
}

fn ints<'a>(arr: &'a Option<ArrayRef>, name: &str) -> Result<Option<&'a Int64Array>> {
    arr.as_ref()
        .map(|a| {
            a.as_any()
                .downcast_ref::<Int64Array>()
                .ok_or_else(|| anyhow!("column {name} is not int64 after cast"))
        })
        .transpose()
}

fn int_at(arr: Option<&Int64Array>, row: usize) -> Option<i64> {
    arr.filter(|a| a.is_valid(row)).map(|a| a.value(row))
}

/// Decode a flow-log parquet object. `srcaddr` and `dstaddr` are required;
/// ports, protocol and bytes may be missing or null. Any column type that
/// casts to the expected one is accepted.
pub fn read_flow_parquet(data: Bytes) -> Result<Vec<FlowRecord>> {
    let reader = ParquetRecordBatchReaderBuilder::try_new(data)
        .context("opening flow-log parquet")?
        .with_batch_size(8192)
        .build()?;

    let mut out = Vec::new();
    for batch in reader {
        let batch = batch?;
        let src = column_as(&batch, "srcaddr", &DataType::Utf8)?
            .ok_or_else(|| anyhow!("flow-log parquet has no srcaddr column"))?;
        let dst = column_as(&batch, "dstaddr", &DataType::Utf8)?
            .ok_or_else(|| anyhow!("flow-log parquet has no dstaddr column"))?;
        let srcport = column_as(&batch, "srcport", &DataType::Int64)?;
        let dstport = column_as(&batch, "dstport", &DataType::Int64)?;
        let protocol = column_as(&batch, "protocol", &DataType::Utf8)?;
        let bytes = column_as(&batch, "bytes", &DataType::Int64)?;

        let src = strings(&src, "srcaddr")?;
        let dst = strings(&dst, "dstaddr")?;
        let protocol = protocol
            .as_ref()
            .map(|p| strings(p, "protocol"))
            .transpose()?;
        let srcport = ints(&srcport, "srcport")?;
        let dstport = ints(&dstport, "dstport")?;
        let bytes = ints(&bytes, "bytes")?;

        for row in 0..batch.num_rows() {
            if src.is_null(row) || dst.is_null(row) {
                continue;
            }
            out.push(FlowRecord {
                srcaddr: src.value(row).to_string(),
                dstaddr: dst.value(row).to_string(),
                srcport: int_at(srcport, row).unwrap_or(0),
                dstport: int_at(dstport, row).unwrap_or(0),
                protocol: protocol
                    .filter(|p| p.is_valid(row))
                    .map(|p| p.value(row).to_string())
                    .unwrap_or_else(|| "-".to_string()),
                bytes: int_at(bytes, row).and_then(|b| u64::try_from(b).ok()).unwrap_or(0),
            });
        }
    }
    debug!(records = out.len(), "decoded flow-log parquet");
    Ok(out)
}
