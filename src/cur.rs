// src/cur.rs
use anyhow::{Context, Result};
use chrono::NaiveDate;
use csv::{ReaderBuilder, Trim, WriterBuilder};
use flate2::{read::GzDecoder, write::GzEncoder, Compression};
use serde::{Deserialize, Deserializer, Serialize};
use std::io::{Read, Write};
use tracing::{debug, warn};

pub const USAGE_START_COLUMN: &str = "lineItem/usageStartDate";

/// One Cost and Usage Report line item, restricted to the columns the analysis reads.
///
/// Field order is the CSV column order on write. On read, columns are matched
/// by header name; missing ones fall back to empty strings and zero amounts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CurRecord {
    #[serde(rename = "lineItem/usageStartDate", default)]
    pub usage_start_date: String,
    #[serde(rename = "lineItem/usageEndDate", default)]
    pub usage_end_date: String,
    #[serde(rename = "lineItem/resourceId", default)]
    pub resource_id: String,
    #[serde(rename = "lineItem/usageType", default)]
    pub usage_type: String,
    #[serde(rename = "lineItem/blendedCost", default, deserialize_with = "lenient_f64")]
    pub blended_cost: f64,
    #[serde(rename = "lineItem/usageAmount", default, deserialize_with = "lenient_f64")]
    pub usage_amount: f64,
    #[serde(rename = "product/serviceName", default)]
    pub service_name: String,
    #[serde(rename = "product/region", default)]
    pub region: String,
    #[serde(rename = "product/productFamily", default)]
    pub product_family: String,
}

impl CurRecord {
    /// Usage start as a date. Accepts `YYYY-MM-DD` and anything that starts
    /// with it, such as `2024-01-01T00:00:00Z`.
    pub fn usage_start(&self) -> Option<NaiveDate> {
        let s = self.usage_start_date.trim();
        let day = s.get(..10)?;
        NaiveDate::parse_from_str(day, "%Y-%m-%d").ok()
    }

    /// Data transfer line: product family or usage type says so.
    pub fn is_data_transfer(&self) -> bool {
        self.product_family.contains("Data Transfer") || self.usage_type.contains("DataTransfer")
    }
}

fn lenient_f64<'de, D: Deserializer<'de>>(d: D) -> Result<f64, D::Error> {
    let raw = String::deserialize(d)?;
    Ok(raw.trim().parse::<f64>().ok().filter(|v| v.is_finite()).unwrap_or(0.0))
}

/// Records of one CUR object, plus whether it carried a usage start column at all.
#[derive(Debug, Default)]
pub struct CurFile {
    pub records: Vec<CurRecord>,
    pub has_usage_start: bool,
}

/// Parse a CUR CSV object, gunzipping first when `gzip` is set.
pub fn read_cur_csv(data: &[u8], gzip: bool) -> Result<CurFile> {
    let mut text = Vec::with_capacity(data.len());
    if gzip {
        GzDecoder::new(data)
            .read_to_end(&mut text)
            .context("decompressing CUR object")?;
    } else {
        text.extend_from_slice(data);
    }

    let mut rdr = ReaderBuilder::new()
        .has_headers(true)
        .flexible(true)
        .trim(Trim::Headers)
        .from_reader(text.as_slice());

    let has_usage_start = rdr
        .headers()
        .context("reading CUR header row")?
        .iter()
        .any(|h| h == USAGE_START_COLUMN);

    let mut records = Vec::new();
    let mut skipped = 0usize;
    for (idx, row) in rdr.deserialize::<CurRecord>().enumerate() {
        match row {
            Ok(r) => records.push(r),
            Err(e) => {
                skipped += 1;
                debug!(row = idx, error = %e, "skipping malformed CUR row");
            }
        }
    }
    if skipped > 0 {
        warn!(skipped, "CUR object had malformed rows");
    }

    Ok(CurFile {
        records,
        has_usage_start,
    })
}

/// Serialize records as CSV with a header row, gzipped when `gzip` is set.
pub fn write_cur_csv(records: &[CurRecord], gzip: bool) -> Result<Vec<u8>> {
    let mut wtr = WriterBuilder::new().has_headers(true).from_writer(Vec::new());
    for r in records {
        wtr.serialize(r).context("serializing CUR record")?;
    }
    let csv = wtr
        .into_inner()
        .map_err(|e| anyhow::anyhow!("flushing CUR csv: {}", e.error()))?;

    if !gzip {
        return Ok(csv);
    }
    let mut enc = GzEncoder::new(Vec::new(), Compression::default());
    enc.write_all(&csv)?;
    Ok(enc.finish()?)
}
