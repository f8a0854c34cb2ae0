//! Flight-recorder CSV loading.

use std::borrow::Cow;
use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::ChartError;

/// Columns that must be present in the header after sanitization.
pub const REQUIRED_COLUMNS: [&str; 18] = [
    "Time", "Rho", "X", "Z", "Alt", "AoA", "GSE", "LUE", "Vtot", "Vy", "Gamma", "Pitch", "Roll",
    "Yaw", "Step", "Grade", "Points", "Details",
];

/// One sampled instant of the approach.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FlightRecord {
    /// Seconds since approach start.
    #[serde(rename = "Time")]
    pub time: f64,
    /// Distance to the rundown, NM.
    #[serde(rename = "Rho")]
    pub rho: f64,
    /// Along-track position relative to the carrier, m.
    #[serde(rename = "X")]
    pub x: f64,
    /// Cross-track position relative to the carrier, m.
    #[serde(rename = "Z")]
    pub z: f64,
    /// Altitude, ft.
    #[serde(rename = "Alt")]
    pub alt: f64,
    #[serde(rename = "AoA")]
    pub aoa: f64,
    #[serde(rename = "GSE")]
    pub gse: f64,
    #[serde(rename = "LUE")]
    pub lue: f64,
    /// Total speed, kt.
    #[serde(rename = "Vtot")]
    pub vtot: f64,
    /// Vertical speed, ft/min.
    #[serde(rename = "Vy")]
    pub vy: f64,
    #[serde(rename = "Gamma")]
    pub gamma: f64,
    #[serde(rename = "Pitch")]
    pub pitch: f64,
    #[serde(rename = "Roll")]
    pub roll: f64,
    #[serde(rename = "Yaw")]
    pub yaw: f64,
    #[serde(rename = "Step")]
    pub step: String,
    #[serde(rename = "Grade")]
    pub grade: String,
    #[serde(rename = "Points")]
    pub points: f64,
    #[serde(rename = "Details")]
    pub details: String,
}

/// A loaded recording. Read-only once constructed.
#[derive(Clone, Debug)]
pub struct FlightRecords {
    label: String,
    rows: Vec<FlightRecord>,
}

impl FlightRecords {
    pub fn new(label: impl Into<String>, rows: Vec<FlightRecord>) -> Self {
        Self {
            label: label.into(),
            rows,
        }
    }

    pub fn label(&self) -> &str {
        &self.label
    }

    pub fn rows(&self) -> &[FlightRecord] {
        &self.rows
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column(&self, field: impl Fn(&FlightRecord) -> f64) -> Vec<f64> {
        self.rows.iter().map(field).collect()
    }

    pub fn max_alt(&self) -> Option<f64> {
        self.rows
            .iter()
            .map(|r| r.alt)
            .filter(|v| v.is_finite())
            .reduce(f64::max)
    }
}

/// Strip a leading `#` from the header line.
///
/// Some recorder builds write the header as a comment; everything past the
/// first line is returned untouched.
pub fn sanitize_header(text: &str) -> Cow<'_, str> {
    let body = text.strip_prefix('\u{feff}').unwrap_or(text);
    match body.strip_prefix('#') {
        Some(rest) => Cow::Owned(rest.to_string()),
        None => Cow::Borrowed(body),
    }
}

/// Parse sanitized CSV text into records labelled with `label`.
pub fn parse_records(text: &str, label: &str) -> Result<FlightRecords, ChartError> {
    let mut reader = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(text.as_bytes());
    let headers = reader
        .headers()
        .map_err(|e| ChartError::Csv(e.to_string()))?
        .clone();
    let missing: Vec<String> = REQUIRED_COLUMNS
        .iter()
        .filter(|col| !headers.iter().any(|h| h == **col))
        .map(|col| col.to_string())
        .collect();
    if !missing.is_empty() {
        return Err(ChartError::Schema { missing });
    }

    let mut rows = Vec::new();
    for (idx, row) in reader.deserialize::<FlightRecord>().enumerate() {
        let record = row.map_err(|e| ChartError::Csv(format!("row {}: {}", idx + 1, e)))?;
        rows.push(record);
    }
    Ok(FlightRecords::new(label, rows))
}

/// Read, sanitize and parse a recording; the file name is the dataset label.
pub fn load_records(path: &Path) -> Result<FlightRecords, ChartError> {
    let raw = fs::read_to_string(path)
        .map_err(|e| ChartError::Csv(format!("cannot read {}: {}", path.display(), e)))?;
    let label = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.display().to_string());
    parse_records(&sanitize_header(&raw), &label)
}
