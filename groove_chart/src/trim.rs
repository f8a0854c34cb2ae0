//! Trimming of the downwind prefix off an along-track distance series.

use serde::{Deserialize, Serialize};

use crate::ChartError;

/// Distance and value series restricted to the inbound segment.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct TrimmedTrack {
    /// Index into the original series where the inbound segment begins.
    pub start: usize,
    pub distances: Vec<f64>,
    pub values: Vec<f64>,
}

impl TrimmedTrack {
    pub fn len(&self) -> usize {
        self.distances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.distances.is_empty()
    }
}

/// Index at which the final inbound run of `distances` begins.
///
/// The recording may open with a downwind leg where the distance grows
/// before the aircraft turns in. The boundary is the last positive sample
/// that is larger than its predecessor; from there on the distance only
/// closes. A series that never grows yields 0.
pub fn find_approach_start(distances: &[f64]) -> Result<usize, ChartError> {
    let mut boundary = 0;
    let mut previous: Option<f64> = None;
    for (index, &value) in distances.iter().enumerate() {
        if !value.is_finite() {
            return Err(ChartError::SequenceIntegrity { index, value });
        }
        if let Some(prev) = previous {
            if value > prev && value > 0.0 {
                boundary = index;
            }
        }
        previous = Some(value);
    }
    Ok(boundary)
}

/// Slice both series to the inbound segment of `distances`.
pub fn trim_track(distances: &[f64], values: &[f64]) -> Result<TrimmedTrack, ChartError> {
    if distances.len() != values.len() {
        return Err(ChartError::InterpolationDomain(format!(
            "distance series has {} samples but value series has {}",
            distances.len(),
            values.len()
        )));
    }
    let start = find_approach_start(distances)?;
    tracing::debug!(start, total = distances.len(), "approach start located");
    Ok(TrimmedTrack {
        start,
        distances: distances[start..].to_vec(),
        values: values[start..].to_vec(),
    })
}
