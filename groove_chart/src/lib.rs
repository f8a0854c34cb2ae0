//! Carrier-approach diagnostics: limit-band geometry, groove track trimming and
//! interpolation, and the four-panel approach chart model handed to a renderer.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

pub mod airframe;
pub mod chart;
pub mod interpolate;
pub mod projection;
pub mod record;
pub mod trim;
pub mod units;

pub use airframe::{AirframeKind, Band, Quantity, Severity, ToleranceCatalog, ToleranceTable};
pub use chart::{
    ApproachChart, ChartLayout, ChartRenderer, ChartStage, CurveStyle, Deviation, DistanceMark,
    Panel, PanelKind, Plot, PlotCurve, ShadeRegion,
};
pub use interpolate::{interpolate, SmoothCurve};
pub use projection::{FillRegion, LimitBandProjector, LimitCurve, Projection};
pub use record::{load_records, parse_records, sanitize_header, FlightRecord, FlightRecords};
pub use trim::{find_approach_start, trim_track, TrimmedTrack};

#[derive(Error, Debug)]
pub enum ChartError {
    #[error("missing required columns: {}", missing.join(", "))]
    Schema { missing: Vec<String> },
    #[error("malformed distance sample {value} at index {index}")]
    SequenceIntegrity { index: usize, value: f64 },
    #[error("cannot interpolate track: {0}")]
    InterpolationDomain(String),
    #[error("no {quantity} limits defined for {airframe}")]
    MissingLimits {
        airframe: AirframeKind,
        quantity: Quantity,
    },
    #[error("failed to read flight record CSV: {0}")]
    Csv(String),
    #[error("chart stage {found:?} reached, {expected:?} required")]
    Stage {
        expected: ChartStage,
        found: ChartStage,
    },
    #[error("rendering failed: {0}")]
    Render(String),
    #[error("invalid parameter: {0}")]
    InvalidParameter(String),
}

impl ChartError {
    /// Short stable name for batch reports.
    pub fn kind(&self) -> &'static str {
        match self {
            ChartError::Schema { .. } => "SchemaError",
            ChartError::SequenceIntegrity { .. } => "SequenceIntegrityError",
            ChartError::InterpolationDomain(_) => "InterpolationDomainError",
            ChartError::MissingLimits { .. } => "MissingLimitsError",
            ChartError::Csv(_) => "CsvError",
            ChartError::Stage { .. } => "StageError",
            ChartError::Render(_) => "RenderError",
            ChartError::InvalidParameter(_) => "InvalidParameter",
        }
    }
}

/// Which glideslope-error table belongs to the AV-8B.
///
/// Two tables circulate for the glideslope error bands and they disagree on
/// which one is the Harrier's. Neither is picked silently; the caller chooses.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum GseVariant {
    /// AV-8B gets the wide table (+1.9 / -1.5 deg), everyone else the narrow one.
    #[default]
    HarrierWide,
    /// AV-8B gets the narrow table (+1.5 / -0.9 deg), everyone else the wide one.
    HarrierNarrow,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ChartParams {
    /// Points in each resampled track curve.
    pub smooth_samples: usize,
    pub gse_variant: GseVariant,
    /// Along-track shift of the groove bands from the ramp to the wire.
    pub groove_longitudinal_correction_ft: f64,
    pub groove_lateral_correction_ft: f64,
    /// Bias added to every lineup limit before it is projected laterally.
    pub front_back_correction_deg: f64,
    /// Along-track shift of the glideslope bands to the lens origin.
    pub glideslope_longitudinal_correction_ft: f64,
    pub distance_axis_max_cbl: f64,
    /// Points along each limit band.
    pub limit_samples: usize,
    pub inset_axis_max_cbl: f64,
    pub altitude_headroom_ft: f64,
}

impl Default for ChartParams {
    fn default() -> Self {
        Self {
            smooth_samples: 500,
            gse_variant: GseVariant::HarrierWide,
            groove_longitudinal_correction_ft: 300.0,
            groove_lateral_correction_ft: 0.0,
            front_back_correction_deg: 9.0,
            glideslope_longitudinal_correction_ft: 250.0,
            distance_axis_max_cbl: 15.0,
            limit_samples: 15,
            inset_axis_max_cbl: 6.0,
            altitude_headroom_ft: 50.0,
        }
    }
}

impl ChartParams {
    /// Load parameters from a JSON file; absent keys keep their defaults.
    pub fn from_json_file(path: &Path) -> Result<Self, ChartError> {
        let text = fs::read_to_string(path).map_err(|e| {
            ChartError::InvalidParameter(format!("cannot read {}: {}", path.display(), e))
        })?;
        let params: ChartParams = serde_json::from_str(&text).map_err(|e| {
            ChartError::InvalidParameter(format!("{} is not a valid config: {}", path.display(), e))
        })?;
        params.validate()?;
        Ok(params)
    }

    pub fn validate(&self) -> Result<(), ChartError> {
        if self.smooth_samples < 2 {
            return Err(ChartError::InvalidParameter(
                "smooth_samples must be at least 2".into(),
            ));
        }
        if self.limit_samples < 2 {
            return Err(ChartError::InvalidParameter(
                "limit_samples must be at least 2".into(),
            ));
        }
        let finite = [
            ("groove_longitudinal_correction_ft", self.groove_longitudinal_correction_ft),
            ("groove_lateral_correction_ft", self.groove_lateral_correction_ft),
            ("front_back_correction_deg", self.front_back_correction_deg),
            (
                "glideslope_longitudinal_correction_ft",
                self.glideslope_longitudinal_correction_ft,
            ),
            ("altitude_headroom_ft", self.altitude_headroom_ft),
        ];
        for (name, value) in finite {
            if !value.is_finite() {
                return Err(ChartError::InvalidParameter(format!("{name} must be finite")));
            }
        }
        for (name, value) in [
            ("distance_axis_max_cbl", self.distance_axis_max_cbl),
            ("inset_axis_max_cbl", self.inset_axis_max_cbl),
        ] {
            if !(value.is_finite() && value > 0.0) {
                return Err(ChartError::InvalidParameter(format!(
                    "{name} must be a positive distance"
                )));
            }
        }
        Ok(())
    }
}
