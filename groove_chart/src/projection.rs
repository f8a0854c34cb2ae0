//! Projection of angular tolerance limits into spatial band curves.
//!
//! A tolerance table gives each band as an angle off the ideal approach. To
//! overlay it on a track plotted against along-track distance (cables), each
//! angle becomes a curve `offset(x)`, shifted along-track by a longitudinal
//! correction that moves the band origin from the ramp to the reference point
//! of the landing aid.
//!
//! Lateral (lineup) bands are biased by a fixed front-back angle before
//! projection and stay in cables; vertical (glideslope) bands are projected
//! without bias on distances converted to feet, giving heights in feet. The
//! two frames differ on purpose and must not be unified.

use ndarray::Array1;
use serde::{Deserialize, Serialize};

use crate::airframe::{Band, Quantity, Severity, ToleranceTable};
use crate::units::{cbl_to_feet, feet_to_cbl};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq)]
pub enum Projection {
    /// `tan(limit + front_back) * x + lateral`, everything in cables.
    Lateral {
        front_back_deg: f64,
        lateral_correction_ft: f64,
    },
    /// `tan(limit) * x` with `x` in feet, result in feet.
    Vertical,
    /// The limit value itself at every distance.
    Level,
}

/// One projected band.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct LimitCurve {
    pub band: Band,
    pub label: String,
    pub limit: f64,
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

impl LimitCurve {
    pub fn severity(&self) -> Severity {
        self.band.severity()
    }
}

/// Shaded region between two adjacent band curves.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct FillRegion {
    pub from: Band,
    pub to: Band,
    pub severity: Severity,
    pub xs: Vec<f64>,
    pub y_from: Vec<f64>,
    pub y_to: Vec<f64>,
}

#[derive(Clone, Copy, Debug, PartialEq)]
pub struct LimitBandProjector {
    pub longitudinal_correction_ft: f64,
    pub projection: Projection,
}

impl LimitBandProjector {
    pub fn new(longitudinal_correction_ft: f64, projection: Projection) -> Self {
        Self {
            longitudinal_correction_ft,
            projection,
        }
    }

    pub fn level() -> Self {
        Self::new(0.0, Projection::Level)
    }

    /// Project a single limit over `distances` (cables).
    ///
    /// Returns the shifted along-track positions and the band offset at each.
    pub fn project(&self, limit: f64, distances: &[f64]) -> (Vec<f64>, Vec<f64>) {
        let x = Array1::from(distances.to_vec());
        let ys = match self.projection {
            Projection::Lateral {
                front_back_deg,
                lateral_correction_ft,
            } => {
                let slope = (limit + front_back_deg).to_radians().tan();
                let lateral = feet_to_cbl(lateral_correction_ft);
                x.mapv(|d| slope * d + lateral)
            }
            Projection::Vertical => {
                let slope = limit.to_radians().tan();
                x.mapv(|d| slope * cbl_to_feet(d))
            }
            Projection::Level => Array1::from_elem(x.len(), limit),
        };
        let xs = x + feet_to_cbl(self.longitudinal_correction_ft);
        (xs.to_vec(), ys.to_vec())
    }

    /// One curve per band of `table`, in table order.
    pub fn project_table(&self, table: &ToleranceTable, distances: &[f64]) -> Vec<LimitCurve> {
        let quantity: Quantity = table.quantity();
        table
            .iter()
            .map(|(band, limit)| {
                let (xs, ys) = self.project(limit, distances);
                LimitCurve {
                    band,
                    label: band.label(quantity).to_string(),
                    limit,
                    xs,
                    ys,
                }
            })
            .collect()
    }
}

/// Evenly spaced distances from 0 to `max_cbl` used to draw limit bands.
pub fn limit_axis(max_cbl: f64, samples: usize) -> Vec<f64> {
    Array1::linspace(0.0, max_cbl, samples).to_vec()
}

/// Shading regions between adjacent bands, built from projected curves.
pub fn fill_regions(curves: &[LimitCurve]) -> Vec<FillRegion> {
    let find = |band: Band| curves.iter().find(|c| c.band == band);
    Band::FILL_PAIRS
        .iter()
        .filter_map(|&(from, to, severity)| {
            let a = find(from)?;
            let b = find(to)?;
            Some(FillRegion {
                from,
                to,
                severity,
                xs: a.xs.clone(),
                y_from: a.ys.clone(),
                y_to: b.ys.clone(),
            })
        })
        .collect()
}
