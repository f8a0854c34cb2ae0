//! Length conversions between the units the recorder and the LSO use.
//!
//! Distances along the groove are plotted in cables (tenths of a nautical
//! mile), heights in feet, and the recorder stores positions in meters.

use serde::{Deserialize, Serialize};

pub const METERS_PER_NM: f64 = 1852.0;
pub const METERS_PER_CBL: f64 = 185.2;
pub const FEET_PER_METER: f64 = 3.2808399;
pub const FEET_PER_CBL: f64 = 607.61155;
pub const FEET_PER_NM: f64 = 6076.11549;
pub const CBL_PER_NM: f64 = 10.0;

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum LengthUnit {
    Meters,
    NauticalMiles,
    Cables,
    Feet,
}

pub fn meters_to_nm(meters: f64) -> f64 {
    meters / METERS_PER_NM
}

pub fn nm_to_meters(nm: f64) -> f64 {
    nm * METERS_PER_NM
}

pub fn meters_to_cbl(meters: f64) -> f64 {
    meters / METERS_PER_CBL
}

pub fn meters_to_feet(meters: f64) -> f64 {
    meters * FEET_PER_METER
}

pub fn nm_to_cbl(nm: f64) -> f64 {
    nm * CBL_PER_NM
}

pub fn nm_to_feet(nm: f64) -> f64 {
    nm * FEET_PER_NM
}

pub fn cbl_to_feet(cbl: f64) -> f64 {
    cbl * FEET_PER_CBL
}

pub fn feet_to_cbl(feet: f64) -> f64 {
    feet / FEET_PER_CBL
}

/// Distance of `quarters` quarter nautical miles expressed in `unit`.
pub fn mile_quarts(quarters: u32, unit: LengthUnit) -> f64 {
    let nm = f64::from(quarters) / 4.0;
    match unit {
        LengthUnit::Meters => nm_to_meters(nm),
        LengthUnit::NauticalMiles => nm,
        LengthUnit::Cables => nm_to_cbl(nm),
        LengthUnit::Feet => nm_to_feet(nm),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn feet_cable_round_trip() {
        for x in [-1234.5, -1.0, 0.0, 1e-6, 2.5, 15.0, 98765.4321] {
            assert_abs_diff_eq!(feet_to_cbl(cbl_to_feet(x)), x, epsilon = 1e-9);
        }
    }

    #[test]
    fn one_nautical_mile_is_ten_cables() {
        assert_abs_diff_eq!(meters_to_cbl(nm_to_meters(1.0)), 10.0, epsilon = 1e-12);
        assert_abs_diff_eq!(meters_to_nm(1852.0), 1.0);
        assert_abs_diff_eq!(cbl_to_feet(10.0), nm_to_feet(1.0), epsilon = 1e-3);
    }

    #[test]
    fn quarter_mile_break_points() {
        assert_abs_diff_eq!(mile_quarts(1, LengthUnit::Cables), 2.5);
        assert_abs_diff_eq!(mile_quarts(3, LengthUnit::Cables), 7.5);
        assert_abs_diff_eq!(mile_quarts(2, LengthUnit::NauticalMiles), 0.5);
        assert_abs_diff_eq!(mile_quarts(4, LengthUnit::Meters), 1852.0);
    }
}
