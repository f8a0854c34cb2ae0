//! Airframe identification and the per-airframe tolerance tables.

use std::collections::HashMap;
use std::fmt;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::{ChartError, GseVariant};

/// Identifier of the tolerance constants shipped with this crate.
pub const CATALOG_VERSION: &str = "lso.tolerances.v1";

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum AirframeKind {
    FA18C,
    F14,
    AV8B,
    Unknown,
}

impl AirframeKind {
    pub const ALL: [AirframeKind; 4] = [
        AirframeKind::FA18C,
        AirframeKind::F14,
        AirframeKind::AV8B,
        AirframeKind::Unknown,
    ];

    /// Resolve the airframe from a dataset label, usually the file name.
    ///
    /// The first marker found in priority order wins; labels carrying none of
    /// them resolve to [`AirframeKind::Unknown`].
    pub fn identify(label: &str) -> AirframeKind {
        if label.contains("FA-18C") || label.contains("F/A-18C") {
            AirframeKind::FA18C
        } else if label.contains("F-14") {
            AirframeKind::F14
        } else if label.contains("AV-8") {
            AirframeKind::AV8B
        } else {
            AirframeKind::Unknown
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            AirframeKind::FA18C => "F/A-18C",
            AirframeKind::F14 => "F-14",
            AirframeKind::AV8B => "AV-8B",
            AirframeKind::Unknown => "Unknown",
        }
    }
}

impl fmt::Display for AirframeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Quantity {
    AoA,
    Groove,
    Glideslope,
    GlideslopeError,
}

impl Quantity {
    pub const ALL: [Quantity; 4] = [
        Quantity::AoA,
        Quantity::Groove,
        Quantity::Glideslope,
        Quantity::GlideslopeError,
    ];
}

impl fmt::Display for Quantity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Quantity::AoA => "AoA",
            Quantity::Groove => "groove",
            Quantity::Glideslope => "glideslope",
            Quantity::GlideslopeError => "glideslope-error",
        })
    }
}

/// How far a band sits from the on-target line.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Severity {
    Target,
    Inner,
    Mid,
    Outer,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, Hash)]
pub enum Band {
    OuterHigh,
    MidHigh,
    InnerHigh,
    OnTarget,
    InnerLow,
    MidLow,
    OuterLow,
}

impl Band {
    /// Table order, outer-high first.
    pub const ALL: [Band; 7] = [
        Band::OuterHigh,
        Band::MidHigh,
        Band::InnerHigh,
        Band::OnTarget,
        Band::InnerLow,
        Band::MidLow,
        Band::OuterLow,
    ];

    /// Adjacent band pairs shaded between, with the severity of the region.
    pub const FILL_PAIRS: [(Band, Band, Severity); 5] = [
        (Band::InnerLow, Band::InnerHigh, Severity::Inner),
        (Band::InnerLow, Band::MidLow, Severity::Mid),
        (Band::InnerHigh, Band::MidHigh, Severity::Mid),
        (Band::MidLow, Band::OuterLow, Severity::Outer),
        (Band::MidHigh, Band::OuterHigh, Severity::Outer),
    ];

    fn index(self) -> usize {
        match self {
            Band::OuterHigh => 0,
            Band::MidHigh => 1,
            Band::InnerHigh => 2,
            Band::OnTarget => 3,
            Band::InnerLow => 4,
            Band::MidLow => 5,
            Band::OuterLow => 6,
        }
    }

    pub fn severity(self) -> Severity {
        match self {
            Band::OnTarget => Severity::Target,
            Band::InnerHigh | Band::InnerLow => Severity::Inner,
            Band::MidHigh | Band::MidLow => Severity::Mid,
            Band::OuterHigh | Band::OuterLow => Severity::Outer,
        }
    }

    /// LSO call printed next to the band line.
    pub fn label(self, quantity: Quantity) -> &'static str {
        const AOA: [&str; 7] = ["__SLO__", "SLO", "(SLO)", "__OK__", "(F)", "F", "__F__"];
        const GROOVE: [&str; 7] = ["__LUL__", "LUL", "(LUL)", "__OK__", "(LUR)", "LUR", "__LUR__"];
        const GLIDESLOPE: [&str; 7] = ["__HI__", "H", "(H)", "__OK__", "(LO)", "LO", "__LO__"];
        const GSE: [&str; 7] = ["__HI__", "H", "(H)", "__OK__", "(L)", "L", "__L__"];
        let labels = match quantity {
            Quantity::AoA => &AOA,
            Quantity::Groove => &GROOVE,
            Quantity::Glideslope => &GLIDESLOPE,
            Quantity::GlideslopeError => &GSE,
        };
        labels[self.index()]
    }
}

/// Seven limit values for one quantity, outer-high to outer-low.
///
/// Values are strictly monotonic in table order. Most tables descend; the
/// groove table ascends because its "high" side is left of centerline.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ToleranceTable {
    quantity: Quantity,
    values: [f64; 7],
}

impl ToleranceTable {
    pub fn new(quantity: Quantity, values: [f64; 7]) -> Result<Self, ChartError> {
        if values.iter().any(|v| !v.is_finite()) {
            return Err(ChartError::InvalidParameter(format!(
                "{quantity} table contains a non-finite limit"
            )));
        }
        let descending = values.windows(2).all(|w| w[0] > w[1]);
        let ascending = values.windows(2).all(|w| w[0] < w[1]);
        if !descending && !ascending {
            return Err(ChartError::InvalidParameter(format!(
                "{quantity} limits are not monotonic: {values:?}"
            )));
        }
        Ok(Self { quantity, values })
    }

    pub fn quantity(&self) -> Quantity {
        self.quantity
    }

    pub fn get(&self, band: Band) -> f64 {
        self.values[band.index()]
    }

    pub fn iter(&self) -> impl Iterator<Item = (Band, f64)> + '_ {
        Band::ALL.iter().map(move |&band| (band, self.get(band)))
    }

    pub fn min(&self) -> f64 {
        self.values.iter().copied().fold(f64::INFINITY, f64::min)
    }

    pub fn max(&self) -> f64 {
        self.values.iter().copied().fold(f64::NEG_INFINITY, f64::max)
    }
}

const AOA_HORNET: [f64; 7] = [9.8, 9.3, 8.8, 8.1, 7.4, 6.9, 6.3];
const GROOVE_ALL: [f64; 7] = [-3.0, -1.0, -0.5, 0.0, 0.5, 1.0, 3.0];
const GLIDESLOPE_HARRIER: [f64; 7] = [5.4, 4.9, 4.2, 3.5, 3.0, 2.3, 2.0];
const GLIDESLOPE_DEFAULT: [f64; 7] = [5.0, 4.3, 3.9, 3.5, 3.2, 2.9, 2.6];
const GSE_WIDE: [f64; 7] = [1.9, 1.4, 0.7, 0.0, -0.5, -1.2, -1.5];
const GSE_NARROW: [f64; 7] = [1.5, 0.8, 0.4, 0.0, -0.3, -0.6, -0.9];

/// Immutable lookup of every (airframe, quantity) tolerance table.
///
/// Built once and shared read-only; a missing entry means the airframe has
/// no published limits for that quantity.
#[derive(Clone, Debug)]
pub struct ToleranceCatalog {
    gse_variant: GseVariant,
    tables: HashMap<(AirframeKind, Quantity), ToleranceTable>,
}

impl ToleranceCatalog {
    /// Build the shipped tables, validating each one.
    pub fn new(gse_variant: GseVariant) -> Result<Self, ChartError> {
        let mut tables = HashMap::new();
        let mut insert = |kind: AirframeKind, quantity: Quantity, values: [f64; 7]| {
            let table = ToleranceTable::new(quantity, values)?;
            tables.insert((kind, quantity), table);
            Ok::<(), ChartError>(())
        };
        for kind in AirframeKind::ALL {
            let harrier = kind == AirframeKind::AV8B;
            if kind == AirframeKind::FA18C {
                insert(kind, Quantity::AoA, AOA_HORNET)?;
            }
            insert(kind, Quantity::Groove, GROOVE_ALL)?;
            let glideslope = if harrier {
                GLIDESLOPE_HARRIER
            } else {
                GLIDESLOPE_DEFAULT
            };
            insert(kind, Quantity::Glideslope, glideslope)?;
            let gse = match (gse_variant, harrier) {
                (GseVariant::HarrierWide, true) | (GseVariant::HarrierNarrow, false) => GSE_WIDE,
                (GseVariant::HarrierWide, false) | (GseVariant::HarrierNarrow, true) => GSE_NARROW,
            };
            insert(kind, Quantity::GlideslopeError, gse)?;
        }
        debug!(tables = tables.len(), ?gse_variant, "tolerance catalog built");
        Ok(Self {
            gse_variant,
            tables,
        })
    }

    pub fn version(&self) -> &'static str {
        CATALOG_VERSION
    }

    pub fn gse_variant(&self) -> GseVariant {
        self.gse_variant
    }

    pub fn table(
        &self,
        kind: AirframeKind,
        quantity: Quantity,
    ) -> Result<&ToleranceTable, ChartError> {
        self.tables
            .get(&(kind, quantity))
            .ok_or(ChartError::MissingLimits {
                airframe: kind,
                quantity,
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn catalog() -> ToleranceCatalog {
        ToleranceCatalog::new(GseVariant::default()).unwrap()
    }

    #[test]
    fn identify_by_label() {
        assert_eq!(AirframeKind::identify("CORR-F-14-Tomcat.csv"), AirframeKind::F14);
        assert_eq!(AirframeKind::identify("random.csv"), AirframeKind::Unknown);
        assert_eq!(AirframeKind::identify("trap_FA-18C_hornet.csv"), AirframeKind::FA18C);
        assert_eq!(AirframeKind::identify("F/A-18C case1"), AirframeKind::FA18C);
        assert_eq!(AirframeKind::identify("AV-8BNA_stennis.csv"), AirframeKind::AV8B);
    }

    #[test]
    fn identify_prefers_hornet_marker() {
        assert_eq!(AirframeKind::identify("FA-18C-vs-F-14.csv"), AirframeKind::FA18C);
        assert_eq!(AirframeKind::identify("AV-8_after_F-14.csv"), AirframeKind::F14);
    }

    #[test]
    fn aoa_only_for_hornet() {
        let catalog = catalog();
        let hornet = catalog.table(AirframeKind::FA18C, Quantity::AoA).unwrap();
        assert_eq!(hornet.get(Band::OuterHigh), 9.8);
        assert_eq!(hornet.get(Band::OnTarget), 8.1);
        assert_eq!(hornet.get(Band::OuterLow), 6.3);
        for kind in [AirframeKind::F14, AirframeKind::AV8B, AirframeKind::Unknown] {
            let err = catalog.table(kind, Quantity::AoA).unwrap_err();
            assert!(matches!(err, ChartError::MissingLimits { quantity: Quantity::AoA, .. }));
        }
    }

    #[test]
    fn harrier_glideslope_differs() {
        let catalog = catalog();
        let harrier = catalog.table(AirframeKind::AV8B, Quantity::Glideslope).unwrap();
        let unknown = catalog.table(AirframeKind::Unknown, Quantity::Glideslope).unwrap();
        assert_eq!(harrier.get(Band::OuterHigh), 5.4);
        assert_eq!(unknown.get(Band::OuterHigh), 5.0);
        assert_eq!(harrier.get(Band::OnTarget), unknown.get(Band::OnTarget));
    }

    #[test]
    fn gse_variant_swaps_assignment() {
        let wide = ToleranceCatalog::new(GseVariant::HarrierWide).unwrap();
        let narrow = ToleranceCatalog::new(GseVariant::HarrierNarrow).unwrap();
        let q = Quantity::GlideslopeError;
        assert_eq!(wide.table(AirframeKind::AV8B, q).unwrap().max(), 1.9);
        assert_eq!(wide.table(AirframeKind::FA18C, q).unwrap().max(), 1.5);
        assert_eq!(narrow.table(AirframeKind::AV8B, q).unwrap().max(), 1.5);
        assert_eq!(narrow.table(AirframeKind::FA18C, q).unwrap().min(), -1.5);
    }

    #[test]
    fn groove_is_shared_and_ascending() {
        let catalog = catalog();
        let a = catalog.table(AirframeKind::F14, Quantity::Groove).unwrap();
        let b = catalog.table(AirframeKind::Unknown, Quantity::Groove).unwrap();
        assert_eq!(a, b);
        assert_eq!(a.get(Band::OuterHigh), -3.0);
        assert_eq!(a.get(Band::OuterLow), 3.0);
    }

    #[test]
    fn every_shipped_table_is_validated_and_monotonic() {
        for variant in [GseVariant::HarrierWide, GseVariant::HarrierNarrow] {
            let catalog = ToleranceCatalog::new(variant).unwrap();
            // Four airframes times three shared quantities, plus the Hornet AoA table.
            assert_eq!(catalog.tables.len(), 13);
            for table in catalog.tables.values() {
                let v = table.values;
                let descending = v.windows(2).all(|w| w[0] > w[1]);
                let ascending = v.windows(2).all(|w| w[0] < w[1]);
                assert!(descending || ascending, "{:?}", table.quantity());
            }
        }
    }

    #[test]
    fn rejects_unordered_table() {
        let err = ToleranceTable::new(Quantity::AoA, [9.8, 9.3, 9.5, 8.1, 7.4, 6.9, 6.3]);
        assert!(matches!(err, Err(ChartError::InvalidParameter(_))));
    }

    #[test]
    fn labels_follow_quantity() {
        assert_eq!(Band::OuterHigh.label(Quantity::AoA), "__SLO__");
        assert_eq!(Band::InnerLow.label(Quantity::Groove), "(LUR)");
        assert_eq!(Band::MidLow.label(Quantity::GlideslopeError), "L");
        assert_eq!(Band::OnTarget.severity(), Severity::Target);
    }
}
