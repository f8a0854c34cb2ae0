//! Four-panel approach chart: groove, glideslope, AoA and utility.
//!
//! [`ApproachChart`] walks a fixed sequence of stages. Limits are looked up
//! once the airframe is known, each panel projects its bands and smooths its
//! track independently, and finalizing hands the complete [`ChartLayout`] to
//! a [`ChartRenderer`]. Nothing is drawn until every panel has been built, so
//! a failing file never produces a partial image.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::airframe::{AirframeKind, Band, Quantity, Severity, ToleranceCatalog, ToleranceTable};
use crate::interpolate::{interpolate, SmoothCurve};
use crate::projection::{fill_regions, limit_axis, FillRegion, LimitBandProjector, Projection};
use crate::record::FlightRecords;
use crate::units::{meters_to_cbl, mile_quarts, LengthUnit};
use crate::{ChartError, ChartParams, GseVariant};

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum ChartStage {
    Loaded,
    AirframeResolved,
    LimitsComputed,
    GrooveRendered,
    GlideslopePanelRendered,
    AoaRendered,
    UtilityPanelRendered,
    Finalized,
}

#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum PanelKind {
    Groove,
    Glideslope,
    AoA,
    Utility,
}

impl PanelKind {
    pub const ALL: [PanelKind; 4] = [
        PanelKind::Groove,
        PanelKind::Glideslope,
        PanelKind::AoA,
        PanelKind::Utility,
    ];

    pub fn rendered_stage(self) -> ChartStage {
        match self {
            PanelKind::Groove => ChartStage::GrooveRendered,
            PanelKind::Glideslope => ChartStage::GlideslopePanelRendered,
            PanelKind::AoA => ChartStage::AoaRendered,
            PanelKind::Utility => ChartStage::UtilityPanelRendered,
        }
    }
}

/// Drawing intent of a line; colours are the renderer's business.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum CurveStyle {
    LimitLine(Severity),
    Track,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct PlotCurve {
    pub name: String,
    pub style: CurveStyle,
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

/// Which side of the inner bands a stretch of track sits on.
#[derive(Clone, Copy, Debug, Serialize, Deserialize, PartialEq, Eq)]
pub enum Deviation {
    High,
    OnTarget,
    Low,
}

/// Area between a stretch of track and the on-target line.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ShadeRegion {
    pub deviation: Deviation,
    pub xs: Vec<f64>,
    pub track: Vec<f64>,
    pub reference: f64,
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct DistanceMark {
    pub cbl: f64,
    pub label: String,
    pub emphasized: bool,
}

/// One set of axes. Distance axes are drawn inverted (carrier on the right).
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Plot {
    pub y_label: String,
    pub x_range: (f64, f64),
    pub y_range: (f64, f64),
    pub invert_y: bool,
    pub lines: Vec<PlotCurve>,
    pub fills: Vec<FillRegion>,
    pub shading: Vec<ShadeRegion>,
}

impl Plot {
    fn new(y_label: &str, x_range: (f64, f64), y_range: (f64, f64)) -> Self {
        Self {
            y_label: y_label.to_string(),
            x_range,
            y_range,
            invert_y: false,
            lines: Vec::new(),
            fills: Vec::new(),
            shading: Vec::new(),
        }
    }

    fn inverted(mut self) -> Self {
        self.invert_y = true;
        self
    }

    fn with_bands(
        mut self,
        projector: &LimitBandProjector,
        table: &ToleranceTable,
        axis: &[f64],
    ) -> Self {
        let curves = projector.project_table(table, axis);
        self.fills = fill_regions(&curves);
        self.lines.extend(curves.into_iter().map(|c| PlotCurve {
            name: c.label,
            style: CurveStyle::LimitLine(c.band.severity()),
            xs: c.xs,
            ys: c.ys,
        }));
        self
    }

    fn with_track(mut self, track: SmoothCurve) -> Self {
        self.lines.push(PlotCurve {
            name: "Track".to_string(),
            style: CurveStyle::Track,
            xs: track.xs,
            ys: track.ys,
        });
        self
    }

    pub fn limit_lines(&self) -> impl Iterator<Item = &PlotCurve> {
        self.lines
            .iter()
            .filter(|c| matches!(c.style, CurveStyle::LimitLine(_)))
    }

    pub fn tracks(&self) -> impl Iterator<Item = &PlotCurve> {
        self.lines.iter().filter(|c| c.style == CurveStyle::Track)
    }
}

#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct Panel {
    pub kind: PanelKind,
    pub primary: Plot,
    pub insets: Vec<Plot>,
    pub marks: Vec<DistanceMark>,
}

/// Everything a renderer needs for one recording.
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ChartLayout {
    pub label: String,
    pub airframe: AirframeKind,
    pub catalog_version: String,
    pub gse_variant: GseVariant,
    pub panels: Vec<Panel>,
}

impl ChartLayout {
    pub fn panel(&self, kind: PanelKind) -> Option<&Panel> {
        self.panels.iter().find(|p| p.kind == kind)
    }
}

/// Output collaborator invoked once a chart is finalized.
pub trait ChartRenderer {
    fn render(&mut self, layout: &ChartLayout) -> Result<(), ChartError>;
}

#[derive(Clone, Debug)]
struct ApproachLimits {
    groove: ToleranceTable,
    glideslope: ToleranceTable,
    glideslope_error: ToleranceTable,
    aoa: Option<ToleranceTable>,
}

pub struct ApproachChart<'a> {
    records: FlightRecords,
    catalog: &'a ToleranceCatalog,
    params: ChartParams,
    stage: ChartStage,
    airframe: Option<AirframeKind>,
    limits: Option<ApproachLimits>,
    panels: BTreeMap<PanelKind, Panel>,
}

impl<'a> ApproachChart<'a> {
    pub fn new(
        records: FlightRecords,
        catalog: &'a ToleranceCatalog,
        params: ChartParams,
    ) -> Result<Self, ChartError> {
        params.validate()?;
        Ok(Self {
            records,
            catalog,
            params,
            stage: ChartStage::Loaded,
            airframe: None,
            limits: None,
            panels: BTreeMap::new(),
        })
    }

    /// Run every stage in order and hand the result to `renderer`.
    pub fn build<R: ChartRenderer>(
        records: FlightRecords,
        catalog: &'a ToleranceCatalog,
        params: ChartParams,
        renderer: &mut R,
    ) -> Result<ChartLayout, ChartError> {
        let mut chart = Self::new(records, catalog, params)?;
        chart.resolve_airframe()?;
        chart.compute_limits()?;
        for kind in PanelKind::ALL {
            chart.render_panel(kind)?;
        }
        chart.finalize(renderer)
    }

    pub fn stage(&self) -> ChartStage {
        self.stage
    }

    pub fn airframe(&self) -> Option<AirframeKind> {
        self.airframe
    }

    pub fn records(&self) -> &FlightRecords {
        &self.records
    }

    pub fn panel(&self, kind: PanelKind) -> Option<&Panel> {
        self.panels.get(&kind)
    }

    fn expect_stage(&self, expected: ChartStage) -> Result<(), ChartError> {
        if self.stage == expected {
            Ok(())
        } else {
            Err(ChartError::Stage {
                expected,
                found: self.stage,
            })
        }
    }

    pub fn resolve_airframe(&mut self) -> Result<AirframeKind, ChartError> {
        self.expect_stage(ChartStage::Loaded)?;
        let kind = AirframeKind::identify(self.records.label());
        debug!(label = self.records.label(), airframe = %kind, "airframe resolved");
        self.airframe = Some(kind);
        self.stage = ChartStage::AirframeResolved;
        Ok(kind)
    }

    /// Pull every table this airframe needs out of the catalog.
    ///
    /// A missing AoA table is not an error yet; it surfaces when the AoA panel
    /// is rendered.
    pub fn compute_limits(&mut self) -> Result<(), ChartError> {
        self.expect_stage(ChartStage::AirframeResolved)?;
        let kind = self.airframe.unwrap_or(AirframeKind::Unknown);
        let catalog = self.catalog;
        let limits = ApproachLimits {
            groove: catalog.table(kind, Quantity::Groove)?.clone(),
            glideslope: catalog.table(kind, Quantity::Glideslope)?.clone(),
            glideslope_error: catalog.table(kind, Quantity::GlideslopeError)?.clone(),
            aoa: catalog.table(kind, Quantity::AoA).ok().cloned(),
        };
        debug!(
            airframe = %kind,
            has_aoa = limits.aoa.is_some(),
            gse_variant = ?catalog.gse_variant(),
            "limits computed"
        );
        self.limits = Some(limits);
        self.stage = ChartStage::LimitsComputed;
        Ok(())
    }

    pub fn render_panel(&mut self, kind: PanelKind) -> Result<&Panel, ChartError> {
        if self.stage < ChartStage::LimitsComputed || self.stage == ChartStage::Finalized {
            return Err(ChartError::Stage {
                expected: ChartStage::LimitsComputed,
                found: self.stage,
            });
        }
        let limits = self.limits.as_ref().ok_or(ChartError::Stage {
            expected: ChartStage::LimitsComputed,
            found: self.stage,
        })?;
        let panel = match kind {
            PanelKind::Groove => self.groove_panel(limits)?,
            PanelKind::Glideslope => self.glideslope_panel(limits)?,
            PanelKind::AoA => self.aoa_panel(limits)?,
            PanelKind::Utility => self.utility_panel(limits)?,
        };
        debug!(panel = ?kind, lines = panel.primary.lines.len(), "panel built");
        self.stage = self.stage.max(kind.rendered_stage());
        self.panels.remove(&kind);
        Ok(&*self.panels.entry(kind).or_insert(panel))
    }

    /// Hand the finished layout to `renderer`. Every panel must be built.
    pub fn finalize<R: ChartRenderer>(
        &mut self,
        renderer: &mut R,
    ) -> Result<ChartLayout, ChartError> {
        if self.stage == ChartStage::Finalized {
            return Err(ChartError::Stage {
                expected: ChartStage::UtilityPanelRendered,
                found: self.stage,
            });
        }
        if let Some(kind) = PanelKind::ALL
            .into_iter()
            .find(|k| !self.panels.contains_key(k))
        {
            return Err(ChartError::Stage {
                expected: kind.rendered_stage(),
                found: self.stage,
            });
        }
        let layout = ChartLayout {
            label: self.records.label().to_string(),
            airframe: self.airframe.unwrap_or(AirframeKind::Unknown),
            catalog_version: self.catalog.version().to_string(),
            gse_variant: self.catalog.gse_variant(),
            panels: self.panels.values().cloned().collect(),
        };
        renderer.render(&layout)?;
        self.stage = ChartStage::Finalized;
        Ok(layout)
    }

    fn track(
        &self,
        field: impl Fn(&crate::FlightRecord) -> f64,
    ) -> Result<SmoothCurve, ChartError> {
        let distances = self.records.column(|r| r.x);
        let values = self.records.column(field);
        interpolate(&distances, &values, self.params.smooth_samples)
    }

    fn main_axis(&self) -> Vec<f64> {
        limit_axis(self.params.distance_axis_max_cbl, self.params.limit_samples)
    }

    fn inset_axis(&self) -> Vec<f64> {
        limit_axis(self.params.inset_axis_max_cbl, self.params.limit_samples)
    }

    fn x_range(&self) -> (f64, f64) {
        (0.0, self.params.distance_axis_max_cbl)
    }

    fn inset_x_range(&self) -> (f64, f64) {
        (0.0, self.params.inset_axis_max_cbl)
    }

    fn groove_panel(&self, limits: &ApproachLimits) -> Result<Panel, ChartError> {
        let projector = LimitBandProjector::new(
            self.params.groove_longitudinal_correction_ft,
            Projection::Lateral {
                front_back_deg: self.params.front_back_correction_deg,
                lateral_correction_ft: self.params.groove_lateral_correction_ft,
            },
        );
        let primary = Plot::new("lateral offset [Cbls]", self.x_range(), (-0.2, 2.5))
            .inverted()
            .with_bands(&projector, &limits.groove, &self.main_axis())
            .with_track(self.track(|r| meters_to_cbl(r.z))?);

        let lineup = Plot::new("lineup error [deg]", self.inset_x_range(), (-7.0, 7.0))
            .inverted()
            .with_bands(&LimitBandProjector::level(), &limits.groove, &self.inset_axis())
            .with_track(self.track(|r| r.lue)?);

        Ok(Panel {
            kind: PanelKind::Groove,
            primary,
            insets: vec![lineup],
            marks: distance_marks(),
        })
    }

    fn glideslope_panel(&self, limits: &ApproachLimits) -> Result<Panel, ChartError> {
        let projector = LimitBandProjector::new(
            self.params.glideslope_longitudinal_correction_ft,
            Projection::Vertical,
        );
        let ceiling = self.records.max_alt().unwrap_or(0.0) + self.params.altitude_headroom_ft;
        let primary = Plot::new("height [feet]", self.x_range(), (0.0, ceiling))
            .with_bands(&projector, &limits.glideslope, &self.main_axis())
            .with_track(self.track(|r| r.alt)?);
        Ok(Panel {
            kind: PanelKind::Glideslope,
            primary,
            insets: Vec::new(),
            marks: distance_marks(),
        })
    }

    fn aoa_panel(&self, limits: &ApproachLimits) -> Result<Panel, ChartError> {
        let table = limits.aoa.as_ref().ok_or(ChartError::MissingLimits {
            airframe: self.airframe.unwrap_or(AirframeKind::Unknown),
            quantity: Quantity::AoA,
        })?;
        let track = self.track(|r| r.aoa)?;
        let shading = deviation_shading(&track, table);
        let mut primary = Plot::new("AoA [deg]", self.x_range(), level_range(table))
            .with_bands(&LimitBandProjector::level(), table, &self.main_axis())
            .with_track(track);
        primary.shading = shading;
        Ok(Panel {
            kind: PanelKind::AoA,
            primary,
            insets: Vec::new(),
            marks: distance_marks(),
        })
    }

    fn utility_panel(&self, limits: &ApproachLimits) -> Result<Panel, ChartError> {
        let table = &limits.glideslope_error;
        let primary = Plot::new("glideslope error [deg]", self.x_range(), level_range(table))
            .with_bands(&LimitBandProjector::level(), table, &self.main_axis())
            .with_track(self.track(|r| r.gse)?);
        let sink_rate = Plot::new("sink rate [ft/min]", self.inset_x_range(), (-1500.0, -400.0))
            .inverted()
            .with_track(self.track(|r| r.vy)?);
        let bank = Plot::new("bank [deg]", self.inset_x_range(), (-50.0, 50.0))
            .inverted()
            .with_track(self.track(|r| r.roll)?);
        Ok(Panel {
            kind: PanelKind::Utility,
            primary,
            insets: vec![sink_rate, bank],
            marks: distance_marks(),
        })
    }
}

/// Outer bands plus half a unit of margin on either side.
fn level_range(table: &ToleranceTable) -> (f64, f64) {
    (table.min() - 0.5, table.max() + 0.5)
}

/// Quarter-mile marks out to one mile; the 3/4 mark starts the groove call.
fn distance_marks() -> Vec<DistanceMark> {
    const LABELS: [&str; 4] = ["1/4 NM", "1/2 NM", "3/4 NM", "1 NM"];
    (1..=4u32)
        .zip(LABELS)
        .map(|(quarters, label)| DistanceMark {
            cbl: mile_quarts(quarters, LengthUnit::Cables),
            label: label.to_string(),
            emphasized: quarters == 3,
        })
        .collect()
}

/// Split the track into contiguous stretches above, inside and below the
/// inner bands of `table`.
fn deviation_shading(track: &SmoothCurve, table: &ToleranceTable) -> Vec<ShadeRegion> {
    let inner_a = table.get(Band::InnerHigh);
    let inner_b = table.get(Band::InnerLow);
    let (lower, upper) = (inner_a.min(inner_b), inner_a.max(inner_b));
    let reference = table.get(Band::OnTarget);
    let classify = |y: f64| {
        if y > upper {
            Deviation::High
        } else if y < lower {
            Deviation::Low
        } else {
            Deviation::OnTarget
        }
    };

    let mut regions: Vec<ShadeRegion> = Vec::new();
    for (&x, &y) in track.xs.iter().zip(track.ys.iter()) {
        let deviation = classify(y);
        match regions.last_mut() {
            Some(region) if region.deviation == deviation => {
                region.xs.push(x);
                region.track.push(y);
            }
            _ => regions.push(ShadeRegion {
                deviation,
                xs: vec![x],
                track: vec![y],
                reference,
            }),
        }
    }
    regions
}
