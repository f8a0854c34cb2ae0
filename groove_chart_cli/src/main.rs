use std::fs;
use std::io;
use std::panic;
use std::path::{Path, PathBuf};
use std::time::Instant;

use anyhow::{anyhow, Context, Result};
use clap::{ArgAction, Parser, Subcommand, ValueEnum, ValueHint};
use groove_chart::{
    find_approach_start, load_records, AirframeKind, ApproachChart, ChartError, ChartLayout,
    ChartParams, ChartRenderer, CurveStyle, Deviation, DistanceMark, GseVariant, Panel, Plot,
    Quantity, Severity, ToleranceCatalog,
};
use groove_chart::units::meters_to_cbl;
use plotters::coord::Shift;
use plotters::prelude::*;
use plotters::style::{FontDesc, FontFamily, FontStyle};
use plotters_backend::{
    BackendColor, BackendCoord, BackendStyle, BackendTextStyle, DrawingBackend, DrawingErrorKind,
};
use rayon::prelude::*;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

#[derive(Parser, Debug)]
#[command(author, version, about = "Carrier approach chart renderer", long_about = None)]
struct Cli {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Render a four-panel approach chart for each flight-recorder CSV
    Chart(ChartArgs),
    /// Summarize recordings without rendering anything
    Inspect(InspectArgs),
}

#[derive(Parser, Debug)]
struct ChartArgs {
    /// CSV files, or directories scanned for *.csv
    #[arg(required = true, value_hint = ValueHint::AnyPath)]
    inputs: Vec<PathBuf>,

    /// Directory receiving one image per recording
    #[arg(short, long, default_value = ".", value_hint = ValueHint::DirPath)]
    out_dir: PathBuf,

    /// Image format
    #[arg(long, value_enum, default_value_t = FormatOpt::Png)]
    format: FormatOpt,

    /// JSON file overriding chart parameters
    #[arg(long, value_hint = ValueHint::FilePath)]
    config: Option<PathBuf>,

    /// Which glideslope-error table the AV-8B uses
    #[arg(long, value_enum)]
    gse_variant: Option<GseVariantOpt>,

    /// Points per smoothed track
    #[arg(long)]
    samples: Option<usize>,

    /// Worker threads (defaults to one per core)
    #[arg(short, long)]
    jobs: Option<usize>,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,

    /// Log per-file timings
    #[arg(long, action = ArgAction::SetTrue)]
    profile: bool,
}

#[derive(Parser, Debug)]
struct InspectArgs {
    /// CSV files, or directories scanned for *.csv
    #[arg(required = true, value_hint = ValueHint::AnyPath)]
    inputs: Vec<PathBuf>,

    /// Verbose logging
    #[arg(long, action = ArgAction::SetTrue)]
    verbose: bool,
}

#[derive(Copy, Clone, Debug, PartialEq, Eq, ValueEnum)]
enum FormatOpt {
    Png,
    Svg,
}

impl FormatOpt {
    fn extension(self) -> &'static str {
        match self {
            FormatOpt::Png => "png",
            FormatOpt::Svg => "svg",
        }
    }
}

#[derive(Copy, Clone, Debug, ValueEnum)]
enum GseVariantOpt {
    HarrierWide,
    HarrierNarrow,
}

impl From<GseVariantOpt> for GseVariant {
    fn from(value: GseVariantOpt) -> Self {
        match value {
            GseVariantOpt::HarrierWide => GseVariant::HarrierWide,
            GseVariantOpt::HarrierNarrow => GseVariant::HarrierNarrow,
        }
    }
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    let verbose = match &cli.command {
        Command::Chart(args) => args.verbose,
        Command::Inspect(args) => args.verbose,
    };
    let default_level = if verbose { "debug" } else { "info" };
    let filter =
        EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default_level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(io::stderr)
        .try_init();

    match cli.command {
        Command::Chart(args) => handle_chart(args),
        Command::Inspect(args) => handle_inspect(args),
    }
}

fn chart_params(args: &ChartArgs) -> Result<ChartParams> {
    let mut params = match args.config.as_ref() {
        Some(path) => ChartParams::from_json_file(path)?,
        None => ChartParams::default(),
    };
    if let Some(variant) = args.gse_variant {
        params.gse_variant = variant.into();
    }
    if let Some(samples) = args.samples {
        params.smooth_samples = samples;
    }
    params.validate()?;
    Ok(params)
}

fn handle_chart(args: ChartArgs) -> Result<()> {
    let params = chart_params(&args)?;
    let catalog = ToleranceCatalog::new(params.gse_variant)?;
    let files = collect_inputs(&args.inputs)?;
    if files.is_empty() {
        return Err(anyhow!("no CSV recordings found"));
    }
    fs::create_dir_all(&args.out_dir)
        .with_context(|| format!("failed to create {}", args.out_dir.display()))?;
    info!(
        "Charting {} recording(s), tolerances {} ({:?})",
        files.len(),
        catalog.version(),
        catalog.gse_variant()
    );

    let pool = rayon::ThreadPoolBuilder::new()
        .num_threads(args.jobs.unwrap_or(0))
        .build()
        .context("failed to start worker pool")?;

    let t_batch = Instant::now();
    let outcomes: Vec<(PathBuf, Result<PathBuf>)> = pool.install(|| {
        files
            .par_iter()
            .map(|path| {
                let outcome = chart_file(path, &args, &params, &catalog);
                (path.clone(), outcome)
            })
            .collect()
    });

    let mut failed = 0usize;
    for (path, outcome) in &outcomes {
        match outcome {
            Ok(out) => info!("Wrote chart: {}", out.display()),
            Err(err) => {
                failed += 1;
                warn!("{} [{}]: {:#}", path.display(), error_kind(err), err);
            }
        }
    }
    if args.profile || args.verbose {
        info!(
            "Batch: {:.1} ms for {} file(s)",
            t_batch.elapsed().as_secs_f64() * 1000.0,
            outcomes.len()
        );
    }

    if failed > 0 {
        return Err(anyhow!("{} of {} recording(s) failed", failed, outcomes.len()));
    }
    Ok(())
}

fn chart_file(
    path: &Path,
    args: &ChartArgs,
    params: &ChartParams,
    catalog: &ToleranceCatalog,
) -> Result<PathBuf> {
    let t_file = Instant::now();
    let records = load_records(path)?;
    let out = output_path(&args.out_dir, path, args.format);
    let mut renderer = PlotRenderer {
        path: out.clone(),
        format: args.format,
    };
    let layout = ApproachChart::build(records, catalog, params.clone(), &mut renderer)
        .with_context(|| format!("failed to chart {}", path.display()))?;
    if args.profile {
        info!(
            "{}: {} in {:.1} ms",
            path.display(),
            layout.airframe,
            t_file.elapsed().as_secs_f64() * 1000.0
        );
    }
    Ok(out)
}

fn handle_inspect(args: InspectArgs) -> Result<()> {
    let files = collect_inputs(&args.inputs)?;
    if files.is_empty() {
        return Err(anyhow!("no CSV recordings found"));
    }
    let catalog = ToleranceCatalog::new(GseVariant::default())?;
    let mut failed = 0usize;
    for path in &files {
        match inspect_file(path, &catalog) {
            Ok(summary) => info!("{}", summary),
            Err(err) => {
                failed += 1;
                warn!("{} [{}]: {:#}", path.display(), error_kind(&err), err);
            }
        }
    }
    if failed > 0 {
        return Err(anyhow!("{} of {} recording(s) unreadable", failed, files.len()));
    }
    Ok(())
}

fn inspect_file(path: &Path, catalog: &ToleranceCatalog) -> Result<String> {
    let records = load_records(path)?;
    let airframe = AirframeKind::identify(records.label());
    let distances: Vec<f64> = records.column(|r| meters_to_cbl(r.x));
    let start = find_approach_start(&distances)?;
    let span = match (distances.get(start), distances.last()) {
        (Some(first), Some(last)) => format!("{:.1}..{:.1} cbl", first, last),
        _ => "empty".to_string(),
    };
    let tables: Vec<String> = Quantity::ALL
        .iter()
        .filter(|q| catalog.table(airframe, **q).is_ok())
        .map(|q| q.to_string())
        .collect();
    let grade = records
        .rows()
        .last()
        .map(|r| r.grade.as_str())
        .unwrap_or("-");
    Ok(format!(
        "{}: {} rows, airframe {}, inbound from row {} ({}), tables [{}], \
         max alt {:.0} ft, grade {}",
        records.label(),
        records.len(),
        airframe,
        start,
        span,
        tables.join(", "),
        records.max_alt().unwrap_or(0.0),
        grade
    ))
}

fn error_kind(err: &anyhow::Error) -> &'static str {
    err.downcast_ref::<ChartError>()
        .map(ChartError::kind)
        .unwrap_or("IoError")
}

/// Expand directories into their `*.csv` entries, sorted by name.
fn collect_inputs(inputs: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    for input in inputs {
        if input.is_dir() {
            let mut found: Vec<PathBuf> = fs::read_dir(input)
                .with_context(|| format!("failed to list {}", input.display()))?
                .filter_map(|entry| entry.ok().map(|e| e.path()))
                .filter(|p| p.is_file() && is_csv(p))
                .collect();
            found.sort();
            debug!("{}: {} CSV file(s)", input.display(), found.len());
            files.extend(found);
        } else {
            files.push(input.clone());
        }
    }
    Ok(files)
}

fn is_csv(path: &Path) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| ext.eq_ignore_ascii_case("csv"))
        .unwrap_or(false)
}

fn output_path(out_dir: &Path, input: &Path, format: FormatOpt) -> PathBuf {
    let stem = input
        .file_stem()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_else(|| "chart".to_string());
    out_dir.join(format!("{}.{}", stem, format.extension()))
}

struct PlotRenderer {
    path: PathBuf,
    format: FormatOpt,
}

impl ChartRenderer for PlotRenderer {
    fn render(&mut self, layout: &ChartLayout) -> Result<(), ChartError> {
        discard_on_failure(&self.path, render_chart_guard(layout, &self.path, self.format))
    }
}

/// A failed draw must not leave a half-written image behind.
fn discard_on_failure(path: &Path, drawn: Result<(), String>) -> Result<(), ChartError> {
    drawn.map_err(|msg| {
        let _ = fs::remove_file(path);
        ChartError::Render(msg)
    })
}

const CHART_SIZE: (u32, u32) = (1400, 2000);

fn render_chart_guard(layout: &ChartLayout, path: &Path, format: FormatOpt) -> Result<(), String> {
    let render = || -> Result<(), String> {
        let drawn = match format {
            FormatOpt::Png => {
                let root = FontSafeBackend::new(BitMapBackend::new(path, CHART_SIZE))
                    .into_drawing_area();
                draw_layout(root, layout)
            }
            FormatOpt::Svg => {
                let root =
                    FontSafeBackend::new(SVGBackend::new(path, CHART_SIZE)).into_drawing_area();
                draw_layout(root, layout)
            }
        };
        drawn.map_err(|e| format!("plotting error: {}", e))
    };

    panic::catch_unwind(panic::AssertUnwindSafe(render))
        .map_err(|_| "plotting backend panicked".to_string())?
}

fn draw_layout<DB>(root: DrawingArea<DB, Shift>, layout: &ChartLayout) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    root.fill(&WHITE)?;
    let title = format!("{} ({})", layout.label, layout.airframe);
    let title_font = FontDesc::new(FontFamily::SansSerif, 28.0, FontStyle::Bold);
    let body = root.titled(&title, title_font)?;

    let rows = body.split_evenly((layout.panels.len().max(1), 1));
    for (area, panel) in rows.iter().zip(layout.panels.iter()) {
        draw_panel(area, panel)?;
    }
    root.present()?;
    Ok(())
}

fn draw_panel<DB>(area: &DrawingArea<DB, Shift>, panel: &Panel) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    if panel.insets.is_empty() {
        return draw_plot(area, &panel.primary, &panel.marks);
    }
    let width = area.dim_in_pixel().0;
    let (main, side) = area.split_horizontally((width as f64 * 0.68) as u32);
    draw_plot(&main, &panel.primary, &panel.marks)?;
    let cells = side.split_evenly((panel.insets.len(), 1));
    for (cell, inset) in cells.iter().zip(panel.insets.iter()) {
        draw_plot(cell, inset, &[])?;
    }
    Ok(())
}

/// Distances grow to the left and some quantities read top-down, so both
/// axes are drawn on negated values and relabelled.
fn screen(plot: &Plot, x: f64, y: f64) -> (f64, f64) {
    let (lo, hi) = plot.y_range;
    let y = y.clamp(lo.min(hi), lo.max(hi));
    (-x, if plot.invert_y { -y } else { y })
}

fn severity_color(severity: Severity) -> RGBColor {
    match severity {
        Severity::Target => RGBColor(0, 0, 0),
        Severity::Inner => RGBColor(0, 150, 0),
        Severity::Mid => RGBColor(255, 140, 0),
        Severity::Outer => RGBColor(200, 0, 0),
    }
}

fn deviation_color(deviation: Deviation) -> RGBColor {
    match deviation {
        Deviation::High => RGBColor(200, 0, 0),
        Deviation::OnTarget => RGBColor(0, 150, 0),
        Deviation::Low => RGBColor(230, 180, 0),
    }
}

fn draw_plot<DB>(area: &DrawingArea<DB, Shift>, plot: &Plot, marks: &[DistanceMark]) -> Result<()>
where
    DB: DrawingBackend,
    DB::ErrorType: 'static,
{
    let (x_lo, x_hi) = plot.x_range;
    let (y_lo, y_hi) = plot.y_range;
    let y_axis = if plot.invert_y { -y_hi..-y_lo } else { y_lo..y_hi };
    let mut chart = ChartBuilder::on(area)
        .margin(12)
        .set_label_area_size(LabelAreaPosition::Left, 60)
        .set_label_area_size(LabelAreaPosition::Bottom, 35)
        .build_cartesian_2d(-x_hi..-x_lo, y_axis)?;

    let flip = plot.invert_y;
    let x_fmt = |v: &f64| format!("{:.1}", -v);
    let y_fmt = move |v: &f64| format!("{:.1}", if flip { -v } else { *v });
    let axis_font = FontDesc::new(FontFamily::SansSerif, 14.0, FontStyle::Normal);
    chart
        .configure_mesh()
        .light_line_style(&TRANSPARENT)
        .bold_line_style(&BLACK.mix(0.1))
        .x_desc("distance [Cbls]")
        .y_desc(plot.y_label.as_str())
        .x_label_formatter(&x_fmt)
        .y_label_formatter(&y_fmt)
        .label_style(axis_font.color(&BLACK.mix(0.85)))
        .draw()?;

    let in_x = |x: f64| x >= x_lo && x <= x_hi;

    for fill in &plot.fills {
        let color = severity_color(fill.severity).mix(0.2);
        let upper = fill
            .xs
            .iter()
            .zip(fill.y_from.iter())
            .filter(|(x, _)| in_x(**x))
            .map(|(x, y)| screen(plot, *x, *y));
        let lower = fill
            .xs
            .iter()
            .zip(fill.y_to.iter())
            .rev()
            .filter(|(x, _)| in_x(**x))
            .map(|(x, y)| screen(plot, *x, *y));
        let outline: Vec<(f64, f64)> = upper.chain(lower).collect();
        chart.draw_series(std::iter::once(Polygon::new(outline, color.filled())))?;
    }

    for shade in &plot.shading {
        let color = deviation_color(shade.deviation).mix(0.3);
        let along = shade
            .xs
            .iter()
            .zip(shade.track.iter())
            .map(|(x, y)| screen(plot, *x, *y));
        let back = shade
            .xs
            .iter()
            .rev()
            .map(|x| screen(plot, *x, shade.reference));
        let outline: Vec<(f64, f64)> = along.chain(back).collect();
        chart.draw_series(std::iter::once(Polygon::new(outline, color.filled())))?;
    }

    for mark in marks.iter().filter(|m| in_x(m.cbl)) {
        let style = ShapeStyle {
            color: BLACK.mix(if mark.emphasized { 0.8 } else { 0.35 }),
            filled: false,
            stroke_width: if mark.emphasized { 2 } else { 1 },
        };
        let top = screen(plot, mark.cbl, y_hi);
        let bottom = screen(plot, mark.cbl, y_lo);
        chart.draw_series(LineSeries::new(vec![bottom, top], style))?;
    }

    let label_font = FontDesc::new(FontFamily::SansSerif, 12.0, FontStyle::Normal);
    for curve in &plot.lines {
        let (color, width) = match curve.style {
            CurveStyle::LimitLine(severity) => (severity_color(severity), 1),
            CurveStyle::Track => (RGBColor(20, 20, 160), 3),
        };
        let style = ShapeStyle {
            color: color.to_rgba(),
            filled: false,
            stroke_width: width,
        };
        let points: Vec<(f64, f64)> = curve
            .xs
            .iter()
            .zip(curve.ys.iter())
            .filter(|(x, _)| in_x(**x))
            .map(|(x, y)| screen(plot, *x, *y))
            .collect();
        if points.is_empty() {
            continue;
        }
        if let CurveStyle::LimitLine(_) = curve.style {
            if let Some(&anchor) = points.first() {
                chart.draw_series(std::iter::once(Text::new(
                    curve.name.clone(),
                    anchor,
                    label_font.clone().color(&color),
                )))?;
            }
        }
        chart.draw_series(LineSeries::new(points, style))?;
    }

    Ok(())
}

/// Delegating backend that survives missing system fonts by dropping text
/// instead of aborting the whole image.
struct FontSafeBackend<DB> {
    inner: DB,
}

impl<DB> FontSafeBackend<DB> {
    fn new(inner: DB) -> Self {
        Self { inner }
    }
}

impl<DB: DrawingBackend> DrawingBackend for FontSafeBackend<DB> {
    type ErrorType = DB::ErrorType;

    fn get_size(&self) -> (u32, u32) {
        self.inner.get_size()
    }

    fn ensure_prepared(&mut self) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.ensure_prepared()
    }

    fn present(&mut self) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.present()
    }

    fn draw_pixel(
        &mut self,
        point: BackendCoord,
        color: BackendColor,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_pixel(point, color)
    }

    fn draw_line<S: BackendStyle>(
        &mut self,
        from: BackendCoord,
        to: BackendCoord,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_line(from, to, style)
    }

    fn draw_rect<S: BackendStyle>(
        &mut self,
        upper_left: BackendCoord,
        bottom_right: BackendCoord,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_rect(upper_left, bottom_right, style, fill)
    }

    fn draw_path<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        path: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_path(path, style)
    }

    fn fill_polygon<S: BackendStyle, I: IntoIterator<Item = BackendCoord>>(
        &mut self,
        vert: I,
        style: &S,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.fill_polygon(vert, style)
    }

    fn draw_circle<S: BackendStyle>(
        &mut self,
        center: BackendCoord,
        radius: u32,
        style: &S,
        fill: bool,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.draw_circle(center, radius, style, fill)
    }

    fn blit_bitmap(
        &mut self,
        pos: BackendCoord,
        (iw, ih): (u32, u32),
        src: &[u8],
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        self.inner.blit_bitmap(pos, (iw, ih), src)
    }

    fn draw_text<TStyle: BackendTextStyle>(
        &mut self,
        text: &str,
        style: &TStyle,
        pos: BackendCoord,
    ) -> Result<(), DrawingErrorKind<Self::ErrorType>> {
        match panic::catch_unwind(panic::AssertUnwindSafe(|| {
            self.inner.draw_text(text, style, pos)
        })) {
            Ok(Ok(())) => Ok(()),
            Ok(Err(DrawingErrorKind::FontError(_))) | Err(_) => {
                debug!("font unavailable, dropped label {:?}", text);
                Ok(())
            }
            Ok(Err(err)) => Err(err),
        }
    }

    fn estimate_text_size<TStyle: BackendTextStyle>(
        &self,
        text: &str,
        style: &TStyle,
    ) -> Result<(u32, u32), DrawingErrorKind<Self::ErrorType>> {
        match panic::catch_unwind(panic::AssertUnwindSafe(|| {
            self.inner.estimate_text_size(text, style)
        })) {
            Ok(Ok(size)) => Ok(size),
            _ => {
                let height = style.size().max(1.0);
                let width = height * 0.6 * text.chars().count() as f64;
                Ok((width.ceil() as u32, height.ceil() as u32))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;

    const HEADER: &str =
        "Time,Rho,X,Z,Alt,AoA,GSE,LUE,Vtot,Vy,Gamma,Pitch,Roll,Yaw,Step,Grade,Points,Details";

    /// Twenty inbound samples from 3000 m to the ramp.
    fn write_recording(path: &Path) {
        let mut file = fs::File::create(path).unwrap();
        writeln!(file, "#{HEADER}").unwrap();
        for i in 0..20 {
            let frac = i as f64 / 19.0;
            let x = 3000.0 * (1.0 - frac);
            let alt = 40.0 + x * 0.18;
            let aoa = 8.1 + 0.6 * (frac * 5.0).sin();
            let z = 30.0 * (1.0 - frac);
            let lue = 1.5 - 2.0 * frac;
            let roll = -12.0 * (1.0 - frac);
            writeln!(
                file,
                "{i},{:.4},{x:.2},{z:.2},{alt:.1},{aoa:.3},0.1,{lue:.3},\
                 135,-720,3,6,{roll:.1},1,X,OK,4,none",
                x / 1852.0
            )
            .unwrap();
        }
    }

    fn chart_args(out_dir: &Path) -> ChartArgs {
        ChartArgs {
            inputs: Vec::new(),
            out_dir: out_dir.to_path_buf(),
            format: FormatOpt::Svg,
            config: None,
            gse_variant: None,
            samples: None,
            jobs: Some(1),
            verbose: false,
            profile: false,
        }
    }

    #[test]
    fn output_path_keeps_stem_and_swaps_extension() {
        let out = output_path(
            Path::new("/tmp/out"),
            Path::new("data/FA-18C_trap.csv"),
            FormatOpt::Png,
        );
        assert_eq!(out, PathBuf::from("/tmp/out/FA-18C_trap.png"));
        let out = output_path(Path::new("charts"), Path::new("pass.CSV"), FormatOpt::Svg);
        assert_eq!(out, PathBuf::from("charts/pass.svg"));
    }

    #[test]
    fn directories_expand_to_sorted_csv_files() {
        let dir = tempfile::tempdir().unwrap();
        for name in ["b.csv", "a.CSV", "notes.txt"] {
            fs::write(dir.path().join(name), "x").unwrap();
        }
        let extra = PathBuf::from("elsewhere/c.csv");
        let files = collect_inputs(&[dir.path().to_path_buf(), extra.clone()]).unwrap();
        assert_eq!(
            files,
            vec![dir.path().join("a.CSV"), dir.path().join("b.csv"), extra]
        );
    }

    #[test]
    fn cli_overrides_config_file() {
        let dir = tempfile::tempdir().unwrap();
        let config = dir.path().join("chart.json");
        fs::write(&config, r#"{"smooth_samples": 80, "gse_variant": "harrier_narrow"}"#).unwrap();
        let mut args = chart_args(dir.path());
        args.config = Some(config);
        args.gse_variant = Some(GseVariantOpt::HarrierWide);
        let params = chart_params(&args).unwrap();
        assert_eq!(params.smooth_samples, 80);
        assert_eq!(params.gse_variant, GseVariant::HarrierWide);

        args.samples = Some(1);
        assert!(chart_params(&args).is_err());
    }

    #[test]
    fn schema_failure_is_isolated_and_leaves_no_image() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("FA-18C_bad.csv");
        fs::write(&input, "Time,Rho,X\n1,2,3\n").unwrap();
        let args = chart_args(dir.path());
        let params = ChartParams::default();
        let catalog = ToleranceCatalog::new(params.gse_variant).unwrap();
        let err = chart_file(&input, &args, &params, &catalog).unwrap_err();
        assert_eq!(error_kind(&err), "SchemaError");
        assert!(!dir.path().join("FA-18C_bad.svg").exists());
    }

    #[test]
    fn unknown_airframe_fails_with_missing_limits() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("mystery.csv");
        write_recording(&input);
        let args = chart_args(dir.path());
        let params = ChartParams::default();
        let catalog = ToleranceCatalog::new(params.gse_variant).unwrap();
        let err = chart_file(&input, &args, &params, &catalog).unwrap_err();
        assert_eq!(error_kind(&err), "MissingLimitsError");
        assert!(!dir.path().join("mystery.svg").exists());

        let summary = inspect_file(&input, &catalog).unwrap();
        assert!(summary.contains("20 rows"));
        assert!(summary.contains("airframe Unknown"));
        assert!(summary.contains("tables [groove, glideslope, glideslope-error]"));
    }

    #[test]
    fn batch_keeps_going_past_failing_recordings() {
        let inputs = tempfile::tempdir().unwrap();
        let out = tempfile::tempdir().unwrap();
        write_recording(&inputs.path().join("FA-18C_good.csv"));
        write_recording(&inputs.path().join("mystery.csv"));
        fs::write(inputs.path().join("broken.csv"), "Time,Rho,X\n1,2,3\n").unwrap();

        let mut args = chart_args(out.path());
        args.inputs = vec![inputs.path().to_path_buf()];
        args.jobs = Some(2);
        let err = handle_chart(args).unwrap_err();
        assert_eq!(err.to_string(), "2 of 3 recording(s) failed");

        assert!(out.path().join("FA-18C_good.svg").exists());
        assert!(!out.path().join("mystery.svg").exists());
        assert!(!out.path().join("broken.svg").exists());
    }

    #[test]
    fn renders_svg_and_png_charts() {
        let dir = tempfile::tempdir().unwrap();
        let input = dir.path().join("FA-18C_trap.csv");
        write_recording(&input);
        let params = ChartParams::default();
        let catalog = ToleranceCatalog::new(params.gse_variant).unwrap();

        let args = chart_args(dir.path());
        let svg = chart_file(&input, &args, &params, &catalog).unwrap();
        assert_eq!(svg, dir.path().join("FA-18C_trap.svg"));
        let text = fs::read_to_string(&svg).unwrap();
        assert!(text.contains("<svg"));
        assert!(text.contains("<polygon") || text.contains("<polyline"));

        let mut args = chart_args(dir.path());
        args.format = FormatOpt::Png;
        let png = chart_file(&input, &args, &params, &catalog).unwrap();
        assert!(fs::metadata(&png).unwrap().len() > 0);
    }

    #[test]
    fn failed_render_leaves_no_image() {
        let dir = tempfile::tempdir().unwrap();
        let stale = dir.path().join("partial.png");
        fs::write(&stale, b"\x89PNG half").unwrap();
        let err = discard_on_failure(&stale, Err("backend gave up".into())).unwrap_err();
        assert_eq!(err.kind(), "RenderError");
        assert!(!stale.exists());

        let input = dir.path().join("FA-18C_trap.csv");
        write_recording(&input);
        let records = load_records(&input).unwrap();
        let catalog = ToleranceCatalog::new(GseVariant::default()).unwrap();
        let target = dir.path().join("missing").join("FA-18C_trap.svg");
        let mut renderer = PlotRenderer {
            path: target.clone(),
            format: FormatOpt::Svg,
        };
        let err = ApproachChart::build(records, &catalog, ChartParams::default(), &mut renderer)
            .unwrap_err();
        assert_eq!(err.kind(), "RenderError");
        assert!(!target.exists());
    }

    #[test]
    fn screen_negates_distance_and_inverted_values() {
        let mut plot = Plot {
            y_label: String::new(),
            x_range: (0.0, 6.0),
            y_range: (-7.0, 7.0),
            invert_y: false,
            lines: Vec::new(),
            fills: Vec::new(),
            shading: Vec::new(),
        };
        assert_eq!(screen(&plot, 2.0, 3.0), (-2.0, 3.0));
        plot.invert_y = true;
        assert_eq!(screen(&plot, 2.0, 3.0), (-2.0, -3.0));
        assert_eq!(screen(&plot, 2.0, 30.0), (-2.0, -7.0));
    }
}
