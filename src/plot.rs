use super::{
    finite_span, padded_range, Metric, ProgramView, Series, DEFAULT_CSVIN, DEFAULT_OUTDIR,
    VERSION,
};
use clap::{App, Arg};
use plotters::coord::Shift;
use plotters::prelude::*;
use std::ffi::OsString;
use std::path::{Path, PathBuf};

/// 18 x 5 inches at 100 dpi
pub const FIGURE_SIZE: (u32, u32) = (1800, 500);

/// categorical colors, one per algorithm in order of appearance
const PALETTE: [RGBColor; 10] = [
    RGBColor(76, 114, 176),
    RGBColor(221, 132, 82),
    RGBColor(85, 168, 104),
    RGBColor(196, 78, 82),
    RGBColor(129, 114, 179),
    RGBColor(147, 120, 96),
    RGBColor(218, 139, 195),
    RGBColor(140, 140, 140),
    RGBColor(204, 185, 116),
    RGBColor(100, 181, 205),
];

/// Takes the CLI arguments that control the input table and the output directory.
pub fn parse_cli() -> (PathBuf, PathBuf) {
    parse_cli_from(std::env::args_os())
}

pub fn parse_cli_from<I, T>(args: I) -> (PathBuf, PathBuf)
where
    I: IntoIterator<Item = T>,
    T: Into<OsString> + Clone,
{
    let arg_csvin = Arg::with_name("input_csvfile")
        .help("name of the csv file with the measurements")
        .short("f")
        .long("csvfile")
        .takes_value(true)
        .default_value(DEFAULT_CSVIN);
    let arg_outdir = Arg::with_name("output_dir")
        .help("directory for the png charts, created if missing")
        .short("o")
        .long("outdir")
        .takes_value(true)
        .default_value(DEFAULT_OUTDIR);
    let cli_args = App::new("Virtmem_plot")
        .version(VERSION.unwrap_or("unknown"))
        .about("cli app to plot the page replacement performance of each benchmark program")
        .arg(arg_csvin)
        .arg(arg_outdir)
        .get_matches_from(args);
    let csvin = PathBuf::from(cli_args.value_of("input_csvfile").unwrap_or(DEFAULT_CSVIN));
    let outdir = PathBuf::from(cli_args.value_of("output_dir").unwrap_or(DEFAULT_OUTDIR));
    (csvin, outdir)
}

impl<'a> ProgramView<'a> {
    /// plots one panel per metric side by side to png, overwriting fout
    pub fn plot_performance(&self, fout: &Path) -> Result<(), Box<dyn std::error::Error>> {
        // ranges are checked before the backend exists, so a failure leaves no file behind
        let panels = Metric::ALL
            .iter()
            .map(|&metric| Panel::new(self, metric))
            .collect::<Result<Vec<Panel>, _>>()?;

        let root = BitMapBackend::new(fout, FIGURE_SIZE).into_drawing_area();
        root.fill(&WHITE)?;
        let title = format!("Performance Comparison on '{}' Program", self.program);
        let root = root.titled(&title, ("sans-serif", 32))?;
        let areas = root.split_evenly((1, panels.len()));
        for (area, panel) in areas.iter().zip(panels.iter()) {
            panel.draw(area)?;
        }
        root.present()?;
        Ok(())
    }
}

/// One subplot: the lines of a metric and the axis ranges that hold them
struct Panel {
    metric: Metric,
    series: Vec<Series>,
    x_range: (f64, f64),
    y_range: (f64, f64),
}

impl Panel {
    fn new(view: &ProgramView<'_>, metric: Metric) -> Result<Panel, Box<dyn std::error::Error>> {
        let series = view.series(metric);
        let xs: Vec<f64> = series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.0))
            .collect();
        let ys: Vec<f64> = series
            .iter()
            .flat_map(|s| s.points.iter().map(|p| p.1))
            .collect();
        let x_range = padded_range(&xs, 20.);
        let y_range = padded_range(&ys, 10.);
        if !finite_span(x_range) || !finite_span(y_range) {
            return Err(format!(
                "the {} axes of program {} span more than the f64 range",
                metric, view.program
            )
            .into());
        }
        Ok(Panel {
            metric,
            series,
            x_range,
            y_range,
        })
    }

    fn draw(
        &self,
        area: &DrawingArea<BitMapBackend<'_>, Shift>,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let (xmin, xmax) = self.x_range;
        let (ymin, ymax) = self.y_range;
        let mut chart = ChartBuilder::on(area)
            .caption(self.metric.title(), ("sans-serif", 24))
            .margin(20)
            .x_label_area_size(50)
            .y_label_area_size(80)
            .build_cartesian_2d(xmin..xmax, ymin..ymax)?;
        chart
            .configure_mesh()
            .light_line_style(&TRANSPARENT)
            .bold_line_style(RGBColor(220, 220, 220).stroke_width(1))
            .set_all_tick_mark_size(2)
            .label_style(("sans-serif", 16))
            .x_desc("Frames")
            .y_desc(self.metric.title())
            .draw()?;

        if self.series.is_empty() {
            return Ok(());
        }

        // legend heading, an entry without a marker
        chart
            .draw_series(std::iter::empty::<Circle<(f64, f64), i32>>())?
            .label("algorithm")
            .legend(|(x, y)| EmptyElement::at((x, y)));
        for (idx, s) in self.series.iter().enumerate() {
            let color = PALETTE[idx % PALETTE.len()];
            chart
                .draw_series(LineSeries::new(
                    s.points.iter().copied(),
                    color.stroke_width(2),
                ))?
                .label(s.algorithm.as_str())
                .legend(move |(x, y)| {
                    PathElement::new(vec![(x - 10, y), (x + 10, y)], color.stroke_width(2))
                });
            chart.draw_series(
                s.points
                    .iter()
                    .map(|&p| Circle::new(p, 4, color.filled())),
            )?;
        }

        chart
            .configure_series_labels()
            .position(SeriesLabelPosition::UpperRight)
            .background_style(&WHITE.mix(0.8))
            .border_style(&BLACK)
            .label_font(("sans-serif", 16))
            .draw()?;
        Ok(())
    }
}
