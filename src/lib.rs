use anyhow::{anyhow, bail, Context, Result};
use csv::StringRecord;
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, info, warn};
pub mod metric;
pub mod plot;

pub use metric::Metric;

pub const VERSION: Option<&str> = option_env!("CARGO_PKG_VERSION");

pub const DEFAULT_CSVIN: &str = "outputs/output.csv";
pub const DEFAULT_OUTDIR: &str = "outputs";

/// benchmark programs, one chart each, in this order
pub const PROGRAMS: [&str; 3] = ["focus", "scan", "sort"];

/// only the leading columns are read, anything after them is ignored
pub const USED_COLUMNS: usize = 7;

/// One measurement, i.e., one run of the pager with a given program, algorithm and frame count.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Record {
    pub program: String,
    pub algorithm: String,
    pub nframes: f64,
    pub pagefaults: f64,
    pub diskwrites: f64,
    pub diskreads: f64,
}

impl Record {
    /// first field holding an infinite value, if any
    pub fn infinite_field(&self) -> Option<&'static str> {
        if self.nframes.is_infinite() {
            return Some("nframes");
        }
        Metric::ALL
            .iter()
            .find(|m| m.value(self).is_infinite())
            .map(|m| m.name())
    }
}

/// The main struct for the measurement table, rows kept in file order
#[derive(Debug, Clone, Default)]
pub struct RecordTable {
    pub records: Vec<Record>,
}

impl RecordTable {
    pub fn new() -> RecordTable {
        RecordTable {
            records: Vec::new(),
        }
    }

    /// Init a RecordTable from csv.
    /// Only the first USED_COLUMNS columns are kept;
    /// within them the fields are looked up by header name.
    /// Fails on missing columns, rows of the wrong length,
    /// unparsable numbers and infinite values.
    pub fn from_csv<P: AsRef<Path>>(fin: P) -> Result<RecordTable> {
        let fin = fin.as_ref();
        let mut reader = csv::ReaderBuilder::new()
            .has_headers(true)
            .from_path(fin)
            .with_context(|| format!("could not open {}", fin.display()))?;
        let header: StringRecord = reader
            .headers()
            .with_context(|| format!("could not read the header of {}", fin.display()))?
            .iter()
            .take(USED_COLUMNS)
            .collect();
        if header.len() < USED_COLUMNS {
            bail!(
                "{} has {} column(s), expected at least {}",
                fin.display(),
                header.len(),
                USED_COLUMNS
            );
        }

        let mut table = RecordTable::new();
        for row in reader.records() {
            let row = row.with_context(|| format!("could not read a row of {}", fin.display()))?;
            let line = row.position().map(|p| p.line()).unwrap_or_default();
            let row: StringRecord = row.iter().take(USED_COLUMNS).collect();
            let record: Record = row
                .deserialize(Some(&header))
                .with_context(|| format!("invalid record at line {} of {}", line, fin.display()))?;
            if let Some(field) = record.infinite_field() {
                bail!(
                    "infinite {} at line {} of {}",
                    field,
                    line,
                    fin.display()
                );
            }
            table.records.push(record);
        }
        info!("read {} records from {}", table.len(), fin.display());
        Ok(table)
    }

    pub fn len(&self) -> usize {
        self.records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// rows whose program matches exactly, in file order; may be empty
    pub fn for_program<'a>(&'a self, program: &'a str) -> ProgramView<'a> {
        let records = self
            .records
            .iter()
            .filter(|r| r.program == program)
            .collect();
        ProgramView { program, records }
    }
}

/// The rows of a single benchmark program, borrowed from the table
#[derive(Debug, Clone)]
pub struct ProgramView<'a> {
    pub program: &'a str,
    pub records: Vec<&'a Record>,
}

/// One line of a subplot
#[derive(Debug, Clone, PartialEq)]
pub struct Series {
    pub algorithm: String,
    pub points: Vec<(f64, f64)>,
}

impl<'a> ProgramView<'a> {
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// distinct algorithms in order of first appearance
    pub fn algorithms(&self) -> Vec<&'a str> {
        let mut algorithms: Vec<&'a str> = Vec::new();
        for &r in self.records.iter() {
            if !algorithms.contains(&r.algorithm.as_str()) {
                algorithms.push(r.algorithm.as_str());
            }
        }
        algorithms
    }

    /// one series per algorithm with the points sorted by nframes;
    /// repeated nframes are averaged and non-finite points dropped
    pub fn series(&self, metric: Metric) -> Vec<Series> {
        self.algorithms()
            .into_iter()
            .map(|algorithm| {
                let mut points: Vec<(f64, f64)> = self
                    .records
                    .iter()
                    .filter(|r| r.algorithm == algorithm)
                    .map(|r| (r.nframes, metric.value(r)))
                    .filter(|(x, y)| x.is_finite() && y.is_finite())
                    .collect();
                points.sort_by(|a, b| a.0.total_cmp(&b.0));
                let points = mean_by_x(&points);
                debug!(
                    "{} {} {}: {} point(s)",
                    self.program,
                    metric,
                    algorithm,
                    points.len()
                );
                Series {
                    algorithm: algorithm.to_string(),
                    points,
                }
            })
            .collect()
    }
}

/// collapses runs of equal x into their mean y, expects points sorted by x
fn mean_by_x(sorted: &[(f64, f64)]) -> Vec<(f64, f64)> {
    let mut out: Vec<(f64, f64)> = Vec::with_capacity(sorted.len());
    let mut count = 0usize;
    for &(x, y) in sorted.iter() {
        match out.last_mut() {
            Some(last) if last.0 == x => {
                last.1 += y;
                count += 1;
            }
            _ => {
                if let Some(last) = out.last_mut() {
                    last.1 /= count as f64;
                }
                out.push((x, y));
                count = 1;
            }
        }
    }
    if let Some(last) = out.last_mut() {
        last.1 /= count as f64;
    }
    out
}

pub fn min_and_max<T: std::cmp::PartialOrd + Copy>(s: &[T]) -> Option<(T, T)> {
    let mut self_iter = s.iter();
    let (mut min, mut max) = match self_iter.next() {
        Some(v) => (*v, *v),
        None => return None,
    };
    for es in self_iter {
        if *es > max {
            max = *es
        }
        if *es < min {
            min = *es
        }
    }
    Some((min, max))
}

/// axis range around the values, with span / divisions of margin on each side;
/// a single value gets +-1, no values give 0..1.
/// The span itself may still overflow for values near f64::MAX, see finite_span.
pub fn padded_range(values: &[f64], divisions: f64) -> (f64, f64) {
    match min_and_max(values) {
        None => (0., 1.),
        Some((min, max)) if min == max => (min - 1., max + 1.),
        Some((min, max)) => {
            let margin = max / divisions - min / divisions;
            (min - margin, max + margin)
        }
    }
}

/// true if the range and its width are finite, i.e., it can be drawn
pub fn finite_span(range: (f64, f64)) -> bool {
    (range.1 - range.0).is_finite()
}

pub fn chart_path<P: AsRef<Path>>(outdir: P, program: &str) -> PathBuf {
    outdir.as_ref().join(format!("{}_performance.png", program))
}

/// Reads the table and writes one chart per program into outdir.
/// Nothing is written if the table cannot be read.
pub fn generate_charts<P, Q>(csvin: P, outdir: Q) -> Result<Vec<PathBuf>>
where
    P: AsRef<Path>,
    Q: AsRef<Path>,
{
    let outdir = outdir.as_ref();
    let table = RecordTable::from_csv(csvin)?;
    if table.is_empty() {
        warn!("the table has no records, all charts will be empty");
    }
    fs::create_dir_all(outdir)
        .with_context(|| format!("could not create output directory {}", outdir.display()))?;

    let mut written = Vec::with_capacity(PROGRAMS.len());
    for program in PROGRAMS.iter() {
        let view = table.for_program(program);
        if view.is_empty() {
            warn!("no records for program {}, its chart will be empty", program);
        }
        let fout = chart_path(outdir, program);
        view.plot_performance(&fout)
            .map_err(|e| anyhow!("could not plot {}: {}", fout.display(), e))?;
        info!("wrote {}", fout.display());
        written.push(fout);
    }
    Ok(written)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    const HEADER: &str = "program,algorithm,nframes,pagefaults,diskwrites,diskreads,npages\n";

    fn csv_file(content: &str) -> NamedTempFile {
        let mut f = NamedTempFile::new().unwrap();
        f.write_all(content.as_bytes()).unwrap();
        f.flush().unwrap();
        f
    }

    fn table(rows: &str) -> RecordTable {
        let f = csv_file(&format!("{}{}", HEADER, rows));
        RecordTable::from_csv(f.path()).unwrap()
    }

    #[test]
    fn reads_records_in_file_order() {
        let t = table("focus,A,4,10,1,2,100\nscan,fifo,8,5,1,1,100\n");
        assert_eq!(t.len(), 2);
        assert_eq!(
            t.records[0],
            Record {
                program: "focus".to_string(),
                algorithm: "A".to_string(),
                nframes: 4.,
                pagefaults: 10.,
                diskwrites: 1.,
                diskreads: 2.,
            }
        );
        assert_eq!(t.records[1].program, "scan");
    }

    #[test]
    fn ignores_columns_after_the_seventh() {
        let f = csv_file(
            "program,algorithm,nframes,pagefaults,diskwrites,diskreads,npages,note\n\
             sort,rand,3,7,2,5,100,not a number\n",
        );
        let t = RecordTable::from_csv(f.path()).unwrap();
        assert_eq!(t.len(), 1);
        assert_eq!(t.records[0].diskreads, 5.);
    }

    #[test]
    fn fields_are_found_by_name_within_the_first_seven() {
        let f = csv_file(
            "algorithm,program,diskreads,diskwrites,pagefaults,nframes,npages\n\
             fifo,scan,3,2,1,16,100\n",
        );
        let t = RecordTable::from_csv(f.path()).unwrap();
        let r = &t.records[0];
        assert_eq!(r.program, "scan");
        assert_eq!(r.algorithm, "fifo");
        assert_eq!(r.nframes, 16.);
        assert_eq!(r.pagefaults, 1.);
        assert_eq!(r.diskwrites, 2.);
        assert_eq!(r.diskreads, 3.);
    }

    #[test]
    fn named_column_past_the_seventh_is_not_used() {
        let f = csv_file(
            "program,algorithm,nframes,pagefaults,diskwrites,npages,other,diskreads\n\
             scan,fifo,16,1,2,100,0,3\n",
        );
        let err = RecordTable::from_csv(f.path()).unwrap_err();
        assert!(format!("{:#}", err).contains("diskreads"));
    }

    #[test]
    fn fewer_than_seven_columns_is_an_error() {
        let f = csv_file("program,algorithm,nframes,pagefaults\nfocus,A,4,10\n");
        let err = RecordTable::from_csv(f.path()).unwrap_err();
        assert!(err.to_string().contains("expected at least 7"));
    }

    #[test]
    fn unparsable_number_is_an_error() {
        let f = csv_file(&format!("{}focus,A,four,10,1,2,100\n", HEADER));
        assert!(RecordTable::from_csv(f.path()).is_err());
    }

    #[test]
    fn infinite_value_is_an_error() {
        let f = csv_file(&format!("{}focus,A,4,inf,1,2,100\n", HEADER));
        let err = RecordTable::from_csv(f.path()).unwrap_err();
        assert!(err.to_string().contains("infinite pagefaults at line 2"));

        let f = csv_file(&format!("{}focus,A,-inf,1,1,2,100\n", HEADER));
        let err = RecordTable::from_csv(f.path()).unwrap_err();
        assert!(err.to_string().contains("infinite nframes"));
    }

    #[test]
    fn short_and_long_rows_are_errors() {
        let f = csv_file(&format!("{}focus,A,4,10,1,2\n", HEADER));
        assert!(RecordTable::from_csv(f.path()).is_err());
        let f = csv_file(&format!("{}focus,A,4,10,1,2,100,7\n", HEADER));
        assert!(RecordTable::from_csv(f.path()).is_err());
    }

    #[test]
    fn missing_file_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(RecordTable::from_csv(dir.path().join("nope.csv")).is_err());
    }

    #[test]
    fn for_program_uses_exact_match() {
        let t = table("focus,A,4,10,1,2,100\nFocus,A,4,10,1,2,100\nfocus2,A,4,1,1,1,100\n");
        assert_eq!(t.for_program("focus").records.len(), 1);
        assert!(t.for_program("sort").is_empty());
    }

    #[test]
    fn algorithms_in_order_of_appearance() {
        let t = table(
            "sort,fifo,4,1,1,1,100\nsort,rand,4,1,1,1,100\nsort,fifo,8,1,1,1,100\nsort,custom,4,1,1,1,100\n",
        );
        assert_eq!(t.for_program("sort").algorithms(), vec!["fifo", "rand", "custom"]);
    }

    #[test]
    fn focus_pagefaults_descend() {
        let t = table("focus,A,4,10,1,2,100\nfocus,A,8,5,1,1,100\n");
        let series = t.for_program("focus").series(Metric::Pagefaults);
        assert_eq!(
            series,
            vec![Series {
                algorithm: "A".to_string(),
                points: vec![(4., 10.), (8., 5.)],
            }]
        );
    }

    #[test]
    fn series_points_sorted_by_nframes() {
        let t = table("scan,fifo,32,1,0,1,100\nscan,fifo,4,9,0,9,100\nscan,fifo,16,3,0,3,100\n");
        let series = t.for_program("scan").series(Metric::Diskreads);
        let xs: Vec<f64> = series[0].points.iter().map(|p| p.0).collect();
        assert_eq!(xs, vec![4., 16., 32.]);
    }

    #[test]
    fn repeated_nframes_are_averaged() {
        let t = table("scan,rand,4,10,0,0,100\nscan,rand,8,3,0,0,100\nscan,rand,4,20,0,0,100\n");
        let series = t.for_program("scan").series(Metric::Pagefaults);
        assert_eq!(series[0].points, vec![(4., 15.), (8., 3.)]);
    }

    #[test]
    fn empty_view_has_no_series() {
        let t = table("focus,A,4,10,1,2,100\n");
        assert!(t.for_program("scan").series(Metric::Diskwrites).is_empty());
    }

    #[test]
    fn mean_by_x_handles_single_and_empty() {
        assert!(mean_by_x(&[]).is_empty());
        assert_eq!(mean_by_x(&[(1., 2.)]), vec![(1., 2.)]);
        assert_eq!(
            mean_by_x(&[(1., 2.), (1., 4.), (1., 6.), (2., 1.)]),
            vec![(1., 4.), (2., 1.)]
        );
    }

    #[test]
    fn min_and_max_of_slice() {
        assert_eq!(min_and_max(&[3., -1., 7., 2.]), Some((-1., 7.)));
        assert_eq!(min_and_max::<f64>(&[]), None);
    }

    #[test]
    fn padded_range_cases() {
        assert_eq!(padded_range(&[], 10.), (0., 1.));
        assert_eq!(padded_range(&[5., 5.], 10.), (4., 6.));
        assert_eq!(padded_range(&[0., 10.], 10.), (-1., 11.));
    }

    #[test]
    fn padded_range_margin_does_not_overflow() {
        let range = padded_range(&[1e307, -1e307], 10.);
        assert!(range.0.is_finite() && range.1.is_finite());
        assert!(finite_span(range));
    }

    #[test]
    fn huge_span_is_not_drawable() {
        let range = padded_range(&[1e308, -1e308], 10.);
        assert!(range.0.is_finite() && range.1.is_finite());
        assert!(!finite_span(range));
        assert!(finite_span((0., 1.)));
    }

    #[test]
    fn chart_path_names_the_program() {
        assert_eq!(
            chart_path("outputs", "focus"),
            PathBuf::from("outputs").join("focus_performance.png")
        );
    }
}
