//! Tab-separated text artifacts.
//!
//! Every writer takes the output directory and creates (or truncates) a fixed
//! file name inside it. Numbers use Rust's shortest round-trip formatting.

use std::fs::File;
use std::io::{self, BufWriter, Write};
use std::path::{Path, PathBuf};

use ndarray::{ArrayBase, Data, Dimension};

use crate::analysis::{BestPoint, PerformanceSurface};
use crate::config::TrainConfig;
use crate::explainability::{EffectCurve, JointEffect};
use crate::grid::{grid_alpha, tig_value, GridIndex};
use crate::training::{Distribution, PerfMetric};

use super::array::write_array;

fn create(dir: &Path, name: &str) -> io::Result<BufWriter<File>> {
    Ok(BufWriter::new(File::create(dir.join(name))?))
}

// =============================================================================
// Grid search
// =============================================================================

/// `performance.txt`: `alpha \t TiG \t perf` per cell (TiG-major), a blank
/// gap, then the same final-iteration scores as an alpha × TiG matrix.
pub fn write_performance(dir: &Path, surface: &PerformanceSurface, min_alpha: f64) -> io::Result<()> {
    let metric = surface.metric();
    let last = surface.bag_n().saturating_sub(1);
    let (tig_n, alpha_n) = (surface.tig_n(), surface.alpha_n());
    let mut out = create(dir, "performance.txt")?;

    for tig_idx in 0..tig_n {
        for alpha_idx in 0..alpha_n {
            let perf = surface.value(GridIndex::new(alpha_idx, tig_idx), last, metric);
            let alpha = grid_alpha(alpha_idx, alpha_n, min_alpha);
            writeln!(out, "{alpha} \t{} \t{perf}", tig_value(tig_idx))?;
        }
    }
    write!(out, "\n\n")?;
    for alpha_idx in 0..alpha_n {
        for tig_idx in 0..tig_n {
            write!(out, "{} \t", surface.value(GridIndex::new(alpha_idx, tig_idx), last, metric))?;
        }
        writeln!(out)?;
    }
    out.flush()
}

/// `best.txt`: best performance, TiG, alpha, bag count and train size, one per line.
pub fn write_best(dir: &Path, best: &BestPoint, bag_n: usize, train_n: usize) -> io::Result<()> {
    let mut out = create(dir, "best.txt")?;
    writeln!(out, "{}\n{}\n{}\n{bag_n}\n{train_n}", best.performance, best.tig, best.alpha)?;
    out.flush()
}

/// `bagging_rms.txt` (and `bagging_roc.txt` for ROC surfaces): the bagging
/// curve at the best cell, one value per line.
pub fn write_bagging_curves(dir: &Path, surface: &PerformanceSurface, best: GridIndex) -> io::Result<()> {
    let mut curves = vec![("bagging_rms.txt", PerfMetric::Rmse)];
    if surface.metric() == PerfMetric::Roc {
        curves.push(("bagging_roc.txt", PerfMetric::Roc));
    }
    for (name, metric) in curves {
        let mut out = create(dir, name)?;
        for v in surface.curve(best, metric) {
            writeln!(out, "{v}")?;
        }
        out.flush()?;
    }
    Ok(())
}

/// Intermediate state of a grid run, so a later run can resume it.
///
/// `params.txt` holds the run parameters, `bagrms.txt` / `bagroc.txt` the
/// TiG × alpha matrix of every bagging iteration (each preceded by a blank
/// line) and `predsums.bin` the validation prediction sums in the binary
/// array format.
pub fn write_grid_state<S, D>(
    dir: &Path,
    config: &TrainConfig,
    surface: &PerformanceSurface,
    prediction_sums: &ArrayBase<S, D>,
) -> io::Result<()>
where
    S: Data<Elem = f64>,
    D: Dimension,
{
    let mut params = create(dir, "params.txt")?;
    writeln!(params, "{}", config.seed)?;
    for path in [&config.train_path, &config.valid_path, &config.attr_path] {
        writeln!(params, "{}", path.display())?;
    }
    writeln!(params, "{}\n{}\n{}", config.min_alpha, config.max_tig, config.bag_n)?;
    writeln!(params, "{}", config.mode.name())?;
    writeln!(params, "{}", surface_metric_tag(surface.metric()))?;
    params.flush()?;

    let mut layers = vec![("bagrms.txt", PerfMetric::Rmse)];
    if surface.metric() == PerfMetric::Roc {
        layers.push(("bagroc.txt", PerfMetric::Roc));
    }
    for (name, metric) in layers {
        let mut out = create(dir, name)?;
        for b in 0..surface.bag_n() {
            writeln!(out)?;
            for row in surface.iteration(b, metric).rows() {
                for v in row {
                    write!(out, "{v}\t")?;
                }
                writeln!(out)?;
            }
        }
        out.flush()?;
    }

    let mut sums = create(dir, "predsums.bin")?;
    write_array(&mut sums, prediction_sums)?;
    sums.flush()
}

fn surface_metric_tag(metric: PerfMetric) -> &'static str {
    match metric {
        PerfMetric::Rmse => "rms",
        PerfMetric::Roc => "roc",
    }
}

// =============================================================================
// Feature selection
// =============================================================================

/// `distribution.txt`: mean and standard deviation of the last estimate.
pub fn write_distribution(dir: &Path, distribution: &Distribution) -> io::Result<()> {
    let mut out = create(dir, "distribution.txt")?;
    writeln!(out, "{}\n{}", distribution.mean, distribution.std)?;
    out.flush()
}

// =============================================================================
// Effects
// =============================================================================

/// `<attr>.effect.txt`: `count \t value \t effect` per quantile.
pub fn write_effect(dir: &Path, attr_name: &str, curve: &EffectCurve) -> io::Result<PathBuf> {
    let name = format!("{attr_name}.effect.txt");
    let mut out = create(dir, &name)?;
    writeln!(out, "counts\t{attr_name}_values\taverage_effect_values\n")?;
    for p in &curve.points {
        writeln!(out, "{}\t{}\t{}", p.count, p.value, p.effect)?;
    }
    out.flush()?;
    Ok(dir.join(name))
}

/// `<a1>.<a2>.iplot.txt` with the joint effect table and, when a density was
/// estimated, `<a1>.<a2>.iplot.dens.txt` with block borders and proportions.
pub fn write_joint_effect(dir: &Path, names: (&str, &str), joint: &JointEffect) -> io::Result<PathBuf> {
    let (name1, name2) = names;
    let stem = format!("{name1}.{name2}.iplot");
    let mut out = create(dir, &format!("{stem}.txt"))?;

    writeln!(out, "Joint effect table\nrows: \t{name1}\ncolumns: \t{name2}")?;
    writeln!(
        out,
        "First row/column - quantile counts. Second row/column - quantile centers. \
         Ignore four zeros in upper left corner.\n"
    )?;
    write!(out, "0\t0")?;
    for q in &joint.cols {
        write!(out, "\t{}", q.count)?;
    }
    write!(out, "\n0\t0")?;
    for q in &joint.cols {
        write!(out, "\t{}", q.value)?;
    }
    for (q, row) in joint.rows.iter().zip(joint.effects.rows()) {
        write!(out, "\n{}\t{}", q.count, q.value)?;
        for v in row {
            write!(out, "\t{v}")?;
        }
    }
    writeln!(out)?;
    out.flush()?;

    if let Some(density) = &joint.density {
        let mut out = create(dir, &format!("{stem}.dens.txt"))?;
        writeln!(
            out,
            "Density table: proportion of data around each quantile point (some data on edges is ignored)"
        )?;
        writeln!(out, "rows: \t{name1}\ncolumns: \t{name2}")?;
        writeln!(out, "First row/column - quantile borders. Ignore zero in upper left corner.\n")?;
        write!(out, "0")?;
        for b in density.cols.borders() {
            write!(out, "\t{b}")?;
        }
        let row_borders = density.rows.borders();
        for (border, row) in row_borders.iter().zip(density.proportions.rows()) {
            write!(out, "\n{border}")?;
            for v in row {
                write!(out, "\t{v}")?;
            }
        }
        if let Some(last) = row_borders.last() {
            write!(out, "\n{last}")?;
        }
        writeln!(out)?;
        out.flush()?;
    }
    Ok(dir.join(format!("{stem}.txt")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::Quantile;
    use crate::explainability::EffectPoint;
    use ndarray::{array, Array2};
    use std::fs;

    fn surface() -> PerformanceSurface {
        let mut surface = PerformanceSurface::new(2, 3, PerfMetric::Roc);
        surface.push_iteration(
            array![[0.5, 0.4, 0.3], [0.45, 0.35, 0.25]].view(),
            Some(array![[0.6, 0.7, 0.8], [0.65, 0.75, 0.85]].view()),
        );
        surface
    }

    #[test]
    fn performance_dump_lists_cells_then_matrix() {
        let dir = tempfile::tempdir().unwrap();
        write_performance(dir.path(), &surface(), 0.1).unwrap();
        let text = fs::read_to_string(dir.path().join("performance.txt")).unwrap();
        let lines: Vec<&str> = text.lines().collect();
        assert_eq!(lines[0], "0.5 \t1 \t0.6");
        assert_eq!(lines[2], "0.1 \t1 \t0.8");
        assert_eq!(lines[3], "0.5 \t2 \t0.65");
        assert_eq!(lines[6], "");
        assert_eq!(lines[8], "0.6 \t0.65 \t");
        assert_eq!(lines.len(), 11);
    }

    #[test]
    fn grid_state_files() {
        let dir = tempfile::tempdir().unwrap();
        let config = TrainConfig::builder()
            .train_path("train.dta")
            .valid_path("valid.dta")
            .attr_path("data.attr")
            .min_alpha(0.1)
            .max_tig(2)
            .bag_n(1)
            .metric(PerfMetric::Roc)
            .build()
            .unwrap();
        write_grid_state(dir.path(), &config, &surface(), &array![1.0, 2.0]).unwrap();

        let params = fs::read_to_string(dir.path().join("params.txt")).unwrap();
        assert_eq!(
            params.lines().collect::<Vec<_>>(),
            vec!["1", "train.dta", "valid.dta", "data.attr", "0.1", "2", "1", "layered", "roc"]
        );
        let bagroc = fs::read_to_string(dir.path().join("bagroc.txt")).unwrap();
        assert_eq!(bagroc, "\n0.6\t0.7\t0.8\t\n0.65\t0.75\t0.85\t\n");
        assert_eq!(fs::metadata(dir.path().join("predsums.bin")).unwrap().len(), 16);
    }

    #[test]
    fn best_and_curves() {
        let dir = tempfile::tempdir().unwrap();
        let idx = GridIndex::new(1, 0);
        let best = BestPoint {
            index: idx,
            alpha: 0.2,
            tig: 1,
            performance: 0.7,
        };
        write_best(dir.path(), &best, 60, 1000).unwrap();
        write_bagging_curves(dir.path(), &surface(), idx).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("best.txt")).unwrap(), "0.7\n1\n0.2\n60\n1000\n");
        assert_eq!(fs::read_to_string(dir.path().join("bagging_rms.txt")).unwrap(), "0.4\n");
        assert_eq!(fs::read_to_string(dir.path().join("bagging_roc.txt")).unwrap(), "0.7\n");
    }

    #[test]
    fn distribution_summary() {
        let dir = tempfile::tempdir().unwrap();
        let distribution = Distribution {
            mean: 0.5,
            std: 0.25,
            samples: vec![0.25, 0.75],
        };
        write_distribution(dir.path(), &distribution).unwrap();
        assert_eq!(fs::read_to_string(dir.path().join("distribution.txt")).unwrap(), "0.5\n0.25\n");
    }

    #[test]
    fn effect_tables() {
        let dir = tempfile::tempdir().unwrap();
        let curve = EffectCurve {
            attr: 0,
            points: vec![EffectPoint {
                count: 3,
                value: 1.5,
                effect: 0.25,
            }],
        };
        let path = write_effect(dir.path(), "x", &curve).unwrap();
        assert_eq!(
            fs::read_to_string(path).unwrap(),
            "counts\tx_values\taverage_effect_values\n\n3\t1.5\t0.25\n"
        );

        let joint = JointEffect {
            attrs: (0, 1),
            rows: vec![Quantile { count: 2, value: 1.0 }],
            cols: vec![Quantile { count: 4, value: 0.0 }, Quantile { count: 4, value: 1.0 }],
            effects: Array2::from_elem((1, 2), 0.5),
            density: None,
        };
        let path = write_joint_effect(dir.path(), ("x", "flag"), &joint).unwrap();
        let text = fs::read_to_string(path).unwrap();
        assert!(text.ends_with("0\t0\t4\t4\n0\t0\t0\t1\n2\t1\t0.5\t0.5\n"));
        assert!(!dir.path().join("x.flag.iplot.dens.txt").exists());
    }
}
