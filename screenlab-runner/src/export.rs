//! Export: JSON manifests and CSV artifacts.
//!
//! Every persisted manifest carries a `schema_version`. Manifests written by
//! a newer version are rejected on load.

use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};

use screenlab_core::domain::{EquityCurve, Rebalance};

use crate::result::{BacktestResult, BenchmarkResult, SCHEMA_VERSION};

// ─── JSON export ────────────────────────────────────────────────────

/// Serialize a `BacktestResult` to pretty JSON.
pub fn export_json(result: &BacktestResult) -> Result<String> {
    serde_json::to_string_pretty(result).context("failed to serialize BacktestResult to JSON")
}

/// Deserialize a `BacktestResult` from JSON, rejecting unknown schema versions.
pub fn import_json(json: &str) -> Result<BacktestResult> {
    let result: BacktestResult =
        serde_json::from_str(json).context("failed to deserialize BacktestResult from JSON")?;
    if result.schema_version > SCHEMA_VERSION {
        bail!(
            "unsupported schema version {} (max supported: {})",
            result.schema_version,
            SCHEMA_VERSION
        );
    }
    Ok(result)
}

// ─── CSV export ─────────────────────────────────────────────────────

/// Equity curve with its drawdown. Columns: date, equity, drawdown.
pub fn export_equity_csv(curve: &EquityCurve) -> Result<String> {
    let drawdown = curve.drawdown_curve();
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "equity", "drawdown"])?;
    for (p, dd) in curve.points().iter().zip(drawdown.points()) {
        wtr.write_record([
            &p.date.to_string(),
            &format!("{:.2}", p.value),
            &format!("{:.6}", dd.drawdown),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// One row per holding per rebalance. All-cash periods get a single row
/// with an empty symbol so every rebalance date appears.
///
/// Columns: date, eligible, symbol, weight, units, entry_price
pub fn export_holdings_csv(rebalances: &[Rebalance]) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "eligible", "symbol", "weight", "units", "entry_price"])?;
    for r in rebalances {
        let date = r.date.to_string();
        let eligible = r.eligible_count.to_string();
        if r.is_cash() {
            wtr.write_record([date.as_str(), eligible.as_str(), "", "0", "0", ""])?;
            continue;
        }
        for h in &r.holdings {
            wtr.write_record([
                &date,
                &eligible,
                &h.symbol,
                &format!("{:.6}", h.weight),
                &format!("{:.6}", h.units),
                &format!("{:.4}", h.entry_price),
            ])?;
        }
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

/// Benchmark curve with its drawdown, labelled with the index symbol.
///
/// Columns: date, symbol, equity, drawdown
pub fn export_benchmark_csv(benchmark: &BenchmarkResult) -> Result<String> {
    let mut wtr = csv::Writer::from_writer(vec![]);
    wtr.write_record(["date", "symbol", "equity", "drawdown"])?;
    for (p, dd) in benchmark
        .equity_curve
        .points()
        .iter()
        .zip(benchmark.drawdown_curve.points())
    {
        wtr.write_record([
            &p.date.to_string(),
            &benchmark.symbol,
            &format!("{:.2}", p.value),
            &format!("{:.6}", dd.drawdown),
        ])?;
    }
    let data = wtr.into_inner().context("failed to flush CSV writer")?;
    String::from_utf8(data).context("CSV output is not valid UTF-8")
}

// ─── Artifact bundle ────────────────────────────────────────────────

/// Save the full artifact set for one run.
///
/// Creates `{run_id[..12]}/` under `output_dir` containing:
/// - `manifest.json`: the full `BacktestResult`
/// - `equity.csv`: daily equity and drawdown
/// - `holdings.csv`: holdings at every rebalance
/// - `benchmark.csv`: only when a benchmark ran
///
/// Returns the path to the created directory. The directory name derives
/// from the content hash, so saving the same run twice overwrites it.
pub fn save_artifacts(result: &BacktestResult, output_dir: &Path) -> Result<PathBuf> {
    let short = result.run_id.get(..12).unwrap_or(&result.run_id);
    let run_dir = output_dir.join(short);
    std::fs::create_dir_all(&run_dir)
        .with_context(|| format!("failed to create artifact dir: {}", run_dir.display()))?;

    std::fs::write(run_dir.join("manifest.json"), export_json(result)?)?;
    std::fs::write(
        run_dir.join("equity.csv"),
        export_equity_csv(&result.equity_curve)?,
    )?;
    std::fs::write(
        run_dir.join("holdings.csv"),
        export_holdings_csv(&result.rebalances)?,
    )?;
    if let Some(bench) = &result.benchmark {
        std::fs::write(run_dir.join("benchmark.csv"), export_benchmark_csv(bench)?)?;
    }

    tracing::info!(dir = %run_dir.display(), "artifacts written");
    Ok(run_dir)
}

/// Load a `BacktestResult` from an artifact directory's manifest.json.
///
/// Rejects unknown schema versions.
pub fn load_artifacts(dir: &Path) -> Result<BacktestResult> {
    let manifest_path = dir.join("manifest.json");
    let json = std::fs::read_to_string(&manifest_path)
        .with_context(|| format!("failed to read {}", manifest_path.display()))?;
    import_json(&json)
}
