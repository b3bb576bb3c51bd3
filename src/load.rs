use std::io::Read;
use std::path::Path;
use std::time::{Duration, SystemTime, UNIX_EPOCH};

use anyhow::Context;
use indicatif::{ProgressBar, ProgressStyle};
use serde::Serialize;

use crate::cli::LoadArgs;
use crate::error::LoadError;
use crate::model::{NewObservation, Observation, RawRow};
use crate::source;
use crate::storage::StoragePaths;
use crate::store::RecordStore;

pub const DEFAULT_BATCH_SIZE: usize = 1000;

/// Geography codes CMS publishes for rows without one.
const GEO_CODE_NULL_SENTINEL: &str = "NaN";

#[derive(Debug, Clone, Serialize)]
pub struct LoadReport {
    pub deleted: usize,
    pub inserted: usize,
    pub total_count: u64,
    pub sample: Option<Observation>,
}

#[derive(Debug, Serialize)]
struct LoadMeta {
    loaded_at_unix: i64,
    source: String,
    db_path: String,
    inserted: usize,
    total_count: u64,
    sample: Option<Observation>,
}

pub async fn run(opts: LoadArgs) -> anyhow::Result<()> {
    tracing::info!("drg-explorer load");
    tracing::info!("data_dir={}", opts.data_dir);

    let paths = StoragePaths::new(&opts.data_dir);
    paths
        .ensure_dirs()
        .context("create backend data directories")?;
    let source_path = opts.source.clone().unwrap_or_else(|| paths.default_source());

    tracing::info!("Step 1/4: read source {}", source_path.display());
    let t0 = std::time::Instant::now();
    let bytes = source::read_source(&source_path, &opts.csv_entry)
        .with_context(|| format!("read source {}", source_path.display()))?;
    tracing::info!(
        "Source ready in {:.1}s ({} bytes)",
        t0.elapsed().as_secs_f64(),
        bytes.len()
    );

    tracing::info!("Step 2/4: parse + transform CSV");
    let t1 = std::time::Instant::now();
    let rows = parse_rows(bytes.as_slice()).context("parse source CSV")?;
    drop(bytes);
    tracing::info!(
        "Parsed {} records in {:.1}s",
        rows.len(),
        t1.elapsed().as_secs_f64()
    );

    tracing::info!(
        "Step 3/4: replace record store at {} (batch size {})",
        paths.db_path.display(),
        opts.batch_size
    );
    let store = RecordStore::open_read_write(&paths.db_path)
        .with_context(|| format!("open SQLite at {}", paths.db_path.display()))?;
    let progress = ProgressBar::new(rows.len() as u64);
    apply_load_progress_style(&progress);
    progress.enable_steady_tick(Duration::from_millis(250));
    let report = replace_store(&store, &rows, opts.batch_size, &progress)
        .await
        .context("replace record store")?;
    progress.finish_and_clear();

    tracing::info!(
        "Replaced {} previous records with {}",
        report.deleted,
        report.inserted
    );

    tracing::info!("Step 4/4: verify + write load metadata");
    tracing::info!("Total records: {}", report.total_count);
    if let Some(sample) = &report.sample {
        tracing::info!("Sample record ID: {}", sample.id);
        tracing::info!(
            "Sample DRG: {} - {}",
            sample.drg_code,
            sample.drg_description
        );
        tracing::info!(
            "Sample Geography: {} ({})",
            sample.geo_description,
            sample.geo_level
        );
    } else {
        tracing::warn!("Source contained no records; the store is now empty");
    }

    let meta = LoadMeta {
        loaded_at_unix: now_unix_seconds(),
        source: source_path.display().to_string(),
        db_path: paths.db_path.display().to_string(),
        inserted: report.inserted,
        total_count: report.total_count,
        sample: report.sample.clone(),
    };
    write_json(&paths.meta_path, &meta).context("write meta.json")?;

    tracing::info!("Load complete.");
    Ok(())
}

/// Parses and transforms every row up front; the first bad value aborts the whole load.
pub fn parse_rows<R: Read>(reader: R) -> Result<Vec<NewObservation>, LoadError> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_reader(reader);

    let mut out = Vec::new();
    for (i, result) in rdr.deserialize::<RawRow>().enumerate() {
        let raw = result?;
        out.push(transform(raw, i + 1)?);
    }
    Ok(out)
}

/// Applies the source-to-store rules to one row. `row` is the 1-based data row number.
pub fn transform(raw: RawRow, row: usize) -> Result<NewObservation, LoadError> {
    let geo_code = raw
        .geo_code
        .filter(|code| !code.is_empty() && code != GEO_CODE_NULL_SENTINEL);

    Ok(NewObservation {
        geo_level: raw.geo_level,
        geo_code,
        geo_description: raw.geo_description,
        drg_code: parse_count(&raw.drg_code, row, "DRG_Cd")?,
        drg_description: raw.drg_description,
        total_discharges: parse_count(&raw.total_discharges, row, "Tot_Dschrgs")?,
        avg_submitted_charge: parse_amount(&raw.avg_submitted_charge, row, "Avg_Submtd_Cvrd_Chrg")?,
        avg_total_payment: parse_amount(&raw.avg_total_payment, row, "Avg_Tot_Pymt_Amt")?,
        avg_medicare_payment: parse_amount(&raw.avg_medicare_payment, row, "Avg_Mdcr_Pymt_Amt")?,
    })
}

fn parse_count(value: &str, row: usize, column: &'static str) -> Result<i64, LoadError> {
    let n: i64 = value.parse().map_err(|_| LoadError::InvalidInteger {
        row,
        column,
        value: value.to_string(),
    })?;
    if n < 0 {
        return Err(LoadError::Negative {
            row,
            column,
            value: value.to_string(),
        });
    }
    Ok(n)
}

fn parse_amount(value: &str, row: usize, column: &'static str) -> Result<f64, LoadError> {
    let invalid = || LoadError::InvalidNumber {
        row,
        column,
        value: value.to_string(),
    };
    let n: f64 = value.parse().map_err(|_| invalid())?;
    if !n.is_finite() {
        return Err(invalid());
    }
    if n < 0.0 {
        return Err(LoadError::Negative {
            row,
            column,
            value: value.to_string(),
        });
    }
    Ok(n)
}

/// Full transactional replace followed by the post-load verification reads.
pub async fn replace_store(
    store: &RecordStore,
    rows: &[NewObservation],
    batch_size: usize,
    progress: &ProgressBar,
) -> Result<LoadReport, LoadError> {
    let outcome = store
        .replace_all(rows, batch_size, |n| progress.inc(n as u64))
        .await?;
    let total_count = store.count().await?;
    let sample = store.first().await?;

    Ok(LoadReport {
        deleted: outcome.deleted,
        inserted: outcome.inserted,
        total_count,
        sample,
    })
}

fn apply_load_progress_style(progress: &ProgressBar) {
    if let Ok(style) = ProgressStyle::with_template(
        "{spinner:.green} {prefix:.bold} [{elapsed_precise}] [{bar:32.cyan/blue}] \
{pos}/{len} ({percent}%) {per_sec} eta {eta_precise}",
    ) {
        progress.set_style(style.progress_chars("=> "));
    }
    progress.set_prefix("INSERT");
}

fn write_json(path: &Path, v: &impl Serialize) -> anyhow::Result<()> {
    if let Some(parent) = path.parent() {
        std::fs::create_dir_all(parent)?;
    }
    let s = serde_json::to_string_pretty(v)?;
    std::fs::write(path, s)?;
    Ok(())
}

fn now_unix_seconds() -> i64 {
    SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map(|d| d.as_secs() as i64)
        .unwrap_or_default()
}
