use std::{
    fs::{self, File},
    path::{Path, PathBuf},
};

use anyhow::Context;
use csv::Writer;
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info};
use walkdir::WalkDir;

use crate::{
    models::{fund::Fund, holding_record::HoldingRecord},
    services::{
        loader::{load_snapshot, LoadOptions, LoadOutcome},
        shared::constants::{IN_DIR, OUT_DIR},
    },
};

fn create_dir_if_nonexistent(directory_path: &str) -> anyhow::Result<()> {
    let path = Path::new(directory_path);
    if !path.exists() {
        fs::create_dir_all(path)
            .with_context(|| format!("Couldn't create folder {}", path.display()))?;
        info!("Folder created at: {:?}", path);
    } else {
        debug!("Folder already exists at: {:?}.", path);
    }
    Ok(())
}

pub fn create_necessary_directories() -> anyhow::Result<()> {
    create_dir_if_nonexistent(OUT_DIR)?;
    create_dir_if_nonexistent(IN_DIR)?;
    Ok(())
}

pub fn export_csv<T>(rows: &[T], out_dir: &Path, file_name: &str) -> anyhow::Result<PathBuf>
where
    T: Serialize,
{
    let path = out_dir.join(format!("{}.csv", file_name));
    let file = File::create(&path)
        .with_context(|| format!("Couldn't create {}", path.display()))?;
    let mut wtr = Writer::from_writer(file);

    for row in rows {
        wtr.serialize(row)?;
    }

    wtr.flush()?;

    Ok(path)
}

pub fn export_json<T>(data: T, out_dir: &Path, file_name: &str) -> anyhow::Result<PathBuf>
where
    T: Serialize,
{
    let path = out_dir.join(format!("{}.json", file_name));
    let json_data = serde_json::to_string_pretty(&json!(&data))?;

    fs::write(&path, json_data).with_context(|| format!("Couldn't write {}", path.display()))?;

    Ok(path)
}

/// Writes holdings in the interchange layout, header included even when empty.
pub fn write_holding_records(records: &[HoldingRecord], path: &Path) -> anyhow::Result<()> {
    let file = File::create(path).with_context(|| format!("Couldn't create {}", path.display()))?;
    let mut wtr = csv::WriterBuilder::new().has_headers(false).from_writer(file);

    wtr.write_record(crate::models::holding_record::HOLDING_RECORD_HEADER)?;
    for record in records {
        wtr.serialize(record)?;
    }

    wtr.flush()?;
    Ok(())
}

pub fn read_snapshot_file(path: &Path, options: &LoadOptions) -> anyhow::Result<LoadOutcome> {
    let file = File::open(path).with_context(|| format!("Couldn't open {}", path.display()))?;
    let outcome = load_snapshot(file, options)
        .with_context(|| format!("Couldn't load holdings from {}", path.display()))?;
    Ok(outcome)
}

/// Reads a `name,cik` list of funds to fetch.
pub fn read_funds_file(path: &Path) -> anyhow::Result<Vec<Fund>> {
    let mut rdr = csv::ReaderBuilder::new()
        .trim(csv::Trim::All)
        .from_path(path)
        .with_context(|| format!("Couldn't open {}", path.display()))?;

    let mut funds = vec![];
    for result in rdr.deserialize() {
        let fund: Fund = result?;
        funds.push(fund);
    }
    Ok(funds)
}

/// All `.csv` files below `directory`, in path order.
pub fn csv_files_in(directory: &Path) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(directory)
        .into_iter()
        .filter_map(|e| e.ok())
        .filter(|e| e.file_type().is_file())
        .map(|e| e.into_path())
        .filter(|path| {
            path.extension()
                .is_some_and(|extension| extension.eq_ignore_ascii_case("csv"))
        })
        .collect();
    files.sort();
    files
}
