use std::path::{Path, PathBuf};

use chrono::{NaiveDate, Utc};
use tracing::{info, warn};

use fundwatch::{
    models::holding_record::HoldingRecord,
    services::{
        columns::ColumnOverrides,
        files::{csv_files_in, read_snapshot_file, write_holding_records},
        loader::LoadOptions,
        parsers::holder_from_file_name,
        shared::constants::OUT_DIR,
    },
};

use crate::cli::analyze::report_load;

pub struct ImportArgs {
    pub directory: PathBuf,
    pub as_of: Option<NaiveDate>,
    pub columns: Vec<String>,
}

pub const IMPORTED_FILE_NAME: &str = "imported_holdings.csv";

/// Loads one ad-hoc CSV per fund and combines them into a single interchange file.
pub fn import(args: ImportArgs) -> anyhow::Result<PathBuf> {
    let columns = ColumnOverrides::from_pairs(&args.columns)?;
    let as_of = args.as_of.unwrap_or_else(|| {
        let today = Utc::now().date_naive();
        info!(target: "import", "No --as-of given, dating undated files {}", today);
        today
    });

    let mut records: Vec<HoldingRecord> = vec![];
    let files = csv_files_in(&args.directory);
    for file_path in &files {
        let file_name = file_path
            .file_name()
            .map(|name| name.to_string_lossy().to_string())
            .unwrap_or_default();
        let options = LoadOptions {
            holder: Some(holder_from_file_name(&file_name)),
            as_of: Some(as_of),
            columns: columns.clone(),
            ..Default::default()
        };

        info!(target: "import", "Importing {:?}", file_path);
        match read_snapshot_file(file_path, &options) {
            Ok(outcome) => {
                report_load(file_path, &outcome);
                records.extend(outcome.snapshot.positions().iter().map(HoldingRecord::from));
            }
            Err(e) => {
                eprintln!("Failed to process {}: {:?}", file_path.display(), e);
                continue;
            }
        }
    }

    if files.is_empty() {
        warn!(target: "import", "No CSV files found in {}", args.directory.display());
    }

    let path = Path::new(OUT_DIR).join(IMPORTED_FILE_NAME);
    write_holding_records(&records, &path)?;
    println!(
        "Imported {} positions from {} files into {}",
        records.len(),
        files.len(),
        path.display()
    );
    Ok(path)
}
