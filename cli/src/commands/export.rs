use anyhow::{Context, Result};
use chrono::Local;
use std::path::{Path, PathBuf};
use std::process;

use fitlog_core::export::{export_file_name, parse_export_csv};

use super::connect;
use super::helpers::json_error;
use crate::config::Config;

pub(crate) async fn cmd_export(
    config: &Config,
    output: Option<PathBuf>,
    json: bool,
) -> Result<()> {
    let svc = connect(config).await?;

    let Some(csv) = svc.export_csv() else {
        let msg = "No records to export";
        if json {
            println!("{}", json_error(msg));
        } else {
            eprintln!("{msg}");
        }
        process::exit(2);
    };

    let path =
        output.unwrap_or_else(|| PathBuf::from(export_file_name(Local::now().date_naive())));
    std::fs::write(&path, csv.as_bytes())
        .with_context(|| format!("Failed to write {}", path.display()))?;

    let count = svc.records().len();
    if json {
        println!(
            "{}",
            serde_json::json!({ "file": path.display().to_string(), "records": count })
        );
    } else {
        println!("Exported {count} records to {}", path.display());
    }
    Ok(())
}

pub(crate) async fn cmd_import(
    config: &Config,
    file: &Path,
    dry_run: bool,
    json: bool,
) -> Result<()> {
    let data = std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))?;
    let records = parse_export_csv(&data)?;

    if dry_run {
        if json {
            println!(
                "{}",
                serde_json::json!({ "dry_run": true, "records": records.len() })
            );
        } else {
            println!("Parsed {} records (dry run, nothing saved)", records.len());
        }
        return Ok(());
    }

    let mut svc = connect(config).await?;
    let mut imported = 0usize;
    for record in records {
        let date = record.date;
        svc.create_or_update(record)
            .await
            .with_context(|| format!("Failed to import record for {date} ({imported} saved)"))?;
        imported += 1;
    }

    if json {
        println!("{}", serde_json::json!({ "imported": imported }));
    } else {
        println!("Imported {imported} records");
    }
    Ok(())
}
