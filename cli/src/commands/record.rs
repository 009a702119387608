use anyhow::{Result, bail};
use std::process;

use fitlog_core::models::{
    HealthRecord, NewHealthRecord, WEIGHT_UNIT, normalize_bowel_movements, parse_weight,
};

use super::helpers::{json_error, no_neg_zero, parse_date};
use super::{Service, connect};
use crate::config::Config;

fn print_record(verb: &str, r: &HealthRecord, json: bool) -> Result<()> {
    if json {
        println!("{}", serde_json::to_string_pretty(r)?);
        return Ok(());
    }
    println!(
        "{verb} {}: morning {:.1} {WEIGHT_UNIT}, evening {:.1} {WEIGHT_UNIT} ({:+.1})",
        r.date.format("%Y-%m-%d"),
        r.morning_weight,
        r.evening_weight,
        no_neg_zero(r.daily_swing()),
    );
    if r.has_bm {
        println!("  Bowel movements: {}", r.bm_count);
    } else {
        println!("  Bowel movements: none");
    }
    if let Some(ref n) = r.notes {
        println!("  Notes: {n}");
    }
    println!("  ID: {}", r.id);
    Ok(())
}

fn not_found(id: &str, json: bool) -> ! {
    let msg = format!("No record with ID '{id}'");
    if json {
        println!("{}", json_error(&msg));
    } else {
        eprintln!("{msg}");
    }
    process::exit(2);
}

pub(crate) async fn cmd_add(
    config: &Config,
    morning: &str,
    evening: &str,
    bm: u32,
    date: Option<String>,
    notes: Option<String>,
    json: bool,
) -> Result<()> {
    let date = parse_date(date)?;
    let record = NewHealthRecord::from_form(date, morning, evening, bm > 0, bm, notes)?;

    let mut svc = connect(config).await?;
    let replacing = svc.records().iter().any(|r| r.date == date);
    match svc.create_or_update(record).await? {
        Some(stored) => print_record(if replacing { "Updated" } else { "Logged" }, &stored, json),
        None => bail!("Not signed in"),
    }
}

/// Changes requested by `fitlog edit`. `None` leaves a field as stored.
#[derive(Debug, Default)]
pub(crate) struct RecordEdit {
    pub date: Option<String>,
    pub morning: Option<String>,
    pub evening: Option<String>,
    pub bm: Option<u32>,
    pub notes: Option<String>,
    pub clear_notes: bool,
}

fn apply_edit(mut record: HealthRecord, edit: RecordEdit) -> Result<HealthRecord> {
    if let Some(d) = edit.date {
        record.date = parse_date(Some(d))?;
    }
    if let Some(m) = edit.morning {
        record.morning_weight = parse_weight(&m, "morning")?;
    }
    if let Some(e) = edit.evening {
        record.evening_weight = parse_weight(&e, "evening")?;
    }
    if let Some(count) = edit.bm {
        (record.has_bm, record.bm_count) = normalize_bowel_movements(count > 0, count);
    }
    if edit.clear_notes {
        record.notes = None;
    } else if let Some(n) = edit.notes {
        record.notes = Some(n).filter(|n| !n.trim().is_empty());
    }
    Ok(record)
}

pub(crate) async fn cmd_edit(
    config: &Config,
    id: &str,
    edit: RecordEdit,
    json: bool,
) -> Result<()> {
    let mut svc: Service = connect(config).await?;
    let Some(current) = svc.find(id).cloned() else {
        not_found(id, json);
    };
    let edited = apply_edit(current, edit)?;
    let updated = svc.update(edited).await?;
    print_record("Updated", &updated, json)
}

pub(crate) async fn cmd_delete(config: &Config, id: &str, json: bool) -> Result<()> {
    let mut svc = connect(config).await?;
    let Some(date) = svc.find(id).map(|r| r.date) else {
        not_found(id, json);
    };
    svc.delete(id).await?;

    if json {
        println!("{}", serde_json::json!({ "deleted": id }));
    } else {
        println!("Deleted record {id} ({})", date.format("%Y-%m-%d"));
    }
    Ok(())
}
