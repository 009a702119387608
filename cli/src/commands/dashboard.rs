use anyhow::Result;
use tabled::{
    Table, Tabled,
    settings::{Alignment, Modify, Style, object::Columns},
};

use fitlog_core::aggregate::Dashboard;
use fitlog_core::models::WEIGHT_UNIT;

use super::connect;
use super::helpers::no_neg_zero;
use crate::config::Config;

pub(crate) async fn cmd_dashboard(config: &Config, json: bool) -> Result<()> {
    let svc = connect(config).await?;
    let dash = svc.dashboard();

    if json {
        println!("{}", serde_json::to_string_pretty(&dash)?);
    } else if dash.total_records == 0 {
        eprintln!("No records yet. Use `fitlog add` to log today's weight.");
    } else {
        print_dashboard(&dash);
    }

    Ok(())
}

fn print_dashboard(dash: &Dashboard) {
    #[derive(Tabled)]
    struct TrendRow {
        #[tabled(rename = "Date")]
        date: String,
        #[tabled(rename = "Morning")]
        morning: String,
        #[tabled(rename = "Evening")]
        evening: String,
    }

    let s = &dash.summary;
    println!("=== Last {} days ===\n", s.total_days);
    println!("  Avg morning:   {:.1} {WEIGHT_UNIT}", s.avg_morning);
    println!("  Avg evening:   {:.1} {WEIGHT_UNIT}", s.avg_evening);
    println!(
        "  Avg swing:     {:+.1} {WEIGHT_UNIT}",
        no_neg_zero(s.evening_minus_morning_avg)
    );
    println!(
        "  BM rate:       {}% ({}/{} days)",
        s.bm_rate, s.bm_days, s.total_days
    );
    println!();

    let rows: Vec<TrendRow> = dash
        .series
        .iter()
        .map(|p| TrendRow {
            date: p.date.format("%m-%d").to_string(),
            morning: format!("{:.1}", p.morning),
            evening: format!("{:.1}", p.evening),
        })
        .collect();

    let table = Table::new(&rows)
        .with(Style::rounded())
        .with(Modify::new(Columns::new(1..3)).with(Alignment::right()))
        .to_string();
    println!("{table}");

    let split = dash.bm_split;
    println!(
        "\n  All time: {} days with BM, {} without ({} records)",
        split.with_bm, split.without_bm, dash.total_records
    );
}
