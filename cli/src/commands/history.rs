use anyhow::Result;

use fitlog_core::history::HistoryFilter;

use super::connect;
use super::helpers::{parse_optional_date, print_records_table};
use crate::config::Config;

pub(crate) async fn cmd_history(
    config: &Config,
    from: Option<String>,
    to: Option<String>,
    page: usize,
    per_page: usize,
    json: bool,
) -> Result<()> {
    let filter = HistoryFilter {
        start: parse_optional_date(from)?,
        end: parse_optional_date(to)?,
    };
    let svc = connect(config).await?;
    let page = svc.history(&filter, page, per_page);

    if json {
        println!("{}", serde_json::to_string_pretty(&page)?);
    } else if page.records.is_empty() {
        if svc.records().is_empty() {
            eprintln!("No records yet. Use `fitlog add` to log today's weight.");
        } else {
            eprintln!("No records in the selected date range.");
        }
    } else {
        print_records_table(&page.records);
        println!(
            "Page {}/{} ({} records)",
            page.page, page.total_pages, page.total_records
        );
    }

    Ok(())
}
