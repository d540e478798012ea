use super::ui;
use crate::core::history::{FundHistoryRecord, ManualEntry, MergeSummary};
use crate::core::recommendation::FundTier;
use crate::session::Session;
use anyhow::Result;
use comfy_table::Cell;
use std::path::Path;

pub async fn import(session: &Session, path: &Path) -> Result<()> {
    let report = session.import_upload(path).await?;
    println!(
        "Imported {} rows from {} (stamped {}).\n{}",
        report.rows,
        path.display(),
        ui::style_text(&format!("Fondo {}", report.label), ui::StyleType::Label),
        summary_line(&report.summary)
    );
    Ok(())
}

pub async fn record(session: &Session, entry: ManualEntry) -> Result<()> {
    let date = entry.date;
    let summary = session.record(entry).await?;
    println!("Recorded {date}.\n{}", summary_line(&summary));
    Ok(())
}

pub fn show(session: &Session, last: Option<usize>) -> Result<()> {
    let records = session.history()?;
    if records.is_empty() {
        println!("No fund history stored yet. Import an export or record a day first.");
        return Ok(());
    }

    let start = last.map_or(0, |n| records.len().saturating_sub(n));
    println!(
        "Fund history ({} of {} days)\n\n{}",
        records.len() - start,
        records.len(),
        render(&records[start..])
    );
    Ok(())
}

pub fn reset(session: &Session, confirmed: bool) -> Result<()> {
    if !confirmed {
        anyhow::bail!(
            "Refusing to delete {} without --yes",
            session.store().path().display()
        );
    }
    if session.reset_history()? {
        println!("Deleted {}", session.store().path().display());
    } else {
        println!("No fund history to delete.");
    }
    Ok(())
}

fn summary_line(summary: &MergeSummary) -> String {
    ui::style_text(
        &format!(
            "{} added, {} replaced, {} days stored",
            summary.added, summary.replaced, summary.total
        ),
        ui::StyleType::Subtle,
    )
}

pub fn render(records: &[FundHistoryRecord]) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Date"),
        ui::header_cell("Fondo C"),
        ui::header_cell("Fondo D"),
        ui::header_cell("Fondo E"),
        ui::header_cell("Position"),
        ui::header_cell("Recommended"),
    ]);

    let tier = |t: Option<FundTier>| t.map_or_else(String::new, |t| t.to_string());
    for record in records {
        let mut row = vec![Cell::new(record.date)];
        row.extend(
            FundTier::ALL
                .iter()
                .map(|&fund| ui::format_optional_cell(record.unit_value(fund), ui::format_value)),
        );
        row.push(Cell::new(tier(record.position)));
        row.push(Cell::new(tier(record.recommendation)));
        table.add_row(row);
    }
    table.to_string()
}
