use super::ui;
use crate::core::config::InstrumentsConfig;
use crate::core::quote::SeriesFetch;
use crate::core::recommendation::TREND_OFFSET;
use crate::core::series::Instrument;
use crate::session::Session;
use anyhow::Result;
use comfy_table::Cell;

pub async fn run(session: &Session) -> Result<()> {
    let pb = ui::new_spinner("Loading market data...");
    let snapshot = session.market_snapshot().await;
    pb.finish_and_clear();

    println!(
        "Market snapshot ({})\n\n{}",
        ui::style_text(&session.config().lookback.to_string(), ui::StyleType::Label),
        render(&snapshot, &session.config().instruments)
    );
    Ok(())
}

/// Percent change between the latest close and the one `TREND_OFFSET`
/// sessions earlier.
fn trend_change(fetch: &SeriesFetch) -> Option<f64> {
    let series = fetch.series()?;
    let latest = series.value_back(0)?;
    let prior = series.value_back(TREND_OFFSET)?;
    (prior != 0.0).then(|| (latest - prior) / prior * 100.0)
}

pub fn render(snapshot: &[(Instrument, SeriesFetch)], instruments: &InstrumentsConfig) -> String {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Instrument"),
        ui::header_cell("Symbol"),
        ui::header_cell("Last close"),
        ui::header_cell("Date"),
        ui::header_cell(&format!("{TREND_OFFSET}-session change")),
        ui::header_cell("Points"),
    ]);

    for (instrument, fetch) in snapshot {
        let symbol = instruments.ticker(*instrument).to_string();
        let row = match fetch.series().and_then(|s| s.latest().map(|p| (s, p))) {
            Some((series, latest)) => vec![
                Cell::new(instrument.name()),
                Cell::new(symbol),
                ui::format_optional_cell(Some(latest.close), ui::format_value),
                Cell::new(latest.timestamp.date_naive().to_string()),
                trend_change(fetch).map_or(ui::na_cell(false), ui::change_cell),
                Cell::new(series.len()),
            ],
            None => vec![
                Cell::new(instrument.name()),
                Cell::new(symbol),
                ui::na_cell(true),
                ui::na_cell(true),
                ui::na_cell(true),
                Cell::new(fetch.unavailable().map_or_else(
                    || "unavailable".to_string(),
                    |reason| ui::style_text(&reason.to_string(), ui::StyleType::Error),
                )),
            ],
        };
        table.add_row(row);
    }
    table.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::quote::DataUnavailable;
    use crate::core::series::PriceSeries;

    #[test]
    fn test_trend_change() {
        let fetch = SeriesFetch::Available(PriceSeries::from_closes(&[
            100.0, 1.0, 1.0, 1.0, 1.0, 110.0,
        ]));
        let change = trend_change(&fetch).unwrap();
        assert!((change - 10.0).abs() < 1e-9);

        let short = SeriesFetch::Available(PriceSeries::from_closes(&[100.0, 110.0]));
        assert_eq!(trend_change(&short), None);
    }

    #[test]
    fn test_render_shows_unavailable_reason() {
        let snapshot = vec![
            (
                Instrument::UsdClp,
                SeriesFetch::Available(PriceSeries::from_closes(&[
                    940.0, 941.0, 942.0, 943.0, 944.0, 951.2,
                ])),
            ),
            (
                Instrument::Copper,
                SeriesFetch::Absent(DataUnavailable::Empty {
                    ticker: "HG=F".to_string(),
                }),
            ),
        ];

        let text = console::strip_ansi_codes(&render(&snapshot, &InstrumentsConfig::default()))
            .to_string();
        assert!(text.contains("CLP=X"));
        assert!(text.contains("951.20"));
        assert!(text.contains("+1.19%"));
        assert!(text.contains("HG=F"));
        assert!(text.contains("no price data"));
    }
}
