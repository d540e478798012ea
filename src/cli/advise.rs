use super::ui;
use crate::core::recommendation::{Recommendation, Severity};
use crate::session::Session;
use anyhow::Result;

pub async fn run(session: &Session, notify: bool) -> Result<()> {
    let pb = ui::new_spinner("Loading USD/CLP and S&P 500...");
    let recommendation = session.recommendation().await;
    pb.finish_and_clear();

    println!("{}", render(&recommendation));

    if notify {
        if recommendation.severity != Severity::Alert {
            println!(
                "{}",
                ui::style_text("No alert to send.", ui::StyleType::Subtle)
            );
        } else if session.send_alert(&recommendation).await {
            println!("Alert email sent.");
        } else {
            println!(
                "{}",
                ui::style_text(
                    "Alert email could not be delivered, see the log for details.",
                    ui::StyleType::Error
                )
            );
        }
    }
    Ok(())
}

pub fn render(recommendation: &Recommendation) -> String {
    let style = ui::severity_style(recommendation.severity);
    format!(
        "{}\n\n{}  {}\n{}  {}\n{}  {}",
        ui::style_text("PensionGuard Pro", ui::StyleType::Title),
        ui::style_text("Recommendation:", ui::StyleType::Label),
        ui::style_text(&recommendation.headline(), style),
        ui::style_text("Severity:", ui::StyleType::Label),
        recommendation.severity,
        ui::style_text("Reason:", ui::StyleType::Label),
        recommendation.rationale,
    )
}
