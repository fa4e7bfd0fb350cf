use super::ui;
use crate::core::model::BalanceForecast;
use crate::forecast::BalanceProjector;
use anyhow::{Context, Result};
use comfy_table::{Cell, Table};
use rust_decimal::Decimal;

pub fn forecast_table(forecast: &BalanceForecast) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![ui::header_cell("Date"), ui::header_cell("Balance")]);
    for point in &forecast.points {
        table.add_row(vec![
            Cell::new(point.date.format("%Y-%m-%d")),
            ui::balance_cell(point.balance),
        ]);
    }
    table
}

pub async fn run(
    projector: &BalanceProjector,
    account_id: &str,
    horizon_days: Option<i64>,
) -> Result<BalanceForecast> {
    let forecast = projector
        .project_balance(account_id, horizon_days)
        .await
        .with_context(|| format!("Failed to forecast account {account_id}"))?;

    println!(
        "\n{}",
        ui::style_text(
            &format!("Account {} over {} days", forecast.account_id, forecast.horizon_days),
            ui::StyleType::Title
        )
    );
    println!(
        "Current balance: {}  {}",
        ui::format_money(forecast.current_balance),
        ui::style_text(
            &format!(
                "(avg daily in {} / out {})",
                ui::format_money(forecast.avg_daily_inflow),
                ui::format_money(forecast.avg_daily_outflow)
            ),
            ui::StyleType::Subtle
        )
    );
    println!("{}", forecast_table(&forecast));

    if let Some(lowest) = forecast.points.iter().min_by_key(|p| p.balance) {
        let style_type = if lowest.balance < Decimal::ZERO {
            ui::StyleType::Error
        } else {
            ui::StyleType::TotalValue
        };
        println!(
            "{} {} on {}",
            ui::style_text("Lowest balance:", ui::StyleType::TotalLabel),
            ui::style_text(&ui::format_money(lowest.balance), style_type),
            lowest.date.format("%Y-%m-%d")
        );
    }
    Ok(forecast)
}
