use super::ui;
use crate::settlement::{CycleReport, InstallmentOutcome, SettlementScheduler};
use anyhow::{Context, Result, anyhow};
use comfy_table::{Cell, Color, Table};
use std::sync::Arc;
use tracing::{error, info};

pub fn report_table(report: &CycleReport) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("Loan"),
        ui::header_cell("Installment"),
        ui::header_cell("Outcome"),
        ui::header_cell("Amount"),
    ]);

    for outcome in &report.outcomes {
        let row = match outcome {
            InstallmentOutcome::Settled {
                loan_id,
                index,
                amount,
                transaction_recorded,
            } => {
                let label = if *transaction_recorded {
                    "settled"
                } else {
                    "settled (unrecorded)"
                };
                vec![
                    Cell::new(loan_id),
                    Cell::new(index + 1),
                    Cell::new(label).fg(Color::Green),
                    ui::money_cell(*amount),
                ]
            }
            InstallmentOutcome::Penalized {
                loan_id,
                index,
                penalty,
            } => vec![
                Cell::new(loan_id),
                Cell::new(index + 1),
                Cell::new("penalized").fg(Color::Red),
                ui::money_cell(*penalty),
            ],
            InstallmentOutcome::AccountMissing {
                loan_id,
                index,
                account_id,
            } => vec![
                Cell::new(loan_id),
                Cell::new(index + 1),
                Cell::new(format!("skipped: account {account_id} missing")).fg(Color::DarkGrey),
                Cell::new("N/A").fg(Color::DarkGrey),
            ],
            InstallmentOutcome::DebitFailed {
                loan_id,
                index,
                reason,
            } => vec![
                Cell::new(loan_id),
                Cell::new(index + 1),
                Cell::new(format!("skipped: {reason}")).fg(Color::DarkGrey),
                Cell::new("N/A").fg(Color::DarkGrey),
            ],
        };
        table.add_row(row);
    }
    table
}

/// Runs a single settlement cycle and prints its outcomes.
pub async fn settle_once(scheduler: &SettlementScheduler) -> Result<CycleReport> {
    let report = scheduler
        .run_cycle()
        .await
        .ok_or_else(|| anyhow!("A settlement cycle is already running"))?;

    if let Some(e) = &report.load_error {
        println!("{}", ui::style_text(&format!("Could not load loans: {e}"), ui::StyleType::Error));
        return Ok(report);
    }

    println!(
        "\n{}",
        ui::style_text(
            &format!("Settlement cycle at {}", report.started_at.format("%Y-%m-%d %H:%M UTC")),
            ui::StyleType::Title
        )
    );
    if report.outcomes.is_empty() {
        println!("{}", ui::style_text("No overdue installments.", ui::StyleType::Subtle));
    } else {
        println!("{}", report_table(&report));
    }
    println!(
        "{} {}",
        ui::style_text("Collected:", ui::StyleType::TotalLabel),
        ui::style_text(&ui::format_money(report.collected()), ui::StyleType::TotalValue)
    );
    for (loan_id, reason) in &report.save_failures {
        println!(
            "{}",
            ui::style_text(&format!("Loan {loan_id} not saved: {reason}"), ui::StyleType::Error)
        );
    }
    Ok(report)
}

/// Drives the periodic scheduler until Ctrl-C. A cycle in progress at that
/// point is allowed to finish.
pub async fn serve(scheduler: Arc<SettlementScheduler>) -> Result<()> {
    let shutdown = async {
        match tokio::signal::ctrl_c().await {
            Ok(()) => info!("Shutting down payment scheduler"),
            Err(e) => error!(error = %e, "Failed to listen for shutdown signal, stopping"),
        }
    };
    scheduler
        .run_until(shutdown)
        .await
        .context("Payment scheduler failed")
}
