use super::ui;
use crate::amortization::{self, ScheduleQuote};
use crate::core::model::{Installment, Loan};
use crate::core::store::LedgerStore;
use crate::origination::{LoanApplication, LoanOriginator};
use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use comfy_table::{Cell, CellAlignment, Table};
use rust_decimal::Decimal;
use tracing::info;

/// Renders installments in schedule order, numbered from 1.
pub fn schedule_table(schedule: &[Installment], now: DateTime<Utc>) -> Table {
    let mut table = ui::new_styled_table();
    table.set_header(vec![
        ui::header_cell("#"),
        ui::header_cell("Due"),
        ui::header_cell("Amount"),
        ui::header_cell("Principal"),
        ui::header_cell("Interest"),
        ui::header_cell("Status"),
    ]);

    for (i, installment) in schedule.iter().enumerate() {
        table.add_row(vec![
            Cell::new(i + 1).set_alignment(CellAlignment::Right),
            Cell::new(installment.due_date.format("%Y-%m-%d")),
            ui::money_cell(installment.amount),
            ui::money_cell(installment.principal_part),
            ui::money_cell(installment.interest_part),
            ui::status_cell(
                installment.paid,
                installment.is_overdue(now),
                installment.is_penalty(),
            ),
        ]);
    }
    table
}

fn print_totals(label: &str, value: Decimal) {
    println!(
        "{} {}",
        ui::style_text(label, ui::StyleType::TotalLabel),
        ui::style_text(&ui::format_money(value), ui::StyleType::TotalValue)
    );
}

/// Prints a schedule preview without touching the ledger.
pub fn quote(
    principal: Decimal,
    annual_rate_percent: Decimal,
    term_months: i32,
    start_date: DateTime<Utc>,
) -> Result<ScheduleQuote> {
    let quote = amortization::generate(principal, annual_rate_percent, term_months, start_date)
        .context("Failed to generate schedule")?;

    println!(
        "\n{}",
        ui::style_text(
            &format!("{principal} at {annual_rate_percent}% over {term_months} months"),
            ui::StyleType::Title
        )
    );
    println!("{}", schedule_table(&quote.schedule, start_date));
    print_totals("Monthly payment:", quote.monthly_payment);
    print_totals("Total interest:", quote.total_interest());
    print_totals("Total paid:", quote.total_paid());
    Ok(quote)
}

pub async fn apply(originator: &LoanOriginator, application: &LoanApplication) -> Result<Loan> {
    info!(account_id = %application.account_id, amount = %application.amount, "Applying for loan");
    let loan = originator
        .originate(application)
        .await
        .context("Loan application failed")?;

    println!(
        "\n{} {}",
        ui::style_text("Approved loan", ui::StyleType::Title),
        ui::style_text(&loan.id, ui::StyleType::Subtle)
    );
    println!("Rate: {}%", loan.annual_rate_percent);
    println!("{}", schedule_table(&loan.schedule, loan.start_date));
    Ok(loan)
}

pub async fn show_schedule(
    store: &dyn LedgerStore,
    loan_id: &str,
    now: DateTime<Utc>,
) -> Result<Loan> {
    let loan = store
        .get_loan(loan_id)
        .await
        .with_context(|| format!("Failed to load loan {loan_id}"))?;

    println!(
        "\n{} {}",
        ui::style_text("Loan", ui::StyleType::Title),
        ui::style_text(&loan.id, ui::StyleType::Subtle)
    );
    println!("{}", schedule_table(&loan.schedule, now));
    print_totals("Remaining principal:", loan.remaining_principal);
    print_totals("Outstanding:", loan.outstanding_amount());
    Ok(loan)
}
