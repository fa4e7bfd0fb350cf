//! Fixed-payment amortization: monthly payment and full installment schedule.
//!
//! Every currency amount is rounded half-to-even at two fractional digits.
//! The last installment absorbs any rounding residue so the principal parts
//! of a schedule always sum to the original principal exactly.
use crate::core::error::{LedgerError, Result};
use crate::core::model::Installment;
use chrono::{DateTime, Months, Utc};
use rust_decimal::{Decimal, RoundingStrategy};
use rust_decimal_macros::dec;
use serde::{Deserialize, Serialize};
use tracing::debug;

/// Monthly payment together with the schedule it produces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScheduleQuote {
    pub monthly_payment: Decimal,
    pub schedule: Vec<Installment>,
}

impl ScheduleQuote {
    pub fn total_interest(&self) -> Decimal {
        self.schedule.iter().map(|i| i.interest_part).sum()
    }

    pub fn total_paid(&self) -> Decimal {
        self.schedule.iter().map(|i| i.amount).sum()
    }
}

/// Rounds to currency precision using banker's rounding.
pub fn round_currency(value: Decimal) -> Decimal {
    value.round_dp_with_strategy(2, RoundingStrategy::MidpointNearestEven)
}

fn monthly_rate(annual_rate_percent: Decimal) -> Decimal {
    annual_rate_percent / dec!(12) / dec!(100)
}

/// `base^n` by repeated squaring. `None` when an intermediate product overflows.
fn powi(base: Decimal, mut n: u32) -> Option<Decimal> {
    let mut result = Decimal::ONE;
    let mut factor = base;
    while n > 0 {
        if n & 1 == 1 {
            result = result.checked_mul(factor)?;
        }
        n >>= 1;
        if n > 0 {
            factor = factor.checked_mul(factor)?;
        }
    }
    Some(result)
}

/// Like [`compute_monthly_payment`], but `None` when `(1 + r)^n` or the
/// payment itself does not fit in a `Decimal`.
pub fn checked_monthly_payment(
    principal: Decimal,
    annual_rate_percent: Decimal,
    term_months: i32,
) -> Option<Decimal> {
    if term_months <= 0 {
        return Some(Decimal::ZERO);
    }
    let rate = monthly_rate(annual_rate_percent);
    if rate.is_zero() {
        return Some(round_currency(principal / Decimal::from(term_months)));
    }

    let growth = powi(Decimal::ONE + rate, term_months as u32)?;
    let denominator = growth - Decimal::ONE;
    if denominator.is_zero() {
        return Some(Decimal::ZERO);
    }

    let factor = rate.checked_mul(growth)?.checked_div(denominator)?;
    principal.checked_mul(factor).map(round_currency)
}

/// Computes the fixed monthly payment of an annuity loan.
///
/// Returns zero for a non-positive term, and also when the terms are too
/// extreme to represent. A zero rate degrades to straight-line repayment of
/// `principal / term_months`.
pub fn compute_monthly_payment(
    principal: Decimal,
    annual_rate_percent: Decimal,
    term_months: i32,
) -> Decimal {
    checked_monthly_payment(principal, annual_rate_percent, term_months).unwrap_or_else(|| {
        debug!(%principal, %annual_rate_percent, term_months, "Monthly payment overflowed");
        Decimal::ZERO
    })
}

/// Due date `months` calendar months after `start`, clamped to the target month's length.
fn due_date_after(start: DateTime<Utc>, months: u32) -> Option<DateTime<Utc>> {
    start.checked_add_months(Months::new(months))
}

/// Builds the installment schedule for a loan paying `monthly_payment` each month.
///
/// The schedule may be shorter than `term_months` when the principal is paid
/// off early.
pub fn generate_schedule(
    principal: Decimal,
    annual_rate_percent: Decimal,
    term_months: i32,
    start_date: DateTime<Utc>,
    monthly_payment: Decimal,
) -> Vec<Installment> {
    let term = term_months.max(0) as u32;
    let rate = monthly_rate(annual_rate_percent);
    let mut schedule = Vec::with_capacity(term.min(1200) as usize);
    let mut remaining = principal;

    for period in 1..=term {
        let Some(due_date) = due_date_after(start_date, period) else {
            debug!(period, "Due date out of range, truncating schedule");
            break;
        };

        let interest_part = round_currency(remaining * rate);
        let mut principal_part = monthly_payment - interest_part;
        let mut amount = monthly_payment;

        if period == term || remaining - principal_part <= Decimal::ZERO {
            principal_part = remaining;
            amount = round_currency(principal_part + interest_part);
        }

        schedule.push(Installment {
            due_date,
            amount,
            principal_part,
            interest_part,
            paid: false,
            penalty: false,
        });

        remaining -= principal_part;
        if remaining <= Decimal::ZERO {
            break;
        }
    }

    schedule
}

/// Validates the loan terms, then computes the payment and the schedule.
pub fn generate(
    principal: Decimal,
    annual_rate_percent: Decimal,
    term_months: i32,
    start_date: DateTime<Utc>,
) -> Result<ScheduleQuote> {
    if principal <= Decimal::ZERO {
        return Err(LedgerError::InvalidArgument(format!(
            "principal must be positive, got {principal}"
        )));
    }
    if term_months <= 0 {
        return Err(LedgerError::InvalidArgument(format!(
            "term must be a positive number of months, got {term_months}"
        )));
    }
    if annual_rate_percent < Decimal::ZERO {
        return Err(LedgerError::InvalidArgument(format!(
            "annual rate cannot be negative, got {annual_rate_percent}"
        )));
    }

    let monthly_payment = checked_monthly_payment(principal, annual_rate_percent, term_months)
        .ok_or_else(|| {
            LedgerError::InvalidArgument(format!(
                "loan terms out of range: {principal} at {annual_rate_percent}% over {term_months} months"
            ))
        })?;
    let schedule = generate_schedule(
        principal,
        annual_rate_percent,
        term_months,
        start_date,
        monthly_payment,
    );
    debug!(
        %principal,
        %annual_rate_percent,
        term_months,
        %monthly_payment,
        installments = schedule.len(),
        "Generated amortization schedule"
    );

    Ok(ScheduleQuote {
        monthly_payment,
        schedule,
    })
}
