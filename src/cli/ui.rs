use comfy_table::modifiers::UTF8_ROUND_CORNERS;
use comfy_table::presets::UTF8_FULL;
use comfy_table::{Attribute, Cell, CellAlignment, Color, ContentArrangement, Table};
use console::style;
use rust_decimal::Decimal;

/// Defines different styles for text elements.
pub enum StyleType {
    Title,
    TotalLabel,
    TotalValue,
    Error,
    Subtle,
}

/// Applies a consistent style to a string.
pub fn style_text(text: &str, style_type: StyleType) -> String {
    let styled = match style_type {
        StyleType::Title => style(text).bold().underlined(),
        StyleType::TotalLabel => style(text).bold(),
        StyleType::TotalValue => style(text).green().bold(),
        StyleType::Error => style(text).red(),
        StyleType::Subtle => style(text).dim(),
    };
    styled.to_string()
}

/// Creates a new `comfy_table::Table` with standard styling.
pub fn new_styled_table() -> Table {
    let mut table = Table::new();
    table
        .load_preset(UTF8_FULL)
        .apply_modifier(UTF8_ROUND_CORNERS)
        .set_content_arrangement(ContentArrangement::Dynamic);
    table
}

/// Creates a styled header cell for a table.
pub fn header_cell(text: &str) -> Cell {
    Cell::new(text)
        .fg(Color::Cyan)
        .add_attribute(Attribute::Bold)
}

pub fn format_money(value: Decimal) -> String {
    format!("{:.2}", value)
}

/// Right-aligned currency amount.
pub fn money_cell(value: Decimal) -> Cell {
    Cell::new(format_money(value)).set_alignment(CellAlignment::Right)
}

/// Currency amount colored red when negative.
pub fn balance_cell(value: Decimal) -> Cell {
    let color = if value < Decimal::ZERO {
        Color::Red
    } else {
        Color::Green
    };
    money_cell(value).fg(color)
}

/// Labels an installment as paid, overdue, or pending.
pub fn status_cell(paid: bool, overdue: bool, penalty: bool) -> Cell {
    let (text, color) = match (paid, overdue) {
        (true, _) => ("paid", Color::Green),
        (false, true) => ("overdue", Color::Red),
        (false, false) => ("pending", Color::DarkGrey),
    };
    let text = if penalty {
        format!("{text} (penalty)")
    } else {
        text.to_string()
    };
    Cell::new(text).fg(color)
}

/// Prints a separator line matching the terminal width.
pub fn print_separator() {
    let term_width = console::Term::stdout()
        .size_checked()
        .map(|(_, w)| w as usize)
        .unwrap_or(80);
    println!("\n{}", "─".repeat(term_width));
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    #[test]
    fn test_format_money_pads_to_cents() {
        assert_eq!(format_money(dec!(100)), "100.00");
        assert_eq!(format_money(dec!(10549.9)), "10549.90");
        assert_eq!(format_money(dec!(-3.5)), "-3.50");
    }
}
