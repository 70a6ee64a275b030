use tabled::settings::Style;
use tabled::{Table, Tabled};

/// Borderless table with a column-name row.
pub fn format<T: Tabled>(rows: impl IntoIterator<Item = T>) -> Table {
    let mut table = Table::new(rows);
    table.with(Style::blank());
    table
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Tabled)]
    struct Row {
        #[tabled(rename = "Phone")]
        phone: &'static str,
    }

    #[test]
    fn test_format_lists_rows_under_names() {
        let text = format([Row { phone: "5351234567" }, Row { phone: "5359876543" }]).to_string();
        let lines: Vec<&str> = text.lines().map(str::trim).collect();
        assert_eq!(lines, vec!["Phone", "5351234567", "5359876543"]);
    }
}
