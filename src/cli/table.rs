//! Tabular output for lists and grids

use tabled::builder::Builder;
use tabled::settings::Style;

use crate::cli::helpers::escape_csv;
use crate::cli::OutputFormat;

/// Rows of strings under fixed headers
#[derive(Debug, Clone, Default)]
pub struct Listing {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl Listing {
    pub fn new(headers: &[&str]) -> Self {
        Self {
            headers: headers.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    pub fn with_headers(headers: Vec<String>) -> Self {
        Self {
            headers,
            rows: Vec::new(),
        }
    }

    pub fn push(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn len(&self) -> usize {
        self.rows.len()
    }

    /// Render as a table, TSV or CSV; other formats fall back to a table
    pub fn render(&self, format: OutputFormat) -> String {
        match format {
            OutputFormat::Tsv => self.delimited('\t', |s| s.replace('\t', " ")),
            OutputFormat::Csv => self.delimited(',', escape_csv),
            _ => {
                let mut builder = Builder::default();
                builder.push_record(self.headers.iter().cloned());
                for row in &self.rows {
                    builder.push_record(row.iter().cloned());
                }
                let mut table = builder.build();
                table.with(Style::rounded());
                format!("{}\n", table)
            }
        }
    }

    fn delimited(&self, sep: char, escape: impl Fn(&str) -> String) -> String {
        let mut out = String::new();
        for row in std::iter::once(&self.headers).chain(self.rows.iter()) {
            let cells: Vec<String> = row.iter().map(|c| escape(c.as_str())).collect();
            out.push_str(&cells.join(&sep.to_string()));
            out.push('\n');
        }
        out
    }

    pub fn print(&self, format: OutputFormat) {
        print!("{}", self.render(format));
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn listing() -> Listing {
        let mut listing = Listing::new(&["SIZE", "POINT"]);
        listing.push(vec!["M".into(), "Chest, 1/2".into()]);
        listing
    }

    #[test]
    fn test_tsv_and_csv() {
        assert_eq!(listing().render(OutputFormat::Tsv), "SIZE\tPOINT\nM\tChest, 1/2\n");
        assert_eq!(
            listing().render(OutputFormat::Csv),
            "SIZE,POINT\nM,\"Chest, 1/2\"\n"
        );
    }

    #[test]
    fn test_table_contains_cells() {
        let table = listing().render(OutputFormat::Table);
        assert!(table.contains("SIZE"));
        assert!(table.contains("Chest, 1/2"));
        assert_eq!(listing().len(), 1);
    }
}
