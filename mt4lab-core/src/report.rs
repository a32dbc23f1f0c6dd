//! Metric extraction from the tester's HTML reports.
//!
//! The tester writes a loosely structured HTML report per run; its layout is
//! not under our control. Lookups are label-based and never fail upward: a
//! missing label, an empty document, or mangled markup all degrade to the
//! [`NOT_AVAILABLE`] sentinel (or an empty map for table extraction).

use scraper::{ElementRef, Html, Selector};

/// Sentinel returned when a labelled value cannot be found.
pub const NOT_AVAILABLE: &str = "N/A";

/// Labels of the metric cells consumed by the summary file.
pub const LABEL_NET_PROFIT: &str = "Total net profit";
pub const LABEL_MAX_DRAWDOWN: &str = "Maximal drawdown";
pub const LABEL_TOTAL_TRADES: &str = "Total trades";
pub const LABEL_PROFIT_FACTOR: &str = "Profit factor";

/// A parsed report, ready for label lookups.
pub struct Report {
    doc: Html,
}

impl Report {
    /// Parse report markup. Parsing is lenient and cannot fail; a garbage
    /// document simply yields no lookups.
    pub fn parse(html: &str) -> Self {
        Self {
            doc: Html::parse_document(html),
        }
    }

    /// Text of the cell structurally following the first cell whose text
    /// contains `label`, or [`NOT_AVAILABLE`].
    pub fn value_for(&self, label: &str) -> String {
        self.find_adjacent(label)
            .unwrap_or_else(|| NOT_AVAILABLE.to_string())
    }

    pub fn net_profit(&self) -> String {
        self.value_for(LABEL_NET_PROFIT)
    }

    pub fn maximal_drawdown(&self) -> String {
        self.value_for(LABEL_MAX_DRAWDOWN)
    }

    pub fn total_trades(&self) -> String {
        self.value_for(LABEL_TOTAL_TRADES)
    }

    pub fn profit_factor(&self) -> String {
        self.value_for(LABEL_PROFIT_FACTOR)
    }

    fn find_adjacent(&self, label: &str) -> Option<String> {
        let td = selector("td");
        for cell in self.doc.select(&td) {
            if !cell_text(&cell).contains(label) {
                continue;
            }
            let next = cell
                .next_siblings()
                .filter_map(ElementRef::wrap)
                .find(|e| e.value().name() == "td");
            if let Some(next) = next {
                return Some(cell_text(&next));
            }
            // A matching cell with no following sibling; keep scanning.
        }
        None
    }

    /// Ordered name/value pairs from the body rows of the table whose header
    /// cell reads `Inputs`. Empty when the table is absent or malformed.
    ///
    /// Used to turn an ad hoc optimization report back into trial
    /// parameters.
    pub fn input_parameters(&self) -> Vec<(String, String)> {
        let table_sel = selector("table");
        let th_sel = selector("th");
        let tr_sel = selector("tr");
        let td_sel = selector("td");

        let mut pairs = Vec::new();
        for table in self.doc.select(&table_sel) {
            if !table.select(&th_sel).any(|th| cell_text(&th) == "Inputs") {
                continue;
            }
            for row in table.select(&tr_sel) {
                let cells: Vec<ElementRef> = row.select(&td_sel).collect();
                if cells.len() >= 2 {
                    pairs.push((cell_text(&cells[0]), cell_text(&cells[1])));
                }
            }
            break;
        }
        pairs
    }
}

fn selector(css: &str) -> Selector {
    Selector::parse(css).expect("static selector")
}

fn cell_text(cell: &ElementRef) -> String {
    cell.text().collect::<String>().trim().to_string()
}
