// src/reconcile.rs

use crate::invoice::NotReceivedRow;

pub const CAUGHT_UP: &str = "All caught up!";

/// Rows whose part number contains `query`, ignoring case.
/// An empty query keeps every row; a row without a part number matches
/// only the empty query.
pub fn filter<'a>(rows: &'a [NotReceivedRow], query: &str) -> Vec<&'a NotReceivedRow> {
    if query.is_empty() {
        return rows.iter().collect();
    }
    let needle = query.to_lowercase();
    rows.iter()
        .filter(|row| {
            row.part_number
                .as_deref()
                .is_some_and(|part| part.to_lowercase().contains(&needle))
        })
        .collect()
}

/// The filtered not-received list as shown to the user.
#[derive(Debug, Clone, PartialEq)]
pub struct ReconciliationReport<'a> {
    pub query: String,
    pub rows: Vec<&'a NotReceivedRow>,
}

impl<'a> ReconciliationReport<'a> {
    pub fn build(rows: &'a [NotReceivedRow], query: &str) -> Self {
        Self {
            query: query.to_string(),
            rows: filter(rows, query),
        }
    }

    pub fn is_caught_up(&self) -> bool {
        self.rows.is_empty()
    }
}
