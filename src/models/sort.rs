use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::cmp::Ordering;

use crate::models::row::{coerce_text, Row};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum SortDirection {
    Ascending,
    Descending,
}

/// Active sort column and direction. Both fields are None together
/// (no sort) or Some together.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct SortState {
    pub column: Option<String>,
    pub direction: Option<SortDirection>,
}

impl SortState {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn new(column: &str, direction: SortDirection) -> Self {
        Self {
            column: Some(column.to_string()),
            direction: Some(direction),
        }
    }

    pub fn is_active(&self) -> bool {
        self.column.is_some()
    }

    /// Advances the tri-state cycle for a column activation:
    /// other/none -> asc, asc -> desc, desc -> none.
    pub fn activate(&mut self, column: &str) {
        if self.column.as_deref() == Some(column) {
            match self.direction {
                Some(SortDirection::Ascending) => {
                    self.direction = Some(SortDirection::Descending);
                }
                _ => {
                    self.column = None;
                    self.direction = None;
                }
            }
        } else {
            self.column = Some(column.to_string());
            self.direction = Some(SortDirection::Ascending);
        }
    }
}

/// Compares two cells: numeric when both are numbers, false-before-true
/// when both are booleans, otherwise a case-insensitive string compare of
/// the coerced text (missing/null coerce to "").
pub fn compare_cells(a: Option<&Value>, b: Option<&Value>) -> Ordering {
    if let (Some(Value::Number(x)), Some(Value::Number(y))) = (a, b) {
        let x = x.as_f64().unwrap_or(0.0);
        let y = y.as_f64().unwrap_or(0.0);
        return x.partial_cmp(&y).unwrap_or(Ordering::Equal);
    }
    if let (Some(Value::Bool(x)), Some(Value::Bool(y))) = (a, b) {
        return x.cmp(y);
    }
    coerce_text(a).to_lowercase().cmp(&coerce_text(b).to_lowercase())
}

/// Sorts a filtered index vector by the sort state. Rows comparing equal
/// keep their relative order (`sort_by` is stable). No-op when inactive.
pub fn sort_view(view: &mut [usize], rows: &[Row], state: &SortState) {
    let (column, direction) = match (&state.column, state.direction) {
        (Some(c), Some(d)) => (c.as_str(), d),
        _ => return,
    };
    view.sort_by(|&a, &b| {
        let ord = compare_cells(rows[a].get(column), rows[b].get(column));
        match direction {
            SortDirection::Ascending => ord,
            SortDirection::Descending => ord.reverse(),
        }
    });
}
