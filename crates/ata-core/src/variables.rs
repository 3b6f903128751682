//! Decision-variable indexing.
//!
//! [`VariableSpace`] is the only place where (item, form) pairs are turned
//! into solver columns. Constraint construction, LP export and result
//! extraction all go through it.
//!
//! Columns are zero-based: item `i` of form `f` lives at
//! `num_items * f + i`, and the deviation variable is the last column,
//! `num_items * num_forms`.

use serde::{Deserialize, Serialize};

use crate::error::{AssemblyError, Result};
use crate::model::ItemPool;

/// Name of the deviation column in exported models.
pub const DEVIATION_NAME: &str = "delta";

/// Semantic identity of a column.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Column {
    /// Indicator that item `item` is assigned to form `form`.
    ItemForm { item: usize, form: usize },
    /// The shared worst-case information deviation.
    Deviation,
}

/// Type and bounds of a column.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum VariableDomain {
    Binary,
    Continuous { lower: f64, upper: Option<f64> },
}

impl VariableDomain {
    pub fn is_integer(&self) -> bool {
        matches!(self, VariableDomain::Binary)
    }
}

/// Bijection between (item, form) pairs plus the deviation variable and
/// flat column indices.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct VariableSpace {
    num_items: usize,
    num_forms: usize,
    deviation_upper: Option<f64>,
}

impl VariableSpace {
    pub fn new(num_items: usize, num_forms: usize) -> Self {
        Self {
            num_items,
            num_forms,
            deviation_upper: Some(1.0),
        }
    }

    /// Set the deviation upper bound, `None` for unbounded.
    pub fn with_deviation_bound(mut self, upper: Option<f64>) -> Self {
        self.deviation_upper = upper;
        self
    }

    pub fn num_items(&self) -> usize {
        self.num_items
    }

    pub fn num_forms(&self) -> usize {
        self.num_forms
    }

    /// Column of "item `item` in form `form`".
    pub fn item_form_index(&self, item: usize, form: usize) -> Result<usize> {
        if item >= self.num_items || form >= self.num_forms {
            return Err(AssemblyError::Model(format!(
                "item {item} / form {form} outside a space of {} items x {} forms",
                self.num_items, self.num_forms
            )));
        }
        Ok(self.num_items * form + item)
    }

    pub fn deviation_index(&self) -> usize {
        self.num_items * self.num_forms
    }

    pub fn variable_count(&self) -> usize {
        self.num_items * self.num_forms + 1
    }

    /// Inverse of [`item_form_index`](Self::item_form_index) and
    /// [`deviation_index`](Self::deviation_index).
    pub fn decode(&self, column: usize) -> Option<Column> {
        if column == self.deviation_index() {
            return Some(Column::Deviation);
        }
        if column > self.deviation_index() || self.num_items == 0 {
            return None;
        }
        Some(Column::ItemForm {
            item: column % self.num_items,
            form: column / self.num_items,
        })
    }

    pub fn domain(&self, column: usize) -> Option<VariableDomain> {
        match self.decode(column)? {
            Column::ItemForm { .. } => Some(VariableDomain::Binary),
            Column::Deviation => Some(VariableDomain::Continuous {
                lower: 0.0,
                upper: self.deviation_upper,
            }),
        }
    }

    /// All item columns of one form, in item order.
    pub fn form_columns(&self, form: usize) -> Result<Vec<usize>> {
        (0..self.num_items)
            .map(|item| self.item_form_index(item, form))
            .collect()
    }

    /// All form columns of one item, in form order.
    pub fn item_columns(&self, item: usize) -> Result<Vec<usize>> {
        (0..self.num_forms)
            .map(|form| self.item_form_index(item, form))
            .collect()
    }

    /// Stable column name for exported models: `<item_id>_<form>` with a
    /// 1-based form number, and [`DEVIATION_NAME`] for the deviation.
    pub fn column_name(&self, column: usize, pool: &ItemPool) -> Option<String> {
        match self.decode(column)? {
            Column::Deviation => Some(DEVIATION_NAME.to_string()),
            Column::ItemForm { item, form } => {
                let id = pool.get(item)?.id.as_str();
                Some(format!("{}_{}", sanitize(id), form + 1))
            }
        }
    }
}

/// Make an item id usable as an LP identifier.
fn sanitize(id: &str) -> String {
    let mut name: String = id
        .chars()
        .map(|c| if c.is_ascii_alphanumeric() || c == '_' { c } else { '_' })
        .collect();
    if !name.starts_with(|c: char| c.is_ascii_alphabetic() || c == '_') {
        name.insert_str(0, "x");
    }
    name
}
