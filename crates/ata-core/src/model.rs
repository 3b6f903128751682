//! Core data model types for ata.
//!
//! An [`ItemPool`] is the immutable item bank. The position of an item in the
//! pool is meaningful: it is the item offset used by the variable space.

use std::collections::{BTreeMap, BTreeSet, HashSet};

use serde::{Deserialize, Serialize};

use crate::error::{AssemblyError, Result};

/// A scored test question with 3PL response-model parameters.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Item {
    /// Unique item identifier.
    #[serde(alias = "item_id")]
    pub id: String,
    /// Discrimination.
    pub a: f64,
    /// Difficulty.
    pub b: f64,
    /// Pseudo-guessing lower asymptote.
    pub c: f64,
    /// Content category label, starting at 1.
    pub category: u32,
    /// Further classification columns (difficulty band, item format, ...)
    /// that attribute constraints can select on.
    #[serde(default, skip_serializing_if = "BTreeMap::is_empty")]
    pub attributes: BTreeMap<String, String>,
}

impl Item {
    pub fn new(id: impl Into<String>, a: f64, b: f64, c: f64, category: u32) -> Self {
        Self {
            id: id.into(),
            a,
            b,
            c,
            category,
            attributes: BTreeMap::new(),
        }
    }

    pub fn with_attribute(mut self, column: impl Into<String>, value: impl Into<String>) -> Self {
        self.attributes.insert(column.into(), value.into());
        self
    }

    /// Value of a classification column. `category` is always available.
    pub fn attribute(&self, column: &str) -> Option<String> {
        match column {
            "category" => Some(self.category.to_string()),
            _ => self.attributes.get(column).cloned(),
        }
    }

    /// Check the response-model parameters.
    ///
    /// Requires `a > 0`, finite `b`, and `0 <= c < 1`.
    pub fn validate(&self) -> Result<()> {
        if !self.a.is_finite() || self.a <= 0.0 {
            return Err(AssemblyError::Parameter(format!(
                "item {}: discrimination a must be positive, got {}",
                self.id, self.a
            )));
        }
        if !self.b.is_finite() {
            return Err(AssemblyError::Parameter(format!(
                "item {}: difficulty b must be finite, got {}",
                self.id, self.b
            )));
        }
        if !(0.0..1.0).contains(&self.c) {
            return Err(AssemblyError::Parameter(format!(
                "item {}: guessing c must be in [0, 1), got {}",
                self.id, self.c
            )));
        }
        Ok(())
    }
}

/// A single point on the ability scale with its information target.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct AbilityLevel {
    pub theta: f64,
    pub target: f64,
}

/// The ordered, validated item bank.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct ItemPool {
    items: Vec<Item>,
    num_categories: usize,
}

impl ItemPool {
    /// Build a pool, enforcing the pool invariants.
    ///
    /// Fails with a data error when the pool is empty, ids repeat, or the
    /// category labels are not exactly `1..=K`. Fails with a parameter error
    /// when any item has invalid response-model parameters.
    pub fn new(items: Vec<Item>) -> Result<Self> {
        if items.is_empty() {
            return Err(AssemblyError::Data("item pool is empty".into()));
        }

        let mut seen = HashSet::new();
        for item in &items {
            if item.id.trim().is_empty() {
                return Err(AssemblyError::Data("item with empty id".into()));
            }
            if !seen.insert(item.id.as_str()) {
                return Err(AssemblyError::Data(format!("duplicate item id: {}", item.id)));
            }
            item.validate()?;
        }

        let labels: BTreeSet<u32> = items.iter().map(|i| i.category).collect();
        if labels.contains(&0) {
            return Err(AssemblyError::Data(
                "category labels must be positive integers".into(),
            ));
        }
        let num_categories = labels.len();
        // Labels are positive and distinct, so 1..=K holds iff the largest is K.
        let max_label = labels.iter().next_back().copied().unwrap_or(0) as usize;
        if max_label != num_categories {
            let missing: Vec<String> = (1..=max_label as u32)
                .filter(|l| !labels.contains(l))
                .map(|l| l.to_string())
                .collect();
            return Err(AssemblyError::Data(format!(
                "category labels must form the range 1..={max_label}; missing {}",
                missing.join(", ")
            )));
        }

        Ok(Self {
            items,
            num_categories,
        })
    }

    pub fn items(&self) -> &[Item] {
        &self.items
    }

    pub fn get(&self, index: usize) -> Option<&Item> {
        self.items.get(index)
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn num_categories(&self) -> usize {
        self.num_categories
    }

    /// Positions of the items in `category` (1-based label), in pool order.
    pub fn category_members(&self, category: u32) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| item.category == category)
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Whether any item carries `column`.
    pub fn has_attribute(&self, column: &str) -> bool {
        self.items.iter().any(|item| item.attribute(column).is_some())
    }

    /// Positions of the items whose `columns` take exactly `values`, in pool
    /// order. Items missing any of the columns never match.
    pub fn attribute_members(&self, columns: &[String], values: &[&str]) -> Vec<usize> {
        self.items
            .iter()
            .enumerate()
            .filter(|(_, item)| {
                columns.len() == values.len()
                    && columns
                        .iter()
                        .zip(values)
                        .all(|(col, want)| item.attribute(col).as_deref() == Some(*want))
            })
            .map(|(idx, _)| idx)
            .collect()
    }

    /// Number of items per category, indexed by `label - 1`.
    pub fn category_sizes(&self) -> Vec<usize> {
        let mut sizes = vec![0; self.num_categories];
        for item in &self.items {
            sizes[item.category as usize - 1] += 1;
        }
        sizes
    }
}

impl<'de> Deserialize<'de> for ItemPool {
    fn deserialize<D>(deserializer: D) -> std::result::Result<Self, D::Error>
    where
        D: serde::Deserializer<'de>,
    {
        #[derive(Deserialize)]
        struct Raw {
            items: Vec<Item>,
        }
        let raw = Raw::deserialize(deserializer)?;
        ItemPool::new(raw.items).map_err(serde::de::Error::custom)
    }
}
