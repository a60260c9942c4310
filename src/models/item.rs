//! Item records.

use serde::{Deserialize, Serialize};

use crate::error::{AppError, Result};
use crate::models::{Record, Validate};

/// An item as returned to callers.
pub type Item = Record<ItemFields>;

/// Stored item fields.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ItemFields {
    pub name: String,

    #[serde(default)]
    pub description: Option<String>,

    pub price: f64,

    #[serde(default = "default_in_stock")]
    pub in_stock: bool,
}

fn default_in_stock() -> bool {
    true
}

/// Partial item update; only `Some` fields are written.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ItemPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub price: Option<f64>,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<bool>,
}

fn check_name(name: &str) -> Result<()> {
    if name.trim().is_empty() {
        return Err(AppError::validation("item name must not be empty"));
    }
    Ok(())
}

fn check_price(price: f64) -> Result<()> {
    if !price.is_finite() || price < 0.0 {
        return Err(AppError::validation(format!(
            "item price must be a non-negative number, got {price}"
        )));
    }
    Ok(())
}

impl Validate for ItemFields {
    fn validate(&self) -> Result<()> {
        check_name(&self.name)?;
        check_price(self.price)
    }
}

impl Validate for ItemPatch {
    fn validate(&self) -> Result<()> {
        if let Some(name) = &self.name {
            check_name(name)?;
        }
        if let Some(price) = self.price {
            check_price(price)?;
        }
        Ok(())
    }
}
