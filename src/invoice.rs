// src/invoice.rs

use serde::{Deserialize, Deserializer, Serialize};

/// Reads an explicit `null` the same way as a missing field.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

/// A monetary field as the extraction service reports it.
///
/// Most records carry plain numbers, but partially parsed documents can
/// leave free text (e.g. `"see attached"`) in an amount column, so both
/// shapes decode.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum MoneyValue {
    Number(f64),
    Text(String),
}

impl MoneyValue {
    /// Numeric reading of the value, if it has one.
    pub fn as_number(&self) -> Option<f64> {
        match self {
            MoneyValue::Number(n) if n.is_finite() => Some(*n),
            MoneyValue::Number(_) => None,
            MoneyValue::Text(s) => s.trim().parse::<f64>().ok().filter(|n| n.is_finite()),
        }
    }
}

impl From<f64> for MoneyValue {
    fn from(n: f64) -> Self {
        MoneyValue::Number(n)
    }
}

impl From<&str> for MoneyValue {
    fn from(s: &str) -> Self {
        MoneyValue::Text(s.to_string())
    }
}

/// A single billed row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LineItem {
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub part_number: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub quantity: Option<f64>,
    #[serde(default)]
    pub uom: Option<String>,
    #[serde(default)]
    pub unit_cost: Option<MoneyValue>,
    #[serde(default)]
    pub extended_cost: Option<MoneyValue>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub received: bool,
}

/// A posting of part of the invoice amount to a GL account.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Allocation {
    #[serde(default)]
    pub account_code: Option<String>,
    #[serde(default)]
    pub amount: Option<MoneyValue>,
    #[serde(default)]
    pub memo: Option<String>,
}

/// Miscellaneous charge (fuel surcharge, handling, ...).
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Charge {
    #[serde(default, rename = "type")]
    pub kind: Option<String>,
    #[serde(default)]
    pub amount: Option<f64>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Page {
    #[serde(default)]
    pub page_number: Option<i64>,
    #[serde(default)]
    pub text_content: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub is_summary: bool,
}

/// A structured record extracted from one source document.
///
/// Immutable once fetched. `lines`, `allocations`, `charges` and `pages`
/// keep the order the service returned them in.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Invoice {
    pub id: i64,
    #[serde(default)]
    pub invoice_number: Option<String>,
    #[serde(default)]
    pub vendor_name: Option<String>,
    #[serde(default)]
    pub customer_name: Option<String>,
    #[serde(default)]
    pub order_number: Option<String>,
    #[serde(default)]
    pub invoice_date: Option<String>,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub billing_period_start: Option<String>,
    #[serde(default)]
    pub billing_period_end: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
    #[serde(default)]
    pub payment_terms: Option<String>,
    #[serde(default)]
    pub subtotal: Option<MoneyValue>,
    #[serde(default)]
    pub tax: Option<MoneyValue>,
    #[serde(default)]
    pub freight: Option<MoneyValue>,
    #[serde(default)]
    pub total: Option<MoneyValue>,
    #[serde(default)]
    pub parsing_confidence: Option<f64>,
    #[serde(default)]
    pub raw_text: Option<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub lines: Vec<LineItem>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub allocations: Vec<Allocation>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub charges: Vec<Charge>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub pages: Vec<Page>,
}

/// An expected part that has not been confirmed as physically received.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NotReceivedRow {
    #[serde(default)]
    pub part_number: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub received: Option<bool>,
}
