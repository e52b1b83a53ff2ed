//! Allowlisted column sets for sparse updates
//!
//! Callers never supply column names as SQL. Incoming keys are matched
//! against the fixed enums below; values are bound as parameters.

use rust_decimal::Decimal;
use serde_json::Value;
use sqlx::{Postgres, QueryBuilder};

use shared::money::Amount;

use crate::error::{AppError, AppResult};

/// A column that may appear in a sparse update
pub trait Column: Copy + PartialEq {
    fn name(self) -> &'static str;
}

/// Updatable columns of `productos`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ProductColumn {
    Description,
    CategoryId,
    BrandId,
}

/// Updatable columns of `inventario`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum InventoryColumn {
    Sku,
    Quantity,
    UnitCost,
    SalePrice,
    Margin,
    MinStock,
}

impl Column for ProductColumn {
    fn name(self) -> &'static str {
        match self {
            ProductColumn::Description => "descripcion",
            ProductColumn::CategoryId => "id_categoria",
            ProductColumn::BrandId => "id_marca",
        }
    }
}

impl Column for InventoryColumn {
    fn name(self) -> &'static str {
        match self {
            InventoryColumn::Sku => "sku",
            InventoryColumn::Quantity => "existencia_general",
            InventoryColumn::UnitCost => "costo_unitario",
            InventoryColumn::SalePrice => "precio_venta",
            InventoryColumn::Margin => "margen_ganancia",
            InventoryColumn::MinStock => "stock_minimo_general",
        }
    }
}

impl ProductColumn {
    pub const ALL: [ProductColumn; 3] = [
        ProductColumn::Description,
        ProductColumn::CategoryId,
        ProductColumn::BrandId,
    ];

    pub fn from_field(field: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == field)
    }
}

impl InventoryColumn {
    pub const ALL: [InventoryColumn; 6] = [
        InventoryColumn::Sku,
        InventoryColumn::Quantity,
        InventoryColumn::UnitCost,
        InventoryColumn::SalePrice,
        InventoryColumn::Margin,
        InventoryColumn::MinStock,
    ];

    pub fn from_field(field: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|c| c.name() == field)
    }

    /// Coerce a JSON value into this column's type
    pub fn coerce(self, value: &Value) -> AppResult<ColumnValue> {
        let field = self.name();
        match self {
            InventoryColumn::Sku => coerce_text(field, value),
            InventoryColumn::Quantity | InventoryColumn::MinStock => coerce_int(field, value),
            InventoryColumn::UnitCost | InventoryColumn::SalePrice | InventoryColumn::Margin => {
                coerce_money(field, value)
            }
        }
    }
}

impl ProductColumn {
    /// Coerce a JSON value into this column's type
    pub fn coerce(self, value: &Value) -> AppResult<ColumnValue> {
        let field = self.name();
        match self {
            ProductColumn::Description => coerce_text(field, value),
            ProductColumn::CategoryId | ProductColumn::BrandId => coerce_id(field, value),
        }
    }
}

/// A typed value bound to a column
#[derive(Debug, Clone, PartialEq)]
pub enum ColumnValue {
    Text(Option<String>),
    BigInt(i64),
    Int(i32),
    Decimal(Decimal),
}

impl ColumnValue {
    pub fn as_decimal(&self) -> Option<Decimal> {
        match self {
            ColumnValue::Decimal(d) => Some(*d),
            _ => None,
        }
    }
}

/// Ordered set of column assignments, at most one per column
#[derive(Debug, Clone, PartialEq)]
pub struct ColumnChanges<C> {
    entries: Vec<(C, ColumnValue)>,
}

impl<C> Default for ColumnChanges<C> {
    fn default() -> Self {
        Self {
            entries: Vec::new(),
        }
    }
}

impl<C: Column> ColumnChanges<C> {
    pub fn new() -> Self {
        Self::default()
    }

    /// Assign a column, replacing any earlier assignment
    pub fn set(&mut self, column: C, value: ColumnValue) {
        match self.entries.iter_mut().find(|(c, _)| *c == column) {
            Some(entry) => entry.1 = value,
            None => self.entries.push((column, value)),
        }
    }

    pub fn get(&self, column: C) -> Option<&ColumnValue> {
        self.entries
            .iter()
            .find(|(c, _)| *c == column)
            .map(|(_, v)| v)
    }

    pub fn contains(&self, column: C) -> bool {
        self.get(column).is_some()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = &(C, ColumnValue)> {
        self.entries.iter()
    }

    /// Append `col = $n, ...` to an UPDATE statement
    pub fn push_assignments(&self, builder: &mut QueryBuilder<'_, Postgres>) {
        let mut separated = builder.separated(", ");
        for (column, value) in &self.entries {
            separated.push(column.name());
            separated.push_unseparated(" = ");
            match value {
                ColumnValue::Text(text) => separated.push_bind_unseparated(text.clone()),
                ColumnValue::BigInt(v) => separated.push_bind_unseparated(*v),
                ColumnValue::Int(v) => separated.push_bind_unseparated(*v),
                ColumnValue::Decimal(v) => separated.push_bind_unseparated(*v),
            };
        }
    }
}

fn coerce_text(field: &str, value: &Value) -> AppResult<ColumnValue> {
    match value {
        Value::Null => Ok(ColumnValue::Text(None)),
        Value::String(s) => Ok(ColumnValue::Text(Some(s.trim().to_string()))),
        _ => Err(AppError::validation(field, "expected text")),
    }
}

fn coerce_id(field: &str, value: &Value) -> AppResult<ColumnValue> {
    let id = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    match id {
        Some(id) if id > 0 => Ok(ColumnValue::BigInt(id)),
        _ => Err(AppError::validation(field, "expected a positive id")),
    }
}

fn coerce_int(field: &str, value: &Value) -> AppResult<ColumnValue> {
    let number = match value {
        Value::Number(n) => n.as_i64(),
        Value::String(s) => s.trim().parse::<i64>().ok(),
        _ => None,
    };
    number
        .and_then(|n| i32::try_from(n).ok())
        .map(ColumnValue::Int)
        .ok_or_else(|| AppError::validation(field, "expected an integer"))
}

fn coerce_money(field: &str, value: &Value) -> AppResult<ColumnValue> {
    let amount: Amount = serde_json::from_value(value.clone())
        .map_err(|_| AppError::invalid(field, "INVALID_AMOUNT", "expected an amount"))?;
    let parsed = amount.parse().map_err(|e| e.for_field(field))?;
    Ok(ColumnValue::Decimal(parsed))
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::str::FromStr;

    #[test]
    fn test_allowlist_lookup() {
        assert_eq!(
            InventoryColumn::from_field("costo_unitario"),
            Some(InventoryColumn::UnitCost)
        );
        assert_eq!(
            ProductColumn::from_field("id_marca"),
            Some(ProductColumn::BrandId)
        );
        assert_eq!(InventoryColumn::from_field("id_inventario"), None);
        assert_eq!(ProductColumn::from_field("descripcion; DROP TABLE"), None);
    }

    #[test]
    fn test_set_replaces_previous_assignment() {
        let mut changes = ColumnChanges::new();
        changes.set(InventoryColumn::Margin, ColumnValue::Decimal(Decimal::from(10)));
        changes.set(InventoryColumn::Margin, ColumnValue::Decimal(Decimal::from(20)));

        assert_eq!(changes.len(), 1);
        assert_eq!(
            changes.get(InventoryColumn::Margin).and_then(|v| v.as_decimal()),
            Some(Decimal::from(20))
        );
    }

    #[test]
    fn test_push_assignments_binds_values() {
        let mut changes = ColumnChanges::new();
        changes.set(InventoryColumn::UnitCost, ColumnValue::Decimal(Decimal::from(5)));
        changes.set(InventoryColumn::MinStock, ColumnValue::Int(3));

        let mut builder = QueryBuilder::<Postgres>::new("UPDATE inventario SET ");
        changes.push_assignments(&mut builder);

        assert_eq!(
            builder.sql(),
            "UPDATE inventario SET costo_unitario = $1, stock_minimo_general = $2"
        );
    }

    #[test]
    fn test_coerce_money_uses_locale_parser() {
        let value = InventoryColumn::UnitCost.coerce(&json!("1.250,50")).unwrap();
        assert_eq!(
            value.as_decimal(),
            Some(Decimal::from_str("1250.50").unwrap())
        );

        let err = InventoryColumn::Margin.coerce(&json!("abc")).unwrap_err();
        assert_eq!(err.code(), "INVALID_AMOUNT");
    }

    #[test]
    fn test_coerce_rejects_wrong_types() {
        assert!(InventoryColumn::Quantity.coerce(&json!("ten")).is_err());
        assert!(ProductColumn::CategoryId.coerce(&json!(-1)).is_err());
        assert!(InventoryColumn::Sku.coerce(&json!(12)).is_err());
        assert_eq!(
            InventoryColumn::Quantity.coerce(&json!("12")).unwrap(),
            ColumnValue::Int(12)
        );
    }
}
