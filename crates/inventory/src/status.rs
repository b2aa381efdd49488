//! Stock status derivation.

use serde::{Deserialize, Serialize};

/// Derived stock-level status of an inventory record.
///
/// `Discontinued` is the one exception to derivation: it is explicitly set by
/// the owner, sticky, and never produced by [`derive_status`]. Callers must
/// clear it (reactivate) before derivation resumes.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockStatus {
    InStock,
    LowStock,
    OutOfStock,
    Overstock,
    Discontinued,
}

impl StockStatus {
    /// True for the statuses that map to a stock-level alert condition.
    pub fn is_stock_level_alert(self) -> bool {
        matches!(
            self,
            StockStatus::LowStock | StockStatus::OutOfStock | StockStatus::Overstock
        )
    }

    pub fn as_str(self) -> &'static str {
        match self {
            StockStatus::InStock => "in_stock",
            StockStatus::LowStock => "low_stock",
            StockStatus::OutOfStock => "out_of_stock",
            StockStatus::Overstock => "overstock",
            StockStatus::Discontinued => "discontinued",
        }
    }
}

/// Pure status derivation from quantity and thresholds. No side effects, no IO.
///
/// Unconfigured thresholds (`minimum_stock == maximum_stock == 0`) yield
/// `InStock` for any positive quantity; a `maximum_stock` of zero disables the
/// overstock boundary entirely.
pub fn derive_status(quantity: i64, minimum_stock: i64, maximum_stock: i64) -> StockStatus {
    if quantity == 0 {
        StockStatus::OutOfStock
    } else if quantity <= minimum_stock {
        StockStatus::LowStock
    } else if maximum_stock > 0 && quantity >= maximum_stock {
        StockStatus::Overstock
    } else {
        StockStatus::InStock
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn zero_quantity_is_out_of_stock() {
        assert_eq!(derive_status(0, 0, 0), StockStatus::OutOfStock);
        assert_eq!(derive_status(0, 10, 100), StockStatus::OutOfStock);
    }

    #[test]
    fn at_or_below_minimum_is_low_stock() {
        assert_eq!(derive_status(10, 10, 100), StockStatus::LowStock);
        assert_eq!(derive_status(1, 10, 100), StockStatus::LowStock);
    }

    #[test]
    fn at_or_above_maximum_is_overstock() {
        assert_eq!(derive_status(100, 10, 100), StockStatus::Overstock);
        assert_eq!(derive_status(500, 10, 100), StockStatus::Overstock);
    }

    #[test]
    fn between_thresholds_is_in_stock() {
        assert_eq!(derive_status(50, 10, 100), StockStatus::InStock);
    }

    #[test]
    fn unconfigured_thresholds_always_in_stock_unless_empty() {
        assert_eq!(derive_status(1, 0, 0), StockStatus::InStock);
        assert_eq!(derive_status(1_000_000, 0, 0), StockStatus::InStock);
        assert_eq!(derive_status(0, 0, 0), StockStatus::OutOfStock);
    }

    #[test]
    fn zero_maximum_disables_overstock() {
        assert_eq!(derive_status(1_000, 10, 0), StockStatus::InStock);
    }
}
