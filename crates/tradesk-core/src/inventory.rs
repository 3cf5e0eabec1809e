//! # Inventory Rules
//!
//! Two stock ledgers that are never merged.
//!
//! ```text
//! ┌───────────────────────────────┐      ┌───────────────────────────────┐
//! │     Raw-material ledger       │      │    Finished-goods ledger      │
//! │  (derived on every read)      │      │  (Product.qty_available)      │
//! │                               │      │                               │
//! │  + Purchase.qty  (item = X)   │      │  + restock / edit             │
//! │  − RawConsumption (item = X)  │      │  − order lines                │
//! │                               │      │  + return of order lines      │
//! │  low  = thr > 0 && avail ≤ thr│      │  out = qty_available ≤ 0      │
//! │  out  = avail ≤ 0             │      │                               │
//! └───────────────────────────────┘      └───────────────────────────────┘
//! ```
//!
//! Neither ledger blocks on negative stock: traders sell against incoming
//! goods, so shortages are surfaced as flags and warnings only.

use std::collections::BTreeMap;

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use ts_rs::TS;

use crate::error::{CoreResult, ValidationError};
use crate::money::Money;
use crate::quantity::Quantity;
use crate::types::{Charge, Composition, Ingredient, Product, Purchase, RawConsumption};
use crate::validation::{
    normalize_optional, normalize_unit, validate_name, validate_price, validate_quantity,
    validate_total,
};

// =============================================================================
// Raw-Material Ledger
// =============================================================================

/// Stock of one raw-material item.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct StockLevel {
    pub item: String,
    pub unit: String,
    pub purchased: Quantity,
    pub consumed: Quantity,
    /// May be negative when consumption outran purchases.
    pub available: Quantity,
    pub low_stock_threshold: Quantity,
    pub is_low: bool,
    pub is_out: bool,
}

/// `threshold > 0 && available ≤ threshold`.
pub fn is_low(available: Quantity, threshold: Quantity) -> bool {
    threshold.is_positive() && available <= threshold
}

/// `available ≤ 0`.
pub fn is_out(available: Quantity) -> bool {
    !available.is_positive()
}

#[derive(Default)]
struct ItemTally {
    purchased: Quantity,
    consumed: Quantity,
    /// (date, created_at) of the most recent purchase with its threshold and unit.
    latest: Option<((NaiveDate, DateTime<Utc>), Quantity, String)>,
    consumption_unit: Option<String>,
}

/// Computes raw-material stock per item name, sorted by item.
///
/// Threshold and unit come from the most recent purchase of the item (latest
/// `date`, ties broken by `created_at`). Items that were only ever consumed
/// still appear, with negative availability and the consumption unit.
pub fn raw_material_levels(
    purchases: &[Purchase],
    consumptions: &[RawConsumption],
) -> Vec<StockLevel> {
    let mut tally: BTreeMap<&str, ItemTally> = BTreeMap::new();

    for purchase in purchases {
        let entry = tally.entry(purchase.item.as_str()).or_default();
        entry.purchased += purchase.qty;

        let key = (purchase.date, purchase.created_at);
        let newer = entry.latest.as_ref().map_or(true, |(seen, _, _)| key > *seen);
        if newer {
            entry.latest = Some((key, purchase.low_stock_threshold, purchase.unit.clone()));
        }
    }

    for consumption in consumptions {
        let entry = tally.entry(consumption.item.as_str()).or_default();
        entry.consumed += consumption.qty;
        if entry.consumption_unit.is_none() {
            entry.consumption_unit = Some(consumption.unit.clone());
        }
    }

    tally
        .into_iter()
        .map(|(item, t)| {
            let available = t.purchased - t.consumed;
            let (threshold, unit) = match t.latest {
                Some((_, threshold, unit)) => (threshold, unit),
                None => (
                    Quantity::zero(),
                    t.consumption_unit
                        .unwrap_or_else(|| crate::DEFAULT_UNIT.to_string()),
                ),
            };
            StockLevel {
                item: item.to_string(),
                unit,
                purchased: t.purchased,
                consumed: t.consumed,
                available,
                low_stock_threshold: threshold,
                is_low: is_low(available, threshold),
                is_out: is_out(available),
            }
        })
        .collect()
}

// =============================================================================
// Finished-Goods Ledger
// =============================================================================

/// Finished-goods stock of one active product.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductStock {
    pub product_id: String,
    pub name: String,
    pub unit: String,
    /// Raw stored value, negative when oversold.
    pub qty_available: Quantity,
    pub defined_price: Money,
    pub is_out_of_stock: bool,
}

/// Projects active products into stock rows, sorted by name.
pub fn product_stock(products: &[Product]) -> Vec<ProductStock> {
    let mut rows: Vec<ProductStock> = products
        .iter()
        .filter(|p| p.is_active)
        .map(|p| ProductStock {
            product_id: p.id.clone(),
            name: p.name.clone(),
            unit: p.unit.clone(),
            qty_available: p.qty_available,
            defined_price: p.defined_price,
            is_out_of_stock: p.is_out_of_stock(),
        })
        .collect();
    rows.sort_by(|a, b| a.name.cmp(&b.name).then_with(|| a.product_id.cmp(&b.product_id)));
    rows
}

/// Validates a restock quantity (must be > 0).
pub fn validate_restock(qty: Quantity) -> CoreResult<()> {
    validate_quantity("qty", qty)?;
    Ok(())
}

// =============================================================================
// Product Entry
// =============================================================================

/// A finished product as entered by the operator.
#[derive(Debug, Clone, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct NewProduct {
    pub name: String,
    #[serde(default)]
    pub unit: String,
    pub composition: Composition,
    /// Opening finished-goods stock.
    #[serde(default)]
    pub initial_qty: Quantity,
    #[serde(default)]
    pub image_ref: Option<String>,
}

/// A validated product ready to be written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ProductDraft {
    pub name: String,
    pub unit: String,
    pub composition: Composition,
    pub defined_price: Money,
    pub initial_qty: Quantity,
    pub image_ref: Option<String>,
}

impl ProductDraft {
    /// Raw material this product's recipe consumes, one entry per ingredient.
    pub fn consumption(&self) -> &[Ingredient] {
        self.composition.ingredients()
    }
}

impl NewProduct {
    pub fn validate(self) -> CoreResult<ProductDraft> {
        let name = validate_name("name", &self.name)?;
        let unit = normalize_unit(&self.unit)?;
        let composition = validate_composition(self.composition)?;

        if self.initial_qty.is_negative() {
            return Err(ValidationError::negative("initial_qty").into());
        }

        let defined_price = validate_total("defined_price", composition.defined_price())?;

        Ok(ProductDraft {
            name,
            unit,
            defined_price,
            composition,
            initial_qty: self.initial_qty,
            image_ref: normalize_optional("image_ref", self.image_ref.as_deref())?,
        })
    }
}

fn validate_composition(composition: Composition) -> CoreResult<Composition> {
    match composition {
        Composition::Manual { price } => {
            validate_price("price", price)?;
            Ok(Composition::Manual { price })
        }
        Composition::Built {
            ingredients,
            charges,
        } => {
            if ingredients.is_empty() {
                return Err(ValidationError::Inconsistent {
                    field: "ingredients".to_string(),
                    reason: "a built product needs at least one ingredient".to_string(),
                }
                .into());
            }

            let ingredients = ingredients
                .into_iter()
                .map(|ing| {
                    let item = validate_name("ingredients.item", &ing.item)?;
                    validate_quantity("ingredients.qty", ing.qty)?;
                    validate_price("ingredients.unit_cost", ing.unit_cost)?;
                    Ok(Ingredient {
                        item,
                        qty: ing.qty,
                        unit: normalize_unit(&ing.unit)?,
                        unit_cost: ing.unit_cost,
                    })
                })
                .collect::<Result<Vec<_>, ValidationError>>()?;

            let charges = charges
                .into_iter()
                .map(|charge| {
                    let label = validate_name("charges.label", &charge.label)?;
                    validate_price("charges.amount", charge.amount)?;
                    Ok(Charge {
                        label,
                        amount: charge.amount,
                    })
                })
                .collect::<Result<Vec<_>, ValidationError>>()?;

            Ok(Composition::Built {
                ingredients,
                charges,
            })
        }
    }
}

// =============================================================================
// Product Edit
// =============================================================================

/// Field edits to an existing product. `None` leaves a field unchanged.
#[derive(Debug, Clone, Default, Serialize, Deserialize, TS)]
#[ts(export)]
pub struct ProductUpdate {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub unit: Option<String>,
    /// Only valid for manually priced products.
    #[serde(default)]
    pub price: Option<Money>,
    /// Stock correction; sets the counter to this value.
    #[serde(default)]
    pub qty_available: Option<Quantity>,
    #[serde(default)]
    pub image_ref: Option<String>,
}

impl ProductUpdate {
    /// Applies the edits to `product` in place.
    pub fn apply_to(self, product: &mut Product) -> CoreResult<()> {
        if let Some(name) = self.name {
            product.name = validate_name("name", &name)?;
        }
        if let Some(unit) = self.unit {
            product.unit = normalize_unit(&unit)?;
        }
        if let Some(price) = self.price {
            validate_price("price", price)?;
            match product.composition {
                Composition::Manual { .. } => {
                    product.composition = Composition::Manual { price };
                    product.defined_price = price;
                }
                Composition::Built { .. } => {
                    return Err(ValidationError::Inconsistent {
                        field: "price".to_string(),
                        reason: "price of a built product is derived from its recipe".to_string(),
                    }
                    .into());
                }
            }
        }
        if let Some(qty) = self.qty_available {
            if qty.is_negative() {
                return Err(ValidationError::negative("qty_available").into());
            }
            product.qty_available = qty;
        }
        if let Some(image_ref) = self.image_ref {
            product.image_ref = normalize_optional("image_ref", Some(&image_ref))?;
        }
        Ok(())
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::CoreError;
    use crate::types::PaymentStatus;
    use chrono::TimeZone;

    fn purchase(item: &str, qty: i64, date: &str, threshold: i64, secs: i64) -> Purchase {
        let ts = Utc.timestamp_opt(1_700_000_000 + secs, 0).unwrap();
        Purchase {
            id: format!("p-{}-{}", item, secs),
            tenant_id: "t".into(),
            date: NaiveDate::parse_from_str(date, "%Y-%m-%d").unwrap(),
            supplier_name: "Supplier".into(),
            item: item.into(),
            qty: Quantity::from_units(qty),
            unit: "kg".into(),
            unit_cost: Money::from_rupees(10),
            total: Money::from_rupees(10 * qty),
            paid_amount: Money::zero(),
            due_amount: Money::from_rupees(10 * qty),
            payment_status: PaymentStatus::Unpaid,
            low_stock_threshold: Quantity::from_units(threshold),
            notes: None,
            image_ref: None,
            created_at: ts,
            updated_at: ts,
            version: 1,
        }
    }

    fn consumption(item: &str, milli: i64) -> RawConsumption {
        RawConsumption {
            id: "c".into(),
            tenant_id: "t".into(),
            product_id: "prod".into(),
            item: item.into(),
            qty: Quantity::from_milli(milli),
            unit: "m".into(),
            created_at: Utc.timestamp_opt(1_700_000_000, 0).unwrap(),
        }
    }

    fn product(name: &str, qty: i64, active: bool) -> Product {
        let ts = Utc.timestamp_opt(1_700_000_000, 0).unwrap();
        Product {
            id: format!("id-{}", name),
            tenant_id: "t".into(),
            name: name.into(),
            unit: "pcs".into(),
            composition: Composition::Manual {
                price: Money::from_rupees(100),
            },
            defined_price: Money::from_rupees(100),
            qty_available: Quantity::from_units(qty),
            is_active: active,
            image_ref: None,
            created_at: ts,
            updated_at: ts,
            version: 1,
        }
    }

    #[test]
    fn test_stock_is_purchased_minus_consumed() {
        let purchases = [
            purchase("Flour", 10, "2026-01-01", 0, 0),
            purchase("Flour", 5, "2026-01-05", 0, 1),
        ];
        let consumptions = [consumption("Flour", 3500)];

        let levels = raw_material_levels(&purchases, &consumptions);
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].purchased, Quantity::from_units(15));
        assert_eq!(levels[0].available, Quantity::from_milli(11_500));
        assert!(!levels[0].is_out);
    }

    #[test]
    fn test_threshold_from_most_recent_purchase() {
        // later date wins even though it was entered first
        let purchases = [
            purchase("Sugar", 4, "2026-03-10", 5, 0),
            purchase("Sugar", 4, "2026-03-01", 1, 10),
        ];
        let levels = raw_material_levels(&purchases, &[]);
        assert_eq!(levels[0].low_stock_threshold, Quantity::from_units(5));
        assert!(levels[0].is_low);

        // same date: later created_at wins
        let purchases = [
            purchase("Sugar", 4, "2026-03-10", 5, 0),
            purchase("Sugar", 4, "2026-03-10", 2, 10),
        ];
        let levels = raw_material_levels(&purchases, &[]);
        assert_eq!(levels[0].low_stock_threshold, Quantity::from_units(2));
        assert!(!levels[0].is_low);
    }

    #[test]
    fn test_zero_threshold_never_low() {
        let levels = raw_material_levels(&[purchase("Salt", 1, "2026-01-01", 0, 0)], &[]);
        assert!(!levels[0].is_low);
        assert!(is_low(Quantity::from_units(3), Quantity::from_units(3)));
        assert!(!is_low(Quantity::zero(), Quantity::zero()));
    }

    #[test]
    fn test_consumption_only_item_is_listed_negative() {
        let levels = raw_material_levels(&[], &[consumption("Lace", 2000)]);
        assert_eq!(levels.len(), 1);
        assert_eq!(levels[0].item, "Lace");
        assert_eq!(levels[0].unit, "m");
        assert_eq!(levels[0].available, Quantity::from_units(-2));
        assert!(levels[0].is_out);
        assert!(!levels[0].is_low);
    }

    #[test]
    fn test_levels_sorted_by_item() {
        let purchases = [
            purchase("Zinc", 1, "2026-01-01", 0, 0),
            purchase("Alum", 1, "2026-01-01", 0, 1),
        ];
        let items: Vec<_> = raw_material_levels(&purchases, &[])
            .into_iter()
            .map(|l| l.item)
            .collect();
        assert_eq!(items, vec!["Alum", "Zinc"]);
    }

    #[test]
    fn test_product_stock_skips_inactive_and_flags_oversold() {
        let products = [
            product("Shirt", -2, true),
            product("Cap", 4, true),
            product("Old", 9, false),
        ];
        let rows = product_stock(&products);
        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].name, "Cap");
        assert!(!rows[0].is_out_of_stock);
        assert_eq!(rows[1].qty_available, Quantity::from_units(-2));
        assert!(rows[1].is_out_of_stock);
    }

    #[test]
    fn test_built_product_validation() {
        let draft = NewProduct {
            name: " Kurta ".into(),
            unit: String::new(),
            composition: Composition::Built {
                ingredients: vec![Ingredient {
                    item: "Cotton".into(),
                    qty: Quantity::from_milli(2500),
                    unit: "m".into(),
                    unit_cost: Money::from_rupees(120),
                }],
                charges: vec![Charge {
                    label: "Tailoring".into(),
                    amount: Money::from_rupees(150),
                }],
            },
            initial_qty: Quantity::from_units(3),
            image_ref: None,
        }
        .validate()
        .unwrap();

        assert_eq!(draft.name, "Kurta");
        assert_eq!(draft.unit, "units");
        assert_eq!(draft.defined_price, Money::from_rupees(450));
        assert_eq!(draft.consumption().len(), 1);
    }

    #[test]
    fn test_built_product_price_overflow_is_rejected() {
        let err = NewProduct {
            name: "Ingot".into(),
            unit: "pcs".into(),
            composition: Composition::Built {
                ingredients: vec![Ingredient {
                    item: "Gold".into(),
                    qty: Quantity::MAX,
                    unit: "g".into(),
                    unit_cost: Money::MAX,
                }],
                charges: vec![],
            },
            initial_qty: Quantity::zero(),
            image_ref: None,
        }
        .validate()
        .unwrap_err();

        assert!(matches!(
            err,
            CoreError::Validation(ValidationError::OutOfRange { ref field, .. }) if field == "defined_price"
        ));
    }

    #[test]
    fn test_built_product_needs_ingredients() {
        let result = NewProduct {
            name: "Box".into(),
            unit: "pcs".into(),
            composition: Composition::Built {
                ingredients: vec![],
                charges: vec![],
            },
            initial_qty: Quantity::zero(),
            image_ref: None,
        }
        .validate();
        assert!(result.is_err());
    }

    #[test]
    fn test_product_update_rules() {
        let mut p = product("Cap", 4, true);
        ProductUpdate {
            name: Some(" Sun Cap ".into()),
            price: Some(Money::from_rupees(90)),
            qty_available: Some(Quantity::from_units(10)),
            ..ProductUpdate::default()
        }
        .apply_to(&mut p)
        .unwrap();
        assert_eq!(p.name, "Sun Cap");
        assert_eq!(p.defined_price, Money::from_rupees(90));
        assert_eq!(p.qty_available, Quantity::from_units(10));

        p.composition = Composition::Built {
            ingredients: vec![],
            charges: vec![],
        };
        let err = ProductUpdate {
            price: Some(Money::from_rupees(1)),
            ..ProductUpdate::default()
        }
        .apply_to(&mut p);
        assert!(err.is_err());
    }

    #[test]
    fn test_restock_requires_positive_qty() {
        assert!(validate_restock(Quantity::from_units(1)).is_ok());
        assert!(validate_restock(Quantity::zero()).is_err());
    }
}
