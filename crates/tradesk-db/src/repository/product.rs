//! # Product Repository
//!
//! Finished products, their recipes and their sale stock.
//!
//! ## Storage Layout
//! ```text
//! products ──┬── product_ingredients  (Built recipe lines)
//!            ├── product_charges      (Built flat charges)
//!            └── raw_consumptions     (ingredients spent at creation)
//!
//! Manual { price }  ⇄  products.composition = 'manual', defined_price = price
//! Built  { .. }     ⇄  products.composition = 'built',  defined_price = roll-up
//! ```
//!
//! ## Stock Mutations
//! `qty_available` changes only through [`ProductRepository::restock`],
//! [`ProductRepository::update_details`], order creation and returns. All of
//! them run `UPDATE ... version = version + 1` inside a transaction.

use std::collections::HashMap;

use chrono::{DateTime, Utc};
use sqlx::{FromRow, SqliteConnection, SqlitePool};
use tracing::{debug, info};
use uuid::Uuid;

use crate::error::{DbError, DbResult};
use tradesk_core::inventory::{validate_restock, NewProduct, ProductUpdate};
use tradesk_core::{
    Charge, Composition, CompositionKind, Ingredient, Money, Product, Quantity, TenantId,
};

const PRODUCT_COLUMNS: &str = "id, tenant_id, name, unit, composition, defined_price, \
     qty_available, is_active, image_ref, created_at, updated_at, version";

/// Row shape of `products`; recipe lines are attached separately.
#[derive(Debug, FromRow)]
struct ProductRow {
    id: String,
    tenant_id: String,
    name: String,
    unit: String,
    composition: CompositionKind,
    defined_price: Money,
    qty_available: Quantity,
    is_active: bool,
    image_ref: Option<String>,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
    version: i64,
}

impl ProductRow {
    fn into_product(self, ingredients: Vec<Ingredient>, charges: Vec<Charge>) -> Product {
        let composition = match self.composition {
            CompositionKind::Manual => Composition::Manual {
                price: self.defined_price,
            },
            CompositionKind::Built => Composition::Built {
                ingredients,
                charges,
            },
        };
        Product {
            id: self.id,
            tenant_id: self.tenant_id,
            name: self.name,
            unit: self.unit,
            composition,
            defined_price: self.defined_price,
            qty_available: self.qty_available,
            is_active: self.is_active,
            image_ref: self.image_ref,
            created_at: self.created_at,
            updated_at: self.updated_at,
            version: self.version,
        }
    }
}

/// Repository for product database operations.
///
/// ## Usage
/// ```rust,ignore
/// let product = db.products().record(&tenant, new_product).await?;
/// let product = db.products().restock(&tenant, &product.id, Quantity::from_units(5)).await?;
/// ```
#[derive(Debug, Clone)]
pub struct ProductRepository {
    pool: SqlitePool,
}

impl ProductRepository {
    /// Creates a new ProductRepository.
    pub fn new(pool: SqlitePool) -> Self {
        ProductRepository { pool }
    }

    /// Records a product. A built product's ingredients are written as raw
    /// consumption in the same transaction.
    pub async fn record(&self, tenant: &TenantId, input: NewProduct) -> DbResult<Product> {
        let draft = input.validate()?;
        let id = Uuid::new_v4().to_string();
        let now = Utc::now();

        debug!(
            tenant = %tenant,
            id = %id,
            name = %draft.name,
            defined_price = %draft.defined_price,
            "Recording product"
        );

        let mut tx = self.pool.begin().await?;

        sqlx::query(
            r#"
            INSERT INTO products (
                id, tenant_id, name, unit, composition, defined_price,
                qty_available, is_active, image_ref, created_at, updated_at, version
            ) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, 1, ?8, ?9, ?9, 1)
            "#,
        )
        .bind(&id)
        .bind(tenant.as_str())
        .bind(&draft.name)
        .bind(&draft.unit)
        .bind(draft.composition.kind())
        .bind(draft.defined_price)
        .bind(draft.initial_qty)
        .bind(&draft.image_ref)
        .bind(now)
        .execute(&mut *tx)
        .await?;

        if let Composition::Built {
            ingredients,
            charges,
        } = &draft.composition
        {
            for (line_no, ingredient) in ingredients.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO product_ingredients (id, product_id, line_no, item, qty, unit, unit_cost)
                    VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                    "#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(&id)
                .bind(line_no as i64 + 1)
                .bind(&ingredient.item)
                .bind(ingredient.qty)
                .bind(&ingredient.unit)
                .bind(ingredient.unit_cost)
                .execute(&mut *tx)
                .await?;
            }

            for (line_no, charge) in charges.iter().enumerate() {
                sqlx::query(
                    r#"
                    INSERT INTO product_charges (id, product_id, line_no, label, amount)
                    VALUES (?1, ?2, ?3, ?4, ?5)
                    "#,
                )
                .bind(Uuid::new_v4().to_string())
                .bind(&id)
                .bind(line_no as i64 + 1)
                .bind(&charge.label)
                .bind(charge.amount)
                .execute(&mut *tx)
                .await?;
            }
        }

        for ingredient in draft.consumption() {
            sqlx::query(
                r#"
                INSERT INTO raw_consumptions (id, tenant_id, product_id, item, qty, unit, created_at)
                VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
                "#,
            )
            .bind(Uuid::new_v4().to_string())
            .bind(tenant.as_str())
            .bind(&id)
            .bind(&ingredient.item)
            .bind(ingredient.qty)
            .bind(&ingredient.unit)
            .bind(now)
            .execute(&mut *tx)
            .await?;
        }

        let product = fetch_product(&mut tx, tenant, &id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id.as_str()))?;

        tx.commit().await?;

        info!(
            tenant = %tenant,
            id = %product.id,
            name = %product.name,
            consumed_lines = draft.consumption().len(),
            "Product recorded"
        );
        Ok(product)
    }

    /// Gets a product by ID (active or not).
    pub async fn get(&self, tenant: &TenantId, id: &str) -> DbResult<Option<Product>> {
        let mut conn = self.pool.acquire().await?;
        fetch_product(&mut conn, tenant, id).await
    }

    /// Lists products sorted by name.
    pub async fn list(&self, tenant: &TenantId, include_inactive: bool) -> DbResult<Vec<Product>> {
        debug!(tenant = %tenant, include_inactive, "Listing products");
        let mut conn = self.pool.acquire().await?;
        fetch_products(&mut conn, tenant, include_inactive).await
    }

    /// Adds finished-goods stock.
    pub async fn restock(&self, tenant: &TenantId, id: &str, qty: Quantity) -> DbResult<Product> {
        validate_restock(qty)?;
        debug!(tenant = %tenant, id = %id, qty = %qty, "Restocking product");

        let mut tx = self.pool.begin().await?;

        let product = fetch_product(&mut tx, tenant, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;
        adjust_stock(&mut tx, tenant, id, qty, Some(product.version)).await?;

        let product = fetch_product(&mut tx, tenant, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;
        tx.commit().await?;

        info!(tenant = %tenant, id = %id, qty_available = %product.qty_available, "Product restocked");
        Ok(product)
    }

    /// Edits name, unit, manual price, stock count or image.
    pub async fn update_details(
        &self,
        tenant: &TenantId,
        id: &str,
        update: ProductUpdate,
    ) -> DbResult<Product> {
        debug!(tenant = %tenant, id = %id, "Updating product");

        let mut tx = self.pool.begin().await?;

        let mut product = fetch_product(&mut tx, tenant, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;
        let read_version = product.version;
        update.apply_to(&mut product)?;

        let result = sqlx::query(
            r#"
            UPDATE products SET
                name = ?1,
                unit = ?2,
                defined_price = ?3,
                qty_available = ?4,
                image_ref = ?5,
                updated_at = ?6,
                version = version + 1
            WHERE tenant_id = ?7 AND id = ?8 AND version = ?9
            "#,
        )
        .bind(&product.name)
        .bind(&product.unit)
        .bind(product.defined_price)
        .bind(product.qty_available)
        .bind(&product.image_ref)
        .bind(Utc::now())
        .bind(tenant.as_str())
        .bind(id)
        .bind(read_version)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::conflict("Product", id));
        }

        let product = fetch_product(&mut tx, tenant, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;
        tx.commit().await?;

        info!(tenant = %tenant, id = %id, "Product updated");
        Ok(product)
    }

    /// Soft-deletes a product. Past order lines keep their snapshots.
    pub async fn deactivate(&self, tenant: &TenantId, id: &str) -> DbResult<Product> {
        debug!(tenant = %tenant, id = %id, "Deactivating product");

        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            UPDATE products SET is_active = 0, updated_at = ?1, version = version + 1
            WHERE tenant_id = ?2 AND id = ?3
            "#,
        )
        .bind(Utc::now())
        .bind(tenant.as_str())
        .bind(id)
        .execute(&mut *tx)
        .await?;

        if result.rows_affected() == 0 {
            return Err(DbError::not_found("Product", id));
        }

        let product = fetch_product(&mut tx, tenant, id)
            .await?
            .ok_or_else(|| DbError::not_found("Product", id))?;
        tx.commit().await?;

        info!(tenant = %tenant, id = %id, "Product deactivated");
        Ok(product)
    }
}

// =============================================================================
// Connection-level helpers (usable inside a transaction)
// =============================================================================

pub(crate) async fn fetch_product(
    conn: &mut SqliteConnection,
    tenant: &TenantId,
    id: &str,
) -> DbResult<Option<Product>> {
    let sql = format!(
        "SELECT {} FROM products WHERE tenant_id = ?1 AND id = ?2",
        PRODUCT_COLUMNS
    );
    let Some(row) = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(tenant.as_str())
        .bind(id)
        .fetch_optional(&mut *conn)
        .await?
    else {
        return Ok(None);
    };

    if row.composition == CompositionKind::Manual {
        return Ok(Some(row.into_product(Vec::new(), Vec::new())));
    }

    let ingredients = sqlx::query_as::<_, (String, Quantity, String, Money)>(
        "SELECT item, qty, unit, unit_cost FROM product_ingredients WHERE product_id = ?1 ORDER BY line_no",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|(item, qty, unit, unit_cost)| Ingredient {
        item,
        qty,
        unit,
        unit_cost,
    })
    .collect();

    let charges = sqlx::query_as::<_, (String, Money)>(
        "SELECT label, amount FROM product_charges WHERE product_id = ?1 ORDER BY line_no",
    )
    .bind(id)
    .fetch_all(&mut *conn)
    .await?
    .into_iter()
    .map(|(label, amount)| Charge { label, amount })
    .collect();

    Ok(Some(row.into_product(ingredients, charges)))
}

pub(crate) async fn fetch_products(
    conn: &mut SqliteConnection,
    tenant: &TenantId,
    include_inactive: bool,
) -> DbResult<Vec<Product>> {
    let sql = format!(
        "SELECT {} FROM products WHERE tenant_id = ?1 AND (?2 OR is_active = 1) ORDER BY name, id",
        PRODUCT_COLUMNS
    );
    let rows = sqlx::query_as::<_, ProductRow>(&sql)
        .bind(tenant.as_str())
        .bind(include_inactive)
        .fetch_all(&mut *conn)
        .await?;

    let mut ingredients: HashMap<String, Vec<Ingredient>> = HashMap::new();
    let ingredient_rows = sqlx::query_as::<_, (String, String, Quantity, String, Money)>(
        r#"
        SELECT pi.product_id, pi.item, pi.qty, pi.unit, pi.unit_cost
        FROM product_ingredients pi
        JOIN products p ON p.id = pi.product_id
        WHERE p.tenant_id = ?1
        ORDER BY pi.product_id, pi.line_no
        "#,
    )
    .bind(tenant.as_str())
    .fetch_all(&mut *conn)
    .await?;
    for (product_id, item, qty, unit, unit_cost) in ingredient_rows {
        ingredients.entry(product_id).or_default().push(Ingredient {
            item,
            qty,
            unit,
            unit_cost,
        });
    }

    let mut charges: HashMap<String, Vec<Charge>> = HashMap::new();
    let charge_rows = sqlx::query_as::<_, (String, String, Money)>(
        r#"
        SELECT pc.product_id, pc.label, pc.amount
        FROM product_charges pc
        JOIN products p ON p.id = pc.product_id
        WHERE p.tenant_id = ?1
        ORDER BY pc.product_id, pc.line_no
        "#,
    )
    .bind(tenant.as_str())
    .fetch_all(&mut *conn)
    .await?;
    for (product_id, label, amount) in charge_rows {
        charges
            .entry(product_id)
            .or_default()
            .push(Charge { label, amount });
    }

    Ok(rows
        .into_iter()
        .map(|row| {
            let ing = ingredients.remove(&row.id).unwrap_or_default();
            let chg = charges.remove(&row.id).unwrap_or_default();
            row.into_product(ing, chg)
        })
        .collect())
}

/// Adds `delta` (negative to take stock) to a product's counter.
///
/// With `expected_version` the write is version-checked and a mismatch is a
/// `Conflict`; without it the increment is applied to whatever is stored.
pub(crate) async fn adjust_stock(
    conn: &mut SqliteConnection,
    tenant: &TenantId,
    product_id: &str,
    delta: Quantity,
    expected_version: Option<i64>,
) -> DbResult<()> {
    let result = sqlx::query(
        r#"
        UPDATE products SET
            qty_available = qty_available + ?1,
            updated_at = ?2,
            version = version + 1
        WHERE tenant_id = ?3 AND id = ?4 AND (?5 IS NULL OR version = ?5)
        "#,
    )
    .bind(delta)
    .bind(Utc::now())
    .bind(tenant.as_str())
    .bind(product_id)
    .bind(expected_version)
    .execute(&mut *conn)
    .await?;

    if result.rows_affected() == 0 {
        return Err(match expected_version {
            Some(_) => DbError::conflict("Product", product_id),
            None => DbError::not_found("Product", product_id),
        });
    }

    debug!(product_id = %product_id, delta = %delta, "Product stock adjusted");
    Ok(())
}

// =============================================================================
// Tests
// =============================================================================
