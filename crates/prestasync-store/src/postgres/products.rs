//! Database operations for `products`, `product_options`, and `variants`.
//!
//! Aggregate parts that have no relational consumers (prices, option value
//! lists, selected option tuples, metadata, image URL lists) are stored as
//! jsonb columns; the sync engine is their only reader and writer.
//!
//! Partial updates are merged in Rust and written back as a full row: the
//! sequential sync pass is the single writer of these tables, so
//! read-merge-write cannot race.

use sqlx::PgPool;

use prestasync_core::catalog::{
    NewOption, NewProduct, NewVariant, OptionUpdate, Product, ProductOption, ProductStatus,
    ProductUpdate, Variant, VariantUpdate,
};
use prestasync_core::store::StoreError;

fn status_to_str(status: ProductStatus) -> &'static str {
    match status {
        ProductStatus::Published => "published",
        ProductStatus::Draft => "draft",
    }
}

fn status_from_str(raw: &str) -> ProductStatus {
    if raw == "published" {
        ProductStatus::Published
    } else {
        ProductStatus::Draft
    }
}

fn from_json<T: serde::de::DeserializeOwned>(value: serde_json::Value) -> Result<T, StoreError> {
    serde_json::from_value(value).map_err(StoreError::backend)
}

fn to_json<T: serde::Serialize>(value: &T) -> Result<serde_json::Value, StoreError> {
    serde_json::to_value(value).map_err(StoreError::backend)
}

// ---------------------------------------------------------------------------
// Row types
// ---------------------------------------------------------------------------

#[derive(Debug, sqlx::FromRow)]
struct ProductRow {
    id: i64,
    external_id: i64,
    title: String,
    subtitle: Option<String>,
    description: Option<String>,
    handle: String,
    status: String,
    discountable: bool,
    is_giftcard: bool,
    weight: i64,
    height: i64,
    length: i64,
    width: i64,
    images: serde_json::Value,
    collection_id: Option<i64>,
    profile_id: Option<String>,
    metadata: serde_json::Value,
}

#[derive(Debug, sqlx::FromRow)]
struct OptionRow {
    id: i64,
    product_id: i64,
    title: String,
    option_values: serde_json::Value,
    metadata: serde_json::Value,
}

impl OptionRow {
    fn into_option(self) -> Result<ProductOption, StoreError> {
        Ok(ProductOption {
            id: self.id,
            product_id: self.product_id,
            title: self.title,
            values: from_json(self.option_values)?,
            metadata: from_json(self.metadata)?,
        })
    }
}

#[derive(Debug, sqlx::FromRow)]
struct VariantRow {
    id: i64,
    product_id: i64,
    title: String,
    sku: Option<String>,
    barcode: Option<String>,
    ean: Option<String>,
    upc: Option<String>,
    prices: serde_json::Value,
    inventory_quantity: i64,
    allow_backorder: bool,
    manage_inventory: bool,
    weight: i64,
    height: i64,
    length: i64,
    width: i64,
    option_values: serde_json::Value,
    metadata: serde_json::Value,
}

impl VariantRow {
    fn into_variant(self) -> Result<Variant, StoreError> {
        Ok(Variant {
            id: self.id,
            product_id: self.product_id,
            title: self.title,
            sku: self.sku,
            barcode: self.barcode,
            ean: self.ean,
            upc: self.upc,
            prices: from_json(self.prices)?,
            inventory_quantity: self.inventory_quantity,
            allow_backorder: self.allow_backorder,
            manage_inventory: self.manage_inventory,
            weight: self.weight,
            height: self.height,
            length: self.length,
            width: self.width,
            options: from_json(self.option_values)?,
            metadata: from_json(self.metadata)?,
        })
    }
}

const PRODUCT_COLUMNS: &str = "id, external_id, title, subtitle, description, handle, status, \
     discountable, is_giftcard, weight, height, length, width, images, \
     collection_id, profile_id, metadata";

const VARIANT_COLUMNS: &str = "id, product_id, title, sku, barcode, ean, upc, prices, \
     inventory_quantity, allow_backorder, manage_inventory, weight, height, length, width, \
     option_values, metadata";

// ---------------------------------------------------------------------------
// products
// ---------------------------------------------------------------------------

async fn load_aggregate(pool: &PgPool, row: ProductRow) -> Result<Product, StoreError> {
    let options = sqlx::query_as::<_, OptionRow>(
        "SELECT id, product_id, title, option_values, metadata \
         FROM product_options WHERE product_id = $1 ORDER BY id",
    )
    .bind(row.id)
    .fetch_all(pool)
    .await
    .map_err(StoreError::backend)?
    .into_iter()
    .map(OptionRow::into_option)
    .collect::<Result<Vec<_>, _>>()?;

    let variants = sqlx::query_as::<_, VariantRow>(&format!(
        "SELECT {VARIANT_COLUMNS} FROM variants WHERE product_id = $1 ORDER BY id"
    ))
    .bind(row.id)
    .fetch_all(pool)
    .await
    .map_err(StoreError::backend)?
    .into_iter()
    .map(VariantRow::into_variant)
    .collect::<Result<Vec<_>, _>>()?;

    Ok(Product {
        id: row.id,
        title: row.title,
        subtitle: row.subtitle,
        description: row.description,
        handle: row.handle,
        is_giftcard: row.is_giftcard,
        discountable: row.discountable,
        weight: row.weight,
        height: row.height,
        length: row.length,
        width: row.width,
        external_id: row.external_id,
        status: status_from_str(&row.status),
        images: from_json(row.images)?,
        options,
        variants,
        collection_id: row.collection_id,
        profile_id: row.profile_id,
        metadata: from_json(row.metadata)?,
    })
}

/// Fetches the full product aggregate by source external id.
///
/// # Errors
///
/// Returns [`StoreError::Backend`] if a query fails.
pub async fn get_by_external_id(
    pool: &PgPool,
    external_id: i64,
) -> Result<Option<Product>, StoreError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE external_id = $1"
    ))
    .bind(external_id)
    .fetch_optional(pool)
    .await
    .map_err(StoreError::backend)?;

    match row {
        Some(row) => Ok(Some(load_aggregate(pool, row).await?)),
        None => Ok(None),
    }
}

/// Fetches the full product aggregate by internal id.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] if no row exists, or
/// [`StoreError::Backend`] if a query fails.
pub async fn get_by_id(pool: &PgPool, id: i64) -> Result<Product, StoreError> {
    let row = sqlx::query_as::<_, ProductRow>(&format!(
        "SELECT {PRODUCT_COLUMNS} FROM products WHERE id = $1"
    ))
    .bind(id)
    .fetch_optional(pool)
    .await
    .map_err(StoreError::backend)?
    .ok_or(StoreError::NotFound)?;

    load_aggregate(pool, row).await
}

/// Inserts a product together with its options, returning the aggregate
/// with assigned ids.
///
/// # Errors
///
/// Returns [`StoreError::Backend`] if any insert fails.
pub async fn create(pool: &PgPool, product: NewProduct) -> Result<Product, StoreError> {
    let id: i64 = sqlx::query_scalar::<_, i64>(
        "INSERT INTO products \
             (external_id, title, subtitle, description, handle, status, discountable, \
              is_giftcard, weight, height, length, width, images, collection_id, \
              profile_id, metadata) \
         VALUES ($1, $2, $3, $4, $5, $6, $7, \
                 $8, $9, $10, $11, $12, $13::jsonb, $14, \
                 $15, $16::jsonb) \
         RETURNING id",
    )
    .bind(product.external_id)
    .bind(&product.title)
    .bind(&product.subtitle)
    .bind(&product.description)
    .bind(&product.handle)
    .bind(status_to_str(product.status))
    .bind(product.discountable)
    .bind(product.is_giftcard)
    .bind(product.weight)
    .bind(product.height)
    .bind(product.length)
    .bind(product.width)
    .bind(to_json(&product.images)?)
    .bind(product.collection_id)
    .bind(&product.profile_id)
    .bind(to_json(&product.metadata)?)
    .fetch_one(pool)
    .await
    .map_err(StoreError::backend)?;

    for option in &product.options {
        insert_option(pool, id, option).await?;
    }

    get_by_id(pool, id).await
}

/// Merges a partial update into the stored row and writes it back.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] if the id does not exist, or
/// [`StoreError::Backend`] if a query fails.
pub async fn update(pool: &PgPool, id: i64, update: ProductUpdate) -> Result<Product, StoreError> {
    let mut current = get_by_id(pool, id).await?;

    if let Some(title) = update.title {
        current.title = title;
    }
    if let Some(subtitle) = update.subtitle {
        current.subtitle = subtitle;
    }
    if let Some(description) = update.description {
        current.description = description;
    }
    if let Some(handle) = update.handle {
        current.handle = handle;
    }
    if let Some(status) = update.status {
        current.status = status;
    }
    if let Some(weight) = update.weight {
        current.weight = weight;
    }
    if let Some(height) = update.height {
        current.height = height;
    }
    if let Some(length) = update.length {
        current.length = length;
    }
    if let Some(width) = update.width {
        current.width = width;
    }
    if let Some(collection_id) = update.collection_id {
        current.collection_id = Some(collection_id);
    }
    if let Some(metadata) = update.metadata {
        current.metadata = metadata;
    }

    sqlx::query(
        "UPDATE products SET \
             title = $2, subtitle = $3, description = $4, handle = $5, status = $6, \
             weight = $7, height = $8, length = $9, width = $10, \
             collection_id = $11, metadata = $12::jsonb, updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(id)
    .bind(&current.title)
    .bind(&current.subtitle)
    .bind(&current.description)
    .bind(&current.handle)
    .bind(status_to_str(current.status))
    .bind(current.weight)
    .bind(current.height)
    .bind(current.length)
    .bind(current.width)
    .bind(current.collection_id)
    .bind(to_json(&current.metadata)?)
    .execute(pool)
    .await
    .map_err(StoreError::backend)?;

    get_by_id(pool, id).await
}

/// Replaces the product's image URL list.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] if the id does not exist, or
/// [`StoreError::Backend`] if the update fails.
pub async fn set_images(pool: &PgPool, id: i64, images: Vec<String>) -> Result<(), StoreError> {
    let result = sqlx::query("UPDATE products SET images = $2::jsonb, updated_at = NOW() WHERE id = $1")
        .bind(id)
        .bind(to_json(&images)?)
        .execute(pool)
        .await
        .map_err(StoreError::backend)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// product_options
// ---------------------------------------------------------------------------

async fn insert_option(
    pool: &PgPool,
    product_id: i64,
    option: &NewOption,
) -> Result<ProductOption, StoreError> {
    let row = sqlx::query_as::<_, OptionRow>(
        "INSERT INTO product_options (product_id, title, option_values, metadata) \
         VALUES ($1, $2, $3::jsonb, $4::jsonb) \
         RETURNING id, product_id, title, option_values, metadata",
    )
    .bind(product_id)
    .bind(&option.title)
    .bind(to_json(&option.values)?)
    .bind(to_json(&option.metadata)?)
    .fetch_one(pool)
    .await
    .map_err(StoreError::backend)?;

    row.into_option()
}

/// Adds an option to an existing product.
///
/// # Errors
///
/// Returns [`StoreError::Backend`] if the insert fails.
pub async fn add_option(
    pool: &PgPool,
    product_id: i64,
    option: NewOption,
) -> Result<ProductOption, StoreError> {
    insert_option(pool, product_id, &option).await
}

/// Applies a partial update to an option; `None` fields keep stored values.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] if the option does not exist on the
/// product, or [`StoreError::Backend`] if the update fails.
pub async fn update_option(
    pool: &PgPool,
    product_id: i64,
    option_id: i64,
    update: OptionUpdate,
) -> Result<(), StoreError> {
    let values = update.values.as_ref().map(to_json).transpose()?;

    let result = sqlx::query(
        "UPDATE product_options SET \
             title = COALESCE($3, title), \
             option_values = COALESCE($4::jsonb, option_values), \
             updated_at = NOW() \
         WHERE id = $1 AND product_id = $2",
    )
    .bind(option_id)
    .bind(product_id)
    .bind(update.title)
    .bind(values)
    .execute(pool)
    .await
    .map_err(StoreError::backend)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

/// Deletes an option from a product.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] if the option does not exist on the
/// product, or [`StoreError::Backend`] if the delete fails.
pub async fn delete_option(
    pool: &PgPool,
    product_id: i64,
    option_id: i64,
) -> Result<(), StoreError> {
    let result = sqlx::query("DELETE FROM product_options WHERE id = $1 AND product_id = $2")
        .bind(option_id)
        .bind(product_id)
        .execute(pool)
        .await
        .map_err(StoreError::backend)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}

// ---------------------------------------------------------------------------
// variants
// ---------------------------------------------------------------------------

/// Looks up a variant by SKU.
///
/// # Errors
///
/// Returns [`StoreError::Backend`] if the query fails.
pub async fn get_variant_by_sku(pool: &PgPool, sku: &str) -> Result<Option<Variant>, StoreError> {
    sqlx::query_as::<_, VariantRow>(&format!(
        "SELECT {VARIANT_COLUMNS} FROM variants WHERE sku = $1"
    ))
    .bind(sku)
    .fetch_optional(pool)
    .await
    .map_err(StoreError::backend)?
    .map(VariantRow::into_variant)
    .transpose()
}

/// Inserts a variant under a product.
///
/// # Errors
///
/// Returns [`StoreError::Backend`] if the insert fails.
pub async fn create_variant(
    pool: &PgPool,
    product_id: i64,
    variant: NewVariant,
) -> Result<Variant, StoreError> {
    let row = sqlx::query_as::<_, VariantRow>(&format!(
        "INSERT INTO variants \
             (product_id, title, sku, barcode, ean, upc, prices, inventory_quantity, \
              allow_backorder, manage_inventory, weight, height, length, width, \
              option_values, metadata) \
         VALUES ($1, $2, $3, $4, $5, $6, $7::jsonb, $8, \
                 $9, $10, $11, $12, $13, $14, \
                 $15::jsonb, $16::jsonb) \
         RETURNING {VARIANT_COLUMNS}"
    ))
    .bind(product_id)
    .bind(&variant.title)
    .bind(&variant.sku)
    .bind(&variant.barcode)
    .bind(&variant.ean)
    .bind(&variant.upc)
    .bind(to_json(&variant.prices)?)
    .bind(variant.inventory_quantity)
    .bind(variant.allow_backorder)
    .bind(variant.manage_inventory)
    .bind(variant.weight)
    .bind(variant.height)
    .bind(variant.length)
    .bind(variant.width)
    .bind(to_json(&variant.options)?)
    .bind(to_json(&variant.metadata)?)
    .fetch_one(pool)
    .await
    .map_err(StoreError::backend)?;

    row.into_variant()
}

/// Merges a partial update into the stored variant and writes it back.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] if the variant does not exist, or
/// [`StoreError::Backend`] if a query fails.
pub async fn update_variant(
    pool: &PgPool,
    variant_id: i64,
    update: VariantUpdate,
) -> Result<Variant, StoreError> {
    let row = sqlx::query_as::<_, VariantRow>(&format!(
        "SELECT {VARIANT_COLUMNS} FROM variants WHERE id = $1"
    ))
    .bind(variant_id)
    .fetch_optional(pool)
    .await
    .map_err(StoreError::backend)?
    .ok_or(StoreError::NotFound)?;

    let mut current = row.into_variant()?;

    if let Some(title) = update.title {
        current.title = title;
    }
    if let Some(sku) = update.sku {
        current.sku = sku;
    }
    if let Some(barcode) = update.barcode {
        current.barcode = barcode;
    }
    if let Some(ean) = update.ean {
        current.ean = ean;
    }
    if let Some(upc) = update.upc {
        current.upc = upc;
    }
    if let Some(prices) = update.prices {
        current.prices = prices;
    }
    if let Some(quantity) = update.inventory_quantity {
        current.inventory_quantity = quantity;
    }
    if let Some(allow_backorder) = update.allow_backorder {
        current.allow_backorder = allow_backorder;
    }
    if let Some(manage_inventory) = update.manage_inventory {
        current.manage_inventory = manage_inventory;
    }
    if let Some(options) = update.options {
        current.options = options;
    }

    sqlx::query(
        "UPDATE variants SET \
             title = $2, sku = $3, barcode = $4, ean = $5, upc = $6, prices = $7::jsonb, \
             inventory_quantity = $8, allow_backorder = $9, manage_inventory = $10, \
             option_values = $11::jsonb, updated_at = NOW() \
         WHERE id = $1",
    )
    .bind(variant_id)
    .bind(&current.title)
    .bind(&current.sku)
    .bind(&current.barcode)
    .bind(&current.ean)
    .bind(&current.upc)
    .bind(to_json(&current.prices)?)
    .bind(current.inventory_quantity)
    .bind(current.allow_backorder)
    .bind(current.manage_inventory)
    .bind(to_json(&current.options)?)
    .execute(pool)
    .await
    .map_err(StoreError::backend)?;

    Ok(current)
}

/// Deletes a variant.
///
/// # Errors
///
/// Returns [`StoreError::NotFound`] if the variant does not exist, or
/// [`StoreError::Backend`] if the delete fails.
pub async fn delete_variant(pool: &PgPool, variant_id: i64) -> Result<(), StoreError> {
    let result = sqlx::query("DELETE FROM variants WHERE id = $1")
        .bind(variant_id)
        .execute(pool)
        .await
        .map_err(StoreError::backend)?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound);
    }
    Ok(())
}
