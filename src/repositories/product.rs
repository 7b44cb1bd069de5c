use sqlx::PgPool;

use crate::entities::Product;

const PRODUCT_COLUMNS: &str = "id, title, description, image_url, preview_image_url, slug, \
     barcode, barcodes, unit_type, sold_by, amount_per_unit, size, status, image_url_basename, \
     currency, max_quantity, customer_notes_enabled, price, normal_price, brand_slug, \
     external_id, catalog_id, brand_id, is_alcohol";

pub struct ProductRepository;

impl ProductRepository {
    pub async fn by_ids(pool: &PgPool, ids: &[i32]) -> Result<Vec<Product>, sqlx::Error> {
        let query = format!("SELECT {PRODUCT_COLUMNS} FROM products WHERE id = ANY($1)");
        sqlx::query_as(&query).bind(ids).fetch_all(pool).await
    }

    pub async fn upsert(pool: &PgPool, product: &Product) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO products (id, title, description, image_url, preview_image_url, slug, \
                 barcode, barcodes, unit_type, sold_by, amount_per_unit, size, status, \
                 image_url_basename, currency, max_quantity, customer_notes_enabled, price, \
                 normal_price, brand_slug, external_id, catalog_id, brand_id, is_alcohol) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
                 $18, $19, $20, $21, $22, $23, $24) \
             ON CONFLICT (id) DO UPDATE SET \
                 title = EXCLUDED.title, \
                 description = EXCLUDED.description, \
                 image_url = EXCLUDED.image_url, \
                 preview_image_url = EXCLUDED.preview_image_url, \
                 slug = EXCLUDED.slug, \
                 barcode = EXCLUDED.barcode, \
                 barcodes = EXCLUDED.barcodes, \
                 unit_type = EXCLUDED.unit_type, \
                 sold_by = EXCLUDED.sold_by, \
                 amount_per_unit = EXCLUDED.amount_per_unit, \
                 size = EXCLUDED.size, \
                 status = EXCLUDED.status, \
                 image_url_basename = EXCLUDED.image_url_basename, \
                 currency = EXCLUDED.currency, \
                 max_quantity = EXCLUDED.max_quantity, \
                 customer_notes_enabled = EXCLUDED.customer_notes_enabled, \
                 price = EXCLUDED.price, \
                 normal_price = EXCLUDED.normal_price, \
                 brand_slug = EXCLUDED.brand_slug, \
                 external_id = EXCLUDED.external_id, \
                 catalog_id = EXCLUDED.catalog_id, \
                 brand_id = EXCLUDED.brand_id, \
                 is_alcohol = EXCLUDED.is_alcohol",
        )
        .bind(product.id)
        .bind(&product.title)
        .bind(&product.description)
        .bind(&product.image_url)
        .bind(&product.preview_image_url)
        .bind(&product.slug)
        .bind(&product.barcode)
        .bind(&product.barcodes)
        .bind(&product.unit_type)
        .bind(&product.sold_by)
        .bind(&product.amount_per_unit)
        .bind(&product.size)
        .bind(&product.status)
        .bind(&product.image_url_basename)
        .bind(&product.currency)
        .bind(&product.max_quantity)
        .bind(product.customer_notes_enabled)
        .bind(&product.price)
        .bind(&product.normal_price)
        .bind(&product.brand_slug)
        .bind(&product.external_id)
        .bind(product.catalog_id)
        .bind(product.brand_id)
        .bind(product.alcohol)
        .execute(pool)
        .await?;
        Ok(())
    }
}
