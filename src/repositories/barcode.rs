use std::collections::HashSet;

use sqlx::PgPool;

pub struct BarcodeRepository;

impl BarcodeRepository {
    /// Product ids carrying any of the given active barcodes in a catalog.
    /// An empty barcode list matches the whole catalog.
    pub async fn product_ids(
        pool: &PgPool,
        catalog_id: i32,
        barcodes: &[String],
    ) -> Result<Vec<i32>, sqlx::Error> {
        sqlx::query_scalar(
            "SELECT product_id FROM barcodes \
             WHERE catalog_id = $1 AND is_active = true \
               AND (cardinality($2::text[]) = 0 OR barcode = ANY($2))",
        )
        .bind(catalog_id)
        .bind(barcodes)
        .fetch_all(pool)
        .await
    }

    /// Replaces the active barcode set of one product in one catalog.
    ///
    /// Rows are never deleted: barcodes that disappeared upstream are
    /// deactivated, known ones re-activated, new ones inserted active.
    pub async fn replace_active(
        pool: &PgPool,
        product_id: i32,
        catalog_id: i32,
        barcodes: &[String],
    ) -> Result<(), sqlx::Error> {
        let mut tx = pool.begin().await?;

        let existing: Vec<String> = sqlx::query_scalar(
            "SELECT barcode FROM barcodes WHERE product_id = $1 AND catalog_id = $2",
        )
        .bind(product_id)
        .bind(catalog_id)
        .fetch_all(&mut *tx)
        .await?;
        let existing: HashSet<&str> = existing.iter().map(String::as_str).collect();

        sqlx::query("UPDATE barcodes SET is_active = false WHERE product_id = $1 AND catalog_id = $2")
            .bind(product_id)
            .bind(catalog_id)
            .execute(&mut *tx)
            .await?;

        let (survivors, newcomers): (Vec<&str>, Vec<&str>) = barcodes
            .iter()
            .map(String::as_str)
            .partition(|barcode| existing.contains(barcode));

        if !survivors.is_empty() {
            sqlx::query(
                "UPDATE barcodes SET is_active = true \
                 WHERE product_id = $1 AND catalog_id = $2 AND barcode = ANY($3)",
            )
            .bind(product_id)
            .bind(catalog_id)
            .bind(&survivors)
            .execute(&mut *tx)
            .await?;
        }

        if !newcomers.is_empty() {
            sqlx::query(
                "INSERT INTO barcodes (product_id, barcode, catalog_id, is_active) \
                 SELECT $1, unnest($3::text[]), $2, true",
            )
            .bind(product_id)
            .bind(catalog_id)
            .bind(&newcomers)
            .execute(&mut *tx)
            .await?;
        }

        tx.commit().await
    }
}
