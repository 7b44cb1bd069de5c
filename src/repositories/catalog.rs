use sqlx::PgPool;

use crate::entities::Catalog;

pub struct CatalogRepository;

impl CatalogRepository {
    /// Catalogs carry no data beyond their id, so a known id is left alone.
    pub async fn upsert(pool: &PgPool, catalog: &Catalog) -> Result<(), sqlx::Error> {
        sqlx::query("INSERT INTO catalogs (id) VALUES ($1) ON CONFLICT (id) DO NOTHING")
            .bind(catalog.id)
            .execute(pool)
            .await?;
        Ok(())
    }
}
