//! The storage facade shared by the API handlers, the processor and the
//! periodic trigger. Everything behind one trait so call sites stay
//! mockable.

use std::sync::Arc;

use async_trait::async_trait;
#[cfg(test)]
use mockall::automock;
use sqlx::PgPool;

use crate::entities::{Barcode, Brand, Catalog, Product, Store, SyncStatus};
use crate::jobs::{Job, JobQueue, QueueError};
use crate::repositories::{
    BarcodeRepository, BrandRepository, CatalogRepository, ProductRepository, StoreRepository,
};

#[cfg_attr(test, automock)]
#[async_trait]
pub trait CatalogService {
    // --- job queue ---
    async fn push_job(&self, job: &Job) -> Result<(), ServiceError>;
    async fn pop_job(&self) -> Result<Job, ServiceError>;
    async fn update_sync_status(&self, status: &SyncStatus) -> Result<(), ServiceError>;
    async fn get_sync_status(&self) -> Result<Option<SyncStatus>, ServiceError>;

    // --- sync writes ---
    async fn sync_catalog(&self, catalog: &Catalog) -> Result<(), ServiceError>;
    async fn sync_brand(&self, brand: &Brand) -> Result<(), ServiceError>;
    async fn sync_store(&self, store: &Store) -> Result<(), ServiceError>;
    async fn sync_product(&self, product: &Product) -> Result<(), ServiceError>;
    /// Replaces one product's active barcode set. The whole batch must
    /// belong to a single product and catalog.
    async fn sync_barcodes(&self, barcodes: &[Barcode]) -> Result<(), ServiceError>;

    // --- cached reads ---
    async fn get_external_keys(&self) -> Result<Vec<String>, ServiceError>;
    async fn get_brand(&self, id: i32) -> Result<Brand, ServiceError>;
    async fn get_store_by_id(&self, id: i32) -> Result<Store, ServiceError>;
    async fn get_store_by_brand_id(&self, brand_id: i32) -> Result<Store, ServiceError>;
    async fn select_stores(
        &self,
        external_key: &str,
        store_type: &str,
    ) -> Result<Vec<Store>, ServiceError>;
    async fn get_product_ids(
        &self,
        catalog_id: i32,
        barcodes: &[String],
    ) -> Result<Vec<i32>, ServiceError>;
    async fn get_products(&self, ids: &[i32]) -> Result<Vec<Product>, ServiceError>;
}

/// Postgres + Redis implementation of [`CatalogService`].
pub struct Service {
    pool: PgPool,
    queue: Arc<JobQueue>,
}

impl Service {
    pub fn new(pool: PgPool, queue: Arc<JobQueue>) -> Self {
        Self { pool, queue }
    }
}

#[async_trait]
impl CatalogService for Service {
    async fn push_job(&self, job: &Job) -> Result<(), ServiceError> {
        Ok(self.queue.push_job(job).await?)
    }

    async fn pop_job(&self) -> Result<Job, ServiceError> {
        Ok(self.queue.pop_job().await?)
    }

    async fn update_sync_status(&self, status: &SyncStatus) -> Result<(), ServiceError> {
        Ok(self.queue.update_sync_status(status).await?)
    }

    async fn get_sync_status(&self) -> Result<Option<SyncStatus>, ServiceError> {
        Ok(self.queue.get_sync_status().await?)
    }

    async fn sync_catalog(&self, catalog: &Catalog) -> Result<(), ServiceError> {
        Ok(CatalogRepository::upsert(&self.pool, catalog).await?)
    }

    async fn sync_brand(&self, brand: &Brand) -> Result<(), ServiceError> {
        Ok(BrandRepository::upsert(&self.pool, brand).await?)
    }

    async fn sync_store(&self, store: &Store) -> Result<(), ServiceError> {
        Ok(StoreRepository::upsert(&self.pool, store).await?)
    }

    async fn sync_product(&self, product: &Product) -> Result<(), ServiceError> {
        Ok(ProductRepository::upsert(&self.pool, product).await?)
    }

    async fn sync_barcodes(&self, barcodes: &[Barcode]) -> Result<(), ServiceError> {
        let Some((product_id, catalog_id, distinct)) = validate_barcode_batch(barcodes)? else {
            return Ok(());
        };
        Ok(BarcodeRepository::replace_active(&self.pool, product_id, catalog_id, &distinct).await?)
    }

    async fn get_external_keys(&self) -> Result<Vec<String>, ServiceError> {
        Ok(StoreRepository::external_keys(&self.pool).await?)
    }

    async fn get_brand(&self, id: i32) -> Result<Brand, ServiceError> {
        Ok(BrandRepository::by_id(&self.pool, id).await?)
    }

    async fn get_store_by_id(&self, id: i32) -> Result<Store, ServiceError> {
        Ok(StoreRepository::by_id(&self.pool, id).await?)
    }

    async fn get_store_by_brand_id(&self, brand_id: i32) -> Result<Store, ServiceError> {
        Ok(StoreRepository::by_brand_id(&self.pool, brand_id).await?)
    }

    async fn select_stores(
        &self,
        external_key: &str,
        store_type: &str,
    ) -> Result<Vec<Store>, ServiceError> {
        Ok(StoreRepository::select(&self.pool, external_key, store_type).await?)
    }

    async fn get_product_ids(
        &self,
        catalog_id: i32,
        barcodes: &[String],
    ) -> Result<Vec<i32>, ServiceError> {
        Ok(BarcodeRepository::product_ids(&self.pool, catalog_id, barcodes).await?)
    }

    async fn get_products(&self, ids: &[i32]) -> Result<Vec<Product>, ServiceError> {
        Ok(ProductRepository::by_ids(&self.pool, ids).await?)
    }
}

/// Checks a barcode batch for a single (product, catalog) owner and strips
/// duplicate codes. `None` when the batch is empty.
fn validate_barcode_batch(
    barcodes: &[Barcode],
) -> Result<Option<(i32, i32, Vec<String>)>, ServiceError> {
    let Some(first) = barcodes.first() else {
        return Ok(None);
    };

    let mut distinct = Vec::with_capacity(barcodes.len());
    for row in barcodes {
        if row.product_id != first.product_id {
            return Err(ServiceError::Validation(format!(
                "barcode batch mixes product ids {} and {}",
                first.product_id, row.product_id
            )));
        }
        if row.catalog_id != first.catalog_id {
            return Err(ServiceError::Validation(format!(
                "barcode batch mixes catalog ids {} and {}",
                first.catalog_id, row.catalog_id
            )));
        }
        if !distinct.contains(&row.barcode) {
            distinct.push(row.barcode.clone());
        }
    }

    Ok(Some((first.product_id, first.catalog_id, distinct)))
}

#[derive(Debug, thiserror::Error)]
pub enum ServiceError {
    #[error("record not found")]
    NotFound,

    #[error("invalid data: {0}")]
    Validation(String),

    #[error("database query failed: {0}")]
    Database(sqlx::Error),

    #[error("job queue failed: {0}")]
    Queue(#[from] QueueError),
}

impl ServiceError {
    /// True when a pop found the queue empty, the idle case of polling.
    pub fn is_queue_empty(&self) -> bool {
        matches!(self, ServiceError::Queue(QueueError::Empty))
    }
}

impl From<sqlx::Error> for ServiceError {
    fn from(err: sqlx::Error) -> Self {
        match err {
            sqlx::Error::RowNotFound => ServiceError::NotFound,
            other => ServiceError::Database(other),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn row(product_id: i32, catalog_id: i32, barcode: &str) -> Barcode {
        Barcode {
            product_id,
            catalog_id,
            barcode: barcode.to_string(),
            is_active: true,
            ..Barcode::default()
        }
    }

    #[test]
    fn empty_batch_is_a_no_op() {
        assert!(validate_barcode_batch(&[]).unwrap().is_none());
    }

    #[test]
    fn batch_must_share_one_product() {
        let err = validate_barcode_batch(&[row(1, 5, "111"), row(2, 5, "222")]).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn batch_must_share_one_catalog() {
        let err = validate_barcode_batch(&[row(1, 5, "111"), row(1, 6, "222")]).unwrap_err();
        assert!(matches!(err, ServiceError::Validation(_)));
    }

    #[test]
    fn duplicate_codes_collapse() {
        let (product_id, catalog_id, distinct) =
            validate_barcode_batch(&[row(1, 5, "111"), row(1, 5, "111"), row(1, 5, "222")])
                .unwrap()
                .unwrap();
        assert_eq!(product_id, 1);
        assert_eq!(catalog_id, 5);
        assert_eq!(distinct, vec!["111".to_string(), "222".to_string()]);
    }

    #[test]
    fn row_not_found_maps_to_not_found() {
        let err = ServiceError::from(sqlx::Error::RowNotFound);
        assert!(matches!(err, ServiceError::NotFound));
    }
}
