use std::sync::Arc;

use anyhow::Context;

use crate::entities::{Barcode, Catalog, Store};
use crate::processor::pool::WorkerHandle;
use crate::seeker::Seeker;
use crate::service::CatalogService;

/// Drives one job's fan-out tree. Cloned into every forked task.
///
/// The per-store sequence is strict: brand, then catalog, then the store
/// row, then products. Product pages fork as siblings of the store task,
/// never awaited by it, so a failed branch stops its own descendants and
/// nothing else.
#[derive(Clone)]
pub(crate) struct Executor {
    pub(crate) service: Arc<dyn CatalogService + Send + Sync>,
    pub(crate) seeker: Arc<dyn Seeker + Send + Sync>,
    pub(crate) handle: WorkerHandle,
}

impl Executor {
    /// Root task for an external-key job: one store task per upstream store.
    pub(crate) async fn sync_external_key(self, external_key: String) -> anyhow::Result<()> {
        let stores = self
            .seeker
            .fetch_stores(&external_key)
            .await
            .with_context(|| format!("fetch stores for external key {external_key:?}"))?;
        for store in stores {
            let exec = self.clone();
            let key = external_key.clone();
            self.handle.fork(exec.sync_store_tree(store, key));
        }
        Ok(())
    }

    /// Root task for a store-id job. An id the upstream no longer lists is
    /// not an error; the job just has nothing to do.
    pub(crate) async fn sync_single_store(self, external_key: String, id: i32) -> anyhow::Result<()> {
        let stores = self
            .seeker
            .fetch_stores(&external_key)
            .await
            .with_context(|| format!("fetch stores for external key {external_key:?}"))?;
        match stores.into_iter().find(|store| store.id == id) {
            Some(store) => self.sync_store_tree(store, external_key).await,
            None => Ok(()),
        }
    }

    /// Root task for a brand-id job.
    pub(crate) async fn sync_brand_only(self, brand_id: i32) -> anyhow::Result<()> {
        self.sync_brand(brand_id).await?;
        Ok(())
    }

    /// One store's branch: brand, catalog, store row, then product pages.
    async fn sync_store_tree(self, mut store: Store, external_key: String) -> anyhow::Result<()> {
        let brand_slug = self.sync_brand(store.brand_id).await?;

        self.service
            .sync_catalog(&Catalog { id: store.catalog_id })
            .await
            .with_context(|| format!("sync catalog {} of store {}", store.catalog_id, store.id))?;

        store.external_key = external_key;
        self.service
            .sync_store(&store)
            .await
            .with_context(|| format!("sync store {}", store.id))?;

        // Page 1 inline; it tells us how many siblings to fork.
        let total_pages = self.sync_product_page(&store, &brand_slug, 1).await?;
        for page in 2..=total_pages {
            let exec = self.clone();
            let store = store.clone();
            let slug = brand_slug.clone();
            self.handle.fork(async move {
                exec.sync_product_page(&store, &slug, page).await?;
                Ok(())
            });
        }
        Ok(())
    }

    /// Fetches and upserts a brand, returning its slug for product stamping.
    async fn sync_brand(&self, brand_id: i32) -> anyhow::Result<String> {
        let brand = self
            .seeker
            .fetch_brand(brand_id)
            .await
            .with_context(|| format!("fetch brand {brand_id}"))?;
        self.service
            .sync_brand(&brand)
            .await
            .with_context(|| format!("sync brand {brand_id}"))?;
        Ok(brand.slug)
    }

    /// Upserts one page of a store's products and their barcode sets.
    /// Products without barcodes are dropped on the floor; the cache only
    /// answers barcode lookups.
    async fn sync_product_page(
        &self,
        store: &Store,
        brand_slug: &str,
        page: i32,
    ) -> anyhow::Result<i32> {
        let product_page = self
            .seeker
            .fetch_products(store.id, page)
            .await
            .with_context(|| format!("fetch products page {page} of store {}", store.id))?;

        for mut product in product_page.products {
            if product.barcodes.is_empty() {
                continue;
            }
            product.catalog_id = store.catalog_id;
            product.brand_id = store.brand_id;
            product.brand_slug = brand_slug.to_string();
            self.service
                .sync_product(&product)
                .await
                .with_context(|| format!("sync product {}", product.id))?;

            let batch: Vec<Barcode> = product
                .barcodes
                .iter()
                .map(|code| Barcode {
                    id: 0,
                    product_id: product.id,
                    barcode: code.clone(),
                    catalog_id: product.catalog_id,
                    is_active: true,
                })
                .collect();
            self.service
                .sync_barcodes(&batch)
                .await
                .with_context(|| format!("sync barcodes of product {}", product.id))?;
        }
        Ok(product_page.total_pages)
    }
}
