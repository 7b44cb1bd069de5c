use sqlx::PgPool;

use crate::entities::Store;

const STORE_COLUMNS: &str = "id, name, pick_up_point, slug, brand_id, address_id, catalog_id, \
     priority, notes, description, image_url, closed, temporarily_closed, opens_at, \
     estimated_delivery_time, buffer_time, shipping_modes, delivery_types, store_type, \
     minimum_order_free_delivery, default_delivery_fee, free_delivery_eligible, \
     minimum_spend, minimum_spend_extra_fee, external_key";

pub struct StoreRepository;

impl StoreRepository {
    /// Every external key the cache has seen, duplicates included.
    pub async fn external_keys(pool: &PgPool) -> Result<Vec<String>, sqlx::Error> {
        sqlx::query_scalar("SELECT external_key FROM stores")
            .fetch_all(pool)
            .await
    }

    /// Stores filtered by external key and store type; an empty filter
    /// matches everything.
    pub async fn select(
        pool: &PgPool,
        external_key: &str,
        store_type: &str,
    ) -> Result<Vec<Store>, sqlx::Error> {
        let query = format!(
            "SELECT {STORE_COLUMNS} FROM stores \
             WHERE ($1 = '' OR external_key = $1) AND ($2 = '' OR store_type = $2)"
        );
        sqlx::query_as(&query)
            .bind(external_key)
            .bind(store_type)
            .fetch_all(pool)
            .await
    }

    pub async fn by_id(pool: &PgPool, id: i32) -> Result<Store, sqlx::Error> {
        let query = format!("SELECT {STORE_COLUMNS} FROM stores WHERE id = $1 LIMIT 1");
        sqlx::query_as(&query).bind(id).fetch_one(pool).await
    }

    /// The first store of a brand, matching how the upstream backend
    /// resolves brand-level display data.
    pub async fn by_brand_id(pool: &PgPool, brand_id: i32) -> Result<Store, sqlx::Error> {
        let query = format!("SELECT {STORE_COLUMNS} FROM stores WHERE brand_id = $1 LIMIT 1");
        sqlx::query_as(&query).bind(brand_id).fetch_one(pool).await
    }

    pub async fn upsert(pool: &PgPool, store: &Store) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO stores (id, name, pick_up_point, slug, brand_id, address_id, catalog_id, \
                 priority, notes, description, image_url, closed, temporarily_closed, opens_at, \
                 estimated_delivery_time, buffer_time, shipping_modes, delivery_types, store_type, \
                 minimum_order_free_delivery, default_delivery_fee, free_delivery_eligible, \
                 minimum_spend, minimum_spend_extra_fee, external_key) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17, \
                 $18, $19, $20, $21, $22, $23, $24, $25) \
             ON CONFLICT (id) DO UPDATE SET \
                 name = EXCLUDED.name, \
                 pick_up_point = EXCLUDED.pick_up_point, \
                 slug = EXCLUDED.slug, \
                 brand_id = EXCLUDED.brand_id, \
                 address_id = EXCLUDED.address_id, \
                 catalog_id = EXCLUDED.catalog_id, \
                 priority = EXCLUDED.priority, \
                 notes = EXCLUDED.notes, \
                 description = EXCLUDED.description, \
                 image_url = EXCLUDED.image_url, \
                 closed = EXCLUDED.closed, \
                 temporarily_closed = EXCLUDED.temporarily_closed, \
                 opens_at = EXCLUDED.opens_at, \
                 estimated_delivery_time = EXCLUDED.estimated_delivery_time, \
                 buffer_time = EXCLUDED.buffer_time, \
                 shipping_modes = EXCLUDED.shipping_modes, \
                 delivery_types = EXCLUDED.delivery_types, \
                 store_type = EXCLUDED.store_type, \
                 minimum_order_free_delivery = EXCLUDED.minimum_order_free_delivery, \
                 default_delivery_fee = EXCLUDED.default_delivery_fee, \
                 free_delivery_eligible = EXCLUDED.free_delivery_eligible, \
                 minimum_spend = EXCLUDED.minimum_spend, \
                 minimum_spend_extra_fee = EXCLUDED.minimum_spend_extra_fee, \
                 external_key = EXCLUDED.external_key",
        )
        .bind(store.id)
        .bind(&store.name)
        .bind(&store.pickup_point)
        .bind(&store.slug)
        .bind(store.brand_id)
        .bind(store.address_id)
        .bind(store.catalog_id)
        .bind(&store.priority)
        .bind(&store.notes)
        .bind(&store.description)
        .bind(&store.image_url)
        .bind(store.closed)
        .bind(store.temporarily_closed)
        .bind(store.opens_at)
        .bind(store.estimated_delivery_time)
        .bind(store.buffer_time)
        .bind(&store.shipping_modes)
        .bind(&store.delivery_types)
        .bind(&store.store_type)
        .bind(&store.minimum_order_free_delivery)
        .bind(&store.default_delivery_fee)
        .bind(store.free_delivery_eligible)
        .bind(&store.minimum_spend)
        .bind(&store.minimum_spend_extra_fee)
        .bind(&store.external_key)
        .execute(pool)
        .await?;
        Ok(())
    }
}
