use sqlx::PgPool;

use crate::entities::Brand;

const BRAND_COLUMNS: &str = "id, name, slug, description, brand_color, currency, country_id, \
     minimum_order_free_delivery, default_delivery_fee, price_markup_percentage, \
     free_delivery_eligible, minimum_spend, minimum_spend_extra_fee, default_concierge_fee, \
     delivery_types, shipping_modes, estimated_delivery_time";

pub struct BrandRepository;

impl BrandRepository {
    pub async fn by_id(pool: &PgPool, id: i32) -> Result<Brand, sqlx::Error> {
        let query = format!("SELECT {BRAND_COLUMNS} FROM brands WHERE id = $1");
        sqlx::query_as(&query).bind(id).fetch_one(pool).await
    }

    pub async fn upsert(pool: &PgPool, brand: &Brand) -> Result<(), sqlx::Error> {
        sqlx::query(
            "INSERT INTO brands (id, name, slug, description, brand_color, currency, country_id, \
                 minimum_order_free_delivery, default_delivery_fee, price_markup_percentage, \
                 free_delivery_eligible, minimum_spend, minimum_spend_extra_fee, \
                 default_concierge_fee, delivery_types, shipping_modes, estimated_delivery_time) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             ON CONFLICT (id) DO UPDATE SET \
                 name = EXCLUDED.name, \
                 slug = EXCLUDED.slug, \
                 description = EXCLUDED.description, \
                 brand_color = EXCLUDED.brand_color, \
                 currency = EXCLUDED.currency, \
                 country_id = EXCLUDED.country_id, \
                 minimum_order_free_delivery = EXCLUDED.minimum_order_free_delivery, \
                 default_delivery_fee = EXCLUDED.default_delivery_fee, \
                 price_markup_percentage = EXCLUDED.price_markup_percentage, \
                 free_delivery_eligible = EXCLUDED.free_delivery_eligible, \
                 minimum_spend = EXCLUDED.minimum_spend, \
                 minimum_spend_extra_fee = EXCLUDED.minimum_spend_extra_fee, \
                 default_concierge_fee = EXCLUDED.default_concierge_fee, \
                 delivery_types = EXCLUDED.delivery_types, \
                 shipping_modes = EXCLUDED.shipping_modes, \
                 estimated_delivery_time = EXCLUDED.estimated_delivery_time",
        )
        .bind(brand.id)
        .bind(&brand.name)
        .bind(&brand.slug)
        .bind(&brand.description)
        .bind(&brand.brand_color)
        .bind(&brand.currency)
        .bind(brand.country_id)
        .bind(&brand.minimum_order_free_delivery)
        .bind(&brand.default_delivery_fee)
        .bind(&brand.price_markup_percentage)
        .bind(brand.free_delivery_eligible)
        .bind(&brand.minimum_spend)
        .bind(&brand.minimum_spend_extra_fee)
        .bind(&brand.default_concierge_fee)
        .bind(&brand.delivery_types)
        .bind(&brand.shipping_modes)
        .bind(brand.estimated_delivery_time)
        .execute(pool)
        .await?;
        Ok(())
    }
}
