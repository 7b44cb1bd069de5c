use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use utoipa::ToSchema;

/// --- Upstream / cached rows ---

/// A store as the upstream returns it and as the cache stores it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Store {
    pub id: i32,
    pub name: String,
    #[serde(rename = "pickupPoint")]
    #[sqlx(rename = "pick_up_point")]
    pub pickup_point: String,
    pub slug: String,
    pub brand_id: i32,
    pub address_id: i32,
    pub catalog_id: i32,
    pub priority: String,
    pub notes: String,
    pub description: String,
    pub image_url: String,
    pub closed: bool,
    pub temporarily_closed: bool,
    pub opens_at: Option<DateTime<Utc>>,
    pub estimated_delivery_time: i32,
    pub buffer_time: i32,
    pub store_type: String,
    pub delivery_types: Vec<String>,
    pub shipping_modes: Vec<String>,
    pub minimum_order_free_delivery: String,
    pub default_delivery_fee: String,
    pub free_delivery_eligible: bool,
    pub minimum_spend: String,
    pub minimum_spend_extra_fee: String,
    /// The discovery key the store was fetched under. Never serialized.
    #[serde(skip)]
    pub external_key: String,
    /// Embedded brand for `?fields=brand` responses. Not a column.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[sqlx(skip)]
    pub brand: Option<Brand>,
}

/// A brand as the upstream returns it. Fields marked `sqlx(skip)` only ever
/// travel over JSON.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Brand {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub description: String,
    #[sqlx(skip)]
    pub about: String,
    #[sqlx(skip)]
    pub image_url: String,
    #[sqlx(skip)]
    pub products_image_url: String,
    pub brand_color: String,
    pub currency: String,
    pub country_id: i32,
    pub minimum_order_free_delivery: String,
    pub default_delivery_fee: String,
    #[sqlx(skip)]
    pub same_store_price: bool,
    #[sqlx(skip)]
    pub brand_type: String,
    #[sqlx(skip)]
    pub promotion_text: String,
    #[sqlx(skip)]
    pub parent_brand_id: i32,
    #[sqlx(skip)]
    pub products_count: i32,
    #[sqlx(skip)]
    pub store_id: i32,
    pub price_markup_percentage: String,
    pub free_delivery_eligible: bool,
    pub estimated_delivery_time: i32,
    #[sqlx(skip)]
    pub closed: bool,
    #[sqlx(skip)]
    pub catalog_id: i32,
    #[serde(skip_serializing_if = "Option::is_none")]
    #[sqlx(skip)]
    pub opens_at: Option<DateTime<Utc>>,
    pub minimum_spend: String,
    pub minimum_spend_extra_fee: String,
    pub shipping_modes: Vec<String>,
    pub delivery_types: Vec<String>,
    pub default_concierge_fee: String,
}

impl Brand {
    /// Blank money fields render as "0.0" everywhere downstream.
    pub fn normalize(&mut self) {
        for field in [
            &mut self.minimum_order_free_delivery,
            &mut self.default_delivery_fee,
            &mut self.minimum_spend,
            &mut self.minimum_spend_extra_fee,
            &mut self.default_concierge_fee,
        ] {
            if field.is_empty() {
                "0.0".clone_into(field);
            }
        }
    }

    /// Overlays store-level overrides onto the brand, matching what the
    /// upstream backend does when it renders a brand for one store.
    pub fn merge_store(&mut self, store: &Store) {
        self.store_id = store.id;
        self.catalog_id = store.catalog_id;

        for (own, theirs) in [
            (&mut self.minimum_spend_extra_fee, &store.minimum_spend_extra_fee),
            (&mut self.minimum_spend, &store.minimum_spend),
            (&mut self.default_delivery_fee, &store.default_delivery_fee),
            (
                &mut self.minimum_order_free_delivery,
                &store.minimum_order_free_delivery,
            ),
        ] {
            if !theirs.is_empty() && theirs != "0.0" {
                theirs.clone_into(own);
            }
        }
        if !store.shipping_modes.is_empty() {
            self.shipping_modes = store.shipping_modes.clone();
        }
        if !store.delivery_types.is_empty() {
            self.delivery_types = store.delivery_types.clone();
        }
    }
}

/// Catalogs join stores to products. Only the id is tracked.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Catalog {
    pub id: i32,
}

/// A product as the upstream pages it out and as the cache stores it.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize, FromRow, ToSchema)]
#[serde(rename_all = "camelCase", default)]
pub struct Product {
    pub id: i32,
    pub title: String,
    pub description: String,
    pub image_url: String,
    pub preview_image_url: String,
    pub slug: String,
    pub barcodes: Vec<String>,
    /// Legacy single-barcode column. Never serialized.
    #[serde(skip)]
    pub barcode: String,
    pub unit_type: String,
    pub sold_by: String,
    pub amount_per_unit: String,
    pub size: String,
    pub status: String,
    pub image_url_basename: String,
    pub currency: String,
    pub max_quantity: String,
    pub customer_notes_enabled: bool,
    pub price: String,
    pub normal_price: String,
    pub brand_slug: String,
    pub external_id: String,
    /// Stamped from the owning store during sync. Never serialized.
    #[serde(skip)]
    pub catalog_id: i32,
    pub brand_id: i32,
    #[serde(rename = "alcohol")]
    #[sqlx(rename = "is_alcohol")]
    pub alcohol: bool,
}

/// One row of the product/barcode mapping table.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize, FromRow)]
#[serde(rename_all = "camelCase", default)]
pub struct Barcode {
    pub id: i32,
    pub product_id: i32,
    pub barcode: String,
    pub catalog_id: i32,
    pub is_active: bool,
}

/// --- Sync bookkeeping ---

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "lowercase")]
pub enum SyncOutcome {
    Success,
    Failed,
}

/// The record kept under the status key after every processed job.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct SyncStatus {
    pub last_sync_time: DateTime<Utc>,
    pub last_sync_status: SyncOutcome,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn normalize_defaults_blank_money_fields() {
        let mut brand = Brand {
            default_delivery_fee: "2.5".to_string(),
            ..Brand::default()
        };
        brand.normalize();

        assert_eq!(brand.minimum_order_free_delivery, "0.0");
        assert_eq!(brand.default_delivery_fee, "2.5");
        assert_eq!(brand.minimum_spend, "0.0");
        assert_eq!(brand.minimum_spend_extra_fee, "0.0");
        assert_eq!(brand.default_concierge_fee, "0.0");
    }

    #[test]
    fn merge_store_prefers_meaningful_store_values() {
        let store = Store {
            id: 7,
            catalog_id: 12,
            minimum_spend: "15.0".to_string(),
            default_delivery_fee: "0.0".to_string(),
            shipping_modes: vec!["delivery".to_string()],
            ..Store::default()
        };
        let mut brand = Brand {
            minimum_spend: "5.0".to_string(),
            default_delivery_fee: "3.0".to_string(),
            ..Brand::default()
        };
        brand.merge_store(&store);

        assert_eq!(brand.store_id, 7);
        assert_eq!(brand.catalog_id, 12);
        assert_eq!(brand.minimum_spend, "15.0");
        // "0.0" on the store is not an override.
        assert_eq!(brand.default_delivery_fee, "3.0");
        assert_eq!(brand.shipping_modes, vec!["delivery".to_string()]);
        assert!(brand.delivery_types.is_empty());
    }
}
