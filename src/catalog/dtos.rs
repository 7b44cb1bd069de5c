use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::entities::SyncStatus;

/// Error envelope every failing endpoint returns.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct ErrorResponse {
    pub error: String,
}

/// Query parameters of `GET /api/v1/products`. Each name is accepted in
/// camelCase and in snake_case.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(default)]
pub struct ProductsQuery {
    #[serde(rename = "externalKey", alias = "external_key")]
    #[param(rename = "externalKey")]
    pub external_key: String,
    #[serde(rename = "storeType", alias = "store_type")]
    #[param(rename = "storeType")]
    pub store_type: String,
    /// Comma-separated list of barcodes to filter by.
    pub barcodes: String,
}

impl ProductsQuery {
    /// Splits the raw barcodes parameter, dropping blanks.
    pub fn barcode_list(&self) -> Vec<String> {
        self.barcodes
            .split(',')
            .map(str::trim)
            .filter(|code| !code.is_empty())
            .map(str::to_string)
            .collect()
    }
}

/// Query parameters of `GET /api/v1/stores`.
#[derive(Debug, Default, Deserialize, IntoParams)]
#[serde(default)]
pub struct StoresQuery {
    #[serde(rename = "externalKey", alias = "external_key")]
    #[param(rename = "externalKey")]
    pub external_key: String,
    #[serde(rename = "storeType", alias = "store_type")]
    #[param(rename = "storeType")]
    pub store_type: String,
    /// `brand` embeds each store's brand record.
    pub fields: String,
}

/// Form body of `POST /api/v1/products`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct SyncProductsForm {
    /// Comma-separated external keys to queue discovery jobs for.
    #[serde(rename = "externalKeys", alias = "external_keys")]
    pub external_keys: String,
}

/// Form body of `POST /api/v1/stores/{id}`.
#[derive(Debug, Default, Deserialize, ToSchema)]
#[serde(default)]
pub struct SyncStoreForm {
    #[serde(rename = "externalKey", alias = "external_key")]
    pub external_key: String,
}

/// Acknowledgement body of the sync trigger endpoints.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct TriggeredResponse {
    pub message: String,
}

/// Body of `GET /api/v1/status`, served 200 unconditionally for probes.
#[derive(Debug, Serialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct StatusResponse {
    pub app_version: String,
    pub server_time: DateTime<Utc>,
    pub sync_status: Option<SyncStatus>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn barcode_list_trims_and_drops_blanks() {
        let query = ProductsQuery {
            barcodes: " 111, ,222 ,,333".to_string(),
            ..ProductsQuery::default()
        };
        assert_eq!(query.barcode_list(), vec!["111", "222", "333"]);
    }

    #[test]
    fn barcode_list_of_empty_parameter_is_empty() {
        let query = ProductsQuery::default();
        assert!(query.barcode_list().is_empty());
    }
}
