use std::collections::HashMap;

use axum::{
    Form, Json,
    extract::{Path, Query, State},
    http::StatusCode,
    response::{IntoResponse, Response},
};
use chrono::Utc;
use tracing::{error, warn};

use crate::app_state::AppState;
use crate::catalog::dtos::{
    ErrorResponse, ProductsQuery, StatusResponse, StoresQuery, SyncProductsForm, SyncStoreForm,
    TriggeredResponse,
};
use crate::entities::{Brand, Product, Store};
use crate::jobs::Job;
use crate::middleware::BasicAuthed;
use crate::service::ServiceError;

/// Failures as the API reports them. The variant payload is the internal
/// cause; clients only ever see the fixed envelope message.
#[derive(Debug)]
pub enum ApiError {
    Internal(String),
    InvalidAttribute(String),
    NotFound(String),
    MissingParameters(String),
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, message, detail) = match self {
            ApiError::Internal(detail) => (
                StatusCode::INTERNAL_SERVER_ERROR,
                "Internal Server Error",
                detail,
            ),
            ApiError::InvalidAttribute(detail) => (
                StatusCode::BAD_REQUEST,
                "You passed an invalid value for the attributes.",
                detail,
            ),
            ApiError::NotFound(detail) => (StatusCode::NOT_FOUND, "Record Not Found", detail),
            ApiError::MissingParameters(detail) => {
                (StatusCode::BAD_REQUEST, "Missing Parameters", detail)
            }
        };
        error!("Request failed: {detail}");

        (
            status,
            Json(ErrorResponse {
                error: message.to_string(),
            }),
        )
            .into_response()
    }
}

fn is_store_type_valid(store_type: &str) -> bool {
    matches!(store_type, "" | "habitat" | "value_store")
}

fn parse_id(raw: &str) -> Result<i32, ApiError> {
    raw.parse()
        .map_err(|_| ApiError::InvalidAttribute(format!("id {raw:?} is not an integer")))
}

/// Brand lookup with the lookup-specific status mapping: a missing brand is
/// the caller's 404, anything else is ours.
async fn fetch_brand(state: &AppState, id: i32) -> Result<Brand, ApiError> {
    state.service.get_brand(id).await.map_err(|err| match err {
        ServiceError::NotFound => ApiError::NotFound(format!("brand {id} is not cached")),
        other => ApiError::Internal(format!("get brand {id}: {other}")),
    })
}

/// A miss on an external key queues a re-discovery job before the 404 goes
/// out, so the next lookup has a chance of hitting.
async fn not_found_with_repush(state: &AppState, external_key: &str) -> ApiError {
    let mut detail = format!("no stores cached under external key {external_key:?}");
    if let Err(err) = state
        .service
        .push_job(&Job::ExternalKey(external_key.to_string()))
        .await
    {
        detail = format!("{detail}; re-discovery push failed: {err}");
    }
    ApiError::NotFound(detail)
}

#[utoipa::path(
    get,
    path = "/api/v1/products",
    tag = "catalog",
    params(ProductsQuery),
    responses(
        (status = 200, description = "Products matching the barcode filter", body = Vec<Product>),
        (status = 400, description = "Missing external key or unknown store type", body = ErrorResponse),
        (status = 404, description = "No stores cached under the external key", body = ErrorResponse)
    )
)]
pub async fn get_products(
    State(state): State<AppState>,
    Query(query): Query<ProductsQuery>,
) -> Result<Json<Vec<Product>>, ApiError> {
    if query.external_key.is_empty() {
        return Err(ApiError::MissingParameters(
            "external key is empty".to_string(),
        ));
    }
    if !is_store_type_valid(&query.store_type) {
        return Err(ApiError::InvalidAttribute(format!(
            "unknown store type {:?}",
            query.store_type
        )));
    }
    let barcodes = query.barcode_list();

    let stores = state
        .service
        .select_stores(&query.external_key, &query.store_type)
        .await
        .map_err(|err| ApiError::Internal(format!("select stores: {err}")))?;
    let Some(store) = stores.first() else {
        return Err(not_found_with_repush(&state, &query.external_key).await);
    };

    let pids = state
        .service
        .get_product_ids(store.catalog_id, &barcodes)
        .await
        .map_err(|err| ApiError::Internal(format!("get product ids: {err}")))?;
    if pids.is_empty() {
        return Ok(Json(vec![]));
    }

    let products = state
        .service
        .get_products(&pids)
        .await
        .map_err(|err| ApiError::Internal(format!("get products: {err}")))?;
    Ok(Json(products))
}

#[utoipa::path(
    get,
    path = "/api/v1/brands/{id}",
    tag = "catalog",
    params(("id" = i32, Path, description = "Brand id")),
    responses(
        (status = 200, description = "Brand with store-level overrides applied", body = Brand),
        (status = 404, description = "Brand is not cached", body = ErrorResponse)
    )
)]
pub async fn get_brand(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Brand>, ApiError> {
    let id = parse_id(&id)?;
    let mut brand = fetch_brand(&state, id).await?;

    // Any failure here is internal, a brand without a store included.
    let store = state
        .service
        .get_store_by_brand_id(brand.id)
        .await
        .map_err(|err| ApiError::Internal(format!("get store of brand {id}: {err}")))?;

    brand.normalize();
    brand.merge_store(&store);
    Ok(Json(brand))
}

#[utoipa::path(
    get,
    path = "/api/v1/stores",
    tag = "catalog",
    params(StoresQuery),
    responses(
        (status = 200, description = "Stores under the external key", body = Vec<Store>),
        (status = 400, description = "Unknown store type", body = ErrorResponse)
    )
)]
pub async fn get_stores(
    State(state): State<AppState>,
    Query(query): Query<StoresQuery>,
) -> Result<Json<Vec<Store>>, ApiError> {
    if !is_store_type_valid(&query.store_type) {
        return Err(ApiError::InvalidAttribute(format!(
            "unknown store type {:?}",
            query.store_type
        )));
    }

    let mut stores = state
        .service
        .select_stores(&query.external_key, &query.store_type)
        .await
        .map_err(|err| ApiError::Internal(format!("select stores: {err}")))?;

    if query.fields == "brand" {
        let mut brands: HashMap<i32, Brand> = HashMap::new();
        for store in &mut stores {
            if !brands.contains_key(&store.brand_id) {
                let brand = fetch_brand(&state, store.brand_id).await?;
                brands.insert(store.brand_id, brand);
            }
            store.brand = brands.get(&store.brand_id).cloned();
        }
    }

    Ok(Json(stores))
}

#[utoipa::path(
    post,
    path = "/api/v1/products",
    tag = "sync",
    request_body(content = SyncProductsForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Sync jobs queued", body = TriggeredResponse),
        (status = 401, description = "Bad credentials", body = ErrorResponse)
    )
)]
pub async fn sync_products(
    _auth: BasicAuthed,
    State(state): State<AppState>,
    Form(form): Form<SyncProductsForm>,
) -> Result<Json<TriggeredResponse>, ApiError> {
    let keys: Vec<&str> = form
        .external_keys
        .split(',')
        .map(str::trim)
        .filter(|key| !key.is_empty())
        .collect();

    for key in &keys {
        state
            .service
            .push_job(&Job::ExternalKey(key.to_string()))
            .await
            .map_err(|err| ApiError::Internal(format!("push job for external key {key:?}: {err}")))?;
    }

    Ok(Json(TriggeredResponse {
        message: format!("triggered catalog sync for external keys {keys:?}"),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/stores/{id}",
    tag = "sync",
    params(("id" = i32, Path, description = "Store id")),
    request_body(content = SyncStoreForm, content_type = "application/x-www-form-urlencoded"),
    responses(
        (status = 200, description = "Sync job queued", body = TriggeredResponse),
        (status = 400, description = "Bad id or missing external key", body = ErrorResponse),
        (status = 401, description = "Bad credentials", body = ErrorResponse)
    )
)]
pub async fn sync_store(
    _auth: BasicAuthed,
    State(state): State<AppState>,
    Path(id): Path<String>,
    Form(form): Form<SyncStoreForm>,
) -> Result<Json<TriggeredResponse>, ApiError> {
    let id = parse_id(&id)?;
    if form.external_key.is_empty() {
        return Err(ApiError::InvalidAttribute(
            "external key is empty".to_string(),
        ));
    }

    state
        .service
        .push_job(&Job::StoreId {
            external_key: form.external_key.clone(),
            id,
        })
        .await
        .map_err(|err| ApiError::Internal(format!("push job for store {id}: {err}")))?;

    Ok(Json(TriggeredResponse {
        message: format!(
            "triggered catalog sync for store {id} under external key {:?}",
            form.external_key
        ),
    }))
}

#[utoipa::path(
    post,
    path = "/api/v1/brands/{id}",
    tag = "sync",
    params(("id" = i32, Path, description = "Brand id")),
    responses(
        (status = 200, description = "Sync job queued", body = TriggeredResponse),
        (status = 400, description = "Bad id", body = ErrorResponse),
        (status = 401, description = "Bad credentials", body = ErrorResponse)
    )
)]
pub async fn sync_brand(
    _auth: BasicAuthed,
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<TriggeredResponse>, ApiError> {
    let id = parse_id(&id)?;

    state
        .service
        .push_job(&Job::BrandId(id))
        .await
        .map_err(|err| ApiError::Internal(format!("push job for brand {id}: {err}")))?;

    Ok(Json(TriggeredResponse {
        message: format!("triggered catalog sync for brand {id}"),
    }))
}

#[utoipa::path(
    get,
    path = "/api/v1/status",
    tag = "status",
    responses(
        (status = 200, description = "Service version and last sync outcome", body = StatusResponse)
    )
)]
pub async fn get_status(State(state): State<AppState>) -> Json<StatusResponse> {
    // Probes key off the status code, so this stays 200 and the record is
    // best effort.
    let sync_status = match state.service.get_sync_status().await {
        Ok(status) => status,
        Err(err) => {
            warn!("Failed to read sync status: {err}");
            None
        }
    };

    Json(StatusResponse {
        app_version: env!("CARGO_PKG_VERSION").to_string(),
        server_time: Utc::now(),
        sync_status,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    use std::sync::{Arc, Mutex};
    use std::time::Duration;

    use axum::{
        Router,
        body::{Body, to_bytes},
        http::{Request, header::AUTHORIZATION, header::CONTENT_TYPE},
    };
    use base64::Engine;
    use base64::engine::general_purpose::STANDARD as BASE64;
    use serde_json::Value;
    use sqlx::{Pool, Postgres};
    use tower::ServiceExt;

    use crate::app_state::BasicAuthCredentials;
    use crate::catalog::api_router;
    use crate::entities::{SyncOutcome, SyncStatus};
    use crate::jobs::{JobQueue, QueueError};
    use crate::service::MockCatalogService;

    fn create_test_pool() -> Pool<Postgres> {
        Pool::<Postgres>::connect_lazy("postgresql://dummy").expect("Failed to create test pool")
    }

    fn create_test_app(service: MockCatalogService) -> Router {
        let queue = JobQueue::new(
            "redis://127.0.0.1:6379/1",
            "test_jobs",
            "test_status",
            Duration::from_secs(1),
        )
        .expect("Failed to create test queue");
        let state = AppState {
            service: Arc::new(service),
            db_pool: create_test_pool(),
            queue: Arc::new(queue),
            basic_auth: BasicAuthCredentials {
                user: "admin".to_string(),
                password: "hunter2".to_string(),
            },
        };
        api_router(state)
    }

    fn basic_auth() -> String {
        format!("Basic {}", BASE64.encode("admin:hunter2"))
    }

    async fn send(app: Router, request: Request<Body>) -> (StatusCode, Value) {
        let response = app.oneshot(request).await.unwrap();
        let status = response.status();
        let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        let json = serde_json::from_slice(&body).unwrap_or(Value::Null);
        (status, json)
    }

    fn get(uri: &str) -> Request<Body> {
        Request::builder()
            .method("GET")
            .uri(uri)
            .body(Body::empty())
            .unwrap()
    }

    fn post_form(uri: &str, body: &str, authed: bool) -> Request<Body> {
        let mut builder = Request::builder()
            .method("POST")
            .uri(uri)
            .header(CONTENT_TYPE, "application/x-www-form-urlencoded");
        if authed {
            builder = builder.header(AUTHORIZATION, basic_auth());
        }
        builder.body(Body::from(body.to_string())).unwrap()
    }

    fn store_with_catalog(id: i32, catalog_id: i32) -> Store {
        Store {
            id,
            catalog_id,
            ..Store::default()
        }
    }

    #[tokio::test]
    async fn get_products_without_external_key_is_missing_parameters() {
        let app = create_test_app(MockCatalogService::new());

        let (status, body) = send(app, get("/api/v1/products")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "Missing Parameters");
    }

    #[tokio::test]
    async fn get_products_rejects_unknown_store_type() {
        let app = create_test_app(MockCatalogService::new());

        let (status, body) =
            send(app, get("/api/v1/products?externalKey=7-11&storeType=mall")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "You passed an invalid value for the attributes.");
    }

    #[tokio::test]
    async fn get_products_filters_by_store_catalog() {
        let mut service = MockCatalogService::new();
        service
            .expect_select_stores()
            .withf(|key, store_type| key == "7-11" && store_type.is_empty())
            .returning(|_, _| Ok(vec![store_with_catalog(1, 5)]));
        service
            .expect_get_product_ids()
            .withf(|catalog_id, barcodes| *catalog_id == 5 && *barcodes == ["111", "222"])
            .returning(|_, _| Ok(vec![9]));
        service
            .expect_get_products()
            .withf(|ids| *ids == [9])
            .returning(|_| {
                Ok(vec![Product {
                    id: 9,
                    ..Product::default()
                }])
            });
        let app = create_test_app(service);

        let (status, body) = send(
            app,
            get("/api/v1/products?externalKey=7-11&barcodes=111,%20222"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body.as_array().unwrap().len(), 1);
        assert_eq!(body[0]["id"], 9);
    }

    #[tokio::test]
    async fn get_products_accepts_snake_case_parameters() {
        let mut service = MockCatalogService::new();
        service
            .expect_select_stores()
            .withf(|key, store_type| key == "7-11" && store_type == "habitat")
            .returning(|_, _| Ok(vec![store_with_catalog(1, 5)]));
        service
            .expect_get_product_ids()
            .returning(|_, _| Ok(vec![]));
        let app = create_test_app(service);

        let (status, body) = send(
            app,
            get("/api/v1/products?external_key=7-11&store_type=habitat"),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body, serde_json::json!([]));
    }

    #[tokio::test]
    async fn get_products_miss_queues_a_rediscovery() {
        let mut service = MockCatalogService::new();
        service
            .expect_select_stores()
            .returning(|_, _| Ok(vec![]));
        service
            .expect_push_job()
            .withf(|job| *job == Job::ExternalKey("ghost".to_string()))
            .times(1)
            .returning(|_| Ok(()));
        let app = create_test_app(service);

        let (status, body) = send(app, get("/api/v1/products?externalKey=ghost")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Record Not Found");
    }

    #[tokio::test]
    async fn get_products_miss_stays_404_when_the_repush_fails() {
        let mut service = MockCatalogService::new();
        service
            .expect_select_stores()
            .returning(|_, _| Ok(vec![]));
        service
            .expect_push_job()
            .returning(|_| Err(ServiceError::Queue(QueueError::ConnectTimeout(
                Duration::from_secs(1),
            ))));
        let app = create_test_app(service);

        let (status, body) = send(app, get("/api/v1/products?externalKey=ghost")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Record Not Found");
    }

    #[tokio::test]
    async fn get_brand_applies_store_overrides() {
        let mut service = MockCatalogService::new();
        service.expect_get_brand().withf(|id| *id == 7).returning(|id| {
            Ok(Brand {
                id,
                slug: "lawson".to_string(),
                minimum_spend: "5.0".to_string(),
                ..Brand::default()
            })
        });
        service
            .expect_get_store_by_brand_id()
            .withf(|brand_id| *brand_id == 7)
            .returning(|_| {
                Ok(Store {
                    id: 31,
                    catalog_id: 12,
                    minimum_spend: "15.0".to_string(),
                    ..Store::default()
                })
            });
        let app = create_test_app(service);

        let (status, body) = send(app, get("/api/v1/brands/7")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["id"], 7);
        assert_eq!(body["storeId"], 31);
        assert_eq!(body["catalogId"], 12);
        assert_eq!(body["minimumSpend"], "15.0");
        // normalize() fills the money fields the store did not override.
        assert_eq!(body["defaultDeliveryFee"], "0.0");
    }

    #[tokio::test]
    async fn get_brand_unknown_id_is_not_found() {
        let mut service = MockCatalogService::new();
        service
            .expect_get_brand()
            .returning(|_| Err(ServiceError::NotFound));
        let app = create_test_app(service);

        let (status, body) = send(app, get("/api/v1/brands/404404")).await;
        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["error"], "Record Not Found");
    }

    #[tokio::test]
    async fn get_brand_non_integer_id_is_invalid() {
        let app = create_test_app(MockCatalogService::new());

        let (status, body) = send(app, get("/api/v1/brands/lawson")).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "You passed an invalid value for the attributes.");
    }

    #[tokio::test]
    async fn get_brand_store_lookup_failure_is_internal() {
        let mut service = MockCatalogService::new();
        service
            .expect_get_brand()
            .returning(|id| Ok(Brand { id, ..Brand::default() }));
        service
            .expect_get_store_by_brand_id()
            .returning(|_| Err(ServiceError::NotFound));
        let app = create_test_app(service);

        let (status, body) = send(app, get("/api/v1/brands/7")).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body["error"], "Internal Server Error");
    }

    #[tokio::test]
    async fn get_stores_lists_without_brands_by_default() {
        let mut service = MockCatalogService::new();
        service.expect_select_stores().returning(|_, _| {
            Ok(vec![store_with_catalog(1, 5), store_with_catalog(2, 6)])
        });
        let app = create_test_app(service);

        let (status, body) = send(app, get("/api/v1/stores?externalKey=7-11")).await;
        assert_eq!(status, StatusCode::OK);
        let stores = body.as_array().unwrap();
        assert_eq!(stores.len(), 2);
        assert!(stores[0].get("brand").is_none());
    }

    #[tokio::test]
    async fn get_stores_embeds_each_brand_once() {
        let mut service = MockCatalogService::new();
        service.expect_select_stores().returning(|_, _| {
            Ok(vec![
                Store {
                    id: 1,
                    brand_id: 4,
                    ..Store::default()
                },
                Store {
                    id: 2,
                    brand_id: 4,
                    ..Store::default()
                },
                Store {
                    id: 3,
                    brand_id: 5,
                    ..Store::default()
                },
            ])
        });
        service
            .expect_get_brand()
            .times(2)
            .returning(|id| Ok(Brand { id, ..Brand::default() }));
        let app = create_test_app(service);

        let (status, body) = send(app, get("/api/v1/stores?fields=brand")).await;
        assert_eq!(status, StatusCode::OK);
        let stores = body.as_array().unwrap();
        assert_eq!(stores[0]["brand"]["id"], 4);
        assert_eq!(stores[1]["brand"]["id"], 4);
        assert_eq!(stores[2]["brand"]["id"], 5);
    }

    #[tokio::test]
    async fn sync_products_requires_credentials() {
        let app = create_test_app(MockCatalogService::new());

        let (status, body) = send(
            app,
            post_form("/api/v1/products", "externalKeys=7-11", false),
        )
        .await;
        assert_eq!(status, StatusCode::UNAUTHORIZED);
        assert_eq!(body["error"], "Unauthorized");
    }

    #[tokio::test]
    async fn sync_products_queues_one_job_per_key() {
        let pushed = Arc::new(Mutex::new(Vec::new()));
        let recorder = pushed.clone();

        let mut service = MockCatalogService::new();
        service.expect_push_job().times(3).returning(move |job| {
            recorder.lock().unwrap().push(job.clone());
            Ok(())
        });
        let app = create_test_app(service);

        let (status, _body) = send(
            app,
            post_form("/api/v1/products", "externalKeys=a,%20b,,c", true),
        )
        .await;
        assert_eq!(status, StatusCode::OK);

        let jobs = pushed.lock().unwrap().clone();
        let keys: Vec<String> = jobs
            .iter()
            .map(|job| match job {
                Job::ExternalKey(key) => key.clone(),
                other => panic!("unexpected job {other:?}"),
            })
            .collect();
        assert_eq!(keys, vec!["a", "b", "c"]);
    }

    #[tokio::test]
    async fn sync_store_requires_an_external_key() {
        let app = create_test_app(MockCatalogService::new());

        let (status, body) = send(app, post_form("/api/v1/stores/3", "", true)).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["error"], "You passed an invalid value for the attributes.");
    }

    #[tokio::test]
    async fn sync_store_queues_a_store_job() {
        let mut service = MockCatalogService::new();
        service
            .expect_push_job()
            .withf(|job| {
                *job == Job::StoreId {
                    external_key: "7-11".to_string(),
                    id: 3,
                }
            })
            .times(1)
            .returning(|_| Ok(()));
        let app = create_test_app(service);

        let (status, _body) = send(
            app,
            post_form("/api/v1/stores/3", "externalKey=7-11", true),
        )
        .await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn sync_brand_queues_a_brand_job() {
        let mut service = MockCatalogService::new();
        service
            .expect_push_job()
            .withf(|job| *job == Job::BrandId(12))
            .times(1)
            .returning(|_| Ok(()));
        let app = create_test_app(service);

        let (status, _body) = send(app, post_form("/api/v1/brands/12", "", true)).await;
        assert_eq!(status, StatusCode::OK);
    }

    #[tokio::test]
    async fn status_reports_the_last_sync() {
        let mut service = MockCatalogService::new();
        service.expect_get_sync_status().returning(|| {
            Ok(Some(SyncStatus {
                last_sync_time: Utc::now(),
                last_sync_status: SyncOutcome::Success,
            }))
        });
        let app = create_test_app(service);

        let (status, body) = send(app, get("/api/v1/status")).await;
        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["appVersion"], env!("CARGO_PKG_VERSION"));
        assert_eq!(body["syncStatus"]["lastSyncStatus"], "success");
    }

    #[tokio::test]
    async fn status_stays_200_when_the_record_is_unreadable() {
        let mut service = MockCatalogService::new();
        service.expect_get_sync_status().returning(|| {
            Err(ServiceError::Queue(QueueError::ConnectTimeout(
                Duration::from_secs(1),
            )))
        });
        let app = create_test_app(service);

        let (status, body) = send(app, get("/api/v1/status")).await;
        assert_eq!(status, StatusCode::OK);
        assert!(body["syncStatus"].is_null());
    }
}
