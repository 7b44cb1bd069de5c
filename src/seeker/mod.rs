//! Client for the upstream catalog backend.
//!
//! Transport failures are retried a fixed number of times with a fixed
//! pause; anything the upstream actually said (a non-200, a body that does
//! not decode) fails immediately, because repeating the request would just
//! repeat the answer.

pub mod errors;

pub use errors::SeekError;

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, ClientBuilder, StatusCode, header::ACCEPT};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tracing::debug;
use url::Url;

use crate::entities::{Brand, Product, Store};

/// Backend stores endpoint path.
const STORES_PATH: &str = "/api/stores";
/// Backend brands endpoint path.
const BRANDS_PATH: &str = "/api/brands";

const ACCEPT_V1: &str = "application/vnd.catalog+json;version=1";
const ACCEPT_V2: &str = "application/vnd.catalog+json;version=2";

/// One page of a store's products.
#[derive(Debug, Clone, PartialEq)]
pub struct ProductPage {
    pub products: Vec<Product>,
    pub total_pages: i32,
}

#[async_trait]
pub trait Seeker {
    /// All stores the upstream lists under an external key.
    async fn fetch_stores(&self, external_key: &str) -> Result<Vec<Store>, SeekError>;
    /// One brand by id.
    async fn fetch_brand(&self, brand_id: i32) -> Result<Brand, SeekError>;
    /// One page (1-based) of a store's products, with the page count.
    async fn fetch_products(&self, store_id: i32, page: i32) -> Result<ProductPage, SeekError>;
}

pub struct HttpSeeker {
    base_url: Url,
    retry_times: u32,
    retry_period: Duration,
    client: Client,
}

impl HttpSeeker {
    pub fn new(
        base_url: &str,
        timeout: Duration,
        retry_times: u32,
        retry_period: Duration,
    ) -> Result<Self, SeekError> {
        let base_url = Url::parse(base_url)?;
        let client = ClientBuilder::new()
            .timeout(timeout)
            .build()
            .expect("Failed to build HTTP client");
        Ok(Self {
            base_url,
            retry_times,
            retry_period,
            client,
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        operation: &'static str,
        url: Url,
        accept: &'static str,
    ) -> Result<T, SeekError> {
        let attempts = self.retry_times.max(1);
        let mut last_err = None;
        let mut response = None;
        for attempt in 1..=attempts {
            match self
                .client
                .get(url.clone())
                .header(ACCEPT, accept)
                .send()
                .await
            {
                Ok(resp) => {
                    response = Some(resp);
                    break;
                }
                Err(err) => {
                    debug!(
                        "{operation}: attempt {attempt}/{attempts} failed in transit: {err}"
                    );
                    last_err = Some(err);
                    if attempt < attempts {
                        tokio::time::sleep(self.retry_period).await;
                    }
                }
            }
        }

        let response = match (response, last_err) {
            (Some(resp), _) => resp,
            (None, Some(err)) => {
                return Err(SeekError::Transport {
                    operation,
                    url: url.to_string(),
                    message: err.to_string(),
                });
            }
            // attempts >= 1, so one arm always fires
            (None, None) => unreachable!("no response and no error after retry loop"),
        };

        let status = response.status();
        if status != StatusCode::OK {
            return Err(SeekError::Status {
                operation,
                url: url.to_string(),
                status,
            });
        }

        response.json().await.map_err(|err| SeekError::Decode {
            operation,
            url: url.to_string(),
            message: err.to_string(),
        })
    }
}

#[derive(Debug, Deserialize)]
struct ProductPageEnvelope {
    #[serde(default)]
    products: Vec<Product>,
    #[serde(default, alias = "Meta")]
    meta: PageMeta,
}

#[derive(Debug, Default, Deserialize)]
struct PageMeta {
    #[serde(default)]
    total_pages: i32,
}

#[async_trait]
impl Seeker for HttpSeeker {
    async fn fetch_stores(&self, external_key: &str) -> Result<Vec<Store>, SeekError> {
        let mut url = self.base_url.join(STORES_PATH)?;
        url.query_pairs_mut().append_pair("externalKey", external_key);
        self.get_json("fetch stores", url, ACCEPT_V1).await
    }

    async fn fetch_brand(&self, brand_id: i32) -> Result<Brand, SeekError> {
        let url = self.base_url.join(&format!("{BRANDS_PATH}/{brand_id}"))?;
        self.get_json("fetch brand", url, ACCEPT_V1).await
    }

    async fn fetch_products(&self, store_id: i32, page: i32) -> Result<ProductPage, SeekError> {
        let mut url = self.base_url.join(&format!("{STORES_PATH}/{store_id}"))?;
        url.query_pairs_mut().append_pair("page", &page.to_string());
        let envelope: ProductPageEnvelope =
            self.get_json("fetch products", url, ACCEPT_V2).await?;
        Ok(ProductPage {
            products: envelope.products,
            total_pages: envelope.meta.total_pages,
        })
    }
}
