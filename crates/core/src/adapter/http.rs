//! HTTP implementation of the ad-server adapter.

use std::collections::BTreeMap;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use tracing::{debug, warn};

use crate::bidders::{Bidder, BidderSetting};
use crate::config::AdapterConfig;

use super::{
    AdServerAdapter, AdapterError, CreateRequest, LicaConfig, OrderId, OrderState,
};

/// Adapter talking to the site's REST API over HTTP.
pub struct HttpAdServerAdapter {
    client: Client,
    config: AdapterConfig,
}

impl HttpAdServerAdapter {
    /// Create a new HTTP adapter.
    ///
    /// No request timeout is applied unless `timeout_secs` is configured:
    /// creating a large batch of associations can legitimately take minutes.
    pub fn new(config: AdapterConfig) -> Result<Self, AdapterError> {
        let mut builder = Client::builder();
        if let Some(secs) = config.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder
            .build()
            .map_err(|e| AdapterError::Request(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Get the base URL without trailing slash.
    fn base_url(&self) -> &str {
        self.config.url.trim_end_matches('/')
    }

    fn url(&self, endpoint: &str) -> String {
        format!("{}/{}", self.base_url(), endpoint.trim_start_matches('/'))
    }

    fn authorize(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.config.username {
            Some(username) => request.basic_auth(username, self.config.password.as_deref()),
            None => request,
        }
    }

    async fn get_json<T: DeserializeOwned>(&self, endpoint: &str) -> Result<T, AdapterError> {
        let url = self.url(endpoint);
        debug!("GET {}", url);
        let response = self.authorize(self.client.get(&url)).send().await?;
        Self::decode(response).await
    }

    async fn post_json<B, T>(&self, endpoint: &str, body: &B) -> Result<T, AdapterError>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        let url = self.url(endpoint);
        debug!("POST {}", url);
        let response = self
            .authorize(self.client.post(&url))
            .json(body)
            .send()
            .await?;
        Self::decode(response).await
    }

    async fn decode<T: DeserializeOwned>(response: Response) -> Result<T, AdapterError> {
        let status = response.status();
        if status.is_success() {
            return response.json::<T>().await.map_err(AdapterError::from);
        }

        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);
        if status.as_u16() == 404 {
            return Err(AdapterError::NotFound(message));
        }
        warn!("Ad server returned HTTP {}: {}", status, message);
        Err(AdapterError::api(status.as_u16(), message))
    }
}

/// Extract the message of a REST error body (`{"code", "message", "data"}`),
/// falling back to the start of the raw body.
fn error_message(body: &str) -> String {
    #[derive(Deserialize)]
    struct RestError {
        message: String,
    }

    match serde_json::from_str::<RestError>(body) {
        Ok(err) => err.message,
        Err(_) => body.chars().take(200).collect(),
    }
}

/// Bidder entry of the `GET bidders` response, keyed by bidder key.
#[derive(Debug, Deserialize)]
struct BidderPayload {
    name: String,
    #[serde(default)]
    active_key: Option<String>,
    #[serde(default)]
    settings: Vec<BidderSetting>,
}

fn into_bidders(payload: BTreeMap<String, BidderPayload>) -> Vec<Bidder> {
    payload
        .into_iter()
        .map(|(key, entry)| {
            let active_setting_key = entry
                .active_key
                .or_else(|| entry.settings.first().map(|s| s.key.clone()))
                .unwrap_or_else(|| key.clone());
            Bidder {
                key,
                name: entry.name,
                active_setting_key,
                settings: entry.settings,
            }
        })
        .collect()
}

#[derive(Serialize)]
struct ArchiveBody {
    id: OrderId,
}

#[async_trait]
impl AdServerAdapter for HttpAdServerAdapter {
    fn name(&self) -> &str {
        "http"
    }

    async fn create(&self, request: CreateRequest) -> Result<OrderState, AdapterError> {
        self.post_json("bidding/gam/create", &request).await
    }

    async fn lica_config(&self, order_id: OrderId) -> Result<LicaConfig, AdapterError> {
        let endpoint = format!(
            "bidding/gam/lica_config?id={}",
            urlencoding::encode(&order_id.to_string())
        );
        self.get_json(&endpoint).await.map_err(|e| match e {
            AdapterError::NotFound(_) => AdapterError::NotFound(order_id.to_string()),
            other => other,
        })
    }

    async fn order(&self, order_id: OrderId) -> Result<OrderState, AdapterError> {
        let endpoint = format!(
            "bidding/gam/order?id={}",
            urlencoding::encode(&order_id.to_string())
        );
        self.get_json(&endpoint).await.map_err(|e| match e {
            AdapterError::NotFound(_) => AdapterError::NotFound(order_id.to_string()),
            other => other,
        })
    }

    async fn bidders(&self) -> Result<Vec<Bidder>, AdapterError> {
        let payload: BTreeMap<String, BidderPayload> = self.get_json("bidders").await?;
        Ok(into_bidders(payload))
    }

    async fn archive_order(&self, order_id: OrderId) -> Result<(), AdapterError> {
        let _: serde_json::Value = self
            .post_json("bidding/gam/archive", &ArchiveBody { id: order_id })
            .await?;
        Ok(())
    }
}
