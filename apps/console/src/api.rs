//! # Backend Client
//!
//! HTTP access to the inventory API.
//!
//! ## Endpoints Used
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Inventory API Endpoints                            │
//! │                                                                         │
//! │  GET  /api/products/  ──► products with nested variants (catalog)      │
//! │  GET  /api/variants/  ──► every variant with current stock (snapshot)  │
//! │  POST /api/invoices/  ──► create invoice, decrements stock             │
//! │                           400 ──► classify_rejection()                 │
//! │                           5xx ──► Unexpected (or stock text, see below)│
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! List endpoints answer either with a bare array or, when pagination is
//! enabled server side, with `{"count": .., "results": [..]}`. Both shapes are
//! accepted.

use async_trait::async_trait;
use reqwest::{Client, RequestBuilder, StatusCode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;
use tracing::{debug, error, warn};

use iicm_core::submission::{self, InvoicePayload, RemoteRejection};
use iicm_core::{ProductRecord, VariantRecord};

use crate::config::ConsoleConfig;

const PRODUCTS_PATH: &str = "/api/products/";
const VARIANTS_PATH: &str = "/api/variants/";
const INVOICES_PATH: &str = "/api/invoices/";

// =============================================================================
// Errors
// =============================================================================

/// Failures talking to the inventory API.
#[derive(Debug, Error)]
pub enum ClientError {
    /// The request never got a response (DNS, refused, timeout).
    #[error("Request to {url} failed: {reason}")]
    Transport { url: String, reason: String },

    /// A read endpoint answered with a non-2xx status.
    #[error("{url} responded {status}")]
    Status { url: String, status: u16 },

    /// The response body was not what the endpoint promises.
    #[error("Could not read response from {url}: {reason}")]
    Decode { url: String, reason: String },

    /// The invoice endpoint refused the invoice.
    #[error("Invoice rejected: {0}")]
    Rejected(RemoteRejection),
}

// =============================================================================
// Backend Trait
// =============================================================================

/// The invoice created by the backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CreatedInvoice {
    pub id: Value,
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub total: Option<Value>,
    #[serde(default)]
    pub total_in_riel: Option<Value>,
}

/// What the invoice session needs from the backend.
///
/// Implemented by [`BackendClient`] over HTTP, and by in-memory fakes in tests.
#[async_trait]
pub trait Backend: Send + Sync {
    /// Full catalog with nested variants.
    async fn list_products(&self) -> Result<Vec<ProductRecord>, ClientError>;

    /// Fresh stock snapshot for every variant.
    async fn list_variants(&self) -> Result<Vec<VariantRecord>, ClientError>;

    /// Creates the invoice; all-or-nothing on the backend side.
    async fn create_invoice(&self, payload: &InvoicePayload) -> Result<CreatedInvoice, ClientError>;
}

// =============================================================================
// HTTP Client
// =============================================================================

/// `reqwest`-based [`Backend`].
#[derive(Debug, Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
    token: Option<String>,
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Listing<T> {
    Page { results: Vec<T> },
    Plain(Vec<T>),
}

impl<T> Listing<T> {
    fn into_vec(self) -> Vec<T> {
        match self {
            Listing::Page { results } => results,
            Listing::Plain(items) => items,
        }
    }
}

impl BackendClient {
    pub fn new(config: &ConsoleConfig) -> Result<Self, ClientError> {
        let client = Client::builder()
            .timeout(config.http_timeout)
            .build()
            .map_err(|e| ClientError::Transport {
                url: config.api_url.clone(),
                reason: e.to_string(),
            })?;

        Ok(BackendClient {
            client,
            base_url: config.api_url.clone(),
            token: config.api_token.clone(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{}", self.base_url, path)
    }

    fn authorized(&self, request: RequestBuilder) -> RequestBuilder {
        match &self.token {
            Some(token) => request.bearer_auth(token),
            None => request,
        }
    }

    async fn get_list<T: DeserializeOwned>(&self, path: &str) -> Result<Vec<T>, ClientError> {
        let url = self.url(path);
        debug!(%url, "GET");

        let response = self
            .authorized(self.client.get(&url))
            .send()
            .await
            .map_err(|e| {
                error!("Failed to send GET request to {}: {}", url, e);
                ClientError::Transport {
                    url: url.clone(),
                    reason: e.to_string(),
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            warn!(%url, status = status.as_u16(), "list request failed");
            return Err(ClientError::Status {
                url,
                status: status.as_u16(),
            });
        }

        let listing: Listing<T> = response.json().await.map_err(|e| ClientError::Decode {
            url: url.clone(),
            reason: e.to_string(),
        })?;
        let items = listing.into_vec();
        debug!(%url, count = items.len(), "list received");
        Ok(items)
    }
}

#[async_trait]
impl Backend for BackendClient {
    async fn list_products(&self) -> Result<Vec<ProductRecord>, ClientError> {
        self.get_list(PRODUCTS_PATH).await
    }

    async fn list_variants(&self) -> Result<Vec<VariantRecord>, ClientError> {
        self.get_list(VARIANTS_PATH).await
    }

    async fn create_invoice(&self, payload: &InvoicePayload) -> Result<CreatedInvoice, ClientError> {
        let url = self.url(INVOICES_PATH);
        debug!(%url, items = payload.items.len(), "POST invoice");

        let response = self
            .authorized(self.client.post(&url))
            .json(payload)
            .send()
            .await
            .map_err(|e| {
                error!("Failed to send POST request to {}: {}", url, e);
                ClientError::Transport {
                    url: url.clone(),
                    reason: e.to_string(),
                }
            })?;

        let status = response.status();
        let text = response.text().await.map_err(|e| ClientError::Decode {
            url: url.clone(),
            reason: e.to_string(),
        })?;

        if status.is_success() {
            return serde_json::from_str(&text).map_err(|e| ClientError::Decode {
                url,
                reason: e.to_string(),
            });
        }

        Err(ClientError::Rejected(rejection_from_response(status, &text)))
    }
}

/// Classifies a failed invoice POST from its status and raw body.
///
/// Stock checks that fire inside the backend's save hooks surface as a 500
/// with the message somewhere in the body; those are still reported as stock
/// issues so the user sees one vocabulary.
pub fn rejection_from_response(status: StatusCode, text: &str) -> RemoteRejection {
    let body = serde_json::from_str::<Value>(text).unwrap_or_else(|_| Value::String(text.to_string()));
    let rejection = submission::classify_rejection(status.as_u16(), &body);

    match rejection {
        RemoteRejection::Unexpected { .. } => match submission::stock_issue_from_value(&body) {
            Some(issue) => RemoteRejection::Validation {
                issues: vec![issue],
            },
            None => rejection,
        },
        validation => validation,
    }
}

// =============================================================================
// Unit Tests
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;
    use iicm_core::invoice::{InvoiceDraft, LineField};
    use iicm_core::submission::{build_payload, InvoiceHeader, SubmissionIssue};
    use iicm_core::{CustomerId, PaymentMethod};
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{header, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn client_for(server: &MockServer, token: Option<&str>) -> BackendClient {
        let config = ConsoleConfig {
            api_url: server.uri(),
            api_token: token.map(str::to_string),
            tax_rate: iicm_core::Percent::from_whole(10),
            exchange_rate: iicm_core::ExchangeRate::default(),
            http_timeout: Duration::from_secs(5),
        };
        BackendClient::new(&config).unwrap()
    }

    fn payload() -> InvoicePayload {
        let mut draft = InvoiceDraft::default();
        let product: ProductRecord = serde_json::from_value(json!({
            "id": 1, "name": "T-Shirt",
            "variants": [{"id": 3, "size": "M", "stock": 5, "selling_price": "10.00"}]
        }))
        .unwrap();
        draft
            .select_product_variant(0, Some(&product), &product.variants[0])
            .unwrap();
        draft.update_line_item(0, LineField::Quantity, "2").unwrap();

        let date = NaiveDate::from_ymd_opt(2026, 10, 18).unwrap();
        let header = InvoiceHeader {
            customer_id: CustomerId::new(4),
            due_date: Some(date),
            payment_method: Some(PaymentMethod::Cash),
            ..InvoiceHeader::dated(date)
        };
        build_payload(&header, &draft).unwrap()
    }

    #[tokio::test]
    async fn test_list_variants_sends_bearer_token() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/variants/"))
            .and(header("Authorization", "Bearer secret"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"id": 3, "product": 1, "size": "M", "stock": 4, "selling_price": "19.99"}
            ])))
            .mount(&server)
            .await;

        let variants = client_for(&server, Some("secret"))
            .list_variants()
            .await
            .unwrap();
        assert_eq!(variants.len(), 1);
        assert_eq!(variants[0].stock(), 4);
    }

    #[tokio::test]
    async fn test_list_products_accepts_paginated_response() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/products/"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "count": 1,
                "next": null,
                "results": [{"id": 1, "name": "T-Shirt", "variants": []}]
            })))
            .mount(&server)
            .await;

        let products = client_for(&server, None).list_products().await.unwrap();
        assert_eq!(products.len(), 1);
        assert_eq!(products[0].name, "T-Shirt");
    }

    #[tokio::test]
    async fn test_list_error_status() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/api/variants/"))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let err = client_for(&server, None).list_variants().await.unwrap_err();
        assert!(matches!(err, ClientError::Status { status: 401, .. }));
    }

    #[tokio::test]
    async fn test_create_invoice_posts_payload() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/invoices/"))
            .respond_with(ResponseTemplate::new(201).set_body_json(json!({
                "id": 42, "status": "PENDING", "total": 22.0, "total_in_riel": 90200.0
            })))
            .mount(&server)
            .await;

        let created = client_for(&server, None)
            .create_invoice(&payload())
            .await
            .unwrap();
        assert_eq!(created.id, json!(42));

        let requests = server.received_requests().await.unwrap();
        let body: Value = serde_json::from_slice(&requests[0].body).unwrap();
        assert_eq!(body["customer_id"], json!(4));
        assert_eq!(body["items"][0]["variant_id"], json!(3));
        assert_eq!(body["items"][0]["quantity"], json!(2));
    }

    #[tokio::test]
    async fn test_create_invoice_stock_rejection() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/api/invoices/"))
            .respond_with(ResponseTemplate::new(400).set_body_json(json!({
                "non_field_errors": [
                    "Insufficient stock for variant T-Shirt - M. Requested: 2, Available: 1"
                ]
            })))
            .mount(&server)
            .await;

        let err = client_for(&server, None)
            .create_invoice(&payload())
            .await
            .unwrap_err();
        match err {
            ClientError::Rejected(rejection) => {
                assert!(rejection.is_stock_conflict());
                assert_eq!(
                    rejection.issues(),
                    &[SubmissionIssue::InsufficientStock {
                        item: "T-Shirt - M".to_string(),
                        available: 1,
                        requested: 2,
                    }]
                );
            }
            other => panic!("expected rejection, got {:?}", other),
        }
    }

    #[test]
    fn test_server_error_with_stock_text() {
        let rejection = rejection_from_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "ValueError: Insufficient stock for Cap (Variant: None): 0 available, 1 requested",
        );
        assert!(rejection.is_stock_conflict());

        let rejection = rejection_from_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            "ValueError at /api/invoices/\n\
             Insufficient stock for Cap (Variant: None): 0 available, 1 requested\n\
             \n\
             Request Method: POST",
        );
        assert_eq!(
            rejection.issues(),
            &[SubmissionIssue::InsufficientStock {
                item: "Cap (Variant: None)".to_string(),
                available: 0,
                requested: 1,
            }]
        );

        let rejection = rejection_from_response(
            StatusCode::INTERNAL_SERVER_ERROR,
            r#"{"error": "Insufficient stock for variant Cap. Requested: 3, Available: 1"}"#,
        );
        assert!(rejection.is_stock_conflict());

        let rejection = rejection_from_response(StatusCode::BAD_GATEWAY, "<html>bad gateway</html>");
        assert!(matches!(rejection, RemoteRejection::Unexpected { status: 502, .. }));
    }
}
