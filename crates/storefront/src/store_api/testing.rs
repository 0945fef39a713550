//! Scripted transport for unit tests.

#![allow(clippy::unwrap_used)]

use std::collections::VecDeque;
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use rooh_core::CredentialUpdate;

use super::{CartTransport, StoreApiError, StoreRequest, StoreResponse};

enum Scripted {
    Response(StoreResponse),
    Unreachable,
}

/// Replays queued responses in order and records every request.
///
/// Running out of script yields a 500 so a test with a missing step fails
/// loudly instead of hanging.
#[derive(Default)]
pub struct ScriptedTransport {
    script: Mutex<VecDeque<Scripted>>,
    sent: Mutex<Vec<StoreRequest>>,
    delay: Mutex<Option<Duration>>,
}

impl ScriptedTransport {
    pub fn new() -> Self {
        Self::default()
    }

    /// Sleep this long inside every `send`.
    pub fn set_delay(&self, delay: Duration) {
        *self.delay.lock().unwrap() = Some(delay);
    }

    pub fn push_response(&self, status: u16, body: String, token: Option<&str>, nonce: Option<&str>) {
        self.script
            .lock()
            .unwrap()
            .push_back(Scripted::Response(StoreResponse {
                status: StatusCode::from_u16(status).unwrap(),
                credentials: CredentialUpdate::from_raw(token, nonce),
                body,
            }));
    }

    pub fn push_ok(&self, body: String, token: Option<&str>, nonce: Option<&str>) {
        self.push_response(200, body, token, nonce);
    }

    pub fn push_status(&self, status: u16, body: String) {
        self.push_response(status, body, None, None);
    }

    /// Queue a failure where no response arrives at all.
    pub fn push_unreachable(&self) {
        self.script.lock().unwrap().push_back(Scripted::Unreachable);
    }

    pub fn requests(&self) -> Vec<StoreRequest> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl CartTransport for ScriptedTransport {
    async fn send(&self, request: StoreRequest) -> Result<StoreResponse, StoreApiError> {
        self.sent.lock().unwrap().push(request);
        let delay = *self.delay.lock().unwrap();
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }

        let next = self.script.lock().unwrap().pop_front();
        match next {
            Some(Scripted::Response(response)) => Ok(response),
            Some(Scripted::Unreachable) => Err(StoreApiError::Http(transport_error())),
            None => Ok(StoreResponse {
                status: StatusCode::INTERNAL_SERVER_ERROR,
                credentials: CredentialUpdate::default(),
                body: r#"{"code":"script_exhausted","message":"no scripted response"}"#.to_string(),
            }),
        }
    }
}

/// A genuine `reqwest` error, the kind the real transport returns when no
/// response arrives.
fn transport_error() -> reqwest::Error {
    reqwest::Client::new().get("http://").build().unwrap_err()
}

/// A Store API error body for a nonce failure.
pub fn nonce_error(code: &str) -> String {
    serde_json::json!({
        "code": code,
        "message": "Nonce is invalid.",
        "data": { "status": 401 }
    })
    .to_string()
}

/// A Store API cart body with `(key, product_id, quantity)` lines at $10.00 each.
pub fn cart_json(lines: &[(&str, i64, u32)]) -> String {
    let currency = serde_json::json!({
        "currency_code": "USD",
        "currency_minor_unit": 2,
        "currency_symbol": "$"
    });
    let items: Vec<serde_json::Value> = lines
        .iter()
        .map(|(key, id, quantity)| {
            let line_total = (i64::from(*quantity) * 1000).to_string();
            serde_json::json!({
                "key": key,
                "id": id,
                "name": format!("Product {id}"),
                "quantity": quantity,
                "short_description": "",
                "images": [],
                "prices": merge(&currency, serde_json::json!({
                    "price": "1000", "regular_price": "1000", "sale_price": "1000"
                })),
                "totals": merge(&currency, serde_json::json!({
                    "line_subtotal": line_total, "line_total": line_total
                })),
            })
        })
        .collect();
    let count: u32 = lines.iter().map(|(_, _, quantity)| quantity).sum();
    let total = (i64::from(count) * 1000).to_string();

    serde_json::json!({
        "items": items,
        "items_count": count,
        "needs_shipping": !lines.is_empty(),
        "shipping_rates": [],
        "totals": merge(&currency, serde_json::json!({
            "total_items": total,
            "total_shipping": null,
            "total_tax": "0",
            "total_price": total
        })),
    })
    .to_string()
}

fn merge(base: &serde_json::Value, extra: serde_json::Value) -> serde_json::Value {
    let mut merged = base.clone();
    if let (Some(target), serde_json::Value::Object(fields)) = (merged.as_object_mut(), extra) {
        target.extend(fields);
    }
    merged
}
