use reqwest::header::CONTENT_TYPE;
use tracing::{error, info};

use super::messages::{InitiateRequest, InitiateResponse};
use super::NegotiationError;

/// Path of the live session endpoint, relative to the API base URL
pub const LIVE_ENDPOINT_PATH: &str = "/v2/live";

/// Header carrying the API key
const API_KEY_HEADER: &str = "X-GLADIA-KEY";

pub struct SessionNegotiator {
    client: reqwest::Client,
    api_url: String,
    api_key: String,
}

impl SessionNegotiator {
    pub fn new(api_url: impl Into<String>, api_key: impl Into<String>) -> Self {
        Self {
            client: reqwest::Client::new(),
            api_url: api_url.into(),
            api_key: api_key.into(),
        }
    }

    /// Ask the server for a live session.
    ///
    /// Any non-2xx status is returned as [`NegotiationError::Rejected`] with the
    /// response body (or the canonical reason when the body is empty).
    pub async fn negotiate(
        &self,
        request: &InitiateRequest,
    ) -> Result<InitiateResponse, NegotiationError> {
        let endpoint = format!(
            "{}{}",
            self.api_url.trim_end_matches('/'),
            LIVE_ENDPOINT_PATH
        );
        info!("Initiating live session at {}", endpoint);

        let response = self
            .client
            .post(&endpoint)
            .header(CONTENT_TYPE, "application/json")
            .header(API_KEY_HEADER, &self.api_key)
            .json(request)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            let text = response.text().await.unwrap_or_default();
            let body = if text.trim().is_empty() {
                status.canonical_reason().unwrap_or("").to_string()
            } else {
                text
            };
            error!("Session negotiation rejected: {} {}", status.as_u16(), body);
            return Err(NegotiationError::Rejected {
                status: status.as_u16(),
                body,
            });
        }

        let bytes = response.bytes().await?;
        let session: InitiateResponse = serde_json::from_slice(&bytes)
            .map_err(|e| NegotiationError::InvalidResponse(e.to_string()))?;

        if session.url.is_empty() {
            return Err(NegotiationError::InvalidResponse(
                "empty streaming url".to_string(),
            ));
        }

        info!(
            "Live session initiated: id={}",
            session.id.as_deref().unwrap_or("<none>")
        );

        Ok(session)
    }
}
