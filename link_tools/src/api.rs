use std::sync::Arc;

use log::*;
use reqwest::{header::HeaderValue, Client, Response};
use serde::de::DeserializeOwned;
use serde_json::Value;

use crate::{
    config::LinkConfig,
    data_objects::{CreateLinkBody, CreateLinkResponse, CreatePaymentLinkRequest, PaymentLink, PaymentStatusReport},
    LinkApiError,
};

#[derive(Clone)]
pub struct LinkApi {
    config: LinkConfig,
    client: Arc<Client>,
}

impl LinkApi {
    pub fn new(config: LinkConfig) -> Result<Self, LinkApiError> {
        let client = Client::builder()
            .timeout(config.timeout)
            .build()
            .map_err(|e| LinkApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn url(&self, path: &str) -> String {
        format!("{}{path}", self.config.base_url)
    }

    /// Opens a hosted checkout for the order and returns the payable link.
    pub async fn create_payment_link(&self, request: &CreatePaymentLinkRequest) -> Result<PaymentLink, LinkApiError> {
        let url = self.url("/api/payment-link/create-link");
        let business_id = business_id_header(&request.business_id)?;
        let body = CreateLinkBody::from(request);
        debug!("🔗 Creating payment link for order {} ({} {})", request.order_name, request.amount, request.currency);
        let response = self
            .client
            .post(url)
            .header("X-Business-ID", business_id)
            .json(&body)
            .send()
            .await
            .map_err(|e| LinkApiError::Unavailable(e.to_string()))?;
        let result = parse_response::<CreateLinkResponse>(response).await?;
        let link = result.data.data;
        info!("🔗 Payment link {} created for order {}", link.payment_id, request.order_name);
        Ok(link)
    }

    /// Asks LINK for the current state of a payment.
    pub async fn fetch_payment_status(
        &self,
        payment_id: &str,
        business_id: &str,
    ) -> Result<PaymentStatusReport, LinkApiError> {
        let url = self.url(&format!("/v1/payments/{payment_id}"));
        let business_id = business_id_header(business_id)?;
        trace!("🔗 Fetching status of payment {payment_id}");
        let response = self
            .client
            .get(url)
            .header("X-Business-ID", business_id)
            .send()
            .await
            .map_err(|e| LinkApiError::Unavailable(e.to_string()))?;
        let report = parse_response::<PaymentStatusReport>(response).await?;
        debug!("🔗 Payment {payment_id} is {}", report.status);
        Ok(report)
    }
}

fn business_id_header(business_id: &str) -> Result<HeaderValue, LinkApiError> {
    HeaderValue::from_str(business_id)
        .map_err(|e| LinkApiError::Rejected { status: 400, message: format!("Invalid business id. {e}") })
}

async fn parse_response<T: DeserializeOwned>(response: Response) -> Result<T, LinkApiError> {
    let status = response.status();
    if status.is_success() {
        return response.json::<T>().await.map_err(|e| LinkApiError::InvalidResponse(e.to_string()));
    }
    let text = response.text().await.unwrap_or_default();
    // LINK reports failures as {"message": "..."}. Fall back to the raw body otherwise.
    let message = serde_json::from_str::<Value>(&text)
        .ok()
        .and_then(|v| v["message"].as_str().map(String::from))
        .unwrap_or(text);
    if status.is_client_error() {
        warn!("🔗 LINK rejected the request. {status}: {message}");
        Err(LinkApiError::Rejected { status: status.as_u16(), message })
    } else {
        warn!("🔗 LINK returned a server error. {status}: {message}");
        Err(LinkApiError::Unavailable(format!("{status}: {message}")))
    }
}
