use link_payment_engine::{
    db_types::{ActualOrder, Address, DraftOrderRef, OrderDetails},
    traits::{CommerceGateway, DraftOrderRequest, GatewayError, OrderAnnotation, PaidOrder, SessionManagement},
    PAYMENT_METHOD,
};
use log::*;
use shopify_tools::{
    data_objects::summarize_user_errors,
    helpers::{legacy_id, to_gid},
    AppliedDiscount,
    Attribute,
    DraftLineItem,
    DraftOrderInput,
    MailingAddress,
    MutationOutcome,
    ShippingLine,
    ShopifyApi,
    ShopifyApiError,
};

use crate::config::ShopifyConfig;

pub const DRAFT_ORDER_TAGS: [&str; 2] = ["LINK", "XRPL"];

/// Shopify, as seen by the payment engine.
///
/// The gateway serves every installed shop. Each call looks up the shop's offline session (left behind by the app's
/// OAuth install flow) and builds a short-lived Admin API client with its access token.
#[derive(Clone)]
pub struct ShopifyGateway<B> {
    sessions: B,
    config: ShopifyConfig,
}

impl<B> ShopifyGateway<B>
where B: SessionManagement
{
    pub fn new(sessions: B, config: ShopifyConfig) -> Self {
        Self { sessions, config }
    }

    async fn api_for(&self, shop: &str) -> Result<ShopifyApi, GatewayError> {
        let session = self
            .sessions
            .fetch_offline_session(shop)
            .await
            .map_err(|e| GatewayError::Unavailable(format!("Could not load session for {shop}. {e}")))?
            .ok_or_else(|| {
                warn!("🛍️ {shop} has no offline session. Has the app been installed?");
                GatewayError::NoSession(shop.to_string())
            })?;
        let config = self.config.shopify_api_config(shop, &session.access_token);
        ShopifyApi::new(config).map_err(|e| GatewayError::Unavailable(e.to_string()))
    }
}

impl<B> CommerceGateway for ShopifyGateway<B>
where B: SessionManagement
{
    async fn create_draft_order(&self, shop: &str, request: &DraftOrderRequest) -> Result<DraftOrderRef, GatewayError> {
        let api = self.api_for(shop).await?;
        let input = draft_order_input(request);
        let draft = api.create_draft_order(&input).await.map_err(to_gateway_error)?;
        let draft = user_errors_to_gateway_error(draft)?;
        info!("🛍️ Draft order {} created on {shop} for order {}", draft.id, request.order_name);
        Ok(DraftOrderRef { draft_order_id: draft.id, draft_order_url: draft.invoice_url })
    }

    async fn complete_draft_order(&self, shop: &str, draft_order_id: &str) -> Result<ActualOrder, GatewayError> {
        let api = self.api_for(shop).await?;
        let outcome = api.complete_draft_order(draft_order_id).await.map_err(to_gateway_error)?;
        let completed = user_errors_to_gateway_error(outcome)?;
        if completed.already_completed {
            info!("🛍️ Draft order {draft_order_id} on {shop} was already completed as {}", completed.order.name);
        }
        Ok(ActualOrder { order_id: completed.order.id, order_name: completed.order.name })
    }

    async fn annotate_order(
        &self,
        shop: &str,
        order_id: &str,
        annotation: &OrderAnnotation,
    ) -> Result<(), GatewayError> {
        let api = self.api_for(shop).await?;
        let attributes = [
            Attribute::new("xrpl_tx_hash", annotation.xrpl_tx_hash.as_str()),
            Attribute::new("payment_method", annotation.payment_method.as_str()),
            Attribute::new("confirmations", annotation.confirmations.to_string()),
        ];
        let note = Some(annotation.note.as_str()).filter(|n| !n.is_empty());
        let outcome = api.update_order(order_id, note, &attributes).await.map_err(to_gateway_error)?;
        user_errors_to_gateway_error(outcome)?;
        debug!("🛍️ Order {order_id} on {shop} annotated with transaction {}", annotation.xrpl_tx_hash);
        Ok(())
    }

    async fn delete_draft_order(&self, shop: &str, draft_order_id: &str) -> Result<(), GatewayError> {
        let api = self.api_for(shop).await?;
        let outcome = api.delete_draft_order(draft_order_id).await.map_err(to_gateway_error)?;
        let deleted = user_errors_to_gateway_error(outcome)?;
        info!("🛍️ Draft order {deleted} deleted from {shop}");
        Ok(())
    }

    async fn cancel_order(&self, shop: &str, order_id: &str, reason: &str) -> Result<(), GatewayError> {
        let api = self.api_for(shop).await?;
        let id = legacy_id(order_id).map_err(to_gateway_error)?;
        let order = api.get_order(id).await.map_err(to_gateway_error)?;
        let note = match order.note.as_deref().filter(|n| !n.is_empty()) {
            Some(existing) => format!("{existing}\n\nPayment cancelled: {reason}"),
            None => format!("Payment cancelled: {reason}"),
        };
        api.set_order_note(id, &note).await.map_err(to_gateway_error)?;
        api.cancel_order(id).await.map_err(to_gateway_error)?;
        info!("🛍️ Order {order_id} on {shop} cancelled. {reason}");
        Ok(())
    }

    async fn mark_order_as_paid(&self, shop: &str, order: &PaidOrder) -> Result<(), GatewayError> {
        let api = self.api_for(shop).await?;
        let id = legacy_id(&order.order_id).map_err(to_gateway_error)?;
        api.set_order_note(id, &order.note).await.map_err(to_gateway_error)?;
        let message = format!("XRPL Transaction: {}", order.xrpl_tx_hash);
        api.mark_order_as_paid(id, order.amount.as_str(), order.currency.code(), PAYMENT_METHOD, &message)
            .await
            .map_err(to_gateway_error)?;
        Ok(())
    }
}

fn user_errors_to_gateway_error<T>(outcome: MutationOutcome<T>) -> Result<T, GatewayError> {
    outcome.into_result().map_err(|errors| {
        let summary = summarize_user_errors(&errors);
        warn!("🛍️ Shopify rejected the mutation. {summary}");
        GatewayError::UserErrors(summary)
    })
}

fn to_gateway_error(e: ShopifyApiError) -> GatewayError {
    if e.is_transient() {
        return GatewayError::Unavailable(e.to_string());
    }
    match e {
        ShopifyApiError::Initialization(_) | ShopifyApiError::RestRequestError(_) => {
            GatewayError::Unavailable(e.to_string())
        },
        ShopifyApiError::QueryError { .. } | ShopifyApiError::InvalidId(_) => GatewayError::UserErrors(e.to_string()),
        _ => GatewayError::InvalidResponse(e.to_string()),
    }
}

/// Builds the draft order for a checkout. Without a line item snapshot, the draft carries a single custom line for
/// the full amount.
pub fn draft_order_input(request: &DraftOrderRequest) -> DraftOrderInput {
    let details = request.details.clone().unwrap_or_default();
    let mut line_items = details
        .line_items
        .iter()
        .map(|item| match &item.variant {
            Some(variant) if !variant.id.is_empty() => DraftLineItem {
                variant_id: Some(to_gid("ProductVariant", &variant.id)),
                quantity: item.quantity,
                ..Default::default()
            },
            _ => DraftLineItem {
                title: Some(item.title.clone()),
                original_unit_price: Some(item.price.clone()),
                sku: item.sku.clone(),
                quantity: item.quantity,
                ..Default::default()
            },
        })
        .collect::<Vec<_>>();
    if line_items.is_empty() {
        line_items.push(DraftLineItem {
            title: Some(format!("Order {}", request.order_name)),
            original_unit_price: Some(request.amount.to_string()),
            quantity: 1,
            ..Default::default()
        });
    }
    DraftOrderInput {
        email: details.email.clone(),
        phone: details.phone.clone(),
        note: Some(draft_note(request, &details)),
        line_items,
        shipping_address: details.shipping_address.as_ref().map(mailing_address),
        billing_address: details.billing_address.as_ref().map(mailing_address),
        shipping_line: details
            .shipping
            .as_ref()
            .filter(|price| !price.is_empty())
            .map(|price| ShippingLine { title: "Shipping".to_string(), price: price.clone() }),
        applied_discount: details.discount.as_ref().and_then(|d| {
            let value = d.amount.parse::<f64>().ok().filter(|v| *v > 0.0)?;
            Some(AppliedDiscount {
                title: d.code.clone(),
                description: format!("Discount code {}", d.code),
                value,
                value_type: "FIXED_AMOUNT".to_string(),
            })
        }),
        tags: DRAFT_ORDER_TAGS.iter().map(|t| t.to_string()).collect(),
        custom_attributes: vec![
            Attribute::new("link_payment_id", request.link_payment_id.as_str()),
            Attribute::new("checkout_order_id", request.order_id.as_str()),
            Attribute::new("payment_method", PAYMENT_METHOD),
        ],
    }
}

fn draft_note(request: &DraftOrderRequest, details: &OrderDetails) -> String {
    let mut note = format!(
        "Awaiting LINK payment {} of {} {} for checkout {}",
        request.link_payment_id, request.amount, request.currency, request.order_name
    );
    if let Some(buyer_note) = details.note.as_deref().filter(|n| !n.is_empty()) {
        note.push_str("\n\n");
        note.push_str(buyer_note);
    }
    note
}

fn mailing_address(address: &Address) -> MailingAddress {
    MailingAddress {
        first_name: address.first_name.clone(),
        last_name: address.last_name.clone(),
        address1: address.address1.clone(),
        address2: address.address2.clone(),
        city: address.city.clone(),
        province: address.province.clone(),
        zip: address.zip.clone(),
        country: address.country.clone(),
        phone: address.phone.clone(),
    }
}
