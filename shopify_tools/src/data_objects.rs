use serde::{Deserialize, Serialize};

use crate::ShopifyApiError;

//--------------------------------------   Mutation outcomes   ---------------------------------------------------------

/// A validation error returned in-band by a Shopify GraphQL mutation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserError {
    #[serde(default)]
    pub field: Option<Vec<String>>,
    pub message: String,
    #[serde(default)]
    pub code: Option<String>,
}

impl std::fmt::Display for UserError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.field {
            Some(field) if !field.is_empty() => write!(f, "{}: {}", field.join("."), self.message),
            _ => f.write_str(&self.message),
        }
    }
}

/// The result of a GraphQL mutation that reached Shopify and was processed.
///
/// Transport and parsing failures are reported as [`ShopifyApiError`]s instead.
#[derive(Debug, Clone, PartialEq)]
pub enum MutationOutcome<T> {
    Ok(T),
    UserErrors(Vec<UserError>),
}

impl<T> MutationOutcome<T> {
    /// Builds the outcome from the two halves of a mutation payload. User errors take precedence; a payload with
    /// neither a value nor errors is an empty response.
    pub fn from_parts(value: Option<T>, user_errors: Vec<UserError>) -> Result<Self, ShopifyApiError> {
        if !user_errors.is_empty() {
            return Ok(Self::UserErrors(user_errors));
        }
        value.map(Self::Ok).ok_or(ShopifyApiError::EmptyResponse)
    }

    pub fn is_ok(&self) -> bool {
        matches!(self, Self::Ok(_))
    }

    pub fn into_result(self) -> Result<T, Vec<UserError>> {
        match self {
            Self::Ok(v) => Ok(v),
            Self::UserErrors(e) => Err(e),
        }
    }
}

/// Joins a set of user errors into a single line, suitable for logs and history entries.
pub fn summarize_user_errors(errors: &[UserError]) -> String {
    errors.iter().map(|e| e.to_string()).collect::<Vec<String>>().join("; ")
}

//--------------------------------------     Draft orders      ---------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrderRef {
    pub id: String,
    pub name: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftOrder {
    pub id: String,
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub invoice_url: Option<String>,
    /// OPEN, INVOICE_SENT or COMPLETED
    #[serde(default)]
    pub status: Option<String>,
    #[serde(default)]
    pub order: Option<OrderRef>,
}

impl DraftOrder {
    pub fn is_completed(&self) -> bool {
        self.status.as_deref() == Some("COMPLETED")
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompletedDraftOrder {
    pub draft_order_id: String,
    pub order: OrderRef,
    /// True if the draft had already been completed before this call.
    pub already_completed: bool,
}

/// Mirrors Shopify's `DraftOrderInput`. Only the fields the gateway fills in are modelled.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftOrderInput {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    pub line_items: Vec<DraftLineItem>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_address: Option<MailingAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub billing_address: Option<MailingAddress>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub shipping_line: Option<ShippingLine>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub applied_discount: Option<AppliedDiscount>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub tags: Vec<String>,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub custom_attributes: Vec<Attribute>,
}

/// A draft line item either references a product variant, or is a custom item with a title and unit price.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DraftLineItem {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub variant_id: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub original_unit_price: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sku: Option<String>,
    pub quantity: i64,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MailingAddress {
    pub first_name: String,
    pub last_name: String,
    pub address1: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub address2: Option<String>,
    pub city: String,
    pub province: String,
    pub zip: String,
    pub country: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub phone: Option<String>,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ShippingLine {
    pub title: String,
    pub price: String,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AppliedDiscount {
    pub title: String,
    pub description: String,
    pub value: f64,
    /// FIXED_AMOUNT or PERCENTAGE
    pub value_type: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Attribute {
    pub key: String,
    pub value: String,
}

impl Attribute {
    pub fn new<K: Into<String>, V: Into<String>>(key: K, value: V) -> Self {
        Self { key: key.into(), value: value.into() }
    }
}

//--------------------------------------    REST resources     ---------------------------------------------------------

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShopifyOrder {
    pub id: u64,
    #[serde(default)]
    pub name: String,
    #[serde(default)]
    pub note: Option<String>,
    #[serde(default)]
    pub financial_status: Option<String>,
    #[serde(default)]
    pub cancelled_at: Option<String>,
    #[serde(default)]
    pub total_price: Option<String>,
    #[serde(default)]
    pub currency: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ShopifyTransaction {
    pub id: u64,
    pub order_id: u64,
    pub kind: String,
    #[serde(default)]
    pub status: Option<String>,
    pub amount: String,
    pub currency: String,
    #[serde(default)]
    pub gateway: Option<String>,
    #[serde(default)]
    pub message: Option<String>,
}
