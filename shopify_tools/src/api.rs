use std::sync::Arc;

use graphql_parser::parse_query;
use log::*;
use reqwest::{
    header::{HeaderMap, HeaderValue},
    Client,
    Method,
};
use serde::{de::DeserializeOwned, Deserialize, Serialize};
use serde_json::{json, Value};

use crate::{
    config::ShopifyConfig,
    data_objects::{
        Attribute,
        CompletedDraftOrder,
        DraftOrder,
        DraftOrderInput,
        MutationOutcome,
        OrderRef,
        ShopifyOrder,
        ShopifyTransaction,
        UserError,
    },
    helpers::{draft_order_gid, order_gid},
    ShopifyApiError,
};

const DRAFT_ORDER_DEF: &str = "{ id name invoiceUrl status order { id name } }";

#[derive(Clone)]
pub struct ShopifyApi {
    config: ShopifyConfig,
    client: Arc<Client>,
}

impl ShopifyApi {
    pub fn new(config: ShopifyConfig) -> Result<Self, ShopifyApiError> {
        let mut headers = HeaderMap::with_capacity(2);
        let val = HeaderValue::from_str(config.admin_access_token.reveal().as_str())
            .map_err(|e| ShopifyApiError::Initialization(e.to_string()))?;
        headers.insert("X-Shopify-Access-Token", val);
        headers.insert("Content-Type", HeaderValue::from_static("application/json"));
        let client = Client::builder()
            .default_headers(headers)
            .build()
            .map_err(|e| ShopifyApiError::Initialization(e.to_string()))?;
        Ok(Self { config, client: Arc::new(client) })
    }

    pub fn shop(&self) -> &str {
        self.config.shop.as_str()
    }

    pub async fn rest_query<T: DeserializeOwned, B: Serialize>(
        &self,
        method: Method,
        path: &str,
        params: &[(&str, &str)],
        body: Option<B>,
    ) -> Result<T, ShopifyApiError> {
        let url = self.url(path);
        trace!("Sending REST query: {url}");
        let mut req = self.client.request(method, url);
        if !params.is_empty() {
            req = req.query(params);
        }
        if let Some(body) = body {
            req = req.json(&body);
        }
        let response = req.send().await.map_err(|e| ShopifyApiError::RestResponseError(e.to_string()))?;
        if response.status().is_success() {
            trace!("REST query successful. {}", response.status());
            response.json::<T>().await.map_err(|e| ShopifyApiError::JsonError(e.to_string()))
        } else {
            let status = response.status().as_u16();
            let message = response.text().await.map_err(|e| ShopifyApiError::RestResponseError(e.to_string()))?;
            Err(ShopifyApiError::QueryError { status, message })
        }
    }

    pub async fn graphql_query<T: DeserializeOwned>(
        &self,
        query: &str,
        variables: Option<Value>,
    ) -> Result<T, ShopifyApiError> {
        let query = parse_query::<String>(query).map_err(|e| ShopifyApiError::InvalidGraphQL(e.to_string()))?;
        let mut body = json!({
            "query": query.to_string(),
        });
        if let Some(vars) = variables {
            body["variables"] = vars;
        }
        trace!("Sending GraphQL query: {body}");
        let result = self.rest_query::<Value, Value>(Method::POST, "/graphql.json", &[], Some(body)).await?;
        if let Some(errors) = result["errors"].as_array() {
            let e = errors.iter().map(|e| e.to_string()).collect::<Vec<String>>().join(", ");
            return Err(ShopifyApiError::GraphQLError(e));
        }
        let data = result["data"].clone();
        let costs = result["extensions"]["cost"].clone();
        trace!("GraphQL response: {data}");
        trace!("GraphQL costs: {costs}");
        if data.is_null() {
            return Err(ShopifyApiError::EmptyResponse);
        }
        let result = serde_json::from_value(data).map_err(|e| ShopifyApiError::JsonError(e.to_string()))?;
        Ok(result)
    }

    pub fn url(&self, path: &str) -> String {
        format!("https://{}/admin/api/{}{path}", self.config.shop, self.config.api_version)
    }

    //------------------------------------------   Draft orders   -----------------------------------------------------

    pub async fn create_draft_order(
        &self,
        input: &DraftOrderInput,
    ) -> Result<MutationOutcome<DraftOrder>, ShopifyApiError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Payload {
            draft_order: Option<DraftOrder>,
            #[serde(default)]
            user_errors: Vec<UserError>,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Response {
            draft_order_create: Payload,
        }
        let mutation = format!(
            "mutation draftOrderCreate($input: DraftOrderInput!) {{ draftOrderCreate(input: $input) {{ draftOrder \
             {DRAFT_ORDER_DEF} userErrors {{ field message }} }} }}"
        );
        let variables = json!({ "input": input });
        debug!("🛍️ Creating draft order on {}", self.config.shop);
        let response = self.graphql_query::<Response>(&mutation, Some(variables)).await?;
        let payload = response.draft_order_create;
        MutationOutcome::from_parts(payload.draft_order, payload.user_errors)
    }

    pub async fn fetch_draft_order(&self, id: &str) -> Result<Option<DraftOrder>, ShopifyApiError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Response {
            draft_order: Option<DraftOrder>,
        }
        let query = format!("query draftOrder($id: ID!) {{ draftOrder(id: $id) {DRAFT_ORDER_DEF} }}");
        let variables = json!({ "id": draft_order_gid(id) });
        let response = self.graphql_query::<Response>(&query, Some(variables)).await?;
        Ok(response.draft_order)
    }

    /// Converts a draft order into a real, paid order.
    ///
    /// If Shopify rejects the completion because the draft was already completed (e.g. by an earlier, partially
    /// failed attempt), the existing order is returned with `already_completed` set.
    pub async fn complete_draft_order(&self, id: &str) -> Result<MutationOutcome<CompletedDraftOrder>, ShopifyApiError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Payload {
            draft_order: Option<DraftOrder>,
            #[serde(default)]
            user_errors: Vec<UserError>,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Response {
            draft_order_complete: Payload,
        }
        let mutation = format!(
            "mutation draftOrderComplete($id: ID!) {{ draftOrderComplete(id: $id, paymentPending: false) {{ \
             draftOrder {DRAFT_ORDER_DEF} userErrors {{ field message }} }} }}"
        );
        let gid = draft_order_gid(id);
        let variables = json!({ "id": gid });
        debug!("🛍️ Completing draft order {gid}");
        let response = self.graphql_query::<Response>(&mutation, Some(variables)).await?;
        let payload = response.draft_order_complete;
        match MutationOutcome::from_parts(payload.draft_order, payload.user_errors)? {
            MutationOutcome::Ok(DraftOrder { id, order: Some(order), .. }) => {
                info!("🛍️ Draft order {id} completed as order {}", order.name);
                Ok(MutationOutcome::Ok(CompletedDraftOrder { draft_order_id: id, order, already_completed: false }))
            },
            MutationOutcome::Ok(draft) => {
                warn!("🛍️ Draft order {} was completed but no order was returned", draft.id);
                Err(ShopifyApiError::EmptyResponse)
            },
            MutationOutcome::UserErrors(errors) => {
                debug!("🛍️ Draft order {gid} could not be completed. Checking whether it already was.");
                match self.fetch_draft_order(&gid).await? {
                    Some(DraftOrder { id, order: Some(order), status: Some(status), .. }) if status == "COMPLETED" => {
                        info!("🛍️ Draft order {id} had already been completed as order {}", order.name);
                        Ok(MutationOutcome::Ok(CompletedDraftOrder {
                            draft_order_id: id,
                            order,
                            already_completed: true,
                        }))
                    },
                    _ => Ok(MutationOutcome::UserErrors(errors)),
                }
            },
        }
    }

    /// Deletes a draft order. Returns the id of the deleted draft.
    pub async fn delete_draft_order(&self, id: &str) -> Result<MutationOutcome<String>, ShopifyApiError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Payload {
            deleted_id: Option<String>,
            #[serde(default)]
            user_errors: Vec<UserError>,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Response {
            draft_order_delete: Payload,
        }
        let mutation = "mutation draftOrderDelete($input: DraftOrderDeleteInput!) { draftOrderDelete(input: $input) { \
                        deletedId userErrors { field message } } }";
        let gid = draft_order_gid(id);
        let variables = json!({ "input": { "id": gid } });
        debug!("🛍️ Deleting draft order {gid}");
        let response = self.graphql_query::<Response>(mutation, Some(variables)).await?;
        let payload = response.draft_order_delete;
        MutationOutcome::from_parts(payload.deleted_id, payload.user_errors)
    }

    //------------------------------------------      Orders      -----------------------------------------------------

    /// Replaces the note on an order and merges the given custom attributes.
    pub async fn update_order(
        &self,
        id: &str,
        note: Option<&str>,
        attributes: &[Attribute],
    ) -> Result<MutationOutcome<OrderRef>, ShopifyApiError> {
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Payload {
            order: Option<OrderRef>,
            #[serde(default)]
            user_errors: Vec<UserError>,
        }
        #[derive(Deserialize)]
        #[serde(rename_all = "camelCase")]
        struct Response {
            order_update: Payload,
        }
        let mutation = "mutation orderUpdate($input: OrderInput!) { orderUpdate(input: $input) { order { id name } \
                        userErrors { field message } } }";
        let gid = order_gid(id);
        let mut input = json!({ "id": gid, "customAttributes": attributes });
        if let Some(note) = note {
            input["note"] = json!(note);
        }
        debug!("🛍️ Updating order {gid}");
        let response = self.graphql_query::<Response>(mutation, Some(json!({ "input": input }))).await?;
        let payload = response.order_update;
        MutationOutcome::from_parts(payload.order, payload.user_errors)
    }

    pub async fn get_order(&self, order_id: u64) -> Result<ShopifyOrder, ShopifyApiError> {
        #[derive(Deserialize)]
        struct OrderResponse {
            order: ShopifyOrder,
        }
        let path = format!("/orders/{order_id}.json");
        debug!("Fetching order #{order_id}");
        let result = self.rest_query::<OrderResponse, ()>(Method::GET, &path, &[], None).await?;
        info!("Fetched order #{order_id}");
        Ok(result.order)
    }

    /// Replaces the note on an order, using the REST API.
    pub async fn set_order_note(&self, order_id: u64, note: &str) -> Result<ShopifyOrder, ShopifyApiError> {
        #[derive(Deserialize)]
        struct OrderResponse {
            order: ShopifyOrder,
        }
        let path = format!("/orders/{order_id}.json");
        let body = json!({ "order": { "id": order_id, "note": note } });
        debug!("Updating note on order #{order_id}");
        let result = self.rest_query::<OrderResponse, Value>(Method::PUT, &path, &[], Some(body)).await?;
        Ok(result.order)
    }

    /// Cancels an order on behalf of the customer. The customer is not notified.
    pub async fn cancel_order(&self, order_id: u64) -> Result<ShopifyOrder, ShopifyApiError> {
        #[derive(Deserialize)]
        struct OrderResponse {
            order: ShopifyOrder,
        }
        let path = format!("/orders/{order_id}/cancel.json");
        let body = json!({ "reason": "customer", "email": false });
        debug!("Cancelling order #{order_id}");
        let result = self.rest_query::<OrderResponse, Value>(Method::POST, &path, &[], Some(body)).await?;
        info!("Cancelled order #{order_id}");
        Ok(result.order)
    }

    /// Records a successful capture transaction against the order, which marks it as paid.
    pub async fn mark_order_as_paid(
        &self,
        order_id: u64,
        amount: &str,
        currency: &str,
        gateway: &str,
        message: &str,
    ) -> Result<ShopifyTransaction, ShopifyApiError> {
        #[derive(Deserialize)]
        struct TransactionResponse {
            transaction: ShopifyTransaction,
        }
        let path = format!("/orders/{order_id}/transactions.json");
        let body = json!({
            "transaction": {
                "parent_id": null,
                "amount": amount,
                "kind": "capture",
                "status": "success",
                "currency": currency,
                "gateway": gateway,
                "source_name": "web",
                "message": message,
            },
        });
        let result = self.rest_query::<TransactionResponse, Value>(Method::POST, &path, &[], Some(body)).await?;
        info!("Order #{order_id} marked as paid ({amount} {currency})");
        Ok(result.transaction)
    }
}

#[cfg(test)]
mod test {
    use lpg_common::Secret;

    use super::*;

    #[test]
    fn admin_urls() {
        let config = ShopifyConfig::new("my-shop.myshopify.com", Secret::new("shpat_x".into()), "2024-04");
        let api = ShopifyApi::new(config).unwrap();
        assert_eq!(api.url("/graphql.json"), "https://my-shop.myshopify.com/admin/api/2024-04/graphql.json");
        assert_eq!(api.shop(), "my-shop.myshopify.com");
    }

    #[test]
    fn mutations_are_valid_graphql() {
        let create = format!(
            "mutation draftOrderCreate($input: DraftOrderInput!) {{ draftOrderCreate(input: $input) {{ draftOrder \
             {DRAFT_ORDER_DEF} userErrors {{ field message }} }} }}"
        );
        assert!(parse_query::<String>(&create).is_ok());
        let fetch = format!("query draftOrder($id: ID!) {{ draftOrder(id: $id) {DRAFT_ORDER_DEF} }}");
        assert!(parse_query::<String>(&fetch).is_ok());
    }
}
