use crate::ShopifyApiError;

const GID_PREFIX: &str = "gid://shopify/";

/// Returns the GraphQL global id for a resource. Ids that are already in `gid://` form are returned unchanged.
pub fn to_gid(resource: &str, id: &str) -> String {
    if id.starts_with(GID_PREFIX) {
        id.to_string()
    } else {
        format!("{GID_PREFIX}{resource}/{id}")
    }
}

pub fn order_gid(id: &str) -> String {
    to_gid("Order", id)
}

pub fn draft_order_gid(id: &str) -> String {
    to_gid("DraftOrder", id)
}

/// Extracts the numeric (REST) id from either a global id (`gid://shopify/Order/123`) or a bare number.
pub fn legacy_id(id: &str) -> Result<u64, ShopifyApiError> {
    let tail = id.rsplit('/').next().unwrap_or(id);
    // Some gids carry query parameters, e.g. gid://shopify/Order/123?key=abc
    let tail = tail.split('?').next().unwrap_or(tail);
    tail.parse::<u64>().map_err(|e| ShopifyApiError::InvalidId(format!("{id}. {e}")))
}
