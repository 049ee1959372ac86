//! Checkout session tokens.
//!
//! The checkout UI extension calls the server with a session token minted by Shopify
//! (`Authorization: Bearer <jwt>`). The token is an HS256 JWT signed with the app's client secret. Its `dest` claim
//! holds the shop's domain, which is the only trusted source for the shop a request acts on.
use std::future::{ready, Ready};

use actix_web::{dev::Payload, http::header::AUTHORIZATION, web, FromRequest, HttpRequest};
use jsonwebtoken::{decode, encode, errors::ErrorKind, Algorithm, DecodingKey, EncodingKey, Header, Validation};
use log::*;
use lpg_common::Secret;
use serde::{Deserialize, Serialize};

use crate::{
    config::ShopifyConfig,
    errors::{AuthError, ServerError},
    helpers::sanitize_shop,
};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SessionClaims {
    /// The shop admin url, e.g. `https://my-shop.myshopify.com/admin`
    #[serde(default)]
    pub iss: String,
    /// The shop url, e.g. `https://my-shop.myshopify.com`
    pub dest: String,
    /// The app's client id
    #[serde(default)]
    pub aud: String,
    #[serde(default)]
    pub sub: Option<String>,
    pub exp: i64,
    #[serde(default)]
    pub nbf: Option<i64>,
    #[serde(default)]
    pub iat: Option<i64>,
    #[serde(default)]
    pub jti: Option<String>,
}

/// Verifies checkout session tokens. Registered as app data, and used by the [`CheckoutSession`] extractor.
#[derive(Clone, Debug)]
pub struct SessionTokenVerifier {
    api_key: String,
    api_secret: Secret<String>,
}

impl SessionTokenVerifier {
    pub fn new(config: &ShopifyConfig) -> Self {
        Self { api_key: config.api_key.clone(), api_secret: config.api_secret.clone() }
    }

    /// Verifies the token and returns the shop it was issued for.
    pub fn verify(&self, token: &str) -> Result<CheckoutSession, AuthError> {
        if self.api_secret.is_empty() {
            warn!("💻️ No Shopify API secret is configured. Refusing session token.");
            return Err(AuthError::ValidationError("No API secret is configured".into()));
        }
        let mut validation = Validation::new(Algorithm::HS256);
        if !self.api_key.is_empty() {
            validation.set_audience(&[self.api_key.as_str()]);
        }
        let key = DecodingKey::from_secret(self.api_secret.reveal().as_bytes());
        let claims = decode::<SessionClaims>(token, &key, &validation)
            .map_err(|e| match e.kind() {
                ErrorKind::ExpiredSignature => AuthError::Expired,
                ErrorKind::InvalidToken | ErrorKind::Base64(_) | ErrorKind::Json(_) | ErrorKind::Utf8(_) => {
                    AuthError::PoorlyFormattedToken(e.to_string())
                },
                _ => AuthError::ValidationError(e.to_string()),
            })?
            .claims;
        let shop = sanitize_shop(&claims.dest).ok_or_else(|| AuthError::InvalidShop(claims.dest.clone()))?;
        trace!("💻️ Session token verified for {shop}");
        Ok(CheckoutSession { shop, user: claims.sub })
    }

    /// Mints a session token the way Shopify does. Only useful for tests and local tooling.
    pub fn issue(&self, claims: &SessionClaims) -> Result<String, ServerError> {
        let key = EncodingKey::from_secret(self.api_secret.reveal().as_bytes());
        encode(&Header::new(Algorithm::HS256), claims, &key)
            .map_err(|e| ServerError::Unspecified(format!("Could not sign session token. {e}")))
    }
}

/// The authenticated shop behind a checkout request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CheckoutSession {
    pub shop: String,
    pub user: Option<String>,
}

impl FromRequest for CheckoutSession {
    type Error = ServerError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _payload: &mut Payload) -> Self::Future {
        ready(extract_session(req))
    }
}

fn extract_session(req: &HttpRequest) -> Result<CheckoutSession, ServerError> {
    let verifier = req
        .app_data::<web::Data<SessionTokenVerifier>>()
        .ok_or_else(|| ServerError::ConfigurationError("Session token verifier is not registered".into()))?;
    let header = req.headers().get(AUTHORIZATION).ok_or(AuthError::MissingToken)?;
    let header = header.to_str().map_err(|e| AuthError::PoorlyFormattedToken(e.to_string()))?;
    let token = header
        .strip_prefix("Bearer ")
        .or_else(|| header.strip_prefix("bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken)?;
    let session = verifier.verify(token).map_err(|e| {
        debug!("💻️ Rejecting checkout request. {e}");
        e
    })?;
    Ok(session)
}
