//! Seller authentication.
//!
//! Sellers authenticate with a signed bearer token of the form
//! `<store_uuid>.<hex_hmac>`, the signature being HMAC-SHA256 over the uuid
//! with the server signing key. Verification yields the store identity; an
//! invalid or absent token never reveals whether a store exists.

use axum::{
    extract::FromRequestParts,
    http::{header::AUTHORIZATION, request::Parts},
};
use hmac::{Hmac, Mac};
use secrecy::ExposeSecret;
use sha2::Sha256;
use uuid::Uuid;

use shipline_core::StoreId;

use crate::error::AppError;
use crate::state::AppState;

type HmacSha256 = Hmac<Sha256>;

/// Extractor that requires a valid seller token.
///
/// # Example
///
/// ```rust,ignore
/// async fn handler(RequireSeller(store_id): RequireSeller) -> impl IntoResponse {
///     format!("store {store_id}")
/// }
/// ```
pub struct RequireSeller(pub StoreId);

impl FromRequestParts<AppState> for RequireSeller {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|h| h.to_str().ok())
            .and_then(|h| h.strip_prefix("Bearer "))
            .ok_or_else(|| AppError::Unauthorized("missing bearer token".to_string()))?;

        let store_id = verify_seller_token(
            token,
            state.config().auth_signing_key.expose_secret().as_bytes(),
        )?;
        Ok(Self(store_id))
    }
}

/// Verify a seller token and extract the store id.
///
/// # Errors
///
/// Returns `Unauthorized` for any malformed or mis-signed token; callers
/// get no detail on which check failed.
pub fn verify_seller_token(token: &str, key: &[u8]) -> Result<StoreId, AppError> {
    let unauthorized = || AppError::Unauthorized("invalid token".to_string());

    let (store_part, sig_part) = token.split_once('.').ok_or_else(unauthorized)?;
    let uuid: Uuid = store_part.parse().map_err(|_| unauthorized())?;
    let signature = hex::decode(sig_part).map_err(|_| unauthorized())?;

    let mut mac = HmacSha256::new_from_slice(key)
        .map_err(|_| AppError::Internal("signing key unusable".to_string()))?;
    mac.update(store_part.as_bytes());
    mac.verify_slice(&signature).map_err(|_| unauthorized())?;

    Ok(StoreId::new(uuid))
}

/// Mint a seller token for a store. Used by token issuance and tests.
#[must_use]
pub fn mint_seller_token(store_id: StoreId, key: &[u8]) -> String {
    let store_part = store_id.to_string();
    // new_from_slice only fails for unusable key lengths, which HMAC-SHA256
    // does not have.
    let mut mac = HmacSha256::new_from_slice(key).unwrap_or_else(|_| unreachable!());
    mac.update(store_part.as_bytes());
    let signature = hex::encode(mac.finalize().into_bytes());
    format!("{store_part}.{signature}")
}

#[cfg(test)]
mod tests {
    use super::*;

    const KEY: &[u8] = b"0123456789abcdef0123456789abcdef";

    #[test]
    fn test_token_round_trip() {
        let store_id = StoreId::generate();
        let token = mint_seller_token(store_id, KEY);
        assert_eq!(verify_seller_token(&token, KEY).unwrap(), store_id);
    }

    #[test]
    fn test_tampered_signature_is_rejected() {
        let store_id = StoreId::generate();
        let token = mint_seller_token(store_id, KEY);
        let mut bytes = token.into_bytes();
        let last = bytes.last_mut().unwrap();
        *last = if *last == b'0' { b'1' } else { b'0' };
        let tampered = String::from_utf8(bytes).unwrap();
        assert!(verify_seller_token(&tampered, KEY).is_err());
    }

    #[test]
    fn test_wrong_key_is_rejected() {
        let token = mint_seller_token(StoreId::generate(), KEY);
        assert!(verify_seller_token(&token, b"another-key-another-key-another!").is_err());
    }

    #[test]
    fn test_malformed_tokens_are_rejected() {
        for token in ["", "no-dot", "not-a-uuid.abcd", "a.b.c"] {
            assert!(verify_seller_token(token, KEY).is_err(), "token: {token}");
        }
        let uuid = StoreId::generate();
        assert!(verify_seller_token(&format!("{uuid}.zzzz"), KEY).is_err());
    }
}
