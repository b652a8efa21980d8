//! # Authentication Module
//!
//! Signed bearer tokens for the perfplan HTTP API.
//!
//! ## Token Format
//!
//! ```text
//! base64url("<user_id>.<expires_at>") "." base64url(blake3_keyed(payload))
//! ```
//!
//! The MAC key is derived from the configured secret with
//! `blake3::derive_key`. Tokens are issued by `perfplan token --user ID`
//! or by `POST /api/v1/auth/dev-login` when development login is enabled.
//!
//! ## Usage
//!
//! ```text
//! Authorization: Bearer <token>
//! ```

use super::AppState;
use super::types::ApiError;
use axum::{
    body::Body,
    extract::State,
    http::{Request, header},
    middleware::Next,
    response::Response,
};
use base64::{Engine as _, engine::general_purpose::URL_SAFE_NO_PAD};
use perfplan_core::{User, UserId, roles::require_admin};
use subtle::ConstantTimeEq;

/// Context string for key derivation. Changing it invalidates every token.
const TOKEN_CONTEXT: &str = "perfplan 2025-07 bearer token v1";

// =============================================================================
// TOKEN SIGNER
// =============================================================================

/// Why a token was refused. Logged, never sent to the client.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TokenError {
    Malformed,
    BadSignature,
    Expired,
}

impl TokenError {
    pub fn reason(self) -> &'static str {
        match self {
            Self::Malformed => "malformed_token",
            Self::BadSignature => "bad_signature",
            Self::Expired => "expired_token",
        }
    }
}

/// A freshly issued token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IssuedToken {
    pub token: String,
    pub expires_at: u64,
}

/// Issues and verifies bearer tokens.
#[derive(Clone)]
pub struct TokenSigner {
    key: [u8; 32],
    ttl_secs: u64,
}

impl std::fmt::Debug for TokenSigner {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TokenSigner")
            .field("key", &"<redacted>")
            .field("ttl_secs", &self.ttl_secs)
            .finish()
    }
}

impl TokenSigner {
    pub fn new(secret: &str, ttl_hours: u64) -> Self {
        Self {
            key: blake3::derive_key(TOKEN_CONTEXT, secret.as_bytes()),
            ttl_secs: ttl_hours.saturating_mul(3600),
        }
    }

    /// Issue a token for `user`, valid from `now` for the configured TTL.
    pub fn issue(&self, user: UserId, now: u64) -> IssuedToken {
        let expires_at = now.saturating_add(self.ttl_secs);
        let payload = format!("{}.{}", user.0, expires_at);
        let mac = blake3::keyed_hash(&self.key, payload.as_bytes());
        IssuedToken {
            token: format!(
                "{}.{}",
                URL_SAFE_NO_PAD.encode(payload.as_bytes()),
                URL_SAFE_NO_PAD.encode(mac.as_bytes())
            ),
            expires_at,
        }
    }

    /// Verify a token and return the user it names.
    pub fn verify(&self, token: &str, now: u64) -> Result<UserId, TokenError> {
        let (payload_b64, mac_b64) = token.split_once('.').ok_or(TokenError::Malformed)?;
        let payload = URL_SAFE_NO_PAD
            .decode(payload_b64)
            .map_err(|_| TokenError::Malformed)?;
        let provided = URL_SAFE_NO_PAD
            .decode(mac_b64)
            .map_err(|_| TokenError::Malformed)?;

        let expected = blake3::keyed_hash(&self.key, &payload);
        if !macs_match(&provided, expected.as_bytes()) {
            return Err(TokenError::BadSignature);
        }

        let text = std::str::from_utf8(&payload).map_err(|_| TokenError::Malformed)?;
        let (user, expires_at) = text.split_once('.').ok_or(TokenError::Malformed)?;
        let user: u64 = user.parse().map_err(|_| TokenError::Malformed)?;
        let expires_at: u64 = expires_at.parse().map_err(|_| TokenError::Malformed)?;
        if now >= expires_at {
            return Err(TokenError::Expired);
        }
        Ok(UserId(user))
    }
}

/// Constant-time MAC comparison.
///
/// Both sides are padded to the same length so `ct_eq` always runs over
/// the same number of bytes.
fn macs_match(provided: &[u8], expected: &[u8]) -> bool {
    let max_len = provided.len().max(expected.len());
    let mut padded_provided = vec![0u8; max_len];
    let mut padded_expected = vec![0u8; max_len];
    padded_provided[..provided.len()].copy_from_slice(provided);
    padded_expected[..expected.len()].copy_from_slice(expected);

    let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
    bytes_match && provided.len() == expected.len()
}

// =============================================================================
// MIDDLEWARE
// =============================================================================

/// The authenticated caller, inserted into request extensions.
#[derive(Debug, Clone)]
pub struct CurrentUser(pub User);

fn reject(reason: &str) -> ApiError {
    tracing::warn!(event = "auth_failure", reason, "Authentication failed");
    ApiError::unauthorized("Unauthorized")
}

/// Bearer token middleware.
///
/// Resolves the token to an active user and stores it as `CurrentUser`.
pub async fn bearer_auth_middleware(
    State(state): State<AppState>,
    mut request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let token = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .ok_or_else(|| reject("missing_authorization_header"))?;

    let user_id = state
        .signer
        .verify(token, super::unix_now())
        .map_err(|e| reject(e.reason()))?;

    let user = {
        let service = state.service.read().await;
        match service.user(user_id) {
            Ok(user) => user,
            Err(perfplan_core::ReviewError::NotFound(_)) => return Err(reject("unknown_user")),
            Err(e) => return Err(e.into()),
        }
    };
    if !user.is_active {
        return Err(reject("inactive_user"));
    }

    request.extensions_mut().insert(CurrentUser(user));
    Ok(next.run(request).await)
}

/// Admin guard for `/api/v1/admin/*`. Runs after `bearer_auth_middleware`.
pub async fn require_admin_middleware(
    State(state): State<AppState>,
    request: Request<Body>,
    next: Next,
) -> Result<Response, ApiError> {
    let Some(CurrentUser(user)) = request.extensions().get::<CurrentUser>().cloned() else {
        return Err(reject("missing_identity"));
    };
    let kind = state.service.read().await.role_kind(&user)?;
    if let Err(e) = require_admin(kind) {
        tracing::warn!(
            event = "auth_failure",
            reason = "not_admin",
            user_id = user.id.0,
            "Admin route refused"
        );
        return Err(e.into());
    }
    Ok(next.run(request).await)
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use super::*;

    const NOW: u64 = 1_752_000_000;

    #[test]
    fn issued_token_verifies() {
        let signer = TokenSigner::new("secret", 1);
        let issued = signer.issue(UserId(7), NOW);
        assert_eq!(issued.expires_at, NOW + 3600);
        assert_eq!(signer.verify(&issued.token, NOW).unwrap(), UserId(7));
    }

    #[test]
    fn expired_token_refused() {
        let signer = TokenSigner::new("secret", 1);
        let issued = signer.issue(UserId(7), NOW);
        assert_eq!(
            signer.verify(&issued.token, NOW + 3600),
            Err(TokenError::Expired)
        );
    }

    #[test]
    fn other_secret_refused() {
        let issued = TokenSigner::new("secret", 1).issue(UserId(7), NOW);
        assert_eq!(
            TokenSigner::new("other", 1).verify(&issued.token, NOW),
            Err(TokenError::BadSignature)
        );
    }

    #[test]
    fn tampered_payload_refused() {
        let signer = TokenSigner::new("secret", 1);
        let issued = signer.issue(UserId(7), NOW);
        let (_, mac) = issued.token.split_once('.').unwrap();
        let forged = format!(
            "{}.{}",
            URL_SAFE_NO_PAD.encode(format!("1.{}", NOW + 3600)),
            mac
        );
        assert_eq!(signer.verify(&forged, NOW), Err(TokenError::BadSignature));
    }

    #[test]
    fn garbage_is_malformed() {
        let signer = TokenSigner::new("secret", 1);
        assert_eq!(signer.verify("not-a-token", NOW), Err(TokenError::Malformed));
        assert_eq!(signer.verify("!!.??", NOW), Err(TokenError::Malformed));
    }

    #[test]
    fn debug_hides_key() {
        let rendered = format!("{:?}", TokenSigner::new("secret", 1));
        assert!(rendered.contains("redacted"));
    }
}
