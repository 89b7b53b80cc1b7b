//! Session extraction: `token` cookie or `Authorization: Bearer`.
//!
//! The token only names the caller. The role is re-read from the identity
//! store on every request, so a role change takes effect immediately.

use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::{AUTHORIZATION, COOKIE};
use axum::http::request::Parts;
use axum::http::HeaderMap;

use poap_identity::IdentityError;
use poap_types::{Identity, IdentityAddress, Role};

use crate::{AppState, RpcError};

/// Name of the session cookie.
pub const SESSION_COOKIE: &str = "token";

/// The authenticated caller.
#[derive(Clone, Debug)]
pub struct Session {
    pub identity: Identity,
}

impl Session {
    pub fn address(&self) -> &IdentityAddress {
        self.identity.address()
    }

    pub fn require(&self, role: Role) -> Result<(), RpcError> {
        if self.identity.is(role) {
            Ok(())
        } else {
            Err(RpcError::Forbidden(format!(
                "requires role {role}, caller is {}",
                self.identity.role()
            )))
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for Session {
    type Rejection = RpcError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = session_token(&parts.headers)
            .ok_or_else(|| RpcError::Unauthorized("no session token provided".into()))?;
        let address = state.sessions.verify(&token)?;
        let identity = state.identities.resolve(&address).map_err(|e| match e {
            IdentityError::NotFound(_) => RpcError::Unauthorized("account no longer exists".into()),
            other => other.into(),
        })?;
        Ok(Session { identity })
    }
}

/// Bearer header first, then the cookie.
pub fn session_token(headers: &HeaderMap) -> Option<String> {
    if let Some(bearer) = headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|t| !t.is_empty())
    {
        return Some(bearer.to_string());
    }

    headers
        .get_all(COOKIE)
        .iter()
        .filter_map(|v| v.to_str().ok())
        .flat_map(|v| v.split(';'))
        .filter_map(|pair| pair.trim().split_once('='))
        .find(|(name, value)| *name == SESSION_COOKIE && !value.is_empty())
        .map(|(_, value)| value.to_string())
}

/// `Set-Cookie` value carrying a fresh session token.
pub fn session_cookie(token: &str, max_age_secs: u64, secure: bool) -> String {
    let mut cookie = format!(
        "{SESSION_COOKIE}={token}; HttpOnly; SameSite=Strict; Path=/; Max-Age={max_age_secs}"
    );
    if secure {
        cookie.push_str("; Secure");
    }
    cookie
}

/// `Set-Cookie` value that clears the session.
pub fn cleared_cookie(secure: bool) -> String {
    session_cookie("", 0, secure)
}
