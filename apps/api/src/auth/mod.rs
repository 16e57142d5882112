//! Request authentication.
//!
//! `AuthUser` is an Axum extractor: any handler that takes it runs only after the
//! access and identity cookies verify and the user row exists. Every failure to
//! authenticate is a bare 401; nothing about *why* reaches the client.

pub mod handlers;
pub mod provider;

use axum::{async_trait, extract::FromRequestParts, http::request::Parts};
use axum_extra::extract::CookieJar;
use serde::Serialize;
use tracing::debug;

use crate::errors::AppError;
use crate::state::AppState;
use provider::{AuthError, IdentityProvider, TokenClaims, TokenKind};

/// The caller, as materialized from verified token claims.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    pub id: String,
    pub email: String,
    pub name: String,
    pub email_verified: bool,
}

impl AuthUser {
    fn from_claims(claims: TokenClaims) -> Self {
        let email = claims.email.unwrap_or_default();
        let name = claims
            .name
            .filter(|n| !n.trim().is_empty())
            .or_else(|| {
                let full = [claims.given_name, claims.family_name]
                    .into_iter()
                    .flatten()
                    .collect::<Vec<_>>()
                    .join(" ");
                (!full.trim().is_empty()).then_some(full)
            })
            .or_else(|| {
                email
                    .split_once('@')
                    .map(|(local, _)| local.to_string())
                    .filter(|local| !local.is_empty())
            })
            .unwrap_or_else(|| claims.sub.clone());

        Self {
            id: claims.sub,
            email,
            name,
            email_verified: claims.email_verified.unwrap_or(false),
        }
    }
}

/// Verifies both tokens and derives the user from the identity token.
pub async fn authenticate(
    provider: &dyn IdentityProvider,
    access_token: Option<&str>,
    id_token: Option<&str>,
) -> Result<AuthUser, AuthError> {
    let access_token = access_token
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken("access"))?;
    let id_token = id_token
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::MissingToken("identity"))?;

    let access = provider.verify(access_token, TokenKind::Access).await?;
    let identity = provider.verify(id_token, TokenKind::Identity).await?;
    if access.sub != identity.sub {
        return Err(AuthError::SubjectMismatch);
    }

    Ok(AuthUser::from_claims(identity))
}

impl From<AuthError> for AppError {
    fn from(err: AuthError) -> Self {
        if err.is_internal() {
            AppError::Internal(anyhow::Error::new(err))
        } else {
            debug!("Rejected credentials: {err}");
            AppError::Unauthorized
        }
    }
}

#[async_trait]
impl FromRequestParts<AppState> for AuthUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, AppError> {
        let jar = CookieJar::from_headers(&parts.headers);
        let cookies = &state.config.auth;

        let user = authenticate(
            state.identity.as_ref(),
            jar.get(&cookies.access_cookie).map(|c| c.value()),
            jar.get(&cookies.id_cookie).map(|c| c.value()),
        )
        .await?;

        state.store.upsert_user(&user).await?;
        Ok(user)
    }
}
