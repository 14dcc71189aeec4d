//! Authorization failures raised by the token verifier and the permission gate.
//!
//! Every failure carries the HTTP status the boundary must answer with, so the
//! middleware never has to re-derive it from the kind.

use std::borrow::Cow;

use axum::http::StatusCode;
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthErrorKind {
    InvalidHeader,
    InvalidKey,
    InvalidToken,
    TokenExpired,
    InvalidClaims,
    Forbidden,
}

impl AuthErrorKind {
    pub fn code(&self) -> &'static str {
        match self {
            Self::InvalidHeader => "invalid_header",
            Self::InvalidKey => "invalid_key",
            Self::InvalidToken => "invalid_token",
            Self::TokenExpired => "token_expired",
            Self::InvalidClaims => "invalid_claims",
            Self::Forbidden => "forbidden",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{}: {description}", kind.code())]
pub struct AuthError {
    kind: AuthErrorKind,
    status: StatusCode,
    description: Cow<'static, str>,
    // kid was present but not in the current key set; a refetch might resolve it.
    key_miss: bool,
}

impl AuthError {
    fn new(kind: AuthErrorKind, status: StatusCode, description: impl Into<Cow<'static, str>>) -> Self {
        Self {
            kind,
            status,
            description: description.into(),
            key_miss: false,
        }
    }

    /// Missing or malformed `Authorization` header (always 401).
    pub fn invalid_header(description: impl Into<Cow<'static, str>>) -> Self {
        Self::new(AuthErrorKind::InvalidHeader, StatusCode::UNAUTHORIZED, description)
    }

    pub fn invalid_key(description: impl Into<Cow<'static, str>>) -> Self {
        Self::new(AuthErrorKind::InvalidKey, StatusCode::UNAUTHORIZED, description)
    }

    /// The token names a `kid` the current key set doesn't contain.
    pub fn unknown_key() -> Self {
        Self {
            key_miss: true,
            ..Self::invalid_key("unable to find the appropriate key")
        }
    }

    pub fn invalid_token(description: impl Into<Cow<'static, str>>) -> Self {
        Self::new(AuthErrorKind::InvalidToken, StatusCode::BAD_REQUEST, description)
    }

    pub fn token_expired() -> Self {
        Self::new(
            AuthErrorKind::TokenExpired,
            StatusCode::UNAUTHORIZED,
            "token expired",
        )
    }

    /// Issuer / audience / temporal claim mismatch.
    pub fn invalid_claims(description: impl Into<Cow<'static, str>>) -> Self {
        Self::new(AuthErrorKind::InvalidClaims, StatusCode::UNAUTHORIZED, description)
    }

    /// The token verified but carries no `permissions` claim at all.
    /// This is a token-shape problem, so it answers 400 rather than 401.
    pub fn permissions_missing() -> Self {
        Self::new(
            AuthErrorKind::InvalidClaims,
            StatusCode::BAD_REQUEST,
            "permissions not included in token",
        )
    }

    pub fn forbidden() -> Self {
        Self::new(
            AuthErrorKind::Forbidden,
            StatusCode::FORBIDDEN,
            "permission not found",
        )
    }

    pub fn kind(&self) -> AuthErrorKind {
        self.kind
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn description(&self) -> &str {
        &self.description
    }

    pub fn is_key_miss(&self) -> bool {
        self.key_miss
    }
}
