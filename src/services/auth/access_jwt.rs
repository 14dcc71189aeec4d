//! Access token verification: `Authorization` header → verified `Claims`.

use std::sync::Arc;

use jsonwebtoken::{Algorithm, Validation, errors::ErrorKind};
use tracing::debug;

use crate::services::auth::{claims::Claims, error::AuthError, keys::KeyStore};

/// Verifier for bearer access tokens issued by the identity provider.
///
/// - Key material lives in `KeyStore` and is never printed.
/// - `validation` carries iss/aud/leeway and the allowed algorithm list; a per-request
///   copy is narrowed to the token's own `alg` before decoding.
#[derive(Debug)]
pub struct AuthService {
    keys: Arc<KeyStore>,
    validation: Validation,
}

impl AuthService {
    pub fn new(
        keys: Arc<KeyStore>,
        issuer: &str,
        audience: &str,
        algorithms: &[Algorithm],
        leeway_seconds: u64,
    ) -> Self {
        let mut validation = Validation::new(algorithms.first().copied().unwrap_or_default());
        validation.algorithms = algorithms.to_vec();
        validation.set_issuer(&[issuer]);
        validation.set_audience(&[audience]);
        validation.set_required_spec_claims(&["exp", "iss", "aud", "sub"]);
        validation.validate_nbf = true;
        validation.leeway = leeway_seconds;

        Self { keys, validation }
    }

    pub fn keys(&self) -> &KeyStore {
        &self.keys
    }

    /// Verify the raw `Authorization` header value and decode its claims.
    pub fn verify(&self, authorization: Option<&str>) -> Result<Claims, AuthError> {
        let token = bearer_token(authorization)?;

        let header = jsonwebtoken::decode_header(token).map_err(|e| {
            debug!(error = %e, "undecodable token header");
            AuthError::invalid_token("unable to parse authentication token")
        })?;

        let kid = header
            .kid
            .as_deref()
            .ok_or_else(|| AuthError::invalid_key("authorization malformed: missing key id"))?;

        let key = self
            .keys
            .get(kid)
            .ok_or_else(AuthError::unknown_key)?;

        if !self.validation.algorithms.contains(&header.alg) {
            return Err(AuthError::invalid_token(format!(
                "unsupported signing algorithm: {:?}",
                header.alg
            )));
        }

        // jsonwebtoken rejects a key whose family doesn't match *every* listed
        // algorithm, so narrow the list to the one this token uses.
        let mut validation = self.validation.clone();
        validation.algorithms = vec![header.alg];

        let data = jsonwebtoken::decode::<Claims>(token, &key, &validation).map_err(classify)?;

        Ok(data.claims)
    }
}

/// `Bearer <token>`: exactly two space-separated parts, scheme matched literally.
fn bearer_token(authorization: Option<&str>) -> Result<&str, AuthError> {
    let value =
        authorization.ok_or_else(|| AuthError::invalid_header("authorization header is expected"))?;

    let parts: Vec<&str> = value.split(' ').collect();
    match parts.as_slice() {
        [scheme, ..] if *scheme != "Bearer" => Err(AuthError::invalid_header(
            "authorization header must start with \"Bearer\"",
        )),
        [_] | [_, ""] => Err(AuthError::invalid_header("token not found")),
        [_, token] => Ok(token),
        _ => Err(AuthError::invalid_header(
            "authorization header must be bearer token",
        )),
    }
}

fn classify(err: jsonwebtoken::errors::Error) -> AuthError {
    match err.kind() {
        ErrorKind::ExpiredSignature => AuthError::token_expired(),
        ErrorKind::InvalidIssuer | ErrorKind::InvalidAudience => {
            AuthError::invalid_claims("incorrect claims, please check the audience and issuer")
        }
        ErrorKind::ImmatureSignature => AuthError::invalid_claims("token is not valid yet"),
        ErrorKind::MissingRequiredClaim(claim) => {
            AuthError::invalid_claims(format!("missing required claim: {claim}"))
        }
        _ => {
            debug!(error = %err, "token rejected");
            AuthError::invalid_token("unable to parse authentication token")
        }
    }
}

#[cfg(test)]
mod tests {
    use axum::http::StatusCode;
    use base64::Engine as _;
    use jsonwebtoken::{EncodingKey, Header};
    use serde_json::json;

    use super::*;
    use crate::services::auth::error::AuthErrorKind;
    use crate::test_support::{
        AUDIENCE, ISSUER, TRUSTED_KID, TRUSTED_PEM, UNTRUSTED_PEM, auth_service, bearer, claims_with,
        now, sign, token_with,
    };

    #[test]
    fn missing_header_is_invalid_header() {
        let err = auth_service().verify(None).unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::InvalidHeader);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn malformed_headers_are_invalid_header() {
        let auth = auth_service();
        for value in [
            "",
            "Bearer",
            "Bearer ",
            "bearer abc.def.ghi",
            "Basic dXNlcjpwYXNz",
            "Bearer abc.def.ghi extra",
            "Bearer  abc.def.ghi",
        ] {
            let err = auth.verify(Some(value)).unwrap_err();
            assert_eq!(err.kind(), AuthErrorKind::InvalidHeader, "header {value:?}");
            assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        }
    }

    #[test]
    fn valid_token_yields_claims() {
        let token = token_with(&["get:drinks-detail"]);
        let claims = auth_service().verify(Some(&bearer(&token))).unwrap();

        assert_eq!(claims.iss, ISSUER);
        assert_eq!(claims.aud, json!(AUDIENCE));
        assert_eq!(claims.sub, "auth0|barista");
        assert_eq!(
            claims.permissions,
            Some(vec!["get:drinks-detail".to_string()])
        );
    }

    #[test]
    fn garbage_token_is_invalid_token() {
        let auth = auth_service();
        for token in ["abc.def.ghi", "not-a-jwt", "e30.e30.e30"] {
            let err = auth.verify(Some(&bearer(token))).unwrap_err();
            assert_eq!(err.kind(), AuthErrorKind::InvalidToken, "token {token:?}");
            assert_eq!(err.status(), StatusCode::BAD_REQUEST);
        }
    }

    #[test]
    fn forged_signature_is_invalid_token() {
        let token = token_with(&["get:drinks-detail"]);
        let mut segments: Vec<&str> = token.split('.').collect();
        let forged = base64::engine::general_purpose::URL_SAFE_NO_PAD.encode([7u8; 64]);
        segments[2] = &forged;

        let err = auth_service()
            .verify(Some(&bearer(&segments.join("."))))
            .unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::InvalidToken);
    }

    #[test]
    fn trusted_kid_signed_by_other_key_is_invalid_token() {
        let token = sign(&claims_with(&["get:drinks-detail"]), Some(TRUSTED_KID), UNTRUSTED_PEM);
        let err = auth_service().verify(Some(&bearer(&token))).unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::InvalidToken);
    }

    #[test]
    fn unknown_or_missing_kid_is_invalid_key() {
        let auth = auth_service();

        let untrusted = sign(&claims_with(&[]), Some("rogue-key"), UNTRUSTED_PEM);
        let err = auth.verify(Some(&bearer(&untrusted))).unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::InvalidKey);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
        assert!(err.is_key_miss());

        let no_kid = sign(&claims_with(&[]), None, UNTRUSTED_PEM);
        let err = auth.verify(Some(&bearer(&no_kid))).unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::InvalidKey);
        assert!(!err.is_key_miss());
    }

    #[test]
    fn disallowed_algorithm_is_invalid_token() {
        let mut header = Header::new(Algorithm::HS256);
        header.kid = Some(TRUSTED_KID.to_string());
        let token = jsonwebtoken::encode(
            &header,
            &claims_with(&["get:drinks-detail"]),
            &EncodingKey::from_secret(b"shared-secret"),
        )
        .unwrap();

        let err = auth_service().verify(Some(&bearer(&token))).unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::InvalidToken);
    }

    #[test]
    fn expired_token_is_token_expired() {
        let mut claims = claims_with(&["get:drinks-detail"]);
        claims["exp"] = json!(now() - 3600);
        let token = sign(&claims, Some(TRUSTED_KID), TRUSTED_PEM);

        let err = auth_service().verify(Some(&bearer(&token))).unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::TokenExpired);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);
    }

    #[test]
    fn expiry_within_leeway_is_accepted() {
        let mut claims = claims_with(&[]);
        claims["exp"] = json!(now() - 10);
        let token = sign(&claims, Some(TRUSTED_KID), TRUSTED_PEM);

        assert!(auth_service().verify(Some(&bearer(&token))).is_ok());
    }

    #[test]
    fn audience_or_issuer_mismatch_is_invalid_claims() {
        let auth = auth_service();

        let mut wrong_aud = claims_with(&[]);
        wrong_aud["aud"] = json!("someone-else");
        let token = sign(&wrong_aud, Some(TRUSTED_KID), TRUSTED_PEM);
        let err = auth.verify(Some(&bearer(&token))).unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::InvalidClaims);
        assert_eq!(err.status(), StatusCode::UNAUTHORIZED);

        let mut wrong_iss = claims_with(&[]);
        wrong_iss["iss"] = json!("https://evil.example/");
        let token = sign(&wrong_iss, Some(TRUSTED_KID), TRUSTED_PEM);
        let err = auth.verify(Some(&bearer(&token))).unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::InvalidClaims);
    }

    #[test]
    fn audience_array_containing_expected_value_is_accepted() {
        let mut claims = claims_with(&[]);
        claims["aud"] = json!([AUDIENCE, "https://coffee.test/userinfo"]);
        let token = sign(&claims, Some(TRUSTED_KID), TRUSTED_PEM);

        let verified = auth_service().verify(Some(&bearer(&token))).unwrap();
        assert!(verified.aud.is_array());
    }

    #[test]
    fn not_yet_valid_token_is_invalid_claims() {
        let mut claims = claims_with(&[]);
        claims["nbf"] = json!(now() + 3600);
        let token = sign(&claims, Some(TRUSTED_KID), TRUSTED_PEM);

        let err = auth_service().verify(Some(&bearer(&token))).unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::InvalidClaims);
    }

    #[test]
    fn missing_subject_is_invalid_claims() {
        let mut claims = claims_with(&[]);
        claims.as_object_mut().unwrap().remove("sub");
        let token = sign(&claims, Some(TRUSTED_KID), TRUSTED_PEM);

        let err = auth_service().verify(Some(&bearer(&token))).unwrap_err();
        assert_eq!(err.kind(), AuthErrorKind::InvalidClaims);
    }
}
