//! Permission gate: verified claims must carry the permission a route requires.

use crate::services::auth::{AuthService, claims::Claims, error::AuthError};

impl AuthService {
    /// Verify the header, then require `required` in the token's `permissions`.
    ///
    /// Verifier errors propagate unchanged. On success the claims are returned as-is
    /// so handlers can use `sub` etc.
    pub fn authorize(
        &self,
        required: &str,
        authorization: Option<&str>,
    ) -> Result<Claims, AuthError> {
        let claims = self.verify(authorization)?;
        check_permission(&claims, required)?;
        Ok(claims)
    }
}

pub fn check_permission(claims: &Claims, required: &str) -> Result<(), AuthError> {
    if claims.permissions.is_none() {
        return Err(AuthError::permissions_missing());
    }
    if !claims.has_permission(required) {
        return Err(AuthError::forbidden());
    }
    Ok(())
}
