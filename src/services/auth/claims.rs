use serde::Deserialize;

/// Verified access-token claims.
///
/// NOTE:
/// - `aud` can be either a string or an array; jsonwebtoken validates it via `Validation::set_audience`.
/// - `permissions` stays optional so the gate can tell "no permissions claim" apart from
///   "permission not granted".
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct Claims {
    pub iss: String,
    // Keep as Value to accept both string and array.
    #[serde(default)]
    pub aud: serde_json::Value,

    pub sub: String,
    pub exp: u64,

    #[serde(default)]
    pub nbf: Option<u64>,
    #[serde(default)]
    pub iat: Option<u64>,

    #[serde(default)]
    pub permissions: Option<Vec<String>>,
}

impl Claims {
    /// Exact, case-sensitive membership. Order and duplicates don't matter.
    pub fn has_permission(&self, required: &str) -> bool {
        self.permissions
            .as_deref()
            .is_some_and(|granted| granted.iter().any(|p| p == required))
    }
}
