pub mod access_jwt;
pub mod claims;
pub mod error;
pub mod factory;
pub mod keys;
pub mod permission;

pub use access_jwt::AuthService;
pub use claims::Claims;
pub use error::{AuthError, AuthErrorKind};
pub use factory::build_auth_service;
pub use keys::{JwksError, JwksFetcher, KeyStore};
