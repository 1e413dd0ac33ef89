pub mod claims;
pub mod config;
pub mod error;
pub mod extractors;
pub mod issuer;
pub mod verifier;

pub use claims::Claims;
pub use config::{JwtConfig, DEFAULT_TOKEN_TTL_SECONDS};
pub use error::{AuthError, AuthResult};
pub use extractors::AuthContext;
pub use issuer::{IssuedToken, TokenIssuer};
pub use verifier::JwtVerifier;
