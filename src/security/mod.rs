pub mod token_auth;

pub use token_auth::{AuthError, TokenAuthenticator};
