//! OAuth credential engine (C1, C2) and the auth-manager capability polymorphism (C3).

pub mod credentials;
pub mod manager;
pub mod oauth;

pub use credentials::{Credential, CredentialStore};
pub use manager::{AuthCapability, AuthManager};
pub use oauth::OAuthEngine;
