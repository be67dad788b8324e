pub mod authenticator;
pub mod credentials;

pub use authenticator::{AuthMethod, Authenticated, BcryptAuth};
pub use credentials::{CredentialSource, Credentials};
