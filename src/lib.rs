// Watson Auth - credential resolution and IAM bearer-token management

pub mod authenticator;
pub mod credentials;
pub mod error;
pub mod iam;

pub use authenticator::Authenticator;
pub use credentials::ServiceCredentials;
pub use error::{AuthError, Result};
pub use iam::{IamOptions, IamTokenManager, TokenInfo, DEFAULT_IAM_URL};
