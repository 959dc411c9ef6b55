// IAM token module
// Manages the token grant lifecycle and the identity endpoint protocol

mod types;
mod manager;
mod request;

pub use manager::{IamOptions, IamTokenManager};
pub use types::{TokenInfo, DEFAULT_IAM_URL};
