// Authenticator seam consumed by request builders

use std::sync::Arc;

use base64::engine::general_purpose::STANDARD as BASE64;
use base64::Engine;
use reqwest::RequestBuilder;

use crate::credentials::ServiceCredentials;
use crate::error::{AuthError, Result};
use crate::iam::{IamOptions, IamTokenManager};

/// Prefix marking an ICP API key, which the IAM endpoint does not accept and
/// which is sent as a Basic password instead
const ICP_PREFIX: &str = "icp-";

/// How outbound requests authenticate
///
/// One variant per credential style the services accept; request builders
/// call [`Authenticator::apply`] on every outgoing request and never deal
/// with tokens directly.
#[derive(Debug, Clone)]
pub enum Authenticator {
    /// Bearer token minted and renewed by the IAM manager
    Iam(Arc<IamTokenManager>),
    /// Basic username/password pair
    Basic { username: String, password: String },
    /// Legacy per-service authorization token header
    WatsonToken(String),
    /// No authentication at all
    NoAuth,
}

impl Authenticator {
    /// Choose an authenticator for a resolved credential set
    ///
    /// IAM credentials win over a username/password pair. A username of
    /// literally "apikey" marks the password as an IAM API key, except for
    /// "icp-" keys, which stay Basic.
    pub fn from_credentials(creds: &ServiceCredentials) -> Result<Self> {
        check_credentials(creds)?;

        if creds.iam_access_token.is_some() || creds.iam_api_key.is_some() {
            let manager = IamTokenManager::new(IamOptions {
                api_key: creds.iam_api_key.clone(),
                access_token: creds.iam_access_token.clone(),
                url: creds.iam_url.clone(),
            })?;
            return Ok(Authenticator::Iam(Arc::new(manager)));
        }

        if let (Some(username), Some(password)) = (&creds.username, &creds.password) {
            if username == "apikey" && !password.starts_with(ICP_PREFIX) {
                let manager = IamTokenManager::new(IamOptions {
                    api_key: Some(password.clone()),
                    url: creds.iam_url.clone(),
                    ..Default::default()
                })?;
                return Ok(Authenticator::Iam(Arc::new(manager)));
            }

            return Ok(Authenticator::Basic {
                username: username.clone(),
                password: password.clone(),
            });
        }

        Err(AuthError::MissingCredentials(
            "set an IAM API key, an IAM access token, or a username and password".to_string(),
        ))
    }

    /// Header name/value pair for an outbound request, None for NoAuth
    pub async fn header(&self) -> Result<Option<(&'static str, String)>> {
        match self {
            Authenticator::Iam(manager) => {
                let token = manager.get_token().await?;
                Ok(Some(("Authorization", format!("Bearer {}", token))))
            }
            Authenticator::Basic { username, password } => {
                let encoded = BASE64.encode(format!("{}:{}", username, password));
                Ok(Some(("Authorization", format!("Basic {}", encoded))))
            }
            Authenticator::WatsonToken(token) => {
                Ok(Some(("X-Watson-Authorization-Token", token.clone())))
            }
            Authenticator::NoAuth => Ok(None),
        }
    }

    /// Apply the authentication header to an outbound request
    pub async fn apply(&self, builder: RequestBuilder) -> Result<RequestBuilder> {
        match self.header().await? {
            Some((name, value)) => Ok(builder.header(name, value)),
            None => Ok(builder),
        }
    }
}

/// Reject credential values that start or end with curly brackets or quotes,
/// the signature of a value pasted together with its surrounding JSON
fn check_credentials(creds: &ServiceCredentials) -> Result<()> {
    let suspects = [
        &creds.username,
        &creds.password,
        &creds.iam_api_key,
        &creds.url,
    ];

    for value in suspects.into_iter().flatten() {
        if bracketed_or_quoted(value) {
            return Err(AuthError::InvalidCredentials(
                "Revise these credentials - they should not start or end with curly brackets or quotes."
                    .to_string(),
            ));
        }
    }

    Ok(())
}

fn bracketed_or_quoted(value: &str) -> bool {
    const MARKS: [char; 3] = ['{', '}', '"'];
    value.starts_with(MARKS) || value.ends_with(MARKS)
}
