// IAM identity endpoint protocol

use reqwest::Client;

use crate::error::{AuthError, Result};

use super::types::TokenInfo;

/// Fixed client authorization sent on every token request; "bx:bx" is the
/// public client id/secret pair shared by all IBM Cloud SDKs
const IAM_CLIENT_AUTHORIZATION: &str = "Basic Yng6Yng=";

const APIKEY_GRANT_TYPE: &str = "urn:ibm:params:oauth:grant-type:apikey";

/// Exchange an API key for a fresh token grant
pub async fn request_token(client: &Client, url: &str, api_key: &str) -> Result<TokenInfo> {
    tracing::debug!("Requesting IAM token with API key grant from {}", url);

    let form = [
        ("grant_type", APIKEY_GRANT_TYPE),
        ("apikey", api_key),
        ("response_type", "cloud_iam"),
    ];

    post_form(client, url, &form).await
}

/// Renew the token grant using the stored refresh token
pub async fn refresh_token(client: &Client, url: &str, refresh_token: &str) -> Result<TokenInfo> {
    tracing::debug!("Refreshing IAM token via {}", url);

    let form = [
        ("grant_type", "refresh_token"),
        ("refresh_token", refresh_token),
    ];

    post_form(client, url, &form).await
}

async fn post_form(client: &Client, url: &str, form: &[(&str, &str)]) -> Result<TokenInfo> {
    let response = client
        .post(url)
        .header("Content-Type", "application/x-www-form-urlencoded")
        .header("Authorization", IAM_CLIENT_AUTHORIZATION)
        .form(form)
        .send()
        .await?;

    let status = response.status();
    if !status.is_success() {
        let body = response.text().await.unwrap_or_default();
        tracing::error!("IAM token request failed: {} - {}", status, body);
        return Err(AuthError::TokenEndpoint {
            status: status.as_u16(),
            body,
        });
    }

    response.json().await.map_err(AuthError::MalformedResponse)
}
