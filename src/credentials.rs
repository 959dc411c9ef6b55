// Credential discovery for named services
// Merges programmatic options, the ibm-credentials.env file, process
// environment variables, and the VCAP_SERVICES JSON

use std::collections::HashMap;
use std::env;
use std::path::{Path, PathBuf};

use anyhow::Context;
use serde_json::Value;

use crate::error::Result;

/// Name of the credentials file searched for in the conventional locations
const CREDENTIALS_FILENAME: &str = "ibm-credentials.env";

/// Environment variable pointing at the credentials file, or at a directory
/// containing it
const CREDENTIALS_FILE_VAR: &str = "IBM_CREDENTIALS_FILE";

/// Resolved credential set for one service, all fields optional
/// The authenticator layer decides whether what was found is sufficient
#[derive(Debug, Clone, Default, PartialEq)]
pub struct ServiceCredentials {
    pub iam_api_key: Option<String>,
    pub iam_access_token: Option<String>,
    pub iam_url: Option<String>,
    pub username: Option<String>,
    pub password: Option<String>,
    pub url: Option<String>,
}

impl ServiceCredentials {
    /// Field-wise merge, keeping self's values where present
    fn or(self, lower: ServiceCredentials) -> ServiceCredentials {
        ServiceCredentials {
            iam_api_key: self.iam_api_key.or(lower.iam_api_key),
            iam_access_token: self.iam_access_token.or(lower.iam_access_token),
            iam_url: self.iam_url.or(lower.iam_url),
            username: self.username.or(lower.username),
            password: self.password.or(lower.password),
            url: self.url.or(lower.url),
        }
    }
}

/// Resolve credentials for a named service
///
/// Each field is taken from the highest-precedence source that has it:
/// programmatic options, then the credentials file, then the process
/// environment, then VCAP_SERVICES. A service that appears nowhere resolves
/// to an empty set, not an error.
pub fn resolve(service_name: &str, options: ServiceCredentials) -> Result<ServiceCredentials> {
    let prefix = env_prefix(service_name);

    let from_file = match credentials_file_entries()? {
        Some(entries) => from_lookup(&prefix, |key| entries.get(key).cloned()),
        None => ServiceCredentials::default(),
    };

    let from_env = from_lookup(&prefix, |key| env::var(key).ok());

    let from_vcap = from_vcap_services(service_name)?;

    Ok(options.or(from_file).or(from_env).or(from_vcap))
}

/// Env-style key prefix for a service name
/// "speech-to-text" becomes "SPEECH_TO_TEXT"
fn env_prefix(service_name: &str) -> String {
    service_name.to_uppercase().replace('-', "_")
}

/// Build a credential set by looking up the six conventional keys
fn from_lookup(prefix: &str, mut get: impl FnMut(&str) -> Option<String>) -> ServiceCredentials {
    ServiceCredentials {
        iam_api_key: get(&format!("{}_IAM_APIKEY", prefix)),
        iam_access_token: get(&format!("{}_IAM_ACCESS_TOKEN", prefix)),
        iam_url: get(&format!("{}_IAM_URL", prefix)),
        username: get(&format!("{}_USERNAME", prefix)),
        password: get(&format!("{}_PASSWORD", prefix)),
        url: get(&format!("{}_URL", prefix)),
    }
}

/// Parsed contents of the credentials file, or None when no file exists
fn credentials_file_entries() -> anyhow::Result<Option<HashMap<String, String>>> {
    match locate_credentials_file() {
        Some(path) => {
            tracing::debug!("Loading credentials from {}", path.display());
            read_credentials_file(&path).map(Some)
        }
        None => Ok(None),
    }
}

/// Locate the credentials file: IBM_CREDENTIALS_FILE first (the file itself,
/// under any name, or a directory containing ibm-credentials.env), then the
/// home directory, then the working directory. A missing file is not an
/// error.
fn locate_credentials_file() -> Option<PathBuf> {
    if let Ok(given) = env::var(CREDENTIALS_FILE_VAR) {
        if !given.is_empty() {
            let given = PathBuf::from(given);
            if given.is_file() {
                return Some(given);
            }
            let in_given_dir = given.join(CREDENTIALS_FILENAME);
            if in_given_dir.is_file() {
                return Some(in_given_dir);
            }
            tracing::warn!(
                "{} points at {}, which does not exist; ignoring",
                CREDENTIALS_FILE_VAR,
                given.display()
            );
            return None;
        }
    }

    if let Some(home) = dirs::home_dir() {
        let in_home = home.join(CREDENTIALS_FILENAME);
        if in_home.is_file() {
            return Some(in_home);
        }
    }

    if let Ok(cwd) = env::current_dir() {
        let in_cwd = cwd.join(CREDENTIALS_FILENAME);
        if in_cwd.is_file() {
            return Some(in_cwd);
        }
    }

    None
}

/// Parse the credentials file without touching the process environment
fn read_credentials_file(path: &Path) -> anyhow::Result<HashMap<String, String>> {
    let iter = dotenvy::from_path_iter(path)
        .with_context(|| format!("Failed to open credentials file: {}", path.display()))?;

    let mut entries = HashMap::new();
    for item in iter {
        let (key, value) = item
            .with_context(|| format!("Failed to parse credentials file: {}", path.display()))?;
        entries.insert(key, value);
    }

    Ok(entries)
}

/// Credentials contributed by the first VCAP_SERVICES entry whose service key
/// starts with the service name
fn from_vcap_services(service_name: &str) -> anyhow::Result<ServiceCredentials> {
    let raw = match env::var("VCAP_SERVICES") {
        Ok(raw) if !raw.is_empty() => raw,
        _ => return Ok(ServiceCredentials::default()),
    };

    let services: Value =
        serde_json::from_str(&raw).context("Failed to parse VCAP_SERVICES as JSON")?;

    let object = match services.as_object() {
        Some(object) => object,
        None => return Ok(ServiceCredentials::default()),
    };

    for (key, entries) in object {
        if !key.starts_with(service_name) {
            continue;
        }

        let credentials = entries
            .get(0)
            .and_then(|entry| entry.get("credentials"))
            .cloned()
            .unwrap_or(Value::Null);

        let get = |field: &str| {
            credentials
                .get(field)
                .and_then(Value::as_str)
                .map(str::to_string)
        };

        return Ok(ServiceCredentials {
            iam_api_key: get("apikey").or_else(|| get("iam_apikey")),
            iam_access_token: None,
            iam_url: None,
            username: get("username"),
            password: get("password"),
            url: get("url"),
        });
    }

    Ok(ServiceCredentials::default())
}
