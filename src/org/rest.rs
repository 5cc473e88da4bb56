//! Direct REST access to the org, authenticated with the CLI's session token.

use crate::error::SfkitError;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;
use tracing::{debug, info};

const REST_CONNECT_TIMEOUT: Duration = Duration::from_secs(10);
const REST_REQUEST_TIMEOUT: Duration = Duration::from_secs(60);
pub const DEFAULT_API_VERSION: &str = "60.0";

/// Connection details from `sf org display`.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OrgConnection {
    pub instance_url: String,
    pub access_token: String,
    #[serde(default)]
    pub api_version: Option<String>,
    #[serde(default)]
    pub username: Option<String>,
    #[serde(default)]
    pub alias: Option<String>,
}

impl OrgConnection {
    pub fn sobject_url(&self, api_version: &str, sobject: &str) -> String {
        format!(
            "{}/services/data/v{}/sobjects/{}",
            self.instance_url.trim_end_matches('/'),
            api_version.trim_start_matches('v'),
            sobject
        )
    }
}

/// Body of the PermissionSet create call.
#[derive(Debug, Clone, Serialize)]
pub struct NewPermissionSet {
    #[serde(rename = "Label")]
    pub label: String,
    #[serde(rename = "Name")]
    pub name: String,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(rename = "HasActivationRequired")]
    pub has_activation_required: bool,
}

#[derive(Debug, Clone, Deserialize)]
pub struct CreatedRecord {
    pub id: String,
    #[serde(default)]
    pub success: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct RestErrorEntry {
    message: String,
    #[serde(default)]
    error_code: Option<String>,
}

pub struct RestClient {
    client: Client,
}

impl RestClient {
    pub fn new() -> Result<Self, SfkitError> {
        let client = Client::builder()
            .connect_timeout(REST_CONNECT_TIMEOUT)
            .timeout(REST_REQUEST_TIMEOUT)
            .build()
            .map_err(|e| SfkitError::Rest(format!("Failed to create HTTP client: {}", e)))?;
        Ok(Self { client })
    }

    /// Create a PermissionSet record. Returns the new record id.
    pub async fn create_permission_set(
        &self,
        connection: &OrgConnection,
        api_version: &str,
        permission_set: &NewPermissionSet,
    ) -> Result<CreatedRecord, SfkitError> {
        let url = connection.sobject_url(api_version, "PermissionSet");
        debug!(url = %url, name = %permission_set.name, "Creating permission set");

        let response = self
            .client
            .post(&url)
            .bearer_auth(&connection.access_token)
            .json(permission_set)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if !status.is_success() {
            return Err(SfkitError::RestRejected {
                status: status.as_u16(),
                message: rest_error_message(&body),
            });
        }

        let created: CreatedRecord = serde_json::from_str(&body).map_err(|e| {
            SfkitError::Rest(format!("Unexpected create response ({}): {}", e, body))
        })?;
        info!(id = %created.id, name = %permission_set.name, "Permission set created");
        Ok(created)
    }
}

/// Flatten a Salesforce REST error body (`[{"message":..,"errorCode":..}]`).
fn rest_error_message(body: &str) -> String {
    match serde_json::from_str::<Vec<RestErrorEntry>>(body) {
        Ok(entries) if !entries.is_empty() => entries
            .into_iter()
            .map(|e| match e.error_code {
                Some(code) => format!("{}: {}", code, e.message),
                None => e.message,
            })
            .collect::<Vec<_>>()
            .join("; "),
        _ if body.trim().is_empty() => "empty response body".to_string(),
        _ => body.trim().to_string(),
    }
}
