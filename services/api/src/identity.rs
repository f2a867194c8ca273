//! Identity provider admin client
//!
//! Accounts are created through the provider's admin API with the email
//! already confirmed and the username stored in the user metadata. The
//! provider's user id becomes the profile id.

use reqwest::StatusCode;
use serde::Deserialize;
use serde_json::json;
use thiserror::Error;
use tracing::info;
use uuid::Uuid;

use crate::config::IdentitySettings;

#[derive(Error, Debug)]
pub enum IdentityError {
    /// The provider refused the account, e.g. a duplicate email
    #[error("{0}")]
    Rejected(String),

    #[error("identity provider request failed: {0}")]
    Transport(#[from] reqwest::Error),
}

#[derive(Debug, Deserialize)]
struct CreatedUser {
    id: Uuid,
}

/// Error body shapes the provider answers with
#[derive(Debug, Default, Deserialize)]
struct ErrorBody {
    msg: Option<String>,
    message: Option<String>,
    error_description: Option<String>,
}

impl ErrorBody {
    fn into_message(self, status: StatusCode) -> String {
        self.msg
            .or(self.message)
            .or(self.error_description)
            .unwrap_or_else(|| format!("Identity provider rejected the request ({})", status))
    }
}

#[derive(Clone)]
pub struct IdentityClient {
    http: reqwest::Client,
    base_url: String,
    service_key: String,
}

impl IdentityClient {
    pub fn new(http: reqwest::Client, settings: &IdentitySettings) -> Self {
        Self {
            http,
            base_url: settings.url.trim_end_matches('/').to_string(),
            service_key: settings.service_key.clone(),
        }
    }

    fn admin_users_url(&self) -> String {
        format!("{}/auth/v1/admin/users", self.base_url)
    }

    /// Create a confirmed account and return its id
    pub async fn create_user(
        &self,
        email: &str,
        password: &str,
        username: &str,
    ) -> Result<Uuid, IdentityError> {
        let response = self
            .http
            .post(self.admin_users_url())
            .header("apikey", &self.service_key)
            .bearer_auth(&self.service_key)
            .json(&json!({
                "email": email,
                "password": password,
                "email_confirm": true,
                "user_metadata": { "username": username },
            }))
            .send()
            .await?;

        let status = response.status();
        if status.is_client_error() {
            let body: ErrorBody = response.json().await.unwrap_or_default();
            return Err(IdentityError::Rejected(body.into_message(status)));
        }

        let created: CreatedUser = response.error_for_status()?.json().await?;
        info!("Created identity {} for {}", created.id, username);

        Ok(created.id)
    }
}
