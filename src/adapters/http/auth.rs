use super::client::{ApiClient, ApiRequest};
use crate::domain::model::{ApiEnvelope, LoginData};
use crate::utils::error::Result;
use crate::utils::logger::redact;
use std::sync::Arc;

#[derive(Debug, Clone, PartialEq)]
pub enum LoginOutcome {
    ExistingUser(LoginData),
    /// The server rejected the Google account (HTTP 400/403): sign-up needed.
    NewUser,
    Failed(String),
}

pub struct AuthApi {
    client: Arc<ApiClient>,
}

impl AuthApi {
    pub fn new(client: Arc<ApiClient>) -> Self {
        Self { client }
    }

    /// Exchanges a Google ID token for an API session and stores the tokens.
    pub async fn google_login(&self, id_token: &str) -> Result<LoginOutcome> {
        let request = ApiRequest::post("api/auth/google").bearer(id_token);
        let response = self.client.execute(&request).await?;

        if !response.is_success() {
            tracing::error!("❌ Login failed: HTTP {} {}", response.status, response.text());
            return Ok(match response.status {
                400 | 403 => LoginOutcome::NewUser,
                status => LoginOutcome::Failed(format!("HTTP {}", status)),
            });
        }

        let envelope: ApiEnvelope<LoginData> = response.json()?;
        let Some(data) = envelope.into_payload() else {
            return Ok(LoginOutcome::Failed("login response carried no token".to_string()));
        };

        // servers without refresh tokens accept the access token instead
        let refresh = match &data.refresh_token {
            Some(token) => token.clone(),
            None => {
                tracing::warn!("No refresh token in response, reusing the JWT");
                data.jwt_token.clone()
            }
        };
        self.client
            .tokens()
            .set_tokens(data.jwt_token.clone(), Some(refresh));

        tracing::info!(
            "✅ Logged in as user {:?}, token {}",
            data.user_id,
            redact(&data.jwt_token)
        );
        Ok(LoginOutcome::ExistingUser(data))
    }

    pub fn logout(&self) {
        self.client.logout();
    }
}
