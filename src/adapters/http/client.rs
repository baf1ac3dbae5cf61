use crate::domain::ports::{AuthListener, TokenStore};
use crate::utils::error::{LookeyError, Result};
use crate::utils::logger::redact;
use reqwest::{multipart, Client, Method};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Mutex;
use url::Url;

const LOGIN_REQUIRED: &str = "로그인이 필요합니다. 구글 계정으로 다시 로그인해주세요.";
const SESSION_EXPIRED: &str = "세션이 만료되었습니다. 잠시 후 다시 시도해주세요.";

#[derive(Debug, Clone)]
pub struct ApiSettings {
    pub base_url: String,
    pub connect_timeout: Duration,
    pub request_timeout: Duration,
}

impl ApiSettings {
    pub fn new(base_url: impl Into<String>) -> Self {
        Self {
            base_url: base_url.into(),
            connect_timeout: Duration::from_secs(30),
            request_timeout: Duration::from_secs(30),
        }
    }
}

/// One multipart form field.
#[derive(Debug, Clone)]
pub enum FormPart {
    File {
        name: String,
        file_name: String,
        bytes: Vec<u8>,
        mime: String,
    },
    Text {
        name: String,
        value: String,
    },
}

impl FormPart {
    pub fn jpeg(name: &str, file_name: &str, bytes: &[u8]) -> Self {
        Self::File {
            name: name.to_string(),
            file_name: file_name.to_string(),
            bytes: bytes.to_vec(),
            mime: "image/jpeg".to_string(),
        }
    }

    pub fn text(name: &str, value: &str) -> Self {
        Self::Text {
            name: name.to_string(),
            value: value.to_string(),
        }
    }
}

#[derive(Debug, Clone)]
pub enum RequestBody {
    Empty,
    Json(serde_json::Value),
    Multipart(Vec<FormPart>),
}

/// Description of a request. Rebuilt into a fresh `reqwest` request on every
/// attempt, so multipart uploads survive the 401 retry.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    segments: Vec<String>,
    query: Vec<(String, String)>,
    body: RequestBody,
    authenticated: bool,
    bearer: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: &str) -> Self {
        Self {
            method,
            path: path.trim_start_matches('/').to_string(),
            segments: Vec::new(),
            query: Vec::new(),
            body: RequestBody::Empty,
            authenticated: true,
            bearer: None,
        }
    }

    pub fn get(path: &str) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: &str) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn delete(path: &str) -> Self {
        Self::new(Method::DELETE, path)
    }

    /// Appends a percent-encoded path segment.
    pub fn segment(mut self, segment: &str) -> Self {
        self.segments.push(segment.to_string());
        self
    }

    pub fn query(mut self, key: &str, value: impl ToString) -> Self {
        self.query.push((key.to_string(), value.to_string()));
        self
    }

    pub fn json<T: Serialize>(mut self, body: &T) -> Result<Self> {
        self.body = RequestBody::Json(serde_json::to_value(body)?);
        Ok(self)
    }

    pub fn multipart(mut self, parts: Vec<FormPart>) -> Self {
        self.body = RequestBody::Multipart(parts);
        self
    }

    /// Sends without the stored access token and skips 401 handling.
    pub fn without_auth(mut self) -> Self {
        self.authenticated = false;
        self
    }

    /// Sends an explicit bearer token instead of the stored one.
    pub fn bearer(mut self, token: &str) -> Self {
        self.bearer = Some(token.to_string());
        self.authenticated = false;
        self
    }

    pub fn endpoint(&self) -> String {
        if self.segments.is_empty() {
            self.path.clone()
        } else {
            format!("{}/{}", self.path, self.segments.join("/"))
        }
    }
}

/// Fully read HTTP response.
#[derive(Debug, Clone)]
pub struct ApiResponse {
    pub endpoint: String,
    pub status: u16,
    pub body: Vec<u8>,
}

impl ApiResponse {
    pub fn is_success(&self) -> bool {
        (200..300).contains(&self.status)
    }

    pub fn text(&self) -> String {
        String::from_utf8_lossy(&self.body).into_owned()
    }

    pub fn json<T: DeserializeOwned>(&self) -> Result<T> {
        if self.body.iter().all(|b| b.is_ascii_whitespace()) {
            return Err(LookeyError::EmptyBodyError {
                endpoint: self.endpoint.clone(),
            });
        }
        Ok(serde_json::from_slice(&self.body)?)
    }

    pub fn error_for_status(self) -> Result<Self> {
        if self.is_success() {
            return Ok(self);
        }
        let mut message = self.text();
        if message.chars().count() > 200 {
            message = message.chars().take(200).collect::<String>() + "...";
        }
        Err(LookeyError::api_status(self.endpoint, self.status, message))
    }
}

pub struct ApiClient {
    http: Client,
    base_url: Url,
    tokens: Arc<dyn TokenStore>,
    listener: Option<Arc<dyn AuthListener>>,
    refresh_lock: Mutex<()>,
}

impl ApiClient {
    pub fn new(settings: ApiSettings, tokens: Arc<dyn TokenStore>) -> Result<Self> {
        let mut base = settings.base_url.trim().to_string();
        if !base.ends_with('/') {
            base.push('/');
        }
        let base_url = Url::parse(&base)?;

        let http = Client::builder()
            .connect_timeout(settings.connect_timeout)
            .timeout(settings.request_timeout)
            .build()?;

        tracing::debug!("🌐 API client ready for {}", base_url);

        Ok(Self {
            http,
            base_url,
            tokens,
            listener: None,
            refresh_lock: Mutex::new(()),
        })
    }

    pub fn with_auth_listener(mut self, listener: Arc<dyn AuthListener>) -> Self {
        self.listener = Some(listener);
        self
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn tokens(&self) -> &Arc<dyn TokenStore> {
        &self.tokens
    }

    /// Sends the request. An authenticated request answered with 401 gets one
    /// token refresh and one retry; if either fails the session is dropped.
    pub async fn execute(&self, request: &ApiRequest) -> Result<ApiResponse> {
        let sent_token = if request.authenticated {
            self.tokens.access_token().filter(|t| !t.is_empty())
        } else {
            None
        };
        if request.authenticated && sent_token.is_none() {
            tracing::warn!("🔐 No token available for {}", request.endpoint());
        }

        let response = self.send(request, sent_token.as_deref()).await?;
        if response.status != 401 || !request.authenticated {
            return Ok(response);
        }

        tracing::debug!("🔐 401 received for {}", response.endpoint);
        let Some(fresh) = self.refresh_after_unauthorized(sent_token.as_deref()).await else {
            return Err(LookeyError::SessionExpired);
        };

        let retried = self.send(request, Some(&fresh)).await?;
        if retried.status == 401 {
            tracing::warn!(
                "🔐 {} still unauthorized after refresh, stopping",
                retried.endpoint
            );
            let _guard = self.refresh_lock.lock().await;
            if self.tokens.access_token().as_deref() == Some(fresh.as_str()) {
                self.logout();
            }
            return Err(LookeyError::SessionExpired);
        }
        Ok(retried)
    }

    /// Requests a new access token with the stored refresh token and stores it.
    pub async fn refresh_access_token(&self) -> Result<String> {
        let refresh = self
            .tokens
            .refresh_token()
            .filter(|t| !t.is_empty())
            .ok_or_else(|| LookeyError::UnauthorizedError {
                message: "No refresh token available".to_string(),
            })?;

        tracing::debug!("🔄 Refreshing access token with {}", redact(&refresh));

        let request = ApiRequest::post("api/auth/refresh")
            .bearer(&refresh)
            .json(&crate::domain::model::RefreshRequest {
                refresh_token: refresh.clone(),
            })?;
        let response = self.send(&request, None).await?.error_for_status()?;

        let body: serde_json::Value = response.json()?;
        let new_access = ["jwtToken", "/data/jwtToken", "/result/jwtToken"]
            .iter()
            .find_map(|key| {
                let value = if key.starts_with('/') {
                    body.pointer(key)
                } else {
                    body.get(*key)
                };
                value.and_then(|v| v.as_str()).filter(|s| !s.is_empty())
            })
            .map(str::to_string)
            .ok_or_else(|| LookeyError::EmptyBodyError {
                endpoint: "api/auth/refresh".to_string(),
            })?;

        tracing::info!("🔄 Token refresh successful, new token: {}", redact(&new_access));
        self.tokens.set_access_token(new_access.clone());
        Ok(new_access)
    }

    /// Fails fast when no access token is stored, dropping the session.
    pub fn ensure_token(&self) -> Result<()> {
        if self.tokens.access_token().is_some_and(|t| !t.is_empty()) {
            return Ok(());
        }

        let message = if self.tokens.refresh_token().is_some_and(|t| !t.is_empty()) {
            SESSION_EXPIRED
        } else {
            LOGIN_REQUIRED
        };
        self.logout();
        Err(LookeyError::UnauthorizedError {
            message: message.to_string(),
        })
    }

    pub fn logout(&self) {
        tracing::warn!("🚪 Logging out user due to authentication failure");
        self.tokens.clear();
        if let Some(listener) = &self.listener {
            listener.on_logout();
        }
    }

    /// Refreshes at most once per stale token. Logs out on failure, under
    /// the lock, so waiting requests see the ended session instead.
    async fn refresh_after_unauthorized(&self, stale: Option<&str>) -> Option<String> {
        let _guard = self.refresh_lock.lock().await;

        // another request may have refreshed or logged out while we waited
        match self.tokens.access_token().filter(|t| !t.is_empty()) {
            Some(current) if Some(current.as_str()) != stale => {
                tracing::debug!("🔄 Token already refreshed by a concurrent request");
                return Some(current);
            }
            None if stale.is_some() => {
                tracing::debug!("🚪 Session already ended by a concurrent request");
                return None;
            }
            _ => {}
        }

        match self.refresh_access_token().await {
            Ok(token) => Some(token),
            Err(e) => {
                tracing::error!("🔄 Token refresh failed: {}", e);
                self.logout();
                None
            }
        }
    }

    fn resolve(&self, request: &ApiRequest) -> Result<Url> {
        let mut url = self.base_url.join(&request.path)?;
        if !request.segments.is_empty() {
            url.path_segments_mut()
                .map_err(|_| LookeyError::ConfigError {
                    message: format!("Base URL cannot carry path segments: {}", self.base_url),
                })?
                .pop_if_empty()
                .extend(&request.segments);
        }
        Ok(url)
    }

    async fn send(&self, request: &ApiRequest, token: Option<&str>) -> Result<ApiResponse> {
        let url = self.resolve(request)?;
        let endpoint = request.endpoint();

        let mut builder = self.http.request(request.method.clone(), url.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(token) = request.bearer.as_deref().or(token) {
            tracing::debug!("🔐 Authorization: Bearer {}", redact(token));
            builder = builder.bearer_auth(token);
        }
        builder = match &request.body {
            RequestBody::Empty => builder,
            RequestBody::Json(value) => builder.json(value),
            RequestBody::Multipart(parts) => builder.multipart(build_form(parts)?),
        };

        tracing::debug!("📡 {} {}", request.method, url);
        let response = builder.send().await?;
        let status = response.status().as_u16();
        let body = response.bytes().await?.to_vec();
        tracing::debug!("📡 {} -> HTTP {} ({} bytes)", endpoint, status, body.len());

        Ok(ApiResponse {
            endpoint,
            status,
            body,
        })
    }
}

fn build_form(parts: &[FormPart]) -> Result<multipart::Form> {
    let mut form = multipart::Form::new();
    for part in parts {
        form = match part {
            FormPart::File {
                name,
                file_name,
                bytes,
                mime,
            } => {
                let file = multipart::Part::bytes(bytes.clone())
                    .file_name(file_name.clone())
                    .mime_str(mime)?;
                form.part(name.clone(), file)
            }
            FormPart::Text { name, value } => form.text(name.clone(), value.clone()),
        };
    }
    Ok(form)
}
