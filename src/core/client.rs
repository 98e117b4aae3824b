use crate::config::{GrantType, InstanceConfig};
use crate::utils::error::{Result, SnowError};
use reqwest::header::{HeaderMap, ACCEPT, CONTENT_TYPE};
use reqwest::Method;
use serde_json::Value;
use std::collections::BTreeMap;
use std::time::Duration;

pub type QueryParams = BTreeMap<String, String>;

#[derive(Clone)]
enum Auth {
    Basic { username: String, password: String },
    Bearer(String),
}

impl std::fmt::Debug for Auth {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Auth::Basic { username, .. } => write!(f, "Basic({})", username),
            Auth::Bearer(_) => write!(f, "Bearer(***)"),
        }
    }
}

#[derive(Debug, Clone)]
pub enum Body {
    Json(Value),
    Raw { content: Vec<u8>, content_type: String },
}

#[derive(Debug, Clone)]
pub struct Response {
    pub status: u16,
    pub headers: HeaderMap,
    pub body: Vec<u8>,
}

impl Response {
    pub fn json(&self) -> Result<Value> {
        Ok(serde_json::from_slice(&self.body)?)
    }

    /// The `result` member every ServiceNow REST endpoint wraps its payload in.
    pub fn result(&self) -> Result<Value> {
        match self.json()? {
            Value::Object(mut object) => object.remove("result").ok_or_else(|| {
                SnowError::ProcessingError {
                    message: "Response is missing the 'result' member".to_string(),
                }
            }),
            other => Err(SnowError::ProcessingError {
                message: format!("Expected a JSON object in response, got {}", other),
            }),
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn total_count(&self) -> Option<usize> {
        self.header("x-total-count").and_then(|v| v.trim().parse().ok())
    }
}

/// Authenticated access to one ServiceNow instance.
#[derive(Debug, Clone)]
pub struct Client {
    host: String,
    auth: Auth,
    http: reqwest::Client,
}

impl Client {
    pub async fn connect(config: &InstanceConfig) -> Result<Self> {
        let mut builder = reqwest::Client::builder();
        if let Some(timeout) = config.timeout {
            builder = builder.timeout(Duration::from_secs_f64(timeout));
        }
        let http = builder.build()?;
        let host = config.host.trim_end_matches('/').to_string();

        let auth = if config.uses_oauth() {
            Auth::Bearer(Self::fetch_token(&http, &host, config).await?)
        } else {
            Auth::Basic {
                username: config.username.clone().unwrap_or_default(),
                password: config.password.clone().unwrap_or_default(),
            }
        };

        tracing::debug!("Connected to {} using {:?}", host, auth);
        Ok(Self { host, auth, http })
    }

    async fn fetch_token(
        http: &reqwest::Client,
        host: &str,
        config: &InstanceConfig,
    ) -> Result<String> {
        let mut form: Vec<(&str, String)> = vec![
            ("grant_type", config.grant_type.as_str().to_string()),
            ("client_id", config.client_id.clone().unwrap_or_default()),
            ("client_secret", config.client_secret.clone().unwrap_or_default()),
        ];
        match config.grant_type {
            GrantType::Password => {
                form.push(("username", config.username.clone().unwrap_or_default()));
                form.push(("password", config.password.clone().unwrap_or_default()));
            }
            GrantType::RefreshToken => {
                form.push((
                    "refresh_token",
                    config.refresh_token.clone().unwrap_or_default(),
                ));
            }
        }

        let url = format!("{}/oauth_token.do", host);
        tracing::debug!("Requesting OAuth token from {}", url);
        let response = http
            .post(&url)
            .header(ACCEPT, "application/json")
            .form(&form)
            .send()
            .await?;

        let status = response.status();
        let body = response.text().await?;
        if status.as_u16() == 401 {
            return Err(SnowError::AuthError { message: body });
        }
        if !status.is_success() {
            return Err(SnowError::UnexpectedResponse {
                status: status.as_u16(),
                body,
            });
        }

        let payload: Value = serde_json::from_str(&body)?;
        payload
            .get("access_token")
            .and_then(Value::as_str)
            .map(str::to_string)
            .ok_or_else(|| SnowError::AuthError {
                message: "Token response does not contain an access_token".to_string(),
            })
    }

    pub async fn request(
        &self,
        method: Method,
        path: &str,
        query: Option<&QueryParams>,
        body: Option<Body>,
    ) -> Result<Response> {
        let url = format!("{}/{}", self.host, path.trim_start_matches('/'));
        tracing::debug!("{} {} {:?}", method, url, query);

        let mut request = self
            .http
            .request(method.clone(), &url)
            .header(ACCEPT, "application/json");

        request = match &self.auth {
            Auth::Basic { username, password } => request.basic_auth(username, Some(password)),
            Auth::Bearer(token) => request.bearer_auth(token),
        };

        if let Some(query) = query {
            request = request.query(query);
        }

        request = match body {
            Some(Body::Json(value)) => request.json(&value),
            Some(Body::Raw {
                content,
                content_type,
            }) => request.header(CONTENT_TYPE, content_type).body(content),
            None => request,
        };

        let response = request.send().await?;
        let status = response.status().as_u16();
        let headers = response.headers().clone();
        let body = response.bytes().await?.to_vec();
        tracing::debug!("{} {} -> {}", method, url, status);

        match status {
            200..=299 => Ok(Response {
                status,
                headers,
                body,
            }),
            401 => Err(SnowError::AuthError {
                message: String::from_utf8_lossy(&body).into_owned(),
            }),
            _ => Err(SnowError::UnexpectedResponse {
                status,
                body: String::from_utf8_lossy(&body).into_owned(),
            }),
        }
    }

    pub async fn get(&self, path: &str, query: Option<&QueryParams>) -> Result<Response> {
        self.request(Method::GET, path, query, None).await
    }

    pub async fn post(
        &self,
        path: &str,
        body: Body,
        query: Option<&QueryParams>,
    ) -> Result<Response> {
        self.request(Method::POST, path, query, Some(body)).await
    }

    pub async fn patch(
        &self,
        path: &str,
        payload: Value,
        query: Option<&QueryParams>,
    ) -> Result<Response> {
        self.request(Method::PATCH, path, query, Some(Body::Json(payload)))
            .await
    }

    pub async fn delete(&self, path: &str, query: Option<&QueryParams>) -> Result<Response> {
        self.request(Method::DELETE, path, query, None).await
    }
}
