//! Client for the hosted backend: an auth API under `/auth/v1` and a
//! PostgREST table API under `/rest/v1`.
use crate::core::config::BackendConfig;
use crate::core::loan::{Loan, LoanStatus, LoanUpdate, NewLoan, StatusUpdate};
use crate::core::service::{AuthService, BackendError, LoanService, Session};
use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use reqwest::{IntoUrl, Method, RequestBuilder, Response, StatusCode, Url};
use serde::Deserialize;
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::fmt::Display;
use tracing::debug;

pub struct HostedBackend {
    base_url: String,
    loans_endpoint: Url,
    api_key: String,
    client: reqwest::Client,
}

#[derive(Debug, Deserialize)]
struct AuthUser {
    id: String,
    email: Option<String>,
    #[serde(default)]
    user_metadata: Value,
}

#[derive(Debug, Deserialize)]
struct AuthResponse {
    access_token: Option<String>,
    expires_in: Option<i64>,
    expires_at: Option<i64>,
    user: Option<AuthUser>,
}

impl AuthResponse {
    fn into_session(self, email: &str) -> Result<Session, BackendError> {
        let access_token = self.access_token.ok_or_else(|| {
            BackendError::Auth(
                "No session returned. Confirm your email address, then run `loanboard login`"
                    .to_string(),
            )
        })?;
        let user = self
            .user
            .ok_or_else(|| BackendError::Decode("auth response has no user".to_string()))?;
        let expires_at = match (self.expires_at, self.expires_in) {
            (Some(at), _) => DateTime::from_timestamp(at, 0),
            (None, Some(secs)) => Some(Utc::now() + Duration::seconds(secs)),
            (None, None) => None,
        };
        let name = user
            .user_metadata
            .get("name")
            .and_then(Value::as_str)
            .map(str::to_string);

        Ok(Session {
            access_token,
            user_id: user.id,
            email: user.email.unwrap_or_else(|| email.to_string()),
            name,
            expires_at,
        })
    }
}

/// Pulls a human readable message out of an auth or PostgREST error body.
fn error_message(body: &str) -> String {
    serde_json::from_str::<Value>(body)
        .ok()
        .and_then(|v| {
            ["msg", "message", "error_description", "error"]
                .iter()
                .find_map(|key| v.get(key).and_then(Value::as_str).map(str::to_string))
        })
        .unwrap_or_else(|| body.trim().to_string())
}

impl HostedBackend {
    pub fn new(config: &BackendConfig) -> Result<Self, BackendError> {
        let base_url = config.url.trim_end_matches('/').to_string();
        let loans_endpoint = Url::parse(&format!("{base_url}/rest/v1/loans"))
            .map_err(|e| BackendError::InvalidUrl(format!("{}: {e}", config.url)))?;
        let client = reqwest::Client::builder()
            .user_agent(concat!("loanboard/", env!("CARGO_PKG_VERSION")))
            .build()?;
        Ok(HostedBackend {
            base_url,
            loans_endpoint,
            api_key: config.api_key.clone(),
            client,
        })
    }

    fn auth_url(&self, path: &str) -> String {
        format!("{}/auth/v1/{}", self.base_url, path)
    }

    /// The loans table URL with `params` form-encoded into the query string.
    fn loans_url(&self, params: &[(&str, &str)]) -> Url {
        let mut url = self.loans_endpoint.clone();
        url.query_pairs_mut().extend_pairs(params);
        url
    }

    fn request<U: IntoUrl + Display>(
        &self,
        method: Method,
        url: U,
        session: Option<&Session>,
    ) -> RequestBuilder {
        debug!("{} {}", method, url);
        let bearer = session.map_or(self.api_key.as_str(), |s| s.access_token.as_str());
        self.client
            .request(method, url)
            .header("apikey", &self.api_key)
            .bearer_auth(bearer)
    }

    async fn check(response: Response) -> Result<Response, BackendError> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let body = response.text().await.unwrap_or_default();
        let message = error_message(&body);
        debug!("Backend returned {}: {}", status, message);
        if status == StatusCode::UNAUTHORIZED {
            return Err(BackendError::Auth(message));
        }
        Err(BackendError::Status {
            status: status.as_u16(),
            message,
        })
    }

    async fn send<T: DeserializeOwned>(builder: RequestBuilder) -> Result<T, BackendError> {
        let response = Self::check(builder.send().await?).await?;
        let text = response.text().await?;
        serde_json::from_str(&text)
            .map_err(|e| BackendError::Decode(format!("{e}. Response: '{text}'")))
    }

    /// Table writes return the affected rows; an empty set means no row matched.
    async fn single_row(builder: RequestBuilder, id: &str) -> Result<Loan, BackendError> {
        let rows: Vec<Loan> = Self::send(builder).await?;
        rows.into_iter()
            .next()
            .ok_or_else(|| BackendError::NotFound(id.to_string()))
    }
}

#[async_trait]
impl AuthService for HostedBackend {
    async fn sign_up(
        &self,
        email: &str,
        password: &str,
        name: &str,
    ) -> Result<Session, BackendError> {
        let body = json!({ "email": email, "password": password, "data": { "name": name } });
        let response: AuthResponse = Self::send(
            self.request(Method::POST, self.auth_url("signup"), None)
                .json(&body),
        )
        .await?;
        response.into_session(email)
    }

    async fn sign_in(&self, email: &str, password: &str) -> Result<Session, BackendError> {
        let body = json!({ "email": email, "password": password });
        let url = self.auth_url("token?grant_type=password");
        let result: Result<AuthResponse, BackendError> =
            Self::send(self.request(Method::POST, url, None).json(&body)).await;
        match result {
            Ok(response) => response.into_session(email),
            Err(BackendError::Status { status: 400, message }) => Err(BackendError::Auth(message)),
            Err(e) => Err(e),
        }
    }

    async fn sign_out(&self, session: &Session) -> Result<(), BackendError> {
        let builder = self.request(Method::POST, self.auth_url("logout"), Some(session));
        Self::check(builder.send().await?).await?;
        Ok(())
    }
}

#[async_trait]
impl LoanService for HostedBackend {
    async fn list_loans(&self, session: &Session) -> Result<Vec<Loan>, BackendError> {
        let url = self.loans_url(&[("select", "*"), ("order", "created_at.desc")]);
        Self::send(self.request(Method::GET, url, Some(session))).await
    }

    async fn get_loan(&self, session: &Session, id: &str) -> Result<Loan, BackendError> {
        let filter = format!("eq.{id}");
        let url = self.loans_url(&[("select", "*"), ("id", filter.as_str())]);
        Self::single_row(self.request(Method::GET, url, Some(session)), id).await
    }

    async fn create_loan(&self, session: &Session, loan: &NewLoan) -> Result<Loan, BackendError> {
        let url = self.loans_url(&[("select", "*")]);
        let builder = self
            .request(Method::POST, url, Some(session))
            .header("Prefer", "return=representation")
            .json(&[loan]);
        Self::single_row(builder, "new loan").await
    }

    async fn update_loan(
        &self,
        session: &Session,
        id: &str,
        update: &LoanUpdate,
    ) -> Result<Loan, BackendError> {
        let filter = format!("eq.{id}");
        let url = self.loans_url(&[("id", filter.as_str())]);
        let builder = self
            .request(Method::PATCH, url, Some(session))
            .header("Prefer", "return=representation")
            .json(update);
        Self::single_row(builder, id).await
    }

    async fn update_status(
        &self,
        session: &Session,
        id: &str,
        status: LoanStatus,
    ) -> Result<Loan, BackendError> {
        let filter = format!("eq.{id}");
        let url = self.loans_url(&[("id", filter.as_str())]);
        let update = StatusUpdate {
            status,
            updated_at: Utc::now(),
        };
        let builder = self
            .request(Method::PATCH, url, Some(session))
            .header("Prefer", "return=representation")
            .json(&update);
        Self::single_row(builder, id).await
    }

    async fn delete_loan(&self, session: &Session, id: &str) -> Result<(), BackendError> {
        let filter = format!("eq.{id}");
        let url = self.loans_url(&[("id", filter.as_str())]);
        let builder = self
            .request(Method::DELETE, url, Some(session))
            .header("Prefer", "return=representation");
        Self::single_row(builder, id).await.map(|_| ())
    }
}
