//! Credential request strategies for the registry's token endpoint.
//!
//! The endpoint's expected request shape is not documented, so the token cache
//! tries an ordered list of [`AuthStrategy`] values against the same URL and
//! keeps the first one that answers `200` with a JSON `token` field. Replacing
//! the list with a single known-good strategy needs no change anywhere else.

use std::time::Duration;

use {
    secrecy::{ExposeSecret, Secret},
    serde::Deserialize,
    tracing::{debug, warn},
};

use crate::error::{Error, Result};

/// Username/password pair sent to the credential endpoint.
#[derive(Clone)]
pub struct Credentials {
    pub username: String,
    pub password: Secret<String>,
}

impl Credentials {
    pub fn new(username: impl Into<String>, password: impl Into<String>) -> Self {
        Self {
            username: username.into(),
            password: Secret::new(password.into()),
        }
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("username", &self.username)
            .field("password", &"[REDACTED]")
            .finish()
    }
}

/// One way of presenting credentials to the token endpoint.
pub trait AuthStrategy: Send + Sync {
    /// Short label used in logs.
    fn name(&self) -> &str;

    /// Build the request for this attempt. Timeout and send are handled by the caller.
    fn build(
        &self,
        client: &reqwest::Client,
        url: &str,
        credentials: &Credentials,
    ) -> reqwest::RequestBuilder;
}

/// JSON object body with configurable field names.
pub struct JsonBody {
    name: String,
    user_field: &'static str,
    password_field: &'static str,
}

impl JsonBody {
    #[must_use]
    pub fn new(user_field: &'static str, password_field: &'static str) -> Self {
        Self {
            name: format!("json:{user_field}/{password_field}"),
            user_field,
            password_field,
        }
    }
}

impl AuthStrategy for JsonBody {
    fn name(&self) -> &str {
        &self.name
    }

    fn build(
        &self,
        client: &reqwest::Client,
        url: &str,
        credentials: &Credentials,
    ) -> reqwest::RequestBuilder {
        let mut body = serde_json::Map::new();
        body.insert(
            self.user_field.into(),
            credentials.username.clone().into(),
        );
        body.insert(
            self.password_field.into(),
            credentials.password.expose_secret().clone().into(),
        );
        client
            .post(url)
            .header("Accept", "application/json")
            .json(&body)
    }
}

/// `application/x-www-form-urlencoded` body with `username` and `password`.
pub struct FormBody;

impl AuthStrategy for FormBody {
    fn name(&self) -> &str {
        "form:username/password"
    }

    fn build(
        &self,
        client: &reqwest::Client,
        url: &str,
        credentials: &Credentials,
    ) -> reqwest::RequestBuilder {
        client
            .post(url)
            .header("Accept", "application/json")
            .form(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.expose_secret().as_str()),
            ])
    }
}

/// Empty `POST` with `username` and `password` in the query string.
pub struct QueryParams;

impl AuthStrategy for QueryParams {
    fn name(&self) -> &str {
        "query:username/password"
    }

    fn build(
        &self,
        client: &reqwest::Client,
        url: &str,
        credentials: &Credentials,
    ) -> reqwest::RequestBuilder {
        client
            .post(url)
            .header("Accept", "application/json")
            .query(&[
                ("username", credentials.username.as_str()),
                ("password", credentials.password.expose_secret().as_str()),
            ])
    }
}

/// Candidate strategies in the order they are attempted.
#[must_use]
pub fn default_strategies() -> Vec<Box<dyn AuthStrategy>> {
    vec![
        Box::new(JsonBody::new("username", "password")),
        Box::new(JsonBody::new("usuario", "senha")),
        Box::new(JsonBody::new("login", "senha")),
        Box::new(FormBody),
        Box::new(QueryParams),
    ]
}

#[derive(Deserialize)]
struct TokenResponse {
    token: String,
}

/// Try each strategy in order and return the first issued token.
///
/// Every attempt is bounded by `timeout`. Non-200 answers, transport errors
/// and bodies without a string `token` move on to the next strategy.
pub(crate) async fn request_token(
    client: &reqwest::Client,
    url: &str,
    credentials: &Credentials,
    strategies: &[Box<dyn AuthStrategy>],
    timeout: Duration,
) -> Result<Secret<String>> {
    for strategy in strategies {
        let strategy_name = strategy.name();
        let resp = match strategy
            .build(client, url, credentials)
            .timeout(timeout)
            .send()
            .await
        {
            Ok(resp) => resp,
            Err(e) => {
                warn!(strategy = strategy_name, error = %e, "credential request failed");
                continue;
            },
        };

        let status = resp.status();
        if status != reqwest::StatusCode::OK {
            debug!(strategy = strategy_name, %status, "credential endpoint refused strategy");
            continue;
        }

        match resp.json::<TokenResponse>().await {
            Ok(body) if !body.token.is_empty() => {
                debug!(strategy = strategy_name, "credential endpoint issued token");
                return Ok(Secret::new(body.token));
            },
            Ok(_) => {
                warn!(strategy = strategy_name, "credential endpoint returned an empty token");
            },
            Err(e) => {
                warn!(strategy = strategy_name, error = %e, "credential response is not a token");
            },
        }
    }

    Err(Error::AuthRejected {
        attempts: strategies.len(),
    })
}

#[allow(clippy::unwrap_used, clippy::expect_used)]
#[cfg(test)]
mod tests {
    use super::*;

    fn creds() -> Credentials {
        Credentials::new("operador", "segredo")
    }

    #[test]
    fn default_order_is_stable() {
        let names: Vec<String> = default_strategies()
            .iter()
            .map(|s| s.name().to_string())
            .collect();
        assert_eq!(names, vec![
            "json:username/password",
            "json:usuario/senha",
            "json:login/senha",
            "form:username/password",
            "query:username/password",
        ]);
    }

    #[test]
    fn json_body_uses_configured_field_names() {
        let client = reqwest::Client::new();
        let req = JsonBody::new("usuario", "senha")
            .build(&client, "http://localhost/auth", &creds())
            .build()
            .unwrap();
        let body = req.body().and_then(|b| b.as_bytes()).unwrap();
        let json: serde_json::Value = serde_json::from_slice(body).unwrap();
        assert_eq!(json, serde_json::json!({"usuario": "operador", "senha": "segredo"}));
    }

    #[test]
    fn form_body_is_url_encoded() {
        let client = reqwest::Client::new();
        let req = FormBody
            .build(&client, "http://localhost/auth", &creds())
            .build()
            .unwrap();
        assert_eq!(
            req.headers()
                .get(reqwest::header::CONTENT_TYPE)
                .and_then(|v| v.to_str().ok()),
            Some("application/x-www-form-urlencoded")
        );
        let body = req.body().and_then(|b| b.as_bytes()).unwrap();
        assert_eq!(body, b"username=operador&password=segredo");
    }

    #[test]
    fn query_params_leave_body_empty() {
        let client = reqwest::Client::new();
        let req = QueryParams
            .build(&client, "http://localhost/auth", &creds())
            .build()
            .unwrap();
        assert_eq!(req.url().query(), Some("username=operador&password=segredo"));
        assert!(req.body().is_none());
    }

    #[test]
    fn credentials_debug_redacts_password() {
        let rendered = format!("{:?}", creds());
        assert!(rendered.contains("operador"));
        assert!(!rendered.contains("segredo"));
    }
}
