//! HTTP session handling for the qBittorrent WebUI API.

use std::fmt;
use std::time::Duration;

use reqwest::header::{COOKIE, SET_COOKIE};
use reqwest::{Client, RequestBuilder, Response, StatusCode};
use tokio::sync::RwLock;
use tracing::{debug, warn};
use url::Url;

use crate::error::{QbitError, QbitResult};

/// Connection settings for [`QbitClient`].
#[derive(Clone)]
pub struct QbitClientConfig {
    /// Base URL of the WebUI, including any reverse-proxy prefix.
    pub base_url: String,
    /// WebUI username.
    pub username: String,
    /// WebUI password.
    pub password: String,
    /// TCP connect timeout.
    pub connection_timeout: Duration,
    /// Whole-request timeout.
    pub read_timeout: Duration,
    /// Reject invalid TLS certificates.
    pub verify_tls: bool,
}

impl fmt::Debug for QbitClientConfig {
    fn fmt(&self, formatter: &mut fmt::Formatter<'_>) -> fmt::Result {
        formatter
            .debug_struct("QbitClientConfig")
            .field("base_url", &self.base_url)
            .field("username", &self.username)
            .field("password", &"<redacted>")
            .field("connection_timeout", &self.connection_timeout)
            .field("read_timeout", &self.read_timeout)
            .field("verify_tls", &self.verify_tls)
            .finish()
    }
}

#[derive(Debug, Clone)]
struct Session {
    sid: Option<String>,
}

/// qBittorrent WebUI client.
///
/// Logs in lazily before the first call and sends the `SID` cookie afterwards. A 403 on
/// an authenticated call drops the session without replaying the request.
#[derive(Debug)]
pub struct QbitClient {
    http: Client,
    base: String,
    username: String,
    password: String,
    session: RwLock<Option<Session>>,
}

impl QbitClient {
    /// Build a client. No network traffic happens until the first call.
    ///
    /// # Errors
    ///
    /// Returns an error when the base URL is invalid or the HTTP client cannot be built.
    pub fn new(config: &QbitClientConfig) -> QbitResult<Self> {
        let parsed = Url::parse(config.base_url.trim()).map_err(|source| {
            QbitError::InvalidBaseUrl {
                value: config.base_url.clone(),
                source,
            }
        })?;
        let http = Client::builder()
            .connect_timeout(config.connection_timeout)
            .timeout(config.read_timeout)
            .danger_accept_invalid_certs(!config.verify_tls)
            .build()
            .map_err(|source| QbitError::ClientBuild { source })?;
        Ok(Self {
            http,
            base: parsed.as_str().trim_end_matches('/').to_string(),
            username: config.username.clone(),
            password: config.password.clone(),
            session: RwLock::new(None),
        })
    }

    /// Base URL without a trailing slash.
    #[must_use]
    pub fn base_url(&self) -> &str {
        &self.base
    }

    pub(crate) fn url(&self, endpoint: &str) -> String {
        format!("{}/api/v2/{endpoint}", self.base)
    }

    pub(crate) const fn http(&self) -> &Client {
        &self.http
    }

    /// Authenticate and store the session cookie.
    ///
    /// # Errors
    ///
    /// Returns [`QbitError::LoginRejected`] for bad credentials, [`QbitError::Banned`] on
    /// 403 and [`QbitError::Transport`] when qBittorrent is unreachable.
    pub async fn login(&self) -> QbitResult<()> {
        let response = self
            .http
            .post(self.url("auth/login"))
            .form(&[
                ("username", self.username.as_str()),
                ("password", self.password.as_str()),
            ])
            .send()
            .await
            .map_err(|err| QbitError::transport("auth.login", err))?;

        let status = response.status();
        if status == StatusCode::FORBIDDEN {
            warn!("qBittorrent refused login: client address is banned");
            return Err(QbitError::Banned);
        }
        let sid = extract_sid(&response);
        let body = response
            .text()
            .await
            .map_err(|err| QbitError::transport("auth.login", err))?;

        match body.trim() {
            "Ok." if status.is_success() => {
                debug!(cookie = sid.is_some(), "logged in to qBittorrent");
                *self.session.write().await = Some(Session { sid });
                Ok(())
            }
            "Fails." => Err(QbitError::LoginRejected),
            _ => Err(QbitError::Status {
                operation: "auth.login",
                status: status.as_u16(),
                body,
            }),
        }
    }

    /// Forget the current session; the next call logs in again.
    pub async fn reset_session(&self) {
        *self.session.write().await = None;
    }

    async fn ensure_session(&self) -> QbitResult<Option<String>> {
        if let Some(session) = self.session.read().await.as_ref() {
            return Ok(session.sid.clone());
        }
        self.login().await?;
        Ok(self
            .session
            .read()
            .await
            .as_ref()
            .and_then(|session| session.sid.clone()))
    }

    /// Send an authenticated request and handle session-level failures.
    ///
    /// The returned response may still carry an endpoint-specific error status.
    pub(crate) async fn execute(
        &self,
        operation: &'static str,
        request: RequestBuilder,
    ) -> QbitResult<Response> {
        let mut request = request;
        if let Some(sid) = self.ensure_session().await? {
            request = request.header(COOKIE, format!("SID={sid}"));
        }
        let response = request
            .send()
            .await
            .map_err(|err| QbitError::transport(operation, err))?;
        if response.status() == StatusCode::FORBIDDEN {
            warn!(operation, "qBittorrent session rejected; clearing");
            self.reset_session().await;
            return Err(QbitError::SessionExpired { operation });
        }
        Ok(response)
    }
}

fn extract_sid(response: &Response) -> Option<String> {
    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .find_map(|cookie| {
            cookie
                .split(';')
                .next()
                .and_then(|pair| pair.trim().strip_prefix("SID="))
                .map(str::to_string)
        })
}

/// Map a non-success response to [`QbitError::Status`].
pub(crate) async fn ensure_success(
    operation: &'static str,
    response: Response,
) -> QbitResult<Response> {
    let status = response.status();
    if status.is_success() {
        return Ok(response);
    }
    let body = read_body(operation, response).await?;
    Err(QbitError::Status {
        operation,
        status: status.as_u16(),
        body,
    })
}

pub(crate) async fn read_body(operation: &'static str, response: Response) -> QbitResult<String> {
    response
        .text()
        .await
        .map_err(|err| QbitError::transport(operation, err))
}

pub(crate) async fn read_json<T: serde::de::DeserializeOwned>(
    operation: &'static str,
    response: Response,
) -> QbitResult<T> {
    let body = read_body(operation, response).await?;
    serde_json::from_str(&body).map_err(|err| QbitError::Decode {
        operation,
        detail: err.to_string(),
    })
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use httpmock::prelude::*;

    pub(crate) fn config_for(server: &MockServer) -> QbitClientConfig {
        QbitClientConfig {
            base_url: server.base_url(),
            username: "admin".into(),
            password: "adminadmin".into(),
            connection_timeout: Duration::from_secs(2),
            read_timeout: Duration::from_secs(5),
            verify_tls: true,
        }
    }

    pub(crate) fn mock_login(server: &MockServer) -> httpmock::Mock<'_> {
        server.mock(|when, then| {
            when.method(POST).path("/api/v2/auth/login");
            then.status(200)
                .header("set-cookie", "SID=abc123; HttpOnly; path=/")
                .body("Ok.");
        })
    }

    #[tokio::test]
    async fn login_stores_sid_and_sends_cookie() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let login = mock_login(&server);
        let version = server.mock(|when, then| {
            when.method(GET)
                .path("/api/v2/app/version")
                .header("cookie", "SID=abc123");
            then.status(200).body("v5.0.1");
        });

        let client = QbitClient::new(&config_for(&server))?;
        let request = client.http().get(client.url("app/version"));
        let response = client.execute("app.version", request).await?;
        assert_eq!(read_body("app.version", response).await?, "v5.0.1");
        let request = client.http().get(client.url("app/version"));
        client.execute("app.version", request).await?;

        login.assert_calls(1);
        version.assert_calls(2);
        Ok(())
    }

    #[tokio::test]
    async fn bad_credentials_are_rejected() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/v2/auth/login");
            then.status(200).body("Fails.");
        });
        let client = QbitClient::new(&config_for(&server))?;
        assert!(matches!(client.login().await, Err(QbitError::LoginRejected)));
        Ok(())
    }

    #[tokio::test]
    async fn login_forbidden_means_banned() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        server.mock(|when, then| {
            when.method(POST).path("/api/v2/auth/login");
            then.status(403).body("Your IP address has been banned");
        });
        let client = QbitClient::new(&config_for(&server))?;
        assert!(matches!(client.login().await, Err(QbitError::Banned)));
        Ok(())
    }

    #[tokio::test]
    async fn forbidden_call_clears_session_without_replay() -> anyhow::Result<()> {
        let server = MockServer::start_async().await;
        let login = mock_login(&server);
        let version = server.mock(|when, then| {
            when.method(GET).path("/api/v2/app/version");
            then.status(403).body("Forbidden");
        });

        let client = QbitClient::new(&config_for(&server))?;
        let request = client.http().get(client.url("app/version"));
        let result = client.execute("app.version", request).await;
        assert!(matches!(
            result,
            Err(QbitError::SessionExpired {
                operation: "app.version"
            })
        ));
        version.assert_calls(1);
        login.assert_calls(1);
        assert!(client.session.read().await.is_none());
        Ok(())
    }

    #[test]
    fn invalid_base_url_is_rejected() {
        let config = QbitClientConfig {
            base_url: "not a url".into(),
            username: String::new(),
            password: String::new(),
            connection_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_secs(1),
            verify_tls: true,
        };
        assert!(matches!(
            QbitClient::new(&config),
            Err(QbitError::InvalidBaseUrl { .. })
        ));
    }

    #[test]
    fn debug_redacts_password() {
        let config = QbitClientConfig {
            base_url: "http://localhost:8080".into(),
            username: "admin".into(),
            password: "hunter2".into(),
            connection_timeout: Duration::from_secs(1),
            read_timeout: Duration::from_secs(1),
            verify_tls: true,
        };
        assert!(!format!("{config:?}").contains("hunter2"));
    }

    #[tokio::test]
    async fn unreachable_host_is_a_transport_error() -> anyhow::Result<()> {
        let config = QbitClientConfig {
            base_url: "http://127.0.0.1:9".into(),
            username: "admin".into(),
            password: "x".into(),
            connection_timeout: Duration::from_millis(200),
            read_timeout: Duration::from_millis(500),
            verify_tls: true,
        };
        let client = QbitClient::new(&config)?;
        assert!(matches!(
            client.login().await,
            Err(QbitError::Transport {
                operation: "auth.login",
                ..
            })
        ));
        Ok(())
    }
}
