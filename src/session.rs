//! Session factory - turns a raw credential into authorized backend sessions
//!
//! The raffle lives on a separate game domain behind a short handshake:
//! portal token exchange, signing-parameter fetch, an optional domain
//! verification, then the activity login that yields the token every business
//! call uses. The factory's mall API trusts the credential cookie directly,
//! so its session is just an authenticated transport.
//!
//! If the token exchange, the signing-parameter fetch or the activity login
//! fails, no business call is attempted: the run terminates early with a
//! user-visible message.

use crate::config::{Config, HttpConfig};
use crate::error::{AuthError, Error, GatewayError, Result};
use crate::gateway::{ArenaGateway, MallGateway};
use crate::notify::LogSink;
use crate::types::Credential;
use reqwest::header::{HeaderMap, HeaderName, HeaderValue};
use serde::Deserialize;
use serde_json::json;
use url::Url;

#[derive(Debug, Deserialize)]
struct TokenReply {
    #[serde(default)]
    data: Option<String>,
}

/// Signing parameters required by the activity login
#[derive(Clone, Debug, Deserialize)]
struct SigningParams {
    #[serde(rename = "encPin")]
    pin: String,
    #[serde(rename = "encToken")]
    token: String,
}

#[derive(Debug, Deserialize)]
struct EncryptReply {
    #[serde(default)]
    data: Option<SigningParams>,
}

#[derive(Debug, Deserialize)]
struct VerifyReply {
    #[serde(default)]
    success: bool,
}

#[derive(Debug, Deserialize)]
struct LoginReply {
    id: i64,
    token: String,
    #[serde(rename = "userInfo")]
    user_info: LoginUserInfo,
}

#[derive(Debug, Deserialize)]
struct LoginUserInfo {
    nickname: String,
}

/// An authorized session on the raffle's game domain
///
/// Created once per run; the activity token and user id authenticate every
/// subsequent business call. Not shared across accounts.
#[derive(Clone, Debug)]
pub struct ArenaSession {
    gateway: ArenaGateway,
    /// Decoded account identifier, for log lines
    pub account: String,
    /// Display name returned by the activity login
    pub nickname: String,
    /// Activity-scoped user id
    pub user_id: i64,
    token: String,
}

impl ArenaSession {
    /// Perform the full handshake and return an authorized session
    ///
    /// Steps 1-2 (token exchange, signing parameters) and step 4 (activity
    /// login) are terminal on failure; step 3 (domain verification) is logged
    /// and skipped past.
    pub async fn acquire(
        config: &Config,
        credential: &Credential,
        sink: &dyn LogSink,
    ) -> Result<Self> {
        let account = credential.account();
        let endpoints = &config.endpoints;
        let portal = portal_client(&config.http, credential, &endpoints.activity_url)?;

        // Step 1: exchange the credential cookie for a short-lived portal token.
        let token = exchange_token(&portal, config).await?;
        sink.log(&format!("{account}, obtained portal token"));

        // Step 2: signing parameters, a hard dependency of the login below.
        let signing = fetch_signing_params(&portal, config).await?;
        sink.log(&format!("{account}, obtained signing parameters"));

        // Step 3: domain verification is advisory; a failure must not block the run.
        match verify_domain(&portal, config).await {
            Ok(true) => {}
            Ok(false) => {
                tracing::warn!(account = %account, "domain verification rejected");
                sink.log(&format!("{account}, domain verification failed (ignored)"));
            }
            Err(e) => {
                tracing::warn!(account = %account, error = %e, "domain verification errored");
                sink.log(&format!("{account}, domain verification failed (ignored)"));
            }
        }

        // Step 4: activity login on the game domain.
        let arena = arena_client(&config.http, endpoints)?;
        let gateway = ArenaGateway::new(arena, &endpoints.arena_base).map_err(Error::Gateway)?;
        let body = json!({
            "refid": "app",
            "encPin": signing.pin,
            "encToken": signing.token,
            "token": token,
            "returnUrl": endpoints.activity_url,
        });
        let raw = gateway
            .call("/draw/login", &body)
            .await
            .map_err(|e| AuthError::ActivityLogin(e.to_string()))?;
        let login: LoginReply = serde_json::from_value(raw)
            .map_err(|e| AuthError::ActivityLogin(format!("unexpected login reply: {e}")))?;
        sink.log(&format!(
            "{account}, login succeeded, nickname: {}",
            login.user_info.nickname
        ));

        Ok(Self {
            gateway,
            account,
            nickname: login.user_info.nickname,
            user_id: login.id,
            token: login.token,
        })
    }

    /// The gateway bound to this session's transport
    pub fn gateway(&self) -> &ArenaGateway {
        &self.gateway
    }

    /// The base parameter set every business call carries
    pub fn auth_params(&self) -> serde_json::Value {
        json!({
            "id": self.user_id,
            "token": self.token,
        })
    }
}

/// A cookie-authorized transport for the factory's mall API
#[derive(Clone, Debug)]
pub struct MallSession {
    gateway: MallGateway,
    /// Decoded account identifier, for log lines
    pub account: String,
}

impl MallSession {
    /// Build the authenticated mall transport
    ///
    /// No handshake happens here; the mall API authenticates each call off
    /// the credential cookie.
    pub fn open(config: &Config, credential: &Credential) -> Result<Self> {
        let mut headers = HeaderMap::new();
        insert_header(&mut headers, "accept", "application/json, text/plain, */*")?;
        insert_header(
            &mut headers,
            "content-type",
            "application/x-www-form-urlencoded",
        )?;
        insert_header(&mut headers, "origin", &origin_of(&config.endpoints.activity_url))?;
        insert_header(&mut headers, "cookie", &credential.cookie())?;

        let client = reqwest::Client::builder()
            .user_agent(&config.http.user_agent)
            .default_headers(headers)
            .timeout(config.http.timeout)
            .build()?;

        Ok(Self {
            gateway: MallGateway::new(client, &config.endpoints.mall_base),
            account: credential.account(),
        })
    }

    /// The gateway bound to this session's transport
    pub fn gateway(&self) -> &MallGateway {
        &self.gateway
    }
}

async fn exchange_token(portal: &reqwest::Client, config: &Config) -> Result<String> {
    let endpoints = &config.endpoints;
    let url = format!(
        "{}/framework/user/token?appId={}&client=m&url={}",
        endpoints.portal_base,
        endpoints.app_id,
        host_of(&endpoints.activity_url)
    );
    let reply: TokenReply = post_json(portal, &url)
        .await
        .map_err(|e| AuthError::TokenExchange(e.to_string()))?;
    reply
        .data
        .ok_or_else(|| AuthError::TokenExchange("empty token in reply".to_string()).into())
}

async fn fetch_signing_params(portal: &reqwest::Client, config: &Config) -> Result<SigningParams> {
    let endpoints = &config.endpoints;
    let url = format!(
        "{}/framework/encrypt/pin?appId={}",
        endpoints.portal_base, endpoints.app_id
    );
    let reply: EncryptReply = post_json(portal, &url)
        .await
        .map_err(|e| AuthError::SigningParams(e.to_string()))?;
    reply
        .data
        .ok_or_else(|| AuthError::SigningParams("empty parameter set in reply".to_string()).into())
}

async fn verify_domain(portal: &reqwest::Client, config: &Config) -> Result<bool> {
    let endpoints = &config.endpoints;
    let url = format!(
        "{}/verify/domain?domain={}&appId={}",
        endpoints.portal_base, endpoints.game_domain, endpoints.app_id
    );
    let reply: VerifyReply = post_json(portal, &url).await.map_err(Error::Gateway)?;
    Ok(reply.success)
}

async fn post_json<T: serde::de::DeserializeOwned>(
    client: &reqwest::Client,
    url: &str,
) -> std::result::Result<T, GatewayError> {
    let response = client.post(url).send().await?;
    if !response.status().is_success() {
        return Err(GatewayError::Transport(format!(
            "HTTP {} from {url}",
            response.status()
        )));
    }
    response
        .json()
        .await
        .map_err(|e| GatewayError::Envelope(e.to_string()))
}

fn portal_client(
    http: &HttpConfig,
    credential: &Credential,
    activity_url: &str,
) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    insert_header(&mut headers, "referer", activity_url)?;
    insert_header(&mut headers, "cookie", &credential.cookie())?;
    Ok(reqwest::Client::builder()
        .user_agent(&http.user_agent)
        .default_headers(headers)
        .timeout(http.timeout)
        .build()?)
}

fn arena_client(http: &HttpConfig, endpoints: &crate::config::EndpointConfig) -> Result<reqwest::Client> {
    let mut headers = HeaderMap::new();
    insert_header(&mut headers, "referer", &endpoints.activity_url)?;
    insert_header(&mut headers, "origin", &format!("https://{}", endpoints.game_domain))?;
    Ok(reqwest::Client::builder()
        .user_agent(&http.user_agent)
        .default_headers(headers)
        .timeout(http.timeout)
        .build()?)
}

fn insert_header(headers: &mut HeaderMap, name: &'static str, value: &str) -> Result<()> {
    let value = HeaderValue::from_str(value).map_err(|_| Error::Config {
        message: format!("value for header {name:?} contains invalid characters"),
        key: Some(name.to_string()),
    })?;
    headers.insert(HeaderName::from_static(name), value);
    Ok(())
}

fn host_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .and_then(|u| u.host_str().map(str::to_string))
        .unwrap_or_default()
}

fn origin_of(url: &str) -> String {
    Url::parse(url)
        .ok()
        .map(|u| u.origin().ascii_serialization())
        .unwrap_or_default()
}

#[cfg(test)]
#[allow(clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;
    use crate::notify::MemorySink;
    use serde_json::json;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    fn test_config(server: &MockServer) -> Config {
        let mut config = Config::default();
        config.endpoints.portal_base = server.uri();
        config.endpoints.arena_base = server.uri();
        config
    }

    async fn mount_portal(server: &MockServer) {
        Mock::given(method("POST"))
            .and(path("/framework/user/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": "ptoken"})))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/framework/encrypt/pin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"encPin": "ep", "encToken": "et"}
            })))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/verify/domain"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
            .mount(server)
            .await;
    }

    #[tokio::test]
    async fn acquire_completes_the_full_handshake() {
        let server = MockServer::start().await;
        mount_portal(&server).await;
        Mock::given(method("POST"))
            .and(path("/draw/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 4711,
                "token": "arena-token",
                "userInfo": {"nickname": "Alice"}
            })))
            .mount(&server)
            .await;

        let sink = MemorySink::new();
        let session = ArenaSession::acquire(
            &test_config(&server),
            &Credential::new("alice%40shop", "sk"),
            &sink,
        )
        .await
        .unwrap();

        assert_eq!(session.account, "alice@shop");
        assert_eq!(session.nickname, "Alice");
        assert_eq!(session.user_id, 4711);
        assert_eq!(session.auth_params()["token"], "arena-token");
        assert!(sink.lines().iter().any(|l| l.contains("login succeeded")));
    }

    #[tokio::test]
    async fn token_exchange_failure_is_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/framework/user/token"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let sink = MemorySink::new();
        let err = ArenaSession::acquire(
            &test_config(&server),
            &Credential::new("alice", "sk"),
            &sink,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::TokenExchange(_))));
    }

    #[tokio::test]
    async fn empty_signing_params_are_terminal() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/framework/user/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": "ptoken"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/framework/encrypt/pin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let sink = MemorySink::new();
        let err = ArenaSession::acquire(
            &test_config(&server),
            &Credential::new("alice", "sk"),
            &sink,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::SigningParams(_))));
    }

    #[tokio::test]
    async fn failed_domain_verification_does_not_block_login() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/framework/user/token"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": "ptoken"})))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/framework/encrypt/pin"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "data": {"encPin": "ep", "encToken": "et"}
            })))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/verify/domain"))
            .respond_with(ResponseTemplate::new(503))
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path("/draw/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "id": 1,
                "token": "t",
                "userInfo": {"nickname": "Bob"}
            })))
            .mount(&server)
            .await;

        let sink = MemorySink::new();
        let session = ArenaSession::acquire(
            &test_config(&server),
            &Credential::new("bob", "sk"),
            &sink,
        )
        .await
        .unwrap();
        assert_eq!(session.nickname, "Bob");
        assert!(sink
            .lines()
            .iter()
            .any(|l| l.contains("domain verification failed")));
    }

    #[tokio::test]
    async fn malformed_login_reply_is_login_failure() {
        let server = MockServer::start().await;
        mount_portal(&server).await;
        Mock::given(method("POST"))
            .and(path("/draw/login"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"oops": true})))
            .mount(&server)
            .await;

        let sink = MemorySink::new();
        let err = ArenaSession::acquire(
            &test_config(&server),
            &Credential::new("alice", "sk"),
            &sink,
        )
        .await
        .unwrap_err();
        assert!(matches!(err, Error::Auth(AuthError::ActivityLogin(_))));
    }

    #[tokio::test]
    async fn token_exchange_sends_app_id() {
        let server = MockServer::start().await;
        let mut config = test_config(&server);
        config.endpoints.app_id = "my-app".to_string();
        Mock::given(method("POST"))
            .and(path("/framework/user/token"))
            .and(query_param("appId", "my-app"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"data": "ptoken"})))
            .expect(1)
            .mount(&server)
            .await;
        // Stop the handshake right after step 1.
        Mock::given(method("POST"))
            .and(path("/framework/encrypt/pin"))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        let sink = MemorySink::new();
        let _ = ArenaSession::acquire(&config, &Credential::new("alice", "sk"), &sink).await;
    }
}
