//! Activity gateways - thin typed-request wrappers over the backend domains
//!
//! Two envelope styles exist in the wild:
//! - [`ArenaGateway`]: plain JSON body POSTs against the game domain, success
//!   signaled by a top-level zero `code`
//! - [`MallGateway`]: the mall API's `functionId` envelope, where the request
//!   body travels percent-encoded inside the query string and success is
//!   signaled at two nesting levels (outer `code`, inner `bizCode`)
//!
//! Both decode into either a payload or a [`GatewayError`] - callers never see
//! a raw protocol failure. Retries, where a caller wants them, live above this
//! layer.

use crate::error::GatewayError;
use serde::Deserialize;
use serde_json::Value;
use url::Url;

/// Client identifier sent with every mall API call
const MALL_CLIENT: &str = "h5";
/// Client version sent with every mall API call
const MALL_CLIENT_VERSION: &str = "1.0.0";

/// A business code that may arrive as an integer or a string
///
/// Most endpoints report `code` as a number; the page-component endpoint
/// reports it as a string.
#[derive(Debug, Deserialize)]
#[serde(untagged)]
enum Code {
    Int(i64),
    Str(String),
}

impl Code {
    fn as_i64(&self) -> Result<i64, GatewayError> {
        match self {
            Code::Int(n) => Ok(*n),
            Code::Str(s) => s
                .parse()
                .map_err(|_| GatewayError::Envelope(format!("non-numeric code {s:?}"))),
        }
    }
}

#[derive(Debug, Deserialize)]
struct ArenaEnvelope {
    code: Code,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    result: Option<Value>,
}

#[derive(Debug, Deserialize)]
struct MallEnvelope {
    code: Code,
    #[serde(default)]
    msg: Option<String>,
    #[serde(default)]
    data: Option<MallBody>,
}

#[derive(Debug, Deserialize)]
struct MallBody {
    #[serde(rename = "bizCode")]
    biz_code: i64,
    #[serde(rename = "bizMsg", default)]
    biz_msg: Option<String>,
    #[serde(default)]
    result: Option<Value>,
}

/// The normalized payload of a successful mall API call
#[derive(Clone, Debug)]
pub struct MallReply {
    /// The backend's human-readable message for this call
    pub message: String,
    /// The business payload; `Value::Null` when the endpoint returns none
    pub result: Value,
}

impl MallReply {
    /// Read a numeric field off the payload, if present
    pub fn int_field(&self, name: &str) -> Option<i64> {
        self.result.get(name).and_then(Value::as_i64)
    }
}

/// Gateway to the game domain hosting the raffle activity
#[derive(Clone, Debug)]
pub struct ArenaGateway {
    client: reqwest::Client,
    base: Url,
}

impl ArenaGateway {
    /// Wrap an authenticated transport and a base URL
    pub fn new(client: reqwest::Client, base: &str) -> Result<Self, GatewayError> {
        let base = Url::parse(base)
            .map_err(|e| GatewayError::Envelope(format!("invalid arena base URL: {e}")))?;
        Ok(Self { client, base })
    }

    /// POST a JSON body and decode the response into a raw [`Value`]
    ///
    /// No envelope check is applied; the login endpoint replies without a
    /// `code` field, so enforcing one here would reject valid responses.
    pub async fn call(&self, path: &str, body: &Value) -> Result<Value, GatewayError> {
        let url = self
            .base
            .join(path)
            .map_err(|e| GatewayError::Envelope(format!("invalid path {path:?}: {e}")))?;
        let response = self.client.post(url).json(body).send().await?;
        if !response.status().is_success() {
            return Err(GatewayError::Transport(format!(
                "HTTP {} from {}",
                response.status(),
                path
            )));
        }
        response
            .json()
            .await
            .map_err(|e| GatewayError::Envelope(e.to_string()))
    }

    /// POST a JSON body, enforce a zero envelope `code`, and unwrap `result`
    ///
    /// A non-zero code becomes [`GatewayError::Business`] carrying the
    /// backend's message; endpoints without a `result` payload yield
    /// `Value::Null`.
    pub async fn call_checked(&self, path: &str, body: &Value) -> Result<Value, GatewayError> {
        let raw = self.call(path, body).await?;
        let envelope: ArenaEnvelope = serde_json::from_value(raw)
            .map_err(|e| GatewayError::Envelope(e.to_string()))?;
        let code = envelope.code.as_i64()?;
        if code != 0 {
            return Err(GatewayError::Business {
                code,
                message: envelope.message.unwrap_or_default(),
            });
        }
        Ok(envelope.result.unwrap_or(Value::Null))
    }
}

/// Gateway to the mall API's `functionId` envelope
#[derive(Clone, Debug)]
pub struct MallGateway {
    client: reqwest::Client,
    base: String,
}

impl MallGateway {
    /// Wrap an authenticated transport and the mall API endpoint
    pub fn new(client: reqwest::Client, base: &str) -> Self {
        Self {
            client,
            base: base.trim_end_matches('?').to_string(),
        }
    }

    fn build_url(&self, function_id: &str, params: &Value) -> Result<String, GatewayError> {
        let body = serde_json::to_string(params)
            .map_err(|e| GatewayError::Envelope(e.to_string()))?;
        Ok(format!(
            "{}?functionId={}&body={}&client={}&clientVersion={}",
            self.base,
            function_id,
            urlencoding::encode(&body),
            MALL_CLIENT,
            MALL_CLIENT_VERSION
        ))
    }

    /// Invoke a mall function and decode both envelope levels
    ///
    /// The outer `code` and the inner `bizCode` are checked in one place so
    /// every caller observes a single normalized failure type regardless of
    /// which level rejected the call.
    pub async fn invoke(&self, function_id: &str, params: &Value) -> Result<MallReply, GatewayError> {
        let url = self.build_url(function_id, params)?;
        let response = self.client.post(url).send().await?;
        if !response.status().is_success() {
            return Err(GatewayError::Transport(format!(
                "HTTP {} from {}",
                response.status(),
                function_id
            )));
        }
        let envelope: MallEnvelope = response
            .json()
            .await
            .map_err(|e| GatewayError::Envelope(e.to_string()))?;
        let code = envelope.code.as_i64()?;
        if code != 0 {
            return Err(GatewayError::Business {
                code,
                message: envelope.msg.unwrap_or_default(),
            });
        }
        let body = envelope
            .data
            .ok_or_else(|| GatewayError::Envelope("missing data body".to_string()))?;
        if body.biz_code != 0 {
            return Err(GatewayError::Business {
                code: body.biz_code,
                message: body.biz_msg.unwrap_or_default(),
            });
        }
        Ok(MallReply {
            message: body.biz_msg.unwrap_or_default(),
            result: body.result.unwrap_or(Value::Null),
        })
    }

    /// Perform the featured-page browse interaction
    ///
    /// This endpoint only carries the outer envelope level, and reports its
    /// `code` as a string.
    pub async fn view_component(
        &self,
        component_id: &str,
        activity_id: &str,
    ) -> Result<(), GatewayError> {
        #[derive(Deserialize)]
        struct OuterOnly {
            code: Code,
        }

        let task_param = serde_json::to_string(&serde_json::json!({ "actId": activity_id }))
            .map_err(|e| GatewayError::Envelope(e.to_string()))?;
        let params = serde_json::json!({
            "businessId": "home",
            "componentId": component_id,
            "taskParam": task_param,
        });
        let url = self.build_url("queryPageComponent", &params)?;
        let response = self.client.post(url).send().await?;
        if !response.status().is_success() {
            return Err(GatewayError::Transport(format!(
                "HTTP {} from queryPageComponent",
                response.status()
            )));
        }
        let envelope: OuterOnly = response
            .json()
            .await
            .map_err(|e| GatewayError::Envelope(e.to_string()))?;
        let code = envelope.code.as_i64()?;
        if code != 0 {
            return Err(GatewayError::Business {
                code,
                message: String::new(),
            });
        }
        Ok(())
    }
}
