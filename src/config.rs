//! Configuration types for promo-runner

use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Backend endpoint configuration
///
/// The engine targets a fixed, versioned set of endpoint contracts; the base
/// URLs are configurable so embedders can point a run at a staging stack or a
/// local fake.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EndpointConfig {
    /// Portal domain handling token exchange, signing parameters and
    /// domain verification (default: production portal)
    #[serde(default = "default_portal_base")]
    pub portal_base: String,

    /// Game domain hosting the raffle activity (default: production arena)
    #[serde(default = "default_arena_base")]
    pub arena_base: String,

    /// Mall API endpoint serving the functionId envelope (default: production)
    #[serde(default = "default_mall_base")]
    pub mall_base: String,

    /// Application identifier sent with every portal call
    #[serde(default = "default_app_id")]
    pub app_id: String,

    /// Game CDN domain submitted to the portal's domain verification
    #[serde(default = "default_game_domain")]
    pub game_domain: String,

    /// Activity landing page, used as referer and login return URL
    #[serde(default = "default_activity_url")]
    pub activity_url: String,
}

impl Default for EndpointConfig {
    fn default() -> Self {
        Self {
            portal_base: default_portal_base(),
            arena_base: default_arena_base(),
            mall_base: default_mall_base(),
            app_id: default_app_id(),
            game_domain: default_game_domain(),
            activity_url: default_activity_url(),
        }
    }
}

/// HTTP transport configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct HttpConfig {
    /// User agent presented on every request (default: mobile app UA)
    #[serde(default = "default_user_agent")]
    pub user_agent: String,

    /// Per-request timeout (default: 30 seconds)
    #[serde(default = "default_http_timeout", with = "duration_ms_serde")]
    pub timeout: Duration,
}

impl Default for HttpConfig {
    fn default() -> Self {
        Self {
            user_agent: default_user_agent(),
            timeout: default_http_timeout(),
        }
    }
}

/// Settle-delay configuration
///
/// Dependent backend calls are separated by small pauses so backend-side state
/// (inventory, progress counters) settles before the next decision is made.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct PacingConfig {
    /// Base pause between dependent calls (default: 500ms)
    #[serde(default = "default_settle", with = "duration_ms_serde")]
    pub settle: Duration,

    /// Upper bound of the random jitter added to each pause (default: 250ms)
    #[serde(default = "default_jitter", with = "duration_ms_serde")]
    pub jitter: Duration,

    /// Wait between the calendar enter and complete collects when the backend
    /// does not dictate one (default: 5 seconds)
    #[serde(default = "default_calendar_wait", with = "duration_ms_serde")]
    pub calendar_wait: Duration,

    /// Pause between the featured-page browse interaction and its collect
    /// (default: 1 second)
    #[serde(default = "default_browse_wait", with = "duration_ms_serde")]
    pub browse_wait: Duration,
}

impl Default for PacingConfig {
    fn default() -> Self {
        Self {
            settle: default_settle(),
            jitter: default_jitter(),
            calendar_wait: default_calendar_wait(),
            browse_wait: default_browse_wait(),
        }
    }
}

impl PacingConfig {
    /// A zero-delay pacing profile for tests
    pub fn immediate() -> Self {
        Self {
            settle: Duration::ZERO,
            jitter: Duration::ZERO,
            calendar_wait: Duration::ZERO,
            browse_wait: Duration::ZERO,
        }
    }
}

/// Raffle activity configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct RaffleConfig {
    /// Whether the raffle run is enabled for this account batch (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Page size used when enumerating the draw catalog (default: 10)
    #[serde(default = "default_page_size")]
    pub page_size: u32,
}

impl Default for RaffleConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            page_size: default_page_size(),
        }
    }
}

/// Factory activity configuration
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct FactoryConfig {
    /// Whether the factory run is enabled for this account batch (default: true)
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Friend-assist codes of peer accounts to credit during the run
    #[serde(default)]
    pub assist_codes: Vec<String>,
}

impl Default for FactoryConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            assist_codes: Vec::new(),
        }
    }
}

/// Notification configuration
///
/// Groups settings for delivering finalized run summaries. Delivery failures
/// never affect a run's reported outcome.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct NotificationConfig {
    /// Webhook endpoints receiving the rendered summary
    #[serde(default)]
    pub webhooks: Vec<WebhookConfig>,
}

/// A single summary webhook
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct WebhookConfig {
    /// URL to POST to
    pub url: String,

    /// Optional authentication header value
    #[serde(default)]
    pub auth_header: Option<String>,

    /// Timeout for webhook requests (default: 30 seconds)
    #[serde(default = "default_http_timeout", with = "duration_ms_serde")]
    pub timeout: Duration,
}

/// Main configuration for the promo runner
///
/// Fields are organized into logical sub-configs:
/// - [`endpoints`](EndpointConfig) — backend base URLs and identifiers
/// - [`http`](HttpConfig) — transport settings
/// - [`pacing`](PacingConfig) — settle delays between dependent calls
/// - [`raffle`](RaffleConfig) / [`factory`](FactoryConfig) — per-activity toggles
/// - [`notifications`](NotificationConfig) — summary webhooks
///
/// The crate never reads configuration files itself; embedders deserialize
/// this from wherever they keep it and pass it in.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Config {
    /// Backend endpoints and identifiers
    #[serde(default)]
    pub endpoints: EndpointConfig,

    /// HTTP transport settings
    #[serde(default)]
    pub http: HttpConfig,

    /// Settle delays between dependent calls
    #[serde(default)]
    pub pacing: PacingConfig,

    /// Raffle activity settings
    #[serde(default)]
    pub raffle: RaffleConfig,

    /// Factory activity settings
    #[serde(default)]
    pub factory: FactoryConfig,

    /// Summary notification settings
    #[serde(default)]
    pub notifications: NotificationConfig,
}

fn default_portal_base() -> String {
    "https://activity.minimall.com".to_string()
}

fn default_arena_base() -> String {
    "https://arena.minigame.cn".to_string()
}

fn default_mall_base() -> String {
    "https://api.m.minimall.com/client.action".to_string()
}

fn default_app_id() -> String {
    "8f3c1a946bd2e07c5d1a9f4e6b20c873".to_string()
}

fn default_game_domain() -> String {
    "game-cdn.minigame.cn".to_string()
}

fn default_activity_url() -> String {
    "https://m.minimall.com/active/raffle/index.html".to_string()
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (Linux; Android 12; Pixel 6) AppleWebKit/537.36 (KHTML, like Gecko) \
     Version/4.0 Chrome/99.0.4844.88 Mobile Safari/537.36"
        .to_string()
}

fn default_http_timeout() -> Duration {
    Duration::from_secs(30)
}

fn default_settle() -> Duration {
    Duration::from_millis(500)
}

fn default_jitter() -> Duration {
    Duration::from_millis(250)
}

fn default_calendar_wait() -> Duration {
    Duration::from_secs(5)
}

fn default_browse_wait() -> Duration {
    Duration::from_secs(1)
}

fn default_page_size() -> u32 {
    10
}

fn default_true() -> bool {
    true
}

// Duration serialization helper (whole milliseconds)
mod duration_ms_serde {
    use serde::{Deserialize, Deserializer, Serializer};
    use std::time::Duration;

    pub fn serialize<S>(duration: &Duration, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        serializer.serialize_u64(duration.as_millis() as u64)
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Duration, D::Error>
    where
        D: Deserializer<'de>,
    {
        let millis = u64::deserialize(deserializer)?;
        Ok(Duration::from_millis(millis))
    }
}
