use std::{env, net::IpAddr, sync::Arc, time::Duration};

use boiboi_common::{parse_boolean_flag, Secret};
use boiboi_engine::{
    fees::{FeePolicy, PercentFeePolicy, TieredFeePolicy},
    ProgressMode,
};
use log::*;
use paystack_tools::PaystackConfig;
use rand::{distributions::Alphanumeric, Rng};

use crate::errors::ServerError;

const DEFAULT_BB_HOST: &str = "127.0.0.1";
const DEFAULT_BB_PORT: u16 = 8360;
const DEFAULT_DATABASE_URL: &str = "sqlite://data/boiboi.db";
const DEFAULT_WITHDRAWAL_INTERVAL: Duration = Duration::from_secs(60 * 60);
const DEFAULT_RATING_INTERVAL: Duration = Duration::from_secs(24 * 60 * 60);
const DEFAULT_PING_INTERVAL: Duration = Duration::from_secs(14 * 60);
/// Paystack's published webhook source addresses.
pub const PAYSTACK_WEBHOOK_IPS: [&str; 3] = ["52.31.139.75", "52.49.173.169", "52.214.14.220"];

#[derive(Clone, Debug)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
    pub database_url: String,
    pub auth: AuthConfig,
    /// If true, the X-Forwarded-For header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_x_forwarded_for: bool,
    /// If true, the Forwarded header will be used to determine the client's IP address, rather than the
    /// connection's remote address.
    pub use_forwarded: bool,
    pub fee_policy: FeePolicyKind,
    pub progress_mode: ProgressMode,
    pub paystack: PaystackSettings,
    pub push: PushConfig,
    pub workers: WorkerConfig,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: DEFAULT_BB_HOST.to_string(),
            port: DEFAULT_BB_PORT,
            database_url: DEFAULT_DATABASE_URL.to_string(),
            auth: AuthConfig::default(),
            use_x_forwarded_for: false,
            use_forwarded: false,
            fee_policy: FeePolicyKind::default(),
            progress_mode: ProgressMode::default(),
            paystack: PaystackSettings::default(),
            push: PushConfig::default(),
            workers: WorkerConfig::default(),
        }
    }
}

impl ServerConfig {
    pub fn new(host: &str, port: u16) -> Self {
        Self { host: host.to_string(), port, ..Default::default() }
    }

    pub fn from_env_or_default() -> Self {
        let host = env::var("BB_HOST").ok().unwrap_or_else(|| DEFAULT_BB_HOST.into());
        let port = env::var("BB_PORT")
            .map(|s| {
                s.parse::<u16>().unwrap_or_else(|e| {
                    error!("🪛️ {s} is not a valid port for BB_PORT. {e} Using the default, {DEFAULT_BB_PORT}, instead.");
                    DEFAULT_BB_PORT
                })
            })
            .ok()
            .unwrap_or(DEFAULT_BB_PORT);
        let database_url = env::var("BB_DATABASE_URL").ok().unwrap_or_else(|| {
            warn!("🪛️ BB_DATABASE_URL is not set. Using {DEFAULT_DATABASE_URL}");
            DEFAULT_DATABASE_URL.to_string()
        });
        let auth = AuthConfig::try_from_env().unwrap_or_else(|e| {
            warn!(
                "🪛️ Could not load the authentication configuration from environment variables. {e}. Reverting to the \
                 default configuration."
            );
            AuthConfig::default()
        });
        let use_x_forwarded_for = parse_boolean_flag(env::var("BB_USE_X_FORWARDED_FOR").ok(), false);
        let use_forwarded = parse_boolean_flag(env::var("BB_USE_FORWARDED").ok(), false);
        let fee_policy = env::var("BB_FEE_POLICY")
            .ok()
            .and_then(|s| {
                FeePolicyKind::from_name(&s)
                    .map_err(|e| warn!("🪛️ {e}. Using the tiered fee policy instead."))
                    .ok()
            })
            .unwrap_or_default();
        let progress_mode = env::var("BB_PROGRESS_MODE")
            .ok()
            .and_then(|s| s.parse::<ProgressMode>().map_err(|e| warn!("🪛️ {e}. Using lenient mode instead.")).ok())
            .unwrap_or_default();
        info!("🪛️ Fee policy: {fee_policy:?}. Progress mode: {progress_mode:?}");
        Self {
            host,
            port,
            database_url,
            auth,
            use_x_forwarded_for,
            use_forwarded,
            fee_policy,
            progress_mode,
            paystack: PaystackSettings::from_env_or_defaults(),
            push: PushConfig::from_env_or_defaults(),
            workers: WorkerConfig::from_env_or_defaults(),
        }
    }
}

//-------------------------------------------------  FeePolicyKind  ----------------------------------------------------
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum FeePolicyKind {
    #[default]
    Tiered,
    Percent,
}

impl FeePolicyKind {
    pub fn from_name(name: &str) -> Result<Self, ServerError> {
        match name.trim().to_ascii_lowercase().as_str() {
            "tiered" => Ok(Self::Tiered),
            "percent" | "legacy" => Ok(Self::Percent),
            s => Err(ServerError::ConfigurationError(format!("Unknown fee policy '{s}'"))),
        }
    }

    pub fn policy(&self) -> Arc<dyn FeePolicy> {
        match self {
            Self::Tiered => Arc::new(TieredFeePolicy),
            Self::Percent => Arc::new(PercentFeePolicy),
        }
    }
}

//-------------------------------------------------  PaystackSettings  -------------------------------------------------
#[derive(Clone, Debug)]
pub struct PaystackSettings {
    pub api: PaystackConfig,
    /// Requests to `/webhook` are only accepted from these addresses. `None` disables the check; the signature check
    /// always applies.
    pub whitelist: Option<Vec<IpAddr>>,
}

impl Default for PaystackSettings {
    fn default() -> Self {
        Self { api: PaystackConfig::default(), whitelist: Some(default_paystack_whitelist()) }
    }
}

impl PaystackSettings {
    pub fn from_env_or_defaults() -> Self {
        let api = PaystackConfig::new_from_env_or_default();
        let whitelist = match env::var("BB_PAYSTACK_IP_WHITELIST") {
            Ok(s) => parse_whitelist(&s),
            Err(_) => Some(default_paystack_whitelist()),
        };
        match &whitelist {
            Some(whitelist) if whitelist.is_empty() => {
                warn!(
                    "🚨️ The Paystack IP whitelist was configured, but is empty. The server will run, but won't \
                     accept any webhook calls."
                );
            },
            None => {
                info!("🪛️ No Paystack IP whitelist is set. Only signature validation will be used.");
            },
            Some(v) => {
                let addrs = v.iter().map(|a| a.to_string()).collect::<Vec<_>>().join(", ");
                info!("🪛️ Paystack IP whitelist: {addrs}");
            },
        }
        Self { api, whitelist }
    }
}

pub fn default_paystack_whitelist() -> Vec<IpAddr> {
    PAYSTACK_WEBHOOK_IPS.iter().filter_map(|s| s.parse().ok()).collect()
}

/// Parses a comma-separated list of IP addresses. "none", "false" and "0" disable the whitelist altogether.
pub fn parse_whitelist(s: &str) -> Option<Vec<IpAddr>> {
    if ["none", "false", "0"].contains(&s.trim().to_lowercase().as_str()) {
        info!(
            "🪛️ Paystack IP whitelist is disabled. If this is not what you want, set BB_PAYSTACK_IP_WHITELIST to a \
             comma-separated list of IP addresses to enable it."
        );
        return None;
    }
    let ip_addrs = s
        .split(',')
        .map(str::trim)
        .filter(|s| !s.is_empty())
        .filter_map(|s| {
            s.parse()
                .map_err(|e| {
                    warn!("🪛️ Ignoring invalid IP address ({s}) in BB_PAYSTACK_IP_WHITELIST: {e}");
                })
                .ok()
        })
        .collect::<Vec<IpAddr>>();
    Some(ip_addrs)
}

//-------------------------------------------------  PushConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct PushConfig {
    pub url: String,
    /// Push notifications are logged instead of sent when no key is configured.
    pub server_key: Option<Secret<String>>,
    pub timeout: Duration,
}

impl Default for PushConfig {
    fn default() -> Self {
        Self { url: "https://fcm.googleapis.com/fcm/send".to_string(), server_key: None, timeout: Duration::from_secs(10) }
    }
}

impl PushConfig {
    pub fn from_env_or_defaults() -> Self {
        let mut config = Self::default();
        if let Ok(url) = env::var("BB_PUSH_URL") {
            config.url = url;
        }
        config.server_key = env::var("BB_PUSH_SERVER_KEY").ok().filter(|s| !s.is_empty()).map(Secret::new);
        if config.server_key.is_none() {
            warn!("🪛️ BB_PUSH_SERVER_KEY is not set. Push notifications will only be logged.");
        }
        config
    }
}

//-------------------------------------------------  WorkerConfig  -----------------------------------------------------
#[derive(Clone, Debug)]
pub struct WorkerConfig {
    pub withdrawal_interval: Duration,
    pub rating_interval: Duration,
    pub ping_interval: Duration,
    /// The keep-alive pinger only runs when this is set.
    pub ping_url: Option<String>,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            withdrawal_interval: DEFAULT_WITHDRAWAL_INTERVAL,
            rating_interval: DEFAULT_RATING_INTERVAL,
            ping_interval: DEFAULT_PING_INTERVAL,
            ping_url: None,
        }
    }
}

impl WorkerConfig {
    pub fn from_env_or_defaults() -> Self {
        let defaults = Self::default();
        Self {
            withdrawal_interval: interval_from_env("BB_WITHDRAWAL_INTERVAL_SECS", defaults.withdrawal_interval),
            rating_interval: interval_from_env("BB_RATING_INTERVAL_SECS", defaults.rating_interval),
            ping_interval: interval_from_env("BB_PING_INTERVAL_SECS", defaults.ping_interval),
            ping_url: env::var("BB_PING_URL").ok().filter(|s| !s.is_empty()),
        }
    }
}

fn interval_from_env(name: &str, default: Duration) -> Duration {
    env::var(name)
        .map_err(|_| debug!("🪛️ {name} is not set. Using the default value of {}s.", default.as_secs()))
        .and_then(|s| {
            s.parse::<u64>()
                .map_err(|e| warn!("🪛️ Invalid configuration value for {name}. {e}"))
                .and_then(|secs| match secs {
                    0 => Err(warn!("🪛️ {name} must be positive")),
                    secs => Ok(Duration::from_secs(secs)),
                })
        })
        .ok()
        .unwrap_or(default)
}

//-------------------------------------------------  AuthConfig  -------------------------------------------------------
#[derive(Clone, Debug)]
pub struct AuthConfig {
    /// HMAC key for signing and verifying access tokens.
    pub jwt_secret: Secret<String>,
    /// Bearer token for the `/api/admin` endpoints.
    pub admin_key: Secret<String>,
}

impl Default for AuthConfig {
    fn default() -> Self {
        warn!(
            "🚨️🚨️🚨️ The JWT secret and admin key have not been set. I'm using random values for this session. Every \
             access token will become invalid when the server restarts. DO NOT operate on production like this. \
             🚨️🚨️🚨️"
        );
        Self { jwt_secret: Secret::new(random_secret()), admin_key: Secret::new(random_secret()) }
    }
}

impl AuthConfig {
    pub fn try_from_env() -> Result<Self, ServerError> {
        let jwt_secret =
            env::var("BB_JWT_SECRET").map_err(|e| ServerError::ConfigurationError(format!("{e} [BB_JWT_SECRET]")))?;
        let admin_key =
            env::var("BB_ADMIN_KEY").map_err(|e| ServerError::ConfigurationError(format!("{e} [BB_ADMIN_KEY]")))?;
        if jwt_secret.len() < 32 {
            return Err(ServerError::ConfigurationError("BB_JWT_SECRET must be at least 32 characters long".into()));
        }
        if admin_key.is_empty() {
            return Err(ServerError::ConfigurationError("BB_ADMIN_KEY cannot be empty".into()));
        }
        Ok(Self { jwt_secret: Secret::new(jwt_secret), admin_key: Secret::new(admin_key) })
    }
}

fn random_secret() -> String {
    rand::thread_rng().sample_iter(&Alphanumeric).take(48).map(char::from).collect()
}

//-------------------------------------------------  ServerOptions  ----------------------------------------------------
/// A subset of the server configuration that is used to configure the server's behaviour. Generally we try to keep this
/// as small as possible, and exclude secrets to avoid passing sensitive information around the system.
#[derive(Clone, Copy, Debug, Default)]
pub struct ServerOptions {
    pub use_x_forwarded_for: bool,
    pub use_forwarded: bool,
}

impl ServerOptions {
    pub fn from_config(config: &ServerConfig) -> Self {
        Self { use_x_forwarded_for: config.use_x_forwarded_for, use_forwarded: config.use_forwarded }
    }
}
