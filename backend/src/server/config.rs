//! Application settings and the server configuration built from them.

use std::net::{AddrParseError, SocketAddr};
use std::time::Duration;

use chrono::TimeDelta;
use ortho_config::OrthoConfig;
use serde::Deserialize;

use tourbook::outbound::persistence::DbPool;
use tourbook::outbound::security::DEFAULT_TOKEN_LIFETIME_DAYS;

#[cfg(feature = "metrics")]
use actix_web_prom::PrometheusMetrics;

const DEFAULT_BIND_ADDR: &str = "0.0.0.0:8080";
const DEFAULT_ENVIRONMENT: &str = "development";
const DEFAULT_FRONTEND_URL: &str = "http://localhost:3000";
const DEFAULT_PAYMENT_API_BASE: &str = "https://api.stripe.com/";
const DEFAULT_MEDIA_API_BASE: &str = "https://api.cloudinary.com/";
const DEFAULT_OUTBOUND_TIMEOUT_SECS: u64 = 10;

/// Settings loaded from CLI flags, `TOURBOOK_*` variables and config files.
///
/// Every field is optional so the server starts with no configuration at all.
#[derive(Debug, Clone, Default, Deserialize, OrthoConfig)]
#[serde(default)]
#[ortho_config(prefix = "TOURBOOK")]
pub struct AppSettings {
    /// Socket address to listen on, e.g. `0.0.0.0:8080`.
    pub bind_addr: Option<String>,
    /// PostgreSQL URL; the in-memory store is used when absent.
    pub database_url: Option<String>,
    /// Name reported by the health endpoint.
    pub environment: Option<String>,
    /// Origin of the web client.
    pub frontend_url: Option<String>,
    pub payment_api_base: Option<String>,
    pub payment_secret_key: Option<String>,
    pub payment_webhook_secret: Option<String>,
    pub media_api_base: Option<String>,
    pub media_cloud_name: Option<String>,
    pub media_api_key: Option<String>,
    pub media_api_secret: Option<String>,
    /// Prefix hosted media URLs start with.
    pub media_base_url: Option<String>,
    pub token_lifetime_days: Option<i64>,
    pub outbound_timeout_secs: Option<u64>,
}

/// Credentials for the payment provider.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PaymentSettings {
    pub api_base: String,
    pub secret_key: String,
    pub webhook_secret: String,
}

/// Credentials for the media host.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MediaSettings {
    pub api_base: String,
    pub cloud_name: String,
    pub api_key: String,
    pub api_secret: String,
}

impl AppSettings {
    /// Parsed listen address.
    ///
    /// # Errors
    ///
    /// Returns the parse error when `bind_addr` is not `host:port`.
    pub fn bind_addr(&self) -> Result<SocketAddr, AddrParseError> {
        self.bind_addr.as_deref().unwrap_or(DEFAULT_BIND_ADDR).parse()
    }

    pub fn environment(&self) -> &str {
        self.environment.as_deref().unwrap_or(DEFAULT_ENVIRONMENT)
    }

    pub fn frontend_url(&self) -> &str {
        self.frontend_url.as_deref().unwrap_or(DEFAULT_FRONTEND_URL)
    }

    pub fn token_lifetime(&self) -> TimeDelta {
        TimeDelta::days(self.token_lifetime_days.unwrap_or(DEFAULT_TOKEN_LIFETIME_DAYS))
    }

    pub fn outbound_timeout(&self) -> Duration {
        Duration::from_secs(
            self.outbound_timeout_secs
                .unwrap_or(DEFAULT_OUTBOUND_TIMEOUT_SECS),
        )
    }

    /// Provider settings, present only when both secrets are configured.
    pub fn payment(&self) -> Option<PaymentSettings> {
        Some(PaymentSettings {
            api_base: self
                .payment_api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_PAYMENT_API_BASE.to_owned()),
            secret_key: self.payment_secret_key.clone()?,
            webhook_secret: self.payment_webhook_secret.clone()?,
        })
    }

    /// Media host settings, present only when every credential is configured.
    pub fn media(&self) -> Option<MediaSettings> {
        Some(MediaSettings {
            api_base: self
                .media_api_base
                .clone()
                .unwrap_or_else(|| DEFAULT_MEDIA_API_BASE.to_owned()),
            cloud_name: self.media_cloud_name.clone()?,
            api_key: self.media_api_key.clone()?,
            api_secret: self.media_api_secret.clone()?,
        })
    }

    /// Base for rewritten media references.
    ///
    /// Defaults to the configured cloud's upload path, or a local path when
    /// no media host is configured.
    pub fn media_base_url(&self) -> String {
        match (&self.media_base_url, &self.media_cloud_name) {
            (Some(base), _) => base.clone(),
            (None, Some(cloud)) => {
                format!("https://res.cloudinary.com/{cloud}/image/upload/tourbook")
            }
            (None, None) => "/img".to_owned(),
        }
    }
}

/// Everything [`super::create_server`] needs beyond the health state.
pub struct ServerConfig {
    pub(crate) settings: AppSettings,
    pub(crate) auth_key: Vec<u8>,
    pub(crate) db_pool: Option<DbPool>,
    #[cfg(feature = "metrics")]
    pub(crate) prometheus: Option<PrometheusMetrics>,
}

impl ServerConfig {
    #[must_use]
    pub fn new(settings: AppSettings, auth_key: Vec<u8>) -> Self {
        Self {
            settings,
            auth_key,
            db_pool: None,
            #[cfg(feature = "metrics")]
            prometheus: None,
        }
    }

    /// Attach a database pool; repositories switch to Diesel adapters.
    #[must_use]
    pub fn with_db_pool(mut self, pool: DbPool) -> Self {
        self.db_pool = Some(pool);
        self
    }

    #[cfg(feature = "metrics")]
    /// Attach Prometheus middleware to the configuration.
    #[must_use]
    pub fn with_metrics(mut self, prometheus: Option<PrometheusMetrics>) -> Self {
        self.prometheus = prometheus;
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use env_lock::lock_env;
    use rstest::rstest;
    use std::ffi::OsString;

    const VARS: [&str; 14] = [
        "TOURBOOK_BIND_ADDR",
        "TOURBOOK_DATABASE_URL",
        "TOURBOOK_ENVIRONMENT",
        "TOURBOOK_FRONTEND_URL",
        "TOURBOOK_PAYMENT_API_BASE",
        "TOURBOOK_PAYMENT_SECRET_KEY",
        "TOURBOOK_PAYMENT_WEBHOOK_SECRET",
        "TOURBOOK_MEDIA_API_BASE",
        "TOURBOOK_MEDIA_CLOUD_NAME",
        "TOURBOOK_MEDIA_API_KEY",
        "TOURBOOK_MEDIA_API_SECRET",
        "TOURBOOK_MEDIA_BASE_URL",
        "TOURBOOK_TOKEN_LIFETIME_DAYS",
        "TOURBOOK_OUTBOUND_TIMEOUT_SECS",
    ];

    fn load() -> AppSettings {
        AppSettings::load_from_iter([OsString::from("tourbook")]).expect("settings should load")
    }

    #[rstest]
    fn defaults_apply_when_nothing_is_set() {
        let _guard = lock_env(VARS.map(|name| (name, None::<String>)));
        let settings = load();
        assert_eq!(
            settings.bind_addr(),
            Ok(SocketAddr::from(([0, 0, 0, 0], 8080)))
        );
        assert_eq!(settings.environment(), "development");
        assert!(settings.database_url.is_none());
        assert!(settings.payment().is_none());
        assert!(settings.media().is_none());
        assert_eq!(settings.media_base_url(), "/img");
        assert_eq!(settings.token_lifetime(), TimeDelta::days(90));
    }

    #[rstest]
    fn environment_overrides_are_respected() {
        let _guard = lock_env([
            ("TOURBOOK_BIND_ADDR", Some("127.0.0.1:9000".to_owned())),
            ("TOURBOOK_DATABASE_URL", Some("postgres://localhost/tourbook".to_owned())),
            ("TOURBOOK_ENVIRONMENT", Some("production".to_owned())),
            ("TOURBOOK_PAYMENT_SECRET_KEY", Some("sk_test".to_owned())),
            ("TOURBOOK_PAYMENT_WEBHOOK_SECRET", Some("whsec".to_owned())),
            ("TOURBOOK_MEDIA_CLOUD_NAME", Some("demo".to_owned())),
        ]);
        let settings = load();
        assert_eq!(
            settings.bind_addr(),
            Ok(SocketAddr::from(([127, 0, 0, 1], 9000)))
        );
        assert_eq!(settings.environment(), "production");
        let payment = settings.payment().expect("payment settings");
        assert_eq!(payment.api_base, "https://api.stripe.com/");
        assert_eq!(payment.webhook_secret, "whsec");
        assert!(settings.media().is_none(), "api key and secret still missing");
        assert_eq!(
            settings.media_base_url(),
            "https://res.cloudinary.com/demo/image/upload/tourbook"
        );
    }
}
