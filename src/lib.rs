use std::{env, time::Duration};

use config::{builder::DefaultState, Config, ConfigBuilder, ConfigError};
use serde::Deserialize;

pub mod domain;
pub mod infrastructure;

#[derive(Clone, Debug, Deserialize)]
pub struct PizzeriaConfig {
    pub storage: Storage,
    pub logger: Logger,
}

impl PizzeriaConfig {
    /// `pizzeria.toml`、`PIZZERIA__*` 環境変数、`ACCESS_KEY`/`SECRET_KEY` の順で設定を読み込む
    pub fn load() -> Result<Self, ConfigError> {
        Self::build(
            Config::builder()
                .add_source(config::File::with_name("pizzeria").required(false))
                .add_source(config::Environment::with_prefix("PIZZERIA").separator("__"))
                .set_override_option("storage.access_key", env::var("ACCESS_KEY").ok())?
                .set_override_option("storage.secret_key", env::var("SECRET_KEY").ok())?,
        )
    }

    fn build(builder: ConfigBuilder<DefaultState>) -> Result<Self, ConfigError> {
        let config = builder
            .set_default("storage.endpoint", "https://storage.googleapis.com")?
            .set_default("storage.region", "auto")?
            .set_default("storage.bucket", "pizzeria_bucket")?
            .set_default("storage.prefix", "pizzeria/customers")?
            .set_default("storage.timeout_secs", 10)?
            .set_default("logger.level", "INFO")?
            .build()?
            .try_deserialize::<PizzeriaConfig>()?;
        config.storage.validate()?;
        Ok(config)
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Storage {
    pub endpoint: String,
    pub region: String,
    pub bucket: String,
    pub prefix: String,
    pub access_key: String,
    pub secret_key: String,
    pub timeout_secs: u64,
}

impl Storage {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if self.access_key.trim().is_empty() || self.secret_key.trim().is_empty() {
            return Err(ConfigError::Message(
                "storage credentials are not set".to_owned(),
            ));
        }
        if self.bucket.trim().is_empty() {
            return Err(ConfigError::Message("storage bucket is not set".to_owned()));
        }
        if self.prefix.trim().trim_matches('/').is_empty() {
            return Err(ConfigError::Message("storage prefix is not set".to_owned()));
        }
        Ok(())
    }
}

#[derive(Clone, Debug, Deserialize)]
pub struct Logger {
    pub level: Level,
}

#[derive(Clone, Debug, Deserialize)]
pub enum Level {
    TRACE,
    DEBUG,
    INFO,
    WARN,
    ERROR,
}

impl From<&Level> for tracing::Level {
    fn from(value: &Level) -> Self {
        match value {
            Level::TRACE => tracing::Level::TRACE,
            Level::DEBUG => tracing::Level::DEBUG,
            Level::INFO => tracing::Level::INFO,
            Level::WARN => tracing::Level::WARN,
            Level::ERROR => tracing::Level::ERROR,
        }
    }
}

#[cfg(test)]
mod tests {
    use config::{Config, File, FileFormat};

    use super::*;

    fn from_toml(toml: &str) -> Result<PizzeriaConfig, ConfigError> {
        PizzeriaConfig::build(Config::builder().add_source(File::from_str(toml, FileFormat::Toml)))
    }

    #[test]
    fn test_defaults() {
        let config = from_toml(
            r#"
            [storage]
            access_key = "GOOG1EXAMPLE"
            secret_key = "secret"
            "#,
        )
        .unwrap();
        assert_eq!(config.storage.endpoint, "https://storage.googleapis.com");
        assert_eq!(config.storage.region, "auto");
        assert_eq!(config.storage.bucket, "pizzeria_bucket");
        assert_eq!(config.storage.prefix, "pizzeria/customers");
        assert_eq!(config.storage.timeout(), Duration::from_secs(10));
        assert_eq!(
            tracing::Level::from(&config.logger.level),
            tracing::Level::INFO
        );
    }

    #[test]
    fn test_overrides() {
        let config = from_toml(
            r#"
            [storage]
            endpoint = "http://127.0.0.1:9000"
            bucket = "test"
            prefix = "tenant/customers"
            access_key = "minio"
            secret_key = "minio123"
            timeout_secs = 3

            [logger]
            level = "DEBUG"
            "#,
        )
        .unwrap();
        assert_eq!(config.storage.endpoint, "http://127.0.0.1:9000");
        assert_eq!(config.storage.bucket, "test");
        assert_eq!(config.storage.prefix, "tenant/customers");
        assert_eq!(config.storage.timeout(), Duration::from_secs(3));
        assert_eq!(
            tracing::Level::from(&config.logger.level),
            tracing::Level::DEBUG
        );
    }

    #[test]
    fn test_missing_credentials() {
        // 認証情報なし
        assert!(from_toml("").is_err());
        // 秘密鍵のみ欠落
        assert!(from_toml(
            r#"
            [storage]
            access_key = "GOOG1EXAMPLE"
            "#
        )
        .is_err());
        // 空欄
        assert!(from_toml(
            r#"
            [storage]
            access_key = " "
            secret_key = "secret"
            "#
        )
        .is_err());
    }

    #[test]
    fn test_blank_prefix() {
        for prefix in ["", " ", "/", "//"] {
            let toml = format!(
                r#"
                [storage]
                prefix = "{prefix}"
                access_key = "GOOG1EXAMPLE"
                secret_key = "secret"
                "#
            );
            assert!(
                matches!(from_toml(&toml), Err(ConfigError::Message(m)) if m.contains("prefix")),
                "{prefix:?}"
            );
        }
    }

    #[test]
    fn test_load_from_env() {
        // 環境変数を扱うテストはこの1つに限る
        env::set_var("ACCESS_KEY", "GOOG1ENV");
        env::set_var("SECRET_KEY", "envsecret");
        env::set_var("PIZZERIA__STORAGE__BUCKET", "envbucket");
        env::set_var("PIZZERIA__STORAGE__TIMEOUT_SECS", "3");

        let config = PizzeriaConfig::load().unwrap();
        assert_eq!(config.storage.access_key, "GOOG1ENV");
        assert_eq!(config.storage.secret_key, "envsecret");
        assert_eq!(config.storage.bucket, "envbucket");
        assert_eq!(config.storage.timeout(), Duration::from_secs(3));
        assert_eq!(config.storage.prefix, "pizzeria/customers");

        // 秘密鍵が欠落すると読み込みに失敗する
        env::remove_var("SECRET_KEY");
        let missing = PizzeriaConfig::load();

        for key in [
            "ACCESS_KEY",
            "PIZZERIA__STORAGE__BUCKET",
            "PIZZERIA__STORAGE__TIMEOUT_SECS",
        ] {
            env::remove_var(key);
        }
        assert!(missing.is_err());
    }
}
