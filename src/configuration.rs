use crate::error::ConfigError;

const MIN_SECRET_LENGTH: usize = 32;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub application: ApplicationSettings,
    pub database: DatabaseSettings,
    pub redis: RedisSettings,
    pub jwt: JwtSettings,
    #[serde(default)]
    pub security: SecuritySettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
    #[serde(default = "default_acquire_timeout")]
    pub acquire_timeout_secs: u64,
}

fn default_acquire_timeout() -> u64 {
    5
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// Session cache settings
#[derive(serde::Deserialize, Clone)]
pub struct RedisSettings {
    pub url: String,
    /// Upper bound for a single store command, in milliseconds
    #[serde(default = "default_command_timeout")]
    pub command_timeout_ms: u64,
}

fn default_command_timeout() -> u64 {
    500
}

/// JWT authentication settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub access_token_expiry: i64,   // seconds (e.g., 900 for 15 minutes)
    pub refresh_token_expiry: i64,  // seconds (e.g., 604800 for 7 days)
    pub issuer: String,
}

impl JwtSettings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.secret.len() < MIN_SECRET_LENGTH {
            return Err(ConfigError::InvalidValue(format!(
                "jwt.secret must be at least {} bytes",
                MIN_SECRET_LENGTH
            )));
        }
        if self.access_token_expiry <= 0 {
            return Err(ConfigError::InvalidValue(
                "jwt.access_token_expiry must be positive".to_string(),
            ));
        }
        if self.access_token_expiry >= self.refresh_token_expiry {
            return Err(ConfigError::InvalidValue(
                "jwt.access_token_expiry must be shorter than jwt.refresh_token_expiry".to_string(),
            ));
        }
        if self.issuer.trim().is_empty() {
            return Err(ConfigError::MissingRequired("jwt.issuer".to_string()));
        }
        Ok(())
    }
}

#[derive(serde::Deserialize, Clone)]
pub struct SecuritySettings {
    /// bcrypt work factor
    pub password_hash_cost: u32,
}

impl Default for SecuritySettings {
    fn default() -> Self {
        Self {
            password_hash_cost: bcrypt::DEFAULT_COST,
        }
    }
}

// Mirrors bcrypt's private MIN_COST / MAX_COST (bcrypt 0.15).
pub(crate) const BCRYPT_MIN_COST: u32 = 4;
const BCRYPT_MAX_COST: u32 = 31;

impl Settings {
    pub fn validate(&self) -> Result<(), ConfigError> {
        self.jwt.validate()?;
        if !(BCRYPT_MIN_COST..=BCRYPT_MAX_COST).contains(&self.security.password_hash_cost) {
            return Err(ConfigError::InvalidValue(format!(
                "security.password_hash_cost must be between {} and {}",
                BCRYPT_MIN_COST,
                BCRYPT_MAX_COST
            )));
        }
        Ok(())
    }
}

/// Loads `configuration.{yaml,toml,json}` from the working directory, then
/// applies `APP_`-prefixed environment overrides (e.g. `APP_JWT__SECRET`).
pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(
            config::Environment::with_prefix("APP")
                .prefix_separator("_")
                .separator("__"),
        )
        .build()?;
    let settings = settings.try_deserialize::<Settings>()?;
    settings.validate()?;
    Ok(settings)
}
