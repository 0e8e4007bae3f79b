use config::ConfigError;

#[derive(serde::Deserialize, Clone)]
pub struct Settings {
    pub database: DatabaseSettings,
    pub application: ApplicationSettings,
    pub jwt: JwtSettings,
}

#[derive(serde::Deserialize, Clone)]
pub struct ApplicationSettings {
    #[serde(default = "default_host")]
    pub host: String,
    pub port: u16,
    /// Site root that access URLs are built from
    pub base_url: String,
}

#[derive(serde::Deserialize, Clone)]
pub struct DatabaseSettings {
    pub username: String,
    pub password: String,
    pub port: u16,
    pub host: String,
    pub database_name: String,
}

impl DatabaseSettings {
    pub fn connection_string(&self) -> String {
        format!(
            "postgres://{}:{}@{}:{}/{}",
            self.username, self.password, self.host, self.port, self.database_name
        )
    }
}

/// JWT signing and registry settings
#[derive(serde::Deserialize, Clone)]
pub struct JwtSettings {
    pub secret: String,
    pub issuer: String,
    #[serde(default = "default_algorithm")]
    pub algorithm: String,
    /// Maximum number of live tokens kept per subject
    #[serde(default = "default_registry_limit")]
    pub registry_limit: usize,
    /// Query parameter carrying the token in access URLs
    #[serde(default = "default_query_param")]
    pub query_param: String,
    /// Lifetime in seconds of refreshed tokens; the original lifetime is reused when unset
    #[serde(default)]
    pub refresh_ttl: Option<i64>,
}

fn default_host() -> String {
    "127.0.0.1".to_string()
}

fn default_algorithm() -> String {
    "HS256".to_string()
}

fn default_registry_limit() -> usize {
    10
}

fn default_query_param() -> String {
    "jwt".to_string()
}

pub fn get_configuration() -> Result<Settings, ConfigError> {
    let settings = config::Config::builder()
        .add_source(config::File::with_name("configuration").required(false))
        .add_source(config::Environment::with_prefix("APP").separator("__"))
        .build()?;
    settings.try_deserialize::<Settings>()
}
