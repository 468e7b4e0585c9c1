//! Configuration layer: typed settings with layered precedence (file → env → CLI).

use std::{net::SocketAddr, num::NonZeroU32, path::PathBuf, str::FromStr, time::Duration};

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};
use config::{Config, Environment, File};
use serde::Deserialize;
use thiserror::Error;
use tracing::level_filters::LevelFilter;
use url::Url;

const DEFAULT_CONFIG_BASENAME: &str = "config/default";
const LOCAL_CONFIG_BASENAME: &str = "spindle";
const DEFAULT_HOST: &str = "127.0.0.1";
const DEFAULT_PORT: u16 = 3000;
const DEFAULT_GRACEFUL_SHUTDOWN_SECS: u64 = 30;
const DEFAULT_DB_MAX_CONNECTIONS: u32 = 8;
const DEFAULT_OAUTH_PROVIDER: &str = "google";
const DEFAULT_BACKEND_TIMEOUT_SECS: u64 = 10;
pub const DEFAULT_CACHE_TTL_SECS: u64 = 60 * 60 * 24;
const DEFAULT_CACHE_MEMORY_CAPACITY: u32 = 1024;
pub const DEFAULT_PREFS_MAX_AGE_SECS: u64 = 604_800;
pub const DEFAULT_SESSION_MAX_AGE_SECS: u64 = 86_400;

/// Command-line arguments for the Spindle binary.
#[derive(Debug, Parser)]
#[command(name = "spindle", version, about = "Spindle music catalog server")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "SPINDLE_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(subcommand)]
    pub command: Option<Command>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Run the HTTP server.
    Serve(Box<ServeArgs>),
    /// Apply pending database migrations and exit.
    Migrate(MigrateArgs),
}

#[derive(Debug, Args, Default, Clone)]
pub struct DatabaseOverride {
    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,
}

#[derive(Debug, Args, Default, Clone)]
pub struct MigrateArgs {
    #[command(flatten)]
    pub database: DatabaseOverride,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeArgs {
    #[command(flatten)]
    pub overrides: ServeOverrides,
}

#[derive(Debug, Args, Default, Clone)]
pub struct ServeOverrides {
    /// Override the listener host.
    #[arg(long = "server-host", value_name = "HOST")]
    pub server_host: Option<String>,

    /// Override the listener port.
    #[arg(long = "server-port", value_name = "PORT")]
    pub server_port: Option<u16>,

    /// Override the graceful shutdown timeout.
    #[arg(long = "server-graceful-shutdown-seconds", value_name = "SECONDS")]
    pub server_graceful_shutdown_seconds: Option<u64>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Toggle JSON logging.
    #[arg(
        long = "log-json",
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the database connection URL.
    #[arg(long = "database-url", value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the database pool size.
    #[arg(long = "database-max-connections", value_name = "COUNT")]
    pub database_max_connections: Option<u32>,

    /// Override where catalog data is read from (database|remote).
    #[arg(long = "source", value_name = "MODE")]
    pub source: Option<String>,

    /// Override the hosted backend base URL.
    #[arg(long = "backend-url", value_name = "URL")]
    pub backend_url: Option<String>,

    /// Override the cache backend (memory|redis|disabled).
    #[arg(long = "cache-backend", value_name = "BACKEND")]
    pub cache_backend: Option<String>,

    /// Override the Redis connection URL.
    #[arg(long = "cache-redis-url", value_name = "URL")]
    pub cache_redis_url: Option<String>,

    /// Override the cache entry lifetime.
    #[arg(long = "cache-ttl-seconds", value_name = "SECONDS")]
    pub cache_ttl_seconds: Option<u64>,
}

/// Fully-resolved deployment settings after precedence resolution and validation.
#[derive(Debug, Clone)]
pub struct Settings {
    pub server: ServerSettings,
    pub logging: LoggingSettings,
    pub database: DatabaseSettings,
    pub source: DataSourceMode,
    pub backend: BackendSettings,
    pub cache: CacheSettings,
    pub cookies: CookieSettings,
}

#[derive(Debug, Clone)]
pub struct ServerSettings {
    pub addr: SocketAddr,
    pub graceful_shutdown: Duration,
}

#[derive(Debug, Clone)]
pub struct LoggingSettings {
    pub level: LevelFilter,
    pub format: LogFormat,
}

#[derive(Debug, Clone, Copy)]
pub enum LogFormat {
    Json,
    Compact,
}

#[derive(Debug, Clone)]
pub struct DatabaseSettings {
    pub url: Option<String>,
    pub max_connections: NonZeroU32,
}

/// Which adapter serves catalog reads. Only one is active per process.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DataSourceMode {
    Database,
    Remote,
}

impl FromStr for DataSourceMode {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "database" | "db" | "postgres" => Ok(Self::Database),
            "remote" | "hosted" => Ok(Self::Remote),
            other => Err(format!("unknown data source `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct BackendSettings {
    /// Base URL of the hosted backend; auth and remote reads are unavailable without it.
    pub url: Option<Url>,
    pub api_key: Option<String>,
    pub oauth_provider: String,
    pub oauth_redirect: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheBackend {
    Memory,
    Redis,
    Disabled,
}

impl FromStr for CacheBackend {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value.trim().to_ascii_lowercase().as_str() {
            "memory" => Ok(Self::Memory),
            "redis" => Ok(Self::Redis),
            "disabled" | "off" | "none" => Ok(Self::Disabled),
            other => Err(format!("unknown cache backend `{other}`")),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CacheSettings {
    pub backend: CacheBackend,
    pub redis_url: Option<String>,
    pub ttl: Duration,
    pub memory_capacity: NonZeroU32,
}

#[derive(Debug, Clone)]
pub struct CookieSettings {
    /// Signing secrets; the first signs, all verify.
    pub secrets: Vec<String>,
    pub secure: bool,
    pub prefs_max_age: Duration,
    pub session_max_age: Duration,
}

impl Default for CookieSettings {
    fn default() -> Self {
        Self {
            secrets: Vec::new(),
            secure: false,
            prefs_max_age: Duration::from_secs(DEFAULT_PREFS_MAX_AGE_SECS),
            session_max_age: Duration::from_secs(DEFAULT_SESSION_MAX_AGE_SECS),
        }
    }
}

#[derive(Debug, Error)]
pub enum LoadError {
    #[error("failed to build configuration: {0}")]
    Build(#[from] config::ConfigError),
    #[error("invalid configuration for `{key}`: {reason}")]
    Invalid { key: &'static str, reason: String },
}

impl LoadError {
    fn invalid(key: &'static str, reason: impl Into<String>) -> Self {
        Self::Invalid {
            key,
            reason: reason.into(),
        }
    }
}

/// Load settings using the configured precedence (file → environment → CLI).
pub fn load(cli: &CliArgs) -> Result<Settings, LoadError> {
    let mut builder = Config::builder()
        .add_source(File::with_name(DEFAULT_CONFIG_BASENAME).required(false))
        .add_source(File::with_name(LOCAL_CONFIG_BASENAME).required(false));

    if let Some(path) = cli.config_file.as_ref() {
        builder = builder.add_source(File::from(path.as_path()).required(true));
    }

    builder = builder.add_source(Environment::with_prefix("SPINDLE").separator("__"));

    let mut raw: RawSettings = builder.build()?.try_deserialize()?;

    match cli.command.as_ref() {
        Some(Command::Serve(args)) => raw.apply_serve_overrides(&args.overrides),
        Some(Command::Migrate(args)) => raw.apply_database_override(&args.database),
        None => raw.apply_serve_overrides(&ServeOverrides::default()),
    }

    Settings::from_raw(raw)
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSettings {
    server: RawServerSettings,
    logging: RawLoggingSettings,
    database: RawDatabaseSettings,
    source: RawSourceSettings,
    backend: RawBackendSettings,
    cache: RawCacheSettings,
    cookies: RawCookieSettings,
}

impl RawSettings {
    fn apply_serve_overrides(&mut self, overrides: &ServeOverrides) {
        if let Some(host) = overrides.server_host.as_ref() {
            self.server.host = Some(host.clone());
        }
        if let Some(port) = overrides.server_port {
            self.server.port = Some(port);
        }
        if let Some(seconds) = overrides.server_graceful_shutdown_seconds {
            self.server.graceful_shutdown_seconds = Some(seconds);
        }
        if let Some(level) = overrides.log_level.as_ref() {
            self.logging.level = Some(level.clone());
        }
        if let Some(json) = overrides.log_json {
            self.logging.json = Some(json);
        }
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
        if let Some(max) = overrides.database_max_connections {
            self.database.max_connections = Some(max);
        }
        if let Some(mode) = overrides.source.as_ref() {
            self.source.mode = Some(mode.clone());
        }
        if let Some(url) = overrides.backend_url.as_ref() {
            self.backend.url = Some(url.clone());
        }
        if let Some(backend) = overrides.cache_backend.as_ref() {
            self.cache.backend = Some(backend.clone());
        }
        if let Some(url) = overrides.cache_redis_url.as_ref() {
            self.cache.redis_url = Some(url.clone());
        }
        if let Some(ttl) = overrides.cache_ttl_seconds {
            self.cache.ttl_seconds = Some(ttl);
        }
    }

    fn apply_database_override(&mut self, overrides: &DatabaseOverride) {
        if let Some(url) = overrides.database_url.as_ref() {
            self.database.url = Some(url.clone());
        }
    }
}

impl Settings {
    fn from_raw(raw: RawSettings) -> Result<Self, LoadError> {
        let RawSettings {
            server,
            logging,
            database,
            source,
            backend,
            cache,
            cookies,
        } = raw;

        let server = build_server_settings(server)?;
        let logging = build_logging_settings(logging)?;
        let database = build_database_settings(database)?;
        let source = build_source_mode(source)?;
        let backend = build_backend_settings(backend)?;
        let cache = build_cache_settings(cache)?;
        let cookies = build_cookie_settings(cookies)?;

        if source == DataSourceMode::Remote && backend.url.is_none() {
            return Err(LoadError::invalid(
                "backend.url",
                "required when source.mode is `remote`",
            ));
        }

        Ok(Self {
            server,
            logging,
            database,
            source,
            backend,
            cache,
            cookies,
        })
    }
}

fn build_server_settings(server: RawServerSettings) -> Result<ServerSettings, LoadError> {
    let host = server.host.unwrap_or_else(|| DEFAULT_HOST.to_string());

    let port = server.port.unwrap_or(DEFAULT_PORT);
    if port == 0 {
        return Err(LoadError::invalid(
            "server.port",
            "port must be greater than zero",
        ));
    }

    let addr = parse_socket_addr(&host, port)
        .map_err(|reason| LoadError::invalid("server.addr", reason))?;

    let graceful_secs = server
        .graceful_shutdown_seconds
        .unwrap_or(DEFAULT_GRACEFUL_SHUTDOWN_SECS);
    if graceful_secs == 0 {
        return Err(LoadError::invalid(
            "server.graceful_shutdown_seconds",
            "must be greater than zero",
        ));
    }

    Ok(ServerSettings {
        addr,
        graceful_shutdown: Duration::from_secs(graceful_secs),
    })
}

fn build_logging_settings(logging: RawLoggingSettings) -> Result<LoggingSettings, LoadError> {
    let level = match logging.level {
        Some(level) => LevelFilter::from_str(level.as_str()).map_err(|err| {
            LoadError::invalid("logging.level", format!("failed to parse: {err}"))
        })?,
        None => LevelFilter::INFO,
    };

    let format = if logging.json.unwrap_or(false) {
        LogFormat::Json
    } else {
        LogFormat::Compact
    };

    Ok(LoggingSettings { level, format })
}

fn build_database_settings(database: RawDatabaseSettings) -> Result<DatabaseSettings, LoadError> {
    let url = non_blank(database.url);
    let max_connections = non_zero_u32(
        database
            .max_connections
            .unwrap_or(DEFAULT_DB_MAX_CONNECTIONS)
            .into(),
        "database.max_connections",
    )?;

    Ok(DatabaseSettings {
        url,
        max_connections,
    })
}

fn build_source_mode(source: RawSourceSettings) -> Result<DataSourceMode, LoadError> {
    match non_blank(source.mode) {
        Some(mode) => DataSourceMode::from_str(&mode)
            .map_err(|reason| LoadError::invalid("source.mode", reason)),
        None => Ok(DataSourceMode::Database),
    }
}

fn build_backend_settings(backend: RawBackendSettings) -> Result<BackendSettings, LoadError> {
    let url = match non_blank(backend.url) {
        Some(value) => {
            let parsed = Url::parse(&value)
                .map_err(|err| LoadError::invalid("backend.url", format!("invalid url: {err}")))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(LoadError::invalid(
                    "backend.url",
                    "scheme must be http or https",
                ));
            }
            Some(parsed)
        }
        None => None,
    };

    let oauth_provider =
        non_blank(backend.oauth_provider).unwrap_or_else(|| DEFAULT_OAUTH_PROVIDER.to_string());

    let timeout_secs = backend
        .timeout_seconds
        .unwrap_or(DEFAULT_BACKEND_TIMEOUT_SECS);
    if timeout_secs == 0 {
        return Err(LoadError::invalid(
            "backend.timeout_seconds",
            "must be greater than zero",
        ));
    }

    Ok(BackendSettings {
        url,
        api_key: non_blank(backend.api_key),
        oauth_provider,
        oauth_redirect: non_blank(backend.oauth_redirect),
        timeout: Duration::from_secs(timeout_secs),
    })
}

fn build_cache_settings(cache: RawCacheSettings) -> Result<CacheSettings, LoadError> {
    let backend = match non_blank(cache.backend) {
        Some(value) => CacheBackend::from_str(&value)
            .map_err(|reason| LoadError::invalid("cache.backend", reason))?,
        None => CacheBackend::Memory,
    };

    let redis_url = non_blank(cache.redis_url);
    if backend == CacheBackend::Redis && redis_url.is_none() {
        return Err(LoadError::invalid(
            "cache.redis_url",
            "required when cache.backend is `redis`",
        ));
    }

    let ttl_seconds = cache.ttl_seconds.unwrap_or(DEFAULT_CACHE_TTL_SECS);
    if ttl_seconds == 0 {
        return Err(LoadError::invalid(
            "cache.ttl_seconds",
            "must be greater than zero",
        ));
    }

    let memory_capacity = non_zero_u32(
        cache
            .memory_capacity
            .unwrap_or(DEFAULT_CACHE_MEMORY_CAPACITY)
            .into(),
        "cache.memory_capacity",
    )?;

    Ok(CacheSettings {
        backend,
        redis_url,
        ttl: Duration::from_secs(ttl_seconds),
        memory_capacity,
    })
}

fn build_cookie_settings(cookies: RawCookieSettings) -> Result<CookieSettings, LoadError> {
    let previous: Vec<String> = cookies
        .previous_secrets
        .as_deref()
        .unwrap_or_default()
        .split(',')
        .map(str::trim)
        .filter(|value| !value.is_empty())
        .map(str::to_string)
        .collect();

    let mut secrets = Vec::with_capacity(previous.len() + 1);
    match non_blank(cookies.secret) {
        Some(secret) => secrets.push(secret),
        None if !previous.is_empty() => {
            return Err(LoadError::invalid(
                "cookies.previous_secrets",
                "previous secrets require a current secret",
            ));
        }
        None => {}
    }
    secrets.extend(previous);

    let prefs_max_age = cookies
        .prefs_max_age_seconds
        .unwrap_or(DEFAULT_PREFS_MAX_AGE_SECS);
    let session_max_age = cookies
        .session_max_age_seconds
        .unwrap_or(DEFAULT_SESSION_MAX_AGE_SECS);
    if prefs_max_age == 0 {
        return Err(LoadError::invalid(
            "cookies.prefs_max_age_seconds",
            "must be greater than zero",
        ));
    }
    if session_max_age == 0 {
        return Err(LoadError::invalid(
            "cookies.session_max_age_seconds",
            "must be greater than zero",
        ));
    }

    Ok(CookieSettings {
        secrets,
        secure: cookies.secure.unwrap_or(false),
        prefs_max_age: Duration::from_secs(prefs_max_age),
        session_max_age: Duration::from_secs(session_max_age),
    })
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawServerSettings {
    host: Option<String>,
    port: Option<u16>,
    graceful_shutdown_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawLoggingSettings {
    level: Option<String>,
    json: Option<bool>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawDatabaseSettings {
    url: Option<String>,
    max_connections: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawSourceSettings {
    mode: Option<String>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawBackendSettings {
    url: Option<String>,
    api_key: Option<String>,
    oauth_provider: Option<String>,
    oauth_redirect: Option<String>,
    timeout_seconds: Option<u64>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCacheSettings {
    backend: Option<String>,
    redis_url: Option<String>,
    ttl_seconds: Option<u64>,
    memory_capacity: Option<u32>,
}

#[derive(Debug, Clone, Deserialize, Default)]
#[serde(default)]
struct RawCookieSettings {
    secret: Option<String>,
    previous_secrets: Option<String>,
    secure: Option<bool>,
    prefs_max_age_seconds: Option<u64>,
    session_max_age_seconds: Option<u64>,
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.and_then(|value| {
        let trimmed = value.trim();
        (!trimmed.is_empty()).then(|| trimmed.to_string())
    })
}

fn parse_socket_addr(host: &str, port: u16) -> Result<SocketAddr, String> {
    let candidate = format!("{host}:{port}");
    candidate
        .parse()
        .map_err(|err| format!("invalid address `{candidate}`: {err}"))
}

fn non_zero_u32(value: u64, key: &'static str) -> Result<NonZeroU32, LoadError> {
    if value == 0 {
        return Err(LoadError::invalid(key, "must be greater than zero"));
    }
    let value_u32: u32 = value
        .try_into()
        .map_err(|_| LoadError::invalid(key, "value exceeds supported range for u32"))?;
    NonZeroU32::new(value_u32).ok_or_else(|| LoadError::invalid(key, "must be greater than zero"))
}

/// Resolve configuration using the supplied CLI arguments, returning both for downstream use.
pub fn load_with_cli() -> Result<(CliArgs, Settings), LoadError> {
    let args = CliArgs::parse();
    let settings = load(&args)?;
    Ok((args, settings))
}

#[cfg(test)]
mod tests {
    use std::io::Write;

    use super::*;

    #[test]
    fn defaults_cache_for_one_day_in_memory() {
        let settings = Settings::from_raw(RawSettings::default()).expect("valid settings");

        assert_eq!(settings.cache.backend, CacheBackend::Memory);
        assert_eq!(settings.cache.ttl, Duration::from_secs(86_400));
        assert_eq!(settings.source, DataSourceMode::Database);
        assert_eq!(settings.cookies.prefs_max_age, Duration::from_secs(604_800));
        assert_eq!(settings.cookies.session_max_age, Duration::from_secs(86_400));
        assert_eq!(settings.server.addr.port(), DEFAULT_PORT);
    }

    #[test]
    fn cli_overrides_take_highest_precedence() {
        let mut raw = RawSettings::default();
        raw.server.port = Some(4000);
        raw.logging.level = Some("info".to_string());
        raw.cache.ttl_seconds = Some(60);

        let overrides = ServeOverrides {
            server_port: Some(4321),
            log_level: Some("debug".to_string()),
            cache_ttl_seconds: Some(120),
            ..Default::default()
        };

        raw.apply_serve_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert_eq!(settings.server.addr.port(), 4321);
        assert_eq!(settings.logging.level, LevelFilter::DEBUG);
        assert_eq!(settings.cache.ttl, Duration::from_secs(120));
    }

    #[test]
    fn cli_json_logging_enforces_format() {
        let mut raw = RawSettings::default();
        let overrides = ServeOverrides {
            log_json: Some(true),
            ..Default::default()
        };

        raw.apply_serve_overrides(&overrides);
        let settings = Settings::from_raw(raw).expect("valid settings");

        assert!(matches!(settings.logging.format, LogFormat::Json));
    }

    #[test]
    fn remote_source_requires_backend_url() {
        let mut raw = RawSettings::default();
        raw.source.mode = Some("remote".to_string());

        let err = Settings::from_raw(raw).expect_err("missing backend url");
        assert!(matches!(err, LoadError::Invalid { key: "backend.url", .. }));
    }

    #[test]
    fn redis_cache_requires_url() {
        let mut raw = RawSettings::default();
        raw.cache.backend = Some("redis".to_string());

        let err = Settings::from_raw(raw).expect_err("missing redis url");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "cache.redis_url",
                ..
            }
        ));
    }

    #[test]
    fn rejects_unknown_cache_backend() {
        let mut raw = RawSettings::default();
        raw.cache.backend = Some("memcached".to_string());

        assert!(Settings::from_raw(raw).is_err());
    }

    #[test]
    fn zero_ttl_is_rejected() {
        let mut raw = RawSettings::default();
        raw.cache.ttl_seconds = Some(0);

        let err = Settings::from_raw(raw).expect_err("zero ttl");
        assert!(matches!(
            err,
            LoadError::Invalid {
                key: "cache.ttl_seconds",
                ..
            }
        ));
    }

    #[test]
    fn cookie_secrets_keep_signing_secret_first() {
        let mut raw = RawSettings::default();
        raw.cookies.secret = Some("current".to_string());
        raw.cookies.previous_secrets = Some("old-1, ,old-2".to_string());

        let settings = Settings::from_raw(raw).expect("valid settings");
        assert_eq!(settings.cookies.secrets, vec!["current", "old-1", "old-2"]);
    }

    #[test]
    fn previous_secrets_without_current_are_rejected() {
        let mut raw = RawSettings::default();
        raw.cookies.previous_secrets = Some("old".to_string());

        assert!(Settings::from_raw(raw).is_err());
    }

    #[test]
    fn config_file_values_are_loaded() {
        let mut file = tempfile::Builder::new()
            .suffix(".toml")
            .tempfile()
            .expect("temp config file");
        writeln!(
            file,
            "[server]\nport = 8088\n\n[source]\nmode = \"remote\"\n\n[backend]\nurl = \"https://backend.example\"\n\n[cache]\nbackend = \"disabled\""
        )
        .expect("write config");

        let cli = CliArgs::parse_from([
            "spindle",
            "--config-file",
            file.path().to_str().expect("utf-8 path"),
        ]);
        let settings = load(&cli).expect("settings from file");

        assert_eq!(settings.server.addr.port(), 8088);
        assert_eq!(settings.source, DataSourceMode::Remote);
        assert_eq!(settings.cache.backend, CacheBackend::Disabled);
        assert_eq!(
            settings.backend.url.as_ref().map(Url::as_str),
            Some("https://backend.example/")
        );
    }

    #[test]
    fn default_to_serve_command() {
        let args = CliArgs::parse_from(["spindle"]);
        let command = args
            .command
            .unwrap_or(Command::Serve(Box::<ServeArgs>::default()));
        assert!(matches!(command, Command::Serve(_)));
    }

    #[test]
    fn parse_migrate_arguments() {
        let args = CliArgs::parse_from([
            "spindle",
            "migrate",
            "--database-url",
            "postgres://example",
        ]);

        match args.command.expect("migrate command") {
            Command::Migrate(migrate) => {
                assert_eq!(
                    migrate.database.database_url.as_deref(),
                    Some("postgres://example")
                );
            }
            _ => panic!("wrong command parsed"),
        }
    }

    #[test]
    fn parse_serve_overrides() {
        let args = CliArgs::parse_from([
            "spindle",
            "serve",
            "--server-host",
            "0.0.0.0",
            "--cache-backend",
            "redis",
            "--cache-redis-url",
            "redis://localhost",
        ]);

        match args.command.expect("serve command") {
            Command::Serve(serve) => {
                assert_eq!(serve.overrides.server_host.as_deref(), Some("0.0.0.0"));
                assert_eq!(serve.overrides.cache_backend.as_deref(), Some("redis"));
                assert_eq!(
                    serve.overrides.cache_redis_url.as_deref(),
                    Some("redis://localhost")
                );
            }
            _ => panic!("wrong command parsed"),
        }
    }
}
