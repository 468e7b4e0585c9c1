use std::{future::IntoFuture, num::NonZeroUsize, process, sync::Arc, time::Duration};

use spindle::{
    application::{
        auth::{AuthService, DisabledIdentity, IdentityProvider},
        catalog::CatalogService,
        chrome::ChromeService,
        error::AppError,
        kv::KvStore,
        loader::ContentLoader,
        repos::CatalogRepo,
    },
    config::{self, CacheBackend, DataSourceMode},
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, CookieCodec, HttpState},
        kv::{MemoryKvStore, RedisKvStore},
        remote::{BackendClient, HostedCatalog, HostedIdentity},
        telemetry,
    },
};
use tokio::{signal, sync::Notify};
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

#[tokio::main]
async fn main() {
    if let Err(error) = run().await {
        report_application_error(&error);
        process::exit(1);
    }
}

fn report_application_error(error: &AppError) {
    if dispatcher::has_been_set() {
        error!(error = %error, "application error");
        return;
    }

    let subscriber = tracing_fmt().with_max_level(Level::ERROR).finish();
    let dispatch = Dispatch::new(subscriber);
    dispatcher::with_default(&dispatch, || {
        error!(error = %error, "application error");
    });
}

async fn run() -> Result<(), AppError> {
    let (cli_args, settings) = config::load_with_cli()
        .map_err(|err| AppError::unexpected(format!("failed to load configuration: {err}")))?;

    let command = cli_args
        .command
        .unwrap_or(config::Command::Serve(Box::<config::ServeArgs>::default()));

    telemetry::init(&settings.logging).map_err(AppError::from)?;

    match command {
        config::Command::Serve(_) => run_serve(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let database_url = database_url(&settings)?;
    let pool = PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    info!(target = "spindle::migrate", "migrations applied");
    Ok(())
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let backend = build_backend_client(&settings)?;
    let repo = init_catalog_repo(&settings, backend.as_ref()).await?;
    let loader = init_content_loader(&settings).await?;

    let identity: Arc<dyn IdentityProvider> = match backend {
        Some(client) => Arc::new(HostedIdentity::new(client)),
        None => {
            warn!(
                target = "spindle::auth",
                "backend.url is not configured; sign-in is disabled"
            );
            Arc::new(DisabledIdentity)
        }
    };

    let catalog = Arc::new(CatalogService::new(repo, loader));
    let http_state = HttpState {
        chrome: Arc::new(ChromeService::new(catalog.clone())),
        catalog,
        auth: Arc::new(AuthService::new(
            identity,
            settings.backend.oauth_provider.clone(),
            settings.backend.oauth_redirect.clone(),
        )),
        cookies: CookieCodec::new(settings.cookies.clone()),
    };

    serve_http(&settings, http_state).await
}

fn database_url(settings: &config::Settings) -> Result<&str, AppError> {
    settings
        .database
        .url
        .as_deref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)
}

fn build_backend_client(settings: &config::Settings) -> Result<Option<BackendClient>, AppError> {
    let Some(url) = settings.backend.url.as_ref() else {
        return Ok(None);
    };
    BackendClient::new(
        url,
        settings.backend.api_key.clone(),
        settings.backend.timeout,
    )
    .map(Some)
    .map_err(AppError::from)
}

async fn init_catalog_repo(
    settings: &config::Settings,
    backend: Option<&BackendClient>,
) -> Result<Arc<dyn CatalogRepo>, AppError> {
    match settings.source {
        DataSourceMode::Database => {
            let database_url = database_url(settings)?;
            let pool = PostgresRepositories::connect(
                database_url,
                settings.database.max_connections.get(),
            )
            .await
            .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

            PostgresRepositories::run_migrations(&pool)
                .await
                .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

            info!(target = "spindle::catalog", "serving catalog from postgres");
            Ok(Arc::new(PostgresRepositories::new(pool)))
        }
        DataSourceMode::Remote => {
            let client = backend.cloned().ok_or_else(|| {
                AppError::from(InfraError::configuration(
                    "remote data source requires backend.url",
                ))
            })?;
            info!(target = "spindle::catalog", "serving catalog from hosted backend");
            Ok(Arc::new(HostedCatalog::new(client)))
        }
    }
}

async fn init_content_loader(settings: &config::Settings) -> Result<ContentLoader, AppError> {
    let cache = &settings.cache;
    let store: Arc<dyn KvStore> = match cache.backend {
        CacheBackend::Disabled => {
            info!(target = "spindle::cache", "content cache disabled");
            return Ok(ContentLoader::disabled());
        }
        CacheBackend::Memory => {
            let capacity = NonZeroUsize::new(cache.memory_capacity.get() as usize)
                .unwrap_or(NonZeroUsize::MIN);
            Arc::new(MemoryKvStore::new(capacity))
        }
        CacheBackend::Redis => {
            let url = cache.redis_url.as_deref().ok_or_else(|| {
                AppError::from(InfraError::configuration(
                    "redis cache backend requires cache.redis_url",
                ))
            })?;
            let store = RedisKvStore::connect(url)
                .await
                .map_err(|err| AppError::from(InfraError::key_value(err.to_string())))?;
            Arc::new(store)
        }
    };

    info!(
        target = "spindle::cache",
        backend = ?cache.backend,
        ttl_secs = cache.ttl.as_secs(),
        "content cache enabled"
    );
    Ok(ContentLoader::new(store, cache.ttl))
}

async fn serve_http(settings: &config::Settings, http_state: HttpState) -> Result<(), AppError> {
    let router = http::build_router(http_state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(target = "spindle::http", addr = %settings.server.addr, "listening");

    let shutdown = Arc::new(Notify::new());
    let trigger = shutdown.clone();
    let server = axum::serve(listener, router.into_make_service())
        .with_graceful_shutdown(async move {
            shutdown_signal().await;
            trigger.notify_one();
        })
        .into_future();

    let grace = settings.server.graceful_shutdown;
    tokio::select! {
        result = server => {
            result.map_err(|err| AppError::unexpected(format!("server error: {err}")))?;
        }
        () = drain_deadline(shutdown, grace) => {
            warn!(
                target = "spindle::http",
                grace_secs = grace.as_secs(),
                "in-flight requests did not finish before the shutdown deadline"
            );
        }
    }

    info!(target = "spindle::http", "server stopped");
    Ok(())
}

async fn drain_deadline(shutdown: Arc<Notify>, grace: Duration) {
    shutdown.notified().await;
    tokio::time::sleep(grace).await;
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
            }
            Err(err) => {
                error!(error = %err, "failed to listen for SIGTERM");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        () = ctrl_c => info!(target = "spindle::http", "received ctrl-c, shutting down"),
        () = terminate => info!(target = "spindle::http", "received SIGTERM, shutting down"),
    }
}
