use std::{process, sync::Arc};

use moyinji::{
    application::{
        admin::{AdminBlogService, AdminGalleryService},
        blog::BlogService,
        error::AppError,
        gallery::GalleryService,
        home::HomeService,
        repos::{
            AlbumsRepo, AlbumsWriteRepo, CategoriesRepo, CategoriesWriteRepo, PhotosRepo,
            PhotosWriteRepo, PostsRepo, PostsWriteRepo, StoreHealth, TagsRepo, TagsWriteRepo,
        },
        seed,
    },
    cache::{CacheHandle, CacheTrigger, build_store},
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, HttpState},
        memory::InMemoryRepositories,
        telemetry,
    },
};
use tokio::sync::oneshot;
use tracing::{Dispatch, Level, dispatcher, error, info, warn};
use tracing_subscriber::fmt as tracing_fmt;

/// Everything the services need from a store backend.
trait ContentStore:
    CategoriesRepo
    + CategoriesWriteRepo
    + TagsRepo
    + TagsWriteRepo
    + PostsRepo
    + PostsWriteRepo
    + AlbumsRepo
    + AlbumsWriteRepo
    + PhotosRepo
    + PhotosWriteRepo
    + StoreHealth
    + 'static
{
}

impl<T> ContentStore for T where
    T: CategoriesRepo
        + CategoriesWriteRepo
        + TagsRepo
        + TagsWriteRepo
        + PostsRepo
        + PostsWriteRepo
        + AlbumsRepo
        + AlbumsWriteRepo
        + PhotosRepo
        + PhotosWriteRepo
        + StoreHealth
        + 'static
{
}

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

    match settings.database.url.clone() {
        Some(url) => {
            let repo = init_postgres(&url, &settings).await?;
            dispatch(command, repo, settings).await
        }
        None => {
            warn!("No database URL configured; using the in-memory store");
            dispatch(command, Arc::new(InMemoryRepositories::new()), settings).await
        }
    }
}

async fn dispatch<R: ContentStore>(
    command: config::Command,
    repo: Arc<R>,
    settings: config::Settings,
) -> Result<(), AppError> {
    let cache = CacheHandle::new(build_store(&settings.cache).map_err(InfraError::from)?);
    let trigger = Arc::new(CacheTrigger::new(settings.cache.enabled, cache.clone()));
    info!(
        backend = cache.backend(),
        enabled = settings.cache.enabled,
        "Bundle cache ready"
    );

    match command {
        config::Command::Serve(_) => run_serve(repo, cache, settings).await,
        config::Command::Seed(_) => run_seed(repo, trigger).await,
    }
}

async fn init_postgres(
    url: &str,
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let pool = PostgresRepositories::connect(url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

async fn run_seed<R: ContentStore>(repo: Arc<R>, trigger: Arc<CacheTrigger>) -> Result<(), AppError> {
    let blog = AdminBlogService::new(repo.clone(), trigger.clone());
    let gallery = AdminGalleryService::new(repo, trigger);

    let report = seed::seed_sample_content(&blog, &gallery)
        .await
        .map_err(|err| AppError::unexpected(format!("seeding failed: {err}")))?;
    info!(
        target = "moyinji::seed",
        created = report.created,
        existing = report.existing,
        "Seed completed"
    );
    Ok(())
}

async fn run_serve<R: ContentStore>(
    repo: Arc<R>,
    cache: CacheHandle,
    settings: config::Settings,
) -> Result<(), AppError> {
    let state = HttpState {
        blog: Arc::new(BlogService::new(repo.clone(), cache.clone(), &settings.cache)),
        gallery: Arc::new(GalleryService::new(repo.clone(), cache, &settings.cache)),
        home: Arc::new(HomeService::new(repo.clone())),
        health: repo,
    };
    let router = http::build_router(state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(addr = %settings.server.addr, "HTTP server listening");

    let (signalled_tx, signalled_rx) = oneshot::channel();
    let mut server = tokio::spawn(async move {
        axum::serve(listener, router.into_make_service())
            .with_graceful_shutdown(async move {
                shutdown_signal().await;
                let _ = signalled_tx.send(());
            })
            .await
    });

    tokio::select! {
        result = &mut server => return server_outcome(result),
        _ = signalled_rx => {}
    }

    let grace = settings.server.graceful_shutdown;
    info!(grace_secs = grace.as_secs(), "Shutting down; draining in-flight requests");
    match tokio::time::timeout(grace, &mut server).await {
        Ok(result) => server_outcome(result),
        Err(_) => {
            warn!("Graceful shutdown timed out; aborting remaining connections");
            server.abort();
            Ok(())
        }
    }
}

fn server_outcome(
    result: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match result {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(AppError::from(InfraError::from(err))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            error!(error = %err, "failed to listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
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
        _ = ctrl_c => {}
        _ = terminate => {}
    }
    info!("Shutdown signal received");
}
