use std::{process, sync::Arc};

use apalis::prelude::{Monitor, WorkerBuilder, WorkerFactoryFn};
use apalis_cron::{CronStream, Schedule};
use menu_cache::{
    application::{
        catalog::{Ancestry, DishService, MenuService, SubmenuService},
        error::AppError,
        jobs::{RedriveDeadLettersContext, process_redrive_dead_letters_job, redrive_schedule},
        repos::{
            DishesRepo, DishesWriteRepo, HealthRepo, MenusRepo, MenusWriteRepo, SubmenusRepo,
            SubmenusWriteRepo,
        },
    },
    cache::{
        BoundedCacheStore, CacheAside, CacheBackend, CacheConfig, CacheStore, CacheTrigger,
        DeadLetterLog, InvalidationConsumer, InvalidationQueue, MemoryCacheStore,
        RedisCacheStore,
    },
    config,
    infra::{
        db::PostgresRepositories,
        error::InfraError,
        http::{self, ApiState},
        telemetry,
    },
};
use tokio::sync::watch;
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
        config::Command::FlushCache(_) => run_flush_cache(settings).await,
        config::Command::Migrate(_) => run_migrate(settings).await,
    }
}

async fn run_serve(settings: config::Settings) -> Result<(), AppError> {
    let repositories = init_repositories(&settings).await?;
    let cache_config = CacheConfig::from(&settings.cache);
    let cache = build_cache_runtime(&cache_config).await?;
    let api_state = build_api_state(repositories, &cache);

    if cache_config.warm_on_startup && cache.aside.is_enabled() {
        match api_state.menus.warm().await {
            Ok(()) => info!(target = "menu_cache::startup", "Cache warmed"),
            Err(err) => warn!(
                target = "menu_cache::startup",
                error = %err,
                "Cache warm-up failed; continuing cold"
            ),
        }
    }

    let consume_handle = cache.trigger.clone().map(|trigger| {
        let period = trigger.config().auto_consume_interval();
        tokio::spawn(async move {
            let mut interval = tokio::time::interval(period);
            interval.tick().await; // Skip the first immediate tick
            loop {
                interval.tick().await;
                trigger.consumer().consume_pending().await;
            }
        })
    });

    let monitor_handle = match &cache.consumer {
        Some(consumer) => {
            let schedule = redrive_schedule(&cache_config.redrive_schedule)
                .map_err(|err| AppError::from(InfraError::configuration(err)))?;
            Some(spawn_job_monitor(consumer.clone(), schedule))
        }
        None => None,
    };

    let result = serve_http(&settings, api_state).await;

    if let Some(handle) = monitor_handle {
        handle.abort();
        let _ = handle.await;
    }

    if let Some(handle) = consume_handle {
        handle.abort();
        let _ = handle.await;
    }

    // Apply whatever the last requests left behind before exiting.
    if let Some(trigger) = &cache.trigger {
        trigger.consumer().consume_pending().await;
    }

    result
}

async fn run_flush_cache(settings: config::Settings) -> Result<(), AppError> {
    let cache_config = CacheConfig::from(&settings.cache);
    let store = build_cache_store(&cache_config).await?;
    store
        .flush()
        .await
        .map_err(|err| AppError::from(InfraError::cache(err.to_string())))?;

    info!(
        target = "menu_cache::flush",
        backend = %cache_config.backend,
        "Cache flushed"
    );
    Ok(())
}

async fn run_migrate(settings: config::Settings) -> Result<(), AppError> {
    let pool = connect_pool(&settings).await?;
    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;
    info!(target = "menu_cache::migrate", "Migrations applied");
    Ok(())
}

async fn connect_pool(settings: &config::Settings) -> Result<sqlx::PgPool, AppError> {
    let database_url = settings
        .database
        .url
        .as_ref()
        .ok_or_else(|| InfraError::configuration("database url is not configured"))
        .map_err(AppError::from)?;

    PostgresRepositories::connect(database_url, settings.database.max_connections.get())
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))
}

async fn init_repositories(
    settings: &config::Settings,
) -> Result<Arc<PostgresRepositories>, AppError> {
    let pool = connect_pool(settings).await?;

    PostgresRepositories::run_migrations(&pool)
        .await
        .map_err(|err| AppError::from(InfraError::database(err.to_string())))?;

    Ok(Arc::new(PostgresRepositories::new(pool)))
}

/// Backend selected by configuration, with every call bounded by the operation timeout.
async fn build_cache_store(config: &CacheConfig) -> Result<Arc<dyn CacheStore>, AppError> {
    let inner: Arc<dyn CacheStore> = match config.backend {
        CacheBackend::Memory => Arc::new(MemoryCacheStore::new(config.memory_capacity_non_zero())),
        CacheBackend::Redis => {
            let url = config
                .redis_url
                .as_deref()
                .ok_or_else(|| InfraError::configuration("cache.redis_url is not configured"))
                .map_err(AppError::from)?;
            let store = RedisCacheStore::connect(url)
                .await
                .map_err(|err| AppError::from(InfraError::cache(err.to_string())))?;
            Arc::new(store)
        }
    };

    Ok(Arc::new(BoundedCacheStore::new(
        inner,
        config.operation_timeout(),
    )))
}

struct CacheRuntime {
    aside: CacheAside,
    trigger: Option<Arc<CacheTrigger>>,
    consumer: Option<Arc<InvalidationConsumer>>,
}

async fn build_cache_runtime(config: &CacheConfig) -> Result<CacheRuntime, AppError> {
    if !config.is_enabled() {
        info!(target = "menu_cache::startup", "Cache disabled");
        return Ok(CacheRuntime {
            aside: CacheAside::disabled(),
            trigger: None,
            consumer: None,
        });
    }

    let store = build_cache_store(config).await?;
    let queue = Arc::new(InvalidationQueue::new(config.queue_limit));
    let dead_letters = Arc::new(DeadLetterLog::new(config.dead_letter_capacity));
    let consumer = Arc::new(InvalidationConsumer::new(
        config.clone(),
        store.clone(),
        queue.clone(),
        dead_letters,
    ));
    let trigger = Arc::new(CacheTrigger::new(config.clone(), queue, consumer.clone()));

    info!(
        target = "menu_cache::startup",
        backend = %config.backend,
        inline = config.invalidate_inline,
        "Cache enabled"
    );

    Ok(CacheRuntime {
        aside: CacheAside::new(store, config),
        trigger: Some(trigger),
        consumer: Some(consumer),
    })
}

fn build_api_state(repositories: Arc<PostgresRepositories>, cache: &CacheRuntime) -> ApiState {
    let menus_repo: Arc<dyn MenusRepo> = repositories.clone();
    let menus_write_repo: Arc<dyn MenusWriteRepo> = repositories.clone();
    let submenus_repo: Arc<dyn SubmenusRepo> = repositories.clone();
    let submenus_write_repo: Arc<dyn SubmenusWriteRepo> = repositories.clone();
    let dishes_repo: Arc<dyn DishesRepo> = repositories.clone();
    let dishes_write_repo: Arc<dyn DishesWriteRepo> = repositories.clone();
    let health_repo: Arc<dyn HealthRepo> = repositories;

    let ancestry = Ancestry::new(
        menus_repo.clone(),
        submenus_repo.clone(),
        dishes_repo.clone(),
    );

    let menus = Arc::new(
        MenuService::new(menus_repo, menus_write_repo, cache.aside.clone())
            .with_cache_trigger_opt(cache.trigger.clone()),
    );
    let submenus = Arc::new(
        SubmenuService::new(
            ancestry.clone(),
            submenus_repo,
            submenus_write_repo,
            cache.aside.clone(),
        )
        .with_cache_trigger_opt(cache.trigger.clone()),
    );
    let dishes = Arc::new(
        DishService::new(
            ancestry,
            dishes_repo,
            dishes_write_repo,
            cache.aside.clone(),
        )
        .with_cache_trigger_opt(cache.trigger.clone()),
    );

    ApiState {
        menus,
        submenus,
        dishes,
        health: health_repo,
    }
}

fn spawn_job_monitor(
    consumer: Arc<InvalidationConsumer>,
    schedule: Schedule,
) -> tokio::task::JoinHandle<()> {
    let redrive_worker = WorkerBuilder::new("redrive-dead-letters-worker")
        .data(RedriveDeadLettersContext { consumer })
        .backend(CronStream::new(schedule))
        .build_fn(process_redrive_dead_letters_job);

    let monitor = Monitor::new().register(redrive_worker);

    tokio::spawn(async move {
        if let Err(err) = monitor.run().await {
            error!(error = %err, "job monitor stopped");
        }
    })
}

async fn serve_http(settings: &config::Settings, api_state: ApiState) -> Result<(), AppError> {
    let router = http::build_router(api_state);

    let listener = tokio::net::TcpListener::bind(settings.server.addr)
        .await
        .map_err(|err| AppError::from(InfraError::from(err)))?;
    info!(
        target = "menu_cache::http",
        addr = %settings.server.addr,
        "Listening"
    );

    let (shutdown_tx, mut shutdown_rx) = watch::channel(false);
    let server = axum::serve(listener, router.into_make_service()).with_graceful_shutdown(
        async move {
            let _ = shutdown_rx.changed().await;
        },
    );
    let mut server_handle = tokio::spawn(async move { server.await });

    tokio::select! {
        joined = &mut server_handle => return server_outcome(joined),
        () = shutdown_signal() => {}
    }

    let _ = shutdown_tx.send(true);
    match tokio::time::timeout(settings.server.graceful_shutdown, server_handle).await {
        Ok(joined) => server_outcome(joined),
        Err(_) => {
            warn!(
                target = "menu_cache::http",
                grace_seconds = settings.server.graceful_shutdown.as_secs(),
                "Graceful shutdown timed out; dropping open connections"
            );
            Ok(())
        }
    }
}

fn server_outcome(
    joined: Result<std::io::Result<()>, tokio::task::JoinError>,
) -> Result<(), AppError> {
    match joined {
        Ok(Ok(())) => Ok(()),
        Ok(Err(err)) => Err(AppError::unexpected(format!("server error: {err}"))),
        Err(err) => Err(AppError::unexpected(format!("server task failed: {err}"))),
    }
}

async fn shutdown_signal() {
    if let Err(err) = tokio::signal::ctrl_c().await {
        error!(error = %err, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!(target = "menu_cache::http", "Shutdown signal received");
}
