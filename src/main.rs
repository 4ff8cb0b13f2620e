use actix_web::{middleware, web, App, HttpServer};
use anyhow::Context;
use ripple::config::Config;
use ripple::handlers::{self, AppState};
use ripple::services::{
    CommentService, EngagementService, FeedSignal, IdentityResolver, NotificationService,
    PostService, UserService,
};
use sqlx::postgres::PgPoolOptions;
use std::time::Duration;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[actix_web::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "info,actix_web=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env().context("Failed to load configuration")?;
    info!(env = %config.app.env, "Starting ripple");

    let pool = PgPoolOptions::new()
        .max_connections(config.database.max_connections)
        .min_connections(config.database.min_connections)
        .acquire_timeout(Duration::from_secs(5))
        .connect(&config.database.url)
        .await
        .context("Failed to connect to database")?;
    info!("Connected to database");

    sqlx::migrate!("./migrations")
        .run(&pool)
        .await
        .context("Failed to run migrations")?;

    let signal = match &config.redis.url {
        Some(url) => FeedSignal::connect(url)
            .await
            .context("Failed to connect to Redis")?,
        None => {
            warn!("REDIS_URL not set, feed-changed signal disabled");
            FeedSignal::disabled()
        }
    };

    let state = AppState {
        identity: IdentityResolver::new(pool.clone()),
        engagement: EngagementService::new(pool.clone(), signal.clone()),
        comments: CommentService::new(pool.clone(), signal.clone()),
        posts: PostService::new(pool.clone(), signal.clone()),
        notifications: NotificationService::new(pool.clone()),
        users: UserService::new(pool),
    };

    let addr = (config.app.host.clone(), config.app.http_port);
    info!("HTTP server listening on {}:{}", addr.0, addr.1);

    HttpServer::new(move || {
        App::new()
            .app_data(web::Data::new(state.clone()))
            .wrap(middleware::Logger::default())
            .wrap(tracing_actix_web::TracingLogger::default())
            .route("/health", web::get().to(|| async { "OK" }))
            .configure(handlers::configure)
    })
    .bind(addr)?
    .run()
    .await?;

    Ok(())
}
