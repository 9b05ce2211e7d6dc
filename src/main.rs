use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{get, post},
    Router,
};
use redis::Client as RedisClient;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use daily_menu_api::{
    config::Config,
    db,
    middleware::auth::JwtSecret,
    routes,
    services::{menu_scheduler, metrics},
    AppState,
};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Config::from_env()?;
    let config = Arc::new(config);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let redis_client = RedisClient::open(config.redis_url.as_str())?;
    let redis_conn = redis_client
        .get_multiplexed_async_connection()
        .await?;
    info!("Redis connected");

    metrics::start(pool.clone());
    if config.menu_broadcast_enabled {
        menu_scheduler::start(pool.clone(), config.clone());
        info!(
            "Daily menu broadcast scheduled at {:02}:00 to #{}",
            config.menu_broadcast_hour, config.slack_channel
        );
    } else {
        info!("Daily menu broadcast disabled");
    }

    let state = AppState {
        db: pool,
        redis: redis_conn,
        config: config.clone(),
    };

    // Allow the configured front-end origin; localhost is always allowed for development.
    let base_url = config.app_base_url.clone();
    let cors_origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        let o = match origin.to_str() {
            Ok(s) => s,
            Err(_) => return false,
        };
        o.starts_with("http://localhost") || o.starts_with("http://127.0.0.1") || o == base_url
    });

    let cors = CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::PATCH, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::list([
            header::AUTHORIZATION,
            header::CONTENT_TYPE,
            header::ACCEPT,
        ]))
        .allow_origin(cors_origin);

    let jwt_secret = JwtSecret(config.jwt_secret.clone());

    let app = Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::metrics::metrics_handler))
        // Auth & users
        .route("/auth/token", post(routes::auth::login))
        .route("/users", post(routes::users::create_user))
        .route("/users/me", get(routes::users::me))
        // Menus
        .route("/menus", get(routes::menu::list_menus).post(routes::menu::create_menu))
        .route(
            "/menus/{id}",
            get(routes::menu::get_menu)
                .patch(routes::menu::update_menu)
                .delete(routes::menu::delete_menu),
        )
        // Menu selections
        .route(
            "/menu-selections",
            get(routes::selection::list_selections).post(routes::selection::create_selection),
        )
        .route(
            "/menu-selections/{id}",
            get(routes::selection::get_selection)
                .patch(routes::selection::update_selection)
                .delete(routes::selection::delete_selection),
        )
        .layer(axum::Extension(jwt_secret))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("Daily menu API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
