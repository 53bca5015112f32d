mod config;
mod delivery;
mod domain;
mod repository;
mod telemetry;
mod usecase;

use std::sync::Arc;

use axum::{
    extract::State,
    middleware,
    routing::{delete, get, post, put},
    Router,
};
use metrics_exporter_prometheus::{PrometheusBuilder, PrometheusHandle};
use tower_http::trace::TraceLayer;
use tracing_subscriber::EnvFilter;

use crate::delivery::http::v1::bookings::{
    booking_requests, create_booking, my_bookings, update_booking_status,
};
use crate::delivery::http::v1::chats::{get_messages, send_message};
use crate::delivery::http::v1::middleware::auth_middleware;
use crate::delivery::http::v1::private_requests::{
    cancel_private_request, create_private_request, my_private_requests, nearby_private_requests,
    respond_to_private_request,
};
use crate::delivery::http::v1::reviews::{create_review, get_user_reviews};
use crate::delivery::http::v1::rides::{
    cancel_ride, create_ride, get_ride, list_rides, my_rides, search_rides, update_ride,
};
use crate::delivery::http::v1::users::{delete_account, get_user_profile};
use crate::repository::postgres::{
    create_pool, PostgresBookingRepository, PostgresChatMessageRepository,
    PostgresPrivateRequestRepository, PostgresReviewRepository, PostgresRideRepository,
    PostgresUserRepository,
};
use crate::usecase::bookings::BookingsUseCase;
use crate::usecase::chats::ChatsUseCase;
use crate::usecase::jwt::JwtService;
use crate::usecase::private_requests::PrivateRequestsUseCase;
use crate::usecase::reviews::ReviewsUseCase;
use crate::usecase::rides::RidesUseCase;
use crate::usecase::users::UsersUseCase;

pub struct AppState {
    pub rides_usecase: RidesUseCase<PostgresRideRepository, PostgresBookingRepository>,
    pub bookings_usecase: BookingsUseCase<PostgresBookingRepository, PostgresRideRepository>,
    pub requests_usecase:
        PrivateRequestsUseCase<PostgresPrivateRequestRepository, PostgresRideRepository>,
    pub chats_usecase: ChatsUseCase<
        PostgresChatMessageRepository,
        PostgresBookingRepository,
        PostgresPrivateRequestRepository,
    >,
    pub reviews_usecase: ReviewsUseCase<
        PostgresReviewRepository,
        PostgresRideRepository,
        PostgresBookingRepository,
        PostgresUserRepository,
    >,
    pub users_usecase: UsersUseCase<PostgresUserRepository>,
    pub jwt_service: JwtService,
    pub metrics_handle: PrometheusHandle,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let config = config::AppConfig::from_env();

    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));

    // Initialize tracing subscriber with optional OpenTelemetry layer
    if config.telemetry_enabled {
        let telemetry_config = telemetry::TelemetryConfig {
            service_name: config.telemetry_service_name.clone(),
            service_version: config.telemetry_service_version.clone(),
            environment: config.telemetry_environment.clone(),
            otlp_endpoint: config.telemetry_otlp_endpoint.clone(),
        };

        telemetry::init_telemetry_with_subscriber(&telemetry_config, env_filter)
            .expect("failed to initialize telemetry");
    } else {
        telemetry::init_subscriber_without_telemetry(env_filter);
    }

    tracing::info!("starting the rideshare service");

    let metrics_handle = PrometheusBuilder::new()
        .install_recorder()
        .expect("failed to install Prometheus recorder");
    metrics_process::Collector::default().describe();
    tracing::info!("prometheus metrics initialized");

    tracing::info!("config loaded, telemetry_enabled={}", config.telemetry_enabled);

    let pool = create_pool(&config.database_url, config.database_max_connections)
        .await
        .expect("failed to create database pool");
    tracing::info!("database pool created");

    sqlx::migrate!().run(&pool).await?;
    tracing::info!("database migrations applied");

    let jwt_service = JwtService::new(config.jwt_secret);
    let rides_usecase = RidesUseCase::new(
        PostgresRideRepository::new(pool.clone()),
        PostgresBookingRepository::new(pool.clone()),
    );
    let bookings_usecase = BookingsUseCase::new(
        PostgresBookingRepository::new(pool.clone()),
        PostgresRideRepository::new(pool.clone()),
    );
    let requests_usecase = PrivateRequestsUseCase::new(
        PostgresPrivateRequestRepository::new(pool.clone()),
        PostgresRideRepository::new(pool.clone()),
    );
    let chats_usecase = ChatsUseCase::new(
        PostgresChatMessageRepository::new(pool.clone()),
        PostgresBookingRepository::new(pool.clone()),
        PostgresPrivateRequestRepository::new(pool.clone()),
    );
    let reviews_usecase = ReviewsUseCase::new(
        PostgresReviewRepository::new(pool.clone()),
        PostgresRideRepository::new(pool.clone()),
        PostgresBookingRepository::new(pool.clone()),
        PostgresUserRepository::new(pool.clone()),
    );
    let users_usecase = UsersUseCase::new(PostgresUserRepository::new(pool));

    let shared_state = Arc::new(AppState {
        rides_usecase,
        bookings_usecase,
        requests_usecase,
        chats_usecase,
        reviews_usecase,
        users_usecase,
        jwt_service,
        metrics_handle,
    });

    // All routes require authentication
    let api = Router::new()
        .route("/api/v1/rides", get(list_rides).post(create_ride))
        .route("/api/v1/rides/mine", get(my_rides))
        .route("/api/v1/rides/search", post(search_rides))
        .route(
            "/api/v1/rides/{id}",
            get(get_ride).put(update_ride).delete(cancel_ride),
        )
        .route("/api/v1/bookings", get(my_bookings).post(create_booking))
        .route("/api/v1/bookings/requests", get(booking_requests))
        .route("/api/v1/bookings/{id}/status", put(update_booking_status))
        .route(
            "/api/v1/private-requests",
            get(my_private_requests).post(create_private_request),
        )
        .route("/api/v1/private-requests/nearby", get(nearby_private_requests))
        .route(
            "/api/v1/private-requests/{id}/respond",
            post(respond_to_private_request),
        )
        .route("/api/v1/private-requests/{id}", delete(cancel_private_request))
        .route("/api/v1/chats/message", post(send_message))
        .route("/api/v1/chats/{context_type}/{id}", get(get_messages))
        .route("/api/v1/reviews", post(create_review))
        .route("/api/v1/reviews/user/{id}", get(get_user_reviews))
        .route("/api/v1/users/account", delete(delete_account))
        .route("/api/v1/users/{id}", get(get_user_profile))
        .layer(middleware::from_fn_with_state(
            shared_state.clone(),
            auth_middleware,
        ));

    let router = Router::new()
        .route("/healthz", get(healthz))
        .route("/metrics", get(metrics))
        .merge(api)
        .layer(TraceLayer::new_for_http())
        .with_state(shared_state);

    let listener = tokio::net::TcpListener::bind("0.0.0.0:8080").await?;
    tracing::info!("rideshare service running on 0.0.0.0:8080");
    axum::serve(listener, router).await?;

    // Shutdown telemetry on exit
    if config.telemetry_enabled {
        telemetry::shutdown_telemetry();
    }

    Ok(())
}

async fn metrics(State(state): State<Arc<AppState>>) -> String {
    metrics_process::Collector::default().collect();
    state.metrics_handle.render()
}

#[tracing::instrument]
async fn healthz() -> &'static str {
    "OK"
}
