//! HTTP API and static front-end.
//!
//! | Route                           | Auth   | Handler                         |
//! |---------------------------------|--------|---------------------------------|
//! | `POST /api/auth/init-user`      | bearer | [`routes::init_user`]           |
//! | `POST /api/auth/profile`        | bearer | [`routes::save_profile`]        |
//! | `GET  /api/auth/profile-data`   | bearer | [`routes::profile_data`]        |
//! | `POST /api/notify/queue-update` | none   | [`routes::notify_queue_update`] |
//! | `POST /api/sheets/rows`         | bearer | [`routes::append_sheet_row`]    |
//! | `GET  /`, `/doctor`, static     | none   | files under `STATIC_DIR`        |

pub mod error;
pub mod extract;
pub mod routes;
pub mod state;


pub use error::{ApiError, ServerError};
pub use state::AppState;

use std::any::Any;
use std::net::SocketAddr;

use axum::{
    extract::DefaultBodyLimit,
    http::{
        header::{AUTHORIZATION, CONTENT_TYPE},
        request::Parts,
        HeaderValue, Method, StatusCode,
    },
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde_json::json;
use tokio::{net::TcpListener, signal::ctrl_c};
#[cfg(unix)]
use tokio::signal::unix::{signal, SignalKind};
use tower_http::{
    catch_panic::CatchPanicLayer,
    cors::{AllowOrigin, CorsLayer},
    services::{ServeDir, ServeFile},
    trace::TraceLayer,
};
use tracing::{error, info, warn};

use crate::config::Config;

/// Builds the application: API routes, static files and the middleware stack.
pub fn router(state: AppState, config: &Config) -> Router {
    let api = Router::new()
        .route("/api/auth/init-user", post(routes::init_user))
        .route("/api/auth/profile", post(routes::save_profile))
        .route("/api/auth/profile-data", get(routes::profile_data))
        .route("/api/notify/queue-update", post(routes::notify_queue_update))
        .route("/api/sheets/rows", post(routes::append_sheet_row))
        .with_state(state);

    let static_dir = &config.static_dir;

    Router::new()
        .merge(api)
        .route_service("/", ServeFile::new(static_dir.join("index.html")))
        .route_service("/doctor", ServeFile::new(static_dir.join("dlogin.html")))
        .fallback_service(ServeDir::new(static_dir))
        .layer(DefaultBodyLimit::max(config.body_limit))
        .layer(CatchPanicLayer::custom(panic_response))
        .layer(cors_layer(&config.allowed_origins))
        .layer(TraceLayer::new_for_http())
}

fn cors_layer(allowed_origins: &[String]) -> CorsLayer {
    let allowed: Vec<HeaderValue> = allowed_origins
        .iter()
        .filter_map(|origin| match HeaderValue::from_str(origin) {
            Ok(value) => Some(value),
            Err(_) => {
                warn!(origin = %origin, "Ignoring invalid CORS origin");
                None
            }
        })
        .collect();

    CorsLayer::new()
        .allow_origin(AllowOrigin::predicate(
            move |origin: &HeaderValue, _: &Parts| {
                let allowed = allowed.contains(origin);
                if !allowed {
                    warn!(origin = ?origin, "CORS blocked origin");
                }
                allowed
            },
        ))
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([CONTENT_TYPE, AUTHORIZATION])
        .allow_credentials(true)
}

fn panic_response(panic: Box<dyn Any + Send + 'static>) -> Response {
    let detail = panic
        .downcast_ref::<String>()
        .map(String::as_str)
        .or_else(|| panic.downcast_ref::<&str>().copied())
        .unwrap_or("unknown panic");
    error!(panic = detail, "Server error");

    (
        StatusCode::INTERNAL_SERVER_ERROR,
        Json(json!({ "success": false, "error": "Internal Server Error" })),
    )
        .into_response()
}

/// Serves the application on `0.0.0.0:{port}` until Ctrl+C or SIGTERM.
pub async fn run(config: Config, state: AppState) -> Result<(), ServerError> {
    let app = router(state, &config);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    let listener = TcpListener::bind(addr)
        .await
        .map_err(|source| ServerError::Bind { addr, source })?;
    info!("Server running at http://localhost:{}", config.port);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
        .map_err(ServerError::Serve)?;

    info!("Server shut down");
    Ok(())
}

async fn shutdown_signal() {
    let ctrl_c = async {
        match ctrl_c().await {
            Ok(()) => info!("Received Ctrl+C, shutting down"),
            Err(e) => {
                error!(error = %e, "Failed to listen for Ctrl+C");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal(SignalKind::terminate()) {
            Ok(mut stream) => {
                stream.recv().await;
                info!("Received terminate signal, shutting down");
            }
            Err(e) => {
                error!(error = %e, "Failed to install signal handler");
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }
}
