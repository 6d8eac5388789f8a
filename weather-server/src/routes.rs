use axum::{
    Json, Router,
    body::Bytes,
    extract::State,
    http::StatusCode,
    response::{Html, IntoResponse, Response},
    routing::{get, post},
};
use serde::Serialize;
use tower_http::trace::TraceLayer;
use weather_core::{ApiError, ErrorKind, Handler, ResponseDocument};

pub const GENERATE_PATH: &str = "/content/api/v1/integration/generate";

/// Renders an [`ApiError`] as `{ "message": ..., ...payload }` with its status code.
struct ErrorResponse(ApiError);

impl From<ApiError> for ErrorResponse {
    fn from(err: ApiError) -> Self {
        Self(err)
    }
}

impl IntoResponse for ErrorResponse {
    fn into_response(self) -> Response {
        let err = self.0;
        // Upstream codes outside the valid range still need a status.
        let status = StatusCode::from_u16(err.status_code).unwrap_or(StatusCode::BAD_GATEWAY);

        match err.kind {
            ErrorKind::Validation | ErrorKind::Forbidden => {
                tracing::info!(status = status.as_u16(), message = %err.message, "request rejected");
            }
            ErrorKind::Upstream | ErrorKind::BadGateway => {
                tracing::warn!(status = status.as_u16(), "weather lookup failed");
            }
        }

        (status, Json(err.body())).into_response()
    }
}

#[derive(Serialize)]
struct HealthResponse {
    status: &'static str,
    version: &'static str,
}

async fn home() -> Html<&'static str> {
    Html("<p><h2>Weather activity recommendations API.</h2></p>")
}

async fn health_check() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok",
        version: env!("CARGO_PKG_VERSION"),
    })
}

async fn generate(
    State(handler): State<Handler>,
    body: Bytes,
) -> Result<Json<ResponseDocument>, ErrorResponse> {
    Ok(Json(handler.generate(&body).await?))
}

pub fn router(handler: Handler) -> Router {
    Router::new()
        .route("/", get(home))
        .route("/health", get(health_check))
        .route(GENERATE_PATH, post(generate))
        .layer(TraceLayer::new_for_http())
        .with_state(handler)
}
