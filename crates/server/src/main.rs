use std::{net::SocketAddr, sync::Arc};

use axum::{
    extract::{rejection::JsonRejection, State},
    http::StatusCode,
    routing::{get, post},
    Json, Router,
};
use shared::{
    error::{ApiError, ErrorCode},
    protocol::{
        DryRunResponse, ExecuteRequest, ExecuteResponse, HealthResponse, TranslateRequest,
        TranslateResponse, DRY_RUN_ROUTE, EXECUTE_ROUTE, HEALTH_ROUTE, TRANSLATE_ROUTE,
    },
};
use tower_http::limit::RequestBodyLimitLayer;
use tracing::{debug, info};

mod api;
mod config;

use api::{audit, dry_run_result, execute_command, translate_query, validate_query, ApiContext};
use config::load_settings;

type ApiResult<T> = Result<Json<T>, (StatusCode, Json<ApiError>)>;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    let settings = load_settings()?;
    let api = ApiContext::from_settings(&settings);
    let app = build_router(Arc::new(api), settings.body_limit_bytes);

    let addr: SocketAddr = settings.server_bind.parse()?;
    info!(%addr, cluster = %settings.cluster_name, "kubechat backend listening");
    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app).await?;
    Ok(())
}

fn build_router(state: Arc<ApiContext>, body_limit_bytes: usize) -> Router {
    Router::new()
        .route(HEALTH_ROUTE, get(health))
        .route(TRANSLATE_ROUTE, post(llm_parse))
        .route(EXECUTE_ROUTE, post(execute))
        .route(DRY_RUN_ROUTE, post(dry_run))
        .layer(RequestBodyLimitLayer::new(body_limit_bytes))
        .with_state(state)
}

fn reject(error: ApiError) -> (StatusCode, Json<ApiError>) {
    let status = match error.code {
        ErrorCode::Validation => StatusCode::BAD_REQUEST,
        ErrorCode::Forbidden => StatusCode::FORBIDDEN,
        ErrorCode::Unsupported => StatusCode::UNPROCESSABLE_ENTITY,
        ErrorCode::Internal => StatusCode::INTERNAL_SERVER_ERROR,
    };
    (status, Json(error))
}

fn bad_body(rejection: JsonRejection) -> (StatusCode, Json<ApiError>) {
    let status = match rejection.status() {
        StatusCode::PAYLOAD_TOO_LARGE => StatusCode::PAYLOAD_TOO_LARGE,
        _ => StatusCode::BAD_REQUEST,
    };
    let error = ApiError::validation("Invalid request format").with_details(rejection.body_text());
    (status, Json(error))
}

async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "ok".to_string(),
    })
}

async fn llm_parse(body: Result<Json<TranslateRequest>, JsonRejection>) -> ApiResult<TranslateResponse> {
    let Json(req) = body.map_err(bad_body)?;
    let query = validate_query(&req.query).map_err(reject)?;
    let reply = translate_query(query);
    debug!(
        query,
        command = reply.kubectl_command.as_deref(),
        "translated query"
    );
    Ok(Json(reply))
}

async fn execute(
    State(state): State<Arc<ApiContext>>,
    body: Result<Json<ExecuteRequest>, JsonRejection>,
) -> ApiResult<ExecuteResponse> {
    let Json(req) = body.map_err(bad_body)?;
    let validated = state.policy.validate(&req.command, req.dry_run);
    audit(
        &state.cluster_name,
        &req.command,
        req.dry_run,
        &validated.as_ref().map(|_| ()).map_err(|error| error.clone()),
    );
    let parsed = validated.map_err(reject)?;
    Ok(Json(execute_command(&state, &parsed, req.dry_run)))
}

async fn dry_run(
    State(state): State<Arc<ApiContext>>,
    body: Result<Json<ExecuteRequest>, JsonRejection>,
) -> ApiResult<DryRunResponse> {
    let Json(req) = body.map_err(bad_body)?;
    let validated = state.policy.validate(&req.command, true).map(|_| ());
    audit(&state.cluster_name, &req.command, true, &validated);
    validated.map_err(reject)?;
    Ok(Json(dry_run_result(&state)))
}

#[cfg(test)]
#[path = "tests/main_tests.rs"]
mod tests;
