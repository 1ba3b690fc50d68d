use axum::{
    Json,
    extract::{
        Path, Query, State,
        rejection::{JsonRejection, QueryRejection},
    },
    http::{HeaderValue, StatusCode, header},
    response::IntoResponse,
};
use operator_repo_api::{ApiError, ApiResponse, ApiResult, ErrorBody};
use operator_repo_storage::{Operator, OperatorInput, OperatorPage, OperatorPatch};
use serde::Serialize;
use utoipa::OpenApi;

use crate::identity::CallerIdentity;
use crate::openapi::ApiDoc;
use crate::server::AppState;
use crate::service::ListQuery;

#[derive(Serialize)]
pub struct HealthResponse {
    status: &'static str,
}

pub async fn healthz() -> impl IntoResponse {
    (StatusCode::OK, Json(HealthResponse { status: "ok" }))
}

pub async fn readyz(State(state): State<AppState>) -> ApiResult<impl IntoResponse> {
    let storage = state.service.storage();
    storage
        .ping()
        .await
        .map_err(|e| state.reject(ApiError::service_unavailable(e.to_string())))?;
    Ok((StatusCode::OK, Json(HealthResponse { status: "ready" })))
}

/// Serves the OpenAPI document.
pub async fn doc() -> impl IntoResponse {
    Json(ApiDoc::openapi())
}

fn json_body<T>(state: &AppState, payload: Result<Json<T>, JsonRejection>) -> ApiResult<T> {
    payload
        .map(|Json(value)| value)
        .map_err(|rej| state.reject(ApiError::unprocessable_entity(rej.body_text())))
}

// ---- Operator CRUD ----

#[utoipa::path(
    put,
    path = "/operator",
    tag = "operator",
    request_body = OperatorInput,
    params(("X-UserID" = Option<String>, Header, description = "Caller identity")),
    responses(
        (status = 201, description = "Operator created", body = Operator),
        (status = 422, description = "Invalid payload", body = ErrorBody)
    )
)]
pub async fn create_operator(
    State(state): State<AppState>,
    caller: CallerIdentity,
    payload: Result<Json<OperatorInput>, JsonRejection>,
) -> ApiResult<ApiResponse<Operator>> {
    let input = json_body(&state, payload)?;
    let created = state
        .service
        .create(&caller, input)
        .await
        .map_err(|e| state.reject(e))?;

    let location = HeaderValue::from_str(&format!("/operator/{}", created.id));
    let response = ApiResponse::created(created);
    Ok(match location {
        Ok(location) => response.with_header(header::LOCATION, location),
        Err(_) => response,
    })
}

#[utoipa::path(
    get,
    path = "/operator",
    tag = "operator",
    params(
        ListQuery,
        ("X-UserID" = Option<String>, Header, description = "Caller identity")
    ),
    responses(
        (status = 200, description = "Operators visible to the caller", body = OperatorPage),
        (status = 400, description = "Invalid query", body = ErrorBody)
    )
)]
pub async fn list_operators(
    State(state): State<AppState>,
    caller: CallerIdentity,
    query: Result<Query<ListQuery>, QueryRejection>,
) -> ApiResult<ApiResponse<OperatorPage>> {
    let Query(query) =
        query.map_err(|rej| state.reject(ApiError::bad_request(rej.body_text())))?;
    let page = state
        .service
        .list(&caller, &query)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(ApiResponse::ok(page))
}

#[utoipa::path(
    delete,
    path = "/operator",
    tag = "operator",
    request_body = Vec<String>,
    params(("X-UserID" = Option<String>, Header, description = "Caller identity")),
    responses(
        (status = 204, description = "All operators deleted"),
        (status = 404, description = "At least one id is missing or not owned", body = ErrorBody)
    )
)]
pub async fn delete_operators(
    State(state): State<AppState>,
    caller: CallerIdentity,
    payload: Result<Json<Vec<String>>, JsonRejection>,
) -> ApiResult<ApiResponse<()>> {
    let ids = json_body(&state, payload)?;
    state
        .service
        .delete_many(&caller, ids)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(ApiResponse::no_content())
}

#[utoipa::path(
    get,
    path = "/operator/{id}",
    tag = "operator",
    params(
        ("id" = String, Path, description = "Operator id"),
        ("X-UserID" = Option<String>, Header, description = "Caller identity")
    ),
    responses(
        (status = 200, description = "The operator", body = Operator),
        (status = 404, description = "Operator not found", body = ErrorBody)
    )
)]
pub async fn read_operator(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<Operator>> {
    let operator = state
        .service
        .get(&caller, &id)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(ApiResponse::ok(operator))
}

#[utoipa::path(
    post,
    path = "/operator/{id}",
    tag = "operator",
    request_body = OperatorPatch,
    params(
        ("id" = String, Path, description = "Operator id"),
        ("X-UserID" = Option<String>, Header, description = "Caller identity")
    ),
    responses(
        (status = 200, description = "The updated operator", body = Operator),
        (status = 404, description = "Operator not found or not owned", body = ErrorBody),
        (status = 422, description = "Invalid payload", body = ErrorBody)
    )
)]
pub async fn update_operator(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
    payload: Result<Json<OperatorPatch>, JsonRejection>,
) -> ApiResult<ApiResponse<Operator>> {
    let patch = json_body(&state, payload)?;
    let updated = state
        .service
        .update(&caller, &id, patch)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(ApiResponse::ok(updated))
}

#[utoipa::path(
    delete,
    path = "/operator/{id}",
    tag = "operator",
    params(
        ("id" = String, Path, description = "Operator id"),
        ("X-UserID" = Option<String>, Header, description = "Caller identity")
    ),
    responses(
        (status = 204, description = "Operator deleted"),
        (status = 404, description = "Operator not found or not owned", body = ErrorBody)
    )
)]
pub async fn delete_operator(
    State(state): State<AppState>,
    caller: CallerIdentity,
    Path(id): Path<String>,
) -> ApiResult<ApiResponse<()>> {
    state
        .service
        .delete(&caller, &id)
        .await
        .map_err(|e| state.reject(e))?;
    Ok(ApiResponse::no_content())
}
