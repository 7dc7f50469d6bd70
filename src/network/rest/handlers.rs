/*
 * Copyright 2025 Vijaykumar Singh
 *
 * Licensed under the Apache License, Version 2.0 (the "License");
 * you may not use this file except in compliance with the License.
 * You may obtain a copy of the License at
 *
 *     http://www.apache.org/licenses/LICENSE-2.0
 *
 * Unless required by applicable law or agreed to in writing, software
 * distributed under the License is distributed on an "AS IS" BASIS,
 * WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
 * See the License for the specific language governing permissions and
 * limitations under the License.
 */

//! REST API handlers that delegate to the directory service

use axum::{
    extract::{Json, Query, State},
    http::{header, StatusCode},
    response::{IntoResponse, Json as JsonResponse, Response},
    routing::{get, post},
    Router,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;

use crate::core::{DirectoryError, Kind, KindFilter, ListingDraft, LocationFilter, SearchFilters};
use crate::monitoring::gather_text;
use crate::query::SearchRequest;
use crate::services::registration_service::RejectionReason;
use crate::services::DirectoryService;

/// Shared application state for REST handlers
#[derive(Clone)]
pub struct AppState {
    pub service: Arc<DirectoryService>,
    pub metrics_enabled: bool,
}

/// Generic API response
#[derive(Debug, Serialize, Deserialize)]
pub struct ApiResponse<T> {
    pub success: bool,
    pub data: Option<T>,
    pub error: Option<String>,
    pub message: Option<String>,
}

impl<T> ApiResponse<T> {
    pub fn success(data: T) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: None,
        }
    }

    pub fn success_with_message(data: T, message: String) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
            message: Some(message),
        }
    }

    pub fn error(error: String) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
            message: None,
        }
    }
}

/// Engine error rendered as an HTTP response
#[derive(Debug)]
pub struct ApiError(pub DirectoryError);

impl From<DirectoryError> for ApiError {
    fn from(err: DirectoryError) -> Self {
        ApiError(err)
    }
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match &self.0 {
            e if e.is_client_error() => StatusCode::BAD_REQUEST,
            DirectoryError::StoreUnavailable(_) => StatusCode::SERVICE_UNAVAILABLE,
            DirectoryError::Conflict { .. } => StatusCode::CONFLICT,
            _ => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let body = ApiResponse::<()>::error(self.0.to_string());
        (status, JsonResponse(body)).into_response()
    }
}

type ApiResult<T> = Result<T, ApiError>;

/// Query string of `/api/stores` and `/api/services`
#[derive(Debug, Default, Deserialize)]
pub struct RecordsQuery {
    pub state: Option<String>,
    pub city: Option<String>,
    pub mandal: Option<String>,
    pub category: Option<String>,
    #[serde(rename = "type")]
    pub service_type: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl RecordsQuery {
    fn filter(&self) -> LocationFilter {
        LocationFilter {
            state: self.state.clone(),
            city: self.city.clone(),
            mandal: self.mandal.clone(),
            category: self.category.clone(),
            service_type: self.service_type.clone(),
        }
    }
}

#[derive(Debug, Default, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
pub struct LocationsQuery {
    pub state: Option<String>,
    pub city: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct CategoriesQuery {
    pub kind: Option<String>,
}

/// Structured filters; paging may also be given here
#[derive(Debug, Default, Deserialize)]
pub struct SearchBodyFilters {
    #[serde(flatten)]
    pub structured: SearchFilters,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchBody {
    #[serde(default)]
    pub query: Option<String>,
    #[serde(default, alias = "categoryType")]
    pub kind_filter: Option<String>,
    #[serde(default)]
    pub filters: SearchBodyFilters,
    #[serde(default)]
    pub page: Option<i64>,
    #[serde(default)]
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct RegisterBody {
    /// Falls back to the business phone when absent
    #[serde(default)]
    pub mobile: Option<String>,
    #[serde(alias = "categoryType")]
    pub kind: String,
    pub business: ListingDraft,
}

#[derive(Debug, Deserialize)]
pub struct SendCodeBody {
    #[serde(alias = "mobile")]
    pub phone: String,
}

#[derive(Debug, Deserialize)]
pub struct VerifyCodeBody {
    #[serde(alias = "mobile")]
    pub phone: String,
    #[serde(alias = "otp")]
    pub code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VerifyCodeResponse {
    pub success: bool,
    pub message: String,
}

/// Create REST router with all endpoints
pub fn create_router(state: AppState) -> Router {
    Router::new()
        // Health check
        .route("/api/health", get(health_check))

        // Meta documents
        .route("/api/about", get(about))
        .route("/api/ads", get(ads))
        .route("/api/locations", get(locations))
        .route("/api/categories", get(categories))

        // Listings
        .route("/api/stores", get(list_stores))
        .route("/api/services", get(list_services))
        .route("/api/all-stores", get(all_stores))
        .route("/api/all-services", get(all_services))
        .route("/api/search", post(search))

        // Registration
        .route("/api/register", post(register))
        .route("/api/verification/send", post(send_code))
        .route("/api/verification/verify", post(verify_code))

        .route("/metrics", get(metrics))
        .with_state(state)
}

/// Health check endpoint
pub async fn health_check(
    State(state): State<AppState>,
) -> JsonResponse<ApiResponse<HashMap<String, String>>> {
    let mut health_data = HashMap::new();
    health_data.insert("status".to_string(), "healthy".to_string());
    health_data.insert("service".to_string(), "bizdir-rest".to_string());
    health_data.insert("version".to_string(), env!("CARGO_PKG_VERSION").to_string());
    health_data.insert("store".to_string(), state.service.store_type().to_string());

    JsonResponse(ApiResponse::success(health_data))
}

pub async fn about(State(state): State<AppState>) -> ApiResult<JsonResponse<Value>> {
    Ok(JsonResponse(state.service.about().await?))
}

pub async fn ads(State(state): State<AppState>) -> ApiResult<JsonResponse<Value>> {
    Ok(JsonResponse(state.service.ads().await?))
}

/// States, cities of a state, or mandals of a city, as a sorted array
pub async fn locations(
    State(state): State<AppState>,
    Query(params): Query<LocationsQuery>,
) -> ApiResult<JsonResponse<Vec<String>>> {
    let list = state
        .service
        .list_locations(params.state.as_deref(), params.city.as_deref())
        .await?;
    Ok(JsonResponse(list.into_values()))
}

pub async fn categories(
    State(state): State<AppState>,
    Query(params): Query<CategoriesQuery>,
) -> ApiResult<Response> {
    match params.kind.as_deref().filter(|k| !k.is_empty()) {
        Some(kind) => {
            let kind: Kind = kind.parse()?;
            Ok(JsonResponse(state.service.list_categories(kind).await?).into_response())
        }
        None => Ok(JsonResponse(state.service.categories().await?).into_response()),
    }
}

async fn list_records(state: AppState, kind: Kind, params: RecordsQuery) -> ApiResult<Response> {
    let response = state
        .service
        .list_records(kind, params.filter(), params.page, params.limit)
        .await?;
    Ok(JsonResponse(response).into_response())
}

pub async fn list_stores(
    State(state): State<AppState>,
    Query(params): Query<RecordsQuery>,
) -> ApiResult<Response> {
    list_records(state, Kind::Stores, params).await
}

pub async fn list_services(
    State(state): State<AppState>,
    Query(params): Query<RecordsQuery>,
) -> ApiResult<Response> {
    list_records(state, Kind::Services, params).await
}

pub async fn all_stores(
    State(state): State<AppState>,
    Query(params): Query<PageQuery>,
) -> ApiResult<Response> {
    let page = state
        .service
        .list_all(Kind::Stores, params.page, params.limit)
        .await?;
    Ok(JsonResponse(page).into_response())
}

pub async fn all_services(
    State(state): State<AppState>,
    Query(params): Query<PageQuery>,
) -> ApiResult<Response> {
    let page = state
        .service
        .list_all(Kind::Services, params.page, params.limit)
        .await?;
    Ok(JsonResponse(page).into_response())
}

pub async fn search(
    State(state): State<AppState>,
    Json(body): Json<SearchBody>,
) -> ApiResult<Response> {
    let kind_filter = match body.kind_filter.as_deref().filter(|k| !k.is_empty()) {
        Some(raw) => raw.parse::<KindFilter>()?,
        None => KindFilter::All,
    };
    let request = SearchRequest {
        query: body.query,
        kind_filter,
        filters: body.filters.structured,
        page: body.page.or(body.filters.page).unwrap_or(1),
        page_size: body.limit.or(body.filters.limit).unwrap_or(0),
    };
    let response = state.service.search(request).await?;
    Ok(JsonResponse(response).into_response())
}

pub async fn register(
    State(state): State<AppState>,
    Json(body): Json<RegisterBody>,
) -> ApiResult<Response> {
    let kind: Kind = body.kind.parse()?;
    let mobile = body
        .mobile
        .clone()
        .or_else(|| body.business.phone.clone())
        .unwrap_or_default();

    let outcome = state.service.register(&mobile, body.business, kind).await?;
    let status = match outcome.reason {
        None => StatusCode::OK,
        Some(RejectionReason::QuotaExceeded) => StatusCode::TOO_MANY_REQUESTS,
        Some(RejectionReason::NotVerified) => StatusCode::FORBIDDEN,
        Some(_) => StatusCode::BAD_REQUEST,
    };
    Ok((status, JsonResponse(outcome)).into_response())
}

pub async fn send_code(
    State(state): State<AppState>,
    Json(body): Json<SendCodeBody>,
) -> ApiResult<Response> {
    let ticket = state.service.send_code(&body.phone).await?;
    let response = ApiResponse::success_with_message(ticket, "Verification code sent".to_string());
    Ok(JsonResponse(response).into_response())
}

pub async fn verify_code(
    State(state): State<AppState>,
    Json(body): Json<VerifyCodeBody>,
) -> ApiResult<JsonResponse<VerifyCodeResponse>> {
    let status = state.service.verify_code(&body.phone, &body.code).await?;
    Ok(JsonResponse(VerifyCodeResponse {
        success: status.is_verified(),
        message: status.message().to_string(),
    }))
}

/// Prometheus text exposition
pub async fn metrics(State(state): State<AppState>) -> Response {
    if !state.metrics_enabled {
        return StatusCode::NOT_FOUND.into_response();
    }
    (
        [(header::CONTENT_TYPE, "text/plain; version=0.0.4")],
        gather_text(),
    )
        .into_response()
}
