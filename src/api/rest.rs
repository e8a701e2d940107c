//! REST API endpoints for SafePlate Risk Ledger.

use axum::extract::rejection::JsonRejection;
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post};
use axum::{Json, Router};

use crate::domain::{
    AnalysisId, DecryptTarget, DecryptionCallback, LocationCode, NotificationRecord,
    PendingRequest, ReportId, ReportSubmission, Resolution,
};
use crate::server::AppState;

use super::error::{not_found, validation_error, ApiError, ErrorCode};
use super::types::{
    AnalysisResponse, AreaResponse, DispatchResponse, NotificationsQuery, ReportResponse,
    StatsResponse, SubmitReportRequest, SubmitReportResponse,
};

/// Build the `/api` router.
pub fn router() -> Router<AppState> {
    Router::new()
        // Reports
        .route("/v1/reports", post(submit_report))
        .route("/v1/reports/:report_id", get(get_report))
        .route(
            "/v1/reports/:report_id/risk-requests",
            post(request_risk_calculation),
        )
        // Analyses
        .route("/v1/analyses/:analysis_id", get(get_analysis))
        .route(
            "/v1/analyses/:analysis_id/reveal-requests",
            post(request_analysis_reveal),
        )
        // Area aggregates
        .route("/v1/areas/:location_code", get(get_area))
        .route(
            "/v1/areas/:location_code/stats-requests",
            post(request_area_stats),
        )
        // Oracle callbacks
        .route("/v1/oracle/callback", post(oracle_callback))
        .route("/v1/oracle/pending", get(list_pending))
        // Queries
        .route("/v1/stats", get(get_stats))
        .route("/v1/notifications", get(list_notifications))
}

// ============================================================================
// Reports
// ============================================================================

async fn submit_report(
    State(state): State<AppState>,
    payload: Result<Json<SubmitReportRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<SubmitReportResponse>), ApiError> {
    let Json(request) = payload?;

    for (field, input) in [
        ("restaurant_id", &request.restaurant_id),
        ("hygiene", &request.hygiene),
        ("food_safety", &request.food_safety),
        ("facility", &request.facility),
    ] {
        if input.is_empty() {
            return Err(validation_error(field, format!("{field} must not be empty")));
        }
    }

    let submission = ReportSubmission::from(request);
    let report = state.service.submit_report(&submission).await?;

    Ok((
        StatusCode::CREATED,
        Json(SubmitReportResponse {
            report_id: report.id,
            submitted_at: report.submitted_at,
        }),
    ))
}

async fn get_report(
    State(state): State<AppState>,
    Path(report_id): Path<u64>,
) -> Result<Json<ReportResponse>, ApiError> {
    let report = state.service.store().report(ReportId::new(report_id)).await?;
    Ok(Json(report.into()))
}

async fn request_risk_calculation(
    State(state): State<AppState>,
    Path(report_id): Path<u64>,
) -> Result<(StatusCode, Json<DispatchResponse>), ApiError> {
    dispatch(
        &state,
        DecryptTarget::RiskCalculation {
            report_id: ReportId::new(report_id),
        },
    )
    .await
}

// ============================================================================
// Analyses
// ============================================================================

async fn get_analysis(
    State(state): State<AppState>,
    Path(analysis_id): Path<u64>,
) -> Result<Json<AnalysisResponse>, ApiError> {
    let analysis = state
        .service
        .store()
        .analysis(AnalysisId::new(analysis_id))
        .await?;
    Ok(Json(analysis.into()))
}

async fn request_analysis_reveal(
    State(state): State<AppState>,
    Path(analysis_id): Path<u64>,
) -> Result<(StatusCode, Json<DispatchResponse>), ApiError> {
    dispatch(
        &state,
        DecryptTarget::AnalysisReveal {
            analysis_id: AnalysisId::new(analysis_id),
        },
    )
    .await
}

// ============================================================================
// Area aggregates
// ============================================================================

async fn get_area(
    State(state): State<AppState>,
    Path(location_code): Path<u32>,
) -> Result<Json<AreaResponse>, ApiError> {
    let location = LocationCode::new(location_code);
    state
        .service
        .store()
        .area_aggregate(location)
        .await
        .map(|aggregate| Json(aggregate.into()))
        .ok_or_else(|| not_found(ErrorCode::AreaNotFound, format!("area/{location}")))
}

async fn request_area_stats(
    State(state): State<AppState>,
    Path(location_code): Path<u32>,
) -> Result<(StatusCode, Json<DispatchResponse>), ApiError> {
    dispatch(
        &state,
        DecryptTarget::AreaStatsReveal {
            location: LocationCode::new(location_code),
        },
    )
    .await
}

async fn dispatch(
    state: &AppState,
    target: DecryptTarget,
) -> Result<(StatusCode, Json<DispatchResponse>), ApiError> {
    let request_id = state.service.dispatch(target).await?;
    Ok((
        StatusCode::ACCEPTED,
        Json(DispatchResponse::new(request_id, target)),
    ))
}

// ============================================================================
// Oracle callbacks
// ============================================================================

async fn oracle_callback(
    State(state): State<AppState>,
    payload: Result<Json<DecryptionCallback>, JsonRejection>,
) -> Result<Json<Resolution>, ApiError> {
    let Json(callback) = payload?;
    let resolution = state.service.resolve(&callback).await?;
    Ok(Json(resolution))
}

async fn list_pending(State(state): State<AppState>) -> Json<Vec<PendingRequest>> {
    Json(state.service.store().pending_requests().await)
}

// ============================================================================
// Queries
// ============================================================================

async fn get_stats(State(state): State<AppState>) -> Json<StatsResponse> {
    let snapshot = state.service.store().snapshot().await;
    Json(StatsResponse {
        report_count: snapshot.report_count,
        analysis_count: snapshot.analysis_count,
        pending_requests: snapshot.pending_requests,
    })
}

async fn list_notifications(
    State(state): State<AppState>,
    Query(query): Query<NotificationsQuery>,
) -> Json<Vec<NotificationRecord>> {
    Json(
        state
            .notifications
            .since(query.after.unwrap_or(0), query.page_size()),
    )
}
