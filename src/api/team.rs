use axum::{
    Extension, Json,
    extract::{Query, State},
};
use std::sync::Arc;

use super::auth::CurrentAccount;
use super::validation::validate_max_depth;
use super::{ApiError, ApiResponse, AppState, DepthQuery, RelativeDto, TeamSummaryDto};

/// GET /team/upline
/// Ancestors of the caller, self first
pub async fn upline(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentAccount>,
) -> Result<Json<ApiResponse<Vec<RelativeDto>>>, ApiError> {
    let ancestors = state.shared.hierarchy.ancestors_of(current.id).await?;
    Ok(Json(ApiResponse::success(
        ancestors.into_iter().map(RelativeDto::from).collect(),
    )))
}

/// GET /team/downline?max_depth=
pub async fn downline(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentAccount>,
    Query(query): Query<DepthQuery>,
) -> Result<Json<ApiResponse<Vec<RelativeDto>>>, ApiError> {
    let max_depth = validate_max_depth(query.max_depth)?;
    let descendants = state
        .shared
        .hierarchy
        .descendants_of(current.id, max_depth)
        .await?;

    Ok(Json(ApiResponse::success(
        descendants.into_iter().map(RelativeDto::from).collect(),
    )))
}

/// GET /team/summary?max_depth=
pub async fn summary(
    State(state): State<Arc<AppState>>,
    Extension(current): Extension<CurrentAccount>,
    Query(query): Query<DepthQuery>,
) -> Result<Json<ApiResponse<TeamSummaryDto>>, ApiError> {
    let max_depth = validate_max_depth(query.max_depth)?;
    let summary = state
        .shared
        .hierarchy
        .team_summary(current.id, max_depth)
        .await?;

    Ok(Json(ApiResponse::success(TeamSummaryDto::from(summary))))
}
