use axum::Json;
use axum::extract::{Extension, Path, State};
use chorely_shared::api;
use chorely_shared::auth::Role;
use chorely_shared::domain::{ChoreStatus, PointsReason, to_rfc3339};
use tracing::info;

use super::auth::AuthCtx;
use super::chores::chore_dto;
use super::validate::{ApiQuery, ValidJson};
use super::{AppError, AppState, FamilyItemPath, FamilyPath};
use crate::storage::ChoreFilter;
use crate::storage::models::{PointTransaction, User};

const DEFAULT_PER_PAGE: usize = 20;
const MAX_PER_PAGE: usize = 100;

fn member_dto(u: User) -> Result<api::MemberDto, AppError> {
    let role = Role::parse(&u.role).ok_or_else(|| AppError::internal("unknown role"))?;
    Ok(api::MemberDto {
        id: u.id,
        name: u.name,
        role,
        avatar: u.avatar,
        points: u.points,
    })
}

fn entry_dto(t: PointTransaction) -> Result<api::PointsEntryDto, AppError> {
    let reason = t.reason.parse::<PointsReason>().map_err(AppError::internal)?;
    Ok(api::PointsEntryDto {
        id: t.id,
        delta: t.delta,
        balance_after: t.balance_after,
        reason,
        reference_id: t.reference_id,
        note: t.note,
        created_by_id: t.created_by_id,
        time: to_rfc3339(t.created_at),
    })
}

async fn load_member(state: &AppState, family_id: &str, user_id: &str) -> Result<User, AppError> {
    match state.store.get_user(user_id).await? {
        Some(u) if u.family_id == family_id => Ok(u),
        _ => Err(AppError::not_found("User not found in family")),
    }
}

async fn members(state: &AppState, family_id: &str) -> Result<Vec<api::MemberDto>, AppError> {
    state
        .store
        .list_family_members(family_id)
        .await?
        .into_iter()
        .map(member_dto)
        .collect()
}

pub(super) async fn api_list_members(
    State(state): State<AppState>,
    Path(p): Path<FamilyPath>,
) -> Result<Json<Vec<api::MemberDto>>, AppError> {
    Ok(Json(members(&state, &p.family_id).await?))
}

pub(super) async fn api_adjust_points(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(p): Path<FamilyItemPath>,
    ValidJson(body): ValidJson<api::PointsAdjustReq>,
) -> Result<Json<api::PointsBalanceDto>, AppError> {
    let target = load_member(&state, &p.family_id, &p.id).await?;
    let reason = body
        .reason
        .as_deref()
        .map(str::trim)
        .filter(|r| !r.is_empty());
    let balance = state
        .store
        .adjust_points(&target.id, body.points, reason, &auth.user_id)
        .await?;
    info!(
        user_id = %target.id,
        by = %auth.user_id,
        delta = body.points,
        balance,
        "points adjusted"
    );
    Ok(Json(api::PointsBalanceDto {
        user_id: target.id,
        points: balance,
    }))
}

pub(super) async fn api_points_history(
    State(state): State<AppState>,
    Path(p): Path<FamilyItemPath>,
    ApiQuery(q): ApiQuery<api::PageQuery>,
) -> Result<Json<Vec<api::PointsEntryDto>>, AppError> {
    let page = q.page.unwrap_or(1);
    let per_page = q.per_page.unwrap_or(DEFAULT_PER_PAGE);
    if page == 0 {
        return Err(AppError::bad_request("page must be at least 1"));
    }
    if !(1..=MAX_PER_PAGE).contains(&per_page) {
        return Err(AppError::bad_request(format!(
            "per_page must be between 1 and {MAX_PER_PAGE}"
        )));
    }
    let page = u32::try_from(page).map_err(|_| AppError::bad_request("page out of range"))?;
    let target = load_member(&state, &p.family_id, &p.id).await?;
    let rows = state
        .store
        .list_point_transactions(&target.id, page, per_page as u32)
        .await?;
    let items = rows
        .into_iter()
        .map(entry_dto)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(items))
}

pub(super) async fn api_dashboard(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(p): Path<FamilyPath>,
) -> Result<Json<api::DashboardDto>, AppError> {
    match auth.role {
        Role::Parent => {
            let counts = state
                .store
                .count_chores_by_status(&p.family_id)
                .await?;
            Ok(Json(api::DashboardDto::Parent {
                pending: counts.pending,
                awaiting_approval: counts.completed,
                members: members(&state, &p.family_id).await?,
            }))
        }
        Role::Child => {
            let me = load_member(&state, &p.family_id, &auth.user_id).await?;
            let open = state
                .store
                .list_chores(
                    &p.family_id,
                    ChoreFilter {
                        assigned_to_id: Some(auth.user_id.clone()),
                        statuses: vec![ChoreStatus::Pending, ChoreStatus::Completed],
                        ..Default::default()
                    },
                )
                .await?;
            Ok(Json(api::DashboardDto::Child {
                points: me.points,
                open_chores: open
                    .into_iter()
                    .map(chore_dto)
                    .collect::<Result<Vec<_>, _>>()?,
            }))
        }
    }
}
