use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use chorely_shared::api;
use chorely_shared::domain::{ChoreStatus, Frequency, parse_due_date, to_rfc3339};
use tracing::{info, warn};

use super::auth::AuthCtx;
use super::validate::{ApiQuery, ValidJson};
use super::{AppError, AppState, FamilyItemPath, FamilyPath};
use crate::storage::models::{ChoreCompletionLog, ChoreRow};
use crate::storage::{ChoreFilter, ChoreUpdate, NewChore};

pub(super) fn chore_dto((assignment, template, user): ChoreRow) -> Result<api::ChoreDto, AppError> {
    let status = assignment
        .status
        .parse::<ChoreStatus>()
        .map_err(AppError::internal)?;
    let frequency = template
        .frequency
        .parse::<Frequency>()
        .map_err(AppError::internal)?;
    Ok(api::ChoreDto {
        id: assignment.id,
        template_id: assignment.template_id,
        assigned_to_id: assignment.assigned_to_id,
        due_date: assignment.due_date.map(to_rfc3339),
        status,
        created_at: to_rfc3339(assignment.created_at),
        template: api::ChoreTemplateDto {
            id: template.id,
            family_id: template.family_id,
            title: template.title,
            description: template.description,
            base_points: template.base_points,
            frequency,
        },
        assigned_to: api::AssigneeDto {
            id: user.id,
            name: user.name,
            avatar: user.avatar,
        },
    })
}

fn completion_dto(log: ChoreCompletionLog) -> api::CompletionLogDto {
    api::CompletionLogDto {
        id: log.id,
        submitted_by_id: log.submitted_by_id,
        submitted_at: to_rfc3339(log.submitted_at),
        approved_by_id: log.approved_by_id,
        approved_at: log.approved_at.map(to_rfc3339),
    }
}

fn parse_bound(field: &str, value: Option<&str>) -> Result<Option<chrono::NaiveDateTime>, AppError> {
    value
        .map(|v| parse_due_date(v).map_err(|e| AppError::bad_request(format!("{field}: {e}"))))
        .transpose()
}

/// Loads a chore of the given family; 404 if missing, 403 if it belongs elsewhere.
async fn load_family_chore(
    state: &AppState,
    family_id: &str,
    chore_id: &str,
) -> Result<ChoreRow, AppError> {
    let row = state
        .store
        .get_chore(chore_id)
        .await?
        .ok_or_else(|| AppError::not_found("Chore not found"))?;
    if row.1.family_id != family_id {
        warn!(chore_id, family_id, "chore belongs to another family");
        return Err(AppError::forbidden());
    }
    Ok(row)
}

pub(super) async fn api_list_chores(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(p): Path<FamilyPath>,
    ApiQuery(q): ApiQuery<api::ChoreListQuery>,
) -> Result<Json<Vec<api::ChoreDto>>, AppError> {
    let assigned_to_id = if auth.is_parent() {
        q.assigned_to_id
    } else {
        // Children only ever see their own chores
        Some(auth.user_id.clone())
    };
    let filter = ChoreFilter {
        assigned_to_id,
        statuses: q.status.into_iter().collect(),
        due_from: parse_bound("from", q.from.as_deref())?,
        due_to: parse_bound("to", q.to.as_deref())?,
    };
    let rows = state.store.list_chores(&p.family_id, filter).await?;
    let items = rows
        .into_iter()
        .map(chore_dto)
        .collect::<Result<Vec<_>, _>>()?;
    Ok(Json(items))
}

pub(super) async fn api_create_chore(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(p): Path<FamilyPath>,
    ValidJson(body): ValidJson<api::CreateChoreReq>,
) -> Result<Json<api::ChoreDto>, AppError> {
    let due_date = parse_bound("due_date", body.due_date.as_deref())?;
    let row = state
        .store
        .create_chore(NewChore {
            family_id: p.family_id,
            title: body.title.trim().to_string(),
            description: body.description,
            base_points: body.base_points,
            frequency: body.frequency.unwrap_or_default(),
            assigned_to_id: body.assigned_to_id,
            due_date,
        })
        .await?;
    info!(chore_id = %row.0.id, by = %auth.user_id, "chore assigned");
    Ok(Json(chore_dto(row)?))
}

pub(super) async fn api_get_chore(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(p): Path<FamilyItemPath>,
) -> Result<Json<api::ChoreDetailDto>, AppError> {
    let row = load_family_chore(&state, &p.family_id, &p.id).await?;
    if !auth.is_parent() && row.0.assigned_to_id != auth.user_id {
        return Err(AppError::forbidden());
    }
    let completions = state
        .store
        .list_completion_logs(&p.id)
        .await?
        .into_iter()
        .map(completion_dto)
        .collect();
    Ok(Json(api::ChoreDetailDto {
        chore: chore_dto(row)?,
        completions,
    }))
}

pub(super) async fn api_update_chore(
    State(state): State<AppState>,
    Path(p): Path<FamilyItemPath>,
    ValidJson(body): ValidJson<api::UpdateChoreReq>,
) -> Result<Json<api::ChoreDto>, AppError> {
    load_family_chore(&state, &p.family_id, &p.id).await?;
    let due_date = match body.due_date.as_deref() {
        None => None,
        Some("") => Some(None),
        Some(v) => Some(parse_bound("due_date", Some(v))?),
    };
    let update = ChoreUpdate {
        title: body.title.map(|t| t.trim().to_string()),
        description: body.description,
        base_points: body.base_points,
        frequency: body.frequency,
        assigned_to_id: body.assigned_to_id,
        due_date,
    };
    let row = state.store.update_chore(&p.id, update).await?;
    Ok(Json(chore_dto(row)?))
}

pub(super) async fn api_delete_chore(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(p): Path<FamilyItemPath>,
) -> Result<StatusCode, AppError> {
    load_family_chore(&state, &p.family_id, &p.id).await?;
    if !state.store.delete_chore(&p.id).await? {
        return Err(AppError::not_found("Chore not found"));
    }
    info!(chore_id = %p.id, by = %auth.user_id, "chore deleted");
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn api_complete_chore(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(p): Path<FamilyItemPath>,
) -> Result<Json<api::ChoreDto>, AppError> {
    let row = load_family_chore(&state, &p.family_id, &p.id).await?;
    if row.0.assigned_to_id != auth.user_id {
        warn!(chore_id = %p.id, user_id = %auth.user_id, "complete: not the assignee");
        return Err(AppError::forbidden());
    }
    let row = state.store.complete_chore(&p.id, &auth.user_id).await?;
    Ok(Json(chore_dto(row)?))
}

pub(super) async fn api_approve_chore(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(p): Path<FamilyItemPath>,
) -> Result<Json<api::ApproveResp>, AppError> {
    load_family_chore(&state, &p.family_id, &p.id).await?;
    let outcome = state.store.approve_chore(&p.id, &auth.user_id).await?;
    info!(
        chore_id = %p.id,
        by = %auth.user_id,
        points = outcome.points_awarded,
        "chore approved"
    );
    Ok(Json(api::ApproveResp {
        chore: chore_dto(outcome.chore)?,
        points_awarded: outcome.points_awarded,
        balance: outcome.balance,
    }))
}
