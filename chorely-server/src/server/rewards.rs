use axum::Json;
use axum::extract::{Extension, Path, State};
use axum::http::StatusCode;
use chorely_shared::api;
use tracing::info;

use super::auth::AuthCtx;
use super::validate::ValidJson;
use super::{AppError, AppState, FamilyItemPath, FamilyPath};
use crate::storage::RewardUpdate;
use crate::storage::models::Reward;

fn reward_dto(r: Reward) -> api::RewardDto {
    api::RewardDto {
        id: r.id,
        family_id: r.family_id,
        title: r.title,
        points_required: r.points_required,
        redeemed_count: r.redeemed_count,
        is_active: r.is_active,
    }
}

async fn ensure_family_reward(
    state: &AppState,
    family_id: &str,
    reward_id: &str,
) -> Result<(), AppError> {
    let reward = state
        .store
        .get_reward(reward_id)
        .await?
        .ok_or_else(|| AppError::not_found("Reward not found"))?;
    if reward.family_id != family_id {
        return Err(AppError::forbidden());
    }
    Ok(())
}

pub(super) async fn api_list_rewards(
    State(state): State<AppState>,
    Path(p): Path<FamilyPath>,
) -> Result<Json<Vec<api::RewardDto>>, AppError> {
    let rows = state.store.list_active_rewards(&p.family_id).await?;
    Ok(Json(rows.into_iter().map(reward_dto).collect()))
}

pub(super) async fn api_create_reward(
    State(state): State<AppState>,
    Path(p): Path<FamilyPath>,
    ValidJson(body): ValidJson<api::CreateRewardReq>,
) -> Result<Json<api::RewardDto>, AppError> {
    let reward = state
        .store
        .create_reward(&p.family_id, body.title.trim(), body.points_required)
        .await?;
    Ok(Json(reward_dto(reward)))
}

pub(super) async fn api_update_reward(
    State(state): State<AppState>,
    Path(p): Path<FamilyItemPath>,
    ValidJson(body): ValidJson<api::UpdateRewardReq>,
) -> Result<Json<api::RewardDto>, AppError> {
    ensure_family_reward(&state, &p.family_id, &p.id).await?;
    let reward = state
        .store
        .update_reward(
            &p.id,
            RewardUpdate {
                title: body.title.map(|t| t.trim().to_string()),
                points_required: body.points_required,
            },
        )
        .await?;
    Ok(Json(reward_dto(reward)))
}

/// Deactivates the reward; redemption history keeps referring to it.
pub(super) async fn api_delete_reward(
    State(state): State<AppState>,
    Path(p): Path<FamilyItemPath>,
) -> Result<StatusCode, AppError> {
    ensure_family_reward(&state, &p.family_id, &p.id).await?;
    if !state.store.deactivate_reward(&p.id).await? {
        return Err(AppError::not_found("Reward not found"));
    }
    Ok(StatusCode::NO_CONTENT)
}

pub(super) async fn api_redeem_reward(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
    Path(p): Path<FamilyItemPath>,
) -> Result<Json<api::RedeemResp>, AppError> {
    let outcome = state
        .store
        .redeem_reward(&p.family_id, &p.id, &auth.user_id)
        .await?;
    info!(
        reward_id = %p.id,
        user_id = %auth.user_id,
        spent = outcome.points_spent,
        balance = outcome.balance,
        "reward redeemed"
    );
    Ok(Json(api::RedeemResp {
        reward: reward_dto(outcome.reward),
        points_spent: outcome.points_spent,
        balance: outcome.balance,
    }))
}
