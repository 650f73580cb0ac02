//! Minimal REST client helpers for consumers (clients).

use super::endpoints as ep;
use super::*;
use once_cell::sync::Lazy;
use serde::de::DeserializeOwned;
use std::time::Duration;

pub use reqwest::StatusCode;

#[derive(Debug, thiserror::Error)]
pub enum RestError {
    #[error("http: {0}")]
    Http(String),
    #[error("status {status}: {body}")]
    Status { status: u16, body: String },
    #[error("serde: {0}")]
    Serde(String),
}

static HTTP_CLIENT: Lazy<reqwest::Client> = Lazy::new(|| {
    reqwest::Client::builder()
        .pool_max_idle_per_host(4)
        .timeout(Duration::from_secs(30))
        .build()
        .expect("failed to build HTTP client")
});

async fn handle_json<T: DeserializeOwned>(res: reqwest::Response) -> Result<T, RestError> {
    let status = res.status();
    if !status.is_success() {
        let body = res.text().await.unwrap_or_default();
        return Err(RestError::Status {
            status: status.as_u16(),
            body,
        });
    }
    res.json::<T>()
        .await
        .map_err(|e| RestError::Serde(e.to_string()))
}

async fn handle_empty(res: reqwest::Response) -> Result<(), RestError> {
    if res.status().is_success() {
        Ok(())
    } else {
        let status = res.status().as_u16();
        let body = res.text().await.unwrap_or_default();
        Err(RestError::Status { status, body })
    }
}

async fn send(req: reqwest::RequestBuilder) -> Result<reqwest::Response, RestError> {
    req.send().await.map_err(|e| RestError::Http(e.to_string()))
}

pub async fn server_version(base: &str) -> Result<VersionInfoDto, RestError> {
    let res = send(HTTP_CLIENT.get(ep::version(base))).await?;
    handle_json(res).await
}

pub async fn register(base: &str, req: &RegisterReq) -> Result<RegisterResp, RestError> {
    let res = send(HTTP_CLIENT.post(ep::auth_register(base)).json(req)).await?;
    handle_json(res).await
}

pub async fn login(base: &str, req: &AuthReq) -> Result<AuthResp, RestError> {
    let res = send(HTTP_CLIENT.post(ep::auth_login(base)).json(req)).await?;
    handle_json(res).await
}

pub async fn logout(base: &str, bearer: &str) -> Result<(), RestError> {
    let res = send(HTTP_CLIENT.post(ep::auth_logout(base)).bearer_auth(bearer)).await?;
    handle_empty(res).await
}

pub async fn renew_token(base: &str, bearer: &str) -> Result<AuthResp, RestError> {
    let res = send(HTTP_CLIENT.post(ep::auth_renew(base)).bearer_auth(bearer)).await?;
    handle_json(res).await
}

pub async fn me(base: &str, bearer: &str) -> Result<MeDto, RestError> {
    let res = send(HTTP_CLIENT.get(ep::auth_me(base)).bearer_auth(bearer)).await?;
    handle_json(res).await
}

pub async fn list_chores(
    base: &str,
    family_id: &str,
    bearer: &str,
    query: &ChoreListQuery,
) -> Result<Vec<ChoreDto>, RestError> {
    let mut pairs = Vec::new();
    if let Some(status) = query.status {
        pairs.push(("status", status.as_str().to_string()));
    }
    if let Some(id) = &query.assigned_to_id {
        pairs.push(("assigned_to_id", id.clone()));
    }
    if let Some(from) = &query.from {
        pairs.push(("from", from.clone()));
    }
    if let Some(to) = &query.to {
        pairs.push(("to", to.clone()));
    }
    let url = ep::with_query(&ep::chores(base, family_id), &pairs);
    let req = HTTP_CLIENT.get(url).bearer_auth(bearer);
    handle_json(send(req).await?).await
}

pub async fn get_chore(
    base: &str,
    family_id: &str,
    chore_id: &str,
    bearer: &str,
) -> Result<ChoreDetailDto, RestError> {
    let req = HTTP_CLIENT
        .get(ep::chore(base, family_id, chore_id))
        .bearer_auth(bearer);
    handle_json(send(req).await?).await
}

pub async fn create_chore(
    base: &str,
    family_id: &str,
    bearer: &str,
    body: &CreateChoreReq,
) -> Result<ChoreDto, RestError> {
    let req = HTTP_CLIENT
        .post(ep::chores(base, family_id))
        .bearer_auth(bearer)
        .json(body);
    handle_json(send(req).await?).await
}

pub async fn update_chore(
    base: &str,
    family_id: &str,
    chore_id: &str,
    bearer: &str,
    body: &UpdateChoreReq,
) -> Result<ChoreDto, RestError> {
    let req = HTTP_CLIENT
        .put(ep::chore(base, family_id, chore_id))
        .bearer_auth(bearer)
        .json(body);
    handle_json(send(req).await?).await
}

pub async fn delete_chore(
    base: &str,
    family_id: &str,
    chore_id: &str,
    bearer: &str,
) -> Result<(), RestError> {
    let req = HTTP_CLIENT
        .delete(ep::chore(base, family_id, chore_id))
        .bearer_auth(bearer);
    handle_empty(send(req).await?).await
}

pub async fn complete_chore(
    base: &str,
    family_id: &str,
    chore_id: &str,
    bearer: &str,
) -> Result<ChoreDto, RestError> {
    let req = HTTP_CLIENT
        .post(ep::chore_complete(base, family_id, chore_id))
        .bearer_auth(bearer);
    handle_json(send(req).await?).await
}

pub async fn approve_chore(
    base: &str,
    family_id: &str,
    chore_id: &str,
    bearer: &str,
) -> Result<ApproveResp, RestError> {
    let req = HTTP_CLIENT
        .post(ep::chore_approve(base, family_id, chore_id))
        .bearer_auth(bearer);
    handle_json(send(req).await?).await
}

pub async fn list_rewards(
    base: &str,
    family_id: &str,
    bearer: &str,
) -> Result<Vec<RewardDto>, RestError> {
    let req = HTTP_CLIENT
        .get(ep::rewards(base, family_id))
        .bearer_auth(bearer);
    handle_json(send(req).await?).await
}

pub async fn create_reward(
    base: &str,
    family_id: &str,
    bearer: &str,
    body: &CreateRewardReq,
) -> Result<RewardDto, RestError> {
    let req = HTTP_CLIENT
        .post(ep::rewards(base, family_id))
        .bearer_auth(bearer)
        .json(body);
    handle_json(send(req).await?).await
}

pub async fn update_reward(
    base: &str,
    family_id: &str,
    reward_id: &str,
    bearer: &str,
    body: &UpdateRewardReq,
) -> Result<RewardDto, RestError> {
    let req = HTTP_CLIENT
        .put(ep::reward(base, family_id, reward_id))
        .bearer_auth(bearer)
        .json(body);
    handle_json(send(req).await?).await
}

pub async fn delete_reward(
    base: &str,
    family_id: &str,
    reward_id: &str,
    bearer: &str,
) -> Result<(), RestError> {
    let req = HTTP_CLIENT
        .delete(ep::reward(base, family_id, reward_id))
        .bearer_auth(bearer);
    handle_empty(send(req).await?).await
}

pub async fn redeem_reward(
    base: &str,
    family_id: &str,
    reward_id: &str,
    bearer: &str,
) -> Result<RedeemResp, RestError> {
    let req = HTTP_CLIENT
        .post(ep::reward_redeem(base, family_id, reward_id))
        .bearer_auth(bearer);
    handle_json(send(req).await?).await
}

pub async fn list_members(
    base: &str,
    family_id: &str,
    bearer: &str,
) -> Result<Vec<MemberDto>, RestError> {
    let req = HTTP_CLIENT
        .get(ep::members(base, family_id))
        .bearer_auth(bearer);
    handle_json(send(req).await?).await
}

pub async fn adjust_points(
    base: &str,
    family_id: &str,
    user_id: &str,
    bearer: &str,
    body: &PointsAdjustReq,
) -> Result<PointsBalanceDto, RestError> {
    let req = HTTP_CLIENT
        .post(ep::member_points(base, family_id, user_id))
        .bearer_auth(bearer)
        .json(body);
    handle_json(send(req).await?).await
}

pub async fn points_history(
    base: &str,
    family_id: &str,
    user_id: &str,
    bearer: &str,
    page: &PageQuery,
) -> Result<Vec<PointsEntryDto>, RestError> {
    let mut pairs = Vec::new();
    if let Some(p) = page.page {
        pairs.push(("page", p.to_string()));
    }
    if let Some(pp) = page.per_page {
        pairs.push(("per_page", pp.to_string()));
    }
    let url = ep::with_query(&ep::member_points(base, family_id, user_id), &pairs);
    let req = HTTP_CLIENT.get(url).bearer_auth(bearer);
    handle_json(send(req).await?).await
}

pub async fn dashboard(
    base: &str,
    family_id: &str,
    bearer: &str,
) -> Result<DashboardDto, RestError> {
    let req = HTTP_CLIENT
        .get(ep::dashboard(base, family_id))
        .bearer_auth(bearer);
    handle_json(send(req).await?).await
}
