use serde::{Deserialize, Serialize};

use crate::auth::Role;
use crate::domain::{ChoreStatus, Frequency, PointsReason};

pub mod endpoints;
#[cfg(feature = "rest-client")]
pub mod rest;

pub const API_V1_PREFIX: &str = "/api/v1";

/// Path prefix of every route that operates on one family's data.
pub fn family_scope(family_id: &str) -> String {
    format!("{}/family/{}", API_V1_PREFIX, family_id)
}

// Auth
#[derive(Debug, Serialize, Deserialize)]
pub struct AuthReq {
    pub email: String,
    pub password: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AuthResp {
    pub token: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterReq {
    pub email: String,
    pub password: String,
    pub name: String,
    pub role: Role,
    #[serde(default)]
    pub family_name: Option<String>,
    #[serde(default)]
    pub invite_code: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisteredUserDto {
    pub id: String,
    pub email: String,
    pub name: String,
    pub role: Role,
    pub family_id: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RegisterResp {
    pub user: RegisteredUserDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct FamilyDto {
    pub id: String,
    pub name: String,
    pub created_by: String,
    /// Children join a family by entering this code at registration.
    pub invite_code: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct MeDto {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub points: i32,
    pub avatar: Option<String>,
    pub family: FamilyDto,
}

// Family members / points
#[derive(Debug, Serialize, Deserialize)]
pub struct MemberDto {
    pub id: String,
    pub name: String,
    pub role: Role,
    pub avatar: Option<String>,
    pub points: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PointsAdjustReq {
    /// Signed delta applied to the balance.
    pub points: i32,
    #[serde(default)]
    pub reason: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PointsBalanceDto {
    pub user_id: String,
    pub points: i32,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct PointsEntryDto {
    pub id: i32,
    pub delta: i32,
    pub balance_after: i32,
    pub reason: PointsReason,
    pub reference_id: Option<String>,
    pub note: Option<String>,
    pub created_by_id: Option<String>,
    pub time: String, // RFC3339 UTC
}

#[derive(Debug, Default, Serialize, Deserialize)]
pub struct PageQuery {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

// Chores
#[derive(Debug, Serialize, Deserialize)]
pub struct ChoreTemplateDto {
    pub id: String,
    pub family_id: String,
    pub title: String,
    pub description: Option<String>,
    pub base_points: i32,
    pub frequency: Frequency,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct AssigneeDto {
    pub id: String,
    pub name: String,
    pub avatar: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChoreDto {
    pub id: String,
    pub template_id: String,
    pub assigned_to_id: String,
    pub due_date: Option<String>, // RFC3339 UTC
    pub status: ChoreStatus,
    pub created_at: String,
    pub template: ChoreTemplateDto,
    pub assigned_to: AssigneeDto,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct CompletionLogDto {
    pub id: i32,
    pub submitted_by_id: String,
    pub submitted_at: String,
    pub approved_by_id: Option<String>,
    pub approved_at: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ChoreDetailDto {
    #[serde(flatten)]
    pub chore: ChoreDto,
    pub completions: Vec<CompletionLogDto>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateChoreReq {
    pub title: String,
    #[serde(default)]
    pub description: Option<String>,
    pub base_points: i32,
    pub assigned_to_id: String,
    #[serde(default)]
    pub due_date: Option<String>,
    #[serde(default)]
    pub frequency: Option<Frequency>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateChoreReq {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub base_points: Option<i32>,
    #[serde(default)]
    pub frequency: Option<Frequency>,
    #[serde(default)]
    pub assigned_to_id: Option<String>,
    /// An empty string clears the due date.
    #[serde(default)]
    pub due_date: Option<String>,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ChoreListQuery {
    pub status: Option<ChoreStatus>,
    pub assigned_to_id: Option<String>,
    /// Inclusive lower bound on the due date.
    pub from: Option<String>,
    /// Exclusive upper bound on the due date.
    pub to: Option<String>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct ApproveResp {
    pub chore: ChoreDto,
    pub points_awarded: i32,
    pub balance: i32,
}

// Rewards
#[derive(Debug, Serialize, Deserialize)]
pub struct RewardDto {
    pub id: String,
    pub family_id: String,
    pub title: String,
    pub points_required: i32,
    pub redeemed_count: i32,
    pub is_active: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateRewardReq {
    pub title: String,
    pub points_required: i32,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct UpdateRewardReq {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub points_required: Option<i32>,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct RedeemResp {
    pub reward: RewardDto,
    pub points_spent: i32,
    pub balance: i32,
}

// Dashboard
#[derive(Debug, Serialize, Deserialize)]
#[serde(tag = "role", rename_all = "lowercase")]
pub enum DashboardDto {
    Parent {
        /// Assigned and not yet done.
        pending: i64,
        /// Done and waiting for approval.
        awaiting_approval: i64,
        members: Vec<MemberDto>,
    },
    Child {
        points: i32,
        open_chores: Vec<ChoreDto>,
    },
}

#[derive(Debug, Serialize, Deserialize)]
pub struct VersionInfoDto {
    pub version: String,
}
