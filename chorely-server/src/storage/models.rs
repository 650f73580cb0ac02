use crate::storage::schema::{
    chore_assignments, chore_completion_logs, chore_templates, families, point_transactions,
    rewards, sessions, users,
};
use chrono::NaiveDateTime;
use diesel::prelude::*;

#[derive(Debug, Clone, Queryable, Identifiable, Selectable)]
#[diesel(table_name = families)]
pub struct Family {
    pub id: String,
    pub name: String,
    pub created_by: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = families)]
pub struct NewFamily<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub created_by: &'a str,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = users)]
#[diesel(belongs_to(Family, foreign_key = family_id))]
pub struct User {
    pub id: String,
    pub name: String,
    pub email: String,
    pub password_hash: String,
    pub role: String,
    pub family_id: String,
    pub points: i32,
    pub avatar: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = users)]
pub struct NewUser<'a> {
    pub id: &'a str,
    pub name: &'a str,
    pub email: &'a str,
    pub password_hash: &'a str,
    pub role: &'a str,
    pub family_id: &'a str,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = chore_templates)]
#[diesel(belongs_to(Family, foreign_key = family_id))]
pub struct ChoreTemplate {
    pub id: String,
    pub family_id: String,
    pub title: String,
    pub description: Option<String>,
    pub base_points: i32,
    pub frequency: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = chore_templates)]
pub struct NewChoreTemplate<'a> {
    pub id: &'a str,
    pub family_id: &'a str,
    pub title: &'a str,
    pub description: Option<&'a str>,
    pub base_points: i32,
    pub frequency: &'a str,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = chore_assignments)]
#[diesel(belongs_to(ChoreTemplate, foreign_key = template_id))]
#[diesel(belongs_to(User, foreign_key = assigned_to_id))]
pub struct ChoreAssignment {
    pub id: String,
    pub template_id: String,
    pub assigned_to_id: String,
    pub due_date: Option<NaiveDateTime>,
    pub status: String,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = chore_assignments)]
pub struct NewChoreAssignment<'a> {
    pub id: &'a str,
    pub template_id: &'a str,
    pub assigned_to_id: &'a str,
    pub due_date: Option<NaiveDateTime>,
    pub status: &'a str,
    pub created_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = chore_completion_logs)]
#[diesel(belongs_to(ChoreAssignment, foreign_key = assignment_id))]
pub struct ChoreCompletionLog {
    pub id: i32,
    pub assignment_id: String,
    pub submitted_by_id: String,
    pub submitted_at: NaiveDateTime,
    pub approved_by_id: Option<String>,
    pub approved_at: Option<NaiveDateTime>,
}

#[derive(Insertable)]
#[diesel(table_name = chore_completion_logs)]
pub struct NewChoreCompletionLog<'a> {
    pub assignment_id: &'a str,
    pub submitted_by_id: &'a str,
    pub submitted_at: NaiveDateTime,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = rewards)]
#[diesel(belongs_to(Family, foreign_key = family_id))]
pub struct Reward {
    pub id: String,
    pub family_id: String,
    pub title: String,
    pub points_required: i32,
    pub redeemed_count: i32,
    pub is_active: bool,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = rewards)]
pub struct NewReward<'a> {
    pub id: &'a str,
    pub family_id: &'a str,
    pub title: &'a str,
    pub points_required: i32,
}

#[derive(Debug, Clone, Queryable, Identifiable, Associations, Selectable)]
#[diesel(table_name = point_transactions)]
#[diesel(belongs_to(User, foreign_key = user_id))]
pub struct PointTransaction {
    pub id: i32,
    pub user_id: String,
    pub delta: i32,
    pub balance_after: i32,
    pub reason: String,
    pub reference_id: Option<String>,
    pub note: Option<String>,
    pub created_by_id: Option<String>,
    pub created_at: NaiveDateTime,
}

#[derive(Insertable)]
#[diesel(table_name = point_transactions)]
pub struct NewPointTransaction<'a> {
    pub user_id: &'a str,
    pub delta: i32,
    pub balance_after: i32,
    pub reason: &'a str,
    pub reference_id: Option<&'a str>,
    pub note: Option<&'a str>,
    pub created_by_id: Option<&'a str>,
}

#[derive(Insertable)]
#[diesel(table_name = sessions)]
pub struct NewSession<'a> {
    pub jti: &'a str,
    pub user_id: &'a str,
}

/// A chore assignment joined with its template and assignee.
pub type ChoreRow = (ChoreAssignment, ChoreTemplate, User);
