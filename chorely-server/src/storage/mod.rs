pub mod models;
pub mod schema;

use chorely_shared::auth::Role;
use chorely_shared::domain::{ChoreStatus, Frequency, PointsReason};
use chrono::{NaiveDateTime, Utc};
use diesel::prelude::*;
use diesel::r2d2::{ConnectionManager, Pool};
use diesel_migrations::{EmbeddedMigrations, MigrationHarness, embed_migrations};
use models::{
    ChoreAssignment, ChoreCompletionLog, ChoreRow, ChoreTemplate, Family, NewChoreAssignment,
    NewChoreCompletionLog, NewChoreTemplate, NewFamily, NewPointTransaction, NewReward,
    NewSession, NewUser, PointTransaction, Reward, User,
};
use tracing::{debug, trace};

/// Largest balance a user can hold; `users.points` is read back as `i32`.
pub const MAX_BALANCE: i32 = i32::MAX;

/// Structured error type for all storage operations.
#[derive(Debug, thiserror::Error)]
pub enum StorageError {
    /// A Diesel ORM error (query failure, constraint violation, etc.)
    #[error("database error: {0}")]
    Database(#[from] diesel::result::Error),

    /// Failed to acquire or build a connection from the pool.
    #[error("pool error: {0}")]
    Pool(#[from] diesel::r2d2::PoolError),

    /// A `spawn_blocking` task panicked or was cancelled.
    #[error("task error: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// A database migration failed to apply.
    #[error("migration error: {0}")]
    Migration(String),

    /// The caller supplied invalid input.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The referenced row does not exist.
    #[error("{0} not found")]
    NotFound(&'static str),

    /// The row exists but is not in a state that allows the operation.
    #[error("conflict: {0}")]
    Conflict(String),

    /// The user's balance does not cover the cost.
    #[error("not enough points")]
    InsufficientPoints,
}

/// How a newly registered user joins a family.
#[derive(Debug, Clone)]
pub enum FamilyMembership {
    /// Create a new family owned by the new user.
    Create { name: String },
    /// Join the family whose id equals the invite code.
    Join { invite_code: String },
}

#[derive(Debug, Clone)]
pub struct NewAccount {
    pub email: String,
    pub name: String,
    pub password_hash: String,
    pub role: Role,
    pub membership: FamilyMembership,
}

#[derive(Debug, Clone)]
pub struct NewChore {
    pub family_id: String,
    pub title: String,
    pub description: Option<String>,
    pub base_points: i32,
    pub frequency: Frequency,
    pub assigned_to_id: String,
    pub due_date: Option<NaiveDateTime>,
}

/// Partial chore update. `due_date: Some(None)` clears the date.
#[derive(Debug, Clone, Default)]
pub struct ChoreUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub base_points: Option<i32>,
    pub frequency: Option<Frequency>,
    pub assigned_to_id: Option<String>,
    pub due_date: Option<Option<NaiveDateTime>>,
}

#[derive(Debug, Clone, Default)]
pub struct ChoreFilter {
    pub assigned_to_id: Option<String>,
    pub statuses: Vec<ChoreStatus>,
    pub due_from: Option<NaiveDateTime>,
    pub due_to: Option<NaiveDateTime>,
}

#[derive(Debug, Clone, Default)]
pub struct RewardUpdate {
    pub title: Option<String>,
    pub points_required: Option<i32>,
}

#[derive(Debug, Clone)]
pub struct ApproveOutcome {
    pub chore: ChoreRow,
    pub points_awarded: i32,
    pub balance: i32,
}

#[derive(Debug, Clone)]
pub struct RedeemOutcome {
    pub reward: Reward,
    pub points_spent: i32,
    pub balance: i32,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ChoreCounts {
    pub pending: i64,
    pub completed: i64,
    pub approved: i64,
}

#[derive(Clone)]
pub struct Store {
    pool: Pool<ConnectionManager<SqliteConnection>>,
}

impl Store {
    pub async fn connect_sqlite(path: &str) -> Result<Self, StorageError> {
        let url = path.to_string();
        let manager = ConnectionManager::<SqliteConnection>::new(url);
        let pool = Pool::builder().max_size(8).build(manager)?;

        // Run pending migrations on startup (auto-init empty DBs)
        {
            let pool_clone = pool.clone();
            tokio::task::spawn_blocking(move || -> Result<(), StorageError> {
                const MIGRATIONS: EmbeddedMigrations = embed_migrations!();
                let mut conn = pool_clone.get()?;
                configure_sqlite_conn(&mut conn)?;
                conn.run_pending_migrations(MIGRATIONS)
                    .map_err(|e| StorageError::Migration(e.to_string()))?;
                Ok(())
            })
            .await??;
        }

        Ok(Store { pool })
    }

    /// Runs `f` on a pooled connection inside `spawn_blocking`.
    async fn with_conn<T, F>(&self, f: F) -> Result<T, StorageError>
    where
        T: Send + 'static,
        F: FnOnce(&mut SqliteConnection) -> Result<T, StorageError> + Send + 'static,
    {
        let pool = self.pool.clone();
        tokio::task::spawn_blocking(move || -> Result<T, StorageError> {
            let mut conn = pool.get()?;
            configure_sqlite_conn(&mut conn)?;
            f(&mut conn)
        })
        .await?
    }

    // ----- users & families -----

    /// Creates the user and, for [`FamilyMembership::Create`], the family in one transaction.
    pub async fn register_user(&self, account: NewAccount) -> Result<User, StorageError> {
        use schema::{families, users};
        trace!(email = %account.email, role = %account.role, "register_user starting");
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<User, StorageError> {
                let taken: i64 = users::table
                    .filter(users::email.eq(&account.email))
                    .count()
                    .get_result(conn)?;
                if taken > 0 {
                    return Err(StorageError::Conflict("User already exists".into()));
                }

                let user_id = uuid::Uuid::new_v4().to_string();
                let family_id = match &account.membership {
                    FamilyMembership::Create { name } => {
                        let family_id = uuid::Uuid::new_v4().to_string();
                        diesel::insert_into(families::table)
                            .values(&NewFamily {
                                id: &family_id,
                                name,
                                created_by: &user_id,
                            })
                            .execute(conn)?;
                        family_id
                    }
                    FamilyMembership::Join { invite_code } => families::table
                        .find(invite_code)
                        .select(families::id)
                        .first::<String>(conn)
                        .optional()?
                        .ok_or_else(|| StorageError::InvalidInput("Invalid Invite Code".into()))?,
                };

                diesel::insert_into(users::table)
                    .values(&NewUser {
                        id: &user_id,
                        name: &account.name,
                        email: &account.email,
                        password_hash: &account.password_hash,
                        role: account.role.as_str(),
                        family_id: &family_id,
                    })
                    .execute(conn)?;

                Ok(users::table
                    .find(&user_id)
                    .select(User::as_select())
                    .first(conn)?)
            })
        })
        .await
    }

    pub async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StorageError> {
        use schema::users;
        let email = email.to_string();
        self.with_conn(move |conn| {
            Ok(users::table
                .filter(users::email.eq(&email))
                .select(User::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    pub async fn get_user(&self, user_id: &str) -> Result<Option<User>, StorageError> {
        use schema::users;
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            Ok(users::table
                .find(&user_id)
                .select(User::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    pub async fn get_family(&self, family_id: &str) -> Result<Option<Family>, StorageError> {
        use schema::families;
        let family_id = family_id.to_string();
        self.with_conn(move |conn| {
            Ok(families::table
                .find(&family_id)
                .select(Family::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    /// Members of a family, parents first, then by name.
    pub async fn list_family_members(&self, family_id: &str) -> Result<Vec<User>, StorageError> {
        use schema::users;
        let family_id = family_id.to_string();
        self.with_conn(move |conn| {
            Ok(users::table
                .filter(users::family_id.eq(&family_id))
                .order((users::role.desc(), users::name.asc()))
                .select(User::as_select())
                .load(conn)?)
        })
        .await
    }

    // ----- chores -----

    pub async fn create_chore(&self, new: NewChore) -> Result<ChoreRow, StorageError> {
        use schema::{chore_assignments, chore_templates};
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<ChoreRow, StorageError> {
                ensure_member(conn, &new.family_id, &new.assigned_to_id)?;

                let template_id = uuid::Uuid::new_v4().to_string();
                diesel::insert_into(chore_templates::table)
                    .values(&NewChoreTemplate {
                        id: &template_id,
                        family_id: &new.family_id,
                        title: &new.title,
                        description: new.description.as_deref(),
                        base_points: new.base_points,
                        frequency: new.frequency.as_str(),
                    })
                    .execute(conn)?;

                let assignment_id = uuid::Uuid::new_v4().to_string();
                diesel::insert_into(chore_assignments::table)
                    .values(&NewChoreAssignment {
                        id: &assignment_id,
                        template_id: &template_id,
                        assigned_to_id: &new.assigned_to_id,
                        due_date: new.due_date,
                        status: ChoreStatus::Pending.as_str(),
                        created_at: Utc::now().naive_utc(),
                    })
                    .execute(conn)?;
                debug!(chore_id = %assignment_id, family_id = %new.family_id, "chore created");

                load_chore(conn, &assignment_id)?.ok_or(StorageError::NotFound("Chore"))
            })
        })
        .await
    }

    pub async fn get_chore(&self, chore_id: &str) -> Result<Option<ChoreRow>, StorageError> {
        let chore_id = chore_id.to_string();
        self.with_conn(move |conn| load_chore(conn, &chore_id))
            .await
    }

    /// Family chores ordered by due date, undated last.
    pub async fn list_chores(
        &self,
        family_id: &str,
        filter: ChoreFilter,
    ) -> Result<Vec<ChoreRow>, StorageError> {
        use schema::{chore_assignments as ca, chore_templates as ct, users};
        let family_id = family_id.to_string();
        self.with_conn(move |conn| {
            let mut query = ca::table
                .inner_join(ct::table)
                .inner_join(users::table)
                .filter(ct::family_id.eq(family_id))
                .select((
                    ChoreAssignment::as_select(),
                    ChoreTemplate::as_select(),
                    User::as_select(),
                ))
                .into_boxed();
            if let Some(assignee) = filter.assigned_to_id {
                query = query.filter(ca::assigned_to_id.eq(assignee));
            }
            if !filter.statuses.is_empty() {
                let statuses: Vec<&'static str> =
                    filter.statuses.iter().map(|s| s.as_str()).collect();
                query = query.filter(ca::status.eq_any(statuses));
            }
            if let Some(from) = filter.due_from {
                query = query.filter(ca::due_date.ge(from));
            }
            if let Some(to) = filter.due_to {
                query = query.filter(ca::due_date.lt(to));
            }
            Ok(query
                .order((
                    ca::due_date.is_null().asc(),
                    ca::due_date.asc(),
                    ca::created_at.asc(),
                ))
                .load::<ChoreRow>(conn)?)
        })
        .await
    }

    pub async fn list_completion_logs(
        &self,
        chore_id: &str,
    ) -> Result<Vec<ChoreCompletionLog>, StorageError> {
        use schema::chore_completion_logs as logs;
        let chore_id = chore_id.to_string();
        self.with_conn(move |conn| {
            Ok(logs::table
                .filter(logs::assignment_id.eq(&chore_id))
                .order(logs::id.asc())
                .select(ChoreCompletionLog::as_select())
                .load(conn)?)
        })
        .await
    }

    pub async fn update_chore(
        &self,
        chore_id: &str,
        update: ChoreUpdate,
    ) -> Result<ChoreRow, StorageError> {
        use schema::{chore_assignments as ca, chore_templates as ct};
        let chore_id = chore_id.to_string();
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<ChoreRow, StorageError> {
                let (assignment, template, _) =
                    load_chore(conn, &chore_id)?.ok_or(StorageError::NotFound("Chore"))?;

                if let Some(assignee) = update.assigned_to_id.as_deref() {
                    ensure_member(conn, &template.family_id, assignee)?;
                    diesel::update(ca::table.find(&assignment.id))
                        .set(ca::assigned_to_id.eq(assignee))
                        .execute(conn)?;
                }
                if let Some(due) = update.due_date {
                    diesel::update(ca::table.find(&assignment.id))
                        .set(ca::due_date.eq(due))
                        .execute(conn)?;
                }
                if let Some(title) = update.title.as_deref() {
                    diesel::update(ct::table.find(&template.id))
                        .set(ct::title.eq(title))
                        .execute(conn)?;
                }
                if let Some(description) = update.description.as_deref() {
                    diesel::update(ct::table.find(&template.id))
                        .set(ct::description.eq(description))
                        .execute(conn)?;
                }
                if let Some(points) = update.base_points {
                    diesel::update(ct::table.find(&template.id))
                        .set(ct::base_points.eq(points))
                        .execute(conn)?;
                }
                if let Some(frequency) = update.frequency {
                    diesel::update(ct::table.find(&template.id))
                        .set(ct::frequency.eq(frequency.as_str()))
                        .execute(conn)?;
                }

                load_chore(conn, &chore_id)?.ok_or(StorageError::NotFound("Chore"))
            })
        })
        .await
    }

    /// Deletes the assignment with its logs, and the template once unreferenced.
    /// Returns `false` when the chore did not exist.
    pub async fn delete_chore(&self, chore_id: &str) -> Result<bool, StorageError> {
        use schema::{chore_assignments as ca, chore_completion_logs as logs, chore_templates as ct};
        let chore_id = chore_id.to_string();
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<bool, StorageError> {
                let Some(template_id) = ca::table
                    .find(&chore_id)
                    .select(ca::template_id)
                    .first::<String>(conn)
                    .optional()?
                else {
                    return Ok(false);
                };
                diesel::delete(logs::table.filter(logs::assignment_id.eq(&chore_id)))
                    .execute(conn)?;
                diesel::delete(ca::table.find(&chore_id)).execute(conn)?;
                let remaining: i64 = ca::table
                    .filter(ca::template_id.eq(&template_id))
                    .count()
                    .get_result(conn)?;
                if remaining == 0 {
                    diesel::delete(ct::table.find(&template_id)).execute(conn)?;
                }
                Ok(true)
            })
        })
        .await
    }

    /// Pending -> Completed plus a completion log row.
    pub async fn complete_chore(
        &self,
        chore_id: &str,
        submitted_by: &str,
    ) -> Result<ChoreRow, StorageError> {
        use schema::{chore_assignments as ca, chore_completion_logs as logs};
        let chore_id = chore_id.to_string();
        let submitted_by = submitted_by.to_string();
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<ChoreRow, StorageError> {
                if !chore_status(conn, &chore_id)?.can_complete() {
                    return Err(StorageError::Conflict("Chore is not pending".into()));
                }
                diesel::update(ca::table.find(&chore_id))
                    .set(ca::status.eq(ChoreStatus::Completed.as_str()))
                    .execute(conn)?;
                diesel::insert_into(logs::table)
                    .values(&NewChoreCompletionLog {
                        assignment_id: &chore_id,
                        submitted_by_id: &submitted_by,
                        submitted_at: Utc::now().naive_utc(),
                    })
                    .execute(conn)?;
                debug!(chore_id = %chore_id, by = %submitted_by, "chore completed");
                load_chore(conn, &chore_id)?.ok_or(StorageError::NotFound("Chore"))
            })
        })
        .await
    }

    /// Completed -> Approved, stamps the latest completion log, credits the
    /// assignee and records a ledger entry.
    pub async fn approve_chore(
        &self,
        chore_id: &str,
        approver: &str,
    ) -> Result<ApproveOutcome, StorageError> {
        use schema::{chore_assignments as ca, chore_completion_logs as logs, users};
        let chore_id = chore_id.to_string();
        let approver = approver.to_string();
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<ApproveOutcome, StorageError> {
                if !chore_status(conn, &chore_id)?.can_approve() {
                    return Err(StorageError::Conflict("Chore is not completed".into()));
                }
                diesel::update(ca::table.find(&chore_id))
                    .set(ca::status.eq(ChoreStatus::Approved.as_str()))
                    .execute(conn)?;

                let now = Utc::now().naive_utc();
                let latest_log: Option<i32> = logs::table
                    .filter(logs::assignment_id.eq(&chore_id))
                    .filter(logs::approved_by_id.is_null())
                    .order(logs::id.desc())
                    .select(logs::id)
                    .first(conn)
                    .optional()?;
                if let Some(log_id) = latest_log {
                    diesel::update(logs::table.find(log_id))
                        .set((
                            logs::approved_by_id.eq(approver.as_str()),
                            logs::approved_at.eq(now),
                        ))
                        .execute(conn)?;
                }

                let (assignment, template, _) =
                    load_chore(conn, &chore_id)?.ok_or(StorageError::NotFound("Chore"))?;
                let points_awarded = template.base_points;
                let balance: i32 = diesel::update(
                    users::table
                        .find(&assignment.assigned_to_id)
                        .filter((users::points + points_awarded).le(MAX_BALANCE)),
                )
                .set(users::points.eq(users::points + points_awarded))
                .returning(users::points)
                .get_result(conn)
                .optional()?
                .ok_or_else(|| StorageError::InvalidInput("Balance limit reached".into()))?;
                record_transaction(
                    conn,
                    &NewPointTransaction {
                        user_id: &assignment.assigned_to_id,
                        delta: points_awarded,
                        balance_after: balance,
                        reason: PointsReason::Approval.as_str(),
                        reference_id: Some(&chore_id),
                        note: Some(&template.title),
                        created_by_id: Some(&approver),
                    },
                )?;
                debug!(
                    chore_id = %chore_id,
                    user_id = %assignment.assigned_to_id,
                    points_awarded,
                    balance,
                    "chore approved"
                );

                let chore = load_chore(conn, &chore_id)?.ok_or(StorageError::NotFound("Chore"))?;
                Ok(ApproveOutcome {
                    chore,
                    points_awarded,
                    balance,
                })
            })
        })
        .await
    }

    /// Number of family chores in each status.
    pub async fn count_chores_by_status(&self, family_id: &str) -> Result<ChoreCounts, StorageError> {
        use schema::{chore_assignments as ca, chore_templates as ct};
        let family_id = family_id.to_string();
        self.with_conn(move |conn| {
            let statuses: Vec<String> = ca::table
                .inner_join(ct::table)
                .filter(ct::family_id.eq(&family_id))
                .select(ca::status)
                .load(conn)?;
            let mut counts = ChoreCounts::default();
            for status in statuses {
                match status.parse::<ChoreStatus>() {
                    Ok(ChoreStatus::Pending) => counts.pending += 1,
                    Ok(ChoreStatus::Completed) => counts.completed += 1,
                    Ok(ChoreStatus::Approved) => counts.approved += 1,
                    Err(e) => debug!(error = %e, "skipping unknown chore status"),
                }
            }
            Ok(counts)
        })
        .await
    }

    // ----- rewards -----

    pub async fn create_reward(
        &self,
        family_id: &str,
        title: &str,
        points_required: i32,
    ) -> Result<Reward, StorageError> {
        use schema::rewards;
        let family_id = family_id.to_string();
        let title = title.to_string();
        self.with_conn(move |conn| {
            let reward_id = uuid::Uuid::new_v4().to_string();
            diesel::insert_into(rewards::table)
                .values(&NewReward {
                    id: &reward_id,
                    family_id: &family_id,
                    title: &title,
                    points_required,
                })
                .execute(conn)?;
            Ok(rewards::table
                .find(&reward_id)
                .select(Reward::as_select())
                .first(conn)?)
        })
        .await
    }

    pub async fn get_reward(&self, reward_id: &str) -> Result<Option<Reward>, StorageError> {
        use schema::rewards;
        let reward_id = reward_id.to_string();
        self.with_conn(move |conn| {
            Ok(rewards::table
                .find(&reward_id)
                .select(Reward::as_select())
                .first(conn)
                .optional()?)
        })
        .await
    }

    /// Active rewards, cheapest first.
    pub async fn list_active_rewards(&self, family_id: &str) -> Result<Vec<Reward>, StorageError> {
        use schema::rewards;
        let family_id = family_id.to_string();
        self.with_conn(move |conn| {
            Ok(rewards::table
                .filter(rewards::family_id.eq(&family_id))
                .filter(rewards::is_active.eq(true))
                .order((rewards::points_required.asc(), rewards::title.asc()))
                .select(Reward::as_select())
                .load(conn)?)
        })
        .await
    }

    pub async fn update_reward(
        &self,
        reward_id: &str,
        update: RewardUpdate,
    ) -> Result<Reward, StorageError> {
        use schema::rewards;
        let reward_id = reward_id.to_string();
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<Reward, StorageError> {
                if let Some(title) = update.title.as_deref() {
                    diesel::update(rewards::table.find(&reward_id))
                        .set(rewards::title.eq(title))
                        .execute(conn)?;
                }
                if let Some(points) = update.points_required {
                    diesel::update(rewards::table.find(&reward_id))
                        .set(rewards::points_required.eq(points))
                        .execute(conn)?;
                }
                rewards::table
                    .find(&reward_id)
                    .select(Reward::as_select())
                    .first(conn)
                    .optional()?
                    .ok_or(StorageError::NotFound("Reward"))
            })
        })
        .await
    }

    /// Soft delete. Returns `false` when the reward did not exist.
    pub async fn deactivate_reward(&self, reward_id: &str) -> Result<bool, StorageError> {
        use schema::rewards;
        let reward_id = reward_id.to_string();
        self.with_conn(move |conn| {
            let updated = diesel::update(rewards::table.find(&reward_id))
                .set(rewards::is_active.eq(false))
                .execute(conn)?;
            Ok(updated > 0)
        })
        .await
    }

    /// Debits the reward's cost from the user, bumps `redeemed_count` and
    /// records a ledger entry. The debit only applies while the balance covers
    /// the cost, so concurrent redemptions cannot overdraw.
    pub async fn redeem_reward(
        &self,
        family_id: &str,
        reward_id: &str,
        user_id: &str,
    ) -> Result<RedeemOutcome, StorageError> {
        use schema::{rewards, users};
        let family_id = family_id.to_string();
        let reward_id = reward_id.to_string();
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<RedeemOutcome, StorageError> {
                let reward = rewards::table
                    .find(&reward_id)
                    .filter(rewards::family_id.eq(&family_id))
                    .filter(rewards::is_active.eq(true))
                    .select(Reward::as_select())
                    .first(conn)
                    .optional()?
                    .ok_or(StorageError::NotFound("Reward"))?;
                let cost = reward.points_required;

                let balance: i32 = diesel::update(
                    users::table
                        .find(&user_id)
                        .filter(users::points.ge(cost)),
                )
                .set(users::points.eq(users::points - cost))
                .returning(users::points)
                .get_result(conn)
                .optional()?
                .ok_or(StorageError::InsufficientPoints)?;

                let reward = diesel::update(rewards::table.find(&reward_id))
                    .set(rewards::redeemed_count.eq(rewards::redeemed_count + 1))
                    .returning(Reward::as_returning())
                    .get_result(conn)?;
                record_transaction(
                    conn,
                    &NewPointTransaction {
                        user_id: &user_id,
                        delta: -cost,
                        balance_after: balance,
                        reason: PointsReason::Redemption.as_str(),
                        reference_id: Some(&reward_id),
                        note: Some(&reward.title),
                        created_by_id: Some(&user_id),
                    },
                )?;
                debug!(reward_id = %reward_id, user_id = %user_id, cost, balance, "reward redeemed");
                Ok(RedeemOutcome {
                    reward,
                    points_spent: cost,
                    balance,
                })
            })
        })
        .await
    }

    // ----- points -----

    /// Applies a signed manual adjustment. The balance stays within `0..=MAX_BALANCE`.
    pub async fn adjust_points(
        &self,
        user_id: &str,
        delta: i32,
        note: Option<&str>,
        adjusted_by: &str,
    ) -> Result<i32, StorageError> {
        use schema::users;
        let user_id = user_id.to_string();
        let note = note.map(str::to_string);
        let adjusted_by = adjusted_by.to_string();
        self.with_conn(move |conn| {
            conn.immediate_transaction(|conn| -> Result<i32, StorageError> {
                let balance: Option<i32> = diesel::update(
                    users::table
                        .find(&user_id)
                        .filter((users::points + delta).ge(0))
                        .filter((users::points + delta).le(MAX_BALANCE)),
                )
                .set(users::points.eq(users::points + delta))
                .returning(users::points)
                .get_result(conn)
                .optional()?;
                let Some(balance) = balance else {
                    let exists: i64 = users::table
                        .find(&user_id)
                        .count()
                        .get_result(conn)?;
                    return Err(if exists == 0 {
                        StorageError::NotFound("User")
                    } else if delta > 0 {
                        StorageError::InvalidInput("Balance limit reached".into())
                    } else {
                        StorageError::InvalidInput("Balance cannot go below zero".into())
                    });
                };
                record_transaction(
                    conn,
                    &NewPointTransaction {
                        user_id: &user_id,
                        delta,
                        balance_after: balance,
                        reason: PointsReason::Adjustment.as_str(),
                        reference_id: None,
                        note: note.as_deref(),
                        created_by_id: Some(&adjusted_by),
                    },
                )?;
                debug!(user_id = %user_id, delta, balance, "points adjusted");
                Ok(balance)
            })
        })
        .await
    }

    /// Ledger entries for a user, newest first. `page` is 1-based.
    pub async fn list_point_transactions(
        &self,
        user_id: &str,
        page: u32,
        per_page: u32,
    ) -> Result<Vec<PointTransaction>, StorageError> {
        use schema::point_transactions as pt;
        if page == 0 || per_page == 0 {
            return Err(StorageError::InvalidInput(
                "page and per_page must be positive".into(),
            ));
        }
        let user_id = user_id.to_string();
        let offset = i64::from(page - 1) * i64::from(per_page);
        self.with_conn(move |conn| {
            Ok(pt::table
                .filter(pt::user_id.eq(&user_id))
                .order(pt::id.desc())
                .limit(i64::from(per_page))
                .offset(offset)
                .select(PointTransaction::as_select())
                .load(conn)?)
        })
        .await
    }

    // ----- sessions -----

    pub async fn create_session(&self, jti: &str, user_id: &str) -> Result<(), StorageError> {
        use schema::sessions;
        let jti = jti.to_string();
        let user_id = user_id.to_string();
        self.with_conn(move |conn| {
            diesel::insert_into(sessions::table)
                .values(&NewSession {
                    jti: &jti,
                    user_id: &user_id,
                })
                .on_conflict_do_nothing()
                .execute(conn)?;
            Ok(())
        })
        .await
    }

    pub async fn delete_session(&self, jti: &str) -> Result<bool, StorageError> {
        use schema::sessions;
        let jti = jti.to_string();
        self.with_conn(move |conn| {
            let deleted = diesel::delete(sessions::table.find(&jti)).execute(conn)?;
            Ok(deleted > 0)
        })
        .await
    }

    /// Touch the session only if it was last used at or after `cutoff`.
    /// Returns `true` if the session was found and updated.
    ///
    /// The idle check and the `last_used_at` refresh are one UPDATE, so a
    /// session cannot expire between the check and the touch.
    pub async fn touch_session_with_cutoff(
        &self,
        jti: &str,
        cutoff: NaiveDateTime,
    ) -> Result<bool, StorageError> {
        use schema::sessions;
        let jti = jti.to_string();
        self.with_conn(move |conn| {
            let now = Utc::now().naive_utc();
            let updated = diesel::update(
                sessions::table
                    .find(&jti)
                    .filter(sessions::last_used_at.ge(cutoff)),
            )
            .set(sessions::last_used_at.eq(now))
            .execute(conn)?;
            Ok(updated > 0)
        })
        .await
    }
}

fn load_chore(conn: &mut SqliteConnection, chore_id: &str) -> Result<Option<ChoreRow>, StorageError> {
    use schema::{chore_assignments as ca, chore_templates as ct, users};
    Ok(ca::table
        .inner_join(ct::table)
        .inner_join(users::table)
        .filter(ca::id.eq(chore_id))
        .select((
            ChoreAssignment::as_select(),
            ChoreTemplate::as_select(),
            User::as_select(),
        ))
        .first::<ChoreRow>(conn)
        .optional()?)
}

fn ensure_member(
    conn: &mut SqliteConnection,
    family_id: &str,
    user_id: &str,
) -> Result<(), StorageError> {
    use schema::users;
    let found: i64 = users::table
        .filter(users::id.eq(user_id))
        .filter(users::family_id.eq(family_id))
        .count()
        .get_result(conn)?;
    if found == 0 {
        return Err(StorageError::InvalidInput(
            "Assignee is not a member of this family".into(),
        ));
    }
    Ok(())
}

/// Distinguishes a missing chore from one in the wrong state after a
/// conditional status update matched no rows.
/// Current status of a chore; the caller holds the write transaction.
fn chore_status(conn: &mut SqliteConnection, chore_id: &str) -> Result<ChoreStatus, StorageError> {
    use schema::chore_assignments as ca;
    let status: String = ca::table
        .find(chore_id)
        .select(ca::status)
        .first(conn)
        .optional()?
        .ok_or(StorageError::NotFound("Chore"))?;
    status
        .parse()
        .map_err(|e: chorely_shared::domain::ParseEnumError| StorageError::Conflict(e.to_string()))
}

fn record_transaction(
    conn: &mut SqliteConnection,
    entry: &NewPointTransaction<'_>,
) -> Result<(), StorageError> {
    use schema::point_transactions;
    diesel::insert_into(point_transactions::table)
        .values(entry)
        .execute(conn)?;
    Ok(())
}

fn configure_sqlite_conn(conn: &mut SqliteConnection) -> Result<(), diesel::result::Error> {
    // WAL for read/write concurrency, busy timeout for writers, FK enforcement
    diesel::sql_query("PRAGMA journal_mode=WAL;").execute(conn)?;
    diesel::sql_query("PRAGMA synchronous=NORMAL;").execute(conn)?;
    diesel::sql_query("PRAGMA busy_timeout=5000;").execute(conn)?;
    diesel::sql_query("PRAGMA foreign_keys=ON;").execute(conn)?;
    Ok(())
}
