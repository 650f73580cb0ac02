use axum::extract::{Extension, State};
use axum::http::{Request, StatusCode, header};
use axum::middleware::Next;
use axum::response::Response;
use axum::Json;
use chorely_shared::api;
use chorely_shared::auth::Role;
use chorely_shared::jwt::{self, JwtClaims};
use chrono::{Duration, Utc};
use tracing::{error, info, warn};

use super::validate::ValidJson;
use super::{AppError, AppState};
use crate::storage::models::User;
use crate::storage::{FamilyMembership, NewAccount};

/// How many days of inactivity before a session is considered expired.
const SESSION_IDLE_DAYS: i64 = 14;
/// How many days before mandatory re-login.
const TOKEN_TTL_DAYS: i64 = 30;

/// Caller identity, refreshed from the database on every request.
#[derive(Clone, Debug)]
pub struct AuthCtx {
    pub claims: JwtClaims,
    pub user_id: String,
    pub role: Role,
    pub family_id: String,
}

impl AuthCtx {
    pub fn is_parent(&self) -> bool {
        self.role == Role::Parent
    }
}

pub async fn require_bearer(
    State(state): State<AppState>,
    mut req: Request<axum::body::Body>,
    next: Next,
) -> Result<Response, AppError> {
    let unauthorized = || Err(AppError::unauthorized());
    let header_val = match req.headers().get(header::AUTHORIZATION) {
        Some(v) => v,
        None => return unauthorized(),
    };
    let header_str = header_val.to_str().map_err(|_| AppError::unauthorized())?;
    let Some(token) = header_str.strip_prefix("Bearer ") else {
        return unauthorized();
    };

    let claims = match jwt::decode_and_verify(token, state.config.jwt_secret.as_bytes()) {
        Ok(c) => c,
        Err(e) => {
            warn!(error=%e, "auth: jwt decode failed");
            return unauthorized();
        }
    };

    let cutoff = Utc::now() - Duration::days(SESSION_IDLE_DAYS);
    match state
        .store
        .touch_session_with_cutoff(&claims.jti, cutoff.naive_utc())
        .await
    {
        Ok(true) => {}
        Ok(false) => {
            warn!(
                jti = %claims.jti,
                user_id = %claims.sub,
                cutoff = %cutoff,
                "auth: session missing or expired (last_used_at < cutoff)"
            );
            return unauthorized();
        }
        Err(e) => {
            error!(jti = %claims.jti, error=%e, "auth: touch_session_with_cutoff failed");
            return Err(AppError::internal(e));
        }
    }

    let user = state
        .store
        .get_user(&claims.sub)
        .await?
        .ok_or_else(|| {
            warn!(user_id = %claims.sub, "auth: user no longer exists");
            AppError::unauthorized()
        })?;
    let role = parse_role(&user)?;
    if role != claims.role || user.family_id != claims.family_id {
        info!(user_id = %user.id, "auth: stored role or family differs from token claims");
    }

    let auth = AuthCtx {
        claims,
        user_id: user.id,
        role,
        family_id: user.family_id,
    };
    req.extensions_mut().insert(auth);
    Ok(next.run(req).await)
}

pub async fn issue_jwt_for_user(state: &AppState, user: &User) -> Result<String, AppError> {
    let jti = uuid::Uuid::new_v4().to_string();
    let exp = (Utc::now() + Duration::days(TOKEN_TTL_DAYS)).timestamp();
    let claims = JwtClaims {
        sub: user.id.clone(),
        jti: jti.clone(),
        exp,
        role: parse_role(user)?,
        family_id: user.family_id.clone(),
    };

    state
        .store
        .create_session(&jti, &user.id)
        .await
        .map_err(|e| {
            error!(user_id = %user.id, error=%e, "login: create_session failed");
            AppError::internal(e)
        })?;
    let token = jwt::encode(&claims, state.config.jwt_secret.as_bytes()).map_err(|e| {
        error!(user_id = %user.id, error=%e, "login: jwt encode failed");
        AppError::internal(e)
    })?;
    Ok(token)
}

fn parse_role(user: &User) -> Result<Role, AppError> {
    Role::parse(&user.role).ok_or_else(|| {
        error!(user_id = %user.id, role = %user.role, "stored user has unknown role");
        AppError::internal("unknown role")
    })
}

fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

pub(super) async fn api_auth_register(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<api::RegisterReq>,
) -> Result<Json<api::RegisterResp>, AppError> {
    let email = normalize_email(&body.email);
    let membership = match body.role {
        Role::Parent => FamilyMembership::Create {
            name: body.family_name.unwrap_or_default().trim().to_string(),
        },
        Role::Child => FamilyMembership::Join {
            invite_code: body.invite_code.unwrap_or_default().trim().to_string(),
        },
    };

    let cost = state.config.bcrypt_cost;
    let password = body.password;
    let password_hash = tokio::task::spawn_blocking(move || bcrypt::hash(password, cost))
        .await
        .map_err(AppError::internal)?
        .map_err(|e| {
            error!(error=%e, "register: bcrypt hash failed");
            AppError::internal(e)
        })?;

    let user = state
        .store
        .register_user(NewAccount {
            email,
            name: body.name.trim().to_string(),
            password_hash,
            role: body.role,
            membership,
        })
        .await?;
    info!(user_id = %user.id, family_id = %user.family_id, role = %user.role, "user registered");

    Ok(Json(api::RegisterResp {
        user: api::RegisteredUserDto {
            role: parse_role(&user)?,
            id: user.id,
            email: user.email,
            name: user.name,
            family_id: user.family_id,
        },
    }))
}

pub(super) async fn api_auth_login(
    State(state): State<AppState>,
    ValidJson(body): ValidJson<api::AuthReq>,
) -> Result<Json<api::AuthResp>, AppError> {
    let email = normalize_email(&body.email);
    let user = state.store.find_user_by_email(&email).await?.ok_or_else(|| {
        warn!(email = %email, "login: unknown email");
        AppError::unauthorized()
    })?;

    let hash = user.password_hash.clone();
    let password = body.password;
    let valid = tokio::task::spawn_blocking(move || bcrypt::verify(password, &hash))
        .await
        .map_err(AppError::internal)?
        .map_err(|e| {
            error!(user_id = %user.id, error=%e, "login: bcrypt verify failed");
            AppError::internal(e)
        })?;
    if !valid {
        warn!(user_id = %user.id, "login: invalid password");
        return Err(AppError::unauthorized());
    }

    let token = issue_jwt_for_user(&state, &user).await?;
    Ok(Json(api::AuthResp { token }))
}

pub(super) async fn api_auth_logout(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<StatusCode, AppError> {
    state.store.delete_session(&auth.claims.jti).await?;
    info!(user_id = %auth.user_id, "logged out");
    Ok(StatusCode::NO_CONTENT)
}

/// Issues a fresh token and revokes the one used for this request.
pub(super) async fn api_auth_renew(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<Json<api::AuthResp>, AppError> {
    let user = state
        .store
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(AppError::unauthorized)?;
    let token = issue_jwt_for_user(&state, &user).await?;
    state.store.delete_session(&auth.claims.jti).await?;
    Ok(Json(api::AuthResp { token }))
}

pub(super) async fn api_auth_me(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthCtx>,
) -> Result<Json<api::MeDto>, AppError> {
    let user = state
        .store
        .get_user(&auth.user_id)
        .await?
        .ok_or_else(AppError::unauthorized)?;
    let family = state
        .store
        .get_family(&user.family_id)
        .await?
        .ok_or_else(|| AppError::internal("user family missing"))?;
    Ok(Json(api::MeDto {
        role: auth.role,
        id: user.id,
        name: user.name,
        email: user.email,
        points: user.points,
        avatar: user.avatar,
        family: api::FamilyDto {
            invite_code: family.id.clone(),
            id: family.id,
            name: family.name,
            created_by: family.created_by,
        },
    }))
}
