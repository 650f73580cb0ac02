use super::{AppError, auth::AuthCtx};
use axum::response::Response;
use axum::{
    extract::OriginalUri,
    http::{Method, Request},
    middleware::Next,
};
use chorely_shared::auth::Role;
use percent_encoding::percent_decode_str;

pub async fn enforce_acl(req: Request<axum::body::Body>, next: Next) -> Result<Response, AppError> {
    let path = req
        .extensions()
        .get::<OriginalUri>()
        .map(|orig| orig.0.path().to_string())
        .unwrap_or_else(|| req.uri().path().to_string());
    let method = req.method().clone();
    let Some(auth) = req.extensions().get::<AuthCtx>() else {
        return Err(AppError::unauthorized());
    };

    let segs = segmented(&path);
    if let Err(err) = check(&method, &segs, auth) {
        tracing::warn!(
            method = %method,
            path = %path,
            user_id = %auth.user_id,
            role = %auth.role,
            family_id = %auth.family_id,
            "ACL: no rule matched; denying"
        );
        return Err(err);
    }

    Ok(next.run(req).await)
}

fn check(method: &Method, segs: &[&str], auth: &AuthCtx) -> Result<(), AppError> {
    match segs {
        ["api", "v1", "auth", "logout" | "renew"] if *method == Method::POST => Ok(()),
        ["api", "v1", "auth", "me"] if *method == Method::GET => Ok(()),
        ["api", "v1", "family", family, rest @ ..] => {
            if decode(family) != auth.family_id {
                return Err(AppError::forbidden());
            }
            match auth.role {
                Role::Parent => allow_parent(method, rest),
                Role::Child => allow_child(method, rest, auth),
            }
        }
        _ => Err(AppError::forbidden()),
    }
}

fn allow_parent(method: &Method, rest: &[&str]) -> Result<(), AppError> {
    match rest {
        ["chores"] if *method == Method::GET || *method == Method::POST => Ok(()),
        ["chores", _]
            if *method == Method::GET || *method == Method::PUT || *method == Method::DELETE =>
        {
            Ok(())
        }
        ["chores", _, "complete" | "approve"] if *method == Method::POST => Ok(()),
        ["rewards"] if *method == Method::GET || *method == Method::POST => Ok(()),
        ["rewards", _] if *method == Method::PUT || *method == Method::DELETE => Ok(()),
        ["rewards", _, "redeem"] if *method == Method::POST => Ok(()),
        ["members"] if *method == Method::GET => Ok(()),
        ["members", _, "points"] if *method == Method::GET || *method == Method::POST => Ok(()),
        ["dashboard"] if *method == Method::GET => Ok(()),
        _ => Err(AppError::forbidden()),
    }
}

fn allow_child(method: &Method, rest: &[&str], auth: &AuthCtx) -> Result<(), AppError> {
    match rest {
        ["chores"] if *method == Method::GET => Ok(()),
        ["chores", _] if *method == Method::GET => Ok(()),
        ["chores", _, "complete"] if *method == Method::POST => Ok(()),
        ["rewards"] if *method == Method::GET => Ok(()),
        ["rewards", _, "redeem"] if *method == Method::POST => Ok(()),
        ["members"] if *method == Method::GET => Ok(()),
        ["members", user, "points"] if *method == Method::GET => ensure_self(auth, user),
        ["dashboard"] if *method == Method::GET => Ok(()),
        _ => Err(AppError::forbidden()),
    }
}

fn segmented(path: &str) -> Vec<&str> {
    path.split('/').filter(|s| !s.is_empty()).collect()
}

fn decode(seg: &str) -> String {
    percent_decode_str(seg).decode_utf8_lossy().to_string()
}

fn ensure_self(auth: &AuthCtx, seg: &str) -> Result<(), AppError> {
    if decode(seg) == auth.user_id {
        Ok(())
    } else {
        Err(AppError::forbidden())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chorely_shared::jwt::JwtClaims;

    fn ctx(role: Role) -> AuthCtx {
        AuthCtx {
            claims: JwtClaims {
                sub: "u1".into(),
                jti: "s1".into(),
                exp: 0,
                role,
                family_id: "fam-1".into(),
            },
            user_id: "u1".into(),
            role,
            family_id: "fam-1".into(),
        }
    }

    fn allowed(method: Method, path: &str, auth: &AuthCtx) -> bool {
        check(&method, &segmented(path), auth).is_ok()
    }

    #[test]
    fn session_routes_open_to_any_role() {
        for role in [Role::Parent, Role::Child] {
            let auth = ctx(role);
            assert!(allowed(Method::POST, "/api/v1/auth/logout", &auth));
            assert!(allowed(Method::POST, "/api/v1/auth/renew", &auth));
            assert!(allowed(Method::GET, "/api/v1/auth/me", &auth));
            assert!(!allowed(Method::GET, "/api/v1/auth/logout", &auth));
        }
    }

    #[test]
    fn other_family_is_forbidden() {
        let parent = ctx(Role::Parent);
        assert!(allowed(Method::GET, "/api/v1/family/fam-1/chores", &parent));
        assert!(!allowed(Method::GET, "/api/v1/family/fam-2/chores", &parent));
        assert!(allowed(Method::GET, "/api/v1/family/fam%2D1/chores", &parent));
    }

    #[test]
    fn parent_rules() {
        let p = ctx(Role::Parent);
        let base = "/api/v1/family/fam-1";
        assert!(allowed(Method::POST, &format!("{base}/chores"), &p));
        assert!(allowed(Method::PUT, &format!("{base}/chores/c1"), &p));
        assert!(allowed(Method::DELETE, &format!("{base}/chores/c1"), &p));
        assert!(allowed(Method::POST, &format!("{base}/chores/c1/approve"), &p));
        assert!(allowed(Method::DELETE, &format!("{base}/rewards/r1"), &p));
        assert!(allowed(Method::POST, &format!("{base}/members/u2/points"), &p));
        assert!(allowed(Method::GET, &format!("{base}/members/u2/points"), &p));
        assert!(!allowed(Method::GET, &format!("{base}/rewards/r1"), &p));
        assert!(!allowed(Method::POST, &format!("{base}/unknown"), &p));
    }

    #[test]
    fn child_rules() {
        let c = ctx(Role::Child);
        let base = "/api/v1/family/fam-1";
        assert!(allowed(Method::GET, &format!("{base}/chores"), &c));
        assert!(allowed(Method::GET, &format!("{base}/chores/c1"), &c));
        assert!(allowed(Method::POST, &format!("{base}/chores/c1/complete"), &c));
        assert!(allowed(Method::GET, &format!("{base}/rewards"), &c));
        assert!(allowed(Method::POST, &format!("{base}/rewards/r1/redeem"), &c));
        assert!(allowed(Method::GET, &format!("{base}/members"), &c));
        assert!(allowed(Method::GET, &format!("{base}/members/u1/points"), &c));
        assert!(allowed(Method::GET, &format!("{base}/dashboard"), &c));

        assert!(!allowed(Method::POST, &format!("{base}/chores"), &c));
        assert!(!allowed(Method::PUT, &format!("{base}/chores/c1"), &c));
        assert!(!allowed(Method::DELETE, &format!("{base}/chores/c1"), &c));
        assert!(!allowed(Method::POST, &format!("{base}/chores/c1/approve"), &c));
        assert!(!allowed(Method::POST, &format!("{base}/rewards"), &c));
        assert!(!allowed(Method::DELETE, &format!("{base}/rewards/r1"), &c));
        assert!(!allowed(Method::GET, &format!("{base}/members/u2/points"), &c));
        assert!(!allowed(Method::POST, &format!("{base}/members/u1/points"), &c));
    }

    #[test]
    fn unknown_prefix_is_forbidden() {
        let p = ctx(Role::Parent);
        assert!(!allowed(Method::GET, "/api/v1/chores", &p));
        assert!(!allowed(Method::GET, "/", &p));
    }
}
