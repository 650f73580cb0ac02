use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};

use super::{API_V1_PREFIX, family_scope};

fn base_join(base: &str, path: &str) -> String {
    let b = base.trim_end_matches('/');
    let p = path.trim_start_matches('/');
    format!("{}/{}", b, p)
}

fn enc(s: &str) -> String {
    utf8_percent_encode(s, NON_ALPHANUMERIC).to_string()
}

fn family_path(base: &str, family_id: &str, rest: &str) -> String {
    base_join(base, &format!("{}/{}", family_scope(&enc(family_id)), rest))
}

/// Appends `key=value` pairs, percent-encoding each value.
pub fn with_query(url: &str, pairs: &[(&str, String)]) -> String {
    if pairs.is_empty() {
        return url.to_string();
    }
    let qs: Vec<String> = pairs
        .iter()
        .map(|(k, v)| format!("{}={}", k, enc(v)))
        .collect();
    format!("{}?{}", url, qs.join("&"))
}

pub fn version(base: &str) -> String {
    base_join(base, &format!("{}/version", API_V1_PREFIX))
}

pub fn auth_login(base: &str) -> String {
    base_join(base, &format!("{}/auth/login", API_V1_PREFIX))
}
pub fn auth_register(base: &str) -> String {
    base_join(base, &format!("{}/auth/register", API_V1_PREFIX))
}
pub fn auth_logout(base: &str) -> String {
    base_join(base, &format!("{}/auth/logout", API_V1_PREFIX))
}
pub fn auth_renew(base: &str) -> String {
    base_join(base, &format!("{}/auth/renew", API_V1_PREFIX))
}
pub fn auth_me(base: &str) -> String {
    base_join(base, &format!("{}/auth/me", API_V1_PREFIX))
}

pub fn chores(base: &str, family_id: &str) -> String {
    family_path(base, family_id, "chores")
}
pub fn chore(base: &str, family_id: &str, chore_id: &str) -> String {
    family_path(base, family_id, &format!("chores/{}", enc(chore_id)))
}
pub fn chore_complete(base: &str, family_id: &str, chore_id: &str) -> String {
    family_path(base, family_id, &format!("chores/{}/complete", enc(chore_id)))
}
pub fn chore_approve(base: &str, family_id: &str, chore_id: &str) -> String {
    family_path(base, family_id, &format!("chores/{}/approve", enc(chore_id)))
}

pub fn rewards(base: &str, family_id: &str) -> String {
    family_path(base, family_id, "rewards")
}
pub fn reward(base: &str, family_id: &str, reward_id: &str) -> String {
    family_path(base, family_id, &format!("rewards/{}", enc(reward_id)))
}
pub fn reward_redeem(base: &str, family_id: &str, reward_id: &str) -> String {
    family_path(base, family_id, &format!("rewards/{}/redeem", enc(reward_id)))
}

pub fn members(base: &str, family_id: &str) -> String {
    family_path(base, family_id, "members")
}
pub fn member_points(base: &str, family_id: &str, user_id: &str) -> String {
    family_path(base, family_id, &format!("members/{}/points", enc(user_id)))
}

pub fn dashboard(base: &str, family_id: &str) -> String {
    family_path(base, family_id, "dashboard")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn joins_base_without_double_slash() {
        assert_eq!(
            auth_login("http://localhost:5151/"),
            "http://localhost:5151/api/v1/auth/login"
        );
    }

    #[test]
    fn family_routes_are_scoped_and_encoded() {
        assert_eq!(
            chore_approve("http://h", "fam-1", "a b"),
            "http://h/api/v1/family/fam%2D1/chores/a%20b/approve"
        );
        assert_eq!(
            member_points("http://h", "f", "u"),
            "http://h/api/v1/family/f/members/u/points"
        );
    }

    #[test]
    fn query_values_are_encoded() {
        assert_eq!(with_query("http://h/x", &[]), "http://h/x");
        assert_eq!(
            with_query(
                "http://h/x",
                &[("status", "Pending".into()), ("from", "2025-01-01T00:00:00+00:00".into())]
            ),
            "http://h/x?status=Pending&from=2025%2D01%2D01T00%3A00%3A00%2B00%3A00"
        );
    }
}
