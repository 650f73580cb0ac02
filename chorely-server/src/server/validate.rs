use std::sync::LazyLock;

use axum::Json;
use axum::extract::rejection::{JsonRejection, QueryRejection};
use axum::extract::{FromRequest, FromRequestParts, Query, Request};
use axum::http::request::Parts;
use chorely_shared::api;
use chorely_shared::auth::Role;
use chorely_shared::domain::parse_due_date;
use regex::Regex;
use serde::de::DeserializeOwned;

use super::AppError;

pub const MIN_PASSWORD_LEN: usize = 6;
pub const MIN_NAME_LEN: usize = 2;
pub const MAX_TEXT_LEN: usize = 200;
pub const MAX_DESCRIPTION_LEN: usize = 2000;
pub const MAX_POINTS: i32 = 1_000_000;

static EMAIL_RE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").expect("email regex")
});

#[derive(Debug, PartialEq, Eq)]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct ValidationResult {
    pub errors: Vec<ValidationError>,
}

impl ValidationResult {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_valid(&self) -> bool {
        self.errors.is_empty()
    }

    pub fn add_error(&mut self, field: &'static str, message: impl Into<String>) {
        self.errors.push(ValidationError {
            field,
            message: message.into(),
        });
    }

    pub fn into_result(self) -> Result<(), AppError> {
        if self.is_valid() {
            return Ok(());
        }
        let msg = self
            .errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join(", ");
        Err(AppError::bad_request(msg))
    }

    fn require_text(&mut self, field: &'static str, value: &str, min: usize, max: usize) {
        let len = value.trim().chars().count();
        if len < min {
            if min <= 1 {
                self.add_error(field, "is required");
            } else {
                self.add_error(field, format!("must be at least {min} characters"));
            }
        } else if len > max {
            self.add_error(field, format!("must be at most {max} characters"));
        }
    }

    fn require_points(&mut self, field: &'static str, value: i32, min: i32) {
        if value < min {
            self.add_error(field, format!("must be at least {min}"));
        } else if value > MAX_POINTS {
            self.add_error(field, format!("must be at most {MAX_POINTS}"));
        }
    }

    fn require_due_date(&mut self, value: &str) {
        if let Err(e) = parse_due_date(value) {
            self.add_error("due_date", e);
        }
    }
}

/// Request bodies that check their own field constraints.
pub trait Validate {
    fn validate(&self) -> ValidationResult;
}

/// `Json<T>` that also runs [`Validate`]. Malformed bodies and failed
/// validation are both reported as 400.
pub struct ValidJson<T>(pub T);

impl<S, T> FromRequest<S> for ValidJson<T>
where
    T: DeserializeOwned + Validate,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request(req: Request, state: &S) -> Result<Self, Self::Rejection> {
        let Json(value) = Json::<T>::from_request(req, state)
            .await
            .map_err(|rej: JsonRejection| AppError::bad_request(rej.body_text()))?;
        value.validate().into_result()?;
        Ok(ValidJson(value))
    }
}

/// `Query<T>` whose rejection is reported with the JSON error body.
pub struct ApiQuery<T>(pub T);

impl<S, T> FromRequestParts<S> for ApiQuery<T>
where
    T: DeserializeOwned,
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &S) -> Result<Self, Self::Rejection> {
        let Query(value) = Query::<T>::from_request_parts(parts, state)
            .await
            .map_err(|rej: QueryRejection| AppError::bad_request(rej.body_text()))?;
        Ok(ApiQuery(value))
    }
}

pub fn is_valid_email(email: &str) -> bool {
    email.len() <= 254 && EMAIL_RE.is_match(email)
}

impl Validate for api::RegisterReq {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        if !is_valid_email(self.email.trim()) {
            result.add_error("email", "invalid email address");
        }
        if self.password.chars().count() < MIN_PASSWORD_LEN {
            result.add_error(
                "password",
                format!("must be at least {MIN_PASSWORD_LEN} characters"),
            );
        }
        result.require_text("name", &self.name, MIN_NAME_LEN, MAX_TEXT_LEN);
        match self.role {
            Role::Parent => match self.family_name.as_deref() {
                Some(name) => result.require_text("family_name", name, 1, MAX_TEXT_LEN),
                None => result.add_error("family_name", "is required for parents"),
            },
            Role::Child => {
                if self.invite_code.as_deref().is_none_or(|c| c.trim().is_empty()) {
                    result.add_error("invite_code", "is required for children");
                }
            }
        }
        result
    }
}

impl Validate for api::AuthReq {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        if self.email.trim().is_empty() {
            result.add_error("email", "is required");
        }
        if self.password.is_empty() {
            result.add_error("password", "is required");
        }
        result
    }
}

impl Validate for api::CreateChoreReq {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.require_text("title", &self.title, 1, MAX_TEXT_LEN);
        if let Some(desc) = &self.description
            && desc.chars().count() > MAX_DESCRIPTION_LEN
        {
            result.add_error(
                "description",
                format!("must be at most {MAX_DESCRIPTION_LEN} characters"),
            );
        }
        result.require_points("base_points", self.base_points, 0);
        if self.assigned_to_id.trim().is_empty() {
            result.add_error("assigned_to_id", "is required");
        }
        if let Some(due) = self.due_date.as_deref() {
            result.require_due_date(due);
        }
        result
    }
}

impl Validate for api::UpdateChoreReq {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        if let Some(title) = &self.title {
            result.require_text("title", title, 1, MAX_TEXT_LEN);
        }
        if let Some(desc) = &self.description
            && desc.chars().count() > MAX_DESCRIPTION_LEN
        {
            result.add_error(
                "description",
                format!("must be at most {MAX_DESCRIPTION_LEN} characters"),
            );
        }
        if let Some(points) = self.base_points {
            result.require_points("base_points", points, 0);
        }
        if let Some(assignee) = &self.assigned_to_id
            && assignee.trim().is_empty()
        {
            result.add_error("assigned_to_id", "must not be empty");
        }
        if let Some(due) = self.due_date.as_deref()
            && !due.is_empty()
        {
            result.require_due_date(due);
        }
        result
    }
}

impl Validate for api::CreateRewardReq {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        result.require_text("title", &self.title, 1, MAX_TEXT_LEN);
        result.require_points("points_required", self.points_required, 1);
        result
    }
}

impl Validate for api::UpdateRewardReq {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        if let Some(title) = &self.title {
            result.require_text("title", title, 1, MAX_TEXT_LEN);
        }
        if let Some(points) = self.points_required {
            result.require_points("points_required", points, 1);
        }
        result
    }
}

impl Validate for api::PointsAdjustReq {
    fn validate(&self) -> ValidationResult {
        let mut result = ValidationResult::new();
        if self.points == 0 {
            result.add_error("points", "must not be zero");
        } else if self.points.unsigned_abs() > MAX_POINTS as u32 {
            result.add_error("points", format!("must be within ±{MAX_POINTS}"));
        }
        if let Some(reason) = &self.reason
            && reason.chars().count() > MAX_TEXT_LEN
        {
            result.add_error(
                "reason",
                format!("must be at most {MAX_TEXT_LEN} characters"),
            );
        }
        result
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn register(role: Role) -> api::RegisterReq {
        api::RegisterReq {
            email: "mom@example.com".into(),
            password: "secret1".into(),
            name: "Mom".into(),
            role,
            family_name: None,
            invite_code: None,
        }
    }

    fn fields(result: &ValidationResult) -> Vec<&'static str> {
        result.errors.iter().map(|e| e.field).collect()
    }

    #[test]
    fn email_format() {
        assert!(is_valid_email("a@b.co"));
        assert!(is_valid_email("first.last+tag@example.org"));
        assert!(!is_valid_email("no-at-sign"));
        assert!(!is_valid_email("a@b"));
        assert!(!is_valid_email("a b@c.de"));
        assert!(!is_valid_email(""));
    }

    #[test]
    fn parent_needs_family_name() {
        let mut req = register(Role::Parent);
        assert_eq!(fields(&req.validate()), vec!["family_name"]);
        req.family_name = Some("Smiths".into());
        assert!(req.validate().is_valid());
    }

    #[test]
    fn child_needs_invite_code() {
        let mut req = register(Role::Child);
        req.invite_code = Some("   ".into());
        assert_eq!(fields(&req.validate()), vec!["invite_code"]);
        req.invite_code = Some("fam-1".into());
        assert!(req.validate().is_valid());
    }

    #[test]
    fn short_password_and_name_are_reported_together() {
        let mut req = register(Role::Parent);
        req.family_name = Some("Smiths".into());
        req.password = "12345".into();
        req.name = "M".into();
        assert_eq!(fields(&req.validate()), vec!["password", "name"]);
    }

    #[test]
    fn chore_rules() {
        let mut req = api::CreateChoreReq {
            title: "  ".into(),
            description: None,
            base_points: -1,
            assigned_to_id: "kid".into(),
            due_date: Some("tomorrow".into()),
            frequency: None,
        };
        assert_eq!(
            fields(&req.validate()),
            vec!["title", "base_points", "due_date"]
        );
        req.title = "Dishes".into();
        req.base_points = 0;
        req.due_date = Some("2025-03-01".into());
        assert!(req.validate().is_valid());
    }

    #[test]
    fn update_chore_allows_clearing_due_date() {
        let req = api::UpdateChoreReq {
            due_date: Some(String::new()),
            ..Default::default()
        };
        assert!(req.validate().is_valid());
    }

    #[test]
    fn reward_requires_positive_cost() {
        let req = api::CreateRewardReq {
            title: "Ice cream".into(),
            points_required: 0,
        };
        assert_eq!(fields(&req.validate()), vec!["points_required"]);
    }

    #[test]
    fn adjustment_bounds() {
        let zero = api::PointsAdjustReq {
            points: 0,
            reason: None,
        };
        assert!(!zero.validate().is_valid());
        let huge = api::PointsAdjustReq {
            points: -MAX_POINTS - 1,
            reason: None,
        };
        assert!(!huge.validate().is_valid());
        let ok = api::PointsAdjustReq {
            points: -50,
            reason: Some("broke a window".into()),
        };
        assert!(ok.validate().is_valid());
    }

    #[test]
    fn error_message_joins_fields() {
        let mut result = ValidationResult::new();
        result.add_error("a", "bad");
        result.add_error("b", "worse");
        match result.into_result() {
            Err(AppError::BadRequest(msg)) => assert_eq!(msg, "a: bad, b: worse"),
            other => panic!("unexpected {other:?}"),
        }
    }
}
