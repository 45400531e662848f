//! User accounts.
//!
//! The stored `password` is always an Argon2 hash; the plaintext only ever
//! exists in the request that sets it.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use devcamper_core::model::validate::{Violations, is_email};
use devcamper_core::{Collection, DomainError, Resource};

use crate::password::{MIN_PASSWORD_LEN, hash_password, verify_password};
use crate::{AuthError, ResetToken, Role, digest_token};

pub const PASSWORD_FIELD: &str = "password";

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserAccount {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub email: Option<String>,
    #[serde(default)]
    pub role: Role,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    password: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reset_password_token: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    reset_password_expire: Option<i64>,
}

impl Resource for UserAccount {
    const COLLECTION: Collection = Collection::Users;
    const MANAGED_FIELDS: &'static [&'static str] = &["resetPasswordToken", "resetPasswordExpire"];

    fn validate(&self) -> Result<(), DomainError> {
        let mut v = Violations::new();
        v.required(self.name.as_deref(), "Please add a name")
            .required(self.email.as_deref(), "Please add an email")
            .check(
                self.email.as_deref().is_none_or(is_email),
                "Please add a valid email",
            )
            .required(self.password.as_deref(), "Please add a password");
        v.finish()
    }
}

impl UserAccount {
    /// Build an account from client input carrying a plaintext `password`.
    pub fn from_input(mut fields: Map<String, Value>) -> Result<Self, AuthError> {
        let plain = match fields.remove(PASSWORD_FIELD) {
            Some(Value::String(p)) => Some(p),
            _ => None,
        };
        let mut violations = Violations::new();
        violations.required(fields.get("name").and_then(Value::as_str), "Please add a name");
        violations
            .required(fields.get("email").and_then(Value::as_str), "Please add an email")
            .check(
                fields.get("email").and_then(Value::as_str).is_none_or(is_email),
                "Please add a valid email",
            )
            .required(plain.as_deref(), "Please add a password");
        if let Some(p) = plain.as_deref() {
            violations.check(p.chars().count() >= MIN_PASSWORD_LEN, short_password_message());
        }
        violations.finish()?;

        let plain = plain.unwrap_or_default();
        fields.insert(PASSWORD_FIELD.to_string(), Value::String(hash_password(&plain)?));
        Ok(Self::from_fields(Self::client_fields(fields))?)
    }

    pub fn password_hash(&self) -> Option<&str> {
        self.password.as_deref()
    }

    pub fn matches_password(&self, plain: &str) -> Result<bool, AuthError> {
        match &self.password {
            Some(hash) => verify_password(plain, hash),
            None => Ok(false),
        }
    }

    /// Replace the password and drop any pending reset.
    pub fn set_password(&mut self, plain: &str) -> Result<(), AuthError> {
        if plain.chars().count() < MIN_PASSWORD_LEN {
            return Err(DomainError::validation([short_password_message()]).into());
        }
        self.password = Some(hash_password(plain)?);
        self.clear_reset();
        Ok(())
    }

    /// Start a reset: store the digest and expiry, return the raw token.
    pub fn begin_reset(&mut self, now: DateTime<Utc>) -> ResetToken {
        let token = ResetToken::generate(now);
        self.reset_password_token = Some(token.digest().to_string());
        self.reset_password_expire = Some(token.expires_at_millis());
        token
    }

    pub fn clear_reset(&mut self) {
        self.reset_password_token = None;
        self.reset_password_expire = None;
    }

    /// Whether `raw` is the pending, unexpired reset token.
    pub fn reset_token_matches(&self, raw: &str, now: DateTime<Utc>) -> bool {
        match (&self.reset_password_token, self.reset_password_expire) {
            (Some(digest), Some(expire)) => {
                *digest == digest_token(raw) && expire > now.timestamp_millis()
            }
            _ => false,
        }
    }
}

fn short_password_message() -> String {
    format!("Password must be at least {MIN_PASSWORD_LEN} characters")
}

#[cfg(test)]
mod tests {
    use chrono::Duration;
    use serde_json::json;

    use super::*;

    fn input(value: Value) -> Map<String, Value> {
        value.as_object().cloned().unwrap_or_default()
    }

    fn john() -> UserAccount {
        UserAccount::from_input(input(json!({
            "name": "John Doe",
            "email": "john@gmail.com",
            "password": "123456",
            "role": "publisher",
        })))
        .unwrap()
    }

    #[test]
    fn input_password_is_hashed() {
        let user = john();
        assert_eq!(user.role, Role::Publisher);
        assert_ne!(user.password_hash(), Some("123456"));
        assert!(user.matches_password("123456").unwrap());
        assert!(!user.matches_password("654321").unwrap());
    }

    #[test]
    fn input_reports_all_violations() {
        let err = UserAccount::from_input(input(json!({ "email": "nope", "password": "123" })))
            .unwrap_err();
        let AuthError::Invalid(DomainError::Validation(messages)) = err else {
            panic!("expected validation error");
        };
        assert_eq!(
            messages,
            vec![
                "Please add a name".to_string(),
                "Please add a valid email".to_string(),
                "Password must be at least 6 characters".to_string(),
            ]
        );
    }

    #[test]
    fn client_cannot_set_reset_fields() {
        let user = UserAccount::from_input(input(json!({
            "name": "Jane",
            "email": "jane@gmail.com",
            "password": "123456",
            "resetPasswordToken": "abc",
        })))
        .unwrap();
        assert!(!user.reset_token_matches("abc", Utc::now()));
    }

    #[test]
    fn reset_token_lifecycle() {
        let mut user = john();
        let now = Utc::now();
        let token = user.begin_reset(now);
        assert!(user.reset_token_matches(token.raw(), now + Duration::minutes(9)));
        assert!(!user.reset_token_matches(token.raw(), now + Duration::minutes(11)));
        assert!(!user.reset_token_matches("wrong", now));

        user.set_password("new-secret").unwrap();
        assert!(!user.reset_token_matches(token.raw(), now));
        assert!(user.matches_password("new-secret").unwrap());
    }

    #[test]
    fn stored_fields_keep_hidden_values() {
        let mut user = john();
        user.begin_reset(Utc::now());
        let fields = user.to_fields().unwrap();
        assert!(fields.contains_key("password"));
        assert!(fields.contains_key("resetPasswordToken"));
        assert!(fields["resetPasswordExpire"].is_i64());
    }
}
