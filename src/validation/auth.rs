//! Rule sets for the sign-in and sign-up forms.

use serde::{Deserialize, Serialize};

use super::form::{FieldRule, FieldValue, RuleSet};
use super::text::validate_email;

const MIN_PASSWORD_CHARS: usize = 8;
const MIN_NAME_CHARS: usize = 2;

/// Which auth form is being submitted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AuthMode {
    Login,
    Signup,
}

/// Build the rules for an auth form.
///
/// `password` is the password as currently entered; sign-up compares the
/// confirmation field against it.
pub fn auth_rules(mode: AuthMode, password: &str) -> RuleSet {
    let mut rules = RuleSet::new().field(
        "email",
        FieldRule::mandatory().custom(|value| {
            (!validate_email(&value.to_text()))
                .then(|| "Please enter a valid email address".to_string())
        }),
    );

    if mode == AuthMode::Signup {
        rules = rules
            .field("firstName", FieldRule::mandatory().min_length(MIN_NAME_CHARS))
            .field("lastName", FieldRule::mandatory().min_length(MIN_NAME_CHARS));
    }

    rules = rules.field(
        "password",
        FieldRule::mandatory()
            .min_length(MIN_PASSWORD_CHARS)
            .custom(check_password_strength),
    );

    if mode == AuthMode::Signup {
        let expected = password.to_string();
        rules = rules.field(
            "confirmPassword",
            FieldRule::mandatory().custom(move |value| {
                (value.to_text() != expected).then(|| "Passwords do not match".to_string())
            }),
        );
    }

    rules
}

fn check_password_strength(value: &FieldValue) -> Option<String> {
    let text = value.to_text();
    let lower = text.chars().any(|c| c.is_ascii_lowercase());
    let upper = text.chars().any(|c| c.is_ascii_uppercase());
    let digit = text.chars().any(|c| c.is_ascii_digit());

    (!(lower && upper && digit)).then(|| {
        "Password must contain at least one uppercase letter, one lowercase letter, and one number"
            .to_string()
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::validation::{validate_form, FormData};

    fn form(pairs: &[(&str, &str)]) -> FormData {
        pairs
            .iter()
            .map(|(k, v)| (k.to_string(), FieldValue::from(*v)))
            .collect()
    }

    #[test]
    fn test_login_valid() {
        let data = form(&[("email", "a@b.co"), ("password", "Secret123")]);
        let result = validate_form(&data, &auth_rules(AuthMode::Login, "Secret123"));
        assert!(result.is_valid());
    }

    #[test]
    fn test_login_ignores_signup_fields() {
        let rules = auth_rules(AuthMode::Login, "");
        let fields: Vec<_> = rules.iter().map(|(name, _)| name).collect();
        assert_eq!(fields, vec!["email", "password"]);
    }

    #[test]
    fn test_empty_email_only_reports_required() {
        let data = form(&[("email", ""), ("password", "Secret123")]);
        let result = validate_form(&data, &auth_rules(AuthMode::Login, "Secret123"));

        assert_eq!(
            result.errors_for("email"),
            Some(&["email is required".to_string()][..])
        );
    }

    #[test]
    fn test_bad_email_and_weak_password() {
        let data = form(&[("email", "nope"), ("password", "short")]);
        let result = validate_form(&data, &auth_rules(AuthMode::Login, "short"));

        assert_eq!(
            result.errors_for("email"),
            Some(&["Please enter a valid email address".to_string()][..])
        );
        assert_eq!(
            result.errors_for("password").unwrap(),
            &[
                "password must be at least 8 characters".to_string(),
                "Password must contain at least one uppercase letter, one lowercase letter, and one number"
                    .to_string(),
            ]
        );
    }

    #[test]
    fn test_signup_field_order_and_mismatch() {
        let data = form(&[
            ("email", "new@user.org"),
            ("firstName", "A"),
            ("lastName", "Lovelace"),
            ("password", "Analytical1"),
            ("confirmPassword", "Analytical2"),
        ]);
        let result = validate_form(&data, &auth_rules(AuthMode::Signup, "Analytical1"));
        let fields: Vec<_> = result.fields().map(|(name, _)| name).collect();

        assert_eq!(fields, vec!["firstName", "confirmPassword"]);
        assert_eq!(
            result.errors_for("confirmPassword"),
            Some(&["Passwords do not match".to_string()][..])
        );
    }

    #[test]
    fn test_signup_valid() {
        let data = form(&[
            ("email", "new@user.org"),
            ("firstName", "Ada"),
            ("lastName", "Lovelace"),
            ("password", "Analytical1"),
            ("confirmPassword", "Analytical1"),
        ]);
        let result = validate_form(&data, &auth_rules(AuthMode::Signup, "Analytical1"));
        assert!(result.is_valid());
    }
}
