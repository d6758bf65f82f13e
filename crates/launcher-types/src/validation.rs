//! Input bounds enforced at the API boundary.
//!
//! Lengths are counted in characters except for passwords, which are bounded
//! in bytes because bcrypt only consumes the first 72 bytes of its input.

use thiserror::Error;

pub const MAX_EMAIL_LEN: usize = 254;
pub const MAX_PASSWORD_BYTES: usize = 72;
pub const MAX_FULL_NAME_LEN: usize = 100;
pub const MAX_APP_NAME_LEN: usize = 100;
pub const MAX_DESCRIPTION_LEN: usize = 500;
pub const MAX_CATEGORY_LEN: usize = 50;
pub const MAX_URL_LEN: usize = 2048;
pub const MAX_PREFERENCE_KEYS: usize = 64;
pub const MAX_PREFERENCE_BYTES: usize = 16 * 1024;

/// A single rejected field.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
	pub field: String,
	pub message: String,
}

impl ValidationError {
	pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
		Self {
			field: field.into(),
			message: message.into(),
		}
	}
}

/// Checks that `value` holds between `min` and `max` characters.
pub fn require_len(field: &str, value: &str, min: usize, max: usize) -> Result<(), ValidationError> {
	let len = value.chars().count();
	if len < min {
		return Err(if min == 1 {
			ValidationError::new(field, "must not be empty")
		} else {
			ValidationError::new(field, format!("must be at least {min} characters"))
		});
	}
	if len > max {
		return Err(ValidationError::new(
			field,
			format!("must be at most {max} characters"),
		));
	}
	Ok(())
}

/// Light structural check: one `@`, a non-empty local part and a dotted domain.
pub fn validate_email(email: &str) -> Result<(), ValidationError> {
	require_len("email", email, 1, MAX_EMAIL_LEN)?;
	if email.chars().any(char::is_whitespace) {
		return Err(ValidationError::new("email", "must not contain whitespace"));
	}

	let mut parts = email.split('@');
	let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
		return Err(ValidationError::new("email", "must contain exactly one '@'"));
	};
	if local.is_empty() {
		return Err(ValidationError::new("email", "missing local part"));
	}

	let labels: Vec<&str> = domain.split('.').collect();
	if labels.len() < 2 || labels.iter().any(|label| label.is_empty()) {
		return Err(ValidationError::new("email", "domain must be dotted"));
	}
	Ok(())
}

pub fn validate_password(password: &str) -> Result<(), ValidationError> {
	if password.is_empty() {
		return Err(ValidationError::new("password", "must not be empty"));
	}
	if password.len() > MAX_PASSWORD_BYTES {
		return Err(ValidationError::new(
			"password",
			format!("must be at most {MAX_PASSWORD_BYTES} bytes"),
		));
	}
	Ok(())
}

pub fn validate_full_name(full_name: &str) -> Result<(), ValidationError> {
	require_len("full_name", full_name, 1, MAX_FULL_NAME_LEN)
}

#[cfg(test)]
mod tests {
	use super::*;

	#[test]
	fn test_email_shapes() {
		assert!(validate_email("a@x.com").is_ok());
		assert!(validate_email("first.last@mail.example.org").is_ok());

		for bad in ["", "ax.com", "a@@x.com", "a@b@x.com", "@x.com", "a@x", "a@x.", "a@.com", "a b@x.com"] {
			let err = validate_email(bad).unwrap_err();
			assert_eq!(err.field, "email", "{bad} should be rejected");
		}
	}

	#[test]
	fn test_email_length_limit() {
		let long = format!("{}@x.com", "a".repeat(MAX_EMAIL_LEN));
		assert!(validate_email(&long).is_err());
	}

	#[test]
	fn test_password_bounds_are_bytes() {
		assert!(validate_password("p").is_ok());
		assert!(validate_password(&"a".repeat(72)).is_ok());
		assert!(validate_password(&"a".repeat(73)).is_err());
		// 36 two-byte characters fit, 37 do not
		assert!(validate_password(&"é".repeat(36)).is_ok());
		assert!(validate_password(&"é".repeat(37)).is_err());
		assert!(validate_password("").is_err());
	}

	#[test]
	fn test_require_len_counts_chars() {
		assert!(require_len("name", "日本語", 1, 3).is_ok());
		assert!(require_len("name", "日本語x", 1, 3).is_err());
		assert_eq!(
			require_len("name", "", 1, 3).unwrap_err().to_string(),
			"name: must not be empty"
		);
	}
}
