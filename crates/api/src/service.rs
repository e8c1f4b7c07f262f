//! Validation helpers shared by route handlers, kept transport-free so the
//! handlers stay thin adapters.

use crate::ServiceError;

/// Validate and normalize an email address. Returns the lowercased, trimmed email.
pub fn validate_email(email: &str) -> Result<String, ServiceError> {
    let email = email.trim().to_lowercase();
    if email.is_empty() || !email.contains('@') || email.len() > 254 {
        return Err(ServiceError::BadRequest("invalid email address".into()));
    }
    Ok(email)
}

/// Validate and normalize a display name. Returns the trimmed name.
pub fn validate_display_name(name: &str) -> Result<String, ServiceError> {
    let trimmed = name.trim().to_string();
    if trimmed.is_empty() || trimmed.len() > 64 {
        return Err(ServiceError::BadRequest(
            "display name must be 1-64 characters".into(),
        ));
    }
    Ok(trimmed)
}

/// IRZ+ credentials are forwarded to the ARiMR SSO verbatim; only reject
/// what could never authenticate.
pub fn validate_irz_credentials(login: &str, password: &str) -> Result<(), ServiceError> {
    if login.trim().is_empty() || password.is_empty() {
        return Err(ServiceError::BadRequest(
            "IRZ login and password must not be empty".into(),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_is_normalized() {
        assert_eq!(
            validate_email("  Jan.Kowalski@Example.PL ").unwrap(),
            "jan.kowalski@example.pl"
        );
        assert!(validate_email("not-an-email").is_err());
        assert!(validate_email("").is_err());
    }

    #[test]
    fn display_name_bounds() {
        assert_eq!(validate_display_name(" Jan ").unwrap(), "Jan");
        assert!(validate_display_name("   ").is_err());
        assert!(validate_display_name(&"x".repeat(65)).is_err());
    }

    #[test]
    fn irz_credentials_must_be_non_empty() {
        assert!(validate_irz_credentials("user", "pass").is_ok());
        assert!(validate_irz_credentials(" ", "pass").is_err());
        assert!(validate_irz_credentials("user", "").is_err());
    }
}
