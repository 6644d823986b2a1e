use crate::utils::error::{DigestError, Result};
use url::Url;

pub trait Validate {
    fn validate(&self) -> Result<()>;
}

fn invalid(field_name: &str, value: &str, reason: impl Into<String>) -> DigestError {
    DigestError::InvalidConfigValueError {
        field: field_name.to_string(),
        value: value.to_string(),
        reason: reason.into(),
    }
}

pub fn validate_url(field_name: &str, url_str: &str) -> Result<()> {
    if url_str.is_empty() {
        return Err(invalid(field_name, url_str, "URL cannot be empty"));
    }

    match Url::parse(url_str) {
        Ok(url) => match url.scheme() {
            "http" | "https" => Ok(()),
            scheme => Err(invalid(
                field_name,
                url_str,
                format!("Unsupported URL scheme: {}", scheme),
            )),
        },
        Err(e) => Err(invalid(
            field_name,
            url_str,
            format!("Invalid URL format: {}", e),
        )),
    }
}

pub fn validate_path(field_name: &str, path: &str) -> Result<()> {
    if path.trim().is_empty() {
        return Err(invalid(field_name, path, "Path cannot be empty"));
    }

    if path.contains('\0') {
        return Err(invalid(field_name, path, "Path contains null bytes"));
    }

    Ok(())
}

pub fn validate_positive_number(field_name: &str, value: usize, min_value: usize) -> Result<()> {
    if value < min_value {
        return Err(invalid(
            field_name,
            &value.to_string(),
            format!("Value must be at least {}", min_value),
        ));
    }
    Ok(())
}

/// Required secrets and identifiers: empty means "not configured".
pub fn validate_required_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(DigestError::MissingConfigError {
            field: field_name.to_string(),
        });
    }
    validate_resolved(field_name, value)
}

pub fn validate_non_empty_string(field_name: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(invalid(
            field_name,
            value,
            "Value cannot be empty or whitespace-only",
        ));
    }
    Ok(())
}

/// A `${VAR}` left in place means the variable was not set when the config
/// file was loaded.
pub fn validate_resolved(field_name: &str, value: &str) -> Result<()> {
    if value.contains("${") {
        return Err(DigestError::MissingConfigError {
            field: format!("{} (unresolved placeholder)", field_name),
        });
    }
    Ok(())
}

pub fn validate_email(field_name: &str, value: &str) -> Result<()> {
    validate_required_string(field_name, value)?;
    value
        .parse::<lettre::Address>()
        .map(|_| ())
        .map_err(|e| invalid(field_name, value, format!("Invalid email address: {}", e)))
}

pub fn validate_range<T: PartialOrd + std::fmt::Display + Copy>(
    field_name: &str,
    value: T,
    min: T,
    max: T,
) -> Result<()> {
    if value < min || value > max {
        return Err(invalid(
            field_name,
            &value.to_string(),
            format!("Value must be between {} and {}", min, max),
        ));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_validate_url() {
        assert!(validate_url("search.endpoint", "https://api.adzuna.com/v1/api/jobs").is_ok());
        assert!(validate_url("search.endpoint", "http://127.0.0.1:8080").is_ok());
        assert!(validate_url("search.endpoint", "").is_err());
        assert!(validate_url("search.endpoint", "invalid-url").is_err());
        assert!(validate_url("search.endpoint", "ftp://example.com").is_err());
    }

    #[test]
    fn test_validate_required_string() {
        assert!(validate_required_string("search.app_id", "a68048d5").is_ok());
        assert!(matches!(
            validate_required_string("search.app_id", "  "),
            Err(DigestError::MissingConfigError { .. })
        ));
        assert!(matches!(
            validate_required_string("search.app_id", "${ADZUNA_APP_ID}"),
            Err(DigestError::MissingConfigError { .. })
        ));
    }

    #[test]
    fn test_validate_email() {
        assert!(validate_email("mail.from", "jobs@example.com").is_ok());
        assert!(validate_email("mail.from", "not-an-address").is_err());
        assert!(validate_email("mail.from", "").is_err());
    }

    #[test]
    fn test_validate_range() {
        assert!(validate_range("search.max_pages", 5u32, 1, 20).is_ok());
        assert!(validate_range("search.max_pages", 0u32, 1, 20).is_err());
        assert!(validate_range("search.max_pages", 21u32, 1, 20).is_err());
    }

    #[test]
    fn test_validate_path() {
        assert!(validate_path("ledger.path", "sent_jobs.txt").is_ok());
        assert!(validate_path("ledger.path", "").is_err());
        assert!(validate_path("ledger.path", "bad\0path").is_err());
    }
}
