use std::borrow::Cow;

use validator::{ValidateEmail, ValidateUrl, ValidationError};

const WEB_SCHEMES: [&str; 2] = ["http", "https"];

/// True when `value` is an absolute `http`/`https` URL with a host.
pub fn is_web_url(value: &str) -> bool {
    let value = value.trim();
    let Some((scheme, rest)) = value.split_once(':') else {
        return false;
    };

    let scheme = scheme.to_ascii_lowercase();
    if !WEB_SCHEMES.contains(&scheme.as_str()) {
        return false;
    }

    let Some(authority) = rest.strip_prefix("//") else {
        return false;
    };
    let host_present = authority
        .split(['/', '?', '#'])
        .next()
        .is_some_and(|host| !host.is_empty());

    host_present && value.validate_url()
}

pub fn validate_web_url(value: &str) -> Result<(), ValidationError> {
    if is_web_url(value) {
        Ok(())
    } else {
        Err(ValidationError::new("web_url")
            .with_message(Cow::from("URL must start with http:// or https://")))
    }
}

/// Like [`validate_web_url`], but an empty value (a clear) passes.
pub fn validate_clearable_web_url(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() {
        Ok(())
    } else {
        validate_web_url(value)
    }
}

pub fn validate_clearable_email(value: &str) -> Result<(), ValidationError> {
    if value.is_empty() || value.validate_email() {
        Ok(())
    } else {
        Err(ValidationError::new("email"))
    }
}

pub fn validate_non_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        Err(ValidationError::new("blank"))
    } else {
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepts_http_and_https() {
        assert!(is_web_url("https://example.com"));
        assert!(is_web_url("http://example.com/menu?x=1"));
        assert!(is_web_url("HTTPS://Example.com"));
    }

    #[test]
    fn rejects_script_and_other_schemes() {
        assert!(!is_web_url("javascript:alert(1)"));
        assert!(!is_web_url("JavaScript://alert(1)"));
        assert!(!is_web_url("data:text/html;base64,AAAA"));
        assert!(!is_web_url("ftp://example.com"));
        assert!(!is_web_url("example.com"));
        assert!(!is_web_url("https://"));
    }

    #[test]
    fn empty_values_clear_instead_of_failing() {
        assert!(validate_clearable_web_url("").is_ok());
        assert!(validate_clearable_web_url("javascript:alert(1)").is_err());
        assert!(validate_clearable_email("").is_ok());
        assert!(validate_clearable_email("owner@example.com").is_ok());
        assert!(validate_clearable_email("not-an-email").is_err());
    }

    #[test]
    fn blank_values_fail() {
        assert!(validate_non_blank("   ").is_err());
        assert!(validate_non_blank("Phoenix").is_ok());
    }
}
