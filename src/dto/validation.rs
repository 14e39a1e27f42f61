use std::collections::HashMap;

/// Per-field validation messages, keyed by the JSON field name
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ValidationErrors(HashMap<String, String>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a message; the first message for a field wins
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0.entry(field.to_string()).or_insert_with(|| message.into());
    }

    pub fn check(&mut self, field: &str, result: Result<(), String>) {
        if let Err(message) = result {
            self.add(field, message);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.is_empty() {
            Ok(())
        } else {
            Err(self)
        }
    }

    pub fn into_map(self) -> HashMap<String, String> {
        self.0
    }

    pub fn get(&self, field: &str) -> Option<&str> {
        self.0.get(field).map(String::as_str)
    }
}

/// Input checks run by services before anything is staged
pub trait Validate {
    fn validate(&self) -> Result<(), ValidationErrors>;
}

pub fn required(value: &str) -> Result<(), String> {
    if value.trim().is_empty() {
        return Err("Value must not be null or empty!".to_string());
    }
    Ok(())
}

pub fn max_length(value: &str, max: usize) -> Result<(), String> {
    if value.chars().count() > max {
        return Err(format!("Must be at most {} characters", max));
    }
    Ok(())
}

pub fn validate_username_format(username: &str) -> Result<(), String> {
    if username.is_empty() {
        return Err("Username cannot be empty".to_string());
    }
    if username.len() < 3 {
        return Err("Username must be at least 3 characters".to_string());
    }
    if username.len() > 50 {
        return Err("Username must be less than 50 characters".to_string());
    }
    // Allow alphanumeric, underscore, hyphen
    if !username.chars().all(|c| c.is_alphanumeric() || c == '_' || c == '-') {
        return Err("Username can only contain letters, numbers, underscore, and hyphen".to_string());
    }
    if !username.starts_with(|c: char| c.is_alphanumeric()) {
        return Err("Username must start with a letter or number".to_string());
    }
    Ok(())
}

pub fn validate_email_format(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email cannot be empty".to_string());
    }
    let Some((local, domain)) = email.split_once('@') else {
        return Err("Invalid email format".to_string());
    };
    if local.is_empty() || domain.is_empty() || domain.contains('@') || !domain.contains('.') {
        return Err("Invalid email format".to_string());
    }
    Ok(())
}

pub const MIN_PASSWORD_LENGTH: usize = 8;

pub fn validate_password(password: &str) -> Result<(), String> {
    if password.chars().count() < MIN_PASSWORD_LENGTH {
        return Err(format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH));
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn username_rules() {
        assert!(validate_username_format("ali_01").is_ok());
        assert!(validate_username_format("al").is_err());
        assert!(validate_username_format("_ali").is_err());
        assert!(validate_username_format("ali valiyev").is_err());
    }

    #[test]
    fn email_rules() {
        assert!(validate_email_format("ali@zamin.uz").is_ok());
        assert!(validate_email_format("ali.zamin.uz").is_err());
        assert!(validate_email_format("@zamin.uz").is_err());
        assert!(validate_email_format("ali@zamin").is_err());
        assert!(validate_email_format("a@b@c.uz").is_err());
    }

    #[test]
    fn first_message_per_field_wins() {
        let mut errors = ValidationErrors::new();
        errors.check("name", required(""));
        errors.check("name", max_length("x", 0));
        assert_eq!(errors.get("name"), Some("Value must not be null or empty!"));
        assert!(errors.into_result().is_err());
        assert!(ValidationErrors::new().into_result().is_ok());
    }

    #[test]
    fn length_counts_characters() {
        assert!(max_length("o'zbekcha", 9).is_ok());
        assert!(max_length("o'zbekcha", 8).is_err());
        assert!(validate_password("1234567").is_err());
        assert!(validate_password("12345678").is_ok());
    }
}
