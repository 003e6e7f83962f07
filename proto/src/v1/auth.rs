use serde::{Deserialize, Serialize};
use std::fmt;

// Doctors register with an open endpoint and then log in to receive a token.
// The browsable API session login also works, in which case the session
// cookie carries authentication instead and no token is issued.

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct DoctorRegistration {
    pub username: String,
    pub password: String,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct RegistrationResponse {
    pub message: String,
}

#[derive(Serialize, Deserialize, Clone)]
pub struct LoginRequest {
    pub username: String,
    pub password: String,
}

// Never print the password.
impl fmt::Debug for LoginRequest {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("LoginRequest")
            .field("username", &self.username)
            .finish_non_exhaustive()
    }
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct LoginResponse {
    pub token: String,
    pub user_id: u64,
    pub username: String,
    #[serde(default)]
    pub email: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
}

#[derive(Debug, Serialize, Deserialize, Clone, PartialEq, Eq)]
pub struct UserProfile {
    pub id: u64,
    pub username: String,
    #[serde(default)]
    pub first_name: String,
    #[serde(default)]
    pub last_name: String,
    #[serde(default)]
    pub email: String,
}

impl UserProfile {
    /// The name used to greet the user, falling back to a generic title.
    pub fn greeting_name(&self) -> &str {
        if !self.first_name.is_empty() {
            &self.first_name
        } else if !self.username.is_empty() {
            &self.username
        } else {
            "Doctor"
        }
    }
}

impl fmt::Display for UserProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "id: {}", self.id)?;
        writeln!(f, "username: {}", self.username)?;
        writeln!(f, "name: {} {}", self.first_name, self.last_name)?;
        write!(f, "email: {}", self.email)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_login_request_debug_hides_password() {
        let lr = LoginRequest {
            username: "juma".to_string(),
            password: "hunter2".to_string(),
        };
        let s = format!("{:?}", lr);
        assert!(s.contains("juma"));
        assert!(!s.contains("hunter2"));
    }

    #[test]
    fn test_greeting_name_fallbacks() {
        let mut p = UserProfile {
            id: 1,
            username: "juma".to_string(),
            first_name: "Juma".to_string(),
            last_name: String::new(),
            email: String::new(),
        };
        assert_eq!(p.greeting_name(), "Juma");
        p.first_name.clear();
        assert_eq!(p.greeting_name(), "juma");
        p.username.clear();
        assert_eq!(p.greeting_name(), "Doctor");
    }
}
