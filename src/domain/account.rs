//! User accounts, profile attributes and their input validation.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;

use super::error::JournalError;
use super::trade::UserId;

pub const MIN_USERNAME_LEN: usize = 3;
pub const MIN_PASSWORD_LEN: usize = 8;
pub const MAX_NAME_LEN: usize = 50;

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum RiskPreference {
    Low,
    #[default]
    Med,
    High,
}

impl RiskPreference {
    pub fn as_str(&self) -> &'static str {
        match self {
            RiskPreference::Low => "Low",
            RiskPreference::Med => "Med",
            RiskPreference::High => "High",
        }
    }
}

impl FromStr for RiskPreference {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Low" => Ok(RiskPreference::Low),
            "Med" => Ok(RiskPreference::Med),
            "High" => Ok(RiskPreference::High),
            _ => Err(JournalError::validation(
                "riskPreference",
                "Risk preference must be Low, Med, or High",
            )),
        }
    }
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
pub enum ExperienceLevel {
    #[default]
    Beginner,
    Intermediate,
    Expert,
}

impl ExperienceLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExperienceLevel::Beginner => "Beginner",
            ExperienceLevel::Intermediate => "Intermediate",
            ExperienceLevel::Expert => "Expert",
        }
    }
}

impl FromStr for ExperienceLevel {
    type Err = JournalError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "Beginner" => Ok(ExperienceLevel::Beginner),
            "Intermediate" => Ok(ExperienceLevel::Intermediate),
            "Expert" => Ok(ExperienceLevel::Expert),
            _ => Err(JournalError::validation(
                "experienceLevel",
                "Experience level must be Beginner, Intermediate, or Expert",
            )),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    pub first_name: String,
    pub last_name: String,
    pub risk_preference: RiskPreference,
    pub experience_level: ExperienceLevel,
}

/// A stored user. The password hash is never serialized.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct Account {
    pub id: UserId,
    pub email: String,
    pub username: String,
    #[serde(skip)]
    pub password_hash: String,
    #[serde(flatten)]
    pub profile: Profile,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated registration data, hashed into a [`NewAccount`] by the service.
#[derive(Debug, Clone, PartialEq)]
pub struct ValidRegistration {
    pub email: String,
    pub username: String,
    pub password: String,
    pub profile: Profile,
}

#[derive(Debug, Clone, PartialEq)]
pub struct NewAccount {
    pub email: String,
    pub username: String,
    pub password_hash: String,
    pub profile: Profile,
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileFields {
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub risk_preference: Option<String>,
    pub experience_level: Option<String>,
}

impl ProfileFields {
    fn merge(self, other: Option<ProfileFields>) -> ProfileFields {
        match other {
            Some(nested) => ProfileFields {
                first_name: self.first_name.or(nested.first_name),
                last_name: self.last_name.or(nested.last_name),
                risk_preference: self.risk_preference.or(nested.risk_preference),
                experience_level: self.experience_level.or(nested.experience_level),
            },
            None => self,
        }
    }

    /// Build a profile, taking enum defaults from `current` when absent.
    fn into_profile(self, current: Option<&Profile>) -> Result<Profile, JournalError> {
        let first_name = required_name("firstName", "First name", self.first_name)?;
        let last_name = required_name("lastName", "Last name", self.last_name)?;
        let risk_preference = match self.risk_preference.as_deref() {
            Some(raw) if !raw.is_empty() => raw.parse()?,
            _ => current.map(|p| p.risk_preference).unwrap_or_default(),
        };
        let experience_level = match self.experience_level.as_deref() {
            Some(raw) if !raw.is_empty() => raw.parse()?,
            _ => current.map(|p| p.experience_level).unwrap_or_default(),
        };
        Ok(Profile {
            first_name,
            last_name,
            risk_preference,
            experience_level,
        })
    }
}

/// Registration body. Profile fields may be sent flat or nested under `profile`.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Registration {
    pub email: Option<String>,
    pub password: Option<String>,
    pub username: Option<String>,
    #[serde(flatten)]
    pub fields: ProfileFields,
    pub profile: Option<ProfileFields>,
}

impl Registration {
    pub fn validate(self) -> Result<ValidRegistration, JournalError> {
        let email = normalize_email(self.email.as_deref().unwrap_or(""))?;
        let password = self.password.unwrap_or_default();
        validate_password("password", &password)?;

        let username = self.username.unwrap_or_default().trim().to_string();
        if username.chars().count() < MIN_USERNAME_LEN {
            return Err(JournalError::validation(
                "username",
                format!("Username must be at least {MIN_USERNAME_LEN} characters long"),
            ));
        }

        let profile = self.fields.merge(self.profile).into_profile(None)?;
        Ok(ValidRegistration {
            email,
            username,
            password,
            profile,
        })
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileUpdate {
    #[serde(flatten)]
    pub fields: ProfileFields,
}

impl ProfileUpdate {
    pub fn apply(self, current: &Profile) -> Result<Profile, JournalError> {
        self.fields.into_profile(Some(current))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct LoginRequest {
    pub email: Option<String>,
    pub password: Option<String>,
}

impl LoginRequest {
    /// Returns the normalized email and the password.
    pub fn validate(self) -> Result<(String, String), JournalError> {
        let email = self.email.unwrap_or_default();
        let password = self.password.unwrap_or_default();
        if email.trim().is_empty() || password.is_empty() {
            return Err(JournalError::validation(
                if email.trim().is_empty() { "email" } else { "password" },
                "Please provide email and password",
            ));
        }
        Ok((normalize_email(&email)?, password))
    }
}

#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PasswordChange {
    pub current_password: Option<String>,
    pub new_password: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct DeleteAccount {
    pub confirm: Option<String>,
}

pub const DELETE_CONFIRMATION: &str = "DELETE";

fn required_name(field: &str, label: &str, raw: Option<String>) -> Result<String, JournalError> {
    let name = raw.unwrap_or_default().trim().to_string();
    if name.is_empty() {
        return Err(JournalError::validation(field, format!("{label} is required")));
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(JournalError::validation(
            field,
            format!("{label} cannot be more than {MAX_NAME_LEN} characters"),
        ));
    }
    Ok(name)
}

/// Lower-case and shape-check an email address.
pub fn normalize_email(raw: &str) -> Result<String, JournalError> {
    let email = raw.trim().to_lowercase();
    let invalid = || JournalError::validation("email", "Please provide a valid email address");

    if email.chars().any(char::is_whitespace) {
        return Err(invalid());
    }
    let (local, domain) = email.split_once('@').ok_or_else(invalid)?;
    if local.is_empty() || domain.contains('@') {
        return Err(invalid());
    }
    let labels: Vec<&str> = domain.split('.').collect();
    if labels.len() < 2 || labels.iter().any(|l| l.is_empty()) {
        return Err(invalid());
    }
    Ok(email)
}

pub fn validate_password(field: &str, password: &str) -> Result<(), JournalError> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(JournalError::validation(
            field,
            format!("Password must be at least {MIN_PASSWORD_LEN} characters long"),
        ));
    }
    if !password.chars().any(|c| c.is_ascii_uppercase()) {
        return Err(JournalError::validation(
            field,
            "Password must contain at least one uppercase letter",
        ));
    }
    if !password.chars().any(|c| c.is_ascii_digit()) {
        return Err(JournalError::validation(
            field,
            "Password must contain at least one number",
        ));
    }
    Ok(())
}
