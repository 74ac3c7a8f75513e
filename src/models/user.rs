use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::store::Document;

/// Account role
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    #[default]
    Citizen,
    Business,
    WardMember,
    Admin,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Citizen => "citizen",
            Role::Business => "business",
            Role::WardMember => "ward_member",
            Role::Admin => "admin",
        }
    }

    /// Roles that moderate a ward
    pub fn is_moderator(&self) -> bool {
        matches!(self, Role::WardMember | Role::Admin)
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "citizen" => Ok(Role::Citizen),
            "business" => Ok(Role::Business),
            "ward_member" => Ok(Role::WardMember),
            "admin" => Ok(Role::Admin),
            other => Err(format!("unknown role '{}'", other)),
        }
    }
}

/// Optional personal details
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Profile {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub age: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub gender: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub blood_group: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub skills: Option<Vec<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub education: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub qualification: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub employment_status: Option<String>,
}

impl Profile {
    /// Overlay the fields present in `update`
    pub fn merge(&mut self, update: Profile) {
        if update.age.is_some() {
            self.age = update.age;
        }
        if update.gender.is_some() {
            self.gender = update.gender;
        }
        if update.blood_group.is_some() {
            self.blood_group = update.blood_group;
        }
        if update.skills.is_some() {
            self.skills = update.skills;
        }
        if update.education.is_some() {
            self.education = update.education;
        }
        if update.qualification.is_some() {
            self.qualification = update.qualification;
        }
        if update.employment_status.is_some() {
            self.employment_status = update.employment_status;
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct User {
    pub id: String,
    pub name: String,
    /// Unique login identifier
    pub phone: String,
    pub password_hash: String,
    #[serde(default)]
    pub role: Role,
    /// Audience matching key
    pub ward: String,
    pub district: String,
    pub state: String,
    #[serde(default)]
    pub profile: Profile,
    #[serde(default)]
    pub is_verified: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expo_push_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl User {
    pub fn new(
        name: String,
        phone: String,
        password_hash: String,
        role: Role,
        ward: String,
        district: String,
        state: String,
    ) -> Self {
        Self {
            id: super::new_id(),
            name,
            phone,
            password_hash,
            role,
            ward,
            district,
            state,
            profile: Profile::default(),
            is_verified: false,
            expo_push_token: None,
            created_at: Utc::now(),
        }
    }
}

impl Document for User {
    const COLLECTION: &'static str = "users";
    const UNIQUE_FIELDS: &'static [&'static str] = &["phone"];

    fn id(&self) -> &str {
        &self.id
    }
}

/// User as returned by the API (no credential material)
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserResponse {
    pub id: String,
    pub name: String,
    pub phone: String,
    pub role: Role,
    pub ward: String,
    pub district: String,
    pub state: String,
    pub profile: Profile,
    pub is_verified: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub expo_push_token: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserResponse {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            name: user.name.clone(),
            phone: user.phone.clone(),
            role: user.role,
            ward: user.ward.clone(),
            district: user.district.clone(),
            state: user.state.clone(),
            profile: user.profile.clone(),
            is_verified: user.is_verified,
            expo_push_token: user.expo_push_token.clone(),
            created_at: user.created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_serde() {
        assert_eq!(serde_json::to_value(Role::WardMember).unwrap(), "ward_member");
        assert_eq!("ward_member".parse::<Role>().unwrap(), Role::WardMember);
        assert!("mayor".parse::<Role>().is_err());
        assert!(Role::Admin.is_moderator());
        assert!(!Role::Business.is_moderator());
    }

    #[test]
    fn test_profile_merge_keeps_missing_fields() {
        let mut profile = Profile {
            age: Some(30),
            gender: Some("f".into()),
            ..Default::default()
        };

        profile.merge(Profile {
            age: Some(31),
            education: Some("BSc".into()),
            ..Default::default()
        });

        assert_eq!(profile.age, Some(31));
        assert_eq!(profile.gender.as_deref(), Some("f"));
        assert_eq!(profile.education.as_deref(), Some("BSc"));
    }

    #[test]
    fn test_response_hides_password_hash() {
        let user = User::new(
            "Asha".into(),
            "9000000001".into(),
            "$argon2id$secret".into(),
            Role::Citizen,
            "Ward 1".into(),
            "D".into(),
            "S".into(),
        );
        let json = serde_json::to_value(UserResponse::from(&user)).unwrap();
        assert!(json.get("passwordHash").is_none());
        assert_eq!(json["role"], "citizen");
    }
}
