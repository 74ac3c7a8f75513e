use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::store::Document;

/// ABO/Rh blood group
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum BloodGroup {
    #[serde(rename = "A+")]
    APos,
    #[serde(rename = "A-")]
    ANeg,
    #[serde(rename = "B+")]
    BPos,
    #[serde(rename = "B-")]
    BNeg,
    #[serde(rename = "AB+")]
    AbPos,
    #[serde(rename = "AB-")]
    AbNeg,
    #[serde(rename = "O+")]
    OPos,
    #[serde(rename = "O-")]
    ONeg,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid blood group '{0}'")]
pub struct ParseBloodGroupError(pub String);

impl BloodGroup {
    pub const ALL: [BloodGroup; 8] = [
        BloodGroup::APos,
        BloodGroup::ANeg,
        BloodGroup::BPos,
        BloodGroup::BNeg,
        BloodGroup::AbPos,
        BloodGroup::AbNeg,
        BloodGroup::OPos,
        BloodGroup::ONeg,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            BloodGroup::APos => "A+",
            BloodGroup::ANeg => "A-",
            BloodGroup::BPos => "B+",
            BloodGroup::BNeg => "B-",
            BloodGroup::AbPos => "AB+",
            BloodGroup::AbNeg => "AB-",
            BloodGroup::OPos => "O+",
            BloodGroup::ONeg => "O-",
        }
    }

    /// Groups a recipient of this group can receive from
    pub fn compatible_donors(&self) -> &'static [BloodGroup] {
        use BloodGroup::*;
        match self {
            APos => &[APos, ANeg, OPos, ONeg],
            ANeg => &[ANeg, ONeg],
            BPos => &[BPos, BNeg, OPos, ONeg],
            BNeg => &[BNeg, ONeg],
            AbPos => &Self::ALL,
            AbNeg => &[ANeg, BNeg, AbNeg, ONeg],
            OPos => &[OPos, ONeg],
            ONeg => &[ONeg],
        }
    }

    pub fn can_receive_from(&self, donor: BloodGroup) -> bool {
        self.compatible_donors().contains(&donor)
    }
}

impl fmt::Display for BloodGroup {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for BloodGroup {
    type Err = ParseBloodGroupError;

    /// Accepts `"A+"`, `"ab-"`, and `"A "` (a `+` that arrived URL-decoded
    /// as a space in a query string).
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let trimmed = s.trim_start();
        let base = trimmed.trim_end();
        let normalized = if trimmed.ends_with(' ') && !base.ends_with(['+', '-']) {
            format!("{}+", base)
        } else {
            base.to_string()
        }
        .to_uppercase();

        Self::ALL
            .iter()
            .copied()
            .find(|g| g.as_str() == normalized)
            .ok_or_else(|| ParseBloodGroupError(s.to_string()))
    }
}

/// Donor registration. The document id is the registering user's id, so a
/// user has at most one donor record.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BloodDonor {
    pub id: String,
    pub user: String,
    pub blood_group: BloodGroup,
    #[serde(default = "default_available")]
    pub is_available: bool,
    pub contact_number: String,
    pub ward: String,
    pub district: String,
    pub state: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub last_donation_date: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

fn default_available() -> bool {
    true
}

impl BloodDonor {
    pub fn new(
        user: &super::User,
        blood_group: BloodGroup,
        contact_number: String,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: user.id.clone(),
            user: user.id.clone(),
            blood_group,
            is_available: true,
            contact_number,
            ward: user.ward.clone(),
            district: user.district.clone(),
            state: user.state.clone(),
            last_donation_date: None,
            created_at: now,
            updated_at: now,
        }
    }
}

impl Document for BloodDonor {
    const COLLECTION: &'static str = "blood_donors";

    fn id(&self) -> &str {
        &self.id
    }
}
