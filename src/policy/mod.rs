//! Authorization policy.
//!
//! `authorize` is a pure function of the acting user and the operation being
//! attempted. Rules are checked in a fixed order:
//!
//! 1. admins are allowed everything
//! 2. owners are allowed operations on their own resources
//! 3. ward moderation requires a ward member of the resource's ward
//! 4. role-gated creation checks the actor's role
//! 5. anything else is denied

use std::fmt;

use crate::error::AppError;
use crate::models::{Role, User};
use crate::ward::same_ward;

/// The authenticated user attempting an operation.
#[derive(Debug, Clone)]
pub struct Actor {
    pub id: String,
    pub role: Role,
    pub ward: String,
}

impl From<&User> for Actor {
    fn from(user: &User) -> Self {
        Self {
            id: user.id.clone(),
            role: user.role,
            ward: user.ward.clone(),
        }
    }
}

/// Operations that need an authorization decision.
#[derive(Debug, Clone, Copy)]
pub enum Operation<'a> {
    /// Change a complaint's status or assignment
    UpdateComplaint { ward: &'a str },
    /// List every complaint of a ward
    ListWardComplaints { ward: &'a str },
    /// Read a resource that belongs to `owner`
    ViewOwn { owner: &'a str },
    /// Edit a business listing
    UpdateBusiness { owner: &'a str },
    /// Approve or reject a business listing
    ModerateBusiness,
    CloseEmergency { requester: &'a str },
    PostAnnouncement,
    PostJob,
    RegisterBusiness,
    ManageUsers,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DenyReason {
    NotOwner,
    OtherWard,
    InsufficientRole,
}

impl DenyReason {
    pub fn message(&self) -> &'static str {
        match self {
            DenyReason::NotOwner => "not authorized for this resource",
            DenyReason::OtherWard => "not authorized for this ward",
            DenyReason::InsufficientRole => "insufficient role",
        }
    }
}

impl fmt::Display for DenyReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.message())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(DenyReason),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }

    /// Convert a denial into a 403 error
    pub fn into_result(self) -> Result<(), AppError> {
        match self {
            Decision::Allow => Ok(()),
            Decision::Deny(reason) => Err(AppError::Forbidden(reason.message().to_string())),
        }
    }
}

pub fn authorize(actor: &Actor, operation: Operation<'_>) -> Decision {
    if actor.role == Role::Admin {
        return Decision::Allow;
    }

    match operation {
        Operation::ViewOwn { owner }
        | Operation::UpdateBusiness { owner }
        | Operation::CloseEmergency { requester: owner } => {
            if actor.id == owner {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::NotOwner)
            }
        }
        Operation::UpdateComplaint { ward } | Operation::ListWardComplaints { ward } => {
            if actor.role != Role::WardMember {
                Decision::Deny(DenyReason::InsufficientRole)
            } else if same_ward(&actor.ward, ward) {
                Decision::Allow
            } else {
                Decision::Deny(DenyReason::OtherWard)
            }
        }
        Operation::PostAnnouncement => role_gate(actor, &[Role::WardMember]),
        Operation::PostJob => role_gate(actor, &[Role::Business]),
        Operation::RegisterBusiness => role_gate(actor, &[Role::Citizen, Role::Business]),
        Operation::ModerateBusiness | Operation::ManageUsers => {
            Decision::Deny(DenyReason::InsufficientRole)
        }
    }
}

/// Admins never reach this point, so `allowed` lists the non-admin roles.
fn role_gate(actor: &Actor, allowed: &[Role]) -> Decision {
    if allowed.contains(&actor.role) {
        Decision::Allow
    } else {
        Decision::Deny(DenyReason::InsufficientRole)
    }
}
