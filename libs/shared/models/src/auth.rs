use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::error::AppError;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Admin,
    Doctor,
    Receptionist,
    User,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Admin => "admin",
            Role::Doctor => "doctor",
            Role::Receptionist => "receptionist",
            Role::User => "user",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = AppError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(Role::Admin),
            "doctor" => Ok(Role::Doctor),
            "receptionist" => Ok(Role::Receptionist),
            "user" => Ok(Role::User),
            other => Err(AppError::Auth(format!("Unknown role: {}", other))),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Resource {
    Appointments,
    TestResults,
    MedicalRecords,
    Availability,
    Prescriptions,
    Recommendations,
    Users,
    Patients,
    Doctors,
    Rooms,
    Specializations,
    Logs,
    Queues,
    Statistics,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Action {
    Create,
    Read,
    List,
    Update,
    Delete,
    View,
}

/// Authenticated user resolved from the session cookie.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionUser {
    pub id: String,
    pub name: String,
    pub email: String,
    pub role: Role,
    pub email_verified: bool,
    pub session_id: String,
}

impl SessionUser {
    pub fn has_role(&self, role: Role) -> bool {
        self.role == role
    }
}

pub fn role_allows(role: Role, resource: Resource, action: Action) -> bool {
    use Action::*;
    use Resource::*;

    match role {
        Role::Admin => true,
        Role::Doctor => match resource {
            Appointments => matches!(action, Read | List | Update),
            Users => matches!(action, Read | List),
            Availability => matches!(action, Read | List | Create | Update),
            Prescriptions | Recommendations => matches!(action, Read | List | Create),
            TestResults | MedicalRecords => matches!(action, Read | List | Create),
            Patients => matches!(action, Read | List),
            _ => false,
        },
        Role::Receptionist => match resource {
            Appointments => matches!(action, Read | List | Create | Update),
            Patients | Users => matches!(action, Read | List),
            Availability => matches!(action, Read | List | Update),
            Rooms => matches!(action, Read | List),
            Doctors | Specializations => matches!(action, List),
            Statistics => matches!(action, View),
            _ => false,
        },
        Role::User => match resource {
            Appointments => matches!(action, Read | List | Create | Update),
            TestResults | MedicalRecords | Recommendations => matches!(action, Read | List),
            Prescriptions => matches!(action, Read | List | Update),
            Specializations => matches!(action, List),
            _ => false,
        },
    }
}

pub fn require_permission(
    user: &SessionUser,
    resource: Resource,
    actions: &[Action],
) -> Result<(), AppError> {
    if actions.iter().all(|action| role_allows(user.role, resource, *action)) {
        Ok(())
    } else {
        tracing::warn!(
            "User {} with role {} denied {:?} on {:?}",
            user.id,
            user.role,
            actions,
            resource
        );
        Err(AppError::forbidden())
    }
}

pub fn require_role(user: &SessionUser, roles: &[Role]) -> Result<(), AppError> {
    if roles.contains(&user.role) {
        Ok(())
    } else {
        Err(AppError::forbidden())
    }
}
