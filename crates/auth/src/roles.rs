use core::cmp::Ordering;
use core::str::FromStr;

use serde::{Deserialize, Serialize};

use gala_core::DomainError;

/// An account's position on the fixed six-level authority scale.
///
/// The scale is linear: every pair of roles is comparable through
/// [`Role::rank`]. Ordering never looks at the role codes themselves.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum Role {
    Guest,
    #[default]
    Employee,
    HrAssistant,
    HrManager,
    HrAdmin,
    SuperAdmin,
}

impl Role {
    /// Every role, lowest rank first.
    pub const ALL: [Role; 6] = [
        Role::Guest,
        Role::Employee,
        Role::HrAssistant,
        Role::HrManager,
        Role::HrAdmin,
        Role::SuperAdmin,
    ];

    pub const fn rank(self) -> u8 {
        match self {
            Role::Guest => 0,
            Role::Employee => 1,
            Role::HrAssistant => 2,
            Role::HrManager => 3,
            Role::HrAdmin => 4,
            Role::SuperAdmin => 5,
        }
    }

    /// Stable code used in storage and on the wire.
    pub const fn code(self) -> &'static str {
        match self {
            Role::Guest => "GUEST",
            Role::Employee => "EMPLOYEE",
            Role::HrAssistant => "HR_ASSISTANT",
            Role::HrManager => "HR_MANAGER",
            Role::HrAdmin => "HR_ADMIN",
            Role::SuperAdmin => "SUPER_ADMIN",
        }
    }

    /// Human-readable name.
    pub const fn label(self) -> &'static str {
        match self {
            Role::Guest => "Guest",
            Role::Employee => "Employee",
            Role::HrAssistant => "HR Assistant",
            Role::HrManager => "HR Manager",
            Role::HrAdmin => "HR Admin",
            Role::SuperAdmin => "Super Admin",
        }
    }

    pub fn at_least(self, other: Role) -> bool {
        role_at_least(self, other)
    }
}

/// True iff `a` ranks at or above `b`.
pub fn role_at_least(a: Role, b: Role) -> bool {
    a.rank() >= b.rank()
}

impl PartialOrd for Role {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Role {
    fn cmp(&self, other: &Self) -> Ordering {
        self.rank().cmp(&other.rank())
    }
}

impl FromStr for Role {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Role::ALL
            .into_iter()
            .find(|role| role.code() == s)
            .ok_or_else(|| DomainError::validation(format!("unknown role code '{s}'")))
    }
}

impl core::fmt::Display for Role {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.code())
    }
}
