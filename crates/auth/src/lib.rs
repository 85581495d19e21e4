//! `gala-auth` — accounts, roles, statuses, permission grants and the pure
//! authorization decision layer.
//!
//! This crate is intentionally decoupled from storage and transport.

pub mod account;
pub mod authorize;
pub mod grant;
pub mod password;
pub mod permissions;
pub mod principal;
pub mod profile;
pub mod roles;
pub mod status;

pub use account::{
    Account, AccountError, Address, ContactDetails, EmergencyContact, HrDetails, NewAccount,
    Registration, RegistrationDefaults, normalize_email,
};
pub use authorize::{
    AuthzError, Capability, Check, DecisionExplanation, authorize, authorize_permission,
    can_approve_users, can_manage_users, explain, has_capability, has_custom_permission,
    is_hr_staff,
};
pub use grant::{PermissionGrant, valid_permission_names};
pub use password::{PasswordError, PasswordHash, PasswordPolicy};
pub use permissions::PermissionName;
pub use principal::{AccessSubject, Principal};
pub use profile::{Preferences, Profile, ProfileEntry, ProfileUpdate, SocialLinks};
pub use roles::{Role, role_at_least};
pub use status::{AccountStatus, TransitionPolicy};
