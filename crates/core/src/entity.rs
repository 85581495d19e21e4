//! Entity trait: identity + continuity across state changes.

/// Entity marker + minimal interface.
///
/// Accounts, profiles and grants are entities: two values with the same id
/// are the same record, whatever their other attributes say.
pub trait Entity {
    /// Strongly-typed entity identifier.
    type Id: Copy + Eq + core::hash::Hash + core::fmt::Debug;

    /// Returns the entity identifier.
    fn id(&self) -> Self::Id;
}
