//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Addresses, emergency contacts and social links carry no identity of their
/// own; they are replaced wholesale rather than edited in place.
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {
    /// True when no attribute carries a value.
    fn is_blank(&self) -> bool;
}
