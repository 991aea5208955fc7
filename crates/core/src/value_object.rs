//! Value object trait: equality by value, not identity.

/// Marker trait for value objects.
///
/// Value objects are **immutable** and **compared by value**. To "modify" one,
/// build a new instance; every operation on `Money` and `Email` returns a new
/// value and validates on construction, so an existing value is always valid.
///
/// - **Value Object**: `Money { 13.50 EUR }`, `Email("owner@bistro.fr")`
/// - **Entity**: `OrderItem { id, .. }` (identity inside its order)
pub trait ValueObject: Clone + PartialEq + core::fmt::Debug {}
