//! Domain types for accounts and the referral hierarchy.
//!
//! Identifiers are newtypes so an account id can never be confused with a
//! raw row id or a depth value.

pub mod validation;

use serde::{Deserialize, Serialize};
use std::fmt;

/// Unique identifier for an account.
///
/// # Examples
///
/// ```rust
/// use kinship::domain::AccountId;
///
/// let id = AccountId::new(42);
/// assert_eq!(id.value(), 42);
/// assert_eq!(id.to_string(), "42");
/// ```
#[derive(
    Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize,
)]
#[serde(transparent)]
pub struct AccountId(i32);

impl AccountId {
    /// Creates a new `AccountId` from a raw row id.
    ///
    /// # Panics
    ///
    /// Panics in debug mode if `id` is negative.
    #[must_use]
    pub const fn new(id: i32) -> Self {
        debug_assert!(id >= 0, "AccountId should be non-negative");
        Self(id)
    }

    #[must_use]
    pub const fn value(&self) -> i32 {
        self.0
    }
}

impl fmt::Display for AccountId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<AccountId> for i32 {
    fn from(id: AccountId) -> Self {
        id.0
    }
}

impl From<i32> for AccountId {
    fn from(id: i32) -> Self {
        Self::new(id)
    }
}

/// One closure row: `ancestor` reaches `descendant` in `depth` parent links.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct HierarchyEdge {
    pub ancestor: AccountId,
    pub descendant: AccountId,
    pub depth: u32,
}

impl HierarchyEdge {
    #[must_use]
    pub const fn new(ancestor: AccountId, descendant: AccountId, depth: u32) -> Self {
        Self {
            ancestor,
            descendant,
            depth,
        }
    }

    /// The zero-length edge every attached account has to itself.
    #[must_use]
    pub const fn self_edge(account: AccountId) -> Self {
        Self::new(account, account, 0)
    }

    #[must_use]
    pub const fn is_self_edge(&self) -> bool {
        self.depth == 0
    }
}

/// An account seen from another account's position in the tree.
///
/// For an ancestor query `account` is the ancestor; for a descendant query
/// it is the descendant.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Relative {
    pub account: AccountId,
    pub depth: u32,
}

impl Relative {
    #[must_use]
    pub const fn new(account: AccountId, depth: u32) -> Self {
        Self { account, depth }
    }
}

/// What registration does with a parent referral code that does not resolve
/// to an attached account.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ParentPolicy {
    /// Reject the registration.
    #[default]
    Strict,
    /// Register the account as a new root and log a warning.
    Lenient,
}

impl ParentPolicy {
    #[must_use]
    pub const fn is_strict(self) -> bool {
        matches!(self, Self::Strict)
    }
}

impl fmt::Display for ParentPolicy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Strict => write!(f, "strict"),
            Self::Lenient => write!(f, "lenient"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn account_id_conversions() {
        let id = AccountId::new(42);
        assert_eq!(id.value(), 42);
        assert_eq!(id.to_string(), "42");
        assert_eq!(i32::from(id), 42);
        assert_eq!(AccountId::from(42), id);
    }

    #[test]
    fn account_id_serializes_as_number() {
        let json = serde_json::to_string(&AccountId::new(7)).unwrap();
        assert_eq!(json, "7");
        let back: AccountId = serde_json::from_str(&json).unwrap();
        assert_eq!(back, AccountId::new(7));
    }

    #[test]
    fn self_edge_has_zero_depth() {
        let edge = HierarchyEdge::self_edge(AccountId::new(3));
        assert_eq!(edge.ancestor, edge.descendant);
        assert!(edge.is_self_edge());
    }

    #[test]
    fn parent_policy_parses_lowercase() {
        #[derive(Deserialize)]
        struct Wrapper {
            policy: ParentPolicy,
        }

        let strict: Wrapper = toml::from_str("policy = \"strict\"").unwrap();
        let lenient: Wrapper = toml::from_str("policy = \"lenient\"").unwrap();
        assert_eq!(strict.policy, ParentPolicy::Strict);
        assert_eq!(lenient.policy, ParentPolicy::Lenient);
        assert!(ParentPolicy::default().is_strict());
    }
}
