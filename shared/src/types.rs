//! Common types used across the platform

use serde::{Deserialize, Serialize};

/// Direction of an inventory movement
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TransactionKind {
    Restock,
    Deplete,
}

impl TransactionKind {
    /// Normalize loose client input into a transaction kind.
    ///
    /// Older clients send gerund forms ("restocking"/"depleting"); both are
    /// accepted here so new synonyms remain a one-place change.
    pub fn parse(raw: &str) -> Option<Self> {
        match raw.trim().to_ascii_lowercase().as_str() {
            "restock" | "restocking" => Some(TransactionKind::Restock),
            "deplete" | "depleting" => Some(TransactionKind::Deplete),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TransactionKind::Restock => "restock",
            TransactionKind::Deplete => "deplete",
        }
    }
}

/// Role of the caller within a tenant
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TenantRole {
    Manager,
    Member,
}

impl TenantRole {
    /// Parse a role claim; unknown roles fall back to the least privilege.
    pub fn parse(raw: &str) -> Self {
        match raw.trim().to_ascii_lowercase().as_str() {
            "manager" | "admin" | "owner" => TenantRole::Manager,
            _ => TenantRole::Member,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            TenantRole::Manager => "manager",
            TenantRole::Member => "member",
        }
    }
}

/// Default unit of measure for items that have never declared one
pub const DEFAULT_UNIT: &str = "kg";

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_kind_synonyms() {
        assert_eq!(TransactionKind::parse("restock"), Some(TransactionKind::Restock));
        assert_eq!(TransactionKind::parse("restocking"), Some(TransactionKind::Restock));
        assert_eq!(TransactionKind::parse("deplete"), Some(TransactionKind::Deplete));
        assert_eq!(TransactionKind::parse("depleting"), Some(TransactionKind::Deplete));
    }

    #[test]
    fn test_kind_case_and_whitespace() {
        assert_eq!(TransactionKind::parse(" Restocking "), Some(TransactionKind::Restock));
        assert_eq!(TransactionKind::parse("DEPLETE"), Some(TransactionKind::Deplete));
    }

    #[test]
    fn test_kind_rejects_unknown() {
        assert_eq!(TransactionKind::parse("transfer"), None);
        assert_eq!(TransactionKind::parse(""), None);
    }

    #[test]
    fn test_role_parse_least_privilege() {
        assert_eq!(TenantRole::parse("manager"), TenantRole::Manager);
        assert_eq!(TenantRole::parse("Admin"), TenantRole::Manager);
        assert_eq!(TenantRole::parse("viewer"), TenantRole::Member);
        assert_eq!(TenantRole::parse(""), TenantRole::Member);
    }
}
