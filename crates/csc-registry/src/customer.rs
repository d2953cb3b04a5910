//! # Customers
//!
//! Customer master data comes from an external registry. The engine only
//! needs the category (which decides whether the customer must hold its own
//! licence) and the qualification status.

use csc_core::{CountryCode, CustomerId};
use serde::{Deserialize, Serialize};

/// Kind of business a customer runs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum CustomerCategory {
    /// Community or retail pharmacy.
    Pharmacy,
    /// Hospital or hospital pharmacy.
    Hospital,
    /// Pharmaceutical wholesaler.
    Wholesaler,
    /// Manufacturer.
    Manufacturer,
    /// Research institution.
    Research,
    /// Veterinary practice.
    Veterinary,
    /// Anything else.
    Other,
}

impl CustomerCategory {
    /// Categories that must hold their own licence for narcotics-listed
    /// substances they receive.
    pub fn requires_own_licence(&self) -> bool {
        matches!(
            self,
            Self::Wholesaler | Self::Pharmacy | Self::Hospital | Self::Manufacturer
        )
    }

    /// String representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pharmacy => "pharmacy",
            Self::Hospital => "hospital",
            Self::Wholesaler => "wholesaler",
            Self::Manufacturer => "manufacturer",
            Self::Research => "research",
            Self::Veterinary => "veterinary",
            Self::Other => "other",
        }
    }
}

impl std::fmt::Display for CustomerCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Outcome of customer due diligence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum QualificationStatus {
    /// Cleared to trade.
    Approved,
    /// Review in progress.
    Pending,
    /// Temporarily blocked.
    Suspended,
    /// Refused.
    Rejected,
}

impl QualificationStatus {
    /// String representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Approved => "approved",
            Self::Pending => "pending",
            Self::Suspended => "suspended",
            Self::Rejected => "rejected",
        }
    }
}

impl std::fmt::Display for QualificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A trading counterparty.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Customer {
    /// Registry identifier.
    pub id: CustomerId,
    /// Legal name.
    pub name: String,
    /// Business category.
    pub category: CustomerCategory,
    /// Country of establishment.
    pub country: CountryCode,
    /// Due-diligence outcome.
    pub qualification: QualificationStatus,
}

impl Customer {
    /// True if the customer may be traded with.
    pub fn is_qualified(&self) -> bool {
        self.qualification == QualificationStatus::Approved
    }
}
