//! # Substances and Reclassification History
//!
//! A substance is classified on two independent axes: the narcotics list it
//! appears on and its precursor category. Regulators move substances between
//! categories over time; each move is a [`ReclassificationEvent`] with an
//! effective calendar date. The history is stored in recording order and is
//! not required to be sorted by effective date.

use chrono::NaiveDate;
use csc_core::{ReclassificationId, SubstanceCode};
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

/// Narcotics schedule a substance is listed on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum NarcoticsList {
    /// Not a listed narcotic.
    #[serde(rename = "none")]
    None,
    /// List I.
    I,
    /// List II.
    II,
    /// List III.
    III,
    /// List IV.
    IV,
    /// List V.
    V,
}

impl NarcoticsList {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::I => "I",
            Self::II => "II",
            Self::III => "III",
            Self::IV => "IV",
            Self::V => "V",
        }
    }

    /// True for every list other than `none`.
    pub fn is_listed(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl std::fmt::Display for NarcoticsList {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Drug-precursor category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum PrecursorCategory {
    /// Not a scheduled precursor.
    #[serde(rename = "none")]
    None,
    /// Category 1.
    #[serde(rename = "1")]
    Category1,
    /// Category 2A.
    #[serde(rename = "2A")]
    Category2A,
    /// Category 2B.
    #[serde(rename = "2B")]
    Category2B,
    /// Category 3.
    #[serde(rename = "3")]
    Category3,
    /// Category 4.
    #[serde(rename = "4")]
    Category4,
}

impl PrecursorCategory {
    /// Wire representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::None => "none",
            Self::Category1 => "1",
            Self::Category2A => "2A",
            Self::Category2B => "2B",
            Self::Category3 => "3",
            Self::Category4 => "4",
        }
    }

    /// True for every category other than `none`.
    pub fn is_scheduled(&self) -> bool {
        !matches!(self, Self::None)
    }
}

impl std::fmt::Display for PrecursorCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// The classification pair in force for a substance at some point in time.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Classification {
    /// Narcotics list axis.
    pub narcotics: NarcoticsList,
    /// Precursor category axis.
    pub precursor: PrecursorCategory,
}

impl Classification {
    /// Neither a listed narcotic nor a scheduled precursor.
    pub const UNCONTROLLED: Self = Self {
        narcotics: NarcoticsList::None,
        precursor: PrecursorCategory::None,
    };

    /// Build a classification pair.
    pub fn new(narcotics: NarcoticsList, precursor: PrecursorCategory) -> Self {
        Self {
            narcotics,
            precursor,
        }
    }

    /// A narcotic with no precursor scheduling.
    pub fn narcotic(list: NarcoticsList) -> Self {
        Self::new(list, PrecursorCategory::None)
    }

    /// A precursor with no narcotics listing.
    pub fn precursor(category: PrecursorCategory) -> Self {
        Self::new(NarcoticsList::None, category)
    }

    /// True if at least one axis is not `none`.
    pub fn is_controlled(&self) -> bool {
        self.narcotics.is_listed() || self.precursor.is_scheduled()
    }
}

impl std::fmt::Display for Classification {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "narcotics {} / precursor {}", self.narcotics, self.precursor)
    }
}

/// Processing state of a reclassification.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReclassificationStatus {
    /// Announced, not yet applied.
    Pending,
    /// Applied; participates in classification resolution.
    Completed,
    /// Withdrawn before completion.
    Cancelled,
}

impl ReclassificationStatus {
    /// String representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Completed => "completed",
            Self::Cancelled => "cancelled",
        }
    }
}

impl std::fmt::Display for ReclassificationStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One regulator-driven change of a substance's classification.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ReclassificationEvent {
    /// Identifier of the event.
    #[serde(default)]
    pub id: ReclassificationId,
    /// Classification in force before the change.
    pub previous: Classification,
    /// Classification in force from `effective_date` on.
    pub new: Classification,
    /// First calendar day on which `new` applies.
    pub effective_date: NaiveDate,
    /// Processing state.
    pub status: ReclassificationStatus,
    /// Gazette or decree citation.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub regulatory_reference: Option<String>,
}

impl ReclassificationEvent {
    /// True if the event participates in resolution.
    pub fn is_completed(&self) -> bool {
        self.status == ReclassificationStatus::Completed
    }
}

/// A controlled substance and its classification history.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Substance {
    /// Business key.
    pub code: SubstanceCode,
    /// Display name.
    #[serde(default)]
    pub name: String,
    /// The classification currently in force.
    pub classification: Classification,
    /// Reclassifications in recording order.
    #[serde(default)]
    pub reclassifications: Vec<ReclassificationEvent>,
}

impl Substance {
    /// A substance with no reclassification history.
    pub fn new(code: SubstanceCode, name: impl Into<String>, classification: Classification) -> Self {
        Self {
            code,
            name: name.into(),
            classification,
            reclassifications: Vec::new(),
        }
    }

    /// Completed events paired with their recording position.
    pub fn completed_reclassifications(&self) -> impl Iterator<Item = (usize, &ReclassificationEvent)> {
        self.reclassifications
            .iter()
            .enumerate()
            .filter(|(_, event)| event.is_completed())
    }

    /// Check structural invariants.
    ///
    /// The current classification must be controlled, and no completed
    /// reclassification may move the substance to both-`none`.
    pub fn validate(&self) -> Result<(), RegistryError> {
        if !self.classification.is_controlled() {
            return Err(RegistryError::InvalidSubstance {
                code: self.code.clone(),
                reason: "current classification is none on both axes".to_string(),
            });
        }
        if let Some((_, event)) = self
            .completed_reclassifications()
            .find(|(_, event)| !event.new.is_controlled())
        {
            return Err(RegistryError::InvalidSubstance {
                code: self.code.clone(),
                reason: format!(
                    "completed reclassification {} effective {} sets both axes to none",
                    event.id, event.effective_date
                ),
            });
        }
        Ok(())
    }
}
