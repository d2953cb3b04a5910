//! # Licences and Substance Mappings
//!
//! A licence authorizes its holder to perform a set of [`Activity`] values
//! on the substances listed in its [`SubstanceMapping`] entries, within a
//! validity window. Mappings may narrow the window, restrict the activity,
//! and cap quantities per transaction or per period.
//!
//! ## Effective Validity
//!
//! [`Licence::validity_on`] folds status, issue date, expiry and grace
//! period into a single [`LicenceValidity`]:
//!
//! | Condition                                          | Result            |
//! |----------------------------------------------------|-------------------|
//! | status `revoked`                                   | `Revoked`         |
//! | status `suspended`                                 | `Suspended`       |
//! | date before issue date                             | `NotYetEffective` |
//! | not past expiry and status not `expired`           | `Valid`           |
//! | past expiry, grace-period end set and after date   | `InGracePeriod`   |
//! | otherwise                                          | `Expired`         |
//!
//! The expiry date itself is still a valid day.

use std::str::FromStr;

use chrono::NaiveDate;
use csc_core::{CustomerId, Flag, FlagSet, LicenceId, SubstanceCode};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::error::RegistryError;

// ---------------------------------------------------------------------------
// Activities
// ---------------------------------------------------------------------------

/// An activity a licence may permit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Activity {
    /// Hold stock.
    Possess,
    /// Keep stock at a site.
    Store,
    /// Sell or deliver domestically.
    Distribute,
    /// Bring stock across a border.
    Import,
    /// Send stock across a border.
    Export,
    /// Produce the substance.
    Manufacture,
    /// Handle scheduled drug precursors.
    HandlePrecursors,
}

impl Flag for Activity {
    const KIND: &'static str = "activity";
    const ALL: &'static [Self] = &[
        Self::Possess,
        Self::Store,
        Self::Distribute,
        Self::Import,
        Self::Export,
        Self::Manufacture,
        Self::HandlePrecursors,
    ];

    fn as_str(self) -> &'static str {
        match self {
            Self::Possess => "possess",
            Self::Store => "store",
            Self::Distribute => "distribute",
            Self::Import => "import",
            Self::Export => "export",
            Self::Manufacture => "manufacture",
            Self::HandlePrecursors => "handle_precursors",
        }
    }
}

impl std::fmt::Display for Activity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(Flag::as_str(*self))
    }
}

/// Set of permitted activities.
pub type ActivitySet = FlagSet<Activity>;

// ---------------------------------------------------------------------------
// Holder
// ---------------------------------------------------------------------------

/// Who holds a licence or submits a transaction.
///
/// Serialized as `"company"` or `"customer:<id>"`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub enum HolderRef {
    /// The operating company itself.
    Company,
    /// A named customer.
    Customer(CustomerId),
}

impl std::fmt::Display for HolderRef {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Company => f.write_str("company"),
            Self::Customer(id) => write!(f, "customer:{id}"),
        }
    }
}

impl FromStr for HolderRef {
    type Err = RegistryError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        if s == "company" {
            return Ok(Self::Company);
        }
        s.strip_prefix("customer:")
            .and_then(|id| CustomerId::new(id).ok())
            .map(Self::Customer)
            .ok_or_else(|| RegistryError::InvalidHolder(s.to_string()))
    }
}

impl TryFrom<String> for HolderRef {
    type Error = RegistryError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

impl From<HolderRef> for String {
    fn from(holder: HolderRef) -> Self {
        holder.to_string()
    }
}

// ---------------------------------------------------------------------------
// Status and validity
// ---------------------------------------------------------------------------

/// Administrative status recorded on the licence.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenceStatus {
    /// In force.
    Valid,
    /// Lapsed; a grace period may still apply.
    Expired,
    /// Temporarily withdrawn by the authority.
    Suspended,
    /// Permanently withdrawn (terminal).
    Revoked,
}

impl LicenceStatus {
    /// Whether this status represents a terminal state.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Revoked)
    }

    /// String representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Valid => "valid",
            Self::Expired => "expired",
            Self::Suspended => "suspended",
            Self::Revoked => "revoked",
        }
    }
}

impl std::fmt::Display for LicenceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Effective validity of a licence on a given date.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum LicenceValidity {
    /// Within its window.
    Valid,
    /// Past expiry but inside the grace period.
    InGracePeriod,
    /// Past expiry with no grace left.
    Expired,
    /// Date precedes the issue date.
    NotYetEffective,
    /// Suspended by the authority.
    Suspended,
    /// Revoked by the authority.
    Revoked,
}

impl LicenceValidity {
    /// True for `Valid` and `InGracePeriod`.
    pub fn is_effectively_valid(&self) -> bool {
        matches!(self, Self::Valid | Self::InGracePeriod)
    }
}

/// Period over which a cumulative cap applies.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PeriodKind {
    /// Calendar day.
    Daily,
    /// Calendar week.
    Weekly,
    /// Calendar month.
    Monthly,
    /// Calendar quarter.
    Quarterly,
    /// Calendar year.
    Yearly,
}

impl PeriodKind {
    /// String representation.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Daily => "daily",
            Self::Weekly => "weekly",
            Self::Monthly => "monthly",
            Self::Quarterly => "quarterly",
            Self::Yearly => "yearly",
        }
    }
}

impl std::fmt::Display for PeriodKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

// ---------------------------------------------------------------------------
// Substance mapping
// ---------------------------------------------------------------------------

/// Scope and caps of a licence for one substance.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubstanceMapping {
    /// Substance covered by this mapping.
    pub substance_code: SubstanceCode,
    /// Activities this mapping is restricted to. `None` inherits the licence's set.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub activities: Option<ActivitySet>,
    /// Maximum quantity in a single transaction line.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_per_transaction: Option<Decimal>,
    /// Maximum cumulative quantity per `period`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_per_period: Option<Decimal>,
    /// Period for `max_per_period`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub period: Option<PeriodKind>,
    /// First day the mapping applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub effective_date: Option<NaiveDate>,
    /// Last day the mapping applies.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
}

impl SubstanceMapping {
    /// An unrestricted mapping for `substance_code`.
    pub fn unrestricted(substance_code: SubstanceCode) -> Self {
        Self {
            substance_code,
            activities: None,
            max_per_transaction: None,
            max_per_period: None,
            period: None,
            effective_date: None,
            expiry_date: None,
        }
    }

    /// True if the mapping's own window contains `date`.
    pub fn in_window(&self, date: NaiveDate) -> bool {
        self.effective_date.map_or(true, |from| date >= from)
            && self.expiry_date.map_or(true, |until| date <= until)
    }

    /// True if the mapping is for `substance` and permits `activity`, on any date.
    pub fn applies_to(&self, substance: &SubstanceCode, activity: Activity) -> bool {
        self.substance_code == *substance
            && self.activities.map_or(true, |set| set.contains(activity))
    }

    /// True if the mapping has taken effect by `date`. The expiry bound is not checked.
    pub fn started_by(&self, date: NaiveDate) -> bool {
        self.effective_date.map_or(true, |from| date >= from)
    }

    /// True if the mapping covers `substance` for `activity` on `date`.
    pub fn covers(&self, substance: &SubstanceCode, activity: Activity, date: NaiveDate) -> bool {
        self.applies_to(substance, activity) && self.in_window(date)
    }
}

// ---------------------------------------------------------------------------
// Licence
// ---------------------------------------------------------------------------

/// A legal authorization held by the company or a customer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Licence {
    /// Registry identifier.
    pub id: LicenceId,
    /// Holder of the licence.
    pub holder: HolderRef,
    /// Authority that issued it.
    pub issuing_authority: String,
    /// Licence type code, used for threshold scoping.
    pub licence_type: String,
    /// Number printed on the licence.
    pub licence_number: String,
    /// First valid day.
    pub issue_date: NaiveDate,
    /// Last valid day. `None` means open-ended.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_date: Option<NaiveDate>,
    /// Grace-period end. Past expiry, the licence remains valid while this is in the future.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub grace_period_end: Option<NaiveDate>,
    /// Administrative status.
    pub status: LicenceStatus,
    /// Permitted activities.
    pub activities: ActivitySet,
    /// Covered substances.
    #[serde(default)]
    pub mappings: Vec<SubstanceMapping>,
}

impl Licence {
    /// Effective validity on `date`.
    pub fn validity_on(&self, date: NaiveDate) -> LicenceValidity {
        match self.status {
            LicenceStatus::Revoked => return LicenceValidity::Revoked,
            LicenceStatus::Suspended => return LicenceValidity::Suspended,
            LicenceStatus::Valid | LicenceStatus::Expired => {}
        }
        if date < self.issue_date {
            return LicenceValidity::NotYetEffective;
        }
        let past_expiry = self.status == LicenceStatus::Expired
            || self.expiry_date.is_some_and(|expiry| date > expiry);
        if !past_expiry {
            LicenceValidity::Valid
        } else if self.grace_period_end.is_some_and(|end| end > date) {
            LicenceValidity::InGracePeriod
        } else {
            LicenceValidity::Expired
        }
    }

    /// The last day the licence can be effectively valid, counting any
    /// grace period. `None` if it has no end.
    pub fn effective_end(&self) -> Option<NaiveDate> {
        if self.expiry_date.is_none() && self.status != LicenceStatus::Expired {
            return None;
        }
        // Validity inside the grace period is strict, so its last valid day
        // is the one before `grace_period_end`.
        let grace_last_day = self.grace_period_end.and_then(|end| end.pred_opt());
        match (self.expiry_date, grace_last_day) {
            (Some(expiry), Some(grace)) => Some(expiry.max(grace)),
            (Some(expiry), None) => Some(expiry),
            (None, grace) => grace,
        }
    }

    /// Last day `mapping` applies under this licence.
    ///
    /// A mapping that runs to the licence expiry (or has no expiry of its
    /// own) follows the licence into its grace period. A mapping that ends
    /// earlier keeps its own expiry.
    pub fn mapping_end(&self, mapping: &SubstanceMapping) -> Option<NaiveDate> {
        match (mapping.expiry_date, self.expiry_date) {
            (None, _) => self.effective_end(),
            (Some(own), Some(licence_expiry)) if own >= licence_expiry => self.effective_end(),
            (Some(own), _) => Some(own),
        }
    }

    /// True if `mapping` applies on `date`, with its end taken from [`Licence::mapping_end`].
    pub fn mapping_in_window(&self, mapping: &SubstanceMapping, date: NaiveDate) -> bool {
        mapping.started_by(date) && self.mapping_end(mapping).map_or(true, |end| date <= end)
    }

    /// Mappings for `substance`, in declaration order.
    pub fn mappings_for<'a>(
        &'a self,
        substance: &'a SubstanceCode,
    ) -> impl Iterator<Item = &'a SubstanceMapping> + 'a {
        self.mappings
            .iter()
            .filter(move |m| m.substance_code == *substance)
    }

    /// Check the mapping-window and cap invariants.
    ///
    /// # Errors
    ///
    /// Returns [`RegistryError::InvalidLicence`] when a mapping expires after
    /// the licence, starts before the licence was issued, carries a negative
    /// cap, or has a period cap without a period kind.
    pub fn validate(&self) -> Result<(), RegistryError> {
        let invalid = |reason: String| RegistryError::InvalidLicence {
            licence_id: self.id.clone(),
            reason,
        };
        if let Some(expiry) = self.expiry_date {
            if expiry < self.issue_date {
                return Err(invalid(format!(
                    "expiry date {expiry} precedes issue date {}",
                    self.issue_date
                )));
            }
        }
        for mapping in &self.mappings {
            let code = &mapping.substance_code;
            if let (Some(mapping_expiry), Some(licence_expiry)) =
                (mapping.expiry_date, self.expiry_date)
            {
                if mapping_expiry > licence_expiry {
                    return Err(invalid(format!(
                        "mapping for {code} expires {mapping_expiry}, after licence expiry {licence_expiry}"
                    )));
                }
            }
            if let Some(effective) = mapping.effective_date {
                if effective < self.issue_date {
                    return Err(invalid(format!(
                        "mapping for {code} is effective {effective}, before issue date {}",
                        self.issue_date
                    )));
                }
            }
            for (label, cap) in [
                ("per-transaction", mapping.max_per_transaction),
                ("per-period", mapping.max_per_period),
            ] {
                if cap.is_some_and(|c| c.is_sign_negative()) {
                    return Err(invalid(format!("mapping for {code} has a negative {label} cap")));
                }
            }
            if mapping.max_per_period.is_some() && mapping.period.is_none() {
                return Err(invalid(format!(
                    "mapping for {code} has a per-period cap without a period kind"
                )));
            }
        }
        Ok(())
    }
}
