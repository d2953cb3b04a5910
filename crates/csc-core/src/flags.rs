//! # Flag Sets — Named-Value Sets with Set Algebra
//!
//! Licences permit a set of activities; webhook subscriptions listen for a
//! set of event types. Both are finite families of named values, so both
//! are expressed as a [`FlagSet`] over a type implementing [`Flag`].
//!
//! A `FlagSet` is a bitset indexed by each flag's position in
//! [`Flag::ALL`]. It serializes as a sorted list of flag names, and
//! deserialization rejects unknown names rather than dropping them.

use std::fmt;
use std::marker::PhantomData;

use serde::de::{SeqAccess, Visitor};
use serde::ser::SerializeSeq;
use serde::{Deserialize, Deserializer, Serialize, Serializer};

use crate::error::ValidationError;

/// A member of a finite family of named flags.
///
/// Implementors list every variant in [`Flag::ALL`] (at most 64) and give
/// each a stable wire name.
pub trait Flag: Copy + Eq + fmt::Debug + 'static {
    /// Human-readable family name used in error messages.
    const KIND: &'static str;

    /// Every variant of the family, in canonical order.
    const ALL: &'static [Self];

    /// The stable wire name of this flag.
    fn as_str(self) -> &'static str;

    /// Look a flag up by its wire name.
    fn from_name(name: &str) -> Result<Self, ValidationError> {
        Self::ALL
            .iter()
            .copied()
            .find(|f| f.as_str() == name)
            .ok_or_else(|| ValidationError::UnknownFlag {
                kind: Self::KIND,
                value: name.to_string(),
            })
    }
}

/// Position of a flag within its family, as a single bit.
fn bit_of<F: Flag>(flag: F) -> u64 {
    let index = F::ALL.iter().position(|f| *f == flag).unwrap_or(0);
    1u64 << index
}

/// A set of flags from one family.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct FlagSet<F: Flag> {
    bits: u64,
    _family: PhantomData<F>,
}

impl<F: Flag> FlagSet<F> {
    /// The empty set.
    pub const fn empty() -> Self {
        Self {
            bits: 0,
            _family: PhantomData,
        }
    }

    /// The set containing every flag in the family.
    pub fn all() -> Self {
        F::ALL.iter().copied().collect()
    }

    /// Add a flag.
    pub fn insert(&mut self, flag: F) {
        self.bits |= bit_of(flag);
    }

    /// Remove a flag.
    pub fn remove(&mut self, flag: F) {
        self.bits &= !bit_of(flag);
    }

    /// Builder-style insert.
    pub fn with(mut self, flag: F) -> Self {
        self.insert(flag);
        self
    }

    /// True if the flag is a member.
    pub fn contains(&self, flag: F) -> bool {
        self.bits & bit_of(flag) != 0
    }

    /// True if no flag is set.
    pub fn is_empty(&self) -> bool {
        self.bits == 0
    }

    /// Number of flags set.
    pub fn len(&self) -> usize {
        self.bits.count_ones() as usize
    }

    /// Flags in either set.
    pub fn union(&self, other: &Self) -> Self {
        Self::from_bits(self.bits | other.bits)
    }

    /// Flags in both sets.
    pub fn intersection(&self, other: &Self) -> Self {
        Self::from_bits(self.bits & other.bits)
    }

    /// Flags in `self` that are not in `other`.
    pub fn difference(&self, other: &Self) -> Self {
        Self::from_bits(self.bits & !other.bits)
    }

    /// True if every flag in `self` is also in `other`.
    pub fn is_subset_of(&self, other: &Self) -> bool {
        self.bits & !other.bits == 0
    }

    /// True if every flag in `other` is also in `self`.
    pub fn is_superset_of(&self, other: &Self) -> bool {
        other.is_subset_of(self)
    }

    /// True if the sets share at least one flag.
    pub fn intersects(&self, other: &Self) -> bool {
        self.bits & other.bits != 0
    }

    /// Iterate members in canonical order.
    pub fn iter(&self) -> impl Iterator<Item = F> + '_ {
        F::ALL.iter().copied().filter(move |f| self.contains(*f))
    }

    /// Parse a set from wire names.
    pub fn from_names<'a>(names: impl IntoIterator<Item = &'a str>) -> Result<Self, ValidationError> {
        let mut set = Self::empty();
        for name in names {
            set.insert(F::from_name(name)?);
        }
        Ok(set)
    }

    /// The wire names of the members in canonical order.
    pub fn names(&self) -> Vec<&'static str> {
        self.iter().map(Flag::as_str).collect()
    }

    fn from_bits(bits: u64) -> Self {
        Self {
            bits,
            _family: PhantomData,
        }
    }
}

impl<F: Flag> Default for FlagSet<F> {
    fn default() -> Self {
        Self::empty()
    }
}

impl<F: Flag> FromIterator<F> for FlagSet<F> {
    fn from_iter<I: IntoIterator<Item = F>>(iter: I) -> Self {
        let mut set = Self::empty();
        for flag in iter {
            set.insert(flag);
        }
        set
    }
}

impl<F: Flag> fmt::Debug for FlagSet<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_set().entries(self.iter().map(Flag::as_str)).finish()
    }
}

impl<F: Flag> fmt::Display for FlagSet<F> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.names().join(","))
    }
}

impl<F: Flag> Serialize for FlagSet<F> {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        let mut seq = serializer.serialize_seq(Some(self.len()))?;
        for flag in self.iter() {
            seq.serialize_element(flag.as_str())?;
        }
        seq.end()
    }
}

impl<'de, F: Flag> Deserialize<'de> for FlagSet<F> {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        struct NamesVisitor<F>(PhantomData<F>);

        impl<'de, F: Flag> Visitor<'de> for NamesVisitor<F> {
            type Value = FlagSet<F>;

            fn expecting(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "a list of {} names", F::KIND)
            }

            fn visit_seq<A: SeqAccess<'de>>(self, mut seq: A) -> Result<Self::Value, A::Error> {
                let mut set = FlagSet::empty();
                while let Some(name) = seq.next_element::<String>()? {
                    let flag = F::from_name(&name).map_err(serde::de::Error::custom)?;
                    set.insert(flag);
                }
                Ok(set)
            }
        }

        deserializer.deserialize_seq(NamesVisitor(PhantomData))
    }
}
