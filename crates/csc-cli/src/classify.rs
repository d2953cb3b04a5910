//! # Classify Subcommand
//!
//! Resolves the classification a substance carried on a given date.
//!
//! ```bash
//! csc classify --reference bundle.yaml --substance KETAMINE --as-of 2025-03-01
//! ```

use std::path::PathBuf;

use anyhow::{Context, Result};
use chrono::NaiveDate;
use clap::Args;
use csc_compliance::{classification_as_of, has_been_reclassified_since};
use csc_core::SubstanceCode;
use csc_registry::Classification;
use serde::Serialize;

use crate::bundle::ReferenceBundle;

/// Arguments for `csc classify`.
#[derive(Args, Debug)]
pub struct ClassifyArgs {
    /// Reference bundle (JSON or YAML).
    #[arg(long)]
    pub reference: PathBuf,

    /// Substance code.
    #[arg(long)]
    pub substance: String,

    /// Date to resolve for (YYYY-MM-DD).
    #[arg(long)]
    pub as_of: NaiveDate,
}

/// Printed answer.
#[derive(Debug, Serialize, PartialEq, Eq)]
pub struct ClassificationReport {
    /// Substance code.
    pub substance: SubstanceCode,
    /// Requested date.
    pub as_of: NaiveDate,
    /// Classification in force on that date.
    pub classification: Classification,
    /// Current classification.
    pub current: Classification,
    /// True if a completed reclassification took effect after `as_of`.
    pub reclassified_since: bool,
}

/// Resolve the classification.
pub fn classify(args: &ClassifyArgs) -> Result<ClassificationReport> {
    let bundle = ReferenceBundle::load(&args.reference)?;
    let code = SubstanceCode::new(args.substance.as_str())
        .with_context(|| format!("invalid substance code {:?}", args.substance))?;
    let substance = bundle
        .substance(&code)
        .with_context(|| format!("substance {code} is not in the reference bundle"))?;

    Ok(ClassificationReport {
        substance: code,
        as_of: args.as_of,
        classification: classification_as_of(substance, args.as_of),
        current: substance.classification,
        reclassified_since: has_been_reclassified_since(substance, args.as_of),
    })
}

/// Execute `csc classify`.
pub fn run_classify(args: &ClassifyArgs) -> Result<u8> {
    let report = classify(args)?;
    println!("{}", serde_json::to_string_pretty(&report)?);
    Ok(0)
}
