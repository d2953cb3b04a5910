//! # Validate Subcommand
//!
//! Runs one transaction through the decision engine against a reference
//! bundle and prints the result as JSON.
//!
//! ```bash
//! csc validate --reference bundle.yaml --transaction so-1001.json
//! ```
//!
//! Exit status: 0 when the transaction passes, 2 when it is blocked, 1 on
//! operational errors (unreadable files, malformed reference data).

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::Args;
use csc_compliance::{EngineConfig, Repositories, ValidationResult, ValidationService};
use csc_core::Timestamp;
use csc_registry::{Transaction, TransactionLine, ValidationStatus};
use serde::Serialize;

use crate::bundle::{read_document, ReferenceBundle};

/// Arguments for `csc validate`.
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Reference bundle (JSON or YAML).
    #[arg(long)]
    pub reference: PathBuf,

    /// Transaction document (JSON or YAML).
    #[arg(long)]
    pub transaction: PathBuf,

    /// Pretty-print the report.
    #[arg(long)]
    pub pretty: bool,
}

/// Printed report.
#[derive(Debug, Serialize)]
pub struct ValidationReport {
    /// Transaction identifier.
    pub transaction_id: String,
    /// Caller reference.
    pub external_reference: String,
    /// Overall status.
    pub status: ValidationStatus,
    /// Caller-facing result.
    pub result: ValidationResult,
    /// Lines with coverage details.
    pub lines: Vec<TransactionLine>,
    /// Types of the events that would be published.
    pub events: Vec<String>,
}

/// Validate and build the report.
pub fn validate_transaction(args: &ValidateArgs) -> Result<ValidationReport> {
    let bundle = ReferenceBundle::load(&args.reference)?;
    let tx: Transaction = read_document(&args.transaction)
        .with_context(|| format!("failed to load transaction {}", args.transaction.display()))?;

    let config = EngineConfig::from_env().context("invalid engine configuration")?;
    let service = ValidationService::new(
        Repositories::from_shared(Arc::new(bundle.to_registry())),
        config,
    );
    let outcome = service
        .validate(tx, &bundle.usage, Timestamp::now())
        .context("validation failed")?;

    let result = outcome.result();
    let tx = outcome.transaction;
    Ok(ValidationReport {
        transaction_id: tx.id.to_string(),
        external_reference: tx.external_reference.clone(),
        status: tx.status(),
        result,
        lines: tx.lines,
        events: outcome.events.iter().map(|e| e.event_type().to_string()).collect(),
    })
}

/// Execute `csc validate`.
pub fn run_validate(args: &ValidateArgs) -> Result<u8> {
    let report = validate_transaction(args)?;
    let rendered = if args.pretty {
        serde_json::to_string_pretty(&report)?
    } else {
        serde_json::to_string(&report)?
    };
    println!("{rendered}");

    tracing::info!(
        transaction = %report.transaction_id,
        status = %report.status,
        violations = report.result.violations.len(),
        "transaction validated"
    );
    Ok(if report.result.is_valid { 0 } else { 2 })
}
