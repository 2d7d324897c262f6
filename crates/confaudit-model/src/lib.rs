// SPDX-License-Identifier: Apache-2.0
#![forbid(unsafe_code)]
//! Data model shared by the resolver, comparator and report synthesizer.
//!
//! ```compile_fail
//! use confaudit_model::Status;
//!
//! fn exhaustive_match(s: Status) -> &'static str {
//!     match s {
//!         Status::Matched => "m",
//!         Status::Partial => "p",
//!         Status::Mismatched => "x",
//!     }
//! }
//! ```

mod error;
mod expected;
mod report;
mod snapshot;

pub use error::ModelError;
pub use expected::{ExpectedConfig, ExpectedValue, Scalar};
pub use report::{
    CheckResult, Recommendation, ResolvedVia, Severity, Status, ValidationReport,
};
pub use snapshot::{Node, NodeId, NodeRef, Snapshot, SnapshotBuilder, CIRCULAR_MARKER};

pub const CRATE_NAME: &str = "confaudit-model";
