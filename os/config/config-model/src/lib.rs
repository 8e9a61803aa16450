//! # Kernel configuration model
//!
//! Semantic core of the kernel configuration compiler. The parser feeds one
//! call per directive into a [`Session`]; once the input is consumed the
//! session cross-checks everything and hands a [`Resolved`] view to the
//! code generators.
//!
//! ## Architecture
//!
//! ```text
//!  parser ──on_*──► Session ─┬─► Graph     attributes, devices, attachments,
//!                            │             parent specs, instances
//!                            ├─► Registry  options, file systems, make
//!                            │             options, files, majors, configs
//!                            └─► Settings  machine, maxusers, ident, …
//!
//!  end of selections: maxusers ─► orphans ─► option closure ─► badstar
//!                     ─► crosscheck ─► files / device switch ─► Resolved
//! ```
//!
//! ## Statements are transactions
//!
//! Every directive runs inside a checkpoint of all session state (see
//! [`txn`]). A directive that fails leaves no trace except its
//! diagnostics; the run continues with the next one and reports all
//! problems at the end.
//!
//! ## Names
//!
//! All names are interned [`Sym`]s. Option and file system names are kept
//! as written; the set that `file` conditions test against holds their
//! lower-case spelling.

mod attr;
mod check;
pub mod cond;
pub mod config;
mod device;
pub mod error;
pub mod files;
pub mod graph;
pub mod locator;
pub mod option;
mod orphan;
pub mod registry;
pub mod resolved;
pub mod session;
pub mod symbol;
pub mod txn;
pub mod value;

pub use cond::CondExpr;
pub use config::{Config, DevNum, DevRef};
pub use error::{ConfigError, Diagnostic, Diagnostics, ErrorClass, Errors, Location, Severity};
pub use files::{Devm, FileKind, FileSpec};
pub use graph::{Activity, Graph};
pub use option::{MkOption, OptionDef, Selection};
pub use registry::Registry;
pub use resolved::Resolved;
pub use session::{MaxusersBounds, Phase, Session, SessionOptions, Settings};
pub use symbol::{Interner, Sym};
pub use value::{
    AtSite, CondMkOption, DefOpt, DevNodes, DevSpec, DeviceKind, FileFlags, LocatorBinding,
    LocatorSpec, OptionKind, Unit,
};
