//! # Kernel configuration generators
//!
//! Renders a resolved configuration into the files a kernel build needs.
//! Every generator reads a [`Resolved`] view and returns [`Artifact`]s;
//! nothing touches the disk until [`write_all`] is called.
//!
//! ```text
//!                      ┌─► Makefile
//!                      ├─► opt_*.h, <device>.h
//!   Resolved ──────────┼─► ioconf.c, locators.h
//!                      ├─► devsw.c
//!                      └─► swap<config>.c
//! ```
//!
//! A run driven by `ioconf` only produces the autoconfiguration tables.

mod artifact;
mod devsw;
mod error;
mod headers;
mod ioconf;
mod makefile;
mod swap;

pub use artifact::{Artifact, write_all};
pub use error::EmitError;

use config_model::{Resolved, Session};

/// Generator knobs.
#[derive(Debug, Copy, Clone, Default, PartialEq, Eq)]
pub struct EmitOptions {
    /// Use the `:=` lint values of options in the headers.
    pub lint: bool,
}

/// Upper-cases a name and replaces everything that cannot appear in a C
/// identifier with `_`.
pub(crate) fn c_ident(name: &str) -> String {
    name.chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect()
}

/// Renders every artifact of a finished session.
///
/// # Errors
/// [`EmitError::Unresolved`] if the selections were never closed.
pub fn generate(session: &Session, options: &EmitOptions) -> Result<Vec<Artifact>, EmitError> {
    let resolved = Resolved::new(session).ok_or(EmitError::Unresolved)?;
    let mut artifacts = vec![ioconf::ioconf(&resolved)?, ioconf::locators(&resolved)?];
    if resolved.settings().ioconf.is_none() {
        artifacts.push(makefile::makefile(&resolved)?);
        artifacts.extend(headers::option_headers(&resolved, options)?);
        artifacts.extend(headers::count_headers(&resolved)?);
        artifacts.push(devsw::devsw(&resolved)?);
        artifacts.extend(swap::swap_files(&resolved)?);
    }
    log::debug!("generated {} files", artifacts.len());
    Ok(artifacts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn c_identifiers() {
        assert_eq!(c_ident("irq#1"), "IRQ_1");
        assert_eq!(c_ident("scsibus"), "SCSIBUS");
        assert_eq!(c_ident("wsdisplay-emul"), "WSDISPLAY_EMUL");
    }

    #[test]
    fn unfinished_session_is_rejected() {
        let session = Session::default();
        assert!(matches!(
            generate(&session, &EmitOptions::default()),
            Err(EmitError::Unresolved)
        ));
    }
}
