//! `opt_*.h` option headers and `<device>.h` count headers.
//!
//! ```text
//!   defflag opt_ddb.h DDB        options DDB      ─►  opt_ddb.h: #define DDB 1
//!   defparam opt_hz.h HZ                          ─►  opt_hz.h:  /* option `HZ' not defined */
//!   file dev/sd.c sd needs-count  sd0, sd1       ─►  sd.h:      #define NSD 2
//! ```

use crate::artifact::Artifact;
use crate::error::EmitError;
use crate::{EmitOptions, c_ident};
use config_model::Resolved;
use config_model::resolved::{CountHeader, OptionHeader, OptionValue};
use core::fmt::Write;

fn option_header(header: &OptionHeader, options: &EmitOptions) -> Result<Artifact, EmitError> {
    let mut out = String::new();
    for option in &header.options {
        let value = if options.lint {
            option.lint_value.map(OptionValue::Value).or(option.value)
        } else {
            option.value
        };
        match value {
            None => writeln!(out, "/* option `{}' not defined */", option.name)?,
            Some(OptionValue::Set) => writeln!(out, "#define\t{}\t1", option.name)?,
            Some(OptionValue::Value(v)) => writeln!(out, "#define\t{}\t{v}", option.name)?,
        }
    }
    Ok(Artifact::new(header.file.as_str(), out))
}

/// One header per option file named in a definition.
///
/// # Errors
/// Only formatting errors.
pub fn option_headers(
    resolved: &Resolved<'_>,
    options: &EmitOptions,
) -> Result<Vec<Artifact>, EmitError> {
    resolved
        .option_headers()
        .iter()
        .map(|header| option_header(header, options))
        .collect()
}

fn count_header(header: CountHeader) -> Result<Artifact, EmitError> {
    let mut out = String::new();
    writeln!(out, "#define\tN{}\t{}", c_ident(header.name.as_str()), header.count)?;
    Ok(Artifact::new(format!("{}.h", header.name), out))
}

/// # Errors
/// Only formatting errors.
pub fn count_headers(resolved: &Resolved<'_>) -> Result<Vec<Artifact>, EmitError> {
    resolved.count_headers().into_iter().map(count_header).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_model::Interner;
    use config_model::resolved::HeaderOption;

    #[test]
    fn option_states() {
        let mut names = Interner::new();
        let header = OptionHeader {
            file: names.intern("opt_hz.h"),
            options: vec![
                HeaderOption {
                    name: names.intern("HZ"),
                    value: Some(OptionValue::Value(names.intern("100"))),
                    lint_value: None,
                },
                HeaderOption {
                    name: names.intern("DDB"),
                    value: Some(OptionValue::Set),
                    lint_value: None,
                },
                HeaderOption {
                    name: names.intern("KGDB"),
                    value: None,
                    lint_value: Some(names.intern("1")),
                },
            ],
        };
        let plain = option_header(&header, &EmitOptions::default()).expect("renders");
        assert_eq!(plain.name, "opt_hz.h");
        assert_eq!(
            plain.contents,
            "#define\tHZ\t100\n#define\tDDB\t1\n/* option `KGDB' not defined */\n"
        );

        let lint = option_header(&header, &EmitOptions { lint: true }).expect("renders");
        assert!(lint.contents.ends_with("#define\tKGDB\t1\n"));
    }

    #[test]
    fn count_header_names() {
        let mut names = Interner::new();
        let header = CountHeader {
            name: names.intern("sd"),
            count: 3,
        };
        let artifact = count_header(header).expect("renders");
        assert_eq!(artifact.name, "sd.h");
        assert_eq!(artifact.contents, "#define\tNSD\t3\n");
    }
}
