//! Per-configuration root and dump device files, `swap<config>.c`.

use crate::artifact::Artifact;
use crate::error::EmitError;
use config_model::{Config, DevRef, Resolved};
use core::fmt::Write;

/// The `(spec, devno, comment)` triple of one device reference. A device
/// without a number is handed over by name.
fn device(dev: &DevRef) -> (String, String, String) {
    let quoted = |s: &str| format!("\"{s}\"");
    let nodev = || "NODEV".to_string();
    match *dev {
        DevRef::Wildcard => ("NULL".into(), nodev(), "wildcarded".into()),
        DevRef::None => ("NULL".into(), nodev(), "none".into()),
        DevRef::Literal(text) => (quoted(text.as_str()), nodev(), text.to_string()),
        DevRef::Interface { name, .. } | DevRef::Device { name, devno: None, .. } => {
            (quoted(name.as_str()), nodev(), name.to_string())
        }
        DevRef::Device {
            name,
            devno: Some(devno),
            ..
        } => ("NULL".into(), devno.to_string(), name.to_string()),
        DevRef::Number { devno, name } => (
            "NULL".into(),
            devno.to_string(),
            name.map_or_else(|| devno.to_string(), |n| n.to_string()),
        ),
    }
}

fn swap_file(config: &Config) -> Result<Artifact, EmitError> {
    let mut out = String::from(
        "/* Generated root and dump devices, do not edit. */\n\n\
         #include <sys/param.h>\n\
         #include <sys/conf.h>\n\n",
    );
    for (what, dev) in [("root", &config.root), ("dump", &config.dump)] {
        let (spec, devno, comment) = device(dev);
        writeln!(out, "const char *{what}spec = {spec};")?;
        writeln!(out, "dev_t\t{what}dev = {devno};\t/* {comment} */\n")?;
    }
    match config.fstype {
        Some(fs) => writeln!(out, "const char *rootfstype = \"{}\";", fs.as_str().to_ascii_lowercase())?,
        None => writeln!(out, "const char *rootfstype = ROOT_FSTYPE_ANY;")?,
    }
    Ok(Artifact::new(format!("swap{}.c", config.name), out))
}

/// One file per configuration.
///
/// # Errors
/// Only formatting errors.
pub fn swap_files(resolved: &Resolved<'_>) -> Result<Vec<Artifact>, EmitError> {
    resolved.configs().map(swap_file).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_model::{DevNum, Interner};

    #[test]
    fn device_references() {
        let mut names = Interner::new();
        assert_eq!(device(&DevRef::Wildcard).1, "NODEV");
        let literal = DevRef::Literal(names.intern("/dev/md0a"));
        assert_eq!(device(&literal).0, "\"/dev/md0a\"");
        let number = DevRef::Number {
            devno: DevNum { major: 4, minor: 1 },
            name: Some(names.intern("sd0b")),
        };
        let (spec, devno, comment) = device(&number);
        assert_eq!(spec, "NULL");
        assert_eq!(devno, "makedev(4, 1)");
        assert_eq!(comment, "sd0b");
    }
}
