//! The kernel `Makefile`.

use crate::artifact::Artifact;
use crate::error::EmitError;
use config_model::{FileKind, FileSpec, Resolved, Sym};
use core::fmt::Write;

/// A path as the build sees it: relative paths live below `$S`.
fn source_path(path: Sym) -> String {
    let path = path.as_str();
    if path.starts_with('/') || path.starts_with('$') {
        path.to_string()
    } else {
        format!("$S/{path}")
    }
}

fn object_name(file: &FileSpec) -> String {
    match file.build_prefix {
        Some(prefix) => format!("{prefix}/{}.o", file.stem()),
        None => format!("{}.o", file.stem()),
    }
}

fn define(name: Sym, value: Option<Sym>) -> String {
    match value {
        None => format!("-D{name}"),
        Some(v) if v.as_str().contains(char::is_whitespace) => format!("-D{name}=\"{v}\""),
        Some(v) => format!("-D{name}={v}"),
    }
}

fn list(out: &mut String, var: &str, items: &[String]) -> core::fmt::Result {
    write!(out, "{var}=")?;
    for item in items {
        write!(out, " \\\n\t{item}")?;
    }
    writeln!(out)
}

/// # Errors
/// Only formatting errors.
pub fn makefile(resolved: &Resolved<'_>) -> Result<Artifact, EmitError> {
    let settings = resolved.settings();
    let mut out = String::from("# Generated kernel build file, do not edit.\n\n");
    if let Some(machine) = settings.machine {
        writeln!(out, "MACHINE={machine}")?;
    }
    if let Some(arch) = settings.machine_arch {
        writeln!(out, "MACHINE_ARCH={arch}")?;
    }
    if !settings.subarches.is_empty() {
        let subarches: Vec<_> = settings.subarches.iter().copied().map(Sym::as_str).collect();
        writeln!(out, "MACHINE_SUBARCH={}", subarches.join(" "))?;
    }
    if let Some(srcdir) = settings.srcdir {
        writeln!(out, "S={srcdir}")?;
    }
    if let Some(ident) = settings.ident {
        writeln!(out, "KERNIDENT={ident}")?;
    }

    let defines: Vec<_> = resolved
        .command_line_options()
        .into_iter()
        .map(|(name, value)| define(name, value))
        .collect();
    writeln!(out, "IDENT={}", defines.join(" "))?;
    if let Some(maxusers) = settings.maxusers {
        writeln!(out, "PARAM=-DMAXUSERS={maxusers}")?;
    }

    let vars = resolved.make_vars();
    if !vars.is_empty() {
        writeln!(out)?;
    }
    for var in vars {
        if let Some(value) = var.value {
            writeln!(out, "{}={value}", var.name)?;
        }
        for value in var.appends {
            writeln!(out, "{}+={value}", var.name)?;
        }
    }

    let files: Vec<&FileSpec> = resolved.files().collect();
    let sources: Vec<&FileSpec> = files
        .iter()
        .copied()
        .filter(|f| f.kind == FileKind::Source)
        .collect();
    let by_suffix = |suffixes: &[&str]| -> Vec<String> {
        sources
            .iter()
            .filter(|f| suffixes.contains(&f.suffix()))
            .map(|f| source_path(f.path))
            .collect()
    };

    writeln!(out)?;
    let objects: Vec<String> = files
        .iter()
        .map(|f| match f.kind {
            FileKind::Source => object_name(f),
            FileKind::Object => source_path(f.path),
        })
        .collect();
    list(&mut out, "OBJS", &objects)?;
    list(&mut out, "CFILES", &by_suffix(&["c"]))?;
    list(&mut out, "SFILES", &by_suffix(&["s", "S"]))?;

    for file in sources {
        let rule = file.rule.map_or_else(
            || match file.suffix() {
                "s" | "S" => "${NORMAL_S}".to_string(),
                _ => "${NORMAL_C}".to_string(),
            },
            |r| r.to_string(),
        );
        write!(
            out,
            "\n{}: {}\n\t{rule}\n",
            object_name(file),
            source_path(file.path)
        )?;
    }
    Ok(Artifact::new("Makefile", out))
}

#[cfg(test)]
mod tests {
    use super::*;
    use config_model::Interner;

    #[test]
    fn paths_and_defines() {
        let mut names = Interner::new();
        assert_eq!(source_path(names.intern("kern/init_main.c")), "$S/kern/init_main.c");
        assert_eq!(source_path(names.intern("/usr/obj/x.o")), "/usr/obj/x.o");
        let ddb = names.intern("DDB");
        assert_eq!(define(ddb, None), "-DDDB");
        assert_eq!(define(ddb, Some(names.intern("1"))), "-DDDB=1");
        assert_eq!(define(ddb, Some(names.intern("a b"))), "-DDDB=\"a b\"");
    }
}
