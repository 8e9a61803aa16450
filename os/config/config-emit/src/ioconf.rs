//! Autoconfiguration tables: `ioconf.c` and `locators.h`.
//!
//! ```text
//!   pspec0 = { "mainbus", "mainbus", 0 }      pci0 at mainbus0
//!   pspec1 = { "pci", "pci", 0 }              wm0 at pci0
//!
//!   cfdata[]   0  mainbus0  no parent  (listed in cfroots)
//!              1  pci0      &pspec0
//!              2  wm0       &pspec1    loc+0
//! ```

use crate::artifact::Artifact;
use crate::c_ident;
use crate::error::EmitError;
use config_model::resolved::{CfEntry, ParentEntry};
use config_model::{Resolved, Unit};
use core::fmt::Write;

fn parent_unit(unit: Unit) -> String {
    match unit {
        Unit::Num(n) => n.to_string(),
        Unit::Star | Unit::Wild => "DVUNIT_ANY".to_string(),
    }
}

/// Unit column and state of a table row. A `*` row starts probing one
/// past the highest explicit unit.
fn unit_and_state(resolved: &Resolved<'_>, entry: &CfEntry) -> (u32, &'static str) {
    match entry.unit {
        Unit::Num(n) => (n, "NORM"),
        Unit::Star | Unit::Wild => {
            let graph = resolved.session().graph();
            let start = graph.find_base(entry.base).map_or(0, |b| graph.base(b).umax);
            (start, "STAR")
        }
    }
}

fn render_parents(out: &mut String, parents: &[ParentEntry]) -> core::fmt::Result {
    writeln!(out, "/* parent specifications */")?;
    for (i, parent) in parents.iter().enumerate() {
        let name = parent
            .parent
            .map_or_else(|| "NULL".to_string(), |p| format!("\"{p}\""));
        writeln!(
            out,
            "static const struct cfparent pspec{i} = {{\n\t\"{}\", {name}, {}\n}};",
            parent.attr,
            parent_unit(parent.unit)
        )?;
    }
    Ok(())
}

/// # Errors
/// Only formatting errors.
pub fn ioconf(resolved: &Resolved<'_>) -> Result<Artifact, EmitError> {
    let mut out = String::from(
        "/* Generated autoconfiguration tables, do not edit. */\n\n\
         #include <sys/param.h>\n\
         #include <sys/conf.h>\n\
         #include <sys/device.h>\n\
         #include <sys/mount.h>\n\n",
    );

    let parents = resolved.parents();
    let entries = resolved.cfdata();

    let mut offsets = Vec::with_capacity(entries.len());
    let mut locs = Vec::new();
    for entry in &entries {
        if entry.locators.is_empty() {
            offsets.push(None);
        } else {
            offsets.push(Some(locs.len()));
            locs.extend(entry.locators.iter().map(|l| l.as_str()));
        }
    }
    if !locs.is_empty() {
        writeln!(out, "static int loc[{}] = {{\n\t{}\n}};\n", locs.len(), locs.join(", "))?;
    }

    render_parents(&mut out, &parents)?;
    writeln!(
        out,
        "\n#define NORM FSTATE_NOTFOUND\n#define STAR FSTATE_STAR\n\n\
         struct cfdata cfdata[] = {{\n\
         \t/* driver      attachment  unit  state  loc  flags  pspec */"
    )?;
    for (i, (entry, offset)) in entries.iter().zip(&offsets).enumerate() {
        let (unit, state) = unit_and_state(resolved, entry);
        let loc = offset.map_or_else(|| "NULL".to_string(), |o| format!("loc+{o}"));
        let pspec = entry
            .parent
            .map_or_else(|| "NULL".to_string(), |p| format!("&pspec{p}"));
        writeln!(
            out,
            "/* {i:3}: {} */\n\t{{ \"{}\", \"{}\", {unit}, {state}, {loc}, {:#x}, {pspec} }},",
            entry.name, entry.base, entry.attachment, entry.flags
        )?;
    }
    writeln!(out, "\t{{ NULL, NULL, 0, 0, NULL, 0, NULL }}\n}};\n")?;

    writeln!(out, "const short cfroots[] = {{")?;
    for (i, entry) in entries.iter().enumerate().filter(|(_, e)| e.parent.is_none()) {
        writeln!(out, "\t{i:3} /* {} */,", entry.name)?;
    }
    writeln!(out, "\t-1\n}};\n")?;

    let pseudo = resolved.pseudo_devices();
    for (name, _) in &pseudo {
        writeln!(out, "void {name}attach(int);")?;
    }
    writeln!(out, "struct pdevinit pdevinit[] = {{")?;
    for (name, count) in &pseudo {
        writeln!(out, "\t{{ {name}attach, {count} }},")?;
    }
    writeln!(out, "\t{{ 0, 0 }}\n}};")?;

    Ok(Artifact::new("ioconf.c", out))
}

/// Locator offsets, defaults and counts of every interface attribute.
///
/// # Errors
/// Only formatting errors.
pub fn locators(resolved: &Resolved<'_>) -> Result<Artifact, EmitError> {
    let mut out = String::new();
    for interface in resolved.interfaces() {
        let attr = c_ident(interface.name.as_str());
        for (i, locator) in interface.locators.iter().enumerate() {
            let name = c_ident(locator.name.as_str());
            writeln!(out, "#define\t{attr}CF_{name}\t{i}")?;
            if let Some(default) = locator.default {
                writeln!(out, "#define\t{attr}CF_{name}_DEFAULT\t{default}")?;
            }
        }
        writeln!(out, "#define\t{attr}CF_NLOCS\t{}", interface.locators.len())?;
    }
    Ok(Artifact::new("locators.h", out))
}
