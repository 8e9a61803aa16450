//! Block and character device switch tables.

use crate::artifact::Artifact;
use crate::error::EmitError;
use config_model::{Devm, Resolved};
use core::fmt::Write;

fn table(
    out: &mut String,
    kind: &str,
    len: u32,
    entries: &[&Devm],
    major: fn(&Devm) -> Option<u32>,
) -> core::fmt::Result {
    let mut slots = vec![None; usize::try_from(len).unwrap_or_default()];
    for &devm in entries {
        if let Some(slot) = major(devm).and_then(|m| slots.get_mut(usize::try_from(m).ok()?)) {
            *slot = Some(devm.name);
        }
    }
    writeln!(out, "/* {kind} table, indexed by major */")?;
    for name in slots.iter().flatten() {
        writeln!(out, "extern const struct {kind} {name}_{kind};")?;
    }
    writeln!(out, "const struct {kind} *{kind}0[] = {{")?;
    for (i, slot) in slots.iter().enumerate() {
        match slot {
            Some(name) => writeln!(out, "\t&{name}_{kind},\t/* {i} */")?,
            None => writeln!(out, "\tNULL,\t/* {i} */")?,
        }
    }
    writeln!(out, "}};\n")?;
    writeln!(out, "const struct {kind} **{kind} = {kind}0;")?;
    writeln!(out, "const int sys_{kind}s = {len};")?;
    writeln!(out, "int max_{kind}s = {len};\n")
}

/// # Errors
/// Only formatting errors.
pub fn devsw(resolved: &Resolved<'_>) -> Result<Artifact, EmitError> {
    let switch = resolved.device_switch();
    let mut out = String::from(
        "/* Generated device switch tables, do not edit. */\n\n\
         #include <sys/param.h>\n\
         #include <sys/conf.h>\n\n",
    );
    table(&mut out, "bdevsw", switch.block_len, &switch.entries, |d| d.block_major)?;
    table(&mut out, "cdevsw", switch.char_len, &switch.entries, |d| d.char_major)?;

    let major = |m: Option<u32>| m.map_or_else(|| "NODEVMAJOR".to_string(), |m| m.to_string());
    writeln!(out, "/* device name to major conversion */")?;
    writeln!(out, "struct devsw_conv devsw_conv0[] = {{")?;
    for devm in &switch.entries {
        writeln!(
            out,
            "\t{{ \"{}\", {}, {} }},",
            devm.name,
            major(devm.block_major),
            major(devm.char_major)
        )?;
    }
    writeln!(out, "}};")?;
    writeln!(out, "struct devsw_conv *devsw_conv = devsw_conv0;")?;
    writeln!(out, "int max_devsw_convs = {};", switch.entries.len())?;
    Ok(Artifact::new("devsw.c", out))
}
