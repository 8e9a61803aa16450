//! Positional binding of locator values.

use crate::error::{ConfigError, Errors, Result};
use crate::symbol::Sym;
use crate::value::{LocatorBinding, LocatorSpec};

/// Binds `got` to `spec`, producing one value per spec entry in spec order.
///
/// A binding with `value == None` (written `?`) takes the spec default.
/// A spec entry that is not bound takes its default if
/// [`LocatorSpec::may_omit`] allows it.
///
/// # Errors
/// All problems are collected before failing:
/// - [`ConfigError::MissingLocator`] for unbound entries that may not be
///   omitted,
/// - [`ConfigError::ExtraneousLocator`] for bindings that name no entry or
///   name one twice,
/// - [`ConfigError::NoDefaultForWildcard`] for `?` bindings of entries
///   without a default.
pub fn fixloc(device: Sym, spec: &[LocatorSpec], got: &[LocatorBinding]) -> Result<Vec<Sym>> {
    let mut slots: Vec<Option<&LocatorBinding>> = vec![None; spec.len()];
    let mut extraneous = Vec::new();
    for binding in got {
        match spec.iter().position(|l| l.name == binding.name) {
            Some(i) if slots[i].is_none() => slots[i] = Some(binding),
            _ => extraneous.push(binding.name.to_string()),
        }
    }

    let mut values = Vec::with_capacity(spec.len());
    let mut missing = Vec::new();
    let mut wildcarded = Vec::new();
    for (locator, slot) in spec.iter().zip(slots) {
        let value = match slot {
            Some(LocatorBinding { value: Some(v), .. }) => Some(*v),
            Some(LocatorBinding { value: None, .. }) => {
                if locator.default.is_none() {
                    wildcarded.push(locator.name.to_string());
                }
                locator.default
            }
            None if locator.may_omit() => locator.default,
            None => {
                missing.push(locator.name.to_string());
                None
            }
        };
        values.extend(value);
    }

    let device = device.to_string();
    let mut errors = Errors::new();
    if !missing.is_empty() {
        errors.push(ConfigError::MissingLocator {
            device: device.clone(),
            names: missing,
        });
    }
    if !extraneous.is_empty() {
        errors.push(ConfigError::ExtraneousLocator {
            device: device.clone(),
            names: extraneous,
        });
    }
    if !wildcarded.is_empty() {
        errors.push(ConfigError::NoDefaultForWildcard {
            device,
            names: wildcarded,
        });
    }
    errors.into_result(values)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::symbol::Interner;

    struct Fixture {
        names: Interner,
        dev: Sym,
        spec: Vec<LocatorSpec>,
    }

    /// `{[size = 0], base}`
    fn size_base() -> Fixture {
        let mut names = Interner::new();
        let dev = names.intern("foo0");
        let size = names.intern("size");
        let zero = names.intern("0");
        let base = names.intern("base");
        let spec = vec![
            LocatorSpec::with_default(size, zero),
            LocatorSpec::required(base),
        ];
        Fixture { names, dev, spec }
    }

    fn bind(names: &mut Interner, name: &str, value: Option<&str>) -> LocatorBinding {
        LocatorBinding {
            name: names.intern(name),
            value: value.map(|v| names.intern(v)),
        }
    }

    #[test]
    fn omitted_locator_takes_default() {
        let mut f = size_base();
        let got = [bind(&mut f.names, "base", Some("7"))];
        let values = fixloc(f.dev, &f.spec, &got).unwrap();
        let values: Vec<_> = values.iter().map(|v| v.as_str()).collect();
        assert_eq!(values, ["0", "7"]);
    }

    #[test]
    fn binding_order_does_not_matter() {
        let mut f = size_base();
        let forward = [
            bind(&mut f.names, "size", Some("16")),
            bind(&mut f.names, "base", Some("0x300")),
        ];
        let backward = [forward[1], forward[0]];
        assert_eq!(
            fixloc(f.dev, &f.spec, &forward).unwrap(),
            fixloc(f.dev, &f.spec, &backward).unwrap()
        );
    }

    #[test]
    fn required_locator_must_be_bound() {
        let f = size_base();
        let err = fixloc(f.dev, &f.spec, &[]).unwrap_err();
        assert_eq!(
            err.iter().collect::<Vec<_>>(),
            [&ConfigError::MissingLocator {
                device: "foo0".into(),
                names: vec!["base".into()],
            }]
        );
    }

    #[test]
    fn unknown_binding_is_extraneous() {
        let mut f = size_base();
        let got = [
            bind(&mut f.names, "base", Some("1")),
            bind(&mut f.names, "extra", Some("1")),
        ];
        let err = fixloc(f.dev, &f.spec, &got).unwrap_err();
        assert_eq!(
            err.iter().collect::<Vec<_>>(),
            [&ConfigError::ExtraneousLocator {
                device: "foo0".into(),
                names: vec!["extra".into()],
            }]
        );
    }

    #[test]
    fn wildcard_needs_default() {
        let mut f = size_base();
        let got = [
            bind(&mut f.names, "size", None),
            bind(&mut f.names, "base", None),
        ];
        let err = fixloc(f.dev, &f.spec, &got).unwrap_err();
        assert_eq!(
            err.iter().collect::<Vec<_>>(),
            [&ConfigError::NoDefaultForWildcard {
                device: "foo0".into(),
                names: vec!["base".into()],
            }]
        );
    }

    #[test]
    fn all_problems_reported_together() {
        let mut f = size_base();
        let got = [bind(&mut f.names, "irq", Some("5"))];
        let err = fixloc(f.dev, &f.spec, &got).unwrap_err();
        assert_eq!(err.len(), 2);
    }

    #[test]
    fn root_attachment_takes_no_locators() {
        let mut f = size_base();
        assert!(fixloc(f.dev, &[], &[]).unwrap().is_empty());
        let got = [bind(&mut f.names, "base", Some("1"))];
        assert!(fixloc(f.dev, &[], &got).is_err());
    }
}
