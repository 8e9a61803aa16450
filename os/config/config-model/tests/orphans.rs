mod common;

use common::Kit;
use config_model::{Activity, ConfigError, Resolved, SessionOptions};

/// mainbus at root, pci at mainbus, wm at pci.
fn bus(options: SessionOptions) -> Kit {
    let mut k = Kit::with_options(options);
    k.device("mainbus", Some(&[]));
    k.device("pci", Some(&[("dev", Some("-1"))]));
    k.device("wm", None);
    k.attach("mainbus", &["root"]);
    k.attach("pci", &["mainbus"]);
    k.attach("wm", &["pci"]);
    k.end_definitions();
    assert!(k.instance("mainbus0", None, &[]));
    assert!(k.instance("pci0", Some("mainbus0"), &[]));
    assert!(k.instance("pci1", Some("mainbus0"), &[]));
    assert!(k.instance("wm0", Some("pci0"), &[]));
    assert!(k.instance("wm1", Some("pci1"), &[]));
    assert!(k.instance("wm2", Some("pci2"), &[]));
    let pci1 = k.sym("pci1");
    assert!(k.s.on_select_no_device_instance(pci1));
    k
}

#[test]
fn children_of_removed_parents_are_ignored() {
    let mut k = bus(SessionOptions::default());
    k.s.kill_orphans();
    assert_eq!(k.state("mainbus0"), Activity::Active);
    assert_eq!(k.state("pci0"), Activity::Active);
    assert_eq!(k.state("wm0"), Activity::Active);
    assert_eq!(k.state("wm1"), Activity::Ignored);
    assert_eq!(k.state("wm2"), Activity::Unset);
}

#[test]
fn orphan_elimination_is_idempotent() {
    let mut k = bus(SessionOptions::default());
    k.s.kill_orphans();
    let names = ["mainbus0", "pci0", "wm0", "wm1", "wm2"];
    let first: Vec<_> = names.iter().map(|n| k.state(n)).collect();
    k.s.kill_orphans();
    let second: Vec<_> = names.iter().map(|n| k.state(n)).collect();
    assert_eq!(first, second);
}

#[test]
fn unreachable_instance_is_an_error() {
    let mut k = bus(SessionOptions::default());
    assert!(k.config("GENERIC", "?"));
    assert!(k.s.on_select_maxusers(8));
    assert!(!k.s.on_end_of_selections());
    assert!(matches!(
        &k.errors()[..],
        [ConfigError::OrphanedInstance { instance, at }] if instance == "wm2" && at == "pci2"
    ));
}

#[test]
fn ignored_instances_stay_out_of_the_tables() {
    let mut k = bus(SessionOptions::default());
    let wm2 = k.sym("wm2");
    assert!(k.s.on_select_no_device_instance(wm2));
    assert!(k.config("GENERIC", "?"));
    assert!(k.s.on_select_maxusers(8));
    assert!(k.s.on_end_of_selections(), "{:?}", k.errors());

    let resolved = Resolved::new(&k.s).unwrap();
    let names: Vec<_> = resolved.cfdata().iter().map(|e| e.name.as_str()).collect();
    assert_eq!(names, ["mainbus0", "pci0", "wm0"]);
    let wm0 = &resolved.cfdata()[2];
    assert_eq!(wm0.locators.len(), 1);
    assert_eq!(wm0.locators[0].as_str(), "-1");
    let parent = wm0.parent.map(|i| resolved.parents()[i]);
    assert_eq!(parent.and_then(|p| p.parent).map(|p| p.as_str()), Some("pci"));
}

#[test]
fn verbose_mode_reports_ignored_instances() {
    let mut k = bus(SessionOptions {
        verbose: true,
        ..SessionOptions::default()
    });
    let wm2 = k.sym("wm2");
    assert!(k.s.on_select_no_device_instance(wm2));
    assert!(k.config("GENERIC", "?"));
    assert!(k.s.on_select_maxusers(8));
    assert!(k.s.on_end_of_selections());
    assert!(
        k.s.diagnostics()
            .warnings()
            .any(|w| w.contains("`wm1` ignored"))
    );
}

#[test]
fn wildcard_parent_reaches_any_unit() {
    let mut k = bus(SessionOptions::default());
    assert!(k.instance("wm3", Some("pci?"), &[]));
    k.s.kill_orphans();
    assert_eq!(k.state("wm3"), Activity::Active);
}

#[test]
fn instance_at_bare_attribute_is_kept() {
    let mut k = Kit::new();
    k.interface("scsibus", &[]);
    k.device("sd", None);
    k.attach("sd", &["scsibus"]);
    k.end_definitions();
    assert!(k.instance("sd0", Some("scsibus0"), &[]));
    assert!(k.config("GENERIC", "sd0a"));
    assert!(k.s.on_select_maxusers(8));
    assert!(k.s.on_end_of_selections(), "{:?}", k.errors());
    assert_eq!(k.state("sd0"), Activity::Unset);
    assert!(k.s.diagnostics().warnings().any(|w| w.contains("orphaned")));
}
