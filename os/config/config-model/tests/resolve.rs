mod common;

use common::Kit;
use config_model::{ConfigError, DevNum, DevRef, DevSpec, DeviceKind, ErrorClass, Resolved};

/// `define scsibus {}`, `device sd`, `attach sd at scsibus`.
fn scsi() -> Kit {
    let mut k = Kit::new();
    k.interface("scsibus", &[]);
    k.device("sd", None);
    k.attach("sd", &["scsibus"]);
    k.end_definitions();
    assert!(k.instance("sd0", Some("scsibus0"), &[]));
    k
}

#[test]
fn minimal_configuration_resolves() {
    let mut k = scsi();
    assert!(k.config("GENERIC", "sd0a"));
    assert!(k.s.on_select_maxusers(32));
    assert!(k.s.on_end_of_selections(), "{:?}", k.errors());

    let generic = k.sym("GENERIC");
    let config = k.s.registry().config(generic).unwrap();
    let DevRef::Device {
        unit, partition, ..
    } = config.root
    else {
        panic!("root is {:?}", config.root);
    };
    assert_eq!((unit, partition), (0, 0));
    assert_eq!(config.root.partition_letter(), Some('a'));
    assert_eq!(config.dump, DevRef::Wildcard);
    assert!(Resolved::new(&k.s).is_some());
}

#[test]
fn missing_maxusers_is_the_only_error() {
    let mut k = scsi();
    assert!(k.config("GENERIC", "sd0a"));
    assert!(!k.s.on_end_of_selections());
    let errors = k.errors();
    assert_eq!(errors, [ConfigError::MaxusersUnset]);
    assert_eq!(errors[0].class(), ErrorClass::Consistency);
    assert!(errors[0].to_string().contains("maxusers"));
}

#[test]
fn maxusers_bounds_supply_default() {
    let mut k = Kit::new();
    assert!(k.s.on_define_maxusers(2, 16, 64));
    k.end_definitions();
    assert!(k.config("GENERIC", "?"));
    assert!(k.s.on_end_of_selections(), "{:?}", k.errors());
    assert_eq!(k.s.settings().maxusers, Some(16));
}

#[test]
fn maxusers_outside_bounds() {
    let mut k = Kit::new();
    assert!(k.s.on_define_maxusers(2, 16, 64));
    k.end_definitions();
    assert!(k.config("GENERIC", "?"));
    assert!(k.s.on_select_maxusers(128));
    assert!(!k.s.on_end_of_selections());
    assert!(matches!(
        k.errors()[..],
        [ConfigError::MaxusersOutOfRange { value: 128, .. }]
    ));
}

#[test]
fn device_numbers_use_block_major_and_partitions() {
    let mut k = Kit::new();
    k.interface("scsibus", &[]);
    k.device("sd", None);
    k.attach("sd", &["scsibus"]);
    let sd = k.sym("sd");
    assert!(k.s.on_define_device_major(sd, Some(13), Some(4), None, None));
    k.end_definitions();
    assert!(k.instance("sd1", Some("scsibus0"), &[]));

    assert!(k.config("A", "sd1b"));
    assert!(k.config("B", "?"));
    let a = k.sym("A");
    let b = k.sym("B");
    let root_a = k.s.registry().config(a).unwrap().root;
    assert_eq!(root_a.devno(), Some(DevNum { major: 4, minor: 9 }));
    assert_eq!(k.s.registry().config(b).unwrap().root, DevRef::Wildcard);
}

#[test]
fn device_without_major_is_rejected_once_majors_exist() {
    let mut k = Kit::new();
    k.interface("scsibus", &[]);
    k.device("sd", None);
    k.device("cd", None);
    k.attach("sd", &["scsibus"]);
    k.attach("cd", &["scsibus"]);
    let sd = k.sym("sd");
    assert!(k.s.on_define_majors(&[(sd, 4)]));
    k.end_definitions();
    assert!(k.config("GENERIC", "sd0a"));
    assert!(!k.config("OTHER", "cd0a"));
    assert!(matches!(
        k.errors()[..],
        [ConfigError::NoMajorForDevice { .. }]
    ));
}

#[test]
fn explicit_device_number_finds_its_name() {
    let mut k = Kit::new();
    k.interface("scsibus", &[]);
    k.device("sd", None);
    k.attach("sd", &["scsibus"]);
    let sd = k.sym("sd");
    assert!(k.s.on_define_majors(&[(sd, 4)]));
    k.end_definitions();
    let name = k.sym("GENERIC");
    assert!(k.s.on_add_config(name, DevSpec::Number { major: 4, minor: 17 }, None, &[]));
    let root = k.s.registry().config(name).unwrap().root;
    let DevRef::Number { name: Some(dev), .. } = root else {
        panic!("root is {root:?}");
    };
    assert_eq!(dev.as_str(), "sd2b");
    assert_eq!(root.devno(), Some(DevNum { major: 4, minor: 17 }));
}

#[test]
fn root_none_and_unknown_devices() {
    let mut k = scsi();
    let name = k.sym("GENERIC");
    assert!(!k.s.on_add_config(name, DevSpec::None, None, &[]));
    assert!(!k.config("GENERIC", "xx0a"));
    assert!(!k.config("GENERIC", "sd*"));
    let errors = k.errors();
    assert!(matches!(errors[0], ConfigError::InvalidDeviceSpec { .. }));
    assert!(matches!(errors[1], ConfigError::UnknownDevice { .. }));
    assert!(matches!(errors[2], ConfigError::InvalidDeviceSpec { .. }));
    assert!(k.s.registry().config(name).is_none());
}

#[test]
fn duplicate_configuration_name() {
    let mut k = scsi();
    assert!(k.config("GENERIC", "sd0a"));
    assert!(!k.config("GENERIC", "?"));
    let name = k.sym("GENERIC");
    assert!(k.s.on_select_no_config(name));
    assert!(k.config("GENERIC", "?"));
}

#[test]
fn crosscheck_reports_dangling_root() {
    let mut k = scsi();
    assert!(k.config("GENERIC", "sd3a"));
    assert!(k.s.on_select_maxusers(8));
    assert!(!k.s.on_end_of_selections());
    assert!(matches!(
        &k.errors()[..],
        [ConfigError::DanglingReference { what: "root", spec, .. }] if spec == "sd3a"
    ));
}

#[test]
fn crosscheck_accepts_star_past_explicit_units() {
    let mut k = Kit::new();
    k.interface("scsibus", &[]);
    k.device("sd", None);
    k.attach("sd", &["scsibus"]);
    let path = k.sym("dev/sd.c");
    let sd = k.sym("sd");
    let flags = config_model::FileFlags {
        needs_count: true,
        needs_flag: false,
    };
    assert!(k.s.on_define_file(path, Some(config_model::CondExpr::Atom(sd)), flags, None));
    k.end_definitions();
    assert!(k.instance("sd0", Some("scsibus0"), &[]));
    assert!(k.instance("sd*", Some("scsibus?"), &[]));
    assert!(k.config("A", "sd5a"));
    assert!(k.s.on_select_maxusers(8));
    assert!(k.s.on_end_of_selections(), "{:?}", k.errors());
}

#[test]
fn star_instances_need_a_counted_base() {
    let mut k = scsi();
    assert!(k.instance("sd*", Some("scsibus?"), &[]));
    assert!(k.config("GENERIC", "?"));
    assert!(k.s.on_select_maxusers(8));
    assert!(!k.s.on_end_of_selections());
    assert_eq!(k.errors(), [ConfigError::BadStar("sd".into())]);
}

#[test]
fn star_allowed_by_session_options() {
    let mut k = Kit::with_options(config_model::SessionOptions {
        needs_count: vec!["sd".into()],
        ..Default::default()
    });
    k.interface("scsibus", &[]);
    k.device("sd", None);
    k.attach("sd", &["scsibus"]);
    k.end_definitions();
    assert!(k.instance("sd*", Some("scsibus?"), &[]));
    assert!(k.config("GENERIC", "?"));
    assert!(k.s.on_select_maxusers(8));
    assert!(k.s.on_end_of_selections(), "{:?}", k.errors());
}

#[test]
fn pseudo_device_counts_as_root_instance() {
    let mut k = Kit::new();
    k.pseudo("md");
    k.end_definitions();
    let md = k.sym("md");
    assert!(k.s.on_add_pseudo_device(md, 2));
    assert!(k.config("GENERIC", "md1a"));
    assert!(k.s.on_select_maxusers(8));
    assert!(k.s.on_end_of_selections(), "{:?}", k.errors());
    let resolved = Resolved::new(&k.s).unwrap();
    assert_eq!(resolved.pseudo_devices(), [(md, 2)]);
}

#[test]
fn configuration_is_required_unless_ioconf() {
    let mut k = Kit::new();
    k.end_definitions();
    assert!(k.s.on_select_maxusers(8));
    assert!(!k.s.on_end_of_selections());
    assert_eq!(k.errors(), [ConfigError::NoConfiguration]);

    let mut s = config_model::Session::default();
    let name = s.intern("ioconf_test");
    assert!(s.on_ioconf(name));
    assert!(s.on_end_of_definitions());
    assert!(s.on_end_of_selections());
}

#[test]
fn file_system_must_be_selected() {
    let mut k = Kit::new();
    let ffs = k.sym("ffs");
    assert!(k.s.on_define_filesystems(&[ffs], &[]));
    k.end_definitions();
    assert!(k.config("GENERIC", "?"));
    assert!(k.s.on_select_maxusers(8));
    assert!(!k.s.on_end_of_selections());
    assert_eq!(k.errors(), [ConfigError::NoFileSystem]);
}

#[test]
fn root_file_system_type_must_be_configured() {
    let mut k = Kit::new();
    let ffs = k.sym("FFS");
    let nfs = k.sym("NFS");
    assert!(k.s.on_define_filesystems(&[ffs, nfs], &[]));
    k.end_definitions();
    assert!(k.s.on_select_file_system(ffs));
    let name = k.sym("GENERIC");
    let lower = k.sym("nfs");
    assert!(k.s.on_add_config(name, DevSpec::Wildcard, Some(lower), &[]));
    assert!(k.s.on_select_maxusers(8));
    assert!(!k.s.on_end_of_selections());
    assert!(matches!(
        &k.errors()[..],
        [ConfigError::FileSystemNotConfigured { fstype, .. }] if fstype == "NFS"
    ));
}

#[test]
fn network_interface_keeps_only_the_unit() {
    let mut k = Kit::new();
    let ifnet = k.sym("ifnet");
    assert!(k.s.on_define_attribute(ifnet, None, &[]));
    k.interface("pci", &[]);
    let wm = k.sym("wm");
    assert!(k.s.on_define_device(wm, DeviceKind::Device, None, &[ifnet]));
    k.attach("wm", &["pci"]);
    k.end_definitions();
    assert!(k.instance("wm0", Some("pci?"), &[]));
    assert!(k.config("NETBOOT", "wm0"));
    let name = k.sym("NETBOOT");
    assert!(matches!(
        k.s.registry().config(name).unwrap().root,
        DevRef::Interface { unit: 0, .. }
    ));
}
