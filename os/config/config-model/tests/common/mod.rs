#![allow(dead_code)]

use config_model::{
    Activity, AtSite, ConfigError, DevSpec, DeviceKind, LocatorBinding, LocatorSpec, Session,
    SessionOptions, Sym,
};

/// A session past `machine` and `maxpartitions 8`, with shorthands for
/// the directives the tests need.
pub struct Kit {
    pub s: Session,
}

impl Kit {
    pub fn new() -> Self {
        Self::with_options(SessionOptions::default())
    }

    pub fn with_options(options: SessionOptions) -> Self {
        let mut s = Session::new(options);
        let machine = s.intern("testmach");
        assert!(s.on_machine(machine, None, &[]));
        assert!(s.on_define_maxpartitions(8));
        Self { s }
    }

    pub fn sym(&mut self, text: &str) -> Sym {
        self.s.intern(text)
    }

    fn locators(&mut self, locators: &[(&str, Option<&str>)]) -> Vec<LocatorSpec> {
        locators
            .iter()
            .map(|&(name, default)| LocatorSpec {
                name: self.sym(name),
                default: default.map(|d| self.s.intern(d)),
                required: default.is_none(),
            })
            .collect()
    }

    pub fn interface(&mut self, name: &str, locators: &[(&str, Option<&str>)]) {
        let name = self.sym(name);
        let locators = self.locators(locators);
        assert!(self.s.on_define_attribute(name, Some(locators), &[]));
    }

    pub fn device(&mut self, name: &str, locators: Option<&[(&str, Option<&str>)]>) {
        let name = self.sym(name);
        let locators = locators.map(|l| self.locators(l));
        assert!(self.s.on_define_device(name, DeviceKind::Device, locators, &[]));
    }

    pub fn pseudo(&mut self, name: &str) {
        let name = self.sym(name);
        assert!(self.s.on_define_device(name, DeviceKind::Pseudo, None, &[]));
    }

    pub fn attach(&mut self, device: &str, sites: &[&str]) {
        let device = self.sym(device);
        let sites: Vec<AtSite> = sites
            .iter()
            .map(|&site| match site {
                "root" => AtSite::Root,
                attr => AtSite::Attr(self.s.intern(attr)),
            })
            .collect();
        assert!(self.s.on_define_attachment(device, &sites, None, &[]));
    }

    pub fn end_definitions(&mut self) {
        assert!(self.s.on_end_of_definitions());
    }

    pub fn instance(&mut self, name: &str, at: Option<&str>, locators: &[(&str, &str)]) -> bool {
        let name = self.sym(name);
        let at = at.map(|a| self.s.intern(a));
        let locators: Vec<LocatorBinding> = locators
            .iter()
            .map(|&(n, v)| LocatorBinding {
                name: self.s.intern(n),
                value: (v != "?").then(|| self.s.intern(v)),
            })
            .collect();
        self.s.on_add_device_instance(name, at, &locators, 0)
    }

    pub fn config(&mut self, name: &str, root: &str) -> bool {
        let name = self.sym(name);
        let root = match root {
            "?" => DevSpec::Wildcard,
            dev => DevSpec::Name(self.s.intern(dev)),
        };
        self.s.on_add_config(name, root, None, &[])
    }

    /// Activity of the first live instance named `name`.
    pub fn state(&mut self, name: &str) -> Activity {
        let name = self.sym(name);
        let id = self.s.graph().find_instances(name)[0];
        self.s.graph().devi(id).active
    }

    pub fn errors(&self) -> Vec<ConfigError> {
        self.s.diagnostics().errors().cloned().collect()
    }
}
