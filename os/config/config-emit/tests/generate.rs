use config_emit::{Artifact, EmitOptions, generate, write_all};
use config_model::Session;
use config_syntax::Compiler;
use std::fs;
use std::path::Path;

const FILES: &str = "\
maxpartitions 8
maxusers 2 8 64
device mainbus {}
attach mainbus at root
define scsi { target, [lun = 0] }
device sd
attach sd at scsi
defflag opt_ddb.h DDB
defparam opt_ddb.h KGDB := 1
file kern/init_main.c
file dev/sd.c sd needs-count
file kern/kgdb.c kgdb
";

const MACHINE: &str = "\
device esp: scsi
attach esp at mainbus
file arch/demo/esp.c esp
file arch/demo/locore.S
device-major sd char 13 block 4 sd
makeoptions esp COPTS+=\"-DESP\"
";

const GENERIC: &str = "\
machine demo
ident DEMO
options DDB
options UNDECLARED
makeoptions DEBUG=\"-g\"
mainbus0 at root
esp0 at mainbus0
sd0 at esp0 target 0
sd1 at esp0 target 1
config netbsd root on sd0a
";

fn session(text: &str) -> Session {
    let dir = tempfile::tempdir().expect("temporary directory");
    for (name, text) in [
        ("conf/files", FILES),
        ("arch/demo/conf/files.demo", MACHINE),
    ] {
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().expect("has a parent")).expect("mkdir");
        fs::write(path, text).expect("write");
    }
    let mut compiler = Compiler::new(Session::default(), dir.path());
    let ok = compiler.compile_source(Path::new("GENERIC"), text);
    let session = compiler.into_session();
    let errors: Vec<_> = session.diagnostics().errors().map(ToString::to_string).collect();
    assert!(ok, "{errors:?}");
    session
}

fn find<'a>(artifacts: &'a [Artifact], name: &str) -> &'a str {
    artifacts
        .iter()
        .find(|a| a.name == name)
        .map(|a| a.contents.as_str())
        .unwrap_or_else(|| panic!("no {name} among {:?}", names(artifacts)))
}

fn names(artifacts: &[Artifact]) -> Vec<&str> {
    artifacts.iter().map(|a| a.name.as_str()).collect()
}

#[test]
fn full_configuration() {
    let session = session(GENERIC);
    let artifacts = generate(&session, &EmitOptions::default()).expect("generates");
    assert_eq!(
        names(&artifacts),
        [
            "ioconf.c",
            "locators.h",
            "Makefile",
            "opt_ddb.h",
            "sd.h",
            "devsw.c",
            "swapnetbsd.c"
        ]
    );

    let makefile = find(&artifacts, "Makefile");
    assert!(makefile.contains("MACHINE=demo\n"));
    assert!(makefile.contains("KERNIDENT=DEMO\n"));
    assert!(makefile.contains("IDENT=-DUNDECLARED\n"), "{makefile}");
    assert!(makefile.contains("PARAM=-DMAXUSERS=8\n"));
    assert!(makefile.contains("DEBUG=-g\n"));
    assert!(makefile.contains("COPTS+=-DESP\n"));
    assert!(makefile.contains("\t$S/dev/sd.c"));
    assert!(makefile.contains("locore.o: $S/arch/demo/locore.S\n\t${NORMAL_S}\n"));
    assert!(!makefile.contains("kgdb"));

    assert_eq!(
        find(&artifacts, "opt_ddb.h"),
        "#define\tDDB\t1\n/* option `KGDB' not defined */\n"
    );
    assert_eq!(find(&artifacts, "sd.h"), "#define\tNSD\t2\n");
    assert_eq!(
        find(&artifacts, "locators.h"),
        "#define\tMAINBUSCF_NLOCS\t0\n\
         #define\tSCSICF_TARGET\t0\n\
         #define\tSCSICF_LUN\t1\n\
         #define\tSCSICF_LUN_DEFAULT\t0\n\
         #define\tSCSICF_NLOCS\t2\n"
    );

    let ioconf = find(&artifacts, "ioconf.c");
    assert!(ioconf.contains("static int loc[4] = {\n\t0, 0, 1, 0\n};"), "{ioconf}");
    assert!(ioconf.contains("{ \"sd\", \"sd\", 1, NORM, loc+2, 0x0, &pspec1 }"), "{ioconf}");
    assert!(ioconf.contains("{ \"mainbus\", \"mainbus\", 0, NORM, NULL, 0x0, NULL }"));

    let devsw = find(&artifacts, "devsw.c");
    assert!(devsw.contains("\t&sd_bdevsw,\t/* 4 */\n"));
    assert!(devsw.contains("const int sys_bdevsws = 5;"));
    assert!(devsw.contains("const int sys_cdevsws = 14;"));
    assert!(devsw.contains("{ \"sd\", 4, 13 }"));

    let swap = find(&artifacts, "swapnetbsd.c");
    assert!(swap.contains("dev_t\trootdev = makedev(4, 0);\t/* sd0a */"), "{swap}");
    assert!(swap.contains("dev_t\tdumpdev = NODEV;\t/* wildcarded */"));
    assert!(swap.contains("rootfstype = ROOT_FSTYPE_ANY;"));
}

#[test]
fn lint_values_replace_unset_options() {
    let session = session(GENERIC);
    let artifacts = generate(&session, &EmitOptions { lint: true }).expect("generates");
    assert_eq!(
        find(&artifacts, "opt_ddb.h"),
        "#define\tDDB\t1\n#define\tKGDB\t1\n"
    );
}

#[test]
fn ioconf_runs_only_emit_tables() {
    let mut compiler = Compiler::new(Session::default(), "/nonexistent");
    let ok = compiler.compile_source(
        Path::new("ioconf.demo"),
        "ioconf demo\ndevice mainbus {}\nattach mainbus at root\nmainbus0 at root\n",
    );
    assert!(ok);
    let artifacts = generate(compiler.session(), &EmitOptions::default()).expect("generates");
    assert_eq!(names(&artifacts), ["ioconf.c", "locators.h"]);
}

#[test]
fn written_files_match_artifacts() {
    let session = session(GENERIC);
    let artifacts = generate(&session, &EmitOptions::default()).expect("generates");
    let build = tempfile::tempdir().expect("temporary directory");
    assert_eq!(write_all(build.path(), &artifacts).expect("writes"), artifacts.len());
    let header = fs::read_to_string(build.path().join("sd.h")).expect("reads");
    assert_eq!(header, "#define\tNSD\t2\n");
}
