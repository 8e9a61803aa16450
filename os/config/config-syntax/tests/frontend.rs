use config_model::{ConfigError, Phase, Session, SessionOptions};
use config_syntax::Compiler;
use std::fs;
use std::path::Path;
use tempfile::TempDir;

const FILES: &str = "\
maxpartitions 8
maxusers 2 8 64
device mainbus {}
attach mainbus at root
define scsi {}
device sd
attach sd at scsi
defflag opt_ddb.h DDB
file kern/init_main.c
file dev/sd.c sd needs-count
";

const MACHINE: &str = "\
device esp: scsi
attach esp at mainbus
file arch/demo/esp.c esp
major { sd = 4 }
";

fn tree() -> TempDir {
    let dir = tempfile::tempdir().expect("temporary directory");
    write(dir.path(), "conf/files", FILES);
    write(dir.path(), "arch/demo/conf/files.demo", MACHINE);
    dir
}

fn write(root: &Path, name: &str, text: &str) {
    let path = root.join(name);
    fs::create_dir_all(path.parent().expect("has a parent")).expect("mkdir");
    fs::write(path, text).expect("write");
}

fn compile(root: &Path, text: &str) -> (bool, Session) {
    let mut compiler = Compiler::new(Session::default(), root);
    let ok = compiler.compile_source(&root.join("GENERIC"), text);
    (ok, compiler.into_session())
}

fn errors(session: &Session) -> Vec<String> {
    session.diagnostics().errors().map(ToString::to_string).collect()
}

#[test]
fn machine_files_are_read_before_selections() {
    let dir = tree();
    let (ok, session) = compile(
        dir.path(),
        "machine demo\n\
         ident \"DEMO\"\n\
         options DDB\n\
         mainbus0 at root\n\
         esp0 at mainbus0\n\
         sd* at esp?\n\
         config netbsd root on sd0a\n",
    );
    assert!(ok, "{:?}", errors(&session));
    assert_eq!(session.phase(), Phase::Finished);
    let names: Vec<_> = session
        .registry()
        .files()
        .filter(|(_, f)| f.selected)
        .map(|(_, f)| f.path.as_str())
        .collect();
    assert_eq!(names, ["kern/init_main.c", "dev/sd.c", "arch/demo/esp.c"]);
}

#[test]
fn includes_resolve_next_to_the_including_file() {
    let dir = tree();
    write(dir.path(), "std.demo", "mainbus0 at root\nesp0 at mainbus0\n");
    let (ok, session) = compile(
        dir.path(),
        "machine demo\ninclude \"std.demo\"\nconfig netbsd root on ?\nmaxusers 4\n",
    );
    assert!(ok, "{:?}", errors(&session));
}

#[test]
fn missing_include_is_an_error_unless_optional() {
    let dir = tree();
    let (ok, session) = compile(
        dir.path(),
        "machine demo\ncinclude \"GENERIC.local\"\ninclude \"nope\"\nconfig netbsd root on ?\nmaxusers 4\n",
    );
    assert!(!ok);
    let errors = errors(&session);
    assert_eq!(errors.len(), 1, "{errors:?}");
    assert!(errors[0].starts_with("cannot open"), "{errors:?}");
}

#[test]
fn syntax_errors_carry_their_location() {
    let dir = tree();
    let (ok, session) = compile(
        dir.path(),
        "machine demo\nmaxusers 4\noptions = 1\nconfig netbsd root on ?\n",
    );
    assert!(!ok);
    let diagnostic = session
        .diagnostics()
        .iter()
        .find(|d| matches!(d.error, Some(ConfigError::Syntax(_))))
        .expect("syntax error recorded");
    assert_eq!(diagnostic.location.line, 3);
    assert!(diagnostic.location.file.is_some_and(|f| f.as_str().ends_with("GENERIC")));
}

#[test]
fn broken_definitions_stop_the_run() {
    let dir = tree();
    write(dir.path(), "arch/demo/conf/files.demo", "device esp: nowhere\n");
    let (ok, session) = compile(
        dir.path(),
        "machine demo\nmaxusers 4\nconfig netbsd root on ?\n",
    );
    assert!(!ok);
    assert!(session.registry().configs().next().is_none());
    assert_ne!(session.phase(), Phase::Finished);
}

#[test]
fn ioconf_needs_no_machine_files() {
    let dir = tempfile::tempdir().expect("temporary directory");
    let (ok, session) = compile(
        dir.path(),
        "ioconf demo\n\
         device mainbus {}\n\
         attach mainbus at root\n\
         mainbus0 at root\n",
    );
    assert!(ok, "{:?}", errors(&session));
    assert_eq!(session.settings().ioconf.map(|s| s.as_str()), Some("demo"));
}

#[test]
fn caller_srcdir_wins_over_source_line() {
    let dir = tree();
    let options = SessionOptions {
        srcdir: Some(dir.path().display().to_string()),
        ..SessionOptions::default()
    };
    let mut compiler = Compiler::new(Session::new(options), "/nonexistent");
    let ok = compiler.compile_source(
        &dir.path().join("GENERIC"),
        "source \"/elsewhere\"\nmachine demo\nmaxusers 4\nconfig netbsd root on ?\n",
    );
    assert!(ok, "{:?}", errors(compiler.session()));
}

#[test]
fn unreadable_top_level_file_is_fatal() {
    let dir = tempfile::tempdir().expect("temporary directory");
    let mut compiler = Compiler::new(Session::default(), dir.path());
    assert!(compiler.compile_file(&dir.path().join("missing")).is_err());
}
