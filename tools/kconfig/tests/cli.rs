use std::fs;
use std::path::Path;
use std::process::{Command, Output};
use tempfile::TempDir;

const FILES: &str = "\
maxpartitions 8
device mainbus {}
attach mainbus at root
defflag opt_ddb.h DDB
file kern/init_main.c
";

fn tree(config: &str) -> TempDir {
    let dir = tempfile::tempdir().expect("temporary directory");
    for (name, text) in [
        ("sys/conf/files", FILES),
        ("sys/arch/demo/conf/files.demo", ""),
        ("sys/arch/demo/conf/GENERIC", config),
    ] {
        let path = dir.path().join(name);
        fs::create_dir_all(path.parent().expect("has a parent")).expect("mkdir");
        fs::write(path, text).expect("write");
    }
    dir
}

fn kconfig(cwd: &Path, args: &[&str]) -> Output {
    Command::new(env!("CARGO_BIN_EXE_kconfig"))
        .current_dir(cwd)
        .args(args)
        .output()
        .expect("runs kconfig")
}

#[test]
fn writes_the_build_directory() {
    let dir = tree("machine demo\nmaxusers 8\noptions DDB\nmainbus0 at root\nconfig netbsd root on ?\n");
    let output = kconfig(dir.path(), &["sys/arch/demo/conf/GENERIC"]);
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));

    let build = dir.path().join("sys/arch/demo/compile/GENERIC");
    let header = fs::read_to_string(build.join("opt_ddb.h")).expect("header written");
    assert_eq!(header, "#define\tDDB\t1\n");
    assert!(build.join("Makefile").exists());
    assert!(build.join("swapnetbsd.c").exists());
}

#[test]
fn errors_fail_the_run() {
    let dir = tree("machine demo\noptions DDB=1\nmainbus0 at root\nconfig netbsd root on ?\n");
    let output = kconfig(dir.path(), &["sys/arch/demo/conf/GENERIC"]);
    assert_eq!(output.status.code(), Some(1));
    let stderr = String::from_utf8_lossy(&output.stderr);
    assert!(stderr.contains("must not have a value"), "{stderr}");
    assert!(stderr.contains("need \"maxusers\" line"), "{stderr}");
    assert!(!dir.path().join("sys/arch/demo/compile").exists());
}

#[test]
fn lint_lists_without_writing() {
    let dir = tree("machine demo\nmainbus0 at root\nconfig netbsd root on ?\n");
    let output = kconfig(
        dir.path(),
        &["-x", "--maxusers", "4", "-b", "out", "sys/arch/demo/conf/GENERIC"],
    );
    assert!(output.status.success(), "{}", String::from_utf8_lossy(&output.stderr));
    let stdout = String::from_utf8_lossy(&output.stdout);
    assert!(stdout.lines().any(|l| l == "Makefile"), "{stdout}");
    assert!(!dir.path().join("out").exists());
}

#[test]
fn missing_config_file() {
    let dir = tempfile::tempdir().expect("temporary directory");
    let output = kconfig(dir.path(), &["NOPE"]);
    assert!(!output.status.success());
    assert!(String::from_utf8_lossy(&output.stderr).contains("cannot read"));
}
