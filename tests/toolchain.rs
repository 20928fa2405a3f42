//! Build/run pipeline tests over real package directories.

use std::fs;
use tempfile::TempDir;

fn package(files: &[(&str, &str)]) -> TempDir {
    let dir = TempDir::new().unwrap();
    for (name, src) in files {
        fs::write(dir.path().join(name), src).unwrap();
    }
    dir
}

#[test]
fn clean_build_is_silent() {
    let dir = package(&[(
        "main.mino",
        "package main\n\nfunc main() {\n\tprint(1)\n}\n",
    )]);
    assert!(mino::build_output(dir.path()).is_empty());
}

#[test]
fn build_reports_unused_import_with_location() {
    let dir = package(&[(
        "main.mino",
        "package main\n\nimport \"strings\"\n\nfunc main() {\n}\n",
    )]);
    let out = String::from_utf8(mino::build_output(dir.path())).unwrap();
    assert!(
        out.contains("main.mino:3:8: imported and not used: \"strings\""),
        "got: {}",
        out
    );
}

#[test]
fn build_reports_undefined_names() {
    let dir = package(&[(
        "main.mino",
        "package main\n\nfunc main() {\n\tprint(zap)\n}\n",
    )]);
    let out = String::from_utf8(mino::build_output(dir.path())).unwrap();
    assert!(out.contains("undefined: zap"), "got: {}", out);
}

#[test]
fn run_captures_program_output() {
    let dir = package(&[(
        "main.mino",
        "package main\n\nfunc main() {\n\tprintln(\"hello\")\n\tpanic(\"bye\")\n}\n",
    )]);
    let out = String::from_utf8(mino::run_output(dir.path())).unwrap();
    assert_eq!(out, "hello\npanic: bye\n");
}

#[test]
fn tool_output_builds_only_for_non_main_packages() {
    let dir = package(&[(
        "lib.mino",
        "package lib\n\nfunc Helper() int {\n\treturn 1\n}\n",
    )]);
    assert!(mino::tool_output(dir.path()).is_empty());
}

#[test]
fn tool_output_prefers_diagnostics_over_running() {
    let dir = package(&[(
        "main.mino",
        "package main\n\nfunc main() {\n\tx := 1\n\tpanic(\"boom\")\n}\n",
    )]);
    let out = String::from_utf8(mino::tool_output(dir.path())).unwrap();
    assert!(out.contains("declared and not used: x"), "got: {}", out);
    assert!(!out.contains("boom"), "got: {}", out);
}

#[test]
fn multi_file_packages_share_one_namespace() {
    let dir = package(&[
        (
            "a.mino",
            "package main\n\nfunc greeting() string {\n\treturn \"hi\"\n}\n",
        ),
        (
            "b.mino",
            "package main\n\nfunc main() {\n\tprintln(greeting())\n}\n",
        ),
    ]);
    let out = String::from_utf8(mino::run_output(dir.path())).unwrap();
    assert_eq!(out, "hi\n");
}

#[test]
fn parse_errors_carry_the_file_position() {
    let dir = package(&[("main.mino", "package main\n\nfunc main( {\n}\n")]);
    let out = String::from_utf8(mino::build_output(dir.path())).unwrap();
    assert!(out.contains("main.mino:3"), "got: {}", out);
}
