pub mod diagnostics;
pub mod interp;
pub mod lexer;
pub mod parser;
pub mod pretty;
pub mod reduce;
pub mod runner;
pub mod span;
pub mod stdlib;
pub mod typeck;

use diagnostics::render;
use parser::SourceFile;
use std::path::Path;
use typeck::env::Info;

/// Parse and type-check the package in `dir`. Returns the rendered
/// diagnostics; empty means a clean build.
pub fn build_output(dir: &Path) -> Vec<u8> {
    match load_and_check(dir) {
        Ok((_, sources, _, info)) => render_diags(&sources, &info),
        Err(msg) => msg,
    }
}

/// Build and, if it is a main package, run it. This is the default reduce
/// predicate: any failure or program output produces bytes, a quiet build
/// of a non-main package produces none.
pub fn tool_output(dir: &Path) -> Vec<u8> {
    match load_and_check(dir) {
        Ok((ast, sources, pkg, info)) => {
            let diags = render_diags(&sources, &info);
            if !diags.is_empty() {
                return diags;
            }
            if pkg == "main" {
                interp::run(&ast)
            } else {
                Vec::new()
            }
        }
        Err(msg) => msg,
    }
}

/// Build and run `func main`, regardless of diagnostics being fatal for
/// `build`: diagnostics win, then the program's own output.
pub fn run_output(dir: &Path) -> Vec<u8> {
    match load_and_check(dir) {
        Ok((ast, sources, pkg, info)) => {
            let diags = render_diags(&sources, &info);
            if !diags.is_empty() {
                return diags;
            }
            if pkg != "main" {
                return b"cannot run a non-main package\n".to_vec();
            }
            interp::run(&ast)
        }
        Err(msg) => msg,
    }
}

type Loaded = (parser::ast::Ast, Vec<SourceFile>, String, Info);

fn load_and_check(dir: &Path) -> Result<Loaded, Vec<u8>> {
    match parser::load_dir(dir) {
        Ok((ast, sources, pkg)) => {
            let info = typeck::check(&ast);
            Ok((ast, sources, pkg, info))
        }
        Err(err) => Err(format!("{}\n", err).into_bytes()),
    }
}

fn render_diags(sources: &[SourceFile], info: &Info) -> Vec<u8> {
    let mut diags: Vec<_> = info.diags.iter().collect();
    diags.sort_by_key(|d| (d.span.file_id, d.span.start));
    let mut out = Vec::new();
    for d in diags {
        let src = &sources[d.span.file_id as usize];
        out.extend_from_slice(render(&src.path, &src.lines, d.span, &d.msg).as_bytes());
        out.push(b'\n');
    }
    out
}
