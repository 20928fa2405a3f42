//! Predicate execution.
//!
//! A runner turns the current temp directory into one byte stream the
//! reducer matches its regex against. It is synchronous: the call returns
//! only when the predicate has run to completion. The runner never shares
//! file handles with the reducer; it reads the temp files fresh each time.

use std::path::Path;
use std::process::Command;

pub enum Runner {
    /// User-supplied shell snippet, run with `sh -c` in the temp directory,
    /// stdout and stderr combined.
    Shell(String),
    /// The default predicate: build the package in-process, and run it when
    /// it is a main package. Diagnostics or program output are the stream;
    /// a clean build of a non-main package produces nothing.
    Tool,
}

impl Runner {
    pub fn run(&self, dir: &Path) -> Vec<u8> {
        match self {
            Runner::Shell(script) => match Command::new("sh")
                .arg("-c")
                .arg(script)
                .current_dir(dir)
                .output()
            {
                Ok(out) => {
                    let mut bytes = out.stdout;
                    bytes.extend_from_slice(&out.stderr);
                    bytes
                }
                Err(err) => format!("sh: {}\n", err).into_bytes(),
            },
            Runner::Tool => crate::tool_output(dir),
        }
    }
}
