//! The handful of importable packages the toolchain knows about. The
//! checker uses this table to resolve `pkg.Member` selectors and the
//! interpreter to execute them.

/// Result category of a stdlib function.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MemberResult {
    Unit,
    Str,
}

#[derive(Debug, Clone, Copy)]
pub struct Member {
    pub name: &'static str,
    pub result: MemberResult,
}

const FMT: &[Member] = &[
    Member { name: "Println", result: MemberResult::Unit },
    Member { name: "Print", result: MemberResult::Unit },
];

const STRINGS: &[Member] = &[
    Member { name: "Repeat", result: MemberResult::Str },
    Member { name: "ToUpper", result: MemberResult::Str },
];

pub fn members(path: &str) -> Option<&'static [Member]> {
    match path {
        "fmt" => Some(FMT),
        "strings" => Some(STRINGS),
        _ => None,
    }
}

pub fn lookup(path: &str, name: &str) -> Option<Member> {
    members(path)?.iter().copied().find(|m| m.name == name)
}

/// Default package name an unnamed import binds: the last path segment.
pub fn default_name(path: &str) -> &str {
    path.rsplit('/').next().unwrap_or(path)
}
