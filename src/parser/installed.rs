//! apk installed-database parser.
//!
//! The database is a sequence of records separated by blank lines. Each line
//! of a record is a one-character tag, a separator (`:`), and a value:
//!
//! ```text
//! C:Q1...
//! P:musl
//! V:1.2.3-r0
//! A:x86_64
//!
//! P:busybox
//! V:1.35.0-r1
//! ```
//!
//! Only `P` (name) and `V` (version) are read; every other tag is ignored.

use crate::model::Package;

/// Parses an apk installed database into packages, in file order.
///
/// Records without both a non-empty name and a non-empty version are dropped.
/// Invalid UTF-8 is replaced rather than rejected.
pub fn parse_installed(payload: &[u8]) -> Vec<Package> {
    let text = String::from_utf8_lossy(payload);
    let mut packages = Vec::new();
    let mut name: Option<&str> = None;
    let mut version: Option<&str> = None;

    for line in text.lines() {
        let line = line.trim_end_matches('\r');
        if line.is_empty() {
            push_record(&mut packages, name.take(), version.take());
            continue;
        }

        let mut chars = line.chars();
        let tag = chars.next();
        // Skip the one-character separator; what remains is the value.
        chars.next();
        let value = chars.as_str();

        match tag {
            Some('P') => name = Some(value),
            Some('V') => version = Some(value),
            _ => {}
        }
    }
    push_record(&mut packages, name, version);

    packages
}

fn push_record(packages: &mut Vec<Package>, name: Option<&str>, version: Option<&str>) {
    if let (Some(name), Some(version)) = (name, version) {
        if !name.is_empty() && !version.is_empty() {
            packages.push(Package::new(name, version));
        }
    }
}
