//! Parsers for the files the scanner pulls out of image layers.
//!
//! Both parsers treat their input as untrusted layer content: malformed data
//! yields fewer results, never an error or a panic.

pub mod installed;
pub mod os_release;

/// Path of the apk installed-package database inside a layer.
pub const INSTALLED_DB_PATH: &str = "lib/apk/db/installed";

/// Path of the os-release file inside a layer.
pub const OS_RELEASE_PATH: &str = "etc/os-release";

pub use installed::parse_installed;
pub use os_release::parse_os_release;
