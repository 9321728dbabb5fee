//! os-release parser.

/// Returns the `VERSION_ID` value with surrounding double quotes removed.
///
/// The last `VERSION_ID` line wins. Returns an empty string when the file has
/// none.
pub fn parse_os_release(payload: &[u8]) -> String {
    let text = String::from_utf8_lossy(payload);

    text.lines()
        .filter_map(|line| line.trim().split_once('='))
        .filter(|(key, _)| key.trim() == "VERSION_ID")
        .last()
        .map(|(_, value)| value.trim().trim_matches('"').to_string())
        .unwrap_or_default()
}
