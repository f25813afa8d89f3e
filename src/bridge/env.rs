//! Applies and removes a request's `key=value` environment snapshot in the
//! host's global variable namespace.

use crate::host::HostRuntime;

/// Splits an environment entry at the first `=`.
///
/// Values may themselves contain `=` characters; only the first occurrence
/// delimits the key. Entries without any `=` are malformed and yield `None`.
pub(crate) fn split_entry(entry: &str) -> Option<(&str, &str)> {
    let eq = memchr::memchr(b'=', entry.as_bytes())?;
    Some((&entry[..eq], &entry[eq + 1..]))
}

/// Sets every entry's variable in the host's global namespace.
pub(crate) fn apply<H: HostRuntime>(host: &mut H, entries: &[String]) {
    for entry in entries {
        if let Some((key, value)) = split_entry(entry) {
            host.set_global(key, value);
        }
    }
}

/// Unsets every entry's variable. The value portion is ignored.
pub(crate) fn remove<H: HostRuntime>(host: &mut H, entries: &[String]) {
    for entry in entries {
        if let Some((key, _)) = split_entry(entry) {
            host.unset_global(key);
        }
    }
}
