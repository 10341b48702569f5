//! Path and version-label utilities
//!
//! Pure string/path functions, no shared state.

use std::path::{Path, MAIN_SEPARATOR};

use crate::version::{VersionInfo, Versioned, UNKNOWN_VALUE};

/// Prefix of remote storage paths
pub const REMOTE_ROOT: &str = "engine";

/// Split a file name into (base name, extension) at the last dot
fn split_extension(file_name: &str) -> (&str, &str) {
    match file_name.rfind('.') {
        Some(idx) => (&file_name[..idx], &file_name[idx + 1..]),
        None => (file_name, ""),
    }
}

fn is_digits(s: &str) -> bool {
    !s.is_empty() && s.bytes().all(|b| b.is_ascii_digit())
}

fn file_name_of(path: &Path) -> &str {
    path.file_name().and_then(|n| n.to_str()).unwrap_or("")
}

/// Extension of the last path segment, without the dot
pub fn extension_of(path: &str) -> &str {
    let name = path.rsplit(['/', '\\']).next().unwrap_or(path);
    split_extension(name).1
}

/// Classify a path as a directory-like segment
///
/// Existing paths answer from the filesystem. Otherwise a name is
/// directory-like when its first three `.`/`-` separated parts are all
/// digits (`1.0`, `2-1-3`), when it is a hidden dot name (`.cache`), or when
/// it has no extension at all.
pub fn is_directory_like(path: &Path) -> bool {
    if path.exists() {
        return path.is_dir();
    }

    let name = file_name_of(path);
    if name.split(['.', '-']).take(3).all(is_digits) {
        return true;
    }

    let (base, ext) = split_extension(name);
    if base.trim().is_empty() {
        return true;
    }

    ext.is_empty()
}

/// Version label of a path
///
/// Directory-like paths are their own label. A leaf whose extension is all
/// digits (`lib.2`) is also its own label. Any other leaf takes the label of
/// its parent directory.
pub fn version_label(path: &Path) -> String {
    if is_directory_like(path) {
        return file_name_of(path).to_string();
    }

    let (_, ext) = split_extension(file_name_of(path));
    if is_digits(ext) {
        return file_name_of(path).to_string();
    }

    path.parent().map(file_name_of).unwrap_or("").to_string()
}

/// `label<sep>version`; `unknown` without a label, just the label without a version
pub fn join_path(label: &str, version: &str) -> String {
    if label.trim().is_empty() {
        return UNKNOWN_VALUE.to_string();
    }
    if version.trim().is_empty() {
        return label.to_string();
    }
    format!("{label}{MAIN_SEPARATOR}{version}")
}

/// `label/version` with forward slashes, as used inside archives
pub fn archive_path(info: &VersionInfo) -> String {
    if info.is_unknown() {
        return UNKNOWN_VALUE.to_string();
    }
    if is_unknown_or_blank(info.version()) {
        return info.label().to_string();
    }
    format!("{}/{}", info.label(), info.version())
}

/// Remote storage key: `engine/label[/version/[name/]]`
pub fn remote_path(info: &VersionInfo) -> String {
    if info.is_unknown() {
        return UNKNOWN_VALUE.to_string();
    }

    if is_unknown_or_blank(info.version()) {
        return normalize_to_unix(&format!("{REMOTE_ROOT}/{}", info.label()));
    }

    if is_unknown_or_blank(info.name()) {
        return normalize_to_unix(&format!(
            "{REMOTE_ROOT}/{}/{}/",
            info.label(),
            info.version()
        ));
    }

    normalize_to_unix(&format!(
        "{REMOTE_ROOT}/{}/{}/{}/",
        info.label(),
        info.version(),
        info.name()
    ))
}

/// Replace `null`/`unknown`/blank versions by a default
pub fn version_with_default(version: Option<&str>, default: &str) -> String {
    match version {
        Some(v) if !is_unknown_or_blank(v) && !v.eq_ignore_ascii_case("null") => v.to_string(),
        _ => default.to_string(),
    }
}

/// Forward slashes, no empty or `.` segments, `..` resolved where possible
///
/// A trailing separator is preserved.
pub fn normalize_to_unix(path: &str) -> String {
    let unix = path.replace('\\', "/");
    let absolute = unix.starts_with('/');
    let trailing = unix.ends_with('/') && unix.len() > 1;

    let mut segments: Vec<&str> = Vec::new();
    for segment in unix.split('/') {
        match segment {
            "" | "." => {}
            ".." => {
                if matches!(segments.last(), Some(last) if *last != "..") {
                    segments.pop();
                } else if !absolute {
                    segments.push("..");
                }
            }
            other => segments.push(other),
        }
    }

    let mut out = segments.join("/");
    if absolute {
        out.insert(0, '/');
    }
    if trailing && !out.is_empty() && !out.ends_with('/') {
        out.push('/');
    }
    out
}

fn is_unknown_or_blank(value: &str) -> bool {
    value.trim().is_empty() || value.eq_ignore_ascii_case(UNKNOWN_VALUE)
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::path::PathBuf;

    #[test]
    fn test_directory_like_names() {
        assert!(is_directory_like(Path::new("/nowhere/1.0")));
        assert!(is_directory_like(Path::new("/nowhere/2-1-3")));
        assert!(is_directory_like(Path::new("/nowhere/1.0.4.beta")));
        assert!(is_directory_like(Path::new("/nowhere/.cache")));
        assert!(is_directory_like(Path::new("/nowhere/target")));
        assert!(!is_directory_like(Path::new("/nowhere/greeter-1.0.plugin")));
        assert!(!is_directory_like(Path::new("/nowhere/notes.txt")));
    }

    #[test]
    fn test_version_label() {
        assert_eq!(version_label(Path::new("/nowhere/greeter/1.0")), "1.0");
        assert_eq!(
            version_label(Path::new("/nowhere/greeter/1.0/greeter.plugin")),
            "1.0"
        );
        assert_eq!(version_label(Path::new("/nowhere/lib.2")), "lib.2");
    }

    #[test]
    fn test_join_path() {
        assert_eq!(join_path("", "1.0"), UNKNOWN_VALUE);
        assert_eq!(join_path("greeter", ""), "greeter");
        let joined = PathBuf::from(join_path("greeter", "1.0"));
        assert_eq!(joined, Path::new("greeter").join("1.0"));
    }

    #[test]
    fn test_remote_path() {
        let info = VersionInfo::new("greeter", "1.0");
        assert_eq!(remote_path(&info), "engine/greeter/1.0/");

        let named = VersionInfo::new("greeter", "1.0").with_name("core");
        assert_eq!(remote_path(&named), "engine/greeter/1.0/core/");

        let unversioned = VersionInfo::new("greeter", "");
        assert_eq!(remote_path(&unversioned), "engine/greeter");

        assert_eq!(remote_path(&VersionInfo::unknown()), UNKNOWN_VALUE);
    }

    #[test]
    fn test_archive_path() {
        assert_eq!(archive_path(&VersionInfo::new("greeter", "1.0")), "greeter/1.0");
        assert_eq!(archive_path(&VersionInfo::new("greeter", "")), "greeter");
    }

    #[test]
    fn test_version_with_default() {
        assert_eq!(version_with_default(Some("null"), "1.0"), "1.0");
        assert_eq!(version_with_default(Some("UNKNOWN"), "1.0"), "1.0");
        assert_eq!(version_with_default(None, "1.0"), "1.0");
        assert_eq!(version_with_default(Some("2.0"), "1.0"), "2.0");
    }

    #[test]
    fn test_normalize_to_unix() {
        assert_eq!(normalize_to_unix("a\\b\\..\\c"), "a/c");
        assert_eq!(normalize_to_unix("engine//x/./y/"), "engine/x/y/");
        assert_eq!(normalize_to_unix("/a/../../b"), "/b");
        assert_eq!(normalize_to_unix("../a"), "../a");
    }

    #[test]
    fn test_extension_of() {
        assert_eq!(extension_of("/x/y/greeter-1.0.plugin"), "plugin");
        assert_eq!(extension_of("C:\\libs\\greeter"), "");
    }

    proptest::proptest! {
        #[test]
        fn prop_normalize_is_idempotent(path in "[a-z./\\\\]{0,24}") {
            let once = normalize_to_unix(&path);
            proptest::prop_assert_eq!(normalize_to_unix(&once), once.clone());
            proptest::prop_assert!(!once.contains('\\'));
        }
    }
}
