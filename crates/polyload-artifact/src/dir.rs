//! Directory enumeration and the default keep predicate

use std::collections::{BTreeSet, HashSet};
use std::fs;
use std::path::PathBuf;
use std::sync::Arc;

use polyload_core::{extension_of, normalize_to_unix, UNKNOWN_VALUE};

use crate::artifact::{Artifact, KeepPredicate};

/// Default keep predicate for an artifact
///
/// Keeps an input whose unix-style path contains `<root>/<name>`
/// (case-insensitive) and whose extension is accepted, or any input under
/// `<root>/runtime/`.
pub fn keep_predicate(root: &str, name: &str, extensions: &BTreeSet<String>) -> KeepPredicate {
    let root = root.trim();
    let known_name = !name.trim().is_empty() && !name.eq_ignore_ascii_case(UNKNOWN_VALUE);

    let target = match (root.is_empty(), known_name) {
        (true, true) => name.to_string(),
        (false, true) => format!("{root}/{name}"),
        _ => root.to_string(),
    };
    let target = normalize_to_unix(&target).to_lowercase();

    let runtime = if root.is_empty() {
        "runtime/".to_string()
    } else {
        normalize_to_unix(&format!("{root}/runtime/")).to_lowercase()
    };

    let extensions = extensions.clone();
    Arc::new(move |input: &str| {
        let unix = normalize_to_unix(input).to_lowercase();
        tracing::trace!(input = %unix, target = %target, runtime = %runtime, "testing keep predicate");

        let in_target = !target.is_empty()
            && unix.contains(&target)
            && extensions.contains(extension_of(&unix));
        in_target || unix.contains(&runtime)
    })
}

/// The two directories an artifact is looked up in: `<base>/<location>`
/// and `<base>/../<location>`
pub fn candidate_dirs(artifact: &Artifact) -> Vec<PathBuf> {
    let location = artifact.location();
    vec![
        artifact.base_dir().join(&location),
        artifact.base_dir().join("..").join(&location),
    ]
}

/// Files directly under the candidate directories that the artifact keeps
///
/// Order follows the candidate directories, then file name. A file reached
/// through both directories is listed once.
pub fn enumerate_dir(artifact: &Artifact) -> Vec<PathBuf> {
    tracing::debug!(artifact = %artifact, "enumerating directory artifact");

    let mut seen = HashSet::new();
    let mut found = Vec::new();

    for dir in candidate_dirs(artifact) {
        let entries = match fs::read_dir(&dir) {
            Ok(entries) => entries,
            Err(e) => {
                tracing::debug!(dir = %dir.display(), error = %e, "skipping directory");
                continue;
            }
        };

        let mut files: Vec<PathBuf> = entries
            .filter_map(Result::ok)
            .map(|entry| entry.path())
            .filter(|path| path.is_file())
            .collect();
        files.sort();

        for file in files {
            if !artifact.keep(&file.to_string_lossy()) {
                continue;
            }
            let key = fs::canonicalize(&file).unwrap_or_else(|_| file.clone());
            if seen.insert(key) {
                found.push(file);
            }
        }
    }

    found
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::artifact::BinaryEnumerator;
    use std::path::Path;

    fn touch(path: &Path) {
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, b"bin").unwrap();
    }

    fn plugin_set() -> BTreeSet<String> {
        BTreeSet::from(["plugin".to_string()])
    }

    #[test]
    fn test_keep_predicate_matches_target_and_extension() {
        let keep = keep_predicate("libs", "greeter/1.0", &plugin_set());

        assert!(keep("/app/libs/greeter/1.0/greeter.plugin"));
        assert!(keep("C:\\app\\LIBS\\Greeter\\1.0\\greeter.PLUGIN"));
        assert!(!keep("/app/libs/greeter/1.0/readme.txt"));
        assert!(!keep("/app/libs/greeter/2.0/greeter.plugin"));
    }

    #[test]
    fn test_keep_predicate_accepts_runtime() {
        let keep = keep_predicate("libs", "greeter/1.0", &plugin_set());
        assert!(keep("/app/libs/runtime/support.txt"));

        let rootless = keep_predicate("", UNKNOWN_VALUE, &plugin_set());
        assert!(rootless("runtime/support.bin"));
        assert!(!rootless("other/support.plugin"));
    }

    #[test]
    fn test_enumerate_filters_and_dedupes() {
        let scratch = tempfile::tempdir().unwrap();
        let base = scratch.path();
        let version_dir = base.join("libs").join("greeter").join("1.0");
        touch(&version_dir.join("b.plugin"));
        touch(&version_dir.join("a.plugin"));
        touch(&version_dir.join("notes.txt"));

        // absolute root: both candidate directories resolve to the same place
        let artifact = Artifact::dir()
            .version_dir(&version_dir)
            .base_dir(base)
            .build();

        let found = artifact.enumerate_binaries();
        let names: Vec<_> = found
            .iter()
            .map(|p| p.file_name().unwrap().to_string_lossy().into_owned())
            .collect();
        assert_eq!(names, vec!["a.plugin", "b.plugin"]);
    }

    #[test]
    fn test_enumerate_sibling_layout() {
        let scratch = tempfile::tempdir().unwrap();
        let base = scratch.path();
        let work = base.join("work");
        fs::create_dir_all(&work).unwrap();
        touch(&base.join("libs").join("greeter").join("2.0").join("greeter.plugin"));

        let artifact = Artifact::dir()
            .root("libs")
            .name("greeter/2.0")
            .base_dir(&work)
            .build();

        assert_eq!(artifact.enumerate_binaries().len(), 1);
    }

    #[test]
    fn test_missing_directory_yields_nothing() {
        let artifact = Artifact::dir()
            .root("does-not-exist")
            .name("greeter")
            .base_dir(std::env::temp_dir())
            .build();
        assert!(artifact.enumerate_binaries().is_empty());
    }
}
