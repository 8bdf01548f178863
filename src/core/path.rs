//! POSIX-style path helpers.
//!
//! Every path handed to the shell is absolute: it always starts with `/`,
//! never ends with one (except the root itself), and carries no `.` or `..`
//! segments. Path equality elsewhere in the crate relies on this form.

/// Normalize a path by resolving `.` and `..` components.
///
/// Backslashes are treated as separators. `..` above the root is ignored.
pub fn normalize(path: &str) -> String {
    let path = path.replace('\\', "/");
    let mut parts: Vec<&str> = Vec::new();
    for part in path.split('/') {
        match part {
            "" | "." => {}
            ".." => {
                parts.pop();
            }
            _ => parts.push(part),
        }
    }

    format!("/{}", parts.join("/"))
}

/// Join `rel` onto `base`.
///
/// An absolute `rel` replaces `base` entirely. An empty `rel`, or `/` alone,
/// yields the normalized base.
pub fn join(base: &str, rel: &str) -> String {
    if rel.is_empty() || rel == "/" {
        return normalize(base);
    }
    if rel.starts_with('/') {
        return normalize(rel);
    }

    if base.ends_with('/') {
        normalize(&format!("{}{}", base, rel))
    } else {
        normalize(&format!("{}/{}", base, rel))
    }
}

/// Check whether `child` is `parent` or lies below it.
pub fn is_sub_path(parent: &str, child: &str) -> bool {
    let parent = normalize(parent);
    let child = normalize(child);
    if parent == "/" {
        return true;
    }
    child == parent || child.starts_with(&format!("{}/", parent))
}

/// Split a destination into its segments, keeping `.` and `..` as-is.
///
/// Returns whether the destination is absolute alongside the segments.
pub fn segments(path: &str) -> (bool, Vec<&str>) {
    let absolute = path.starts_with('/');
    let parts = path.split('/').filter(|s| !s.is_empty()).collect();
    (absolute, parts)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(""), "/");
        assert_eq!(normalize("/"), "/");
        assert_eq!(normalize("a/../b"), "/b");
        assert_eq!(normalize("Notes/./Drafts"), "/Notes/Drafts");
        assert_eq!(normalize("a/b/c/../../d"), "/a/d");
        assert_eq!(normalize("/../.."), "/");
        assert_eq!(normalize("//a//b/"), "/a/b");
        assert_eq!(normalize("a\\b"), "/a/b");
    }

    #[test]
    fn test_normalize_idempotent() {
        for p in ["", "/", "a/../b", "../x/./y/", "/a//b/../../..", "Notes/report.txt"] {
            let once = normalize(p);
            assert_eq!(normalize(&once), once, "not idempotent for {:?}", p);
        }
    }

    #[test]
    fn test_join() {
        assert_eq!(join("/x", "/y"), "/y");
        assert_eq!(join("/x", "y"), "/x/y");
        assert_eq!(join("/x/", "y"), "/x/y");
        assert_eq!(join("/x", ""), "/x");
        assert_eq!(join("/x", "/"), "/x");
        assert_eq!(join("/Notes/", "/"), "/Notes");
        assert_eq!(join("/", "."), "/");
        assert_eq!(join("/a/b", ".."), "/a");
    }

    #[test]
    fn test_is_sub_path() {
        assert!(is_sub_path("/", "/anything"));
        assert!(is_sub_path("/a", "/a"));
        assert!(is_sub_path("/a", "/a/b"));
        assert!(!is_sub_path("/a", "/ab"));
        assert!(!is_sub_path("/a/b", "/a"));
    }

    #[test]
    fn test_segments() {
        assert_eq!(segments("/A/B"), (true, vec!["A", "B"]));
        assert_eq!(segments("A//../B/"), (false, vec!["A", "..", "B"]));
        assert_eq!(segments("/"), (true, vec![]));
    }
}
