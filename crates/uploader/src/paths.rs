//! POSIX path helpers for the remote side.
//!
//! Remote paths are always `/`-separated strings regardless of the
//! local platform, so `std::path` is only used for validation of the
//! relative part.

use std::path::{Component, Path};

use crate::error::UploadError;

/// Joins a remote root and a relative path with a single `/`.
pub fn remote_join(root: &str, relative: &str) -> String {
    let trimmed = root.trim_end_matches('/');
    let rel = relative.trim_start_matches('/');

    if trimmed.is_empty() {
        if root.starts_with('/') {
            format!("/{rel}")
        } else {
            rel.to_string()
        }
    } else if rel.is_empty() {
        trimmed.to_string()
    } else {
        format!("{trimmed}/{rel}")
    }
}

/// Returns `path` without its final segment, or `None` for a bare name.
pub fn remote_parent(path: &str) -> Option<&str> {
    let (parent, _) = path.trim_end_matches('/').rsplit_once('/')?;
    if parent.is_empty() {
        Some("/")
    } else {
        Some(parent)
    }
}

/// Decomposes a directory into its ancestor chain, outermost first.
///
/// `/a/b/c` yields `["/a", "/a/b", "/a/b/c"]`; a relative `a/b` yields
/// `["a", "a/b"]`. Empty and `.` segments are skipped, and the
/// filesystem root itself is never listed.
pub fn remote_ancestors(dir: &str) -> Vec<String> {
    let absolute = dir.starts_with('/');
    let mut current = String::new();
    let mut chain = Vec::new();

    for segment in dir.split('/').filter(|s| !s.is_empty() && *s != ".") {
        if absolute || !current.is_empty() {
            current.push('/');
        }
        current.push_str(segment);
        chain.push(current.clone());
    }

    chain
}

/// Validates that a relative file path does not escape its root.
///
/// Rejects:
/// - Empty paths
/// - Absolute paths (Unix `/` or Windows `C:\`)
/// - Parent directory traversal (`..`)
/// - Windows prefix components (`C:`, `\\server`)
pub fn validate_relative_path(file_path: &str) -> Result<(), UploadError> {
    if file_path.is_empty() {
        return Err(UploadError::InvalidPath("empty path".into()));
    }

    for component in Path::new(file_path).components() {
        match component {
            Component::ParentDir => {
                return Err(UploadError::InvalidPath(format!(
                    "parent directory traversal not allowed: {file_path}"
                )));
            }
            Component::Prefix(_) | Component::RootDir => {
                return Err(UploadError::InvalidPath(format!(
                    "absolute path not allowed: {file_path}"
                )));
            }
            Component::CurDir | Component::Normal(_) => {}
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn join_handles_slashes() {
        assert_eq!(remote_join("/r", "a/x.txt"), "/r/a/x.txt");
        assert_eq!(remote_join("/r/", "a/x.txt"), "/r/a/x.txt");
        assert_eq!(remote_join("/r", "/a/x.txt"), "/r/a/x.txt");
        assert_eq!(remote_join("/", "b.txt"), "/b.txt");
        assert_eq!(remote_join("deploy", "b.txt"), "deploy/b.txt");
        assert_eq!(remote_join("", "b.txt"), "b.txt");
        assert_eq!(remote_join("/r", ""), "/r");
    }

    #[test]
    fn parent_strips_last_segment() {
        assert_eq!(remote_parent("/r/a/x.txt"), Some("/r/a"));
        assert_eq!(remote_parent("/x.txt"), Some("/"));
        assert_eq!(remote_parent("a/x.txt"), Some("a"));
        assert_eq!(remote_parent("x.txt"), None);
    }

    #[test]
    fn ancestors_absolute() {
        assert_eq!(
            remote_ancestors("/home/larry/app"),
            vec!["/home", "/home/larry", "/home/larry/app"]
        );
        assert_eq!(remote_ancestors("/r//a/"), vec!["/r", "/r/a"]);
        assert!(remote_ancestors("/").is_empty());
    }

    #[test]
    fn ancestors_relative() {
        assert_eq!(remote_ancestors("a/b"), vec!["a", "a/b"]);
        assert_eq!(remote_ancestors("./a"), vec!["a"]);
    }

    #[test]
    fn rejects_empty_path() {
        assert!(validate_relative_path("").is_err());
    }

    #[test]
    fn rejects_parent_dir_traversal() {
        assert!(validate_relative_path("../../../etc/passwd").is_err());
        assert!(validate_relative_path("sub/../../escape").is_err());
    }

    #[test]
    fn rejects_absolute_unix_path() {
        assert!(validate_relative_path("/tmp/malicious").is_err());
    }

    #[test]
    fn accepts_nested_and_dotfiles() {
        assert!(validate_relative_path("src/app/page.tsx").is_ok());
        assert!(validate_relative_path(".config/settings.json").is_ok());
        assert!(validate_relative_path("./b.txt").is_ok());
    }
}
