//! Destination path construction.
//!
//! Folder and filename are joined as-is. `..` segments are passed through to Dropbox untouched.

/// Picks the first non-empty folder out of the request's and the configured default.
pub fn effective_folder<'a>(requested: Option<&'a str>, default: Option<&'a str>) -> &'a str {
    [requested, default]
        .into_iter()
        .flatten()
        .find(|folder| !folder.is_empty())
        .unwrap_or("")
}

/// Joins `folder` and `filename`, collapsing slash runs and ensuring a single leading slash.
pub fn destination_path(folder: &str, filename: &str) -> String {
    let joined = format!("{folder}/{filename}");

    let mut path = String::with_capacity(joined.len() + 1);
    path.push('/');
    for c in joined.chars() {
        if c == '/' && path.ends_with('/') {
            continue;
        }
        path.push(c);
    }
    path
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_folder_slashes_are_collapsed() {
        assert_eq!(destination_path("/a/", "b.txt"), "/a/b.txt");
        assert_eq!(destination_path("//a///b//", "//c.txt"), "/a/b/c.txt");
    }

    #[test]
    fn test_empty_folder() {
        assert_eq!(destination_path("", "x.png"), "/x.png");
    }

    #[test]
    fn test_leading_slash_is_added() {
        assert_eq!(destination_path("uploads", "x.png"), "/uploads/x.png");
    }

    #[test]
    fn test_traversal_is_not_sanitized() {
        assert_eq!(destination_path("/a/../b", "../c.txt"), "/a/../b/../c.txt");
    }

    #[test]
    fn test_effective_folder_falls_through_empty_values() {
        assert_eq!(effective_folder(Some("/req"), Some("/default")), "/req");
        assert_eq!(effective_folder(Some(""), Some("/default")), "/default");
        assert_eq!(effective_folder(None, Some("/default")), "/default");
        assert_eq!(effective_folder(None, Some("")), "");
        assert_eq!(effective_folder(None, None), "");
    }
}
