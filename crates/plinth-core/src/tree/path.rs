//! Relative path normalization for tree keys

/// Normalize a relative path: forward slashes, no `./`, no empty or `.`
/// segments. Returns `None` for absolute paths, `..` segments and empty paths.
pub fn normalize(path: &str) -> Option<String> {
    let unified = path.replace('\\', "/");
    if unified.starts_with('/') || unified.contains(':') {
        return None;
    }

    let mut segments = Vec::new();
    for segment in unified.split('/') {
        match segment {
            "" | "." => continue,
            ".." => return None,
            s => segments.push(s),
        }
    }

    if segments.is_empty() {
        return None;
    }
    Some(segments.join("/"))
}

/// Template file names starting with `_` become dotfiles; `__` escapes a literal `_`
pub fn rename_dotfile(path: &str) -> String {
    let (dir, name) = match path.rsplit_once('/') {
        Some((dir, name)) => (Some(dir), name),
        None => (None, path),
    };

    let renamed = if let Some(rest) = name.strip_prefix("__") {
        format!("_{}", rest)
    } else if let Some(rest) = name.strip_prefix('_') {
        format!(".{}", rest)
    } else {
        name.to_string()
    };

    match dir {
        Some(dir) => format!("{}/{}", dir, renamed),
        None => renamed,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_cleans_segments() {
        assert_eq!(normalize("./src//main.js").as_deref(), Some("src/main.js"));
        assert_eq!(normalize("src\\router\\index.js").as_deref(), Some("src/router/index.js"));
        assert_eq!(normalize("a/./b/").as_deref(), Some("a/b"));
    }

    #[test]
    fn test_normalize_rejects_escapes() {
        assert_eq!(normalize("../outside"), None);
        assert_eq!(normalize("a/../../b"), None);
        assert_eq!(normalize("/etc/passwd"), None);
        assert_eq!(normalize("C:/windows"), None);
        assert_eq!(normalize("./"), None);
    }

    #[test]
    fn test_rename_dotfile() {
        assert_eq!(rename_dotfile("_gitignore"), ".gitignore");
        assert_eq!(rename_dotfile("public/_headers"), "public/.headers");
        assert_eq!(rename_dotfile("src/__init__.py"), "src/_init__.py");
        assert_eq!(rename_dotfile("src/main.js"), "src/main.js");
    }
}
