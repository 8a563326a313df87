//! Path canonicalization shared by the walker, the records and the HTTP layer.

use std::path::{Component, Path, PathBuf};

/// Canonicalize a path into forward-slash form.
///
/// Lexically resolves `.` and `..` components, collapses runs of `/` and
/// `\` into a single `/` and strips the trailing separator. A bare root
/// stays `/`. Empty or whitespace-only input yields an empty string.
pub fn normalize_path(path: impl AsRef<Path>) -> String {
    let raw = path.as_ref().to_string_lossy();
    let trimmed = raw.trim();
    if trimmed.is_empty() {
        return String::new();
    }

    let unified = trimmed.replace('\\', "/");
    let lexical = resolve_dots(Path::new(&unified));
    let text = lexical.to_string_lossy();

    let mut out = String::with_capacity(text.len());
    let mut last_was_sep = false;
    for ch in text.chars() {
        let is_sep = ch == '/' || ch == '\\';
        if is_sep && last_was_sep {
            continue;
        }
        out.push(if is_sep { '/' } else { ch });
        last_was_sep = is_sep;
    }

    if out.len() > 1 && out.ends_with('/') {
        out.pop();
    }
    out
}

/// Base name of a path, or the whole path when it has none (e.g. `/`).
pub fn file_name(path: impl AsRef<Path>) -> String {
    let path = path.as_ref();
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| path.to_string_lossy().into_owned())
}

/// Lowercased extension of a base name, including the leading dot.
///
/// Dotfiles without a second dot have no extension: `.bashrc` → `""`,
/// `a.tar.GZ` → `".gz"`.
pub fn extension(name: &str) -> String {
    match name.rfind('.') {
        Some(0) | None => String::new(),
        Some(idx) => name[idx..].to_lowercase(),
    }
}

fn resolve_dots(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                // `..` above a root is dropped, above a relative start is kept.
                match out.components().next_back() {
                    Some(Component::Normal(_)) => {
                        out.pop();
                    }
                    Some(Component::RootDir) | Some(Component::Prefix(_)) => {}
                    _ => out.push(".."),
                }
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
