//! Turning user-typed locations into absolute paths.

use std::path::{Component, Path, PathBuf};

/// Resolve `input` against `cwd`.
///
/// Understands `~` and `~/...`, plain relative paths, and the parent
/// shortcuts `..`, `...` (two levels), `..3` and `../3` (three levels).
/// The result is absolute and lexically normalized; nothing is read from
/// disk.
pub fn resolve(input: &str, cwd: &Path, home: Option<&Path>) -> PathBuf {
    let input = input.trim();

    if let Some(levels) = parent_levels(input) {
        let mut dir = normalize(cwd);
        for _ in 0..levels {
            if !dir.pop() {
                break;
            }
        }
        return dir;
    }

    let expanded = match (input.strip_prefix('~'), home) {
        (Some(""), Some(home)) => home.to_path_buf(),
        (Some(rest), Some(home)) if rest.starts_with('/') || rest.starts_with('\\') => {
            home.join(&rest[1..])
        }
        _ => PathBuf::from(input),
    };

    if expanded.is_absolute() {
        normalize(&expanded)
    } else {
        normalize(&cwd.join(expanded))
    }
}

fn parent_levels(input: &str) -> Option<usize> {
    let suffix = input.strip_prefix("..")?;
    if suffix.is_empty() {
        return Some(1);
    }
    if suffix.chars().all(|c| c == '.') {
        return Some(input.len() - 1);
    }
    let digits = suffix.strip_prefix('/').unwrap_or(suffix);
    if !digits.is_empty() && digits.chars().all(|c| c.is_ascii_digit()) {
        return digits.parse().ok();
    }
    None
}

/// Drop `.` components and fold `..` into its parent.
fn normalize(path: &Path) -> PathBuf {
    let mut out = PathBuf::new();
    for component in path.components() {
        match component {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}
