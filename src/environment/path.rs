//! Home directory expansion and path anchoring

use std::path::{Path, PathBuf};

/// Expand a leading `~` or `~/` to the user's home directory (pure function)
///
/// Leaves the value untouched when no home directory is known.
pub fn expand_home(value: &str) -> String {
    expand_home_with(value, dirs::home_dir().as_deref())
}

fn expand_home_with(value: &str, home: Option<&Path>) -> String {
    let Some(home) = home else {
        return value.to_string();
    };
    if value == "~" {
        return home.to_string_lossy().into_owned();
    }
    match value.strip_prefix("~/") {
        Some(rest) => home.join(rest).to_string_lossy().into_owned(),
        None => value.to_string(),
    }
}

/// Make `path` absolute, anchoring relative paths at `base`
///
/// `~` is expanded first so `data_root: ~/jobs` means what it says.
pub fn anchor(path: &Path, base: &Path) -> std::io::Result<PathBuf> {
    let expanded = PathBuf::from(expand_home(&path.to_string_lossy()));
    if expanded.is_absolute() {
        Ok(expanded)
    } else {
        std::path::absolute(base.join(expanded))
    }
}
