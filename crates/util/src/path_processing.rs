use dirs_next::{config_dir, home_dir};
use std::env;
use std::path::PathBuf;

/// Expand a leading tilde in `path` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    let p = path.trim();
    if p == "~" {
        return home_dir().unwrap_or_else(|| PathBuf::from("~"));
    }
    if let Some(rest) = p.strip_prefix("~/") {
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    if let Some(rest) = p.strip_prefix("~\\") {
        // Windows-style
        return home_dir().unwrap_or_else(|| PathBuf::from("~")).join(rest);
    }
    PathBuf::from(p)
}

/// Resolve a devdeck configuration file path.
///
/// A non-blank `env_override` variable wins; otherwise the file lives under
/// `<config_dir>/devdeck/<file_name>`.
pub fn config_file_path(env_override: &str, file_name: &str) -> PathBuf {
    if let Ok(path) = env::var(env_override)
        && !path.trim().is_empty()
    {
        return expand_tilde(&path);
    }

    config_dir().unwrap_or_else(|| PathBuf::from(".")).join("devdeck").join(file_name)
}
