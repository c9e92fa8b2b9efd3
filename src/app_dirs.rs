use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "reflex";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    /// `$HOME/.local/state/reflex`, else the platform data-local dir, else cwd
    pub fn state_dir() -> PathBuf {
        if let Ok(home) = std::env::var("HOME") {
            PathBuf::from(home).join(".local").join("state").join(APP_NAME)
        } else if let Some(proj_dirs) = ProjectDirs::from("", "", APP_NAME) {
            proj_dirs.data_local_dir().to_path_buf()
        } else {
            PathBuf::from(".")
        }
    }

    pub fn db_path() -> PathBuf {
        Self::state_dir().join("reflex.db")
    }

    pub fn log_path() -> PathBuf {
        Self::state_dir().join("reflex.log")
    }

    pub fn config_path() -> PathBuf {
        match ProjectDirs::from("", "", APP_NAME) {
            Some(pd) => pd.config_dir().join("config.json"),
            None => PathBuf::from("reflex_config.json"),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_paths_share_state_dir() {
        let state = AppDirs::state_dir();
        assert!(AppDirs::db_path().starts_with(&state));
        assert!(AppDirs::log_path().starts_with(&state));
        assert!(AppDirs::db_path().ends_with("reflex.db"));
    }

    #[test]
    fn test_config_path_is_json() {
        assert_eq!(
            AppDirs::config_path().extension().and_then(|e| e.to_str()),
            Some("json")
        );
    }
}
