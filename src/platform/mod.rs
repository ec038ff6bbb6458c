// pagemark platform paths
// Config and data directories come from the `dirs` crate; both can be
// redirected with environment variables for tests and portable installs.

use std::env;
use std::path::PathBuf;

const APP_DIR: &str = "pagemark";

/// Overrides the configuration directory when set.
pub const CONFIG_DIR_ENV: &str = "PAGEMARK_CONFIG_DIR";
/// Overrides the data directory when set.
pub const DATA_DIR_ENV: &str = "PAGEMARK_DATA_DIR";

/// Returns the configuration directory for pagemark.
///
/// `$PAGEMARK_CONFIG_DIR` if set, else `<platform config dir>/pagemark`,
/// else `./.pagemark` when the platform reports no config directory.
pub fn get_config_dir() -> PathBuf {
    resolve(CONFIG_DIR_ENV, dirs::config_dir())
}

/// Returns the data directory (SQLite database) for pagemark.
///
/// `$PAGEMARK_DATA_DIR` if set, else `<platform data dir>/pagemark`.
pub fn get_data_dir() -> PathBuf {
    resolve(DATA_DIR_ENV, dirs::data_dir())
}

fn resolve(env_key: &str, platform_dir: Option<PathBuf>) -> PathBuf {
    if let Ok(dir) = env::var(env_key) {
        if !dir.trim().is_empty() {
            return PathBuf::from(dir);
        }
    }
    match platform_dir {
        Some(base) => base.join(APP_DIR),
        None => PathBuf::from(".").join(format!(".{}", APP_DIR)),
    }
}
