// =============================================================================
// Built-in defaults for deploy target configuration
// =============================================================================

/// Deploy-root relative names. These are fixed by the served application's
/// expectations and are not configurable.
pub const RELEASES_DIR: &str = "releases";
pub const SHARED_DIR: &str = "shared";
pub const CURRENT_LINK: &str = "current";
pub const DB_BACKUPS_DIR: &str = "db_backups";
pub const CACHED_COPY_DIR: &str = "cached-copy";
pub const SETTINGS_FILE: &str = "local_settings.php";
pub const FILES_DIR: &str = "files";
pub const SITES_DIR: &str = "sites";

/// Format of release identifiers (UTC creation time).
pub const RELEASE_ID_FORMAT: &str = "%Y%m%d%H%M%S";

pub fn default_domain() -> String {
    "default".to_string()
}

pub fn default_db_host() -> String {
    "localhost".to_string()
}

pub fn default_srv_usr() -> String {
    "www-data".to_string()
}

pub fn default_srv_password() -> String {
    "www-data".to_string()
}

pub fn default_keep_releases() -> usize {
    5
}

pub fn default_branch() -> String {
    "master".to_string()
}

pub fn default_ssh_port() -> u16 {
    22
}

pub fn default_command_timeout_secs() -> u64 {
    600
}

pub fn default_drupal_version() -> String {
    "7".to_string()
}
