//! Storage initialization
//!
//! Handles first-run setup: directories, settings and empty data files.

use crate::config::paths::BankPaths;
use crate::config::settings::Settings;
use crate::error::BankResult;

use super::file_io::write_json_atomic;

/// Initialize storage for a fresh installation
///
/// Existing files are left untouched, so running it twice is harmless.
pub fn initialize_storage(paths: &BankPaths, settings: &Settings) -> BankResult<()> {
    paths.ensure_directories()?;

    if !paths.settings_file().exists() {
        settings.save(paths)?;
    }

    let empty_files = [
        (paths.users_file(), serde_json::json!({ "users": [] })),
        (paths.accounts_file(), serde_json::json!({ "accounts": [] })),
        (
            paths.transactions_file(),
            serde_json::json!({ "transactions": [] }),
        ),
    ];
    for (path, empty) in empty_files {
        if !path.exists() {
            write_json_atomic(&path, &empty)?;
        }
    }

    Ok(())
}

/// Check if storage needs initialization
pub fn needs_initialization(paths: &BankPaths) -> bool {
    !paths.is_initialized()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::Storage;
    use tempfile::TempDir;

    #[test]
    fn test_initialize_storage() {
        let temp_dir = TempDir::new().unwrap();
        let paths = BankPaths::with_base_dir(temp_dir.path().to_path_buf());

        assert!(needs_initialization(&paths));

        initialize_storage(&paths, &Settings::default()).unwrap();

        assert!(!needs_initialization(&paths));
        assert!(paths.users_file().exists());
        assert!(paths.accounts_file().exists());
        assert!(paths.transactions_file().exists());

        let storage = Storage::new(paths).unwrap();
        storage.load_all().unwrap();
        assert_eq!(storage.accounts.count().unwrap(), 0);
    }

    #[test]
    fn test_doesnt_overwrite_existing() {
        let temp_dir = TempDir::new().unwrap();
        let paths = BankPaths::with_base_dir(temp_dir.path().to_path_buf());

        let mut settings = Settings::default();
        settings.page_size = 7;
        initialize_storage(&paths, &settings).unwrap();

        initialize_storage(&paths, &Settings::default()).unwrap();

        let loaded = Settings::load_or_create(&paths).unwrap();
        assert_eq!(loaded.page_size, 7);
    }
}
