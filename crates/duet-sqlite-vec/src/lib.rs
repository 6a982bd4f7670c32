//! Process-wide registration of the sqlite-vec extension.
//!
//! Registration goes through `sqlite3_auto_extension`, so every connection
//! opened after [`register_auto_extension`] succeeds exposes `vec_version()`,
//! `vec_f32()` and `vec_distance_cosine()`. This is the only crate in the
//! workspace that needs `unsafe`.

use rusqlite::Connection;
use std::sync::OnceLock;

/// Environment switch; `0`, `false` or `off` skips registration.
pub const AUTO_ENABLE_ENV: &str = "DUET_SQLITE_VEC_AUTO";

static REGISTRATION: OnceLock<Result<(), VecExtensionError>> = OnceLock::new();

/// Why the extension could not be made available.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum VecExtensionError {
    /// Registration was switched off through [`AUTO_ENABLE_ENV`].
    #[error("sqlite-vec auto-extension disabled by {AUTO_ENABLE_ENV}")]
    Disabled,

    /// `sqlite3_auto_extension` returned a non-OK code.
    #[error("sqlite3_auto_extension failed with rc={0}")]
    RegistrationFailed(i32),
}

/// Register sqlite-vec for all connections opened from now on.
///
/// Safe to call repeatedly; the FFI call runs at most once per process.
///
/// # Errors
///
/// Returns [`VecExtensionError::Disabled`] when switched off via the
/// environment, or the SQLite return code when registration fails.
pub fn register_auto_extension() -> Result<(), VecExtensionError> {
    if disabled_by_env(std::env::var(AUTO_ENABLE_ENV).ok().as_deref()) {
        return Err(VecExtensionError::Disabled);
    }

    REGISTRATION.get_or_init(register_once).clone()
}

/// Version string reported by the extension on `conn`, if it is loaded.
#[must_use]
pub fn vec_version(conn: &Connection) -> Option<String> {
    conn.query_row("SELECT vec_version()", [], |row| row.get::<_, String>(0))
        .ok()
}

fn disabled_by_env(value: Option<&str>) -> bool {
    matches!(value, Some("0" | "false" | "off"))
}

fn register_once() -> Result<(), VecExtensionError> {
    #[allow(clippy::transmute_ptr_to_ptr)]
    let entrypoint: unsafe extern "C" fn(
        *mut rusqlite::ffi::sqlite3,
        *mut *const std::os::raw::c_char,
        *const rusqlite::ffi::sqlite3_api_routines,
    ) -> std::os::raw::c_int =
        unsafe { std::mem::transmute(sqlite_vec::sqlite3_vec_init as *const ()) };

    let rc = unsafe { rusqlite::ffi::sqlite3_auto_extension(Some(entrypoint)) };
    if rc == rusqlite::ffi::SQLITE_OK {
        Ok(())
    } else {
        Err(VecExtensionError::RegistrationFailed(rc))
    }
}
