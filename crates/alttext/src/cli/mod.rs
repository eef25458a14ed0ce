//! CLI command implementations.

pub mod config;
pub mod describe;
pub mod setup;
pub mod theme;

/// Convert a dialoguer result into `Ok(Some(value))` on success, `Ok(None)`
/// on interrupt (Ctrl+C / terminal disconnect), and `Err` for other I/O
/// failures.
fn handle_interrupt<T>(result: dialoguer::Result<T>) -> anyhow::Result<Option<T>> {
    match result {
        Ok(v) => Ok(Some(v)),
        Err(dialoguer::Error::IO(e)) if e.kind() == std::io::ErrorKind::Interrupted => Ok(None),
        Err(e) => Err(e.into()),
    }
}
