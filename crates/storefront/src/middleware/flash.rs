//! One-shot toast messages carried in the session.

use tower_sessions::Session;

use crate::models::{Flash, session_keys};

/// Queue a toast for the next rendered page.
///
/// Failures are logged and dropped; a missing toast never fails a request.
pub async fn set_flash(session: &Session, flash: Flash) {
    if let Err(e) = session.insert(session_keys::FLASH, flash).await {
        tracing::warn!("Failed to store flash message: {e}");
    }
}

/// Take the queued toast, if any. It will not be shown again.
pub async fn take_flash(session: &Session) -> Option<Flash> {
    session
        .remove::<Flash>(session_keys::FLASH)
        .await
        .ok()
        .flatten()
}
