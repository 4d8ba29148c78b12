//! Browser handoff trait.

use crate::Result;

/// Opens a URL in the user's browser.
///
/// Navigation is fire-and-forget: the bridge never learns what happens in
/// the browser, it only polls the service afterwards.
pub trait Browser: Send + Sync {
    fn open(&self, url: &str) -> Result<()>;
}

/// Browser that does nothing, for headless use where the caller prints the
/// login URL instead.
#[derive(Debug, Default, Clone, Copy)]
pub struct NoBrowser;

impl Browser for NoBrowser {
    fn open(&self, _url: &str) -> Result<()> {
        Ok(())
    }
}
