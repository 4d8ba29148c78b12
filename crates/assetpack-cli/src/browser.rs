//! System browser handoff.

use assetpack_core::Result;
use assetpack_core::error::InvalidInputError;
use assetpack_core::traits::Browser;

/// Opens URLs with the platform's default browser.
#[derive(Debug, Default, Clone, Copy)]
pub struct SystemBrowser;

impl Browser for SystemBrowser {
    fn open(&self, url: &str) -> Result<()> {
        open::that(url).map_err(|e| {
            InvalidInputError::Other {
                message: format!("failed to open browser: {}", e),
            }
            .into()
        })
    }
}
