//! System browser launcher.

use deskauth_common::auth::UrlOpener;

/// Opens URLs in the user's default browser.
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemBrowser;

impl UrlOpener for SystemBrowser {
    fn open(&self, url: &str) -> Result<(), String> {
        webbrowser::open(url).map_err(|e| format!("failed to open browser: {e}"))
    }
}
