//! Conversion between sheet handles and web application links.

use url::Url;

use crate::client::Client;
use crate::error::{Error, Result};

/// Link to view a sheet in the web application.
pub fn sheet_url(ui_base_url: &str, handle: &str) -> String {
    format!("{}/spreadsheet/id/{handle}", ui_base_url.trim_end_matches('/'))
}

/// Extract the sheet handle from a link produced by [`sheet_url`].
pub fn handle_from_url(ui_base_url: &str, url: &str) -> Result<String> {
    let prefix = format!("{}/spreadsheet", ui_base_url.trim_end_matches('/'));
    if !url.starts_with(&prefix) {
        return Err(Error::InvalidArgument(
            "must be a complete URL of a sheet in the Gigasheet UI".to_string(),
        ));
    }

    Url::parse(url).map_err(|e| Error::InvalidArgument(format!("invalid URL: {e}")))?;

    // What follows the prefix is /<kind>/<handle>[?query][#fragment]
    let rest = &url[prefix.len()..];
    let path = rest.split(['?', '#']).next().unwrap_or_default();
    if !path.is_empty() && !path.starts_with('/') {
        return Err(Error::InvalidArgument(
            "must be a complete URL of a sheet in the Gigasheet UI".to_string(),
        ));
    }
    path.split('/')
        .nth(2)
        .filter(|handle| !handle.is_empty())
        .map(str::to_string)
        .ok_or_else(|| Error::InvalidArgument("no handle found in URL".to_string()))
}

impl Client {
    /// Link to view a sheet in the configured web application.
    pub fn sheet_url(&self, handle: &str) -> String {
        sheet_url(self.ui_base_url(), handle)
    }

    /// Extract the handle from a sheet link of the configured web application.
    pub fn handle_from_url(&self, url: &str) -> Result<String> {
        handle_from_url(self.ui_base_url(), url)
    }
}
