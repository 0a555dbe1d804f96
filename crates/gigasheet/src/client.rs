//! Blocking HTTP client for the Gigasheet API.

use std::path::Path;

use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::blocking::{RequestBuilder, Response};
use reqwest::header::{HeaderMap, HeaderName, HeaderValue, CONTENT_TYPE};
use reqwest::Method;
use serde::{de::DeserializeOwned, Serialize};
use serde_json::{json, Value};
use tracing::{debug, info, warn};

use crate::config::ClientConfig;
use crate::error::{Error, Result};
use crate::types::{
    DirectUpload, DownloadExportResponse, ExportBody, ExportOptions, ExportResult,
    HandleResponse, ImportRequest, SetupStatus, ShareBody, ShareRequest, SheetInfo,
    UploadDirectBody, UploadUrlBody,
};
use crate::wait::WaitOptions;

/// Header carrying the API key.
pub const AUTH_HEADER: &str = "x-gigasheet-token";

/// Lightweight endpoint used to validate credentials and connectivity.
pub const WHOAMI_PATH: &str = "/user/whoami";

/// Client for the Gigasheet REST API.
///
/// Every method is a single blocking request, except the polling helpers
/// which issue one request per poll. The client holds only immutable state
/// and is cheap to clone.
///
/// ```rust,no_run
/// use gigasheet::{Client, ClientConfig, ImportRequest, ShareRequest};
///
/// # fn main() -> gigasheet::Result<()> {
/// let client = Client::new(ClientConfig::from_env())?;
/// let handle = client.import_from_url(
///     &ImportRequest::new("https://bucket.example/file.csv").with_name("data.csv"),
/// )?;
/// client.share(&ShareRequest::new(&handle, "colleague@example.com").can_write(true))?;
/// println!("{}", client.sheet_url(&handle));
/// # Ok(())
/// # }
/// ```
#[derive(Clone)]
pub struct Client {
    http: reqwest::blocking::Client,
    base_url: String,
    ui_base_url: String,
}

impl std::fmt::Debug for Client {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Client")
            .field("base_url", &self.base_url)
            .field("ui_base_url", &self.ui_base_url)
            .finish_non_exhaustive()
    }
}

impl Client {
    /// Create a client from an explicit configuration.
    ///
    /// Fails with [`Error::Configuration`] when no usable API key is
    /// configured; no request is made in that case.
    pub fn new(config: ClientConfig) -> Result<Self> {
        config.validate()?;
        let key = config.require_api_key()?;

        let mut token = HeaderValue::from_str(key).map_err(|_| {
            Error::Configuration("API key is not a valid HTTP header value".to_string())
        })?;
        token.set_sensitive(true);

        let mut headers = HeaderMap::new();
        headers.insert(HeaderName::from_static(AUTH_HEADER), token);
        headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));

        let http = reqwest::blocking::Client::builder()
            .user_agent(concat!("gigasheet-rs/", env!("CARGO_PKG_VERSION")))
            .timeout(config.timeout)
            .default_headers(headers)
            .build()
            .map_err(|e| Error::Configuration(format!("failed to build HTTP client: {e}")))?;

        Ok(Self {
            http,
            base_url: config.base_url.trim_end_matches('/').to_string(),
            ui_base_url: config.ui_base_url.trim_end_matches('/').to_string(),
        })
    }

    /// Create a client whose key comes from `GIGASHEET_API_KEY`.
    pub fn from_env() -> Result<Self> {
        Self::new(ClientConfig::from_env())
    }

    /// Create a client with an explicit key and default endpoints.
    pub fn with_api_key(api_key: impl Into<String>) -> Result<Self> {
        Self::new(ClientConfig::new(api_key))
    }

    /// REST API base URL.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    /// Web application base URL.
    pub fn ui_base_url(&self) -> &str {
        &self.ui_base_url
    }

    // ==================== Transport ====================

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        let url = self.url(path);
        debug!(%method, %url, "sending request");
        self.http.request(method, url)
    }

    /// Send a request and map non-success statuses to [`Error::Api`].
    fn send(&self, request: RequestBuilder) -> Result<Response> {
        let response = request.send().map_err(Error::Network)?;
        let status = response.status();

        if !status.is_success() {
            let message = error_message(response.text());
            warn!(status = status.as_u16(), "request failed");
            return Err(Error::Api {
                status: status.as_u16(),
                message,
            });
        }

        Ok(response)
    }

    fn decode<T: DeserializeOwned>(response: Response) -> Result<T> {
        let body = response.bytes().map_err(Error::Network)?;
        serde_json::from_slice(&body).map_err(|e| Error::InvalidResponse(e.to_string()))
    }

    pub(crate) fn get<T: DeserializeOwned>(&self, path: &str) -> Result<T> {
        Self::decode(self.send(self.request(Method::GET, path))?)
    }

    pub(crate) fn get_with_query<T: DeserializeOwned>(
        &self,
        path: &str,
        query: &[(&str, &str)],
    ) -> Result<T> {
        Self::decode(self.send(self.request(Method::GET, path).query(query))?)
    }

    pub(crate) fn post<T: DeserializeOwned, B: Serialize>(&self, path: &str, body: &B) -> Result<T> {
        Self::decode(self.send(self.request(Method::POST, path).json(body))?)
    }

    /// Send a JSON body and ignore whatever the service answers with.
    pub(crate) fn send_json<B: Serialize>(&self, method: Method, path: &str, body: &B) -> Result<()> {
        self.send(self.request(method, path).json(body))?;
        Ok(())
    }

    // ==================== Setup ====================

    /// Check that the service is reachable and accepts the API key.
    ///
    /// Never fails; the outcome is reported in the returned status.
    pub fn check_setup(&self) -> SetupStatus {
        match self.send(self.request(Method::GET, WHOAMI_PATH)) {
            Ok(_) => SetupStatus::Ready,
            Err(Error::Api { status, message }) => SetupStatus::Rejected { status, message },
            Err(e) => {
                warn!(error = %e, "setup check failed");
                SetupStatus::Unreachable {
                    reason: e.to_string(),
                }
            }
        }
    }

    // ==================== Uploads ====================

    /// Import a file the service fetches from `request.url`.
    ///
    /// Returns the handle of the new sheet, or of the append job when
    /// `append_to` is set.
    pub fn import_from_url(&self, request: &ImportRequest) -> Result<String> {
        require_non_empty("URL", &request.url)?;
        require_non_empty("name", &request.name)?;

        let body = UploadUrlBody {
            url: &request.url,
            name: &request.name,
            target_handle: request.append_to.as_deref(),
        };
        let resp: HandleResponse = self.post("/upload/url", &body)?;
        info!(handle = %resp.handle, "import from URL accepted");
        Ok(resp.handle)
    }

    /// Upload file contents inline with the request.
    ///
    /// Everything goes over one connection, so large files are better put on
    /// cloud storage and imported with [`Client::import_from_url`].
    pub fn upload_bytes(&self, upload: &DirectUpload) -> Result<String> {
        require_non_empty("name", &upload.name)?;

        let body = UploadDirectBody {
            name: &upload.name,
            contents: STANDARD.encode(&upload.contents),
            parent_directory: "",
            target_handle: upload.append_to.as_deref(),
        };
        let resp: HandleResponse = self.post("/upload/direct", &body)?;
        info!(handle = %resp.handle, bytes = upload.contents.len(), "direct upload accepted");
        Ok(resp.handle)
    }

    /// Upload a local file.
    pub fn upload_file(
        &self,
        path: impl AsRef<Path>,
        name: &str,
        append_to: Option<&str>,
    ) -> Result<String> {
        let contents = std::fs::read(path.as_ref())?;
        let mut upload = DirectUpload::new(contents, name);
        upload.append_to = append_to.map(str::to_string);
        self.upload_bytes(&upload)
    }

    // ==================== Sheets ====================

    /// Get metadata about a sheet.
    pub fn info(&self, handle: &str) -> Result<SheetInfo> {
        require_handle(handle)?;
        self.get(&format!("/dataset/{handle}"))
    }

    /// Rename a sheet.
    pub fn rename(&self, handle: &str, new_name: &str) -> Result<()> {
        require_handle(handle)?;
        require_non_empty("name", new_name)?;
        self.send_json(
            Method::POST,
            &format!("/rename/{handle}"),
            &json!({ "uuid": handle, "filename": new_name }),
        )
    }

    /// Set the description shown on a sheet.
    pub fn set_description(&self, handle: &str, description: &str) -> Result<()> {
        require_handle(handle)?;
        self.send_json(
            Method::PUT,
            &format!("/dataset/{handle}/note"),
            &json!({ "note": description }),
        )
    }

    /// Share a sheet with collaborators.
    ///
    /// The service does not deduplicate shares; every call sends one request.
    pub fn share(&self, request: &ShareRequest) -> Result<()> {
        require_handle(&request.handle)?;
        if request.recipients.is_empty() {
            return Err(Error::InvalidArgument("no share recipients".to_string()));
        }

        let body = ShareBody {
            emails: &request.recipients,
            permissions: request.permissions(),
            message: request.message.as_deref().unwrap_or_default(),
        };
        self.send_json(
            Method::PUT,
            &format!("/file/{}/share/file", request.handle),
            &body,
        )?;
        info!(
            handle = %request.handle,
            recipients = request.recipients.len(),
            write = request.can_write,
            "sheet shared"
        );
        Ok(())
    }

    // ==================== Exports ====================

    /// Start an export of a sheet and return the export handle.
    ///
    /// Without an explicit state the sheet's current grid state is used.
    pub fn create_export(&self, handle: &str, options: &ExportOptions) -> Result<String> {
        require_handle(handle)?;

        let state = match &options.state {
            Some(state) => state.clone(),
            None => self
                .info(handle)?
                .client_state
                .unwrap_or_else(|| Value::Object(Default::default())),
        };

        let body = ExportBody {
            filename: &options.name,
            folder_handle: &options.folder_handle,
            grid_state: &state,
        };
        let resp: HandleResponse = self.post(&format!("/dataset/{handle}/export"), &body)?;
        info!(handle, export = %resp.handle, "export started");
        Ok(resp.handle)
    }

    /// Get the download link of a finished export.
    pub fn download_export(&self, export_handle: &str) -> Result<ExportResult> {
        require_handle(export_handle)?;
        let resp: DownloadExportResponse =
            self.get(&format!("/dataset/{export_handle}/download-export"))?;
        Ok(ExportResult {
            handle: export_handle.to_string(),
            url: resp.presigned_url,
        })
    }

    /// Export a sheet, wait for the export to finish and return its link.
    pub fn export(&self, handle: &str, options: &ExportOptions) -> Result<ExportResult> {
        self.export_with_wait(handle, options, &WaitOptions::default())
    }

    /// Same as [`Client::export`] with explicit polling options.
    pub fn export_with_wait(
        &self,
        handle: &str,
        options: &ExportOptions,
        wait: &WaitOptions,
    ) -> Result<ExportResult> {
        let export_handle = self.create_export(handle, options)?;
        self.wait_for_file_to_finish(&export_handle, wait)?;
        self.download_export(&export_handle)
    }
}

/// Body of a failed response, or a placeholder naming why it could not be read.
fn error_message<E: std::fmt::Display>(body: std::result::Result<String, E>) -> String {
    body.unwrap_or_else(|e| {
        warn!(error = %e, "failed to read error response body");
        format!("<unreadable response body: {e}>")
    })
}

pub(crate) fn require_handle(handle: &str) -> Result<()> {
    if handle.trim().is_empty() {
        return Err(Error::empty_handle());
    }
    Ok(())
}

fn require_non_empty(what: &str, value: &str) -> Result<()> {
    if value.trim().is_empty() {
        return Err(Error::InvalidArgument(format!("empty value for {what}")));
    }
    Ok(())
}
