//! Request and response types for the Gigasheet API.

use serde::{Deserialize, Serialize, Serializer};
use serde_json::{Map, Value};

/// Name given to imports when the caller does not pick one.
pub const DEFAULT_UPLOAD_NAME: &str = "Upload from gigasheet";

/// File name given to exports when the caller does not pick one.
pub const DEFAULT_EXPORT_NAME: &str = "export.csv";

/// Import of a file the service fetches itself, e.g. a presigned storage link.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ImportRequest {
    /// World-readable URL to import from.
    pub url: String,

    /// Name of the sheet after import. Ignored by the service when appending succeeds.
    pub name: String,

    /// Existing sheet handle to append records to.
    pub append_to: Option<String>,
}

impl ImportRequest {
    /// Create an import request with the default sheet name.
    pub fn new(url: impl Into<String>) -> Self {
        Self {
            url: url.into(),
            name: DEFAULT_UPLOAD_NAME.to_string(),
            append_to: None,
        }
    }

    /// Set the sheet name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Append into an existing sheet instead of creating a new one.
    pub fn appending_to(mut self, handle: impl Into<String>) -> Self {
        self.append_to = Some(handle.into());
        self
    }
}

/// Upload of file contents sent inline with the request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirectUpload {
    /// Raw file contents.
    pub contents: Vec<u8>,

    /// Name of the sheet after upload.
    pub name: String,

    /// Existing sheet handle to append records to.
    pub append_to: Option<String>,
}

impl DirectUpload {
    /// Create a direct upload.
    pub fn new(contents: impl Into<Vec<u8>>, name: impl Into<String>) -> Self {
        Self {
            contents: contents.into(),
            name: name.into(),
            append_to: None,
        }
    }

    /// Append into an existing sheet instead of creating a new one.
    pub fn appending_to(mut self, handle: impl Into<String>) -> Self {
        self.append_to = Some(handle.into());
        self
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct UploadUrlBody<'a> {
    pub url: &'a str,
    pub name: &'a str,
    #[serde(rename = "targetHandle", skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<&'a str>,
}

#[derive(Debug, Serialize)]
pub(crate) struct UploadDirectBody<'a> {
    pub name: &'a str,
    pub contents: String,
    #[serde(rename = "parentDirectory")]
    pub parent_directory: &'a str,
    #[serde(rename = "targetHandle", skip_serializing_if = "Option::is_none")]
    pub target_handle: Option<&'a str>,
}

#[derive(Debug, Deserialize)]
pub(crate) struct HandleResponse {
    #[serde(rename = "Handle", alias = "handle", alias = "id")]
    pub handle: String,
}

/// Access granted to share recipients.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[repr(u8)]
pub enum SharePermission {
    /// View the sheet.
    Read = 0,
    /// Edit the sheet.
    Write = 1,
}

impl Serialize for SharePermission {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_u8(*self as u8)
    }
}

/// Share a sheet with one or more collaborators.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ShareRequest {
    /// Sheet handle to share.
    pub handle: String,

    /// Recipient email addresses.
    pub recipients: Vec<String>,

    /// Grant write access in addition to read access.
    pub can_write: bool,

    /// Message sent along with the share notification.
    pub message: Option<String>,
}

impl ShareRequest {
    /// Read-only share of `handle` with a single recipient.
    pub fn new(handle: impl Into<String>, recipient: impl Into<String>) -> Self {
        Self::with_recipients(handle, vec![recipient.into()])
    }

    /// Read-only share of `handle` with several recipients.
    pub fn with_recipients(handle: impl Into<String>, recipients: Vec<String>) -> Self {
        Self {
            handle: handle.into(),
            recipients,
            can_write: false,
            message: None,
        }
    }

    /// Grant or withhold write access.
    pub fn can_write(mut self, can_write: bool) -> Self {
        self.can_write = can_write;
        self
    }

    /// Attach a message to the share notification.
    pub fn with_message(mut self, message: impl Into<String>) -> Self {
        self.message = Some(message.into());
        self
    }

    /// Permission list sent on the wire.
    pub fn permissions(&self) -> Vec<SharePermission> {
        if self.can_write {
            vec![SharePermission::Read, SharePermission::Write]
        } else {
            vec![SharePermission::Read]
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ShareBody<'a> {
    pub emails: &'a [String],
    pub permissions: Vec<SharePermission>,
    pub message: &'a str,
}

/// Options for generating an export.
#[derive(Debug, Clone, PartialEq)]
pub struct ExportOptions {
    /// File name of the export.
    pub name: String,

    /// Handle of the folder the export is placed into; empty for the root.
    pub folder_handle: String,

    /// Grid state applied while exporting. `None` uses the sheet's current state.
    pub state: Option<Value>,
}

impl Default for ExportOptions {
    fn default() -> Self {
        Self {
            name: DEFAULT_EXPORT_NAME.to_string(),
            folder_handle: String::new(),
            state: None,
        }
    }
}

impl ExportOptions {
    /// Set the export file name.
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = name.into();
        self
    }

    /// Set the destination folder.
    pub fn with_folder(mut self, folder_handle: impl Into<String>) -> Self {
        self.folder_handle = folder_handle.into();
        self
    }

    /// Export with an explicit grid state.
    pub fn with_state(mut self, state: Value) -> Self {
        self.state = Some(state);
        self
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct ExportBody<'a> {
    pub filename: &'a str,
    #[serde(rename = "folderHandle")]
    pub folder_handle: &'a str,
    #[serde(rename = "gridState")]
    pub grid_state: &'a Value,
}

#[derive(Debug, Deserialize)]
pub(crate) struct DownloadExportResponse {
    #[serde(rename = "presignedUrl")]
    pub presigned_url: String,
}

/// A finished export and where to download it.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportResult {
    /// Handle of the export in Gigasheet.
    pub handle: String,

    /// Presigned download URL, exactly as returned by the service.
    pub url: String,
}

/// Sheet metadata returned by `GET /dataset/{handle}`.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct SheetInfo {
    /// Processing status, e.g. `processing` or `processed`.
    #[serde(rename = "Status", default, skip_serializing_if = "Option::is_none")]
    pub status: Option<String>,

    /// Current grid state (filters, sorts, groupings).
    #[serde(rename = "ClientState", default, skip_serializing_if = "Option::is_none")]
    pub client_state: Option<Value>,

    /// File name of the sheet.
    #[serde(rename = "FileName", default, skip_serializing_if = "Option::is_none")]
    pub file_name: Option<String>,

    /// Every other field, untouched.
    #[serde(flatten)]
    pub extra: Map<String, Value>,
}

/// A column of a sheet.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Column {
    /// Display name; not necessarily unique.
    #[serde(rename = "Name")]
    pub name: String,

    /// Column identifier used by row queries.
    #[serde(rename = "Id")]
    pub id: String,

    /// Data type of the column.
    #[serde(rename = "FieldType", default)]
    pub field_type: String,

    /// Position in the sheet.
    #[serde(rename = "AtIndex", default)]
    pub at_index: u32,

    #[serde(rename = "Hidden", default)]
    pub hidden: bool,
}

/// Sort direction for a [`SortModel`] entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SortDirection {
    Asc,
    Desc,
}

/// One sort key, e.g. `{"colId": "B", "sort": "desc"}`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SortModel {
    #[serde(rename = "colId")]
    pub col_id: String,
    pub sort: SortDirection,
}

impl SortModel {
    pub fn new(col_id: impl Into<String>, sort: SortDirection) -> Self {
        Self {
            col_id: col_id.into(),
            sort,
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct DeduplicateBody<'a> {
    pub columns: &'a [String],
    #[serde(rename = "sortModel")]
    pub sort_model: &'a [SortModel],
}

#[derive(Debug, Serialize)]
pub(crate) struct RowsBody<'a> {
    #[serde(rename = "startRow")]
    pub start_row: u64,
    #[serde(rename = "endRow")]
    pub end_row: u64,
    #[serde(rename = "filterModel")]
    pub filter_model: Option<&'a Value>,
}

/// One page of a row query.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RowsPage {
    /// Number of rows matching the query.
    #[serde(rename = "lastRow")]
    pub last_row: i64,

    /// Row data and any other fields, untouched.
    #[serde(flatten)]
    pub rest: Map<String, Value>,
}

/// Built-in enrichment providers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EnrichmentProvider {
    /// Check that values are well-formed email addresses.
    EmailFormatCheck,
}

impl EnrichmentProvider {
    /// Provider identifier on the wire.
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::EmailFormatCheck => "email-format-check",
        }
    }

    /// Data type the provider operates on.
    pub fn data_type(&self) -> &'static str {
        match self {
            Self::EmailFormatCheck => "EMAIL",
        }
    }
}

impl std::str::FromStr for EnrichmentProvider {
    type Err = crate::Error;

    fn from_str(s: &str) -> crate::Result<Self> {
        match s {
            "email-format-check" => Ok(Self::EmailFormatCheck),
            other => Err(crate::Error::InvalidArgument(format!(
                "unknown enrichment service provider: {other}"
            ))),
        }
    }
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrichmentSpec {
    pub provider: &'static str,
    #[serde(rename = "type")]
    pub data_type: &'static str,
    pub key: Option<String>,
}

#[derive(Debug, Serialize)]
pub(crate) struct EnrichBody<'a> {
    #[serde(rename = "filterModel")]
    pub filter_model: Option<&'a Value>,
    pub enrichments: Vec<EnrichmentSpec>,
}

/// Outcome of [`Client::check_setup`](crate::Client::check_setup).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SetupStatus {
    /// The service is reachable and accepted the API key.
    Ready,
    /// The service answered but rejected the request.
    Rejected {
        status: u16,
        message: String,
    },
    /// No response was obtained.
    Unreachable {
        reason: String,
    },
}

impl SetupStatus {
    /// True for [`SetupStatus::Ready`].
    pub fn is_ready(&self) -> bool {
        matches!(self, Self::Ready)
    }
}

impl std::fmt::Display for SetupStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Ready => write!(f, "ready"),
            Self::Rejected { status, message } if message.is_empty() => {
                write!(f, "rejected with status {status}")
            }
            Self::Rejected { status, message } => {
                write!(f, "rejected with status {status}: {message}")
            }
            Self::Unreachable { reason } => write!(f, "unreachable: {reason}"),
        }
    }
}
