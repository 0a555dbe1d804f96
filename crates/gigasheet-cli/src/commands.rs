//! CLI command implementations.

use std::fs::OpenOptions;
use std::io::Read;
use std::path::{Path, PathBuf};

use clap::{ArgGroup, Args};
use gigasheet::{
    Client, DirectUpload, ExportOptions, ImportRequest, SetupStatus, ShareRequest, SortDirection,
    SortModel, WaitOptions, DEFAULT_UPLOAD_NAME,
};
use thiserror::Error;

/// File name used when saving an export to disk.
pub const EXPORT_FILE_NAME: &str = "export.zip";

/// Built-in column holding the original row number.
const ROW_NUMBER_COLUMN: &str = "#";

/// CLI errors.
#[derive(Debug, Error)]
pub enum CliError {
    #[error(transparent)]
    Gigasheet(#[from] gigasheet::Error),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("{0}")]
    Usage(String),

    #[error("setup check failed: {0}")]
    SetupFailed(SetupStatus),

    #[error("download failed: {0}")]
    Download(String),
}

pub type Result<T> = std::result::Result<T, CliError>;

/// Arguments of `gigasheet upload`.
#[derive(Args, Debug, Default)]
#[command(group(ArgGroup::new("input").required(true).multiple(false)))]
pub struct UploadArgs {
    /// URL of a file to import, e.g. a presigned storage link
    #[arg(long, group = "input")]
    pub input_url: Option<String>,

    /// Local file to upload (max ~50MB depending on connection speed)
    #[arg(long, group = "input")]
    pub input_file: Option<PathBuf>,

    /// Read the file contents from stdin
    #[arg(long, group = "input")]
    pub input_stdin: bool,

    /// Operate on an already uploaded sheet instead of uploading
    #[arg(long, group = "input")]
    pub input_handle: Option<String>,

    /// Sheet name; renames the sheet when used with --input-handle
    #[arg(long = "file-name", visible_alias = "name")]
    pub file_name: Option<String>,

    /// Email address to share with; repeat for multiple recipients
    #[arg(long)]
    pub share_to: Vec<String>,

    /// Share with write permission instead of read-only
    #[arg(long)]
    pub share_write: bool,

    /// Message sent with the share
    #[arg(long, visible_alias = "share-message")]
    pub message: Option<String>,

    /// Update the sheet description
    #[arg(long)]
    pub description: Option<String>,

    /// Print sheet info at the end
    #[arg(long)]
    pub info: bool,
}

/// Arguments of `gigasheet append`.
#[derive(Args, Debug, Default)]
pub struct AppendArgs {
    /// Sheet handle to append or upsert onto
    #[arg(long)]
    pub handle: String,

    /// Local file whose rows are appended
    #[arg(long)]
    pub input_file: PathBuf,

    /// Column name that, with the others given, uniquely identifies a row; repeatable
    #[arg(long = "deduplicate-by-col-names")]
    pub dedupe_columns: Vec<String>,

    /// Keep the newer row of each duplicate instead of the older one
    #[arg(long, requires = "dedupe_columns")]
    pub upsert: bool,

    /// Update the sheet description
    #[arg(long)]
    pub description: Option<String>,
}

/// Upload or reuse a sheet, then rename, describe and share it as requested.
pub fn upload(client: &Client, args: &UploadArgs, wait: &WaitOptions) -> Result<String> {
    let mut name = args.file_name.clone();

    let (handle, already_uploaded) = if let Some(handle) = &args.input_handle {
        println!("operating on handle: {handle}");
        (handle.clone(), true)
    } else if let Some(url) = &args.input_url {
        println!("attempting to load from URL: {url}");
        let request = ImportRequest::new(url)
            .with_name(name.take().unwrap_or_else(|| DEFAULT_UPLOAD_NAME.to_string()));
        (client.import_from_url(&request)?, false)
    } else if let Some(path) = &args.input_file {
        let file_name = name.take().unwrap_or_else(|| default_name_for(path));
        println!("attempting to load from file: {}", path.display());
        (client.upload_file(path, &file_name, None)?, false)
    } else if args.input_stdin {
        let mut contents = Vec::new();
        std::io::stdin().lock().read_to_end(&mut contents)?;
        let file_name = name.take().unwrap_or_else(|| DEFAULT_UPLOAD_NAME.to_string());
        (client.upload_bytes(&DirectUpload::new(contents, file_name))?, false)
    } else {
        return Err(CliError::Usage("missing input parameter".to_string()));
    };

    if !already_uploaded {
        println!("uploaded file: {handle}");
        println!("waiting for parsing to complete...");
        client.wait_for_file_to_finish(&handle, wait)?;
        println!("sheet loaded");
    }

    if let Some(new_name) = name.filter(|_| already_uploaded) {
        println!("setting name: {new_name}");
        client.rename(&handle, &new_name)?;
        println!("sheet renamed");
    }

    if let Some(description) = &args.description {
        client.set_description(&handle, description)?;
        println!("updated sheet description");
    }

    if !args.share_to.is_empty() {
        let mut request = ShareRequest::with_recipients(&handle, args.share_to.clone())
            .can_write(args.share_write);
        request.message = args.message.clone();
        client.share(&request)?;
        println!("shared to {} recipients", args.share_to.len());
    }

    if args.info {
        let info = client.info(&handle)?;
        println!("{}", serde_json::to_string_pretty(&info)?);
    }

    println!("{}", client.sheet_url(&handle));
    Ok(handle)
}

/// Append a local file to a sheet, optionally deduplicating afterwards.
pub fn append(client: &Client, args: &AppendArgs, wait: &WaitOptions) -> Result<()> {
    if args.upsert && args.dedupe_columns.is_empty() {
        return Err(CliError::Usage(
            "--upsert requires --deduplicate-by-col-names".to_string(),
        ));
    }
    let handle = args.handle.as_str();

    // Resolve columns up front so bad names fail before anything is appended
    let dedupe = if args.dedupe_columns.is_empty() {
        None
    } else {
        let ids = client.column_ids_for_names(handle, &args.dedupe_columns)?;
        let sort_id = client
            .column_ids_for_names(handle, &[ROW_NUMBER_COLUMN])?
            .remove(0);
        Some((ids, sort_id))
    };

    println!(
        "Appending to handle {handle} with current row count: {}",
        client.count_rows(handle, None)?
    );
    let name_if_failed = format!("failed append to {handle}");
    let job = client.upload_file(&args.input_file, &name_if_failed, Some(handle))?;
    println!("Uploading as job: {job}");

    // Append jobs delete their transient sheet once done
    let append_wait = wait.clone().with_deletion_is_success(true);
    client.wait_for_file_to_finish(&job, &append_wait)?;
    println!(
        "Uploaded data parsed, new combined row count: {}",
        client.count_rows(handle, None)?
    );

    if let Some((ids, sort_id)) = dedupe {
        let (direction, behavior) = if args.upsert {
            (SortDirection::Desc, "keeping newer rows")
        } else {
            (SortDirection::Asc, "keeping older rows")
        };
        println!("Beginning deduplication {behavior} on handle: {handle}");
        client.deduplicate_rows(handle, &ids, &[SortModel::new(sort_id, direction)])?;
        println!(
            "Deduplication finished, deduplicated row count: {}",
            client.count_rows(handle, None)?
        );
    }

    if let Some(description) = &args.description {
        client.set_description(handle, description)?;
        println!("Updated description");
    }

    println!();
    println!("{}", client.sheet_url(handle));
    Ok(())
}

/// Export a sheet in its current state; print the link and optionally download it.
pub fn export(
    client: &Client,
    handle: &str,
    output_dir: Option<&Path>,
    wait: &WaitOptions,
) -> Result<String> {
    let output_path = output_dir.map(|dir| dir.join(EXPORT_FILE_NAME));
    if let Some(path) = &output_path {
        if path.exists() {
            return Err(CliError::Usage(format!(
                "rename existing file or choose new directory, file already exists: {}",
                path.display()
            )));
        }
    }

    let export_handle = client.create_export(handle, &ExportOptions::default())?;
    println!("Unique ID of export: {export_handle}");
    println!("Waiting for export to complete...");
    client.wait_for_file_to_finish(&export_handle, wait)?;

    let export = client.download_export(&export_handle)?;
    println!("Presigned URL:");
    println!("{}", export.url);

    if let Some(path) = &output_path {
        println!("Downloading file...");
        download(&export.url, path)?;
        println!("Saved to: {}", path.display());
    }

    Ok(export.url)
}

/// Fetch a presigned link into a new file.
fn download(url: &str, path: &Path) -> Result<()> {
    let http = reqwest::blocking::Client::builder()
        .timeout(None)
        .build()
        .map_err(|e| CliError::Download(e.to_string()))?;

    let mut response = http
        .get(url)
        .send()
        .and_then(|r| r.error_for_status())
        .map_err(|e| CliError::Download(e.to_string()))?;

    let mut file = OpenOptions::new().write(true).create_new(true).open(path)?;
    response
        .copy_to(&mut file)
        .map_err(|e| CliError::Download(e.to_string()))?;
    Ok(())
}

/// Print sheet metadata.
pub fn info(client: &Client, handle: &str) -> Result<()> {
    let info = client.info(handle)?;
    println!("{}", serde_json::to_string_pretty(&info)?);
    Ok(())
}

/// Validate API key and connectivity.
pub fn check(client: &Client) -> Result<()> {
    tracing::info!(base_url = %client.base_url(), "checking setup");
    match client.check_setup() {
        SetupStatus::Ready => {
            println!("Gigasheet setup OK ({})", client.base_url());
            Ok(())
        }
        status => Err(CliError::SetupFailed(status)),
    }
}

fn default_name_for(path: &Path) -> String {
    path.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| DEFAULT_UPLOAD_NAME.to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use gigasheet::ClientConfig;
    use serde_json::json;
    use std::time::Duration;
    use wiremock::matchers::{any, body_json, body_partial_json, method, path};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const HANDLE: &str = "d0966d5f_b668_44c5_8536_ae1f89ca8d37";

    fn client_for(base_url: String) -> Client {
        Client::new(ClientConfig::new("cli-test-key").with_base_url(base_url)).unwrap()
    }

    fn fast_wait() -> WaitOptions {
        WaitOptions::default()
            .with_poll_interval(Duration::from_millis(5))
            .with_max_tries(5)
    }

    #[test]
    fn test_default_name_for_path() {
        assert_eq!(default_name_for(Path::new("/tmp/data.csv")), "data.csv");
        assert_eq!(default_name_for(Path::new("/")), DEFAULT_UPLOAD_NAME);
    }

    #[test]
    fn test_export_refuses_to_overwrite() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join(EXPORT_FILE_NAME), "old").unwrap();

        // Unreachable base URL: the check must fail before any request
        let client = client_for("http://127.0.0.1:1".to_string());
        let err = export(&client, HANDLE, Some(dir.path()), &fast_wait()).unwrap_err();
        assert!(matches!(err, CliError::Usage(_)));
    }

    #[test]
    fn test_append_upsert_without_columns_is_usage_error() {
        let client = client_for("http://127.0.0.1:1".to_string());
        let args = AppendArgs {
            handle: HANDLE.to_string(),
            input_file: PathBuf::from("rows.csv"),
            upsert: true,
            ..Default::default()
        };
        assert!(matches!(
            append(&client, &args, &fast_wait()),
            Err(CliError::Usage(_))
        ));
    }

    #[test]
    fn test_json_failure_is_json_error() {
        let err: CliError = serde_json::from_str::<serde_json::Value>("{")
            .unwrap_err()
            .into();
        assert!(matches!(err, CliError::Json(_)));
        assert!(err.to_string().starts_with("JSON error: "));
    }

    #[test]
    fn test_check_unreachable_fails() {
        let client = client_for("http://127.0.0.1:1".to_string());
        assert!(matches!(check(&client), Err(CliError::SetupFailed(_))));
    }

    #[tokio::test]
    async fn test_upload_from_url_then_share() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path("/upload/url"))
            .and(body_json(json!({"url": "https://bucket.example/file.csv", "name": "data.csv"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Handle": HANDLE})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path(format!("/dataset/{HANDLE}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Status": "processed"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("PUT"))
            .and(path(format!("/file/{HANDLE}/share/file")))
            .and(body_json(json!({
                "emails": ["colleague@example.com"],
                "permissions": [0, 1],
                "message": "fresh data"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&server)
            .await;

        let uri = server.uri();
        let handle = tokio::task::spawn_blocking(move || {
            let args = UploadArgs {
                input_url: Some("https://bucket.example/file.csv".to_string()),
                file_name: Some("data.csv".to_string()),
                share_to: vec!["colleague@example.com".to_string()],
                share_write: true,
                message: Some("fresh data".to_string()),
                ..Default::default()
            };
            upload(&client_for(uri), &args, &fast_wait())
        })
        .await
        .unwrap()
        .unwrap();

        assert_eq!(handle, HANDLE);
    }

    #[tokio::test]
    async fn test_upload_existing_handle_renames_without_waiting() {
        let server = MockServer::start().await;
        Mock::given(method("POST"))
            .and(path(format!("/rename/{HANDLE}")))
            .and(body_json(json!({"uuid": HANDLE, "filename": "renamed"})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .respond_with(ResponseTemplate::new(200))
            .expect(0)
            .mount(&server)
            .await;

        let uri = server.uri();
        tokio::task::spawn_blocking(move || {
            let args = UploadArgs {
                input_handle: Some(HANDLE.to_string()),
                file_name: Some("renamed".to_string()),
                ..Default::default()
            };
            upload(&client_for(uri), &args, &fast_wait())
        })
        .await
        .unwrap()
        .unwrap();
    }

    #[tokio::test]
    async fn test_share_failure_surfaces_api_error() {
        let server = MockServer::start().await;
        Mock::given(method("PUT"))
            .respond_with(ResponseTemplate::new(403))
            .mount(&server)
            .await;
        Mock::given(any())
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({})))
            .mount(&server)
            .await;

        let uri = server.uri();
        let err = tokio::task::spawn_blocking(move || {
            let args = UploadArgs {
                input_handle: Some(HANDLE.to_string()),
                share_to: vec!["colleague@example.com".to_string()],
                ..Default::default()
            };
            upload(&client_for(uri), &args, &fast_wait())
        })
        .await
        .unwrap()
        .unwrap_err();

        match err {
            CliError::Gigasheet(e) => assert_eq!(e.status(), Some(403)),
            other => panic!("expected API error, got {other:?}"),
        }
    }

    /// Mount the endpoints an append with deduplication goes through.
    async fn mount_append(server: &MockServer, expected_sort: &str) {
        Mock::given(method("GET"))
            .and(path(format!("/dataset/{HANDLE}/columns")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!([
                {"Name": "#", "Id": "A"},
                {"Name": "email", "Id": "B"}
            ])))
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/file/{HANDLE}/filter")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"lastRow": 2})))
            .expect(3)
            .mount(server)
            .await;
        Mock::given(method("POST"))
            .and(path("/upload/direct"))
            .and(body_json(json!({
                "name": format!("failed append to {HANDLE}"),
                "contents": "bm90LHJlYWwKdGVzdCxmaWxl",
                "parentDirectory": "",
                "targetHandle": HANDLE
            })))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Handle": "append-job"})))
            .expect(1)
            .mount(server)
            .await;
        // The transient append sheet is gone once the job is done
        Mock::given(method("GET"))
            .and(path("/dataset/append-job"))
            .respond_with(ResponseTemplate::new(400).set_body_string("file was deleted"))
            .expect(1)
            .mount(server)
            .await;
        Mock::given(method("DELETE"))
            .and(path(format!("/dataset/{HANDLE}/deduplicate-rows")))
            .and(body_json(json!({
                "columns": ["B"],
                "sortModel": [{"colId": "A", "sort": expected_sort}]
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(server)
            .await;
    }

    async fn run_append(server: &MockServer, upsert: bool) {
        let dir = tempfile::tempdir().unwrap();
        let input_file = dir.path().join("rows.csv");
        std::fs::write(&input_file, "not,real\ntest,file").unwrap();

        let uri = server.uri();
        tokio::task::spawn_blocking(move || {
            let args = AppendArgs {
                handle: HANDLE.to_string(),
                input_file,
                dedupe_columns: vec!["email".to_string()],
                upsert,
                ..Default::default()
            };
            append(&client_for(uri), &args, &fast_wait())
        })
        .await
        .unwrap()
        .unwrap();
    }

    #[tokio::test]
    async fn test_append_upsert_keeps_newer_rows() {
        let server = MockServer::start().await;
        mount_append(&server, "desc").await;
        run_append(&server, true).await;
    }

    #[tokio::test]
    async fn test_append_dedupe_keeps_older_rows() {
        let server = MockServer::start().await;
        mount_append(&server, "asc").await;
        run_append(&server, false).await;
    }

    #[tokio::test]
    async fn test_export_downloads_into_output_dir() {
        let server = MockServer::start().await;
        let uri = server.uri();
        Mock::given(method("GET"))
            .and(path(format!("/dataset/{HANDLE}")))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({
                "Status": "processed",
                "ClientState": {"sortModel": []}
            })))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("POST"))
            .and(path(format!("/dataset/{HANDLE}/export")))
            .and(body_partial_json(json!({"gridState": {"sortModel": []}})))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"handle": "exp-1"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/dataset/exp-1"))
            .respond_with(ResponseTemplate::new(200).set_body_json(json!({"Status": "processed"})))
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/dataset/exp-1/download-export"))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(json!({"presignedUrl": format!("{uri}/files/export.zip")})),
            )
            .expect(1)
            .mount(&server)
            .await;
        Mock::given(method("GET"))
            .and(path("/files/export.zip"))
            .respond_with(ResponseTemplate::new(200).set_body_bytes(b"PK\x03\x04zipped".to_vec()))
            .expect(1)
            .mount(&server)
            .await;

        let dir = tempfile::tempdir().unwrap();
        let output_dir = dir.path().to_path_buf();
        let url = tokio::task::spawn_blocking(move || {
            export(&client_for(uri), HANDLE, Some(output_dir.as_path()), &fast_wait())
        })
        .await
        .unwrap()
        .unwrap();

        assert!(url.ends_with("/files/export.zip"));
        let saved = std::fs::read(dir.path().join(EXPORT_FILE_NAME)).unwrap();
        assert_eq!(saved, b"PK\x03\x04zipped");
    }
}
