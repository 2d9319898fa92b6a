use std::cmp::Ordering;

use axum::{
    Json,
    body::Body,
    extract::{Form, Multipart, Path, Query, State, rejection::FormRejection},
    http::{StatusCode, Uri, header},
    response::{Html, IntoResponse, Response},
};
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;
use tokio_util::io::ReaderStream;
use tracing::{debug, info, warn};

use crate::AppState;
use crate::error::ServerError;
use crate::node::{Node, NodeKind};
use crate::resolve;

/// UI shell served at `/`. The bundle is a collaborator; the only part
/// the server owns is the base-URL script injection.
const INDEX_HTML: &str = include_str!("../assets/index.html");

/// Query parameters for the listing endpoint
#[derive(Debug, Deserialize)]
pub struct ListQuery {
    #[serde(default = "default_root_path")]
    pub path: String,
}

fn default_root_path() -> String {
    "/".to_string()
}

/// Fields for the delete endpoint, accepted from the urlencoded body or
/// the query string (body value wins when both are present)
#[derive(Debug, Default, Deserialize)]
pub struct DeleteForm {
    pub path: Option<String>,
}

/// Fields for the rename endpoint, accepted from the urlencoded body or
/// the query string
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RenameForm {
    pub path: Option<String>,
    pub new_name: Option<String>,
}

/// Fields for the mkdir endpoint, accepted from the urlencoded body or
/// the query string
#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MkdirForm {
    pub path: Option<String>,
    pub new_dir_name: Option<String>,
}

/// Query parameters for the upload endpoint. The destination may come
/// from the query string or from a `path` multipart field preceding the
/// file part.
#[derive(Debug, Deserialize)]
pub struct UploadQuery {
    pub path: Option<String>,
}

/// One entry in a directory listing. URL fields are `null` (never
/// omitted) when no server base URL is known, keeping the schema stable.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub kind: &'static str,
    pub path: String,
    pub size: Option<u64>,
    pub last_modified: Option<u64>,
    pub file_url: Option<String>,
    pub api_url: Option<String>,
    pub delete_api_url: Option<String>,
    pub rename_api_url: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingResponse {
    pub current_path: String,
    pub items: Vec<ListingEntry>,
    pub server_name: String,
}

/// Response for successful mutations
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct MutationResponse {
    pub status: &'static str,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub old_path: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub new_path: Option<String>,
}

impl MutationResponse {
    fn with_path(message: String, path: String) -> Self {
        Self {
            status: "success",
            message,
            path: Some(path),
            old_path: None,
            new_path: None,
        }
    }

    fn renamed(message: String, old_path: String, new_path: String) -> Self {
        Self {
            status: "success",
            message,
            path: None,
            old_path: Some(old_path),
            new_path: Some(new_path),
        }
    }
}

// ============================================================================
// Helper functions
// ============================================================================

/// Extension-based MIME lookup, with `mime_guess` as a second opinion
/// before falling back to `application/octet-stream`.
fn guess_mime(name: &str) -> String {
    let extension = name.rsplit_once('.').map(|(_, ext)| ext).unwrap_or("");
    let known = match extension.to_ascii_lowercase().as_str() {
        "html" | "htm" => Some("text/html"),
        "css" => Some("text/css"),
        "js" => Some("application/javascript"),
        "json" => Some("application/json"),
        "png" => Some("image/png"),
        "jpg" | "jpeg" => Some("image/jpeg"),
        "gif" => Some("image/gif"),
        "svg" => Some("image/svg+xml"),
        "pdf" => Some("application/pdf"),
        "zip" => Some("application/zip"),
        "tar" => Some("application/x-tar"),
        "gz" => Some("application/gzip"),
        "mp3" => Some("audio/mpeg"),
        "wav" => Some("audio/wav"),
        "mp4" => Some("video/mp4"),
        "webm" => Some("video/webm"),
        "txt" => Some("text/plain"),
        _ => None,
    };
    match known {
        Some(mime) => mime.to_string(),
        None => mime_guess::from_path(name)
            .first_raw()
            .unwrap_or("application/octet-stream")
            .to_string(),
    }
}

/// Media the browser can render gets `inline`, everything else is a
/// download.
fn disposition_for(mime: &str) -> &'static str {
    if mime.starts_with("image/")
        || mime.starts_with("video/")
        || mime.starts_with("audio/")
        || mime == "text/plain"
        || mime == "application/pdf"
    {
        "inline"
    } else {
        "attachment"
    }
}

fn escape_quotes(name: &str) -> String {
    name.replace('"', "\\\"")
}

/// Sanitize an uploaded file's client-supplied name: strip control
/// characters and double quotes, trim whitespace and surrounding
/// slashes, URL-decode, then reject anything empty or still containing
/// a separator. This rule set is a floor, not a filter framework.
fn sanitize_upload_filename(raw: &str) -> Option<String> {
    let stripped: String = raw
        .chars()
        .filter(|c| !c.is_control() && *c != '"')
        .collect();
    let trimmed = stripped.trim().trim_matches('/').trim();

    let decoded = urlencoding::decode(trimmed)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| trimmed.to_string());

    if decoded.is_empty() || decoded.contains('/') || decoded.contains('\\') {
        return None;
    }
    Some(decoded)
}

/// Validate a client-supplied new name for rename/mkdir: URL-decoded,
/// trimmed, non-empty, no separators.
fn validate_new_name(raw: &str) -> Result<String, ServerError> {
    let decoded = urlencoding::decode(raw)
        .map(|decoded| decoded.into_owned())
        .unwrap_or_else(|_| raw.to_string());
    let name = decoded.trim();
    if name.is_empty() {
        return Err(ServerError::BadRequest(
            "Name cannot be empty.".to_string(),
        ));
    }
    if name.contains('/') || name.contains('\\') {
        return Err(ServerError::BadRequest(
            "Name cannot contain slashes.".to_string(),
        ));
    }
    Ok(name.to_string())
}

/// Sort: directories first, then case-insensitive by name.
fn sort_children(children: &mut [Box<dyn Node>]) {
    children.sort_by(|a, b| match (a.kind(), b.kind()) {
        (NodeKind::Directory, NodeKind::File) => Ordering::Less,
        (NodeKind::File, NodeKind::Directory) => Ordering::Greater,
        _ => a.name().to_lowercase().cmp(&b.name().to_lowercase()),
    });
}

fn inject_base_url(shell: &str, base_url: &str) -> String {
    let script = format!("<script>window.__API_BASE_URL__ = \"{base_url}\";</script>\n");
    if shell.contains("</head>") {
        shell.replacen("</head>", &format!("{script}</head>"), 1)
    } else {
        // Shell without a head; fall back to the top of the body.
        shell.replacen("<body>", &format!("<body>\n{script}"), 1)
    }
}

// ============================================================================
// Handlers
// ============================================================================

/// GET / - UI shell, with the base URL injected when known
pub async fn index(State(state): State<AppState>) -> Response {
    match state.base_url() {
        Some(base_url) => Html(inject_base_url(INDEX_HTML, &base_url)).into_response(),
        None => Html(INDEX_HTML.to_string()).into_response(),
    }
}

/// GET /api/list - JSON directory listing
pub async fn list_directory(
    State(state): State<AppState>,
    Query(query): Query<ListQuery>,
) -> Result<Json<ListingResponse>, ServerError> {
    debug!(path = %query.path, "listing directory");

    let node = resolve::resolve(state.root.as_ref(), &query.path)
        .await?
        .ok_or_else(|| ServerError::NotFound("Directory not found.".to_string()))?;

    if node.kind() == NodeKind::File {
        return Err(ServerError::BadRequest(
            "Path is a file, not a directory.".to_string(),
        ));
    }

    let listing = build_listing(&state, &query.path, node.as_ref()).await?;
    Ok(Json(listing))
}

async fn build_listing(
    state: &AppState,
    requested: &str,
    directory: &dyn Node,
) -> Result<ListingResponse, ServerError> {
    let current_path = resolve::normalize(requested);
    let base_url = state.base_url();

    let mut children = directory.list_children().await?;
    sort_children(&mut children);

    let mut items = Vec::with_capacity(children.len() + 1);

    if current_path != "/" {
        let parent_path = resolve::parent(&current_path);
        items.push(ListingEntry {
            name: "..".to_string(),
            kind: "directory",
            path: parent_path.clone(),
            size: None,
            last_modified: None,
            file_url: None,
            api_url: base_url.as_ref().map(|base| {
                format!(
                    "{base}/api/list?path={}",
                    resolve::encode_component(&parent_path)
                )
            }),
            delete_api_url: None,
            rename_api_url: None,
        });
    }

    let root_identity = state.root.identity();
    for child in children {
        // Defensive: some stores erroneously list the root inside itself.
        if child.identity() == root_identity {
            continue;
        }

        let entry_path = resolve::join(&current_path, child.name());
        let (kind, size, file_url, api_url) = match child.kind() {
            NodeKind::File => (
                "file",
                child.size(),
                base_url
                    .as_ref()
                    .map(|base| format!("{base}/files{}", resolve::encode_path(&entry_path))),
                None,
            ),
            NodeKind::Directory => (
                "directory",
                None,
                None,
                base_url.as_ref().map(|base| {
                    format!(
                        "{base}/api/list?path={}",
                        resolve::encode_component(&entry_path)
                    )
                }),
            ),
        };

        items.push(ListingEntry {
            name: child.name().to_string(),
            kind,
            path: entry_path,
            size,
            last_modified: child.last_modified(),
            file_url,
            api_url,
            delete_api_url: base_url.as_ref().map(|base| format!("{base}/api/delete")),
            rename_api_url: base_url.as_ref().map(|base| format!("{base}/api/rename")),
        });
    }

    Ok(ListingResponse {
        current_path,
        items,
        server_name: state.config.server_name.clone(),
    })
}

/// GET /files/{*path} - stream raw file bytes
///
/// Non-API route: errors render as plain text.
pub async fn download(State(state): State<AppState>, Path(raw_path): Path<String>) -> Response {
    match download_inner(&state, &raw_path).await {
        Ok(response) => response,
        Err(err) => err.into_plain_response(),
    }
}

async fn download_inner(state: &AppState, raw_path: &str) -> Result<Response, ServerError> {
    let node = resolve::resolve(state.root.as_ref(), raw_path)
        .await?
        .ok_or_else(|| ServerError::NotFound("File not found.".to_string()))?;

    if node.kind() == NodeKind::Directory {
        return Err(ServerError::BadRequest(
            "Path is a directory, not a file.".to_string(),
        ));
    }

    let mime = node
        .content_type()
        .unwrap_or_else(|| guess_mime(node.name()));
    let disposition = disposition_for(&mime);

    debug!(path = %raw_path, %mime, disposition, "streaming file");

    // Stream chunked so arbitrarily large files never sit in memory.
    let reader = node.open_read().await?;
    let body = Body::from_stream(ReaderStream::new(reader));

    let mut builder = Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, mime)
        .header(
            header::CONTENT_DISPOSITION,
            format!("{disposition}; filename=\"{}\"", escape_quotes(node.name())),
        )
        .header(header::ACCEPT_RANGES, "bytes");
    if let Some(size) = node.size() {
        builder = builder.header(header::CONTENT_LENGTH, size.to_string());
    }

    builder
        .body(body)
        .map_err(|err| ServerError::Internal(format!("failed to build response: {err}")))
}

/// POST /api/delete - delete a file or directory
pub async fn delete_entry(
    State(state): State<AppState>,
    Query(query): Query<DeleteForm>,
    form: Result<Form<DeleteForm>, FormRejection>,
) -> Result<Json<MutationResponse>, ServerError> {
    let form = form.map(|Form(form)| form).unwrap_or_default();
    let raw_path = form
        .path
        .or(query.path)
        .ok_or_else(|| ServerError::BadRequest("Missing 'path' parameter.".to_string()))?;

    if resolve::is_root(&raw_path) {
        warn!(path = %raw_path, "refusing to delete root");
        return Err(ServerError::Forbidden(
            "Cannot delete the root directory.".to_string(),
        ));
    }

    let node = resolve::resolve(state.root.as_ref(), &raw_path)
        .await?
        .ok_or_else(|| ServerError::NotFound("File or directory not found.".to_string()))?;

    info!(path = %raw_path, "deleting");
    node.delete().await?;

    Ok(Json(MutationResponse::with_path(
        format!("Successfully deleted: {}", node.name()),
        resolve::normalize(&raw_path),
    )))
}

/// POST /api/rename - rename a file or directory in place
pub async fn rename_entry(
    State(state): State<AppState>,
    Query(query): Query<RenameForm>,
    form: Result<Form<RenameForm>, FormRejection>,
) -> Result<Json<MutationResponse>, ServerError> {
    let form = form.map(|Form(form)| form).unwrap_or_default();
    let (raw_path, raw_name) = match (form.path.or(query.path), form.new_name.or(query.new_name)) {
        (Some(path), Some(name)) => (path, name),
        _ => {
            return Err(ServerError::BadRequest(
                "Missing 'path' or 'newName' parameter.".to_string(),
            ));
        }
    };

    if resolve::is_root(&raw_path) {
        warn!(path = %raw_path, "refusing to rename root");
        return Err(ServerError::Forbidden(
            "Cannot rename the root directory.".to_string(),
        ));
    }

    let node = resolve::resolve(state.root.as_ref(), &raw_path)
        .await?
        .ok_or_else(|| ServerError::NotFound("File or directory not found.".to_string()))?;

    let new_name = validate_new_name(&raw_name)?;

    let old_path = resolve::normalize(&raw_path);
    let new_path = resolve::join(&resolve::parent(&old_path), &new_name);

    info!(%old_path, %new_path, "renaming");
    node.rename(&new_name).await?;

    Ok(Json(MutationResponse::renamed(
        format!("Successfully renamed to: {new_name}"),
        old_path,
        new_path,
    )))
}

/// POST /api/mkdir - create a directory under an existing parent
pub async fn make_directory(
    State(state): State<AppState>,
    Query(query): Query<MkdirForm>,
    form: Result<Form<MkdirForm>, FormRejection>,
) -> Result<(StatusCode, Json<MutationResponse>), ServerError> {
    let form = form.map(|Form(form)| form).unwrap_or_default();
    let raw_name = form
        .new_dir_name
        .or(query.new_dir_name)
        .ok_or_else(|| ServerError::BadRequest("Missing 'newDirName' parameter.".to_string()))?;
    let dest = form.path.or(query.path).unwrap_or_else(default_root_path);

    let parent = resolve::resolve(state.root.as_ref(), &dest)
        .await?
        .filter(|node| node.kind() == NodeKind::Directory)
        .ok_or_else(|| {
            ServerError::NotFound(
                "Destination directory not found or is not a directory.".to_string(),
            )
        })?;

    let new_name = validate_new_name(&raw_name)?;

    info!(parent = %dest, name = %new_name, "creating directory");
    let created = parent.create_directory(&new_name).await?;
    let new_path = resolve::join(&resolve::normalize(&dest), created.name());

    Ok((
        StatusCode::CREATED,
        Json(MutationResponse::with_path(
            format!("Successfully created directory: {}", created.name()),
            new_path,
        )),
    ))
}

/// POST /api/upload - accept one multipart file part and stream it into
/// a newly created child of the destination directory. The destination
/// comes from the `path` query parameter or a `path` multipart field
/// preceding the file part; a `path` field arriving after the file part
/// is rejected rather than silently uploading to the root.
pub async fn upload(
    State(state): State<AppState>,
    Query(query): Query<UploadQuery>,
    mut multipart: Multipart,
) -> Result<(StatusCode, Json<MutationResponse>), ServerError> {
    let mut dest_path = query.path;
    let mut uploaded: Option<(Box<dyn Node>, String, bool)> = None;

    while let Some(mut field) = multipart.next_field().await.map_err(|err| {
        warn!("malformed multipart body: {err}");
        ServerError::BadRequest(format!("Malformed multipart request: {err}"))
    })? {
        if field.file_name().is_none() {
            // Text fields: only `path` is meaningful, and only if the
            // query string did not already pin the destination.
            if field.name() == Some("path") && dest_path.is_none() {
                let value = field.text().await.map_err(|err| {
                    ServerError::BadRequest(format!("Malformed multipart request: {err}"))
                })?;
                dest_path = Some(value);
            }
            continue;
        }

        let dest_pinned = dest_path.is_some();
        let dest = dest_path.take().unwrap_or_else(default_root_path);
        let raw_name = field.file_name().unwrap_or_default().to_string();
        let file_name = sanitize_upload_filename(&raw_name).ok_or_else(|| {
            warn!(?raw_name, "rejected upload filename");
            ServerError::BadRequest("Invalid upload filename.".to_string())
        })?;

        let parent = resolve::resolve(state.root.as_ref(), &dest)
            .await?
            .filter(|node| node.kind() == NodeKind::Directory)
            .ok_or_else(|| {
                ServerError::NotFound(
                    "Destination directory not found or is not a directory.".to_string(),
                )
            })?;

        let mime = guess_mime(&file_name);
        let node = parent.create_file(&mime, &file_name).await?;

        let written = async {
            let mut writer = node.open_write().await?;
            let mut total: u64 = 0;
            while let Some(chunk) = field.chunk().await.map_err(|err| {
                ServerError::BadRequest(format!("Failed to read upload data: {err}"))
            })? {
                total += chunk.len() as u64;
                writer
                    .write_all(&chunk)
                    .await
                    .map_err(|err| ServerError::Internal(format!("write failed: {err}")))?;
            }
            writer
                .shutdown()
                .await
                .map_err(|err| ServerError::Internal(format!("write failed: {err}")))?;
            Ok::<u64, ServerError>(total)
        }
        .await;

        let total = match written {
            Ok(total) => total,
            Err(err) => {
                // A partially written file is worse than no file.
                if let Err(cleanup_err) = node.delete().await {
                    warn!(name = %file_name, "failed to clean up partial upload: {cleanup_err}");
                }
                return Err(err);
            }
        };

        let new_path = resolve::join(&resolve::normalize(&dest), node.name());
        info!(path = %new_path, bytes = total, "upload complete");
        uploaded = Some((node, new_path, dest_pinned));
        break;
    }

    let Some((node, new_path, dest_pinned)) = uploaded else {
        return Err(ServerError::BadRequest(
            "No file upload part found in request.".to_string(),
        ));
    };

    if !dest_pinned {
        // The destination defaulted to the root. A `path` field after the
        // file part means the client wanted somewhere else; refuse rather
        // than leave the file in the wrong place.
        while let Some(late) = multipart.next_field().await.map_err(|err| {
            ServerError::BadRequest(format!("Malformed multipart request: {err}"))
        })? {
            if late.file_name().is_none() && late.name() == Some("path") {
                if let Err(cleanup_err) = node.delete().await {
                    warn!("failed to clean up misdirected upload: {cleanup_err}");
                }
                return Err(ServerError::BadRequest(
                    "Field 'path' must precede the file part.".to_string(),
                ));
            }
        }
    }

    Ok((
        StatusCode::CREATED,
        Json(MutationResponse::with_path(
            format!("Successfully uploaded: {}", node.name()),
            new_path,
        )),
    ))
}

/// Fallback for a matched path hit with the wrong method: JSON for API
/// paths, plain text otherwise
pub async fn method_not_allowed(uri: Uri) -> Response {
    let path = uri.path();
    warn!(%path, "method not allowed");
    if path.starts_with("/api/") {
        ServerError::MethodNotAllowed.into_response()
    } else {
        ServerError::MethodNotAllowed.into_plain_response()
    }
}

/// Fallback for unmatched routes: JSON for API paths, plain text otherwise
pub async fn not_found(uri: Uri) -> Response {
    let path = uri.path();
    warn!(%path, "no route matched");
    if path.starts_with("/api/") {
        ServerError::NotFound("API endpoint not found.".to_string()).into_response()
    } else {
        (
            StatusCode::NOT_FOUND,
            format!("Error 404: no file, API endpoint, or resource at {path}."),
        )
            .into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::node::FsNode;
    use tempfile::TempDir;

    // ========================================================================
    // MIME and disposition
    // ========================================================================

    #[test]
    fn mime_table_covers_known_extensions() {
        assert_eq!(guess_mime("index.html"), "text/html");
        assert_eq!(guess_mime("style.css"), "text/css");
        assert_eq!(guess_mime("archive.TAR"), "application/x-tar");
        assert_eq!(guess_mime("song.mp3"), "audio/mpeg");
        assert_eq!(guess_mime("readme.txt"), "text/plain");
        assert_eq!(guess_mime("blob.weirdext"), "application/octet-stream");
        assert_eq!(guess_mime("no_extension"), "application/octet-stream");
    }

    #[test]
    fn disposition_inline_for_renderable_media() {
        assert_eq!(disposition_for("image/png"), "inline");
        assert_eq!(disposition_for("video/mp4"), "inline");
        assert_eq!(disposition_for("audio/wav"), "inline");
        assert_eq!(disposition_for("text/plain"), "inline");
        assert_eq!(disposition_for("application/pdf"), "inline");
        assert_eq!(disposition_for("application/zip"), "attachment");
        assert_eq!(disposition_for("application/octet-stream"), "attachment");
    }

    #[test]
    fn quotes_escaped_in_disposition_filename() {
        assert_eq!(escape_quotes("a\"b.txt"), "a\\\"b.txt");
    }

    // ========================================================================
    // Upload filename sanitization
    // ========================================================================

    #[test]
    fn sanitize_filename_accepts_normal_names() {
        assert_eq!(
            sanitize_upload_filename("report.pdf"),
            Some("report.pdf".to_string())
        );
        assert_eq!(
            sanitize_upload_filename("  photo 1.jpg  "),
            Some("photo 1.jpg".to_string())
        );
    }

    #[test]
    fn sanitize_filename_strips_controls_and_quotes() {
        assert_eq!(
            sanitize_upload_filename("re\x01po\"rt.pdf"),
            Some("report.pdf".to_string())
        );
        assert_eq!(
            sanitize_upload_filename("a\0b.txt"),
            Some("ab.txt".to_string())
        );
    }

    #[test]
    fn sanitize_filename_trims_surrounding_slashes() {
        assert_eq!(
            sanitize_upload_filename("/report.pdf/"),
            Some("report.pdf".to_string())
        );
    }

    #[test]
    fn sanitize_filename_decodes_percent_encoding() {
        assert_eq!(
            sanitize_upload_filename("my%20file.txt"),
            Some("my file.txt".to_string())
        );
        // Decoding that reveals a separator is rejected.
        assert_eq!(sanitize_upload_filename("a%2Fb.txt"), None);
    }

    #[test]
    fn sanitize_filename_rejects_empty_and_separators() {
        assert_eq!(sanitize_upload_filename(""), None);
        assert_eq!(sanitize_upload_filename("   "), None);
        assert_eq!(sanitize_upload_filename("///"), None);
        assert_eq!(sanitize_upload_filename("a/b.txt"), None);
        assert_eq!(sanitize_upload_filename("a\\b.txt"), None);
    }

    // ========================================================================
    // New-name validation (rename/mkdir)
    // ========================================================================

    #[test]
    fn new_name_validation() {
        assert_eq!(validate_new_name("notes.txt").unwrap(), "notes.txt");
        assert_eq!(validate_new_name("my%20dir").unwrap(), "my dir");
        assert!(validate_new_name("").is_err());
        assert!(validate_new_name("   ").is_err());
        assert!(validate_new_name("a/b").is_err());
        assert!(validate_new_name("a\\b").is_err());
        assert!(validate_new_name("%2e%2e%2fup").is_err());
    }

    // ========================================================================
    // Listing sort order
    // ========================================================================

    #[tokio::test]
    async fn directories_sort_before_files_case_insensitive() {
        let tmp = TempDir::new().unwrap();
        std::fs::write(tmp.path().join("zeta.txt"), "z").unwrap();
        std::fs::write(tmp.path().join("Alpha.txt"), "a").unwrap();
        std::fs::create_dir(tmp.path().join("beta")).unwrap();
        std::fs::create_dir(tmp.path().join("Gamma")).unwrap();

        let root = FsNode::open(tmp.path()).await.unwrap();
        let mut children = root.list_children().await.unwrap();
        sort_children(&mut children);

        let names: Vec<&str> = children.iter().map(|c| c.name()).collect();
        assert_eq!(names, vec!["beta", "Gamma", "Alpha.txt", "zeta.txt"]);
    }

    // ========================================================================
    // Shell injection
    // ========================================================================

    #[test]
    fn base_url_injected_before_head_end() {
        let shell = "<html><head><title>t</title></head><body></body></html>";
        let injected = inject_base_url(shell, "http://192.168.1.4:8686");
        let script_at = injected
            .find("window.__API_BASE_URL__ = \"http://192.168.1.4:8686\"")
            .unwrap();
        assert!(script_at < injected.find("</head>").unwrap());
    }

    #[test]
    fn base_url_injection_falls_back_to_body() {
        let shell = "<html><body><p>hi</p></body></html>";
        let injected = inject_base_url(shell, "https://10.0.0.2:443");
        assert!(injected.contains("window.__API_BASE_URL__"));
        assert!(injected.find("<body>").unwrap() < injected.find("window.__API_BASE_URL__").unwrap());
    }

    #[test]
    fn shipped_shell_has_injection_point() {
        assert!(INDEX_HTML.contains("</head>"));
    }
}
