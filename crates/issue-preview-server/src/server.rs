//! Preview server implementation.

use std::future::Future;
use std::net::SocketAddr;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use axum::{
    extract::{rejection::JsonRejection, DefaultBodyLimit, State},
    http::{header, StatusCode},
    response::{IntoResponse, Response},
    routing::{get, post},
    Json, Router,
};
use serde::Deserialize;
use tower_http::services::ServeDir;

use issue_preview_export::{ExportPipeline, ExportRequest, ExportResult};
use issue_preview_render::{artifact_path, RenderConfig, RenderError, Renderer};

use crate::refresh::{reload_path, RefreshLoop, RefreshToken};
use crate::watcher::{WatchBackend, WatchError};

/// Largest HTML snapshot `/export` accepts.
const MAX_EXPORT_BODY: usize = 16 * 1024 * 1024;

/// Configuration for the preview server.
#[derive(Debug, Clone)]
pub struct PreviewServerConfig {
    /// Issue form to preview
    pub source: PathBuf,

    /// Host to bind to
    pub host: String,

    /// Port to listen on
    pub port: u16,

    /// Open browser on start
    pub open: bool,

    /// Browser to open instead of the system default
    pub browser: Option<String>,

    /// Explicit export target
    pub output: Option<PathBuf>,

    /// Renderer settings
    pub render: RenderConfig,

    /// Change detection backend
    pub watch: WatchBackend,

    /// Poll interval for the polling backend
    pub interval: Duration,
}

impl Default for PreviewServerConfig {
    fn default() -> Self {
        Self {
            source: PathBuf::from("issue_template.yml"),
            host: "127.0.0.1".to_string(),
            port: 8000,
            open: true,
            browser: None,
            output: None,
            render: RenderConfig::default(),
            watch: WatchBackend::default(),
            interval: Duration::from_secs(1),
        }
    }
}

/// Errors that can occur with the server.
#[derive(Debug, thiserror::Error)]
pub enum ServerError {
    #[error(transparent)]
    Render(#[from] RenderError),

    #[error(transparent)]
    Watch(#[from] WatchError),

    #[error("Invalid address {0}")]
    InvalidAddress(String),

    #[error("Failed to bind to {0}: {1}")]
    BindError(String, String),

    #[error("Server error: {0}")]
    Serve(String),
}

/// Request state shared by every handler. Built once, never mutated.
pub struct PreviewContext {
    /// Directory served as static files
    pub serve_dir: PathBuf,

    /// Refresh token file
    pub reload_path: Option<PathBuf>,

    /// Source document, for export numbering and the default export path
    pub source_path: Option<PathBuf>,

    /// Explicit export target
    pub output_path: Option<PathBuf>,

    pub pipeline: ExportPipeline,
}

impl PreviewContext {
    /// Context for previewing `source`, serving its directory.
    pub fn for_source(source: &Path, output: Option<PathBuf>) -> Self {
        Self {
            serve_dir: parent_dir(source),
            reload_path: Some(reload_path(source)),
            source_path: Some(source.to_path_buf()),
            output_path: output,
            pipeline: ExportPipeline::new(),
        }
    }
}

/// Body of `POST /export`.
#[derive(Debug, Deserialize)]
pub struct ExportBody {
    pub html: String,
}

/// Build the preview router.
pub fn router(ctx: Arc<PreviewContext>) -> Router {
    let static_files = ServeDir::new(&ctx.serve_dir);

    Router::new()
        .route("/reload.txt", get(reload_handler))
        .route("/export", post(export_handler))
        .fallback_service(static_files)
        .layer(DefaultBodyLimit::max(MAX_EXPORT_BODY))
        .with_state(ctx)
}

/// Handler for the refresh token.
async fn reload_handler(State(ctx): State<Arc<PreviewContext>>) -> Response {
    let Some(path) = &ctx.reload_path else {
        return StatusCode::NOT_FOUND.into_response();
    };

    match tokio::fs::read_to_string(path).await {
        Ok(token) => (
            [
                (header::CONTENT_TYPE, "text/plain; charset=utf-8"),
                (header::CACHE_CONTROL, "no-store"),
            ],
            token,
        )
            .into_response(),
        Err(_) => StatusCode::NOT_FOUND.into_response(),
    }
}

/// Handler for exports. The pipeline runs on the blocking pool.
async fn export_handler(
    State(ctx): State<Arc<PreviewContext>>,
    body: Result<Json<ExportBody>, JsonRejection>,
) -> (StatusCode, Json<ExportResult>) {
    let body = match body {
        Ok(Json(body)) => body,
        Err(rejection) => {
            tracing::warn!("Rejected export request: {}", rejection.body_text());
            return (
                rejection.status(),
                Json(ExportResult::failed(rejection.body_text())),
            );
        }
    };

    let request = ExportRequest {
        html: body.html,
        source: ctx.source_path.clone(),
        output: ctx.output_path.clone(),
    };

    let task_ctx = Arc::clone(&ctx);
    let outcome = tokio::task::spawn_blocking(move || task_ctx.pipeline.run(&request)).await;

    match outcome {
        Ok(Ok(path)) => (StatusCode::OK, Json(ExportResult::saved(&path))),
        Ok(Err(e)) if e.is_client_error() => {
            tracing::warn!("Export skipped: {}", e);
            (StatusCode::OK, Json(ExportResult::failed(e.to_string())))
        }
        Ok(Err(e)) => {
            tracing::error!("Export failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ExportResult::failed(e.to_string())),
            )
        }
        Err(e) => {
            tracing::error!("Export task failed: {}", e);
            (
                StatusCode::INTERNAL_SERVER_ERROR,
                Json(ExportResult::failed(format!("Export failed: {}", e))),
            )
        }
    }
}

/// Deletes the preview's generated files when dropped.
pub struct ArtifactGuard {
    paths: Vec<PathBuf>,
}

impl ArtifactGuard {
    pub fn new(paths: Vec<PathBuf>) -> Self {
        Self { paths }
    }
}

impl Drop for ArtifactGuard {
    fn drop(&mut self) {
        for path in &self.paths {
            match std::fs::remove_file(path) {
                Ok(()) => tracing::debug!("Removed {}", path.display()),
                Err(e) if e.kind() == std::io::ErrorKind::NotFound => {}
                Err(e) => tracing::warn!("Failed to remove {}: {}", path.display(), e),
            }
        }
    }
}

/// Live preview server.
pub struct PreviewServer {
    config: PreviewServerConfig,
}

impl PreviewServer {
    /// Create a new preview server.
    pub fn new(config: PreviewServerConfig) -> Self {
        Self { config }
    }

    /// Serve until Ctrl-C.
    pub async fn start(self) -> Result<(), ServerError> {
        self.run_until(shutdown_signal()).await
    }

    /// Serve until `shutdown` completes, then remove the generated files.
    ///
    /// The document is rendered before anything is bound, so a broken source
    /// never leaves a listening socket behind.
    pub async fn run_until<F>(self, shutdown: F) -> Result<(), ServerError>
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let source = self.config.source.clone();
        let artifact = artifact_path(&source);
        let token = RefreshToken::new(reload_path(&source));

        let renderer = Renderer::new(&self.config.render)?;
        let changes = self
            .config
            .watch
            .change_source(&source, self.config.interval)?;
        let mut refresh = RefreshLoop::new(
            renderer,
            source.clone(),
            artifact.clone(),
            token,
            changes,
        );

        refresh.render_once()?;
        let _guard = ArtifactGuard::new(vec![artifact.clone(), reload_path(&source)]);

        let addr: SocketAddr = format!("{}:{}", self.config.host, self.config.port)
            .parse()
            .map_err(|_| {
                ServerError::InvalidAddress(format!("{}:{}", self.config.host, self.config.port))
            })?;

        let listener = tokio::net::TcpListener::bind(addr)
            .await
            .map_err(|e| ServerError::BindError(addr.to_string(), e.to_string()))?;
        let local = listener
            .local_addr()
            .map_err(|e| ServerError::BindError(addr.to_string(), e.to_string()))?;

        let ctx = Arc::new(PreviewContext::for_source(
            &source,
            self.config.output.clone(),
        ));
        let app = router(ctx);

        let refresh_task = tokio::spawn(refresh.run());

        let page = artifact
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or_default();
        let url = format!("http://{}/{}", local, page);
        tracing::info!("Previewing {} at {}", source.display(), url);

        if self.config.open {
            open_browser(&url, self.config.browser.as_deref());
        }

        let served = axum::serve(listener, app)
            .with_graceful_shutdown(shutdown)
            .await
            .map_err(|e| ServerError::Serve(e.to_string()));

        // Wait for the task so no render lands after cleanup.
        refresh_task.abort();
        let _ = refresh_task.await;
        tracing::info!("Preview stopped, cleaning up");

        served
    }
}

fn open_browser(url: &str, browser: Option<&str>) {
    let result = match browser {
        Some(app) => open::with(url, app),
        None => open::that(url),
    };

    if let Err(e) = result {
        tracing::warn!("Failed to open browser: {}", e);
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        tracing::warn!("Failed to listen for Ctrl-C: {}", e);
        std::future::pending::<()>().await;
    }
}

fn parent_dir(path: &Path) -> PathBuf {
    match path.parent() {
        Some(dir) if !dir.as_os_str().is_empty() => dir.to_path_buf(),
        _ => PathBuf::from("."),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;

    use axum::body::{to_bytes, Body};
    use axum::http::Request;
    use tempfile::tempdir;
    use tower::ServiceExt;

    const SNAPSHOT: &str = r#"<html><body><h1 id="export-title">Crash</h1><ol><li>A</li><li>B</li></ol><div id="toolbar-no-export">x</div></body></html>"#;

    fn context(dir: &Path) -> PreviewContext {
        PreviewContext {
            serve_dir: dir.to_path_buf(),
            reload_path: Some(dir.join("form_reload.txt")),
            source_path: Some(dir.join("form.yml")),
            output_path: None,
            pipeline: ExportPipeline::new(),
        }
    }

    fn export_request(html: &str) -> Request<Body> {
        raw_export_request(serde_json::json!({ "html": html }).to_string())
    }

    fn raw_export_request(body: impl Into<Body>) -> Request<Body> {
        Request::builder()
            .method("POST")
            .uri("/export")
            .header(header::CONTENT_TYPE, "application/json")
            .body(body.into())
            .unwrap()
    }

    async fn json_body(response: Response) -> ExportResult {
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn serves_reload_token() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("form_reload.txt"), "1700000000000").unwrap();
        let app = router(Arc::new(context(temp.path())));

        let response = app
            .oneshot(Request::builder().uri("/reload.txt").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers()[header::CONTENT_TYPE]
            .to_str()
            .unwrap()
            .starts_with("text/plain"));
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"1700000000000");
    }

    #[tokio::test]
    async fn missing_reload_token_is_not_found() {
        let temp = tempdir().unwrap();
        let app = router(Arc::new(context(temp.path())));

        let response = app
            .oneshot(Request::builder().uri("/reload.txt").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn unconfigured_reload_token_is_not_found() {
        let temp = tempdir().unwrap();
        let ctx = PreviewContext {
            reload_path: None,
            ..context(temp.path())
        };

        let response = router(Arc::new(ctx))
            .oneshot(Request::builder().uri("/reload.txt").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::NOT_FOUND);
    }

    #[tokio::test]
    async fn serves_static_files() {
        let temp = tempdir().unwrap();
        fs::write(temp.path().join("form.html"), "<p>preview</p>").unwrap();
        let app = router(Arc::new(context(temp.path())));

        let response = app
            .oneshot(Request::builder().uri("/form.html").body(Body::empty()).unwrap())
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
        assert_eq!(&bytes[..], b"<p>preview</p>");
    }

    #[tokio::test]
    async fn exports_beside_source() {
        let temp = tempdir().unwrap();
        let app = router(Arc::new(context(temp.path())));

        let response = app.oneshot(export_request(SNAPSHOT)).await.unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let result = json_body(response).await;
        assert!(result.success);
        let written = temp.path().join("form.md");
        assert_eq!(result.path, Some(written.display().to_string()));
        let markdown = fs::read_to_string(&written).unwrap();
        assert!(markdown.starts_with("# Crash\n\n"));
        assert!(!markdown.contains('x'));
    }

    #[tokio::test]
    async fn export_without_destination_reports_failure() {
        let temp = tempdir().unwrap();
        let ctx = PreviewContext {
            source_path: None,
            ..context(temp.path())
        };

        let response = router(Arc::new(ctx))
            .oneshot(export_request(SNAPSHOT))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::OK);
        let result = json_body(response).await;
        assert!(!result.success);
        assert_eq!(result.path, None);
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn malformed_export_body_is_reported_as_json() {
        let temp = tempdir().unwrap();
        let app = router(Arc::new(context(temp.path())));

        let response = app
            .clone()
            .oneshot(raw_export_request("not json"))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        let result = json_body(response).await;
        assert!(!result.success);
        assert!(!result.message.is_empty());

        let response = app
            .oneshot(raw_export_request(r#"{"htm":"x"}"#))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
        let result = json_body(response).await;
        assert!(!result.success);
        assert!(result.message.contains("html"));
        assert_eq!(fs::read_dir(temp.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn unwritable_export_is_a_server_error() {
        let temp = tempdir().unwrap();
        let blocker = temp.path().join("file");
        fs::write(&blocker, "").unwrap();
        let ctx = PreviewContext {
            output_path: Some(blocker.join("issue.md")),
            ..context(temp.path())
        };

        let response = router(Arc::new(ctx))
            .oneshot(export_request(SNAPSHOT))
            .await
            .unwrap();

        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);
        assert!(!json_body(response).await.success);
    }

    #[test]
    fn guard_removes_files_and_tolerates_missing_ones() {
        let temp = tempdir().unwrap();
        let page = temp.path().join("form.html");
        fs::write(&page, "<p>x</p>").unwrap();

        drop(ArtifactGuard::new(vec![
            page.clone(),
            temp.path().join("never-written.txt"),
        ]));

        assert!(!page.exists());
    }

    #[tokio::test]
    async fn bad_source_fails_before_binding() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("form.yml");
        fs::write(&source, "body: [broken\n").unwrap();
        let previous = temp.path().join("form.html");
        fs::write(&previous, "<p>last good render</p>").unwrap();

        let server = PreviewServer::new(PreviewServerConfig {
            source: source.clone(),
            port: 0,
            open: false,
            ..Default::default()
        });

        let result = server.run_until(async {}).await;

        assert!(matches!(result, Err(ServerError::Render(_))));
        assert_eq!(
            fs::read_to_string(&previous).unwrap(),
            "<p>last good render</p>"
        );
        assert!(!temp.path().join("form_reload.txt").exists());
    }

    #[tokio::test]
    async fn shutdown_removes_generated_files() {
        let temp = tempdir().unwrap();
        let source = temp.path().join("shutdown_case.yml");
        fs::write(&source, "name: Bug\n").unwrap();

        let server = PreviewServer::new(PreviewServerConfig {
            source: source.clone(),
            port: 0,
            open: false,
            ..Default::default()
        });

        server.run_until(async {}).await.unwrap();

        assert!(source.exists());
        assert!(!temp.path().join("shutdown_case.html").exists());
        assert!(!reload_path(&source).exists());
    }
}
