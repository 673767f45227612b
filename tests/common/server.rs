//! Test server lifecycle management
//!
//! Each test gets an isolated server with its own database and frontend directory.

use super::constants::*;
use album_tracker::collection::{CollectionStore, Dispatcher, SqliteKeyValueStore, DB_FILE_NAME};
use album_tracker::server::{make_app, RequestsLoggingLevel, ServerConfig};
use std::path::PathBuf;
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;
use tokio::net::TcpListener;

/// Test server instance backed by a temporary SQLite database.
///
/// When dropped, the server gracefully shuts down and temp resources are cleaned up.
pub struct TestServer {
    /// Base URL for making requests (e.g., "http://127.0.0.1:12345")
    pub base_url: String,

    /// Path of the album database, to reopen it after a restart
    pub db_path: PathBuf,

    _temp_db_dir: Option<TempDir>,
    _temp_frontend_dir: TempDir,
    _shutdown_tx: Option<tokio::sync::oneshot::Sender<()>>,
}

fn create_frontend_dir() -> std::io::Result<TempDir> {
    let dir = TempDir::new()?;
    std::fs::create_dir(dir.path().join("img"))?;
    std::fs::write(
        dir.path().join(format!("img/{}.jpg", ITEM_WITH_IMAGE)),
        JPEG_BYTES,
    )?;
    std::fs::write(dir.path().join("img/placeholder.jpg"), JPEG_BYTES)?;
    std::fs::write(dir.path().join("index.html"), "<html></html>")?;
    Ok(dir)
}

impl TestServer {
    /// Spawns a new test server on a random port with an empty collection
    pub async fn spawn() -> Self {
        let temp_db_dir = TempDir::new().expect("Failed to create temp db dir");
        let db_path = temp_db_dir.path().join(DB_FILE_NAME);
        Self::spawn_with_db(temp_db_dir, db_path).await
    }

    /// Stops this server and starts a new one on the same database
    pub async fn restart(mut self) -> Self {
        if let Some(shutdown_tx) = self._shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
        // Let the old server release the database connection.
        tokio::time::sleep(Duration::from_millis(50)).await;
        let temp_db_dir = self._temp_db_dir.take().expect("Database dir already released");
        Self::spawn_with_db(temp_db_dir, self.db_path.clone()).await
    }

    async fn spawn_with_db(temp_db_dir: TempDir, db_path: PathBuf) -> Self {
        let temp_frontend_dir = create_frontend_dir().expect("Failed to create frontend dir");

        let kv_store =
            Arc::new(SqliteKeyValueStore::new(&db_path).expect("Failed to open album store"));
        let dispatcher = Dispatcher::new(CollectionStore::load(kv_store), TEST_PAGE_SIZE);

        let listener = TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let port = listener
            .local_addr()
            .expect("Failed to get local address")
            .port();
        let base_url = format!("http://127.0.0.1:{}", port);

        let (shutdown_tx, shutdown_rx) = tokio::sync::oneshot::channel::<()>();

        let config = ServerConfig {
            port,
            requests_logging_level: RequestsLoggingLevel::None,
            frontend_dir_path: Some(temp_frontend_dir.path().to_string_lossy().to_string()),
            max_upload_bytes: 1024 * 1024,
        };
        let app = make_app(config, dispatcher).expect("Failed to build app");

        tokio::spawn(async move {
            axum::serve(listener, app)
                .with_graceful_shutdown(async {
                    shutdown_rx.await.ok();
                })
                .await
                .expect("Server failed");
        });

        let server = Self {
            base_url,
            db_path,
            _temp_db_dir: Some(temp_db_dir),
            _temp_frontend_dir: temp_frontend_dir,
            _shutdown_tx: Some(shutdown_tx),
        };
        server.wait_for_ready().await;
        server
    }

    /// Polls the asset manifest until the server answers
    async fn wait_for_ready(&self) {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(100))
            .build()
            .expect("Failed to build reqwest client");

        let start = std::time::Instant::now();
        let timeout = Duration::from_millis(SERVER_READY_TIMEOUT_MS);
        let url = format!("{}/v1/album/assets", self.base_url);

        while start.elapsed() < timeout {
            if let Ok(response) = client.get(&url).send().await {
                if response.status().is_success() {
                    return;
                }
            }
            tokio::time::sleep(Duration::from_millis(10)).await;
        }
        panic!("Server did not become ready within {:?}", timeout);
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        if let Some(shutdown_tx) = self._shutdown_tx.take() {
            let _ = shutdown_tx.send(());
        }
    }
}
