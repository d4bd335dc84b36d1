use std::net::SocketAddr;
use std::sync::Arc;

use common::{StorageBackend, StorageConfig, build_blob_store};
use reqwest::Client;
use serde_json::Value;
use tempfile::TempDir;

use dedup_server::config::{AppConfig, CorsConfig, ServerConfig};
use dedup_server::repository::MemoryRepository;
use dedup_server::state::AppState;

/// Upload limit used by every test server.
pub const MAX_UPLOAD_SIZE: u64 = 64 * 1024;

pub mod routes {
    pub const FILES: &str = "/api/v1/files";
    pub const STORAGE_SAVINGS: &str = "/api/v1/files/storage-savings";

    pub fn file(id: &str) -> String {
        format!("/api/v1/files/{id}")
    }

    pub fn file_download(id: &str) -> String {
        format!("/api/v1/files/{id}/download")
    }
}

/// A running test server backed by in-memory records and a temporary
/// filesystem blob store.
pub struct TestApp {
    pub addr: SocketAddr,
    pub client: Client,
    pub blob_dir: TempDir,
}

/// Parsed HTTP response for test assertions.
pub struct TestResponse {
    pub status: u16,
    pub headers: reqwest::header::HeaderMap,
    /// Raw response body.
    pub bytes: Vec<u8>,
    /// Parsed JSON body, or `Null` if the response is not valid JSON.
    pub body: Value,
}

impl TestApp {
    pub async fn spawn() -> Self {
        let blob_dir = TempDir::new().expect("Failed to create blob directory");

        let app_config = AppConfig {
            server: ServerConfig {
                host: "127.0.0.1".to_string(),
                port: 0,
                cors: CorsConfig {
                    allow_origins: vec![],
                    max_age: 3600,
                },
            },
            database: None,
            storage: StorageConfig {
                backend: StorageBackend::Filesystem,
                blob_dir: blob_dir.path().to_path_buf(),
                max_upload_size: MAX_UPLOAD_SIZE,
                read_chunk_size: 4096,
            },
        };

        let blob_store = build_blob_store(&app_config.storage)
            .await
            .expect("Failed to create blob store");
        let state = AppState::new(Arc::new(MemoryRepository::new()), blob_store, app_config);
        let app = dedup_server::build_router(state);

        let listener = tokio::net::TcpListener::bind("127.0.0.1:0")
            .await
            .expect("Failed to bind to random port");
        let addr = listener.local_addr().unwrap();

        tokio::spawn(async move {
            axum::serve(listener, app).await.unwrap();
        });

        Self {
            addr,
            client: Client::new(),
            blob_dir,
        }
    }

    fn url(&self, path: &str) -> String {
        format!("http://{}{}", self.addr, path)
    }

    pub async fn get(&self, path: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .send()
            .await
            .expect("Failed to send GET request");
        TestResponse::from_response(res).await
    }

    pub async fn get_with_header(&self, path: &str, name: &str, value: &str) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .header(name, value)
            .send()
            .await
            .expect("Failed to send GET request");
        TestResponse::from_response(res).await
    }

    pub async fn get_with_query(&self, path: &str, query: &[(&str, &str)]) -> TestResponse {
        let res = self
            .client
            .get(self.url(path))
            .query(query)
            .send()
            .await
            .expect("Failed to send GET request");
        TestResponse::from_response(res).await
    }

    /// Upload `file_bytes` as the `file` field. Without a MIME type the
    /// part carries no `Content-Type`.
    pub async fn upload(
        &self,
        file_name: &str,
        file_bytes: Vec<u8>,
        mime: Option<&str>,
    ) -> TestResponse {
        let mut part = reqwest::multipart::Part::bytes(file_bytes).file_name(file_name.to_string());
        if let Some(mime) = mime {
            part = part.mime_str(mime).expect("Failed to set MIME type");
        }
        let form = reqwest::multipart::Form::new().part("file", part);
        self.post_form(form).await
    }

    pub async fn post_form(&self, form: reqwest::multipart::Form) -> TestResponse {
        let res = self
            .client
            .post(self.url(routes::FILES))
            .multipart(form)
            .send()
            .await
            .expect("Failed to send multipart upload request");
        TestResponse::from_response(res).await
    }

    /// Number of committed blobs on disk, excluding the staging area.
    pub fn stored_blob_count(&self) -> usize {
        std::fs::read_dir(self.blob_dir.path())
            .unwrap()
            .map(|e| e.unwrap())
            .filter(|e| e.file_name() != ".tmp" && e.path().is_dir())
            .map(|shard| std::fs::read_dir(shard.path()).unwrap().count())
            .sum()
    }

    /// Number of leftover files in the staging area.
    pub fn staging_file_count(&self) -> usize {
        std::fs::read_dir(self.blob_dir.path().join(".tmp"))
            .unwrap()
            .count()
    }
}

impl TestResponse {
    pub async fn from_response(res: reqwest::Response) -> Self {
        let status = res.status().as_u16();
        let headers = res.headers().clone();
        let bytes = res.bytes().await.map(|b| b.to_vec()).unwrap_or_default();
        let body = serde_json::from_slice(&bytes).unwrap_or(Value::Null);
        Self {
            status,
            headers,
            bytes,
            body,
        }
    }

    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }

    pub fn id(&self) -> String {
        self.body["id"]
            .as_str()
            .expect("response body should contain 'id'")
            .to_string()
    }
}
