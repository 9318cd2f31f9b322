//! HTTP client for the codebase-analysis backend.
//!
//! Three endpoints: `GET /status` (startup replay), `POST /load` (index a
//! repository), `POST /ask` (question answering). Non-2xx responses carry a
//! `{"detail": ...}` body whose text is surfaced to the user verbatim.

use anyhow::{anyhow, Result};
use reqwest::Client;
use serde::{Deserialize, Serialize};

use crate::session::RepoStats;

#[derive(Serialize)]
struct LoadRequest {
    path: String,
}

#[derive(Serialize)]
struct AskRequest {
    question: String,
    top_k: u32,
}

#[derive(Debug, Deserialize)]
pub struct StatusResponse {
    pub repository_loaded: bool,
    #[serde(default)]
    pub repository_path: Option<String>,
    #[serde(default)]
    pub stats: Option<RepoStats>,
}

/// Load statistics envelope; only the vector-store block is displayed.
#[derive(Debug, Default, Deserialize)]
pub struct LoadStats {
    #[serde(default)]
    pub vectors: RepoStats,
}

#[derive(Debug, Deserialize)]
pub struct LoadResponse {
    pub message: String,
    #[serde(default)]
    pub stats: LoadStats,
}

#[derive(Debug, Deserialize)]
pub struct AskResponse {
    pub answer: String,
    #[serde(default)]
    pub source_files: Vec<String>,
}

#[derive(Deserialize)]
struct ErrorBody {
    detail: String,
}

#[derive(Clone)]
pub struct BackendClient {
    client: Client,
    base_url: String,
}

impl BackendClient {
    pub fn new(base_url: &str) -> Self {
        Self {
            client: Client::new(),
            base_url: base_url.trim_end_matches('/').to_string(),
        }
    }

    /// Startup probe. Callers treat a transport error as "nothing loaded".
    pub async fn status(&self) -> Result<StatusResponse> {
        let url = format!("{}/status", self.base_url);
        let response = self.client.get(&url).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!(error_detail(response).await));
        }
        Ok(response.json().await?)
    }

    pub async fn load(&self, path: &str) -> Result<LoadResponse> {
        let url = format!("{}/load", self.base_url);
        let request = LoadRequest {
            path: path.to_string(),
        };
        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!(error_detail(response).await));
        }
        Ok(response.json().await?)
    }

    pub async fn ask(&self, question: &str, top_k: u32) -> Result<AskResponse> {
        let url = format!("{}/ask", self.base_url);
        let request = AskRequest {
            question: question.to_string(),
            top_k,
        };
        let response = self.client.post(&url).json(&request).send().await?;
        if !response.status().is_success() {
            return Err(anyhow!(error_detail(response).await));
        }
        Ok(response.json().await?)
    }
}

/// Pull the service-reported `detail` out of a failed response, falling back
/// to the HTTP status line when the body is not the expected shape.
async fn error_detail(response: reqwest::Response) -> String {
    let status = response.status();
    match response.json::<ErrorBody>().await {
        Ok(body) => body.detail,
        Err(_) => format!("Request failed with status: {status}"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_response_shape() {
        let json = r#"{
            "repository_loaded": true,
            "repository_path": "/work/repo",
            "stats": {"total_vectors": 120, "total_chunks": 120, "unique_files": 14, "dimension": 384}
        }"#;
        let status: StatusResponse = serde_json::from_str(json).unwrap();
        assert!(status.repository_loaded);
        assert_eq!(status.repository_path.as_deref(), Some("/work/repo"));
        let stats = status.stats.unwrap();
        assert_eq!(stats.unique_files, 14);
        assert_eq!(stats.total_vectors, 120);
    }

    #[test]
    fn test_status_response_nothing_loaded() {
        let json = r#"{"repository_loaded": false, "repository_path": null, "stats": null}"#;
        let status: StatusResponse = serde_json::from_str(json).unwrap();
        assert!(!status.repository_loaded);
        assert!(status.stats.is_none());
    }

    #[test]
    fn test_load_response_takes_vector_stats() {
        let json = r#"{
            "success": true,
            "message": "Successfully loaded 14 files with 120 chunks",
            "stats": {
                "files": {"total_files": 14},
                "chunks": {"total_chunks": 120},
                "vectors": {"total_vectors": 120, "total_chunks": 120, "unique_files": 14}
            }
        }"#;
        let load: LoadResponse = serde_json::from_str(json).unwrap();
        assert_eq!(load.message, "Successfully loaded 14 files with 120 chunks");
        assert_eq!(load.stats.vectors.unique_files, 14);
    }

    #[test]
    fn test_ask_response_source_files_optional() {
        let with: AskResponse =
            serde_json::from_str(r#"{"answer": "a", "source_files": ["a.py", "b.py"]}"#).unwrap();
        assert_eq!(with.source_files, vec!["a.py", "b.py"]);

        let without: AskResponse = serde_json::from_str(r#"{"answer": "a"}"#).unwrap();
        assert!(without.source_files.is_empty());
    }

    #[test]
    fn test_error_body_detail() {
        let body: ErrorBody = serde_json::from_str(r#"{"detail": "path not found"}"#).unwrap();
        assert_eq!(body.detail, "path not found");
    }
}
