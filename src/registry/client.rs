//! Minimal MLflow REST client: model versions, aliases and artifact download.

use async_trait::async_trait;
use base64::{engine::general_purpose::STANDARD, Engine as _};
use reqwest::{Client, Response};
use serde::de::DeserializeOwned;
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;
use tracing::debug;
use url::{Origin, Url};

use super::uri::{ArtifactLocation, ModelUri};
use super::ModelSource;
use crate::config::RegistryConfig;
use crate::error::LoadError;
use crate::ml::ARTIFACT_FILE;

/// Maximum chunk the DBFS read API hands out per call.
pub const DBFS_MAX_CHUNK: u64 = 1 << 20;

#[derive(Debug, Deserialize)]
struct DownloadUriResponse {
    artifact_uri: String,
}

#[derive(Debug, Deserialize)]
struct AliasResponse {
    model_version: ModelVersion,
}

#[derive(Debug, Deserialize)]
struct ModelVersion {
    version: String,
}

#[derive(Debug, Deserialize)]
struct DbfsReadResponse {
    bytes_read: u64,
    #[serde(default)]
    data: String,
}

/// Registry client configuration resolved from [`RegistryConfig`].
#[derive(Debug, Clone)]
pub struct RegistryClient {
    http: Client,
    host: Option<String>,
    // Scheme, host and port of `host`; the token never leaves this origin.
    origin: Option<Origin>,
    token: Option<String>,
    dbfs_chunk: u64,
}

impl RegistryClient {
    pub fn new(config: &RegistryConfig) -> Result<Self, LoadError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs.max(1)))
            .build()?;

        let host = config
            .host
            .as_deref()
            .map(|h| h.trim().trim_end_matches('/').to_string())
            .filter(|h| !h.is_empty());
        let origin = host
            .as_deref()
            .and_then(|h| Url::parse(h).ok())
            .map(|u| u.origin());

        Ok(Self {
            http,
            host,
            origin,
            token: config.token.clone().filter(|t| !t.trim().is_empty()),
            dbfs_chunk: DBFS_MAX_CHUNK,
        })
    }

    /// Smaller DBFS reads; the server caps each call at [`DBFS_MAX_CHUNK`].
    pub fn with_dbfs_chunk(mut self, bytes: u64) -> Self {
        self.dbfs_chunk = bytes.clamp(1, DBFS_MAX_CHUNK);
        self
    }

    fn endpoint(&self, path: &str) -> Result<Url, LoadError> {
        let host = self.host.as_deref().ok_or(LoadError::MissingRegistryHost)?;
        Url::parse(&format!("{host}/{}", path.trim_start_matches('/')))
            .map_err(|e| LoadError::InvalidUri(format!("{host}: {e}")))
    }

    /// Only requests to the registry's own origin carry the bearer token;
    /// presigned storage URLs bring their own credentials.
    fn sends_token_to(&self, url: &Url) -> bool {
        self.origin.as_ref().is_some_and(|o| *o == url.origin())
    }

    async fn get(&self, url: Url, query: &[(&str, &str)]) -> Result<Response, LoadError> {
        let authorized = self.sends_token_to(&url);
        debug!(%url, authorized, "registry GET");
        let mut request = self.http.get(url.clone()).query(query);
        if let Some(token) = self.token.as_ref().filter(|_| authorized) {
            request = request.bearer_auth(token);
        }
        let response = request.send().await?;

        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        if status == reqwest::StatusCode::NOT_FOUND {
            return Err(LoadError::NotFound(url.to_string()));
        }
        let body = response.text().await.unwrap_or_default();
        Err(LoadError::Registry {
            status: status.as_u16(),
            body: truncate(&body, 512),
        })
    }

    async fn get_json<T: DeserializeOwned>(
        &self,
        url: Url,
        query: &[(&str, &str)],
    ) -> Result<T, LoadError> {
        let bytes = self.get(url, query).await?.bytes().await?;
        Ok(serde_json::from_slice(&bytes)?)
    }

    /// Version number currently pointed at by `alias`.
    pub async fn resolve_alias(&self, name: &str, alias: &str) -> Result<String, LoadError> {
        let url = self.endpoint("api/2.0/mlflow/registered-models/alias")?;
        let resp: AliasResponse = self
            .get_json(url, &[("name", name), ("alias", alias)])
            .await?;
        Ok(resp.model_version.version)
    }

    /// Artifact root of a registered model version.
    pub async fn download_uri(&self, name: &str, version: &str) -> Result<String, LoadError> {
        let url = self.endpoint("api/2.0/mlflow/model-versions/get-download-uri")?;
        let resp: DownloadUriResponse = self
            .get_json(url, &[("name", name), ("version", version)])
            .await?;
        Ok(resp.artifact_uri)
    }

    /// Raw artifact file below an artifact root.
    pub async fn fetch_artifact(&self, location: &ArtifactLocation) -> Result<Vec<u8>, LoadError> {
        match location {
            ArtifactLocation::Http(url) => {
                let target = if url.path().ends_with(".json") {
                    url.clone()
                } else {
                    let joined = format!("{}/{ARTIFACT_FILE}", url.as_str().trim_end_matches('/'));
                    Url::parse(&joined).map_err(|e| LoadError::InvalidUri(e.to_string()))?
                };
                Ok(self.get(target, &[]).await?.bytes().await?.to_vec())
            }
            ArtifactLocation::MlflowArtifacts(path) => {
                let encoded = path
                    .split('/')
                    .filter(|s| !s.is_empty())
                    .map(|s| urlencoding::encode(s).into_owned())
                    .collect::<Vec<_>>()
                    .join("/");
                let url = self.endpoint(&format!(
                    "api/2.0/mlflow-artifacts/artifacts/{encoded}/{ARTIFACT_FILE}"
                ))?;
                Ok(self.get(url, &[]).await?.bytes().await?.to_vec())
            }
            ArtifactLocation::Dbfs(path) => {
                let file = format!("{}/{ARTIFACT_FILE}", path.trim_end_matches('/'));
                self.read_dbfs(&file).await
            }
            ArtifactLocation::Local(path) => read_local(path).await,
        }
    }

    async fn read_dbfs(&self, path: &str) -> Result<Vec<u8>, LoadError> {
        let url = self.endpoint("api/2.0/dbfs/read")?;
        let length = self.dbfs_chunk.to_string();
        let mut offset: u64 = 0;
        let mut out = Vec::new();

        loop {
            let offset_str = offset.to_string();
            let chunk: DbfsReadResponse = self
                .get_json(
                    url.clone(),
                    &[
                        ("path", path),
                        ("offset", offset_str.as_str()),
                        ("length", length.as_str()),
                    ],
                )
                .await?;
            let bytes = STANDARD.decode(chunk.data.as_bytes())?;
            if bytes.len() as u64 != chunk.bytes_read {
                return Err(LoadError::Decode(format!(
                    "dbfs chunk at offset {offset}: bytes_read {} but {} decoded",
                    chunk.bytes_read,
                    bytes.len()
                )));
            }
            out.extend_from_slice(&bytes);
            offset += chunk.bytes_read;

            if chunk.bytes_read < self.dbfs_chunk {
                break;
            }
        }

        debug!(path, bytes = out.len(), "dbfs read complete");
        Ok(out)
    }
}

#[async_trait]
impl ModelSource for RegistryClient {
    async fn fetch(&self, uri: &ModelUri) -> Result<Vec<u8>, LoadError> {
        let (name, version) = match uri {
            ModelUri::Local(path) => return read_local(path).await,
            ModelUri::Registered { name, version } => (name.as_str(), version.clone()),
            ModelUri::Alias { name, alias } => {
                let version = self.resolve_alias(name, alias).await?;
                debug!(name = %name, alias = %alias, version = %version, "alias resolved");
                (name.as_str(), version)
            }
        };

        let artifact_uri = self.download_uri(name, &version).await?;
        debug!(name, version = %version, artifact_uri = %artifact_uri, "artifact root resolved");
        let location = ArtifactLocation::parse(&artifact_uri)?;
        self.fetch_artifact(&location).await
    }
}

/// A local artifact is either the JSON file itself or a directory holding it.
async fn read_local(path: &Path) -> Result<Vec<u8>, LoadError> {
    let file = match tokio::fs::metadata(path).await {
        Ok(meta) if meta.is_dir() => path.join(ARTIFACT_FILE),
        Ok(_) => path.to_path_buf(),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            return Err(LoadError::NotFound(path.display().to_string()))
        }
        Err(e) => return Err(e.into()),
    };

    tokio::fs::read(&file).await.map_err(|e| {
        if e.kind() == std::io::ErrorKind::NotFound {
            LoadError::NotFound(file.display().to_string())
        } else {
            e.into()
        }
    })
}

fn truncate(s: &str, max_chars: usize) -> String {
    if s.chars().count() <= max_chars {
        s.to_string()
    } else {
        let mut out: String = s.chars().take(max_chars).collect();
        out.push('…');
        out
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn client(host: Option<&str>) -> RegistryClient {
        RegistryClient::new(&RegistryConfig {
            host: host.map(str::to_string),
            token: Some("dapi-test".to_string()),
            timeout_secs: 5,
        })
        .unwrap()
    }

    #[test]
    fn test_endpoint_joins_host() {
        let c = client(Some("https://adb-1.azuredatabricks.net/"));
        let url = c.endpoint("api/2.0/mlflow/model-versions/get-download-uri").unwrap();
        assert_eq!(
            url.as_str(),
            "https://adb-1.azuredatabricks.net/api/2.0/mlflow/model-versions/get-download-uri"
        );
    }

    #[test]
    fn test_token_scoped_to_registry_origin() {
        let c = client(Some("https://adb-1.azuredatabricks.net"));
        let url = |s: &str| Url::parse(s).unwrap();

        assert!(c.sends_token_to(&url("https://adb-1.azuredatabricks.net/api/2.0/dbfs/read")));
        assert!(c.sends_token_to(&url("https://adb-1.azuredatabricks.net:443/files/model.json")));
        assert!(!c.sends_token_to(&url("http://adb-1.azuredatabricks.net/files/model.json")));
        assert!(!c.sends_token_to(&url("https://adb-1.azuredatabricks.net:8443/model.json")));
        assert!(!c.sends_token_to(&url(
            "https://storage.blob.core.windows.net/models/model.json?sig=abc"
        )));
        assert!(!client(None).sends_token_to(&url("https://adb-1.azuredatabricks.net/")));
    }

    #[test]
    fn test_endpoint_without_host() {
        let err = client(None).endpoint("api/2.0/dbfs/read").unwrap_err();
        assert!(matches!(err, LoadError::MissingRegistryHost));
    }

    #[tokio::test]
    async fn test_registered_uri_without_host_fails_before_network() {
        let uri: ModelUri = "models:/ÁrbolDecisión/1".parse().unwrap();
        let err = client(None).fetch(&uri).await.unwrap_err();
        assert!(matches!(err, LoadError::MissingRegistryHost));
    }

    #[tokio::test]
    async fn test_read_local_missing() {
        let path = std::env::temp_dir().join(format!("consumo-missing-{}", uuid::Uuid::new_v4()));
        let err = read_local(&path).await.unwrap_err();
        assert!(matches!(err, LoadError::NotFound(_)));
    }

    #[tokio::test]
    async fn test_read_local_directory_uses_artifact_file() {
        let dir = std::env::temp_dir().join(format!("consumo-model-{}", uuid::Uuid::new_v4()));
        std::fs::create_dir_all(&dir).unwrap();
        std::fs::write(dir.join(ARTIFACT_FILE), b"{}").unwrap();

        assert_eq!(read_local(&dir).await.unwrap(), b"{}".to_vec());
        assert_eq!(read_local(&dir.join(ARTIFACT_FILE)).await.unwrap(), b"{}".to_vec());

        std::fs::remove_dir_all(&dir).unwrap();
    }

    #[test]
    fn test_truncate() {
        assert_eq!(truncate("abc", 5), "abc");
        assert_eq!(truncate("abcdef", 3), "abc…");
    }
}
