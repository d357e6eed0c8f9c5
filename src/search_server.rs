use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::path::PathBuf;
use std::sync::Arc;
use tokio::io::{AsyncBufRead, AsyncBufReadExt, AsyncWrite, AsyncWriteExt, BufReader};
use tokio::sync::OnceCell;
use tokio::task::JoinHandle;
use tracing::{debug, error, info, warn};

use crate::errors::{create_error_response, format_user_error, UserError};
use crate::security::{AuthError, TokenAuthenticator};
use crate::vector_search::{initialize_with, IndexSettings, SemanticIndex};

const PARSE_ERROR: i32 = -32700;
const METHOD_NOT_FOUND: i32 = -32601;
const INVALID_PARAMS: i32 = -32602;
const BAD_REQUEST: i32 = 400;
const UNAUTHORIZED: i32 = 401;
const INTERNAL_ERROR: i32 = 500;
const NOT_READY: i32 = 503;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcRequest {
    #[serde(default)]
    pub jsonrpc: Option<String>,
    pub method: String,
    #[serde(default)]
    pub params: Value,
    #[serde(default)]
    pub id: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcResponse {
    pub jsonrpc: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<JsonRpcError>,
    pub id: Option<Value>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JsonRpcError {
    pub code: i32,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

#[derive(Debug, Default, Deserialize)]
struct SearchParams {
    token: Option<String>,
    query: Option<String>,
}

/// One search hit as sent to clients. `content` carries the snippet.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SearchHit {
    pub title: String,
    pub content: String,
    pub distance: f32,
}

/// Line-delimited JSON-RPC front end over a [`SemanticIndex`].
///
/// The index is published once through a `OnceCell`; until then every
/// `search` is rejected with 503 rather than seeing a half-built index.
#[derive(Debug, Clone)]
pub struct SearchServer {
    index: Arc<OnceCell<SemanticIndex>>,
    auth: TokenAuthenticator,
}

impl SearchServer {
    /// A server whose index is still to be loaded.
    pub fn new(auth: TokenAuthenticator) -> Self {
        Self {
            index: Arc::new(OnceCell::new()),
            auth,
        }
    }

    /// A server that is ready immediately.
    pub fn with_index(index: SemanticIndex, auth: TokenAuthenticator) -> Self {
        Self {
            index: Arc::new(OnceCell::new_with(Some(index))),
            auth,
        }
    }

    pub fn is_ready(&self) -> bool {
        self.index.initialized()
    }

    /// Build the index on a blocking thread and publish it when done.
    pub fn start_loading(
        &self,
        embeddings_path: PathBuf,
        corpus_path: PathBuf,
        settings: IndexSettings,
    ) -> JoinHandle<Result<()>> {
        let cell = Arc::clone(&self.index);

        tokio::spawn(async move {
            info!("Loading the model");
            let index = tokio::task::spawn_blocking(move || {
                initialize_with(&embeddings_path, &corpus_path, &settings)
            })
            .await
            .context("index loader panicked")?
            .context("Failed to build search index")?;

            if cell.set(index).is_err() {
                warn!("Search index was already published; discarding reload");
            }
            Ok(())
        })
    }

    /// Serve stdin/stdout until stdin closes.
    pub async fn run(&self) -> Result<()> {
        info!("Search server listening on stdio");
        self.serve(BufReader::new(tokio::io::stdin()), tokio::io::stdout())
            .await
    }

    /// Answer one JSON-RPC request per input line, one response per output line.
    pub async fn serve<R, W>(&self, reader: R, mut writer: W) -> Result<()>
    where
        R: AsyncBufRead + Unpin,
        W: AsyncWrite + Unpin,
    {
        let mut lines = reader.lines();

        while let Some(line) = lines.next_line().await.context("Failed to read request")? {
            if line.trim().is_empty() {
                continue;
            }

            let response = self.handle_line(&line);
            let mut payload = serde_json::to_vec(&response).context("Failed to encode response")?;
            payload.push(b'\n');

            writer.write_all(&payload).await.context("Failed to write response")?;
            writer.flush().await.context("Failed to flush response")?;
        }

        debug!("Input closed, stopping search server");
        Ok(())
    }

    pub fn handle_line(&self, line: &str) -> JsonRpcResponse {
        match serde_json::from_str::<JsonRpcRequest>(line) {
            Ok(request) => self.handle_request(request),
            Err(e) => {
                warn!("Unparsable request: {}", e);
                error_response(PARSE_ERROR, &format!("Parse error: {}", e), None, None)
            }
        }
    }

    pub fn handle_request(&self, request: JsonRpcRequest) -> JsonRpcResponse {
        debug!("Handling request: {}", request.method);

        match request.method.as_str() {
            "search" => self.handle_search(request.params, request.id),
            "status" => success_response(self.status(), request.id),
            other => error_response(
                METHOD_NOT_FOUND,
                &format!("Method not found: {}", other),
                None,
                request.id,
            ),
        }
    }

    fn handle_search(&self, params: Value, id: Option<Value>) -> JsonRpcResponse {
        let params: SearchParams = if params.is_null() {
            SearchParams::default()
        } else {
            match serde_json::from_value(params) {
                Ok(params) => params,
                Err(e) => {
                    return error_response(INVALID_PARAMS, &format!("Invalid params: {}", e), None, id)
                }
            }
        };

        if let Err(auth_error) = self.auth.verify(params.token.as_deref()) {
            if auth_error == AuthError::InvalidToken {
                warn!("Rejected search with an invalid token");
            }
            return error_response(UNAUTHORIZED, &auth_error.to_string(), None, id);
        }

        let query = match params.query.as_deref() {
            Some(query) if !query.trim().is_empty() => query,
            _ => return error_response(BAD_REQUEST, "Missing search query", None, id),
        };

        let Some(index) = self.index.get() else {
            let error = anyhow::Error::new(UserError::IndexNotReady);
            return error_response(
                NOT_READY,
                "index not ready",
                Some(create_error_response(&error)),
                id,
            );
        };

        match index.engine.search(query) {
            Ok(results) => {
                let hits: Vec<SearchHit> = results
                    .into_iter()
                    .map(|result| SearchHit {
                        title: result.title,
                        content: result.snippet,
                        distance: result.distance,
                    })
                    .collect();
                info!("Query {:?} returned {} results", query, hits.len());
                success_response(json!(hits), id)
            }
            Err(e) => {
                let error = anyhow::Error::new(e);
                error!("Search failed: {}", format_user_error(&error));
                error_response(
                    INTERNAL_ERROR,
                    &error.to_string(),
                    Some(create_error_response(&error)),
                    id,
                )
            }
        }
    }

    fn status(&self) -> Value {
        match self.index.get() {
            Some(index) => json!({
                "ready": true,
                "words": index.store.len(),
                "documents": index.corpus.len(),
            }),
            None => json!({
                "ready": false,
                "words": 0,
                "documents": 0,
            }),
        }
    }
}

fn success_response(result: Value, id: Option<Value>) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        result: Some(result),
        error: None,
        id,
    }
}

fn error_response(code: i32, message: &str, data: Option<Value>, id: Option<Value>) -> JsonRpcResponse {
    JsonRpcResponse {
        jsonrpc: "2.0".to_string(),
        result: None,
        error: Some(JsonRpcError {
            code,
            message: message.to_string(),
            data,
        }),
        id,
    }
}
