use anyhow::Result;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::{json, Value};
use tokio::io::{self, AsyncBufReadExt, AsyncWriteExt, BufReader};
use tokio::sync::mpsc::{self, UnboundedReceiver, UnboundedSender};

use crate::host::Host;
use crate::server::protocol::*;
use crate::snippet::{Snippet, SnippetImporter};
use crate::store::PlatformContext;

/// Builds the platform context once the editor has said who it is.
pub type DetectPlatform = Box<dyn Fn(&str) -> Result<PlatformContext> + Send + Sync>;

/// Run the bridge over stdio: requests on stdin, responses and
/// `window/showMessage` notifications on stdout.
pub async fn run(default_editor_name: String, detect: DetectPlatform) -> Result<()> {
    let stdin = BufReader::new(io::stdin());
    let mut lines = stdin.lines();

    let (outbox, rx) = mpsc::unbounded_channel();
    let writer = tokio::spawn(write_lines(rx));
    let mut bridge = Bridge::new(outbox.clone(), default_editor_name, detect);

    tracing::info!("snipport stdio bridge ready");

    while let Some(line) = lines.next_line().await? {
        let line = line.trim();
        if line.is_empty() {
            continue;
        }

        tracing::debug!("← {}", line);

        let request: JsonRpcRequest = match serde_json::from_str(line) {
            Ok(r) => r,
            Err(e) => {
                send(
                    &outbox,
                    &JsonRpcResponse::error(None, PARSE_ERROR, format!("Parse error: {e}")),
                );
                continue;
            }
        };

        if request.method == "exit" {
            break;
        }

        let response = bridge.handle_request(&request).await;

        // Notifications (no id) don't get a response
        if request.id.is_some() {
            send(&outbox, &response);
        }
    }

    // the writer stops once every sender is gone
    drop(bridge);
    drop(outbox);
    writer.await??;
    Ok(())
}

async fn write_lines(mut rx: UnboundedReceiver<String>) -> Result<()> {
    let mut stdout = io::stdout();
    while let Some(line) = rx.recv().await {
        tracing::debug!("→ {}", line);
        stdout.write_all(line.as_bytes()).await?;
        stdout.write_all(b"\n").await?;
        stdout.flush().await?;
    }
    Ok(())
}

fn send(outbox: &UnboundedSender<String>, message: &impl Serialize) {
    match serde_json::to_string(message) {
        Ok(line) => {
            if outbox.send(line).is_err() {
                tracing::warn!("stdout writer is gone, dropping message");
            }
        }
        Err(e) => tracing::error!("Failed to serialize message: {e}"),
    }
}

/// Host whose notifications travel back to the editor as `window/showMessage`.
pub struct RpcHost {
    outbox: UnboundedSender<String>,
    editor_name: String,
}

impl RpcHost {
    fn show(&self, kind: MessageType, message: &str) {
        send(
            &self.outbox,
            &JsonRpcNotification::new("window/showMessage", ShowMessageParams { kind, message }),
        );
    }
}

impl Host for RpcHost {
    fn notify_info(&self, text: &str) {
        self.show(MessageType::Info, text);
    }

    fn notify_error(&self, text: &str) {
        self.show(MessageType::Error, text);
    }

    fn current_editor_name(&self) -> &str {
        &self.editor_name
    }
}

struct Bridge {
    outbox: UnboundedSender<String>,
    default_editor_name: String,
    detect: DetectPlatform,
    importer: Option<SnippetImporter<RpcHost>>,
}

impl Bridge {
    fn new(
        outbox: UnboundedSender<String>,
        default_editor_name: String,
        detect: DetectPlatform,
    ) -> Self {
        Self {
            outbox,
            default_editor_name,
            detect,
            importer: None,
        }
    }

    async fn handle_request(&mut self, req: &JsonRpcRequest) -> JsonRpcResponse {
        match req.method.as_str() {
            // ── Lifecycle ──────────────────────────────────────────────
            "initialize" => {
                let params: InitializeParams = match &req.params {
                    Some(_) => match params(req) {
                        Ok(p) => p,
                        Err(resp) => return resp,
                    },
                    None => InitializeParams::default(),
                };
                let host = RpcHost {
                    outbox: self.outbox.clone(),
                    editor_name: params
                        .client_info
                        .map(|c| c.name)
                        .unwrap_or_else(|| self.default_editor_name.clone()),
                };
                let platform = match (self.detect)(host.current_editor_name()) {
                    Ok(p) => p,
                    Err(e) => {
                        return JsonRpcResponse::error(
                            req.id.clone(),
                            INTERNAL_ERROR,
                            format!("{e:#}"),
                        )
                    }
                };
                tracing::info!(
                    "Initialized for '{}', snippets under {}",
                    host.current_editor_name(),
                    platform.user_dir()
                );
                self.importer = Some(SnippetImporter::new(host, platform));

                JsonRpcResponse::success(
                    req.id.clone(),
                    json!({
                        "serverInfo": {
                            "name": "snipport",
                            "version": env!("CARGO_PKG_VERSION"),
                        }
                    }),
                )
            }

            // notifications — no response needed
            "notifications/initialized" | "initialized" => {
                JsonRpcResponse::success(req.id.clone(), json!({}))
            }

            "shutdown" => JsonRpcResponse::success(req.id.clone(), Value::Null),

            // ── Snippets ───────────────────────────────────────────────
            "snippets/add" => {
                let Some(importer) = &self.importer else {
                    return not_initialized(req);
                };
                let snippet: Snippet = match params(req) {
                    Ok(s) => s,
                    Err(resp) => return resp,
                };
                match importer.add_snippet(snippet).await {
                    Ok(added) => JsonRpcResponse::success(
                        req.id.clone(),
                        json!({
                            "name": added.snippet.name,
                            "path": added.path.display().to_string(),
                            "renamed": added.renamed_from.is_some(),
                        }),
                    ),
                    Err(e) => {
                        JsonRpcResponse::error(req.id.clone(), SNIPPET_NOT_ADDED, e.to_string())
                    }
                }
            }

            "snippets/path" => {
                let Some(importer) = &self.importer else {
                    return not_initialized(req);
                };
                let p: PathParams = match params(req) {
                    Ok(p) => p,
                    Err(resp) => return resp,
                };
                JsonRpcResponse::success(
                    req.id.clone(),
                    json!({ "path": importer.snippet_file(&p.language).display().to_string() }),
                )
            }

            _ => JsonRpcResponse::error(
                req.id.clone(),
                METHOD_NOT_FOUND,
                format!("Method not found: {}", req.method),
            ),
        }
    }
}

fn params<T: DeserializeOwned>(req: &JsonRpcRequest) -> Result<T, JsonRpcResponse> {
    let Some(params) = req.params.clone() else {
        return Err(JsonRpcResponse::error(
            req.id.clone(),
            INVALID_PARAMS,
            "Missing params",
        ));
    };
    serde_json::from_value(params).map_err(|e| {
        JsonRpcResponse::error(req.id.clone(), INVALID_PARAMS, format!("Invalid params: {e}"))
    })
}

fn not_initialized(req: &JsonRpcRequest) -> JsonRpcResponse {
    JsonRpcResponse::error(req.id.clone(), SERVER_NOT_INITIALIZED, "Server not initialized")
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::paths::{EditorVariant, OsFamily};
    use std::path::PathBuf;

    fn bridge(home: PathBuf) -> (Bridge, UnboundedReceiver<String>) {
        let (tx, rx) = mpsc::unbounded_channel();
        let detect: DetectPlatform = Box::new(move |name: &str| {
            Ok(PlatformContext {
                os: OsFamily::Linux,
                home_dir: home.to_string_lossy().to_string(),
                appdata_dir: String::new(),
                editor: EditorVariant::from_editor_name(name),
            })
        });
        (Bridge::new(tx, "Visual Studio Code".into(), detect), rx)
    }

    fn request(id: u64, method: &str, params: Value) -> JsonRpcRequest {
        serde_json::from_value(json!({
            "jsonrpc": "2.0",
            "id": id,
            "method": method,
            "params": params,
        }))
        .unwrap()
    }

    fn shown(rx: &mut UnboundedReceiver<String>) -> Vec<Value> {
        let mut out = Vec::new();
        while let Ok(line) = rx.try_recv() {
            let note: Value = serde_json::from_str(&line).unwrap();
            assert_eq!(note["method"], "window/showMessage");
            out.push(note["params"].clone());
        }
        out
    }

    fn loop_snippet() -> Value {
        json!({
            "language": "python",
            "name": "loop",
            "prefix": "",
            "body": ["for i in range(10):", "\tpass"],
            "description": ""
        })
    }

    #[tokio::test]
    async fn test_requires_initialize() {
        let dir = tempfile::tempdir().unwrap();
        let (mut bridge, _rx) = bridge(dir.path().to_path_buf());

        let resp = bridge.handle_request(&request(1, "snippets/add", loop_snippet())).await;
        assert_eq!(resp.error.unwrap().code, SERVER_NOT_INITIALIZED);
    }

    #[tokio::test]
    async fn test_initialize_uses_client_name() {
        let dir = tempfile::tempdir().unwrap();
        let (mut bridge, _rx) = bridge(dir.path().to_path_buf());

        let resp = bridge
            .handle_request(&request(
                1,
                "initialize",
                json!({ "clientInfo": { "name": "Visual Studio Code - Insiders" } }),
            ))
            .await;
        assert_eq!(resp.result.unwrap()["serverInfo"]["name"], "snipport");

        let resp = bridge
            .handle_request(&request(2, "snippets/path", json!({ "language": "rust" })))
            .await;
        let expected = dir.path().join(".config/Code - Insiders/User/snippets/rust.json");
        assert_eq!(
            resp.result.unwrap()["path"],
            json!(expected.display().to_string())
        );
    }

    #[tokio::test]
    async fn test_add_reports_through_show_message() {
        let dir = tempfile::tempdir().unwrap();
        let (mut bridge, mut rx) = bridge(dir.path().to_path_buf());
        bridge.handle_request(&request(1, "initialize", json!({}))).await;

        let resp = bridge.handle_request(&request(2, "snippets/add", loop_snippet())).await;
        let result = resp.result.unwrap();
        assert_eq!(result["name"], "loop");
        assert_eq!(result["renamed"], false);
        assert_eq!(
            shown(&mut rx),
            vec![json!({ "type": 3, "message": "Snippet loop added to python snippets" })]
        );

        let resp = bridge.handle_request(&request(3, "snippets/add", loop_snippet())).await;
        let result = resp.result.unwrap();
        assert_eq!(result["renamed"], true);
        let notes = shown(&mut rx);
        assert_eq!(notes.len(), 2);
        assert_eq!(notes[0]["type"], 1);
        assert_eq!(
            notes[0]["message"],
            "A snippet loop already exists - so adding a unique id"
        );
        assert_eq!(notes[1]["type"], 3);
    }

    #[tokio::test]
    async fn test_add_failure_is_an_error_response() {
        let dir = tempfile::tempdir().unwrap();
        let (mut bridge, mut rx) = bridge(dir.path().to_path_buf());
        bridge.handle_request(&request(1, "initialize", json!({}))).await;

        let file = dir.path().join(".config/Code/User/snippets/python.json");
        std::fs::create_dir_all(file.parent().unwrap()).unwrap();
        std::fs::write(&file, r#"{"a":}"#).unwrap();

        let resp = bridge.handle_request(&request(2, "snippets/add", loop_snippet())).await;
        let error = resp.error.unwrap();
        assert_eq!(error.code, SNIPPET_NOT_ADDED);
        assert!(error.message.contains("ValueExpected error at the offset 5"));
        assert_eq!(shown(&mut rx)[0]["type"], 1);
        assert_eq!(std::fs::read_to_string(&file).unwrap(), r#"{"a":}"#);
    }

    #[tokio::test]
    async fn test_bad_params_and_unknown_methods() {
        let dir = tempfile::tempdir().unwrap();
        let (mut bridge, _rx) = bridge(dir.path().to_path_buf());
        bridge.handle_request(&request(1, "initialize", json!({}))).await;

        let resp = bridge
            .handle_request(&request(2, "snippets/add", json!({ "name": "x" })))
            .await;
        assert_eq!(resp.error.unwrap().code, INVALID_PARAMS);

        let resp = bridge.handle_request(&request(3, "snippets/remove", json!({}))).await;
        assert_eq!(resp.error.unwrap().code, METHOD_NOT_FOUND);
    }
}
