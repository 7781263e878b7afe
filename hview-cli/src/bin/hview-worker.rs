//! JSON-RPC IPC worker for a presentation process.
//!
//! Reads line-delimited JSON requests from stdin, dispatches them to a
//! `hview_core` model, writes JSON responses to stdout.  Logs go to stderr.

use std::io::{self, BufRead, Write};

use clap::Parser;
use hview_core::search::SearchSession;
use hview_core::shared::SharedModel;
use hview_core::tree::snapshot::NodeSnapshot;
use hview_core::{HierarchyModel, NodeId};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

#[derive(Parser)]
#[command(name = "hview-worker", about = "UI hierarchy model IPC worker process")]
struct Args {
    /// Enable verbose logging to stderr
    #[arg(short, long)]
    verbose: bool,
}

#[derive(Deserialize)]
struct Request {
    id: u64,
    method: String,
    #[serde(default)]
    params: Value,
}

#[derive(Serialize)]
struct Response {
    id: u64,
    #[serde(skip_serializing_if = "Option::is_none")]
    result: Option<Value>,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

/// Extract an i32 from a JSON value, clamping i64 to i32 range.
fn json_i32(val: Option<&Value>) -> i32 {
    val.and_then(|v| v.as_i64())
        .unwrap_or(0)
        .clamp(i32::MIN as i64, i32::MAX as i64) as i32
}

fn json_node_id(val: Option<&Value>) -> Result<NodeId, String> {
    val.and_then(|v| v.as_u64())
        .map(|id| NodeId(id as usize))
        .ok_or_else(|| "missing or invalid node id".to_owned())
}

const NOT_LOADED: &str = "no hierarchy loaded";

/// Model slot plus the search navigation state of the connected client.
#[derive(Default)]
struct Worker {
    model: SharedModel,
    search: SearchSession,
}

impl Worker {
    fn dispatch(&mut self, method: &str, params: &Value) -> Result<Value, String> {
        match method {
            "ping" => Ok(Value::String("pong".to_owned())),
            "load" => self.load(params),
            "tree" => {
                let model = self.model.read().ok_or(NOT_LOADED)?;
                to_value(model.tree().snapshot())
            }
            "node_at" => self.node_at(json_i32(params.get("x")), json_i32(params.get("y"))),
            "select" => {
                let id = json_node_id(params.get("id"))?;
                self.model
                    .with_mut(|m| m.select_node(id))
                    .ok_or(NOT_LOADED)?;
                self.selection()
            }
            "selection" => self.selection(),
            "search" => {
                let term = params.get("term").and_then(|v| v.as_str()).unwrap_or("");
                let search = &mut self.search;
                self.model
                    .with_mut(|m| search.submit(m, term))
                    .ok_or(NOT_LOADED)?;
                Ok(self.search_status())
            }
            "search_next" => {
                let search = &mut self.search;
                self.model.with_mut(|m| search.next(m)).ok_or(NOT_LOADED)?;
                Ok(self.search_status())
            }
            "search_previous" => {
                let search = &mut self.search;
                self.model
                    .with_mut(|m| search.previous(m))
                    .ok_or(NOT_LOADED)?;
                Ok(self.search_status())
            }
            "search_clear" => {
                self.search.clear();
                Ok(self.search_status())
            }
            "toggle_explore_mode" => {
                self.model
                    .with_mut(HierarchyModel::toggle_explore_mode)
                    .ok_or(NOT_LOADED)?;
                self.state()
            }
            "set_explore_mode" => {
                let enabled = params
                    .get("enabled")
                    .and_then(|v| v.as_bool())
                    .ok_or("missing boolean `enabled`")?;
                self.model
                    .with_mut(|m| m.set_explore_mode(enabled))
                    .ok_or(NOT_LOADED)?;
                self.state()
            }
            "toggle_show_naf" => {
                self.model
                    .with_mut(HierarchyModel::toggle_show_naf)
                    .ok_or(NOT_LOADED)?;
                self.state()
            }
            "naf_rects" => {
                let model = self.model.read().ok_or(NOT_LOADED)?;
                Ok(json!({
                    "visible": model.should_show_naf_nodes(),
                    "rects": model.naf_rects(),
                }))
            }
            _ => Err(format!("unknown method: {method}")),
        }
    }

    /// Load a dump from `params.path` or inline `params.xml`.
    fn load(&mut self, params: &Value) -> Result<Value, String> {
        let bytes = if let Some(path) = params.get("path").and_then(|v| v.as_str()) {
            std::fs::read(path).map_err(|e| format!("{path}: {e}"))?
        } else if let Some(xml) = params.get("xml").and_then(|v| v.as_str()) {
            xml.as_bytes().to_vec()
        } else {
            return Err("load requires `path` or `xml`".to_owned());
        };

        let model = HierarchyModel::from_xml(&bytes).map_err(|e| e.to_string())?;
        let summary = json!({
            "root": model.root(),
            "node_count": model.all_nodes().len(),
            "naf_count": model.naf_rects().len(),
        });

        self.search.clear();
        self.model.replace(model);
        log::info!("loaded hierarchy: {summary}");
        Ok(summary)
    }

    /// Hit-test `(x, y)`; in explore mode the hit also becomes the selection.
    fn node_at(&mut self, x: i32, y: i32) -> Result<Value, String> {
        let (hit, explore) = {
            let model = self.model.read().ok_or(NOT_LOADED)?;
            (model.node_at(x, y), model.is_explore_mode())
        };
        if let (Some(id), true) = (hit, explore) {
            self.model.with_mut(|m| m.select_node(id));
        }
        let model = self.model.read().ok_or(NOT_LOADED)?;
        Ok(json!({
            "node": hit.and_then(|id| NodeSnapshot::capture(model.tree(), id, false)),
            "state": model.state(),
        }))
    }

    fn selection(&self) -> Result<Value, String> {
        let model = self.model.read().ok_or(NOT_LOADED)?;
        let node = model
            .selected_node()
            .and_then(|id| NodeSnapshot::capture(model.tree(), id, false));
        Ok(json!({ "node": node, "state": model.state() }))
    }

    fn state(&self) -> Result<Value, String> {
        let model = self.model.read().ok_or(NOT_LOADED)?;
        to_value(model.state())
    }

    fn search_status(&self) -> Value {
        json!({
            "active": self.search.is_active(),
            "current": self.search.current(),
            "position": self.search.position(),
            "results": self.search.results(),
        })
    }
}

fn to_value<T: Serialize>(value: T) -> Result<Value, String> {
    serde_json::to_value(value).map_err(|e| e.to_string())
}

fn main() {
    let args = Args::parse();
    let default_level = if args.verbose { "debug" } else { "warn" };
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or(default_level))
        .init();

    let stdin = io::stdin();
    let mut stdout = io::stdout();
    let mut worker = Worker::default();

    log::debug!("hview-worker: ready");

    for line in stdin.lock().lines() {
        let line = match line {
            Ok(l) => l,
            Err(e) => {
                log::error!("hview-worker: stdin read error: {e}");
                break;
            }
        };

        if line.trim().is_empty() {
            continue;
        }

        let req: Request = match serde_json::from_str(&line) {
            Ok(r) => r,
            Err(e) => {
                // Parse error -- use id=0 since we can't extract it.
                let resp = Response {
                    id: 0,
                    result: None,
                    error: Some(format!("invalid JSON: {e}")),
                };
                if let Ok(json) = serde_json::to_string(&resp) {
                    let _ = writeln!(stdout, "{json}");
                    let _ = stdout.flush();
                }
                continue;
            }
        };

        log::debug!("request {}: {}", req.id, req.method);
        let resp = match worker.dispatch(&req.method, &req.params) {
            Ok(result) => Response {
                id: req.id,
                result: Some(result),
                error: None,
            },
            Err(error) => {
                log::warn!("request {} ({}) failed: {error}", req.id, req.method);
                Response {
                    id: req.id,
                    result: None,
                    error: Some(error),
                }
            }
        };

        if let Ok(json) = serde_json::to_string(&resp) {
            let _ = writeln!(stdout, "{json}");
        } else {
            // Serialization failed -- send minimal error response.
            let _ = writeln!(
                stdout,
                r#"{{"id":{},"error":"response serialization failed"}}"#,
                req.id
            );
        }
        let _ = stdout.flush();
    }
}
