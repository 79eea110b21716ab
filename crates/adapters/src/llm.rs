// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! LLM Invoker: spawns the configured LLM CLI binary, parses its
//! line-delimited JSON event stream, and bounds concurrent invocations with
//! a semaphore.

use async_trait::async_trait;
use oj_core::{OjError, OjResult};
use serde_json::Value;
use std::process::Stdio;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::Command;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;

use crate::env::recursion_guard_vars;
use crate::subprocess::KILL_GRACE;

#[derive(Debug, Clone)]
pub struct InvokeRequest {
    pub prompt: String,
    pub model: Option<String>,
    pub session_id: Option<String>,
    pub timeout: Duration,
}

#[derive(Debug, Clone, Default)]
pub struct InvokeResponse {
    pub text: String,
    pub session_id: Option<String>,
    pub cost_usd: Option<f64>,
}

/// A chunk of assistant text observed as it streams in.
pub type OnChunk<'a> = dyn FnMut(&str) + Send + 'a;

#[async_trait]
pub trait LlmInvoker: Send + Sync + 'static {
    async fn invoke(
        &self,
        request: InvokeRequest,
        cancel: CancellationToken,
        on_chunk: &mut OnChunk<'_>,
    ) -> OjResult<InvokeResponse>;
}

/// Spawns the real LLM CLI binary and streams its output.
pub struct ClaudeInvoker {
    binary: String,
    semaphore: Arc<Semaphore>,
}

impl ClaudeInvoker {
    pub fn new(binary: impl Into<String>, concurrency: usize) -> Self {
        Self {
            binary: binary.into(),
            semaphore: Arc::new(Semaphore::new(concurrency.max(1))),
        }
    }
}

#[async_trait]
impl LlmInvoker for ClaudeInvoker {
    async fn invoke(
        &self,
        request: InvokeRequest,
        cancel: CancellationToken,
        on_chunk: &mut OnChunk<'_>,
    ) -> OjResult<InvokeResponse> {
        let wait_start = Instant::now();
        let _permit = self.semaphore.acquire().await.map_err(|_| OjError::LlmCancelled)?;
        tracing::info!(queue_wait_ms = wait_start.elapsed().as_millis() as u64, "llm.queue_wait_ms");

        let mut cmd = Command::new(&self.binary);
        cmd.arg("--output-format").arg("stream-json").arg("-p").arg(&request.prompt);
        if let Some(model) = &request.model {
            cmd.arg("--model").arg(model);
        }
        if let Some(session_id) = &request.session_id {
            cmd.arg("--resume").arg(session_id);
        }
        for var in recursion_guard_vars() {
            cmd.env_remove(var);
        }
        cmd.stdin(Stdio::null()).stdout(Stdio::piped()).stderr(Stdio::piped());

        let mut child = cmd.spawn().map_err(|e| OjError::LlmProcess {
            exit_code: None,
            message: e.to_string(),
        })?;
        let stdout = child.stdout.take().ok_or_else(|| OjError::LlmProcess {
            exit_code: None,
            message: "child has no stdout".into(),
        })?;
        let mut lines = BufReader::new(stdout).lines();
        let mut response = InvokeResponse::default();
        let mut buffer = String::new();

        let outcome: OjResult<()> = loop {
            tokio::select! {
                biased;
                _ = cancel.cancelled() => {
                    terminate(&mut child).await;
                    break Err(OjError::LlmCancelled);
                }
                _ = tokio::time::sleep(request.timeout) => {
                    terminate(&mut child).await;
                    break Err(OjError::LlmTimeout(request.timeout));
                }
                line = lines.next_line() => {
                    match line {
                        Ok(Some(line)) => {
                            apply_stream_line(&line, &mut buffer, &mut response, on_chunk);
                        }
                        Ok(None) => break Ok(()),
                        Err(e) => break Err(OjError::LlmProcess { exit_code: None, message: e.to_string() }),
                    }
                }
            }
        };

        outcome?;
        let status = child.wait().await.map_err(|e| OjError::LlmProcess {
            exit_code: None,
            message: e.to_string(),
        })?;
        if !status.success() {
            return Err(OjError::LlmProcess {
                exit_code: status.code(),
                message: format!("{} exited with {status}", self.binary),
            });
        }
        response.text = buffer;
        Ok(response)
    }
}

async fn terminate(child: &mut tokio::process::Child) {
    if let Some(pid) = child.id() {
        #[cfg(unix)]
        {
            use nix::sys::signal::{kill, Signal};
            use nix::unistd::Pid;
            let _ = kill(Pid::from_raw(pid as i32), Signal::SIGTERM);
        }
        if tokio::time::timeout(KILL_GRACE, child.wait()).await.is_err() {
            let _ = child.start_kill();
        }
    } else {
        let _ = child.start_kill();
    }
}

/// Parses one line of the LLM CLI's stream-json output, mirroring the
/// `type`-driven dispatch used to extract structured log entries from
/// Claude's session JSONL.
fn apply_stream_line(line: &str, buffer: &mut String, response: &mut InvokeResponse, on_chunk: &mut OnChunk<'_>) {
    let trimmed = line.trim();
    if trimmed.is_empty() {
        return;
    }
    let Ok(json) = serde_json::from_str::<Value>(trimmed) else {
        return;
    };
    match get_str(&json, "type") {
        Some("assistant") => {
            for text in text_blocks(&json) {
                buffer.push_str(&text);
                on_chunk(&text);
            }
        }
        Some("stream_event") => {
            if let Some(delta) = json
                .get("event")
                .and_then(|e| e.get("delta"))
                .and_then(|d| get_str(d, "text"))
            {
                buffer.push_str(delta);
                on_chunk(delta);
            }
        }
        Some("result") => {
            response.session_id = get_str(&json, "session_id").map(String::from);
            response.cost_usd = json.get("total_cost_usd").and_then(|c| c.as_f64());
        }
        // "user" records carry tool-result blocks; rendered only to the
        // local log sink, not forwarded as assistant chunks.
        _ => {}
    }
}

fn text_blocks(json: &Value) -> Vec<String> {
    json.get("message")
        .and_then(|m| m.get("content"))
        .and_then(|c| c.as_array())
        .map(|blocks| {
            blocks
                .iter()
                .filter(|b| get_str(b, "type") == Some("text"))
                .filter_map(|b| get_str(b, "text"))
                .map(String::from)
                .collect()
        })
        .unwrap_or_default()
}

fn get_str<'a>(value: &'a Value, key: &str) -> Option<&'a str> {
    value.get(key).and_then(|v| v.as_str())
}

#[cfg(any(test, feature = "test-support"))]
pub struct FakeInvoker {
    pub response: InvokeResponse,
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl LlmInvoker for FakeInvoker {
    async fn invoke(
        &self,
        _request: InvokeRequest,
        _cancel: CancellationToken,
        on_chunk: &mut OnChunk<'_>,
    ) -> OjResult<InvokeResponse> {
        on_chunk(&self.response.text);
        Ok(self.response.clone())
    }
}

#[cfg(test)]
#[path = "llm_tests.rs"]
mod tests;
