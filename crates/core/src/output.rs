// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Node output parsing: dynamic output extracted from LLM responses.
//!
//! The LLM CLI returns free text. `task` node executors scan it for a
//! fenced JSON block or `key: value` lines and lift the result into a
//! structured map; everything else stays opaque under `_raw`.

use serde_json::{Map, Value};

/// Output produced by a node executor.
#[derive(Debug, Clone, PartialEq)]
pub enum NodeOutput {
    Raw(String),
    Structured(Map<String, Value>),
}

impl NodeOutput {
    /// Parse an LLM response: prefer a fenced ```json block, then
    /// `key: value` line pairs, falling back to raw text.
    pub fn parse_llm_response(text: &str) -> Self {
        if let Some(json) = extract_fenced_json(text) {
            if let Ok(Value::Object(map)) = serde_json::from_str::<Value>(&json) {
                return Self::Structured(with_raw(map, text));
            }
        }
        if let Some(map) = extract_key_value_pairs(text) {
            if !map.is_empty() {
                return Self::Structured(with_raw(map, text));
            }
        }
        Self::Raw(text.to_string())
    }

    /// Turn this output into a JSON value for persistence under
    /// `instance.outputs[nodeId]`.
    pub fn into_value(self) -> Value {
        match self {
            Self::Raw(text) => Value::String(text),
            Self::Structured(map) => Value::Object(map),
        }
    }

    /// Build an evaluation-context entry for this output: every key that
    /// contains a hyphen is duplicated under its underscore alias so
    /// `foo-bar` is reachable as `foo_bar` from dotted expression syntax.
    pub fn eval_context_value(&self) -> Value {
        match self {
            Self::Raw(text) => Value::String(text.clone()),
            Self::Structured(map) => Value::Object(alias_hyphenated_keys(map)),
        }
    }
}

fn with_raw(mut map: Map<String, Value>, raw: &str) -> Map<String, Value> {
    map.entry("_raw".to_string())
        .or_insert_with(|| Value::String(raw.to_string()));
    map
}

/// Recursively alias every hyphenated key with an underscore variant,
/// without removing the original key (dual-indexing, per design notes).
fn alias_hyphenated_keys(map: &Map<String, Value>) -> Map<String, Value> {
    let mut out = Map::with_capacity(map.len() * 2);
    for (key, value) in map {
        let aliased_value = match value {
            Value::Object(inner) => Value::Object(alias_hyphenated_keys(inner)),
            other => other.clone(),
        };
        if key.contains('-') {
            out.insert(key.replace('-', "_"), aliased_value.clone());
        }
        out.insert(key.clone(), aliased_value);
    }
    out
}

fn extract_fenced_json(text: &str) -> Option<String> {
    let fence_start = text.find("```json").or_else(|| text.find("```JSON"))?;
    let after_open = fence_start + "```json".len();
    let rest = &text[after_open..];
    let fence_end = rest.find("```")?;
    Some(rest[..fence_end].trim().to_string())
}

fn extract_key_value_pairs(text: &str) -> Option<Map<String, Value>> {
    let mut map = Map::new();
    for line in text.lines() {
        let line = line.trim();
        if let Some((key, value)) = line.split_once(':') {
            let key = key.trim();
            let value = value.trim();
            if key.is_empty() || value.is_empty() || key.contains(' ') {
                continue;
            }
            map.insert(key.to_string(), scalar_value(value));
        }
    }
    Some(map)
}

fn scalar_value(text: &str) -> Value {
    if let Ok(n) = text.parse::<i64>() {
        return Value::from(n);
    }
    if let Ok(n) = text.parse::<f64>() {
        return Value::from(n);
    }
    match text {
        "true" => Value::Bool(true),
        "false" => Value::Bool(false),
        _ => Value::String(text.to_string()),
    }
}

#[cfg(test)]
#[path = "output_tests.rs"]
mod tests;
