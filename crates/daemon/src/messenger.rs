// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Messenger router: the trait boundary a chat front end plugs into. No
//! concrete adapter ships here — Lark/Telegram/HTTP dashboards live outside
//! this core — but the dispatch table and per-chat serialization queue are
//! real so a downstream adapter has something to drive against.

use std::collections::HashMap;
use std::sync::Arc;

use async_trait::async_trait;
use oj_core::OjResult;
use tokio::sync::Mutex;

/// One incoming message from a chat surface, already stripped of
/// transport-specific framing.
#[derive(Debug, Clone)]
pub struct IncomingMessage {
    pub chat_id: String,
    pub sender: String,
    pub text: String,
}

/// A reply target: plain text, a structured "card", or an image, plus
/// in-place edits of a message this adapter already sent.
#[async_trait]
pub trait ChatAdapter: Send + Sync {
    async fn reply(&self, chat_id: &str, text: &str) -> OjResult<()>;

    async fn reply_card(&self, chat_id: &str, title: &str, body: &str) -> OjResult<()> {
        self.reply(chat_id, &format!("{title}\n{body}")).await
    }

    async fn edit_message(&self, _chat_id: &str, _message_id: &str, _text: &str) -> OjResult<()> {
        Ok(())
    }

    async fn reply_image(&self, _chat_id: &str, _path: &str) -> OjResult<()> {
        Ok(())
    }

    fn parse_incoming(&self, raw: &str) -> Option<IncomingMessage>;
}

/// Ships no transport; used when no chat front end is configured.
pub struct NoopChatAdapter;

#[async_trait]
impl ChatAdapter for NoopChatAdapter {
    async fn reply(&self, _chat_id: &str, _text: &str) -> OjResult<()> {
        Ok(())
    }

    fn parse_incoming(&self, _raw: &str) -> Option<IncomingMessage> {
        None
    }
}

/// Records every call for assertions; test-support only.
#[cfg(any(test, feature = "test-support"))]
#[derive(Default)]
pub struct FakeChatAdapter {
    pub sent: std::sync::Mutex<Vec<(String, String)>>,
}

#[cfg(any(test, feature = "test-support"))]
#[async_trait]
impl ChatAdapter for FakeChatAdapter {
    async fn reply(&self, chat_id: &str, text: &str) -> OjResult<()> {
        self.sent.lock().unwrap_or_else(|p| p.into_inner()).push((chat_id.to_string(), text.to_string()));
        Ok(())
    }

    fn parse_incoming(&self, raw: &str) -> Option<IncomingMessage> {
        let (chat_id, text) = raw.split_once(':')?;
        Some(IncomingMessage {
            chat_id: chat_id.to_string(),
            sender: "test".into(),
            text: text.to_string(),
        })
    }
}

/// Dispatches incoming messages to slash-command handlers, serializing
/// replies per `chatId` so interleaved commands from the same chat never
/// race each other's reply order.
pub struct MessengerRouter {
    adapter: Arc<dyn ChatAdapter>,
    handlers: HashMap<String, Arc<dyn Fn(&IncomingMessage) -> String + Send + Sync>>,
    chat_locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
}

impl MessengerRouter {
    pub fn new(adapter: Arc<dyn ChatAdapter>) -> Self {
        Self {
            adapter,
            handlers: HashMap::new(),
            chat_locks: Mutex::new(HashMap::new()),
        }
    }

    pub fn register(&mut self, command: impl Into<String>, handler: impl Fn(&IncomingMessage) -> String + Send + Sync + 'static) {
        self.handlers.insert(command.into(), Arc::new(handler));
    }

    async fn lock_for(&self, chat_id: &str) -> Arc<Mutex<()>> {
        let mut locks = self.chat_locks.lock().await;
        Arc::clone(locks.entry(chat_id.to_string()).or_insert_with(|| Arc::new(Mutex::new(()))))
    }

    /// Parses `raw`, dispatches to the first whitespace-separated token as
    /// the command name, and replies with the handler's output — all while
    /// holding that chat's serialization lock.
    pub async fn handle(&self, raw: &str) -> OjResult<()> {
        let Some(message) = self.adapter.parse_incoming(raw) else {
            return Ok(());
        };
        let lock = self.lock_for(&message.chat_id).await;
        let _guard = lock.lock().await;

        let command = message.text.split_whitespace().next().unwrap_or("");
        let reply = match self.handlers.get(command) {
            Some(handler) => handler(&message),
            None => format!("unknown command: {command}"),
        };
        self.adapter.reply(&message.chat_id, &reply).await
    }
}

#[cfg(test)]
#[path = "messenger_tests.rs"]
mod tests;
