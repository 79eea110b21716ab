// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

// Allow panic!/unwrap/expect in test code
#![cfg_attr(test, allow(clippy::panic))]
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
// Enable coverage(off) attribute for excluding test infrastructure
#![cfg_attr(coverage_nightly, feature(coverage_attribute))]

//! Adapters for external I/O: the LLM CLI subprocess, desktop notifications,
//! and process environment handling.

mod env;
pub mod llm;
pub mod notify;
pub mod subprocess;

pub use env::{recursion_guard_vars, TASK_ID_VAR};
pub use llm::{ClaudeInvoker, InvokeRequest, InvokeResponse, LlmInvoker, OnChunk};
pub use notify::{DesktopNotifyAdapter, NoOpNotifyAdapter, NotifyAdapter};

// Test support - only compiled for tests or when explicitly requested
#[cfg(any(test, feature = "test-support"))]
pub use llm::FakeInvoker;
#[cfg(any(test, feature = "test-support"))]
pub use notify::{FakeNotifyAdapter, NotifyCall};
