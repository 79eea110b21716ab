// SPDX-License-Identifier: BUSL-1.1
// Copyright (c) 2026 Alfred Jean LLC

//! Corrupt-tolerant JSON file read/write built on [`StoreIo`].
//!
//! Reads treat a missing file as absent and a file that fails to parse as
//! absent too, after backing it up and replacing it with `{}` so a future
//! write doesn't keep tripping over the same garbage.

use crate::io::StoreIo;
use oj_core::OjResult;
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::path::Path;

pub fn read_json<T: DeserializeOwned>(io: &dyn StoreIo, path: &Path) -> OjResult<Option<T>> {
    let Some(bytes) = io.read(path)? else {
        return Ok(None);
    };
    match serde_json::from_slice::<T>(&bytes) {
        Ok(value) => Ok(Some(value)),
        Err(err) => {
            tracing::warn!(path = %path.display(), error = %err, "corrupt json file, backing up and resetting");
            repair_corrupt(io, path)?;
            Ok(None)
        }
    }
}

fn repair_corrupt(io: &dyn StoreIo, path: &Path) -> OjResult<()> {
    let backup = path.with_extension("corrupt");
    let _ = io.rename(path, &backup);
    io.write_atomic(path, b"{}")?;
    Ok(())
}

pub fn write_json<T: Serialize>(io: &dyn StoreIo, path: &Path, value: &T) -> OjResult<()> {
    let bytes = serde_json::to_vec_pretty(value)?;
    io.write_atomic(path, &bytes)?;
    Ok(())
}

#[cfg(test)]
#[path = "json_file_tests.rs"]
mod tests;
