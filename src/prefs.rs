// SPDX-License-Identifier: Apache-2.0
// Copyright 2025 U.S. Federal Government (in countries where recognized)
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! Persistent-preference seam.
//!
//! The pipeline remembers only two things between runs: the last-used
//! institution/profile pair and any issued refresh token. Storage medium is
//! the caller's business; the pipeline reads and writes JSON documents
//! through simple get/set calls.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::error::{OnboardError, Result};

/// Arbitrary key→JSON-document store.
#[async_trait]
pub trait PreferenceStore: Send + Sync {
    /// Read the document stored under `key`.
    async fn get(&self, key: &str) -> Result<Option<serde_json::Value>>;
    /// Store a document under `key`, replacing any previous one.
    async fn set(&self, key: &str, value: serde_json::Value) -> Result<()>;
}

const KEY_SELECTION: &str = "last_selection";
const KEY_REFRESH_TOKEN: &str = "refresh_token";

/// The remembered institution/profile choice.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RememberedSelection {
    /// Institution display name as shown in the directory.
    pub institution: String,
    /// Selected profile identifier.
    pub profile_id: String,
}

/// Typed helpers over a [`PreferenceStore`].
pub struct Preferences<'a> {
    store: &'a dyn PreferenceStore,
}

impl<'a> Preferences<'a> {
    /// Wrap a store.
    pub fn new(store: &'a dyn PreferenceStore) -> Self {
        Self { store }
    }

    /// Remember the user's institution/profile choice.
    pub async fn remember_selection(&self, selection: &RememberedSelection) -> Result<()> {
        let value = serde_json::to_value(selection)
            .map_err(|e| OnboardError::malformed(format!("Selection encode: {}", e)))?;
        self.store.set(KEY_SELECTION, value).await
    }

    /// The previously remembered choice, if any. A document that no longer
    /// decodes is treated as absent rather than an error.
    pub async fn recall_selection(&self) -> Result<Option<RememberedSelection>> {
        Ok(self
            .store
            .get(KEY_SELECTION)
            .await?
            .and_then(|v| serde_json::from_value(v).ok()))
    }

    /// Remember an issued refresh token.
    pub async fn remember_refresh_token(&self, token: &str) -> Result<()> {
        self.store
            .set(KEY_REFRESH_TOKEN, serde_json::Value::String(token.into()))
            .await
    }

    /// The remembered refresh token, if any.
    pub async fn recall_refresh_token(&self) -> Result<Option<String>> {
        Ok(self
            .store
            .get(KEY_REFRESH_TOKEN)
            .await?
            .and_then(|v| v.as_str().map(String::from)))
    }
}
