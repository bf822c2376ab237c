//! Per-exchange processing options and their merge rules.

use std::collections::HashMap;
use std::time::Duration;

use serde::{Deserialize, Serialize};

/// Default limit on the encoded size of a lead chunk.
pub const DEFAULT_MAX_HEADERS_SIZE: usize = 64 * 1024;

/// Default amount of body data carried by one body chunk.
pub const DEFAULT_MAX_CHUNK_SIZE: usize = 8 * 1024;

/// Default cap on how much of a response body gets buffered in memory.
pub const DEFAULT_RESPONSE_BODY_BUFFERING_SIZE_LIMIT: usize = 128 * 1024 * 1024;

/// Tunables for one exchange.
///
/// Zero (or `None`) means "not set" for every field, so a value can be merged
/// on top of another one. A negative `timeout_millis` explicitly disables the
/// timeout, even when a fallback carries one.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProcessingOptions {
    pub timeout_millis: i64,
    pub max_headers_size: usize,
    pub max_chunk_size: usize,
    pub response_buffering_enabled: Option<bool>,
    pub response_body_buffering_size_limit: usize,
    pub extra_connectivity_params: HashMap<String, serde_json::Value>,
}

impl ProcessingOptions {
    /// Merges two option sets field by field.
    ///
    /// `preferred` wins wherever it carries a meaningful value, then
    /// `fallback`, then the hard default. Extra connectivity params are merged
    /// key by key with `preferred` overriding on conflict.
    pub fn merge(preferred: Option<&ProcessingOptions>, fallback: Option<&ProcessingOptions>) -> ProcessingOptions {
        let positive = |field: fn(&ProcessingOptions) -> usize, default: usize| {
            preferred
                .map(field)
                .filter(|v| *v > 0)
                .or_else(|| fallback.map(field).filter(|v| *v > 0))
                .unwrap_or(default)
        };

        let timeout_millis = preferred
            .map(|o| o.timeout_millis)
            .filter(|v| *v != 0)
            .or_else(|| fallback.map(|o| o.timeout_millis).filter(|v| *v != 0))
            .unwrap_or(0);

        let response_buffering_enabled = preferred
            .and_then(|o| o.response_buffering_enabled)
            .or_else(|| fallback.and_then(|o| o.response_buffering_enabled))
            .unwrap_or(true);

        let mut extra_connectivity_params = fallback.map(|o| o.extra_connectivity_params.clone()).unwrap_or_default();
        if let Some(preferred) = preferred {
            extra_connectivity_params.extend(preferred.extra_connectivity_params.clone());
        }

        ProcessingOptions {
            timeout_millis,
            max_headers_size: positive(|o| o.max_headers_size, DEFAULT_MAX_HEADERS_SIZE),
            max_chunk_size: positive(|o| o.max_chunk_size, DEFAULT_MAX_CHUNK_SIZE),
            response_buffering_enabled: Some(response_buffering_enabled),
            response_body_buffering_size_limit: positive(
                |o| o.response_body_buffering_size_limit,
                DEFAULT_RESPONSE_BODY_BUFFERING_SIZE_LIMIT,
            ),
            extra_connectivity_params,
        }
    }

    /// These options with every unset field replaced by its hard default.
    pub fn effective(&self) -> ProcessingOptions {
        Self::merge(Some(self), None)
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_millis = i64::try_from(timeout.as_millis()).unwrap_or(i64::MAX);
        self
    }

    /// Turns the timeout off, overriding any fallback that sets one.
    pub fn without_timeout(mut self) -> Self {
        self.timeout_millis = -1;
        self
    }

    pub fn with_max_headers_size(mut self, max_headers_size: usize) -> Self {
        self.max_headers_size = max_headers_size;
        self
    }

    pub fn with_max_chunk_size(mut self, max_chunk_size: usize) -> Self {
        self.max_chunk_size = max_chunk_size;
        self
    }

    pub fn with_response_buffering(mut self, enabled: bool) -> Self {
        self.response_buffering_enabled = Some(enabled);
        self
    }

    pub fn with_response_body_buffering_size_limit(mut self, limit: usize) -> Self {
        self.response_body_buffering_size_limit = limit;
        self
    }

    pub fn with_extra_connectivity_param<K: Into<String>>(mut self, key: K, value: serde_json::Value) -> Self {
        self.extra_connectivity_params.insert(key.into(), value);
        self
    }

    /// The timeout, when one is set and enabled.
    pub fn timeout(&self) -> Option<Duration> {
        u64::try_from(self.timeout_millis).ok().filter(|millis| *millis > 0).map(Duration::from_millis)
    }

    pub fn response_buffering_enabled(&self) -> bool {
        self.response_buffering_enabled.unwrap_or(true)
    }
}
