//! Expiration policy for blob entries.
//!
//! A blob written with a non-zero ttl gets a companion *expiration record*
//! (see [`KeyBuilder::expiration`](crate::key::KeyBuilder::expiration)) that
//! stores the ttl in whole seconds as decimal text. The store only reports a
//! key's *remaining* life, so `refresh` reads the record to learn the
//! window it was written with and re-applies it.
//!
//! # Precedence
//!
//! | Set fields | Resolved ttl |
//! |------------|--------------|
//! | sliding (any others) | sliding |
//! | relative-to-now (+ absolute) | relative-to-now |
//! | absolute only | `absolute - now` |
//! | none | no expiration |

use crate::error::{Error, Result};
use std::time::{Duration, SystemTime};

/// Expiration settings for a blob write.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct EntryOptions {
    /// Window re-armed by every `refresh`.
    pub sliding_expiration: Option<Duration>,
    /// Fixed lifetime measured from the write.
    pub absolute_expiration_relative_to_now: Option<Duration>,
    /// Fixed deadline as a wall-clock instant.
    pub absolute_expiration: Option<SystemTime>,
}

impl EntryOptions {
    /// Entry never expires.
    pub fn no_expiration() -> Self {
        Self::default()
    }

    pub fn with_sliding_expiration(mut self, window: Duration) -> Self {
        self.sliding_expiration = Some(window);
        self
    }

    pub fn with_absolute_expiration_relative_to_now(mut self, lifetime: Duration) -> Self {
        self.absolute_expiration_relative_to_now = Some(lifetime);
        self
    }

    pub fn with_absolute_expiration(mut self, deadline: SystemTime) -> Self {
        self.absolute_expiration = Some(deadline);
        self
    }

    /// Resolve the ttl in whole seconds; `0` means no expiration.
    ///
    /// Durations are truncated to whole seconds, except that a non-zero
    /// duration below one second resolves to one second.
    ///
    /// # Errors
    /// Returns `Error::InvalidArgument` if only an absolute deadline is set
    /// and it is not in the future.
    pub fn ttl_seconds(&self) -> Result<u64> {
        if let Some(window) = self.sliding_expiration {
            return Ok(whole_seconds(window));
        }
        if let Some(lifetime) = self.absolute_expiration_relative_to_now {
            return Ok(whole_seconds(lifetime));
        }
        if let Some(deadline) = self.absolute_expiration {
            let remaining = deadline
                .duration_since(SystemTime::now())
                .ok()
                .filter(|d| !d.is_zero())
                .ok_or_else(|| {
                    Error::InvalidArgument("absolute expiration is in the past".to_string())
                })?;
            return Ok(whole_seconds(remaining));
        }
        Ok(0)
    }
}

fn whole_seconds(duration: Duration) -> u64 {
    match duration.as_secs() {
        0 if !duration.is_zero() => 1,
        secs => secs,
    }
}

/// Encode a ttl for the expiration record.
pub fn encode_record(ttl_seconds: u64) -> Vec<u8> {
    ttl_seconds.to_string().into_bytes()
}

/// Decode an expiration record.
///
/// # Errors
/// Returns `Error::InvalidExpiration` unless the record is a positive
/// decimal integer (surrounding whitespace tolerated).
pub fn decode_record(record_key: &str, raw: &[u8]) -> Result<u64> {
    std::str::from_utf8(raw)
        .ok()
        .and_then(|text| text.trim().parse::<u64>().ok())
        .filter(|secs| *secs > 0)
        .ok_or_else(|| Error::InvalidExpiration {
            key: record_key.to_string(),
            value: String::from_utf8_lossy(raw).into_owned(),
        })
}
