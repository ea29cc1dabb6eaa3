//! Filter configuration for pod admission
//!
//! The configuration is parsed once at startup from the `WATCH_ANNOTATION`
//! and `WATCH_NAMESPACES` inputs and then passed by reference into the
//! predicate filter. There is no ambient/global lookup inside the filter
//! logic itself.

use std::collections::BTreeSet;
use std::time::Duration;

use crate::error::{Error, Result};

/// Create events for pods older than this are ignored. Bounds against
/// reprocessing historical objects during a controller restart or resync.
pub const FRESHNESS_WINDOW: Duration = Duration::from_secs(60);

/// Admission criteria for incoming pod create events.
#[derive(Clone, Debug)]
pub struct FilterConfig {
    /// Allowed namespaces. An empty set disables the namespace check.
    pub namespaces: BTreeSet<String>,
    /// Required annotation as an exact `(key, value)` pair. `None` disables
    /// the check. An empty value means the key must map to the empty string,
    /// not that the key must be absent.
    pub annotation: Option<(String, String)>,
    /// Maximum age of a pod at admission time.
    pub freshness_window: Duration,
}

impl FilterConfig {
    /// Build a `FilterConfig` from the raw string inputs.
    ///
    /// `annotation` is a `"key=value"` pair; the empty string disables the
    /// annotation check. `namespaces` is a comma-separated allow-list; the
    /// empty string disables the namespace check.
    pub fn parse(annotation: &str, namespaces: &str) -> Result<Self> {
        let annotation = if annotation.is_empty() {
            None
        } else {
            let (key, value) = annotation.split_once('=').ok_or_else(|| {
                Error::ConfigError(format!(
                    "WATCH_ANNOTATION must be of the form key=value, got {annotation:?}"
                ))
            })?;
            if key.is_empty() {
                return Err(Error::ConfigError(
                    "WATCH_ANNOTATION has an empty key".to_string(),
                ));
            }
            Some((key.to_string(), value.to_string()))
        };

        let namespaces = namespaces
            .split(',')
            .filter(|ns| !ns.is_empty())
            .map(String::from)
            .collect();

        Ok(Self {
            namespaces,
            annotation,
            freshness_window: FRESHNESS_WINDOW,
        })
    }
}
