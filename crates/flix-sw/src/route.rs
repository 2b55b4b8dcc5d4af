//! Route classification.

use serde::Serialize;

use crate::config::WorkerConfig;
use crate::request::{Destination, Request};

/// The category a request is sorted into before a strategy is chosen.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum RouteClass {
    /// Shell assets: cache-first, stored in the shell namespace.
    AppShell,
    /// Video: cache-first, stored in the media namespace.
    Media,
    /// Everything else: network-first.
    Default,
}

/// Classify a request. First match wins: shell, then media, then default.
pub fn classify(request: &Request, config: &WorkerConfig) -> RouteClass {
    let path = request.url.path();

    if config.shell_assets.iter().any(|asset| asset == path)
        || (config.is_same_origin(&request.url) && path == "/")
    {
        return RouteClass::AppShell;
    }

    if request.destination == Destination::Video || has_media_extension(path, config) {
        return RouteClass::Media;
    }

    RouteClass::Default
}

/// The path ends in `.<ext>` for a known extension. A bare `/.mp4` counts.
fn has_media_extension(path: &str, config: &WorkerConfig) -> bool {
    let Some((_, ext)) = path.rsplit_once('.') else {
        return false;
    };
    if ext.contains('/') {
        return false;
    }
    config
        .media_extensions
        .iter()
        .any(|known| known.eq_ignore_ascii_case(ext))
}
