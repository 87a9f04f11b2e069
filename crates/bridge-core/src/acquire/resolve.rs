//! Acquisition resolver.
//!
//! Decides whether a Bridge CLI must be fetched, and from where, given the
//! invocation's airgap, thin-client, cache and version-pin state.
//!
//! Responsibilities:
//! - Apply one ordered rule list, first match wins
//! - Give a custom download URL absolute precedence over the default repository
//! - Refuse to reach the default repository in airgap mode
//!
//! Non-responsibilities:
//! - Probing the cache (the caller fills `cached` / `cached_version`)
//! - Downloading or extracting anything
//! - Building the Bridge command line (workflow versions are threaded through
//!   untouched)
//!
//! Rules:
//!
//!   1. airgap, nothing cached, no custom URL        → Error
//!   2a. cached, no custom URL, no version pin        → Skip
//!   2b. cached, pinned version equals cached version → Skip
//!   3. custom URL                                    → DownloadFromCustomUrl
//!      airgap                                        → Error
//!      version pin                                   → DownloadVersion
//!      otherwise                                     → DownloadLatest
//!
//! `latest` is never a pin and is never compared with a cached version.

use tracing::debug;

use crate::acquire::decision::{AcquisitionDecision, ConfigErrorKind};
use crate::acquire::request::AcquisitionRequest;

/// Resolve a request into exactly one decision.
///
/// Pure: no filesystem or network access, same input → same output.
pub fn resolve(req: &AcquisitionRequest) -> AcquisitionDecision {
    let custom_url = req.custom_url();
    let pinned = req.pinned_version();

    if req.airgap_enabled && !req.cached && custom_url.is_none() {
        return airgap_unavailable();
    }

    if req.cached {
        if custom_url.is_none() && pinned.is_none() {
            debug!("cached Bridge CLI present and no explicit source or version requested");
            return AcquisitionDecision::Skip;
        }

        if let (Some(wanted), Some(have)) = (pinned, req.cached_version()) {
            if wanted == have {
                debug!(version = wanted, "cached Bridge CLI already at requested version");
                return AcquisitionDecision::Skip;
            }
        }
    }

    if let Some(url) = custom_url {
        return AcquisitionDecision::DownloadFromCustomUrl {
            url: url.to_string(),
            version: pinned.map(str::to_string),
        };
    }

    if req.airgap_enabled {
        return airgap_unavailable();
    }

    let mode = req.client_mode();
    match pinned {
        Some(version) => match req.repository.version_url(mode, version) {
            Ok(source) => AcquisitionDecision::DownloadVersion {
                version: version.to_string(),
                source,
            },
            Err(e) => invalid_source(e),
        },
        None => match req.repository.latest_url(mode) {
            Ok(source) => AcquisitionDecision::DownloadLatest { source },
            Err(e) => invalid_source(e),
        },
    }
}

fn airgap_unavailable() -> AcquisitionDecision {
    AcquisitionDecision::Error {
        reason: ConfigErrorKind::AirgapBinaryUnavailable,
    }
}

fn invalid_source(e: url::ParseError) -> AcquisitionDecision {
    AcquisitionDecision::Error {
        reason: ConfigErrorKind::InvalidDownloadSource(e.to_string()),
    }
}
