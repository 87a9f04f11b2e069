use crate::acquire::repository::{ClientMode, Repository};

/// Version string callers may use to mean "whatever is newest".
pub const LATEST: &str = "latest";

/// Everything the resolver needs to know, captured once per invocation.
///
/// The request is a plain value: building it performs no I/O beyond what the
/// caller already did to probe the cache.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AcquisitionRequest {
    pub airgap_enabled: bool,
    pub thin_client_enabled: bool,

    /// A binary already exists at the installation root.
    pub cached: bool,

    /// Version read from the cached installation's manifest.
    pub cached_version: Option<String>,

    pub custom_url: Option<String>,

    /// Exact bundle version pin.
    pub requested_version: Option<String>,

    /// Thin-client workflow pin. Never influences acquisition.
    pub requested_workflow_version: Option<String>,

    /// Where `DownloadLatest` and `DownloadVersion` point.
    pub repository: Repository,
}

impl AcquisitionRequest {
    /// A request for a fresh, non-airgapped runner with nothing cached.
    pub fn new(repository: Repository) -> Self {
        Self {
            airgap_enabled: false,
            thin_client_enabled: false,
            cached: false,
            cached_version: None,
            custom_url: None,
            requested_version: None,
            requested_workflow_version: None,
            repository,
        }
    }

    pub fn client_mode(&self) -> ClientMode {
        ClientMode::from_thin_client(self.thin_client_enabled)
    }

    /// Custom download URL, with blank input treated as absent.
    pub fn custom_url(&self) -> Option<&str> {
        non_blank(self.custom_url.as_deref())
    }

    /// Explicitly pinned version. Blank input and `latest` are treated as
    /// no pin at all.
    pub fn pinned_version(&self) -> Option<&str> {
        non_blank(self.requested_version.as_deref()).filter(|v| !v.eq_ignore_ascii_case(LATEST))
    }

    pub fn cached_version(&self) -> Option<&str> {
        non_blank(self.cached_version.as_deref())
    }

    /// Workflow version, only when running the thin client.
    pub fn workflow_version(&self) -> Option<&str> {
        if self.thin_client_enabled {
            non_blank(self.requested_workflow_version.as_deref())
        } else {
            None
        }
    }
}

fn non_blank(value: Option<&str>) -> Option<&str> {
    value.map(str::trim).filter(|v| !v.is_empty())
}
