use bridge_core::acquire::decision::{AcquisitionDecision, ConfigErrorKind};
use bridge_core::acquire::repository::{ClientMode, Platform, Repository};
use bridge_core::exit::classify::OutcomeKind;
use bridge_core::exit::policy::{BuildStatusMode, ExitPolicyConfig};
use bridge_core::install::fetch::{FetchError, Fetcher, LocalFetcher};
use bridge_core::install::layout::{InstallLayout, write_version_manifest};
use bridge_core::invoke::process::{Executor, SpawnError};
use bridge_core::pipeline::Invocation;
use bridge_core::report::model::ToolInfo;
use std::cell::RefCell;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use tempfile::TempDir;
use url::Url;
use zip::write::SimpleFileOptions;

/// Builds a Bridge-shaped zip archive with a wrapper directory.
fn bridge_archive(dir: &Path, wrapper: &str, version: Option<(&str, &str)>) -> PathBuf {
    let path = dir.join(format!("{wrapper}.zip"));
    let mut zip = zip::ZipWriter::new(fs::File::create(&path).expect("create zip"));
    let options = SimpleFileOptions::default().unix_permissions(0o755);

    zip.start_file(format!("{wrapper}/bridge-cli"), options)
        .expect("start binary");
    zip.write_all(b"#!/bin/sh\nexit 0\n").expect("write binary");

    if let Some((key, v)) = version {
        zip.start_file(format!("{wrapper}/versions.txt"), options)
            .expect("start manifest");
        zip.write_all(format!("{key}: {v}\n").as_bytes())
            .expect("write manifest");
    }
    zip.finish().expect("finish zip");
    path
}

/// Serves every location from one local archive and records what was asked for.
struct FakeFetcher {
    archive: Option<PathBuf>,
    requested: RefCell<Vec<String>>,
}

impl FakeFetcher {
    fn serving(archive: PathBuf) -> Self {
        Self {
            archive: Some(archive),
            requested: RefCell::new(vec![]),
        }
    }

    fn offline() -> Self {
        Self {
            archive: None,
            requested: RefCell::new(vec![]),
        }
    }
}

impl Fetcher for FakeFetcher {
    fn fetch(&self, location: &str, destination: &Path) -> Result<(), FetchError> {
        self.requested.borrow_mut().push(location.to_string());
        match &self.archive {
            Some(archive) => LocalFetcher.fetch(archive.to_str().expect("utf-8 path"), destination),
            None => Err(FetchError::Http {
                url: location.to_string(),
                reason: "offline".into(),
            }),
        }
    }
}

/// Returns a fixed exit code and records the arguments it was called with.
struct FakeExecutor {
    exit_code: Option<i32>,
    calls: RefCell<Vec<Vec<String>>>,
}

impl FakeExecutor {
    fn exiting(code: i32) -> Self {
        Self {
            exit_code: Some(code),
            calls: RefCell::new(vec![]),
        }
    }

    fn unspawnable() -> Self {
        Self {
            exit_code: None,
            calls: RefCell::new(vec![]),
        }
    }
}

impl Executor for FakeExecutor {
    fn execute(&self, program: &Path, args: &[String]) -> Result<i32, SpawnError> {
        self.calls.borrow_mut().push(args.to_vec());
        self.exit_code.ok_or_else(|| SpawnError {
            program: program.to_path_buf(),
            source: io::Error::new(io::ErrorKind::PermissionDenied, "not executable"),
        })
    }
}

fn invocation(install_dir: &Path) -> Invocation {
    Invocation {
        tool: ToolInfo {
            name: "bridge-runner".into(),
            version: "0.1.0-test".into(),
        },
        install_dir: install_dir.to_path_buf(),
        repository: Repository::new(
            Url::parse("https://repo.example.com/bridge/").expect("url"),
            Platform::Linux64,
        ),
        airgap: false,
        thin_client: false,
        custom_url: None,
        requested_version: None,
        workflow_version: None,
        stages: vec!["polaris=polaris_input.json".parse().expect("stage")],
        diagnostics: false,
        disable_update: false,
        policy: ExitPolicyConfig::default(),
    }
}

/// Pre-seeds a bundle installation as a previous run would have left it.
fn seed_cache(install_dir: &Path, version: Option<&str>) -> InstallLayout {
    let layout = InstallLayout::new(install_dir, Platform::Linux64, ClientMode::Bundle);
    fs::create_dir_all(layout.root()).expect("create root");
    fs::write(layout.binary_path(), b"#!/bin/sh\n").expect("write binary");
    if let Some(v) = version {
        write_version_manifest(&layout.manifest_path(), layout.manifest_key(), v)
            .expect("write manifest");
    }
    layout
}

#[test]
fn fresh_runner_downloads_latest_and_runs() {
    let tmp = TempDir::new().unwrap();
    let archive = bridge_archive(
        tmp.path(),
        "bridge-cli-bundle-linux64",
        Some(("bridge-cli-bundle", "2.3.0")),
    );
    let install = tmp.path().join("install");

    let fetcher = FakeFetcher::serving(archive);
    let executor = FakeExecutor::exiting(0);
    let report = bridge_core::run(&invocation(&install), &fetcher, &executor).unwrap();

    assert_eq!(
        fetcher.requested.borrow().as_slice(),
        ["https://repo.example.com/bridge/bridge-cli-bundle/latest/bridge-cli-bundle-linux64.zip"]
    );
    assert_eq!(report.acquisition.decision.label(), "download_latest");
    assert_eq!(report.acquisition.bridge_version.as_deref(), Some("2.3.0"));
    assert_eq!(
        report.acquisition.archive_sha256.as_ref().map(String::len),
        Some(64)
    );
    assert!(
        install
            .join("bridge-cli-bundle-linux64/bridge-cli")
            .is_file()
    );
    assert_eq!(report.outcome.kind, OutcomeKind::Success);
    assert_eq!(
        executor.calls.borrow()[0],
        vec!["--stage", "polaris", "--input", "polaris_input.json"]
    );

    // The downloaded archive does not linger next to the installation.
    let leftovers: Vec<_> = fs::read_dir(&install)
        .unwrap()
        .map(|e| e.unwrap().file_name())
        .collect();
    assert_eq!(leftovers, vec!["bridge-cli-bundle-linux64"]);
}

#[test]
fn cached_install_is_reused_without_download() {
    let tmp = TempDir::new().unwrap();
    seed_cache(tmp.path(), Some("2.1.1"));

    let fetcher = FakeFetcher::offline();
    let executor = FakeExecutor::exiting(0);
    let report = bridge_core::run(&invocation(tmp.path()), &fetcher, &executor).unwrap();

    assert_eq!(report.acquisition.decision, AcquisitionDecision::Skip);
    assert!(report.acquisition.archive_sha256.is_none());
    assert!(fetcher.requested.borrow().is_empty());
}

#[test]
fn matching_pin_reuses_cache_and_new_pin_downloads() {
    let tmp = TempDir::new().unwrap();
    seed_cache(tmp.path(), Some("2.1.1"));

    let mut inv = invocation(tmp.path());
    inv.requested_version = Some("2.1.1".into());
    let fetcher = FakeFetcher::offline();
    let report = bridge_core::run(&inv, &fetcher, &FakeExecutor::exiting(0)).unwrap();
    assert_eq!(report.acquisition.decision, AcquisitionDecision::Skip);

    // The archive has no manifest, so the pinned version is recorded.
    let archive = bridge_archive(tmp.path(), "bridge-cli-bundle-linux64", None);
    inv.requested_version = Some("2.2.0".into());
    let fetcher = FakeFetcher::serving(archive);
    let report = bridge_core::run(&inv, &fetcher, &FakeExecutor::exiting(0)).unwrap();

    assert_eq!(report.acquisition.decision.label(), "download_version");
    assert_eq!(report.acquisition.bridge_version.as_deref(), Some("2.2.0"));
    assert!(fetcher.requested.borrow()[0].ends_with("/2.2.0/bridge-cli-bundle-2.2.0-linux64.zip"));

    // Next run with the same pin is satisfied from cache.
    let fetcher = FakeFetcher::offline();
    let report = bridge_core::run(&inv, &fetcher, &FakeExecutor::exiting(0)).unwrap();
    assert_eq!(report.acquisition.decision, AcquisitionDecision::Skip);
}

#[test]
fn airgap_without_cache_aborts_before_execution() {
    let tmp = TempDir::new().unwrap();
    let mut inv = invocation(tmp.path());
    inv.airgap = true;

    let fetcher = FakeFetcher::offline();
    let executor = FakeExecutor::exiting(0);
    let err = bridge_core::run(&inv, &fetcher, &executor).unwrap_err();

    assert_eq!(
        err.downcast_ref::<ConfigErrorKind>(),
        Some(&ConfigErrorKind::AirgapBinaryUnavailable)
    );
    assert!(fetcher.requested.borrow().is_empty());
    assert!(executor.calls.borrow().is_empty());
}

#[test]
fn airgap_custom_url_is_used() {
    let tmp = TempDir::new().unwrap();
    let archive = bridge_archive(tmp.path(), "bridge-cli-bundle-linux64", None);
    let mut inv = invocation(&tmp.path().join("install"));
    inv.airgap = true;
    inv.custom_url = Some(Url::from_file_path(&archive).unwrap().to_string());

    let fetcher = FakeFetcher::serving(archive);
    let report = bridge_core::run(&inv, &fetcher, &FakeExecutor::exiting(0)).unwrap();

    assert_eq!(report.acquisition.decision.label(), "download_from_custom_url");
    assert_eq!(report.acquisition.bridge_version, None);
}

#[test]
fn thin_client_installs_into_its_own_root() {
    let tmp = TempDir::new().unwrap();
    seed_cache(tmp.path(), Some("2.1.1"));
    let archive = bridge_archive(tmp.path(), "bridge-cli-linux64", Some(("bridge-cli", "3.0.0")));

    let mut inv = invocation(tmp.path());
    inv.thin_client = true;
    inv.workflow_version = Some("1.5.0".into());

    let fetcher = FakeFetcher::serving(archive);
    let executor = FakeExecutor::exiting(0);
    let report = bridge_core::run(&inv, &fetcher, &executor).unwrap();

    assert!(
        fetcher.requested.borrow()[0]
            .ends_with("bridge-cli-thin-client/latest/bridge-cli-linux64.zip")
    );
    assert!(report.acquisition.install_root.ends_with("bridge-cli-linux64"));
    assert_eq!(report.acquisition.bridge_version.as_deref(), Some("3.0.0"));
    assert!(executor.calls.borrow()[0].contains(&"polaris@1.5.0".to_string()));
    // Bundle cache is untouched.
    assert!(tmp.path().join("bridge-cli-bundle-linux64/bridge-cli").is_file());
}

#[test]
fn policy_violation_under_unstable_is_non_failing() {
    let tmp = TempDir::new().unwrap();
    seed_cache(tmp.path(), None);
    let mut inv = invocation(tmp.path());
    inv.policy = ExitPolicyConfig::new(BuildStatusMode::Unstable);

    let report = bridge_core::run(&inv, &FakeFetcher::offline(), &FakeExecutor::exiting(8)).unwrap();

    assert_eq!(report.outcome.reported_exit_code, 8);
    assert!(report.outcome.is_policy_violation);
    assert!(!report.outcome.treated_as_failure);
}

#[test]
fn unspawnable_binary_is_classified_not_raised() {
    let tmp = TempDir::new().unwrap();
    seed_cache(tmp.path(), None);

    let report = bridge_core::run(
        &invocation(tmp.path()),
        &FakeFetcher::offline(),
        &FakeExecutor::unspawnable(),
    )
    .unwrap();

    assert_eq!(report.outcome.reported_exit_code, -1);
    assert!(report.outcome.treated_as_failure);
    assert!(report.outcome.message.contains("unknown exit code: -1"));
}

#[test]
fn download_failure_is_an_error() {
    let tmp = TempDir::new().unwrap();
    let err = bridge_core::run(
        &invocation(tmp.path()),
        &FakeFetcher::offline(),
        &FakeExecutor::exiting(0),
    )
    .unwrap_err();
    assert!(format!("{err:#}").contains("offline"));
}

#[test]
fn archive_without_binary_is_rejected() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("empty.zip");
    let mut zip = zip::ZipWriter::new(fs::File::create(&path).unwrap());
    zip.start_file("README.txt", SimpleFileOptions::default())
        .unwrap();
    zip.write_all(b"nothing here").unwrap();
    zip.finish().unwrap();

    let err = bridge_core::run(
        &invocation(&tmp.path().join("install")),
        &FakeFetcher::serving(path),
        &FakeExecutor::exiting(0),
    )
    .unwrap_err();
    assert!(err.to_string().contains("not found"));
}

/// Writes part of the archive, then drops the connection.
struct InterruptedFetcher;

impl Fetcher for InterruptedFetcher {
    fn fetch(&self, location: &str, destination: &Path) -> Result<(), FetchError> {
        fs::write(destination, b"PK\x03\x04").expect("write partial");
        Err(FetchError::Http {
            url: location.to_string(),
            reason: "connection reset".into(),
        })
    }
}

#[test]
fn interrupted_download_leaves_no_partial_archive() {
    let tmp = TempDir::new().unwrap();
    let err = bridge_core::run(
        &invocation(tmp.path()),
        &InterruptedFetcher,
        &FakeExecutor::exiting(0),
    )
    .unwrap_err();

    assert!(format!("{err:#}").contains("connection reset"));
    assert!(!tmp.path().join("bridge-cli-bundle-linux64.zip.part").exists());
    assert!(!tmp.path().join("bridge-cli-bundle-linux64").exists());
}

#[test]
fn corrupt_archive_is_not_reused_as_cache() {
    let tmp = TempDir::new().unwrap();
    let path = tmp.path().join("corrupt.zip");
    let mut zip = zip::ZipWriter::new(fs::File::create(&path).unwrap());
    let options = SimpleFileOptions::default()
        .compression_method(zip::CompressionMethod::Stored)
        .unix_permissions(0o755);
    zip.start_file("w/bridge-cli", options).unwrap();
    zip.write_all(b"#!/bin/sh\nexit 0\n").unwrap();
    zip.start_file("w/adapters/polaris.jar", options).unwrap();
    zip.write_all(b"POLARIS-ADAPTER").unwrap();
    zip.finish().unwrap();
    let mut bytes = fs::read(&path).unwrap();
    let at = bytes
        .windows(15)
        .position(|w| w == b"POLARIS-ADAPTER")
        .unwrap();
    bytes[at] ^= 0xff;
    fs::write(&path, bytes).unwrap();

    let install = tmp.path().join("install");
    let executor = FakeExecutor::exiting(0);
    bridge_core::run(&invocation(&install), &FakeFetcher::serving(path), &executor)
        .unwrap_err();
    assert!(executor.calls.borrow().is_empty());

    // The next run must download again rather than skip to a broken install.
    let fetcher = FakeFetcher::offline();
    let err = bridge_core::run(&invocation(&install), &fetcher, &executor).unwrap_err();
    assert!(format!("{err:#}").contains("offline"));
    assert_eq!(fetcher.requested.borrow().len(), 1);
    assert!(!install.join("bridge-cli-bundle-linux64").exists());
    assert!(!install.join("bridge-cli-bundle-linux64.partial").exists());
}

#[test]
fn airgapped_thin_client_does_not_update() {
    let tmp = TempDir::new().unwrap();
    let layout = InstallLayout::new(tmp.path(), Platform::Linux64, ClientMode::ThinClient);
    fs::create_dir_all(layout.root()).unwrap();
    fs::write(layout.binary_path(), b"#!/bin/sh\n").unwrap();

    let mut inv = invocation(tmp.path());
    inv.thin_client = true;
    inv.airgap = true;

    let executor = FakeExecutor::exiting(0);
    let report = bridge_core::run(&inv, &FakeFetcher::offline(), &executor).unwrap();

    assert_eq!(report.acquisition.decision, AcquisitionDecision::Skip);
    assert_eq!(
        executor.calls.borrow()[0],
        vec!["--stage", "polaris", "--input", "polaris_input.json"]
    );
}

#[test]
fn missing_stage_fails_before_download() {
    let tmp = TempDir::new().unwrap();
    let mut inv = invocation(tmp.path());
    inv.stages.clear();

    let fetcher = FakeFetcher::offline();
    let err = bridge_core::run(&inv, &fetcher, &FakeExecutor::exiting(0)).unwrap_err();
    assert!(err.to_string().contains("no Bridge stage"));
    assert!(fetcher.requested.borrow().is_empty());
}

#[cfg(unix)]
#[test]
fn real_process_exit_code_flows_into_report() {
    use bridge_core::invoke::process::ProcessExecutor;
    use std::os::unix::fs::PermissionsExt;

    let tmp = TempDir::new().unwrap();
    let layout = seed_cache(tmp.path(), Some("2.1.1"));
    fs::write(layout.binary_path(), "#!/bin/sh\nexit 8\n").unwrap();
    fs::set_permissions(layout.binary_path(), fs::Permissions::from_mode(0o755)).unwrap();

    let report = bridge_core::run(
        &invocation(tmp.path()),
        &FakeFetcher::offline(),
        &ProcessExecutor::default(),
    )
    .unwrap();

    assert_eq!(report.outcome.reported_exit_code, 8);
    assert_eq!(report.outcome.kind, OutcomeKind::PolicyViolationFailing);
}
