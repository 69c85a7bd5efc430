//! End-to-end build tests against the mock driver

use std::path::PathBuf;
use std::sync::Arc;

use tempfile::TempDir;
use upcloud_image_builder::config::{Config, RawConfig};
use upcloud_image_builder::driver::mock::{DriverCall, MockDriver};
use upcloud_image_builder::ui::CapturingUi;
use upcloud_image_builder::{BuilderError, build_templates};

const SERVER: &str = "00798b85-efdc-41ca-8021-f6ef457b8531";
const DISK: &str = "01000000-0000-4000-8000-000020060100";

async fn prepare(yaml: &str) -> Result<Config, BuilderError> {
    Config::prepare(RawConfig::from_yaml(yaml)?, |_| None).await
}

fn cloned_uuids(driver: &MockDriver) -> Vec<String> {
    // Every template source except the original disk is a clone
    driver
        .calls()
        .into_iter()
        .filter_map(|call| match call {
            DriverCall::CreateTemplate { storage_uuid, .. } if storage_uuid != DISK => {
                Some(storage_uuid)
            }
            _ => None,
        })
        .collect()
}

/// Two clone zones with a prefix: three templates sharing one title, and
/// both clones reclaimed afterwards
#[tokio::test]
async fn test_multi_zone_build() {
    let config = prepare(&format!(
        r#"
username: user
password: secret
zone: fi-hel1
storage_uuid: {DISK}
template_prefix: img
clone_zones: [de-fra1, uk-lon1]
"#
    ))
    .await
    .unwrap();

    let driver = Arc::new(MockDriver::new().with_server_storage(DISK, "Build disk"));
    let ui = Arc::new(CapturingUi::new());

    let artifact = build_templates(&config, SERVER, driver.clone(), ui.clone())
        .await
        .unwrap();

    assert_eq!(artifact.templates.len(), 3);
    let title = &artifact.templates[0].title;
    assert!(title.starts_with("img-"));
    assert_eq!(title.len(), "img-".len() + "YYYYMMDD-HHMMSS".len());
    assert!(artifact.templates.iter().all(|t| &t.title == title));

    let clones = cloned_uuids(&driver);
    assert_eq!(clones.len(), 2);
    assert_eq!(driver.deleted(), clones);
    assert!(!driver.deleted().contains(&DISK.to_string()));
    assert!(ui.errors().is_empty());
}

/// A failing template creation halts the build and reclaims the clones
#[tokio::test]
async fn test_failed_build_reclaims_clones() {
    let config = prepare(&format!(
        r#"
username: user
password: secret
zone: fi-hel1
storage_uuid: {DISK}
template_name: golden
clone_zones: [de-fra1, uk-lon1]
"#
    ))
    .await
    .unwrap();

    let driver = Arc::new(
        MockDriver::new()
            .with_server_storage(DISK, "Build disk")
            .with_template_failure_at(3),
    );
    let ui = Arc::new(CapturingUi::new());

    let err = build_templates(&config, SERVER, driver.clone(), ui.clone())
        .await
        .unwrap_err();

    assert!(matches!(err, BuilderError::Driver(_)));
    assert_eq!(driver.deleted().len(), 2);
    assert_eq!(ui.errors().len(), 1);
}

/// A failing clone stops before any template is created
#[tokio::test]
async fn test_clone_failure_stops_build() {
    let config = prepare(&format!(
        r#"
username: user
password: secret
zone: fi-hel1
storage_uuid: {DISK}
clone_zones: [de-fra1, uk-lon1, nl-ams1]
"#
    ))
    .await
    .unwrap();

    let driver = Arc::new(MockDriver::new().with_clone_failure_at(3));
    let ui = Arc::new(CapturingUi::new());

    assert!(
        build_templates(&config, SERVER, driver.clone(), ui)
            .await
            .is_err()
    );

    let calls = driver.calls();
    assert!(
        !calls
            .iter()
            .any(|c| matches!(c, DriverCall::CreateTemplate { .. }))
    );
    assert_eq!(driver.deleted().len(), 2);
}

/// Readable key files are loaded, nothing else is required of them
#[tokio::test]
async fn test_ssh_key_files_loaded() {
    let dir = TempDir::new().unwrap();
    let private = dir.path().join("id_ed25519");
    let public = dir.path().join("id_ed25519.pub");
    std::fs::write(&private, "PRIVATE").unwrap();
    std::fs::write(&public, "ssh-ed25519 AAAA builder").unwrap();

    let raw = RawConfig {
        username: Some("user".to_string()),
        password: Some("secret".to_string()),
        zone: Some("fi-hel1".to_string()),
        storage_name: Some("Debian GNU/Linux 12".to_string()),
        ssh_private_key_path: Some(private),
        ssh_public_key_path: Some(PathBuf::from(&public)),
        ..Default::default()
    };

    let config = Config::prepare(raw, |_| None).await.unwrap();
    assert_eq!(config.ssh_private_key.as_deref(), Some(&b"PRIVATE"[..]));
    assert_eq!(
        config.ssh_public_key.as_deref(),
        Some(&b"ssh-ed25519 AAAA builder"[..])
    );
}

/// Configuration errors are reported before any driver call
#[tokio::test]
async fn test_invalid_config_reports_everything() {
    let err = prepare("template_prefix: img\ntemplate_name: golden\n")
        .await
        .unwrap_err();

    let errors = err.config_errors();
    assert_eq!(errors.len(), 5);
    assert!(errors.iter().any(|e| e.contains("either use")));
}
