use super::*;

use std::fs;

#[test]
fn defaults_describe_a_hidden_overlay_and_an_image_menu() {
    let settings = Settings::default();
    assert!(settings.overlay_hidden);
    assert_eq!(settings.menu_id, "pixelate-image");
    assert_eq!(settings.log_filter, "info");
}

#[test]
fn file_values_override_defaults_and_keep_the_rest() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("coordinator.toml");
    fs::write(
        &path,
        "menu_title = \"Blockify\"\noverlay_hidden = false\n",
    )
    .expect("write config");

    let settings = load_settings_from(&path).expect("settings");
    assert_eq!(settings.menu_title, "Blockify");
    assert!(!settings.overlay_hidden);
    assert_eq!(settings.menu_id, "pixelate-image");
}

#[test]
fn missing_explicit_file_is_an_error() {
    let dir = tempfile::tempdir().expect("tempdir");
    let err = load_settings_from(&dir.path().join("absent.toml")).expect_err("missing file");
    assert!(err.to_string().contains("absent.toml"));
}

#[test]
fn malformed_values_are_rejected() {
    let dir = tempfile::tempdir().expect("tempdir");
    let path = dir.path().join("coordinator.toml");
    fs::write(&path, "overlay_hidden = \"sometimes\"\n").expect("write config");

    assert!(load_settings_from(&path).is_err());
}

#[test]
fn environment_overrides_the_instance_id() {
    std::env::set_var("APP__INSTANCE_ID", "relay-from-env");
    let settings = load_settings().expect("settings");
    std::env::remove_var("APP__INSTANCE_ID");

    assert_eq!(settings.instance_id, "relay-from-env");
}
