use std::io::Write;

use gbs_config::{load_layered_yaml, report_unused_keys, ServerSettings, UnusedKeyPolicy};

fn write_yaml(dir: &tempfile::TempDir, name: &str, body: &str) -> String {
    let path = dir.path().join(name);
    let mut f = std::fs::File::create(&path).expect("create yaml");
    f.write_all(body.as_bytes()).expect("write yaml");
    path.to_string_lossy().into_owned()
}

#[test]
fn layered_files_merge_into_typed_settings() -> anyhow::Result<()> {
    let dir = tempfile::tempdir()?;
    let base = write_yaml(
        &dir,
        "base.yaml",
        "sip:\n  alive_expires: 180\nmedia:\n  server_url: http://10.0.0.2:8080\n  timeout_secs: 3\n",
    );
    let site = write_yaml(&dir, "site.yaml", "sip:\n  alive_expires: 90\nhttp:\n  listen_addr: 0.0.0.0:9000\n");

    let cfg = load_layered_yaml(&[base.as_str(), site.as_str()])?;
    let settings = ServerSettings::from_config_json(&cfg.config_json)?;

    assert_eq!(settings.alive_expires_secs, 90);
    assert_eq!(settings.media_server_url, "http://10.0.0.2:8080");
    assert_eq!(settings.media_timeout.as_secs(), 3);
    assert_eq!(settings.http_listen_addr, "0.0.0.0:9000");

    let unused = report_unused_keys(&cfg.config_json, UnusedKeyPolicy::Fail)?;
    assert!(unused.is_clean());
    Ok(())
}

#[test]
fn missing_file_is_reported_with_path() {
    let err = load_layered_yaml(&["/definitely/not/here.yaml"]).unwrap_err();
    assert!(format!("{err:#}").contains("/definitely/not/here.yaml"));
}
