use std::io::Write;

use super::types::BusConfig;
use crate::error::BusError;
use crate::transport::Transport;

#[test]
fn parse_minimal_toml() {
    let cfg = BusConfig::from_toml("").unwrap();
    assert_eq!(cfg.endpoints.command, "ipc:///tmp/edgekb/kb.sock");
    assert_eq!(cfg.endpoints.event, "ipc:///tmp/edgekb/event.sock");
    assert_eq!(cfg.telemetry.topics, vec!["env.".to_string()]);
}

#[test]
fn parse_full_toml() {
    let toml = r#"
[endpoints]
command = "tcp://0.0.0.0:7100"
event = "tcp://0.0.0.0:7101"
telemetry = "ipc:///run/telemetry/out.sock"

[telemetry]
topics = ["env.", "sys."]
"#;
    let cfg = BusConfig::from_toml(toml).unwrap();
    assert_eq!(cfg.command_transport().unwrap(), Transport::tcp("0.0.0.0", 7100));
    assert_eq!(cfg.event_transport().unwrap(), Transport::tcp("0.0.0.0", 7101));
    assert_eq!(
        cfg.telemetry_transport().unwrap().endpoint(),
        "ipc:///run/telemetry/out.sock"
    );
    assert_eq!(cfg.telemetry.topics.len(), 2);
}

#[test]
fn detect_colliding_endpoints() {
    let toml = r#"
[endpoints]
command = "tcp://127.0.0.1:7000"
event = "tcp://127.0.0.1:7000"
"#;
    let err = BusConfig::from_toml(toml).unwrap_err();
    assert!(matches!(err, BusError::Config(msg) if msg.contains("must differ")));
}

#[test]
fn detect_bad_endpoint_scheme() {
    let toml = r#"
[endpoints]
telemetry = "amqp://broker:5672"
"#;
    assert!(matches!(BusConfig::from_toml(toml), Err(BusError::Config(_))));
}

#[test]
fn detect_empty_topic_list() {
    let toml = r#"
[telemetry]
topics = []
"#;
    assert!(matches!(BusConfig::from_toml(toml), Err(BusError::Config(_))));
}

#[test]
fn malformed_toml_is_parse_error() {
    assert!(matches!(
        BusConfig::from_toml("[endpoints\ncommand = 1"),
        Err(BusError::ConfigParse(_))
    ));
}

#[test]
fn env_override_client_timeout() {
    std::env::set_var("EDGEKB_BUS_CLIENT_TIMEOUT_SECS", "3");
    let cfg = BusConfig::from_toml("").unwrap();
    assert_eq!(cfg.client.timeout_secs, 3);
    assert_eq!(cfg.client_timeout(), std::time::Duration::from_secs(3));
    std::env::remove_var("EDGEKB_BUS_CLIENT_TIMEOUT_SECS");
}

#[test]
fn local_config_defaults() {
    let cfg = BusConfig::local();
    assert_eq!(cfg.command_transport().unwrap(), Transport::ipc("kb"));
    assert_eq!(cfg.event_transport().unwrap(), Transport::ipc("event"));
    assert_eq!(cfg.telemetry_transport().unwrap(), Transport::ipc("telemetry"));
    cfg.validate().unwrap();
}

#[test]
fn tcp_config() {
    let cfg = BusConfig::tcp("10.0.0.5", 7200);
    assert_eq!(cfg.endpoints.command, "tcp://10.0.0.5:7200");
    assert_eq!(cfg.endpoints.event, "tcp://10.0.0.5:7201");
    assert_eq!(cfg.endpoints.telemetry, "tcp://10.0.0.5:7202");
    cfg.validate().unwrap();
}

#[test]
fn load_from_file() {
    let mut file = tempfile::NamedTempFile::new().unwrap();
    writeln!(file, "[endpoints]\nevent = \"tcp://127.0.0.1:7301\"").unwrap();
    let cfg = BusConfig::from_file(file.path()).unwrap();
    assert_eq!(cfg.endpoints.event, "tcp://127.0.0.1:7301");
}

#[test]
fn missing_file_is_io_error() {
    let dir = tempfile::tempdir().unwrap();
    let err = BusConfig::from_file(dir.path().join("absent.toml")).unwrap_err();
    assert!(matches!(err, BusError::ConfigIo(_)));
}
