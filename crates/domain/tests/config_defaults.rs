use valet_domain::config::{ChannelMode, Config, ConfigSeverity};

#[test]
fn default_host_is_localhost() {
    let config = Config::default();
    assert_eq!(config.server.host, "127.0.0.1");
    assert_eq!(config.server.port, 8080);
}

#[test]
fn explicit_zero_host_parses() {
    let toml_str = r#"
[server]
host = "0.0.0.0"
port = 8080
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.server.host, "0.0.0.0");
}

#[test]
fn default_cors_allows_only_localhost() {
    let config = Config::default();
    assert!(config
        .server
        .cors
        .allowed_origins
        .contains(&"http://localhost:*".to_string()));
    assert!(config
        .server
        .cors
        .allowed_origins
        .contains(&"http://127.0.0.1:*".to_string()));
}

#[test]
fn default_agent_invocation_matches_cli_contract() {
    let config = Config::default();
    assert_eq!(config.agent.command, "claude");
    assert_eq!(
        config.agent.args,
        vec!["--continue", "--output-format", "stream-json", "--verbose", "--print"]
    );
    assert_eq!(config.agent.kill_grace_sec, 5);
}

#[test]
fn agent_channel_parses_from_toml() {
    let toml_str = r#"
[agent]
command = "claude"
channel = "pty"
"#;
    let config: Config = toml::from_str(toml_str).unwrap();
    assert_eq!(config.agent.channel, ChannelMode::Pty);
}

#[test]
fn empty_agent_command_is_a_validation_error() {
    let config: Config = toml::from_str("[agent]\ncommand = \"\"\n").unwrap();
    let issues = config.validate();
    assert!(issues
        .iter()
        .any(|i| i.severity == ConfigSeverity::Error && i.field == "agent.command"));
}

#[test]
fn zero_port_is_a_validation_error() {
    let config: Config = toml::from_str("[server]\nport = 0\n").unwrap();
    let issues = config.validate();
    assert!(issues
        .iter()
        .any(|i| i.severity == ConfigSeverity::Error && i.field == "server.port"));
}

#[test]
fn hub_disabled_by_default_with_warning() {
    let config = Config::default();
    assert!(!config.hub.enabled());
    let issues = config.validate();
    assert!(issues
        .iter()
        .any(|i| i.severity == ConfigSeverity::Warning && i.field == "hub.base_url"));
}

#[test]
fn scheduler_defaults_to_utc_minute_tick() {
    let config = Config::default();
    assert!(config.scheduler.enabled);
    assert_eq!(config.scheduler.tick_sec, 60);
    assert_eq!(config.scheduler.timezone, "UTC");
}
