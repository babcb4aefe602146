//! Integration tests for the adapter against a real subprocess.
//!
//! The agent command is swapped for `sh` so the tests control exactly
//! what appears on the output stream. The configured args end with a
//! dummy `$0`, so the prompt (always appended as the final positional
//! argument) lands in `$1` and is ignored by the scripts.

#![cfg(unix)]

use futures_util::StreamExt;

use valet_agent::AgentCli;
use valet_domain::config::{AgentConfig, ChannelMode};
use valet_domain::error::Error;
use valet_domain::event::CliEvent;

fn sh_agent(script: &str) -> AgentCli {
    AgentCli::new(AgentConfig {
        command: "sh".into(),
        args: vec!["-c".into(), script.into(), "valet-test".into()],
        workdir: None,
        channel: ChannelMode::Pipe,
        timeout_sec: 30,
        kill_grace_sec: 5,
    })
}

#[tokio::test]
async fn streams_events_in_order_and_stops_at_result() {
    let script = r#"
echo '{"type":"assistant","message":{"content":[{"type":"text","text":"hello"}]}}'
echo 'Loading model...'
echo '{"type":"result","subtype":"success"}'
echo '{"type":"assistant","message":{"content":[{"type":"text","text":"after"}]}}'
"#;
    let mut stream = sh_agent(script).stream("ignored");

    let mut events = Vec::new();
    while let Some(item) = stream.next().await {
        events.push(item.expect("no error expected"));
    }

    assert_eq!(events.len(), 3);
    assert!(matches!(events[0], CliEvent::Assistant(_)));
    assert!(matches!(events[1], CliEvent::Raw { .. }));
    assert_eq!(events[2], CliEvent::Result);
    // Nothing after the sentinel is surfaced.
}

#[tokio::test]
async fn nonzero_exit_without_result_is_a_process_failure() {
    let script = r#"
echo '{"type":"system","session_id":"s1"}'
exit 3
"#;
    let mut stream = sh_agent(script).stream("ignored");

    let first = stream.next().await.unwrap().unwrap();
    assert_eq!(
        first,
        CliEvent::Other {
            kind: "system".into()
        }
    );

    let err = stream.next().await.unwrap().unwrap_err();
    match err {
        Error::Process { code } => assert_eq!(code, 3),
        other => panic!("expected process failure, got {other}"),
    }
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn clean_exit_without_result_just_ends_the_stream() {
    let script = r#"echo '{"type":"assistant","message":{"content":[]}}'"#;
    let mut stream = sh_agent(script).stream("ignored");

    assert!(matches!(
        stream.next().await.unwrap().unwrap(),
        CliEvent::Assistant(_)
    ));
    assert!(stream.next().await.is_none());
}

#[tokio::test]
async fn dropping_the_stream_terminates_the_process() {
    let marker = std::env::temp_dir().join(format!("valet-term-{}", uuid::Uuid::new_v4()));
    let script = format!(
        r#"
trap 'touch {marker}; exit 0' TERM
echo '{{"type":"assistant","message":{{"content":[]}}}}'
sleep 30 &
wait
"#,
        marker = marker.display()
    );

    let mut stream = sh_agent(&script).stream("ignored");
    // Consume one event, then abandon the stream mid-turn.
    assert!(stream.next().await.unwrap().is_ok());
    drop(stream);

    // The termination sequence must reach the child within the grace
    // period (5s) plus scheduling slack.
    let mut terminated = false;
    for _ in 0..40 {
        if marker.exists() {
            terminated = true;
            break;
        }
        tokio::time::sleep(std::time::Duration::from_millis(250)).await;
    }
    let _ = std::fs::remove_file(&marker);
    assert!(terminated, "agent process was not terminated after drop");
}

#[tokio::test]
async fn generation_timeout_fails_the_stream() {
    let agent_config = AgentConfig {
        command: "sh".into(),
        args: vec!["-c".into(), "sleep 30".into(), "valet-test".into()],
        workdir: None,
        channel: ChannelMode::Pipe,
        timeout_sec: 1,
        kill_grace_sec: 1,
    };

    let mut stream = AgentCli::new(agent_config).stream("ignored");
    let err = stream.next().await.unwrap().unwrap_err();
    assert!(matches!(err, Error::Timeout(_)));
    assert!(stream.next().await.is_none());
}
