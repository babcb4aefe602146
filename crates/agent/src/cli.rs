//! The adapter entry point: one prompt in, one event stream out.

use std::pin::Pin;
use std::time::Duration;

use futures_core::Stream;

use valet_domain::config::AgentConfig;
use valet_domain::error::{Error, Result};
use valet_domain::event::CliEvent;

use crate::channel::{self, ChannelMsg};
use crate::decode::LineDecoder;

/// A boxed async stream of decoded CLI events.
pub type EventStream = Pin<Box<dyn Stream<Item = Result<CliEvent>> + Send + 'static>>;

/// Adapter over the external agent CLI.
///
/// Stateless apart from config; cheap to clone and share.
#[derive(Debug, Clone)]
pub struct AgentCli {
    config: AgentConfig,
}

impl AgentCli {
    pub fn new(config: AgentConfig) -> Self {
        Self { config }
    }

    /// Spawn one agent session for `prompt` and stream its events.
    ///
    /// The stream ends at the `result` sentinel, at process exit, or at
    /// the generation-timeout budget. A non-zero exit after the output
    /// drains surfaces as [`Error::Process`]. Dropping the stream early
    /// terminates the process (graceful, then force-killed after the
    /// configured grace period).
    pub fn stream(&self, prompt: &str) -> EventStream {
        let config = self.config.clone();
        let prompt = prompt.to_owned();

        let stream: EventStream = Box::pin(async_stream::try_stream! {
            let deadline =
                tokio::time::Instant::now() + Duration::from_secs(config.timeout_sec);

            let mut handle = channel::spawn(&config, &prompt)?;
            let mut decoder = LineDecoder::new();
            let mut exit = None;

            loop {
                let msg = tokio::select! {
                    msg = handle.messages.recv() => Ok(msg),
                    _ = tokio::time::sleep_until(deadline) => Err(Error::Timeout(format!(
                        "agent produced no result within {}s",
                        config.timeout_sec
                    ))),
                }?;

                match msg {
                    Some(ChannelMsg::Chunk(chunk)) => {
                        for event in decoder.push(&chunk) {
                            let done = matches!(event, CliEvent::Result);
                            yield event;
                            if done {
                                return;
                            }
                        }
                    }
                    Some(ChannelMsg::Exit(info)) => exit = Some(info),
                    None => break,
                }
            }

            for event in decoder.finish() {
                let done = matches!(event, CliEvent::Result);
                yield event;
                if done {
                    return;
                }
            }

            // Output drained without a result sentinel: a non-zero exit
            // is a process failure, a clean exit just ends the sequence.
            if let Some(info) = exit {
                if !info.success {
                    Err(Error::Process {
                        code: info.code.unwrap_or(-1),
                    })?;
                }
            }
        });
        stream
    }
}
