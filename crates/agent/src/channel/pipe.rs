//! Pipe-backed channel: `tokio::process` with stdout and stderr piped
//! and merged into one chunk stream.

use std::process::Stdio;
use std::time::Duration;

use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;

use valet_domain::config::AgentConfig;
use valet_domain::error::{Error, Result};

use super::{ChannelHandle, ChannelMsg, ExitInfo, Terminator};

pub fn spawn(config: &AgentConfig, argv: &[String]) -> Result<ChannelHandle> {
    let mut cmd = Command::new(&config.command);
    cmd.args(argv)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    if let Some(ref wd) = config.workdir {
        cmd.current_dir(wd);
    }

    let mut child = cmd.spawn().map_err(Error::Io)?;

    tracing::debug!(
        command = %config.command,
        pid = ?child.id(),
        "agent process spawned (pipe channel)"
    );

    let (tx, rx) = mpsc::channel::<ChannelMsg>(64);
    let token = CancellationToken::new();

    // Reader tasks own the pipe handles and end at EOF.
    let stdout = child.stdout.take();
    let stderr = child.stderr.take();
    let stdout_task = spawn_reader(stdout, tx.clone());
    let stderr_task = spawn_reader(stderr, tx.clone());

    let grace = Duration::from_secs(config.kill_grace_sec);
    let monitor_token = token.clone();

    tokio::spawn(async move {
        let info = tokio::select! {
            res = child.wait() => match res {
                Ok(status) => ExitInfo {
                    code: status.code(),
                    success: status.success(),
                },
                Err(e) => {
                    tracing::warn!(error = %e, "waiting on agent process failed");
                    ExitInfo { code: None, success: false }
                }
            },
            _ = monitor_token.cancelled() => terminate(&mut child, grace).await,
        };

        // Flush whatever the readers still hold before announcing exit.
        let _ = stdout_task.await;
        let _ = stderr_task.await;

        tracing::debug!(code = ?info.code, "agent process reaped");
        let _ = tx.send(ChannelMsg::Exit(info)).await;
    });

    Ok(ChannelHandle::new(rx, Terminator::new(token)))
}

fn spawn_reader<R>(
    source: Option<R>,
    tx: mpsc::Sender<ChannelMsg>,
) -> tokio::task::JoinHandle<()>
where
    R: tokio::io::AsyncRead + Unpin + Send + 'static,
{
    tokio::spawn(async move {
        let Some(mut source) = source else { return };
        let mut buf = [0u8; 1024];
        loop {
            match source.read(&mut buf).await {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if tx.send(ChannelMsg::Chunk(buf[..n].to_vec())).await.is_err() {
                        break;
                    }
                }
            }
        }
    })
}

/// Graceful-then-forced termination: SIGTERM (unix), wait out the grace
/// period, then SIGKILL. Always reaps the child.
async fn terminate(child: &mut Child, grace: Duration) -> ExitInfo {
    #[cfg(unix)]
    if let Some(pid) = child.id() {
        // SAFETY: pid came from a live child we own.
        unsafe {
            libc::kill(pid as libc::pid_t, libc::SIGTERM);
        }
    }
    #[cfg(not(unix))]
    {
        let _ = child.start_kill();
    }

    match tokio::time::timeout(grace, child.wait()).await {
        Ok(Ok(status)) => ExitInfo {
            code: status.code(),
            success: status.success(),
        },
        Ok(Err(_)) | Err(_) => {
            tracing::warn!("agent process ignored termination — force-killing");
            let _ = child.kill().await;
            ExitInfo {
                code: None,
                success: false,
            }
        }
    }
}
