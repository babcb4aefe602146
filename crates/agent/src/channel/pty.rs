//! Pseudo-terminal channel via `portable-pty`.
//!
//! The pty API is blocking, so reading and reaping happen on dedicated
//! threads that feed the same async channel shape as the pipe path.
//! stdout and stderr arrive pre-combined — that is the nature of a pty.

use std::io::Read;
use std::time::Duration;

use portable_pty::{native_pty_system, CommandBuilder, PtySize};
use tokio::sync::{mpsc, oneshot};
use tokio_util::sync::CancellationToken;

use valet_domain::config::AgentConfig;
use valet_domain::error::{Error, Result};

use super::{ChannelHandle, ChannelMsg, ExitInfo, Terminator};

pub fn spawn(config: &AgentConfig, argv: &[String]) -> Result<ChannelHandle> {
    let pty_system = native_pty_system();
    let pair = pty_system
        .openpty(PtySize {
            rows: 24,
            cols: 80,
            pixel_width: 0,
            pixel_height: 0,
        })
        .map_err(|e| Error::Other(format!("openpty: {e}")))?;

    let mut cmd = CommandBuilder::new(&config.command);
    for arg in argv {
        cmd.arg(arg);
    }
    if let Some(ref wd) = config.workdir {
        cmd.cwd(wd);
    }

    let mut child = pair
        .slave
        .spawn_command(cmd)
        .map_err(|e| Error::Other(format!("spawning agent on pty: {e}")))?;
    // The parent keeps only the master side.
    drop(pair.slave);

    let mut reader = pair
        .master
        .try_clone_reader()
        .map_err(|e| Error::Other(format!("cloning pty reader: {e}")))?;

    let pid = child.process_id();
    let mut killer = child.clone_killer();

    tracing::debug!(command = %config.command, pid = ?pid, "agent process spawned (pty channel)");

    let (tx, rx) = mpsc::channel::<ChannelMsg>(64);
    let token = CancellationToken::new();

    // Reader thread: raw chunks until the slave side closes (read errors
    // with EIO on most platforms once the child is gone).
    let reader_tx = tx.clone();
    let (reader_done_tx, reader_done_rx) = oneshot::channel::<()>();
    std::thread::spawn(move || {
        let mut buf = [0u8; 1024];
        loop {
            match reader.read(&mut buf) {
                Ok(0) | Err(_) => break,
                Ok(n) => {
                    if reader_tx
                        .blocking_send(ChannelMsg::Chunk(buf[..n].to_vec()))
                        .is_err()
                    {
                        break;
                    }
                }
            }
        }
        let _ = reader_done_tx.send(());
    });

    // Wait thread: reap the child, report through a oneshot.
    let (exit_tx, mut exit_rx) = oneshot::channel::<ExitInfo>();
    std::thread::spawn(move || {
        let info = match child.wait() {
            Ok(status) => ExitInfo {
                code: Some(status.exit_code() as i32),
                success: status.success(),
            },
            Err(_) => ExitInfo {
                code: None,
                success: false,
            },
        };
        let _ = exit_tx.send(info);
    });

    // Supervisor: forwards the exit, runs the termination sequence on
    // cancellation, and keeps the master alive until the child is gone
    // (dropping it earlier would tear the pty out from under the child).
    let master = pair.master;
    let grace = Duration::from_secs(config.kill_grace_sec);
    let monitor_token = token.clone();

    tokio::spawn(async move {
        let info = tokio::select! {
            res = &mut exit_rx => res.unwrap_or(ExitInfo { code: None, success: false }),
            _ = monitor_token.cancelled() => {
                #[cfg(unix)]
                if let Some(pid) = pid {
                    // SAFETY: pid came from a live child we own.
                    unsafe {
                        libc::kill(pid as libc::pid_t, libc::SIGTERM);
                    }
                }
                match tokio::time::timeout(grace, &mut exit_rx).await {
                    Ok(res) => res.unwrap_or(ExitInfo { code: None, success: false }),
                    Err(_) => {
                        tracing::warn!("agent process ignored termination — force-killing");
                        let _ = killer.kill();
                        exit_rx.await.unwrap_or(ExitInfo { code: None, success: false })
                    }
                }
            }
        };

        // Releasing the master unblocks the reader thread; flush its
        // trailing chunks before announcing exit.
        drop(master);
        let _ = reader_done_rx.await;

        tracing::debug!(code = ?info.code, "agent process reaped");
        let _ = tx.send(ChannelMsg::Exit(info)).await;
    });

    Ok(ChannelHandle::new(rx, Terminator::new(token)))
}
