//! Reclaims a listen port held by another process.

use crate::domain::error::{RelayError, RelayResult};
use crate::ports::PortReleaser;
use async_trait::async_trait;
use tokio::process::Command;
use tracing::{info, warn};

/// Finds listeners with `lsof` (or `netstat` on Windows) and kills them.
#[derive(Debug, Clone, Copy, Default)]
pub struct KillPortReleaser;

impl KillPortReleaser {
    async fn listeners(port: u16) -> RelayResult<Vec<u32>> {
        let lookup = if cfg!(windows) {
            Command::new("netstat").args(["-ano", "-p", "tcp"]).output().await
        } else {
            Command::new("lsof")
                .args(["-ti", &format!("tcp:{port}"), "-sTCP:LISTEN"])
                .output()
                .await
        };
        let output = lookup.map_err(|e| RelayError::Bind {
            addr: format!("port {port}"),
            reason: format!("cannot look up port owner: {e}"),
        })?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(if cfg!(windows) {
            parse_netstat(&stdout, port)
        } else {
            parse_pids(&stdout)
        })
    }
}

#[async_trait]
impl PortReleaser for KillPortReleaser {
    async fn release(&self, port: u16) -> RelayResult<usize> {
        let pids = Self::listeners(port).await?;
        let own = std::process::id();
        let mut killed = 0;

        for pid in pids.into_iter().filter(|pid| *pid != own) {
            let status = if cfg!(windows) {
                Command::new("taskkill")
                    .args(["/PID", &pid.to_string(), "/F"])
                    .status()
                    .await
            } else {
                Command::new("kill").args(["-9", &pid.to_string()]).status().await
            };
            match status {
                Ok(status) if status.success() => killed += 1,
                Ok(status) => warn!(pid = pid, status = %status, "Failed to kill port owner"),
                Err(e) => warn!(pid = pid, error = %e, "Failed to kill port owner"),
            }
        }

        info!(port = port, killed = killed, "Released port");
        Ok(killed)
    }
}

fn parse_pids(output: &str) -> Vec<u32> {
    let mut pids: Vec<u32> = output
        .lines()
        .filter_map(|line| line.trim().parse().ok())
        .collect();
    pids.sort_unstable();
    pids.dedup();
    pids
}

fn parse_netstat(output: &str, port: u16) -> Vec<u32> {
    let suffix = format!(":{port}");
    let mut pids: Vec<u32> = output
        .lines()
        .filter_map(|line| {
            let cols: Vec<&str> = line.split_whitespace().collect();
            match cols.as_slice() {
                [_, local, _, state, pid] if local.ends_with(&suffix) && *state == "LISTENING" => {
                    pid.parse().ok()
                }
                _ => None,
            }
        })
        .collect();
    pids.sort_unstable();
    pids.dedup();
    pids
}
