//! Browser launchers.

use crate::domain::config::BrowserConfig;
use crate::domain::error::{RelayError, RelayResult};
use crate::ports::BrowserLauncher;
use async_trait::async_trait;
use parking_lot::Mutex;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info};

/// Opens the page with a configured executable or the platform opener.
#[derive(Debug, Clone, Default)]
pub struct SystemBrowser {
    executable: Option<String>,
    profile: Option<String>,
}

impl SystemBrowser {
    pub fn new(config: &BrowserConfig) -> Self {
        Self {
            executable: config.executable.clone(),
            profile: config.profile.clone(),
        }
    }

    /// Program and arguments that open `url`.
    pub fn command_line(&self, url: &str) -> (String, Vec<String>) {
        match &self.executable {
            Some(executable) => {
                let mut args = Vec::new();
                if let Some(profile) = &self.profile {
                    args.extend(profile_args(executable, profile));
                }
                args.push(url.to_string());
                (executable.clone(), args)
            }
            None => platform_opener(url),
        }
    }
}

fn profile_args(executable: &str, profile: &str) -> Vec<String> {
    if executable.to_lowercase().contains("firefox") {
        vec!["-P".to_string(), profile.to_string()]
    } else {
        vec![format!("--profile-directory={profile}")]
    }
}

fn platform_opener(url: &str) -> (String, Vec<String>) {
    if cfg!(target_os = "macos") {
        ("open".to_string(), vec![url.to_string()])
    } else if cfg!(target_os = "windows") {
        (
            "cmd".to_string(),
            vec!["/C".into(), "start".into(), String::new(), url.to_string()],
        )
    } else {
        ("xdg-open".to_string(), vec![url.to_string()])
    }
}

#[async_trait]
impl BrowserLauncher for SystemBrowser {
    async fn launch(&self, url: &str) -> RelayResult<()> {
        let (program, args) = self.command_line(url);
        debug!(program = %program, args = ?args, "Launching browser");

        Command::new(&program)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::null())
            .spawn()
            .map_err(|e| RelayError::BrowserLaunch(format!("{program}: {e}")))?;

        info!(url = url, "Opened signer page");
        Ok(())
    }
}

/// Leaves opening the page to the user; the URL is only logged.
#[derive(Debug, Default)]
pub struct ManualBrowser {
    last_url: Mutex<Option<String>>,
}

impl ManualBrowser {
    pub fn new() -> Self {
        Self::default()
    }

    /// URL of the most recent launch request.
    pub fn last_url(&self) -> Option<String> {
        self.last_url.lock().clone()
    }
}

#[async_trait]
impl BrowserLauncher for ManualBrowser {
    async fn launch(&self, url: &str) -> RelayResult<()> {
        info!(url = url, "Open the signer page in a browser with the wallet extension");
        *self.last_url.lock() = Some(url.to_string());
        Ok(())
    }
}
