use std::process::Stdio;

use anyhow::{Context, Result};
use tokio::process::Command;
use tokio::task::JoinHandle;
use tracing::warn;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SiteLink {
    pub label: &'static str,
    pub url: &'static str,
    pub icon: &'static str,
}

pub const SIDEBAR_TITLE: &str = "BIT Websites";

pub const SITE_LINKS: [SiteLink; 5] = [
    SiteLink { label: "Home", url: "https://www.bitsathy.ac.in", icon: "⌂" },
    SiteLink { label: "Wiki Page", url: "https://www.wiki.bitsathy.ac.in", icon: "📖" },
    SiteLink { label: "Camps", url: "https://www.camps.bitsathy.ac.in", icon: "👤" },
    SiteLink { label: "BIP Dashboard", url: "https://www.bip.bitsathy.ac.in", icon: "▦" },
    SiteLink { label: "PS Portal", url: "https://www.ps.bitsathy.ac.in", icon: "📊" },
];

/// Hand a URL to the desktop's default opener without waiting for it.
/// Must be called from within a tokio runtime.
pub fn open_in_browser(url: &str) -> Result<JoinHandle<()>> {
    if cfg!(target_os = "macos") {
        open_with("open", &[], url)
    } else if cfg!(target_os = "windows") {
        open_with("cmd", &["/C", "start", ""], url)
    } else {
        open_with("xdg-open", &[], url)
    }
}

/// Spawn `program args.. url` and reap it in the background.
fn open_with(program: &str, args: &[&str], url: &str) -> Result<JoinHandle<()>> {
    let mut child = Command::new(program)
        .args(args)
        .arg(url)
        .stdin(Stdio::null())
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .spawn()
        .with_context(|| format!("failed to open {} with {}", url, program))?;

    let url = url.to_string();
    Ok(tokio::spawn(async move {
        match child.wait().await {
            Ok(status) if !status.success() => {
                warn!(url = %url, %status, "link opener exited with an error");
            }
            Ok(_) => {}
            Err(e) => warn!(url = %url, error = %e, "could not wait for link opener"),
        }
    }))
}
