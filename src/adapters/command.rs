//! `wget` and ImageMagick `convert` wrappers implementing the localization ports.

use crate::config::settings::LocalizeSettings;
use crate::domain::ports::{BrowseRenderer, Localizer};
use crate::utils::error::{IngestError, Result};
use async_trait::async_trait;
use std::ffi::OsStr;
use std::path::Path;
use std::process::Stdio;
use std::time::Duration;
use tokio::process::Command;

/// Only the tail of stderr is kept in errors; wget progress output is long.
const STDERR_TAIL_BYTES: usize = 2048;

fn stderr_tail(stderr: &[u8]) -> String {
    let start = stderr.len().saturating_sub(STDERR_TAIL_BYTES);
    String::from_utf8_lossy(&stderr[start..]).trim().to_string()
}

async fn run_tool(program: &str, args: &[&OsStr], timeout: Duration) -> Result<()> {
    let mut cmd = Command::new(program);
    cmd.args(args)
        .stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped())
        .kill_on_drop(true);

    tracing::debug!("running {} {:?}", program, args);
    let child = cmd.spawn()?;

    // 逾時時 child 被 drop，kill_on_drop 會終止子行程
    match tokio::time::timeout(timeout, child.wait_with_output()).await {
        Ok(Ok(output)) if output.status.success() => Ok(()),
        Ok(Ok(output)) => Err(IngestError::CommandFailed {
            program: program.to_string(),
            status: output.status.code(),
            stderr: stderr_tail(&output.stderr),
        }),
        Ok(Err(e)) => Err(e.into()),
        Err(_) => Err(IngestError::CommandTimeout {
            program: program.to_string(),
            seconds: timeout.as_secs(),
        }),
    }
}

#[derive(Debug, Clone)]
pub struct WgetLocalizer {
    program: String,
    timeout: Duration,
}

impl WgetLocalizer {
    pub fn new(settings: &LocalizeSettings) -> Self {
        Self {
            program: settings.wget.clone(),
            timeout: Duration::from_secs(settings.timeout_seconds),
        }
    }
}

#[async_trait]
impl Localizer for WgetLocalizer {
    async fn fetch_file(&self, url: &str, dest: &Path) -> Result<()> {
        let args = [
            OsStr::new("--no-check-certificate"),
            OsStr::new("-O"),
            dest.as_os_str(),
            OsStr::new(url),
        ];
        if let Err(e) = run_tool(&self.program, &args, self.timeout).await {
            // wget -O leaves an empty file behind on failure
            if dest.exists() {
                if let Err(rm) = std::fs::remove_file(dest) {
                    tracing::warn!("could not remove partial download {}: {}", dest.display(), rm);
                }
            }
            return Err(e);
        }

        if !dest.exists() {
            return Err(IngestError::CommandFailed {
                program: self.program.clone(),
                status: Some(0),
                stderr: format!(
                    "unable to localize products from url: {} to {}",
                    url,
                    dest.display()
                ),
            });
        }
        tracing::info!("localized products from url: {} to {}", url, dest.display());
        Ok(())
    }

    async fn fetch_listing(&self, url: &str, suffix: &str, dest_dir: &Path) -> Result<()> {
        let args = [
            OsStr::new("-r"),
            OsStr::new("-np"),
            OsStr::new("-nd"),
            OsStr::new("-A"),
            OsStr::new(suffix),
            OsStr::new(url),
            OsStr::new("-P"),
            dest_dir.as_os_str(),
        ];
        run_tool(&self.program, &args, self.timeout).await?;

        if !dest_dir.is_dir() {
            return Err(IngestError::CommandFailed {
                program: self.program.clone(),
                status: Some(0),
                stderr: format!(
                    "unable to localize products from url: {} to {}",
                    url,
                    dest_dir.display()
                ),
            });
        }
        tracing::info!("localized products from url: {} to {}", url, dest_dir.display());
        Ok(())
    }
}

#[derive(Debug, Clone)]
pub struct ConvertRenderer {
    program: String,
    small_size: String,
    timeout: Duration,
}

impl ConvertRenderer {
    pub fn new(settings: &LocalizeSettings) -> Self {
        Self {
            program: settings.convert.clone(),
            small_size: settings.browse_size.clone(),
            timeout: Duration::from_secs(settings.timeout_seconds),
        }
    }
}

#[async_trait]
impl BrowseRenderer for ConvertRenderer {
    async fn render(&self, source: &Path, browse: &Path, browse_small: &Path) -> Result<()> {
        run_tool(
            &self.program,
            &[source.as_os_str(), browse.as_os_str()],
            self.timeout,
        )
        .await?;
        run_tool(
            &self.program,
            &[
                source.as_os_str(),
                OsStr::new("-resize"),
                OsStr::new(&self.small_size),
                browse_small.as_os_str(),
            ],
            self.timeout,
        )
        .await
    }
}

#[cfg(all(test, unix))]
mod tests {
    use super::*;
    use std::os::unix::fs::PermissionsExt;
    use tempfile::TempDir;

    /// A stand-in `wget` that writes "data" to the path following `-O`.
    fn fake_wget(dir: &Path) -> String {
        let script = dir.join("fake-wget");
        std::fs::write(
            &script,
            "#!/bin/sh\nwhile [ $# -gt 0 ]; do\n  if [ \"$1\" = \"-O\" ]; then echo data > \"$2\"; fi\n  shift\ndone\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        script.display().to_string()
    }

    fn settings(wget: &str) -> LocalizeSettings {
        LocalizeSettings {
            wget: wget.to_string(),
            timeout_seconds: 10,
            ..LocalizeSettings::default()
        }
    }

    #[tokio::test]
    async fn test_fetch_file_writes_destination() {
        let dir = TempDir::new().unwrap();
        let localizer = WgetLocalizer::new(&settings(&fake_wget(dir.path())));
        let dest = dir.path().join("PROD.hdf");

        localizer
            .fetch_file("https://ava.example/data/PROD.hdf", &dest)
            .await
            .unwrap();

        assert_eq!(std::fs::read_to_string(&dest).unwrap().trim(), "data");
    }

    #[tokio::test]
    async fn test_failing_tool_reports_status() {
        let dir = TempDir::new().unwrap();
        let localizer = WgetLocalizer::new(&settings("false"));

        let err = localizer
            .fetch_file("https://ava.example/missing.hdf", &dir.path().join("x.hdf"))
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::CommandFailed { status: Some(1), .. }));
    }

    #[tokio::test]
    async fn test_failed_download_removes_partial_file() {
        let dir = TempDir::new().unwrap();
        // 像 wget 一樣先建立空檔再失敗
        let script = dir.path().join("broken-wget");
        std::fs::write(
            &script,
            "#!/bin/sh\nwhile [ $# -gt 0 ]; do\n  if [ \"$1\" = \"-O\" ]; then : > \"$2\"; fi\n  shift\ndone\nexit 8\n",
        )
        .unwrap();
        std::fs::set_permissions(&script, std::fs::Permissions::from_mode(0o755)).unwrap();
        let localizer = WgetLocalizer::new(&settings(&script.display().to_string()));
        let dest = dir.path().join("PROD.hdf");

        let err = localizer
            .fetch_file("https://ava.example/data/PROD.hdf", &dest)
            .await
            .unwrap_err();

        assert!(matches!(err, IngestError::CommandFailed { status: Some(8), .. }));
        assert!(!dest.exists());
    }

    #[tokio::test]
    async fn test_missing_binary_is_io_error() {
        let localizer = WgetLocalizer::new(&settings("/nonexistent/bin/wget"));
        let err = localizer
            .fetch_listing("https://e4ftl01.example/", ".met", Path::new("Downloads"))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::IoError(_)));
    }

    #[tokio::test]
    async fn test_slow_tool_times_out() {
        let err = run_tool("sleep", &[OsStr::new("5")], Duration::from_millis(200))
            .await
            .unwrap_err();
        assert!(matches!(err, IngestError::CommandTimeout { .. }));
    }
}
