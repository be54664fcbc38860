use std::path::{Path, PathBuf};
use std::process::{ExitStatus, Stdio};
use std::time::{Duration, Instant};

use async_trait::async_trait;
use docket_core::{DocketError, RendererConfig, Result};
use tokio::io::AsyncReadExt;
use tokio::process::{Child, Command};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

/// Maximum amount of renderer stderr kept for error reports (1 MB).
const MAX_STDERR_BYTES: u64 = 1_048_576;

const LOCAL_FILE_ACCESS_FLAG: &str = "--enable-local-file-access";

const DEFAULT_PROGRAM: &str = "wkhtmltopdf";

#[cfg(target_os = "windows")]
const WELL_KNOWN_LOCATIONS: &[&str] = &[
    r"C:\Program Files\wkhtmltopdf\bin\wkhtmltopdf.exe",
    r"C:\Program Files (x86)\wkhtmltopdf\bin\wkhtmltopdf.exe",
];

#[cfg(target_os = "macos")]
const WELL_KNOWN_LOCATIONS: &[&str] = &[
    "/usr/local/bin/wkhtmltopdf",
    "/opt/homebrew/bin/wkhtmltopdf",
];

#[cfg(not(any(target_os = "windows", target_os = "macos")))]
const WELL_KNOWN_LOCATIONS: &[&str] = &["/usr/bin/wkhtmltopdf", "/usr/local/bin/wkhtmltopdf"];

// ---------------------------------------------------------------------------
// PdfRenderer trait
// ---------------------------------------------------------------------------

/// Converts a complete HTML document into PDF bytes.
#[async_trait]
pub trait PdfRenderer: Send + Sync {
    /// Render `html`. Implementations must stop and return
    /// [`DocketError::Cancelled`] once `cancel` fires.
    async fn render(&self, html: &str, cancel: &CancellationToken) -> Result<Vec<u8>>;
}

// ---------------------------------------------------------------------------
// WkhtmltopdfRenderer
// ---------------------------------------------------------------------------

/// Renders through an external `wkhtmltopdf`-compatible executable invoked as
/// `<program> [extra args] [--enable-local-file-access] <input.html> <output.pdf>`.
#[derive(Debug, Clone)]
pub struct WkhtmltopdfRenderer {
    executable: Option<PathBuf>,
    timeout: Duration,
    enable_local_file_access: bool,
    extra_args: Vec<String>,
}

impl Default for WkhtmltopdfRenderer {
    fn default() -> Self {
        Self::from_config(&RendererConfig::default())
    }
}

impl WkhtmltopdfRenderer {
    pub fn from_config(config: &RendererConfig) -> Self {
        Self {
            executable: config.executable.clone(),
            timeout: Duration::from_secs(config.timeout_secs),
            enable_local_file_access: config.enable_local_file_access,
            extra_args: config.extra_args.clone(),
        }
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn timeout(&self) -> Duration {
        self.timeout
    }

    /// The executable that will be spawned for the next render.
    pub fn program(&self) -> PathBuf {
        match &self.executable {
            Some(path) => path.clone(),
            None => resolve_executable(WELL_KNOWN_LOCATIONS),
        }
    }

    fn build_command(&self, program: &Path, input: &Path, output: &Path) -> Command {
        let mut cmd = Command::new(program);
        cmd.args(&self.extra_args);
        if self.enable_local_file_access {
            cmd.arg(LOCAL_FILE_ACCESS_FLAG);
        }
        cmd.arg(input)
            .arg(output)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true);

        #[cfg(target_os = "windows")]
        {
            const CREATE_NO_WINDOW: u32 = 0x0800_0000;
            cmd.creation_flags(CREATE_NO_WINDOW);
        }

        cmd
    }
}

enum Outcome {
    Exited(std::io::Result<(ExitStatus, String)>),
    TimedOut,
    Cancelled,
}

#[async_trait]
impl PdfRenderer for WkhtmltopdfRenderer {
    async fn render(&self, html: &str, cancel: &CancellationToken) -> Result<Vec<u8>> {
        // Both temp files live in one per-call directory; dropping it removes
        // them on every return path and ignores files that are already gone.
        let workdir = tempfile::Builder::new().prefix("docket-render-").tempdir()?;
        let input = workdir.path().join("input.html");
        let output = workdir.path().join("output.pdf");

        tokio::fs::write(&input, html.as_bytes()).await?;

        let program = self.program();
        debug!(
            program = %program.display(),
            input = %input.display(),
            timeout_secs = self.timeout.as_secs(),
            "starting renderer"
        );

        let mut child = self
            .build_command(&program, &input, &output)
            .spawn()
            .map_err(|source| DocketError::RendererUnavailable {
                program: program.display().to_string(),
                source,
            })?;

        let start = Instant::now();

        let outcome = tokio::select! {
            res = tokio::time::timeout(self.timeout, wait_with_stderr(&mut child)) => match res {
                Ok(exited) => Outcome::Exited(exited),
                Err(_) => Outcome::TimedOut,
            },
            _ = cancel.cancelled() => Outcome::Cancelled,
        };

        let (status, stderr) = match outcome {
            Outcome::Exited(exited) => exited?,
            Outcome::TimedOut => {
                warn!(program = %program.display(), "renderer timed out, killing process");
                let _ = child.kill().await;
                return Err(DocketError::TimedOut(self.timeout));
            }
            Outcome::Cancelled => {
                warn!(program = %program.display(), "render cancelled, killing process");
                let _ = child.kill().await;
                return Err(DocketError::Cancelled);
            }
        };

        if !status.success() {
            let exit_code = status.code().unwrap_or(-1);
            warn!(exit_code, stderr = %stderr.trim(), "renderer failed");
            return Err(DocketError::RendererFailure { exit_code, stderr });
        }

        let bytes = tokio::fs::read(&output).await?;
        info!(
            bytes = bytes.len(),
            elapsed_ms = start.elapsed().as_millis() as u64,
            "rendered PDF"
        );

        Ok(bytes)
    }
}

// ---------------------------------------------------------------------------
// Helpers
// ---------------------------------------------------------------------------

/// Drain stderr, then wait for exit. stdout is not piped, so reading stderr
/// to EOF cannot block on a full stdout pipe.
///
/// Only the first [`MAX_STDERR_BYTES`] are kept; the rest is read and
/// discarded so a chatty converter never stalls on a full pipe.
async fn wait_with_stderr(child: &mut Child) -> std::io::Result<(ExitStatus, String)> {
    let mut stderr_buf = Vec::new();
    if let Some(mut err) = child.stderr.take() {
        (&mut err)
            .take(MAX_STDERR_BYTES)
            .read_to_end(&mut stderr_buf)
            .await?;
        tokio::io::copy(&mut err, &mut tokio::io::sink()).await?;
    }
    let status = child.wait().await?;
    Ok((status, String::from_utf8_lossy(&stderr_buf).into_owned()))
}

/// First existing path from `candidates`, otherwise the bare program name so
/// the OS resolves it from `PATH`.
pub fn resolve_executable(candidates: &[&str]) -> PathBuf {
    candidates
        .iter()
        .map(PathBuf::from)
        .find(|path| path.is_file())
        .unwrap_or_else(|| PathBuf::from(DEFAULT_PROGRAM))
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_resolve_prefers_existing_candidate() {
        let dir = tempfile::tempdir().unwrap();
        let exe = dir.path().join("wkhtmltopdf");
        std::fs::write(&exe, b"").unwrap();
        let missing = dir.path().join("missing");

        let candidates = [missing.to_str().unwrap(), exe.to_str().unwrap()];
        assert_eq!(resolve_executable(&candidates), exe);
    }

    #[test]
    fn test_resolve_falls_back_to_path_lookup() {
        let resolved = resolve_executable(&["/no/such/dir/wkhtmltopdf"]);
        assert_eq!(resolved, PathBuf::from("wkhtmltopdf"));
    }

    #[test]
    fn test_configured_executable_wins() {
        let config = RendererConfig {
            executable: Some(PathBuf::from("/opt/render/bin/topdf")),
            ..RendererConfig::default()
        };
        let renderer = WkhtmltopdfRenderer::from_config(&config);
        assert_eq!(renderer.program(), PathBuf::from("/opt/render/bin/topdf"));
        assert_eq!(renderer.timeout(), Duration::from_secs(60));
    }

    #[tokio::test]
    async fn test_missing_executable_is_unavailable() {
        let config = RendererConfig {
            executable: Some(PathBuf::from("/no/such/dir/wkhtmltopdf-docket-test")),
            ..RendererConfig::default()
        };
        let renderer = WkhtmltopdfRenderer::from_config(&config);
        let err = renderer
            .render("<p>hi</p>", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(
            matches!(err, DocketError::RendererUnavailable { .. }),
            "got: {err}"
        );
    }

    // The converter is stood in for by `sh -c <script>`; with the local file
    // access flag enabled the script sees `$1 = flag`, `$2 = input`,
    // `$3 = output`.
    #[cfg(unix)]
    fn shell_renderer(script: &str) -> WkhtmltopdfRenderer {
        WkhtmltopdfRenderer::from_config(&RendererConfig {
            executable: Some(PathBuf::from("sh")),
            timeout_secs: 10,
            enable_local_file_access: true,
            extra_args: vec!["-c".into(), script.into(), "renderer".into()],
        })
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_success_returns_output_file_bytes() {
        let renderer = shell_renderer(r#"cp "$2" "$3""#);
        let html = "<html><body>سلام</body></html>";
        let bytes = renderer
            .render(html, &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(bytes, html.as_bytes());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_passes_local_file_access_flag() {
        let renderer = shell_renderer(r#"printf '%s' "$1" > "$3""#);
        let bytes = renderer
            .render("<p/>", &CancellationToken::new())
            .await
            .unwrap();
        assert_eq!(bytes, LOCAL_FILE_ACCESS_FLAG.as_bytes());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_nonzero_exit_carries_stderr() {
        let renderer = shell_renderer(r#"echo "partial" > "$3"; echo "Failed loading page" >&2; exit 3"#);
        let err = renderer
            .render("<p/>", &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            DocketError::RendererFailure { exit_code, stderr } => {
                assert_eq!(exit_code, 3);
                assert!(stderr.contains("Failed loading page"), "got: {stderr}");
            }
            other => panic!("expected RendererFailure, got: {other}"),
        }
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_zero_exit_without_output_is_io_error() {
        let renderer = shell_renderer("exit 0");
        let err = renderer
            .render("<p/>", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DocketError::Io(_)), "got: {err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_hung_renderer_times_out() {
        let renderer = shell_renderer("sleep 30").with_timeout(Duration::from_millis(200));
        let start = Instant::now();
        let err = renderer
            .render("<p/>", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DocketError::TimedOut(_)), "got: {err}");
        assert!(start.elapsed() < Duration::from_secs(10));
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_cancellation_stops_renderer() {
        let renderer = shell_renderer("sleep 30");
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(100)).await;
            trigger.cancel();
        });

        let err = renderer.render("<p/>", &cancel).await.unwrap_err();
        assert!(matches!(err, DocketError::Cancelled), "got: {err}");
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_temp_files_are_removed_after_failure() {
        // The script records where it was asked to write, then fails.
        let record = tempfile::NamedTempFile::new().unwrap();
        let script = format!("{}; exit 1", record_input(record.path()));
        let renderer = shell_renderer(&script);

        let _ = renderer.render("<p/>", &CancellationToken::new()).await;

        assert_workdir_removed(record.path());
    }

    /// Script prefix that writes the input path into `record`.
    #[cfg(unix)]
    fn record_input(record: &Path) -> String {
        format!(r#"printf '%s' "$2" > '{}'"#, record.display())
    }

    #[cfg(unix)]
    fn assert_workdir_removed(record: &Path) {
        let input = std::fs::read_to_string(record).unwrap();
        assert!(input.ends_with("input.html"), "got: {input}");
        assert!(!Path::new(&input).exists());
        let workdir = Path::new(&input).parent().unwrap();
        assert!(!workdir.exists(), "{} left behind", workdir.display());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_temp_files_are_removed_after_success() {
        let record = tempfile::NamedTempFile::new().unwrap();
        let script = format!(r#"{}; cp "$2" "$3""#, record_input(record.path()));
        let renderer = shell_renderer(&script);

        renderer
            .render("<p/>", &CancellationToken::new())
            .await
            .unwrap();

        assert_workdir_removed(record.path());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_temp_files_are_removed_after_timeout() {
        let record = tempfile::NamedTempFile::new().unwrap();
        let script = format!("{}; sleep 30", record_input(record.path()));
        let renderer = shell_renderer(&script).with_timeout(Duration::from_millis(500));

        let err = renderer
            .render("<p/>", &CancellationToken::new())
            .await
            .unwrap_err();
        assert!(matches!(err, DocketError::TimedOut(_)), "got: {err}");

        assert_workdir_removed(record.path());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_temp_files_are_removed_after_cancel() {
        let record = tempfile::NamedTempFile::new().unwrap();
        let script = format!("{}; sleep 30", record_input(record.path()));
        let renderer = shell_renderer(&script);
        let cancel = CancellationToken::new();
        let trigger = cancel.clone();
        tokio::spawn(async move {
            tokio::time::sleep(Duration::from_millis(300)).await;
            trigger.cancel();
        });

        let err = renderer.render("<p/>", &cancel).await.unwrap_err();
        assert!(matches!(err, DocketError::Cancelled), "got: {err}");

        assert_workdir_removed(record.path());
    }

    #[cfg(unix)]
    #[tokio::test]
    async fn test_large_stderr_does_not_stall_renderer() {
        let renderer = shell_renderer("head -c 3000000 /dev/zero | tr '\\0' 'w' >&2; exit 2");
        let err = renderer
            .render("<p/>", &CancellationToken::new())
            .await
            .unwrap_err();
        match err {
            DocketError::RendererFailure { exit_code, stderr } => {
                assert_eq!(exit_code, 2);
                assert_eq!(stderr.len() as u64, MAX_STDERR_BYTES);
            }
            other => panic!("expected RendererFailure, got: {other}"),
        }
    }
}
