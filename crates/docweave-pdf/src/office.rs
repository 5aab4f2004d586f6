//! Headless office suite renderer
//!
//! Runs `soffice --headless --convert-to pdf` against the document, with the
//! output directory set to the directory of the requested PDF. The office
//! suite names its output after the input's stem; the file is moved to the
//! requested path afterwards.

use std::io::Read;
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};
use std::time::{Duration, Instant, SystemTime};

use crate::error::{PdfError, Result};
use crate::renderer::PdfRenderer;

/// Default time limit for one conversion
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(180);

/// How long to wait for the PDF to appear after the process exits
pub const OUTPUT_WAIT: Duration = Duration::from_secs(12);

const POLL_INTERVAL: Duration = Duration::from_millis(200);

/// Slack for file systems with coarse modification times
const MTIME_SLACK: Duration = Duration::from_secs(2);

#[cfg(windows)]
const EXECUTABLE: &str = "soffice.exe";
#[cfg(not(windows))]
const EXECUTABLE: &str = "soffice";

const UNIX_LOCATIONS: &[&str] = &[
    "/usr/bin/soffice",
    "/usr/local/bin/soffice",
    "/snap/bin/libreoffice",
    "/usr/lib/libreoffice/program/soffice",
    "/opt/libreoffice/program/soffice",
];

#[cfg(windows)]
const WINDOWS_LOCATIONS: &[&str] = &[
    r"C:\Program Files\LibreOffice\program\soffice.exe",
    r"C:\Program Files (x86)\LibreOffice\program\soffice.exe",
];

/// Locate the office executable: explicit override, `PATH`, then known locations
///
/// An override that does not exist is not replaced by a search.
pub fn find_soffice(override_path: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = override_path {
        if path.is_file() {
            return Some(path.to_path_buf());
        }
        log::warn!("configured office executable {} does not exist", path.display());
        return None;
    }

    if let Ok(path) = which::which(EXECUTABLE) {
        log::debug!("found {} on PATH", path.display());
        return Some(path);
    }

    #[cfg(windows)]
    let fixed = UNIX_LOCATIONS.iter().chain(WINDOWS_LOCATIONS);
    #[cfg(not(windows))]
    let fixed = UNIX_LOCATIONS.iter();

    fixed.map(PathBuf::from).find(|p| p.exists())
}

/// Renderer backed by a headless office suite
#[derive(Debug, Clone)]
pub struct OfficeRenderer {
    executable: Option<PathBuf>,
    timeout: Duration,
    output_wait: Duration,
}

impl Default for OfficeRenderer {
    fn default() -> Self {
        Self::new()
    }
}

impl OfficeRenderer {
    /// Renderer that searches for the executable
    pub fn new() -> Self {
        Self {
            executable: None,
            timeout: DEFAULT_TIMEOUT,
            output_wait: OUTPUT_WAIT,
        }
    }

    /// Use this executable instead of searching
    pub fn with_executable(mut self, path: impl Into<PathBuf>) -> Self {
        self.executable = Some(path.into());
        self
    }

    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_output_wait(mut self, wait: Duration) -> Self {
        self.output_wait = wait;
        self
    }

    /// The executable this renderer would run
    pub fn executable(&self) -> Option<PathBuf> {
        find_soffice(self.executable.as_deref())
    }

    fn run(&self, soffice: &Path, docx: &Path, outdir: &Path) -> Result<()> {
        let home = std::env::var_os("HOME")
            .or_else(|| std::env::var_os("USERPROFILE"))
            .unwrap_or_else(|| outdir.as_os_str().to_os_string());

        log::debug!(
            "running {} on {} (timeout {:?})",
            soffice.display(),
            docx.display(),
            self.timeout
        );
        let mut child = Command::new(soffice)
            .args([
                "--headless",
                "--invisible",
                "--norestore",
                "--nodefault",
                "--nolockcheck",
                "--convert-to",
                "pdf",
            ])
            .arg(docx)
            .arg("--outdir")
            .arg(outdir)
            .env("HOME", home)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| PdfError::Failed(format!("cannot start {}: {}", soffice.display(), e)))?;

        let stderr = child.stderr.take().map(|mut pipe| {
            std::thread::spawn(move || {
                let mut text = String::new();
                let _ = pipe.read_to_string(&mut text);
                text
            })
        });

        let started = Instant::now();
        let status = loop {
            if let Some(status) = child.try_wait()? {
                break status;
            }
            if started.elapsed() >= self.timeout {
                log::warn!("office process exceeded {:?}, killing it", self.timeout);
                let _ = child.kill();
                let _ = child.wait();
                return Err(PdfError::Timeout(self.timeout));
            }
            std::thread::sleep(POLL_INTERVAL);
        };

        let stderr = stderr
            .and_then(|handle| handle.join().ok())
            .unwrap_or_default();
        // Some versions exit non-zero after writing the PDF; the output decides
        if !status.success() {
            log::warn!("office process exited with {}: {}", status, stderr.trim());
        }
        Ok(())
    }

    /// Wait for `<stem>.pdf`, then fall back to a case-insensitive stem match
    ///
    /// Only files written at or after `since` count as output.
    fn locate_output(&self, docx: &Path, outdir: &Path, since: SystemTime) -> Option<PathBuf> {
        let stem = docx.file_stem()?.to_string_lossy().into_owned();
        let expected = outdir.join(format!("{}.pdf", stem));

        let started = Instant::now();
        while !is_fresh(&expected, since) && started.elapsed() < self.output_wait {
            std::thread::sleep(POLL_INTERVAL);
        }
        if is_fresh(&expected, since) {
            return Some(expected);
        }

        let stem = stem.to_lowercase();
        std::fs::read_dir(outdir)
            .ok()?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .find(|path| {
                let is_pdf = path
                    .extension()
                    .is_some_and(|e| e.eq_ignore_ascii_case("pdf"));
                let matches = path
                    .file_stem()
                    .is_some_and(|s| s.to_string_lossy().to_lowercase().starts_with(&stem));
                is_pdf && matches && is_fresh(path, since)
            })
    }
}

/// Whether `path` exists and was modified no earlier than `since`
fn is_fresh(path: &Path, since: SystemTime) -> bool {
    let Ok(modified) = std::fs::metadata(path).and_then(|m| m.modified()) else {
        return false;
    };
    let since = since.checked_sub(MTIME_SLACK).unwrap_or(since);
    modified >= since
}

/// Delete a PDF left over from an earlier conversion
fn remove_stale(path: &Path) -> Result<()> {
    if path.is_file() {
        log::debug!("removing previous output {}", path.display());
        std::fs::remove_file(path)?;
    }
    Ok(())
}

impl PdfRenderer for OfficeRenderer {
    fn name(&self) -> &'static str {
        "office"
    }

    fn is_available(&self) -> bool {
        self.executable().is_some()
    }

    fn render(&self, docx: &Path, pdf: &Path) -> Result<PathBuf> {
        if !docx.is_file() {
            return Err(PdfError::InputNotFound(docx.to_path_buf()));
        }
        let soffice = self
            .executable()
            .ok_or_else(|| PdfError::NoEngine("office suite (soffice) was not found".to_string()))?;

        let outdir = match pdf.parent().filter(|p| !p.as_os_str().is_empty()) {
            Some(dir) => dir.to_path_buf(),
            None => std::env::current_dir()?,
        };
        std::fs::create_dir_all(&outdir)?;
        let docx = docx.canonicalize()?;
        let outdir = outdir.canonicalize()?;
        let target = outdir.join(pdf.file_name().unwrap_or_else(|| "output.pdf".as_ref()));

        if let Some(stem) = docx.file_stem() {
            remove_stale(&outdir.join(format!("{}.pdf", stem.to_string_lossy())))?;
        }
        remove_stale(&target)?;

        let since = SystemTime::now();
        self.run(&soffice, &docx, &outdir)?;

        let produced = self
            .locate_output(&docx, &outdir, since)
            .ok_or_else(|| PdfError::Failed("the office suite produced no PDF".to_string()))?;
        if produced != target {
            if std::fs::rename(&produced, &target).is_err() {
                std::fs::copy(&produced, &target)?;
                let _ = std::fs::remove_file(&produced);
            }
        }

        log::info!("wrote {}", target.display());
        Ok(target)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_override_wins() {
        let dir = TempDir::new().unwrap();
        let exe = dir.path().join("soffice");
        std::fs::write(&exe, b"").unwrap();

        assert_eq!(find_soffice(Some(exe.as_path())), Some(exe.clone()));
        assert_eq!(find_soffice(Some(dir.path().join("absent").as_path())), None);
        assert!(OfficeRenderer::new().with_executable(&exe).is_available());
    }

    #[test]
    fn test_missing_input() {
        let dir = TempDir::new().unwrap();
        let renderer = OfficeRenderer::new().with_executable(dir.path().join("soffice"));
        let err = renderer
            .render(&dir.path().join("absent.docx"), &dir.path().join("out.pdf"))
            .unwrap_err();
        assert!(matches!(err, PdfError::InputNotFound(_)));
    }

    #[test]
    fn test_no_engine() {
        let dir = TempDir::new().unwrap();
        let docx = dir.path().join("in.docx");
        std::fs::write(&docx, b"PK").unwrap();
        let renderer = OfficeRenderer::new().with_executable(dir.path().join("absent"));
        let err = renderer.render(&docx, &dir.path().join("out.pdf")).unwrap_err();
        assert!(matches!(err, PdfError::NoEngine(_)));
    }

    #[cfg(unix)]
    mod fake_office {
        use super::*;
        use std::os::unix::fs::PermissionsExt;

        const CONVERTER: &str = r#"#!/bin/sh
while [ $# -gt 0 ]; do
  case "$1" in
    --outdir) shift; out="$1" ;;
    *.docx) in="$1" ;;
  esac
  shift
done
name=$(basename "$in" .docx)
printf '%%PDF-1.4\n' > "$out/$name.pdf"
"#;

        fn script(dir: &Path, body: &str) -> PathBuf {
            let path = dir.join("fake-soffice");
            std::fs::write(&path, body).unwrap();
            std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755)).unwrap();
            path
        }

        #[test]
        fn test_output_moved_to_requested_path() {
            let dir = TempDir::new().unwrap();
            let docx = dir.path().join("Report.docx");
            std::fs::write(&docx, b"PK").unwrap();
            let renderer = OfficeRenderer::new().with_executable(script(dir.path(), CONVERTER));

            let out = renderer.render(&docx, &dir.path().join("final.pdf")).unwrap();

            assert_eq!(out.file_name().unwrap(), "final.pdf");
            assert!(std::fs::read(&out).unwrap().starts_with(b"%PDF"));
            assert!(!dir.path().join("Report.pdf").exists());
        }

        #[test]
        fn test_timeout_kills_process() {
            let dir = TempDir::new().unwrap();
            let docx = dir.path().join("slow.docx");
            std::fs::write(&docx, b"PK").unwrap();
            let renderer = OfficeRenderer::new()
                .with_executable(script(dir.path(), "#!/bin/sh\nexec sleep 30\n"))
                .with_timeout(Duration::from_millis(300));

            let started = Instant::now();
            let err = renderer.render(&docx, &dir.path().join("slow.pdf")).unwrap_err();
            assert!(matches!(err, PdfError::Timeout(_)));
            assert!(started.elapsed() < Duration::from_secs(10));
        }

        #[test]
        fn test_previous_pdf_is_not_reported_as_output() {
            let dir = TempDir::new().unwrap();
            let docx = dir.path().join("merged.docx");
            std::fs::write(&docx, b"PK").unwrap();
            let pdf = dir.path().join("merged.pdf");
            std::fs::write(&pdf, b"%PDF stale").unwrap();
            let renderer = OfficeRenderer::new()
                .with_executable(script(dir.path(), "#!/bin/sh\nexit 0\n"))
                .with_output_wait(Duration::from_millis(100));

            let err = renderer.render(&docx, &pdf).unwrap_err();
            assert!(matches!(err, PdfError::Failed(_)));
            assert!(!pdf.exists());
        }

        #[test]
        fn test_stem_scan_ignores_older_files() {
            let dir = TempDir::new().unwrap();
            let docx = dir.path().join("Report.docx");
            std::fs::write(&docx, b"PK").unwrap();
            let old = dir.path().join("report-v1.pdf");
            std::fs::write(&old, b"%PDF old").unwrap();
            std::fs::File::options()
                .write(true)
                .open(&old)
                .unwrap()
                .set_modified(SystemTime::now() - Duration::from_secs(3600))
                .unwrap();
            let renderer = OfficeRenderer::new()
                .with_executable(script(dir.path(), "#!/bin/sh\nexit 0\n"))
                .with_output_wait(Duration::from_millis(100));

            let err = renderer.render(&docx, &dir.path().join("out.pdf")).unwrap_err();
            assert!(matches!(err, PdfError::Failed(_)));
            assert!(old.exists());
        }

        #[test]
        fn test_no_output_is_a_failure() {
            let dir = TempDir::new().unwrap();
            let docx = dir.path().join("empty.docx");
            std::fs::write(&docx, b"PK").unwrap();
            let renderer = OfficeRenderer::new()
                .with_executable(script(dir.path(), "#!/bin/sh\nexit 1\n"))
                .with_output_wait(Duration::from_millis(100));

            let err = renderer.render(&docx, &dir.path().join("empty.pdf")).unwrap_err();
            assert!(matches!(err, PdfError::Failed(_)));
            assert!(!dir.path().join("empty.pdf").exists());
        }
    }
}
