//! Configuration Settings
//!
//! TOML configuration for image search, PDF rendering and compile defaults,
//! plus the process-wide list of global image directories.

use std::path::{Path, PathBuf};

use once_cell::sync::OnceCell;
use serde::{Deserialize, Serialize};

use crate::error::Result;

/// File name looked up in the working directory when no config is given
pub const DEFAULT_CONFIG_FILE: &str = "docweave.toml";

static GLOBAL_IMAGE_DIRS: OnceCell<Vec<PathBuf>> = OnceCell::new();

/// Top-level settings structure
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct Settings {
    /// Image search settings
    pub images: ImageSettings,
    /// External PDF rendering settings
    pub pdf: PdfSettings,
    /// Markdown compile defaults
    pub compile: CompileSettings,
}

/// Image search configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
#[serde(default)]
pub struct ImageSettings {
    /// Directories searched after the document and working directories
    pub global_dirs: Vec<PathBuf>,
}

/// PDF rendering configuration
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct PdfSettings {
    /// Seconds before the office process is killed
    pub timeout_secs: u64,
    /// Explicit office executable
    pub soffice: Option<PathBuf>,
}

impl Default for PdfSettings {
    fn default() -> Self {
        Self {
            timeout_secs: 180,
            soffice: None,
        }
    }
}

/// Compile defaults
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct CompileSettings {
    /// Border and shadow on compiled pictures
    pub style_images: bool,
}

impl Default for CompileSettings {
    fn default() -> Self {
        Self { style_images: true }
    }
}

/// Legacy JSON config: `{"GLOBAL_IMAGE_DIRS": [..]}`
#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct LegacyConfig {
    #[serde(rename = "GLOBAL_IMAGE_DIRS")]
    global_image_dirs: Vec<String>,
}

impl Settings {
    /// Parse settings from a TOML string
    pub fn from_toml_str(toml_str: &str) -> Result<Self> {
        let mut settings: Settings = toml::from_str(toml_str)?;
        settings.images.global_dirs = clean_dirs(settings.images.global_dirs, None);
        Ok(settings)
    }

    /// Parse the legacy JSON form, which only carries image directories
    pub fn from_json_str(json: &str) -> Result<Self> {
        let legacy: LegacyConfig = serde_json::from_str(json)?;
        let dirs = legacy.global_image_dirs.into_iter().map(PathBuf::from).collect();
        Ok(Settings {
            images: ImageSettings {
                global_dirs: clean_dirs(dirs, None),
            },
            ..Default::default()
        })
    }

    /// Load a `.toml` or `.json` file; relative directories are taken from
    /// the file's own directory
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path)?;
        let is_json = path
            .extension()
            .is_some_and(|e| e.eq_ignore_ascii_case("json"));
        let mut settings = if is_json {
            Self::from_json_str(&text)?
        } else {
            Self::from_toml_str(&text)?
        };

        let base = path.parent().filter(|p| !p.as_os_str().is_empty());
        settings.images.global_dirs = clean_dirs(settings.images.global_dirs, base);
        if let (Some(soffice), Some(base)) = (settings.pdf.soffice.as_mut(), base) {
            if soffice.is_relative() && soffice.components().count() > 1 {
                *soffice = base.join(&*soffice);
            }
        }

        log::debug!("loaded settings from {}: {:?}", path.display(), settings);
        Ok(settings)
    }

    /// `path` when given, else `docweave.toml` in `cwd` when present, else defaults
    pub fn discover(path: Option<&Path>, cwd: &Path) -> Result<Self> {
        if let Some(path) = path {
            return Self::load(path);
        }
        let candidate = cwd.join(DEFAULT_CONFIG_FILE);
        if candidate.is_file() {
            Self::load(candidate)
        } else {
            Ok(Self::default())
        }
    }
}

fn clean_dirs(dirs: Vec<PathBuf>, base: Option<&Path>) -> Vec<PathBuf> {
    dirs.into_iter()
        .filter(|d| !d.to_string_lossy().trim().is_empty())
        .map(|d| match base {
            Some(base) if d.is_relative() => base.join(d),
            _ => d,
        })
        .collect()
}

/// Install the global image directories; only the first call has effect
///
/// Returns false when a list was already installed.
pub fn install_global_image_dirs(dirs: Vec<PathBuf>) -> bool {
    let installed = GLOBAL_IMAGE_DIRS.set(dirs).is_ok();
    if !installed {
        log::debug!("global image directories already installed");
    }
    installed
}

/// The installed global image directories, empty before installation
pub fn global_image_dirs() -> &'static [PathBuf] {
    GLOBAL_IMAGE_DIRS.get().map(Vec::as_slice).unwrap_or(&[])
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_defaults() {
        let settings = Settings::from_toml_str("").unwrap();
        assert!(settings.images.global_dirs.is_empty());
        assert_eq!(settings.pdf.timeout_secs, 180);
        assert!(settings.pdf.soffice.is_none());
        assert!(settings.compile.style_images);
    }

    #[test]
    fn test_toml_sections() {
        let settings = Settings::from_toml_str(
            r#"
[images]
global_dirs = ["/srv/shared", "  ", "/opt/logos"]

[pdf]
timeout_secs = 30

[compile]
style_images = false
"#,
        )
        .unwrap();
        assert_eq!(
            settings.images.global_dirs,
            vec![PathBuf::from("/srv/shared"), PathBuf::from("/opt/logos")]
        );
        assert_eq!(settings.pdf.timeout_secs, 30);
        assert!(!settings.compile.style_images);
    }

    #[test]
    fn test_legacy_json() {
        let settings =
            Settings::from_json_str(r#"{"GLOBAL_IMAGE_DIRS": ["/a", "", "/b"]}"#).unwrap();
        assert_eq!(
            settings.images.global_dirs,
            vec![PathBuf::from("/a"), PathBuf::from("/b")]
        );
        assert_eq!(settings.pdf, PdfSettings::default());
    }

    #[test]
    fn test_malformed_toml() {
        assert!(Settings::from_toml_str("[images\nglobal_dirs = 3").is_err());
    }

    #[test]
    fn test_load_resolves_relative_dirs() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("docweave.toml");
        std::fs::write(&path, "[images]\nglobal_dirs = [\"shared\", \"/abs\"]\n").unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(
            settings.images.global_dirs,
            vec![dir.path().join("shared"), PathBuf::from("/abs")]
        );
    }

    #[test]
    fn test_load_json_by_extension() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, r#"{"GLOBAL_IMAGE_DIRS": ["pics"]}"#).unwrap();

        let settings = Settings::load(&path).unwrap();
        assert_eq!(settings.images.global_dirs, vec![dir.path().join("pics")]);
    }

    #[test]
    fn test_discover() {
        let dir = TempDir::new().unwrap();
        assert_eq!(Settings::discover(None, dir.path()).unwrap(), Settings::default());

        std::fs::write(dir.path().join(DEFAULT_CONFIG_FILE), "[pdf]\ntimeout_secs = 5\n").unwrap();
        assert_eq!(Settings::discover(None, dir.path()).unwrap().pdf.timeout_secs, 5);

        assert!(Settings::discover(Some(&dir.path().join("absent.toml")), dir.path()).is_err());
    }
}
