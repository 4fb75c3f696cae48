use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use serde::Serialize;
use url::Url;

use crate::error::HlError;

/// Keys whose values are never echoed back.
const SECRET_KEYS: &[&str] = &["GITHUB_TOKEN", "TOKEN"];

const MAY_BE_EMPTY: &[&str] = &["IGNORED_DIR", "IGNORED_PATHS", "IGNORED_FILES"];

const DEFAULT_GITHUB_API_URL: &str = "https://api.github.com";

/// Operating mode; each one needs a different subset of the properties.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Mode {
    Metadata,
    Download,
    Unzip,
    Reorganize,
    Onboard,
}

impl Mode {
    /// Keys that must be present for this mode.
    pub fn required_keys(&self) -> &'static [&'static str] {
        match self {
            Mode::Metadata => &["GITHUB_ORG", "GITHUB_TOKEN", "OUTPUT_DIR", "LOGS_DIR"],
            Mode::Download => &["GITHUB_ORG", "GITHUB_TOKEN", "OUTPUT_DIR", "LOGS_DIR", "SRC_DIR"],
            Mode::Unzip => &["SRC_DIR", "UNZIP_DIR", "LOGS_DIR"],
            Mode::Reorganize => &["APP_REPO_MAPPING", "UNZIP_DIR", "SRC_DIR_ANALYZE", "LOGS_DIR"],
            Mode::Onboard => &[
                "PERL",
                "ANALYZER_DIR",
                "SOURCES",
                "IGNORED_DIR",
                "IGNORED_PATHS",
                "IGNORED_FILES",
                "URL",
                "HIGHLIGHT_EXE",
                "LOG_FOLDER",
                "COMPANY_ID",
                "TOKEN",
                "CONFIG",
                "RESULTS",
                "APPLICATIONS_FILE_PATH",
                "BATCH_SIZE",
            ],
        }
    }
}

impl std::fmt::Display for Mode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Mode::Metadata => write!(f, "metadata"),
            Mode::Download => write!(f, "download"),
            Mode::Unzip => write!(f, "unzip"),
            Mode::Reorganize => write!(f, "reorganize"),
            Mode::Onboard => write!(f, "onboard"),
        }
    }
}

/// Flat `key=value` properties, as read from `config.properties`.
#[derive(Debug, Clone, Default, Serialize)]
#[serde(transparent)]
pub struct Properties {
    values: BTreeMap<String, String>,
}

impl Properties {
    /// Returns the hlscan home directory (`~/.hlscan/`).
    pub fn home_dir() -> Result<PathBuf, HlError> {
        let base = dirs::home_dir().ok_or_else(|| HlError::Config {
            message: "could not determine home directory".into(),
        })?;
        Ok(base.join(".hlscan"))
    }

    /// Returns the default path of the properties file.
    pub fn default_path() -> Result<PathBuf, HlError> {
        Ok(Self::home_dir()?.join("config.properties"))
    }

    /// Load from an explicit path, or the default location.
    pub fn load(path: Option<&Path>) -> Result<Self, HlError> {
        match path {
            Some(p) => Self::load_from(p),
            None => Self::load_from(&Self::default_path()?),
        }
    }

    pub fn load_from(path: &Path) -> Result<Self, HlError> {
        if !path.is_file() {
            return Err(HlError::PathNotFound {
                path: path.to_path_buf(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::parse(&content).map_err(|e| match e {
            HlError::MalformedInput { line, message, .. } => HlError::MalformedInput {
                path: path.to_path_buf(),
                line,
                message,
            },
            other => other,
        })
    }

    /// Parse properties text. Blank lines and `#` comments are skipped; the
    /// first `=` separates key from value, both trimmed.
    pub fn parse(content: &str) -> Result<Self, HlError> {
        let mut values = BTreeMap::new();
        for (idx, line) in content.lines().enumerate() {
            let line = line.trim();
            if line.is_empty() || line.starts_with('#') {
                continue;
            }
            let (key, value) = line.split_once('=').ok_or_else(|| HlError::MalformedInput {
                path: PathBuf::new(),
                line: idx + 1,
                message: format!("expected key=value, got '{line}'"),
            })?;
            values.insert(key.trim().to_string(), value.trim().to_string());
        }
        Ok(Self { values })
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    pub fn contains(&self, key: &str) -> bool {
        self.values.contains_key(key)
    }

    pub fn set(&mut self, key: &str, value: impl Into<String>) {
        self.values.insert(key.to_string(), value.into());
    }

    /// Value of a key, or a config error naming it.
    pub fn require(&self, key: &str) -> Result<&str, HlError> {
        self.get(key).ok_or_else(|| HlError::MissingKeys {
            keys: vec![key.to_string()],
        })
    }

    /// True when the key is absent or set to an empty value.
    pub fn is_blank(&self, key: &str) -> bool {
        self.get(key).is_none_or(str::is_empty)
    }

    /// Fail with every key the mode needs that is absent. Only the ignore
    /// lists may be present with an empty value.
    pub fn check_required(&self, mode: Mode) -> Result<(), HlError> {
        let missing: Vec<String> = mode
            .required_keys()
            .iter()
            .filter(|k| {
                let k: &str = k;
                if MAY_BE_EMPTY.contains(&k) {
                    !self.contains(k)
                } else {
                    self.is_blank(k)
                }
            })
            .map(|k| k.to_string())
            .collect();
        if missing.is_empty() {
            Ok(())
        } else {
            Err(HlError::MissingKeys { keys: missing })
        }
    }

    /// Render as TOML with secrets masked, for `config show`.
    pub fn to_redacted_toml(&self) -> Result<String, HlError> {
        let mut shown = self.clone();
        for key in SECRET_KEYS {
            if shown.contains(key) {
                shown.set(key, "********");
            }
        }
        toml::to_string_pretty(&shown).map_err(|e| HlError::Serialization(e.to_string()))
    }

    /// Commented template written by `config init`.
    pub fn template() -> &'static str {
        include_str!("config.properties.template")
    }

    /// Write the template to `path` (or the default location) if nothing is
    /// there yet. Returns the path and whether it was written.
    pub fn init(path: Option<&Path>) -> Result<(PathBuf, bool), HlError> {
        let path = match path {
            Some(p) => p.to_path_buf(),
            None => Self::default_path()?,
        };
        if path.exists() {
            return Ok((path, false));
        }
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::write(&path, Self::template())?;
        Ok((path, true))
    }

    fn existing_dir(&self, key: &str) -> Result<PathBuf, HlError> {
        let path = PathBuf::from(self.require(key)?);
        if !path.is_dir() {
            return Err(HlError::FolderNotFound {
                key: key.to_string(),
                path,
            });
        }
        Ok(path)
    }

    fn existing_file(&self, key: &str) -> Result<PathBuf, HlError> {
        let path = PathBuf::from(self.require(key)?);
        if !path.is_file() {
            return Err(HlError::FileNotFound {
                key: key.to_string(),
                path,
            });
        }
        Ok(path)
    }

    fn positive(&self, key: &str) -> Result<Option<usize>, HlError> {
        match self.get(key) {
            None | Some("") => Ok(None),
            Some(raw) => match raw.parse::<usize>() {
                Ok(n) if n >= 1 => Ok(Some(n)),
                _ => Err(HlError::Config {
                    message: format!("{key} must be a positive integer, got '{raw}'"),
                }),
            },
        }
    }
}

/// Settings for talking to GitHub and writing the metadata outputs.
#[derive(Debug, Clone)]
pub struct GitHubSettings {
    pub org: String,
    pub token: String,
    pub api_url: Url,
    pub output_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl GitHubSettings {
    pub fn from_properties(props: &Properties) -> Result<Self, HlError> {
        props.check_required(Mode::Metadata)?;
        let raw_api = props
            .get("GITHUB_API_URL")
            .filter(|s| !s.is_empty())
            .unwrap_or(DEFAULT_GITHUB_API_URL);
        let api_url = Url::parse(raw_api).map_err(|_| HlError::InvalidUrl {
            url: raw_api.to_string(),
        })?;
        Ok(Self {
            org: props.require("GITHUB_ORG")?.to_string(),
            token: props.require("GITHUB_TOKEN")?.to_string(),
            api_url,
            output_dir: PathBuf::from(props.require("OUTPUT_DIR")?),
            logs_dir: PathBuf::from(props.require("LOGS_DIR")?),
        })
    }

    /// `<OUTPUT_DIR>/<org>_Repositories_Metadata.json`
    pub fn metadata_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_Repositories_Metadata.json", self.org))
    }

    /// `<OUTPUT_DIR>/<org>_Repositories_Summary.csv`
    pub fn summary_path(&self) -> PathBuf {
        self.output_dir
            .join(format!("{}_Repositories_Summary.csv", self.org))
    }

    /// `<LOGS_DIR>/<org>_Metadatadownload.log`
    pub fn metadata_log_path(&self) -> PathBuf {
        self.logs_dir.join(format!("{}_Metadatadownload.log", self.org))
    }
}

/// Settings for downloading archives of one batch.
#[derive(Debug, Clone)]
pub struct DownloadSettings {
    pub github: GitHubSettings,
    pub src_dir: PathBuf,
}

impl DownloadSettings {
    pub fn from_properties(props: &Properties) -> Result<Self, HlError> {
        props.check_required(Mode::Download)?;
        Ok(Self {
            github: GitHubSettings::from_properties(props)?,
            src_dir: PathBuf::from(props.require("SRC_DIR")?),
        })
    }
}

/// Settings for extracting downloaded archives.
#[derive(Debug, Clone)]
pub struct UnzipSettings {
    pub src_dir: PathBuf,
    pub unzip_dir: PathBuf,
    pub logs_dir: PathBuf,
}

impl UnzipSettings {
    pub fn from_properties(props: &Properties) -> Result<Self, HlError> {
        props.check_required(Mode::Unzip)?;
        Ok(Self {
            src_dir: props.existing_dir("SRC_DIR")?,
            unzip_dir: PathBuf::from(props.require("UNZIP_DIR")?),
            logs_dir: PathBuf::from(props.require("LOGS_DIR")?),
        })
    }
}

/// Settings for regrouping extracted repositories under application folders.
#[derive(Debug, Clone)]
pub struct LayoutSettings {
    pub mapping_file: PathBuf,
    pub repo_root: PathBuf,
    pub output_root: PathBuf,
    pub logs_dir: PathBuf,
    /// Directories starting with this are archive wrappers to hoist.
    pub wrapper_prefix: String,
}

impl LayoutSettings {
    pub fn from_properties(props: &Properties) -> Result<Self, HlError> {
        props.check_required(Mode::Reorganize)?;
        let wrapper_prefix = match (props.get("WRAPPER_PREFIX"), props.get("GITHUB_ORG")) {
            (Some(prefix), _) if !prefix.is_empty() => prefix.to_string(),
            (_, Some(org)) if !org.is_empty() => format!("{org}-"),
            _ => {
                return Err(HlError::Config {
                    message: "either WRAPPER_PREFIX or GITHUB_ORG must be set".into(),
                })
            }
        };
        Ok(Self {
            mapping_file: props.existing_file("APP_REPO_MAPPING")?,
            repo_root: props.existing_dir("UNZIP_DIR")?,
            output_root: PathBuf::from(props.require("SRC_DIR_ANALYZE")?),
            logs_dir: PathBuf::from(props.require("LOGS_DIR")?),
            wrapper_prefix,
        })
    }
}

/// Settings for the scanner onboarding run.
#[derive(Debug, Clone)]
pub struct OnboardSettings {
    pub java: String,
    pub highlight_exe: PathBuf,
    pub perl_dir: PathBuf,
    pub analyzer_dir: PathBuf,
    pub sources: PathBuf,
    pub results: PathBuf,
    pub log_folder: PathBuf,
    pub config_dir: PathBuf,
    pub applications_file: PathBuf,
    pub server_url: Url,
    pub token: String,
    pub company_id: String,
    pub ignored_dirs: String,
    pub ignored_paths: String,
    pub ignored_files: String,
    pub batch_size: usize,
    pub max_batches: Option<usize>,
}

impl OnboardSettings {
    /// Validate every onboarding key; any problem halts the run before work starts.
    pub fn from_properties(props: &Properties) -> Result<Self, HlError> {
        props.check_required(Mode::Onboard)?;

        let raw_url = props.require("URL")?;
        let server_url = Url::parse(raw_url)
            .ok()
            .filter(|u| matches!(u.scheme(), "http" | "https"))
            .filter(|u| u.host_str().is_some_and(|h| h.ends_with(".com")))
            .ok_or_else(|| HlError::InvalidUrl {
                url: raw_url.to_string(),
            })?;

        let batch_size = props.positive("BATCH_SIZE")?.ok_or_else(|| HlError::Config {
            message: "BATCH_SIZE must be a positive integer".into(),
        })?;

        Ok(Self {
            java: props
                .get("JAVA")
                .filter(|s| !s.is_empty())
                .unwrap_or("java")
                .to_string(),
            highlight_exe: props.existing_file("HIGHLIGHT_EXE")?,
            perl_dir: props.existing_dir("PERL")?,
            analyzer_dir: props.existing_dir("ANALYZER_DIR")?,
            sources: props.existing_dir("SOURCES")?,
            results: props.existing_dir("RESULTS")?,
            log_folder: props.existing_dir("LOG_FOLDER")?,
            config_dir: props.existing_dir("CONFIG")?,
            applications_file: props.existing_file("APPLICATIONS_FILE_PATH")?,
            server_url,
            token: props.require("TOKEN")?.to_string(),
            company_id: props.require("COMPANY_ID")?.to_string(),
            ignored_dirs: props.require("IGNORED_DIR")?.to_string(),
            ignored_paths: props.require("IGNORED_PATHS")?.to_string(),
            ignored_files: props.require("IGNORED_FILES")?.to_string(),
            batch_size,
            max_batches: props.positive("MAX_BATCHES")?,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn onboard_props(root: &Path) -> Properties {
        for dir in ["perl", "analyzer", "sources", "results", "logs", "config"] {
            std::fs::create_dir_all(root.join(dir)).unwrap();
        }
        std::fs::write(root.join("HighlightAutomation.jar"), b"").unwrap();
        std::fs::write(root.join("apps.txt"), "name;id\n").unwrap();

        let mut props = Properties::default();
        props.set("PERL", root.join("perl").to_string_lossy());
        props.set("ANALYZER_DIR", root.join("analyzer").to_string_lossy());
        props.set("SOURCES", root.join("sources").to_string_lossy());
        props.set("RESULTS", root.join("results").to_string_lossy());
        props.set("LOG_FOLDER", root.join("logs").to_string_lossy());
        props.set("CONFIG", root.join("config").to_string_lossy());
        props.set(
            "HIGHLIGHT_EXE",
            root.join("HighlightAutomation.jar").to_string_lossy(),
        );
        props.set(
            "APPLICATIONS_FILE_PATH",
            root.join("apps.txt").to_string_lossy(),
        );
        props.set("URL", "https://rpa.casthighlight.com");
        props.set("TOKEN", "hl-token");
        props.set("COMPANY_ID", "1234");
        props.set("IGNORED_DIR", "test,tests");
        props.set("IGNORED_PATHS", "");
        props.set("IGNORED_FILES", "");
        props.set("BATCH_SIZE", "2");
        props
    }

    #[test]
    fn test_parse_skips_comments_and_splits_on_first_equals() {
        let props = Properties::parse(
            "# comment\n\nGITHUB_ORG = acme\nURL=https://x.com/?a=b\nEMPTY=\n",
        )
        .unwrap();
        assert_eq!(props.get("GITHUB_ORG"), Some("acme"));
        assert_eq!(props.get("URL"), Some("https://x.com/?a=b"));
        assert_eq!(props.get("EMPTY"), Some(""));
        assert_eq!(props.get("MISSING"), None);
    }

    #[test]
    fn test_parse_rejects_line_without_separator() {
        let err = Properties::parse("A=1\nnot a property\n").unwrap_err();
        assert!(matches!(err, HlError::MalformedInput { line: 2, .. }));
    }

    #[test]
    fn test_missing_keys_are_all_reported() {
        let props = Properties::parse("GITHUB_ORG=acme\n").unwrap();
        match props.check_required(Mode::Metadata).unwrap_err() {
            HlError::MissingKeys { keys } => {
                assert_eq!(keys, vec!["GITHUB_TOKEN", "OUTPUT_DIR", "LOGS_DIR"]);
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_onboard_settings_valid() {
        let dir = tempfile::tempdir().unwrap();
        let settings = OnboardSettings::from_properties(&onboard_props(dir.path())).unwrap();
        assert_eq!(settings.batch_size, 2);
        assert_eq!(settings.max_batches, None);
        assert_eq!(settings.java, "java");
    }

    #[test]
    fn test_onboard_settings_rejects_missing_folder() {
        let dir = tempfile::tempdir().unwrap();
        let mut props = onboard_props(dir.path());
        props.set("RESULTS", dir.path().join("nope").to_string_lossy());
        let err = OnboardSettings::from_properties(&props).unwrap_err();
        assert!(matches!(err, HlError::FolderNotFound { ref key, .. } if key == "RESULTS"));
    }

    #[test]
    fn test_onboard_settings_rejects_bad_url() {
        let dir = tempfile::tempdir().unwrap();
        let mut props = onboard_props(dir.path());
        props.set("URL", "https://highlight.example.org");
        assert!(matches!(
            OnboardSettings::from_properties(&props).unwrap_err(),
            HlError::InvalidUrl { .. }
        ));
        props.set("URL", "not a url");
        assert!(matches!(
            OnboardSettings::from_properties(&props).unwrap_err(),
            HlError::InvalidUrl { .. }
        ));
    }

    #[test]
    fn test_onboard_settings_rejects_zero_batch_size() {
        let dir = tempfile::tempdir().unwrap();
        let mut props = onboard_props(dir.path());
        props.set("BATCH_SIZE", "0");
        assert!(OnboardSettings::from_properties(&props).is_err());
        props.set("BATCH_SIZE", "3");
        props.set("MAX_BATCHES", "");
        let settings = OnboardSettings::from_properties(&props).unwrap();
        assert_eq!(settings.max_batches, None);
    }

    #[test]
    fn test_wrapper_prefix_defaults_to_org() {
        let dir = tempfile::tempdir().unwrap();
        std::fs::write(dir.path().join("map.csv"), "Repo Name,Application\n").unwrap();
        let mut props = Properties::default();
        props.set("APP_REPO_MAPPING", dir.path().join("map.csv").to_string_lossy());
        props.set("UNZIP_DIR", dir.path().to_string_lossy());
        props.set("SRC_DIR_ANALYZE", dir.path().join("out").to_string_lossy());
        props.set("LOGS_DIR", dir.path().join("logs").to_string_lossy());
        props.set("GITHUB_ORG", "acme");
        let settings = LayoutSettings::from_properties(&props).unwrap();
        assert_eq!(settings.wrapper_prefix, "acme-");

        props.set("WRAPPER_PREFIX", "lmigtech-");
        let settings = LayoutSettings::from_properties(&props).unwrap();
        assert_eq!(settings.wrapper_prefix, "lmigtech-");
    }

    #[test]
    fn test_redacted_toml_masks_tokens() {
        let props = Properties::parse("GITHUB_TOKEN=ghp_secret\nGITHUB_ORG=acme\n").unwrap();
        let shown = props.to_redacted_toml().unwrap();
        assert!(!shown.contains("ghp_secret"));
        assert!(shown.contains("GITHUB_ORG = \"acme\""));
    }

    #[test]
    fn test_init_writes_template_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("conf").join("config.properties");
        let (written_to, created) = Properties::init(Some(&path)).unwrap();
        assert_eq!(written_to, path);
        assert!(created);

        let props = Properties::load_from(&path).unwrap();
        assert_eq!(props.get("BATCH_SIZE"), Some("1"));
        assert!(props.is_blank("GITHUB_ORG"));

        std::fs::write(&path, "GITHUB_ORG=acme\n").unwrap();
        let (_, created) = Properties::init(Some(&path)).unwrap();
        assert!(!created);
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "GITHUB_ORG=acme\n");
    }
}
