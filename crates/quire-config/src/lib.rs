//! Configuration management for quire.
//!
//! Parses `quire.toml` with serde and discovers it in the current directory
//! or any parent. The directory holding the file is the project root: the
//! `docs/` tree, the output directory and the component directory all
//! resolve against it.
//!
//! [`CliSettings`] override file values after loading.
//!
//! ## Environment Variable Expansion
//!
//! - `${VAR}` expands to the value of VAR, errors if unset
//! - `${VAR:-default}` expands to VAR if set, otherwise to the default
//!
//! Expanded fields: `output.alias`, `components.import_prefix`,
//! `typeset.typst`, `typeset.kroki_url`.

mod expand;

use std::path::{Path, PathBuf};

use serde::Deserialize;

/// Configuration filename to search for.
const CONFIG_FILENAME: &str = "quire.toml";

/// Default cutoff before which version-control update times defer to the override table.
pub const DEFAULT_TIME_CUTOFF: &str = "2025-01-24T13:17:33.598Z";

/// CLI settings that override configuration file values.
#[derive(Debug, Default)]
pub struct CliSettings {
    /// Override the output directory.
    pub output_dir: Option<PathBuf>,
    /// Override the cache enabled flag.
    pub cache_enabled: Option<bool>,
    /// Override the Kroki URL for diagram typesetting.
    pub kroki_url: Option<String>,
    /// Override remote image probing.
    pub image_probe: Option<bool>,
}

/// Application configuration.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct Config {
    output: OutputConfigRaw,
    components: ComponentsConfigRaw,
    time: TimeConfigRaw,
    cache: CacheConfigRaw,
    /// Typesetting and remote resource collaborators.
    pub typeset: TypesetConfig,
    /// Watch mode settings.
    pub watch: WatchConfig,

    /// Resolved project paths (set after loading).
    #[serde(skip)]
    pub project: ProjectConfig,
    /// Resolved component registry settings (set after loading).
    #[serde(skip)]
    pub components_resolved: ComponentsConfig,
    /// Resolved timestamp settings (set after loading).
    #[serde(skip)]
    pub time_resolved: TimeConfig,
    /// Path to the config file, if one was found.
    #[serde(skip)]
    pub config_path: Option<PathBuf>,
}

impl Default for Config {
    fn default() -> Self {
        Self::default_with_base(Path::new("."))
    }
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct OutputConfigRaw {
    dir: Option<String>,
    alias: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct ComponentsConfigRaw {
    dir: Option<String>,
    import_prefix: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct TimeConfigRaw {
    git: Option<bool>,
    overrides: Option<String>,
    cutoff: Option<String>,
}

#[derive(Debug, Deserialize, Default)]
#[serde(default)]
struct CacheConfigRaw {
    enabled: Option<bool>,
}

/// Resolved project layout.
#[derive(Debug, Default)]
pub struct ProjectConfig {
    /// Project root; document pathnames (`docs/...`) are relative to it.
    pub root: PathBuf,
    /// Directory receiving generated artifacts.
    pub output_dir: PathBuf,
    /// Import alias under which the output directory is visible to the consumer.
    pub alias: String,
    /// Whether the typeset cache is enabled.
    pub cache_enabled: bool,
}

impl ProjectConfig {
    /// Private state directory (`.quire/`).
    #[must_use]
    pub fn state_dir(&self) -> PathBuf {
        self.root.join(".quire")
    }

    /// Cache directory (`.quire/cache/`).
    #[must_use]
    pub fn cache_dir(&self) -> PathBuf {
        self.state_dir().join("cache")
    }

    /// Site configuration document (`docs/config.yml`).
    #[must_use]
    pub fn site_config_path(&self) -> PathBuf {
        self.root.join("docs").join("config.yml")
    }
}

/// Resolved markdown component settings.
#[derive(Debug, Default)]
pub struct ComponentsConfig {
    /// Directory enumerated for reusable markup components.
    pub dir: PathBuf,
    /// Import prefix used in emitted component imports.
    pub import_prefix: String,
}

/// Resolved timestamp settings.
#[derive(Debug)]
pub struct TimeConfig {
    /// Query version control for created/updated times.
    pub git: bool,
    /// YAML override table.
    pub overrides: Option<PathBuf>,
    /// Version-control update times before this instant defer to the override table.
    pub cutoff: String,
}

impl Default for TimeConfig {
    fn default() -> Self {
        Self {
            git: true,
            overrides: None,
            cutoff: DEFAULT_TIME_CUTOFF.to_owned(),
        }
    }
}

/// Typesetting collaborators.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct TypesetConfig {
    /// Typst executable.
    pub typst: String,
    /// Fence languages compiled with Typst.
    pub languages: Vec<String>,
    /// Kroki server; enables diagram fences when set.
    pub kroki_url: Option<String>,
    /// Measure remote images while materializing.
    pub image_probe: bool,
    /// Timeout for every external call, in seconds.
    pub timeout_secs: u64,
}

impl Default for TypesetConfig {
    fn default() -> Self {
        Self {
            typst: "typst".to_owned(),
            languages: vec!["typst".to_owned(), "typ".to_owned()],
            kroki_url: None,
            image_probe: false,
            timeout_secs: 30,
        }
    }
}

/// Watch mode settings.
#[derive(Debug, Deserialize)]
#[serde(default)]
pub struct WatchConfig {
    /// Quiet period used to coalesce editor save bursts.
    pub debounce_ms: u64,
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self { debounce_ms: 100 }
    }
}

/// Configuration error.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    /// File not found.
    #[error("Configuration file not found: {}", .0.display())]
    NotFound(PathBuf),
    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// TOML parsing error.
    #[error("TOML parse error: {0}")]
    Parse(#[from] toml::de::Error),
    /// Validation error.
    #[error("Configuration error: {0}")]
    Validation(String),
    /// Environment variable error during expansion.
    #[error("Environment variable error in {field}: {message}")]
    EnvVar {
        /// Config field path (e.g. `typeset.kroki_url`).
        field: String,
        /// What went wrong.
        message: String,
    },
}

fn require_non_empty(value: &str, field: &str) -> Result<(), ConfigError> {
    if value.trim().is_empty() {
        return Err(ConfigError::Validation(format!("{field} cannot be empty")));
    }
    Ok(())
}

fn require_http_url(url: &str, field: &str) -> Result<(), ConfigError> {
    if !url.starts_with("http://") && !url.starts_with("https://") {
        return Err(ConfigError::Validation(format!(
            "{field} must start with http:// or https://"
        )));
    }
    Ok(())
}

impl Config {
    /// Load configuration, applying CLI overrides last.
    ///
    /// With an explicit `config_path` that file must exist. Otherwise
    /// `quire.toml` is searched from the current directory upwards, falling
    /// back to defaults rooted at the current directory.
    ///
    /// # Errors
    ///
    /// Returns an error if the explicit file is missing, unreadable, invalid
    /// TOML, references unset environment variables, or fails validation.
    pub fn load(
        config_path: Option<&Path>,
        cli_settings: Option<&CliSettings>,
    ) -> Result<Self, ConfigError> {
        let mut config = if let Some(path) = config_path {
            if !path.exists() {
                return Err(ConfigError::NotFound(path.to_path_buf()));
            }
            Self::load_from_file(path)?
        } else if let Some(discovered) = Self::discover_config() {
            Self::load_from_file(&discovered)?
        } else {
            let cwd = std::env::current_dir()?;
            Self::default_with_base(&cwd)
        };

        if let Some(settings) = cli_settings {
            config.apply_cli_settings(settings);
            config.validate()?;
        }

        Ok(config)
    }

    fn apply_cli_settings(&mut self, settings: &CliSettings) {
        if let Some(dir) = &settings.output_dir {
            self.project.output_dir = self.project.root.join(dir);
        }
        if let Some(enabled) = settings.cache_enabled {
            self.project.cache_enabled = enabled;
        }
        if let Some(url) = &settings.kroki_url {
            self.typeset.kroki_url = Some(url.clone());
        }
        if let Some(probe) = settings.image_probe {
            self.typeset.image_probe = probe;
        }
    }

    fn discover_config() -> Option<PathBuf> {
        let mut current = std::env::current_dir().ok()?;
        loop {
            let candidate = current.join(CONFIG_FILENAME);
            if candidate.exists() {
                return Some(candidate);
            }
            if !current.pop() {
                return None;
            }
        }
    }

    /// Defaults with every path resolved against `base`.
    #[must_use]
    pub fn default_with_base(base: &Path) -> Self {
        Self {
            output: OutputConfigRaw::default(),
            components: ComponentsConfigRaw::default(),
            time: TimeConfigRaw::default(),
            cache: CacheConfigRaw::default(),
            typeset: TypesetConfig::default(),
            watch: WatchConfig::default(),
            project: ProjectConfig {
                root: base.to_path_buf(),
                output_dir: base.join("cache"),
                alias: "@cache".to_owned(),
                cache_enabled: true,
            },
            components_resolved: ComponentsConfig {
                dir: base.join("src/components/md"),
                import_prefix: "@/components/md".to_owned(),
            },
            time_resolved: TimeConfig::default(),
            config_path: None,
        }
    }

    fn load_from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path)?;
        let mut config: Self = toml::from_str(&content)?;

        config.expand_env_vars()?;

        let config_dir = path.parent().unwrap_or(Path::new("."));
        config.resolve(config_dir);
        config.config_path = Some(path.to_path_buf());

        config.validate()?;
        Ok(config)
    }

    fn expand_env_vars(&mut self) -> Result<(), ConfigError> {
        self.output.alias = expand::expand_opt(self.output.alias.as_deref(), "output.alias")?;
        self.components.import_prefix = expand::expand_opt(
            self.components.import_prefix.as_deref(),
            "components.import_prefix",
        )?;
        self.typeset.typst = expand::expand_env(&self.typeset.typst, "typeset.typst")?;
        self.typeset.kroki_url =
            expand::expand_opt(self.typeset.kroki_url.as_deref(), "typeset.kroki_url")?;
        Ok(())
    }

    fn resolve(&mut self, config_dir: &Path) {
        let resolve = |path: Option<&str>, default: &str| config_dir.join(path.unwrap_or(default));

        self.project = ProjectConfig {
            root: config_dir.to_path_buf(),
            output_dir: resolve(self.output.dir.as_deref(), "cache"),
            alias: self
                .output
                .alias
                .clone()
                .unwrap_or_else(|| "@cache".to_owned()),
            cache_enabled: self.cache.enabled.unwrap_or(true),
        };
        self.components_resolved = ComponentsConfig {
            dir: resolve(self.components.dir.as_deref(), "src/components/md"),
            import_prefix: self
                .components
                .import_prefix
                .clone()
                .unwrap_or_else(|| "@/components/md".to_owned()),
        };
        self.time_resolved = TimeConfig {
            git: self.time.git.unwrap_or(true),
            overrides: self.time.overrides.as_deref().map(|p| config_dir.join(p)),
            cutoff: self
                .time
                .cutoff
                .clone()
                .unwrap_or_else(|| DEFAULT_TIME_CUTOFF.to_owned()),
        };
    }

    /// Validate configuration values.
    ///
    /// # Errors
    ///
    /// Returns `ConfigError::Validation` naming the first offending field.
    pub fn validate(&self) -> Result<(), ConfigError> {
        const MAX_DEBOUNCE_MS: u64 = 10_000;

        require_non_empty(&self.project.alias, "output.alias")?;
        require_non_empty(&self.typeset.typst, "typeset.typst")?;
        require_non_empty(&self.time_resolved.cutoff, "time.cutoff")?;

        if let Some(url) = &self.typeset.kroki_url {
            require_non_empty(url, "typeset.kroki_url")?;
            require_http_url(url, "typeset.kroki_url")?;
        }
        if self.typeset.languages.iter().any(|l| l.trim().is_empty()) {
            return Err(ConfigError::Validation(
                "typeset.languages cannot contain empty names".to_owned(),
            ));
        }
        if self.typeset.timeout_secs == 0 {
            return Err(ConfigError::Validation(
                "typeset.timeout_secs must be greater than 0".to_owned(),
            ));
        }
        if self.watch.debounce_ms > MAX_DEBOUNCE_MS {
            return Err(ConfigError::Validation(format!(
                "watch.debounce_ms cannot exceed {MAX_DEBOUNCE_MS}"
            )));
        }
        Ok(())
    }
}
