use crate::error::{PrdError, Result};
use crate::paths;
use crate::types::InvariantMode;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

// ---------------------------------------------------------------------------
// ConfigWarning / WarnLevel
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ConfigWarning {
    pub level: WarnLevel,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum WarnLevel {
    Warning,
    Error,
}

impl ConfigWarning {
    fn warning(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Warning,
            message: message.into(),
        }
    }

    fn error(message: impl Into<String>) -> Self {
        Self {
            level: WarnLevel::Error,
            message: message.into(),
        }
    }
}

// ---------------------------------------------------------------------------
// GrowthConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct GrowthConfig {
    #[serde(default = "default_target_lines")]
    pub target_line_count: usize,
    /// Fraction of the target that counts as "reached".
    #[serde(default = "default_tolerance")]
    pub target_tolerance: f64,
    #[serde(default = "default_max_passes")]
    pub max_passes: u32,
    #[serde(default = "default_chunks_per_pass")]
    pub max_chunks_per_pass: usize,
    #[serde(default = "default_true")]
    pub rebuild_each_pass: bool,
    #[serde(default = "default_true")]
    pub stop_when_all_done: bool,
}

fn default_target_lines() -> usize {
    100_000
}

fn default_tolerance() -> f64 {
    0.95
}

fn default_max_passes() -> u32 {
    50
}

fn default_chunks_per_pass() -> usize {
    20
}

fn default_true() -> bool {
    true
}

impl Default for GrowthConfig {
    fn default() -> Self {
        Self {
            target_line_count: default_target_lines(),
            target_tolerance: default_tolerance(),
            max_passes: default_max_passes(),
            max_chunks_per_pass: default_chunks_per_pass(),
            rebuild_each_pass: true,
            stop_when_all_done: true,
        }
    }
}

// ---------------------------------------------------------------------------
// SafetyConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SafetyConfig {
    #[serde(default = "default_max_failures")]
    pub max_consecutive_failures: u32,
    #[serde(default)]
    pub invariant_mode: InvariantMode,
    /// Let `prd doctor` apply safe repairs without `--fix`.
    #[serde(default)]
    pub doctor_auto_fix: bool,
}

fn default_max_failures() -> u32 {
    5
}

impl Default for SafetyConfig {
    fn default() -> Self {
        Self {
            max_consecutive_failures: default_max_failures(),
            invariant_mode: InvariantMode::Strict,
            doctor_auto_fix: false,
        }
    }
}

// ---------------------------------------------------------------------------
// ProviderConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ProviderConfig {
    /// Offline provider: echoes each chunk back with a marker line.
    Stub,
    /// External driver program that relays the prompt to an AI assistant.
    Driver {
        program: String,
        #[serde(default)]
        args: Vec<String>,
        #[serde(default = "default_wait_seconds")]
        wait_seconds: u64,
        #[serde(default = "default_grace_seconds")]
        grace_seconds: u64,
        /// Command that prints the transcript after the driver exits
        /// (e.g. `pbpaste`). When unset the driver's stdout is the transcript.
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        transcript_command: Vec<String>,
    },
}

fn default_wait_seconds() -> u64 {
    60
}

fn default_grace_seconds() -> u64 {
    30
}

impl Default for ProviderConfig {
    fn default() -> Self {
        ProviderConfig::Stub
    }
}

// ---------------------------------------------------------------------------
// ProjectConfig
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectConfig {
    pub name: String,
    #[serde(default)]
    pub description: Option<String>,
}

// ---------------------------------------------------------------------------
// Config (top-level)
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    #[serde(default = "default_version")]
    pub version: u32,
    pub project: ProjectConfig,
    #[serde(default = "default_document")]
    pub document: PathBuf,
    #[serde(default = "default_chunk_size")]
    pub chunk_size_lines: usize,
    #[serde(default = "default_min_ratio")]
    pub min_length_ratio: f64,
    /// Plain-text log mirror. `null` turns it off.
    #[serde(default = "default_log_path")]
    pub log_path: Option<PathBuf>,
    #[serde(default)]
    pub growth: GrowthConfig,
    #[serde(default)]
    pub safety: SafetyConfig,
    #[serde(default)]
    pub provider: ProviderConfig,
}

fn default_version() -> u32 {
    1
}

fn default_log_path() -> Option<PathBuf> {
    Some(PathBuf::from(paths::LOG_FILE))
}

fn default_document() -> PathBuf {
    PathBuf::from(paths::DEFAULT_DOCUMENT)
}

fn default_chunk_size() -> usize {
    120
}

fn default_min_ratio() -> f64 {
    0.9
}

impl Config {
    pub fn new(project_name: impl Into<String>) -> Self {
        Self {
            version: 1,
            project: ProjectConfig {
                name: project_name.into(),
                description: None,
            },
            document: default_document(),
            chunk_size_lines: default_chunk_size(),
            min_length_ratio: default_min_ratio(),
            log_path: default_log_path(),
            growth: GrowthConfig::default(),
            safety: SafetyConfig::default(),
            provider: ProviderConfig::default(),
        }
    }

    /// Load `.prd/config.yaml`, falling back to defaults when it doesn't exist.
    /// A config file that exists but fails to parse is an error.
    pub fn load(root: &Path) -> Result<Self> {
        let path = paths::config_path(root);
        if !path.exists() {
            return Ok(Self::new(project_name_for(root)));
        }
        let data = std::fs::read_to_string(&path)?;
        let cfg: Config = serde_yaml::from_str(&data)?;
        Ok(cfg)
    }

    pub fn save(&self, root: &Path) -> Result<()> {
        let path = paths::config_path(root);
        let data = serde_yaml::to_string(self)?;
        crate::io::atomic_write(&path, data.as_bytes())
    }

    pub fn document_path(&self, root: &Path) -> PathBuf {
        paths::resolve(root, &self.document)
    }

    pub fn log_file(&self, root: &Path) -> Option<PathBuf> {
        self.log_path.as_deref().map(|p| paths::resolve(root, p))
    }

    // -----------------------------------------------------------------------
    // Validation
    // -----------------------------------------------------------------------

    pub fn validate(&self) -> Vec<ConfigWarning> {
        let mut warnings = Vec::new();

        match self.chunk_size_lines {
            0 => warnings.push(ConfigWarning::error("chunk_size_lines must be > 0")),
            n if n < 50 => warnings.push(ConfigWarning::warning(format!(
                "chunk_size_lines={n} is very small (recommended >= 100)"
            ))),
            n if n > 500 => warnings.push(ConfigWarning::warning(format!(
                "chunk_size_lines={n} is very large (recommended <= 200)"
            ))),
            _ => {}
        }

        let ratio = self.min_length_ratio;
        if !(ratio > 0.0 && ratio <= 1.0) {
            warnings.push(ConfigWarning::error(format!(
                "min_length_ratio={ratio} must be in (0, 1]"
            )));
        } else if ratio < 0.8 {
            warnings.push(ConfigWarning::warning(format!(
                "min_length_ratio={ratio} is low (recommended >= 0.9)"
            )));
        }

        let growth = &self.growth;
        match growth.target_line_count {
            0 => warnings.push(ConfigWarning::error("growth.target_line_count must be > 0")),
            n if n < 1000 => warnings.push(ConfigWarning::warning(format!(
                "growth.target_line_count={n} is small (recommended >= 5000)"
            ))),
            _ => {}
        }
        if !(growth.target_tolerance > 0.0 && growth.target_tolerance <= 1.0) {
            warnings.push(ConfigWarning::error(format!(
                "growth.target_tolerance={} must be in (0, 1]",
                growth.target_tolerance
            )));
        }
        if growth.max_passes == 0 {
            warnings.push(ConfigWarning::error("growth.max_passes must be > 0"));
        }
        if growth.max_chunks_per_pass == 0 {
            warnings.push(ConfigWarning::error(
                "growth.max_chunks_per_pass must be > 0",
            ));
        }

        if self.safety.max_consecutive_failures == 0 {
            warnings.push(ConfigWarning::error(
                "safety.max_consecutive_failures must be > 0",
            ));
        }

        if let ProviderConfig::Driver {
            program,
            transcript_command,
            wait_seconds,
            ..
        } = &self.provider
        {
            if program.trim().is_empty() {
                warnings.push(ConfigWarning::error("provider.program is empty"));
            } else if which::which(program).is_err() && !Path::new(program).exists() {
                warnings.push(ConfigWarning::warning(format!(
                    "provider.program '{program}' was not found on PATH"
                )));
            }
            if let Some(first) = transcript_command.first() {
                if which::which(first).is_err() {
                    warnings.push(ConfigWarning::warning(format!(
                        "provider.transcript_command '{first}' was not found on PATH"
                    )));
                }
            }
            if *wait_seconds == 0 {
                warnings.push(ConfigWarning::warning(
                    "provider.wait_seconds=0 leaves the assistant no time to answer",
                ));
            }
        }

        warnings
    }

    /// Validate and turn any error-level finding into `PrdError::InvalidConfig`.
    pub fn ensure_valid(&self) -> Result<()> {
        let errors: Vec<String> = self
            .validate()
            .into_iter()
            .filter(|w| w.level == WarnLevel::Error)
            .map(|w| w.message)
            .collect();
        if errors.is_empty() {
            Ok(())
        } else {
            Err(PrdError::InvalidConfig(errors.join("; ")))
        }
    }
}

fn project_name_for(root: &Path) -> String {
    root.file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .unwrap_or_else(|| "prd".to_string())
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
