pub mod error;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use std::env;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};

use self::error::ConfigError;

/// Name of the configuration file searched for upward from the target
pub const CONFIG_FILE_NAME: &str = "gnogen.toml";

/// Go module that hosts the translated packages
pub const DEFAULT_MODULE_ROOT: &str = "github.com/gnolang/gno";

/// Go standard library packages (and `std`) that gno code may import
pub const DEFAULT_STDLIB_WHITELIST: &[&str] = &[
    // go
    "bufio",
    "bytes",
    "compress/gzip",
    "context",
    "crypto/md5",
    "crypto/sha1",
    "crypto/chacha20",
    "crypto/cipher",
    "crypto/sha256",
    "encoding/base64",
    "encoding/binary",
    "encoding/hex",
    "encoding/json",
    "encoding/xml",
    "errors",
    "hash",
    "hash/adler32",
    "internal/bytealg",
    "internal/os",
    "flag",
    "fmt",
    "io",
    "io/util",
    "math",
    "math/big",
    "math/bits",
    "math/rand",
    "net/url",
    "path",
    "regexp",
    "sort",
    "strconv",
    "strings",
    "text/template",
    "time",
    "unicode",
    "unicode/utf8",
    // gno
    "std",
];

/// Main configuration structure for gnogen
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct Config {
    /// Go module path the rewritten imports are rooted at
    pub module_root: String,

    /// Target of the `std` import; derived from `module_root` when unset
    pub std_shim: Option<String>,

    /// Test and filetest files may import anything
    pub skip_whitelist_for_tests: bool,

    /// Additional trusted import prefixes
    pub extra_prefix_allowlist: Vec<String>,

    pub whitelist: WhitelistConfig,

    pub toolchain: ToolchainConfig,

    /// Log level: error, warn, info, debug, trace
    pub log_level: Option<String>,
}

/// Import whitelist lists
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct WhitelistConfig {
    /// Exact import paths
    pub exact: Vec<String>,
    /// Import path prefixes
    pub prefixes: Vec<String>,
}

/// External Go tools
#[derive(Debug, Deserialize, Serialize, Clone)]
#[serde(default)]
pub struct ToolchainConfig {
    pub go: String,
    /// May carry extra arguments, e.g. `"gofmt -s"`
    pub gofmt: String,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            module_root: DEFAULT_MODULE_ROOT.to_string(),
            std_shim: None,
            skip_whitelist_for_tests: true,
            extra_prefix_allowlist: Vec::new(),
            whitelist: WhitelistConfig::default(),
            toolchain: ToolchainConfig::default(),
            log_level: None,
        }
    }
}

impl Default for WhitelistConfig {
    fn default() -> Self {
        Self {
            exact: DEFAULT_STDLIB_WHITELIST
                .iter()
                .map(|s| s.to_string())
                .collect(),
            prefixes: vec![format!("{}/_test", DEFAULT_MODULE_ROOT)],
        }
    }
}

impl Default for ToolchainConfig {
    fn default() -> Self {
        Self {
            go: "go".to_string(),
            gofmt: "gofmt".to_string(),
        }
    }
}

impl Config {
    /// Load configuration from gnogen.toml
    pub fn load(target_path: impl AsRef<Path>) -> Result<Self> {
        let config_path =
            find_config_file(target_path.as_ref()).context("Failed to find gnogen.toml")?;

        Self::from_file(&config_path)
    }

    /// Load gnogen.toml if one exists, falling back to the built-in defaults
    pub fn load_or_default(target_path: impl AsRef<Path>) -> Result<Self> {
        match find_config_file(target_path.as_ref()) {
            Ok(config_path) => Self::from_file(&config_path),
            Err(ConfigError::NotFound(dir)) => {
                debug!("No {} above {}, using defaults", CONFIG_FILE_NAME, dir);
                Ok(Self::default())
            }
            Err(e) => Err(e.into()),
        }
    }

    fn from_file(config_path: &Path) -> Result<Self> {
        let config_data = fs::read_to_string(config_path)
            .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;

        let mut config: Config =
            toml::from_str(&config_data).map_err(ConfigError::from)?;

        config.expand_env_vars();
        config.validate()?;

        debug!("Loaded configuration from {}", config_path.display());
        Ok(config)
    }

    /// Validate that required fields are present
    pub fn validate(&self) -> error::Result<()> {
        if self.module_root.trim().is_empty() {
            return Err(ConfigError::MissingField("module_root".to_string()));
        }
        if self.module_root.ends_with('/') {
            return Err(ConfigError::Invalid(format!(
                "module_root must not end with '/': {}",
                self.module_root
            )));
        }
        if self.toolchain.go.trim().is_empty() {
            return Err(ConfigError::MissingField("toolchain.go".to_string()));
        }
        if self.toolchain.gofmt.trim().is_empty() {
            return Err(ConfigError::MissingField("toolchain.gofmt".to_string()));
        }
        if self.whitelist.prefixes.iter().any(|p| p.is_empty())
            || self.extra_prefix_allowlist.iter().any(|p| p.is_empty())
        {
            warn!("Empty prefix in the import allowlist would allow every import");
            return Err(ConfigError::Invalid(
                "empty import prefix in allowlist".to_string(),
            ));
        }
        Ok(())
    }

    /// Expand `${VAR}` values in the toolchain section
    fn expand_env_vars(&mut self) {
        if let Some(expanded) = expand_env_var(&self.toolchain.go) {
            self.toolchain.go = expanded;
        }
        if let Some(expanded) = expand_env_var(&self.toolchain.gofmt) {
            self.toolchain.gofmt = expanded;
        }
    }

    /// Import path that replaces `std`
    pub fn std_shim_path(&self) -> String {
        self.std_shim
            .clone()
            .unwrap_or_else(|| format!("{}/gnovm/stdlibs/stdshim", self.module_root))
    }

    /// Directory under the module root holding the gno.land packages
    pub fn examples_root(&self) -> String {
        format!("{}/examples", self.module_root)
    }

    /// All trusted prefixes: configured ones followed by the extra allowlist
    pub fn allowed_prefixes(&self) -> Vec<String> {
        self.whitelist
            .prefixes
            .iter()
            .chain(self.extra_prefix_allowlist.iter())
            .cloned()
            .collect()
    }
}

/// Find gnogen.toml by searching upward from the given path
fn find_config_file(start_path: &Path) -> error::Result<PathBuf> {
    let current_dir = if start_path.is_file() {
        start_path
            .parent()
            .ok_or_else(|| ConfigError::Invalid("Invalid file path".to_string()))?
    } else {
        start_path
    };

    let mut current_dir = current_dir.canonicalize()?;

    loop {
        let config_path = current_dir.join(CONFIG_FILE_NAME);
        if config_path.exists() {
            return Ok(config_path);
        }

        match current_dir.parent() {
            Some(parent) => current_dir = parent.to_path_buf(),
            None => break,
        }
    }

    Err(ConfigError::NotFound(start_path.display().to_string()))
}

/// Expand environment variable in the format ${VAR_NAME}
fn expand_env_var(value: &str) -> Option<String> {
    if value.starts_with("${") && value.ends_with('}') {
        let var_name = &value[2..value.len() - 1];
        env::var(var_name).ok()
    } else {
        None
    }
}
