//! Configuration types.

use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};

use regex::Regex;

use crate::error::ConfigError;

/// Prefix pattern used when `PREFIX` is not set.
pub const DEFAULT_PREFIX: &str = r"^[°•π÷×¶∆£¢€¥®™✓_=|~!?#$%^&.+\-,\\/]";

/// Maximum number of chained stage transitions in one turn.
pub const DEFAULT_MAX_CHAIN_DEPTH: usize = 8;

/// A comma-separated list of user identifiers.
///
/// - `*` → everyone
/// - empty → nobody
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct AllowList {
    entries: Vec<String>,
}

impl AllowList {
    /// Parse a comma-separated list, trimming entries and skipping blanks.
    pub fn parse(raw: &str) -> Self {
        Self {
            entries: raw
                .split(',')
                .map(|s| s.trim().to_string())
                .filter(|s| !s.is_empty())
                .collect(),
        }
    }

    /// A list that admits everyone.
    pub fn everyone() -> Self {
        Self {
            entries: vec!["*".to_string()],
        }
    }

    pub fn contains(&self, user_id: &str) -> bool {
        self.entries.iter().any(|e| e == "*" || e == user_id)
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> &[String] {
        &self.entries
    }
}

/// Bot configuration, built from environment variables.
#[derive(Debug, Clone)]
pub struct BotConfig {
    /// Regex recognizing command prefixes.
    pub prefix: Regex,
    /// Administrative users, exempt from the public-mode gate.
    pub owners: AllowList,
    /// Initial value of the public-mode flag.
    pub public: bool,
    /// Users allowed to talk to the stage engine.
    pub authorized_users: AllowList,
    /// Directory holding `stages.db`.
    pub data_dir: PathBuf,
    /// File the mode toggle persists `PUBLIC` to.
    pub env_file: PathBuf,
    /// Upper bound on chained transitions per turn.
    pub max_chain_depth: usize,
}

impl BotConfig {
    /// Build config from environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        let prefix_raw = std::env::var("PREFIX").unwrap_or_else(|_| DEFAULT_PREFIX.to_string());
        let prefix = Regex::new(&prefix_raw).map_err(|e| ConfigError::InvalidValue {
            key: "PREFIX".into(),
            message: e.to_string(),
        })?;

        let owners = AllowList::parse(&std::env::var("OWNER").unwrap_or_default());

        let public = parse_public(std::env::var("PUBLIC").ok().as_deref());

        let authorized_users = std::env::var("AUTHORIZED_USERS")
            .map(|raw| AllowList::parse(&raw))
            .unwrap_or_else(|_| AllowList::everyone());

        let data_dir = std::env::var("DATA_DIR")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from("."));

        let env_file = std::env::var("ENV_FILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from(".env"));

        let max_chain_depth: usize = std::env::var("STAGE_MAX_CHAIN_DEPTH")
            .ok()
            .and_then(|s| s.parse().ok())
            .filter(|d| *d > 0)
            .unwrap_or(DEFAULT_MAX_CHAIN_DEPTH);

        Ok(Self {
            prefix,
            owners,
            public,
            authorized_users,
            data_dir,
            env_file,
            max_chain_depth,
        })
    }

    /// Path of the stage database inside `data_dir`.
    pub fn db_path(&self) -> PathBuf {
        self.data_dir.join("stages.db")
    }
}

impl Default for BotConfig {
    fn default() -> Self {
        Self {
            prefix: Regex::new(DEFAULT_PREFIX).expect("default prefix pattern is valid"),
            owners: AllowList::default(),
            public: true,
            authorized_users: AllowList::everyone(),
            data_dir: PathBuf::from("."),
            env_file: PathBuf::from(".env"),
            max_chain_depth: DEFAULT_MAX_CHAIN_DEPTH,
        }
    }
}

/// Only a literal `false` turns public mode off.
fn parse_public(raw: Option<&str>) -> bool {
    !matches!(raw.map(str::trim), Some("false"))
}

// ── Runtime mode ────────────────────────────────────────────────────

/// Process-wide public/private mode flag, persisted to an env file.
#[derive(Debug)]
pub struct BotMode {
    public: AtomicBool,
    env_file: EnvFile,
}

impl BotMode {
    pub fn new(public: bool, env_file: EnvFile) -> Self {
        Self {
            public: AtomicBool::new(public),
            env_file,
        }
    }

    pub fn is_public(&self) -> bool {
        self.public.load(Ordering::SeqCst)
    }

    /// Flip the flag and persist it. Returns the new value.
    ///
    /// The in-memory flag is flipped even when persisting fails.
    pub fn toggle(&self) -> Result<bool, ConfigError> {
        let next = !self.public.fetch_xor(true, Ordering::SeqCst);
        self.env_file.set("PUBLIC", if next { "true" } else { "false" })?;
        Ok(next)
    }

    pub fn env_file(&self) -> &EnvFile {
        &self.env_file
    }
}

/// A `KEY=value` file rewritten one key at a time.
#[derive(Debug, Clone)]
pub struct EnvFile {
    path: PathBuf,
}

impl EnvFile {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Replace the first `key=` line, or append one. Creates the file if missing.
    pub fn set(&self, key: &str, value: &str) -> Result<(), ConfigError> {
        let existing = match std::fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => String::new(),
            Err(e) => return Err(self.io_err(e)),
        };

        let entry = format!("{key}={value}");
        let marker = format!("{key}=");
        let mut lines: Vec<String> = existing.lines().map(String::from).collect();

        match lines.iter_mut().find(|l| l.starts_with(&marker)) {
            Some(line) => *line = entry,
            None => lines.push(entry),
        }

        let mut output = lines.join("\n");
        output.push('\n');
        std::fs::write(&self.path, output).map_err(|e| self.io_err(e))
    }

    /// Read a key's value, if present.
    pub fn get(&self, key: &str) -> Result<Option<String>, ConfigError> {
        let contents = match std::fs::read_to_string(&self.path) {
            Ok(s) => s,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(None),
            Err(e) => return Err(self.io_err(e)),
        };
        let marker = format!("{key}=");
        Ok(contents
            .lines()
            .find_map(|l| l.strip_prefix(&marker))
            .map(|v| v.trim().to_string()))
    }

    fn io_err(&self, source: std::io::Error) -> ConfigError {
        ConfigError::EnvFile {
            path: self.path.display().to_string(),
            source,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn allow_list_parsing() {
        let list = AllowList::parse(" 5511999, 5522888 ,,");
        assert_eq!(list.entries(), &["5511999".to_string(), "5522888".to_string()]);
        assert!(list.contains("5522888"));
        assert!(!list.contains("5533777"));
    }

    #[test]
    fn allow_list_wildcard_and_empty() {
        assert!(AllowList::everyone().contains("anyone"));
        let empty = AllowList::parse("");
        assert!(empty.is_empty());
        assert!(!empty.contains("anyone"));
    }

    #[test]
    fn public_only_off_for_literal_false() {
        assert!(!parse_public(Some("false")));
        assert!(!parse_public(Some(" false ")));
        assert!(parse_public(Some("true")));
        assert!(parse_public(Some("yes")));
        assert!(parse_public(None));
    }

    #[test]
    fn default_prefix_matches_common_prefixes() {
        let config = BotConfig::default();
        for token in ["/mode", ".mode", "!mode", "#mode"] {
            assert!(config.prefix.is_match(token), "{token} should have a prefix");
        }
        assert!(!config.prefix.is_match("mode"));
    }

    #[test]
    fn env_file_updates_existing_key() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".env");
        std::fs::write(&path, "OWNER=1\nPUBLIC=false\nPREFIX=^/").unwrap();

        let file = EnvFile::new(&path);
        file.set("PUBLIC", "true").unwrap();

        let contents = std::fs::read_to_string(&path).unwrap();
        assert_eq!(contents, "OWNER=1\nPUBLIC=true\nPREFIX=^/\n");
        assert_eq!(file.get("PUBLIC").unwrap().as_deref(), Some("true"));
    }

    #[test]
    fn env_file_appends_missing_key_and_creates_file() {
        let tmp = tempfile::tempdir().unwrap();
        let path = tmp.path().join(".env");

        let file = EnvFile::new(&path);
        assert_eq!(file.get("PUBLIC").unwrap(), None);
        file.set("PUBLIC", "false").unwrap();
        file.set("OWNER", "42").unwrap();

        assert_eq!(file.get("PUBLIC").unwrap().as_deref(), Some("false"));
        assert_eq!(file.get("OWNER").unwrap().as_deref(), Some("42"));
    }

    #[test]
    fn mode_toggle_flips_and_persists() {
        let tmp = tempfile::tempdir().unwrap();
        let mode = BotMode::new(false, EnvFile::new(tmp.path().join(".env")));

        assert!(mode.toggle().unwrap());
        assert!(mode.is_public());
        assert_eq!(mode.env_file().get("PUBLIC").unwrap().as_deref(), Some("true"));

        assert!(!mode.toggle().unwrap());
        assert!(!mode.is_public());
        assert_eq!(mode.env_file().get("PUBLIC").unwrap().as_deref(), Some("false"));
    }

    #[test]
    fn mode_toggle_reports_unwritable_file() {
        let tmp = tempfile::tempdir().unwrap();
        // A directory cannot be written as a file.
        let mode = BotMode::new(true, EnvFile::new(tmp.path()));
        assert!(mode.toggle().is_err());
        assert!(!mode.is_public());
    }
}
