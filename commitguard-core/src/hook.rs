//! Hook definitions and the per-project hook configuration
//!
//! A project lists hook repositories in `.commitguard.toml`:
//!
//! ```toml
//! [[repos]]
//! repo = "https://example.com/hooks.git"
//! rev = "v1.0.0"
//!
//! [[repos.hooks]]
//! id = "trailing-whitespace"
//! args = ["--fix"]
//! ```
//!
//! Each hook repository publishes its hooks in a `hooks.toml` manifest at its
//! root. Project entries select hooks by id and may override any field. The
//! special repository `local` defines hooks inline, run from the project root.

use std::path::Path;

use serde::Deserialize;

use crate::{Error, Result};

/// Name of the project configuration file at the repository root
pub const CONFIG_FILE: &str = ".commitguard.toml";

/// Name of the manifest file at the root of a hook repository
pub const MANIFEST_FILE: &str = "hooks.toml";

/// Repository value that marks inline hooks
pub const LOCAL_REPO: &str = "local";

/// A fully-specified hook, ready to be resolved
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Hook {
    /// Identifier, unique within a repository
    pub id: String,
    /// Display name
    pub name: String,
    /// Command or script to run
    pub entry: String,
    /// Language tag selecting the executor
    pub language: String,
    /// Regex a path must match to be passed to the hook
    pub files: String,
    /// Regex excluding paths that `files` matched
    pub exclude: Option<String>,
    /// Extra arguments placed before the file names
    pub args: Vec<String>,
    /// Whether matched file names are appended to the command line
    pub pass_filenames: bool,
    /// Failures are reported but do not fail the run
    pub advisory: bool,
    /// Always show the hook's output
    pub verbose: bool,
    /// Extra dependencies installed next to the hook's environment
    pub additional_dependencies: Vec<String>,
}

/// A hook as published in a repository manifest
#[derive(Debug, Clone, Deserialize)]
pub struct HookDefinition {
    pub id: String,
    pub name: String,
    pub entry: String,
    pub language: String,
    #[serde(default)]
    pub files: String,
    #[serde(default)]
    pub exclude: Option<String>,
    #[serde(default)]
    pub args: Vec<String>,
    #[serde(default = "default_true")]
    pub pass_filenames: bool,
    #[serde(default)]
    pub advisory: bool,
    #[serde(default)]
    pub verbose: bool,
    #[serde(default)]
    pub additional_dependencies: Vec<String>,
}

fn default_true() -> bool {
    true
}

impl From<HookDefinition> for Hook {
    fn from(def: HookDefinition) -> Self {
        Self {
            id: def.id,
            name: def.name,
            entry: def.entry,
            language: def.language,
            files: def.files,
            exclude: def.exclude,
            args: def.args,
            pass_filenames: def.pass_filenames,
            advisory: def.advisory,
            verbose: def.verbose,
            additional_dependencies: def.additional_dependencies,
        }
    }
}

/// The `hooks.toml` manifest of a hook repository
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Manifest {
    #[serde(default)]
    pub hooks: Vec<HookDefinition>,
}

impl Manifest {
    /// Load the manifest from a checked-out hook repository
    pub fn load(repo_dir: &Path) -> Result<Self> {
        let path = repo_dir.join(MANIFEST_FILE);
        let contents = std::fs::read_to_string(&path).map_err(|e| {
            Error::Config(format!("Failed to read {}: {}", path.display(), e))
        })?;
        Self::parse(&contents)
            .map_err(|e| Error::Config(format!("Invalid manifest {}: {}", path.display(), e)))
    }

    fn parse(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    /// Find a hook by id
    pub fn find(&self, id: &str) -> Option<&HookDefinition> {
        self.hooks.iter().find(|h| h.id == id)
    }
}

/// A hook selection in the project configuration
///
/// Every field besides `id` overrides the manifest value when present. For
/// local hooks `name`, `entry` and `language` are required.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct HookConfig {
    pub id: String,
    pub name: Option<String>,
    pub entry: Option<String>,
    pub language: Option<String>,
    pub files: Option<String>,
    pub exclude: Option<String>,
    pub args: Option<Vec<String>>,
    pub pass_filenames: Option<bool>,
    pub advisory: Option<bool>,
    pub verbose: Option<bool>,
    pub additional_dependencies: Option<Vec<String>>,
}

impl HookConfig {
    /// Apply these overrides to a manifest definition
    pub fn apply(&self, def: &HookDefinition) -> Hook {
        let mut hook = Hook::from(def.clone());
        if let Some(name) = &self.name {
            hook.name = name.clone();
        }
        if let Some(entry) = &self.entry {
            hook.entry = entry.clone();
        }
        if let Some(language) = &self.language {
            hook.language = language.clone();
        }
        if let Some(files) = &self.files {
            hook.files = files.clone();
        }
        if self.exclude.is_some() {
            hook.exclude = self.exclude.clone();
        }
        if let Some(args) = &self.args {
            hook.args = args.clone();
        }
        if let Some(pass_filenames) = self.pass_filenames {
            hook.pass_filenames = pass_filenames;
        }
        if let Some(advisory) = self.advisory {
            hook.advisory = advisory;
        }
        if let Some(verbose) = self.verbose {
            hook.verbose = verbose;
        }
        if let Some(deps) = &self.additional_dependencies {
            hook.additional_dependencies = deps.clone();
        }
        hook
    }

    /// Build an inline hook, requiring the fields a manifest would supply
    pub fn to_local_hook(&self) -> Result<Hook> {
        let required = |field: &Option<String>, what: &str| {
            field.clone().ok_or_else(|| {
                Error::Config(format!("local hook `{}` is missing `{}`", self.id, what))
            })
        };

        let def = HookDefinition {
            id: self.id.clone(),
            name: required(&self.name, "name")?,
            entry: required(&self.entry, "entry")?,
            language: required(&self.language, "language")?,
            files: String::new(),
            exclude: None,
            args: Vec::new(),
            pass_filenames: true,
            advisory: false,
            verbose: false,
            additional_dependencies: Vec::new(),
        };
        Ok(self.apply(&def))
    }
}

/// A hook repository entry in the project configuration
#[derive(Debug, Clone, Deserialize)]
pub struct RepositoryConfig {
    /// Clone URL, or `local` for inline hooks
    #[serde(rename = "repo")]
    pub url: String,
    /// Revision to check out
    #[serde(default)]
    pub rev: String,
    /// Hooks selected from this repository, in run order
    #[serde(default)]
    pub hooks: Vec<HookConfig>,
}

impl RepositoryConfig {
    /// Whether this entry defines inline hooks
    pub fn is_local(&self) -> bool {
        self.url == LOCAL_REPO
    }
}

/// The parsed `.commitguard.toml`
#[derive(Debug, Clone, Default, Deserialize)]
pub struct ProjectConfig {
    #[serde(default)]
    pub repos: Vec<RepositoryConfig>,
}

impl ProjectConfig {
    /// Load and validate the project configuration
    pub fn load(path: &Path) -> Result<Self> {
        let contents = match std::fs::read_to_string(path) {
            Ok(contents) => contents,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(Error::Config(format!(
                    "No {} file was found at {}",
                    CONFIG_FILE,
                    path.display()
                )));
            }
            Err(e) => return Err(e.into()),
        };

        let config = Self::parse(&contents)
            .map_err(|e| Error::Config(format!("Failed to parse {}: {}", path.display(), e)))?;
        config.validate()?;
        Ok(config)
    }

    fn parse(contents: &str) -> std::result::Result<Self, toml::de::Error> {
        toml::from_str(contents)
    }

    fn validate(&self) -> Result<()> {
        for repo in &self.repos {
            if repo.url.trim().is_empty() {
                return Err(Error::Config("repository entry with an empty `repo`".to_string()));
            }
            if !repo.is_local() && repo.rev.trim().is_empty() {
                return Err(Error::Config(format!(
                    "repository {} is missing `rev`",
                    repo.url
                )));
            }
            if let Some(hook) = repo.hooks.iter().find(|h| h.id.trim().is_empty()) {
                return Err(Error::Config(format!(
                    "repository {} has a hook without an id (name: {:?})",
                    repo.url, hook.name
                )));
            }
        }
        Ok(())
    }
}
