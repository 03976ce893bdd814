//! Turning configured hooks into runnable ones
//!
//! Resolution clones every referenced hook repository through the store,
//! reads its manifest, applies project overrides and binds each hook to a
//! language executor. Any failure aborts the whole run before a hook starts.

use std::path::{Path, PathBuf};
use std::sync::Arc;

use indexmap::IndexSet;
use regex::Regex;

use commitguard_store::Store;

use crate::executor::{ExecutorRegistry, LanguageExecutor};
use crate::hook::{Hook, Manifest, RepositoryConfig};
use crate::{Error, Result};

/// Ordered, de-duplicated set of repository-relative paths
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct FileSet {
    paths: IndexSet<String>,
}

impl FileSet {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn iter(&self) -> impl Iterator<Item = &str> {
        self.paths.iter().map(String::as_str)
    }
}

impl FromIterator<String> for FileSet {
    fn from_iter<I: IntoIterator<Item = String>>(iter: I) -> Self {
        Self {
            paths: iter.into_iter().collect(),
        }
    }
}

/// Compiled `files` and `exclude` patterns of a hook
#[derive(Debug, Clone)]
pub struct FileFilter {
    files: Regex,
    exclude: Option<Regex>,
}

impl FileFilter {
    /// Compile a hook's patterns
    pub fn new(hook: &Hook) -> Result<Self> {
        let compile = |pattern: &str, field: &str| {
            Regex::new(pattern).map_err(|e| {
                Error::Config(format!("hook `{}` has an invalid `{}` pattern: {}", hook.id, field, e))
            })
        };

        Ok(Self {
            files: compile(&hook.files, "files")?,
            exclude: match hook.exclude.as_deref() {
                Some(pattern) if !pattern.is_empty() => Some(compile(pattern, "exclude")?),
                _ => None,
            },
        })
    }

    /// Whether a path is selected; patterns match anywhere in the path
    pub fn is_match(&self, path: &str) -> bool {
        self.files.is_match(path) && !self.exclude.as_ref().is_some_and(|re| re.is_match(path))
    }
}

/// A hook bound to its installed location and executor
#[derive(Clone)]
pub struct ResolvedHook {
    /// The hook after overrides
    pub hook: Hook,
    /// Repository URL, or `local`
    pub repo: String,
    /// Directory the hook's files live in
    pub prefix: PathBuf,
    filter: FileFilter,
    executor: Arc<dyn LanguageExecutor>,
}

impl std::fmt::Debug for ResolvedHook {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ResolvedHook")
            .field("id", &self.hook.id)
            .field("repo", &self.repo)
            .field("prefix", &self.prefix)
            .field("language", &self.executor.language())
            .finish_non_exhaustive()
    }
}

impl ResolvedHook {
    fn new(
        hook: Hook,
        repo: &str,
        prefix: PathBuf,
        registry: &ExecutorRegistry,
    ) -> Result<Self> {
        let executor = registry
            .get(&hook.language)
            .ok_or_else(|| Error::UnknownLanguage {
                hook: hook.id.clone(),
                language: hook.language.clone(),
            })?;
        let filter = FileFilter::new(&hook)?;

        Ok(Self {
            hook,
            repo: repo.to_string(),
            prefix,
            filter,
            executor,
        })
    }

    /// Executor bound to this hook's language
    pub fn executor(&self) -> &dyn LanguageExecutor {
        self.executor.as_ref()
    }
}

/// Paths in `files` the hook should receive, in input order
pub fn match_files(hook: &ResolvedHook, files: &FileSet) -> Vec<String> {
    files
        .iter()
        .filter(|path| hook.filter.is_match(path))
        .map(str::to_string)
        .collect()
}

/// Resolves configured repositories into runnable hooks
pub struct HookResolver<'a> {
    store: &'a Store,
    registry: &'a ExecutorRegistry,
    project_root: &'a Path,
}

impl<'a> HookResolver<'a> {
    pub fn new(store: &'a Store, registry: &'a ExecutorRegistry, project_root: &'a Path) -> Self {
        Self {
            store,
            registry,
            project_root,
        }
    }

    /// Resolve every hook, preserving configuration order
    pub async fn resolve(&self, repos: &[RepositoryConfig]) -> Result<Vec<ResolvedHook>> {
        let mut resolved = Vec::new();
        for repo in repos {
            if repo.is_local() {
                for config in &repo.hooks {
                    let hook = config.to_local_hook()?;
                    resolved.push(ResolvedHook::new(
                        hook,
                        &repo.url,
                        self.project_root.to_path_buf(),
                        self.registry,
                    )?);
                }
                continue;
            }

            let clone = self.store.clone_repo(&repo.url, &repo.rev, &[]).await?;
            let manifest = Manifest::load(&clone.path)?;

            for config in &repo.hooks {
                let def = manifest.find(&config.id).ok_or_else(|| {
                    Error::Config(format!(
                        "`{}` is not present in repository {}. Typo? Perhaps it is introduced in a newer version?",
                        config.id, repo.url
                    ))
                })?;
                let hook = config.apply(def);

                let prefix = if hook.additional_dependencies.is_empty() {
                    clone.path.clone()
                } else {
                    self.store
                        .clone_repo(&repo.url, &repo.rev, &hook.additional_dependencies)
                        .await?
                        .path
                };

                resolved.push(ResolvedHook::new(hook, &repo.url, prefix, self.registry)?);
            }
        }

        tracing::debug!(count = resolved.len(), "Resolved hooks");
        Ok(resolved)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::executor::test_hook;
    use crate::hook::HookConfig;
    use async_trait::async_trait;
    use commitguard_store::{Fetcher, StoreOptions};
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tempfile::TempDir;

    /// Writes a manifest instead of cloning
    struct ManifestFetcher {
        manifest: &'static str,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl Fetcher for ManifestFetcher {
        async fn fetch(&self, _url: &str, _rev: &str, dest: &Path) -> commitguard_store::Result<()> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            std::fs::write(dest.join("hooks.toml"), self.manifest)?;
            Ok(())
        }
    }

    const MANIFEST: &str = r#"
[[hooks]]
id = "no-orig"
name = "No .orig files"
entry = "Backup files found"
language = "fail"
files = '\.orig$'

[[hooks]]
id = "cobol"
name = "COBOL lint"
entry = "lint"
language = "cobol"
"#;

    async fn store(temp: &TempDir) -> (Store, Arc<ManifestFetcher>) {
        let fetcher = Arc::new(ManifestFetcher {
            manifest: MANIFEST,
            calls: AtomicUsize::new(0),
        });
        let store = Store::open(
            &temp.path().join("store"),
            fetcher.clone(),
            StoreOptions::default(),
        )
        .await
        .unwrap();
        (store, fetcher)
    }

    fn remote(hooks: Vec<HookConfig>) -> RepositoryConfig {
        RepositoryConfig {
            url: "https://example.com/hooks.git".to_string(),
            rev: "v1".to_string(),
            hooks,
        }
    }

    fn select(id: &str) -> HookConfig {
        HookConfig {
            id: id.to_string(),
            ..Default::default()
        }
    }

    fn files(paths: &[&str]) -> FileSet {
        paths.iter().map(|p| p.to_string()).collect()
    }

    #[test]
    fn test_match_files() {
        let registry = ExecutorRegistry::with_defaults();
        let mut hook = test_hook("fail", "x");
        hook.files = r"\.py$".to_string();
        hook.exclude = Some("^vendor/".to_string());
        let resolved = ResolvedHook::new(hook, "local", PathBuf::from("."), &registry).unwrap();

        let matched = match_files(
            &resolved,
            &files(&["b.py", "vendor/c.py", "a.txt", "src/a.py", "b.py"]),
        );
        assert_eq!(matched, vec!["b.py", "src/a.py"]);
    }

    #[test]
    fn test_empty_pattern_matches_everything() {
        let registry = ExecutorRegistry::with_defaults();
        let mut hook = test_hook("fail", "x");
        hook.exclude = Some(String::new());
        let resolved = ResolvedHook::new(hook, "local", PathBuf::from("."), &registry).unwrap();

        assert_eq!(match_files(&resolved, &files(&["a", "b/c"])).len(), 2);
        assert!(match_files(&resolved, &FileSet::new()).is_empty());
    }

    #[test]
    fn test_invalid_pattern() {
        let registry = ExecutorRegistry::with_defaults();
        let mut hook = test_hook("fail", "x");
        hook.files = "(".to_string();
        let err = ResolvedHook::new(hook, "local", PathBuf::from("."), &registry).unwrap_err();
        assert!(matches!(err, Error::Config(_)));
    }

    #[tokio::test]
    async fn test_resolve_remote_hook() {
        let temp = TempDir::new().unwrap();
        let (store, fetcher) = store(&temp).await;
        let registry = ExecutorRegistry::with_defaults();
        let resolver = HookResolver::new(&store, &registry, temp.path());

        let mut override_name = select("no-orig");
        override_name.name = Some("Renamed".to_string());
        let resolved = resolver
            .resolve(&[remote(vec![override_name, select("no-orig")])])
            .await
            .unwrap();

        assert_eq!(resolved.len(), 2);
        assert_eq!(resolved[0].hook.name, "Renamed");
        assert_eq!(resolved[1].hook.name, "No .orig files");
        assert_eq!(resolved[0].executor().language(), "fail");
        assert!(resolved[0].prefix.starts_with(store.root()));
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn test_additional_dependencies_get_own_clone() {
        let temp = TempDir::new().unwrap();
        let (store, fetcher) = store(&temp).await;
        let registry = ExecutorRegistry::with_defaults();
        let resolver = HookResolver::new(&store, &registry, temp.path());

        let mut with_deps = select("no-orig");
        with_deps.additional_dependencies = Some(vec!["extra".to_string()]);
        let resolved = resolver
            .resolve(&[remote(vec![select("no-orig"), with_deps])])
            .await
            .unwrap();

        assert_ne!(resolved[0].prefix, resolved[1].prefix);
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 2);
    }

    #[tokio::test]
    async fn test_unknown_hook_id() {
        let temp = TempDir::new().unwrap();
        let (store, _) = store(&temp).await;
        let registry = ExecutorRegistry::with_defaults();
        let resolver = HookResolver::new(&store, &registry, temp.path());

        let err = resolver.resolve(&[remote(vec![select("nope")])]).await.unwrap_err();
        assert!(err.to_string().contains("`nope` is not present"));
    }

    #[tokio::test]
    async fn test_unknown_language() {
        let temp = TempDir::new().unwrap();
        let (store, _) = store(&temp).await;
        let registry = ExecutorRegistry::with_defaults();
        let resolver = HookResolver::new(&store, &registry, temp.path());

        let err = resolver.resolve(&[remote(vec![select("cobol")])]).await.unwrap_err();
        assert!(matches!(err, Error::UnknownLanguage { ref language, .. } if language == "cobol"));
    }

    #[tokio::test]
    async fn test_local_hooks_skip_store() {
        let temp = TempDir::new().unwrap();
        let (store, fetcher) = store(&temp).await;
        let registry = ExecutorRegistry::with_defaults();
        let resolver = HookResolver::new(&store, &registry, temp.path());

        let local = RepositoryConfig {
            url: "local".to_string(),
            rev: String::new(),
            hooks: vec![HookConfig {
                id: "echo".to_string(),
                name: Some("Echo".to_string()),
                entry: Some("echo".to_string()),
                language: Some("system".to_string()),
                ..Default::default()
            }],
        };
        let resolved = resolver.resolve(&[local]).await.unwrap();

        assert_eq!(resolved.len(), 1);
        assert_eq!(resolved[0].prefix, temp.path());
        assert_eq!(fetcher.calls.load(Ordering::SeqCst), 0);
    }
}
