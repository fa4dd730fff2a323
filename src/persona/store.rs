//! Persona storage on disk
//!
//! Structure: <personas_dir>/<slug>/<version>.yaml
//! Version names are timestamps, so the lexically greatest file is the latest.

use chrono::{SecondsFormat, Utc};
use eyre::{Context, Result};
use lazy_regex::regex_replace_all;
use std::fs;
use std::path::{Path, PathBuf};

use super::Persona;

/// Reads and writes persona version files
pub struct PersonaStore {
    root: PathBuf,
}

impl PersonaStore {
    pub fn new(root: PathBuf) -> Self {
        Self { root }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Load the latest version of every persona.
    ///
    /// Personas that fail to load, or whose traits are not finite numbers,
    /// are logged and skipped.
    pub fn load_all(&self) -> Result<Vec<Persona>> {
        let mut personas = Vec::new();

        if !self.root.exists() {
            log::info!("Personas directory does not exist: {}", self.root.display());
            return Ok(personas);
        }

        for slug in self.slugs()? {
            match self.load(&slug) {
                Ok(Some(persona)) => match persona.trait_vector() {
                    Ok(_) => personas.push(persona),
                    Err(e) => log::warn!("Skipping persona '{}': {:#}", slug, e),
                },
                Ok(None) => log::debug!("No versions found for persona '{}'", slug),
                Err(e) => log::warn!("Failed to load persona '{}': {:#}", slug, e),
            }
        }

        log::info!("Loaded {} personas from {}", personas.len(), self.root.display());
        Ok(personas)
    }

    /// Slug directories, sorted
    pub fn slugs(&self) -> Result<Vec<String>> {
        let entries = fs::read_dir(&self.root)
            .with_context(|| format!("Failed to read personas directory: {}", self.root.display()))?;

        let mut slugs: Vec<String> = entries
            .flatten()
            .filter(|e| e.path().is_dir())
            .filter_map(|e| e.file_name().to_str().map(|s| s.to_string()))
            .filter(|s| !s.starts_with('.'))
            .collect();
        slugs.sort();

        Ok(slugs)
    }

    /// Version names for a persona, oldest first
    pub fn versions(&self, slug: &str) -> Result<Vec<String>> {
        validate_segment("slug", slug)?;
        let dir = self.root.join(slug);

        if !dir.is_dir() {
            return Ok(Vec::new());
        }

        let entries =
            fs::read_dir(&dir).with_context(|| format!("Failed to read persona directory: {}", dir.display()))?;

        let mut versions: Vec<String> = entries
            .flatten()
            .map(|e| e.path())
            .filter(|p| p.is_file() && is_yaml(p))
            .filter_map(|p| p.file_stem().and_then(|s| s.to_str()).map(|s| s.to_string()))
            .collect();
        versions.sort();
        versions.dedup();

        Ok(versions)
    }

    /// Load the latest version of a persona, if it has any
    pub fn load(&self, slug: &str) -> Result<Option<Persona>> {
        match self.versions(slug)?.last() {
            Some(version) => self.load_version(slug, version).map(Some),
            None => Ok(None),
        }
    }

    /// Load one specific version of a persona
    pub fn load_version(&self, slug: &str, version: &str) -> Result<Persona> {
        validate_segment("slug", slug)?;
        validate_segment("version", version)?;

        let path = self.version_path(slug, version);
        let content =
            fs::read_to_string(&path).with_context(|| format!("Failed to read persona file: {}", path.display()))?;

        let mut persona: Persona = serde_yaml::from_str(&content)
            .with_context(|| format!("Failed to parse persona file: {}", path.display()))?;
        persona.slug = slug.to_string();

        Ok(persona)
    }

    /// Write a new version file for a persona, creating its directory as needed
    pub fn save_version(&self, slug: &str, version: &str, content: &str) -> Result<PathBuf> {
        validate_segment("slug", slug)?;
        validate_segment("version", version)?;

        let dir = self.root.join(slug);
        fs::create_dir_all(&dir).with_context(|| format!("Failed to create persona directory: {}", dir.display()))?;

        let path = dir.join(format!("{}.yaml", version));
        fs::write(&path, content).with_context(|| format!("Failed to write persona file: {}", path.display()))?;

        log::info!("Saved persona '{}' version {} to {}", slug, version, path.display());
        Ok(path)
    }

    fn version_path(&self, slug: &str, version: &str) -> PathBuf {
        let dir = self.root.join(slug);
        let yml = dir.join(format!("{}.yml", version));
        if yml.exists() && !dir.join(format!("{}.yaml", version)).exists() {
            return yml;
        }
        dir.join(format!("{}.yaml", version))
    }
}

/// Timestamp-based version name, safe for file names
pub fn new_version_name() -> String {
    Utc::now()
        .to_rfc3339_opts(SecondsFormat::Millis, true)
        .replace([':', '.'], "-")
}

/// Lowercase, hyphen-separated identifier derived from a display name
pub fn slugify(name: &str) -> String {
    let lower = name.to_lowercase();
    let hyphenated = regex_replace_all!(r"[^a-z0-9]+", &lower, "-");
    hyphenated.trim_matches('-').to_string()
}

fn is_yaml(path: &Path) -> bool {
    path.extension().map(|e| e == "yaml" || e == "yml").unwrap_or(false)
}

fn validate_segment(kind: &str, value: &str) -> Result<()> {
    if value.is_empty() {
        eyre::bail!("Persona {} must not be empty", kind);
    }
    if value.contains('/') || value.contains('\\') || value.contains("..") {
        eyre::bail!("Invalid persona {}: {}", kind, value);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::persona::Traits;
    use tempfile::TempDir;

    fn write_version(root: &Path, slug: &str, version: &str, body: &str) {
        let dir = root.join(slug);
        fs::create_dir_all(&dir).unwrap();
        fs::write(dir.join(format!("{}.yaml", version)), body).unwrap();
    }

    #[test]
    fn test_load_all_missing_dir_is_empty() {
        let temp = TempDir::new().unwrap();
        let store = PersonaStore::new(temp.path().join("nope"));
        assert!(store.load_all().unwrap().is_empty());
    }

    #[test]
    fn test_load_all_picks_latest_version() {
        let temp = TempDir::new().unwrap();
        write_version(temp.path(), "skeptic", "2024-01-01", "name: Old Skeptic\ntraits: [doubt]\n");
        write_version(temp.path(), "skeptic", "2024-06-01", "name: New Skeptic\ntraits: [doubt, rigor]\n");
        write_version(temp.path(), "dreamer", "2024-03-01", "name: Dreamer\ntraits:\n  hope: 0.9\n");

        let store = PersonaStore::new(temp.path().to_path_buf());
        let personas = store.load_all().unwrap();

        assert_eq!(personas.len(), 2);
        assert_eq!(personas[0].slug, "dreamer");
        assert_eq!(personas[1].slug, "skeptic");
        assert_eq!(personas[1].name, "New Skeptic");
        assert_eq!(personas[1].traits.len(), 2);
    }

    #[test]
    fn test_load_all_skips_broken_persona() {
        let temp = TempDir::new().unwrap();
        write_version(temp.path(), "good", "v1", "name: Good\ntraits: [kind]\n");
        write_version(temp.path(), "bad", "v1", "name: Bad\ntraits:\n  empathy: lots\n");
        fs::create_dir_all(temp.path().join("empty")).unwrap();

        let store = PersonaStore::new(temp.path().to_path_buf());
        let personas = store.load_all().unwrap();

        assert_eq!(personas.len(), 1);
        assert_eq!(personas[0].slug, "good");
    }

    #[test]
    fn test_load_all_skips_non_finite_traits() {
        let temp = TempDir::new().unwrap();
        write_version(temp.path(), "a", "v1", "name: A\ntraits:\n  x: 0.5\n");
        write_version(temp.path(), "b", "v1", "name: B\ntraits:\n  x: 0.9\n");
        write_version(temp.path(), "c", "v1", "name: C\ntraits:\n  x: .nan\n");

        let store = PersonaStore::new(temp.path().to_path_buf());
        let personas = store.load_all().unwrap();
        let slugs: Vec<&str> = personas.iter().map(|p| p.slug.as_str()).collect();

        assert_eq!(slugs, vec!["a", "b"]);
        assert!(crate::similarity::compute_similarities(&personas).is_ok());
        // Loading it directly still works; callers see the error on use
        assert!(store.load("c").unwrap().unwrap().trait_vector().is_err());
    }

    #[test]
    fn test_versions_sorted_and_filtered() {
        let temp = TempDir::new().unwrap();
        write_version(temp.path(), "historian", "b", "name: H\n");
        write_version(temp.path(), "historian", "a", "name: H\n");
        fs::write(temp.path().join("historian").join("notes.md"), "# notes").unwrap();

        let store = PersonaStore::new(temp.path().to_path_buf());
        assert_eq!(store.versions("historian").unwrap(), vec!["a", "b"]);
        assert!(store.versions("unknown").unwrap().is_empty());
    }

    #[test]
    fn test_save_then_load_version() {
        let temp = TempDir::new().unwrap();
        let store = PersonaStore::new(temp.path().to_path_buf());

        let persona = Persona::new("", "Pragmatist", Traits::Tags(vec!["practical".to_string()]));
        let content = serde_yaml::to_string(&persona).unwrap();
        let path = store.save_version("pragmatist", "v2", &content).unwrap();

        assert!(path.ends_with("pragmatist/v2.yaml"));
        let loaded = store.load("pragmatist").unwrap().unwrap();
        assert_eq!(loaded.slug, "pragmatist");
        assert_eq!(loaded.name, "Pragmatist");
    }

    #[test]
    fn test_save_rejects_path_traversal() {
        let temp = TempDir::new().unwrap();
        let store = PersonaStore::new(temp.path().to_path_buf());

        assert!(store.save_version("../escape", "v1", "name: x\n").is_err());
        assert!(store.save_version("ok", "a/b", "name: x\n").is_err());
        assert!(store.save_version("", "v1", "name: x\n").is_err());
    }

    #[test]
    fn test_new_version_name_is_file_safe() {
        let version = new_version_name();
        assert!(!version.contains(':'));
        assert!(!version.contains('.'));
        assert!(version.ends_with('Z'));
    }

    #[test]
    fn test_slugify() {
        assert_eq!(slugify("The Skeptic"), "the-skeptic");
        assert_eq!(slugify("  Meta: Dreamer + Historian! "), "meta-dreamer-historian");
        assert_eq!(slugify("---"), "");
    }
}
