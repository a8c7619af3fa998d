//! Model Loading
//!
//! Reads parser output from a schema search path. Each `*.json` document
//! holds one [`ProtoFile`]; documents are indexed by the file's declared
//! `path`, which is how `dependencies` refer to each other.

use indexmap::IndexMap;
use std::collections::{HashMap, HashSet, VecDeque};
use std::fs;
use std::path::{Component, Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

use crate::checksum::{BundleHasher, Checksum};
use crate::emit::MANIFEST_FILE;
use crate::error::{Result, SchemaError};
use crate::schema::ProtoFile;

/// Configuration for model loading
#[derive(Debug, Clone)]
pub struct LoadConfig {
    /// Skip documents matching these path prefixes
    pub skip_prefixes: Vec<String>,
    /// Document file extension
    pub extension: String,
}

impl Default for LoadConfig {
    fn default() -> Self {
        Self {
            skip_prefixes: vec![
                "target/".to_string(),
                ".git/".to_string(),
                "node_modules/".to_string(),
                "generated/".to_string(),
            ],
            extension: "json".to_string(),
        }
    }
}

impl LoadConfig {
    /// Skip `dir` when it lies under the search path `root`.
    ///
    /// Both paths are compared lexically, so a not-yet-created output
    /// directory can be excluded before the first write.
    pub fn exclude_dir(&mut self, root: &Path, dir: &Path) {
        let Ok(relative) = lexical(dir).strip_prefix(lexical(root)).map(Path::to_path_buf) else {
            return;
        };
        if relative.as_os_str().is_empty() {
            return;
        }
        let prefix = format!("{}/", relative.to_string_lossy().replace('\\', "/"));
        if !self.skip_prefixes.contains(&prefix) {
            self.skip_prefixes.push(prefix);
        }
    }
}

fn lexical(path: &Path) -> PathBuf {
    path.components()
        .filter(|c| !matches!(c, Component::CurDir))
        .collect()
}

/// Parsed files found on a search path
#[derive(Debug)]
pub struct ModelLoader {
    root: PathBuf,
    /// declared proto path → file, in discovery order
    files: IndexMap<String, ProtoFile>,
    /// document path relative to root → declared proto path
    by_document: HashMap<String, String>,
    bundle_hash: Checksum,
}

impl ModelLoader {
    /// Walk `proto_path` and parse every model document
    pub fn scan(proto_path: &Path, config: &LoadConfig) -> Result<Self> {
        if !proto_path.is_dir() {
            return Err(SchemaError::MissingFile(proto_path.display().to_string()));
        }

        let mut files = IndexMap::new();
        let mut by_document = HashMap::new();
        let mut hasher = BundleHasher::new();

        for entry in WalkDir::new(proto_path).sort_by_file_name() {
            let entry = match entry {
                Ok(entry) => entry,
                Err(e) => {
                    warn!(error = %e, "skipping unreadable search path entry");
                    continue;
                }
            };
            let path = entry.path();
            if !path.is_file() {
                continue;
            }
            if path.extension().map(|e| e != config.extension.as_str()).unwrap_or(true) {
                continue;
            }
            // Manifests written next to a model are not schema documents
            if path.file_name().map(|n| n == MANIFEST_FILE).unwrap_or(false) {
                continue;
            }

            let relative = path
                .strip_prefix(proto_path)
                .unwrap_or(path)
                .to_string_lossy()
                .replace('\\', "/");
            if config.skip_prefixes.iter().any(|p| relative.starts_with(p)) {
                continue;
            }

            let content = fs::read_to_string(path)?;
            hasher.update(&content);

            let file: ProtoFile = serde_json::from_str(&content).map_err(|e| {
                SchemaError::InvalidFormat(format!("{}: {}", path.display(), e))
            })?;
            let file = file.with_qualified_names();

            if files.contains_key(&file.path) {
                warn!(path = %file.path, document = %relative, "duplicate schema file, keeping the first");
                continue;
            }
            debug!(path = %file.path, document = %relative, "loaded schema file");
            by_document.insert(relative, file.path.clone());
            files.insert(file.path.clone(), file);
        }

        Ok(Self {
            root: proto_path.to_path_buf(),
            files,
            by_document,
            bundle_hash: hasher.finish(),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn len(&self) -> usize {
        self.files.len()
    }

    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Hash over every document read, in walk order
    pub fn bundle_hash(&self) -> &Checksum {
        &self.bundle_hash
    }

    /// Declared paths of every scanned file
    pub fn paths(&self) -> impl Iterator<Item = &str> {
        self.files.keys().map(String::as_str)
    }

    /// Every scanned file, in discovery order
    pub fn load_all(&self) -> Vec<ProtoFile> {
        self.files.values().cloned().collect()
    }

    /// The requested files plus their transitive dependencies, breadth-first.
    ///
    /// A source may be given as a declared proto path (`pkg/a.proto`) or as a
    /// document path relative to the search path (`pkg/a.proto.json`). With
    /// no sources, every scanned file is returned.
    pub fn load<S: AsRef<str>>(&self, sources: &[S]) -> Result<Vec<ProtoFile>> {
        if sources.is_empty() {
            return Ok(self.load_all());
        }

        let mut queue: VecDeque<&str> = VecDeque::new();
        for source in sources {
            queue.push_back(self.canonical_path(source.as_ref())?);
        }

        let mut seen = HashSet::new();
        let mut loaded = Vec::new();
        while let Some(path) = queue.pop_front() {
            if !seen.insert(path) {
                continue;
            }
            let file = self
                .files
                .get(path)
                .ok_or_else(|| SchemaError::MissingFile(path.to_string()))?;
            for dependency in &file.dependencies {
                queue.push_back(dependency);
            }
            loaded.push(file.clone());
        }

        debug!(requested = sources.len(), loaded = loaded.len(), "resolved file dependencies");
        Ok(loaded)
    }

    fn canonical_path(&self, source: &str) -> Result<&str> {
        if let Some((path, _)) = self.files.get_key_value(source) {
            return Ok(path);
        }
        self.by_document
            .get(source)
            .map(String::as_str)
            .ok_or_else(|| SchemaError::MissingFile(source.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn write(dir: &Path, relative: &str, content: &str) {
        let path = dir.join(relative);
        fs::create_dir_all(path.parent().unwrap()).unwrap();
        fs::write(path, content).unwrap();
    }

    fn search_path() -> TempDir {
        let dir = TempDir::new().unwrap();
        write(
            dir.path(),
            "pkg/a.proto.json",
            r#"{"path": "pkg/a.proto", "package": "pkg", "dependencies": ["pkg/b.proto"],
                "types": [{"kind": "message", "name": "A",
                           "fields": [{"label": "optional", "type": "B", "name": "b", "tag": 1}]}]}"#,
        );
        write(
            dir.path(),
            "pkg/b.proto.json",
            r#"{"path": "pkg/b.proto", "package": "pkg", "dependencies": ["common/c.proto"],
                "types": [{"kind": "message", "name": "B"}]}"#,
        );
        write(
            dir.path(),
            "common/c.proto.json",
            r#"{"path": "common/c.proto", "package": "common",
                "types": [{"kind": "enum", "name": "C", "constants": [{"name": "X", "tag": 0}]}]}"#,
        );
        write(dir.path(), "target/ignored.json", "not json at all");
        write(dir.path(), "README.md", "# schemas");
        dir
    }

    #[test]
    fn test_scan_indexes_by_declared_path() {
        let dir = search_path();
        let loader = ModelLoader::scan(dir.path(), &LoadConfig::default()).unwrap();

        assert_eq!(loader.len(), 3);
        let paths: Vec<&str> = loader.paths().collect();
        // Sorted walk: common/ before pkg/
        assert_eq!(paths, vec!["common/c.proto", "pkg/a.proto", "pkg/b.proto"]);

        let all = loader.load_all();
        assert_eq!(all[1].types[0].qualified_name(), "pkg.A");
    }

    #[test]
    fn test_load_follows_dependencies() {
        let dir = search_path();
        let loader = ModelLoader::scan(dir.path(), &LoadConfig::default()).unwrap();

        let files = loader.load(&["pkg/a.proto"]).unwrap();
        let paths: Vec<&str> = files.iter().map(|f| f.path.as_str()).collect();
        assert_eq!(paths, vec!["pkg/a.proto", "pkg/b.proto", "common/c.proto"]);

        let files = loader.load(&["pkg/b.proto.json"]).unwrap();
        assert_eq!(files.len(), 2);
    }

    #[test]
    fn test_missing_file() {
        let dir = search_path();
        let loader = ModelLoader::scan(dir.path(), &LoadConfig::default()).unwrap();
        match loader.load(&["nope.proto"]) {
            Err(SchemaError::MissingFile(path)) => assert_eq!(path, "nope.proto"),
            other => panic!("Expected MissingFile, got {:?}", other),
        }
    }

    #[test]
    fn test_invalid_document() {
        let dir = TempDir::new().unwrap();
        write(dir.path(), "bad.json", r#"{"package": "pkg"}"#);
        let err = ModelLoader::scan(dir.path(), &LoadConfig::default()).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidFormat(_)));
    }

    #[test]
    fn test_rescan_ignores_written_output() {
        use crate::config::OutputFormat;
        use crate::emit::write_model;
        use crate::pipeline::{compile, CompileRequest};

        let dir = search_path();
        let loader = ModelLoader::scan(dir.path(), &LoadConfig::default()).unwrap();
        let output = compile(&loader.load_all(), &CompileRequest::default()).unwrap();
        write_model(&dir.path().join("generated"), &output, None, OutputFormat::Pretty).unwrap();

        let rescanned = ModelLoader::scan(dir.path(), &LoadConfig::default()).unwrap();
        assert_eq!(rescanned.len(), 3);
        assert_eq!(rescanned.bundle_hash(), loader.bundle_hash());

        // A custom output directory needs excluding, its manifest never parses
        let out = dir.path().join("build/model");
        write_model(&out, &output, None, OutputFormat::Pretty).unwrap();
        let mut config = LoadConfig::default();
        config.exclude_dir(dir.path(), &out);
        assert!(config.skip_prefixes.contains(&"build/model/".to_string()));
        let rescanned = ModelLoader::scan(dir.path(), &config).unwrap();
        assert_eq!(rescanned.bundle_hash(), loader.bundle_hash());
    }

    #[test]
    fn test_manifest_is_skipped_at_any_depth() {
        let dir = search_path();
        write(dir.path(), "out/manifest.json", r#"{"files": [], "checksum": "00"}"#);
        let loader = ModelLoader::scan(dir.path(), &LoadConfig::default()).unwrap();
        assert_eq!(loader.len(), 3);
    }

    #[test]
    fn test_exclude_dir_is_lexical() {
        let mut config = LoadConfig::default();
        config.exclude_dir(Path::new("."), Path::new("./out"));
        config.exclude_dir(Path::new("schemas"), Path::new("elsewhere"));
        config.exclude_dir(Path::new("schemas"), Path::new("schemas"));
        config.exclude_dir(Path::new("."), Path::new("generated"));
        assert_eq!(
            config.skip_prefixes,
            vec!["target/", ".git/", "node_modules/", "generated/", "out/"]
        );
    }

    #[test]
    fn test_bundle_hash_is_stable() {
        let dir = search_path();
        let first = ModelLoader::scan(dir.path(), &LoadConfig::default()).unwrap();
        let second = ModelLoader::scan(dir.path(), &LoadConfig::default()).unwrap();
        assert_eq!(first.bundle_hash(), second.bundle_hash());
    }
}
