//! File index for quick open.
//!
//! An index is a flat list of files under a project root whose extension is in
//! the configured set. Searching matches the file name case-insensitively and
//! ranks exact-case prefixes first, then other prefixes, then substrings.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use ignore::WalkBuilder;
use parking_lot::RwLock;
use stride_worker::{TaskClass, WorkerRuntime};
use tokio::task::JoinHandle;

/// Extensions indexed when the config does not name any.
pub const DEFAULT_EXTENSIONS: &[&str] = &["png", "gif", "jpg", "jpeg", "sh", "text", "txt", "c", "h", "m", "mm", "swift", "js"];

/// Errors from building an index.
#[derive(Debug, thiserror::Error)]
pub enum IndexError {
	/// The project root is not a directory.
	#[error("not a directory: {}", .0.display())]
	NotADirectory(PathBuf),
}

/// Files of one project.
#[derive(Debug, Clone)]
pub struct ProjectIndex {
	root: PathBuf,
	files: Vec<PathBuf>,
}

impl ProjectIndex {
	/// Walks `root`, skipping hidden and ignored entries.
	///
	/// Entries that cannot be read are logged and skipped.
	pub fn build(root: &Path, extensions: &[String]) -> Result<Self, IndexError> {
		if !root.is_dir() {
			return Err(IndexError::NotADirectory(root.to_path_buf()));
		}
		let mut files = Vec::new();
		for entry in WalkBuilder::new(root).build() {
			let entry = match entry {
				Ok(entry) => entry,
				Err(error) => {
					tracing::debug!(root = %root.display(), %error, "project.index.skip");
					continue;
				}
			};
			if !entry.file_type().is_some_and(|t| t.is_file()) {
				continue;
			}
			let indexable = entry
				.path()
				.extension()
				.and_then(|e| e.to_str())
				.is_some_and(|ext| extensions.iter().any(|e| e == ext));
			if indexable {
				files.push(entry.into_path());
			}
		}
		files.sort();
		tracing::debug!(root = %root.display(), files = files.len(), "project.index.built");
		Ok(Self {
			root: root.to_path_buf(),
			files,
		})
	}

	/// Project root.
	pub fn root(&self) -> &Path {
		&self.root
	}

	/// Every indexed file, sorted by path.
	pub fn files(&self) -> &[PathBuf] {
		&self.files
	}

	/// Files whose name contains `pattern`, case-insensitively, best first.
	pub fn find_files(&self, pattern: &str) -> Vec<&Path> {
		let needle = pattern.to_lowercase();
		let mut hits: Vec<(u32, &Path)> = self
			.files
			.iter()
			.filter_map(|path| {
				let name = path.file_name()?.to_str()?;
				name.to_lowercase().contains(&needle).then(|| (match_score(name, pattern), path.as_path()))
			})
			.collect();
		hits.sort_by_key(|(score, _)| *score);
		hits.into_iter().map(|(_, path)| path).collect()
	}
}

/// Lower is better: 1 for a prefix, 2 for a case-insensitive prefix, 10 otherwise.
fn match_score(name: &str, pattern: &str) -> u32 {
	if name.starts_with(pattern) {
		1
	} else if name.to_lowercase().starts_with(&pattern.to_lowercase()) {
		2
	} else {
		10
	}
}

/// Open projects keyed by root.
#[derive(Debug, Default)]
pub struct ProjectRegistry {
	projects: RwLock<HashMap<PathBuf, Arc<ProjectIndex>>>,
	extensions: Vec<String>,
}

impl ProjectRegistry {
	/// Creates a registry indexing files with `extensions`.
	pub fn new(extensions: Vec<String>) -> Self {
		Self {
			projects: RwLock::new(HashMap::new()),
			extensions,
		}
	}

	/// Indexes `root` unless it is already open.
	pub fn open_project(&self, root: &Path) -> Result<Arc<ProjectIndex>, IndexError> {
		if let Some(index) = self.get(root) {
			return Ok(index);
		}
		self.refresh(root)
	}

	/// Re-indexes `root`, replacing any previous index.
	pub fn refresh(&self, root: &Path) -> Result<Arc<ProjectIndex>, IndexError> {
		let index = Arc::new(ProjectIndex::build(root, &self.extensions)?);
		self.projects.write().insert(root.to_path_buf(), index.clone());
		Ok(index)
	}

	/// Re-indexes `root` on the blocking pool.
	pub fn refresh_in_background(self: &Arc<Self>, runtime: &WorkerRuntime, root: PathBuf) -> JoinHandle<Result<Arc<ProjectIndex>, IndexError>> {
		let registry = Arc::clone(self);
		runtime.spawn_blocking(TaskClass::IoBlocking, move || registry.refresh(&root))
	}

	/// Index for exactly `root`.
	pub fn get(&self, root: &Path) -> Option<Arc<ProjectIndex>> {
		self.projects.read().get(root).cloned()
	}

	/// Index of the innermost open project containing `path`.
	pub fn project_for(&self, path: &Path) -> Option<Arc<ProjectIndex>> {
		self.projects
			.read()
			.iter()
			.filter(|(root, _)| path.starts_with(root))
			.max_by_key(|(root, _)| root.components().count())
			.map(|(_, index)| index.clone())
	}

	/// Forgets `root`. Returns false if it was not open.
	pub fn close_project(&self, root: &Path) -> bool {
		self.projects.write().remove(root).is_some()
	}

	/// Roots of all open projects, sorted.
	pub fn roots(&self) -> Vec<PathBuf> {
		let mut roots: Vec<_> = self.projects.read().keys().cloned().collect();
		roots.sort();
		roots
	}
}

#[cfg(test)]
mod tests {
	use std::fs;

	use pretty_assertions::assert_eq;

	use super::*;

	fn extensions() -> Vec<String> {
		DEFAULT_EXTENSIONS.iter().map(|e| e.to_string()).collect()
	}

	fn project() -> tempfile::TempDir {
		let dir = tempfile::tempdir().unwrap();
		let root = dir.path();
		fs::create_dir_all(root.join("Sources/App")).unwrap();
		fs::create_dir_all(root.join(".build")).unwrap();
		fs::write(root.join("Sources/App/main.swift"), "").unwrap();
		fs::write(root.join("Sources/App/Domain.swift"), "").unwrap();
		fs::write(root.join("Sources/App/MainView.swift"), "").unwrap();
		fs::write(root.join("Sources/App/notes.md"), "").unwrap();
		fs::write(root.join(".build/Cache.swift"), "").unwrap();
		fs::write(root.join("build.sh"), "").unwrap();
		dir
	}

	fn names(paths: &[&Path]) -> Vec<String> {
		paths.iter().map(|p| p.file_name().unwrap().to_string_lossy().into_owned()).collect()
	}

	#[test]
	fn indexes_configured_extensions_and_skips_hidden() {
		let dir = project();
		let index = ProjectIndex::build(dir.path(), &extensions()).unwrap();
		let all: Vec<&Path> = index.files().iter().map(PathBuf::as_path).collect();
		let mut found = names(&all);
		found.sort();
		assert_eq!(found, vec!["Domain.swift", "MainView.swift", "build.sh", "main.swift"]);
	}

	#[test]
	fn exact_prefix_ranks_first() {
		let dir = project();
		let index = ProjectIndex::build(dir.path(), &extensions()).unwrap();
		assert_eq!(names(&index.find_files("Main")), vec!["MainView.swift", "main.swift", "Domain.swift"]);
		assert_eq!(names(&index.find_files("main")), vec!["main.swift", "MainView.swift", "Domain.swift"]);
		assert!(index.find_files("zzz").is_empty());
	}

	#[test]
	fn build_rejects_files() {
		let dir = project();
		let err = ProjectIndex::build(&dir.path().join("build.sh"), &extensions()).unwrap_err();
		assert!(matches!(err, IndexError::NotADirectory(_)));
	}

	#[test]
	fn registry_lifecycle() {
		let dir = project();
		let registry = ProjectRegistry::new(extensions());
		let index = registry.open_project(dir.path()).unwrap();
		assert!(Arc::ptr_eq(&index, &registry.open_project(dir.path()).unwrap()));
		assert_eq!(registry.roots(), vec![dir.path().to_path_buf()]);

		let file = dir.path().join("Sources/App/main.swift");
		assert!(registry.project_for(&file).is_some());

		fs::write(dir.path().join("Sources/App/Extra.swift"), "").unwrap();
		let refreshed = registry.refresh(dir.path()).unwrap();
		assert_eq!(refreshed.files().len(), index.files().len() + 1);

		assert!(registry.close_project(dir.path()));
		assert!(!registry.close_project(dir.path()));
		assert!(registry.project_for(&file).is_none());
	}

	#[test]
	fn innermost_project_wins() {
		let dir = project();
		let registry = ProjectRegistry::new(extensions());
		registry.open_project(dir.path()).unwrap();
		let nested = dir.path().join("Sources");
		registry.open_project(&nested).unwrap();
		let owner = registry.project_for(&nested.join("App/main.swift")).unwrap();
		assert_eq!(owner.root(), nested);
	}

	#[tokio::test]
	async fn background_refresh_registers_project() {
		let dir = project();
		let registry = Arc::new(ProjectRegistry::new(extensions()));
		let index = registry.refresh_in_background(&WorkerRuntime::new(), dir.path().to_path_buf()).await.unwrap().unwrap();
		assert_eq!(index.files().len(), 4);
		assert!(Arc::ptr_eq(&index, &registry.get(dir.path()).unwrap()));
	}
}
