//! Special locations and the filesystem context that resolves them.
//!
//! File-opening APIs take a [`SpecialLocation`] plus a relative path instead of
//! a full path. The [`FileSystem`] context maps each location to a root; it is
//! built explicitly (from platform defaults or per-location overrides) and
//! passed to every call that touches the disk, so there is no process-wide
//! registration step.
//!
//! ```no_run
//! use melodify_core::{FileSystem, SpecialLocation};
//!
//! let fs = FileSystem::builder()
//!     .app_name("karaoke")
//!     .root(SpecialLocation::Documents, "/srv/songs")
//!     .build();
//! let path = fs.resolve(SpecialLocation::Documents, "melody.mid")?;
//! # Ok::<(), melodify_core::Error>(())
//! ```

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fs::File;
use std::io::{BufReader, Cursor, Read, Seek};
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::debug;

/// Symbolic filesystem root.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SpecialLocation {
    /// The path is used as given.
    AbsolutePath,
    /// Per-application persistent data.
    AppData,
    /// Relative to the process working directory.
    Cwd,
    /// The user's documents folder.
    Documents,
    /// Per-application support files and caches.
    Library,
    /// Read-only packaged resources.
    Resources,
    /// Removable or shared storage. Mobile platforms only.
    ExternalStorage,
    /// Scratch files the OS may purge.
    Temporaries,
}

impl SpecialLocation {
    pub const ALL: [SpecialLocation; 8] = [
        SpecialLocation::AbsolutePath,
        SpecialLocation::AppData,
        SpecialLocation::Cwd,
        SpecialLocation::Documents,
        SpecialLocation::Library,
        SpecialLocation::Resources,
        SpecialLocation::ExternalStorage,
        SpecialLocation::Temporaries,
    ];

    /// Whether files may be created under this location.
    pub fn is_writable(&self) -> bool {
        !matches!(self, SpecialLocation::Resources)
    }
}

/// Seekable byte source returned by [`FileSystem::open_read`].
pub trait ReadSeek: Read + Seek + Send {}

impl<T: Read + Seek + Send> ReadSeek for T {}

/// In-memory read-only asset store, used to back [`SpecialLocation::Resources`]
/// where resources ship inside the application package.
#[derive(Debug, Default, Clone)]
pub struct AssetBundle {
    assets: HashMap<PathBuf, Arc<[u8]>>,
}

impl AssetBundle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn insert(&mut self, path: impl Into<PathBuf>, bytes: impl Into<Arc<[u8]>>) {
        self.assets.insert(path.into(), bytes.into());
    }

    pub fn get(&self, path: impl AsRef<Path>) -> Option<Arc<[u8]>> {
        self.assets.get(path.as_ref()).cloned()
    }

    pub fn contains(&self, path: impl AsRef<Path>) -> bool {
        self.assets.contains_key(path.as_ref())
    }

    pub fn len(&self) -> usize {
        self.assets.len()
    }

    pub fn is_empty(&self) -> bool {
        self.assets.is_empty()
    }
}

#[derive(Debug, Clone)]
enum Root {
    /// Path used verbatim (relative paths resolve against the process CWD).
    Verbatim,
    Directory(PathBuf),
    Bundle(Arc<AssetBundle>),
    Unavailable,
}

/// Resolves [`SpecialLocation`]s to concrete files.
#[derive(Debug, Clone)]
pub struct FileSystem {
    roots: HashMap<SpecialLocation, Root>,
}

impl FileSystem {
    /// Platform defaults for the given application name.
    pub fn platform(app_name: &str) -> Self {
        FileSystemBuilder::new().app_name(app_name).build()
    }

    pub fn builder() -> FileSystemBuilder {
        FileSystemBuilder::new()
    }

    /// Full path for `path` under `location`.
    pub fn resolve(&self, location: SpecialLocation, path: impl AsRef<Path>) -> Result<PathBuf> {
        let path = path.as_ref();
        match self.root(location) {
            Root::Verbatim => Ok(path.to_path_buf()),
            Root::Directory(dir) => Ok(dir.join(path)),
            Root::Bundle(_) => Err(Error::NotAPath(location)),
            Root::Unavailable => Err(Error::LocationUnavailable(location)),
        }
    }

    /// Whether `path` exists under `location`.
    pub fn exists(&self, location: SpecialLocation, path: impl AsRef<Path>) -> bool {
        match self.root(location) {
            Root::Bundle(bundle) => bundle.contains(path),
            _ => self
                .resolve(location, path)
                .map(|p| p.is_file())
                .unwrap_or(false),
        }
    }

    /// Open a file for buffered, seekable reading.
    pub fn open_read(
        &self,
        location: SpecialLocation,
        path: impl AsRef<Path>,
    ) -> Result<Box<dyn ReadSeek>> {
        let path = path.as_ref();
        if let Root::Bundle(bundle) = self.root(location) {
            let bytes = bundle
                .get(path)
                .ok_or_else(|| Error::NotFound(path.to_path_buf()))?;
            return Ok(Box::new(Cursor::new(bytes)));
        }

        let full = self.resolve(location, path)?;
        let file = File::open(&full).map_err(|e| not_found_or_io(e, &full))?;
        debug!("Opened {} for reading", full.display());
        Ok(Box::new(BufReader::new(file)))
    }

    /// Read a whole file into memory.
    pub fn read(&self, location: SpecialLocation, path: impl AsRef<Path>) -> Result<Vec<u8>> {
        let mut reader = self.open_read(location, path)?;
        let mut data = Vec::new();
        reader.read_to_end(&mut data)?;
        Ok(data)
    }

    /// Create (or truncate) a file for writing.
    pub fn create(&self, location: SpecialLocation, path: impl AsRef<Path>) -> Result<File> {
        if !location.is_writable() {
            return Err(Error::ReadOnlyLocation(location));
        }
        let full = self.resolve(location, path)?;
        let file = File::create(&full).map_err(|e| not_found_or_io(e, &full))?;
        debug!("Created {}", full.display());
        Ok(file)
    }

    fn root(&self, location: SpecialLocation) -> &Root {
        self.roots.get(&location).unwrap_or(&Root::Unavailable)
    }
}

impl Default for FileSystem {
    fn default() -> Self {
        Self::platform(env!("CARGO_PKG_NAME"))
    }
}

fn not_found_or_io(err: std::io::Error, path: &Path) -> Error {
    if err.kind() == std::io::ErrorKind::NotFound {
        Error::NotFound(path.to_path_buf())
    } else {
        Error::Io(err)
    }
}

/// Builder for [`FileSystem`]. Locations without an override use platform
/// folders; a location the platform lacks stays unavailable.
#[derive(Debug, Default)]
pub struct FileSystemBuilder {
    app_name: Option<String>,
    overrides: HashMap<SpecialLocation, Root>,
}

impl FileSystemBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    /// Subfolder name used under the per-user data roots.
    pub fn app_name(mut self, name: impl Into<String>) -> Self {
        self.app_name = Some(name.into());
        self
    }

    /// Map `location` to a directory.
    pub fn root(mut self, location: SpecialLocation, dir: impl Into<PathBuf>) -> Self {
        self.overrides.insert(location, Root::Directory(dir.into()));
        self
    }

    /// Serve [`SpecialLocation::Resources`] from an in-memory bundle.
    pub fn resources_bundle(mut self, bundle: AssetBundle) -> Self {
        self.overrides
            .insert(SpecialLocation::Resources, Root::Bundle(Arc::new(bundle)));
        self
    }

    /// Mark `location` as unavailable.
    pub fn disable(mut self, location: SpecialLocation) -> Self {
        self.overrides.insert(location, Root::Unavailable);
        self
    }

    pub fn build(self) -> FileSystem {
        let app = self.app_name.unwrap_or_else(|| "melodify".to_string());
        let mut roots = HashMap::new();

        for location in SpecialLocation::ALL {
            let root = match self.overrides.get(&location) {
                Some(root) => root.clone(),
                None => platform_root(location, &app),
            };
            roots.insert(location, root);
        }

        FileSystem { roots }
    }
}

fn platform_root(location: SpecialLocation, app: &str) -> Root {
    let dir = match location {
        SpecialLocation::AbsolutePath | SpecialLocation::Cwd => return Root::Verbatim,
        SpecialLocation::AppData => dirs::data_dir().map(|d| d.join(app)),
        SpecialLocation::Documents => dirs::document_dir(),
        SpecialLocation::Library => dirs::data_local_dir().map(|d| d.join(app)),
        SpecialLocation::Resources => std::env::current_exe()
            .ok()
            .and_then(|exe| exe.parent().map(Path::to_path_buf)),
        SpecialLocation::ExternalStorage => None,
        SpecialLocation::Temporaries => Some(std::env::temp_dir()),
    };
    dir.map(Root::Directory).unwrap_or(Root::Unavailable)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_override_roots() {
        let dir = tempfile::tempdir().unwrap();
        let fs = FileSystem::builder()
            .root(SpecialLocation::Documents, dir.path())
            .build();

        let path = fs.resolve(SpecialLocation::Documents, "song.mid").unwrap();
        assert_eq!(path, dir.path().join("song.mid"));

        std::fs::write(&path, b"abc").unwrap();
        assert!(fs.exists(SpecialLocation::Documents, "song.mid"));
        assert_eq!(fs.read(SpecialLocation::Documents, "song.mid").unwrap(), b"abc");
    }

    #[test]
    fn test_absolute_path_is_verbatim() {
        let fs = FileSystem::builder().build();
        let path = fs
            .resolve(SpecialLocation::AbsolutePath, "/tmp/x.wav")
            .unwrap();
        assert_eq!(path, PathBuf::from("/tmp/x.wav"));
    }

    #[test]
    fn test_external_storage_unavailable_on_desktop() {
        let fs = FileSystem::builder().build();
        assert!(matches!(
            fs.resolve(SpecialLocation::ExternalStorage, "a"),
            Err(Error::LocationUnavailable(SpecialLocation::ExternalStorage))
        ));
    }

    #[test]
    fn test_missing_file_reports_not_found() {
        let dir = tempfile::tempdir().unwrap();
        let fs = FileSystem::builder()
            .root(SpecialLocation::AppData, dir.path())
            .build();
        assert!(matches!(
            fs.open_read(SpecialLocation::AppData, "missing.mid"),
            Err(Error::NotFound(_))
        ));
    }

    #[test]
    fn test_bundle_resources_are_read_only() {
        let mut bundle = AssetBundle::new();
        bundle.insert("melody.mid", vec![1u8, 2, 3]);
        let fs = FileSystem::builder().resources_bundle(bundle).build();

        assert!(fs.exists(SpecialLocation::Resources, "melody.mid"));
        assert_eq!(
            fs.read(SpecialLocation::Resources, "melody.mid").unwrap(),
            vec![1, 2, 3]
        );
        assert!(matches!(
            fs.resolve(SpecialLocation::Resources, "melody.mid"),
            Err(Error::NotAPath(_))
        ));
        assert!(matches!(
            fs.create(SpecialLocation::Resources, "out.wav"),
            Err(Error::ReadOnlyLocation(_))
        ));
    }

    #[test]
    fn test_disable() {
        let fs = FileSystem::builder()
            .disable(SpecialLocation::Temporaries)
            .build();
        assert!(fs.resolve(SpecialLocation::Temporaries, "x").is_err());
    }
}
