//! Local disk implementation using walkdir and std::fs.

use super::{is_dot_hidden, EntryKind, EntryMetadata, FailedEntry, FileSystem, FsEntry, Listing};
use filetime::FileTime;
use std::fs::{self, File, OpenOptions};
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use walkdir::WalkDir;

#[cfg(windows)]
const FILE_ATTRIBUTE_HIDDEN: u32 = 0x2;
#[cfg(windows)]
const FILE_ATTRIBUTE_SYSTEM: u32 = 0x4;

/// The local filesystem
#[derive(Debug, Clone, Copy, Default)]
pub struct LocalFileSystem;

impl LocalFileSystem {
    pub fn new() -> Self {
        Self
    }

    /// Describe a listed child. Links are classified by their target; a
    /// dangling link is reported as a file.
    fn describe(&self, path: &Path, is_link: bool) -> io::Result<FsEntry> {
        let link_metadata = fs::symlink_metadata(path)?;
        let metadata = if is_link {
            fs::metadata(path).unwrap_or(link_metadata)
        } else {
            link_metadata
        };

        let kind = if metadata.is_dir() {
            EntryKind::Directory
        } else {
            EntryKind::File
        };

        Ok(FsEntry {
            path: path.to_path_buf(),
            kind,
            is_link,
            metadata: convert_metadata(path, &metadata),
        })
    }
}

fn convert_metadata(path: &Path, metadata: &fs::Metadata) -> EntryMetadata {
    #[cfg(windows)]
    let (hidden, system) = {
        use std::os::windows::fs::MetadataExt;
        let attributes = metadata.file_attributes();
        (
            attributes & FILE_ATTRIBUTE_HIDDEN != 0 || is_dot_hidden(path),
            attributes & FILE_ATTRIBUTE_SYSTEM != 0,
        )
    };
    #[cfg(not(windows))]
    let (hidden, system) = (is_dot_hidden(path), false);

    EntryMetadata {
        size: if metadata.is_dir() { 0 } else { metadata.len() },
        hidden,
        system,
    }
}

impl FileSystem for LocalFileSystem {
    fn list_children(&self, dir: &Path) -> io::Result<Listing> {
        let walker = WalkDir::new(dir)
            .min_depth(1)
            .max_depth(1)
            .follow_links(false)
            .sort_by_file_name();

        let mut listing = Listing::default();
        for entry in walker {
            let entry = match entry {
                Ok(entry) => entry,
                // Depth 0 is `dir` itself
                Err(e) if e.depth() == 0 => return Err(io::Error::from(e)),
                Err(e) => {
                    let path = e.path().unwrap_or(dir).to_path_buf();
                    listing.failures.push(FailedEntry {
                        path,
                        source: io::Error::from(e),
                    });
                    continue;
                }
            };

            match self.describe(entry.path(), entry.path_is_symlink()) {
                Ok(child) => listing.entries.push(child),
                Err(source) => listing.failures.push(FailedEntry {
                    path: entry.path().to_path_buf(),
                    source,
                }),
            }
        }
        Ok(listing)
    }

    fn metadata(&self, path: &Path) -> io::Result<EntryMetadata> {
        let metadata = fs::metadata(path)?;
        Ok(convert_metadata(path, &metadata))
    }

    fn exists(&self, path: &Path) -> bool {
        fs::symlink_metadata(path).is_ok()
    }

    fn is_dir(&self, path: &Path) -> bool {
        path.is_dir()
    }

    fn canonicalize(&self, path: &Path) -> io::Result<PathBuf> {
        fs::canonicalize(path)
    }

    fn open_read(&self, path: &Path) -> io::Result<Box<dyn Read + Send>> {
        Ok(Box::new(File::open(path)?))
    }

    fn create_dir(&self, path: &Path) -> io::Result<()> {
        fs::create_dir(path)
    }

    fn create_dir_all(&self, path: &Path) -> io::Result<()> {
        fs::create_dir_all(path)
    }

    fn create_new_file(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        let file = OpenOptions::new().write(true).create_new(true).open(path)?;
        Ok(Box::new(file))
    }

    fn create_or_truncate_file(&self, path: &Path) -> io::Result<Box<dyn Write + Send>> {
        let file = OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        Ok(Box::new(file))
    }

    fn copy_permissions(&self, from: &Path, to: &Path) -> io::Result<()> {
        let permissions = fs::metadata(from)?.permissions();
        fs::set_permissions(to, permissions)
    }

    fn copy_times(&self, from: &Path, to: &Path) -> io::Result<()> {
        let metadata = fs::metadata(from)?;
        let accessed = FileTime::from_last_access_time(&metadata);
        let modified = FileTime::from_last_modification_time(&metadata);
        filetime::set_file_times(to, accessed, modified)
    }

    fn remove_file(&self, path: &Path) -> io::Result<()> {
        fs::remove_file(path)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn list_children_is_sorted_and_shallow() {
        let temp_dir = TempDir::new().unwrap();
        fs::write(temp_dir.path().join("b.txt"), b"b").unwrap();
        fs::write(temp_dir.path().join("a.txt"), b"a").unwrap();
        fs::create_dir(temp_dir.path().join("sub")).unwrap();
        fs::write(temp_dir.path().join("sub").join("deep.txt"), b"deep").unwrap();

        let children = LocalFileSystem
            .list_children(temp_dir.path())
            .unwrap()
            .entries;
        let names: Vec<_> = children
            .iter()
            .map(|c| c.path.file_name().unwrap().to_string_lossy().into_owned())
            .collect();

        assert_eq!(names, vec!["a.txt", "b.txt", "sub"]);
        assert!(children[2].is_dir());
        assert_eq!(children[0].size(), 1);
    }

    #[test]
    fn list_children_of_missing_directory_fails() {
        let temp_dir = TempDir::new().unwrap();
        let result = LocalFileSystem.list_children(&temp_dir.path().join("missing"));
        assert!(result.is_err());
    }

    #[test]
    fn create_new_file_refuses_existing_path() {
        let temp_dir = TempDir::new().unwrap();
        let path = temp_dir.path().join("taken.txt");
        fs::write(&path, b"original").unwrap();

        let error = LocalFileSystem.create_new_file(&path).err().unwrap();
        assert_eq!(error.kind(), io::ErrorKind::AlreadyExists);
        assert_eq!(fs::read(&path).unwrap(), b"original");
    }

    #[test]
    fn copy_times_propagates_modification_time() {
        let temp_dir = TempDir::new().unwrap();
        let from = temp_dir.path().join("from.txt");
        let to = temp_dir.path().join("to.txt");
        fs::write(&from, b"x").unwrap();
        fs::write(&to, b"x").unwrap();

        let past = FileTime::from_unix_time(1_000_000_000, 0);
        filetime::set_file_times(&from, past, past).unwrap();

        LocalFileSystem.copy_times(&from, &to).unwrap();

        let copied = FileTime::from_last_modification_time(&fs::metadata(&to).unwrap());
        assert_eq!(copied, past);
    }

    #[cfg(unix)]
    #[test]
    fn symlinked_directory_is_reported_as_link() {
        let temp_dir = TempDir::new().unwrap();
        let target = temp_dir.path().join("target");
        fs::create_dir(&target).unwrap();
        std::os::unix::fs::symlink(&target, temp_dir.path().join("link")).unwrap();

        let children = LocalFileSystem
            .list_children(temp_dir.path())
            .unwrap()
            .entries;
        let link = children
            .iter()
            .find(|c| c.path.ends_with("link"))
            .unwrap();

        assert!(link.is_link);
        assert!(link.is_dir());
    }
}
