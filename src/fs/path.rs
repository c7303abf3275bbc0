//! `/`-separated paths, always taken from the root directory
use crate::device::SectorSource;

use super::{BobFs, FsError, Node, Result};

fn components(path: &str) -> impl Iterator<Item = &str> {
    path.split('/').filter(|s| !s.is_empty())
}

/// walk `path` from the root, following the first match at every level
/// # Return
/// `None` if some component is missing, [FsError::NotADirectory] if a
/// component before the last one is not a directory
pub fn resolve<'fs, D>(fs: &'fs BobFs<D>, path: &str) -> Result<Option<Node<'fs, D>>>
where
    D: SectorSource,
{
    let mut current = fs.root();
    for component in components(path) {
        match current.find(component)? {
            Some(next) => current = next,
            None => return Ok(None),
        }
    }
    Ok(Some(current))
}

/// split `path` into its parent directory and last component
///
/// The parent must exist and be a directory, the last component need not.
pub fn resolve_parent<'fs, D>(fs: &'fs BobFs<D>, path: &str) -> Result<(Node<'fs, D>, String)>
where
    D: SectorSource,
{
    let mut parts: Vec<&str> = components(path).collect();
    let name = parts
        .pop()
        .ok_or_else(|| FsError::InvalidName(path.to_owned()))?;

    let mut parent = resolve(fs, &parts.join("/"))?
        .ok_or_else(|| FsError::PathNotFound(path.to_owned()))?;
    if !parent.is_dir()? {
        return Err(FsError::NotADirectory {
            inum: parent.inum(),
        });
    }
    Ok((parent, name.to_owned()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{device::RamImage, fs::ROOT_INODE};

    #[test]
    fn test_resolve() -> anyhow::Result<()> {
        let fs = BobFs::format(RamImage::new())?;
        let mut docs = fs.root().create_directory("docs")?;
        let notes = docs.create_file("notes")?.inum();

        assert_eq!(resolve(&fs, "/")?.map(|n| n.inum()), Some(ROOT_INODE));
        assert_eq!(resolve(&fs, "")?.map(|n| n.inum()), Some(ROOT_INODE));
        assert_eq!(resolve(&fs, "/docs/notes")?.map(|n| n.inum()), Some(notes));
        assert_eq!(resolve(&fs, "docs//notes/")?.map(|n| n.inum()), Some(notes));
        assert!(resolve(&fs, "/docs/missing")?.is_none());
        assert!(matches!(
            resolve(&fs, "/docs/notes/deeper"),
            Err(FsError::NotADirectory { .. })
        ));
        Ok(())
    }

    #[test]
    fn test_resolve_parent() -> anyhow::Result<()> {
        let fs = BobFs::format(RamImage::new())?;
        let docs = fs.root().create_directory("docs")?.inum();

        let (parent, name) = resolve_parent(&fs, "/docs/new")?;
        assert_eq!((parent.inum(), name.as_str()), (docs, "new"));

        let (parent, name) = resolve_parent(&fs, "top")?;
        assert_eq!((parent.inum(), name.as_str()), (ROOT_INODE, "top"));

        assert!(matches!(
            resolve_parent(&fs, "/"),
            Err(FsError::InvalidName(_))
        ));
        assert!(matches!(
            resolve_parent(&fs, "/nowhere/new"),
            Err(FsError::PathNotFound(_))
        ));
        Ok(())
    }
}
