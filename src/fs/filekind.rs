use serde::{Deserialize, Serialize};

/// an enum to describe the type of a node, stored as the inode's `u16` type field
#[derive(Serialize, Deserialize, Debug, Default, Copy, Clone, PartialEq, Eq)]
#[serde(from = "u16", into = "u16")]
pub enum FileKind {
    /// an unused inode slot
    #[default]
    Unused,
    /// a directory
    Directory,
    /// an regular file
    File,
    /// a type tag this implementation doesn't know
    Unknown(u16),
}

impl From<u16> for FileKind {
    fn from(raw: u16) -> Self {
        match raw {
            0 => FileKind::Unused,
            1 => FileKind::Directory,
            2 => FileKind::File,
            other => FileKind::Unknown(other),
        }
    }
}

impl From<FileKind> for u16 {
    fn from(kind: FileKind) -> Self {
        match kind {
            FileKind::Unused => 0,
            FileKind::Directory => 1,
            FileKind::File => 2,
            FileKind::Unknown(raw) => raw,
        }
    }
}
