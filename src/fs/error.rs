use thiserror::Error;

/// errors surfaced by the filesystem core
#[derive(Debug, Error)]
pub enum FsError {
    #[error("the medium does not hold a BobFS filesystem (bad superblock magic)")]
    CorruptOrForeignFilesystem,
    #[error("inode {inum} is not a directory")]
    NotADirectory { inum: u32 },
    #[error("no directory entry references inode {inum}")]
    EntryNotFound { inum: u32 },
    #[error("the directory entry could not be appended")]
    DirectoryFull,
    #[error("no free data block left")]
    OutOfSpace,
    #[error("no free inode left")]
    OutOfInodes,
    #[error("inode number {inum} is outside the inode table")]
    InvalidInode { inum: u32 },
    #[error("block {block} is not an allocatable data block")]
    InvalidBlock { block: u32 },
    #[error("part {part} is out of range for this node")]
    InvalidPart { part: u32 },
    #[error("part {part} already has a block assigned")]
    BlockAlreadyAssigned { part: u32 },
    #[error("inode {inum} can't take another link")]
    TooManyLinks { inum: u32 },
    #[error("directory inode {inum} is not empty")]
    DirectoryNotEmpty { inum: u32 },
    #[error("no such file or directory: {0}")]
    PathNotFound(String),
    #[error("invalid entry name {0:?}, names must be non-empty ASCII without '/'")]
    InvalidName(String),
    #[error("directory inode {inum} holds a truncated entry at offset {offset}")]
    CorruptDirectory { inum: u32, offset: u32 },
    #[error("codec error: {0}")]
    Codec(String),
    #[error(transparent)]
    Io(#[from] std::io::Error),
}

impl From<bincode::error::EncodeError> for FsError {
    fn from(e: bincode::error::EncodeError) -> Self {
        FsError::Codec(e.to_string())
    }
}

impl From<bincode::error::DecodeError> for FsError {
    fn from(e: bincode::error::DecodeError) -> Self {
        FsError::Codec(e.to_string())
    }
}

pub type Result<T> = std::result::Result<T, FsError>;
