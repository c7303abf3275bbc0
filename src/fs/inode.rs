use serde::{Deserialize, Serialize};

use crate::utils::traits::OnDisk;

use super::filekind::FileKind;

/// one 16 byte record of the inode table
#[derive(Serialize, Deserialize, Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Inode {
    pub kind: FileKind,
    pub links: u16,
    /// size in bytes
    pub size: u32,
    /// block holding bytes `0..BLOCK_SIZE`, 0 if unassigned
    pub direct_block: u32,
    /// block holding the indirect pointers, 0 if absent
    pub indirect_block: u32,
}

impl OnDisk for Inode {
    const SIZE: usize = super::INODE_SIZE as usize;
}

impl Inode {
    /// a fresh node with one link and no content
    pub fn new(kind: impl Into<FileKind>) -> Self {
        Inode {
            kind: kind.into(),
            links: 1,
            ..Inode::default()
        }
    }

    pub fn is_file(&self) -> bool {
        self.kind == FileKind::File
    }

    pub fn is_dir(&self) -> bool {
        self.kind == FileKind::Directory
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_inode_layout() -> anyhow::Result<()> {
        let inode = Inode {
            kind: FileKind::File,
            links: 3,
            size: 0x0001_0203,
            direct_block: 131,
            indirect_block: 0xdead_beef,
        };
        let bytes = inode.encode()?;
        assert_eq!(bytes.len(), Inode::SIZE);
        assert_eq!(
            bytes,
            [
                2, 0, // type
                3, 0, // links
                0x03, 0x02, 0x01, 0x00, // size
                131, 0, 0, 0, // direct block
                0xef, 0xbe, 0xad, 0xde, // indirect block
            ]
        );
        assert_eq!(Inode::decode(&bytes)?, inode);
        Ok(())
    }

    #[test]
    fn test_unknown_kind_survives() -> anyhow::Result<()> {
        let mut buf = [0u8; Inode::SIZE];
        buf[0] = 7;
        let inode = Inode::decode(&buf)?;
        assert_eq!(inode.kind, FileKind::Unknown(7));
        assert!(!inode.is_dir() && !inode.is_file());
        assert_eq!(inode.encode()?, buf);
        Ok(())
    }

    #[test]
    fn test_new_inode() {
        let inode = Inode::new(FileKind::Directory);
        assert!(inode.is_dir());
        assert_eq!(inode.links, 1);
        assert_eq!(inode.size, 0);
        assert_eq!(inode.direct_block, 0);
        assert_eq!(inode.indirect_block, 0);
    }
}
