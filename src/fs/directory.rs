//! directories are plain node content holding back-to-back entries,
//! `inum: u32, name_len: u32, name: name_len ASCII bytes`, with no padding
use log::debug;
use serde::{Deserialize, Serialize};

use crate::{device::SectorSource, utils::traits::OnDisk};

use super::{FileKind, FsError, Inode, Node, Result, BLOCK_SIZE};

#[derive(Serialize, Deserialize, Debug, Clone, Copy, PartialEq, Eq)]
struct EntryHeader {
    inum: u32,
    name_len: u32,
}

impl OnDisk for EntryHeader {
    const SIZE: usize = 8;
}

/// one name in a directory
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DirEntry {
    pub inum: u32,
    pub name: String,
}

impl DirEntry {
    pub fn new(inum: u32, name: impl Into<String>) -> Self {
        DirEntry {
            inum,
            name: name.into(),
        }
    }

    /// bytes this entry takes inside the directory
    pub fn encoded_len(&self) -> u32 {
        (EntryHeader::SIZE + self.name.len()) as u32
    }

    pub fn encode(&self) -> Result<Vec<u8>> {
        let header = EntryHeader {
            inum: self.inum,
            name_len: self.name.len() as u32,
        };
        let mut buf = header.encode()?;
        buf.extend_from_slice(self.name.as_bytes());
        Ok(buf)
    }

    /// decode the entry at the front of `buf`
    /// # Returns
    /// the entry and the number of bytes it took
    pub fn decode(buf: &[u8]) -> Result<(Self, usize)> {
        let header = EntryHeader::decode(buf)?;
        let end = EntryHeader::SIZE + header.name_len as usize;
        let name = buf
            .get(EntryHeader::SIZE..end)
            .ok_or_else(|| FsError::Codec(format!("entry needs {end} bytes, got {}", buf.len())))?;
        let name = decode_name(name.to_vec()).map_err(FsError::InvalidName)?;
        Ok((DirEntry::new(header.inum, name), end))
    }
}

fn decode_name(bytes: Vec<u8>) -> std::result::Result<String, String> {
    String::from_utf8(bytes)
        .map_err(|e| String::from_utf8_lossy(e.as_bytes()).into_owned())
        .and_then(|name| if name.is_ascii() { Ok(name) } else { Err(name) })
}

/// names are non-empty ASCII without a path separator
pub fn validate_name(name: &str) -> Result<()> {
    if name.is_empty() || !name.is_ascii() || name.contains('/') {
        return Err(FsError::InvalidName(name.to_owned()));
    }
    Ok(())
}

/// entry scanning
impl<'fs, D> Node<'fs, D>
where
    D: SectorSource,
{
    fn ensure_dir(&mut self) -> Result<()> {
        if !self.is_dir()? {
            return Err(FsError::NotADirectory { inum: self.inum() });
        }
        Ok(())
    }

    /// decode the entry at `offset`, header first, then exactly `name_len` bytes
    fn read_entry(&mut self, offset: u32) -> Result<DirEntry> {
        let corrupt = |inum| FsError::CorruptDirectory { inum, offset };
        let inum = self.inum();

        let mut header = [0u8; EntryHeader::SIZE];
        if self.read_all(offset, &mut header)? != EntryHeader::SIZE {
            return Err(corrupt(inum));
        }
        let header = EntryHeader::decode(&header)?;

        let name_start = offset + EntryHeader::SIZE as u32;
        let remaining = self.size()?.saturating_sub(name_start);
        if header.name_len > remaining {
            return Err(corrupt(inum));
        }
        let mut raw = vec![0u8; EntryHeader::SIZE + header.name_len as usize];
        if self.read_all(offset, &mut raw)? != raw.len() {
            return Err(corrupt(inum));
        }
        let (entry, _) = DirEntry::decode(&raw).map_err(|_| corrupt(inum))?;
        Ok(entry)
    }

    /// every entry with its byte offset, in directory order
    pub(crate) fn entries(&mut self) -> Result<Vec<(u32, DirEntry)>> {
        self.ensure_dir()?;
        let size = self.size()?;
        let mut entries = Vec::new();
        let mut runner = 0;
        while runner < size {
            let entry = self.read_entry(runner)?;
            let len = entry.encoded_len();
            entries.push((runner, entry));
            runner += len;
        }
        Ok(entries)
    }

    /// offset and entry of the first entry referencing `inum`
    fn entry_of(&mut self, inum: u32) -> Result<Option<(u32, DirEntry)>> {
        Ok(self
            .entries()?
            .into_iter()
            .find(|(_, entry)| entry.inum == inum))
    }

    /// append an entry at the end, the size is restored if it doesn't fit
    fn append_entry(&mut self, entry: &DirEntry) -> Result<()> {
        let bytes = entry.encode()?;
        let size = self.size()?;
        match self.write_all(size, &bytes) {
            Ok(wrote) if wrote == bytes.len() => Ok(()),
            Ok(_) | Err(FsError::OutOfSpace) => {
                self.set_size(size)?;
                Err(FsError::DirectoryFull)
            }
            Err(e) => Err(e),
        }
    }

    /// close the gap left by the `len` bytes at `offset`
    fn remove_span(&mut self, offset: u32, len: u32) -> Result<()> {
        let mut buf = [0u8; BLOCK_SIZE];
        let mut runner = offset;
        loop {
            let read = self.read_all(runner + len, &mut buf)?;
            if read == 0 {
                break;
            }
            self.write_all(runner, &buf[..read])?;
            runner += read as u32;
        }
        let size = self.size()?;
        self.set_size(size - len)
    }
}

/// directory operations
impl<'fs, D> Node<'fs, D>
where
    D: SectorSource,
{
    /// every (name, node) pair, in the order the entries were added
    pub fn list(&mut self) -> Result<Vec<(String, Node<'fs, D>)>> {
        let fs = self.fs();
        Ok(self
            .entries()?
            .into_iter()
            .map(|(_, entry)| (entry.name, fs.node(entry.inum)))
            .collect())
    }

    /// the first entry named `name`, `None` if there is none
    pub fn find(&mut self, name: &str) -> Result<Option<Node<'fs, D>>> {
        let fs = self.fs();
        Ok(self
            .entries()?
            .into_iter()
            .find(|(_, entry)| entry.name == name)
            .map(|(_, entry)| fs.node(entry.inum)))
    }

    pub fn create_file(&mut self, name: &str) -> Result<Node<'fs, D>> {
        self.create(name, FileKind::File)
    }

    pub fn create_directory(&mut self, name: &str) -> Result<Node<'fs, D>> {
        self.create(name, FileKind::Directory)
    }

    fn create(&mut self, name: &str, kind: FileKind) -> Result<Node<'fs, D>> {
        self.ensure_dir()?;
        validate_name(name)?;
        let fs = self.fs();

        let inum = fs.find_free_inode()?.ok_or(FsError::OutOfInodes)?;
        if let Err(e) = self.append_entry(&DirEntry::new(inum, name)) {
            fs.release_inode(inum)?;
            return Err(e);
        }
        self.commit()?;

        let mut node = Node::fresh(fs, inum, Inode::new(kind));
        node.commit()?;
        debug!("created {kind:?} {name:?} as inode {inum} in directory {}", self.inum());
        Ok(node)
    }

    /// add another name for `node`, its link count goes up by one
    pub fn link(&mut self, name: &str, node: &mut Node<'fs, D>) -> Result<()> {
        self.ensure_dir()?;
        validate_name(name)?;
        let links = node
            .links()?
            .checked_add(1)
            .ok_or(FsError::TooManyLinks { inum: node.inum() })?;

        self.append_entry(&DirEntry::new(node.inum(), name))?;
        self.commit()?;

        node.set_links(links)?;
        node.commit()?;
        debug!(
            "linked inode {} as {name:?} in directory {}, {links} links",
            node.inum(),
            self.inum(),
        );
        Ok(())
    }

    /// remove the first entry referencing `node` and drop one of its links
    ///
    /// When the last link goes, the blocks and the inode of `node` are
    /// released. The last link of a non-empty directory can't be deleted.
    pub fn delete(&mut self, node: &mut Node<'fs, D>) -> Result<()> {
        self.ensure_dir()?;
        let inum = node.inum();
        let (offset, entry) = self
            .entry_of(inum)?
            .ok_or(FsError::EntryNotFound { inum })?;

        let links = node.links()?.saturating_sub(1);
        if links == 0 && node.is_dir()? && node.size()? > 0 {
            return Err(FsError::DirectoryNotEmpty { inum });
        }

        self.remove_span(offset, entry.encoded_len())?;
        self.commit()?;

        node.set_links(links)?;
        if links == 0 && inum != self.fs().superblock().root_inum {
            node.release()?;
            debug!("deleted {:?}, inode {inum} released", entry.name);
        } else {
            node.commit()?;
            debug!("deleted {:?}, inode {inum} keeps {links} links", entry.name);
        }
        Ok(())
    }

    /// give the entry of `node` a new name, its link count doesn't change
    ///
    /// The old entry is removed before the new one is appended; if the append
    /// fails the node is left without an entry in this directory.
    pub fn rename(&mut self, node: &mut Node<'fs, D>, new_name: &str) -> Result<()> {
        self.ensure_dir()?;
        validate_name(new_name)?;
        let inum = node.inum();
        let (offset, entry) = self
            .entry_of(inum)?
            .ok_or(FsError::EntryNotFound { inum })?;

        self.remove_span(offset, entry.encoded_len())?;
        let appended = self.append_entry(&DirEntry::new(inum, new_name));
        self.commit()?;
        appended?;
        debug!("renamed {:?} to {new_name:?} (inode {inum})", entry.name);
        Ok(())
    }
}
