//! a node of the tree: one inode plus its optional indirect block,
//! loaded lazily and written back only by [Node::commit]

use std::fmt;

use log::{debug, trace};

use crate::device::SectorSource;

use super::{
    BobFs, FileKind, FsError, Indirect, Inode, Result, BLOCK_SIZE, INDIRECT_CAPACITY,
    MAX_FILE_SIZE,
};

/// an in-memory copy of an on-disk structure
#[derive(Debug)]
enum Cached<T> {
    /// nothing read yet
    Unloaded,
    /// same as the medium
    Loaded(T),
    /// holds changes the medium doesn't have yet
    Dirty(T),
}

impl<T> Default for Cached<T> {
    fn default() -> Self {
        Cached::Unloaded
    }
}

impl<T> Cached<T> {
    fn get_or_load(&mut self, load: impl FnOnce() -> Result<T>) -> Result<&T> {
        if let Cached::Unloaded = self {
            *self = Cached::Loaded(load()?);
        }
        match &*self {
            Cached::Loaded(value) | Cached::Dirty(value) => Ok(value),
            Cached::Unloaded => unreachable!("loaded above"),
        }
    }

    /// like [Cached::get_or_load], the value is dirty afterwards
    fn modify_or_load(&mut self, load: impl FnOnce() -> Result<T>) -> Result<&mut T> {
        let value = match std::mem::take(self) {
            Cached::Unloaded => load()?,
            Cached::Loaded(value) | Cached::Dirty(value) => value,
        };
        *self = Cached::Dirty(value);
        match self {
            Cached::Dirty(value) => Ok(value),
            _ => unreachable!("marked dirty above"),
        }
    }

    /// the pending value, if any, which is considered clean afterwards
    fn take_dirty(&mut self) -> Option<&T> {
        if let Cached::Dirty(_) = self {
            if let Cached::Dirty(value) = std::mem::take(self) {
                *self = Cached::Loaded(value);
            }
            if let Cached::Loaded(value) = self {
                return Some(value);
            }
        }
        None
    }

    fn is_dirty(&self) -> bool {
        matches!(self, Cached::Dirty(_))
    }
}

/// metadata snapshot of a node
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct NodeStat {
    pub inum: u32,
    pub kind: FileKind,
    pub links: u16,
    pub size: u32,
}

/// a file or directory bound to an inode number
///
/// Changes to the inode or the indirect block stay in memory until
/// [Node::commit] is called; dropping a node discards them.
pub struct Node<'fs, D> {
    fs: &'fs BobFs<D>,
    inum: u32,
    inode: Cached<Inode>,
    indirect: Cached<Indirect>,
}

impl<D> fmt::Debug for Node<'_, D> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Node")
            .field("inum", &self.inum)
            .field("inode", &self.inode)
            .field("indirect_dirty", &self.indirect.is_dirty())
            .finish()
    }
}

impl<'fs, D> Node<'fs, D>
where
    D: SectorSource,
{
    pub(crate) fn new(fs: &'fs BobFs<D>, inum: u32) -> Self {
        Node {
            fs,
            inum,
            inode: Cached::Unloaded,
            indirect: Cached::Unloaded,
        }
    }

    /// a node whose record is replaced by `inode` on the next commit
    pub(crate) fn fresh(fs: &'fs BobFs<D>, inum: u32, inode: Inode) -> Self {
        Node {
            fs,
            inum,
            inode: Cached::Dirty(inode),
            indirect: Cached::Unloaded,
        }
    }

    #[inline]
    pub fn inum(&self) -> u32 {
        self.inum
    }

    #[inline]
    pub(crate) fn fs(&self) -> &'fs BobFs<D> {
        self.fs
    }

    fn inode(&mut self) -> Result<&Inode> {
        let (fs, inum) = (self.fs, self.inum);
        self.inode.get_or_load(|| fs.read_inode(inum))
    }

    fn inode_mut(&mut self) -> Result<&mut Inode> {
        let (fs, inum) = (self.fs, self.inum);
        self.inode.modify_or_load(|| fs.read_inode(inum))
    }

    fn load_indirect(fs: &BobFs<D>, block: u32) -> Result<Indirect> {
        let mut buf = [0u8; BLOCK_SIZE];
        fs.read_block(block, 0, &mut buf)?;
        Indirect::decode(&buf)
    }

    /// the indirect block, `None` if the inode has none
    fn indirect(&mut self) -> Result<Option<&Indirect>> {
        let block = self.inode()?.indirect_block;
        if block == 0 {
            return Ok(None);
        }
        let fs = self.fs;
        self.indirect
            .get_or_load(|| Self::load_indirect(fs, block))
            .map(Some)
    }

    fn indirect_mut(&mut self, block: u32) -> Result<&mut Indirect> {
        let fs = self.fs;
        self.indirect
            .modify_or_load(|| Self::load_indirect(fs, block))
    }
}

/// metadata
impl<'fs, D> Node<'fs, D>
where
    D: SectorSource,
{
    pub fn kind(&mut self) -> Result<FileKind> {
        Ok(self.inode()?.kind)
    }

    pub fn links(&mut self) -> Result<u16> {
        Ok(self.inode()?.links)
    }

    pub fn size(&mut self) -> Result<u32> {
        Ok(self.inode()?.size)
    }

    pub fn is_file(&mut self) -> Result<bool> {
        Ok(self.inode()?.is_file())
    }

    pub fn is_dir(&mut self) -> Result<bool> {
        Ok(self.inode()?.is_dir())
    }

    pub fn stat(&mut self) -> Result<NodeStat> {
        let inum = self.inum;
        let inode = self.inode()?;
        Ok(NodeStat {
            inum,
            kind: inode.kind,
            links: inode.links,
            size: inode.size,
        })
    }

    pub(crate) fn set_links(&mut self, links: u16) -> Result<()> {
        self.inode_mut()?.links = links;
        Ok(())
    }

    pub(crate) fn set_size(&mut self, size: u32) -> Result<()> {
        self.inode_mut()?.size = size;
        Ok(())
    }

    /// write the inode record and the indirect block back if they changed
    pub fn commit(&mut self) -> Result<()> {
        if let Some(inode) = self.inode.take_dirty() {
            trace!("commit inode {} {:?}", self.inum, inode);
            self.fs.write_inode(self.inum, inode)?;
        }

        let block = match &self.inode {
            Cached::Loaded(inode) | Cached::Dirty(inode) => inode.indirect_block,
            Cached::Unloaded => 0,
        };
        if block != 0 {
            if let Some(indirect) = self.indirect.take_dirty() {
                trace!("commit indirect block {block} of inode {}", self.inum);
                self.fs.write_block(block, 0, &indirect.encode())?;
            }
        }
        Ok(())
    }

    /// forget the cached copies, uncommitted changes are lost
    pub fn invalidate(&mut self) {
        self.inode = Cached::Unloaded;
        self.indirect = Cached::Unloaded;
    }
}

/// block addressing
impl<'fs, D> Node<'fs, D>
where
    D: SectorSource,
{
    /// block holding part `part` of the content, 0 if none is assigned
    fn part_block_number(&mut self, part: u32) -> Result<u32> {
        let inode = self.inode()?;
        let parts = inode.size.div_ceil(BLOCK_SIZE as u32);
        if part > parts || part as usize > INDIRECT_CAPACITY {
            return Err(FsError::InvalidPart { part });
        }
        if part == 0 {
            return Ok(inode.direct_block);
        }
        Ok(self
            .indirect()?
            .map_or(0, |indirect| indirect.get(part as usize - 1)))
    }

    /// allocate a data block for part `part`
    fn assign_block(&mut self, part: u32) -> Result<u32> {
        if part as usize > INDIRECT_CAPACITY {
            return Err(FsError::InvalidPart { part });
        }
        let fs = self.fs;

        if part == 0 {
            if self.inode()?.direct_block != 0 {
                return Err(FsError::BlockAlreadyAssigned { part });
            }
            let block = fs.find_free_block()?.ok_or(FsError::OutOfSpace)?;
            self.inode_mut()?.direct_block = block;
            return Ok(block);
        }

        let mut indirect_block = self.inode()?.indirect_block;
        if indirect_block == 0 {
            indirect_block = fs.find_free_block()?.ok_or(FsError::OutOfSpace)?;
            self.inode_mut()?.indirect_block = indirect_block;
            // a recycled block may hold stale pointers
            self.indirect = Cached::Dirty(Indirect::default());
        }

        let slot = part as usize - 1;
        if self.indirect_mut(indirect_block)?.get(slot) != 0 {
            return Err(FsError::BlockAlreadyAssigned { part });
        }
        let block = fs.find_free_block()?.ok_or(FsError::OutOfSpace)?;
        self.indirect_mut(indirect_block)?.set(slot, block);
        Ok(block)
    }

    /// every block this node owns, the indirect block included
    pub(crate) fn owned_blocks(&mut self) -> Result<Vec<u32>> {
        let inode = *self.inode()?;
        let mut blocks = Vec::new();
        if inode.direct_block != 0 {
            blocks.push(inode.direct_block);
        }
        if let Some(indirect) = self.indirect()? {
            blocks.extend(indirect.assigned());
        }
        if inode.indirect_block != 0 {
            blocks.push(inode.indirect_block);
        }
        Ok(blocks)
    }

    /// give every block and the inode number back to the allocator,
    /// the inode record is cleared
    pub(crate) fn release(&mut self) -> Result<()> {
        for block in self.owned_blocks()? {
            self.fs.release_block(block)?;
        }
        self.fs.release_inode(self.inum)?;
        self.inode = Cached::Dirty(Inode::default());
        self.indirect = Cached::Unloaded;
        self.commit()
    }
}

/// read and write content
impl<'fs, D> Node<'fs, D>
where
    D: SectorSource,
{
    /// read at most up to the end of the block containing `offset`
    /// # Return
    /// bytes copied into `buf`, 0 at or past the end of the content
    pub fn read(&mut self, offset: u32, buf: &mut [u8]) -> Result<usize> {
        let size = self.size()?;
        if offset >= size {
            return Ok(0);
        }

        let part = offset / BLOCK_SIZE as u32;
        let start = offset as usize % BLOCK_SIZE;
        let count = buf
            .len()
            .min(BLOCK_SIZE - start)
            .min((size - offset) as usize);

        let block = self.part_block_number(part)?;
        if block == 0 {
            // never written
            return Ok(0);
        }
        self.fs.read_block(block, start, &mut buf[..count])
    }

    /// write at most up to the end of the block containing `offset`,
    /// the size grows and a block is assigned as needed
    /// # Return
    /// bytes taken from `buf`,
    /// [FsError::OutOfSpace] if `offset` is at or past the maximum file size
    pub fn write(&mut self, offset: u32, buf: &[u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if offset >= MAX_FILE_SIZE {
            return Err(FsError::OutOfSpace);
        }

        let part = offset / BLOCK_SIZE as u32;
        let start = offset as usize % BLOCK_SIZE;
        let count = buf.len().min(BLOCK_SIZE - start);

        // the size covers the part while it is addressed,
        // it only keeps the bytes the medium took
        let old_size = self.size()?;
        let end = offset + count as u32;
        if end > old_size {
            self.set_size(end)?;
        }

        let old_indirect = self.inode()?.indirect_block;
        let (block, assigned) = match self.part_block_number(part)? {
            0 => match self.assign_block(part) {
                Ok(block) => (block, true),
                Err(e) => {
                    self.set_size(old_size)?;
                    return Err(e);
                }
            },
            block => (block, false),
        };

        let wrote = match self.fs.write_block(block, start, &buf[..count]) {
            Ok(wrote) => wrote,
            Err(e) => {
                self.set_size(old_size)?;
                return Err(e);
            }
        };
        if end > old_size {
            let reached = if wrote == 0 { 0 } else { offset + wrote as u32 };
            self.set_size(old_size.max(reached))?;
        }
        if wrote == 0 && assigned {
            self.unassign_block(part, block, old_indirect)?;
        }
        Ok(wrote)
    }

    /// undo [Node::assign_block] for a block the medium never took,
    /// an indirect block allocated along with it goes too
    fn unassign_block(&mut self, part: u32, block: u32, old_indirect: u32) -> Result<()> {
        if part == 0 {
            self.inode_mut()?.direct_block = 0;
        } else {
            let indirect_block = self.inode()?.indirect_block;
            if old_indirect == 0 {
                self.inode_mut()?.indirect_block = 0;
                self.indirect = Cached::Unloaded;
                self.fs.release_block(indirect_block)?;
            } else {
                self.indirect_mut(indirect_block)?.set(part as usize - 1, 0);
            }
        }
        debug!("medium ended, data block {block} of inode {} given back", self.inum);
        self.fs.release_block(block)
    }

    /// Keeps reading until `buf` is full or the content ends.
    /// A short count is not an error.
    pub fn read_all(&mut self, mut offset: u32, buf: &mut [u8]) -> Result<usize> {
        let mut total = 0;
        while total < buf.len() {
            let n = self.read(offset, &mut buf[total..])?;
            if n == 0 {
                break;
            }
            total += n;
            offset += n as u32;
        }
        Ok(total)
    }

    /// Keeps writing until `buf` is consumed.
    /// # Return
    /// bytes written, short when the maximum file size or the medium ends first,
    /// [FsError::OutOfSpace] if nothing fits at `offset` at all
    pub fn write_all(&mut self, mut offset: u32, buf: &[u8]) -> Result<usize> {
        if buf.is_empty() {
            return Ok(0);
        }
        if offset >= MAX_FILE_SIZE {
            return Err(FsError::OutOfSpace);
        }
        let room = (MAX_FILE_SIZE - offset) as usize;
        let buf = &buf[..buf.len().min(room)];

        let mut total = 0;
        while total < buf.len() {
            let n = self.write(offset, &buf[total..])?;
            if n == 0 {
                break;
            }
            total += n;
            offset += n as u32;
        }
        Ok(total)
    }
}
