//! what does our filesystem look like on the medium

use std::{
    io::{Error, ErrorKind},
    sync::{Mutex, PoisonError},
};

use log::{debug, info, warn};

use crate::{device::SectorSource, utils::traits::OnDisk};

use super::{
    Bitmap, FileKind, FsError, Inode, Node, Result, SuperBlock, BITMAP_BITS, BLOCK_BITMAP_BLOCK,
    BLOCK_SIZE, DATA_START, INODE_BITMAP_BLOCK, INODE_SIZE, INODE_TABLE_START, ROOT_INODE,
    SUPERBLOCK_BLOCK,
};

const BLOCK_SIZE_U64: u64 = BLOCK_SIZE as u64;

/// an opened filesystem, the only owner of the sector store
///
/// Nodes borrow the handle, so it outlives every [Node] obtained from it.
#[derive(Debug)]
pub struct BobFs<D> {
    device: D,
    superblock: SuperBlock,
    /// held across each scan-set-persist of the block bitmap
    block_bitmap_lock: Mutex<()>,
    /// held across each scan-set-persist of the inode bitmap
    inode_bitmap_lock: Mutex<()>,
}

impl<D> BobFs<D>
where
    D: SectorSource,
{
    /// create a new filesystem on `device`, overwriting whatever it held
    /// # Return
    /// the mounted filesystem, its root is an empty directory
    pub fn format(device: D) -> Result<Self> {
        let superblock = SuperBlock::new(ROOT_INODE);
        let fs = Self::with_superblock(device, superblock);

        let mut block = [0u8; BLOCK_SIZE];
        superblock.encode_into(&mut block)?;
        fs.write_whole_block(SUPERBLOCK_BLOCK, &block)?;

        // every data block is free
        let block_bitmap = Bitmap::default();
        fs.write_whole_block(BLOCK_BITMAP_BLOCK, block_bitmap.as_block())?;

        // only the root inode is taken
        let mut inode_bitmap = Bitmap::default();
        inode_bitmap.occupy(ROOT_INODE);
        fs.write_whole_block(INODE_BITMAP_BLOCK, inode_bitmap.as_block())?;

        Node::fresh(&fs, ROOT_INODE, Inode::new(FileKind::Directory)).commit()?;
        info!("formatted a new filesystem, root inode {ROOT_INODE}");
        Ok(fs)
    }

    /// open the filesystem held by `device`
    /// # Return
    /// [FsError::CorruptOrForeignFilesystem] if the superblock magic is wrong,
    /// nothing is written to `device` in that case
    pub fn mount(device: D) -> Result<Self> {
        let mut block = [0u8; BLOCK_SIZE];
        let read = device.read_all(0, &mut block)?;
        if read < SuperBlock::SIZE {
            warn!("medium is too small to hold a superblock ({read} bytes)");
            return Err(FsError::CorruptOrForeignFilesystem);
        }

        let superblock = SuperBlock::decode(&block)?;
        if !superblock.is_valid() {
            warn!(
                "refusing to mount, magic is {:?}",
                String::from_utf8_lossy(&superblock.magic)
            );
            return Err(FsError::CorruptOrForeignFilesystem);
        }
        info!("mounted filesystem, root inode {}", superblock.root_inum);
        Ok(Self::with_superblock(device, superblock))
    }

    fn with_superblock(device: D, superblock: SuperBlock) -> Self {
        BobFs {
            device,
            superblock,
            block_bitmap_lock: Mutex::new(()),
            inode_bitmap_lock: Mutex::new(()),
        }
    }

    /// the root directory
    pub fn root(&self) -> Node<'_, D> {
        self.node(self.superblock.root_inum)
    }

    /// a node bound to `inum`, nothing is read until it is used
    pub fn node(&self, inum: u32) -> Node<'_, D> {
        Node::new(self, inum)
    }
}

/// get [SuperBlock] and the underlying device of this filesystem
impl<D> BobFs<D> {
    #[inline]
    pub fn superblock(&self) -> &SuperBlock {
        &self.superblock
    }

    #[inline]
    pub fn device(&self) -> &D {
        &self.device
    }

    /// unmount, giving the device back
    pub fn into_inner(self) -> D {
        self.device
    }
}

/// raw block and [Inode] record I/O
impl<D> BobFs<D>
where
    D: SectorSource,
{
    /// read from `block` starting at `offset`, never past the end of the block
    pub(crate) fn read_block(&self, block: u32, offset: usize, buf: &mut [u8]) -> Result<usize> {
        let count = buf.len().min(BLOCK_SIZE.saturating_sub(offset));
        self.device.read_all(
            block as u64 * BLOCK_SIZE_U64 + offset as u64,
            &mut buf[..count],
        )
    }

    /// write into `block` starting at `offset`, never past the end of the block
    pub(crate) fn write_block(&self, block: u32, offset: usize, buf: &[u8]) -> Result<usize> {
        let count = buf.len().min(BLOCK_SIZE.saturating_sub(offset));
        self.device
            .write_all(block as u64 * BLOCK_SIZE_U64 + offset as u64, &buf[..count])
    }

    fn read_whole_block(&self, block: u32, buf: &mut [u8; BLOCK_SIZE]) -> Result<()> {
        if self.read_block(block, 0, buf)? != BLOCK_SIZE {
            return Err(Error::new(
                ErrorKind::UnexpectedEof,
                format!("block {block} is past the end of the medium"),
            )
            .into());
        }
        Ok(())
    }

    fn write_whole_block(&self, block: u32, buf: &[u8]) -> Result<()> {
        if self.write_block(block, 0, buf)? != BLOCK_SIZE {
            return Err(Error::new(
                ErrorKind::WriteZero,
                format!("block {block} is past the end of the medium"),
            )
            .into());
        }
        Ok(())
    }

    #[inline]
    fn inode_seek_position(inum: u32) -> Result<u64> {
        if inum >= BITMAP_BITS {
            return Err(FsError::InvalidInode { inum });
        }
        Ok(INODE_TABLE_START as u64 * BLOCK_SIZE_U64 + inum as u64 * INODE_SIZE as u64)
    }

    pub(crate) fn read_inode(&self, inum: u32) -> Result<Inode> {
        let mut buf = [0u8; Inode::SIZE];
        let read = self
            .device
            .read_all(Self::inode_seek_position(inum)?, &mut buf)?;
        if read != Inode::SIZE {
            return Err(FsError::InvalidInode { inum });
        }
        Inode::decode(&buf)
    }

    pub(crate) fn write_inode(&self, inum: u32, inode: &Inode) -> Result<()> {
        let mut buf = [0u8; Inode::SIZE];
        inode.encode_into(&mut buf)?;
        let wrote = self
            .device
            .write_all(Self::inode_seek_position(inum)?, &buf)?;
        if wrote != Inode::SIZE {
            return Err(FsError::InvalidInode { inum });
        }
        Ok(())
    }
}

/// data block and inode allocation
impl<D> BobFs<D>
where
    D: SectorSource,
{
    fn load_bitmap(&self, block: u32) -> Result<Bitmap> {
        let mut buf = [0u8; BLOCK_SIZE];
        self.read_whole_block(block, &mut buf)?;
        Bitmap::from_block(&buf)
    }

    /// take the lock, scan for the first clear bit, set it, persist, release the lock
    fn allocate_bit(&self, lock: &Mutex<()>, block: u32) -> Result<Option<u32>> {
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut bitmap = self.load_bitmap(block)?;
        let Some(index) = bitmap.allocate() else {
            return Ok(None);
        };
        self.write_whole_block(block, bitmap.as_block())?;
        Ok(Some(index))
    }

    fn release_bit(&self, lock: &Mutex<()>, block: u32, index: u32) -> Result<bool> {
        let _guard = lock.lock().unwrap_or_else(PoisonError::into_inner);
        let mut bitmap = self.load_bitmap(block)?;
        let was_set = bitmap.release(index);
        if was_set {
            self.write_whole_block(block, bitmap.as_block())?;
        }
        Ok(was_set)
    }

    /// allocate a free data block
    /// # Return
    /// the absolute block number, `None` when every data block is in use
    pub fn find_free_block(&self) -> Result<Option<u32>> {
        let block = self
            .allocate_bit(&self.block_bitmap_lock, BLOCK_BITMAP_BLOCK)?
            .map(|index| index + DATA_START);
        match block {
            Some(block) => debug!("allocated data block {block}"),
            None => warn!("no free data block left"),
        }
        Ok(block)
    }

    /// allocate a free inode number
    /// # Return
    /// `None` when every inode is in use
    pub fn find_free_inode(&self) -> Result<Option<u32>> {
        let inum = self.allocate_bit(&self.inode_bitmap_lock, INODE_BITMAP_BLOCK)?;
        match inum {
            Some(inum) => debug!("allocated inode {inum}"),
            None => warn!("no free inode left"),
        }
        Ok(inum)
    }

    /// return a data block to the free pool
    pub fn release_block(&self, block: u32) -> Result<()> {
        if block < DATA_START || block - DATA_START >= BITMAP_BITS {
            return Err(FsError::InvalidBlock { block });
        }
        if !self.release_bit(&self.block_bitmap_lock, BLOCK_BITMAP_BLOCK, block - DATA_START)? {
            warn!("data block {block} was already free");
        }
        debug!("released data block {block}");
        Ok(())
    }

    /// return an inode number to the free pool, the root inode is never released
    pub fn release_inode(&self, inum: u32) -> Result<()> {
        if inum >= BITMAP_BITS {
            return Err(FsError::InvalidInode { inum });
        }
        if inum == self.superblock.root_inum {
            warn!("the root inode {inum} stays allocated");
            return Ok(());
        }
        if !self.release_bit(&self.inode_bitmap_lock, INODE_BITMAP_BLOCK, inum)? {
            warn!("inode {inum} was already free");
        }
        debug!("released inode {inum}");
        Ok(())
    }

    /// check if an absolute data block number is allocated
    pub fn block_in_use(&self, block: u32) -> Result<bool> {
        if block < DATA_START {
            return Ok(false);
        }
        Ok(self
            .load_bitmap(BLOCK_BITMAP_BLOCK)?
            .is_set(block - DATA_START))
    }

    /// check if an inode number is allocated
    pub fn inode_in_use(&self, inum: u32) -> Result<bool> {
        Ok(self.load_bitmap(INODE_BITMAP_BLOCK)?.is_set(inum))
    }

    /// calculate the number of free data blocks and free inodes
    pub fn usage(&self) -> Result<Usage> {
        Ok(Usage {
            free_blocks: self.load_bitmap(BLOCK_BITMAP_BLOCK)?.free_count(),
            free_inodes: self.load_bitmap(INODE_BITMAP_BLOCK)?.free_count(),
        })
    }
}

/// free resources of a filesystem
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Usage {
    pub free_blocks: usize,
    pub free_inodes: usize,
}
