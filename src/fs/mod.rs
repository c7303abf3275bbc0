//! BobFS, a minimal block filesystem.
//!
//! it has the following layout:
//! - block 0: superblock
//! - block 1: data block bitmap
//! - block 2: inode bitmap
//! - blocks 3..131: inode table
//! - blocks 131..: data blocks
pub mod bitmap;
pub mod directory;
pub mod error;
pub mod filekind;
pub mod fs_layout;
pub mod indirect;
pub mod inode;
pub mod node;
pub mod path;
pub mod superblock;

pub use bitmap::*;
pub use directory::*;
pub use error::{FsError, Result};
pub use filekind::*;
pub use fs_layout::*;
pub use indirect::*;
pub use inode::*;
pub use node::*;
pub use path::{resolve, resolve_parent};
pub use superblock::*;

use crate::utils::fs_size_calculator;

pub const FS_MAGIC: &[u8; 8] = b"BOBFS439";
pub const BLOCK_SIZE: usize = 2 * crate::device::SECTOR_SIZE;
pub const BLOCK_SIZE_U32: u32 = BLOCK_SIZE as u32;
pub const ROOT_INODE: u32 = 0;
pub const INODE_SIZE: u32 = 16;
/// block pointers held by one indirect block
pub const INDIRECT_CAPACITY: usize = BLOCK_SIZE / std::mem::size_of::<u32>();
pub const MAX_FILE_SIZE: u32 = (1 + INDIRECT_CAPACITY as u32) * BLOCK_SIZE_U32;

pub const SUPERBLOCK_BLOCK: u32 = 0;
pub const BLOCK_BITMAP_BLOCK: u32 = 1;
pub const INODE_BITMAP_BLOCK: u32 = 2;
pub const INODE_TABLE_START: u32 = 3;
pub const INODE_TABLE_BLOCKS: u32 = fs_size_calculator::inode_table_blocks(BLOCK_SIZE_U32);
/// first allocatable block, bit 0 of the block bitmap maps here
pub const DATA_START: u32 = INODE_TABLE_START + INODE_TABLE_BLOCKS;
/// every bitmap covers exactly one block's worth of bits
pub const BITMAP_BITS: u32 = BLOCK_SIZE_U32 * 8;
