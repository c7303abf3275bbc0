//! a raw image file mapped into memory
use std::{
    fs::OpenOptions,
    io::{Error, ErrorKind},
    path::Path,
    sync::{Mutex, PoisonError},
};

use log::info;
use memmap2::MmapMut;

use super::{SectorSource, SECTOR_SIZE};
use crate::fs::Result;

#[derive(Debug)]
pub struct MmapImage {
    area: Mutex<MmapMut>,
    sectors: u64,
}

impl MmapImage {
    /// map an existing image file for read and write
    pub fn open<P>(image_path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        // open the "device" for read and write
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .open(image_path.as_ref())?;
        Self::map(file, image_path.as_ref())
    }

    /// create a new zero-filled image file of `len` bytes and map it
    /// # Params
    /// - `len`: rounded down to a whole number of sectors
    pub fn create<P>(image_path: P, len: u64) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let file = OpenOptions::new()
            .read(true)
            .write(true)
            .create_new(true)
            .open(image_path.as_ref())?;
        // all bytes are zero after `set_len`
        file.set_len(len - len % SECTOR_SIZE as u64)?;
        Self::map(file, image_path.as_ref())
    }

    fn map(file: std::fs::File, image_path: &Path) -> Result<Self> {
        // Safety
        // This method returns an error when the underlying system call fails,
        // which can happen for a variety of reasons,
        // such as when the file is not open with read and write permissions.
        // from https://docs.rs/memmap2/0.5.10/memmap2/struct.MmapMut.html
        let area = unsafe { MmapMut::map_mut(&file)? };
        let sectors = (area.len() / SECTOR_SIZE) as u64;
        info!("mapped {} ({sectors} sectors)", image_path.display());
        Ok(Self {
            area: Mutex::new(area),
            sectors,
        })
    }

    /// flush outstanding modifications to the image file
    pub fn flush(&self) -> Result<()> {
        let area = self.area.lock().unwrap_or_else(PoisonError::into_inner);
        Ok(area.flush()?)
    }

    fn sector_range(&self, sector: u64) -> Result<std::ops::Range<usize>> {
        if sector >= self.sectors {
            return Err(Error::new(
                ErrorKind::UnexpectedEof,
                format!("sector {sector} is past the end of the image"),
            )
            .into());
        }
        let start = sector as usize * SECTOR_SIZE;
        Ok(start..start + SECTOR_SIZE)
    }
}

impl SectorSource for MmapImage {
    fn read_sector(&self, sector: u64, buf: &mut [u8]) -> Result<()> {
        let range = self.sector_range(sector)?;
        let area = self.area.lock().unwrap_or_else(PoisonError::into_inner);
        buf.copy_from_slice(&area[range]);
        Ok(())
    }

    fn write_sector(&self, sector: u64, buf: &[u8]) -> Result<()> {
        let range = self.sector_range(sector)?;
        let mut area = self.area.lock().unwrap_or_else(PoisonError::into_inner);
        area[range].copy_from_slice(buf);
        Ok(())
    }

    fn sector_count(&self) -> Option<u64> {
        Some(self.sectors)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_write_reopen() -> anyhow::Result<()> {
        let path =
            std::env::temp_dir().join(format!("bobfs_{}_mmap_reopen.img", std::process::id()));
        if path.exists() {
            std::fs::remove_file(&path)?;
        }

        {
            let image = MmapImage::create(&path, 4 * SECTOR_SIZE as u64 + 100)?;
            assert_eq!(image.sector_count(), Some(4));
            assert_eq!(image.write_all(510, b"bobfs")?, 5);
            image.flush()?;
        }

        let image = MmapImage::open(&path)?;
        let mut buf = [0u8; 5];
        assert_eq!(image.read_all(510, &mut buf)?, 5);
        assert_eq!(&buf, b"bobfs");
        assert!(image.read_sector(4, &mut [0u8; SECTOR_SIZE]).is_err());

        std::fs::remove_file(&path)?;
        Ok(())
    }
}
