//! the sector store a filesystem lives on.
//!
//! A [SectorSource] only knows how to move whole sectors. Byte-granular
//! access is built on top of it: a partial sector is always read, spliced
//! and written back in full, so neighbouring bytes of the sector survive.
pub mod mmap_image;
pub mod ram_image;

pub use mmap_image::MmapImage;
pub use ram_image::RamImage;

use crate::fs::Result;

/// smallest unit the medium reads or writes
pub const SECTOR_SIZE: usize = 512;

const SECTOR_SIZE_U64: u64 = SECTOR_SIZE as u64;

pub trait SectorSource {
    /// Reads one sector into `buf`.
    /// `buf.len()` must be equal to [SECTOR_SIZE].
    fn read_sector(&self, sector: u64, buf: &mut [u8]) -> Result<()>;

    /// Writes one sector from `buf`.
    /// `buf.len()` must be equal to [SECTOR_SIZE].
    fn write_sector(&self, sector: u64, buf: &[u8]) -> Result<()>;

    /// Number of sectors on the medium, `None` if it grows on demand.
    fn sector_count(&self) -> Option<u64> {
        None
    }

    /// Reads at most up to the end of the sector containing `offset`.
    /// # Return
    /// the number of bytes copied into `buf`, 0 past the end of the medium
    fn read(&self, offset: u64, buf: &mut [u8]) -> Result<usize> {
        let sector = offset / SECTOR_SIZE_U64;
        let start = (offset % SECTOR_SIZE_U64) as usize;
        let count = buf.len().min(SECTOR_SIZE - start);

        if count == 0 || past_end(self.sector_count(), sector) {
            return Ok(0);
        }

        if count == SECTOR_SIZE {
            // whole sector
            self.read_sector(sector, &mut buf[..SECTOR_SIZE])?;
        } else {
            let mut data = [0u8; SECTOR_SIZE];
            self.read_sector(sector, &mut data)?;
            buf[..count].copy_from_slice(&data[start..start + count]);
        }
        Ok(count)
    }

    /// Writes at most up to the end of the sector containing `offset`.
    /// # Return
    /// the number of bytes taken from `buf`, 0 past the end of the medium
    fn write(&self, offset: u64, buf: &[u8]) -> Result<usize> {
        let sector = offset / SECTOR_SIZE_U64;
        let start = (offset % SECTOR_SIZE_U64) as usize;
        let count = buf.len().min(SECTOR_SIZE - start);

        if count == 0 || past_end(self.sector_count(), sector) {
            return Ok(0);
        }

        if count == SECTOR_SIZE {
            // whole sector
            self.write_sector(sector, &buf[..SECTOR_SIZE])?;
        } else {
            let mut data = [0u8; SECTOR_SIZE];
            self.read_sector(sector, &mut data)?;
            data[start..start + count].copy_from_slice(&buf[..count]);
            self.write_sector(sector, &data)?;
        }
        Ok(count)
    }

    /// Keeps reading until `buf` is full or the medium ends.
    /// A short count is not an error.
    fn read_all(&self, mut offset: u64, buf: &mut [u8]) -> Result<usize> {
        let mut total = 0;
        while total < buf.len() {
            let n = self.read(offset, &mut buf[total..])?;
            if n == 0 {
                break;
            }
            total += n;
            offset += n as u64;
        }
        Ok(total)
    }

    /// Keeps writing until `buf` is consumed or the medium ends.
    /// A short count is not an error.
    fn write_all(&self, mut offset: u64, buf: &[u8]) -> Result<usize> {
        let mut total = 0;
        while total < buf.len() {
            let n = self.write(offset, &buf[total..])?;
            if n == 0 {
                break;
            }
            total += n;
            offset += n as u64;
        }
        Ok(total)
    }
}

#[inline]
fn past_end(sector_count: Option<u64>, sector: u64) -> bool {
    sector_count.map_or(false, |count| sector >= count)
}

impl<T> SectorSource for &T
where
    T: SectorSource + ?Sized,
{
    fn read_sector(&self, sector: u64, buf: &mut [u8]) -> Result<()> {
        (**self).read_sector(sector, buf)
    }

    fn write_sector(&self, sector: u64, buf: &[u8]) -> Result<()> {
        (**self).write_sector(sector, buf)
    }

    fn sector_count(&self) -> Option<u64> {
        (**self).sector_count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::cell::Cell;

    /// counts the sector level calls the splicing logic makes
    struct CountingImage {
        inner: RamImage,
        reads: Cell<usize>,
        writes: Cell<usize>,
    }

    impl SectorSource for CountingImage {
        fn read_sector(&self, sector: u64, buf: &mut [u8]) -> Result<()> {
            self.reads.set(self.reads.get() + 1);
            self.inner.read_sector(sector, buf)
        }

        fn write_sector(&self, sector: u64, buf: &[u8]) -> Result<()> {
            self.writes.set(self.writes.get() + 1);
            self.inner.write_sector(sector, buf)
        }

        fn sector_count(&self) -> Option<u64> {
            self.inner.sector_count()
        }
    }

    fn counting(capacity: Option<u64>) -> CountingImage {
        CountingImage {
            inner: capacity.map_or_else(RamImage::new, RamImage::with_capacity),
            reads: Cell::new(0),
            writes: Cell::new(0),
        }
    }

    #[test]
    fn test_whole_sector_write_skips_read() {
        let image = counting(None);
        let n = image.write(SECTOR_SIZE_U64, &[7u8; SECTOR_SIZE]).unwrap();
        assert_eq!(n, SECTOR_SIZE);
        assert_eq!(image.reads.get(), 0);
        assert_eq!(image.writes.get(), 1);
    }

    #[test]
    fn test_partial_write_preserves_neighbours() {
        let image = counting(None);
        image.write(0, &[1u8; SECTOR_SIZE]).unwrap();
        // clamps to the end of the first sector
        let n = image.write(500, &[9u8; 40]).unwrap();
        assert_eq!(n, 12);
        assert_eq!(image.reads.get(), 1);

        let mut buf = [0u8; SECTOR_SIZE];
        image.read_all(0, &mut buf).unwrap();
        assert!(buf[..500].iter().all(|b| *b == 1));
        assert!(buf[500..].iter().all(|b| *b == 9));
    }

    #[test]
    fn test_read_all_and_write_all_span_sectors() {
        let image = counting(None);
        let data: Vec<u8> = (0..1500u32).map(|x| (x % 251) as u8).collect();
        assert_eq!(image.write_all(100, &data).unwrap(), data.len());

        let mut buf = vec![0u8; data.len()];
        assert_eq!(image.read_all(100, &mut buf).unwrap(), data.len());
        assert_eq!(buf, data);
    }

    #[test]
    fn test_short_transfer_at_end_of_medium() {
        let image = counting(Some(2));
        let n = image.write_all(1000, &[3u8; 100]).unwrap();
        assert_eq!(n, 24);

        let mut buf = [0u8; 100];
        assert_eq!(image.read_all(1000, &mut buf).unwrap(), 24);
        assert_eq!(image.read(2 * SECTOR_SIZE_U64, &mut buf).unwrap(), 0);
    }
}
