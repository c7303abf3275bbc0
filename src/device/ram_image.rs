//! an in-memory raw image, sectors are created zero-filled the first time they are touched
use std::{
    collections::BTreeMap,
    io::{Error, ErrorKind},
    path::Path,
    sync::{Mutex, PoisonError},
};

use log::info;

use super::{SectorSource, SECTOR_SIZE};
use crate::fs::Result;

type Sector = Box<[u8; SECTOR_SIZE]>;

#[derive(Debug, Default)]
pub struct RamImage {
    sectors: Mutex<BTreeMap<u64, Sector>>,
    capacity: Option<u64>,
}

impl RamImage {
    /// an image that grows without bound
    pub fn new() -> Self {
        Self::default()
    }

    /// an image that ends after `sectors` sectors
    pub fn with_capacity(sectors: u64) -> Self {
        Self {
            capacity: Some(sectors),
            ..Self::default()
        }
    }

    /// load a raw image file into memory
    /// # Params
    /// - `path`: host file holding a whole number of sectors
    pub fn load<P>(path: P) -> Result<Self>
    where
        P: AsRef<Path>,
    {
        let bytes = std::fs::read(path.as_ref())?;
        if bytes.len() % SECTOR_SIZE != 0 {
            return Err(Error::new(
                ErrorKind::InvalidData,
                format!(
                    "image length {} is not a multiple of the sector size {SECTOR_SIZE}",
                    bytes.len()
                ),
            )
            .into());
        }

        let sectors = bytes
            .chunks_exact(SECTOR_SIZE)
            .enumerate()
            .map(|(index, chunk)| {
                let mut sector = Box::new([0u8; SECTOR_SIZE]);
                sector.copy_from_slice(chunk);
                (index as u64, sector)
            })
            .collect::<BTreeMap<_, _>>();
        info!(
            "loaded {} sectors from {}",
            sectors.len(),
            path.as_ref().display()
        );

        Ok(Self {
            sectors: Mutex::new(sectors),
            capacity: None,
        })
    }

    /// write every sector up to the highest one ever touched into `path`
    pub fn save<P>(&self, path: P) -> Result<()>
    where
        P: AsRef<Path>,
    {
        let sectors = self.sectors.lock().unwrap_or_else(PoisonError::into_inner);
        let len = sectors
            .keys()
            .next_back()
            .map_or(0, |last| (*last as usize + 1) * SECTOR_SIZE);
        let mut out = vec![0u8; len];
        for (index, sector) in sectors.iter() {
            let start = *index as usize * SECTOR_SIZE;
            out[start..start + SECTOR_SIZE].copy_from_slice(sector.as_slice());
        }
        std::fs::write(path.as_ref(), out)?;
        info!("saved {len} bytes to {}", path.as_ref().display());
        Ok(())
    }

    fn check_range(&self, sector: u64) -> Result<()> {
        match self.capacity {
            Some(capacity) if sector >= capacity => Err(Error::new(
                ErrorKind::UnexpectedEof,
                format!("sector {sector} is past the end of a {capacity} sector image"),
            )
            .into()),
            _ => Ok(()),
        }
    }
}

impl SectorSource for RamImage {
    fn read_sector(&self, sector: u64, buf: &mut [u8]) -> Result<()> {
        self.check_range(sector)?;
        let sectors = self.sectors.lock().unwrap_or_else(PoisonError::into_inner);
        match sectors.get(&sector) {
            Some(data) => buf.copy_from_slice(data.as_slice()),
            None => buf.fill(0),
        }
        Ok(())
    }

    fn write_sector(&self, sector: u64, buf: &[u8]) -> Result<()> {
        self.check_range(sector)?;
        let mut sectors = self.sectors.lock().unwrap_or_else(PoisonError::into_inner);
        sectors
            .entry(sector)
            .or_insert_with(|| Box::new([0u8; SECTOR_SIZE]))
            .copy_from_slice(buf);
        Ok(())
    }

    fn sector_count(&self) -> Option<u64> {
        self.capacity
    }
}
