//! create our filesystem
use std::path::Path;

use anyhow::Context;
use byte_unit::Byte;
use log::info;

use crate::{
    device::MmapImage,
    fs::{BobFs, BLOCK_SIZE_U32},
    utils::fs_size_calculator::image_size,
};

/// create a new image file that can hold every addressable block and format it
/// # Params
/// - `image_file_path`: the path of the image file, it must not exist yet
///
/// # Return
/// the size of the created image in bytes
pub fn mkfs<P>(image_file_path: P) -> anyhow::Result<u64>
where
    P: AsRef<Path>,
{
    let image_file_path = image_file_path.as_ref();
    let file_len = image_size(BLOCK_SIZE_U32);
    let image = MmapImage::create(image_file_path, file_len)
        .with_context(|| format!("failed to create {}", image_file_path.display()))?;

    let fs = BobFs::format(image)?;
    fs.device().flush()?;
    info!(
        "created BobFS image {} of {}",
        image_file_path.display(),
        Byte::from_bytes(file_len as _).get_appropriate_unit(true)
    );
    Ok(file_len)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::fs::{FileKind, ROOT_INODE};

    #[test]
    fn test_mkfs() -> anyhow::Result<()> {
        let tmp_file = std::env::temp_dir().join(format!("bobfs-mkfs-{}.img", std::process::id()));
        if tmp_file.exists() {
            std::fs::remove_file(&tmp_file)?;
        }

        let len = mkfs(&tmp_file)?;
        assert_eq!(std::fs::metadata(&tmp_file)?.len(), len);
        // an existing image is never overwritten
        assert!(mkfs(&tmp_file).is_err());

        let fs = BobFs::mount(MmapImage::open(&tmp_file)?)?;
        let mut root = fs.root();
        assert_eq!(root.inum(), ROOT_INODE);
        assert_eq!(root.kind()?, FileKind::Directory);
        assert_eq!(root.size()?, 0);
        assert!(fs.inode_in_use(ROOT_INODE)?);

        drop(fs);
        std::fs::remove_file(&tmp_file)?;
        Ok(())
    }
}
