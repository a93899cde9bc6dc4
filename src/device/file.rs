// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use super::{check_request, BlockDevice, DeviceResult};
use crate::config::{CartGeometry, ERASED_BYTE};
use memmap2::MmapMut;
use std::fs::OpenOptions;
use std::io::Write;
use std::path::Path;
use tracing::debug;

/// A cart dump file, memory mapped for the lifetime of the handle.
pub struct FileCart {
    geometry: CartGeometry,
    mmap: MmapMut,
}

impl FileCart {
    /// Opens an existing dump. A file shorter than the cart is extended with erased bytes.
    pub fn open(path: impl AsRef<Path>, geometry: CartGeometry) -> DeviceResult<Self> {
        let path = path.as_ref();
        let file = OpenOptions::new().read(true).write(true).open(path)?;
        let len = file.metadata()?.len();
        if len < geometry.size as u64 {
            debug!(path = %path.display(), len, size = geometry.size, "extending short cart dump");
            file.set_len(geometry.size as u64)?;
            let mut mmap = unsafe { MmapMut::map_mut(&file)? };
            mmap[len as usize..].fill(ERASED_BYTE);
            mmap.flush()?;
            return Ok(Self { geometry, mmap });
        }
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { geometry, mmap })
    }

    /// Creates a blank, fully erased dump.
    pub fn create(path: impl AsRef<Path>, geometry: CartGeometry) -> DeviceResult<Self> {
        let mut file = OpenOptions::new()
            .read(true)
            .write(true)
            .create(true)
            .truncate(true)
            .open(path)?;
        let block = vec![ERASED_BYTE; geometry.write_block_size as usize];
        for _ in 0..geometry.size / geometry.write_block_size {
            file.write_all(&block)?;
        }
        file.sync_data()?;
        let mmap = unsafe { MmapMut::map_mut(&file)? };
        Ok(Self { geometry, mmap })
    }
}

impl BlockDevice for FileCart {
    fn geometry(&self) -> CartGeometry {
        self.geometry
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> DeviceResult<()> {
        let range = check_request("read", &self.geometry, address, buf.len(), self.geometry.read_block_size)?;
        buf.copy_from_slice(&self.mmap[range]);
        Ok(())
    }

    fn write(&mut self, address: u32, data: &[u8]) -> DeviceResult<()> {
        let range = check_request("write", &self.geometry, address, data.len(), self.geometry.write_block_size)?;
        self.mmap[range.clone()].copy_from_slice(data);
        self.mmap.flush_range(range.start, range.len())?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_create_and_reopen() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("cart.bin");
        let geometry = CartGeometry::new(1 << 20, 32 << 10, 64 << 10, 1024).unwrap();

        let mut cart = FileCart::create(&path, geometry).unwrap();
        let data = vec![0x5Au8; 64 << 10];
        cart.write(128 << 10, &data).unwrap();
        drop(cart);

        let mut cart = FileCart::open(&path, geometry).unwrap();
        let mut buf = vec![0u8; 1024];
        cart.read(128 << 10, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0x5A));
        cart.read(0, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_open_extends_short_dump() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("short.bin");
        std::fs::write(&path, vec![0u8; 4096]).unwrap();
        let geometry = CartGeometry::new(1 << 20, 32 << 10, 64 << 10, 1024).unwrap();

        let mut cart = FileCart::open(&path, geometry).unwrap();
        let mut buf = vec![0u8; 1024];
        cart.read(0, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0));
        cart.read(8192, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0xFF));
        assert_eq!(std::fs::metadata(&path).unwrap().len(), 1 << 20);
    }
}
