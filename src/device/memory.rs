// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use super::{check_request, BlockDevice, DeviceError, DeviceResult};
use crate::config::{CartGeometry, ERASED_BYTE};
use std::ops::Range;

/// A cart held in RAM.
///
/// Starts erased, records the span of every write, and can be told to fail
/// the n-th write so burn error paths can be exercised.
#[derive(Debug, Clone)]
pub struct MemoryCart {
    geometry: CartGeometry,
    data: Vec<u8>,
    writes: Vec<Range<u32>>,
    reads: usize,
    fail_write_at: Option<usize>,
}

impl MemoryCart {
    pub fn new(geometry: CartGeometry) -> Self {
        Self {
            geometry,
            data: vec![ERASED_BYTE; geometry.size as usize],
            writes: Vec::new(),
            reads: 0,
            fail_write_at: None,
        }
    }

    /// Wraps an existing dump. Short dumps are padded with erased bytes.
    pub fn from_bytes(geometry: CartGeometry, mut data: Vec<u8>) -> Self {
        data.resize(geometry.size as usize, ERASED_BYTE);
        Self {
            geometry,
            data,
            writes: Vec::new(),
            reads: 0,
            fail_write_at: None,
        }
    }

    pub fn bytes(&self) -> &[u8] {
        &self.data
    }

    /// Direct access for arranging test fixtures, bypassing alignment rules.
    pub fn bytes_mut(&mut self) -> &mut [u8] {
        &mut self.data
    }

    pub fn writes(&self) -> &[Range<u32>] {
        &self.writes
    }

    pub fn read_count(&self) -> usize {
        self.reads
    }

    pub fn clear_log(&mut self) {
        self.writes.clear();
        self.reads = 0;
    }

    /// Makes the write with the given zero-based index fail.
    pub fn fail_write_at(&mut self, index: usize) {
        self.fail_write_at = Some(index);
    }
}

impl BlockDevice for MemoryCart {
    fn geometry(&self) -> CartGeometry {
        self.geometry
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> DeviceResult<()> {
        let range = check_request("read", &self.geometry, address, buf.len(), self.geometry.read_block_size)?;
        buf.copy_from_slice(&self.data[range]);
        self.reads += 1;
        Ok(())
    }

    fn write(&mut self, address: u32, data: &[u8]) -> DeviceResult<()> {
        let range = check_request("write", &self.geometry, address, data.len(), self.geometry.write_block_size)?;
        if self.fail_write_at == Some(self.writes.len()) {
            return Err(DeviceError::Failed {
                address,
                reason: "injected write failure".to_string(),
            });
        }
        self.data[range].copy_from_slice(data);
        self.writes.push(address..address + data.len() as u32);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn small() -> CartGeometry {
        CartGeometry::new(1 << 20, 32 << 10, 64 << 10, 1024).unwrap()
    }

    #[test]
    fn test_starts_erased() {
        let mut cart = MemoryCart::new(small());
        let mut buf = [0u8; 1024];
        cart.read(0, &mut buf).unwrap();
        assert!(buf.iter().all(|&b| b == 0xFF));
    }

    #[test]
    fn test_enforces_alignment() {
        let mut cart = MemoryCart::new(small());
        let mut buf = [0u8; 100];
        assert!(matches!(cart.read(0, &mut buf), Err(DeviceError::Misaligned { .. })));

        let data = vec![0u8; 1024];
        assert!(matches!(cart.write(0, &data), Err(DeviceError::Misaligned { .. })));

        let data = vec![0u8; 64 << 10];
        assert!(matches!(cart.write(1 << 20, &data), Err(DeviceError::OutOfRange { .. })));
    }

    #[test]
    fn test_records_writes_and_injects_failure() {
        let mut cart = MemoryCart::new(small());
        let data = vec![0x11u8; 64 << 10];
        cart.write(64 << 10, &data).unwrap();
        assert_eq!(cart.writes(), &[(64 << 10)..(128 << 10)]);
        assert_eq!(cart.bytes()[64 << 10], 0x11);

        cart.fail_write_at(1);
        assert!(matches!(cart.write(0, &data), Err(DeviceError::Failed { .. })));
        assert_eq!(cart.bytes()[0], 0xFF);
    }
}
