// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Block I/O capability the engine reads and burns through.
//!
//! The engine never talks to a concrete backend. Every backend enforces the
//! alignment rules of its [`CartGeometry`]: reads on `read_block_size`
//! boundaries, writes on `write_block_size` boundaries.

mod file;
mod memory;

pub use file::FileCart;
pub use memory::MemoryCart;

use crate::config::CartGeometry;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum DeviceError {
    #[error("{op} of {len:#x} bytes at {address:#x} is not aligned to {alignment:#x}")]
    Misaligned {
        op: &'static str,
        address: u32,
        len: usize,
        alignment: u32,
    },
    #[error("{op} of {len:#x} bytes at {address:#x} exceeds the {size:#x} byte cart")]
    OutOfRange {
        op: &'static str,
        address: u32,
        len: usize,
        size: u32,
    },
    #[error("Device failure at {address:#x}: {reason}")]
    Failed { address: u32, reason: String },
    #[error("IO error: {0}")]
    Io(#[from] io::Error),
}

pub type DeviceResult<T> = std::result::Result<T, DeviceError>;

pub trait BlockDevice {
    fn geometry(&self) -> CartGeometry;

    /// Fills `buf` from `address`. Address and length are read-block aligned.
    fn read(&mut self, address: u32, buf: &mut [u8]) -> DeviceResult<()>;

    /// Burns `data` at `address`. Address and length are write-block aligned.
    fn write(&mut self, address: u32, data: &[u8]) -> DeviceResult<()>;

    fn connect(&mut self) -> DeviceResult<()> {
        Ok(())
    }
}

impl<D: BlockDevice + ?Sized> BlockDevice for &mut D {
    fn geometry(&self) -> CartGeometry {
        (**self).geometry()
    }

    fn read(&mut self, address: u32, buf: &mut [u8]) -> DeviceResult<()> {
        (**self).read(address, buf)
    }

    fn write(&mut self, address: u32, data: &[u8]) -> DeviceResult<()> {
        (**self).write(address, data)
    }

    fn connect(&mut self) -> DeviceResult<()> {
        (**self).connect()
    }
}

/// Checks a request against the cart bounds and the given alignment.
pub(crate) fn check_request(
    op: &'static str,
    geometry: &CartGeometry,
    address: u32,
    len: usize,
    alignment: u32,
) -> DeviceResult<std::ops::Range<usize>> {
    let start = address as usize;
    let end = start + len;
    if end > geometry.size as usize {
        return Err(DeviceError::OutOfRange {
            op,
            address,
            len,
            size: geometry.size,
        });
    }
    let mask = alignment as usize - 1;
    if start & mask != 0 || len & mask != 0 {
        return Err(DeviceError::Misaligned {
            op,
            address,
            len,
            alignment,
        });
    }
    Ok(start..end)
}
