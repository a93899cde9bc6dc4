// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Address-tagged working buffers.
//!
//! A `ChunkBuffer` covers one window of cart address space. Every access is
//! expressed in cart addresses and checked against the window, so splicing
//! content or border bytes can never land outside the buffer.

use crate::device::BlockDevice;
use crate::error::{MapError, Result};
use std::ops::Range;

pub(crate) struct ChunkBuffer {
    base: u32,
    data: Vec<u8>,
}

impl ChunkBuffer {
    /// Allocates a buffer for `window`, filled with `fill`.
    pub fn new(window: Range<u32>, fill: u8) -> Result<Self> {
        let len = window.len();
        let mut data = Vec::new();
        data.try_reserve_exact(len)
            .map_err(|_| MapError::Allocation { bytes: len })?;
        data.resize(len, fill);
        Ok(Self {
            base: window.start,
            data,
        })
    }

    pub fn window(&self) -> Range<u32> {
        self.base..self.base + self.data.len() as u32
    }

    pub fn as_slice(&self) -> &[u8] {
        &self.data
    }

    /// Bytes of `span`, which must lie inside the window.
    pub fn slice(&self, span: Range<u32>) -> Result<&[u8]> {
        let local = self.local(&span)?;
        Ok(&self.data[local])
    }

    pub fn slice_mut(&mut self, span: Range<u32>) -> Result<&mut [u8]> {
        let local = self.local(&span)?;
        Ok(&mut self.data[local])
    }

    pub fn splice(&mut self, address: u32, bytes: &[u8]) -> Result<()> {
        let end = address
            .checked_add(bytes.len() as u32)
            .ok_or_else(|| MapError::Layout(format!("splice at {address:#x} overflows the address space")))?;
        self.slice_mut(address..end)?.copy_from_slice(bytes);
        Ok(())
    }

    /// Fills `span` from the device. The span must be read aligned.
    pub fn load<D: BlockDevice + ?Sized>(&mut self, device: &mut D, span: Range<u32>) -> Result<()> {
        if span.is_empty() {
            return Ok(());
        }
        let address = span.start;
        device.read(address, self.slice_mut(span)?)?;
        Ok(())
    }

    fn local(&self, span: &Range<u32>) -> Result<Range<usize>> {
        let window = self.window();
        if span.start > span.end || span.start < window.start || span.end > window.end {
            return Err(MapError::Layout(format!(
                "span {:#x}..{:#x} lies outside buffer window {:#x}..{:#x}",
                span.start, span.end, window.start, window.end
            )));
        }
        Ok((span.start - self.base) as usize..(span.end - self.base) as usize)
    }
}
