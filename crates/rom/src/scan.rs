//! Finds images on a cart by their headers, independent of the map.

use crate::error::Result;
use crate::header::{HeaderInfo, HEADER_SIZE};
use cartflash::BlockDevice;
use tracing::debug;

#[cfg(feature = "serde")]
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct ScannedHeader {
    pub offset: u32,
    pub info: HeaderInfo,
}

/// Checks the start of every rom block for a valid header.
pub fn scan_headers<D: BlockDevice + ?Sized>(device: &mut D) -> Result<Vec<ScannedHeader>> {
    let geometry = device.geometry();
    let mut found = Vec::new();
    let mut buf = Vec::new();

    for offset in (0..geometry.size).step_by(geometry.rom_block_size as usize) {
        let window = geometry.read_window(offset..offset + HEADER_SIZE as u32);
        buf.resize((window.end - window.start) as usize, 0);
        device.read(window.start, &mut buf)?;

        let start = (offset - window.start) as usize;
        if let Some(info) = HeaderInfo::parse(&buf[start..]) {
            debug!(offset = format_args!("{offset:#x}"), title = %info.title, "header found");
            found.push(ScannedHeader { offset, info });
        }
    }
    Ok(found)
}
