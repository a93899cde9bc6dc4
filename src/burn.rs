// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Chunked burn of a change plan.
//!
//! Contiguous `Add` actions are grouped into chunks. Each chunk is widened to
//! the write block, border bytes outside the changed span are read back from
//! the cart, content is spliced in and the window is written. The loader and
//! map chunk always burns, together with any images that directly follow it.

use crate::buffer::ChunkBuffer;
use crate::config::{align_down, align_up, BurnOrder, EngineConfig, ERASED_BYTE};
use crate::device::BlockDevice;
use crate::error::{MapError, Result};
use crate::image::{load_with, ImageTools, LoaderImage, PendingImage};
use crate::map::encode_table;
use crate::plan::{ActionKind, ChangeAction, Plan};
use crc64fast::Digest;
use std::ops::{Range, RangeInclusive};
use tracing::{debug, info};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BurnChunk {
    /// Plan action indices covered by this chunk.
    pub actions: RangeInclusive<usize>,
    /// Bytes whose content changes.
    pub span: Range<u32>,
    /// `span` widened to write block boundaries.
    pub window: Range<u32>,
}

impl BurnChunk {
    pub fn includes_map(&self) -> bool {
        *self.actions.start() == 0
    }
}

#[derive(Debug, Clone, Default)]
pub struct BurnReport {
    pub chunks: Vec<BurnChunk>,
    pub writes: usize,
    pub bytes_written: u64,
}

/// Groups the plan into burn chunks in address order. The first chunk always
/// holds the loader and map.
pub fn burn_chunks(plan: &Plan, config: &EngineConfig) -> Result<Vec<BurnChunk>> {
    let actions = plan.actions();
    let mut chunks = Vec::new();
    let mut group: Option<(usize, usize)> = Some((0, 0));

    if actions.len() == 1 {
        chunks.push(chunk_for(plan, config, 0, 0)?);
    }
    for index in 1..actions.len() {
        let action = &actions[index];
        if action.kind == ActionKind::Add {
            group = match group {
                None => Some((index, index)),
                Some((start, _)) => {
                    let previous = &actions[index - 1];
                    if previous.end() != action.offset {
                        return Err(MapError::Layout(format!(
                            "'{}' at {:#x} does not follow '{}' ending at {:#x}",
                            action.name,
                            action.offset,
                            previous.name,
                            previous.end()
                        )));
                    }
                    Some((start, index))
                }
            };
        }
        if action.kind != ActionKind::Add || index == actions.len() - 1 {
            if let Some((start, end)) = group.take() {
                chunks.push(chunk_for(plan, config, start, end)?);
            }
        }
    }
    Ok(chunks)
}

fn chunk_for(plan: &Plan, config: &EngineConfig, start: usize, end: usize) -> Result<BurnChunk> {
    let actions = plan.actions();
    let last = &actions[end];
    let span = if start == 0 {
        let from = if plan.loader_replaced() { 0 } else { plan.region().table_location };
        from..last.end()
    } else {
        actions[start].offset..last.end()
    };
    let window = config.geometry.burn_window(span.clone());
    if window.end > config.geometry.size {
        return Err(MapError::Layout(format!(
            "chunk {:#x}..{:#x} widens to {:#x}..{:#x}, past the cart end {:#x}",
            span.start, span.end, window.start, window.end, config.geometry.size
        )));
    }
    Ok(BurnChunk {
        actions: start..=end,
        span,
        window,
    })
}

/// Burns every chunk of `plan`. The first failing read or write aborts; chunks
/// already written stay written.
pub fn execute<D, T>(
    device: &mut D,
    plan: &Plan,
    images: &[PendingImage],
    loader: Option<&LoaderImage>,
    tools: &T,
    config: &EngineConfig,
) -> Result<BurnReport>
where
    D: BlockDevice + ?Sized,
    T: ImageTools + ?Sized,
{
    let span = config.max_write_span;
    if !span.is_power_of_two() || span < config.geometry.write_block_size {
        return Err(MapError::Layout(format!(
            "write span {span:#x} must be a power of two no smaller than the write block"
        )));
    }

    let chunks = burn_chunks(plan, config)?;
    let mut order: Vec<&BurnChunk> = chunks.iter().collect();
    if config.burn_order == BurnOrder::MapLast {
        order.rotate_left(1);
    }

    let mut report = BurnReport::default();
    for chunk in order {
        let burner = ChunkBurner {
            plan,
            images,
            loader,
            tools,
            config,
        };
        burner.burn(device, chunk, &mut report)?;
    }
    report.chunks = chunks;
    info!(
        chunks = report.chunks.len(),
        writes = report.writes,
        bytes = report.bytes_written,
        "changes applied"
    );
    Ok(report)
}

struct ChunkBurner<'a, T: ?Sized> {
    plan: &'a Plan,
    images: &'a [PendingImage],
    loader: Option<&'a LoaderImage>,
    tools: &'a T,
    config: &'a EngineConfig,
}

impl<T: ImageTools + ?Sized> ChunkBurner<'_, T> {
    fn burn<D: BlockDevice + ?Sized>(&self, device: &mut D, chunk: &BurnChunk, report: &mut BurnReport) -> Result<()> {
        info!(
            first = chunk.actions.start(),
            last = chunk.actions.end(),
            window = format_args!("{:#x}..{:#x}", chunk.window.start, chunk.window.end),
            "burning chunk"
        );
        let mut buf = ChunkBuffer::new(chunk.window.clone(), ERASED_BYTE)?;
        self.load_borders(device, chunk, &mut buf)?;

        if chunk.includes_map() {
            self.splice_map(&mut buf)?;
        }
        for index in chunk.actions.clone().filter(|&index| index > 0) {
            self.splice_image(&mut buf, &self.plan.actions()[index])?;
        }

        self.write(device, &buf, report)
    }

    fn load_borders<D: BlockDevice + ?Sized>(&self, device: &mut D, chunk: &BurnChunk, buf: &mut ChunkBuffer) -> Result<()> {
        let read_block = self.config.geometry.read_block_size;
        let window = &chunk.window;
        if chunk.span.start > window.start {
            let low = window.start..align_up(chunk.span.start, read_block).min(window.end);
            debug!(border = format_args!("{:#x}..{:#x}", low.start, low.end), "loading low border");
            buf.load(device, low)?;
        }
        if chunk.span.end < window.end {
            let high = align_down(chunk.span.end, read_block).max(window.start)..window.end;
            debug!(border = format_args!("{:#x}..{:#x}", high.start, high.end), "loading high border");
            buf.load(device, high)?;
        }
        Ok(())
    }

    fn splice_map(&self, buf: &mut ChunkBuffer) -> Result<()> {
        let region = self.plan.region();
        if self.plan.loader_replaced() {
            let loader = self.loader.ok_or(MapError::LoaderRequired)?;
            buf.splice(0, loader.trimmed())?;
        }
        let table = encode_table(self.plan.new_map(), region.capacity);
        buf.splice(region.table_location, &table)?;
        buf.splice(region.locator_offset(), &region.locator().to_bytes())?;
        Ok(())
    }

    fn splice_image(&self, buf: &mut ChunkBuffer, action: &ChangeAction) -> Result<()> {
        let image = action
            .image
            .and_then(|index| self.images.get(index))
            .filter(|_| action.kind == ActionKind::Add)
            .ok_or_else(|| MapError::Layout(format!("burn chunk holds '{}' which is not an added image", action.name)))?;

        let data = load_with(self.tools, &image.source, &image.name)?;
        let wanted = image.original_size.min(action.size) as usize;
        if data.len() < wanted {
            return Err(MapError::Image {
                name: image.name.clone(),
                source: std::io::Error::new(
                    std::io::ErrorKind::UnexpectedEof,
                    format!("image shrank to {} bytes, {wanted} expected", data.len()),
                ),
            });
        }

        let dest = buf.slice_mut(action.offset..action.end())?;
        dest[..wanted].copy_from_slice(&data[..wanted]);
        let pad = dest[wanted - 1];
        dest[wanted..].fill(pad);
        self.tools
            .correct_header(dest, image.header_name(), image.user_name.is_some());
        debug!(name = %image.name, offset = format_args!("{:#x}", action.offset), "image spliced");
        Ok(())
    }

    fn write<D: BlockDevice + ?Sized>(&self, device: &mut D, buf: &ChunkBuffer, report: &mut BurnReport) -> Result<()> {
        let window = buf.window();
        let span = self.config.max_write_span as u64;
        let mut address = window.start;
        while address < window.end {
            let boundary = (address as u64 / span + 1) * span;
            let end = boundary.min(window.end as u64) as u32;
            let piece = buf.slice(address..end)?;
            device.write(address, piece)?;
            report.writes += 1;
            report.bytes_written += piece.len() as u64;
            if self.config.verify_writes {
                verify(device, address, piece)?;
            }
            address = end;
        }
        Ok(())
    }
}

fn verify<D: BlockDevice + ?Sized>(device: &mut D, address: u32, written: &[u8]) -> Result<()> {
    let mut back = ChunkBuffer::new(address..address + written.len() as u32, 0)?;
    back.load(device, address..address + written.len() as u32)?;
    let expected = crc64(written);
    let found = crc64(back.as_slice());
    if expected != found {
        return Err(MapError::VerifyMismatch {
            address,
            expected,
            found,
        });
    }
    debug!(address = format_args!("{address:#x}"), crc = format_args!("{expected:#018x}"), "write verified");
    Ok(())
}

fn crc64(data: &[u8]) -> u64 {
    let mut digest = Digest::new();
    digest.write(data);
    digest.sum64()
}
