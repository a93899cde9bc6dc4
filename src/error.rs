// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
//! Error types.

use crate::device::DeviceError;
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum MapError {
    #[error("Cannot allocate a working buffer of {bytes} bytes")]
    Allocation { bytes: usize },
    #[error("No map locator found after scanning {scanned} rom blocks")]
    NotFound { scanned: u32 },
    #[error("Loader and map need {needed:#x} bytes but only {available:#x} are available (short by {shortfall:#x})")]
    LoaderCapacity {
        needed: u32,
        available: u32,
        shortfall: u32,
    },
    #[error("New map holds {entries} entries but the table has room for {capacity}")]
    TableCapacity { entries: usize, capacity: usize },
    #[error("Cannot place {images} images ({image_bytes:#x} bytes) into {holes} holes ({hole_bytes:#x} bytes free)")]
    Infeasible {
        images: usize,
        image_bytes: u64,
        holes: usize,
        hole_bytes: u64,
    },
    #[error("Placement search is limited to {limit} images, {count} requested")]
    TooManyImages { count: usize, limit: usize },
    #[error("A loader image is required to create a new map")]
    LoaderRequired,
    #[error("Corrupt map: {0}")]
    CorruptMap(String),
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),
    #[error("Cannot load image {name}: {source}")]
    Image {
        name: String,
        #[source]
        source: io::Error,
    },
    #[error("Read-back mismatch at {address:#x}: expected crc {expected:#018x}, found {found:#018x}")]
    VerifyMismatch {
        address: u32,
        expected: u64,
        found: u64,
    },
    #[error("Invalid layout: {0}")]
    Layout(String),
}

pub type Result<T> = std::result::Result<T, MapError>;
