use cartflash::{DeviceError, MapError};
use std::io;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum RomError {
    #[error("IO error: {0}")]
    IoError(#[from] io::Error),
    #[error("Device error: {0}")]
    Device(#[from] DeviceError),
    #[error("Map error: {0}")]
    Map(#[from] MapError),
}

pub type Result<T> = std::result::Result<T, RomError>;
