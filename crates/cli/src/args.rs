//! Argument values shared by the subcommands.

use anyhow::{Context, Result};
use cartflash::{CartGeometry, FileCart};
use std::path::PathBuf;

/// Parses a size such as `32kB`, `256mb`, `0x8000` or `4096`.
///
/// The unit is a scale (`k`, `m`) followed by `B` for bytes or `b` for bits.
pub fn parse_size(text: &str) -> std::result::Result<u32, String> {
    let text = text.trim();
    if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
        return u32::from_str_radix(hex, 16).map_err(|e| format!("invalid size '{text}': {e}"));
    }

    let digits_end = text.find(|c: char| !c.is_ascii_digit()).unwrap_or(text.len());
    let (digits, unit) = text.split_at(digits_end);
    let value: u64 = digits.parse().map_err(|_| format!("invalid size '{text}'"))?;

    let bytes = match unit {
        "" => value,
        _ => {
            let mut chars = unit.chars();
            let scale: u64 = match chars.next().map(|c| c.to_ascii_lowercase()) {
                Some('k') => 1 << 10,
                Some('m') => 1 << 20,
                _ => return Err(format!("unknown unit in '{text}'")),
            };
            match (chars.next(), chars.next()) {
                (Some('B'), None) => value * scale,
                (Some('b'), None) => value * scale / 8,
                _ => return Err(format!("unknown unit in '{text}'")),
            }
        }
    };
    u32::try_from(bytes).map_err(|_| format!("size '{text}' does not fit in 32 bits"))
}

/// An image to add: `file` or `file,name`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AddSpec {
    pub path: PathBuf,
    pub name: Option<String>,
}

pub fn parse_add(text: &str) -> std::result::Result<AddSpec, String> {
    let (path, name) = match text.split_once(',') {
        Some((path, name)) if !name.is_empty() => (path, Some(name.to_string())),
        Some((path, _)) => (path, None),
        None => (text, None),
    };
    if path.is_empty() {
        return Err(format!("missing file in '{text}'"));
    }
    Ok(AddSpec {
        path: PathBuf::from(path),
        name,
    })
}

/// The cart dump every subcommand works on.
#[derive(Debug, Clone)]
pub struct CartOptions {
    pub cart: PathBuf,
    pub geometry: CartGeometry,
    pub json: bool,
}

impl CartOptions {
    pub fn new(cart: impl Into<PathBuf>, geometry: CartGeometry) -> Self {
        Self {
            cart: cart.into(),
            geometry,
            json: false,
        }
    }

    pub fn open(&self) -> Result<FileCart> {
        FileCart::open(&self.cart, self.geometry)
            .with_context(|| format!("Failed to open cart dump {}", self.cart.display()))
    }

    /// Opens the dump, creating a blank one first when it does not exist.
    pub fn open_or_create(&self) -> Result<FileCart> {
        if self.cart.exists() {
            return self.open();
        }
        FileCart::create(&self.cart, self.geometry)
            .with_context(|| format!("Failed to create cart dump {}", self.cart.display()))
    }
}
