// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::config::MAP_NAME_LEN;
use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use std::fmt;
use std::io::{self, Read};

/// Fixed-width, zero-padded entry name. At most 31 significant bytes are kept.
#[derive(Clone, Copy, PartialEq, Eq, Hash)]
pub struct EntryName([u8; MAP_NAME_LEN]);

impl EntryName {
    pub const EMPTY: Self = Self([0; MAP_NAME_LEN]);

    pub fn new(name: &str) -> Self {
        let mut raw = [0u8; MAP_NAME_LEN];
        let mut len = name.len().min(MAP_NAME_LEN - 1);
        while !name.is_char_boundary(len) {
            len -= 1;
        }
        raw[..len].copy_from_slice(&name.as_bytes()[..len]);
        Self(raw)
    }

    pub fn from_raw(raw: [u8; MAP_NAME_LEN]) -> Self {
        Self(raw)
    }

    pub fn as_raw(&self) -> &[u8; MAP_NAME_LEN] {
        &self.0
    }

    /// Bytes up to the first NUL.
    pub fn as_bytes(&self) -> &[u8] {
        let len = self.0.iter().position(|&b| b == 0).unwrap_or(MAP_NAME_LEN);
        &self.0[..len]
    }

    pub fn is_empty(&self) -> bool {
        self.0[0] == 0
    }

    pub fn matches(&self, name: &str) -> bool {
        self.as_bytes() == EntryName::new(name).as_bytes()
    }
}

impl fmt::Display for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&String::from_utf8_lossy(self.as_bytes()))
    }
}

impl fmt::Debug for EntryName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:?}", self.to_string())
    }
}

impl From<&str> for EntryName {
    fn from(name: &str) -> Self {
        Self::new(name)
    }
}

/// One persisted record of the map table.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MapEntry {
    pub name: EntryName,
    pub offset: u32,
    pub size: u32,
}

impl MapEntry {
    pub const SIZE: usize = MAP_NAME_LEN + 4 + 4; // 40 bytes

    /// The all-zero record that ends a table.
    pub const TERMINATOR: Self = Self {
        name: EntryName::EMPTY,
        offset: 0,
        size: 0,
    };

    pub fn new(name: impl Into<EntryName>, offset: u32, size: u32) -> Self {
        Self {
            name: name.into(),
            offset,
            size,
        }
    }

    pub fn end(&self) -> u32 {
        self.offset + self.size
    }

    pub fn is_terminator(&self) -> bool {
        self.size == 0
    }

    pub fn read_from<R: Read>(mut reader: R) -> io::Result<Self> {
        let mut name = [0u8; MAP_NAME_LEN];
        reader.read_exact(&mut name)?;
        let offset = reader.read_u32::<BigEndian>()?;
        let size = reader.read_u32::<BigEndian>()?;
        Ok(Self {
            name: EntryName::from_raw(name),
            offset,
            size,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        buf[..MAP_NAME_LEN].copy_from_slice(self.name.as_raw());
        BigEndian::write_u32(&mut buf[MAP_NAME_LEN..MAP_NAME_LEN + 4], self.offset);
        BigEndian::write_u32(&mut buf[MAP_NAME_LEN + 4..], self.size);
        buf
    }
}
