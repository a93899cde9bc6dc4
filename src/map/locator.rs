// Copyright (c) 2025 Varshith Gudur. Licensed under AGPLv3.
use crate::config::MAP_MAGIC;
use byteorder::{BigEndian, ByteOrder, ReadBytesExt};
use std::io::{self, Read};

/// Trailer that tells a scanning loader where the map table lives.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Locator {
    pub magic: u32,
    pub location: u32,
    pub number_of_entries: u16,
}

impl Locator {
    pub const SIZE: usize = 4 + 4 + 2; // 10 bytes

    pub fn new(location: u32, number_of_entries: u16) -> Self {
        Self {
            magic: MAP_MAGIC,
            location,
            number_of_entries,
        }
    }

    pub fn is_valid(&self) -> bool {
        self.magic == MAP_MAGIC
    }

    pub fn read_from<R: Read>(mut reader: R) -> io::Result<Self> {
        let magic = reader.read_u32::<BigEndian>()?;
        let location = reader.read_u32::<BigEndian>()?;
        let number_of_entries = reader.read_u16::<BigEndian>()?;
        Ok(Self {
            magic,
            location,
            number_of_entries,
        })
    }

    pub fn to_bytes(&self) -> [u8; Self::SIZE] {
        let mut buf = [0u8; Self::SIZE];
        BigEndian::write_u32(&mut buf[0..4], self.magic);
        BigEndian::write_u32(&mut buf[4..8], self.location);
        BigEndian::write_u16(&mut buf[8..10], self.number_of_entries);
        buf
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Cursor;

    #[test]
    fn test_locator_bytes() {
        let locator = Locator::new(0xFB00, 20);
        let bytes = locator.to_bytes();
        assert_eq!(bytes, [0x1F, 0x2A, 0x00, 0x02, 0x00, 0x00, 0xFB, 0x00, 0x00, 0x14]);

        let decoded = Locator::read_from(Cursor::new(&bytes[..])).unwrap();
        assert!(decoded.is_valid());
        assert_eq!(decoded, locator);
    }

    #[test]
    fn test_erased_flash_is_not_a_locator() {
        let decoded = Locator::read_from(Cursor::new(&[0xFFu8; Locator::SIZE][..])).unwrap();
        assert!(!decoded.is_valid());
    }
}
