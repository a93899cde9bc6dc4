//! GBA cartridge header: boot branch, logo, title, codes and complement.

#[cfg(feature = "serde")]
use serde::Serialize;

use crate::name::filename_to_romname;

/// Bytes covered by the header.
pub const HEADER_SIZE: usize = 0xC0;

const TITLE: std::ops::Range<usize> = 0xA0..0xAC;
const GAME_CODE: std::ops::Range<usize> = 0xAC..0xB0;
const MAKER_CODE: std::ops::Range<usize> = 0xB0..0xB2;
const FIXED: usize = 0xB2;
const FIXED_VALUE: u8 = 0x96;
const COMPLEMENT: usize = 0xBD;

/// Boot branch followed by the logo bitmap the BIOS checks.
const BOOT_AND_LOGO: [u8; 0xA0] = [
    0x2E, 0x00, 0x00, 0xEA, //
    0x24, 0xFF, 0xAE, 0x51, 0x69, 0x9A, 0xA2, 0x21, 0x3D, 0x84, 0x82, 0x0A, 0x84, 0xE4, 0x09, 0xAD, //
    0x11, 0x24, 0x8B, 0x98, 0xC0, 0x81, 0x7F, 0x21, 0xA3, 0x52, 0xBE, 0x19, 0x93, 0x09, 0xCE, 0x20, //
    0x10, 0x46, 0x4A, 0x4A, 0xF8, 0x27, 0x31, 0xEC, 0x58, 0xC7, 0xE8, 0x33, 0x82, 0xE3, 0xCE, 0xBF, //
    0x85, 0xF4, 0xDF, 0x94, 0xCE, 0x4B, 0x09, 0xC1, 0x94, 0x56, 0x8A, 0xC0, 0x13, 0x72, 0xA7, 0xFC, //
    0x9F, 0x84, 0x4D, 0x73, 0xA3, 0xCA, 0x9A, 0x61, 0x58, 0x97, 0xA3, 0x27, 0xFC, 0x03, 0x98, 0x76, //
    0x23, 0x1D, 0xC7, 0x61, 0x03, 0x04, 0xAE, 0x56, 0xBF, 0x38, 0x84, 0x00, 0x40, 0xA7, 0x0E, 0xFD, //
    0xFF, 0x52, 0xFE, 0x03, 0x6F, 0x95, 0x30, 0xF1, 0x97, 0xFB, 0xC0, 0x85, 0x60, 0xD6, 0x80, 0x25, //
    0xA9, 0x63, 0xBE, 0x03, 0x01, 0x4E, 0x38, 0xE2, 0xF9, 0xA2, 0x34, 0xFF, 0xBB, 0x3E, 0x03, 0x44, //
    0x78, 0x00, 0x90, 0xCB, 0x88, 0x11, 0x3A, 0x94, 0x65, 0xC0, 0x7C, 0x63, 0x87, 0xF0, 0x3C, 0xAF, //
    0xD6, 0x25, 0xE4, 0x8B, 0x38, 0x0A, 0xAC, 0x72, 0x21, 0xD4, 0xF8, 0x07,
];

/// Header complement over 0xA0..0xBD.
pub fn complement(rom: &[u8]) -> u8 {
    let sum = rom[0xA0..COMPLEMENT]
        .iter()
        .fold(0u8, |acc, &b| acc.wrapping_add(b));
    0u8.wrapping_sub(sum.wrapping_add(0x19))
}

pub fn has_valid_header(rom: &[u8]) -> bool {
    rom.len() >= HEADER_SIZE && rom[COMPLEMENT] == complement(rom)
}

/// Rewrites the header so the image boots from the cart.
///
/// The boot branch and logo are always restored. The title is set from
/// `name` when forced or when the image carries none; the game code only
/// when the image carries none. Images shorter than a header are left alone.
pub fn correct_header(rom: &mut [u8], name: &str, force_name: bool) {
    if rom.len() < HEADER_SIZE {
        return;
    }
    rom[..BOOT_AND_LOGO.len()].copy_from_slice(&BOOT_AND_LOGO);

    let short = filename_to_romname(name);
    let mut title = [b' '; 12];
    let mut code = [b' '; 4];
    for (dst, src) in title.iter_mut().zip(short.bytes()) {
        *dst = src;
    }
    for (dst, src) in code.iter_mut().zip(short.bytes()) {
        *dst = src;
    }
    if short.len() < title.len() {
        title[short.len()] = 0;
    }

    if force_name || !rom[TITLE.start].is_ascii_alphanumeric() {
        rom[TITLE].copy_from_slice(&title);
    }
    if !rom[GAME_CODE.start].is_ascii_alphanumeric() {
        rom[GAME_CODE].copy_from_slice(&code);
    }

    rom[FIXED] = FIXED_VALUE;
    rom[COMPLEMENT] = complement(rom);
}

fn printable(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|&b| if b.is_ascii_graphic() || b == b' ' { b as char } else { '.' })
        .collect()
}

/// Title embedded in the header, trailing blanks and dots dropped.
pub fn romname(rom: &[u8]) -> String {
    if rom.len() < TITLE.end {
        return String::new();
    }
    printable(&rom[TITLE])
        .trim_end_matches(|c: char| c == ' ' || c == '.')
        .to_string()
}

/// Fields shown by a header scan.
#[derive(Debug, Clone, PartialEq, Eq)]
#[cfg_attr(feature = "serde", derive(Serialize))]
pub struct HeaderInfo {
    pub title: String,
    pub game_code: String,
    pub maker_code: String,
}

impl HeaderInfo {
    /// Reads the fields of a header whose complement checks out.
    pub fn parse(rom: &[u8]) -> Option<Self> {
        if !has_valid_header(rom) {
            return None;
        }
        Some(Self {
            title: printable(&rom[TITLE]),
            game_code: format!("AGB-{}", printable(&rom[GAME_CODE])),
            maker_code: printable(&rom[MAKER_CODE]),
        })
    }
}
