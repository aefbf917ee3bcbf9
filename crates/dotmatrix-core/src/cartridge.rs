use std::{fs, io, path::Path};

use log::{info, warn};
use thiserror::Error;

// Header layout (gbdev.io/pandocs/The_Cartridge_Header.html)
const TITLE_START: usize = 0x0134;
const TITLE_END: usize = 0x0143;
const CGB_FLAG: usize = 0x0143;
const CART_TYPE: usize = 0x0147;
/// Smallest image that still contains a full header.
pub const HEADER_END: usize = 0x0150;

const CART_TYPE_ROM_ONLY: u8 = 0x00;

#[derive(Error, Debug)]
pub enum CartridgeError {
    #[error("failed to read ROM: {0}")]
    Io(#[from] io::Error),

    #[error("ROM image is {0} bytes, smaller than the {HEADER_END}-byte header")]
    TooSmall(usize),
}

/// A ROM image mapped flat at 0x0000. Bank controllers are not emulated.
#[derive(Debug, Clone)]
pub struct Cartridge {
    rom: Vec<u8>,
    pub title: String,
    pub cgb: bool,
    pub cart_type: u8,
}

impl Cartridge {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CartridgeError> {
        let data = fs::read(&path)?;
        let cart = Self::load(data)?;
        info!(
            "Loaded ROM: {} ({}, type {:02X}, CGB: {})",
            cart.title,
            path.as_ref().display(),
            cart.cart_type,
            if cart.cgb { "yes" } else { "no" }
        );
        Ok(cart)
    }

    pub fn load(data: Vec<u8>) -> Result<Self, CartridgeError> {
        if data.len() < HEADER_END {
            return Err(CartridgeError::TooSmall(data.len()));
        }
        let header = Header::parse(&data);
        let title = header.title();
        let cgb = header.cgb_supported();
        let cart_type = header.cart_type();

        if cart_type != CART_TYPE_ROM_ONLY {
            warn!("cartridge type {cart_type:02X} needs a bank controller; mapping bank 0-1 only");
        }
        if cgb {
            warn!("{title} is flagged for CGB; running in DMG mode");
        }

        Ok(Self {
            rom: data,
            title,
            cgb,
            cart_type,
        })
    }

    pub fn rom(&self) -> &[u8] {
        &self.rom
    }
}

struct Header<'a> {
    data: &'a [u8],
}

impl<'a> Header<'a> {
    fn parse(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn title(&self) -> String {
        let mut slice = &self.data[TITLE_START..TITLE_END];
        if let Some(pos) = slice.iter().position(|&b| b == 0) {
            slice = &slice[..pos];
        }
        String::from_utf8_lossy(slice).trim().to_string()
    }

    fn cgb_supported(&self) -> bool {
        self.data[CGB_FLAG] & 0x80 != 0
    }

    fn cart_type(&self) -> u8 {
        self.data[CART_TYPE]
    }
}
