use std::{fs, io, path::Path};

/// Smallest image that still contains a complete header.
pub const HEADER_END: usize = 0x0150;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MbcType {
    NoMbc,
    Mbc1,
    Mbc2,
    Mbc3,
    Mbc30,
    Mbc5,
    Unknown(u8),
}

#[derive(Debug, thiserror::Error)]
pub enum CartridgeError {
    #[error("ROM image is {len} bytes, too small to hold a header")]
    TooSmall { len: usize },
    #[error("header checksum mismatch: stored {stored:#04X}, computed {computed:#04X}")]
    HeaderChecksum { stored: u8, computed: u8 },
    #[error("failed to read ROM: {0}")]
    Io(#[from] io::Error),
}

/// A ROM image plus the metadata read from its header.
///
/// Banking is not emulated; only the first 32 KiB are ever mapped.
#[derive(Debug, Clone)]
pub struct Cartridge {
    pub rom: Vec<u8>,
    pub mbc: MbcType,
    pub cgb: bool,
    pub title: String,
    cart_type: u8,
}

impl Cartridge {
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, CartridgeError> {
        let data = fs::read(&path)?;
        let cart = Self::load(data)?;
        log::info!(
            "Loaded ROM: {} (MBC: {:?}, CGB: {})",
            cart.title,
            cart.mbc,
            if cart.cgb { "yes" } else { "no" }
        );
        Ok(cart)
    }

    /// Validate the header and wrap the image.
    pub fn load(data: Vec<u8>) -> Result<Self, CartridgeError> {
        if data.len() < HEADER_END {
            return Err(CartridgeError::TooSmall { len: data.len() });
        }
        let header = Header::parse(&data);
        let stored = header.stored_checksum();
        let computed = header.computed_checksum();
        if stored != computed {
            return Err(CartridgeError::HeaderChecksum { stored, computed });
        }
        if header.mbc_type() != MbcType::NoMbc {
            log::warn!(
                "cartridge type {:#04X} uses a mapper; only bank 0-1 are visible",
                header.cart_type()
            );
        }
        Ok(Self::from_bytes_unchecked(data))
    }

    /// Wrap an image without validating its header. Missing header bytes
    /// read as zero.
    pub fn from_bytes_unchecked(data: Vec<u8>) -> Self {
        let header = Header::parse(&data);
        let mbc = header.mbc_type();
        let cgb = header.cgb_supported();
        let title = header.title();
        let cart_type = header.cart_type();
        Self {
            rom: data,
            mbc,
            cgb,
            title,
            cart_type,
        }
    }

    /// Raw cartridge type byte (0x147).
    pub fn cart_type(&self) -> u8 {
        self.cart_type
    }
}

/// Header checksum over 0x134..=0x14C as computed by the boot ROM.
pub fn header_checksum(data: &[u8]) -> u8 {
    data.get(0x0134..=0x014C)
        .unwrap_or(&[])
        .iter()
        .fold(0u8, |x, &b| x.wrapping_sub(b).wrapping_sub(1))
}

struct Header<'a> {
    data: &'a [u8],
}

impl<'a> Header<'a> {
    fn parse(data: &'a [u8]) -> Self {
        Self { data }
    }

    fn title(&self) -> String {
        let end = 0x0143.min(self.data.len());
        let mut slice = &self.data[0x0134.min(self.data.len())..end];
        if let Some(pos) = slice.iter().position(|&b| b == 0) {
            slice = &slice[..pos];
        }
        String::from_utf8_lossy(slice).trim().to_string()
    }

    fn cgb_supported(&self) -> bool {
        self.data.get(0x0143).copied().unwrap_or(0) & 0x80 != 0
    }

    fn cart_type(&self) -> u8 {
        self.data.get(0x0147).copied().unwrap_or(0)
    }

    fn mbc_type(&self) -> MbcType {
        let ram_code = self.data.get(0x0149).copied().unwrap_or(0);
        match self.cart_type() {
            0x00 | 0x08 | 0x09 => MbcType::NoMbc,
            0x01..=0x03 => MbcType::Mbc1,
            0x05 | 0x06 => MbcType::Mbc2,
            0x0F..=0x13 => {
                if ram_code == 0x05 {
                    MbcType::Mbc30
                } else {
                    MbcType::Mbc3
                }
            }
            0x19..=0x1E => MbcType::Mbc5,
            other => MbcType::Unknown(other),
        }
    }

    fn stored_checksum(&self) -> u8 {
        self.data.get(0x014D).copied().unwrap_or(0)
    }

    fn computed_checksum(&self) -> u8 {
        header_checksum(self.data)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn image(title: &[u8], cart_type: u8) -> Vec<u8> {
        let mut rom = vec![0u8; 0x8000];
        rom[0x0134..0x0134 + title.len()].copy_from_slice(title);
        rom[0x0147] = cart_type;
        rom[0x014D] = header_checksum(&rom);
        rom
    }

    #[test]
    fn parses_title_and_type() {
        let cart = Cartridge::load(image(b"SOUNDTEST", 0x01)).unwrap();
        assert_eq!(cart.title, "SOUNDTEST");
        assert_eq!(cart.mbc, MbcType::Mbc1);
        assert_eq!(cart.cart_type(), 0x01);
        assert!(!cart.cgb);
    }

    #[test]
    fn unknown_type_is_preserved() {
        let cart = Cartridge::load(image(b"X", 0xFC)).unwrap();
        assert_eq!(cart.mbc, MbcType::Unknown(0xFC));
    }

    #[test]
    fn rejects_bad_checksum() {
        let mut rom = image(b"BROKEN", 0x00);
        rom[0x014D] ^= 0xFF;
        assert!(matches!(
            Cartridge::load(rom),
            Err(CartridgeError::HeaderChecksum { .. })
        ));
    }

    #[test]
    fn rejects_truncated_image() {
        assert!(matches!(
            Cartridge::load(vec![0; 0x100]),
            Err(CartridgeError::TooSmall { len: 0x100 })
        ));
    }
}
