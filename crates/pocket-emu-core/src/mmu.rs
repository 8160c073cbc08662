use crate::{apu::Apu, cartridge::Cartridge};

const ROM_END: u16 = 0x7FFF;
const ECHO_START: u16 = 0xE000;
const ECHO_END: u16 = 0xFDFF;
const ECHO_OFFSET: u16 = 0x2000;
const APU_START: u16 = 0xFF10;
const APU_END: u16 = 0xFF3F;

/// Byte-addressable bus as seen by the CPU.
pub trait Memory {
    fn read(&mut self, addr: u16) -> u8;
    fn write(&mut self, addr: u16, val: u8);
}

/// Flat 64 KiB memory map.
///
/// The cartridge ROM is mirrored unbanked into `0x0000..=0x7FFF` and becomes
/// read-only once loaded. Sound registers (`0xFF10..=0xFF3F`) are routed to
/// the APU; everything else is plain RAM.
pub struct Mmu {
    mem: Box<[u8; 0x10000]>,
    pub cart: Option<Cartridge>,
    pub apu: Apu,
}

impl Mmu {
    pub fn new() -> Self {
        Self {
            mem: Box::new([0; 0x10000]),
            cart: None,
            apu: Apu::new(),
        }
    }

    pub fn load_cart(&mut self, cart: Cartridge) {
        let len = cart.rom.len().min(ROM_END as usize + 1);
        self.mem[..len].copy_from_slice(&cart.rom[..len]);
        self.mem[len..=ROM_END as usize].fill(0xFF);
        self.cart = Some(cart);
    }

    /// Copy `bytes` into the map starting at `addr`, bypassing ROM protection
    /// and I/O routing. Used to stage programs for tests and tools.
    pub fn load(&mut self, addr: u16, bytes: &[u8]) {
        for (i, b) in bytes.iter().enumerate() {
            self.mem[addr.wrapping_add(i as u16) as usize] = *b;
        }
    }

    pub fn read_byte(&mut self, addr: u16) -> u8 {
        match addr {
            APU_START..=APU_END => self.apu.read_reg(addr),
            ECHO_START..=ECHO_END => self.mem[(addr - ECHO_OFFSET) as usize],
            _ => self.mem[addr as usize],
        }
    }

    pub fn write_byte(&mut self, addr: u16, val: u8) {
        match addr {
            0x0000..=ROM_END if self.cart.is_some() => {
                // No mapper: ROM writes are dropped.
            }
            APU_START..=APU_END => self.apu.write_reg(addr, val),
            ECHO_START..=ECHO_END => self.mem[(addr - ECHO_OFFSET) as usize] = val,
            _ => self.mem[addr as usize] = val,
        }
    }
}

impl Default for Mmu {
    fn default() -> Self {
        Self::new()
    }
}

impl Memory for Mmu {
    #[inline]
    fn read(&mut self, addr: u16) -> u8 {
        self.read_byte(addr)
    }

    #[inline]
    fn write(&mut self, addr: u16, val: u8) {
        self.write_byte(addr, val)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn echo_ram_mirrors_wram() {
        let mut mmu = Mmu::new();
        mmu.write_byte(0xC000, 0xAA);
        assert_eq!(mmu.read_byte(0xE000), 0xAA);
        mmu.write_byte(0xE001, 0xBB);
        assert_eq!(mmu.read_byte(0xC001), 0xBB);
    }

    #[test]
    fn rom_is_read_only_after_load() {
        let mut rom = vec![0u8; 0x8000];
        rom[0x0100] = 0x3E;
        let mut mmu = Mmu::new();
        mmu.write_byte(0x0100, 0x12);
        assert_eq!(mmu.read_byte(0x0100), 0x12);
        mmu.load_cart(Cartridge::from_bytes_unchecked(rom));
        assert_eq!(mmu.read_byte(0x0100), 0x3E);
        mmu.write_byte(0x0100, 0x00);
        assert_eq!(mmu.read_byte(0x0100), 0x3E);
    }

    #[test]
    fn sound_registers_reach_apu() {
        let mut mmu = Mmu::new();
        mmu.write_byte(0xFF25, 0x5A);
        assert_eq!(mmu.read_byte(0xFF25), 0x5A);
        mmu.write_byte(0xFF26, 0x00);
        assert_eq!(mmu.read_byte(0xFF26) & 0x80, 0);
    }
}
