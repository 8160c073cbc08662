use crate::hardware::DmgRevision;

// CPU flag bits as documented in gbdev.io/pandocs/The_CPU_Flags.html
pub const FLAG_Z: u8 = 0x80; // Zero
pub const FLAG_N: u8 = 0x40; // Subtract
pub const FLAG_H: u8 = 0x20; // Half Carry
pub const FLAG_C: u8 = 0x10; // Carry

// Post-boot CPU state from gbdev.io/pandocs/Power_Up_State.html
const BOOT_PC: u16 = 0x0100;
const BOOT_SP: u16 = 0xFFFE;

const DMG0_BOOT: [u8; 8] = [0x01, 0x00, 0xFF, 0x13, 0x00, 0xC1, 0x84, 0x03];
const DMG_ABC_BOOT: [u8; 8] = [0x01, 0xB0, 0x00, 0x13, 0x00, 0xD8, 0x01, 0x4D];

/// LR35902 register file.
///
/// `f` only ever holds the four flag bits in its upper nibble; the low nibble
/// reads back as zero on hardware and is masked on every write path.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct Registers {
    pub a: u8,
    pub f: u8,
    pub b: u8,
    pub c: u8,
    pub d: u8,
    pub e: u8,
    pub h: u8,
    pub l: u8,
    pub sp: u16,
    pub pc: u16,
}

impl Registers {
    /// Register values left behind by the DMG boot ROM.
    pub fn post_boot(revision: DmgRevision) -> Self {
        let [a, f, b, c, d, e, h, l] = match revision {
            DmgRevision::Rev0 => DMG0_BOOT,
            DmgRevision::RevA | DmgRevision::RevB | DmgRevision::RevC => DMG_ABC_BOOT,
        };
        Self {
            a,
            f,
            b,
            c,
            d,
            e,
            h,
            l,
            sp: BOOT_SP,
            pc: BOOT_PC,
        }
    }

    pub fn af(&self) -> u16 {
        ((self.a as u16) << 8) | self.f as u16
    }

    pub fn set_af(&mut self, val: u16) {
        self.a = (val >> 8) as u8;
        self.f = (val as u8) & 0xF0;
    }

    pub fn bc(&self) -> u16 {
        ((self.b as u16) << 8) | self.c as u16
    }

    pub fn set_bc(&mut self, val: u16) {
        self.b = (val >> 8) as u8;
        self.c = val as u8;
    }

    pub fn de(&self) -> u16 {
        ((self.d as u16) << 8) | self.e as u16
    }

    pub fn set_de(&mut self, val: u16) {
        self.d = (val >> 8) as u8;
        self.e = val as u8;
    }

    pub fn hl(&self) -> u16 {
        ((self.h as u16) << 8) | self.l as u16
    }

    pub fn set_hl(&mut self, val: u16) {
        self.h = (val >> 8) as u8;
        self.l = val as u8;
    }

    #[inline]
    pub fn flag(&self, mask: u8) -> bool {
        self.f & mask != 0
    }

    #[inline]
    pub fn set_flag(&mut self, mask: u8, on: bool) {
        if on {
            self.f |= mask;
        } else {
            self.f &= !mask;
        }
        self.f &= 0xF0;
    }

    /// Commit the flags an arithmetic primitive chose to update.
    #[inline]
    pub fn apply(&mut self, delta: FlagDelta) {
        self.f = delta.apply_to(self.f);
    }

    /// 8-bit register by its 3-bit operand encoding (B C D E H L - A).
    ///
    /// Index 6 encodes `(HL)` and must be resolved through memory by the caller.
    pub fn r8(&self, index: u8) -> u8 {
        match index & 0x07 {
            0 => self.b,
            1 => self.c,
            2 => self.d,
            3 => self.e,
            4 => self.h,
            5 => self.l,
            7 => self.a,
            _ => unreachable!("(HL) operand is not a register"),
        }
    }

    pub fn set_r8(&mut self, index: u8, val: u8) {
        match index & 0x07 {
            0 => self.b = val,
            1 => self.c = val,
            2 => self.d = val,
            3 => self.e = val,
            4 => self.h = val,
            5 => self.l = val,
            7 => self.a = val,
            _ => unreachable!("(HL) operand is not a register"),
        }
    }

    /// 16-bit pair by its 2-bit encoding in the `rr` opcode column (BC DE HL SP).
    pub fn r16(&self, index: u8) -> u16 {
        match index & 0x03 {
            0 => self.bc(),
            1 => self.de(),
            2 => self.hl(),
            _ => self.sp,
        }
    }

    pub fn set_r16(&mut self, index: u8, val: u16) {
        match index & 0x03 {
            0 => self.set_bc(val),
            1 => self.set_de(val),
            2 => self.set_hl(val),
            _ => self.sp = val,
        }
    }

    /// Condition code by its 2-bit encoding (NZ Z NC C).
    pub fn condition(&self, cc: u8) -> bool {
        match cc & 0x03 {
            0 => !self.flag(FLAG_Z),
            1 => self.flag(FLAG_Z),
            2 => !self.flag(FLAG_C),
            _ => self.flag(FLAG_C),
        }
    }
}

/// Selects which of Zero, Half-carry and Carry an arithmetic call updates.
///
/// Negate is not selectable: every add clears it and every subtract sets it.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FlagSelect {
    pub zero: bool,
    pub half: bool,
    pub carry: bool,
}

impl FlagSelect {
    pub const ALL: Self = Self {
        zero: true,
        half: true,
        carry: true,
    };
    /// INC/DEC r: carry is preserved.
    pub const ZH: Self = Self {
        zero: true,
        half: true,
        carry: false,
    };
    /// ADD HL,rr: zero is preserved.
    pub const HC: Self = Self {
        zero: false,
        half: true,
        carry: true,
    };
    pub const NONE: Self = Self {
        zero: false,
        half: false,
        carry: false,
    };
}

/// Flag bits an operation wants written, and their new values.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct FlagDelta {
    mask: u8,
    bits: u8,
}

impl FlagDelta {
    pub const fn new() -> Self {
        Self { mask: 0, bits: 0 }
    }

    #[must_use]
    pub const fn with(mut self, flag: u8, on: bool) -> Self {
        self.mask |= flag;
        if on {
            self.bits |= flag;
        } else {
            self.bits &= !flag;
        }
        self
    }

    /// Flags touched by this delta.
    pub const fn mask(&self) -> u8 {
        self.mask
    }

    pub const fn get(&self, flag: u8) -> Option<bool> {
        if self.mask & flag == 0 {
            None
        } else {
            Some(self.bits & flag != 0)
        }
    }

    pub const fn apply_to(&self, f: u8) -> u8 {
        ((f & !self.mask) | (self.bits & self.mask)) & 0xF0
    }
}

fn delta(select: FlagSelect, negate: bool, zero: bool, half: bool, carry: bool) -> FlagDelta {
    let mut d = FlagDelta::new().with(FLAG_N, negate);
    if select.zero {
        d = d.with(FLAG_Z, zero);
    }
    if select.half {
        d = d.with(FLAG_H, half);
    }
    if select.carry {
        d = d.with(FLAG_C, carry);
    }
    d
}

/// 8-bit add; half-carry is the carry out of bit 3.
pub fn add8(old: u8, value: u8, select: FlagSelect) -> (u8, FlagDelta) {
    let (res, carry) = old.overflowing_add(value);
    let half = (old & 0x0F) + (value & 0x0F) > 0x0F;
    (res, delta(select, false, res == 0, half, carry))
}

/// 8-bit subtract; half-carry is the borrow into bit 3.
pub fn sub8(old: u8, value: u8, select: FlagSelect) -> (u8, FlagDelta) {
    let (res, borrow) = old.overflowing_sub(value);
    let half = (old & 0x0F) < (value & 0x0F);
    (res, delta(select, true, res == 0, half, borrow))
}

/// 16-bit add; half-carry is the carry out of bit 11.
pub fn add16(old: u16, value: u16, select: FlagSelect) -> (u16, FlagDelta) {
    let (res, carry) = old.overflowing_add(value);
    let half = (old & 0x0FFF) + (value & 0x0FFF) > 0x0FFF;
    (res, delta(select, false, res == 0, half, carry))
}

/// 16-bit subtract; half-carry is the borrow into bit 11.
pub fn sub16(old: u16, value: u16, select: FlagSelect) -> (u16, FlagDelta) {
    let (res, borrow) = old.overflowing_sub(value);
    let half = (old & 0x0FFF) < (value & 0x0FFF);
    (res, delta(select, true, res == 0, half, borrow))
}

/// ADC: add with carry-in, all four flags written.
pub fn adc8(old: u8, value: u8, carry_in: bool) -> (u8, FlagDelta) {
    let cin = carry_in as u8;
    let wide = old as u16 + value as u16 + cin as u16;
    let res = wide as u8;
    let half = (old & 0x0F) + (value & 0x0F) + cin > 0x0F;
    let carry = wide > 0xFF;
    (res, delta(FlagSelect::ALL, false, res == 0, half, carry))
}

/// SBC: subtract with borrow-in, all four flags written.
pub fn sbc8(old: u8, value: u8, carry_in: bool) -> (u8, FlagDelta) {
    let cin = carry_in as u8;
    let res = old.wrapping_sub(value).wrapping_sub(cin);
    let half = (old & 0x0F) < (value & 0x0F) + cin;
    let borrow = (old as u16) < value as u16 + cin as u16;
    (res, delta(FlagSelect::ALL, true, res == 0, half, borrow))
}

/// SP-relative add used by `ADD SP,s8` and `LD HL,SP+s8`.
///
/// Flags come from the unsigned low-byte add; Z and N are always cleared.
pub fn add_sp_offset(sp: u16, offset: i8) -> (u16, FlagDelta) {
    let val = offset as i16 as u16;
    let res = sp.wrapping_add(val);
    let half = (sp & 0x0F) + (val & 0x0F) > 0x0F;
    let carry = (sp & 0xFF) + (val & 0xFF) > 0xFF;
    (
        res,
        FlagDelta::new()
            .with(FLAG_Z, false)
            .with(FLAG_N, false)
            .with(FLAG_H, half)
            .with(FLAG_C, carry),
    )
}
