//! `0xCB`-prefixed opcode table: rotates, shifts and single-bit operations.
//!
//! Costs here exclude the prefix byte; the dispatcher adds the base
//! table's `0xCB` entry on top.

use super::{ALL_FLAGS, Cpu, Flow, Instr, NO_FLAGS, Operands, ZNH};
use crate::mmu::Memory;
use crate::registers::{FLAG_C, FLAG_H, FLAG_N, FLAG_Z, FlagDelta};

pub(super) static TABLE: [Instr; 256] = [
    /* 00 */ Instr::op("RLC B", 2, 1, ALL_FLAGS, shift),
    /* 01 */ Instr::op("RLC C", 2, 1, ALL_FLAGS, shift),
    /* 02 */ Instr::op("RLC D", 2, 1, ALL_FLAGS, shift),
    /* 03 */ Instr::op("RLC E", 2, 1, ALL_FLAGS, shift),
    /* 04 */ Instr::op("RLC H", 2, 1, ALL_FLAGS, shift),
    /* 05 */ Instr::op("RLC L", 2, 1, ALL_FLAGS, shift),
    /* 06 */ Instr::op("RLC (HL)", 2, 3, ALL_FLAGS, shift),
    /* 07 */ Instr::op("RLC A", 2, 1, ALL_FLAGS, shift),
    /* 08 */ Instr::op("RRC B", 2, 1, ALL_FLAGS, shift),
    /* 09 */ Instr::op("RRC C", 2, 1, ALL_FLAGS, shift),
    /* 0A */ Instr::op("RRC D", 2, 1, ALL_FLAGS, shift),
    /* 0B */ Instr::op("RRC E", 2, 1, ALL_FLAGS, shift),
    /* 0C */ Instr::op("RRC H", 2, 1, ALL_FLAGS, shift),
    /* 0D */ Instr::op("RRC L", 2, 1, ALL_FLAGS, shift),
    /* 0E */ Instr::op("RRC (HL)", 2, 3, ALL_FLAGS, shift),
    /* 0F */ Instr::op("RRC A", 2, 1, ALL_FLAGS, shift),
    /* 10 */ Instr::op("RL B", 2, 1, ALL_FLAGS, shift),
    /* 11 */ Instr::op("RL C", 2, 1, ALL_FLAGS, shift),
    /* 12 */ Instr::op("RL D", 2, 1, ALL_FLAGS, shift),
    /* 13 */ Instr::op("RL E", 2, 1, ALL_FLAGS, shift),
    /* 14 */ Instr::op("RL H", 2, 1, ALL_FLAGS, shift),
    /* 15 */ Instr::op("RL L", 2, 1, ALL_FLAGS, shift),
    /* 16 */ Instr::op("RL (HL)", 2, 3, ALL_FLAGS, shift),
    /* 17 */ Instr::op("RL A", 2, 1, ALL_FLAGS, shift),
    /* 18 */ Instr::op("RR B", 2, 1, ALL_FLAGS, shift),
    /* 19 */ Instr::op("RR C", 2, 1, ALL_FLAGS, shift),
    /* 1A */ Instr::op("RR D", 2, 1, ALL_FLAGS, shift),
    /* 1B */ Instr::op("RR E", 2, 1, ALL_FLAGS, shift),
    /* 1C */ Instr::op("RR H", 2, 1, ALL_FLAGS, shift),
    /* 1D */ Instr::op("RR L", 2, 1, ALL_FLAGS, shift),
    /* 1E */ Instr::op("RR (HL)", 2, 3, ALL_FLAGS, shift),
    /* 1F */ Instr::op("RR A", 2, 1, ALL_FLAGS, shift),
    /* 20 */ Instr::op("SLA B", 2, 1, ALL_FLAGS, shift),
    /* 21 */ Instr::op("SLA C", 2, 1, ALL_FLAGS, shift),
    /* 22 */ Instr::op("SLA D", 2, 1, ALL_FLAGS, shift),
    /* 23 */ Instr::op("SLA E", 2, 1, ALL_FLAGS, shift),
    /* 24 */ Instr::op("SLA H", 2, 1, ALL_FLAGS, shift),
    /* 25 */ Instr::op("SLA L", 2, 1, ALL_FLAGS, shift),
    /* 26 */ Instr::op("SLA (HL)", 2, 3, ALL_FLAGS, shift),
    /* 27 */ Instr::op("SLA A", 2, 1, ALL_FLAGS, shift),
    /* 28 */ Instr::op("SRA B", 2, 1, ALL_FLAGS, shift),
    /* 29 */ Instr::op("SRA C", 2, 1, ALL_FLAGS, shift),
    /* 2A */ Instr::op("SRA D", 2, 1, ALL_FLAGS, shift),
    /* 2B */ Instr::op("SRA E", 2, 1, ALL_FLAGS, shift),
    /* 2C */ Instr::op("SRA H", 2, 1, ALL_FLAGS, shift),
    /* 2D */ Instr::op("SRA L", 2, 1, ALL_FLAGS, shift),
    /* 2E */ Instr::op("SRA (HL)", 2, 3, ALL_FLAGS, shift),
    /* 2F */ Instr::op("SRA A", 2, 1, ALL_FLAGS, shift),
    /* 30 */ Instr::op("SWAP B", 2, 1, ALL_FLAGS, shift),
    /* 31 */ Instr::op("SWAP C", 2, 1, ALL_FLAGS, shift),
    /* 32 */ Instr::op("SWAP D", 2, 1, ALL_FLAGS, shift),
    /* 33 */ Instr::op("SWAP E", 2, 1, ALL_FLAGS, shift),
    /* 34 */ Instr::op("SWAP H", 2, 1, ALL_FLAGS, shift),
    /* 35 */ Instr::op("SWAP L", 2, 1, ALL_FLAGS, shift),
    /* 36 */ Instr::op("SWAP (HL)", 2, 3, ALL_FLAGS, shift),
    /* 37 */ Instr::op("SWAP A", 2, 1, ALL_FLAGS, shift),
    /* 38 */ Instr::op("SRL B", 2, 1, ALL_FLAGS, shift),
    /* 39 */ Instr::op("SRL C", 2, 1, ALL_FLAGS, shift),
    /* 3A */ Instr::op("SRL D", 2, 1, ALL_FLAGS, shift),
    /* 3B */ Instr::op("SRL E", 2, 1, ALL_FLAGS, shift),
    /* 3C */ Instr::op("SRL H", 2, 1, ALL_FLAGS, shift),
    /* 3D */ Instr::op("SRL L", 2, 1, ALL_FLAGS, shift),
    /* 3E */ Instr::op("SRL (HL)", 2, 3, ALL_FLAGS, shift),
    /* 3F */ Instr::op("SRL A", 2, 1, ALL_FLAGS, shift),
    /* 40 */ Instr::op("BIT 0,B", 2, 1, ZNH, bit),
    /* 41 */ Instr::op("BIT 0,C", 2, 1, ZNH, bit),
    /* 42 */ Instr::op("BIT 0,D", 2, 1, ZNH, bit),
    /* 43 */ Instr::op("BIT 0,E", 2, 1, ZNH, bit),
    /* 44 */ Instr::op("BIT 0,H", 2, 1, ZNH, bit),
    /* 45 */ Instr::op("BIT 0,L", 2, 1, ZNH, bit),
    /* 46 */ Instr::op("BIT 0,(HL)", 2, 2, ZNH, bit),
    /* 47 */ Instr::op("BIT 0,A", 2, 1, ZNH, bit),
    /* 48 */ Instr::op("BIT 1,B", 2, 1, ZNH, bit),
    /* 49 */ Instr::op("BIT 1,C", 2, 1, ZNH, bit),
    /* 4A */ Instr::op("BIT 1,D", 2, 1, ZNH, bit),
    /* 4B */ Instr::op("BIT 1,E", 2, 1, ZNH, bit),
    /* 4C */ Instr::op("BIT 1,H", 2, 1, ZNH, bit),
    /* 4D */ Instr::op("BIT 1,L", 2, 1, ZNH, bit),
    /* 4E */ Instr::op("BIT 1,(HL)", 2, 2, ZNH, bit),
    /* 4F */ Instr::op("BIT 1,A", 2, 1, ZNH, bit),
    /* 50 */ Instr::op("BIT 2,B", 2, 1, ZNH, bit),
    /* 51 */ Instr::op("BIT 2,C", 2, 1, ZNH, bit),
    /* 52 */ Instr::op("BIT 2,D", 2, 1, ZNH, bit),
    /* 53 */ Instr::op("BIT 2,E", 2, 1, ZNH, bit),
    /* 54 */ Instr::op("BIT 2,H", 2, 1, ZNH, bit),
    /* 55 */ Instr::op("BIT 2,L", 2, 1, ZNH, bit),
    /* 56 */ Instr::op("BIT 2,(HL)", 2, 2, ZNH, bit),
    /* 57 */ Instr::op("BIT 2,A", 2, 1, ZNH, bit),
    /* 58 */ Instr::op("BIT 3,B", 2, 1, ZNH, bit),
    /* 59 */ Instr::op("BIT 3,C", 2, 1, ZNH, bit),
    /* 5A */ Instr::op("BIT 3,D", 2, 1, ZNH, bit),
    /* 5B */ Instr::op("BIT 3,E", 2, 1, ZNH, bit),
    /* 5C */ Instr::op("BIT 3,H", 2, 1, ZNH, bit),
    /* 5D */ Instr::op("BIT 3,L", 2, 1, ZNH, bit),
    /* 5E */ Instr::op("BIT 3,(HL)", 2, 2, ZNH, bit),
    /* 5F */ Instr::op("BIT 3,A", 2, 1, ZNH, bit),
    /* 60 */ Instr::op("BIT 4,B", 2, 1, ZNH, bit),
    /* 61 */ Instr::op("BIT 4,C", 2, 1, ZNH, bit),
    /* 62 */ Instr::op("BIT 4,D", 2, 1, ZNH, bit),
    /* 63 */ Instr::op("BIT 4,E", 2, 1, ZNH, bit),
    /* 64 */ Instr::op("BIT 4,H", 2, 1, ZNH, bit),
    /* 65 */ Instr::op("BIT 4,L", 2, 1, ZNH, bit),
    /* 66 */ Instr::op("BIT 4,(HL)", 2, 2, ZNH, bit),
    /* 67 */ Instr::op("BIT 4,A", 2, 1, ZNH, bit),
    /* 68 */ Instr::op("BIT 5,B", 2, 1, ZNH, bit),
    /* 69 */ Instr::op("BIT 5,C", 2, 1, ZNH, bit),
    /* 6A */ Instr::op("BIT 5,D", 2, 1, ZNH, bit),
    /* 6B */ Instr::op("BIT 5,E", 2, 1, ZNH, bit),
    /* 6C */ Instr::op("BIT 5,H", 2, 1, ZNH, bit),
    /* 6D */ Instr::op("BIT 5,L", 2, 1, ZNH, bit),
    /* 6E */ Instr::op("BIT 5,(HL)", 2, 2, ZNH, bit),
    /* 6F */ Instr::op("BIT 5,A", 2, 1, ZNH, bit),
    /* 70 */ Instr::op("BIT 6,B", 2, 1, ZNH, bit),
    /* 71 */ Instr::op("BIT 6,C", 2, 1, ZNH, bit),
    /* 72 */ Instr::op("BIT 6,D", 2, 1, ZNH, bit),
    /* 73 */ Instr::op("BIT 6,E", 2, 1, ZNH, bit),
    /* 74 */ Instr::op("BIT 6,H", 2, 1, ZNH, bit),
    /* 75 */ Instr::op("BIT 6,L", 2, 1, ZNH, bit),
    /* 76 */ Instr::op("BIT 6,(HL)", 2, 2, ZNH, bit),
    /* 77 */ Instr::op("BIT 6,A", 2, 1, ZNH, bit),
    /* 78 */ Instr::op("BIT 7,B", 2, 1, ZNH, bit),
    /* 79 */ Instr::op("BIT 7,C", 2, 1, ZNH, bit),
    /* 7A */ Instr::op("BIT 7,D", 2, 1, ZNH, bit),
    /* 7B */ Instr::op("BIT 7,E", 2, 1, ZNH, bit),
    /* 7C */ Instr::op("BIT 7,H", 2, 1, ZNH, bit),
    /* 7D */ Instr::op("BIT 7,L", 2, 1, ZNH, bit),
    /* 7E */ Instr::op("BIT 7,(HL)", 2, 2, ZNH, bit),
    /* 7F */ Instr::op("BIT 7,A", 2, 1, ZNH, bit),
    /* 80 */ Instr::op("RES 0,B", 2, 1, NO_FLAGS, res),
    /* 81 */ Instr::op("RES 0,C", 2, 1, NO_FLAGS, res),
    /* 82 */ Instr::op("RES 0,D", 2, 1, NO_FLAGS, res),
    /* 83 */ Instr::op("RES 0,E", 2, 1, NO_FLAGS, res),
    /* 84 */ Instr::op("RES 0,H", 2, 1, NO_FLAGS, res),
    /* 85 */ Instr::op("RES 0,L", 2, 1, NO_FLAGS, res),
    /* 86 */ Instr::op("RES 0,(HL)", 2, 3, NO_FLAGS, res),
    /* 87 */ Instr::op("RES 0,A", 2, 1, NO_FLAGS, res),
    /* 88 */ Instr::op("RES 1,B", 2, 1, NO_FLAGS, res),
    /* 89 */ Instr::op("RES 1,C", 2, 1, NO_FLAGS, res),
    /* 8A */ Instr::op("RES 1,D", 2, 1, NO_FLAGS, res),
    /* 8B */ Instr::op("RES 1,E", 2, 1, NO_FLAGS, res),
    /* 8C */ Instr::op("RES 1,H", 2, 1, NO_FLAGS, res),
    /* 8D */ Instr::op("RES 1,L", 2, 1, NO_FLAGS, res),
    /* 8E */ Instr::op("RES 1,(HL)", 2, 3, NO_FLAGS, res),
    /* 8F */ Instr::op("RES 1,A", 2, 1, NO_FLAGS, res),
    /* 90 */ Instr::op("RES 2,B", 2, 1, NO_FLAGS, res),
    /* 91 */ Instr::op("RES 2,C", 2, 1, NO_FLAGS, res),
    /* 92 */ Instr::op("RES 2,D", 2, 1, NO_FLAGS, res),
    /* 93 */ Instr::op("RES 2,E", 2, 1, NO_FLAGS, res),
    /* 94 */ Instr::op("RES 2,H", 2, 1, NO_FLAGS, res),
    /* 95 */ Instr::op("RES 2,L", 2, 1, NO_FLAGS, res),
    /* 96 */ Instr::op("RES 2,(HL)", 2, 3, NO_FLAGS, res),
    /* 97 */ Instr::op("RES 2,A", 2, 1, NO_FLAGS, res),
    /* 98 */ Instr::op("RES 3,B", 2, 1, NO_FLAGS, res),
    /* 99 */ Instr::op("RES 3,C", 2, 1, NO_FLAGS, res),
    /* 9A */ Instr::op("RES 3,D", 2, 1, NO_FLAGS, res),
    /* 9B */ Instr::op("RES 3,E", 2, 1, NO_FLAGS, res),
    /* 9C */ Instr::op("RES 3,H", 2, 1, NO_FLAGS, res),
    /* 9D */ Instr::op("RES 3,L", 2, 1, NO_FLAGS, res),
    /* 9E */ Instr::op("RES 3,(HL)", 2, 3, NO_FLAGS, res),
    /* 9F */ Instr::op("RES 3,A", 2, 1, NO_FLAGS, res),
    /* A0 */ Instr::op("RES 4,B", 2, 1, NO_FLAGS, res),
    /* A1 */ Instr::op("RES 4,C", 2, 1, NO_FLAGS, res),
    /* A2 */ Instr::op("RES 4,D", 2, 1, NO_FLAGS, res),
    /* A3 */ Instr::op("RES 4,E", 2, 1, NO_FLAGS, res),
    /* A4 */ Instr::op("RES 4,H", 2, 1, NO_FLAGS, res),
    /* A5 */ Instr::op("RES 4,L", 2, 1, NO_FLAGS, res),
    /* A6 */ Instr::op("RES 4,(HL)", 2, 3, NO_FLAGS, res),
    /* A7 */ Instr::op("RES 4,A", 2, 1, NO_FLAGS, res),
    /* A8 */ Instr::op("RES 5,B", 2, 1, NO_FLAGS, res),
    /* A9 */ Instr::op("RES 5,C", 2, 1, NO_FLAGS, res),
    /* AA */ Instr::op("RES 5,D", 2, 1, NO_FLAGS, res),
    /* AB */ Instr::op("RES 5,E", 2, 1, NO_FLAGS, res),
    /* AC */ Instr::op("RES 5,H", 2, 1, NO_FLAGS, res),
    /* AD */ Instr::op("RES 5,L", 2, 1, NO_FLAGS, res),
    /* AE */ Instr::op("RES 5,(HL)", 2, 3, NO_FLAGS, res),
    /* AF */ Instr::op("RES 5,A", 2, 1, NO_FLAGS, res),
    /* B0 */ Instr::op("RES 6,B", 2, 1, NO_FLAGS, res),
    /* B1 */ Instr::op("RES 6,C", 2, 1, NO_FLAGS, res),
    /* B2 */ Instr::op("RES 6,D", 2, 1, NO_FLAGS, res),
    /* B3 */ Instr::op("RES 6,E", 2, 1, NO_FLAGS, res),
    /* B4 */ Instr::op("RES 6,H", 2, 1, NO_FLAGS, res),
    /* B5 */ Instr::op("RES 6,L", 2, 1, NO_FLAGS, res),
    /* B6 */ Instr::op("RES 6,(HL)", 2, 3, NO_FLAGS, res),
    /* B7 */ Instr::op("RES 6,A", 2, 1, NO_FLAGS, res),
    /* B8 */ Instr::op("RES 7,B", 2, 1, NO_FLAGS, res),
    /* B9 */ Instr::op("RES 7,C", 2, 1, NO_FLAGS, res),
    /* BA */ Instr::op("RES 7,D", 2, 1, NO_FLAGS, res),
    /* BB */ Instr::op("RES 7,E", 2, 1, NO_FLAGS, res),
    /* BC */ Instr::op("RES 7,H", 2, 1, NO_FLAGS, res),
    /* BD */ Instr::op("RES 7,L", 2, 1, NO_FLAGS, res),
    /* BE */ Instr::op("RES 7,(HL)", 2, 3, NO_FLAGS, res),
    /* BF */ Instr::op("RES 7,A", 2, 1, NO_FLAGS, res),
    /* C0 */ Instr::op("SET 0,B", 2, 1, NO_FLAGS, set),
    /* C1 */ Instr::op("SET 0,C", 2, 1, NO_FLAGS, set),
    /* C2 */ Instr::op("SET 0,D", 2, 1, NO_FLAGS, set),
    /* C3 */ Instr::op("SET 0,E", 2, 1, NO_FLAGS, set),
    /* C4 */ Instr::op("SET 0,H", 2, 1, NO_FLAGS, set),
    /* C5 */ Instr::op("SET 0,L", 2, 1, NO_FLAGS, set),
    /* C6 */ Instr::op("SET 0,(HL)", 2, 3, NO_FLAGS, set),
    /* C7 */ Instr::op("SET 0,A", 2, 1, NO_FLAGS, set),
    /* C8 */ Instr::op("SET 1,B", 2, 1, NO_FLAGS, set),
    /* C9 */ Instr::op("SET 1,C", 2, 1, NO_FLAGS, set),
    /* CA */ Instr::op("SET 1,D", 2, 1, NO_FLAGS, set),
    /* CB */ Instr::op("SET 1,E", 2, 1, NO_FLAGS, set),
    /* CC */ Instr::op("SET 1,H", 2, 1, NO_FLAGS, set),
    /* CD */ Instr::op("SET 1,L", 2, 1, NO_FLAGS, set),
    /* CE */ Instr::op("SET 1,(HL)", 2, 3, NO_FLAGS, set),
    /* CF */ Instr::op("SET 1,A", 2, 1, NO_FLAGS, set),
    /* D0 */ Instr::op("SET 2,B", 2, 1, NO_FLAGS, set),
    /* D1 */ Instr::op("SET 2,C", 2, 1, NO_FLAGS, set),
    /* D2 */ Instr::op("SET 2,D", 2, 1, NO_FLAGS, set),
    /* D3 */ Instr::op("SET 2,E", 2, 1, NO_FLAGS, set),
    /* D4 */ Instr::op("SET 2,H", 2, 1, NO_FLAGS, set),
    /* D5 */ Instr::op("SET 2,L", 2, 1, NO_FLAGS, set),
    /* D6 */ Instr::op("SET 2,(HL)", 2, 3, NO_FLAGS, set),
    /* D7 */ Instr::op("SET 2,A", 2, 1, NO_FLAGS, set),
    /* D8 */ Instr::op("SET 3,B", 2, 1, NO_FLAGS, set),
    /* D9 */ Instr::op("SET 3,C", 2, 1, NO_FLAGS, set),
    /* DA */ Instr::op("SET 3,D", 2, 1, NO_FLAGS, set),
    /* DB */ Instr::op("SET 3,E", 2, 1, NO_FLAGS, set),
    /* DC */ Instr::op("SET 3,H", 2, 1, NO_FLAGS, set),
    /* DD */ Instr::op("SET 3,L", 2, 1, NO_FLAGS, set),
    /* DE */ Instr::op("SET 3,(HL)", 2, 3, NO_FLAGS, set),
    /* DF */ Instr::op("SET 3,A", 2, 1, NO_FLAGS, set),
    /* E0 */ Instr::op("SET 4,B", 2, 1, NO_FLAGS, set),
    /* E1 */ Instr::op("SET 4,C", 2, 1, NO_FLAGS, set),
    /* E2 */ Instr::op("SET 4,D", 2, 1, NO_FLAGS, set),
    /* E3 */ Instr::op("SET 4,E", 2, 1, NO_FLAGS, set),
    /* E4 */ Instr::op("SET 4,H", 2, 1, NO_FLAGS, set),
    /* E5 */ Instr::op("SET 4,L", 2, 1, NO_FLAGS, set),
    /* E6 */ Instr::op("SET 4,(HL)", 2, 3, NO_FLAGS, set),
    /* E7 */ Instr::op("SET 4,A", 2, 1, NO_FLAGS, set),
    /* E8 */ Instr::op("SET 5,B", 2, 1, NO_FLAGS, set),
    /* E9 */ Instr::op("SET 5,C", 2, 1, NO_FLAGS, set),
    /* EA */ Instr::op("SET 5,D", 2, 1, NO_FLAGS, set),
    /* EB */ Instr::op("SET 5,E", 2, 1, NO_FLAGS, set),
    /* EC */ Instr::op("SET 5,H", 2, 1, NO_FLAGS, set),
    /* ED */ Instr::op("SET 5,L", 2, 1, NO_FLAGS, set),
    /* EE */ Instr::op("SET 5,(HL)", 2, 3, NO_FLAGS, set),
    /* EF */ Instr::op("SET 5,A", 2, 1, NO_FLAGS, set),
    /* F0 */ Instr::op("SET 6,B", 2, 1, NO_FLAGS, set),
    /* F1 */ Instr::op("SET 6,C", 2, 1, NO_FLAGS, set),
    /* F2 */ Instr::op("SET 6,D", 2, 1, NO_FLAGS, set),
    /* F3 */ Instr::op("SET 6,E", 2, 1, NO_FLAGS, set),
    /* F4 */ Instr::op("SET 6,H", 2, 1, NO_FLAGS, set),
    /* F5 */ Instr::op("SET 6,L", 2, 1, NO_FLAGS, set),
    /* F6 */ Instr::op("SET 6,(HL)", 2, 3, NO_FLAGS, set),
    /* F7 */ Instr::op("SET 6,A", 2, 1, NO_FLAGS, set),
    /* F8 */ Instr::op("SET 7,B", 2, 1, NO_FLAGS, set),
    /* F9 */ Instr::op("SET 7,C", 2, 1, NO_FLAGS, set),
    /* FA */ Instr::op("SET 7,D", 2, 1, NO_FLAGS, set),
    /* FB */ Instr::op("SET 7,E", 2, 1, NO_FLAGS, set),
    /* FC */ Instr::op("SET 7,H", 2, 1, NO_FLAGS, set),
    /* FD */ Instr::op("SET 7,L", 2, 1, NO_FLAGS, set),
    /* FE */ Instr::op("SET 7,(HL)", 2, 3, NO_FLAGS, set),
    /* FF */ Instr::op("SET 7,A", 2, 1, NO_FLAGS, set),
];

fn target(op: u8) -> u8 {
    op & 0x07
}

fn bit_index(op: u8) -> u8 {
    (op >> 3) & 0x07
}

/// Rotate/shift selected by opcode bits 3..=5. Returns the result and carry.
fn shift_value(kind: u8, val: u8, carry_in: bool) -> (u8, bool) {
    let cin = carry_in as u8;
    match kind & 0x07 {
        0 => (val.rotate_left(1), val & 0x80 != 0),
        1 => (val.rotate_right(1), val & 0x01 != 0),
        2 => ((val << 1) | cin, val & 0x80 != 0),
        3 => ((val >> 1) | (cin << 7), val & 0x01 != 0),
        4 => (val << 1, val & 0x80 != 0),
        5 => ((val >> 1) | (val & 0x80), val & 0x01 != 0),
        6 => (val.rotate_left(4), false),
        _ => (val >> 1, val & 0x01 != 0),
    }
}

fn shift(cpu: &mut Cpu, mem: &mut dyn Memory, ops: Operands) -> Flow {
    let idx = target(ops.opcode);
    let val = cpu.read_r8(mem, idx);
    let (res, carry) = shift_value(bit_index(ops.opcode), val, cpu.regs.flag(FLAG_C));
    cpu.write_r8(mem, idx, res);
    cpu.regs.apply(
        FlagDelta::new()
            .with(FLAG_Z, res == 0)
            .with(FLAG_N, false)
            .with(FLAG_H, false)
            .with(FLAG_C, carry),
    );
    Flow::Next
}

fn bit(cpu: &mut Cpu, mem: &mut dyn Memory, ops: Operands) -> Flow {
    let val = cpu.read_r8(mem, target(ops.opcode));
    let set = val & (1 << bit_index(ops.opcode)) != 0;
    cpu.regs.apply(
        FlagDelta::new()
            .with(FLAG_Z, !set)
            .with(FLAG_N, false)
            .with(FLAG_H, true),
    );
    Flow::Next
}

fn res(cpu: &mut Cpu, mem: &mut dyn Memory, ops: Operands) -> Flow {
    let idx = target(ops.opcode);
    let val = cpu.read_r8(mem, idx) & !(1 << bit_index(ops.opcode));
    cpu.write_r8(mem, idx, val);
    Flow::Next
}

fn set(cpu: &mut Cpu, mem: &mut dyn Memory, ops: Operands) -> Flow {
    let idx = target(ops.opcode);
    let val = cpu.read_r8(mem, idx) | (1 << bit_index(ops.opcode));
    cpu.write_r8(mem, idx, val);
    Flow::Next
}
