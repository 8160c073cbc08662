//! Unprefixed opcode table and its handlers.

use super::{ALL_FLAGS, Cpu, Flow, Instr, NH, NHC, NO_FLAGS, Operands, ZHC, ZNH};
use crate::mmu::Memory;
use crate::registers::{
    FLAG_C, FLAG_H, FLAG_N, FLAG_Z, FlagDelta, FlagSelect, adc8, add_sp_offset, add8, add16, sbc8,
    sub8,
};

pub(super) static TABLE: [Instr; 256] = [
    /* 00 */ Instr::op("NOP", 1, 1, NO_FLAGS, nop),
    /* 01 */ Instr::op("LD BC,d16", 3, 3, NO_FLAGS, ld_rr_d16),
    /* 02 */ Instr::op("LD (BC),A", 1, 2, NO_FLAGS, ld_ind_a),
    /* 03 */ Instr::op("INC BC", 1, 2, NO_FLAGS, inc_rr),
    /* 04 */ Instr::op("INC B", 1, 1, ZNH, inc_r),
    /* 05 */ Instr::op("DEC B", 1, 1, ZNH, dec_r),
    /* 06 */ Instr::op("LD B,d8", 2, 2, NO_FLAGS, ld_r_d8),
    /* 07 */ Instr::op("RLCA", 1, 1, ALL_FLAGS, rlca),
    /* 08 */ Instr::op("LD (a16),SP", 3, 5, NO_FLAGS, ld_a16_sp),
    /* 09 */ Instr::op("ADD HL,BC", 1, 2, NHC, add_hl_rr),
    /* 0A */ Instr::op("LD A,(BC)", 1, 2, NO_FLAGS, ld_a_ind),
    /* 0B */ Instr::op("DEC BC", 1, 2, NO_FLAGS, dec_rr),
    /* 0C */ Instr::op("INC C", 1, 1, ZNH, inc_r),
    /* 0D */ Instr::op("DEC C", 1, 1, ZNH, dec_r),
    /* 0E */ Instr::op("LD C,d8", 2, 2, NO_FLAGS, ld_r_d8),
    /* 0F */ Instr::op("RRCA", 1, 1, ALL_FLAGS, rrca),
    /* 10 */ Instr::unimplemented("STOP", 2, 1),
    /* 11 */ Instr::op("LD DE,d16", 3, 3, NO_FLAGS, ld_rr_d16),
    /* 12 */ Instr::op("LD (DE),A", 1, 2, NO_FLAGS, ld_ind_a),
    /* 13 */ Instr::op("INC DE", 1, 2, NO_FLAGS, inc_rr),
    /* 14 */ Instr::op("INC D", 1, 1, ZNH, inc_r),
    /* 15 */ Instr::op("DEC D", 1, 1, ZNH, dec_r),
    /* 16 */ Instr::op("LD D,d8", 2, 2, NO_FLAGS, ld_r_d8),
    /* 17 */ Instr::op("RLA", 1, 1, ALL_FLAGS, rla),
    /* 18 */ Instr::branch("JR r8", 2, 3, 3, NO_FLAGS, jr),
    /* 19 */ Instr::op("ADD HL,DE", 1, 2, NHC, add_hl_rr),
    /* 1A */ Instr::op("LD A,(DE)", 1, 2, NO_FLAGS, ld_a_ind),
    /* 1B */ Instr::op("DEC DE", 1, 2, NO_FLAGS, dec_rr),
    /* 1C */ Instr::op("INC E", 1, 1, ZNH, inc_r),
    /* 1D */ Instr::op("DEC E", 1, 1, ZNH, dec_r),
    /* 1E */ Instr::op("LD E,d8", 2, 2, NO_FLAGS, ld_r_d8),
    /* 1F */ Instr::op("RRA", 1, 1, ALL_FLAGS, rra),
    /* 20 */ Instr::branch("JR NZ,r8", 2, 2, 3, NO_FLAGS, jr_cc),
    /* 21 */ Instr::op("LD HL,d16", 3, 3, NO_FLAGS, ld_rr_d16),
    /* 22 */ Instr::op("LD (HL+),A", 1, 2, NO_FLAGS, ld_ind_a),
    /* 23 */ Instr::op("INC HL", 1, 2, NO_FLAGS, inc_rr),
    /* 24 */ Instr::op("INC H", 1, 1, ZNH, inc_r),
    /* 25 */ Instr::op("DEC H", 1, 1, ZNH, dec_r),
    /* 26 */ Instr::op("LD H,d8", 2, 2, NO_FLAGS, ld_r_d8),
    /* 27 */ Instr::op("DAA", 1, 1, ZHC, daa),
    /* 28 */ Instr::branch("JR Z,r8", 2, 2, 3, NO_FLAGS, jr_cc),
    /* 29 */ Instr::op("ADD HL,HL", 1, 2, NHC, add_hl_rr),
    /* 2A */ Instr::op("LD A,(HL+)", 1, 2, NO_FLAGS, ld_a_ind),
    /* 2B */ Instr::op("DEC HL", 1, 2, NO_FLAGS, dec_rr),
    /* 2C */ Instr::op("INC L", 1, 1, ZNH, inc_r),
    /* 2D */ Instr::op("DEC L", 1, 1, ZNH, dec_r),
    /* 2E */ Instr::op("LD L,d8", 2, 2, NO_FLAGS, ld_r_d8),
    /* 2F */ Instr::op("CPL", 1, 1, NH, cpl),
    /* 30 */ Instr::branch("JR NC,r8", 2, 2, 3, NO_FLAGS, jr_cc),
    /* 31 */ Instr::op("LD SP,d16", 3, 3, NO_FLAGS, ld_rr_d16),
    /* 32 */ Instr::op("LD (HL-),A", 1, 2, NO_FLAGS, ld_ind_a),
    /* 33 */ Instr::op("INC SP", 1, 2, NO_FLAGS, inc_rr),
    /* 34 */ Instr::op("INC (HL)", 1, 3, ZNH, inc_r),
    /* 35 */ Instr::op("DEC (HL)", 1, 3, ZNH, dec_r),
    /* 36 */ Instr::op("LD (HL),d8", 2, 3, NO_FLAGS, ld_r_d8),
    /* 37 */ Instr::op("SCF", 1, 1, NHC, scf),
    /* 38 */ Instr::branch("JR C,r8", 2, 2, 3, NO_FLAGS, jr_cc),
    /* 39 */ Instr::op("ADD HL,SP", 1, 2, NHC, add_hl_rr),
    /* 3A */ Instr::op("LD A,(HL-)", 1, 2, NO_FLAGS, ld_a_ind),
    /* 3B */ Instr::op("DEC SP", 1, 2, NO_FLAGS, dec_rr),
    /* 3C */ Instr::op("INC A", 1, 1, ZNH, inc_r),
    /* 3D */ Instr::op("DEC A", 1, 1, ZNH, dec_r),
    /* 3E */ Instr::op("LD A,d8", 2, 2, NO_FLAGS, ld_r_d8),
    /* 3F */ Instr::op("CCF", 1, 1, NHC, ccf),
    /* 40 */ Instr::op("LD B,B", 1, 1, NO_FLAGS, ld_r_r),
    /* 41 */ Instr::op("LD B,C", 1, 1, NO_FLAGS, ld_r_r),
    /* 42 */ Instr::op("LD B,D", 1, 1, NO_FLAGS, ld_r_r),
    /* 43 */ Instr::op("LD B,E", 1, 1, NO_FLAGS, ld_r_r),
    /* 44 */ Instr::op("LD B,H", 1, 1, NO_FLAGS, ld_r_r),
    /* 45 */ Instr::op("LD B,L", 1, 1, NO_FLAGS, ld_r_r),
    /* 46 */ Instr::op("LD B,(HL)", 1, 2, NO_FLAGS, ld_r_r),
    /* 47 */ Instr::op("LD B,A", 1, 1, NO_FLAGS, ld_r_r),
    /* 48 */ Instr::op("LD C,B", 1, 1, NO_FLAGS, ld_r_r),
    /* 49 */ Instr::op("LD C,C", 1, 1, NO_FLAGS, ld_r_r),
    /* 4A */ Instr::op("LD C,D", 1, 1, NO_FLAGS, ld_r_r),
    /* 4B */ Instr::op("LD C,E", 1, 1, NO_FLAGS, ld_r_r),
    /* 4C */ Instr::op("LD C,H", 1, 1, NO_FLAGS, ld_r_r),
    /* 4D */ Instr::op("LD C,L", 1, 1, NO_FLAGS, ld_r_r),
    /* 4E */ Instr::op("LD C,(HL)", 1, 2, NO_FLAGS, ld_r_r),
    /* 4F */ Instr::op("LD C,A", 1, 1, NO_FLAGS, ld_r_r),
    /* 50 */ Instr::op("LD D,B", 1, 1, NO_FLAGS, ld_r_r),
    /* 51 */ Instr::op("LD D,C", 1, 1, NO_FLAGS, ld_r_r),
    /* 52 */ Instr::op("LD D,D", 1, 1, NO_FLAGS, ld_r_r),
    /* 53 */ Instr::op("LD D,E", 1, 1, NO_FLAGS, ld_r_r),
    /* 54 */ Instr::op("LD D,H", 1, 1, NO_FLAGS, ld_r_r),
    /* 55 */ Instr::op("LD D,L", 1, 1, NO_FLAGS, ld_r_r),
    /* 56 */ Instr::op("LD D,(HL)", 1, 2, NO_FLAGS, ld_r_r),
    /* 57 */ Instr::op("LD D,A", 1, 1, NO_FLAGS, ld_r_r),
    /* 58 */ Instr::op("LD E,B", 1, 1, NO_FLAGS, ld_r_r),
    /* 59 */ Instr::op("LD E,C", 1, 1, NO_FLAGS, ld_r_r),
    /* 5A */ Instr::op("LD E,D", 1, 1, NO_FLAGS, ld_r_r),
    /* 5B */ Instr::op("LD E,E", 1, 1, NO_FLAGS, ld_r_r),
    /* 5C */ Instr::op("LD E,H", 1, 1, NO_FLAGS, ld_r_r),
    /* 5D */ Instr::op("LD E,L", 1, 1, NO_FLAGS, ld_r_r),
    /* 5E */ Instr::op("LD E,(HL)", 1, 2, NO_FLAGS, ld_r_r),
    /* 5F */ Instr::op("LD E,A", 1, 1, NO_FLAGS, ld_r_r),
    /* 60 */ Instr::op("LD H,B", 1, 1, NO_FLAGS, ld_r_r),
    /* 61 */ Instr::op("LD H,C", 1, 1, NO_FLAGS, ld_r_r),
    /* 62 */ Instr::op("LD H,D", 1, 1, NO_FLAGS, ld_r_r),
    /* 63 */ Instr::op("LD H,E", 1, 1, NO_FLAGS, ld_r_r),
    /* 64 */ Instr::op("LD H,H", 1, 1, NO_FLAGS, ld_r_r),
    /* 65 */ Instr::op("LD H,L", 1, 1, NO_FLAGS, ld_r_r),
    /* 66 */ Instr::op("LD H,(HL)", 1, 2, NO_FLAGS, ld_r_r),
    /* 67 */ Instr::op("LD H,A", 1, 1, NO_FLAGS, ld_r_r),
    /* 68 */ Instr::op("LD L,B", 1, 1, NO_FLAGS, ld_r_r),
    /* 69 */ Instr::op("LD L,C", 1, 1, NO_FLAGS, ld_r_r),
    /* 6A */ Instr::op("LD L,D", 1, 1, NO_FLAGS, ld_r_r),
    /* 6B */ Instr::op("LD L,E", 1, 1, NO_FLAGS, ld_r_r),
    /* 6C */ Instr::op("LD L,H", 1, 1, NO_FLAGS, ld_r_r),
    /* 6D */ Instr::op("LD L,L", 1, 1, NO_FLAGS, ld_r_r),
    /* 6E */ Instr::op("LD L,(HL)", 1, 2, NO_FLAGS, ld_r_r),
    /* 6F */ Instr::op("LD L,A", 1, 1, NO_FLAGS, ld_r_r),
    /* 70 */ Instr::op("LD (HL),B", 1, 2, NO_FLAGS, ld_r_r),
    /* 71 */ Instr::op("LD (HL),C", 1, 2, NO_FLAGS, ld_r_r),
    /* 72 */ Instr::op("LD (HL),D", 1, 2, NO_FLAGS, ld_r_r),
    /* 73 */ Instr::op("LD (HL),E", 1, 2, NO_FLAGS, ld_r_r),
    /* 74 */ Instr::op("LD (HL),H", 1, 2, NO_FLAGS, ld_r_r),
    /* 75 */ Instr::op("LD (HL),L", 1, 2, NO_FLAGS, ld_r_r),
    /* 76 */ Instr::unimplemented("HALT", 1, 1),
    /* 77 */ Instr::op("LD (HL),A", 1, 2, NO_FLAGS, ld_r_r),
    /* 78 */ Instr::op("LD A,B", 1, 1, NO_FLAGS, ld_r_r),
    /* 79 */ Instr::op("LD A,C", 1, 1, NO_FLAGS, ld_r_r),
    /* 7A */ Instr::op("LD A,D", 1, 1, NO_FLAGS, ld_r_r),
    /* 7B */ Instr::op("LD A,E", 1, 1, NO_FLAGS, ld_r_r),
    /* 7C */ Instr::op("LD A,H", 1, 1, NO_FLAGS, ld_r_r),
    /* 7D */ Instr::op("LD A,L", 1, 1, NO_FLAGS, ld_r_r),
    /* 7E */ Instr::op("LD A,(HL)", 1, 2, NO_FLAGS, ld_r_r),
    /* 7F */ Instr::op("LD A,A", 1, 1, NO_FLAGS, ld_r_r),
    /* 80 */ Instr::op("ADD A,B", 1, 1, ALL_FLAGS, alu_r),
    /* 81 */ Instr::op("ADD A,C", 1, 1, ALL_FLAGS, alu_r),
    /* 82 */ Instr::op("ADD A,D", 1, 1, ALL_FLAGS, alu_r),
    /* 83 */ Instr::op("ADD A,E", 1, 1, ALL_FLAGS, alu_r),
    /* 84 */ Instr::op("ADD A,H", 1, 1, ALL_FLAGS, alu_r),
    /* 85 */ Instr::op("ADD A,L", 1, 1, ALL_FLAGS, alu_r),
    /* 86 */ Instr::op("ADD A,(HL)", 1, 2, ALL_FLAGS, alu_r),
    /* 87 */ Instr::op("ADD A,A", 1, 1, ALL_FLAGS, alu_r),
    /* 88 */ Instr::op("ADC A,B", 1, 1, ALL_FLAGS, alu_r),
    /* 89 */ Instr::op("ADC A,C", 1, 1, ALL_FLAGS, alu_r),
    /* 8A */ Instr::op("ADC A,D", 1, 1, ALL_FLAGS, alu_r),
    /* 8B */ Instr::op("ADC A,E", 1, 1, ALL_FLAGS, alu_r),
    /* 8C */ Instr::op("ADC A,H", 1, 1, ALL_FLAGS, alu_r),
    /* 8D */ Instr::op("ADC A,L", 1, 1, ALL_FLAGS, alu_r),
    /* 8E */ Instr::op("ADC A,(HL)", 1, 2, ALL_FLAGS, alu_r),
    /* 8F */ Instr::op("ADC A,A", 1, 1, ALL_FLAGS, alu_r),
    /* 90 */ Instr::op("SUB B", 1, 1, ALL_FLAGS, alu_r),
    /* 91 */ Instr::op("SUB C", 1, 1, ALL_FLAGS, alu_r),
    /* 92 */ Instr::op("SUB D", 1, 1, ALL_FLAGS, alu_r),
    /* 93 */ Instr::op("SUB E", 1, 1, ALL_FLAGS, alu_r),
    /* 94 */ Instr::op("SUB H", 1, 1, ALL_FLAGS, alu_r),
    /* 95 */ Instr::op("SUB L", 1, 1, ALL_FLAGS, alu_r),
    /* 96 */ Instr::op("SUB (HL)", 1, 2, ALL_FLAGS, alu_r),
    /* 97 */ Instr::op("SUB A", 1, 1, ALL_FLAGS, alu_r),
    /* 98 */ Instr::op("SBC A,B", 1, 1, ALL_FLAGS, alu_r),
    /* 99 */ Instr::op("SBC A,C", 1, 1, ALL_FLAGS, alu_r),
    /* 9A */ Instr::op("SBC A,D", 1, 1, ALL_FLAGS, alu_r),
    /* 9B */ Instr::op("SBC A,E", 1, 1, ALL_FLAGS, alu_r),
    /* 9C */ Instr::op("SBC A,H", 1, 1, ALL_FLAGS, alu_r),
    /* 9D */ Instr::op("SBC A,L", 1, 1, ALL_FLAGS, alu_r),
    /* 9E */ Instr::op("SBC A,(HL)", 1, 2, ALL_FLAGS, alu_r),
    /* 9F */ Instr::op("SBC A,A", 1, 1, ALL_FLAGS, alu_r),
    /* A0 */ Instr::op("AND B", 1, 1, ALL_FLAGS, alu_r),
    /* A1 */ Instr::op("AND C", 1, 1, ALL_FLAGS, alu_r),
    /* A2 */ Instr::op("AND D", 1, 1, ALL_FLAGS, alu_r),
    /* A3 */ Instr::op("AND E", 1, 1, ALL_FLAGS, alu_r),
    /* A4 */ Instr::op("AND H", 1, 1, ALL_FLAGS, alu_r),
    /* A5 */ Instr::op("AND L", 1, 1, ALL_FLAGS, alu_r),
    /* A6 */ Instr::op("AND (HL)", 1, 2, ALL_FLAGS, alu_r),
    /* A7 */ Instr::op("AND A", 1, 1, ALL_FLAGS, alu_r),
    /* A8 */ Instr::op("XOR B", 1, 1, ALL_FLAGS, alu_r),
    /* A9 */ Instr::op("XOR C", 1, 1, ALL_FLAGS, alu_r),
    /* AA */ Instr::op("XOR D", 1, 1, ALL_FLAGS, alu_r),
    /* AB */ Instr::op("XOR E", 1, 1, ALL_FLAGS, alu_r),
    /* AC */ Instr::op("XOR H", 1, 1, ALL_FLAGS, alu_r),
    /* AD */ Instr::op("XOR L", 1, 1, ALL_FLAGS, alu_r),
    /* AE */ Instr::op("XOR (HL)", 1, 2, ALL_FLAGS, alu_r),
    /* AF */ Instr::op("XOR A", 1, 1, ALL_FLAGS, alu_r),
    /* B0 */ Instr::op("OR B", 1, 1, ALL_FLAGS, alu_r),
    /* B1 */ Instr::op("OR C", 1, 1, ALL_FLAGS, alu_r),
    /* B2 */ Instr::op("OR D", 1, 1, ALL_FLAGS, alu_r),
    /* B3 */ Instr::op("OR E", 1, 1, ALL_FLAGS, alu_r),
    /* B4 */ Instr::op("OR H", 1, 1, ALL_FLAGS, alu_r),
    /* B5 */ Instr::op("OR L", 1, 1, ALL_FLAGS, alu_r),
    /* B6 */ Instr::op("OR (HL)", 1, 2, ALL_FLAGS, alu_r),
    /* B7 */ Instr::op("OR A", 1, 1, ALL_FLAGS, alu_r),
    /* B8 */ Instr::op("CP B", 1, 1, ALL_FLAGS, alu_r),
    /* B9 */ Instr::op("CP C", 1, 1, ALL_FLAGS, alu_r),
    /* BA */ Instr::op("CP D", 1, 1, ALL_FLAGS, alu_r),
    /* BB */ Instr::op("CP E", 1, 1, ALL_FLAGS, alu_r),
    /* BC */ Instr::op("CP H", 1, 1, ALL_FLAGS, alu_r),
    /* BD */ Instr::op("CP L", 1, 1, ALL_FLAGS, alu_r),
    /* BE */ Instr::op("CP (HL)", 1, 2, ALL_FLAGS, alu_r),
    /* BF */ Instr::op("CP A", 1, 1, ALL_FLAGS, alu_r),
    /* C0 */ Instr::branch("RET NZ", 1, 2, 5, NO_FLAGS, ret_cc),
    /* C1 */ Instr::op("POP BC", 1, 3, NO_FLAGS, pop_rr),
    /* C2 */ Instr::branch("JP NZ,a16", 3, 3, 4, NO_FLAGS, jp_cc),
    /* C3 */ Instr::branch("JP a16", 3, 4, 4, NO_FLAGS, jp),
    /* C4 */ Instr::branch("CALL NZ,a16", 3, 3, 6, NO_FLAGS, call_cc),
    /* C5 */ Instr::op("PUSH BC", 1, 4, NO_FLAGS, push_rr),
    /* C6 */ Instr::op("ADD A,d8", 2, 2, ALL_FLAGS, alu_d8),
    /* C7 */ Instr::branch("RST 00H", 1, 4, 4, NO_FLAGS, rst),
    /* C8 */ Instr::branch("RET Z", 1, 2, 5, NO_FLAGS, ret_cc),
    /* C9 */ Instr::branch("RET", 1, 4, 4, NO_FLAGS, ret),
    /* CA */ Instr::branch("JP Z,a16", 3, 3, 4, NO_FLAGS, jp_cc),
    /* CB */ Instr::op("PREFIX CB", 1, 1, NO_FLAGS, nop),
    /* CC */ Instr::branch("CALL Z,a16", 3, 3, 6, NO_FLAGS, call_cc),
    /* CD */ Instr::branch("CALL a16", 3, 6, 6, NO_FLAGS, call),
    /* CE */ Instr::op("ADC A,d8", 2, 2, ALL_FLAGS, alu_d8),
    /* CF */ Instr::branch("RST 08H", 1, 4, 4, NO_FLAGS, rst),
    /* D0 */ Instr::branch("RET NC", 1, 2, 5, NO_FLAGS, ret_cc),
    /* D1 */ Instr::op("POP DE", 1, 3, NO_FLAGS, pop_rr),
    /* D2 */ Instr::branch("JP NC,a16", 3, 3, 4, NO_FLAGS, jp_cc),
    /* D3 */ Instr::unimplemented("ILLEGAL", 1, 1),
    /* D4 */ Instr::branch("CALL NC,a16", 3, 3, 6, NO_FLAGS, call_cc),
    /* D5 */ Instr::op("PUSH DE", 1, 4, NO_FLAGS, push_rr),
    /* D6 */ Instr::op("SUB d8", 2, 2, ALL_FLAGS, alu_d8),
    /* D7 */ Instr::branch("RST 10H", 1, 4, 4, NO_FLAGS, rst),
    /* D8 */ Instr::branch("RET C", 1, 2, 5, NO_FLAGS, ret_cc),
    /* D9 */ Instr::branch("RETI", 1, 4, 4, NO_FLAGS, reti),
    /* DA */ Instr::branch("JP C,a16", 3, 3, 4, NO_FLAGS, jp_cc),
    /* DB */ Instr::unimplemented("ILLEGAL", 1, 1),
    /* DC */ Instr::branch("CALL C,a16", 3, 3, 6, NO_FLAGS, call_cc),
    /* DD */ Instr::unimplemented("ILLEGAL", 1, 1),
    /* DE */ Instr::op("SBC A,d8", 2, 2, ALL_FLAGS, alu_d8),
    /* DF */ Instr::branch("RST 18H", 1, 4, 4, NO_FLAGS, rst),
    /* E0 */ Instr::op("LDH (a8),A", 2, 3, NO_FLAGS, ldh_a8_a),
    /* E1 */ Instr::op("POP HL", 1, 3, NO_FLAGS, pop_rr),
    /* E2 */ Instr::op("LD (C),A", 1, 2, NO_FLAGS, ld_c_a),
    /* E3 */ Instr::unimplemented("ILLEGAL", 1, 1),
    /* E4 */ Instr::unimplemented("ILLEGAL", 1, 1),
    /* E5 */ Instr::op("PUSH HL", 1, 4, NO_FLAGS, push_rr),
    /* E6 */ Instr::op("AND d8", 2, 2, ALL_FLAGS, alu_d8),
    /* E7 */ Instr::branch("RST 20H", 1, 4, 4, NO_FLAGS, rst),
    /* E8 */ Instr::op("ADD SP,r8", 2, 4, ALL_FLAGS, add_sp_r8),
    /* E9 */ Instr::branch("JP HL", 1, 1, 1, NO_FLAGS, jp_hl),
    /* EA */ Instr::op("LD (a16),A", 3, 4, NO_FLAGS, ld_a16_a),
    /* EB */ Instr::unimplemented("ILLEGAL", 1, 1),
    /* EC */ Instr::unimplemented("ILLEGAL", 1, 1),
    /* ED */ Instr::unimplemented("ILLEGAL", 1, 1),
    /* EE */ Instr::op("XOR d8", 2, 2, ALL_FLAGS, alu_d8),
    /* EF */ Instr::branch("RST 28H", 1, 4, 4, NO_FLAGS, rst),
    /* F0 */ Instr::op("LDH A,(a8)", 2, 3, NO_FLAGS, ldh_a_a8),
    /* F1 */ Instr::op("POP AF", 1, 3, ALL_FLAGS, pop_rr),
    /* F2 */ Instr::op("LD A,(C)", 1, 2, NO_FLAGS, ld_a_c),
    /* F3 */ Instr::op("DI", 1, 1, NO_FLAGS, di),
    /* F4 */ Instr::unimplemented("ILLEGAL", 1, 1),
    /* F5 */ Instr::op("PUSH AF", 1, 4, NO_FLAGS, push_rr),
    /* F6 */ Instr::op("OR d8", 2, 2, ALL_FLAGS, alu_d8),
    /* F7 */ Instr::branch("RST 30H", 1, 4, 4, NO_FLAGS, rst),
    /* F8 */ Instr::op("LD HL,SP+r8", 2, 3, ALL_FLAGS, ld_hl_sp_r8),
    /* F9 */ Instr::op("LD SP,HL", 1, 2, NO_FLAGS, ld_sp_hl),
    /* FA */ Instr::op("LD A,(a16)", 3, 4, NO_FLAGS, ld_a_a16),
    /* FB */ Instr::op("EI", 1, 1, NO_FLAGS, ei),
    /* FC */ Instr::unimplemented("ILLEGAL", 1, 1),
    /* FD */ Instr::unimplemented("ILLEGAL", 1, 1),
    /* FE */ Instr::op("CP d8", 2, 2, ALL_FLAGS, alu_d8),
    /* FF */ Instr::branch("RST 38H", 1, 4, 4, NO_FLAGS, rst),
];

// Bits 3..=5 of most opcodes select the destination or ALU operation, bits
// 0..=2 the source register, bits 4..=5 the register pair.
fn dst(op: u8) -> u8 {
    (op >> 3) & 0x07
}

fn src(op: u8) -> u8 {
    op & 0x07
}

fn pair(op: u8) -> u8 {
    (op >> 4) & 0x03
}

fn cond(op: u8) -> u8 {
    (op >> 3) & 0x03
}

fn nop(_: &mut Cpu, _: &mut dyn Memory, _: Operands) -> Flow {
    Flow::Next
}

fn ld_rr_d16(cpu: &mut Cpu, _: &mut dyn Memory, ops: Operands) -> Flow {
    cpu.regs.set_r16(pair(ops.opcode), ops.d16());
    Flow::Next
}

/// Address for `(BC)`, `(DE)`, `(HL+)` and `(HL-)`, applying the HL step.
fn indirect(cpu: &mut Cpu, op: u8) -> u16 {
    let r = &mut cpu.regs;
    match pair(op) {
        0 => r.bc(),
        1 => r.de(),
        2 => {
            let hl = r.hl();
            r.set_hl(hl.wrapping_add(1));
            hl
        }
        _ => {
            let hl = r.hl();
            r.set_hl(hl.wrapping_sub(1));
            hl
        }
    }
}

fn ld_ind_a(cpu: &mut Cpu, mem: &mut dyn Memory, ops: Operands) -> Flow {
    let addr = indirect(cpu, ops.opcode);
    mem.write(addr, cpu.regs.a);
    Flow::Next
}

fn ld_a_ind(cpu: &mut Cpu, mem: &mut dyn Memory, ops: Operands) -> Flow {
    let addr = indirect(cpu, ops.opcode);
    cpu.regs.a = mem.read(addr);
    Flow::Next
}

fn inc_rr(cpu: &mut Cpu, _: &mut dyn Memory, ops: Operands) -> Flow {
    let idx = pair(ops.opcode);
    let val = cpu.regs.r16(idx).wrapping_add(1);
    cpu.regs.set_r16(idx, val);
    Flow::Next
}

fn dec_rr(cpu: &mut Cpu, _: &mut dyn Memory, ops: Operands) -> Flow {
    let idx = pair(ops.opcode);
    let val = cpu.regs.r16(idx).wrapping_sub(1);
    cpu.regs.set_r16(idx, val);
    Flow::Next
}

fn add_hl_rr(cpu: &mut Cpu, _: &mut dyn Memory, ops: Operands) -> Flow {
    let value = cpu.regs.r16(pair(ops.opcode));
    let (res, delta) = add16(cpu.regs.hl(), value, FlagSelect::HC);
    cpu.regs.set_hl(res);
    cpu.regs.apply(delta);
    Flow::Next
}

fn inc_r(cpu: &mut Cpu, mem: &mut dyn Memory, ops: Operands) -> Flow {
    let idx = dst(ops.opcode);
    let old = cpu.read_r8(mem, idx);
    let (res, delta) = add8(old, 1, FlagSelect::ZH);
    cpu.write_r8(mem, idx, res);
    cpu.regs.apply(delta);
    Flow::Next
}

fn dec_r(cpu: &mut Cpu, mem: &mut dyn Memory, ops: Operands) -> Flow {
    let idx = dst(ops.opcode);
    let old = cpu.read_r8(mem, idx);
    let (res, delta) = sub8(old, 1, FlagSelect::ZH);
    cpu.write_r8(mem, idx, res);
    cpu.regs.apply(delta);
    Flow::Next
}

fn ld_r_d8(cpu: &mut Cpu, mem: &mut dyn Memory, ops: Operands) -> Flow {
    cpu.write_r8(mem, dst(ops.opcode), ops.d8());
    Flow::Next
}

fn rotate_a(cpu: &mut Cpu, res: u8, carry: bool) {
    cpu.regs.a = res;
    cpu.regs.apply(
        FlagDelta::new()
            .with(FLAG_Z, false)
            .with(FLAG_N, false)
            .with(FLAG_H, false)
            .with(FLAG_C, carry),
    );
}

fn rlca(cpu: &mut Cpu, _: &mut dyn Memory, _: Operands) -> Flow {
    let a = cpu.regs.a;
    rotate_a(cpu, a.rotate_left(1), a & 0x80 != 0);
    Flow::Next
}

fn rrca(cpu: &mut Cpu, _: &mut dyn Memory, _: Operands) -> Flow {
    let a = cpu.regs.a;
    rotate_a(cpu, a.rotate_right(1), a & 0x01 != 0);
    Flow::Next
}

fn rla(cpu: &mut Cpu, _: &mut dyn Memory, _: Operands) -> Flow {
    let a = cpu.regs.a;
    let cin = cpu.regs.flag(FLAG_C) as u8;
    rotate_a(cpu, (a << 1) | cin, a & 0x80 != 0);
    Flow::Next
}

fn rra(cpu: &mut Cpu, _: &mut dyn Memory, _: Operands) -> Flow {
    let a = cpu.regs.a;
    let cin = cpu.regs.flag(FLAG_C) as u8;
    rotate_a(cpu, (a >> 1) | (cin << 7), a & 0x01 != 0);
    Flow::Next
}

fn ld_a16_sp(cpu: &mut Cpu, mem: &mut dyn Memory, ops: Operands) -> Flow {
    let addr = ops.d16();
    let sp = cpu.regs.sp;
    mem.write(addr, sp as u8);
    mem.write(addr.wrapping_add(1), (sp >> 8) as u8);
    Flow::Next
}

fn relative(ops: &Operands) -> u16 {
    ops.next_pc.wrapping_add(ops.s8() as i16 as u16)
}

fn jr(_: &mut Cpu, _: &mut dyn Memory, ops: Operands) -> Flow {
    Flow::Branch(relative(&ops))
}

fn jr_cc(cpu: &mut Cpu, _: &mut dyn Memory, ops: Operands) -> Flow {
    if cpu.regs.condition(cond(ops.opcode)) {
        Flow::Branch(relative(&ops))
    } else {
        Flow::Next
    }
}

fn daa(cpu: &mut Cpu, _: &mut dyn Memory, _: Operands) -> Flow {
    let r = &mut cpu.regs;
    let mut a = r.a;
    let mut carry = r.flag(FLAG_C);
    let half = r.flag(FLAG_H);
    if r.flag(FLAG_N) {
        let mut adjust = 0;
        if carry {
            adjust |= 0x60;
        }
        if half {
            adjust |= 0x06;
        }
        a = a.wrapping_sub(adjust);
    } else {
        let mut adjust = 0;
        if carry || a > 0x99 {
            adjust |= 0x60;
            carry = true;
        }
        if half || (a & 0x0F) > 0x09 {
            adjust |= 0x06;
        }
        a = a.wrapping_add(adjust);
    }
    r.a = a;
    r.apply(
        FlagDelta::new()
            .with(FLAG_Z, a == 0)
            .with(FLAG_H, false)
            .with(FLAG_C, carry),
    );
    Flow::Next
}

fn cpl(cpu: &mut Cpu, _: &mut dyn Memory, _: Operands) -> Flow {
    cpu.regs.a = !cpu.regs.a;
    let delta = FlagDelta::new().with(FLAG_N, true).with(FLAG_H, true);
    cpu.regs.apply(delta);
    Flow::Next
}

fn scf(cpu: &mut Cpu, _: &mut dyn Memory, _: Operands) -> Flow {
    cpu.regs.apply(
        FlagDelta::new()
            .with(FLAG_N, false)
            .with(FLAG_H, false)
            .with(FLAG_C, true),
    );
    Flow::Next
}

fn ccf(cpu: &mut Cpu, _: &mut dyn Memory, _: Operands) -> Flow {
    let carry = cpu.regs.flag(FLAG_C);
    cpu.regs.apply(
        FlagDelta::new()
            .with(FLAG_N, false)
            .with(FLAG_H, false)
            .with(FLAG_C, !carry),
    );
    Flow::Next
}

fn ld_r_r(cpu: &mut Cpu, mem: &mut dyn Memory, ops: Operands) -> Flow {
    let val = cpu.read_r8(mem, src(ops.opcode));
    cpu.write_r8(mem, dst(ops.opcode), val);
    Flow::Next
}

fn logic(res: u8, half: bool) -> (u8, FlagDelta) {
    (
        res,
        FlagDelta::new()
            .with(FLAG_Z, res == 0)
            .with(FLAG_N, false)
            .with(FLAG_H, half)
            .with(FLAG_C, false),
    )
}

/// ADD ADC SUB SBC AND XOR OR CP, selected by opcode bits 3..=5.
fn alu(cpu: &mut Cpu, kind: u8, value: u8) {
    let a = cpu.regs.a;
    let carry = cpu.regs.flag(FLAG_C);
    let (res, delta) = match kind & 0x07 {
        0 => add8(a, value, FlagSelect::ALL),
        1 => adc8(a, value, carry),
        2 => sub8(a, value, FlagSelect::ALL),
        3 => sbc8(a, value, carry),
        4 => logic(a & value, true),
        5 => logic(a ^ value, false),
        6 => logic(a | value, false),
        _ => (a, sub8(a, value, FlagSelect::ALL).1),
    };
    cpu.regs.a = res;
    cpu.regs.apply(delta);
}

fn alu_r(cpu: &mut Cpu, mem: &mut dyn Memory, ops: Operands) -> Flow {
    let value = cpu.read_r8(mem, src(ops.opcode));
    alu(cpu, dst(ops.opcode), value);
    Flow::Next
}

fn alu_d8(cpu: &mut Cpu, _: &mut dyn Memory, ops: Operands) -> Flow {
    alu(cpu, dst(ops.opcode), ops.d8());
    Flow::Next
}

fn ret_cc(cpu: &mut Cpu, mem: &mut dyn Memory, ops: Operands) -> Flow {
    if cpu.regs.condition(cond(ops.opcode)) {
        Flow::Branch(cpu.pop16(mem))
    } else {
        Flow::Next
    }
}

fn jp_cc(cpu: &mut Cpu, _: &mut dyn Memory, ops: Operands) -> Flow {
    if cpu.regs.condition(cond(ops.opcode)) {
        Flow::Branch(ops.d16())
    } else {
        Flow::Next
    }
}

fn call_cc(cpu: &mut Cpu, mem: &mut dyn Memory, ops: Operands) -> Flow {
    if cpu.regs.condition(cond(ops.opcode)) {
        cpu.push16(mem, ops.next_pc);
        Flow::Branch(ops.d16())
    } else {
        Flow::Next
    }
}

fn pop_rr(cpu: &mut Cpu, mem: &mut dyn Memory, ops: Operands) -> Flow {
    let val = cpu.pop16(mem);
    match pair(ops.opcode) {
        3 => cpu.regs.set_af(val),
        idx => cpu.regs.set_r16(idx, val),
    }
    Flow::Next
}

fn push_rr(cpu: &mut Cpu, mem: &mut dyn Memory, ops: Operands) -> Flow {
    let val = match pair(ops.opcode) {
        3 => cpu.regs.af(),
        idx => cpu.regs.r16(idx),
    };
    cpu.push16(mem, val);
    Flow::Next
}

fn rst(cpu: &mut Cpu, mem: &mut dyn Memory, ops: Operands) -> Flow {
    cpu.push16(mem, ops.next_pc);
    Flow::Branch((ops.opcode & 0x38) as u16)
}

fn jp(_: &mut Cpu, _: &mut dyn Memory, ops: Operands) -> Flow {
    Flow::Branch(ops.d16())
}

fn ret(cpu: &mut Cpu, mem: &mut dyn Memory, _: Operands) -> Flow {
    Flow::Branch(cpu.pop16(mem))
}

fn reti(cpu: &mut Cpu, mem: &mut dyn Memory, _: Operands) -> Flow {
    cpu.ime = true;
    Flow::Branch(cpu.pop16(mem))
}

fn call(cpu: &mut Cpu, mem: &mut dyn Memory, ops: Operands) -> Flow {
    cpu.push16(mem, ops.next_pc);
    Flow::Branch(ops.d16())
}

fn ldh_a8_a(cpu: &mut Cpu, mem: &mut dyn Memory, ops: Operands) -> Flow {
    mem.write(0xFF00 | ops.d8() as u16, cpu.regs.a);
    Flow::Next
}

fn ldh_a_a8(cpu: &mut Cpu, mem: &mut dyn Memory, ops: Operands) -> Flow {
    cpu.regs.a = mem.read(0xFF00 | ops.d8() as u16);
    Flow::Next
}

fn ld_c_a(cpu: &mut Cpu, mem: &mut dyn Memory, _: Operands) -> Flow {
    mem.write(0xFF00 | cpu.regs.c as u16, cpu.regs.a);
    Flow::Next
}

fn ld_a_c(cpu: &mut Cpu, mem: &mut dyn Memory, _: Operands) -> Flow {
    cpu.regs.a = mem.read(0xFF00 | cpu.regs.c as u16);
    Flow::Next
}

fn add_sp_r8(cpu: &mut Cpu, _: &mut dyn Memory, ops: Operands) -> Flow {
    let (res, delta) = add_sp_offset(cpu.regs.sp, ops.s8());
    cpu.regs.sp = res;
    cpu.regs.apply(delta);
    Flow::Next
}

fn jp_hl(cpu: &mut Cpu, _: &mut dyn Memory, _: Operands) -> Flow {
    Flow::Branch(cpu.regs.hl())
}

fn ld_a16_a(cpu: &mut Cpu, mem: &mut dyn Memory, ops: Operands) -> Flow {
    mem.write(ops.d16(), cpu.regs.a);
    Flow::Next
}

fn ld_a_a16(cpu: &mut Cpu, mem: &mut dyn Memory, ops: Operands) -> Flow {
    cpu.regs.a = mem.read(ops.d16());
    Flow::Next
}

// No interrupt controller is wired up; these only move the IME latch.
fn di(cpu: &mut Cpu, _: &mut dyn Memory, _: Operands) -> Flow {
    cpu.ime = false;
    Flow::Next
}

fn ei(cpu: &mut Cpu, _: &mut dyn Memory, _: Operands) -> Flow {
    cpu.ime = true;
    Flow::Next
}

fn ld_hl_sp_r8(cpu: &mut Cpu, _: &mut dyn Memory, ops: Operands) -> Flow {
    let (res, delta) = add_sp_offset(cpu.regs.sp, ops.s8());
    cpu.regs.set_hl(res);
    cpu.regs.apply(delta);
    Flow::Next
}

fn ld_sp_hl(cpu: &mut Cpu, _: &mut dyn Memory, _: Operands) -> Flow {
    cpu.regs.sp = cpu.regs.hl();
    Flow::Next
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn undefined_opcodes_have_no_handler() {
        for op in [
            0xD3, 0xDB, 0xDD, 0xE3, 0xE4, 0xEB, 0xEC, 0xED, 0xF4, 0xFC, 0xFD, 0x10, 0x76,
        ] {
            assert!(!TABLE[op].is_implemented(), "{op:02X}");
        }
        assert_eq!(TABLE.iter().filter(|i| i.is_implemented()).count(), 243);
    }

    #[test]
    fn conditional_entries_carry_cost_pairs() {
        for (op, cycles, taken) in [(0x20, 2, 3), (0xC2, 3, 4), (0xC4, 3, 6), (0xC0, 2, 5)] {
            assert_eq!((TABLE[op].cycles, TABLE[op].taken), (cycles, taken));
        }
    }

    #[test]
    fn daa_adjusts_bcd_add_and_sub() {
        let mut cpu = Cpu::new();
        let ops = Operands {
            opcode: 0x27,
            next_pc: 0,
            imm: 0,
        };
        // 0x15 + 0x27 = 0x3C -> 0x42
        cpu.regs.a = 0x3C;
        cpu.regs.f = 0;
        daa(&mut cpu, &mut crate::mmu::Mmu::new(), ops);
        assert_eq!(cpu.regs.a, 0x42);
        assert!(!cpu.regs.flag(FLAG_C));
        // 0x42 - 0x15 = 0x2D (N, H) -> 0x27
        cpu.regs.a = 0x2D;
        cpu.regs.f = FLAG_N | FLAG_H;
        daa(&mut cpu, &mut crate::mmu::Mmu::new(), ops);
        assert_eq!(cpu.regs.a, 0x27);
        assert!(cpu.regs.flag(FLAG_N));
        // 0x99 + 0x01 = 0x9A -> 0x00 carry
        cpu.regs.a = 0x9A;
        cpu.regs.f = 0;
        daa(&mut cpu, &mut crate::mmu::Mmu::new(), ops);
        assert_eq!(cpu.regs.a, 0x00);
        assert!(cpu.regs.flag(FLAG_Z));
        assert!(cpu.regs.flag(FLAG_C));
    }
}
