mod common;

use common::{Machine, PROGRAM_BASE};
use pocket_emu_core::cpu::{CpuFault, base_instr, prefixed_instr};
use pocket_emu_core::diagnostics::LogDiagnostics;
use pocket_emu_core::registers::{FLAG_C, FLAG_H, FLAG_N, FLAG_Z};

fn is_control_transfer(mnemonic: &str) -> bool {
    ["JR", "JP", "CALL", "RET", "RST"]
        .iter()
        .any(|prefix| mnemonic.starts_with(prefix))
}

#[test]
fn every_base_opcode_matches_its_table_entry() {
    for op in 0..=255u8 {
        let instr = base_instr(op);
        if !instr.is_implemented() || op == 0xCB {
            continue;
        }
        for (f, a) in [(0x00, 0x00), (0xF0, 0xFF), (0x50, 0x0F), (0xA0, 0x80)] {
            let mut m = Machine::with_program(&[op, 0x12, 0x34]);
            m.cpu.regs.f = f;
            m.cpu.regs.a = a;
            let (delta, cycles) = m.step_measured();
            let changed = f ^ m.cpu.regs.f;
            assert_eq!(
                changed & !instr.flags,
                0,
                "{op:02X} {} touched undeclared flags",
                instr.mnemonic
            );
            if delta == instr.len as u16 && !is_control_transfer(instr.mnemonic) {
                assert_eq!(cycles, instr.cycles as u32, "{op:02X} {}", instr.mnemonic);
            } else {
                assert!(
                    is_control_transfer(instr.mnemonic),
                    "{op:02X} moved PC by {delta}"
                );
                assert!(
                    cycles == instr.cycles as u32 || cycles == instr.taken as u32,
                    "{op:02X} {} cost {cycles}",
                    instr.mnemonic
                );
            }
            assert_eq!(m.cpu.cycles, cycles as u64);
        }
    }
}

#[test]
fn every_prefixed_opcode_costs_prefix_plus_entry() {
    for op in 0..=255u8 {
        let instr = prefixed_instr(op);
        for f in [0x00, 0xF0] {
            let mut m = Machine::with_program(&[0xCB, op]);
            m.cpu.regs.f = f;
            m.cpu.regs.set_hl(0xD000);
            let (delta, cycles) = m.step_measured();
            assert_eq!(delta, 2);
            assert_eq!(cycles, 1 + instr.cycles as u32, "CB {op:02X}");
            assert_eq!((f ^ m.cpu.regs.f) & !instr.flags, 0, "CB {op:02X}");
        }
    }
}

#[test]
fn jr_nz_charges_taken_and_not_taken() {
    // JR NZ,+2
    let mut m = Machine::with_program(&[0x20, 0x02]);
    m.cpu.regs.f = 0;
    assert_eq!(m.step_measured(), (4, 3));

    let mut m = Machine::with_program(&[0x20, 0x02]);
    m.cpu.regs.f = FLAG_Z;
    assert_eq!(m.step_measured(), (2, 2));
}

#[test]
fn conditional_call_ret_and_jp_costs() {
    // CALL C,a16 with carry clear, then set.
    let mut m = Machine::with_program(&[0xDC, 0x00, 0xD0]);
    m.cpu.regs.f = 0;
    assert_eq!(m.step().unwrap(), 3);
    assert_eq!(m.cpu.regs.pc, PROGRAM_BASE + 3);

    let mut m = Machine::with_program(&[0xDC, 0x00, 0xD0]);
    m.cpu.regs.f = FLAG_C;
    assert_eq!(m.step().unwrap(), 6);
    assert_eq!(m.cpu.regs.pc, 0xD000);

    // RET Z
    let mut m = Machine::with_program(&[0xC8]);
    m.cpu.regs.f = 0;
    assert_eq!(m.step().unwrap(), 2);
    let mut m = Machine::with_program(&[0xC8]);
    m.cpu.regs.f = FLAG_Z;
    assert_eq!(m.step().unwrap(), 5);

    // JP NC,a16
    let mut m = Machine::with_program(&[0xD2, 0x34, 0x12]);
    m.cpu.regs.f = FLAG_C;
    assert_eq!(m.step().unwrap(), 3);
    let mut m = Machine::with_program(&[0xD2, 0x34, 0x12]);
    m.cpu.regs.f = 0;
    assert_eq!(m.step().unwrap(), 4);
    assert_eq!(m.cpu.regs.pc, 0x1234);
}

#[test]
fn push_pop_restores_pair_and_sp() {
    // PUSH BC; LD BC,0; POP BC
    let mut m = Machine::with_program(&[0xC5, 0x01, 0x00, 0x00, 0xC1]);
    m.cpu.regs.set_bc(0xBEEF);
    let sp = m.cpu.regs.sp;
    m.step().unwrap();
    assert_eq!(m.cpu.regs.sp, sp - 2);
    assert_eq!(m.mmu.read_byte(sp - 1), 0xBE);
    assert_eq!(m.mmu.read_byte(sp - 2), 0xEF);
    m.run(2);
    assert_eq!((m.cpu.regs.b, m.cpu.regs.c), (0xBE, 0xEF));
    assert_eq!(m.cpu.regs.sp, sp);
}

#[test]
fn pop_af_masks_low_nibble() {
    // LD BC,$12FF; PUSH BC; POP AF
    let mut m = Machine::with_program(&[0x01, 0xFF, 0x12, 0xC5, 0xF1]);
    m.run(3);
    assert_eq!(m.cpu.regs.a, 0x12);
    assert_eq!(m.cpu.regs.f, 0xF0);
}

#[test]
fn call_then_ret_resumes_after_call() {
    let mut program = vec![0u8; 0x20];
    program[0..3].copy_from_slice(&[0xCD, 0x10, 0xC0]); // CALL $C010
    program[0x10] = 0xC9; // RET
    let mut m = Machine::with_program(&program);
    let sp = m.cpu.regs.sp;
    assert_eq!(m.step().unwrap(), 6);
    assert_eq!(m.cpu.regs.pc, 0xC010);
    assert_eq!(m.cpu.regs.sp, sp - 2);
    assert_eq!(m.step().unwrap(), 4);
    assert_eq!(m.cpu.regs.pc, PROGRAM_BASE + 3);
    assert_eq!(m.cpu.regs.sp, sp);
}

#[test]
fn rst_pushes_return_address() {
    let mut m = Machine::with_program(&[0xEF]); // RST 28H
    assert_eq!(m.step().unwrap(), 4);
    assert_eq!(m.cpu.regs.pc, 0x0028);
    let sp = m.cpu.regs.sp;
    assert_eq!(m.mmu.read_byte(sp), 0x01);
    assert_eq!(m.mmu.read_byte(sp + 1), 0xC0);
}

#[test]
fn add_sets_nibble_exact_flags() {
    // LD A,$3A; LD B,$C6; ADD A,B
    let mut m = Machine::with_program(&[0x3E, 0x3A, 0x06, 0xC6, 0x80]);
    m.run(3);
    assert_eq!(m.cpu.regs.a, 0x00);
    assert_eq!(m.cpu.regs.f, FLAG_Z | FLAG_H | FLAG_C);

    // SUB: $3E - $0F borrows from bit 4 only.
    let mut m = Machine::with_program(&[0x3E, 0x3E, 0xD6, 0x0F]);
    m.run(2);
    assert_eq!(m.cpu.regs.a, 0x2F);
    assert_eq!(m.cpu.regs.f, FLAG_N | FLAG_H);
}

#[test]
fn inc_dec_preserve_carry() {
    // SCF; LD B,$FF; INC B; DEC B
    let mut m = Machine::with_program(&[0x37, 0x06, 0xFF, 0x04, 0x05]);
    m.run(3);
    assert_eq!(m.cpu.regs.b, 0x00);
    assert_eq!(m.cpu.regs.f, FLAG_Z | FLAG_H | FLAG_C);
    m.run(1);
    assert_eq!(m.cpu.regs.b, 0xFF);
    assert_eq!(m.cpu.regs.f, FLAG_N | FLAG_H | FLAG_C);
}

#[test]
fn add_hl_preserves_zero() {
    // LD HL,$0FFF; LD BC,$0001; ADD HL,BC
    let mut m = Machine::with_program(&[0x21, 0xFF, 0x0F, 0x01, 0x01, 0x00, 0x09]);
    m.cpu.regs.f = FLAG_Z;
    m.run(3);
    assert_eq!(m.cpu.regs.hl(), 0x1000);
    assert_eq!(m.cpu.regs.f, FLAG_Z | FLAG_H);
}

#[test]
fn inc_rr_touches_no_flags() {
    let mut m = Machine::with_program(&[0x03]); // INC BC
    m.cpu.regs.set_bc(0xFFFF);
    m.cpu.regs.f = 0xA0;
    m.run(1);
    assert_eq!(m.cpu.regs.bc(), 0x0000);
    assert_eq!(m.cpu.regs.f, 0xA0);
}

#[test]
fn hl_increment_and_decrement_stores() {
    // LD HL,$D000; LD A,$42; LD (HL+),A; LD (HL-),A
    let mut m = Machine::with_program(&[0x21, 0x00, 0xD0, 0x3E, 0x42, 0x22, 0x32]);
    m.run(4);
    assert_eq!(m.mmu.read_byte(0xD000), 0x42);
    assert_eq!(m.mmu.read_byte(0xD001), 0x42);
    assert_eq!(m.cpu.regs.hl(), 0xD000);
}

#[test]
fn ldh_reaches_sound_registers() {
    // LD A,$00; LDH ($24),A; LD A,$11; LDH A,($24)
    let mut m = Machine::with_program(&[0x3E, 0x00, 0xE0, 0x24, 0x3E, 0x11, 0xF0, 0x24]);
    m.run(4);
    assert_eq!(m.cpu.regs.a, 0x00);
    assert_eq!(m.mmu.apu.master_volume(), (0, 0));
}

#[test]
fn prefixed_ops_on_memory() {
    // LD HL,$D000; SET 3,(HL); BIT 3,(HL); SWAP (HL)
    let mut m = Machine::with_program(&[0x21, 0x00, 0xD0, 0xCB, 0xDE, 0xCB, 0x5E, 0xCB, 0x36]);
    m.run(1);
    assert_eq!(m.step().unwrap(), 4);
    assert_eq!(m.mmu.read_byte(0xD000), 0x08);
    assert_eq!(m.step().unwrap(), 3);
    assert!(!m.cpu.regs.flag(FLAG_Z));
    assert_eq!(m.step().unwrap(), 4);
    assert_eq!(m.mmu.read_byte(0xD000), 0x80);
}

#[test]
fn ei_di_reti_drive_ime() {
    let mut program = vec![0u8; 0x10];
    program[0] = 0xFB; // EI
    program[1] = 0xF3; // DI
    program[2] = 0xCD; // CALL $C008
    program[3] = 0x08;
    program[4] = 0xC0;
    program[8] = 0xD9; // RETI
    let mut m = Machine::with_program(&program);
    m.run(1);
    assert!(m.cpu.ime);
    m.run(2);
    assert!(!m.cpu.ime);
    m.run(1);
    assert!(m.cpu.ime);
    assert_eq!(m.cpu.regs.pc, PROGRAM_BASE + 5);
}

#[test]
fn unimplemented_opcode_suspends_until_pc_reload() {
    // NOP; HALT; NOP
    let mut m = Machine::with_program(&[0x00, 0x76, 0x00]);
    let mut diag = LogDiagnostics::new();
    assert_eq!(m.cpu.step(&mut m.mmu, &mut diag), Ok(1));
    let regs = m.cpu.regs;
    let fault = m.cpu.step(&mut m.mmu, &mut diag).unwrap_err();
    assert_eq!(
        fault,
        CpuFault::UnimplementedOpcode {
            pc: PROGRAM_BASE + 1,
            opcode: 0x76,
            prefixed: false,
        }
    );
    assert!(diag.take_pause_request());
    assert!(m.cpu.is_suspended());
    assert_eq!(m.cpu.regs, regs);
    assert_eq!(m.cpu.cycles, 1);

    // resume() alone re-executes the same byte.
    m.cpu.resume();
    assert!(m.cpu.step(&mut m.mmu, &mut diag).is_err());

    m.cpu.set_pc(PROGRAM_BASE + 2);
    assert_eq!(m.cpu.step(&mut m.mmu, &mut diag), Ok(1));
    assert_eq!(m.cpu.cycles, 2);
}

#[test]
fn patched_memory_resumes_in_place() {
    let mut m = Machine::with_program(&[0xFD, 0x00]);
    assert!(m.step().is_err());
    m.mmu.load(PROGRAM_BASE, &[0x00]);
    m.cpu.resume();
    assert_eq!(m.step_measured(), (1, 1));
}
