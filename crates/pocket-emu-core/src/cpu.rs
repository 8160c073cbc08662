//! LR35902 instruction dispatcher.
//!
//! Each opcode byte indexes a static [`Instr`] entry holding its byte length,
//! cycle costs, the flags it may write and the handler that performs it.
//! Handlers never touch `PC` themselves: they return a [`Flow`] and the
//! dispatcher commits `PC` and the cycle counter afterwards, so an entry
//! without a handler leaves the machine exactly as it was.

mod base;
mod prefixed;

use crate::diagnostics::Diagnostics;
use crate::hardware::DmgRevision;
use crate::mmu::Memory;
use crate::registers::{FLAG_C, FLAG_H, FLAG_N, FLAG_Z, Registers};

#[cfg(feature = "cpu-trace")]
macro_rules! cpu_trace {
    ($($arg:tt)*) => {
        log::trace!(target: "pocket_emu::cpu", $($arg)*);
    };
}
#[cfg(not(feature = "cpu-trace"))]
macro_rules! cpu_trace {
    ($($arg:tt)*) => {};
}

const PREFIX_CB: u8 = 0xCB;

pub(crate) const NO_FLAGS: u8 = 0;
pub(crate) const ALL_FLAGS: u8 = FLAG_Z | FLAG_N | FLAG_H | FLAG_C;
pub(crate) const ZNH: u8 = FLAG_Z | FLAG_N | FLAG_H;
pub(crate) const NHC: u8 = FLAG_N | FLAG_H | FLAG_C;
pub(crate) const ZHC: u8 = FLAG_Z | FLAG_H | FLAG_C;
pub(crate) const NH: u8 = FLAG_N | FLAG_H;

/// Handler signature shared by both opcode tables.
pub type ExecFn = fn(&mut Cpu, &mut dyn Memory, Operands) -> Flow;

/// What the dispatcher does with `PC` once a handler returns.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Flow {
    /// Fall through to the next instruction; charges `Instr::cycles`.
    Next,
    /// Control transfer taken; charges `Instr::taken`.
    Branch(u16),
}

/// Operand bytes peeked after the opcode, before the handler runs.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Operands {
    /// Opcode byte (for prefixed entries, the byte after `0xCB`).
    pub opcode: u8,
    /// Address of the following instruction.
    pub next_pc: u16,
    imm: u16,
}

impl Operands {
    pub fn d8(&self) -> u8 {
        self.imm as u8
    }

    pub fn s8(&self) -> i8 {
        self.imm as u8 as i8
    }

    pub fn d16(&self) -> u16 {
        self.imm
    }
}

/// One opcode table entry.
#[derive(Clone, Copy)]
pub struct Instr {
    pub mnemonic: &'static str,
    /// Total encoded length including any prefix byte.
    pub len: u8,
    /// Machine cycles when execution falls through.
    pub cycles: u8,
    /// Machine cycles when a control transfer is taken.
    pub taken: u8,
    /// Flag bits this instruction is allowed to modify.
    pub flags: u8,
    pub exec: Option<ExecFn>,
}

impl Instr {
    pub(crate) const fn op(
        mnemonic: &'static str,
        len: u8,
        cycles: u8,
        flags: u8,
        exec: ExecFn,
    ) -> Self {
        Self {
            mnemonic,
            len,
            cycles,
            taken: cycles,
            flags,
            exec: Some(exec),
        }
    }

    pub(crate) const fn branch(
        mnemonic: &'static str,
        len: u8,
        cycles: u8,
        taken: u8,
        flags: u8,
        exec: ExecFn,
    ) -> Self {
        Self {
            mnemonic,
            len,
            cycles,
            taken,
            flags,
            exec: Some(exec),
        }
    }

    pub(crate) const fn unimplemented(mnemonic: &'static str, len: u8, cycles: u8) -> Self {
        Self {
            mnemonic,
            len,
            cycles,
            taken: cycles,
            flags: NO_FLAGS,
            exec: None,
        }
    }

    pub fn is_implemented(&self) -> bool {
        self.exec.is_some()
    }

    /// Render the mnemonic with its operand placeholders filled in.
    pub fn disassemble(&self, ops: &Operands) -> String {
        let text = self.mnemonic;
        if text.contains("d16") || text.contains("a16") {
            let word = format!("${:04X}", ops.d16());
            text.replace("d16", &word).replace("a16", &word)
        } else if text.contains("d8") || text.contains("a8") {
            let byte = format!("${:02X}", ops.d8());
            text.replace("d8", &byte).replace("a8", &byte)
        } else if text.contains("r8") {
            text.replace("r8", &format!("{:+}", ops.s8()))
        } else {
            text.to_string()
        }
    }
}

impl std::fmt::Debug for Instr {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Instr")
            .field("mnemonic", &self.mnemonic)
            .field("len", &self.len)
            .field("cycles", &self.cycles)
            .field("taken", &self.taken)
            .field("flags", &format_args!("{:#04X}", self.flags))
            .field("implemented", &self.is_implemented())
            .finish()
    }
}

/// Base opcode table entry.
pub fn base_instr(opcode: u8) -> &'static Instr {
    &base::TABLE[opcode as usize]
}

/// `0xCB`-prefixed table entry. Its `cycles` exclude the prefix byte's cost.
pub fn prefixed_instr(opcode: u8) -> &'static Instr {
    &prefixed::TABLE[opcode as usize]
}

fn prefix_label(prefixed: &bool) -> &'static str {
    if *prefixed { "CB " } else { "" }
}

/// Forward-progress fault raised by the dispatcher.
#[derive(Clone, Copy, Debug, PartialEq, Eq, thiserror::Error)]
pub enum CpuFault {
    #[error("[0x{pc:04X}] Unimplemented opcode {}0x{opcode:02X}", prefix_label(.prefixed))]
    UnimplementedOpcode { pc: u16, opcode: u8, prefixed: bool },
}

pub struct Cpu {
    pub regs: Registers,
    /// Machine cycles executed since reset.
    pub cycles: u64,
    /// Interrupt master enable latch (DI/EI/RETI).
    pub ime: bool,
    revision: DmgRevision,
    trace: bool,
    fault: Option<CpuFault>,
}

impl Cpu {
    pub fn new() -> Self {
        Self::new_with_revision(DmgRevision::default())
    }

    /// Create a CPU in the post-boot register state of the given DMG revision.
    pub fn new_with_revision(revision: DmgRevision) -> Self {
        Self {
            regs: Registers::post_boot(revision),
            cycles: 0,
            ime: false,
            revision,
            trace: false,
            fault: None,
        }
    }

    /// Restore post-boot registers, clear the cycle counter and any fault.
    pub fn reset(&mut self) {
        self.regs = Registers::post_boot(self.revision);
        self.cycles = 0;
        self.ime = false;
        self.fault = None;
    }

    /// Report every executed instruction through `Diagnostics::report_status`.
    pub fn set_trace(&mut self, enabled: bool) {
        self.trace = enabled;
    }

    /// The latched fault, if the instruction stream is suspended.
    pub fn fault(&self) -> Option<CpuFault> {
        self.fault
    }

    pub fn is_suspended(&self) -> bool {
        self.fault.is_some()
    }

    /// Clear a latched fault without touching any register. Stepping again
    /// re-executes the same opcode, so this is only useful after memory
    /// has been patched.
    pub fn resume(&mut self) {
        if let Some(fault) = self.fault.take() {
            log::info!("resuming after {fault}");
        }
    }

    /// Load a new program counter and clear any latched fault.
    pub fn set_pc(&mut self, pc: u16) {
        self.regs.pc = pc;
        self.fault = None;
    }

    /// Execute exactly one instruction and return the machine cycles it cost.
    ///
    /// Returns the latched fault without doing anything while suspended.
    pub fn step(
        &mut self,
        mem: &mut dyn Memory,
        diag: &mut dyn Diagnostics,
    ) -> Result<u32, CpuFault> {
        if let Some(fault) = self.fault {
            return Err(fault);
        }

        let pc = self.regs.pc;
        let opcode = mem.read(pc);
        let (instr, code, header, prefix_cost) = if opcode == PREFIX_CB {
            let sub = mem.read(pc.wrapping_add(1));
            (prefixed_instr(sub), sub, 2u16, base_instr(PREFIX_CB).cycles)
        } else {
            (base_instr(opcode), opcode, 1u16, 0)
        };

        let Some(exec) = instr.exec else {
            return Err(self.raise(
                CpuFault::UnimplementedOpcode {
                    pc,
                    opcode: code,
                    prefixed: header == 2,
                },
                diag,
            ));
        };

        let ops = self.fetch_operands(mem, pc, code, header, instr.len as u16);
        if self.trace {
            diag.report_status(&self.trace_line(pc, instr, &ops));
        }
        cpu_trace!("{pc:04X} {}", instr.disassemble(&ops));

        let flags_before = self.regs.f;
        let flow = exec(self, mem, ops);
        debug_assert_eq!(
            (flags_before ^ self.regs.f) & !instr.flags,
            0,
            "{} modified undeclared flags",
            instr.mnemonic
        );

        let cost = prefix_cost
            + match flow {
                Flow::Next => {
                    self.regs.pc = ops.next_pc;
                    instr.cycles
                }
                Flow::Branch(target) => {
                    self.regs.pc = target;
                    instr.taken
                }
            };
        self.cycles += cost as u64;
        Ok(cost as u32)
    }

    fn fetch_operands(
        &self,
        mem: &mut dyn Memory,
        pc: u16,
        opcode: u8,
        header: u16,
        len: u16,
    ) -> Operands {
        let start = pc.wrapping_add(header);
        let imm = match len.saturating_sub(header) {
            0 => 0,
            1 => mem.read(start) as u16,
            _ => {
                let lo = mem.read(start) as u16;
                let hi = mem.read(start.wrapping_add(1)) as u16;
                (hi << 8) | lo
            }
        };
        Operands {
            opcode,
            next_pc: pc.wrapping_add(len),
            imm,
        }
    }

    fn raise(&mut self, fault: CpuFault, diag: &mut dyn Diagnostics) -> CpuFault {
        log::warn!("{fault}");
        diag.report_message(&fault.to_string());
        diag.request_pause();
        self.fault = Some(fault);
        fault
    }

    fn trace_line(&self, pc: u16, instr: &Instr, ops: &Operands) -> String {
        let r = &self.regs;
        format!(
            "{pc:04X}  {:<16} AF={:04X} BC={:04X} DE={:04X} HL={:04X} SP={:04X} CYC={}",
            instr.disassemble(ops),
            r.af(),
            r.bc(),
            r.de(),
            r.hl(),
            r.sp,
            self.cycles
        )
    }

    pub(crate) fn push16(&mut self, mem: &mut dyn Memory, val: u16) {
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        mem.write(self.regs.sp, (val >> 8) as u8);
        self.regs.sp = self.regs.sp.wrapping_sub(1);
        mem.write(self.regs.sp, val as u8);
    }

    pub(crate) fn pop16(&mut self, mem: &mut dyn Memory) -> u16 {
        let lo = mem.read(self.regs.sp) as u16;
        self.regs.sp = self.regs.sp.wrapping_add(1);
        let hi = mem.read(self.regs.sp) as u16;
        self.regs.sp = self.regs.sp.wrapping_add(1);
        (hi << 8) | lo
    }

    /// 8-bit operand by its 3-bit encoding, resolving `(HL)` through memory.
    pub(crate) fn read_r8(&mut self, mem: &mut dyn Memory, index: u8) -> u8 {
        match index & 0x07 {
            6 => mem.read(self.regs.hl()),
            i => self.regs.r8(i),
        }
    }

    pub(crate) fn write_r8(&mut self, mem: &mut dyn Memory, index: u8, val: u8) {
        match index & 0x07 {
            6 => mem.write(self.regs.hl(), val),
            i => self.regs.set_r8(i, val),
        }
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::{LogDiagnostics, NullDiagnostics};
    use crate::mmu::Mmu;

    fn machine(program: &[u8]) -> (Cpu, Mmu) {
        let mut mmu = Mmu::new();
        mmu.load(0xC000, program);
        let mut cpu = Cpu::new();
        cpu.set_pc(0xC000);
        (cpu, mmu)
    }

    #[test]
    fn table_lengths_are_sane() {
        for op in 0..=255u8 {
            let instr = base_instr(op);
            assert!((1..=3).contains(&instr.len), "{op:02X}");
            assert!(instr.taken >= instr.cycles, "{op:02X}");
            let cb = prefixed_instr(op);
            assert_eq!(cb.len, 2);
            assert!(cb.is_implemented());
        }
    }

    #[test]
    fn disassembly_fills_placeholders() {
        let ops = Operands {
            opcode: 0x21,
            next_pc: 3,
            imm: 0xBEEF,
        };
        assert_eq!(base_instr(0x21).disassemble(&ops), "LD HL,$BEEF");
        let ops = Operands {
            opcode: 0x20,
            next_pc: 2,
            imm: 0xFE,
        };
        assert_eq!(base_instr(0x20).disassemble(&ops), "JR NZ,-2");
    }

    #[test]
    fn fault_leaves_state_untouched_and_latches() {
        let (mut cpu, mut mmu) = machine(&[0xD3, 0x00]);
        let before = cpu.regs;
        let mut diag = LogDiagnostics::new();
        let err = cpu.step(&mut mmu, &mut diag).unwrap_err();
        assert_eq!(
            err,
            CpuFault::UnimplementedOpcode {
                pc: 0xC000,
                opcode: 0xD3,
                prefixed: false,
            }
        );
        assert_eq!(err.to_string(), "[0xC000] Unimplemented opcode 0xD3");
        assert_eq!(cpu.regs, before);
        assert_eq!(cpu.cycles, 0);
        assert!(diag.take_pause_request());
        assert_eq!(diag.message_count(), 1);

        // Still suspended: no second report.
        assert_eq!(cpu.step(&mut mmu, &mut diag), Err(err));
        assert_eq!(diag.message_count(), 1);

        cpu.set_pc(0xC001);
        assert_eq!(cpu.step(&mut mmu, &mut NullDiagnostics), Ok(1));
        assert_eq!(cpu.regs.pc, 0xC002);
    }

    #[test]
    fn trace_reports_each_instruction() {
        struct Collect(Vec<String>);
        impl Diagnostics for Collect {
            fn report_message(&mut self, _text: &str) {}
            fn report_status(&mut self, text: &str) {
                self.0.push(text.to_string());
            }
            fn request_pause(&mut self) {}
        }

        let (mut cpu, mut mmu) = machine(&[0x3E, 0x42, 0x00]);
        cpu.set_trace(true);
        let mut diag = Collect(Vec::new());
        cpu.step(&mut mmu, &mut diag).unwrap();
        cpu.step(&mut mmu, &mut diag).unwrap();
        assert_eq!(diag.0.len(), 2);
        assert!(diag.0[0].starts_with("C000  LD A,$42"));
        assert!(diag.0[1].starts_with("C002  NOP"));
        // Cycle count is labelled apart from the carry flag.
        assert!(diag.0[0].ends_with(" CYC=0"));
        assert!(diag.0[1].ends_with(" CYC=2"));
    }

    #[test]
    fn reset_restores_boot_state() {
        let (mut cpu, mut mmu) = machine(&[0x3E, 0x42]);
        cpu.step(&mut mmu, &mut NullDiagnostics).unwrap();
        cpu.ime = true;
        cpu.reset();
        assert_eq!(cpu.regs, Registers::post_boot(DmgRevision::default()));
        assert_eq!(cpu.cycles, 0);
        assert!(!cpu.ime);
    }
}
