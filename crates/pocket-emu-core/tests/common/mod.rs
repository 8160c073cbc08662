#![allow(dead_code)]

use pocket_emu_core::{
    cpu::{Cpu, CpuFault},
    diagnostics::NullDiagnostics,
    mmu::Mmu,
};

/// Where test programs are staged (work RAM).
pub const PROGRAM_BASE: u16 = 0xC000;

pub struct Machine {
    pub cpu: Cpu,
    pub mmu: Mmu,
}

impl Machine {
    /// Post-boot CPU with `program` at [`PROGRAM_BASE`] and PC pointing at it.
    pub fn with_program(program: &[u8]) -> Self {
        let mut mmu = Mmu::new();
        mmu.load(PROGRAM_BASE, program);
        let mut cpu = Cpu::new();
        cpu.set_pc(PROGRAM_BASE);
        Self { cpu, mmu }
    }

    pub fn step(&mut self) -> Result<u32, CpuFault> {
        self.cpu.step(&mut self.mmu, &mut NullDiagnostics)
    }

    /// Step once and return (PC delta, cycles).
    pub fn step_measured(&mut self) -> (u16, u32) {
        let pc = self.cpu.regs.pc;
        let cycles = self.step().expect("instruction should execute");
        (self.cpu.regs.pc.wrapping_sub(pc), cycles)
    }

    pub fn run(&mut self, steps: usize) {
        for _ in 0..steps {
            self.step().expect("instruction should execute");
        }
    }
}
