use std::sync::{
    Arc,
    atomic::{AtomicBool, Ordering},
};

use crate::{
    cartridge::Cartridge,
    cpu::{Cpu, CpuFault},
    diagnostics::Diagnostics,
    hardware::DmgRevision,
    mmu::Mmu,
};

/// Why [`GameBoy::run_for`] returned.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum RunExit {
    /// The cycle budget was spent.
    BudgetSpent,
    /// The pause handle was raised or diagnostics asked to pause.
    Paused,
    /// The CPU hit a fault and is suspended until resumed.
    Faulted(CpuFault),
}

pub struct GameBoy {
    pub cpu: Cpu,
    pub mmu: Mmu,
    pub dmg_revision: DmgRevision,
    pause: Arc<AtomicBool>,
}

impl GameBoy {
    pub fn new() -> Self {
        Self::new_with_revision(DmgRevision::default())
    }

    pub fn new_with_revision(dmg_revision: DmgRevision) -> Self {
        Self {
            cpu: Cpu::new_with_revision(dmg_revision),
            mmu: Mmu::new(),
            dmg_revision,
            pause: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn load_cart(&mut self, cart: Cartridge) {
        self.mmu.load_cart(cart);
    }

    /// Shared flag another thread can raise to stop [`GameBoy::run_for`] at
    /// the next instruction boundary. The flag is cleared once honoured.
    pub fn pause_handle(&self) -> Arc<AtomicBool> {
        Arc::clone(&self.pause)
    }

    /// Execute whole instructions until at least `cycles` machine cycles have
    /// run, the pause handle is raised, or the CPU faults. Every
    /// instruction's cycles are forwarded to the APU.
    pub fn run_for(&mut self, cycles: u64, diag: &mut dyn Diagnostics) -> (u64, RunExit) {
        let mut spent = 0u64;
        let mut latch = PauseLatch {
            inner: diag,
            hit: false,
        };
        while spent < cycles {
            if self.pause.swap(false, Ordering::AcqRel) || latch.hit {
                return (spent, RunExit::Paused);
            }
            match self.cpu.step(&mut self.mmu, &mut latch) {
                Ok(cost) => {
                    self.mmu.apu.step(cost);
                    spent += cost as u64;
                }
                Err(fault) => return (spent, RunExit::Faulted(fault)),
            }
        }
        (spent, RunExit::BudgetSpent)
    }

    /// Return to the post-boot state, keeping the loaded cartridge and the
    /// APU's host options.
    pub fn reset(&mut self) {
        let cart = self.mmu.cart.take();
        let mut apu = std::mem::take(&mut self.mmu.apu);
        apu.reset();
        // Back to the powered state the boot ROM leaves behind.
        apu.write_reg(crate::apu::NR52, 0x80);
        apu.write_reg(crate::apu::NR50, 0x77);
        apu.write_reg(crate::apu::NR51, 0xF3);
        self.cpu = Cpu::new_with_revision(self.dmg_revision);
        self.mmu = Mmu::new();
        self.mmu.apu = apu;
        if let Some(c) = cart {
            self.mmu.load_cart(c);
        }
        self.pause.store(false, Ordering::Release);
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::new()
    }
}

/// Forwards to the host's diagnostics and remembers pause requests so the
/// run loop can honour them at the next boundary.
struct PauseLatch<'a> {
    inner: &'a mut dyn Diagnostics,
    hit: bool,
}

impl Diagnostics for PauseLatch<'_> {
    fn report_message(&mut self, text: &str) {
        self.inner.report_message(text);
    }

    fn report_status(&mut self, text: &str) {
        self.inner.report_status(text);
    }

    fn request_pause(&mut self) {
        self.hit = true;
        self.inner.request_pause();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::diagnostics::NullDiagnostics;

    fn with_program(program: &[u8]) -> GameBoy {
        let mut gb = GameBoy::new();
        gb.mmu.load(0xC000, program);
        gb.cpu.set_pc(0xC000);
        gb
    }

    #[test]
    fn budget_is_spent_in_whole_instructions() {
        // JR -2: three cycles per iteration, forever.
        let mut gb = with_program(&[0x18, 0xFE]);
        let (spent, exit) = gb.run_for(10, &mut NullDiagnostics);
        assert_eq!(exit, RunExit::BudgetSpent);
        assert_eq!(spent, 12);
        assert_eq!(gb.cpu.cycles, 12);
    }

    #[test]
    fn pause_handle_stops_at_boundary() {
        let mut gb = with_program(&[0x18, 0xFE]);
        gb.pause_handle().store(true, Ordering::Release);
        let (spent, exit) = gb.run_for(1000, &mut NullDiagnostics);
        assert_eq!((spent, exit), (0, RunExit::Paused));
        // The flag was consumed.
        let (_, exit) = gb.run_for(3, &mut NullDiagnostics);
        assert_eq!(exit, RunExit::BudgetSpent);
    }

    #[test]
    fn fault_ends_run() {
        let mut gb = with_program(&[0x00, 0xDD]);
        let (spent, exit) = gb.run_for(1000, &mut NullDiagnostics);
        assert_eq!(spent, 1);
        assert!(matches!(
            exit,
            RunExit::Faulted(CpuFault::UnimplementedOpcode { pc: 0xC001, .. })
        ));
    }

    #[test]
    fn reset_keeps_cart_and_mutes() {
        let mut gb = with_program(&[0x00]);
        let mut rom = vec![0u8; 0x8000];
        rom[0x0100] = 0x00;
        gb.load_cart(Cartridge::from_bytes_unchecked(rom));
        gb.mmu.apu.set_channel_mute(2, true);
        gb.run_for(4, &mut NullDiagnostics);
        gb.reset();
        assert!(gb.mmu.cart.is_some());
        assert!(gb.mmu.apu.channel_muted(2));
        assert_eq!(gb.cpu.regs.pc, 0x0100);
        assert_eq!(gb.cpu.cycles, 0);
        assert_eq!(gb.mmu.apu.read_reg(crate::apu::NR51), 0xF3);
    }
}
