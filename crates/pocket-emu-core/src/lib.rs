//! DMG (original Game Boy) CPU and sound core.
//!
//! This crate contains the platform-agnostic emulator logic: the LR35902
//! instruction dispatcher and the four-channel APU, wired together over a
//! flat memory map. Frontends live in separate crates and drive the core via
//! the [`gameboy`] facade.

/// Audio Processing Unit (APU) emulation.
pub mod apu;

/// Lock-free audio ring buffer used by the APU.
pub mod audio_queue;

/// ROM images and header metadata.
pub mod cartridge;

/// LR35902 instruction dispatcher and opcode tables.
pub mod cpu;

/// Reporting seam between the dispatcher and its host.
pub mod diagnostics;

/// High-level facade that wires the CPU and MMU into a single machine.
pub mod gameboy;

/// Hardware revisions.
pub mod hardware;

/// Memory map and the bus trait the CPU talks to.
pub mod mmu;

/// Register file and flag-aware arithmetic.
pub mod registers;
