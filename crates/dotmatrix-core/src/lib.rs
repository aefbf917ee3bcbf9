//! Dot-accurate Game Boy (DMG) emulation core.
//!
//! This crate contains the platform-agnostic emulator logic (CPU/MMU/PPU).
//! Frontends drive the core via the [`gameboy`] facade.

/// Cartridge image loading and header parsing.
pub mod cartridge;

/// LR35902 CPU core.
pub mod cpu;

/// High-level facade that wires the CPU and MMU into a single machine.
pub mod gameboy;

/// Joypad button state behind the P1 register.
pub mod input;

/// Interrupt sources, the IME latch and interrupt dispatch.
pub mod interrupts;

/// Memory map and hardware plumbing.
pub mod mmu;

mod opcodes;

/// Pixel Processing Unit (PPU) emulation.
pub mod ppu;

/// CPU register file and flag bits.
pub mod registers;

pub use cartridge::{Cartridge, CartridgeError};
pub use gameboy::GameBoy;
pub use input::Button;
