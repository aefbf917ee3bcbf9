#![allow(dead_code)]

use dotmatrix_core::{Cartridge, GameBoy};

/// Where the post-boot CPU starts executing.
pub const ENTRY: u16 = 0x0100;

/// A 32 KiB ROM-only image with `program` at the entry point.
pub fn rom_with(program: &[u8]) -> Vec<u8> {
    let mut rom = vec![0u8; 0x8000];
    let start = ENTRY as usize;
    rom[start..start + program.len()].copy_from_slice(program);
    rom
}

/// A machine with `program` loaded at the entry point.
pub fn machine(program: &[u8]) -> GameBoy {
    let cart = Cartridge::load(rom_with(program)).expect("valid test image");
    let mut gb = GameBoy::new();
    gb.load_cart(cart);
    gb
}

/// A machine with `program` placed at `origin` and PC pointing at it.
pub fn machine_at(origin: u16, program: &[u8]) -> GameBoy {
    let mut gb = machine(&[]);
    for (i, &byte) in program.iter().enumerate() {
        gb.mmu.poke(origin.wrapping_add(i as u16), byte);
    }
    gb.cpu.regs.pc = origin;
    gb
}
