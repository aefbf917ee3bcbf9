mod common;

use common::{ENTRY, machine};
use dotmatrix_core::{
    Button, GameBoy,
    gameboy::DOTS_PER_M_CYCLE,
    interrupts::Interrupt,
    mmu::{IE, IF},
    ppu::FRAME_DOTS,
};

// LD (0xC000),SP; JR -5: alternating 5- and 3-cycle steps
const SPIN: [u8; 5] = [0x08, 0x00, 0xC0, 0x18, 0xFB];

fn total_dots(gb: &GameBoy) -> u64 {
    gb.cpu.cycles * DOTS_PER_M_CYCLE as u64
}

#[test]
fn run_frame_carries_overshoot() {
    let mut gb = machine(&SPIN);
    gb.run_frame();
    // 2194 loops use 70208 dots; the next 20-dot store overshoots by 4
    assert_eq!(gb.dot_carry(), 4);
    assert_eq!(total_dots(&gb), FRAME_DOTS as u64 + 4);

    for frame in 2..=5u64 {
        gb.run_frame();
        assert_eq!(
            total_dots(&gb),
            frame * FRAME_DOTS as u64 + gb.dot_carry() as u64
        );
    }
}

#[test]
fn one_frame_per_run() {
    let mut gb = machine(&SPIN);
    gb.run_frame();
    assert_eq!(gb.mmu.ppu.frames(), 1);
    assert!(gb.mmu.ppu.frame_ready());
    gb.run_frame();
    assert_eq!(gb.mmu.ppu.frames(), 2);
}

#[test]
fn halted_machine_still_renders() {
    let mut gb = machine(&[0x76]);
    gb.run_frame();
    assert!(gb.cpu.halted);
    assert_eq!(gb.mmu.ppu.frames(), 1);
    assert_eq!(gb.dot_carry(), 0);
}

#[test]
fn reset_keeps_the_cartridge() {
    let mut gb = machine(&SPIN);
    gb.run_frame();
    gb.cpu.regs.a = 0x55;
    gb.reset();
    assert_eq!(gb.cpu.regs.af(), 0x01B0);
    assert_eq!(gb.cpu.regs.pc, ENTRY);
    assert_eq!(gb.cpu.cycles, 0);
    assert_eq!(gb.dot_carry(), 0);
    assert_eq!(gb.mmu.read_byte(ENTRY), SPIN[0]);
    assert!(gb.cart().is_some());
}

#[test]
fn button_press_requests_joypad_interrupt() {
    let mut gb = machine(&SPIN);
    gb.mmu.write_byte(IF, 0x00);
    gb.step();
    assert!(!gb.mmu.interrupt_requested(Interrupt::Joypad));

    gb.press(Button::A);
    gb.step();
    assert!(gb.mmu.interrupt_requested(Interrupt::Joypad));

    gb.mmu.write_byte(IF, 0x00);
    gb.step();
    assert!(!gb.mmu.interrupt_requested(Interrupt::Joypad));
    gb.release(Button::A);
    gb.step();
    assert!(!gb.mmu.interrupt_requested(Interrupt::Joypad));
}

#[test]
fn vblank_handler_runs_once_per_frame() {
    // EI; HALT; JR -3 at the entry point, INC B; RETI at the VBlank vector
    let mut gb = machine(&[0xFB, 0x76, 0x18, 0xFD]);
    gb.mmu.poke(0x0040, 0x04);
    gb.mmu.poke(0x0041, 0xD9);
    gb.mmu.write_byte(IF, 0x00);
    gb.mmu.write_byte(IE, Interrupt::VBlank.bit());
    gb.cpu.regs.b = 0;

    for _ in 0..3 {
        gb.run_frame();
    }
    assert_eq!(gb.cpu.regs.b, 3);
}

#[test]
fn program_draws_through_the_bus() {
    // wait for VBlank, then write a solid tile and point the map at it
    #[rustfmt::skip]
    let program = [
        0xF0, 0x44,       // LDH A,(LY)
        0xFE, 0x90,       // CP 144
        0x20, 0xFA,       // JR NZ,-6
        0x21, 0x10, 0x80, // LD HL,0x8010
        0x3E, 0xFF,       // LD A,0xFF
        0x06, 0x10,       // LD B,16
        0x22,             // LD (HL+),A
        0x05,             // DEC B
        0x20, 0xFC,       // JR NZ,-4
        0x3E, 0x01,       // LD A,1
        0xEA, 0x00, 0x98, // LD (0x9800),A
        0x3E, 0xE4,       // LD A,0xE4
        0xE0, 0x47,       // LDH (BGP),A
        0x18, 0xFE,       // JR -2
    ];
    let mut gb = machine(&program);
    gb.run_frame();
    let frame = gb.run_frame();
    assert_eq!(frame[0], 3);
    assert_eq!(frame[7 * 160 + 7], 3);
    assert_eq!(frame[8], 0);
}
