mod common;

use common::machine;
use dotmatrix_core::{
    Button,
    interrupts::{self, ImeLatch, Interrupt},
    mmu::{IE, IF, Mmu},
    registers::Registers,
};

fn enabled_latch() -> ImeLatch {
    let mut ime = ImeLatch::new();
    ime.enable_now();
    ime
}

#[test]
fn dispatch_pushes_pc_and_jumps_to_vector() {
    let mut mmu = Mmu::new();
    let mut regs = Registers::new();
    let mut ime = enabled_latch();
    regs.pc = 0x1234;
    mmu.write_byte(IE, 0x1F);
    mmu.write_byte(IF, 0x14);

    assert_eq!(interrupts::service(&mut regs, &mut ime, &mut mmu), 5);
    // Timer outranks Joypad
    assert_eq!(regs.pc, 0x0050);
    assert_eq!(mmu.read_byte(IF), 0x10);
    assert!(!ime.enabled());
    assert_eq!(regs.sp, 0xFFFC);
    assert_eq!(mmu.read_byte(0xFFFD), 0x12);
    assert_eq!(mmu.read_byte(0xFFFC), 0x34);
}

#[test]
fn nothing_happens_with_ime_clear() {
    let mut mmu = Mmu::new();
    let mut regs = Registers::new();
    let mut ime = ImeLatch::new();
    mmu.write_byte(IE, 0x1F);
    mmu.write_byte(IF, 0x1F);
    assert_eq!(interrupts::service(&mut regs, &mut ime, &mut mmu), 0);
    assert_eq!(regs.pc, 0x0100);
    assert_eq!(mmu.read_byte(IF), 0x1F);
}

#[test]
fn requested_but_masked_is_ignored() {
    let mut mmu = Mmu::new();
    let mut regs = Registers::new();
    let mut ime = enabled_latch();
    mmu.write_byte(IE, 0x00);
    mmu.request_interrupt(Interrupt::VBlank);
    assert_eq!(interrupts::service(&mut regs, &mut ime, &mut mmu), 0);
    assert!(ime.enabled());
}

#[test]
fn joypad_vector() {
    let mut mmu = Mmu::new();
    let mut regs = Registers::new();
    let mut ime = enabled_latch();
    mmu.write_byte(IF, 0x00);
    mmu.write_byte(IE, Interrupt::Joypad.bit());
    mmu.request_interrupt(Interrupt::Joypad);
    assert_eq!(interrupts::service(&mut regs, &mut ime, &mut mmu), 5);
    assert_eq!(regs.pc, 0x0060);
}

#[test]
fn ei_takes_effect_after_the_next_instruction() {
    let mut gb = machine(&[0xFB, 0x00, 0x00]); // EI; NOP; NOP
    gb.mmu.write_byte(IE, 0x01);
    gb.mmu.write_byte(IF, 0x01);

    assert_eq!(gb.step(), 1);
    assert_eq!(gb.cpu.regs.pc, 0x0101);
    assert!(!gb.cpu.ime.enabled());

    // the NOP runs, then the interrupt is taken
    assert_eq!(gb.step(), 1 + 5);
    assert_eq!(gb.cpu.regs.pc, 0x0040);
    assert_eq!(gb.mmu.read_u16(gb.cpu.regs.sp), 0x0102);
}

#[test]
fn ei_then_di_stays_disabled() {
    let mut gb = machine(&[0xFB, 0xF3, 0x00, 0x00]); // EI; DI; NOP; NOP
    gb.mmu.write_byte(IE, 0x01);
    gb.mmu.write_byte(IF, 0x01);
    for _ in 0..4 {
        gb.step();
    }
    assert!(!gb.cpu.ime.enabled());
    assert_eq!(gb.cpu.regs.pc, 0x0104);
}

#[test]
fn reti_enables_without_delay() {
    let mut gb = machine(&[0xD9]); // RETI
    gb.cpu.regs.sp = 0xFFFC;
    gb.mmu.poke(0xFFFC, 0x34);
    gb.mmu.poke(0xFFFD, 0x12);
    assert_eq!(gb.cpu.step(&mut gb.mmu), 4);
    assert_eq!(gb.cpu.regs.pc, 0x1234);
    assert!(gb.cpu.ime.enabled());
}

#[test]
fn halted_cpu_dispatches_when_woken() {
    let mut gb = machine(&[0xFB, 0x76, 0x00]); // EI; HALT; NOP
    gb.mmu.write_byte(IF, 0x00);
    gb.mmu.write_byte(IE, 0x04);
    gb.step();
    gb.step();
    assert!(gb.cpu.halted);
    assert!(gb.cpu.ime.enabled());

    gb.mmu.request_interrupt(Interrupt::Timer);
    assert_eq!(gb.step(), 1 + 5);
    assert!(!gb.cpu.halted);
    assert_eq!(gb.cpu.regs.pc, 0x0050);
    assert_eq!(gb.mmu.read_u16(gb.cpu.regs.sp), 0x0102);
}

#[test]
fn stopped_cpu_defers_dispatch_until_woken() {
    // EI; NOP; STOP 00; NOP
    let mut gb = machine(&[0xFB, 0x00, 0x10, 0x00, 0x00]);
    gb.mmu.write_byte(IF, 0x00);
    gb.mmu.write_byte(IE, Interrupt::VBlank.bit());
    for _ in 0..3 {
        gb.step();
    }
    assert!(gb.cpu.stopped);
    assert!(gb.cpu.ime.enabled());

    gb.mmu.request_interrupt(Interrupt::VBlank);
    gb.step();
    assert!(gb.cpu.stopped);
    assert_eq!(gb.cpu.regs.pc, 0x0104);
    assert!(gb.cpu.ime.enabled());
    assert!(gb.mmu.interrupt_requested(Interrupt::VBlank));

    gb.press(Button::Start);
    gb.step();
    assert!(!gb.cpu.stopped);
    assert_eq!(gb.cpu.regs.pc, 0x0040);
    assert!(!gb.cpu.ime.enabled());
}
