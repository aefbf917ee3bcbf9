use dotmatrix_core::{
    Button,
    interrupts::Interrupt,
    mmu::{DMA, IF, LCDC, LY, Mmu, OAM_START, P1, STAT},
    ppu::Mode,
};

#[test]
fn vram_is_locked_during_pixel_transfer() {
    let mut mmu = Mmu::new();
    mmu.poke(0x8000, 0x42);

    mmu.step_ppu(80);
    assert_eq!(mmu.ppu.mode(), Mode::PixelTransfer);
    assert_eq!(mmu.read_byte(0x8000), 0xFF);
    mmu.write_byte(0x8000, 0x99);

    mmu.step_ppu(160);
    assert_eq!(mmu.ppu.mode(), Mode::HBlank);
    assert_eq!(mmu.read_byte(0x8000), 0x42, "write during mode 3 must be dropped");
    mmu.write_byte(0x8000, 0x99);
    assert_eq!(mmu.read_byte(0x8000), 0x99);
}

#[test]
fn oam_is_locked_during_scan_and_transfer() {
    let mut mmu = Mmu::new();
    mmu.poke(OAM_START, 0x10);
    assert_eq!(mmu.ppu.mode(), Mode::OamScan);
    assert_eq!(mmu.read_byte(OAM_START), 0xFF);
    mmu.write_byte(OAM_START, 0x20);

    mmu.step_ppu(80);
    assert_eq!(mmu.read_byte(OAM_START), 0xFF);

    mmu.step_ppu(160);
    assert_eq!(mmu.read_byte(OAM_START), 0x10);
    // the unusable area past OAM is never gated
    assert_eq!(mmu.read_byte(0xFEA0), 0x00);
}

#[test]
fn dma_copies_regardless_of_mode() {
    let mut mmu = Mmu::new();
    for i in 0..0xA0u16 {
        mmu.poke(0x8000 + i, i as u8 ^ 0x5A);
    }
    assert_eq!(mmu.ppu.mode(), Mode::OamScan);
    mmu.write_byte(DMA, 0x80);
    for i in 0..0xA0u16 {
        assert_eq!(mmu.peek(OAM_START + i), i as u8 ^ 0x5A, "OAM byte {i:02X}");
    }
    assert_eq!(mmu.read_byte(DMA), 0x80);
}

#[test]
fn rom_writes_are_dropped() {
    let mut mmu = Mmu::new();
    mmu.load_rom(&[0x3C; 0x8000]);
    mmu.write_byte(0x2000, 0x01);
    mmu.write_byte(0x7FFF, 0x01);
    assert_eq!(mmu.read_byte(0x2000), 0x3C);
    assert_eq!(mmu.read_byte(0x7FFF), 0x3C);
}

#[test]
fn oversized_rom_maps_first_32k() {
    let mut rom = vec![0x11u8; 0x10000];
    rom[0x8000..].fill(0x22);
    let mut mmu = Mmu::new();
    mmu.load_rom(&rom);
    assert_eq!(mmu.read_byte(0x7FFF), 0x11);
    assert_eq!(mmu.read_byte(0x8000), 0x00);
}

#[test]
fn wram_and_hram_round_trip() {
    let mut mmu = Mmu::new();
    mmu.write_byte(0xC000, 0xAA);
    mmu.write_byte(0xFF80, 0xBB);
    mmu.write_u16(0xD000, 0xBEEF);
    assert_eq!(mmu.read_byte(0xC000), 0xAA);
    assert_eq!(mmu.read_byte(0xFF80), 0xBB);
    assert_eq!(mmu.read_byte(0xD000), 0xEF);
    assert_eq!(mmu.read_u16(0xD000), 0xBEEF);
}

#[test]
fn stack_push_order() {
    let mut mmu = Mmu::new();
    let mut sp = 0xFFFE;
    mmu.push_u16(&mut sp, 0x1234);
    assert_eq!(sp, 0xFFFC);
    assert_eq!(mmu.read_byte(0xFFFD), 0x12);
    assert_eq!(mmu.read_byte(0xFFFC), 0x34);
    assert_eq!(mmu.pop_u16(&mut sp), 0x1234);
    assert_eq!(sp, 0xFFFE);
}

#[test]
fn lcdc_off_freezes_and_on_restarts() {
    let mut mmu = Mmu::new();
    mmu.step_ppu(456 * 3 + 100);
    assert_eq!(mmu.read_byte(LY), 3);

    mmu.write_byte(LCDC, 0x11);
    assert!(!mmu.lcd_enabled());
    assert_eq!(mmu.ppu.mode(), Mode::HBlank);
    assert_eq!(mmu.read_byte(STAT) & 0x03, 0);
    mmu.step_ppu(10_000);
    assert_eq!(mmu.read_byte(LY), 3, "PPU must not advance with the LCD off");

    mmu.write_byte(LCDC, 0x91);
    assert!(mmu.lcd_enabled());
    assert_eq!(mmu.read_byte(LY), 0);
    assert_eq!(mmu.ppu.mode(), Mode::OamScan);
    assert_eq!(mmu.ppu.dot(), 0);
}

#[test]
fn rewriting_lcdc_while_on_does_not_restart() {
    let mut mmu = Mmu::new();
    mmu.step_ppu(456 * 2);
    mmu.write_byte(LCDC, 0x93);
    assert_eq!(mmu.read_byte(LY), 2);
    assert_eq!(mmu.read_byte(LCDC), 0x93);
}

#[test]
fn ly_is_read_only_and_stat_keeps_mode_bits() {
    let mut mmu = Mmu::new();
    mmu.write_byte(LY, 0x40);
    assert_eq!(mmu.read_byte(LY), 0);

    mmu.write_byte(STAT, 0x43);
    assert_eq!(mmu.read_byte(STAT), 0xC2);
}

#[test]
fn joypad_select_and_edge_interrupt() {
    let mut mmu = Mmu::new();
    mmu.write_byte(IF, 0x00);
    mmu.write_byte(P1, 0x20); // directions
    mmu.input.press(Button::Right);
    mmu.input.press(Button::A);
    mmu.sample_input();
    assert_eq!(mmu.read_byte(P1), 0xEE);
    assert!(mmu.interrupt_requested(Interrupt::Joypad));

    // the button nibble is not writable
    mmu.write_byte(IF, 0x00);
    mmu.write_byte(P1, 0x1F); // actions
    assert_eq!(mmu.read_byte(P1) & 0x0F, 0x0E);
    mmu.sample_input();
    assert_eq!(mmu.read_byte(P1), 0xDE);
    // A was already low on the previous sample, so no new edge
    assert!(!mmu.interrupt_requested(Interrupt::Joypad));
}
