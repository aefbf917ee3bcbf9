use log::{debug, warn};

use crate::{
    cartridge::Cartridge,
    input::Input,
    interrupts::Interrupt,
    ppu::{Mode, Ppu},
};

pub const ADDRESS_SPACE_SIZE: usize = 0x10000;

/// The flat DMG address space.
pub type AddressSpace = [u8; ADDRESS_SPACE_SIZE];

// Memory map (gbdev.io/pandocs/Memory_Map.html)
pub const ROM_END: u16 = 0x7FFF;
pub const VRAM_START: u16 = 0x8000;
pub const VRAM_END: u16 = 0x9FFF;
pub const OAM_START: u16 = 0xFE00;
pub const OAM_END: u16 = 0xFE9F;
pub const OAM_SIZE: usize = 0xA0;

// I/O registers (gbdev.io/pandocs/Hardware_Reg_List.html)
pub const P1: u16 = 0xFF00;
pub const SB: u16 = 0xFF01;
pub const SC: u16 = 0xFF02;
pub const DIV: u16 = 0xFF04;
pub const TIMA: u16 = 0xFF05;
pub const TMA: u16 = 0xFF06;
pub const TAC: u16 = 0xFF07;
pub const IF: u16 = 0xFF0F;
pub const LCDC: u16 = 0xFF40;
pub const STAT: u16 = 0xFF41;
pub const SCY: u16 = 0xFF42;
pub const SCX: u16 = 0xFF43;
pub const LY: u16 = 0xFF44;
pub const LYC: u16 = 0xFF45;
pub const DMA: u16 = 0xFF46;
pub const BGP: u16 = 0xFF47;
pub const OBP0: u16 = 0xFF48;
pub const OBP1: u16 = 0xFF49;
pub const WY: u16 = 0xFF4A;
pub const WX: u16 = 0xFF4B;
pub const IE: u16 = 0xFFFF;

const LCDC_ENABLE: u8 = 0x80;
// STAT bits 0-2 (mode and LYC match) are owned by the PPU.
const STAT_READ_ONLY: u8 = 0x07;
const P1_SELECT: u8 = 0x30;

// Post-boot I/O state from gbdev.io/pandocs/Power_Up_State.html
const BOOT_IO: &[(u16, u8)] = &[
    (P1, 0xCF),
    (SB, 0x00),
    (SC, 0x7E),
    (DIV, 0xAB),
    (TIMA, 0x00),
    (TMA, 0x00),
    (TAC, 0xF8),
    (IF, 0xE1),
    (0xFF10, 0x80), // NR10
    (0xFF11, 0xBF), // NR11
    (0xFF12, 0xF3), // NR12
    (0xFF13, 0xFF), // NR13
    (0xFF14, 0xBF), // NR14
    (0xFF16, 0x3F), // NR21
    (0xFF17, 0x00), // NR22
    (0xFF18, 0xFF), // NR23
    (0xFF19, 0xBF), // NR24
    (0xFF1A, 0x7F), // NR30
    (0xFF1B, 0xFF), // NR31
    (0xFF1C, 0x9F), // NR32
    (0xFF1D, 0xFF), // NR33
    (0xFF1E, 0xBF), // NR34
    (0xFF20, 0xFF), // NR41
    (0xFF21, 0x00), // NR42
    (0xFF22, 0x00), // NR43
    (0xFF23, 0xBF), // NR44
    (0xFF24, 0x77), // NR50
    (0xFF25, 0xF3), // NR51
    (0xFF26, 0xF1), // NR52
    (LCDC, 0x91),
    (STAT, 0x82),
    (SCY, 0x00),
    (SCX, 0x00),
    (LY, 0x00),
    (LYC, 0x00),
    (DMA, 0xFF),
    (BGP, 0xFC),
    (WY, 0x00),
    (WX, 0x00),
    (IE, 0x00),
];

/// Memory bus: the address space plus the PPU-mode access gating and the
/// registers whose writes have side effects.
pub struct Mmu {
    mem: AddressSpace,
    pub ppu: Ppu,
    pub input: Input,
}

impl Mmu {
    pub fn new() -> Self {
        let mut mem = [0; ADDRESS_SPACE_SIZE];
        for &(addr, val) in BOOT_IO {
            mem[addr as usize] = val;
        }
        Self {
            mem,
            ppu: Ppu::new(),
            input: Input::new(),
        }
    }

    /// Map a cartridge image at 0x0000. Only the fixed 32 KiB window exists
    /// without a bank controller.
    pub fn load_cart(&mut self, cart: &Cartridge) {
        self.load_rom(cart.rom());
    }

    pub fn load_rom(&mut self, rom: &[u8]) {
        let len = rom.len().min(ROM_END as usize + 1);
        if rom.len() > len {
            warn!(
                "ROM image is {} bytes; only the first {len} are mapped",
                rom.len()
            );
        }
        self.mem[..len].copy_from_slice(&rom[..len]);
    }

    #[inline]
    fn blocked(&self, addr: u16) -> bool {
        match addr {
            VRAM_START..=VRAM_END => self.ppu.mode() == Mode::PixelTransfer,
            OAM_START..=OAM_END => {
                matches!(self.ppu.mode(), Mode::OamScan | Mode::PixelTransfer)
            }
            _ => false,
        }
    }

    /// CPU-visible read. VRAM and OAM read as 0xFF while the PPU owns them.
    pub fn read_byte(&self, addr: u16) -> u8 {
        if self.blocked(addr) {
            return 0xFF;
        }
        self.mem[addr as usize]
    }

    /// CPU-visible write.
    pub fn write_byte(&mut self, addr: u16, val: u8) {
        // OAM DMA ignores the PPU mode, so it is handled before gating.
        if addr == DMA {
            self.mem[addr as usize] = val;
            self.oam_dma(val);
            return;
        }
        if addr <= ROM_END || self.blocked(addr) {
            return;
        }

        match addr {
            LCDC => {
                let was_on = self.lcd_enabled();
                let now_on = val & LCDC_ENABLE != 0;
                self.mem[LCDC as usize] = val;
                if now_on && !was_on {
                    debug!("LCD on");
                    self.ppu.restart(&mut self.mem);
                } else if !now_on {
                    if was_on {
                        debug!("LCD off at LY={}", self.ppu.line());
                    }
                    self.ppu.freeze(&mut self.mem);
                }
            }
            STAT => {
                let old = self.mem[STAT as usize];
                self.mem[STAT as usize] = 0x80 | (val & 0x78) | (old & STAT_READ_ONLY);
            }
            LY => {}
            P1 => {
                let old = self.mem[P1 as usize];
                self.mem[P1 as usize] = 0xC0 | (val & P1_SELECT) | (old & 0x0F);
            }
            _ => self.mem[addr as usize] = val,
        }
    }

    pub fn read_u16(&self, addr: u16) -> u16 {
        let lo = self.read_byte(addr);
        let hi = self.read_byte(addr.wrapping_add(1));
        u16::from_le_bytes([lo, hi])
    }

    pub fn write_u16(&mut self, addr: u16, val: u16) {
        let [lo, hi] = val.to_le_bytes();
        self.write_byte(addr, lo);
        self.write_byte(addr.wrapping_add(1), hi);
    }

    /// Push onto the stack at `sp`, high byte at the higher address.
    pub fn push_u16(&mut self, sp: &mut u16, val: u16) {
        let [lo, hi] = val.to_le_bytes();
        *sp = sp.wrapping_sub(1);
        self.write_byte(*sp, hi);
        *sp = sp.wrapping_sub(1);
        self.write_byte(*sp, lo);
    }

    pub fn pop_u16(&mut self, sp: &mut u16) -> u16 {
        let lo = self.read_byte(*sp);
        *sp = sp.wrapping_add(1);
        let hi = self.read_byte(*sp);
        *sp = sp.wrapping_add(1);
        u16::from_le_bytes([lo, hi])
    }

    /// Read bypassing the PPU gating, as the PPU and DMA engine do.
    #[inline]
    pub fn peek(&self, addr: u16) -> u8 {
        self.mem[addr as usize]
    }

    /// Write bypassing gating and side effects. Used by test setups.
    #[inline]
    pub fn poke(&mut self, addr: u16, val: u8) {
        self.mem[addr as usize] = val;
    }

    fn oam_dma(&mut self, page: u8) {
        let src = (page as usize) << 8;
        debug!("OAM DMA from {src:04X}");
        let start = OAM_START as usize;
        self.mem.copy_within(src..src + OAM_SIZE, start);
    }

    pub fn request_interrupt(&mut self, irq: Interrupt) {
        self.mem[IF as usize] |= irq.bit();
    }

    pub fn clear_interrupt(&mut self, irq: Interrupt) {
        self.mem[IF as usize] &= !irq.bit();
    }

    /// Interrupts both requested and enabled.
    #[inline]
    pub fn pending_interrupts(&self) -> u8 {
        self.mem[IF as usize] & self.mem[IE as usize] & 0x1F
    }

    #[inline]
    pub fn interrupt_requested(&self, irq: Interrupt) -> bool {
        self.mem[IF as usize] & irq.bit() != 0
    }

    /// Refresh the P1 button nibble from the host input. A visible bit going
    /// from released (1) to pressed (0) requests the joypad interrupt.
    pub fn sample_input(&mut self) {
        let p1 = self.mem[P1 as usize];
        let old = p1 & 0x0F;
        let new = self.input.matrix(p1);
        if old & !new != 0 {
            self.request_interrupt(Interrupt::Joypad);
        }
        self.mem[P1 as usize] = 0xC0 | (p1 & P1_SELECT) | new;
    }

    pub fn lcd_enabled(&self) -> bool {
        self.mem[LCDC as usize] & LCDC_ENABLE != 0
    }

    /// Advance the PPU by `dots`.
    pub fn step_ppu(&mut self, dots: u32) {
        self.ppu.step(dots, &mut self.mem);
    }
}

impl Default for Mmu {
    fn default() -> Self {
        Self::new()
    }
}
