use crate::{
    interrupts::Interrupt,
    mmu::{
        AddressSpace, BGP, IF, LCDC, LY, LYC, OAM_START, OBP0, OBP1, SCX, SCY, STAT, VRAM_START,
        WX, WY,
    },
};

// Screen resolution used by the Game Boy PPU
pub const SCREEN_WIDTH: usize = 160;
pub const SCREEN_HEIGHT: usize = 144;

// Timing in dots (gbdev.io/pandocs/Rendering.html)
const OAM_SCAN_DOTS: u16 = 80;
const PIXEL_TRANSFER_DOTS: u16 = 160;
const LINE_DOTS: u16 = 456;
const TRANSFER_END: u16 = OAM_SCAN_DOTS + PIXEL_TRANSFER_DOTS;

// Number of lines spent in VBlank
const VBLANK_LINES: u8 = 10;
const LAST_LINE: u8 = SCREEN_HEIGHT as u8 + VBLANK_LINES - 1;

/// Dots in one full frame.
pub const FRAME_DOTS: u32 = LINE_DOTS as u32 * (LAST_LINE as u32 + 1);

// Sprite limits
const MAX_SPRITES_PER_LINE: usize = 10;
const TOTAL_SPRITES: usize = 40;

// The object buffer has an 8-pixel margin on each side so objects partially
// off screen can be decoded without clipping.
const OBJ_MARGIN: usize = 8;
const OBJ_LINE_WIDTH: usize = SCREEN_WIDTH + 2 * OBJ_MARGIN;

// LCDC bits
const LCDC_BG_ENABLE: u8 = 0x01;
const LCDC_OBJ_ENABLE: u8 = 0x02;
const LCDC_OBJ_TALL: u8 = 0x04;
const LCDC_BG_MAP: u8 = 0x08;
const LCDC_TILE_DATA: u8 = 0x10;
const LCDC_WINDOW_ENABLE: u8 = 0x20;
const LCDC_WINDOW_MAP: u8 = 0x40;
const LCDC_ENABLE: u8 = 0x80;

// STAT bits
const STAT_MODE_MASK: u8 = 0x03;
const STAT_LYC_MATCH: u8 = 0x04;
const STAT_HBLANK_IRQ: u8 = 0x08;
const STAT_VBLANK_IRQ: u8 = 0x10;
const STAT_OAM_IRQ: u8 = 0x20;
const STAT_LYC_IRQ: u8 = 0x40;

// Object attribute bits
const ATTR_PALETTE: u8 = 0x10;
const ATTR_X_FLIP: u8 = 0x20;
const ATTR_Y_FLIP: u8 = 0x40;
const ATTR_BEHIND_BG: u8 = 0x80;

// VRAM layout
const BG_MAP_0_BASE: u16 = 0x9800;
const BG_MAP_1_BASE: u16 = 0x9C00;
const TILE_DATA_0_BASE: u16 = 0x8000;
const TILE_DATA_1_BASE: u16 = 0x8800;

// Window X position is offset by 7
const WINDOW_X_OFFSET: i16 = 7;

/// PPU mode as reported in STAT bits 0-1.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Mode {
    HBlank = 0,
    VBlank = 1,
    OamScan = 2,
    PixelTransfer = 3,
}

/// An object accepted by the OAM scan for the current line.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
pub struct LineObject {
    /// Raw OAM X (screen X + 8).
    pub x: u8,
    /// Screen Y of the object's top row.
    pub y: i16,
    pub tile: u8,
    pub flags: u8,
}

/// One decoded object pixel. `color` 0 is transparent.
#[derive(Copy, Clone, Debug, Default, PartialEq, Eq)]
struct ObjPixel {
    color: u8,
    flags: u8,
    /// Raw OAM X of the owning object, used for overlap priority.
    x: u8,
}

pub struct Ppu {
    mode: Mode,
    line: u8,
    dot: u16,

    /// Internal window line counter
    window_line: u8,
    /// First screen column covered by the window on this line.
    window_start: Option<usize>,

    bg_line: [u8; SCREEN_WIDTH],
    win_line: [u8; SCREEN_WIDTH],
    obj_line: [ObjPixel; OBJ_LINE_WIDTH],

    /// Objects accepted during this line's OAM scan
    line_sprites: [LineObject; MAX_SPRITES_PER_LINE],
    sprite_count: usize,

    framebuffer: [u8; SCREEN_WIDTH * SCREEN_HEIGHT],
    /// Indicates a completed frame is available in `framebuffer`
    frame_ready: bool,
    frame_counter: u64,
    stat_irq_line: bool,
}

impl Ppu {
    pub fn new() -> Self {
        Self {
            mode: Mode::OamScan,
            line: 0,
            dot: 0,
            window_line: 0,
            window_start: None,
            bg_line: [0; SCREEN_WIDTH],
            win_line: [0; SCREEN_WIDTH],
            obj_line: [ObjPixel::default(); OBJ_LINE_WIDTH],
            line_sprites: [LineObject::default(); MAX_SPRITES_PER_LINE],
            sprite_count: 0,
            framebuffer: [0; SCREEN_WIDTH * SCREEN_HEIGHT],
            frame_ready: false,
            frame_counter: 0,
            stat_irq_line: false,
        }
    }

    #[inline]
    pub fn mode(&self) -> Mode {
        self.mode
    }

    #[inline]
    pub fn line(&self) -> u8 {
        self.line
    }

    /// Dot position within the current line (0-455).
    #[inline]
    pub fn dot(&self) -> u16 {
        self.dot
    }

    /// Objects accepted for the current line, in OAM order.
    pub fn line_objects(&self) -> &[LineObject] {
        &self.line_sprites[..self.sprite_count]
    }

    /// Shade indices (0-3) of the last rendered frame, row-major.
    pub fn framebuffer(&self) -> &[u8; SCREEN_WIDTH * SCREEN_HEIGHT] {
        &self.framebuffer
    }

    /// Returns true if a full frame has been rendered and is ready to display.
    pub fn frame_ready(&self) -> bool {
        self.frame_ready
    }

    /// Clears the frame ready flag after a frame has been consumed.
    pub fn clear_frame_flag(&mut self) {
        self.frame_ready = false;
    }

    /// Returns the number of frames that have been completed since power on.
    pub fn frames(&self) -> u64 {
        self.frame_counter
    }

    fn set_mode(&mut self, mode: Mode, mem: &mut AddressSpace) {
        self.mode = mode;
        let stat = &mut mem[STAT as usize];
        *stat = (*stat & !STAT_MODE_MASK) | mode as u8;
    }

    fn set_line(&mut self, line: u8, mem: &mut AddressSpace) {
        self.line = line;
        mem[LY as usize] = line;
    }

    /// LCD switched on: start a fresh frame at line 0.
    pub fn restart(&mut self, mem: &mut AddressSpace) {
        self.dot = 0;
        self.window_line = 0;
        self.window_start = None;
        self.sprite_count = 0;
        self.obj_line.fill(ObjPixel::default());
        self.set_line(0, mem);
        self.set_mode(Mode::OamScan, mem);
    }

    /// LCD switched off: park in HBlank until it is switched back on.
    pub fn freeze(&mut self, mem: &mut AddressSpace) {
        self.set_mode(Mode::HBlank, mem);
        self.stat_irq_line = false;
    }

    /// Advance by `dots`, crossing mode boundaries as needed.
    pub fn step(&mut self, dots: u32, mem: &mut AddressSpace) {
        if mem[LCDC as usize] & LCDC_ENABLE == 0 {
            return;
        }
        for _ in 0..dots {
            self.tick(mem);
        }
    }

    fn tick(&mut self, mem: &mut AddressSpace) {
        match self.mode {
            Mode::OamScan => {
                if self.dot.is_multiple_of(4) {
                    self.fetch_column((self.dot / 4) as usize, mem);
                }
                // one OAM entry every two dots covers all 40 entries
                if self.dot.is_multiple_of(2) {
                    self.evaluate_sprite((self.dot / 2) as usize, mem);
                }
                self.dot += 1;
                if self.dot == OAM_SCAN_DOTS {
                    self.set_mode(Mode::PixelTransfer, mem);
                }
            }
            Mode::PixelTransfer => {
                self.emit_pixel((self.dot - OAM_SCAN_DOTS) as usize, mem);
                self.dot += 1;
                if self.dot == TRANSFER_END {
                    self.set_mode(Mode::HBlank, mem);
                }
            }
            Mode::HBlank => {
                self.dot += 1;
                if self.dot == LINE_DOTS {
                    self.end_line(mem);
                }
            }
            Mode::VBlank => {
                self.dot += 1;
                if self.dot == LINE_DOTS {
                    self.dot = 0;
                    if self.line == LAST_LINE {
                        self.set_line(0, mem);
                        self.window_line = 0;
                        self.set_mode(Mode::OamScan, mem);
                    } else {
                        self.set_line(self.line + 1, mem);
                    }
                }
            }
        }
        self.update_stat(mem);
    }

    fn end_line(&mut self, mem: &mut AddressSpace) {
        self.dot = 0;
        self.obj_line.fill(ObjPixel::default());
        self.sprite_count = 0;
        if self.window_start.take().is_some() {
            self.window_line = self.window_line.wrapping_add(1);
        }
        self.set_line(self.line + 1, mem);
        if self.line as usize == SCREEN_HEIGHT {
            self.set_mode(Mode::VBlank, mem);
            mem[IF as usize] |= Interrupt::VBlank.bit();
            self.frame_ready = true;
            self.frame_counter = self.frame_counter.wrapping_add(1);
        } else {
            self.set_mode(Mode::OamScan, mem);
        }
    }

    fn update_stat(&mut self, mem: &mut AddressSpace) {
        let stat = mem[STAT as usize];
        let lyc_match = self.line == mem[LYC as usize];
        mem[STAT as usize] = if lyc_match {
            stat | STAT_LYC_MATCH
        } else {
            stat & !STAT_LYC_MATCH
        };

        let mode_signal = match self.mode {
            Mode::HBlank => stat & STAT_HBLANK_IRQ != 0,
            Mode::VBlank => stat & STAT_VBLANK_IRQ != 0,
            Mode::OamScan => stat & STAT_OAM_IRQ != 0,
            Mode::PixelTransfer => false,
        };
        let current = (lyc_match && stat & STAT_LYC_IRQ != 0) || mode_signal;
        if current && !self.stat_irq_line {
            mem[IF as usize] |= Interrupt::Stat.bit();
        }
        self.stat_irq_line = current;
    }

    /// Address of a tile's row in VRAM under the current LCDC addressing mode.
    fn tile_row_addr(lcdc: u8, tile_index: u8, row: u16) -> u16 {
        let base = if lcdc & LCDC_TILE_DATA != 0 {
            TILE_DATA_0_BASE + tile_index as u16 * 16
        } else {
            TILE_DATA_1_BASE + (tile_index as i8 as i16 + 128) as u16 * 16
        };
        base + row * 2
    }

    #[inline(always)]
    fn pixel(lo: u8, hi: u8, bit: u8) -> u8 {
        (((hi >> bit) & 1) << 1) | ((lo >> bit) & 1)
    }

    /// Decode screen columns `8 * column .. 8 * column + 8` of the background
    /// and, if it covers them, the window.
    fn fetch_column(&mut self, column: usize, mem: &AddressSpace) {
        let lcdc = mem[LCDC as usize];
        if lcdc & LCDC_BG_ENABLE == 0 {
            return;
        }

        let scx = mem[SCX as usize];
        let bg_y = self.line.wrapping_add(mem[SCY as usize]);
        let bg_map = if lcdc & LCDC_BG_MAP != 0 {
            BG_MAP_1_BASE
        } else {
            BG_MAP_0_BASE
        };

        for x in column * 8..column * 8 + 8 {
            let bg_x = (x as u8).wrapping_add(scx);
            let map_addr = bg_map + (bg_y as u16 / 8) * 32 + bg_x as u16 / 8;
            let tile_index = mem[map_addr as usize];
            let addr = Self::tile_row_addr(lcdc, tile_index, bg_y as u16 % 8) as usize;
            self.bg_line[x] = Self::pixel(mem[addr], mem[addr + 1], 7 - bg_x % 8);
        }

        if column == 0 {
            self.window_start = self.window_origin(mem);
        }
        let Some(start) = self.window_start else {
            return;
        };
        let win_map = if lcdc & LCDC_WINDOW_MAP != 0 {
            BG_MAP_1_BASE
        } else {
            BG_MAP_0_BASE
        };
        let win_y = self.window_line as u16;
        let wx = mem[WX as usize] as i16 - WINDOW_X_OFFSET;
        for x in (column * 8..column * 8 + 8).filter(|&x| x >= start) {
            let win_x = (x as i16 - wx) as u16;
            let map_addr = win_map + (win_y / 8) * 32 + win_x / 8;
            let tile_index = mem[map_addr as usize];
            let addr = Self::tile_row_addr(lcdc, tile_index, win_y % 8) as usize;
            self.win_line[x] = Self::pixel(mem[addr], mem[addr + 1], 7 - (win_x % 8) as u8);
        }
    }

    /// First column the window covers on this line, if it is visible at all.
    fn window_origin(&self, mem: &AddressSpace) -> Option<usize> {
        let lcdc = mem[LCDC as usize];
        if lcdc & LCDC_WINDOW_ENABLE == 0 || self.line < mem[WY as usize] {
            return None;
        }
        let wx = mem[WX as usize] as i16 - WINDOW_X_OFFSET;
        if wx >= SCREEN_WIDTH as i16 {
            return None;
        }
        Some(wx.max(0) as usize)
    }

    fn evaluate_sprite(&mut self, index: usize, mem: &AddressSpace) {
        if index >= TOTAL_SPRITES || self.sprite_count >= MAX_SPRITES_PER_LINE {
            return;
        }
        let lcdc = mem[LCDC as usize];
        let height: i16 = if lcdc & LCDC_OBJ_TALL != 0 { 16 } else { 8 };
        let base = OAM_START as usize + index * 4;
        let y = mem[base] as i16 - 16;
        let line = self.line as i16;
        if line < y || line >= y + height {
            return;
        }

        let sprite = LineObject {
            y,
            x: mem[base + 1],
            tile: mem[base + 2],
            flags: mem[base + 3],
        };
        self.line_sprites[self.sprite_count] = sprite;
        self.sprite_count += 1;
        self.decode_sprite(sprite, height, mem);
    }

    /// Decode one object's row into the object buffer at its screen X.
    fn decode_sprite(&mut self, s: LineObject, height: i16, mem: &AddressSpace) {
        let mut row = self.line as i16 - s.y;
        if s.flags & ATTR_Y_FLIP != 0 {
            row = height - 1 - row;
        }
        let tile = if height == 16 { s.tile & 0xFE } else { s.tile };
        let addr = (VRAM_START + tile as u16 * 16 + row as u16 * 2) as usize;
        let (lo, hi) = (mem[addr], mem[addr + 1]);

        for px in 0..8u8 {
            let bit = if s.flags & ATTR_X_FLIP != 0 { px } else { 7 - px };
            let color = Self::pixel(lo, hi, bit);
            if color == 0 {
                continue;
            }
            // buffer index = screen X + margin = OAM X + px
            let Some(slot) = self.obj_line.get_mut(s.x as usize + px as usize) else {
                break;
            };
            // lower X wins; on a tie the earlier OAM entry was placed first
            if slot.color != 0 && slot.x <= s.x {
                continue;
            }
            *slot = ObjPixel {
                color,
                flags: s.flags,
                x: s.x,
            };
        }
    }

    #[inline(always)]
    fn shade(palette: u8, color: u8) -> u8 {
        (palette >> (color * 2)) & 0x03
    }

    fn emit_pixel(&mut self, x: usize, mem: &AddressSpace) {
        let lcdc = mem[LCDC as usize];
        let bg_color = if lcdc & LCDC_BG_ENABLE == 0 {
            0
        } else if self.window_start.is_some_and(|start| x >= start) {
            self.win_line[x]
        } else {
            self.bg_line[x]
        };

        let obj = self.obj_line[x + OBJ_MARGIN];
        let obj_visible = lcdc & LCDC_OBJ_ENABLE != 0
            && obj.color != 0
            && !(obj.flags & ATTR_BEHIND_BG != 0 && bg_color != 0);

        let shade = if obj_visible {
            let palette = if obj.flags & ATTR_PALETTE != 0 {
                mem[OBP1 as usize]
            } else {
                mem[OBP0 as usize]
            };
            Self::shade(palette, obj.color)
        } else {
            Self::shade(mem[BGP as usize], bg_color)
        };
        self.framebuffer[self.line as usize * SCREEN_WIDTH + x] = shade;
    }
}

impl Default for Ppu {
    fn default() -> Self {
        Self::new()
    }
}
