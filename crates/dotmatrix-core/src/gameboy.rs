use crate::{
    cartridge::Cartridge,
    cpu::Cpu,
    input::Button,
    mmu::Mmu,
    ppu::{FRAME_DOTS, SCREEN_HEIGHT, SCREEN_WIDTH},
};

/// PPU dots per CPU machine cycle.
pub const DOTS_PER_M_CYCLE: u32 = 4;

pub struct GameBoy {
    pub cpu: Cpu,
    pub mmu: Mmu,
    cart: Option<Cartridge>,
    /// Dots the last frame ran past its budget.
    dot_carry: u32,
}

impl GameBoy {
    pub fn new() -> Self {
        Self {
            cpu: Cpu::new(),
            mmu: Mmu::new(),
            cart: None,
            dot_carry: 0,
        }
    }

    /// Insert a cartridge and bring the machine to its post-boot state.
    pub fn load_cart(&mut self, cart: Cartridge) {
        self.cart = Some(cart);
        self.reset();
    }

    pub fn cart(&self) -> Option<&Cartridge> {
        self.cart.as_ref()
    }

    /// Reset to the post-boot state, keeping the inserted cartridge.
    pub fn reset(&mut self) {
        self.cpu = Cpu::new();
        self.mmu = Mmu::new();
        self.dot_carry = 0;
        if let Some(cart) = &self.cart {
            self.mmu.load_cart(cart);
        }
    }

    pub fn press(&mut self, button: Button) {
        self.mmu.input.press(button);
    }

    pub fn release(&mut self, button: Button) {
        self.mmu.input.release(button);
    }

    /// One host step: sample input, run one instruction, service interrupts
    /// and let the PPU catch up. Returns the machine cycles consumed.
    pub fn step(&mut self) -> u32 {
        self.mmu.sample_input();
        let mut cycles = self.cpu.step(&mut self.mmu) as u32;
        cycles += self.cpu.handle_interrupts(&mut self.mmu) as u32;
        self.mmu.step_ppu(cycles * DOTS_PER_M_CYCLE);
        cycles
    }

    /// Run until one frame's worth of dots has elapsed and return the frame
    /// buffer. Dots overshot by the last instruction count toward the next
    /// frame.
    pub fn run_frame(&mut self) -> &[u8; SCREEN_WIDTH * SCREEN_HEIGHT] {
        self.mmu.ppu.clear_frame_flag();
        let mut dots = self.dot_carry;
        while dots < FRAME_DOTS {
            dots += self.step() * DOTS_PER_M_CYCLE;
        }
        self.dot_carry = dots - FRAME_DOTS;
        self.mmu.ppu.framebuffer()
    }

    pub fn framebuffer(&self) -> &[u8; SCREEN_WIDTH * SCREEN_HEIGHT] {
        self.mmu.ppu.framebuffer()
    }

    /// Dots already charged to the frame currently in progress.
    pub fn dot_carry(&self) -> u32 {
        self.dot_carry
    }
}

impl Default for GameBoy {
    fn default() -> Self {
        Self::new()
    }
}
