use log::trace;

use crate::{mmu::Mmu, registers::Registers};

// Cost of dispatching an interrupt, in machine cycles.
const SERVICE_M_CYCLES: u8 = 5;

/// Interrupt sources, in ascending bit order. Lower bits win when several
/// sources are pending (gbdev.io/pandocs/Interrupts.html).
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Interrupt {
    VBlank = 0,
    Stat = 1,
    Timer = 2,
    Serial = 3,
    Joypad = 4,
}

impl Interrupt {
    pub const ALL: [Interrupt; 5] = [
        Interrupt::VBlank,
        Interrupt::Stat,
        Interrupt::Timer,
        Interrupt::Serial,
        Interrupt::Joypad,
    ];

    /// Bit in IF/IE.
    #[inline]
    pub const fn bit(self) -> u8 {
        1 << self as u8
    }

    /// Fixed handler address.
    #[inline]
    pub const fn vector(self) -> u16 {
        0x0040 + 8 * self as u16
    }

    /// Highest-priority source among the set bits of `pending`.
    pub fn highest_priority(pending: u8) -> Option<Self> {
        Self::ALL.into_iter().find(|irq| pending & irq.bit() != 0)
    }
}

/// Interrupt master enable with the EI latency.
///
/// EI arms `pending`; each completed instruction advances it, and IME becomes
/// set at the end of the instruction following EI.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct ImeLatch {
    enabled: bool,
    pending: u8,
}

impl ImeLatch {
    pub fn new() -> Self {
        Self::default()
    }

    #[inline]
    pub fn enabled(&self) -> bool {
        self.enabled
    }

    /// True while an EI is waiting to take effect.
    #[inline]
    pub fn enable_pending(&self) -> bool {
        self.pending != 0
    }

    /// DI: drop IME and any EI still in flight.
    pub fn disable(&mut self) {
        self.enabled = false;
        self.pending = 0;
    }

    /// EI. A second EI while one is already armed does not restart the delay.
    pub fn schedule_enable(&mut self) {
        if !self.enabled && self.pending == 0 {
            self.pending = 1;
        }
    }

    /// RETI: IME is set with no delay.
    pub fn enable_now(&mut self) {
        self.enabled = true;
        self.pending = 0;
    }

    /// Called once after every executed instruction.
    pub fn instruction_boundary(&mut self) {
        match self.pending {
            1 => self.pending = 2,
            2 => {
                self.enabled = true;
                self.pending = 0;
            }
            _ => {}
        }
    }
}

/// Dispatch at most one pending interrupt. Returns the extra machine cycles
/// spent, or 0 when nothing was serviced.
pub fn service(regs: &mut Registers, ime: &mut ImeLatch, mmu: &mut Mmu) -> u8 {
    if !ime.enabled() {
        return 0;
    }
    let Some(irq) = Interrupt::highest_priority(mmu.pending_interrupts()) else {
        return 0;
    };

    ime.disable();
    mmu.push_u16(&mut regs.sp, regs.pc);
    mmu.clear_interrupt(irq);
    trace!(
        "servicing {irq:?} from PC={:04X}, jumping to {:04X}",
        regs.pc,
        irq.vector()
    );
    regs.pc = irq.vector();
    SERVICE_M_CYCLES
}
