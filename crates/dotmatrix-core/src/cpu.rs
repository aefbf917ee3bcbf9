use log::{debug, trace};

use crate::{
    interrupts::{self, ImeLatch, Interrupt},
    mmu::{Mmu, P1},
    opcodes::{self, CB_PREFIX},
    registers::{FLAG_C, FLAG_H, FLAG_N, FLAG_Z, Registers},
};

/// One of the eight 8-bit operand locations encoded in three opcode bits.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Operand {
    B,
    C,
    D,
    E,
    H,
    L,
    IndHl,
    A,
}

impl Operand {
    #[inline]
    pub(crate) const fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => Operand::B,
            1 => Operand::C,
            2 => Operand::D,
            3 => Operand::E,
            4 => Operand::H,
            5 => Operand::L,
            6 => Operand::IndHl,
            _ => Operand::A,
        }
    }

    #[inline]
    pub(crate) fn is_memory(self) -> bool {
        self == Operand::IndHl
    }
}

/// Rotate and shift operations shared by the accumulator forms and the CB
/// table, in CB encoding order.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Shift {
    Rlc,
    Rrc,
    Rl,
    Rr,
    Sla,
    Sra,
    Swap,
    Srl,
}

impl Shift {
    pub(crate) const fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => Shift::Rlc,
            1 => Shift::Rrc,
            2 => Shift::Rl,
            3 => Shift::Rr,
            4 => Shift::Sla,
            5 => Shift::Sra,
            6 => Shift::Swap,
            _ => Shift::Srl,
        }
    }
}

/// Eight-way ALU selector from opcode bits 3-5 of the 0x80-0xBF block and the
/// immediate forms.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum AluOp {
    Add,
    Adc,
    Sub,
    Sbc,
    And,
    Xor,
    Or,
    Cp,
}

impl AluOp {
    pub(crate) const fn from_bits(bits: u8) -> Self {
        match bits & 0x07 {
            0 => AluOp::Add,
            1 => AluOp::Adc,
            2 => AluOp::Sub,
            3 => AluOp::Sbc,
            4 => AluOp::And,
            5 => AluOp::Xor,
            6 => AluOp::Or,
            _ => AluOp::Cp,
        }
    }
}

/// Branch condition from opcode bits 3-4.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub(crate) enum Cond {
    Nz,
    Z,
    Nc,
    C,
}

impl Cond {
    pub(crate) const fn from_bits(bits: u8) -> Self {
        match bits & 0x03 {
            0 => Cond::Nz,
            1 => Cond::Z,
            2 => Cond::Nc,
            _ => Cond::C,
        }
    }
}

pub struct Cpu {
    pub regs: Registers,
    pub ime: ImeLatch,
    pub halted: bool,
    pub stopped: bool,
    /// P1 input lines as last seen while stopped.
    stop_lines: u8,
    /// Machine cycles consumed since power on.
    pub cycles: u64,
}

impl Cpu {
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            ime: ImeLatch::new(),
            halted: false,
            stopped: false,
            stop_lines: 0x0F,
            cycles: 0,
        }
    }

    pub fn debug_state(&self) -> String {
        format!(
            "{} IME:{} HALT:{}",
            self.regs.debug_state(),
            self.ime.enabled() as u8,
            self.halted as u8
        )
    }

    /// Run one instruction, or one idle cycle while halted or stopped.
    /// Returns the machine cycles consumed.
    pub fn step(&mut self, mmu: &mut Mmu) -> u8 {
        if self.stopped {
            // Wake on a new high-to-low edge, not a stale Joypad IF bit.
            let lines = mmu.read_byte(P1) & 0x0F;
            if self.stop_lines & !lines != 0 && mmu.interrupt_requested(Interrupt::Joypad) {
                debug!("leaving STOP at PC={:04X}", self.regs.pc);
                self.stopped = false;
            }
            self.stop_lines = lines;
            return self.idle();
        }
        if self.halted {
            // IME does not matter for waking, only for dispatch.
            if mmu.pending_interrupts() != 0 {
                self.halted = false;
            }
            return self.idle();
        }

        let opcode = self.fetch_opcode(mmu);
        self.execute(mmu, opcode)
    }

    pub(crate) fn enter_stop(&mut self, mmu: &Mmu) {
        self.stop_lines = mmu.read_byte(P1) & 0x0F;
        self.stopped = true;
    }

    fn idle(&mut self) -> u8 {
        self.cycles += 1;
        1
    }

    /// Opcode at PC: one byte, or `0xCB00 | byte` for the prefixed table.
    pub fn fetch_opcode(&self, mmu: &Mmu) -> u16 {
        let pc = self.regs.pc;
        match mmu.read_byte(pc) {
            CB_PREFIX => {
                u16::from_be_bytes([CB_PREFIX, mmu.read_byte(pc.wrapping_add(1))])
            }
            op => op as u16,
        }
    }

    /// Execute `opcode` with PC pointing at its first byte. Returns the
    /// official cost in machine cycles.
    pub fn execute(&mut self, mmu: &mut Mmu, opcode: u16) -> u8 {
        let [prefix, op] = opcode.to_be_bytes();
        let cycles = match prefix {
            0x00 => {
                self.regs.pc = self.regs.pc.wrapping_add(1);
                opcodes::BASE[op as usize](self, mmu, op)
            }
            CB_PREFIX => {
                self.regs.pc = self.regs.pc.wrapping_add(2);
                opcodes::CB[op as usize](self, mmu, op)
            }
            _ => {
                trace!("no such opcode {opcode:04X} at PC={:04X}", self.regs.pc);
                self.regs.pc = self.regs.pc.wrapping_add(1);
                1
            }
        };
        self.ime.instruction_boundary();
        self.cycles += cycles as u64;
        cycles
    }

    /// Dispatch a pending interrupt if IME allows it. Returns the extra cycles.
    /// Nothing is dispatched while stopped.
    pub fn handle_interrupts(&mut self, mmu: &mut Mmu) -> u8 {
        if self.stopped {
            return 0;
        }
        let cycles = interrupts::service(&mut self.regs, &mut self.ime, mmu);
        if cycles != 0 {
            self.halted = false;
            self.cycles += cycles as u64;
        }
        cycles
    }

    #[inline]
    pub(crate) fn imm8(&mut self, mmu: &Mmu) -> u8 {
        let val = mmu.read_byte(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(1);
        val
    }

    #[inline]
    pub(crate) fn imm16(&mut self, mmu: &Mmu) -> u16 {
        let val = mmu.read_u16(self.regs.pc);
        self.regs.pc = self.regs.pc.wrapping_add(2);
        val
    }

    pub(crate) fn read_operand(&self, mmu: &Mmu, op: Operand) -> u8 {
        match op {
            Operand::B => self.regs.b,
            Operand::C => self.regs.c,
            Operand::D => self.regs.d,
            Operand::E => self.regs.e,
            Operand::H => self.regs.h,
            Operand::L => self.regs.l,
            Operand::IndHl => mmu.read_byte(self.regs.hl()),
            Operand::A => self.regs.a,
        }
    }

    pub(crate) fn write_operand(&mut self, mmu: &mut Mmu, op: Operand, val: u8) {
        match op {
            Operand::B => self.regs.b = val,
            Operand::C => self.regs.c = val,
            Operand::D => self.regs.d = val,
            Operand::E => self.regs.e = val,
            Operand::H => self.regs.h = val,
            Operand::L => self.regs.l = val,
            Operand::IndHl => mmu.write_byte(self.regs.hl(), val),
            Operand::A => self.regs.a = val,
        }
    }

    pub(crate) fn push(&mut self, mmu: &mut Mmu, val: u16) {
        mmu.push_u16(&mut self.regs.sp, val);
    }

    pub(crate) fn pop(&mut self, mmu: &mut Mmu) -> u16 {
        mmu.pop_u16(&mut self.regs.sp)
    }

    pub(crate) fn condition(&self, cond: Cond) -> bool {
        match cond {
            Cond::Nz => !self.regs.flag(FLAG_Z),
            Cond::Z => self.regs.flag(FLAG_Z),
            Cond::Nc => !self.regs.flag(FLAG_C),
            Cond::C => self.regs.flag(FLAG_C),
        }
    }

    /// Apply an ALU operation to A.
    pub(crate) fn alu(&mut self, op: AluOp, val: u8) {
        let a = self.regs.a;
        let carry = self.regs.flag(FLAG_C) as u8;
        match op {
            AluOp::Add | AluOp::Adc => {
                let cin = if op == AluOp::Adc { carry } else { 0 };
                let sum = a as u16 + val as u16 + cin as u16;
                let res = sum as u8;
                let h = (a & 0x0F) + (val & 0x0F) + cin > 0x0F;
                self.regs.set_flags(res == 0, false, h, sum > 0xFF);
                self.regs.a = res;
            }
            AluOp::Sub | AluOp::Sbc | AluOp::Cp => {
                let cin = if op == AluOp::Sbc { carry } else { 0 };
                let res = a.wrapping_sub(val).wrapping_sub(cin);
                let h = (a & 0x0F) < (val & 0x0F) + cin;
                let c = (a as u16) < val as u16 + cin as u16;
                self.regs.set_flags(res == 0, true, h, c);
                if op != AluOp::Cp {
                    self.regs.a = res;
                }
            }
            AluOp::And => {
                self.regs.a = a & val;
                self.regs.set_flags(self.regs.a == 0, false, true, false);
            }
            AluOp::Xor => {
                self.regs.a = a ^ val;
                self.regs.set_flags(self.regs.a == 0, false, false, false);
            }
            AluOp::Or => {
                self.regs.a = a | val;
                self.regs.set_flags(self.regs.a == 0, false, false, false);
            }
        }
    }

    /// INC r: C is left alone.
    pub(crate) fn inc8(&mut self, val: u8) -> u8 {
        let res = val.wrapping_add(1);
        let c = self.regs.flag(FLAG_C);
        self.regs.set_flags(res == 0, false, val & 0x0F == 0x0F, c);
        res
    }

    /// DEC r: C is left alone.
    pub(crate) fn dec8(&mut self, val: u8) -> u8 {
        let res = val.wrapping_sub(1);
        let c = self.regs.flag(FLAG_C);
        self.regs.set_flags(res == 0, true, val & 0x0F == 0, c);
        res
    }

    /// ADD HL,rr: Z is left alone, H and C come from bits 11 and 15.
    pub(crate) fn add_hl(&mut self, val: u16) {
        let hl = self.regs.hl();
        let (res, carry) = hl.overflowing_add(val);
        let h = (hl & 0x0FFF) + (val & 0x0FFF) > 0x0FFF;
        let z = self.regs.flag(FLAG_Z);
        self.regs.set_flags(z, false, h, carry);
        self.regs.set_hl(res);
    }

    /// SP plus a signed offset, as used by ADD SP,e8 and LD HL,SP+e8. H and C
    /// come from the unsigned addition of the low bytes.
    pub(crate) fn sp_offset(&mut self, offset: u8) -> u16 {
        let sp = self.regs.sp;
        let low = sp & 0x00FF;
        let h = (low & 0x0F) + (offset as u16 & 0x0F) > 0x0F;
        let c = low + offset as u16 > 0xFF;
        self.regs.set_flags(false, false, h, c);
        sp.wrapping_add(offset as i8 as u16)
    }

    /// Rotate or shift `val`, returning the result and the bit shifted out.
    pub(crate) fn shift(&self, kind: Shift, val: u8) -> (u8, bool) {
        let carry_in = self.regs.flag(FLAG_C) as u8;
        match kind {
            Shift::Rlc => (val.rotate_left(1), val & 0x80 != 0),
            Shift::Rrc => (val.rotate_right(1), val & 0x01 != 0),
            Shift::Rl => ((val << 1) | carry_in, val & 0x80 != 0),
            Shift::Rr => ((val >> 1) | (carry_in << 7), val & 0x01 != 0),
            Shift::Sla => (val << 1, val & 0x80 != 0),
            Shift::Sra => ((val >> 1) | (val & 0x80), val & 0x01 != 0),
            Shift::Swap => (val.rotate_left(4), false),
            Shift::Srl => (val >> 1, val & 0x01 != 0),
        }
    }

    /// Decimal-adjust A after a BCD addition or subtraction.
    pub(crate) fn daa(&mut self) {
        let subtract = self.regs.flag(FLAG_N);
        let half = self.regs.flag(FLAG_H);
        let mut carry = self.regs.flag(FLAG_C);
        let mut correction = 0u8;
        if half || (!subtract && self.regs.a & 0x0F > 0x09) {
            correction |= 0x06;
        }
        if carry || (!subtract && self.regs.a > 0x99) {
            correction |= 0x60;
            carry = true;
        }
        self.regs.a = if subtract {
            self.regs.a.wrapping_sub(correction)
        } else {
            self.regs.a.wrapping_add(correction)
        };
        self.regs.set_flags(self.regs.a == 0, subtract, false, carry);
    }

    pub(crate) fn set_carry_flags(&mut self, carry: bool) {
        let z = self.regs.flag(FLAG_Z);
        self.regs.set_flags(z, false, false, carry);
    }

    pub(crate) fn complement_a(&mut self) {
        self.regs.a = !self.regs.a;
        self.regs.set_flag(FLAG_N | FLAG_H);
    }
}

impl Default for Cpu {
    fn default() -> Self {
        Self::new()
    }
}
