//! Opcode handler tables.
//!
//! Both tables are built at compile time from a decoder that maps every
//! opcode value to a handler. Handlers run with PC already past the opcode
//! bytes, fetch their own immediates and return the official cost in machine
//! cycles.

use log::{debug, trace};

use crate::{
    cpu::{AluOp, Cond, Cpu, Operand, Shift},
    mmu::Mmu,
    registers::FLAG_C,
};

pub(crate) const CB_PREFIX: u8 = 0xCB;

pub(crate) type Handler = fn(&mut Cpu, &mut Mmu, u8) -> u8;

pub(crate) static BASE: [Handler; 256] = {
    let mut table: [Handler; 256] = [illegal as Handler; 256];
    let mut op = 0;
    while op < 256 {
        table[op] = decode_base(op as u8);
        op += 1;
    }
    table
};

pub(crate) static CB: [Handler; 256] = {
    let mut table: [Handler; 256] = [bit as Handler; 256];
    let mut op = 0;
    while op < 256 {
        table[op] = decode_cb(op as u8);
        op += 1;
    }
    table
};

const fn decode_base(op: u8) -> Handler {
    match op {
        0x00 => nop,
        0x01 | 0x11 | 0x21 | 0x31 => ld_rr_d16,
        0x02 | 0x12 | 0x22 | 0x32 => ld_ind_a,
        0x0A | 0x1A | 0x2A | 0x3A => ld_a_ind,
        0x03 | 0x13 | 0x23 | 0x33 => inc_rr,
        0x0B | 0x1B | 0x2B | 0x3B => dec_rr,
        0x04 | 0x0C | 0x14 | 0x1C | 0x24 | 0x2C | 0x34 | 0x3C => inc_r,
        0x05 | 0x0D | 0x15 | 0x1D | 0x25 | 0x2D | 0x35 | 0x3D => dec_r,
        0x06 | 0x0E | 0x16 | 0x1E | 0x26 | 0x2E | 0x36 | 0x3E => ld_r_d8,
        0x07 | 0x0F | 0x17 | 0x1F => rotate_a,
        0x08 => ld_a16_sp,
        0x09 | 0x19 | 0x29 | 0x39 => add_hl_rr,
        0x10 => stop,
        0x18 => jr,
        0x20 | 0x28 | 0x30 | 0x38 => jr_cc,
        0x27 => daa,
        0x2F => cpl,
        0x37 => scf,
        0x3F => ccf,
        0x76 => halt,
        0x40..=0x7F => ld_r_r,
        0x80..=0xBF => alu_r,
        0xC6 | 0xCE | 0xD6 | 0xDE | 0xE6 | 0xEE | 0xF6 | 0xFE => alu_d8,
        0xC0 | 0xC8 | 0xD0 | 0xD8 => ret_cc,
        0xC9 => ret,
        0xD9 => reti,
        0xC1 | 0xD1 | 0xE1 | 0xF1 => pop,
        0xC5 | 0xD5 | 0xE5 | 0xF5 => push,
        0xC2 | 0xCA | 0xD2 | 0xDA => jp_cc,
        0xC3 => jp,
        0xE9 => jp_hl,
        0xC4 | 0xCC | 0xD4 | 0xDC => call_cc,
        0xCD => call,
        0xC7 | 0xCF | 0xD7 | 0xDF | 0xE7 | 0xEF | 0xF7 | 0xFF => rst,
        0xCB => prefix_cb,
        0xE0 => ldh_a8_a,
        0xF0 => ldh_a_a8,
        0xE2 => ldh_c_a,
        0xF2 => ldh_a_c,
        0xEA => ld_a16_a,
        0xFA => ld_a_a16,
        0xE8 => add_sp_e8,
        0xF8 => ld_hl_sp_e8,
        0xF9 => ld_sp_hl,
        0xF3 => di,
        0xFB => ei,
        // D3 DB DD E3 E4 EB EC ED F4 FC FD
        _ => illegal,
    }
}

const fn decode_cb(op: u8) -> Handler {
    match op >> 6 {
        0 => shift_r,
        1 => bit,
        2 => res,
        _ => set,
    }
}

/// Extra cycles for an `(HL)` operand over a register one.
#[inline]
fn mem_penalty(operand: Operand, cycles: u8) -> u8 {
    if operand.is_memory() { cycles } else { 0 }
}

/// 16-bit pair from opcode bits 4-5, with SP in the last slot.
fn read_pair_sp(cpu: &Cpu, op: u8) -> u16 {
    match (op >> 4) & 0x03 {
        0 => cpu.regs.bc(),
        1 => cpu.regs.de(),
        2 => cpu.regs.hl(),
        _ => cpu.regs.sp,
    }
}

fn write_pair_sp(cpu: &mut Cpu, op: u8, val: u16) {
    match (op >> 4) & 0x03 {
        0 => cpu.regs.set_bc(val),
        1 => cpu.regs.set_de(val),
        2 => cpu.regs.set_hl(val),
        _ => cpu.regs.sp = val,
    }
}

/// Address for the LD (rr),A family: BC, DE, HL+ and HL-.
fn indirect_addr(cpu: &mut Cpu, op: u8) -> u16 {
    match (op >> 4) & 0x03 {
        0 => cpu.regs.bc(),
        1 => cpu.regs.de(),
        2 => {
            let hl = cpu.regs.hl();
            cpu.regs.set_hl(hl.wrapping_add(1));
            hl
        }
        _ => {
            let hl = cpu.regs.hl();
            cpu.regs.set_hl(hl.wrapping_sub(1));
            hl
        }
    }
}

fn nop(_: &mut Cpu, _: &mut Mmu, _: u8) -> u8 {
    1
}

fn illegal(cpu: &mut Cpu, _: &mut Mmu, op: u8) -> u8 {
    trace!(
        "unused opcode {op:02X} at {:04X}",
        cpu.regs.pc.wrapping_sub(1)
    );
    1
}

fn ld_rr_d16(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u8 {
    let val = cpu.imm16(mmu);
    write_pair_sp(cpu, op, val);
    3
}

fn ld_ind_a(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u8 {
    let addr = indirect_addr(cpu, op);
    mmu.write_byte(addr, cpu.regs.a);
    2
}

fn ld_a_ind(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u8 {
    let addr = indirect_addr(cpu, op);
    cpu.regs.a = mmu.read_byte(addr);
    2
}

fn inc_rr(cpu: &mut Cpu, _: &mut Mmu, op: u8) -> u8 {
    let val = read_pair_sp(cpu, op).wrapping_add(1);
    write_pair_sp(cpu, op, val);
    2
}

fn dec_rr(cpu: &mut Cpu, _: &mut Mmu, op: u8) -> u8 {
    let val = read_pair_sp(cpu, op).wrapping_sub(1);
    write_pair_sp(cpu, op, val);
    2
}

fn inc_r(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u8 {
    let target = Operand::from_bits(op >> 3);
    let val = cpu.read_operand(mmu, target);
    let res = cpu.inc8(val);
    cpu.write_operand(mmu, target, res);
    1 + mem_penalty(target, 2)
}

fn dec_r(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u8 {
    let target = Operand::from_bits(op >> 3);
    let val = cpu.read_operand(mmu, target);
    let res = cpu.dec8(val);
    cpu.write_operand(mmu, target, res);
    1 + mem_penalty(target, 2)
}

fn ld_r_d8(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u8 {
    let target = Operand::from_bits(op >> 3);
    let val = cpu.imm8(mmu);
    cpu.write_operand(mmu, target, val);
    2 + mem_penalty(target, 1)
}

/// RLCA, RRCA, RLA and RRA. Unlike the CB forms these always clear Z.
fn rotate_a(cpu: &mut Cpu, _: &mut Mmu, op: u8) -> u8 {
    let (res, carry) = cpu.shift(Shift::from_bits(op >> 3), cpu.regs.a);
    cpu.regs.a = res;
    cpu.regs.set_flags(false, false, false, carry);
    1
}

fn ld_a16_sp(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u8 {
    let addr = cpu.imm16(mmu);
    mmu.write_u16(addr, cpu.regs.sp);
    5
}

fn add_hl_rr(cpu: &mut Cpu, _: &mut Mmu, op: u8) -> u8 {
    let val = read_pair_sp(cpu, op);
    cpu.add_hl(val);
    2
}

fn stop(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u8 {
    // STOP is followed by a padding byte
    cpu.imm8(mmu);
    debug!("STOP at {:04X}", cpu.regs.pc.wrapping_sub(2));
    cpu.enter_stop(mmu);
    1
}

fn jr(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u8 {
    let offset = cpu.imm8(mmu) as i8;
    cpu.regs.pc = cpu.regs.pc.wrapping_add(offset as u16);
    3
}

fn jr_cc(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u8 {
    let offset = cpu.imm8(mmu) as i8;
    if !cpu.condition(Cond::from_bits(op >> 3)) {
        return 2;
    }
    cpu.regs.pc = cpu.regs.pc.wrapping_add(offset as u16);
    3
}

fn daa(cpu: &mut Cpu, _: &mut Mmu, _: u8) -> u8 {
    cpu.daa();
    1
}

fn cpl(cpu: &mut Cpu, _: &mut Mmu, _: u8) -> u8 {
    cpu.complement_a();
    1
}

fn scf(cpu: &mut Cpu, _: &mut Mmu, _: u8) -> u8 {
    cpu.set_carry_flags(true);
    1
}

fn ccf(cpu: &mut Cpu, _: &mut Mmu, _: u8) -> u8 {
    let carry = cpu.regs.flag(FLAG_C);
    cpu.set_carry_flags(!carry);
    1
}

fn halt(cpu: &mut Cpu, _: &mut Mmu, _: u8) -> u8 {
    debug!("HALT at {:04X}", cpu.regs.pc.wrapping_sub(1));
    cpu.halted = true;
    1
}

fn ld_r_r(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u8 {
    let dst = Operand::from_bits(op >> 3);
    let src = Operand::from_bits(op);
    let val = cpu.read_operand(mmu, src);
    cpu.write_operand(mmu, dst, val);
    1 + mem_penalty(src, 1) + mem_penalty(dst, 1)
}

fn alu_r(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u8 {
    let src = Operand::from_bits(op);
    let val = cpu.read_operand(mmu, src);
    cpu.alu(AluOp::from_bits(op >> 3), val);
    1 + mem_penalty(src, 1)
}

fn alu_d8(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u8 {
    let val = cpu.imm8(mmu);
    cpu.alu(AluOp::from_bits(op >> 3), val);
    2
}

fn ret_cc(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u8 {
    if !cpu.condition(Cond::from_bits(op >> 3)) {
        return 2;
    }
    cpu.regs.pc = cpu.pop(mmu);
    5
}

fn ret(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u8 {
    cpu.regs.pc = cpu.pop(mmu);
    4
}

fn reti(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u8 {
    cpu.regs.pc = cpu.pop(mmu);
    cpu.ime.enable_now();
    4
}

fn pop(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u8 {
    let val = cpu.pop(mmu);
    match (op >> 4) & 0x03 {
        0 => cpu.regs.set_bc(val),
        1 => cpu.regs.set_de(val),
        2 => cpu.regs.set_hl(val),
        _ => cpu.regs.set_af(val),
    }
    3
}

fn push(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u8 {
    let val = match (op >> 4) & 0x03 {
        0 => cpu.regs.bc(),
        1 => cpu.regs.de(),
        2 => cpu.regs.hl(),
        _ => cpu.regs.af(),
    };
    cpu.push(mmu, val);
    4
}

fn jp_cc(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u8 {
    let addr = cpu.imm16(mmu);
    if !cpu.condition(Cond::from_bits(op >> 3)) {
        return 3;
    }
    cpu.regs.pc = addr;
    4
}

fn jp(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u8 {
    cpu.regs.pc = cpu.imm16(mmu);
    4
}

fn jp_hl(cpu: &mut Cpu, _: &mut Mmu, _: u8) -> u8 {
    cpu.regs.pc = cpu.regs.hl();
    1
}

fn call_cc(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u8 {
    let addr = cpu.imm16(mmu);
    if !cpu.condition(Cond::from_bits(op >> 3)) {
        return 3;
    }
    cpu.push(mmu, cpu.regs.pc);
    cpu.regs.pc = addr;
    6
}

fn call(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u8 {
    let addr = cpu.imm16(mmu);
    cpu.push(mmu, cpu.regs.pc);
    cpu.regs.pc = addr;
    6
}

fn rst(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u8 {
    cpu.push(mmu, cpu.regs.pc);
    cpu.regs.pc = (op & 0x38) as u16;
    4
}

fn prefix_cb(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u8 {
    let op = cpu.imm8(mmu);
    CB[op as usize](cpu, mmu, op)
}

fn ldh_a8_a(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u8 {
    let offset = cpu.imm8(mmu);
    mmu.write_byte(0xFF00 | offset as u16, cpu.regs.a);
    3
}

fn ldh_a_a8(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u8 {
    let offset = cpu.imm8(mmu);
    cpu.regs.a = mmu.read_byte(0xFF00 | offset as u16);
    3
}

fn ldh_c_a(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u8 {
    mmu.write_byte(0xFF00 | cpu.regs.c as u16, cpu.regs.a);
    2
}

fn ldh_a_c(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u8 {
    cpu.regs.a = mmu.read_byte(0xFF00 | cpu.regs.c as u16);
    2
}

fn ld_a16_a(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u8 {
    let addr = cpu.imm16(mmu);
    mmu.write_byte(addr, cpu.regs.a);
    4
}

fn ld_a_a16(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u8 {
    let addr = cpu.imm16(mmu);
    cpu.regs.a = mmu.read_byte(addr);
    4
}

fn add_sp_e8(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u8 {
    let offset = cpu.imm8(mmu);
    cpu.regs.sp = cpu.sp_offset(offset);
    4
}

fn ld_hl_sp_e8(cpu: &mut Cpu, mmu: &mut Mmu, _: u8) -> u8 {
    let offset = cpu.imm8(mmu);
    let val = cpu.sp_offset(offset);
    cpu.regs.set_hl(val);
    3
}

fn ld_sp_hl(cpu: &mut Cpu, _: &mut Mmu, _: u8) -> u8 {
    cpu.regs.sp = cpu.regs.hl();
    2
}

fn di(cpu: &mut Cpu, _: &mut Mmu, _: u8) -> u8 {
    cpu.ime.disable();
    1
}

fn ei(cpu: &mut Cpu, _: &mut Mmu, _: u8) -> u8 {
    cpu.ime.schedule_enable();
    1
}

// CB table

fn shift_r(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u8 {
    let target = Operand::from_bits(op);
    let val = cpu.read_operand(mmu, target);
    let (res, carry) = cpu.shift(Shift::from_bits(op >> 3), val);
    cpu.write_operand(mmu, target, res);
    cpu.regs.set_flags(res == 0, false, false, carry);
    2 + mem_penalty(target, 2)
}

fn bit(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u8 {
    let target = Operand::from_bits(op);
    let mask = 1 << ((op >> 3) & 0x07);
    let val = cpu.read_operand(mmu, target);
    let carry = cpu.regs.flag(FLAG_C);
    cpu.regs.set_flags(val & mask == 0, false, true, carry);
    2 + mem_penalty(target, 1)
}

fn res(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u8 {
    let target = Operand::from_bits(op);
    let mask = 1 << ((op >> 3) & 0x07);
    let val = cpu.read_operand(mmu, target);
    cpu.write_operand(mmu, target, val & !mask);
    2 + mem_penalty(target, 2)
}

fn set(cpu: &mut Cpu, mmu: &mut Mmu, op: u8) -> u8 {
    let target = Operand::from_bits(op);
    let mask = 1 << ((op >> 3) & 0x07);
    let val = cpu.read_operand(mmu, target);
    cpu.write_operand(mmu, target, val | mask);
    2 + mem_penalty(target, 2)
}
