// Istruzioni Data Processing (ALU)
//
// Tutte e 16 le operazioni: aritmetiche, logiche e i quattro confronti che
// aggiornano solo i flag. Il secondo operando arriva già passato dal barrel
// shifter insieme al suo carry out.
//
// Regole flag con S attivo:
// - operazioni logiche: N/Z dal risultato, C dal carry dello shifter,
//   V invariato
// - operazioni aritmetiche: N/Z/C/V dal risultato a 33 bit
// - Rd = R15 con S: il CPSR viene ripristinato dall'SPSR (ritorno da
//   eccezione), nessun aggiornamento flag

use crate::arm::data_processing as op;
use crate::cpu::ARM7TDMI;

/// Addizione con carry e overflow (a + b + carry_in)
#[inline]
pub fn add_with_flags(a: u32, b: u32, carry_in: bool) -> (u32, bool, bool) {
    let sum = a as u64 + b as u64 + carry_in as u64;
    let result = sum as u32;
    let carry = sum > u32::MAX as u64;
    // Overflow: operandi concordi, risultato discorde
    let overflow = ((a ^ result) & (b ^ result)) >> 31 != 0;
    (result, carry, overflow)
}

/// Sottrazione con carry inteso come NOT borrow: a - b - (1 - carry_in).
/// Per SUB/RSB/CMP va passato carry_in = true.
#[inline]
pub fn sub_with_flags(a: u32, b: u32, carry_in: bool) -> (u32, bool, bool) {
    let borrow = !carry_in as u32;
    let result = a.wrapping_sub(b).wrapping_sub(borrow);
    let carry = a as u64 >= b as u64 + borrow as u64;
    let overflow = ((a ^ b) & (a ^ result)) >> 31 != 0;
    (result, carry, overflow)
}

enum FlagRule {
    Logical,
    Arithmetic { c: bool, v: bool },
}

/// Esegue un'istruzione Data Processing con operando2 già risolto
pub fn execute_data_processing(
    cpu: &mut ARM7TDMI,
    opcode: u8,
    set_flags: bool,
    rn: u8,
    rd: u8,
    op2: u32,
    shifter_carry: bool,
) {
    let rn_value = cpu.reg(rn);
    let carry_in = cpu.regs.flag_c();

    let (value, write, flags) = match opcode {
        op::AND => (rn_value & op2, true, FlagRule::Logical),
        op::EOR => (rn_value ^ op2, true, FlagRule::Logical),
        op::SUB => {
            let (r, c, v) = sub_with_flags(rn_value, op2, true);
            (r, true, FlagRule::Arithmetic { c, v })
        }
        op::RSB => {
            let (r, c, v) = sub_with_flags(op2, rn_value, true);
            (r, true, FlagRule::Arithmetic { c, v })
        }
        op::ADD => {
            let (r, c, v) = add_with_flags(rn_value, op2, false);
            (r, true, FlagRule::Arithmetic { c, v })
        }
        op::ADC => {
            let (r, c, v) = add_with_flags(rn_value, op2, carry_in);
            (r, true, FlagRule::Arithmetic { c, v })
        }
        op::SBC => {
            let (r, c, v) = sub_with_flags(rn_value, op2, carry_in);
            (r, true, FlagRule::Arithmetic { c, v })
        }
        op::RSC => {
            let (r, c, v) = sub_with_flags(op2, rn_value, carry_in);
            (r, true, FlagRule::Arithmetic { c, v })
        }
        op::TST => (rn_value & op2, false, FlagRule::Logical),
        op::TEQ => (rn_value ^ op2, false, FlagRule::Logical),
        op::CMP => {
            let (r, c, v) = sub_with_flags(rn_value, op2, true);
            (r, false, FlagRule::Arithmetic { c, v })
        }
        op::CMN => {
            let (r, c, v) = add_with_flags(rn_value, op2, false);
            (r, false, FlagRule::Arithmetic { c, v })
        }
        op::ORR => (rn_value | op2, true, FlagRule::Logical),
        op::MOV => (op2, true, FlagRule::Logical),
        op::BIC => (rn_value & !op2, true, FlagRule::Logical),
        _ => (!op2, true, FlagRule::Logical), // MVN
    };

    if write {
        if rd == 15 && set_flags {
            // Ritorno da eccezione: SPSR -> CPSR, poi il PC viene mascherato
            // secondo lo stato appena ripristinato
            let spsr = cpu.regs.spsr();
            cpu.regs.restore_cpsr(spsr);
            cpu.set_reg(15, value);
            return;
        }
        cpu.set_reg(rd, value);
    }

    if set_flags {
        cpu.regs.set_nz(value);
        match flags {
            FlagRule::Logical => cpu.regs.set_flag_c(shifter_carry),
            FlagRule::Arithmetic { c, v } => {
                cpu.regs.set_flag_c(c);
                cpu.regs.set_flag_v(v);
            }
        }
    }
}
