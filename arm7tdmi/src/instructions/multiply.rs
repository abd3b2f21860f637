// Istruzioni di moltiplicazione
//
// MUL/MLA a 32 bit e le quattro varianti long a 64 bit. Con S attivo
// vengono aggiornati solo N e Z: C e V restano invariati. R15 come
// operando è imprevedibile sull'hardware; qui viene letto come normale
// valore di pipeline e non fa mai crashare l'interprete.

use crate::cpu::ARM7TDMI;
use crate::timing;

/// MUL (Rd = Rm * Rs) e MLA (Rd = Rm * Rs + Rn)
pub fn execute_multiply(
    cpu: &mut ARM7TDMI,
    accumulate: bool,
    set_flags: bool,
    rd: u8,
    rn: u8,
    rs: u8,
    rm: u8,
) -> u32 {
    let rs_value = cpu.reg(rs);
    let mut result = cpu.reg(rm).wrapping_mul(rs_value);
    if accumulate {
        result = result.wrapping_add(cpu.reg(rn));
    }
    cpu.set_reg(rd, result);
    if set_flags {
        cpu.regs.set_nz(result);
    }
    timing::multiply(rs_value, accumulate)
}

/// UMULL/SMULL/UMLAL/SMLAL (RdHi:RdLo a 64 bit)
pub fn execute_multiply_long(
    cpu: &mut ARM7TDMI,
    signed: bool,
    accumulate: bool,
    set_flags: bool,
    rd_hi: u8,
    rd_lo: u8,
    rs: u8,
    rm: u8,
) -> u32 {
    let rs_value = cpu.reg(rs);
    let product = if signed {
        (cpu.reg(rm) as i32 as i64).wrapping_mul(rs_value as i32 as i64) as u64
    } else {
        cpu.reg(rm) as u64 * rs_value as u64
    };
    let result = if accumulate {
        let acc = ((cpu.reg(rd_hi) as u64) << 32) | cpu.reg(rd_lo) as u64;
        product.wrapping_add(acc)
    } else {
        product
    };

    cpu.set_reg(rd_lo, result as u32);
    cpu.set_reg(rd_hi, (result >> 32) as u32);
    if set_flags {
        cpu.regs.set_flag_n(result >> 63 != 0);
        cpu.regs.set_flag_z(result == 0);
    }
    timing::multiply_long(rs_value, accumulate)
}
