// Istruzioni Load/Store singole
//
// - LDR/STR (word e byte) con offset a 12 bit o registro shiftato
// - LDRH/STRH/LDRSB/LDRSH con offset a 8 bit o registro
// - SWP/SWPB (scambio atomico registro <-> memoria)
//
// La rotazione degli accessi word/halfword disallineati è a carico del bus:
// qui gli indirizzi di load passano NON mascherati, così il valore arriva
// già ruotato. Le store mascherano loro stesse i bit bassi.

use crate::arm::HalfwordKind;
use crate::cpu::{ARM7TDMI, MemoryBus};
use crate::timing;

/// Esegue Single Data Transfer (LDR/STR, anche byte)
///
/// Post-indexed scrive sempre il base register; pre-indexed solo con W.
/// Su LDR con Rd == Rn il valore caricato vince sul writeback.
#[allow(clippy::too_many_arguments)]
pub fn execute_single_transfer<M: MemoryBus>(
    cpu: &mut ARM7TDMI,
    bus: &mut M,
    load: bool,
    byte: bool,
    pre_index: bool,
    add: bool,
    writeback: bool,
    rn: u8,
    rd: u8,
    offset: u32,
) -> u32 {
    let base = cpu.reg(rn);
    let indexed = if add {
        base.wrapping_add(offset)
    } else {
        base.wrapping_sub(offset)
    };
    let address = if pre_index { indexed } else { base };
    let do_writeback = !pre_index || writeback;

    if load {
        let value = if byte {
            bus.read_byte(address) as u32
        } else {
            bus.read_word(address)
        };
        if do_writeback && rn != 15 {
            cpu.set_reg(rn, indexed);
        }
        cpu.set_reg(rd, value);
        timing::load_single(rd == 15)
    } else {
        // STR di R15 salva l'indirizzo corrente + 12
        let value = if rd == 15 {
            cpu.reg(15).wrapping_add(4)
        } else {
            cpu.reg(rd)
        };
        if byte {
            cpu.store_byte(bus, address, value as u8);
        } else {
            cpu.store_word(bus, address, value);
        }
        if do_writeback && rn != 15 {
            cpu.set_reg(rn, indexed);
        }
        timing::store_single()
    }
}

/// Esegue i trasferimenti halfword e signed (LDRH/STRH/LDRSB/LDRSH)
#[allow(clippy::too_many_arguments)]
pub fn execute_halfword_transfer<M: MemoryBus>(
    cpu: &mut ARM7TDMI,
    bus: &mut M,
    kind: HalfwordKind,
    pre_index: bool,
    add: bool,
    writeback: bool,
    rn: u8,
    rd: u8,
    offset: u32,
) -> u32 {
    let base = cpu.reg(rn);
    let indexed = if add {
        base.wrapping_add(offset)
    } else {
        base.wrapping_sub(offset)
    };
    let address = if pre_index { indexed } else { base };
    let do_writeback = !pre_index || writeback;

    match kind {
        HalfwordKind::StoreHalf => {
            let value = if rd == 15 {
                cpu.reg(15).wrapping_add(4)
            } else {
                cpu.reg(rd)
            };
            cpu.store_halfword(bus, address, value as u16);
            if do_writeback && rn != 15 {
                cpu.set_reg(rn, indexed);
            }
            timing::store_single()
        }
        _ => {
            let value = match kind {
                // Zero-extend, con rotazione del bus su indirizzo dispari
                HalfwordKind::LoadHalf => bus.read_halfword(address) as u32,
                HalfwordKind::LoadSignedByte => bus.read_byte(address) as i8 as i32 as u32,
                _ => bus.read_halfword(address) as i16 as i32 as u32,
            };
            if do_writeback && rn != 15 {
                cpu.set_reg(rn, indexed);
            }
            cpu.set_reg(rd, value);
            timing::load_single(rd == 15)
        }
    }
}

/// SWP/SWPB: carica [Rn] in Rd e scrive Rm in [Rn].
/// La load word usa la rotazione da indirizzo disallineato, la store
/// scrive il valore non ruotato all'indirizzo mascherato.
pub fn execute_swap<M: MemoryBus>(
    cpu: &mut ARM7TDMI,
    bus: &mut M,
    byte: bool,
    rn: u8,
    rd: u8,
    rm: u8,
) -> u32 {
    let address = cpu.reg(rn);
    let store_value = cpu.reg(rm);
    if byte {
        let loaded = bus.read_byte(address);
        cpu.store_byte(bus, address, store_value as u8);
        cpu.set_reg(rd, loaded as u32);
    } else {
        let loaded = bus.read_word(address);
        cpu.store_word(bus, address, store_value);
        cpu.set_reg(rd, loaded);
    }
    timing::swap()
}
