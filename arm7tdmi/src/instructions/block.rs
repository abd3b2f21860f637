// Block Data Transfer (LDM/STM)
//
// Le quattro modalità IB/IA/DB/DA vengono normalizzate all'indirizzo più
// basso del blocco: i registri si trasferiscono sempre in ordine crescente
// di indice, qualunque sia la direzione dell'indirizzamento.
//
// Casi particolari (comportamento fissato e coperto dai test):
// - STM con base nella lista: in memoria finisce SEMPRE il valore
//   originale della base (il writeback avviene dopo i trasferimenti)
// - LDM con base nella lista e writeback: vince il valore caricato,
//   il writeback viene soppresso
// - S-bit su LDM con R15: CPSR ripristinato dall'SPSR prima del salto
// - S-bit altrimenti: trasferisce il banco User e il writeback è vietato
// - Lista vuota: nessun trasferimento, niente writeback

use crate::cpu::{ARM7TDMI, MemoryBus};
use crate::timing;

#[allow(clippy::too_many_arguments)]
pub fn execute_block_transfer<M: MemoryBus>(
    cpu: &mut ARM7TDMI,
    bus: &mut M,
    load: bool,
    pre_index: bool,
    add: bool,
    psr_user: bool,
    writeback: bool,
    rn: u8,
    register_list: u16,
) -> u32 {
    let count = register_list.count_ones();
    if register_list == 0 {
        return if load {
            timing::load_multiple(0, false)
        } else {
            timing::store_multiple(0)
        };
    }

    let base = cpu.reg(rn);
    let pc_in_list = register_list & (1 << 15) != 0;
    // S-bit senza R15 in load (o su qualsiasi store): banco User
    let user_bank = psr_user && !(load && pc_in_list);

    // Indirizzo più basso del blocco e valore finale della base
    let (mut address, final_base) = if add {
        let start = if pre_index {
            base.wrapping_add(4)
        } else {
            base
        };
        (start, base.wrapping_add(count * 4))
    } else {
        let fin = base.wrapping_sub(count * 4);
        let start = if pre_index { fin } else { fin.wrapping_add(4) };
        (start, fin)
    };

    for i in 0..16u8 {
        if register_list & (1 << i) == 0 {
            continue;
        }
        if load {
            let value = bus.read_word(address);
            if i == 15 {
                if psr_user {
                    // LDM^ con R15: ritorno da eccezione
                    let spsr = cpu.regs.spsr();
                    cpu.regs.restore_cpsr(spsr);
                }
                cpu.set_reg(15, value);
            } else if user_bank {
                cpu.regs.set_user_reg(i as usize, value);
            } else {
                cpu.set_reg(i, value);
            }
        } else {
            let value = if user_bank {
                cpu.regs.user_reg(i as usize)
            } else if i == 15 {
                // STM di R15 salva l'indirizzo corrente + 12
                cpu.reg(15).wrapping_add(4)
            } else {
                // Base nella lista: qui il writeback non è ancora avvenuto,
                // quindi viene salvato il valore originale
                cpu.reg(i)
            };
            cpu.store_word(bus, address, value);
        }
        address = address.wrapping_add(4);
    }

    let writeback_allowed = writeback
        && rn != 15
        && !user_bank
        && !(load && register_list & (1 << rn) != 0);
    if writeback_allowed {
        cpu.regs.r[rn as usize] = final_base;
    }

    if load {
        timing::load_multiple(count, pc_in_list)
    } else {
        timing::store_multiple(count)
    }
}
