// Istruzioni di Branch (salto)
//
// - B: salto semplice, offset relativo al PC letto in pipeline
// - BL: come B ma salva l'indirizzo di ritorno in R14 (LR)
// - BX: salta all'indirizzo in un registro e cambia stato ARM/THUMB
//   in base al bit 0 del target

use crate::cpu::ARM7TDMI;
use crate::timing;

/// Esegue un Branch ARM (B o BL).
/// L'offset è già esteso di segno e moltiplicato per 4; si somma a R15
/// letto in pipeline (indirizzo corrente + 8).
pub fn execute_branch(cpu: &mut ARM7TDMI, offset: i32, link: bool) -> u32 {
    if link {
        // Indirizzo di ritorno: l'istruzione dopo la BL
        cpu.regs.set_lr(cpu.regs.pc().wrapping_add(4));
    }
    let target = cpu.reg(15).wrapping_add(offset as u32);
    cpu.set_reg(15, target);
    timing::branch()
}

/// Esegue un Branch and Exchange (BX).
///
/// Bit 0 del target: 0 = ARM, 1 = THUMB. Lo stato viene cambiato prima
/// della scrittura del PC, così la maschera di allineamento è quella del
/// nuovo set di istruzioni.
pub fn execute_branch_exchange(cpu: &mut ARM7TDMI, target: u32) -> u32 {
    cpu.regs.set_thumb(target & 1 != 0);
    cpu.set_reg(15, target);
    timing::branch()
}
