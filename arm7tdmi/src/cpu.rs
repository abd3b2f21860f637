use crate::arm::{decode_arm, Condition};
use crate::cache::{CacheStats, CachedInstr, DecodeCache};
use crate::registers::{Mode, Registers, StatusFlags};
use crate::thumb::decode_thumb;
use crate::timing;

//==============================================================================
// MEMORIA E BUS
//==============================================================================
// Il MemoryBus è il trait che definisce come la CPU accede alla memoria.
// Qualsiasi componente che implementa questo trait può essere usato dalla CPU
// per leggere/scrivere dati. Questo design modulare permette di:
// 1. Testare la CPU con un bus fittizio
// 2. Usare un bus reale che gestisce tutta la memoria GBA
// 3. Cambiare implementazione senza modificare la CPU
//
// Contratto little-endian, con la rotazione degli accessi disallineati a
// carico del bus: una read_word su indirizzo non allineato ritorna la word
// a (addr & !3) ruotata a destra di (addr & 3) * 8 bit, una read_halfword
// su indirizzo dispari ritorna la halfword ruotata di 8. Le scritture
// mascherano i bit bassi dell'indirizzo.
//==============================================================================

/// Trait per accesso alla memoria dalla CPU
pub trait MemoryBus {
    fn read_byte(&mut self, addr: u32) -> u8;
    fn read_halfword(&mut self, addr: u32) -> u16;
    fn read_word(&mut self, addr: u32) -> u32;

    fn write_byte(&mut self, addr: u32, value: u8);
    fn write_halfword(&mut self, addr: u32, value: u16);
    fn write_word(&mut self, addr: u32, value: u32);
}

/// Linea di interrupt vista dalla CPU.
///
/// Il controller viene interrogato tra un'istruzione e l'altra; `ack` viene
/// chiamata dal percorso di ingresso IRQ. Le implementazioni di default
/// servono ai bus di test che non hanno interrupt.
pub trait IrqLine {
    fn pending_and_unmasked(&self) -> bool {
        false
    }
    fn ack(&mut self) {}
}

/// Vettori delle eccezioni ARM7TDMI
pub mod vectors {
    pub const RESET: u32 = 0x0000_0000;
    pub const UNDEFINED: u32 = 0x0000_0004;
    pub const SWI: u32 = 0x0000_0008;
    pub const IRQ: u32 = 0x0000_0018;
}

//==============================================================================
// CPU ARM7TDMI - STRUTTURA PRINCIPALE
//==============================================================================
// Questa è la CPU del Game Boy Advance. È un processore ARM7TDMI che:
// - Supporta il set di istruzioni ARM a 32-bit
// - Supporta il set di istruzioni THUMB a 16-bit (più compatto)
// - Ha 37 registri in totale (16 visibili + banked)
// - Qui la pipeline a 3 stadi è modellata solo come regola architetturale:
//   R15 letto come operando vale indirizzo corrente +8 (ARM) o +4 (THUMB)
//
// Durante l'esecuzione r[15] contiene l'indirizzo dell'istruzione corrente;
// l'offset di pipeline viene applicato da `reg()`. Se il handler non
// riscrive il PC, il loop lo avanza di 4 (ARM) o 2 (THUMB).
//==============================================================================

/// CPU ARM7TDMI del Game Boy Advance
///
/// Campi:
/// - `regs`: Registri della CPU (R0-R15, CPSR, SPSR, banked registers)
/// - `cycles`: Contatore cicli totali eseguiti
/// - `halted`: Se true, la CPU è in stato HALT (risparmio energetico)
pub struct ARM7TDMI {
    pub regs: Registers,
    pub cycles: u64,
    pub halted: bool,

    cache: DecodeCache,
    // Il handler che riscrive il PC lo segnala qui: niente avanzamento
    pub(crate) pc_written: bool,
    // Tra le due metà di un BL THUMB gli interrupt restano in attesa
    pub(crate) bl_prefix: bool,
}

impl ARM7TDMI {
    pub fn new() -> Self {
        Self {
            regs: Registers::new(),
            cycles: 0,
            halted: false,
            cache: DecodeCache::new(),
            pc_written: false,
            bl_prefix: false,
        }
    }

    /// Reset della CPU
    pub fn reset(&mut self) {
        self.regs = Registers::new();
        self.regs.set_pc(vectors::RESET);
        self.cycles = 0;
        self.halted = false;
        self.cache = DecodeCache::new();
        self.pc_written = false;
        self.bl_prefix = false;
    }

    //==========================================================================
    // STEP - ESECUZIONE ISTRUZIONE
    //==========================================================================
    // Esegue UNA SINGOLA ISTRUZIONE (o l'ingresso in un'eccezione IRQ):
    // 1. Se c'è un IRQ pendente non mascherato, entra nel vettore IRQ
    // 2. Se la CPU è in HALT, consuma un ciclo a vuoto
    // 3. Legge il bit THUMB del CPSR per capire quale set istruzioni usare
    // 4. Fetch (passando dalla cache di decodifica), condizione, execute
    // 5. Restituisce il numero di cicli usati
    //
    // IMPORTANTE: ogni istruzione ha un costo in cicli diverso (vedi timing)
    //==========================================================================

    /// Esegui una singola istruzione e restituisci i cicli usati
    pub fn step<M: MemoryBus + IrqLine>(&mut self, bus: &mut M) -> u32 {
        if bus.pending_and_unmasked() && !self.bl_prefix {
            // Un interrupt sveglia la CPU anche se gli IRQ sono mascherati
            self.halted = false;
            if !self.regs.flag(StatusFlags::IRQ_DISABLE) {
                let cycles = self.enter_irq(bus);
                self.cycles += cycles as u64;
                return cycles;
            }
        }
        self.bl_prefix = false;

        if self.halted {
            self.cycles += timing::HALTED as u64;
            return timing::HALTED;
        }

        let was_thumb = self.regs.is_thumb();
        let cycles = if was_thumb {
            self.step_thumb(bus)
        } else {
            self.step_arm(bus)
        };
        if self.regs.is_thumb() != was_thumb {
            // Cambio di stato ARM/THUMB: cache di decodifica da buttare
            self.cache.flush();
        }

        self.cycles += cycles as u64;
        cycles
    }

    /// Esegui fino a esaurire il budget di cicli; ritorna i cicli consumati.
    ///
    /// Il budget è l'unico meccanismo di cancellazione: ogni iterazione
    /// consuma un numero di cicli strettamente positivo, quindi il loop
    /// termina sempre.
    pub fn run<M: MemoryBus + IrqLine>(&mut self, bus: &mut M, budget: u64) -> u64 {
        let mut consumed = 0u64;
        while consumed < budget {
            consumed += self.step(bus) as u64;
        }
        consumed
    }

    fn step_arm<M: MemoryBus>(&mut self, bus: &mut M) -> u32 {
        let pc = self.regs.pc() & !3;
        self.regs.set_pc(pc);

        let (cond, instr) = match self.cache.lookup(pc, false) {
            Some(CachedInstr::Arm(cond, instr)) => (cond, instr),
            _ => {
                let word = bus.read_word(pc);
                let cond = Condition::from_opcode(word);
                let instr = decode_arm(word);
                self.cache.insert(pc, false, CachedInstr::Arm(cond, instr));
                (cond, instr)
            }
        };

        if !cond.check(self.regs.cpsr) {
            self.regs.set_pc(pc.wrapping_add(4));
            return timing::COND_FAILED;
        }

        self.pc_written = false;
        let cycles = self.execute_arm(bus, instr);
        if !self.pc_written {
            self.regs.set_pc(pc.wrapping_add(4));
        }
        cycles
    }

    fn step_thumb<M: MemoryBus>(&mut self, bus: &mut M) -> u32 {
        let pc = self.regs.pc() & !1;
        self.regs.set_pc(pc);

        let instr = match self.cache.lookup(pc, true) {
            Some(CachedInstr::Thumb(instr)) => instr,
            _ => {
                let halfword = bus.read_halfword(pc);
                let instr = decode_thumb(halfword);
                self.cache.insert(pc, true, CachedInstr::Thumb(instr));
                instr
            }
        };

        self.pc_written = false;
        let cycles = self.execute_thumb(bus, instr);
        if !self.pc_written {
            self.regs.set_pc(pc.wrapping_add(2));
        }
        cycles
    }

    //==========================================================================
    // LETTURA/SCRITTURA REGISTRI CON SEMANTICA R15
    //==========================================================================

    /// Legge un registro come operando: R15 vale indirizzo corrente +8 in
    /// ARM e +4 in THUMB (prefetch della pipeline)
    #[inline(always)]
    pub(crate) fn reg(&self, i: u8) -> u32 {
        if i == 15 {
            let offset = if self.regs.is_thumb() { 4 } else { 8 };
            self.regs.pc().wrapping_add(offset)
        } else {
            self.regs.r[i as usize]
        }
    }

    /// Scrive un registro come destinazione: una scrittura su R15 maschera
    /// i bit bassi secondo lo stato corrente e forza il flush della pipeline
    #[inline(always)]
    pub(crate) fn set_reg(&mut self, i: u8, value: u32) {
        if i == 15 {
            let mask = if self.regs.is_thumb() { !1 } else { !3 };
            self.regs.set_pc(value & mask);
            self.pc_written = true;
        } else {
            self.regs.r[i as usize] = value;
        }
    }

    //==========================================================================
    // STORE CON INVALIDAZIONE DELLA CACHE DI DECODIFICA
    //==========================================================================
    // Ogni scrittura della CPU passa da qui: se i byte scritti coprono un
    // indirizzo presente in cache, l'entry viene scartata prima del prossimo
    // fetch (codice automodificante).

    pub(crate) fn store_word<M: MemoryBus>(&mut self, bus: &mut M, addr: u32, value: u32) {
        self.cache.invalidate_range(addr & !3, 4);
        bus.write_word(addr, value);
    }

    pub(crate) fn store_halfword<M: MemoryBus>(&mut self, bus: &mut M, addr: u32, value: u16) {
        self.cache.invalidate_range(addr & !1, 2);
        bus.write_halfword(addr, value);
    }

    pub(crate) fn store_byte<M: MemoryBus>(&mut self, bus: &mut M, addr: u32, value: u8) {
        self.cache.invalidate_range(addr, 1);
        bus.write_byte(addr, value);
    }

    //==========================================================================
    // ECCEZIONI
    //==========================================================================
    // Ingresso comune: SPSR della nuova modalità = CPSR corrente, LR della
    // nuova modalità = indirizzo di ritorno, IRQ disabilitati, stato ARM,
    // salto al vettore.

    fn enter_exception(&mut self, mode: Mode, vector: u32, return_addr: u32) {
        let old_cpsr = self.regs.cpsr;
        self.regs.change_mode(mode);
        self.regs.set_spsr(old_cpsr);
        self.regs.set_lr(return_addr);
        self.regs.set_flag(StatusFlags::IRQ_DISABLE, true);
        self.regs.set_thumb(false);
        self.regs.set_pc(vector);
        self.pc_written = true;
    }

    /// Ingresso IRQ: LR_irq = indirizzo della prossima istruzione non
    /// ancora eseguita (il polling avviene tra un'istruzione e l'altra)
    fn enter_irq<M: MemoryBus + IrqLine>(&mut self, bus: &mut M) -> u32 {
        let was_thumb = self.regs.is_thumb();
        let return_addr = self.regs.pc();
        self.enter_exception(Mode::IRQ, vectors::IRQ, return_addr);
        bus.ack();
        if was_thumb {
            self.cache.flush();
        }
        timing::EXCEPTION_ENTRY
    }

    /// Software interrupt (SWI): modalità Supervisor, vettore 0x08
    pub(crate) fn exception_swi(&mut self) -> u32 {
        let return_addr = self.next_instruction_addr();
        self.enter_exception(Mode::Supervisor, vectors::SWI, return_addr);
        timing::EXCEPTION_ENTRY
    }

    /// Istruzione non riconosciuta: modalità Undefined, vettore 0x04
    pub(crate) fn exception_undefined(&mut self) -> u32 {
        let return_addr = self.next_instruction_addr();
        self.enter_exception(Mode::Undefined, vectors::UNDEFINED, return_addr);
        timing::EXCEPTION_ENTRY
    }

    fn next_instruction_addr(&self) -> u32 {
        let size = if self.regs.is_thumb() { 2 } else { 4 };
        self.regs.pc().wrapping_add(size)
    }

    //==========================================================================
    // API PUBBLICA DI ISPEZIONE (test e frontend)
    //==========================================================================

    /// Registri visibili R0-R15
    pub fn registers(&self) -> &[u32; 16] {
        &self.regs.r
    }

    /// Accesso mutabile ai registri visibili (per i test)
    pub fn registers_mut(&mut self) -> &mut [u32; 16] {
        &mut self.regs.r
    }

    pub fn cpsr(&self) -> u32 {
        self.regs.cpsr
    }

    /// Scrittura diretta del CPSR, con banking se cambiano i bit di modo
    pub fn set_cpsr(&mut self, value: u32) {
        self.regs.restore_cpsr(value);
    }

    pub fn get_flag(&self, flag: StatusFlags) -> bool {
        self.regs.flag(flag)
    }

    pub fn set_flag(&mut self, flag: StatusFlags, value: bool) {
        self.regs.set_flag(flag, value);
    }

    /// Statistiche della cache di decodifica: (hit, miss, invalidazioni)
    pub fn cache_stats(&self) -> (u64, u64, u64) {
        let CacheStats {
            hits,
            misses,
            invalidations,
        } = self.cache.stats();
        (hits, misses, invalidations)
    }
}

impl Default for ARM7TDMI {
    fn default() -> Self {
        Self::new()
    }
}
