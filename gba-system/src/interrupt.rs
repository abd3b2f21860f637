use bitflags::bitflags;
use serde::{Deserialize, Serialize};

bitflags! {
    /// Sorgenti di interrupt (bit di IE/IF)
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
    pub struct InterruptFlags: u16 {
        const VBLANK  = 1 << 0;
        const HBLANK  = 1 << 1;
        const VCOUNT  = 1 << 2;
        const TIMER0  = 1 << 3;
        const TIMER1  = 1 << 4;
        const TIMER2  = 1 << 5;
        const TIMER3  = 1 << 6;
        const SERIAL  = 1 << 7;
        const DMA0    = 1 << 8;
        const DMA1    = 1 << 9;
        const DMA2    = 1 << 10;
        const DMA3    = 1 << 11;
        const KEYPAD  = 1 << 12;
        const GAMEPAK = 1 << 13;
    }
}

/// Controller interrupt: i tre registri IE/IF/IME e il contratto verso la
/// CPU (polling tra un'istruzione e l'altra, acknowledge dal vettore IRQ).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct InterruptController {
    /// Interrupt Enable
    pub ie: u16,

    /// Interrupt Flags (richieste pendenti)
    pub if_: u16,

    /// Interrupt Master Enable
    pub ime: bool,
}

impl InterruptController {
    pub fn new() -> Self {
        Self {
            ie: 0,
            if_: 0,
            ime: false,
        }
    }

    /// Richiedi un interrupt
    pub fn request(&mut self, flag: InterruptFlags) {
        self.if_ |= flag.bits();
    }

    /// Linea IRQ verso la CPU: pendente, abilitato e master enable attivo
    pub fn pending_and_unmasked(&self) -> bool {
        self.ime && (self.ie & self.if_) != 0
    }

    /// Acknowledge esplicito di una sorgente
    pub fn acknowledge(&mut self, flag: InterruptFlags) {
        self.if_ &= !flag.bits();
    }

    /// Acknowledge dal percorso IRQ della CPU: ripulisce la sorgente
    /// pendente abilitata con priorità più alta (bit più basso)
    pub fn ack_highest(&mut self) {
        let pending = self.ie & self.if_;
        if pending != 0 {
            self.if_ &= !(1 << pending.trailing_zeros());
        }
    }

    /// Scrittura del registro IF: write-1-to-clear, come l'hardware
    pub fn write_if(&mut self, value: u16) {
        self.if_ &= !value;
    }
}

impl Default for InterruptController {
    fn default() -> Self {
        Self::new()
    }
}
