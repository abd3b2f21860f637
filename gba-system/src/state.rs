// Save state del sistema
//
// Cattura tutto lo stato architetturale: R0-R15, CPSR, gli SPSR e i banchi
// di ogni modalità (il tipo Registers serializza tutto), più il contenuto
// completo delle regioni di memoria scrivibili e i registri di interrupt
// e video. BIOS e ROM non vengono salvate: si ricaricano dalle immagini.

use serde::{Deserialize, Serialize};
use thiserror::Error;

use arm7tdmi::Registers;

use crate::interrupt::InterruptController;
use crate::ppu::Ppu;

pub const SAVE_STATE_VERSION: u32 = 1;

#[derive(Debug, Error)]
pub enum SaveStateError {
    #[error("versione save state non supportata: {0}")]
    UnsupportedVersion(u32),
    #[error("dimensione regione {region} inattesa: {found} byte invece di {expected}")]
    RegionSizeMismatch {
        region: &'static str,
        expected: usize,
        found: usize,
    },
    #[error(transparent)]
    Serde(#[from] serde_json::Error),
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SaveState {
    pub version: u32,
    pub regs: Registers,
    pub cycles: u64,
    pub halted: bool,
    pub interrupt: InterruptController,
    pub ppu: Ppu,
    pub ewram: Vec<u8>,
    pub iwram: Vec<u8>,
    pub io_registers: Vec<u8>,
    pub palette_ram: Vec<u8>,
    pub vram: Vec<u8>,
    pub oam: Vec<u8>,
    pub sram: Vec<u8>,
}

impl SaveState {
    pub fn to_json(&self) -> Result<String, SaveStateError> {
        Ok(serde_json::to_string(self)?)
    }

    pub fn from_json(json: &str) -> Result<Self, SaveStateError> {
        let state: SaveState = serde_json::from_str(json)?;
        if state.version != SAVE_STATE_VERSION {
            return Err(SaveStateError::UnsupportedVersion(state.version));
        }
        Ok(state)
    }
}

/// Controllo incrociato tra regione salvata e buffer di destinazione
pub(crate) fn check_region(
    region: &'static str,
    expected: usize,
    found: usize,
) -> Result<(), SaveStateError> {
    if expected == found {
        Ok(())
    } else {
        Err(SaveStateError::RegionSizeMismatch {
            region,
            expected,
            found,
        })
    }
}
