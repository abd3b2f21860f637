use anyhow::{bail, Context, Result};

use arm7tdmi::ARM7TDMI;

use crate::bus::Bus;
use crate::memory::{BIOS_SIZE, ROM_MAX_SIZE};
use crate::ppu::CYCLES_PER_FRAME;
use crate::state::{check_region, SaveState, SaveStateError, SAVE_STATE_VERSION};

//==============================================================================
// SISTEMA GBA - CONTENITORE PRINCIPALE
//==============================================================================
// Coordina CPU e bus (memoria, interrupt, timing video).
//
// COME FUNZIONA UN FRAME:
// 1. La CPU esegue istruzioni fino a ~280,896 cicli (1/60 di secondo)
// 2. Dopo ogni istruzione le periferiche avanzano degli stessi cicli
// 3. Alla scanline 160 il PPU alza VBlank e, se abilitato, l'interrupt
// 4. La CPU serve l'interrupt tra un'istruzione e l'altra
//==============================================================================

/// Sistema GBA: CPU ARM7TDMI + bus con memoria, interrupt e timing video
pub struct GbaSystem {
    pub cpu: ARM7TDMI,
    pub bus: Bus,
}

impl GbaSystem {
    pub fn new() -> Self {
        Self {
            cpu: ARM7TDMI::new(),
            bus: Bus::new(),
        }
    }

    /// Sistema in modalità test: RAM piatta a 0x0, programma e vettori
    /// caricabili direttamente dai test
    pub fn new_test() -> Self {
        Self {
            cpu: ARM7TDMI::new(),
            bus: Bus::new_test(),
        }
    }

    /// Installa l'immagine BIOS a 0x00000000
    pub fn load_bios(&mut self, bios: &[u8]) -> Result<()> {
        if bios.is_empty() {
            bail!("immagine BIOS vuota");
        }
        if bios.len() > BIOS_SIZE {
            bail!(
                "immagine BIOS di {} byte, il massimo è {}",
                bios.len(),
                BIOS_SIZE
            );
        }
        log::info!("BIOS caricata ({} byte)", bios.len());
        self.bus.load_bios(bios);
        Ok(())
    }

    /// Installa la ROM nelle finestre 0x08/0x0A/0x0C
    pub fn load_rom(&mut self, rom: Vec<u8>) -> Result<()> {
        if rom.is_empty() {
            bail!("ROM vuota");
        }
        if rom.len() > ROM_MAX_SIZE {
            bail!("ROM di {} byte, il massimo è {}", rom.len(), ROM_MAX_SIZE);
        }
        log::info!("ROM caricata ({} byte)", rom.len());
        self.bus.load_rom(rom);
        Ok(())
    }

    /// Reset: CPU azzerata, esecuzione dall'entry point della ROM
    pub fn reset(&mut self) {
        self.cpu.reset();
        if !self.bus.memory.is_test_mode() {
            self.cpu.regs.set_pc(0x0800_0000);
        }
        log::debug!("reset, PC = {:#010X}", self.cpu.regs.pc());
    }

    /// Esegue fino a esaurire il budget di cicli, facendo avanzare le
    /// periferiche istruzione per istruzione. Ritorna i cicli consumati.
    pub fn step(&mut self, budget: u64) -> u64 {
        let mut consumed = 0u64;
        while consumed < budget {
            let cycles = self.cpu.step(&mut self.bus);
            self.bus.tick(cycles);
            consumed += cycles as u64;
        }
        consumed
    }

    /// Esegue un frame video intero (~280,896 cicli)
    pub fn run_frame(&mut self) -> u64 {
        self.step(CYCLES_PER_FRAME)
    }

    /// Fotografa lo stato architetturale completo
    pub fn save_state(&self) -> SaveState {
        let memory = &self.bus.memory;
        SaveState {
            version: SAVE_STATE_VERSION,
            regs: self.cpu.regs.clone(),
            cycles: self.cpu.cycles,
            halted: self.cpu.halted,
            interrupt: self.bus.interrupt.clone(),
            ppu: self.bus.ppu.clone(),
            ewram: memory.ewram.clone(),
            iwram: memory.iwram.clone(),
            io_registers: memory.io_registers.clone(),
            palette_ram: memory.palette_ram.clone(),
            vram: memory.vram.clone(),
            oam: memory.oam.clone(),
            sram: memory.sram.clone(),
        }
    }

    /// Ripristina uno stato salvato. BIOS e ROM correnti restano quelle
    /// già installate.
    pub fn restore_state(&mut self, state: &SaveState) -> Result<(), SaveStateError> {
        if state.version != SAVE_STATE_VERSION {
            return Err(SaveStateError::UnsupportedVersion(state.version));
        }
        let memory = &mut self.bus.memory;
        check_region("ewram", memory.ewram.len(), state.ewram.len())?;
        check_region("iwram", memory.iwram.len(), state.iwram.len())?;
        check_region("io", memory.io_registers.len(), state.io_registers.len())?;
        check_region("palette", memory.palette_ram.len(), state.palette_ram.len())?;
        check_region("vram", memory.vram.len(), state.vram.len())?;
        check_region("oam", memory.oam.len(), state.oam.len())?;
        check_region("sram", memory.sram.len(), state.sram.len())?;

        memory.ewram.copy_from_slice(&state.ewram);
        memory.iwram.copy_from_slice(&state.iwram);
        memory.io_registers.copy_from_slice(&state.io_registers);
        memory.palette_ram.copy_from_slice(&state.palette_ram);
        memory.vram.copy_from_slice(&state.vram);
        memory.oam.copy_from_slice(&state.oam);
        memory.sram.copy_from_slice(&state.sram);

        self.bus.interrupt = state.interrupt.clone();
        self.bus.ppu = state.ppu.clone();

        // La cache di decodifica non sopravvive al ripristino
        let cycles = state.cycles;
        let halted = state.halted;
        let regs = state.regs.clone();
        self.cpu.reset();
        self.cpu.regs = regs;
        self.cpu.cycles = cycles;
        self.cpu.halted = halted;
        Ok(())
    }

    /// Scrive lo stato su file in formato JSON
    pub fn save_state_to_file(&self, path: &std::path::Path) -> Result<()> {
        let json = self
            .save_state()
            .to_json()
            .context("serializzazione save state")?;
        std::fs::write(path, json)
            .with_context(|| format!("scrittura save state in {}", path.display()))?;
        log::info!("save state scritto in {}", path.display());
        Ok(())
    }

    /// Ripristina lo stato da file
    pub fn load_state_from_file(&mut self, path: &std::path::Path) -> Result<()> {
        let json = std::fs::read_to_string(path)
            .with_context(|| format!("lettura save state da {}", path.display()))?;
        let state = SaveState::from_json(&json).context("parsing save state")?;
        self.restore_state(&state).context("ripristino save state")?;
        Ok(())
    }
}

impl Default for GbaSystem {
    fn default() -> Self {
        Self::new()
    }
}
