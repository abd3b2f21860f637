// Esecuzione istruzioni THUMB (16-bit)
//
// I 19 formati si riducono quasi tutti alle stesse classi dell'esecutore
// ARM: le ALU passano dagli stessi helper di flag, i load/store e i
// trasferimenti multipli riusano i handler di classe con l'indicizzazione
// fissata dal formato. Le particolarità THUMB stanno nei formati 5 (hi
// register), 14 (push/pop) e 19 (BL in due metà).

use crate::arm::{Condition, HalfwordKind};
use crate::cpu::{ARM7TDMI, MemoryBus};
use crate::instructions::{alu, block, branch, load_store};
use crate::shifter::{self, ShiftType};
use crate::thumb::{thumb_alu, ThumbInstruction};
use crate::timing;

impl ARM7TDMI {
    pub(crate) fn execute_thumb<M: MemoryBus>(
        &mut self,
        bus: &mut M,
        instr: ThumbInstruction,
    ) -> u32 {
        match instr {
            // Format 1: LSL/LSR/ASR con ammontare immediato, flags sempre
            ThumbInstruction::MoveShiftedRegister { op, offset, rs, rd } => {
                let ty = match op {
                    0 => ShiftType::Lsl,
                    1 => ShiftType::Lsr,
                    _ => ShiftType::Asr,
                };
                let carry_in = self.regs.flag_c();
                let (value, carry) =
                    shifter::shift_by_immediate(self.reg(rs), ty, offset as u32, carry_in);
                self.set_reg(rd, value);
                self.regs.set_nz(value);
                self.regs.set_flag_c(carry);
                timing::data_processing(false, false)
            }

            // Format 2: ADD/SUB a tre registri o con immediato a 3 bit
            ThumbInstruction::AddSubtract {
                sub,
                immediate,
                rn_offset,
                rs,
                rd,
            } => {
                let a = self.reg(rs);
                let b = if immediate {
                    rn_offset as u32
                } else {
                    self.reg(rn_offset)
                };
                let (value, c, v) = if sub {
                    alu::sub_with_flags(a, b, true)
                } else {
                    alu::add_with_flags(a, b, false)
                };
                self.set_reg(rd, value);
                self.regs.set_nz(value);
                self.regs.set_flag_c(c);
                self.regs.set_flag_v(v);
                timing::data_processing(false, false)
            }

            // Format 3: MOV/CMP/ADD/SUB con immediato a 8 bit
            ThumbInstruction::AluImmediate { op, rd, offset } => {
                let imm = offset as u32;
                match op {
                    0 => {
                        // MOV: solo N/Z
                        self.set_reg(rd, imm);
                        self.regs.set_nz(imm);
                    }
                    1 => {
                        let (value, c, v) = alu::sub_with_flags(self.reg(rd), imm, true);
                        self.regs.set_nz(value);
                        self.regs.set_flag_c(c);
                        self.regs.set_flag_v(v);
                    }
                    2 => {
                        let (value, c, v) = alu::add_with_flags(self.reg(rd), imm, false);
                        self.set_reg(rd, value);
                        self.regs.set_nz(value);
                        self.regs.set_flag_c(c);
                        self.regs.set_flag_v(v);
                    }
                    _ => {
                        let (value, c, v) = alu::sub_with_flags(self.reg(rd), imm, true);
                        self.set_reg(rd, value);
                        self.regs.set_nz(value);
                        self.regs.set_flag_c(c);
                        self.regs.set_flag_v(v);
                    }
                }
                timing::data_processing(false, false)
            }

            // Format 4: le 16 operazioni ALU registro-registro
            ThumbInstruction::AluOperation { op, rs, rd } => self.thumb_alu_op(op, rs, rd),

            // Format 5: hi register e BX, l'unico formato che vede R8-R15
            ThumbInstruction::HiRegisterOps { op, h1, h2, rs, rd } => {
                let rd_full = rd | ((h1 as u8) << 3);
                let rs_full = rs | ((h2 as u8) << 3);
                match op {
                    0 => {
                        // ADD senza flags; con Rd = PC il bit 0 viene azzerato
                        let value = self.reg(rd_full).wrapping_add(self.reg(rs_full));
                        self.set_reg(rd_full, value);
                        timing::data_processing(false, self.pc_written)
                    }
                    1 => {
                        // CMP: l'unico del formato che aggiorna i flag
                        let (value, c, v) =
                            alu::sub_with_flags(self.reg(rd_full), self.reg(rs_full), true);
                        self.regs.set_nz(value);
                        self.regs.set_flag_c(c);
                        self.regs.set_flag_v(v);
                        timing::data_processing(false, false)
                    }
                    2 => {
                        let value = self.reg(rs_full);
                        self.set_reg(rd_full, value);
                        timing::data_processing(false, self.pc_written)
                    }
                    _ => {
                        let target = self.reg(rs_full);
                        branch::execute_branch_exchange(self, target)
                    }
                }
            }

            // Format 6: LDR PC-relative, base word-aligned
            ThumbInstruction::LoadPcRelative { rd, offset } => {
                let base = self.reg(15) & !3;
                let value = bus.read_word(base.wrapping_add(offset as u32 * 4));
                self.set_reg(rd, value);
                timing::load_single(false)
            }

            // Format 7: load/store word/byte con offset da registro
            ThumbInstruction::LoadStoreRegOffset {
                load,
                byte,
                ro,
                rb,
                rd,
            } => {
                let offset = self.reg(ro);
                load_store::execute_single_transfer(
                    self, bus, load, byte, true, true, false, rb, rd, offset,
                )
            }

            // Format 8: halfword e sign-extended con offset da registro
            ThumbInstruction::LoadStoreSignExtended {
                h,
                sign,
                ro,
                rb,
                rd,
            } => {
                let kind = match (sign, h) {
                    (false, false) => HalfwordKind::StoreHalf,
                    (false, true) => HalfwordKind::LoadHalf,
                    (true, false) => HalfwordKind::LoadSignedByte,
                    (true, true) => HalfwordKind::LoadSignedHalf,
                };
                let offset = self.reg(ro);
                load_store::execute_halfword_transfer(
                    self, bus, kind, true, true, false, rb, rd, offset,
                )
            }

            // Format 9: load/store con offset immediato a 5 bit
            ThumbInstruction::LoadStoreImmOffset {
                load,
                byte,
                offset,
                rb,
                rd,
            } => {
                let offset = if byte {
                    offset as u32
                } else {
                    offset as u32 * 4
                };
                load_store::execute_single_transfer(
                    self, bus, load, byte, true, true, false, rb, rd, offset,
                )
            }

            // Format 10: halfword con offset immediato (scala 2)
            ThumbInstruction::LoadStoreHalfword {
                load,
                offset,
                rb,
                rd,
            } => {
                let kind = if load {
                    HalfwordKind::LoadHalf
                } else {
                    HalfwordKind::StoreHalf
                };
                load_store::execute_halfword_transfer(
                    self,
                    bus,
                    kind,
                    true,
                    true,
                    false,
                    rb,
                    rd,
                    offset as u32 * 2,
                )
            }

            // Format 11: load/store word relative allo stack pointer
            ThumbInstruction::LoadStoreSpRelative { load, rd, offset } => {
                load_store::execute_single_transfer(
                    self,
                    bus,
                    load,
                    false,
                    true,
                    true,
                    false,
                    13,
                    rd,
                    offset as u32 * 4,
                )
            }

            // Format 12: indirizzo da PC (word-aligned) o SP, senza flags
            ThumbInstruction::LoadAddress { sp, rd, offset } => {
                let base = if sp { self.reg(13) } else { self.reg(15) & !3 };
                self.set_reg(rd, base.wrapping_add(offset as u32 * 4));
                timing::data_processing(false, false)
            }

            // Format 13: ADD/SUB SP, #imm7*4
            ThumbInstruction::AddOffsetSp { sub, offset } => {
                let delta = offset as u32 * 4;
                let sp = self.reg(13);
                let value = if sub {
                    sp.wrapping_sub(delta)
                } else {
                    sp.wrapping_add(delta)
                };
                self.set_reg(13, value);
                timing::data_processing(false, false)
            }

            // Format 14: PUSH = STMDB SP!, POP = LDMIA SP!
            // POP con PC nella lista resta in THUMB (bit 0 azzerato, niente
            // semantica BX)
            ThumbInstruction::PushPop { load, r, rlist } => {
                let mut list = rlist as u16;
                if r {
                    list |= 1 << if load { 15 } else { 14 };
                }
                if load {
                    block::execute_block_transfer(self, bus, true, false, true, false, true, 13, list)
                } else {
                    block::execute_block_transfer(
                        self, bus, false, true, false, false, true, 13, list,
                    )
                }
            }

            // Format 15: LDMIA/STMIA con writeback sempre attivo
            ThumbInstruction::LoadStoreMultiple { load, rb, rlist } => block::execute_block_transfer(
                self,
                bus,
                load,
                false,
                true,
                false,
                true,
                rb,
                rlist as u16,
            ),

            // Format 16: branch condizionale (offset a 8 bit, scala 2)
            ThumbInstruction::ConditionalBranch { cond, offset } => {
                if Condition::from_bits(cond as u32).check(self.regs.cpsr) {
                    let target = self
                        .reg(15)
                        .wrapping_add(((offset as i32) << 1) as u32);
                    self.set_reg(15, target);
                    timing::branch()
                } else {
                    timing::COND_FAILED
                }
            }

            // Format 17: software interrupt
            ThumbInstruction::SoftwareInterrupt { .. } => self.exception_swi(),

            // Format 18: branch incondizionato (offset a 11 bit, scala 2)
            ThumbInstruction::UnconditionalBranch { offset } => {
                let target = self.reg(15).wrapping_add(((offset as i32) << 1) as u32);
                self.set_reg(15, target);
                timing::branch()
            }

            // Format 19: BL in due metà. La prima accumula l'offset alto in
            // LR; la seconda salta e lascia in LR l'indirizzo di ritorno con
            // il bit 0 a 1. La coppia non è interrompibile da IRQ.
            ThumbInstruction::LongBranchLink { first, offset } => {
                if first {
                    let mut high = offset as i32;
                    if high & 0x400 != 0 {
                        high |= !0x7FF;
                    }
                    let lr = self
                        .reg(15)
                        .wrapping_add(4)
                        .wrapping_add((high << 12) as u32);
                    self.regs.set_lr(lr);
                    self.bl_prefix = true;
                    timing::data_processing(false, false)
                } else {
                    let target = self.regs.lr().wrapping_add((offset as u32) << 1);
                    let return_addr = self.regs.pc().wrapping_add(2) | 1;
                    self.regs.set_lr(return_addr);
                    self.set_reg(15, target);
                    timing::branch()
                }
            }

            ThumbInstruction::Undefined { .. } => self.exception_undefined(),
        }
    }

    /// Format 4: ALU registro-registro su R0-R7
    fn thumb_alu_op(&mut self, op: u8, rs: u8, rd: u8) -> u32 {
        let rd_value = self.reg(rd);
        let rs_value = self.reg(rs);
        let carry_in = self.regs.flag_c();

        match op {
            thumb_alu::AND => {
                let value = rd_value & rs_value;
                self.set_reg(rd, value);
                self.regs.set_nz(value);
                timing::data_processing(false, false)
            }
            thumb_alu::EOR => {
                let value = rd_value ^ rs_value;
                self.set_reg(rd, value);
                self.regs.set_nz(value);
                timing::data_processing(false, false)
            }
            thumb_alu::LSL | thumb_alu::LSR | thumb_alu::ASR | thumb_alu::ROR => {
                let ty = match op {
                    thumb_alu::LSL => ShiftType::Lsl,
                    thumb_alu::LSR => ShiftType::Lsr,
                    thumb_alu::ASR => ShiftType::Asr,
                    _ => ShiftType::Ror,
                };
                let (value, carry) =
                    shifter::shift_by_register(rd_value, ty, rs_value & 0xFF, carry_in);
                self.set_reg(rd, value);
                self.regs.set_nz(value);
                self.regs.set_flag_c(carry);
                // Ammontare da registro: ciclo I in più come in ARM
                timing::data_processing(true, false)
            }
            thumb_alu::ADC => {
                let (value, c, v) = alu::add_with_flags(rd_value, rs_value, carry_in);
                self.set_reg(rd, value);
                self.regs.set_nz(value);
                self.regs.set_flag_c(c);
                self.regs.set_flag_v(v);
                timing::data_processing(false, false)
            }
            thumb_alu::SBC => {
                let (value, c, v) = alu::sub_with_flags(rd_value, rs_value, carry_in);
                self.set_reg(rd, value);
                self.regs.set_nz(value);
                self.regs.set_flag_c(c);
                self.regs.set_flag_v(v);
                timing::data_processing(false, false)
            }
            thumb_alu::TST => {
                self.regs.set_nz(rd_value & rs_value);
                timing::data_processing(false, false)
            }
            thumb_alu::NEG => {
                let (value, c, v) = alu::sub_with_flags(0, rs_value, true);
                self.set_reg(rd, value);
                self.regs.set_nz(value);
                self.regs.set_flag_c(c);
                self.regs.set_flag_v(v);
                timing::data_processing(false, false)
            }
            thumb_alu::CMP => {
                let (value, c, v) = alu::sub_with_flags(rd_value, rs_value, true);
                self.regs.set_nz(value);
                self.regs.set_flag_c(c);
                self.regs.set_flag_v(v);
                timing::data_processing(false, false)
            }
            thumb_alu::CMN => {
                let (value, c, v) = alu::add_with_flags(rd_value, rs_value, false);
                self.regs.set_nz(value);
                self.regs.set_flag_c(c);
                self.regs.set_flag_v(v);
                timing::data_processing(false, false)
            }
            thumb_alu::ORR => {
                let value = rd_value | rs_value;
                self.set_reg(rd, value);
                self.regs.set_nz(value);
                timing::data_processing(false, false)
            }
            thumb_alu::MUL => {
                let value = rd_value.wrapping_mul(rs_value);
                self.set_reg(rd, value);
                // Solo N/Z: C e V restano invariati
                self.regs.set_nz(value);
                timing::multiply(rs_value, false)
            }
            thumb_alu::BIC => {
                let value = rd_value & !rs_value;
                self.set_reg(rd, value);
                self.regs.set_nz(value);
                timing::data_processing(false, false)
            }
            _ => {
                // MVN
                let value = !rs_value;
                self.set_reg(rd, value);
                self.regs.set_nz(value);
                timing::data_processing(false, false)
            }
        }
    }
}
