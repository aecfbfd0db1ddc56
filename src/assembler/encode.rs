//! Per-format instruction encoders, the mirror image of `crate::decode`.
//!
//! Each encoder packs an opcode/funct selector (looked up by mnemonic
//! via [`lookup`]) together with register numbers and/or an immediate
//! into a 32-bit instruction word, using the same bit layouts
//! `crate::fields`'s extraction macros read back out.

use crate::isa::{
    FUNCT3_BEQ, FUNCT3_BGE, FUNCT3_BGEU, FUNCT3_BLT, FUNCT3_BLTU, FUNCT3_BNE, OP_ALU_IMM,
    OP_ALU_REG, OP_AUIPC, OP_BRANCH, OP_JAL, OP_JALR, OP_LOAD, OP_LUI, OP_STORE,
};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Format {
    R,
    I,
    S,
    B,
    U,
    J,
}

#[derive(Debug, Clone, Copy)]
pub struct MnemonicInfo {
    pub format: Format,
    pub opcode: u32,
    pub funct3: u32,
    pub funct7: u32,
}

/// Resolve a lowercase mnemonic to its encoding, or `None` if it is not
/// one of the mnemonics this assembler recognizes.
pub fn lookup(mnemonic: &str) -> Option<MnemonicInfo> {
    use Format::*;
    let (format, opcode, funct3, funct7) = match mnemonic {
        "add" => (R, OP_ALU_REG, 0b000, 0b0000000),
        "sub" => (R, OP_ALU_REG, 0b000, 0b0100000),
        "mul" => (R, OP_ALU_REG, 0b000, 0b0000001),
        "div" => (R, OP_ALU_REG, 0b100, 0b0000001),
        "rem" => (R, OP_ALU_REG, 0b110, 0b0000001),
        "or" => (R, OP_ALU_REG, 0b110, 0b0000000),
        "xor" => (R, OP_ALU_REG, 0b100, 0b0000000),
        "and" => (R, OP_ALU_REG, 0b111, 0b0000000),
        "sll" => (R, OP_ALU_REG, 0b001, 0b0000000),
        "srl" => (R, OP_ALU_REG, 0b101, 0b0000000),
        "lw" => (I, OP_LOAD, 0b010, 0),
        "addi" => (I, OP_ALU_IMM, 0b000, 0),
        "slli" => (I, OP_ALU_IMM, 0b001, 0),
        "srli" => (I, OP_ALU_IMM, 0b101, 0),
        "xori" => (I, OP_ALU_IMM, 0b100, 0),
        "ori" => (I, OP_ALU_IMM, 0b110, 0),
        "andi" => (I, OP_ALU_IMM, 0b111, 0),
        "jalr" => (I, OP_JALR, 0b000, 0),
        "sw" => (S, OP_STORE, 0b010, 0),
        "beq" => (B, OP_BRANCH, FUNCT3_BEQ, 0),
        "bne" => (B, OP_BRANCH, FUNCT3_BNE, 0),
        "blt" => (B, OP_BRANCH, FUNCT3_BLT, 0),
        "bge" => (B, OP_BRANCH, FUNCT3_BGE, 0),
        "bltu" => (B, OP_BRANCH, FUNCT3_BLTU, 0),
        "bgeu" => (B, OP_BRANCH, FUNCT3_BGEU, 0),
        "lui" => (U, OP_LUI, 0, 0),
        "auipc" => (U, OP_AUIPC, 0, 0),
        "jal" => (J, OP_JAL, 0, 0),
        _ => return None,
    };
    Some(MnemonicInfo {
        format,
        opcode,
        funct3,
        funct7,
    })
}

pub fn encode_r(info: MnemonicInfo, rd: u8, rs1: u8, rs2: u8) -> u32 {
    (info.funct7 << 25)
        | ((rs2 as u32) << 20)
        | ((rs1 as u32) << 15)
        | (info.funct3 << 12)
        | ((rd as u32) << 7)
        | info.opcode
}

pub fn encode_i(info: MnemonicInfo, rd: u8, rs1: u8, imm: i32) -> u32 {
    ((imm as u32 & 0xfff) << 20)
        | ((rs1 as u32) << 15)
        | (info.funct3 << 12)
        | ((rd as u32) << 7)
        | info.opcode
}

pub fn encode_s(info: MnemonicInfo, rs1: u8, rs2: u8, imm: i32) -> u32 {
    let imm = imm as u32;
    let imm11_5 = (imm >> 5) & 0x7f;
    let imm4_0 = imm & 0x1f;
    (imm11_5 << 25)
        | ((rs2 as u32) << 20)
        | ((rs1 as u32) << 15)
        | (info.funct3 << 12)
        | (imm4_0 << 7)
        | info.opcode
}

pub fn encode_b(info: MnemonicInfo, rs1: u8, rs2: u8, imm: i32) -> u32 {
    let imm = imm as u32;
    let imm12 = (imm >> 12) & 1;
    let imm11 = (imm >> 11) & 1;
    let imm10_5 = (imm >> 5) & 0x3f;
    let imm4_1 = (imm >> 1) & 0xf;
    (imm12 << 31)
        | (imm10_5 << 25)
        | ((rs2 as u32) << 20)
        | ((rs1 as u32) << 15)
        | (info.funct3 << 12)
        | (imm4_1 << 8)
        | (imm11 << 7)
        | info.opcode
}

/// `imm` is the full 32-bit value whose low 12 bits are always zero (as
/// produced by `crate::fields::imm_utype!` when decoding).
pub fn encode_u(info: MnemonicInfo, rd: u8, imm: i32) -> u32 {
    ((imm as u32) & 0xffff_f000) | ((rd as u32) << 7) | info.opcode
}

pub fn encode_j(info: MnemonicInfo, rd: u8, imm: i32) -> u32 {
    let imm = imm as u32;
    let imm20 = (imm >> 20) & 1;
    let imm19_12 = (imm >> 12) & 0xff;
    let imm11 = (imm >> 11) & 1;
    let imm10_1 = (imm >> 1) & 0x3ff;
    (imm20 << 31) | (imm10_1 << 21) | (imm11 << 20) | (imm19_12 << 12) | ((rd as u32) << 7) | info.opcode
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::decode::decode;

    #[test]
    fn encode_add_decodes_back_to_add() {
        let info = lookup("add").unwrap();
        let word = encode_r(info, 3, 1, 2);
        let d = decode(word).unwrap();
        assert_eq!(d.alu_op, Some(crate::isa::AluOp::Add));
        assert_eq!((d.rs1, d.rs2, d.rd), (1, 2, 3));
    }

    #[test]
    fn encode_addi_negative_immediate_round_trips() {
        let info = lookup("addi").unwrap();
        let word = encode_i(info, 1, 0, -17);
        let d = decode(word).unwrap();
        assert_eq!(d.imm, -17);
    }

    #[test]
    fn encode_sw_lw_share_the_same_immediate_layout() {
        let sw = lookup("sw").unwrap();
        let lw = lookup("lw").unwrap();
        let sw_word = encode_s(sw, 1, 2, -4);
        let lw_word = encode_i(lw, 3, 1, -4);
        assert_eq!(decode(sw_word).unwrap().imm, -4);
        assert_eq!(decode(lw_word).unwrap().imm, -4);
    }

    #[test]
    fn encode_branch_round_trips_a_negative_displacement() {
        let info = lookup("blt").unwrap();
        let word = encode_b(info, 1, 2, -16);
        let d = decode(word).unwrap();
        assert_eq!(d.imm, -16);
        assert_eq!(d.branch_op, Some(crate::isa::BranchOp::Blt));
    }

    #[test]
    fn encode_jal_round_trips_a_forward_displacement() {
        let info = lookup("jal").unwrap();
        let word = encode_j(info, 1, 1024);
        let d = decode(word).unwrap();
        assert_eq!(d.imm, 1024);
    }

    #[test]
    fn encode_lui_places_immediate_in_upper_bits() {
        let info = lookup("lui").unwrap();
        let word = encode_u(info, 5, 0x1234_5000u32 as i32);
        let d = decode(word).unwrap();
        assert_eq!(d.imm, 0x1234_5000u32 as i32);
    }

    #[test]
    fn unknown_mnemonic_is_not_found() {
        assert!(lookup("nope").is_none());
    }
}
