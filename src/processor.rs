//! The single-cycle RV32I/M datapath.
//!
//! One call to [`Processor::step`] fetches, decodes, executes, performs
//! any memory access, writes back, and updates the program counter for
//! exactly one instruction — matching the fetch-decode-execute-memory-
//! writeback-control stages spec.md §4.2 lays out. [`Processor::run`]
//! repeats `step` until either halt condition (spec.md §4.2, §9) is
//! reached.

use crate::decode::{decode, DecodeError};
use crate::isa::{AluOp, BranchOp, Opcode, WbSel};
use crate::memory::{Memory, MemoryError};
use crate::register_file::RegisterFile;
use thiserror::Error;
use tracing::{error, trace};

/// Register x31 holding this value is the sentinel halt condition.
pub const HALT_SENTINEL: u32 = 0xDEAD_BEEF;

#[derive(Error, Debug, PartialEq, Eq)]
pub enum ExecutionError {
    #[error("decode failed at pc=0x{pc:x}: {source}")]
    Decode {
        pc: u32,
        #[source]
        source: DecodeError,
    },
    #[error("memory access failed at pc=0x{pc:x} (instruction 0x{word:08x}): {source}")]
    Memory {
        pc: u32,
        word: u32,
        #[source]
        source: MemoryError,
    },
}

/// Errors raised while loading an object file onto the processor's
/// instruction memory — a malformed line or an image too large for
/// IMEM, both realistic user-input conditions rather than invariant
/// violations.
#[derive(Error, Debug, PartialEq, Eq)]
pub enum LoadError {
    #[error("line {line}: not a 32-character binary instruction word: {source}")]
    MalformedWord {
        line: usize,
        #[source]
        source: std::num::ParseIntError,
    },
    #[error("line {line}: program image exceeds instruction memory capacity: {source}")]
    Capacity {
        line: usize,
        #[source]
        source: MemoryError,
    },
}

#[derive(Debug)]
pub struct Processor {
    clock: u64,
    pc: u32,
    registers: RegisterFile,
    imem: Memory,
    dmem: Memory,
}

impl Default for Processor {
    fn default() -> Self {
        Self::new()
    }
}

impl Processor {
    pub fn new() -> Self {
        Self {
            clock: 0,
            pc: 0,
            registers: RegisterFile::new(),
            imem: Memory::new(),
            dmem: Memory::new(),
        }
    }

    /// Load a program image: one 4-byte instruction word per non-blank
    /// line of binary text (`lines` may also contain blank lines, which
    /// the assembler emits for blank/label-only source lines; those are
    /// skipped and do not consume an instruction address — see
    /// SPEC_FULL.md §4.1).
    pub fn load_program<I, S>(&mut self, lines: I) -> Result<(), LoadError>
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut addr = 0usize;
        for (idx, line) in lines.into_iter().enumerate() {
            let line_no = idx + 1;
            let line = line.as_ref().trim_end_matches(['\n', '\r']);
            if line.is_empty() {
                continue;
            }
            let word = u32::from_str_radix(line.trim(), 2).map_err(|source| {
                let err = LoadError::MalformedWord { line: line_no, source };
                error!(line = line_no, %err, "fatal error loading program image");
                err
            })?;
            self.imem.write_word(addr, word).map_err(|source| {
                let err = LoadError::Capacity { line: line_no, source };
                error!(line = line_no, %err, "fatal error loading program image");
                err
            })?;
            addr += 4;
        }
        Ok(())
    }

    pub fn pc(&self) -> u32 {
        self.pc
    }

    pub fn clock(&self) -> u64 {
        self.clock
    }

    pub fn registers(&self) -> &RegisterFile {
        &self.registers
    }

    /// Execute exactly one instruction. Returns `Ok(true)` if the
    /// processor halted (either condition from spec.md §4.2), `Ok(false)`
    /// if execution should continue, or `Err` on a runtime error.
    pub fn step(&mut self) -> Result<bool, ExecutionError> {
        if self.registers.get(31) == HALT_SENTINEL {
            return Ok(true);
        }

        let word = self.imem.read_word(self.pc as usize).map_err(|source| {
            let err = ExecutionError::Memory { pc: self.pc, word: 0, source };
            error!(pc = self.pc, %err, "fatal error fetching instruction");
            err
        })?;

        if word == 0 {
            // Soft halt: accommodates programs that fall off the end
            // without setting x31 (spec.md §4.2, §9).
            return Ok(true);
        }

        let decoded = decode(word).map_err(|source| {
            let err = ExecutionError::Decode { pc: self.pc, source };
            error!(pc = self.pc, word = format!("{word:08x}"), %err, "fatal decode error");
            err
        })?;
        trace!(pc = self.pc, word = format!("{word:08x}"), ?decoded.opcode, "retiring instruction");

        let rs1_value = self.registers.get(decoded.rs1);
        let rs2_value = self.registers.get(decoded.rs2);

        let a = if decoded.flags.a_sel { self.pc } else { rs1_value };
        let b = if decoded.flags.b_sel {
            decoded.imm as u32
        } else {
            rs2_value
        };

        let (alu_result, branch_taken) = match decoded.opcode {
            Opcode::Branch => {
                let taken = evaluate_branch(
                    decoded.branch_op.expect("BRANCH decodes a branch_op"),
                    rs1_value,
                    rs2_value,
                );
                (self.pc.wrapping_add(decoded.imm as u32), taken)
            }
            _ => (alu_execute(decoded.alu_op.unwrap_or(AluOp::Add), a, b, decoded.opcode), false),
        };

        let memory_value = match decoded.opcode {
            Opcode::Load => Some(self.dmem.read_word(alu_result as usize).map_err(|source| {
                let err = ExecutionError::Memory { pc: self.pc, word, source };
                error!(pc = self.pc, word = format!("{word:08x}"), %err, "fatal memory error on load");
                err
            })?),
            Opcode::Store => {
                self.dmem
                    .write_word(alu_result as usize, rs2_value)
                    .map_err(|source| {
                        let err = ExecutionError::Memory { pc: self.pc, word, source };
                        error!(pc = self.pc, word = format!("{word:08x}"), %err, "fatal memory error on store");
                        err
                    })?;
                None
            }
            _ => None,
        };

        let next_pc = self.pc.wrapping_add(4);
        let write_back_value = match decoded.flags.wb_sel {
            WbSel::None => None,
            WbSel::Alu => Some(alu_result),
            WbSel::Memory => memory_value,
            WbSel::PcPlus4 => Some(next_pc),
        };
        if let Some(value) = write_back_value {
            self.registers.set(decoded.rd, value);
        }

        let pc_sel = match decoded.opcode {
            Opcode::Branch => branch_taken,
            _ => decoded.flags.pc_sel,
        };
        self.pc = if pc_sel { alu_result } else { next_pc };

        self.clock += 1;
        Ok(false)
    }

    /// Run until halted or a runtime error occurs.
    pub fn run(&mut self) -> Result<(), ExecutionError> {
        loop {
            if self.step()? {
                return Ok(());
            }
        }
    }

    pub fn print_statistics(&self) {
        println!("Processor's clock cycles: {}", self.clock);
    }

    pub fn dump_registers(&self) {
        println!(">>>>>>>>[REGISTER DUMP]<<<<<<<");
        println!("PC: = {}", self.pc);
        for (n, value) in self.registers.iter().enumerate() {
            println!("x{n:02} = {}", value as i32);
        }
        println!(">>>>>>>>>>>>>>>>>>>>>>>>>>>>>>");
    }

    pub fn dump_memory(&self) {
        println!(">>>>>>>>[MEMORY DUMP]<<<<<<<<<");
        for addr in self.dmem.touched_addresses() {
            println!("{addr:x} : {}", self.dmem.read_byte(addr));
        }
        println!(">>>>>>>>>>>>>>>>>>>>>>>>>>>>>>");
    }
}

fn evaluate_branch(op: BranchOp, rs1: u32, rs2: u32) -> bool {
    let eq = rs1 == rs2;
    let lt = if op.is_unsigned() {
        rs1 < rs2
    } else {
        (rs1 as i32) < (rs2 as i32)
    };
    match op {
        BranchOp::Beq => eq,
        BranchOp::Bne => !eq,
        BranchOp::Blt | BranchOp::Bltu => lt,
        BranchOp::Bge | BranchOp::Bgeu => !lt,
    }
}

fn alu_execute(op: AluOp, a: u32, b: u32, opcode: Opcode) -> u32 {
    // LUI ignores operand A (spec.md §4.2 decode table: a_sel = false),
    // so the immediate alone (already placed in B via b_sel) is the
    // result; every other opcode that reaches the ALU adds/combines A
    // and B per the selected operation.
    if let Opcode::Lui = opcode {
        return b;
    }
    match op {
        AluOp::Add => a.wrapping_add(b),
        AluOp::Sub => a.wrapping_sub(b),
        AluOp::Xor => a ^ b,
        AluOp::Or => a | b,
        AluOp::And => a & b,
        AluOp::Sll => a.wrapping_shl(b & 0x1f),
        AluOp::Srl => a.wrapping_shr(b & 0x1f),
        AluOp::Mul => (a as i64).wrapping_mul(b as i64) as u32,
        AluOp::Div => signed_div(a as i32, b as i32) as u32,
        AluOp::Rem => signed_rem(a as i32, b as i32) as u32,
    }
}

/// RISC-V M-extension DIV semantics: division by zero yields -1;
/// INT_MIN / -1 yields INT_MIN (no host-level overflow trap).
fn signed_div(dividend: i32, divisor: i32) -> i32 {
    if divisor == 0 {
        -1
    } else if dividend == i32::MIN && divisor == -1 {
        i32::MIN
    } else {
        dividend.wrapping_div(divisor)
    }
}

/// RISC-V M-extension REM semantics: remainder by zero yields the
/// dividend; INT_MIN % -1 yields 0.
fn signed_rem(dividend: i32, divisor: i32) -> i32 {
    if divisor == 0 {
        dividend
    } else if dividend == i32::MIN && divisor == -1 {
        0
    } else {
        dividend.wrapping_rem(divisor)
    }
}
