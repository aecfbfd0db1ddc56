//! A two-pass assembler for the subset of RV32I/M this crate simulates.
//!
//! Pass one walks the source once, building a symbol table that maps
//! each label to the *byte address* of the instruction it labels (not
//! the source line number — see SPEC_FULL.md §4.1/§9 for why the
//! line-counting approach the original tool used is a latent bug with
//! label-only lines). Pass two re-walks the source in lockstep,
//! encoding every instruction line and resolving branch/jump
//! displacements against that table.
//!
//! The object format is one line per source line: a 32-character
//! binary string for an instruction, or a blank line for anything that
//! produced no instruction (blank lines, comment-only lines,
//! label-only lines). [`crate::processor::Processor::load_program`]
//! skips the blank lines, so they do not consume instruction addresses
//! on the simulator side either.

pub mod encode;
pub mod errors;

use encode::Format;
pub use errors::AssemblyError;
use std::collections::HashMap;
use tracing::{debug, error, warn};

type SymbolTable = HashMap<String, u32>;

/// Strip a trailing `# comment` and surrounding whitespace.
fn strip_comment(line: &str) -> &str {
    match line.find('#') {
        Some(idx) => line[..idx].trim(),
        None => line.trim(),
    }
}

/// Split a leading `label:` off a line, if present.
fn split_label(line: &str) -> (Option<&str>, &str) {
    if let Some(idx) = line.find(':') {
        let (candidate, rest) = line.split_at(idx);
        let candidate = candidate.trim();
        if !candidate.is_empty() && candidate.chars().all(|c| c.is_alphanumeric() || c == '_') {
            return (Some(candidate), rest[1..].trim());
        }
    }
    (None, line)
}

/// Expand a `imm(xN)` operand (used by `lw`, `sw`, `jalr`) into two
/// separate tokens, leaving every other operand untouched.
fn expand_operand(token: &str) -> Vec<String> {
    if let Some(open) = token.find('(') {
        if let Some(close) = token.find(')') {
            let imm = token[..open].trim().to_string();
            let reg = token[open + 1..close].trim().to_string();
            return vec![imm, reg];
        }
    }
    vec![token.trim().to_string()]
}

fn operands_of(rest: &str) -> (&str, Vec<String>) {
    let rest = rest.trim();
    let mnemonic_end = rest.find(char::is_whitespace).unwrap_or(rest.len());
    let mnemonic = &rest[..mnemonic_end];
    let tail = rest[mnemonic_end..].trim();
    let operands = if tail.is_empty() {
        Vec::new()
    } else {
        tail.split(',').flat_map(expand_operand).collect()
    };
    (mnemonic, operands)
}

fn parse_register(token: &str, line: usize) -> Result<u8, AssemblyError> {
    let invalid = || AssemblyError::InvalidRegister {
        line,
        token: token.to_string(),
    };
    let digits = token.strip_prefix('x').ok_or_else(invalid)?;
    let n: u8 = digits.parse().map_err(|_| invalid())?;
    if n < 32 {
        Ok(n)
    } else {
        Err(invalid())
    }
}

fn parse_immediate(token: &str, line: usize) -> Result<i64, AssemblyError> {
    let token = token.trim();
    let (negative, digits) = match token.strip_prefix('-') {
        Some(rest) => (true, rest),
        None => (false, token),
    };
    let magnitude = if let Some(hex) = digits.strip_prefix("0x").or_else(|| digits.strip_prefix("0X")) {
        i64::from_str_radix(hex, 16)
    } else {
        digits.parse::<i64>()
    }
    .map_err(|_| AssemblyError::InvalidImmediate {
        line,
        token: token.to_string(),
    })?;
    Ok(if negative { -magnitude } else { magnitude })
}

fn check_fits(value: i64, width: u32, line: usize) -> Result<i32, AssemblyError> {
    let min = -(1i64 << (width - 1));
    let max = (1i64 << (width - 1)) - 1;
    if value < min || value > max {
        return Err(AssemblyError::ImmediateOutOfRange { line, value, width });
    }
    Ok(value as i32)
}

/// `lui`/`auipc` conventionally take their 20-bit upper immediate
/// written as a plain unsigned value (e.g. `0xDEADC`), not a
/// sign-extended one — accept either form.
fn check_fits_upper20(value: i64, line: usize) -> Result<i32, AssemblyError> {
    let min = -(1i64 << 19);
    let max = (1i64 << 20) - 1;
    if value < min || value > max {
        return Err(AssemblyError::ImmediateOutOfRange {
            line,
            value,
            width: 20,
        });
    }
    Ok(value as i32)
}

/// Walk the source once and return every label's instruction byte
/// address, per the addressing rule in SPEC_FULL.md §4.1: a line
/// advances the running address only if it carries a mnemonic after
/// any label prefix is stripped.
fn build_symbol_table(source: &str) -> Result<SymbolTable, AssemblyError> {
    let mut labels = SymbolTable::new();
    let mut defined_on: HashMap<String, usize> = HashMap::new();
    let mut addr: u32 = 0;

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let line = strip_comment(raw_line);
        if line.is_empty() {
            continue;
        }
        let (label, rest) = split_label(line);
        if let Some(label) = label {
            if let Some(&first) = defined_on.get(label) {
                let err = AssemblyError::DuplicateLabel {
                    line: line_no,
                    label: label.to_string(),
                    first_defined_on: first,
                };
                warn!(line = line_no, label, first_defined_on = first, "duplicate label redefinition");
                return Err(err);
            }
            defined_on.insert(label.to_string(), line_no);
            labels.insert(label.to_string(), addr);
            debug!(label, addr, "label resolved");
        }
        if !rest.is_empty() {
            addr = addr.wrapping_add(4);
        }
    }
    Ok(labels)
}

fn encode_line(
    line_no: usize,
    addr: u32,
    mnemonic: &str,
    operands: &[String],
    labels: &SymbolTable,
) -> Result<u32, AssemblyError> {
    let info = encode::lookup(mnemonic).ok_or_else(|| AssemblyError::UnknownMnemonic {
        line: line_no,
        mnemonic: mnemonic.to_string(),
    })?;

    let expect = |n: usize| -> Result<(), AssemblyError> {
        if operands.len() != n {
            Err(AssemblyError::WrongOperandCount {
                line: line_no,
                mnemonic: mnemonic.to_string(),
                expected: n,
                found: operands.len(),
            })
        } else {
            Ok(())
        }
    };

    let resolve_label = |name: &str| -> Result<u32, AssemblyError> {
        labels.get(name).copied().ok_or_else(|| AssemblyError::UndefinedLabel {
            line: line_no,
            label: name.to_string(),
        })
    };

    Ok(match info.format {
        Format::R => {
            expect(3)?;
            let rd = parse_register(&operands[0], line_no)?;
            let rs1 = parse_register(&operands[1], line_no)?;
            let rs2 = parse_register(&operands[2], line_no)?;
            encode::encode_r(info, rd, rs1, rs2)
        }
        Format::I if mnemonic == "lw" || mnemonic == "jalr" => {
            expect(3)?;
            let rd = parse_register(&operands[0], line_no)?;
            let imm = check_fits(parse_immediate(&operands[1], line_no)?, 12, line_no)?;
            let rs1 = parse_register(&operands[2], line_no)?;
            encode::encode_i(info, rd, rs1, imm)
        }
        Format::I => {
            expect(3)?;
            let rd = parse_register(&operands[0], line_no)?;
            let rs1 = parse_register(&operands[1], line_no)?;
            let imm = check_fits(parse_immediate(&operands[2], line_no)?, 12, line_no)?;
            encode::encode_i(info, rd, rs1, imm)
        }
        Format::S => {
            expect(3)?;
            let rs2 = parse_register(&operands[0], line_no)?;
            let imm = check_fits(parse_immediate(&operands[1], line_no)?, 12, line_no)?;
            let rs1 = parse_register(&operands[2], line_no)?;
            encode::encode_s(info, rs1, rs2, imm)
        }
        Format::B => {
            expect(3)?;
            let rs1 = parse_register(&operands[0], line_no)?;
            let rs2 = parse_register(&operands[1], line_no)?;
            let target = resolve_label(&operands[2])?;
            let imm = check_fits(target as i64 - addr as i64, 13, line_no)?;
            encode::encode_b(info, rs1, rs2, imm)
        }
        Format::U => {
            expect(2)?;
            let rd = parse_register(&operands[0], line_no)?;
            let raw = check_fits_upper20(parse_immediate(&operands[1], line_no)?, line_no)?;
            encode::encode_u(info, rd, raw << 12)
        }
        Format::J => {
            expect(2)?;
            let rd = parse_register(&operands[0], line_no)?;
            let target = resolve_label(&operands[1])?;
            let imm = check_fits(target as i64 - addr as i64, 21, line_no)?;
            encode::encode_j(info, rd, imm)
        }
    })
}

/// Assemble `source` into an object-file image: one text line per
/// source line, 32 `0`/`1` characters for an instruction or blank for
/// a non-instruction line.
pub fn assemble(source: &str) -> Result<String, AssemblyError> {
    let labels = build_symbol_table(source).map_err(|err| {
        error!(%err, "assembly aborted while building the symbol table");
        err
    })?;
    let mut out = String::new();
    let mut addr: u32 = 0;

    for (idx, raw_line) in source.lines().enumerate() {
        let line_no = idx + 1;
        let line = strip_comment(raw_line);
        if line.is_empty() {
            out.push('\n');
            continue;
        }
        let (_label, rest) = split_label(line);
        if rest.is_empty() {
            out.push('\n');
            continue;
        }
        let (mnemonic, operands) = operands_of(rest);
        let word = encode_line(line_no, addr, mnemonic, &operands, &labels).map_err(|err| {
            error!(line = line_no, %err, "assembly aborted while encoding an instruction");
            err
        })?;
        out.push_str(&format!("{word:032b}\n"));
        addr = addr.wrapping_add(4);
    }
    Ok(out)
}
