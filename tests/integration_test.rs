//! End-to-end scenarios: assemble a snippet, load it onto a fresh
//! processor, run to completion, and check the final architectural
//! state. Each scenario corresponds to one of the concrete examples in
//! SPEC_FULL.md §8.

use rv32sim::assembler::assemble;
use rv32sim::processor::{Processor, HALT_SENTINEL};

/// `lui`/`addi` pair that loads the full 32-bit halt sentinel into a
/// register, written as assembly source. A single `addi` can only
/// sign-extend a 12-bit immediate, so it cannot reach `0xDEADBEEF` on
/// its own — SPEC_FULL.md's scenario text assumes an immediate wider
/// than the field actually allows; this is the idiomatic equivalent.
fn halt_source(rd: &str) -> String {
    let target = HALT_SENTINEL;
    let upper = target.wrapping_add(0x800) >> 12;
    let lower = target.wrapping_sub(upper << 12) as i32;
    format!("lui {rd}, {upper}\naddi {rd}, {rd}, {lower}\n")
}

fn assemble_and_run(source: &str) -> Processor {
    let object = assemble(source).expect("assembly should succeed");
    let mut processor = Processor::new();
    processor
        .load_program(object.lines())
        .expect("object file should load");
    processor.run().expect("execution should not error");
    processor
}

#[test]
fn arithmetic_then_halt() {
    let source = format!(
        "addi x1, x0, 5\naddi x2, x0, 7\nadd x3, x1, x2\n{}",
        halt_source("x31")
    );
    let p = assemble_and_run(&source);
    assert_eq!(p.registers().get(1), 5);
    assert_eq!(p.registers().get(2), 7);
    assert_eq!(p.registers().get(3), 12);
    assert_eq!(p.registers().get(31), HALT_SENTINEL);
    assert_eq!(p.clock(), 5);
}

#[test]
fn lui_then_addi_produces_0x00000fff() {
    let source = "lui x1, 1\naddi x1, x1, -1\n";
    let p = assemble_and_run(source);
    assert_eq!(p.registers().get(1), 0x0000_0FFF);
}

#[test]
fn srli_of_all_ones_is_logical_not_arithmetic() {
    let source = "addi x1, x0, -1\nsrli x2, x1, 1\n";
    let p = assemble_and_run(source);
    assert_eq!(p.registers().get(2), 0x7FFF_FFFF);
}

#[test]
fn div_and_rem_of_negative_dividend() {
    let source = "addi x1, x0, -8\naddi x2, x0, 3\ndiv x3, x1, x2\nrem x4, x1, x2\n";
    let p = assemble_and_run(source);
    assert_eq!(p.registers().get(3) as i32, -2);
    assert_eq!(p.registers().get(4) as i32, -2);
}

#[test]
fn loop_with_a_branch_never_taken_and_a_branch_always_taken() {
    let source = "\
        addi x1, x0, 0\n\
        L: addi x1, x1, 1\n\
        blt x1, x0, L\n\
        bge x1, x1, END\n\
        END:\n\
    ";
    let p = assemble_and_run(source);
    assert_eq!(p.registers().get(1), 1);
}

#[test]
fn store_then_load_round_trips_through_data_memory() {
    let source = "addi x1, x0, 100\naddi x2, x0, 42\nsw x2, 0(x1)\nlw x3, 0(x1)\n";
    let p = assemble_and_run(source);
    assert_eq!(p.registers().get(3), 42);
}

#[test]
fn assembling_from_a_real_file_on_disk() {
    let dir = tempfile::tempdir().expect("failed to create temp dir");
    let source_path = dir.path().join("program.s");
    std::fs::write(&source_path, "addi x1, x0, 9\naddi x2, x0, 3\nadd x3, x1, x2\n")
        .expect("failed to write source file");

    let source = std::fs::read_to_string(&source_path).expect("failed to read source file");
    let object = assemble(&source).expect("assembly should succeed");

    let object_path = dir.path().join("program.obj");
    std::fs::write(&object_path, &object).expect("failed to write object file");
    let reloaded = std::fs::read_to_string(&object_path).expect("failed to read object file");

    let mut processor = Processor::new();
    processor.load_program(reloaded.lines()).unwrap();
    processor.run().unwrap();
    assert_eq!(processor.registers().get(3), 12);
}

#[test]
fn assembler_rejects_the_first_error_with_its_line_number() {
    let source = "addi x1, x0, 1\nunknown_mnemonic x1, x2\naddi x3, x0, 1\n";
    let err = assemble(source).unwrap_err();
    assert!(err.to_string().contains("line 2"));
}
