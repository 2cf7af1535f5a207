//! End-to-end tests of the text pipeline: parsing, loop unrolling with
//! label renaming, emission, and execution of an unrolled program.

use transient_trace_extractor::{
    assembly::{emitter, parser},
    cfg::unroll::unroll,
    expr::Expr,
    vm::{state::Configuration, Config, VM},
};

const LOOP_SOURCE: &str = "\
load x, 0
LoopStart:
add x, x, 1
beqz x, LoopStart
";

#[test]
fn unrolling_replicates_the_body_and_renames_back_edges() {
    let program = parser::parse(LOOP_SOURCE).expect("Parsing errored");
    let unrolled = unroll(&program, 3).expect("Unrolling errored");

    // Ten instructions at addresses 0..=9: the prefix, then three replicas
    // each closed by a jump to the program end.
    assert_eq!(unrolled.len(), 10);

    let rendered: Vec<String> = unrolled
        .instructions
        .iter()
        .map(|i| i.opcode.to_string())
        .collect();
    assert_eq!(
        rendered,
        vec![
            "load x, 0",
            "add x, x, 1",
            "beqz x, LoopStart_0",
            "jmp programEnd",
            "add x, x, 1",
            "beqz x, LoopStart_1",
            "jmp programEnd",
            "add x, x, 1",
            "beqz x, LoopStart_2",
            "jmp programEnd",
        ]
    );

    // Each replica's back edge lands on the next replica's start; the last
    // one falls out at the program end.
    assert_eq!(unrolled.labels.get("LoopStart"), Some(&1));
    assert_eq!(unrolled.labels.get("LoopStart_0"), Some(&4));
    assert_eq!(unrolled.labels.get("LoopStart_1"), Some(&7));
    assert_eq!(unrolled.labels.get("LoopStart_2"), Some(&10));
    assert_eq!(unrolled.labels.get("programEnd"), Some(&10));
}

#[test]
fn unrolled_programs_execute_to_the_program_end() -> anyhow::Result<()> {
    let program = parser::parse(LOOP_SOURCE)?;
    let unrolled = unroll(&program, 3)?;
    let resolved = unrolled.resolve_labels();

    let initial = Configuration::default().with_memory(0, Expr::Concrete(1));
    let mut vm = VM::new(resolved, initial, Config::default());
    vm.execute()?;

    let result = vm.consume();
    assert!(result.errors.is_empty(), "unexpected warnings: {}", result.errors);
    assert!(!result.terminals.is_empty());
    assert!(result.terminals.iter().all(|t| t.pc == 10));

    Ok(())
}

#[test]
fn label_operands_resolve_to_addresses_after_unrolling() {
    let program = parser::parse(LOOP_SOURCE).expect("Parsing errored");
    let resolved = unroll(&program, 2).expect("Unrolling errored").resolve_labels();

    // Every control-flow operand is now an integer literal.
    for instruction in &resolved.instructions {
        if matches!(instruction.opcode.mnemonic.as_str(), "jmp" | "beqz") {
            let target = instruction
                .opcode
                .operands
                .last()
                .expect("Control flow always has a target");
            assert!(
                target.parse::<u32>().is_ok(),
                "unresolved target {target} at {}",
                instruction.address
            );
        }
    }
}

#[test]
fn emitted_text_round_trips_modulo_comments() -> anyhow::Result<()> {
    let source = "\
% compute a flag and branch on it
x <- v<y

beqz x, End   % taken when v >= y
spbarr
load v, v
End:
";
    let program = parser::parse(source)?;
    let emitted = emitter::emit(&program);

    assert_eq!(emitted, "x <- v<y\nbeqz x, End\nspbarr\nload v, v\nEnd:\n");

    // A second round trip is exact.
    let reparsed = parser::parse(&emitted)?;
    assert_eq!(reparsed, program);
    assert_eq!(emitter::emit(&reparsed), emitted);

    Ok(())
}

#[test]
fn extract_runs_the_whole_pipeline() {
    let result = transient_trace_extractor::extract(
        LOOP_SOURCE,
        3,
        Configuration::default().with_memory(0, Expr::Concrete(1)),
        Config::default(),
    )
    .expect("Extraction errored");

    assert!(!result.terminals.is_empty());
    assert!(result.terminals.iter().all(|t| t.pc == 10));
}

#[test]
fn extract_reports_parse_failures_with_their_line() {
    let errors = transient_trace_extractor::extract(
        "mov x, 1\nnonsense\n",
        2,
        Configuration::default(),
        Config::default(),
    )
    .expect_err("Extraction did not error");

    assert_eq!(errors.len(), 1);
    assert_eq!(errors.payloads()[0].location, 2);
}

#[test]
fn unrolled_programs_emit_and_reparse_cleanly() {
    let program = parser::parse(LOOP_SOURCE).expect("Parsing errored");
    let unrolled = unroll(&program, 2).expect("Unrolling errored");

    let emitted = emitter::emit(&unrolled);
    let reparsed = parser::parse(&emitted).expect("Parsing errored");

    assert_eq!(reparsed, unrolled);
}
