//! The μAsm assembly text reader.
//!
//! The format is line-oriented. Lines are trimmed of ASCII whitespace, and
//! anything from a `%` onwards is a comment. A line ending in `:` binds a
//! label to the next instruction's address. A line containing `<-` is an
//! assignment with the two sides kept verbatim as operands. A line whose
//! first token is `spbarr` is the zero-operand speculation barrier. Every
//! other line is `mnemonic operand[, operand]*`.

use crate::{
    assembly::{Instruction, Opcode, Program},
    constant::COMMENT_CHAR,
    error::assembly::{Error, Result},
};

/// The mnemonic given to assignment lines.
pub const ASSIGN_MNEMONIC: &str = "<-";

/// The mnemonic of the speculation barrier.
pub const BARRIER_MNEMONIC: &str = "spbarr";

/// Parses μAsm assembly `source` text into a [`Program`].
///
/// # Errors
///
/// Returns [`Err`] if a non-empty line is neither a label, an assignment,
/// a barrier, nor a `mnemonic operands` instruction.
pub fn parse(source: &str) -> Result<Program> {
    let mut program = Program::default();
    let mut address: u32 = 0;

    for (index, raw_line) in source.lines().enumerate() {
        let line_number = index + 1;
        let line = strip_comment(raw_line).trim();
        if line.is_empty() {
            continue;
        }

        if let Some(label) = line.strip_suffix(':') {
            let label = label.trim();
            if label.is_empty() {
                return Err(Error::EmptyLabel { line: line_number });
            }
            program.labels.insert(label.to_string(), address);
            continue;
        }

        let opcode = parse_instruction(line, line_number)?;
        program.instructions.push(Instruction { address, opcode });
        address += 1;
    }

    Ok(program)
}

/// Removes a trailing comment from a line, if present.
fn strip_comment(line: &str) -> &str {
    match line.find(COMMENT_CHAR) {
        Some(position) => &line[..position],
        None => line,
    }
}

/// Parses a single non-label line into an opcode.
fn parse_instruction(line: &str, line_number: usize) -> Result<Opcode> {
    // Assignments keep both sides verbatim; the right-hand side is an
    // expression that is parsed lazily at execution time.
    if let Some((lhs, rhs)) = line.split_once(ASSIGN_MNEMONIC) {
        return Ok(Opcode::new(ASSIGN_MNEMONIC, &[lhs.trim(), rhs.trim()]));
    }

    let (mnemonic, rest) = match line.split_once(char::is_whitespace) {
        Some((mnemonic, rest)) => (mnemonic, rest.trim()),
        None => (line, ""),
    };

    if mnemonic == BARRIER_MNEMONIC {
        return Ok(Opcode::new(BARRIER_MNEMONIC, &[]));
    }

    if rest.is_empty() {
        return Err(Error::MalformedLine {
            line: line_number,
            text: line.to_string(),
        });
    }

    let operands: Vec<&str> = rest
        .split(',')
        .map(str::trim)
        .filter(|operand| !operand.is_empty())
        .collect();

    Ok(Opcode::new(mnemonic, &operands))
}

#[cfg(test)]
mod test {
    use crate::{
        assembly::parser::parse,
        error::assembly::Error,
    };

    #[test]
    fn parses_instructions_and_labels() {
        let source = r"
% a small loop
load x, 0
LoopStart:
add x, x, 1
beqz x, LoopStart
";
        let program = parse(source).expect("Parsing errored");

        assert_eq!(program.len(), 3);
        assert_eq!(program.labels.get("LoopStart"), Some(&1));
        assert_eq!(program.instructions[2].opcode.mnemonic, "beqz");
        assert_eq!(program.instructions[2].opcode.operands, vec!["x", "LoopStart"]);
    }

    #[test]
    fn parses_assignments_verbatim() {
        let program = parse("x <- v<y").expect("Parsing errored");

        assert_eq!(program.len(), 1);
        let opcode = &program.instructions[0].opcode;
        assert_eq!(opcode.mnemonic, "<-");
        assert_eq!(opcode.operands, vec!["x", "v<y"]);
    }

    #[test]
    fn parses_the_speculation_barrier() {
        let program = parse("spbarr").expect("Parsing errored");

        assert_eq!(program.len(), 1);
        assert_eq!(program.instructions[0].opcode.mnemonic, "spbarr");
        assert!(program.instructions[0].opcode.operands.is_empty());
    }

    #[test]
    fn binds_trailing_labels_past_the_end() {
        let source = "jmp End\nEnd:";
        let program = parse(source).expect("Parsing errored");

        assert_eq!(program.len(), 1);
        assert_eq!(program.labels.get("End"), Some(&1));
    }

    #[test]
    fn skips_comments_and_blank_lines() {
        let source = "% header\n\nmov x, 1 % trailing note\n   \n";
        let program = parse(source).expect("Parsing errored");

        assert_eq!(program.len(), 1);
        assert_eq!(program.instructions[0].opcode.operands, vec!["x", "1"]);
    }

    #[test]
    fn rejects_bare_tokens() {
        let result = parse("mov x, 1\nnonsense\n");
        assert_eq!(
            result,
            Err(Error::MalformedLine {
                line: 2,
                text: "nonsense".to_string(),
            })
        );
    }

    #[test]
    fn rejects_empty_labels() {
        assert_eq!(parse("  :\n"), Err(Error::EmptyLabel { line: 1 }));
    }
}
