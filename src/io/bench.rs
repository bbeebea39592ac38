//! IO for `.bench` (ISCAS) netlist files (spec §6).
//!
//! ```text
//!     # this is a comment
//!     INPUT(a)
//!     INPUT(b)
//!     z = AND(a, b)
//!     OUTPUT(z)
//! ```

use std::io::{BufRead, BufReader, Read, Write};

use crate::circuit::{RawGate, RawNetlist};
use crate::gate::GateKind;

/// Parse a `.bench` netlist. Lines beginning with `#` or `$`, or entirely
/// whitespace, are ignored; `=`, `(`, `)` and `,` are treated as whitespace
/// during tokenization (spec §6).
pub fn read_bench<R: Read>(r: R) -> Result<RawNetlist, String> {
    let mut inputs = Vec::new();
    let mut outputs = Vec::new();
    let mut gates = Vec::new();

    for (lineno, line) in BufReader::new(r).lines().enumerate() {
        let line = line.map_err(|e| format!("line {}: {e}", lineno + 1))?;
        let t = line.trim();
        if t.is_empty() || t.starts_with('#') || t.starts_with('$') {
            continue;
        }

        let tokens: Vec<&str> = t
            .split(['=', '(', ')', ','])
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .collect();
        if tokens.is_empty() {
            continue;
        }

        match tokens[0].to_ascii_uppercase().as_str() {
            "INPUT" => {
                if tokens.len() != 2 {
                    return Err(format!("line {}: malformed INPUT declaration", lineno + 1));
                }
                inputs.push(tokens[1].to_string());
            }
            "OUTPUT" => {
                if tokens.len() != 2 {
                    return Err(format!("line {}: malformed OUTPUT declaration", lineno + 1));
                }
                outputs.push(tokens[1].to_string());
            }
            _ => {
                // `name = KIND(in1, in2, ...)`
                if tokens.len() < 3 {
                    return Err(format!("line {}: malformed gate declaration", lineno + 1));
                }
                let name = tokens[0].to_string();
                let kind = GateKind::from_keyword(tokens[1])
                    .ok_or_else(|| format!("line {}: unknown gate kind {}", lineno + 1, tokens[1]))?;
                let deps = tokens[2..].iter().map(|s| s.to_string()).collect();
                gates.push(RawGate { name, kind, deps });
            }
        }
    }

    if inputs.is_empty() {
        return Err("netlist declares no primary inputs".to_string());
    }
    if outputs.is_empty() {
        return Err("netlist declares no primary outputs".to_string());
    }
    Ok(RawNetlist { inputs, outputs, gates })
}

/// Write a netlist in `.bench` format, round-tripping with [`read_bench`]
/// modulo stem/branch expansion (which is not undone on write).
pub fn write_bench<W: Write>(w: &mut W, circuit: &crate::circuit::Circuit) -> std::io::Result<()> {
    writeln!(w, "# .bench netlist")?;
    for &pi in circuit.inputs() {
        writeln!(w, "INPUT({})", circuit.name(pi))?;
    }
    writeln!(w)?;
    for &po in circuit.outputs() {
        writeln!(w, "OUTPUT({})", circuit.name(po))?;
    }
    writeln!(w)?;
    for s in circuit.all_signals() {
        let gate = circuit.gate(s);
        if gate.kind == GateKind::Input {
            continue;
        }
        let deps = gate
            .fanin
            .iter()
            .map(|&d| circuit.name(d).to_string())
            .collect::<Vec<_>>()
            .join(", ");
        writeln!(w, "{} = {}({})", circuit.name(s), gate.kind.keyword(), deps)?;
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::circuit::Circuit;

    #[test]
    fn test_basic_readwrite() {
        let example = "\
# a small combinational netlist
INPUT(a)
INPUT(b)
INPUT(c)

OUTPUT(z)

x0 = AND(a, b)
x1 = NAND(a, b)
x2 = OR(a, b, c)
x3 = NOR(a, b)
x4 = XOR(a, b)
x5 = BUF(a)
x6 = NOT(b)
z = XNOR(x4, x5)
";
        let raw = read_bench(example.as_bytes()).unwrap();
        assert_eq!(raw.inputs, vec!["a", "b", "c"]);
        assert_eq!(raw.outputs, vec!["z"]);
        assert_eq!(raw.gates.len(), 8);

        let circuit = Circuit::from_source(&raw).unwrap();
        let mut buf = Vec::new();
        write_bench(&mut buf, &circuit).unwrap();
        let text = String::from_utf8(buf).unwrap();
        assert!(text.contains("INPUT(a)"));
        assert!(text.contains("OUTPUT(z)"));
    }

    #[test]
    fn test_comments_and_dollar_lines_ignored() {
        let example = "\
$ ignored directive
# comment
INPUT(a)

z = BUF(a)
OUTPUT(z)
";
        let raw = read_bench(example.as_bytes()).unwrap();
        assert_eq!(raw.inputs, vec!["a"]);
        assert_eq!(raw.gates.len(), 1);
    }

    #[test]
    fn test_unknown_gate_kind_is_error() {
        let example = "INPUT(a)\nOUTPUT(z)\nz = FROB(a)\n";
        assert!(read_bench(example.as_bytes()).is_err());
    }

    #[test]
    fn test_case_insensitive_keywords() {
        let example = "input(a)\ninput(b)\noutput(z)\nz = and(a, b)\n";
        let raw = read_bench(example.as_bytes()).unwrap();
        assert_eq!(raw.inputs, vec!["a", "b"]);
        assert_eq!(raw.gates[0].kind, GateKind::And);
    }
}
