//! Renders parsed records as the source of a rust module.
//!
//! The generated module is meant to be declared as a child of the module that defines [Cpu] and [Leaf],
//! so types are referred to through `super` and never spelled out with a full path.
use parsing::cpuid::{Cpu, Leaf};

/// The name of the table in the generated module
pub const TABLE_NAME: &str = "CPUS";

/// Build the source of a module that defines `CPUS`, holding every record in order.
/// The output is not formatted, one record per line.
pub fn build(cpus: &[Cpu]) -> String {
    let mut w = String::with_capacity(2048 * cpus.len() + 256);
    w.push_str(&format!(
        "// Code generated by {} v{}. DO NOT EDIT.\n\n",
        env!("CARGO_PKG_NAME"),
        env!("CARGO_PKG_VERSION")
    ));
    // an empty table leaves the imports unused
    w.push_str("#![allow(unused_imports)]\n\n");
    w.push_str("use super::{Cpu, Leaf};\n");
    w.push_str("use std::borrow::Cow;\n\n");

    w.push_str(&format!("pub static {TABLE_NAME}: &[Cpu] = &[\n"));
    for cpu in cpus {
        w.push_str(&cpu_literal(cpu));
        w.push_str(",\n");
    }
    w.push_str("];\n");
    w
}

/// A struct expression for a single [Cpu], intended to be used inside an array initializer
pub fn cpu_literal(cpu: &Cpu) -> String {
    let features: Vec<String> = cpu.features.iter().map(|f| format!("{f:?}")).collect();
    let leaves: Vec<String> = cpu.leaves.iter().map(leaf_literal).collect();
    format!(
        "Cpu {{ id: {}, vendor: {}, brand: {}, family: {}, model: {}, stepping: {}, \
         max_standard_leaf: {}, max_extended_leaf: {}, \
         features: Cow::Borrowed(&[{}]), leaves: Cow::Borrowed(&[{}]) }}",
        borrowed_str(&cpu.id),
        borrowed_str(&cpu.vendor),
        borrowed_str(&cpu.brand),
        cpu.family,
        cpu.model,
        cpu.stepping,
        hex(cpu.max_standard_leaf),
        hex(cpu.max_extended_leaf),
        features.join(", "),
        leaves.join(", "),
    )
}

fn leaf_literal(leaf: &Leaf) -> String {
    format!(
        "Leaf {{ leaf: {}, subleaf: {}, eax: {}, ebx: {}, ecx: {}, edx: {} }}",
        hex(leaf.leaf),
        leaf.subleaf,
        hex(leaf.eax),
        hex(leaf.ebx),
        hex(leaf.ecx),
        hex(leaf.edx),
    )
}

/// `Debug` on a `str` escapes it the same way a rust string literal does
fn borrowed_str(s: &str) -> String {
    format!("Cow::Borrowed({s:?})")
}

fn hex(value: u32) -> String {
    format!("0x{value:08X}")
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::borrow::Cow;

    fn mock_cpu() -> Cpu {
        Cpu {
            id: Cow::Borrowed("A"),
            vendor: Cow::Borrowed("GenuineIntel"),
            brand: Cow::Borrowed("Intel(R) \"Quoted\" \\ CPU"),
            family: 6,
            model: 58,
            stepping: 9,
            max_standard_leaf: 0xD,
            max_extended_leaf: 0x8000_0008,
            features: Cow::Borrowed(&["fpu", "sse2"]),
            leaves: Cow::Owned(vec![Leaf {
                leaf: 0,
                subleaf: 0,
                eax: 0xD,
                ebx: 0x756E6547,
                ecx: 0x6C65746E,
                edx: 0x49656E69,
            }]),
        }
    }

    #[test]
    fn basic_cpu_literal() {
        let literal = cpu_literal(&mock_cpu());
        assert!(literal.starts_with("Cpu { id: Cow::Borrowed(\"A\"), vendor: Cow::Borrowed(\"GenuineIntel\"), "));
        assert!(literal.contains("brand: Cow::Borrowed(\"Intel(R) \\\"Quoted\\\" \\\\ CPU\")"));
        assert!(literal.contains("family: 6, model: 58, stepping: 9"));
        assert!(literal.contains("max_extended_leaf: 0x80000008"));
        assert!(literal.contains("features: Cow::Borrowed(&[\"fpu\", \"sse2\"])"));
        assert!(literal.contains(
            "Leaf { leaf: 0x00000000, subleaf: 0, eax: 0x0000000D, ebx: 0x756E6547, ecx: 0x6C65746E, edx: 0x49656E69 }"
        ));
        // nothing should be qualified with the defining crate
        assert!(!literal.contains("parsing::"));
        assert!(!literal.contains("cpuid::"));
    }

    #[test]
    fn build_empty_table() {
        let source = build(&[]);
        assert!(source.starts_with("// Code generated by cpuidb"));
        assert!(source.contains("DO NOT EDIT."));
        assert!(source.contains("#![allow(unused_imports)]\n"));
        assert!(source.ends_with("pub static CPUS: &[Cpu] = &[\n];\n"));
    }

    #[test]
    fn build_one_record_per_line() {
        let mut second = mock_cpu();
        second.id = Cow::Borrowed("B");
        let source = build(&[mock_cpu(), second]);
        let records: Vec<&str> = source.lines().filter(|l| l.starts_with("Cpu {")).collect();
        assert_eq!(records.len(), 2);
        assert!(records[0].contains("id: Cow::Borrowed(\"A\")"));
        assert!(records[1].contains("id: Cow::Borrowed(\"B\")"));
        assert!(records.iter().all(|r| r.ends_with("},")));
    }

    #[test]
    fn generated_source_is_valid_rust() {
        syn::parse_file(&build(&[mock_cpu()])).unwrap();
    }
}
