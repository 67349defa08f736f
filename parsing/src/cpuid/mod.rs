use self::features::FEATURES;
use self::lexer::{is_register_line, read_register_line};
use log::{debug, trace};
// subleaf counters are keyed by leaf number, no need for a real hash function
use nohash_hasher::BuildNoHashHasher;
use std::borrow::Cow;
use std::collections::HashMap;
use std::fs;
use std::path::Path;

pub mod features;
mod lexer;

// The dumps this reads are the `*CPUID*.txt` files from the InstLatx64 collection
// (https://github.com/InstLatx64/InstLatx64), which are mostly AIDA64 reports.
// Only the `CPUID xxxxxxxx:` lines are actually used, everything else in the report is skipped.

/// Every logical CPU in a report gets its own section, only the first one is read
const CPU_SECTION_MARKER: &str = "Logical CPU #";

/// Leaf 0, vendor string and the highest standard leaf
const VENDOR_LEAF: u32 = 0x0;
/// Leaf 1, family, model and stepping in eax
const VERSION_LEAF: u32 = 0x1;
const EXTENDED_BASE_LEAF: u32 = 0x8000_0000;
const BRAND_LEAVES: [u32; 3] = [0x8000_0002, 0x8000_0003, 0x8000_0004];

/// A normalized CPU descriptor built from one CPUID dump.
///
/// Fields are [`Cow`]s so the same type can be produced by the parser at build time
/// and written out as a `static` table.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Cpu {
    /// The name of the dump with the `_CPUID` suffix removed, eg `GenuineIntel00306A9_IvyBridge`
    pub id: Cow<'static, str>,
    /// Something like `GenuineIntel` or `AuthenticAMD`
    pub vendor: Cow<'static, str>,
    /// Something like "Intel(R) Core(TM) i7-3770 CPU @ 3.40GHz", empty if the dump doesn't have one
    pub brand: Cow<'static, str>,
    pub family: u32,
    pub model: u32,
    pub stepping: u32,
    pub max_standard_leaf: u32,
    /// 0 if the dump contains no extended leaves
    pub max_extended_leaf: u32,
    /// Names of every flag from [`FEATURES`] that is set
    pub features: Cow<'static, [&'static str]>,
    /// Raw register values from the first logical CPU, in the order they appear in the dump
    pub leaves: Cow<'static, [Leaf]>,
}

impl Cpu {
    /// Find the registers for a given leaf and subleaf
    pub fn leaf(&self, leaf: u32, subleaf: u32) -> Option<&Leaf> {
        find_leaf(&self.leaves, leaf, subleaf)
    }

    /// Check whether a flag from [`FEATURES`] is set, by its `/proc/cpuinfo` name
    pub fn has_feature(&self, name: &str) -> bool {
        self.features.iter().any(|f| *f == name)
    }
}

/// The output of a single `cpuid` invocation
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Leaf {
    /// The input value of eax
    pub leaf: u32,
    /// The input value of ecx
    pub subleaf: u32,
    pub eax: u32,
    pub ebx: u32,
    pub ecx: u32,
    pub edx: u32,
}

impl Leaf {
    pub fn register(&self, register: Register) -> u32 {
        match register {
            Register::Eax => self.eax,
            Register::Ebx => self.ebx,
            Register::Ecx => self.ecx,
            Register::Edx => self.edx,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Register {
    Eax,
    Ebx,
    Ecx,
    Edx,
}

#[derive(Debug, thiserror::Error)]
pub enum ParseError {
    #[error("unable to read dump: {0}")]
    Io(#[from] std::io::Error),
    #[error("malformed register line {line}: {text:?}")]
    Syntax { line: usize, text: String },
    #[error("no CPUID register lines found")]
    NoRegisters,
    #[error("leaf {0:#010x} is missing")]
    MissingLeaf(u32),
}

/// Read and parse a single dump file. The id of the resulting [Cpu] comes from the file name.
pub fn parse_cpu_file<P: AsRef<Path>>(path: P) -> Result<Cpu, ParseError> {
    let path = path.as_ref();
    // some of the older reports were saved with a codepage, so invalid utf 8 is tolerated
    let bytes = fs::read(path)?;
    let text = String::from_utf8_lossy(&bytes);
    parse_cpu(&dump_id(path), &text)
}

/// Parse the text of a dump into a [Cpu]
pub fn parse_cpu(id: &str, text: &str) -> Result<Cpu, ParseError> {
    let leaves = read_first_cpu(text)?;
    if leaves.is_empty() {
        return Err(ParseError::NoRegisters);
    }
    let vendor_leaf = find_leaf(&leaves, VENDOR_LEAF, 0)
        .copied()
        .ok_or(ParseError::MissingLeaf(VENDOR_LEAF))?;
    let version_leaf = find_leaf(&leaves, VERSION_LEAF, 0)
        .copied()
        .ok_or(ParseError::MissingLeaf(VERSION_LEAF))?;

    let (family, model, stepping) = decode_signature(version_leaf.eax);
    let max_extended_leaf = find_leaf(&leaves, EXTENDED_BASE_LEAF, 0)
        .map(|l| l.eax)
        .unwrap_or(0);
    let features: Vec<&'static str> = FEATURES
        .iter()
        .filter(|f| find_leaf(&leaves, f.leaf, f.subleaf).is_some_and(|l| f.is_set(l)))
        .map(|f| f.name)
        .collect();
    debug!("{id}: {} leaves, {} features", leaves.len(), features.len());

    Ok(Cpu {
        id: Cow::Owned(id.to_string()),
        vendor: Cow::Owned(registers_to_ascii(&[
            vendor_leaf.ebx,
            vendor_leaf.edx,
            vendor_leaf.ecx,
        ])),
        brand: Cow::Owned(read_brand(&leaves)),
        family,
        model,
        stepping,
        max_standard_leaf: vendor_leaf.eax,
        max_extended_leaf,
        features: Cow::Owned(features),
        leaves: Cow::Owned(leaves),
    })
}

/// Dumps are named like `GenuineIntel00306A9_IvyBridge_CPUID.txt`
fn dump_id(path: &Path) -> String {
    let stem = path
        .file_stem()
        .map(|s| s.to_string_lossy())
        .unwrap_or_default();
    stem.strip_suffix("_CPUID").unwrap_or(&*stem).to_string()
}

/// Collect the register lines of the first logical CPU in the report.
/// Lines without an explicit subleaf are numbered by how many times their leaf was already seen.
fn read_first_cpu(text: &str) -> Result<Vec<Leaf>, ParseError> {
    let mut leaves: Vec<Leaf> = Vec::with_capacity(64);
    let mut occurrences: HashMap<u32, u32, BuildNoHashHasher<u32>> =
        HashMap::with_hasher(BuildNoHashHasher::default());
    for (i, raw_line) in text.lines().enumerate() {
        let line = raw_line.trim();
        if line.contains(CPU_SECTION_MARKER) {
            if !leaves.is_empty() {
                trace!("stopping at section {line:?}");
                break;
            }
            continue;
        }
        if !is_register_line(line) {
            continue;
        }
        let register_line = read_register_line(line)
            .map_err(|_| ParseError::Syntax {
                line: i + 1,
                text: line.to_string(),
            })?
            .1;
        let seen = occurrences.entry(register_line.leaf).or_insert(0);
        let subleaf = register_line.subleaf.unwrap_or(*seen);
        *seen += 1;
        let [eax, ebx, ecx, edx] = register_line.registers;
        leaves.push(Leaf {
            leaf: register_line.leaf,
            subleaf,
            eax,
            ebx,
            ecx,
            edx,
        });
    }
    Ok(leaves)
}

fn find_leaf(leaves: &[Leaf], leaf: u32, subleaf: u32) -> Option<&Leaf> {
    leaves
        .iter()
        .find(|l| l.leaf == leaf && l.subleaf == subleaf)
}

/// Split the eax value of leaf 1 into (family, model, stepping).
/// The extended family only counts when the base family is 0xF, and the extended model
/// only counts for families 0x6 and 0xF.
fn decode_signature(eax: u32) -> (u32, u32, u32) {
    let stepping = eax & 0xF;
    let base_model = (eax >> 4) & 0xF;
    let base_family = (eax >> 8) & 0xF;
    let extended_model = (eax >> 16) & 0xF;
    let extended_family = (eax >> 20) & 0xFF;

    let family = if base_family == 0xF {
        base_family + extended_family
    } else {
        base_family
    };
    let model = if base_family == 0x6 || base_family == 0xF {
        (extended_model << 4) + base_model
    } else {
        base_model
    };
    (family, model, stepping)
}

/// The brand string is spread across the registers of three extended leaves
fn read_brand(leaves: &[Leaf]) -> String {
    let mut registers: Vec<u32> = Vec::with_capacity(12);
    for leaf in BRAND_LEAVES {
        match find_leaf(leaves, leaf, 0) {
            Some(l) => registers.extend([l.eax, l.ebx, l.ecx, l.edx]),
            None => return String::new(),
        }
    }
    registers_to_ascii(&registers)
}

/// Registers hold ascii text in little endian order, the text stops at the first nul
fn registers_to_ascii(registers: &[u32]) -> String {
    let bytes: Vec<u8> = registers.iter().flat_map(|r| r.to_le_bytes()).collect();
    let text = String::from_utf8_lossy(&bytes);
    text.split('\0').next().unwrap_or_default().trim().to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    const IVY_BRIDGE: &str = include_str!("testdata/GenuineIntel00306A9_IvyBridge_CPUID.txt");

    #[test]
    fn basic_parse_cpu() {
        let cpu = parse_cpu("GenuineIntel00306A9_IvyBridge", IVY_BRIDGE).unwrap();
        assert_eq!(cpu.id, "GenuineIntel00306A9_IvyBridge");
        assert_eq!(cpu.vendor, "GenuineIntel");
        assert_eq!(cpu.brand, "Intel(R) Core(TM) i7-3770 CPU @ 3.40GHz");
        assert_eq!((cpu.family, cpu.model, cpu.stepping), (6, 0x3A, 9));
        assert_eq!(cpu.max_standard_leaf, 0xD);
        assert_eq!(cpu.max_extended_leaf, 0x8000_0008);
    }

    #[test]
    fn only_first_logical_cpu_is_read() {
        let cpu = parse_cpu("ivy", IVY_BRIDGE).unwrap();
        assert_eq!(cpu.leaves.len(), 10);
        // logical cpu #1 has a different apic id in ebx
        assert_eq!(cpu.leaf(1, 0).unwrap().ebx, 0x00100800);
    }

    #[test]
    fn subleaves_are_numbered() {
        let cpu = parse_cpu("ivy", IVY_BRIDGE).unwrap();
        assert_eq!(cpu.leaf(4, 0).unwrap().eax, 0x1C004121);
        assert_eq!(cpu.leaf(4, 1).unwrap().eax, 0x1C004122);
        assert!(cpu.leaf(4, 2).is_none());

        let unlabeled = "CPUID 00000000: 0000000D-756E6547-6C65746E-49656E69\n\
            CPUID 00000001: 000306A9-00100800-7FBAE3FF-BFEBFBFF\n\
            CPUID 0000000B: 00000001-00000002-00000100-00000000\n\
            CPUID 0000000B: 00000004-00000008-00000201-00000000\n";
        let cpu = parse_cpu("unlabeled", unlabeled).unwrap();
        assert_eq!(cpu.leaf(0xB, 1).unwrap().ecx, 0x201);
    }

    #[test]
    fn features_are_decoded() {
        let cpu = parse_cpu("ivy", IVY_BRIDGE).unwrap();
        let expected = [
            "fpu", "sse2", "ht", "avx", "aes", "rdrand", "fsgsbase", "erms", "lahf_lm", "nx", "lm",
            "rdtscp",
        ];
        for present in expected {
            assert!(cpu.has_feature(present), "expected {present}");
        }
        for absent in ["avx2", "hypervisor", "avx512f", "svm", "3dnow"] {
            assert!(!cpu.has_feature(absent), "did not expect {absent}");
        }
        // reported in table order
        let sse = cpu.features.iter().position(|f| *f == "sse").unwrap();
        let avx = cpu.features.iter().position(|f| *f == "avx").unwrap();
        assert!(sse < avx);
    }

    #[test]
    fn summary_lines_are_skipped() {
        let dump = "------[ CPU Info ]------\n\
            CPUID Manufacturer : GenuineIntel\n\
            CPUID CPU Name : Intel(R) Core(TM) i7-3770 CPU @ 3.40GHz\n\
            CPUID Family : 6h\n\
            CPUID 00000000: 0000000D-756E6547-6C65746E-49656E69 [GenuineIntel]\n\
            CPUID 00000001: 000306A9-00100800-7FBAE3FF-BFEBFBFF\n";
        let cpu = parse_cpu("summary", dump).unwrap();
        assert_eq!(cpu.vendor, "GenuineIntel");
        assert_eq!(cpu.leaves.len(), 2);
        assert!(cpu.has_feature("avx"));
    }

    #[test]
    fn amd_extended_family() {
        let zen2 = "------[ CPUID Registers / Logical CPU #0 ]------\n\
            CPUID 00000000: 00000010-68747541-444D4163-69746E65 [AuthenticAMD]\n\
            CPUID 00000001: 00870F10-00100800-7ED8320B-178BFBFF\n";
        let cpu = parse_cpu("AuthenticAMD0870F10_K17_Matisse", zen2).unwrap();
        assert_eq!(cpu.vendor, "AuthenticAMD");
        assert_eq!((cpu.family, cpu.model, cpu.stepping), (0x17, 0x71, 0));
        assert_eq!(cpu.brand, "");
        assert_eq!(cpu.max_extended_leaf, 0);
    }

    #[test]
    fn basic_decode_signature() {
        // pentium 4, family 0xF with an extended family of 0
        assert_eq!(decode_signature(0x00000F29), (0xF, 0x2, 9));
        // a 486 has no extended fields at all
        assert_eq!(decode_signature(0x00000435), (4, 3, 5));
    }

    #[test]
    fn parse_errors() {
        assert!(matches!(parse_cpu("empty", ""), Err(ParseError::NoRegisters)));
        assert!(matches!(
            parse_cpu("header only", "------[ Versions ]------\nProgram Version : AIDA64\n"),
            Err(ParseError::NoRegisters)
        ));
        assert!(matches!(
            parse_cpu("no leaf 1", "CPUID 00000000: 0000000D-756E6547-6C65746E-49656E69\n"),
            Err(ParseError::MissingLeaf(1))
        ));
        match parse_cpu("corrupt", "banner\nCPUID 00000000: 0000000D-756E6547\n") {
            Err(ParseError::Syntax { line, .. }) => assert_eq!(line, 2),
            other => panic!("expected a syntax error, got {other:?}"),
        }
    }

    #[test]
    fn basic_dump_id() {
        assert_eq!(
            dump_id(Path::new("source/GenuineIntel00306A9_IvyBridge_CPUID.txt")),
            "GenuineIntel00306A9_IvyBridge"
        );
        assert_eq!(dump_id(Path::new("A_CPUID.txt")), "A");
        assert_eq!(dump_id(Path::new("CPUID_dump.txt")), "CPUID_dump");
    }

    #[test]
    fn basic_parse_cpu_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("GenuineIntel00306A9_IvyBridge_CPUID.txt");
        // a stray latin-1 byte in the banner shouldn't matter
        let mut contents = b"Program Version : AIDA64 \xA9 FinalWire\n".to_vec();
        contents.extend_from_slice(IVY_BRIDGE.as_bytes());
        fs::write(&path, contents).unwrap();

        let cpu = parse_cpu_file(&path).unwrap();
        assert_eq!(cpu.id, "GenuineIntel00306A9_IvyBridge");
        assert_eq!(cpu.family, 6);

        assert!(matches!(
            parse_cpu_file(dir.path().join("missing_CPUID.txt")),
            Err(ParseError::Io(_))
        ));
    }
}
