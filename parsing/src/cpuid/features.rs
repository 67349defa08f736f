use super::{Leaf, Register};

/// A single feature flag, identified by the bit it occupies in a CPUID register
pub struct Feature {
    /// Name as it appears in `/proc/cpuinfo`
    pub name: &'static str,
    pub leaf: u32,
    pub subleaf: u32,
    pub register: Register,
    pub bit: u8,
}

impl Feature {
    const fn new(name: &'static str, leaf: u32, subleaf: u32, register: Register, bit: u8) -> Self {
        Self {
            name,
            leaf,
            subleaf,
            register,
            bit,
        }
    }

    pub fn is_set(&self, leaf: &Leaf) -> bool {
        leaf.register(self.register) & (1 << self.bit) != 0
    }
}

use Register::{Ebx, Ecx, Edx};

/// Every flag that ends up in [`super::Cpu::features`], in the order it's reported
pub const FEATURES: &[Feature] = &[
    // leaf 1 edx
    Feature::new("fpu", 0x1, 0, Edx, 0),
    Feature::new("vme", 0x1, 0, Edx, 1),
    Feature::new("de", 0x1, 0, Edx, 2),
    Feature::new("pse", 0x1, 0, Edx, 3),
    Feature::new("tsc", 0x1, 0, Edx, 4),
    Feature::new("msr", 0x1, 0, Edx, 5),
    Feature::new("pae", 0x1, 0, Edx, 6),
    Feature::new("mce", 0x1, 0, Edx, 7),
    Feature::new("cx8", 0x1, 0, Edx, 8),
    Feature::new("apic", 0x1, 0, Edx, 9),
    Feature::new("sep", 0x1, 0, Edx, 11),
    Feature::new("mtrr", 0x1, 0, Edx, 12),
    Feature::new("pge", 0x1, 0, Edx, 13),
    Feature::new("mca", 0x1, 0, Edx, 14),
    Feature::new("cmov", 0x1, 0, Edx, 15),
    Feature::new("pat", 0x1, 0, Edx, 16),
    Feature::new("pse36", 0x1, 0, Edx, 17),
    Feature::new("clflush", 0x1, 0, Edx, 19),
    Feature::new("mmx", 0x1, 0, Edx, 23),
    Feature::new("fxsr", 0x1, 0, Edx, 24),
    Feature::new("sse", 0x1, 0, Edx, 25),
    Feature::new("sse2", 0x1, 0, Edx, 26),
    Feature::new("ht", 0x1, 0, Edx, 28),
    // leaf 1 ecx
    Feature::new("sse3", 0x1, 0, Ecx, 0),
    Feature::new("pclmulqdq", 0x1, 0, Ecx, 1),
    Feature::new("monitor", 0x1, 0, Ecx, 3),
    Feature::new("vmx", 0x1, 0, Ecx, 5),
    Feature::new("smx", 0x1, 0, Ecx, 6),
    Feature::new("est", 0x1, 0, Ecx, 7),
    Feature::new("ssse3", 0x1, 0, Ecx, 9),
    Feature::new("fma", 0x1, 0, Ecx, 12),
    Feature::new("cx16", 0x1, 0, Ecx, 13),
    Feature::new("pcid", 0x1, 0, Ecx, 17),
    Feature::new("sse4_1", 0x1, 0, Ecx, 19),
    Feature::new("sse4_2", 0x1, 0, Ecx, 20),
    Feature::new("x2apic", 0x1, 0, Ecx, 21),
    Feature::new("movbe", 0x1, 0, Ecx, 22),
    Feature::new("popcnt", 0x1, 0, Ecx, 23),
    Feature::new("aes", 0x1, 0, Ecx, 25),
    Feature::new("xsave", 0x1, 0, Ecx, 26),
    Feature::new("osxsave", 0x1, 0, Ecx, 27),
    Feature::new("avx", 0x1, 0, Ecx, 28),
    Feature::new("f16c", 0x1, 0, Ecx, 29),
    Feature::new("rdrand", 0x1, 0, Ecx, 30),
    Feature::new("hypervisor", 0x1, 0, Ecx, 31),
    // leaf 7 subleaf 0 ebx
    Feature::new("fsgsbase", 0x7, 0, Ebx, 0),
    Feature::new("bmi1", 0x7, 0, Ebx, 3),
    Feature::new("hle", 0x7, 0, Ebx, 4),
    Feature::new("avx2", 0x7, 0, Ebx, 5),
    Feature::new("smep", 0x7, 0, Ebx, 7),
    Feature::new("bmi2", 0x7, 0, Ebx, 8),
    Feature::new("erms", 0x7, 0, Ebx, 9),
    Feature::new("invpcid", 0x7, 0, Ebx, 10),
    Feature::new("rtm", 0x7, 0, Ebx, 11),
    Feature::new("avx512f", 0x7, 0, Ebx, 16),
    Feature::new("avx512dq", 0x7, 0, Ebx, 17),
    Feature::new("rdseed", 0x7, 0, Ebx, 18),
    Feature::new("adx", 0x7, 0, Ebx, 19),
    Feature::new("smap", 0x7, 0, Ebx, 20),
    Feature::new("avx512ifma", 0x7, 0, Ebx, 21),
    Feature::new("clflushopt", 0x7, 0, Ebx, 23),
    Feature::new("clwb", 0x7, 0, Ebx, 24),
    Feature::new("avx512pf", 0x7, 0, Ebx, 26),
    Feature::new("avx512er", 0x7, 0, Ebx, 27),
    Feature::new("avx512cd", 0x7, 0, Ebx, 28),
    Feature::new("sha_ni", 0x7, 0, Ebx, 29),
    Feature::new("avx512bw", 0x7, 0, Ebx, 30),
    Feature::new("avx512vl", 0x7, 0, Ebx, 31),
    // leaf 7 subleaf 0 ecx
    Feature::new("avx512vbmi", 0x7, 0, Ecx, 1),
    Feature::new("umip", 0x7, 0, Ecx, 2),
    Feature::new("pku", 0x7, 0, Ecx, 3),
    Feature::new("gfni", 0x7, 0, Ecx, 8),
    Feature::new("vaes", 0x7, 0, Ecx, 9),
    Feature::new("vpclmulqdq", 0x7, 0, Ecx, 10),
    Feature::new("avx512_vnni", 0x7, 0, Ecx, 11),
    Feature::new("avx512_bitalg", 0x7, 0, Ecx, 12),
    Feature::new("avx512_vpopcntdq", 0x7, 0, Ecx, 14),
    Feature::new("rdpid", 0x7, 0, Ecx, 22),
    // leaf 7 subleaf 0 edx
    Feature::new("avx512_4vnniw", 0x7, 0, Edx, 2),
    Feature::new("avx512_4fmaps", 0x7, 0, Edx, 3),
    Feature::new("serialize", 0x7, 0, Edx, 14),
    Feature::new("hybrid_cpu", 0x7, 0, Edx, 15),
    Feature::new("amx_bf16", 0x7, 0, Edx, 22),
    Feature::new("amx_tile", 0x7, 0, Edx, 24),
    Feature::new("amx_int8", 0x7, 0, Edx, 25),
    // extended leaf 1 ecx, mostly amd
    Feature::new("lahf_lm", 0x8000_0001, 0, Ecx, 0),
    Feature::new("cmp_legacy", 0x8000_0001, 0, Ecx, 1),
    Feature::new("svm", 0x8000_0001, 0, Ecx, 2),
    Feature::new("abm", 0x8000_0001, 0, Ecx, 5),
    Feature::new("sse4a", 0x8000_0001, 0, Ecx, 6),
    Feature::new("misalignsse", 0x8000_0001, 0, Ecx, 7),
    Feature::new("3dnowprefetch", 0x8000_0001, 0, Ecx, 8),
    Feature::new("xop", 0x8000_0001, 0, Ecx, 11),
    Feature::new("fma4", 0x8000_0001, 0, Ecx, 16),
    Feature::new("tbm", 0x8000_0001, 0, Ecx, 21),
    // extended leaf 1 edx
    Feature::new("syscall", 0x8000_0001, 0, Edx, 11),
    Feature::new("nx", 0x8000_0001, 0, Edx, 20),
    Feature::new("mmxext", 0x8000_0001, 0, Edx, 22),
    Feature::new("fxsr_opt", 0x8000_0001, 0, Edx, 25),
    Feature::new("pdpe1gb", 0x8000_0001, 0, Edx, 26),
    Feature::new("rdtscp", 0x8000_0001, 0, Edx, 27),
    Feature::new("lm", 0x8000_0001, 0, Edx, 29),
    Feature::new("3dnowext", 0x8000_0001, 0, Edx, 30),
    Feature::new("3dnow", 0x8000_0001, 0, Edx, 31),
];

#[cfg(test)]
mod tests {
    use super::FEATURES;
    use std::collections::HashSet;

    #[test]
    fn feature_names_are_unique() {
        let mut seen = HashSet::new();
        for feature in FEATURES {
            assert!(seen.insert(feature.name), "{} is listed twice", feature.name);
            assert!(feature.bit < 32);
        }
    }
}
