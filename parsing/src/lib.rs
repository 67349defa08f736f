//! This crate contains the code dedicated to parsing CPUID dumps into [`cpuid::Cpu`] records.

pub mod cpuid;
