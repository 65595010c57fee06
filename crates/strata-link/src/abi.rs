//! Calling conventions and linker configuration.

use std::fmt;

use strata_core::{MemoryError, Result};

/// A native calling convention.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Abi {
    /// System V AMD64 (Linux, macOS, BSDs on x86-64).
    SysV,
    /// Microsoft x64.
    Win64,
    /// AAPCS64 (ARM 64-bit).
    AArch64,
}

impl Abi {
    /// Map a target architecture and operating system to a calling
    /// convention.
    ///
    /// A pure lookup over the caller's strings (for example
    /// `std::env::consts::ARCH` and `OS`); nothing is probed.
    pub fn for_target(arch: &str, os: &str) -> Result<Abi> {
        match (arch, os) {
            ("x86_64", "windows") => Ok(Abi::Win64),
            ("x86_64", _) => Ok(Abi::SysV),
            ("aarch64", _) => Ok(Abi::AArch64),
            _ => Err(MemoryError::unsupported(
                "abi",
                format!("no calling convention known for {arch}-{os}"),
            )),
        }
    }

    /// Size of a general-purpose register in bytes.
    pub fn word_bytes(self) -> u64 {
        match self {
            Abi::SysV | Abi::Win64 | Abi::AArch64 => 8,
        }
    }

    /// Short, stable name.
    pub fn name(self) -> &'static str {
        match self {
            Abi::SysV => "sysv",
            Abi::Win64 => "win64",
            Abi::AArch64 => "aarch64",
        }
    }
}

impl fmt::Display for Abi {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.name())
    }
}

/// Explicit linker configuration, injected by the embedding application.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkerConfig {
    /// Calling convention for every downcall.
    pub abi: Abi,

    /// Minimum slot alignment in call buffers, in bytes.
    ///
    /// Default: the ABI's word size. Must be a power of two.
    pub word_bytes: u64,
}

impl LinkerConfig {
    /// A config for `abi` with its natural word size.
    pub fn new(abi: Abi) -> Self {
        Self {
            abi,
            word_bytes: abi.word_bytes(),
        }
    }

    /// Reject a word size no frame can be aligned to.
    pub fn validate(&self) -> Result<()> {
        if !self.word_bytes.is_power_of_two() {
            return Err(MemoryError::invalid(format!(
                "word size {} is not a power of two",
                self.word_bytes
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use strata_core::ErrorKind;

    #[test]
    fn target_mapping() {
        assert_eq!(Abi::for_target("x86_64", "linux").unwrap(), Abi::SysV);
        assert_eq!(Abi::for_target("x86_64", "macos").unwrap(), Abi::SysV);
        assert_eq!(Abi::for_target("x86_64", "windows").unwrap(), Abi::Win64);
        assert_eq!(Abi::for_target("aarch64", "linux").unwrap(), Abi::AArch64);
        assert_eq!(
            Abi::for_target("riscv64", "linux").unwrap_err().kind(),
            ErrorKind::Unsupported
        );
    }

    #[test]
    fn config_defaults_to_word_size() {
        let config = LinkerConfig::new(Abi::Win64);
        assert_eq!(config.word_bytes, 8);
        assert!(config.validate().is_ok());
        assert_eq!(config.abi.to_string(), "win64");
    }

    #[test]
    fn odd_word_size_rejected() {
        let config = LinkerConfig {
            word_bytes: 6,
            ..LinkerConfig::new(Abi::SysV)
        };
        assert_eq!(config.validate().unwrap_err().kind(), ErrorKind::InvalidArgument);
    }
}
