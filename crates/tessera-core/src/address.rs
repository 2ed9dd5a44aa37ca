//! Standard contract addresses (`workchain:hash`).

use std::fmt;
use std::str::FromStr;

/// A standard (non-anycast) address: signed workchain id plus a 256-bit account hash.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Address {
    pub workchain: i8,
    pub hash: [u8; 32],
}

impl Address {
    pub fn new(workchain: i8, hash: [u8; 32]) -> Self {
        Self { workchain, hash }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum AddressParseError {
    #[error("address must have the form `<workchain>:<64 hex digits>`")]
    MissingSeparator,
    #[error("invalid workchain id `{0}`")]
    InvalidWorkchain(String),
    #[error("account hash must be 64 hex digits, got {0}")]
    InvalidHashLength(usize),
    #[error("invalid hex digit in account hash")]
    InvalidHex,
}

impl FromStr for Address {
    type Err = AddressParseError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (wc, hex) = s.split_once(':').ok_or(AddressParseError::MissingSeparator)?;
        let workchain = wc
            .parse::<i8>()
            .map_err(|_| AddressParseError::InvalidWorkchain(wc.to_owned()))?;

        if hex.len() != 64 {
            return Err(AddressParseError::InvalidHashLength(hex.len()));
        }

        let mut hash = [0u8; 32];
        for (i, byte) in hash.iter_mut().enumerate() {
            let pair = &hex[i * 2..i * 2 + 2];
            *byte = u8::from_str_radix(pair, 16).map_err(|_| AddressParseError::InvalidHex)?;
        }

        Ok(Self { workchain, hash })
    }
}

impl fmt::Display for Address {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:", self.workchain)?;
        for byte in &self.hash {
            write!(f, "{byte:02x}")?;
        }
        Ok(())
    }
}
