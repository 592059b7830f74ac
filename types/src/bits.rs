// Beacon API responses encode SSZ bitfields as `0x`-prefixed hex.
// Bits are numbered from the least significant bit of the first byte.
// A bitlist is terminated by a single delimiter bit that is not part of the list.

use core::{
    fmt::{Display, Formatter, Result as FmtResult},
    ops::Deref,
    str::FromStr,
};

use bitvec::{order::Lsb0, vec::BitVec};
use serde_with::{DeserializeFromStr, SerializeDisplay};
use thiserror::Error;

pub type Bits = BitVec<u8, Lsb0>;

#[derive(Debug, Error)]
pub enum Error {
    #[error("bitfield is not valid hex: {0}")]
    Hex(#[from] hex::FromHexError),
    #[error("bitlist lacks a length delimiter")]
    MissingDelimiter,
}

#[derive(Clone, PartialEq, Eq, Default, Debug, DeserializeFromStr, SerializeDisplay)]
pub struct BitList(Bits);

impl Deref for BitList {
    type Target = Bits;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Bits> for BitList {
    fn from(bits: Bits) -> Self {
        Self(bits)
    }
}

impl FromStr for BitList {
    type Err = Error;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        let bytes = decode_prefixed_hex(string)?;

        let Some(last_byte) = bytes.last().copied().filter(|byte| *byte != 0) else {
            return Err(Error::MissingDelimiter);
        };

        let delimiter_position = (bytes.len() - 1) * 8 + (7 - last_byte.leading_zeros() as usize);

        let mut bits = Bits::from_vec(bytes);
        bits.truncate(delimiter_position);

        Ok(Self(bits))
    }
}

impl Display for BitList {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        let mut bits = self.0.clone();
        bits.push(true);
        bits.set_uninitialized(false);

        write!(formatter, "0x{}", hex::encode(bits.into_vec()))
    }
}

/// Fixed-size bitfield. The size is implied by the number of bytes in the encoding.
#[derive(Clone, PartialEq, Eq, Default, Debug, DeserializeFromStr, SerializeDisplay)]
pub struct BitVector(Bits);

impl Deref for BitVector {
    type Target = Bits;

    fn deref(&self) -> &Self::Target {
        &self.0
    }
}

impl From<Bits> for BitVector {
    fn from(bits: Bits) -> Self {
        Self(bits)
    }
}

impl FromStr for BitVector {
    type Err = Error;

    fn from_str(string: &str) -> Result<Self, Self::Err> {
        decode_prefixed_hex(string)
            .map(Bits::from_vec)
            .map(Self)
            .map_err(Into::into)
    }
}

impl Display for BitVector {
    fn fmt(&self, formatter: &mut Formatter) -> FmtResult {
        let mut bits = self.0.clone();
        bits.set_uninitialized(false);

        write!(formatter, "0x{}", hex::encode(bits.into_vec()))
    }
}

fn decode_prefixed_hex(string: &str) -> Result<Vec<u8>, hex::FromHexError> {
    hex::decode(string.strip_prefix("0x").unwrap_or(string))
}

#[cfg(test)]
mod tests {
    use test_case::test_case;

    use super::*;

    #[test_case("0x01", &[]; "empty list")]
    #[test_case("0x0b", &[true, true, false]; "delimiter in first byte")]
    #[test_case("0xff01", &[true; 8]; "delimiter in second byte")]
    #[test_case("0x0502", &[true, false, true, false, false, false, false, false, false]; "sparse")]
    fn bitlist_decodes_without_delimiter(encoded: &str, expected: &[bool]) -> Result<(), Error> {
        let bit_list = encoded.parse::<BitList>()?;

        assert_eq!(bit_list.iter().by_vals().collect::<Vec<_>>(), expected);
        assert_eq!(bit_list.to_string(), encoded);

        Ok(())
    }

    #[test_case("0x"; "no bytes")]
    #[test_case("0x0100"; "zero last byte")]
    fn bitlist_without_delimiter_is_rejected(encoded: &str) {
        assert!(matches!(
            encoded.parse::<BitList>(),
            Err(Error::MissingDelimiter),
        ));
    }

    #[test]
    fn bitvector_keeps_every_bit() -> Result<(), Error> {
        let bit_vector = "0x8001".parse::<BitVector>()?;

        assert_eq!(bit_vector.len(), 16);
        assert_eq!(bit_vector.iter_ones().collect::<Vec<_>>(), [7, 8]);

        Ok(())
    }

    #[test]
    fn bitfields_deserialize_from_json_strings() -> Result<(), serde_json::Error> {
        let bit_list = serde_json::from_str::<BitList>("\"0x0b\"")?;

        assert_eq!(bit_list.count_ones(), 2);

        Ok(())
    }
}
