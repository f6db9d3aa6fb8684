use anyhow::{bail, Result};

// serial type codes from the record format
// https://www.sqlite.org/fileformat2.html#record_format
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SerialType {
    Null,
    Int8,
    Int16,
    Int24,
    Int32,
    Int48,
    Int64,
    Float64,
    Zero,
    One,
    Blob(usize),
    Text(usize),
}

impl SerialType {
    pub fn new(code: i64) -> Result<Self> {
        match code {
            0 => Ok(Self::Null),
            1 => Ok(Self::Int8),
            2 => Ok(Self::Int16),
            3 => Ok(Self::Int24),
            4 => Ok(Self::Int32),
            5 => Ok(Self::Int48),
            6 => Ok(Self::Int64),
            7 => Ok(Self::Float64),
            8 => Ok(Self::Zero),
            9 => Ok(Self::One),
            _ if code < 12 => bail!("invalid column type code: {code}"),
            _ if code % 2 == 0 => Ok(Self::Blob(((code - 12) / 2) as usize)),
            _ => Ok(Self::Text(((code - 13) / 2) as usize)),
        }
    }

    // number of payload bytes the value occupies
    pub fn size(&self) -> usize {
        match *self {
            Self::Null | Self::Zero | Self::One => 0,
            Self::Int8 => 1,
            Self::Int16 => 2,
            Self::Int24 => 3,
            Self::Int32 => 4,
            Self::Int48 => 6,
            Self::Int64 | Self::Float64 => 8,
            Self::Blob(size) | Self::Text(size) => size,
        }
    }
}

#[cfg(test)]
mod test {
    use super::*;

    #[test]
    fn fixed_codes() {
        assert_eq!(SerialType::new(0).unwrap(), SerialType::Null);
        assert_eq!(SerialType::new(5).unwrap(), SerialType::Int48);
        assert_eq!(SerialType::new(7).unwrap(), SerialType::Float64);
        assert_eq!(SerialType::new(8).unwrap(), SerialType::Zero);
        assert_eq!(SerialType::new(9).unwrap(), SerialType::One);
    }

    #[test]
    fn reserved_codes_are_fatal() {
        assert!(SerialType::new(10).is_err());
        assert!(SerialType::new(11).is_err());
        assert!(SerialType::new(-1).is_err());
    }

    #[test]
    fn blob_and_text_lengths() {
        assert_eq!(SerialType::new(12).unwrap(), SerialType::Blob(0));
        assert_eq!(SerialType::new(13).unwrap(), SerialType::Text(0));
        assert_eq!(SerialType::new(20).unwrap(), SerialType::Blob(4));
        assert_eq!(SerialType::new(27).unwrap(), SerialType::Text(7));
        assert_eq!(SerialType::new(27).unwrap().size(), 7);
    }

    #[test]
    fn sizes() {
        assert_eq!(SerialType::Int24.size(), 3);
        assert_eq!(SerialType::Int48.size(), 6);
        assert_eq!(SerialType::Float64.size(), 8);
        assert_eq!(SerialType::Zero.size(), 0);
    }
}
