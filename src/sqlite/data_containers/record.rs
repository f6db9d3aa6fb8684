use super::headers::DbTextEncoding;
use super::serial_types::SerialType;
use crate::sqlite::utils::{read_big_endian_int, read_varint, Varint};
use anyhow::{bail, Result};
use std::fmt;

// a single decoded column value
#[derive(Debug, Clone, PartialEq)]
pub enum Value {
    Null,
    Int(i64),
    Real(f64),
    Text(String),
    Blob(Vec<u8>),
}

impl Value {
    fn from_serial_type(
        buffer: &[u8],
        serial_type: SerialType,
        encoding: DbTextEncoding,
    ) -> Result<Value> {
        let value = match serial_type {
            SerialType::Null => Value::Null,
            SerialType::Int8
            | SerialType::Int16
            | SerialType::Int24
            | SerialType::Int32
            | SerialType::Int48
            | SerialType::Int64 => Value::Int(read_big_endian_int(buffer)),
            SerialType::Float64 => {
                let bits = read_big_endian_int(buffer) as u64;
                Value::Real(f64::from_bits(bits))
            }
            SerialType::Zero => Value::Int(0),
            SerialType::One => Value::Int(1),
            SerialType::Blob(_) => Value::Blob(buffer.to_vec()),
            SerialType::Text(_) => Value::Text(decode_text(buffer, encoding)),
        };
        Ok(value)
    }
}

// rows print with the display form of each value: nulls come out empty,
// blobs are rendered as their bytes interpreted as text
impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Null => Ok(()),
            Value::Int(v) => write!(f, "{v}"),
            Value::Real(v) => write!(f, "{v}"),
            Value::Text(v) => write!(f, "{v}"),
            Value::Blob(v) => write!(f, "{}", String::from_utf8_lossy(v)),
        }
    }
}

fn decode_text(buffer: &[u8], encoding: DbTextEncoding) -> String {
    match encoding {
        DbTextEncoding::Utf8 => String::from_utf8_lossy(buffer).into_owned(),
        DbTextEncoding::Utf16le => {
            let units = buffer
                .chunks_exact(2)
                .map(|pair| u16::from_le_bytes([pair[0], pair[1]]));
            char::decode_utf16(units)
                .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        }
        DbTextEncoding::Utf16be => {
            let units = buffer
                .chunks_exact(2)
                .map(|pair| u16::from_be_bytes([pair[0], pair[1]]));
            char::decode_utf16(units)
                .map(|r| r.unwrap_or(char::REPLACEMENT_CHARACTER))
                .collect()
        }
    }
}

// decode the self describing record format into one value per column:
// a leading varint gives the header size, the header holds one serial
// type varint per column, the payloads follow in header order
pub fn parse_record(record: &[u8], encoding: DbTextEncoding) -> Result<Vec<Value>> {
    let Varint {
        value: header_size,
        byte_size,
    } = read_varint(record);

    if header_size < byte_size as i64 || header_size as usize > record.len() {
        bail!("malformed record: header size {header_size} out of range");
    }
    let header_end = header_size as usize;

    let mut serial_types: Vec<SerialType> = Vec::new();
    let mut offset = byte_size;
    while offset < header_end {
        let Varint {
            value: type_code,
            byte_size,
        } = read_varint(&record[offset..header_end]);
        offset += byte_size;
        serial_types.push(SerialType::new(type_code)?);
    }

    let mut columns: Vec<Value> = Vec::with_capacity(serial_types.len());
    let mut offset = header_end;
    for serial_type in serial_types {
        let size = serial_type.size();
        if offset + size > record.len() {
            bail!("malformed record: payload truncated");
        }
        columns.push(Value::from_serial_type(
            &record[offset..offset + size],
            serial_type,
            encoding,
        )?);
        offset += size;
    }

    Ok(columns)
}

#[cfg(test)]
mod test {
    use super::*;

    // build a record from (serial type code, payload bytes) pairs
    fn encode_record(columns: &[(i64, &[u8])]) -> Vec<u8> {
        let mut header: Vec<u8> = Vec::new();
        for (code, _) in columns {
            assert!(*code < 0x80, "test encoder only handles one byte type codes");
            header.push(*code as u8);
        }
        let mut record = vec![(header.len() + 1) as u8];
        record.extend_from_slice(&header);
        for (_, payload) in columns {
            record.extend_from_slice(payload);
        }
        record
    }

    #[test]
    fn decodes_typed_columns() {
        let record = encode_record(&[
            (0, &[]),
            (1, &[0x2A]),
            (2, &[0x01, 0x00]),
            (8, &[]),
            (9, &[]),
            (19, b"abc"),
        ]);
        let values = parse_record(&record, DbTextEncoding::Utf8).unwrap();
        assert_eq!(
            values,
            vec![
                Value::Null,
                Value::Int(42),
                Value::Int(256),
                Value::Int(0),
                Value::Int(1),
                Value::Text("abc".into()),
            ]
        );
    }

    #[test]
    fn decodes_negative_integers() {
        let record = encode_record(&[(1, &[0xFF]), (2, &[0xFF, 0x00])]);
        let values = parse_record(&record, DbTextEncoding::Utf8).unwrap();
        assert_eq!(values, vec![Value::Int(-1), Value::Int(-256)]);
    }

    #[test]
    fn decodes_floats_bit_exact() {
        let bits = 3.25_f64.to_bits().to_be_bytes();
        let record = encode_record(&[(7, &bits)]);
        let values = parse_record(&record, DbTextEncoding::Utf8).unwrap();
        let Value::Real(v) = &values[0] else {
            panic!("expected a float, got {:?}", values[0]);
        };
        assert_eq!(v.to_bits(), 3.25_f64.to_bits());
    }

    #[test]
    fn decodes_blobs() {
        let record = encode_record(&[(12 + 2 * 3, &[0xDE, 0xAD, 0xBE])]);
        let values = parse_record(&record, DbTextEncoding::Utf8).unwrap();
        assert_eq!(values, vec![Value::Blob(vec![0xDE, 0xAD, 0xBE])]);
    }

    #[test]
    fn decodes_utf16_text() {
        // "hi" in both byte orders, type code 13 + 2*4
        let le = encode_record(&[(13 + 2 * 4, &[0x68, 0x00, 0x69, 0x00])]);
        let be = encode_record(&[(13 + 2 * 4, &[0x00, 0x68, 0x00, 0x69])]);
        assert_eq!(
            parse_record(&le, DbTextEncoding::Utf16le).unwrap(),
            vec![Value::Text("hi".into())]
        );
        assert_eq!(
            parse_record(&be, DbTextEncoding::Utf16be).unwrap(),
            vec![Value::Text("hi".into())]
        );
    }

    #[test]
    fn reserved_type_code_is_fatal() {
        let record = encode_record(&[(10, &[0x00])]);
        assert!(parse_record(&record, DbTextEncoding::Utf8).is_err());
    }

    #[test]
    fn truncated_payload_is_fatal() {
        let mut record = encode_record(&[(19, b"abc")]);
        record.truncate(record.len() - 1);
        assert!(parse_record(&record, DbTextEncoding::Utf8).is_err());
    }

    #[test]
    fn oversized_header_is_fatal() {
        // header size claims more bytes than the record holds
        let record = vec![0x7F, 0x01];
        assert!(parse_record(&record, DbTextEncoding::Utf8).is_err());
    }

    #[test]
    fn display_forms() {
        assert_eq!(Value::Null.to_string(), "");
        assert_eq!(Value::Int(-7).to_string(), "-7");
        assert_eq!(Value::Real(2.5).to_string(), "2.5");
        assert_eq!(Value::Text("abc".into()).to_string(), "abc");
        assert_eq!(Value::Blob(b"raw".to_vec()).to_string(), "raw");
    }
}
