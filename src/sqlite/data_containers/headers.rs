use crate::sqlite::utils::{read_u16_be, read_u32_be};
use anyhow::{bail, Result};

const MAGIC: &[u8; 16] = b"SQLite format 3\0";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DbTextEncoding {
    Utf8,
    Utf16le,
    Utf16be,
}

impl DbTextEncoding {
    pub fn code(&self) -> u32 {
        match self {
            Self::Utf8 => 1,
            Self::Utf16le => 2,
            Self::Utf16be => 3,
        }
    }

    pub fn description(&self) -> &'static str {
        match self {
            Self::Utf8 => " (utf8)",
            Self::Utf16le => " (utf16le)",
            Self::Utf16be => " (utf16be)",
        }
    }
}

impl TryFrom<u32> for DbTextEncoding {
    type Error = String;
    fn try_from(decoded_value: u32) -> Result<DbTextEncoding, String> {
        match decoded_value {
            1_u32 => Ok(DbTextEncoding::Utf8),
            2_u32 => Ok(DbTextEncoding::Utf16le),
            3_u32 => Ok(DbTextEncoding::Utf16be),
            other => Err(format!("unknown text encoding: {other}")),
        }
    }
}

// container for the 100 byte database file header, plus object counts
// accumulated while the schema table is read
#[derive(Debug)]
pub struct DatabaseHeader {
    pub page_size: u32,
    pub write_format: u8,
    pub read_format: u8,
    pub reserved_bytes: u8,
    pub max_embedded_payload_fraction: u8,
    pub min_embedded_payload_fraction: u8,
    pub leaf_payload_fraction: u8,
    pub file_change_counter: u32,
    pub database_page_count: u32,
    pub first_freelist_page: u32,
    pub freelist_page_count: u32,
    pub schema_cookie: u32,
    pub schema_format: u32,
    pub default_cache_size: u32,
    pub autovacuum_top_root: u32,
    pub text_encoding: DbTextEncoding,
    pub user_version: u32,
    pub incremental_vacuum: u32,
    pub application_id: u32,
    pub version_valid_for: u32,
    pub software_version: u32,
    // derived: page size minus the per page reserved region
    pub usable_page_size: u32,
    // filled in while decoding the schema table
    pub number_of_tables: u32,
    pub number_of_indexes: u32,
    pub number_of_triggers: u32,
    pub number_of_views: u32,
    pub schema_size: u32,
}

impl DatabaseHeader {
    pub fn new(buffer: &[u8]) -> Result<DatabaseHeader> {
        if buffer.len() < 100 {
            bail!("file too short to hold a database header");
        }
        if &buffer[0..16] != MAGIC {
            bail!("not a valid SQLite 3 file");
        }

        // a raw page size of 1 means 65536
        let raw_page_size = read_u16_be(&buffer[16..18]);
        let page_size = match raw_page_size {
            1 => 65536_u32,
            other => other as u32,
        };

        let reserved_bytes = buffer[20];
        let text_encoding = match DbTextEncoding::try_from(read_u32_be(&buffer[56..60])) {
            Ok(encoding) => encoding,
            Err(e) => bail!(e),
        };

        Ok(DatabaseHeader {
            page_size,
            write_format: buffer[18],
            read_format: buffer[19],
            reserved_bytes,
            max_embedded_payload_fraction: buffer[21],
            min_embedded_payload_fraction: buffer[22],
            leaf_payload_fraction: buffer[23],
            file_change_counter: read_u32_be(&buffer[24..28]),
            database_page_count: read_u32_be(&buffer[28..32]),
            first_freelist_page: read_u32_be(&buffer[32..36]),
            freelist_page_count: read_u32_be(&buffer[36..40]),
            schema_cookie: read_u32_be(&buffer[40..44]),
            schema_format: read_u32_be(&buffer[44..48]),
            default_cache_size: read_u32_be(&buffer[48..52]),
            autovacuum_top_root: read_u32_be(&buffer[52..56]),
            text_encoding,
            user_version: read_u32_be(&buffer[60..64]),
            incremental_vacuum: read_u32_be(&buffer[64..68]),
            application_id: read_u32_be(&buffer[68..72]),
            version_valid_for: read_u32_be(&buffer[92..96]),
            software_version: read_u32_be(&buffer[96..100]),
            usable_page_size: page_size - reserved_bytes as u32,
            number_of_tables: 0,
            number_of_indexes: 0,
            number_of_triggers: 0,
            number_of_views: 0,
            schema_size: 0,
        })
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn sample_header() -> Vec<u8> {
        let mut buffer = vec![0_u8; 100];
        buffer[0..16].copy_from_slice(MAGIC);
        buffer[16..18].copy_from_slice(&4096_u16.to_be_bytes());
        buffer[18] = 1;
        buffer[19] = 1;
        buffer[56..60].copy_from_slice(&1_u32.to_be_bytes());
        buffer
    }

    #[test]
    fn parses_page_size_and_encoding() {
        let header = DatabaseHeader::new(&sample_header()).unwrap();
        assert_eq!(header.page_size, 4096);
        assert_eq!(header.usable_page_size, 4096);
        assert_eq!(header.text_encoding, DbTextEncoding::Utf8);
    }

    #[test]
    fn raw_page_size_one_means_64k() {
        let mut buffer = sample_header();
        buffer[16..18].copy_from_slice(&1_u16.to_be_bytes());
        let header = DatabaseHeader::new(&buffer).unwrap();
        assert_eq!(header.page_size, 65536);
    }

    #[test]
    fn reserved_bytes_shrink_usable_size() {
        let mut buffer = sample_header();
        buffer[20] = 32;
        let header = DatabaseHeader::new(&buffer).unwrap();
        assert_eq!(header.usable_page_size, 4096 - 32);
    }

    #[test]
    fn bad_magic_is_fatal() {
        let mut buffer = sample_header();
        buffer[0] = b'X';
        assert!(DatabaseHeader::new(&buffer).is_err());
    }

    #[test]
    fn unknown_encoding_is_fatal() {
        let mut buffer = sample_header();
        buffer[56..60].copy_from_slice(&4_u32.to_be_bytes());
        assert!(DatabaseHeader::new(&buffer).is_err());
    }
}
