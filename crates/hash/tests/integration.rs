//! Integration tests for hash crate

#[cfg(test)]
mod tests {
    use conpack_hash::*;
    use std::io::Write;
    use tempfile::tempdir;

    #[test]
    fn test_hash_zip_entry_matches_raw_bytes() {
        let dir = tempdir().unwrap();
        let zip_path = dir.path().join("pkg.zip");

        let data = b"entry bytes that get deflated on the way in";
        {
            let file = std::fs::File::create(&zip_path).unwrap();
            let mut writer = zip::ZipWriter::new(file);
            writer
                .start_file("lib/a.dll", zip::write::SimpleFileOptions::default())
                .unwrap();
            writer.write_all(data).unwrap();
            writer.finish().unwrap();
        }

        let file = std::fs::File::open(&zip_path).unwrap();
        let mut archive = zip::ZipArchive::new(file).unwrap();
        let entry = archive.by_name("lib/a.dll").unwrap();
        let (hash, size) = Hash::hash_reader(entry).unwrap();

        assert_eq!(hash, Hash::from_data(data));
        assert_eq!(size, data.len() as u64);
    }

    #[test]
    fn test_hash_from_hex_errors() {
        // Too short
        let result = Hash::from_hex("1234");
        assert!(result.is_err());

        // Too long
        let result = Hash::from_hex(&"a".repeat(66));
        assert!(result.is_err());

        // Invalid hex
        let result = Hash::from_hex("xyz123");
        assert!(result.is_err());
    }

    #[test]
    fn test_hex_roundtrip_and_ordering() {
        let a = Hash::from_data(b"a");
        let b = Hash::from_data(b"b");
        assert_eq!(Hash::from_hex(&a.to_hex()).unwrap(), a);

        // Byte ordering and hex ordering agree, so sorted hash lists sort the
        // same way whether kept as digests or as strings.
        assert_eq!(a.cmp(&b), a.to_hex().cmp(&b.to_hex()));
    }

    #[test]
    fn test_is_hex_digest() {
        assert!(!Hash::is_hex_digest("ABC"));
        assert!(!Hash::is_hex_digest(&"A".repeat(HEX_LEN)));
        assert!(Hash::is_hex_digest(&"0f".repeat(32)));
    }
}
