#[cfg(test)]
mod tests {
    use std::io::Read;

    use crate::clock::FixedClock;
    use crate::core::ChecksumPolicy;
    use crate::encode::{checksum, encode_octal};
    use crate::error::TarError;
    use crate::header::{layout, EntryMetadata, EntryType, BLOCK_SIZE};
    use crate::sync::{TarReader, TarWriter};

    fn read_all(archive: &[u8]) -> Vec<(EntryMetadata, Vec<u8>)> {
        let mut reader = TarReader::new(archive, ChecksumPolicy::Strict);
        let mut out = Vec::new();
        while let Some(mut entry) = reader.next_entry().unwrap() {
            let content = entry.read_content().unwrap();
            out.push((entry.into_metadata(), content));
        }
        out
    }

    fn two_item_archive() -> Vec<u8> {
        let mut buf = Vec::new();
        let mut writer = TarWriter::with_clock(&mut buf, FixedClock(1_700_000_000));
        writer
            .append_bytes("item1.txt", b"Hello World 1\n")
            .unwrap();
        writer
            .append_bytes("item2.txt", b"Hello World 2\n")
            .unwrap();
        writer.finish().unwrap();
        drop(writer);
        buf
    }

    #[test]
    fn sync_two_item_roundtrip() {
        let archive = two_item_archive();
        assert_eq!(archive.len(), 6 * BLOCK_SIZE);

        let entries = read_all(&archive);
        assert_eq!(entries.len(), 2);

        assert_eq!(entries[0].0.name, "item1.txt");
        assert_eq!(entries[0].0.entry_type, EntryType::File);
        assert_eq!(entries[0].0.mtime, Some(1_700_000_000));
        assert_eq!(entries[0].1, b"Hello World 1\n");

        assert_eq!(entries[1].0.name, "item2.txt");
        assert_eq!(entries[1].0.entry_type, EntryType::File);
        assert_eq!(entries[1].1, b"Hello World 2\n");
    }

    #[test]
    fn sync_empty_archive() {
        let archive = [0u8; 2 * BLOCK_SIZE];
        let mut reader = TarReader::new(&archive[..], ChecksumPolicy::Strict);
        assert!(reader.next_entry().unwrap().is_none());
        assert!(reader.next_entry().unwrap().is_none());
    }

    #[test]
    fn sync_finished_writer_produces_empty_archive() {
        let mut buf = Vec::new();
        let mut writer = TarWriter::new(&mut buf);
        writer.finish().unwrap();
        drop(writer);
        assert_eq!(buf, vec![0u8; 2 * BLOCK_SIZE]);
    }

    #[test]
    fn sync_single_trailing_zero_block() {
        let mut archive = two_item_archive();
        archive.truncate(archive.len() - BLOCK_SIZE);
        assert_eq!(read_all(&archive).len(), 2);
    }

    #[test]
    fn sync_long_name_roundtrip() {
        let name = format!("{}/{}", "dir".repeat(30), "f".repeat(59));
        assert_eq!(name.len(), 150);

        let mut buf = Vec::new();
        let mut writer = TarWriter::with_clock(&mut buf, FixedClock(0));
        writer.append_bytes(&name, b"long").unwrap();
        writer.append_bytes("short.txt", b"short").unwrap();
        writer.finish().unwrap();
        drop(writer);

        let entries = read_all(&buf);
        assert_eq!(entries.len(), 2);
        assert_eq!(entries[0].0.name, name);
        assert_eq!(entries[0].1, b"long");
        assert_eq!(entries[1].0.name, "short.txt");
        assert_eq!(entries[1].1, b"short");
    }

    #[test]
    fn sync_finish_twice_fails() {
        let mut buf = Vec::new();
        let mut writer = TarWriter::new(&mut buf);
        writer.finish().unwrap();
        assert!(writer.is_finished());
        assert!(matches!(
            writer.finish(),
            Err(TarError::WriterAlreadyFinished)
        ));
        assert!(matches!(
            writer.append_bytes("late.txt", b"late"),
            Err(TarError::WriterAlreadyFinished)
        ));
        drop(writer);
        // The failed calls wrote nothing.
        assert_eq!(buf.len(), 2 * BLOCK_SIZE);
    }

    #[test]
    fn sync_position_is_block_aligned() {
        let mut buf = Vec::new();
        let mut writer = TarWriter::new(&mut buf);
        let mut expected = 0u64;
        for size in [0usize, 1, 511, 512, 513, 2000] {
            let data = vec![b'z'; size];
            writer.append_bytes("f", &data).unwrap();
            let padding = (512 - size % 512) % 512;
            expected += (512 + size + padding) as u64;
            assert_eq!(writer.position(), expected);
            assert_eq!(writer.position() % 512, 0);
        }
        writer.finish().unwrap();
        let position = writer.position();
        drop(writer);
        assert_eq!(position, buf.len() as u64);
    }

    #[test]
    fn sync_invalid_name() {
        let mut buf = Vec::new();
        let mut writer = TarWriter::new(&mut buf);
        assert!(matches!(
            writer.append_bytes("", b"x"),
            Err(TarError::InvalidName(_))
        ));
        writer.finish().unwrap();
    }

    #[test]
    fn sync_short_content_is_reported() {
        let mut buf = Vec::new();
        let mut writer = TarWriter::new(&mut buf);
        let result = writer.append_entry("short.txt", &b"abc"[..], 10);
        assert!(matches!(
            result,
            Err(TarError::ContentLengthMismatch {
                expected: 10,
                actual: 3
            })
        ));
        assert!(!writer.is_finished());
    }

    #[test]
    fn sync_failed_append_stops_the_writer() {
        let mut buf = Vec::new();
        let mut writer = TarWriter::new(&mut buf);
        writer.append_bytes("good.txt", b"good").unwrap();
        assert!(writer.append_entry("short.txt", &b"abc"[..], 10).is_err());
        let written = writer.get_ref().len();

        assert!(matches!(
            writer.append_bytes("next.txt", b"next"),
            Err(TarError::WriterFailed)
        ));
        assert!(matches!(writer.finish(), Err(TarError::WriterFailed)));
        assert!(!writer.is_finished());
        // Nothing is written once the writer has failed.
        assert_eq!(writer.get_ref().len(), written);
        drop(writer);

        // The archive is left without a trailer, so readers see it as truncated.
        let mut reader = TarReader::new(&buf[..], ChecksumPolicy::Strict);
        assert_eq!(reader.next_entry().unwrap().unwrap().name(), "good.txt");
        let mut short = reader.next_entry().unwrap().unwrap();
        assert_eq!(short.name(), "short.txt");
        assert!(matches!(
            short.read_content(),
            Err(TarError::TruncatedArchive)
        ));
    }

    /// Accepts `limit` bytes, then fails every write.
    struct BrokenSink {
        written: Vec<u8>,
        limit: usize,
    }

    impl std::io::Write for BrokenSink {
        fn write(&mut self, buf: &[u8]) -> std::io::Result<usize> {
            let room = self.limit - self.written.len();
            if room == 0 {
                return Err(std::io::Error::new(std::io::ErrorKind::Other, "disk full"));
            }
            let n = room.min(buf.len());
            self.written.extend_from_slice(&buf[..n]);
            Ok(n)
        }

        fn flush(&mut self) -> std::io::Result<()> {
            Ok(())
        }
    }

    #[test]
    fn sync_sink_failure_mid_entry_stops_the_writer() {
        let sink = BrokenSink {
            written: Vec::new(),
            limit: BLOCK_SIZE + 100,
        };
        let mut writer = TarWriter::new(sink);
        assert!(matches!(
            writer.append_bytes("big.bin", &[1u8; 1000]),
            Err(TarError::SinkUnavailable(_))
        ));
        assert!(matches!(writer.finish(), Err(TarError::WriterFailed)));
        assert_eq!(writer.get_ref().written.len(), BLOCK_SIZE + 100);
    }

    #[test]
    fn sync_invalid_entry_leaves_writer_usable() {
        let mut buf = Vec::new();
        let mut writer = TarWriter::new(&mut buf);
        assert!(writer.append_bytes("", b"x").is_err());
        writer.append_bytes("ok.txt", b"ok").unwrap();
        writer.finish().unwrap();
        drop(writer);
        assert_eq!(read_all(&buf).len(), 1);
    }

    #[test]
    fn sync_unread_content_is_skipped() {
        let big = vec![7u8; 1500];
        let mut buf = Vec::new();
        let mut writer = TarWriter::new(&mut buf);
        writer.append_bytes("big.bin", &big).unwrap();
        writer.append_bytes("after.txt", b"after").unwrap();
        writer.finish().unwrap();
        drop(writer);

        let mut reader = TarReader::new(&buf[..], ChecksumPolicy::Strict);
        {
            let mut entry = reader.next_entry().unwrap().unwrap();
            let mut partial = [0u8; 100];
            entry.read_exact(&mut partial).unwrap();
            assert_eq!(entry.remaining(), 1400);
        }
        {
            let mut entry = reader.next_entry().unwrap().unwrap();
            assert_eq!(entry.name(), "after.txt");
            let mut s = String::new();
            entry.read_to_string(&mut s).unwrap();
            assert_eq!(s, "after");
        }
        assert!(reader.next_entry().unwrap().is_none());
    }

    #[test]
    fn sync_directories_and_other_types() {
        let mut buf = Vec::new();
        let mut writer = TarWriter::new(&mut buf);
        writer.append_dir("dir").unwrap();
        let other = EntryMetadata {
            entry_type: EntryType::Other(b'2'),
            ..EntryMetadata::file("dir/link", 4)
        };
        writer.append(&other, &b"abcd"[..]).unwrap();
        writer.append_bytes("dir/file.txt", b"content").unwrap();
        writer.finish().unwrap();
        drop(writer);

        let entries = read_all(&buf);
        let kinds: Vec<_> = entries
            .iter()
            .map(|(m, _)| (m.name.as_str(), m.entry_type))
            .collect();
        assert_eq!(
            kinds,
            vec![
                ("dir", EntryType::Directory),
                ("dir/link", EntryType::Other(b'2')),
                ("dir/file.txt", EntryType::File),
            ]
        );
        assert!(entries[0].1.is_empty());
        assert_eq!(entries[0].0.mode, 0o755);
        assert_eq!(entries[1].1, b"abcd");
        assert_eq!(entries[2].1, b"content");
    }

    #[test]
    fn sync_truncated_archives() {
        let archive = two_item_archive();

        // Empty source: no header at all.
        let mut reader = TarReader::new(&b""[..], ChecksumPolicy::Strict);
        assert!(matches!(
            reader.next_entry(),
            Err(TarError::TruncatedArchive)
        ));

        // Cut inside the first header.
        let mut reader = TarReader::new(&archive[..300], ChecksumPolicy::Strict);
        assert!(matches!(
            reader.next_entry(),
            Err(TarError::TruncatedArchive)
        ));

        // Cut inside the first entry's content.
        let mut reader = TarReader::new(&archive[..520], ChecksumPolicy::Strict);
        let mut entry = reader.next_entry().unwrap().unwrap();
        assert!(matches!(
            entry.read_content(),
            Err(TarError::TruncatedArchive)
        ));

        // Cut inside the first entry's padding.
        let mut reader = TarReader::new(&archive[..600], ChecksumPolicy::Strict);
        reader.next_entry().unwrap().unwrap();
        assert!(matches!(
            reader.next_entry(),
            Err(TarError::TruncatedArchive)
        ));

        // No end-of-archive marker.
        let mut reader = TarReader::new(&archive[..1024], ChecksumPolicy::Strict);
        reader.next_entry().unwrap().unwrap();
        assert!(matches!(
            reader.next_entry(),
            Err(TarError::TruncatedArchive)
        ));
    }

    #[test]
    fn sync_truncated_entry_surfaces_through_read() {
        let archive = two_item_archive();
        let mut reader = TarReader::new(&archive[..520], ChecksumPolicy::Strict);
        let mut entry = reader.next_entry().unwrap().unwrap();
        let mut buf = Vec::new();
        let err = entry.read_to_end(&mut buf).unwrap_err();
        assert_eq!(err.kind(), std::io::ErrorKind::UnexpectedEof);
    }

    #[test]
    fn sync_checksum_policy() {
        let mut archive = two_item_archive();
        let header: &mut [u8; BLOCK_SIZE] = (&mut archive[..BLOCK_SIZE]).try_into().unwrap();
        let (sum, _) = checksum(header);
        encode_octal(&mut header[layout::CHECKSUM], sum + 1).unwrap();

        let mut strict = TarReader::new(&archive[..], ChecksumPolicy::Strict);
        assert!(matches!(
            strict.next_entry(),
            Err(TarError::BadChecksum { .. })
        ));

        let mut lenient = TarReader::new(&archive[..], ChecksumPolicy::Warn);
        let mut entry = lenient.next_entry().unwrap().unwrap();
        assert_eq!(entry.read_content().unwrap(), b"Hello World 1\n");
        drop(entry);
        assert_eq!(lenient.next_entry().unwrap().unwrap().name(), "item2.txt");
    }

    #[test]
    fn sync_unfinished_writer_leaves_no_trailer() {
        let mut buf = Vec::new();
        {
            let mut writer = TarWriter::new(&mut buf);
            writer.append_bytes("a.txt", b"a").unwrap();
            assert!(!writer.is_finished());
        }
        assert_eq!(buf.len(), 2 * BLOCK_SIZE);

        let mut reader = TarReader::new(&buf[..], ChecksumPolicy::Strict);
        assert_eq!(reader.next_entry().unwrap().unwrap().name(), "a.txt");
        assert!(matches!(
            reader.next_entry(),
            Err(TarError::TruncatedArchive)
        ));
    }

    #[test]
    fn sync_errors_are_terminal() {
        let archive = two_item_archive();
        let mut reader = TarReader::new(&archive[..600], ChecksumPolicy::Strict);
        reader.next_entry().unwrap().unwrap();
        assert!(reader.next_entry().is_err());
        assert!(reader.next_entry().unwrap().is_none());
    }
}
