use mensch_dump::image;
use mensch_dump::DumpError;
use std::fs;
use tempfile::tempdir;

/// Reply to `d 00:0200 00:021F` as the monitor prints it: the echoed high
/// address, data lines, then the prompt.
const CAPTURE: &str = "0021F\r\
00:A9008D0002A2FFBD0003F00A9D0004CA10F560EAEA ...........`..\r\
00:4D454E534348 MENSCH\r\
\r>";

#[test]
fn test_capture_to_image() {
    let dir = tempdir().unwrap();
    let capture = dir.path().join("dump.txt");
    let output = dir.path().join("rom.bin");
    fs::write(&capture, CAPTURE).unwrap();

    let image = image::convert_file(&capture, &output).unwrap();

    let written = fs::read(&output).unwrap();
    assert_eq!(written, image.as_bytes());
    assert_eq!(written.len(), 21 + 6);
    assert_eq!(&written[..4], &[0xA9, 0x00, 0x8D, 0x00]);
    assert_eq!(&written[21..], b"MENSCH");
}

#[test]
fn test_conversion_is_repeatable() {
    let dir = tempdir().unwrap();
    let capture = dir.path().join("dump.txt");
    fs::write(&capture, CAPTURE).unwrap();

    let first = image::convert_file(&capture, &dir.path().join("a.bin")).unwrap();
    let second = image::convert_file(&capture, &dir.path().join("b.bin")).unwrap();

    assert_eq!(first, second);
    assert_eq!(first.checksum(), second.checksum());
}

#[test]
fn test_malformed_capture_is_rejected() {
    let dir = tempdir().unwrap();
    let capture = dir.path().join("dump.txt");
    let output = dir.path().join("rom.bin");
    fs::write(&capture, "00:0102 ..\r\n00:ABC ..\r\n").unwrap();

    let err = image::convert_file(&capture, &output).unwrap_err();
    assert!(matches!(
        err,
        DumpError::MalformedHexLine { line_number: 2, .. }
    ));
    assert!(!output.exists());
}

#[test]
fn test_missing_capture() {
    let dir = tempdir().unwrap();
    let err = image::convert_file(&dir.path().join("absent.txt"), &dir.path().join("rom.bin"))
        .unwrap_err();
    assert!(matches!(err, DumpError::Io(_)));
}
