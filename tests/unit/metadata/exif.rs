use std::io::Cursor;

use chrono::NaiveDate;

use super::*;

const ASCII: u16 = 2;
const LONG: u16 = 4;
const RATIONAL: u16 = 5;

fn entry(out: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: [u8; 4]) {
    out.extend_from_slice(&tag.to_le_bytes());
    out.extend_from_slice(&kind.to_le_bytes());
    out.extend_from_slice(&count.to_le_bytes());
    out.extend_from_slice(&value);
}

fn rationals(out: &mut Vec<u8>, parts: [(u32, u32); 3]) {
    for (n, d) in parts {
        out.extend_from_slice(&n.to_le_bytes());
        out.extend_from_slice(&d.to_le_bytes());
    }
}

/// Little-endian TIFF with an Exif IFD (capture time + offset) and a GPS IFD.
fn tiff_with_exif_and_gps() -> Vec<u8> {
    let mut out = Vec::new();
    out.extend_from_slice(b"II");
    out.extend_from_slice(&42u16.to_le_bytes());
    out.extend_from_slice(&8u32.to_le_bytes());

    // IFD0 @8: Exif pointer, GPS pointer.
    out.extend_from_slice(&2u16.to_le_bytes());
    entry(&mut out, 0x8769, LONG, 1, 38u32.to_le_bytes());
    entry(&mut out, 0x8825, LONG, 1, 96u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    assert_eq!(out.len(), 38);

    // Exif IFD @38.
    out.extend_from_slice(&2u16.to_le_bytes());
    entry(&mut out, 0x9003, ASCII, 20, 68u32.to_le_bytes());
    entry(&mut out, 0x9011, ASCII, 7, 88u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    assert_eq!(out.len(), 68);
    out.extend_from_slice(b"2024:06:21 18:30:05\0");
    out.extend_from_slice(b"+02:00\0");
    out.push(0);
    assert_eq!(out.len(), 96);

    // GPS IFD @96.
    out.extend_from_slice(&4u16.to_le_bytes());
    entry(&mut out, 0x0001, ASCII, 2, *b"N\0\0\0");
    entry(&mut out, 0x0002, RATIONAL, 3, 150u32.to_le_bytes());
    entry(&mut out, 0x0003, ASCII, 2, *b"W\0\0\0");
    entry(&mut out, 0x0004, RATIONAL, 3, 174u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    assert_eq!(out.len(), 150);
    rationals(&mut out, [(52, 1), (13, 1), (4692, 100)]);
    rationals(&mut out, [(21, 1), (0, 1), (4392, 100)]);
    out
}

#[test]
fn reads_gps_date_and_offset() {
    let meta = ExifMetadata::from_bytes(&tiff_with_exif_and_gps());

    let lat = meta.latitude.unwrap();
    let lon = meta.longitude.unwrap();
    assert!((lat - (52.0 + 13.0 / 60.0 + 46.92 / 3600.0)).abs() < 1e-12);
    assert!((lon + (21.0 + 43.92 / 3600.0)).abs() < 1e-12);

    assert_eq!(
        meta.create_date,
        NaiveDate::from_ymd_opt(2024, 6, 21)
            .unwrap()
            .and_hms_opt(18, 30, 5)
    );
    assert_eq!(meta.utc_offset_hours(), Some(2.0));
}

#[test]
fn read_from_file_matches_in_memory() {
    let dir = tempfile::tempdir().unwrap();
    let path = dir.path().join("shot.tiff");
    std::fs::write(&path, tiff_with_exif_and_gps()).unwrap();
    let from_file = ExifMetadata::read(&path).unwrap();
    assert_eq!(from_file, ExifMetadata::from_bytes(&tiff_with_exif_and_gps()));
}

#[test]
fn images_without_exif_yield_absent_fields() {
    let img = image::RgbImage::from_pixel(1, 1, image::Rgb([0, 0, 0]));
    let mut buf = Vec::new();
    image::DynamicImage::ImageRgb8(img)
        .write_to(&mut Cursor::new(&mut buf), image::ImageFormat::Png)
        .unwrap();
    assert_eq!(ExifMetadata::from_bytes(&buf), ExifMetadata::default());
    assert_eq!(ExifMetadata::from_bytes(b"junk"), ExifMetadata::default());
}

#[test]
fn unreadable_file_is_an_error() {
    assert!(ExifMetadata::read(Path::new("/no/such/file.jpg")).is_err());
}

#[test]
fn dms_conversion() {
    let value = exif::Value::Rational(vec![
        exif::Rational::from((10, 1)),
        exif::Rational::from((30, 1)),
        exif::Rational::from((36, 1)),
    ]);
    assert!((dms_to_degrees(&value).unwrap() - 10.51).abs() < 1e-12);
    assert_eq!(dms_to_degrees(&exif::Value::Byte(vec![1])), None);
}
