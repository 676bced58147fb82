use std::path::PathBuf;

use chrono::NaiveDate;

use super::*;

/// Little-endian TIFF whose EXIF says: taken 2024-06-21 18:30:05 +02:00 at 52.2297 N, 21.0122 E.
fn exif_tiff() -> Vec<u8> {
    fn entry(out: &mut Vec<u8>, tag: u16, kind: u16, count: u32, value: [u8; 4]) {
        out.extend_from_slice(&tag.to_le_bytes());
        out.extend_from_slice(&kind.to_le_bytes());
        out.extend_from_slice(&count.to_le_bytes());
        out.extend_from_slice(&value);
    }
    let mut out = b"II".to_vec();
    out.extend_from_slice(&42u16.to_le_bytes());
    out.extend_from_slice(&8u32.to_le_bytes());

    out.extend_from_slice(&2u16.to_le_bytes());
    entry(&mut out, 0x8769, 4, 1, 38u32.to_le_bytes());
    entry(&mut out, 0x8825, 4, 1, 96u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());

    out.extend_from_slice(&2u16.to_le_bytes());
    entry(&mut out, 0x9003, 2, 20, 68u32.to_le_bytes());
    entry(&mut out, 0x9011, 2, 7, 88u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    out.extend_from_slice(b"2024:06:21 18:30:05\0+02:00\0\0");

    out.extend_from_slice(&4u16.to_le_bytes());
    entry(&mut out, 0x0001, 2, 2, *b"N\0\0\0");
    entry(&mut out, 0x0002, 5, 3, 150u32.to_le_bytes());
    entry(&mut out, 0x0003, 2, 2, *b"E\0\0\0");
    entry(&mut out, 0x0004, 5, 3, 174u32.to_le_bytes());
    out.extend_from_slice(&0u32.to_le_bytes());
    for (n, d) in [(52, 1), (13, 1), (4692, 100), (21, 1), (0, 1), (4392, 100)] {
        out.extend_from_slice(&(n as u32).to_le_bytes());
        out.extend_from_slice(&(d as u32).to_le_bytes());
    }
    assert_eq!(out.len(), 198);
    out
}

fn manifest(json: &str) -> WallpaperManifest {
    WallpaperManifest::from_reader(json.as_bytes()).unwrap()
}

fn date(h: u32, m: u32, s: u32) -> chrono::NaiveDateTime {
    NaiveDate::from_ymd_opt(2024, 6, 21)
        .unwrap()
        .and_hms_opt(h, m, s)
        .unwrap()
}

#[test]
fn explicit_values_pass_through_with_list_indices() {
    let m = manifest(
        r#"{ "images": [
            { "path": "a.png", "type": "solar", "altitude": 10.0, "azimuth": 20.0 },
            { "path": "/abs/b.png", "type": "solar", "altitude": -1.5, "azimuth": 359.0, "primary": true, "appearance": "dark" }
        ] }"#,
    );
    let attrs = m.resolve(Path::new("/root/dir")).unwrap();

    assert_eq!(attrs[0].path, PathBuf::from("/root/dir/a.png"));
    assert_eq!(attrs[0].index, 0);
    assert_eq!(
        attrs[0].kind,
        ImageKind::Solar {
            altitude: 10.0,
            azimuth: 20.0
        }
    );
    assert!(!attrs[0].primary);

    assert_eq!(attrs[1].path, PathBuf::from("/abs/b.png"));
    assert_eq!(attrs[1].index, 1);
    assert!(attrs[1].primary);
    assert_eq!(
        attrs[1].appearance,
        Some(crate::metadata::attributes::Appearance::Dark)
    );
}

#[test]
fn solar_angles_come_from_location_and_taken_at() {
    let m = manifest(
        r#"{ "location": { "latitude": 52.2297, "longitude": 21.0122, "utc_offset_hours": 1, "dst_offset_hours": 1 },
             "images": [ { "path": "missing.png", "type": "solar", "taken_at": "2024-06-21T12:00:00", "primary": true } ] }"#,
    );
    // Nothing is read from disk when the manifest is self-sufficient.
    let attrs = m.resolve(Path::new("/nonexistent")).unwrap();
    let ImageKind::Solar { altitude, azimuth } = attrs[0].kind else {
        panic!("solar expected");
    };
    assert!((altitude - 60.319813789819605).abs() < 1e-9);
    assert!((azimuth - 162.2656987635129).abs() < 1e-9);
}

#[test]
fn solar_angles_fall_back_to_exif() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("shot.tiff"), exif_tiff()).unwrap();
    let m = manifest(r#"{ "images": [ { "path": "shot.tiff", "type": "solar", "primary": true } ] }"#);

    let attrs = m.resolve(dir.path()).unwrap();
    let latitude = 52.0 + 13.0 / 60.0 + 46.92 / 3600.0;
    let longitude = 21.0 + 43.92 / 3600.0;
    let expected = position(&SolarInput::new(latitude, longitude, date(18, 30, 5), 2.0, 0.0));
    assert_eq!(
        attrs[0].kind,
        ImageKind::Solar {
            altitude: expected.altitude,
            azimuth: expected.azimuth
        }
    );
}

#[test]
fn location_without_offset_uses_exif_offset() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("shot.tiff"), exif_tiff()).unwrap();
    let m = manifest(
        r#"{ "location": { "latitude": 10, "longitude": 20 },
             "images": [ { "path": "shot.tiff", "type": "solar", "taken_at": "2024-06-21T09:00:00", "primary": true } ] }"#,
    );

    let attrs = m.resolve(dir.path()).unwrap();
    let expected = position(&SolarInput::new(10.0, 20.0, date(9, 0, 0), 2.0, 0.0));
    assert_eq!(
        attrs[0].kind,
        ImageKind::Solar {
            altitude: expected.altitude,
            azimuth: expected.azimuth
        }
    );
}

#[test]
fn time_entries_use_taken_at_or_exif() {
    let dir = tempfile::tempdir().unwrap();
    std::fs::write(dir.path().join("shot.tiff"), exif_tiff()).unwrap();
    let m = manifest(
        r#"{ "images": [
            { "path": "shot.tiff", "type": "time", "primary": true },
            { "path": "other.png", "type": "time", "taken_at": "2024-06-21T06:15:00" }
        ] }"#,
    );

    let attrs = m.resolve(dir.path()).unwrap();
    assert_eq!(attrs[0].kind, ImageKind::Time { date: date(18, 30, 5) });
    assert_eq!(attrs[1].kind, ImageKind::Time { date: date(6, 15, 0) });
}

#[test]
fn unresolvable_entries_are_validation_errors() {
    let dir = tempfile::tempdir().unwrap();
    image::RgbImage::from_pixel(2, 2, image::Rgb([1, 2, 3]))
        .save_with_format(dir.path().join("plain.png"), image::ImageFormat::Png)
        .unwrap();

    for json in [
        r#"{ "images": [ { "path": "plain.png", "type": "time", "primary": true } ] }"#,
        r#"{ "images": [ { "path": "plain.png", "type": "solar", "primary": true } ] }"#,
        r#"{ "location": { "latitude": 1, "longitude": 2, "utc_offset_hours": 0 },
             "images": [ { "path": "plain.png", "type": "solar", "primary": true } ] }"#,
    ] {
        let err = manifest(json).resolve(dir.path()).unwrap_err();
        assert!(matches!(err, WallpaperError::Validation(_)), "{json}: {err}");
    }
}

#[test]
fn missing_image_needed_for_exif_is_a_file_error() {
    let m = manifest(r#"{ "images": [ { "path": "gone.jpg", "type": "time", "primary": true } ] }"#);
    let err = m.resolve(Path::new("/nonexistent")).unwrap_err();
    assert!(matches!(err, WallpaperError::File(_)));
}
