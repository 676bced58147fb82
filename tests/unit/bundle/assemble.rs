use std::path::{Path, PathBuf};

use super::*;

use crate::metadata::{
    attributes::{Appearance, ImageKind},
    encode::encode,
};

fn write_image(dir: &Path, name: &str, format: image::ImageFormat, size: (u32, u32)) -> PathBuf {
    let path = dir.join(name);
    image::RgbImage::from_pixel(size.0, size.1, image::Rgb([10, 120, 200]))
        .save_with_format(&path, format)
        .unwrap();
    path
}

fn solar_set(dir: &Path) -> Vec<ImageAttributes> {
    vec![
        ImageAttributes::new(
            write_image(dir, "a.png", image::ImageFormat::Png, (16, 8)),
            0,
            ImageKind::Solar {
                altitude: 45.0,
                azimuth: 180.0,
            },
        )
        .primary(),
        ImageAttributes::new(
            write_image(dir, "b.jpg", image::ImageFormat::Jpeg, (16, 8)),
            1,
            ImageKind::Solar {
                altitude: -10.0,
                azimuth: 300.0,
            },
        ),
        ImageAttributes::new(
            write_image(dir, "c.tiff", image::ImageFormat::Tiff, (32, 16)),
            2,
            ImageKind::Solar {
                altitude: 5.5,
                azimuth: 90.25,
            },
        ),
    ]
}

#[test]
fn assembles_all_frames_with_metadata_on_primary_only() {
    let dir = tempfile::tempdir().unwrap();
    let attrs = solar_set(dir.path());
    let metadata = encode(&attrs).unwrap();

    let mut seen = Vec::new();
    let mut record = |p: Progress| seen.push((p.step, p.total));
    let bytes = assemble(
        &attrs,
        &metadata,
        &WallpaperOptions::default(),
        Some(&mut record),
    )
    .unwrap();
    assert_eq!(seen, vec![(1, 4), (2, 4), (3, 4), (4, 4)]);

    let info = inspect(&bytes).unwrap();
    assert_eq!(info.frames.len(), 3);
    assert_eq!(info.primary_item_id, info.frames[0].item_id);
    let flagged: Vec<_> = info.frames.iter().map(|f| f.has_metadata).collect();
    assert_eq!(flagged, vec![true, false, false]);
    assert!(info.frames[0].primary);
    assert_eq!(info.frames[2].dimensions, Some((32, 16)));
    assert!(info.frames.iter().all(|f| f.codec == FourCc::JPEG));

    match info.metadata {
        Some(ImageMetadata::Solar(solar)) => {
            let triples: Vec<_> = solar
                .entries
                .iter()
                .map(|e| (e.index, e.altitude, e.azimuth))
                .collect();
            assert_eq!(
                triples,
                vec![(0, 45.0, 180.0), (1, -10.0, 300.0), (2, 5.5, 90.25)]
            );
        }
        other => panic!("expected solar metadata, got {other:?}"),
    }
}

#[test]
fn assembles_without_progress_callback() {
    let dir = tempfile::tempdir().unwrap();
    let attrs = vec![
        ImageAttributes::new(
            write_image(dir.path(), "l.png", image::ImageFormat::Png, (4, 4)),
            0,
            ImageKind::Appearance,
        )
        .primary()
        .with_appearance(Appearance::Light),
        ImageAttributes::new(
            write_image(dir.path(), "d.png", image::ImageFormat::Png, (4, 4)),
            1,
            ImageKind::Appearance,
        )
        .with_appearance(Appearance::Dark),
    ];
    let metadata = encode(&attrs).unwrap();
    let bytes = assemble(&attrs, &metadata, &WallpaperOptions::default(), None).unwrap();

    let info = inspect(&bytes).unwrap();
    assert_eq!(info.frames.len(), 2);
    assert!(matches!(info.metadata, Some(ImageMetadata::Appearance(_))));
}

#[test]
fn zero_images_fail_before_progress() {
    let metadata = SerializedMetadata {
        key: ImageMetadata::SOLAR_KEY,
        value: String::new(),
    };
    let mut calls = 0;
    let mut count = |_: Progress| calls += 1;
    let err = assemble(
        &[],
        &metadata,
        &WallpaperOptions::default(),
        Some(&mut count),
    )
    .unwrap_err();
    assert!(matches!(
        err,
        WallpaperError::Image(ImageError::DestinationNotCreated(_))
    ));
    assert_eq!(calls, 0);
}

#[test]
fn unreadable_frame_aborts_without_completion() {
    let dir = tempfile::tempdir().unwrap();
    let mut attrs = solar_set(dir.path());
    attrs[1].path = dir.path().join("missing.png");
    let metadata = encode(&attrs).unwrap();

    let mut seen = Vec::new();
    let mut record = |p: Progress| seen.push(p.step);
    let err = assemble(
        &attrs,
        &metadata,
        &WallpaperOptions::default(),
        Some(&mut record),
    )
    .unwrap_err();
    assert!(matches!(err, WallpaperError::File(_)));
    assert_eq!(seen, vec![1]);
}

#[test]
fn quality_is_validated() {
    assert!(WallpaperOptions { jpeg_quality: 0 }.validate().is_err());
    assert!(WallpaperOptions { jpeg_quality: 101 }.validate().is_err());
    assert!(WallpaperOptions { jpeg_quality: 1 }.validate().is_ok());
    assert_eq!(WallpaperOptions::default().jpeg_quality, 90);
}

#[test]
fn progress_reports_fraction() {
    let p = Progress { step: 1, total: 4 };
    assert_eq!(p.fraction(), 0.25);
    assert!(!p.is_complete());
    assert!(Progress { step: 4, total: 4 }.is_complete());
}

#[test]
fn inspect_rejects_non_heif() {
    let err = inspect(b"definitely not a container").unwrap_err();
    assert!(matches!(err, WallpaperError::Image(_)));
}

#[test]
fn inspect_rejects_meta_with_oversized_largesize() {
    let mut bytes = Vec::new();
    bytes.extend_from_slice(&16u32.to_be_bytes());
    bytes.extend_from_slice(b"ftypmif1");
    bytes.extend_from_slice(&0u32.to_be_bytes());
    bytes.extend_from_slice(&1u32.to_be_bytes());
    bytes.extend_from_slice(b"meta");
    bytes.extend_from_slice(&u64::MAX.to_be_bytes());

    let err = inspect(&bytes).unwrap_err();
    assert!(
        matches!(err, WallpaperError::Image(ImageError::InvalidImageFormat(_))),
        "{err:?}"
    );
}
