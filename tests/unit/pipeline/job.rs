use super::*;

use crate::metadata::attributes::ImageKind;

#[test]
fn job_streams_progress_and_returns_bytes() {
    let dir = tempfile::tempdir().unwrap();
    let mut attrs = Vec::new();
    for (i, hour) in [6u32, 12, 18].into_iter().enumerate() {
        let path = dir.path().join(format!("{hour}.png"));
        image::RgbImage::from_pixel(4, 4, image::Rgb([hour as u8 * 10, 0, 0]))
            .save_with_format(&path, image::ImageFormat::Png)
            .unwrap();
        let date = chrono::NaiveDate::from_ymd_opt(2024, 1, 1)
            .unwrap()
            .and_hms_opt(hour, 0, 0)
            .unwrap();
        let attr = ImageAttributes::new(path, i, ImageKind::Time { date });
        attrs.push(if i == 0 { attr.primary() } else { attr });
    }

    let job = spawn_wallpaper_job(attrs, WallpaperOptions::default());
    let steps: Vec<Progress> = job.progress().iter().collect();
    let bytes = job.join().unwrap();

    assert_eq!(
        steps.iter().map(|p| p.step).collect::<Vec<_>>(),
        vec![1, 2, 3, 4]
    );
    assert!(steps.last().unwrap().is_complete());
    assert_eq!(&bytes[4..8], b"ftyp");
}

#[test]
fn job_failures_come_back_through_join() {
    let job = spawn_wallpaper_job(Vec::new(), WallpaperOptions::default());
    assert_eq!(job.progress().iter().count(), 0);
    assert!(job.join().is_err());
}
