use std::{
    sync::mpsc::{self, Receiver},
    thread::JoinHandle,
};

use crate::{
    bundle::assemble::{Progress, WallpaperOptions},
    foundation::error::{WallpaperError, WallpaperResult},
    metadata::attributes::ImageAttributes,
    pipeline::create::create_wallpaper,
};

/// Handle to a [`create_wallpaper`] call running on a worker thread.
#[derive(Debug)]
pub struct WallpaperJob {
    progress: Receiver<Progress>,
    handle: JoinHandle<WallpaperResult<Vec<u8>>>,
}

impl WallpaperJob {
    /// Progress reports; the channel closes when the worker finishes.
    pub fn progress(&self) -> &Receiver<Progress> {
        &self.progress
    }

    /// Wait for the worker and take its result.
    pub fn join(self) -> WallpaperResult<Vec<u8>> {
        self.handle
            .join()
            .map_err(|_| WallpaperError::Other(anyhow::anyhow!("wallpaper worker panicked")))?
    }
}

/// Run [`create_wallpaper`] on a new thread.
pub fn spawn_wallpaper_job(
    attributes: Vec<ImageAttributes>,
    options: WallpaperOptions,
) -> WallpaperJob {
    let (tx, rx) = mpsc::channel();
    let handle = std::thread::spawn(move || {
        // A dropped receiver only means nobody is watching.
        let mut forward = |p: Progress| {
            let _ = tx.send(p);
        };
        create_wallpaper(attributes, &options, Some(&mut forward))
    });
    WallpaperJob {
        progress: rx,
        handle,
    }
}

#[cfg(test)]
#[path = "../../tests/unit/pipeline/job.rs"]
mod tests;
