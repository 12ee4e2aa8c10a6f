use std::path::{Path, PathBuf};

use crate::shared::constants::IMAGE_EXTENSIONS;
use crate::shared::frame::Frame;
use crate::video::domain::frame_source::FrameSource;

/// Plays a directory of still images, in file name order, as if it were a
/// camera. Useful for rehearsing a booth without hardware.
pub struct ImageSequenceSource {
    dir: PathBuf,
    fps: f64,
    looping: bool,
    files: Vec<PathBuf>,
    cursor: usize,
    next_index: usize,
}

impl ImageSequenceSource {
    pub fn new(dir: &Path, fps: f64) -> Self {
        Self {
            dir: dir.to_path_buf(),
            fps,
            looping: true,
            files: Vec::new(),
            cursor: 0,
            next_index: 0,
        }
    }

    pub fn with_looping(mut self, looping: bool) -> Self {
        self.looping = looping;
        self
    }

    fn next_path(&mut self) -> Option<PathBuf> {
        if self.cursor >= self.files.len() {
            if !self.looping || self.files.is_empty() {
                return None;
            }
            self.cursor = 0;
        }
        let path = self.files[self.cursor].clone();
        self.cursor += 1;
        Some(path)
    }
}

fn is_image(path: &Path) -> bool {
    path.extension()
        .and_then(|e| e.to_str())
        .is_some_and(|ext| IMAGE_EXTENSIONS.contains(&ext.to_ascii_lowercase().as_str()))
}

impl FrameSource for ImageSequenceSource {
    fn open(&mut self) -> Result<(), Box<dyn std::error::Error>> {
        let mut files: Vec<PathBuf> = std::fs::read_dir(&self.dir)?
            .filter_map(|entry| entry.ok().map(|e| e.path()))
            .filter(|p| p.is_file() && is_image(p))
            .collect();
        if files.is_empty() {
            return Err(format!("no images found in {}", self.dir.display()).into());
        }
        files.sort();
        log::info!("Playing {} images from {}", files.len(), self.dir.display());
        self.files = files;
        self.cursor = 0;
        Ok(())
    }

    fn read_frame(&mut self) -> Option<Frame> {
        let path = self.next_path()?;
        match image::open(&path) {
            Ok(img) => {
                let rgb = img.to_rgb8();
                let (w, h) = rgb.dimensions();
                let frame = Frame::new(rgb.into_raw(), w, h, self.next_index);
                self.next_index += 1;
                Some(frame)
            }
            Err(e) => {
                log::warn!("Skipping unreadable image {}: {e}", path.display());
                None
            }
        }
    }

    fn nominal_fps(&self) -> Option<f64> {
        Some(self.fps)
    }

    fn release(&mut self) {
        self.files.clear();
        self.cursor = 0;
    }
}
