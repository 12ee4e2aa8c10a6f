use std::path::{Path, PathBuf};

use image::{imageops, DynamicImage, Rgb, RgbImage, RgbaImage};

use crate::capture::shot::Shot;
use crate::compositing::domain::shot_compositor::ShotCompositor;
use crate::compositing::domain::strip_layout::{strip_copies, StripLayout};
use crate::shared::constants::STRIP_BORDER_PX;

const BACKGROUND: Rgb<u8> = Rgb([255, 255, 255]);

/// Composes a session into a printable sheet with the `image` crate.
///
/// Each shot optionally gets a translucent filter overlay, an optional stamp
/// image is placed in front of the shots, and the resulting strip is stacked
/// once per person in the picture.
pub struct StripCompositor {
    stamp_path: Option<PathBuf>,
    filter_path: Option<PathBuf>,
    open_on_save: bool,
}

impl StripCompositor {
    pub fn new(stamp_path: Option<PathBuf>, filter_path: Option<PathBuf>) -> Self {
        Self {
            stamp_path,
            filter_path,
            open_on_save: false,
        }
    }

    /// Open each finished sheet in the system image viewer.
    pub fn with_open_on_save(mut self, open_on_save: bool) -> Self {
        self.open_on_save = open_on_save;
        self
    }

    fn load_filter(&self) -> Result<Option<RgbaImage>, Box<dyn std::error::Error>> {
        match existing(self.filter_path.as_deref()) {
            Some(path) => Ok(Some(image::open(path)?.to_rgba8())),
            None => {
                log::debug!("No filter image configured or file missing");
                Ok(None)
            }
        }
    }

    fn load_stamp(&self, height: u32) -> Result<Option<RgbImage>, Box<dyn std::error::Error>> {
        let Some(path) = existing(self.stamp_path.as_deref()) else {
            return Ok(None);
        };
        let stamp = image::open(path)?.to_rgb8();
        Ok(Some(imageops::resize(
            &stamp,
            stamp.width(),
            height,
            imageops::FilterType::Triangle,
        )))
    }
}

impl ShotCompositor for StripCompositor {
    fn compose(
        &mut self,
        shots: Vec<Shot>,
        output_path: &Path,
    ) -> Result<(), Box<dyn std::error::Error>> {
        let first = shots.first().ok_or("cannot compose an empty session")?;
        let (width, height) = (first.frame.width(), first.frame.height());
        let face_counts: Vec<usize> = shots.iter().map(|s| s.face_count).collect();

        let filter = self.load_filter()?;
        let mut tiles = Vec::with_capacity(shots.len());
        for shot in shots {
            let mut tile = to_rgb_image(shot)?;
            if let Some(filter) = &filter {
                tile = apply_filter(tile, filter);
            }
            tiles.push(tile);
        }
        let stamp = self.load_stamp(height)?;

        let layout = StripLayout {
            lead_width: stamp.as_ref().map_or(0, |s| s.width()),
            tile_width: width,
            tile_height: height,
            tiles: tiles.len() as u32,
            copies: strip_copies(&face_counts) as u32,
            border: STRIP_BORDER_PX,
        };
        let sheet = render(stamp.as_ref(), &tiles, &layout);

        if let Some(parent) = output_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        sheet.save(output_path)?;
        log::info!(
            "Saved {}x{} sheet ({} cop{}) to {}",
            sheet.width(),
            sheet.height(),
            layout.copies,
            if layout.copies == 1 { "y" } else { "ies" },
            output_path.display()
        );

        if self.open_on_save {
            if let Err(e) = open::that(output_path) {
                log::warn!("Could not open {}: {e}", output_path.display());
            }
        }
        Ok(())
    }
}

fn existing(path: Option<&Path>) -> Option<&Path> {
    path.filter(|p| p.exists())
}

fn to_rgb_image(shot: Shot) -> Result<RgbImage, Box<dyn std::error::Error>> {
    let (w, h) = (shot.frame.width(), shot.frame.height());
    RgbImage::from_raw(w, h, shot.frame.into_data())
        .ok_or_else(|| format!("frame data does not match {w}x{h}").into())
}

/// Alpha-blends `filter`, stretched to the tile size, over the tile.
fn apply_filter(tile: RgbImage, filter: &RgbaImage) -> RgbImage {
    let (w, h) = tile.dimensions();
    let overlay = imageops::resize(filter, w, h, imageops::FilterType::Triangle);
    let mut base = DynamicImage::ImageRgb8(tile).to_rgba8();
    imageops::overlay(&mut base, &overlay, 0, 0);
    DynamicImage::ImageRgba8(base).to_rgb8()
}

fn render(stamp: Option<&RgbImage>, tiles: &[RgbImage], layout: &StripLayout) -> RgbImage {
    let mut strip = RgbImage::from_pixel(layout.strip_width(), layout.strip_height(), BACKGROUND);
    if let (Some(stamp), Some((x, y))) = (stamp, layout.lead_origin()) {
        imageops::overlay(&mut strip, stamp, x as i64, y as i64);
    }
    for (i, tile) in tiles.iter().enumerate() {
        let (x, y) = layout.tile_origin(i as u32);
        imageops::overlay(&mut strip, tile, x as i64, y as i64);
    }

    let mut sheet = RgbImage::from_pixel(layout.strip_width(), layout.sheet_height(), BACKGROUND);
    for i in 0..layout.copies {
        imageops::overlay(&mut sheet, &strip, 0, layout.copy_offset(i) as i64);
    }
    sheet
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::shared::frame::Frame;
    use tempfile::TempDir;

    fn shot(rgb: [u8; 3], faces: usize) -> Shot {
        Shot {
            frame: Frame::filled(40, 30, rgb, 0),
            face_count: faces,
        }
    }

    fn sheet_size(tiles: u32, tile_w: u32, copies: u32) -> (u32, u32) {
        let b = STRIP_BORDER_PX;
        (tiles * tile_w + (tiles + 1) * b, copies * (30 + 2 * b) + (copies - 1) * b)
    }

    #[test]
    fn test_compose_writes_sheet_with_expected_geometry() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("sessions").join("s.png");
        let mut compositor = StripCompositor::new(None, None);

        compositor
            .compose(
                vec![shot([255, 0, 0], 2), shot([0, 255, 0], 2), shot([0, 0, 255], 1)],
                &out,
            )
            .unwrap();

        let img = image::open(&out).unwrap().to_rgb8();
        assert_eq!(img.dimensions(), sheet_size(3, 40, 2));
        assert_eq!(img.get_pixel(0, 0).0, [255, 255, 255]);
        let b = STRIP_BORDER_PX;
        assert_eq!(img.get_pixel(b, b).0, [255, 0, 0]);
        assert_eq!(img.get_pixel(b + 40 + b, b).0, [0, 255, 0]);
        // second copy starts one strip plus one border down
        assert_eq!(img.get_pixel(b, b + 30 + 3 * b).0, [255, 0, 0]);
    }

    #[test]
    fn test_stamp_is_prepended_at_tile_height() {
        let tmp = TempDir::new().unwrap();
        let stamp_path = tmp.path().join("stamp.png");
        RgbImage::from_pixel(20, 60, Rgb([9, 9, 9]))
            .save(&stamp_path)
            .unwrap();
        let out = tmp.path().join("s.png");
        let mut compositor = StripCompositor::new(Some(stamp_path), None);

        compositor.compose(vec![shot([255, 0, 0], 1)], &out).unwrap();

        let img = image::open(&out).unwrap().to_rgb8();
        let b = STRIP_BORDER_PX;
        let (w, h) = sheet_size(1, 40, 1);
        assert_eq!(img.dimensions(), (w + 20 + b, h));
        assert_eq!(img.get_pixel(b, b).0, [9, 9, 9]);
        assert_eq!(img.get_pixel(b + 20 + b, b).0, [255, 0, 0]);
    }

    #[test]
    fn test_opaque_filter_replaces_pixels() {
        let tmp = TempDir::new().unwrap();
        let filter_path = tmp.path().join("filter.png");
        RgbaImage::from_pixel(4, 4, image::Rgba([0, 0, 0, 255]))
            .save(&filter_path)
            .unwrap();
        let out = tmp.path().join("s.png");
        let mut compositor = StripCompositor::new(None, Some(filter_path));

        compositor.compose(vec![shot([200, 200, 200], 1)], &out).unwrap();

        let img = image::open(&out).unwrap().to_rgb8();
        let b = STRIP_BORDER_PX;
        assert_eq!(img.get_pixel(b + 5, b + 5).0, [0, 0, 0]);
    }

    #[test]
    fn test_missing_overlay_files_are_ignored() {
        let tmp = TempDir::new().unwrap();
        let out = tmp.path().join("s.png");
        let mut compositor = StripCompositor::new(
            Some(tmp.path().join("nope.png")),
            Some(tmp.path().join("nada.png")),
        );

        compositor.compose(vec![shot([1, 2, 3], 1)], &out).unwrap();

        let img = image::open(&out).unwrap();
        assert_eq!(img.width(), sheet_size(1, 40, 1).0);
    }

    #[test]
    fn test_empty_session_is_an_error() {
        let tmp = TempDir::new().unwrap();
        let mut compositor = StripCompositor::new(None, None);
        assert!(compositor.compose(Vec::new(), &tmp.path().join("s.png")).is_err());
    }
}
