/// IoU above which two overlapping detections are treated as the same face.
pub const DEFAULT_IOU_THRESHOLD: f64 = 0.3;

/// A detected face rectangle in frame pixel coordinates.
#[derive(Clone, Debug, PartialEq)]
pub struct Region {
    pub x: i32,
    pub y: i32,
    pub width: i32,
    pub height: i32,
    /// Detector confidence in `[0, 1]`.
    pub score: f64,
}

impl Region {
    /// Greedy non-maximum suppression: highest score first, a region is kept
    /// only if its IoU with every kept region is at or below the threshold.
    pub fn suppress_overlaps(regions: &[Region], iou_threshold: f64) -> Vec<Region> {
        let mut ordered = regions.to_vec();
        ordered.sort_by(|a, b| {
            b.score
                .partial_cmp(&a.score)
                .unwrap_or(std::cmp::Ordering::Equal)
        });

        let mut kept: Vec<Region> = Vec::with_capacity(ordered.len());
        for r in ordered {
            if kept.iter().all(|k| r.iou(k) <= iou_threshold) {
                kept.push(r);
            }
        }
        kept
    }

    pub fn iou(&self, other: &Region) -> f64 {
        let ix1 = self.x.max(other.x);
        let iy1 = self.y.max(other.y);
        let ix2 = (self.x + self.width).min(other.x + other.width);
        let iy2 = (self.y + self.height).min(other.y + other.height);

        let inter = (ix2 - ix1).max(0) as f64 * (iy2 - iy1).max(0) as f64;
        if inter == 0.0 {
            return 0.0;
        }

        let area_a = self.width as f64 * self.height as f64;
        let area_b = other.width as f64 * other.height as f64;
        inter / (area_a + area_b - inter)
    }
}
