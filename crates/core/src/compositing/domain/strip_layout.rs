use std::collections::HashMap;

use crate::shared::constants::MAX_STRIP_COPIES;

/// How many times the strip is stacked on the sheet: one copy per person,
/// using the most common face count across the session's shots.
///
/// Ties go to the smaller count. Sessions where no face was ever seen still
/// get one copy, and the result never exceeds [`MAX_STRIP_COPIES`].
pub fn strip_copies(face_counts: &[usize]) -> usize {
    let mut tally: HashMap<usize, usize> = HashMap::new();
    for &count in face_counts {
        *tally.entry(count).or_default() += 1;
    }
    let most_common = tally
        .into_iter()
        .max_by(|(count_a, freq_a), (count_b, freq_b)| {
            freq_a.cmp(freq_b).then(count_b.cmp(count_a))
        })
        .map(|(count, _)| count)
        .unwrap_or(0);
    most_common.clamp(1, MAX_STRIP_COPIES)
}

/// Pixel geometry of a composed sheet.
///
/// Tiles sit side by side in one strip with `border` pixels around and
/// between them, optionally preceded by a lead column (the stamp) of
/// `lead_width`. The sheet stacks `copies` strips with `border` pixels
/// between consecutive strips.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StripLayout {
    pub lead_width: u32,
    pub tile_width: u32,
    pub tile_height: u32,
    pub tiles: u32,
    pub copies: u32,
    pub border: u32,
}

impl StripLayout {
    fn lead_span(&self) -> u32 {
        if self.lead_width == 0 {
            0
        } else {
            self.lead_width + self.border
        }
    }

    pub fn strip_width(&self) -> u32 {
        self.lead_span() + self.tiles * self.tile_width + (self.tiles + 1) * self.border
    }

    pub fn strip_height(&self) -> u32 {
        self.tile_height + 2 * self.border
    }

    pub fn sheet_height(&self) -> u32 {
        self.copies * self.strip_height() + self.copies.saturating_sub(1) * self.border
    }

    /// Top-left corner of the lead column, if there is one.
    pub fn lead_origin(&self) -> Option<(u32, u32)> {
        (self.lead_width > 0).then_some((self.border, self.border))
    }

    /// Top-left corner of tile `i` within a strip.
    pub fn tile_origin(&self, i: u32) -> (u32, u32) {
        (
            self.lead_span() + self.border + i * (self.tile_width + self.border),
            self.border,
        )
    }

    /// Vertical offset of strip copy `i` on the sheet.
    pub fn copy_offset(&self, i: u32) -> u32 {
        i * (self.strip_height() + self.border)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;

    #[rstest]
    #[case::empty(&[], 1)]
    #[case::no_faces(&[0, 0, 0], 1)]
    #[case::unanimous(&[2, 2, 2], 2)]
    #[case::majority(&[3, 1, 3], 3)]
    #[case::tie_prefers_smaller(&[1, 4], 1)]
    #[case::three_way_tie(&[3, 1, 2], 1)]
    #[case::zero_majority(&[0, 0, 5], 1)]
    #[case::capped(&[9, 9, 9], MAX_STRIP_COPIES)]
    fn test_strip_copies(#[case] counts: &[usize], #[case] expected: usize) {
        assert_eq!(strip_copies(counts), expected);
    }

    fn layout(tiles: u32, copies: u32) -> StripLayout {
        StripLayout {
            lead_width: 0,
            tile_width: 100,
            tile_height: 80,
            tiles,
            copies,
            border: 10,
        }
    }

    #[test]
    fn test_strip_dimensions() {
        let l = layout(3, 1);
        assert_eq!(l.strip_width(), 3 * 100 + 4 * 10);
        assert_eq!(l.strip_height(), 100);
        assert_eq!(l.sheet_height(), 100);
    }

    #[test]
    fn test_sheet_height_with_copies() {
        assert_eq!(layout(3, 2).sheet_height(), 2 * 100 + 10);
    }

    #[test]
    fn test_tile_and_copy_offsets() {
        let l = layout(3, 2);
        assert_eq!(l.tile_origin(0), (10, 10));
        assert_eq!(l.tile_origin(2), (230, 10));
        assert_eq!(l.copy_offset(1), 110);
        // last tile ends one border before the strip edge
        assert_eq!(l.tile_origin(2).0 + l.tile_width + l.border, l.strip_width());
        assert_eq!(l.lead_origin(), None);
    }

    #[test]
    fn test_lead_column_shifts_tiles() {
        let l = StripLayout {
            lead_width: 30,
            ..layout(2, 1)
        };
        assert_eq!(l.strip_width(), 10 + 30 + 10 + 2 * 100 + 10);
        assert_eq!(l.lead_origin(), Some((10, 10)));
        assert_eq!(l.tile_origin(0), (50, 10));
        assert_eq!(l.tile_origin(1).0 + l.tile_width + l.border, l.strip_width());
    }
}
