use voxsprite_atlas::SubRegion;

/// Glyphs stacked in the font atlas.
pub const GLYPH_COUNT: u32 = 40;
/// Glyph drawn for characters the font has no shape for.
pub const FALLBACK_GLYPH: u32 = 39;
/// Horizontal and vertical spacing between character cells.
pub const CELL_SPACING: f32 = 1.5;

/// Glyph index for `c`: `A`-`Z` then `0`-`9`, everything else falls back.
pub fn glyph_index(c: char) -> u32 {
    match c {
        'A'..='Z' => c as u32 - 'A' as u32,
        '0'..='9' => 26 + (c as u32 - '0' as u32),
        _ => FALLBACK_GLYPH,
    }
}

pub fn glyph_region(c: char) -> SubRegion {
    SubRegion::stacked(glyph_index(c), GLYPH_COUNT)
}

/// Lays out a multi-line message centred in a 20-column grid.
/// Spaces produce no cells.
pub fn layout_message(message: &str) -> Vec<(char, [f32; 2])> {
    let mut cells = Vec::new();
    for (row, line) in message.split('\n').enumerate() {
        let len = line.chars().count() as f32;
        let indent = (20.0 - len) / 2.0;
        for (col, c) in line.chars().enumerate() {
            if c != ' ' {
                cells.push((c, [col as f32 + indent, row as f32]));
            }
        }
    }
    cells
}

/// The HUD line: score on the left, oxygen on the right, padded to
/// 18 columns between them.
pub fn hud_line(score: u32, oxygen: u32) -> String {
    let score = score.to_string();
    let oxygen = oxygen.to_string();
    let pad = 18usize.saturating_sub(score.len() + oxygen.len());
    format!("SCORE {score}{}{oxygen} O2", " ".repeat(pad))
}

#[cfg(test)]
mod tests {
    use super::*;
    use glam::Vec2;

    #[test]
    fn glyph_mapping() {
        assert_eq!(glyph_index('A'), 0);
        assert_eq!(glyph_index('Z'), 25);
        assert_eq!(glyph_index('0'), 26);
        assert_eq!(glyph_index('9'), 35);
        assert_eq!(glyph_index('!'), 39);
        assert_eq!(glyph_index('q'), FALLBACK_GLYPH);
    }

    #[test]
    fn glyph_region_selects_stack_row() {
        let region = glyph_region('B');
        assert_eq!(region.scale, Vec2::new(1.0, 1.0 / 40.0));
        assert_eq!(region.offset, Vec2::new(0.0, 1.0 / 40.0));
    }

    #[test]
    fn message_layout_centres_and_skips_spaces() {
        let cells = layout_message("AB C\nXY");
        assert_eq!(cells.len(), 5);
        assert_eq!(cells[0], ('A', [8.0, 0.0]));
        assert_eq!(cells[2], ('C', [11.0, 0.0]));
        assert_eq!(cells[3], ('X', [9.0, 1.0]));
    }

    #[test]
    fn hud_pads_between_fields() {
        let line = hud_line(3, 1000);
        assert_eq!(line, format!("SCORE 3{}1000 O2", " ".repeat(13)));
    }
}
