use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Average glyph advance as a fraction of the font size, for bold sans faces.
const GLYPH_WIDTH_RATIO: f64 = 0.55;

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CaptionStyle {
    pub font_size: u32,
    pub fill: String,
    pub stroke: String,
    pub stroke_width: u32,
    /// Share of the frame width a caption line may occupy.
    pub wrap_fraction: f64,
    pub uppercase: bool,
    pub font_file: Option<PathBuf>,
}

impl Default for CaptionStyle {
    fn default() -> Self {
        Self {
            font_size: 65,
            fill: "yellow".to_string(),
            stroke: "black".to_string(),
            stroke_width: 2,
            wrap_fraction: 0.9,
            uppercase: true,
            font_file: None,
        }
    }
}

impl CaptionStyle {
    pub fn chars_per_line(&self, frame_width: u32) -> usize {
        let usable = frame_width as f64 * self.wrap_fraction.clamp(0.05, 1.0);
        let glyph = self.font_size.max(1) as f64 * GLYPH_WIDTH_RATIO;
        ((usable / glyph).floor() as usize).max(1)
    }

    pub fn line_height(&self) -> u32 {
        (self.font_size as f64 * 1.2).round() as u32
    }

    pub fn layout(&self, text: &str, frame_width: u32) -> Vec<String> {
        let text = if self.uppercase {
            text.to_uppercase()
        } else {
            text.to_string()
        };
        wrap_lines(&text, self.chars_per_line(frame_width))
    }
}

/// Greedy word wrap; words longer than `width` are split.
pub fn wrap_lines(text: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_len = 0usize;

    for word in text.split_whitespace() {
        let mut chars: Vec<char> = word.chars().collect();

        while chars.len() > width {
            if current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            let rest = chars.split_off(width);
            lines.push(chars.into_iter().collect());
            chars = rest;
        }

        let len = chars.len();
        if len == 0 {
            continue;
        }
        if current_len > 0 && current_len + 1 + len > width {
            lines.push(std::mem::take(&mut current));
            current_len = 0;
        }
        if current_len > 0 {
            current.push(' ');
            current_len += 1;
        }
        current.extend(chars);
        current_len += len;
    }

    if current_len > 0 {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn wraps_on_word_boundaries() {
        let lines = wrap_lines("the quick brown fox jumps over the lazy dog", 10);
        assert_eq!(lines, vec!["the quick", "brown fox", "jumps over", "the lazy", "dog"]);
    }

    #[test]
    fn no_line_exceeds_width() {
        let text = "Did you know that octopuses have three hearts and blue blood? \
                    Supercalifragilisticexpialidocious facts incoming, stay tuned!";
        for width in [1, 4, 9, 23, 80] {
            for line in wrap_lines(text, width) {
                assert!(line.chars().count() <= width, "{line:?} > {width}");
                assert!(!line.is_empty());
            }
        }
    }

    #[test]
    fn splits_long_words() {
        assert_eq!(wrap_lines("go abcdefghij", 4), vec!["go", "abcd", "efgh", "ij"]);
    }

    #[test]
    fn keeps_all_words_in_order() {
        let text = "  Start with a hook,\n then three   fast facts. ";
        let joined = wrap_lines(text, 12).join(" ");
        assert_eq!(joined, "Start with a hook, then three fast facts.");
    }

    #[test]
    fn empty_text_has_no_lines() {
        assert!(wrap_lines("", 10).is_empty());
        assert!(wrap_lines(" \n\t ", 10).is_empty());
    }

    #[test]
    fn default_style_fits_vertical_frame() {
        let style = CaptionStyle::default();
        // 1080 * 0.9 / (65 * 0.55) = 27.19
        assert_eq!(style.chars_per_line(1080), 27);
        let lines = style.layout("wait for the end", 1080);
        assert_eq!(lines, vec!["WAIT FOR THE END"]);
    }

    #[test]
    fn layout_respects_uppercase_flag() {
        let style = CaptionStyle {
            uppercase: false,
            ..CaptionStyle::default()
        };
        assert_eq!(style.layout("Mixed Case", 1080), vec!["Mixed Case"]);
    }
}
