//! Approximate text measurement and wrapping.
//!
//! Layout runs without a font database, so glyph advances use an average
//! width per character. Renderers may re-shape the lines with real fonts.

/// Average glyph advance as a fraction of the font size.
pub const AVG_ADVANCE_RATIO: f64 = 0.55;

/// Line height as a multiple of the font size.
pub const LINE_HEIGHT_RATIO: f64 = 1.2;

/// Approximate width of `text` at `font_size`.
pub fn measure(text: &str, font_size: f64) -> f64 {
    text.chars().count() as f64 * font_size * AVG_ADVANCE_RATIO
}

pub fn line_height(font_size: f64) -> f64 {
    font_size * LINE_HEIGHT_RATIO
}

/// Greedily wrap `text` to `max_width`.
///
/// Explicit newlines are kept. Words wider than a line are broken by character.
pub fn wrap_text(text: &str, font_size: f64, max_width: f64) -> Vec<String> {
    let per_line = ((max_width / (font_size * AVG_ADVANCE_RATIO)).floor() as usize).max(1);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let mut current = String::new();
        let mut current_len = 0;

        for word in paragraph.split_whitespace() {
            let mut word: Vec<char> = word.chars().collect();

            while word.len() > per_line {
                if current_len > 0 {
                    lines.push(std::mem::take(&mut current));
                    current_len = 0;
                }
                let rest = word.split_off(per_line);
                lines.push(word.into_iter().collect());
                word = rest;
            }

            let needed = if current_len == 0 {
                word.len()
            } else {
                current_len + 1 + word.len()
            };
            if needed > per_line && current_len > 0 {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }
            if current_len > 0 {
                current.push(' ');
                current_len += 1;
            }
            current_len += word.len();
            current.extend(word);
        }
        lines.push(current);
    }
    lines
}
