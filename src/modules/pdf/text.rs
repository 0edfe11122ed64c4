/// Points to millimeters
const PT_TO_MM: f32 = 0.3528;

/// Average glyph width relative to the em size for proportional sans fonts
const AVERAGE_GLYPH_RATIO: f32 = 0.5;

/// Vertical advance of one text line in millimeters
pub fn line_height(size: f32) -> f32 {
    size * 0.35
}

/// Estimated width of one glyph in millimeters
pub fn glyph_width(size: f32) -> f32 {
    size * PT_TO_MM * AVERAGE_GLYPH_RATIO
}

/// Number of glyphs that fit in `max_width` millimeters (at least one)
pub fn chars_per_line(max_width: f32, size: f32) -> usize {
    ((max_width / glyph_width(size)).floor() as usize).max(1)
}

/// Greedy word wrap.
///
/// Explicit newlines are kept, leading indentation of each paragraph is kept
/// on its first line, and words longer than a whole line are hard split.
/// Empty input yields a single empty line.
pub fn wrap_text(text: &str, max_width: f32, size: f32) -> Vec<String> {
    let limit = chars_per_line(max_width, size);
    let mut lines = Vec::new();

    for paragraph in text.split('\n') {
        let paragraph = paragraph.trim_end();
        let body = paragraph.trim_start();
        if body.is_empty() {
            lines.push(String::new());
            continue;
        }

        let indent = (paragraph.chars().count() - body.chars().count()).min(limit - 1);
        let mut current = " ".repeat(indent);
        let mut current_len = indent;
        let mut has_words = false;

        for word in body.split_whitespace() {
            let mut chars: Vec<char> = word.chars().collect();
            let separator = usize::from(has_words);

            if current_len + separator + chars.len() <= limit {
                if has_words {
                    current.push(' ');
                    current_len += 1;
                }
                current_len += chars.len();
                current.extend(chars);
                has_words = true;
                continue;
            }

            if has_words {
                lines.push(std::mem::take(&mut current));
                current_len = 0;
                has_words = false;
            }

            while current_len + chars.len() > limit {
                let chunk: String = chars.drain(..limit - current_len).collect();
                current.push_str(&chunk);
                lines.push(std::mem::take(&mut current));
                current_len = 0;
            }

            if !chars.is_empty() {
                current_len += chars.len();
                current.extend(chars);
                has_words = true;
            }
        }

        if has_words {
            lines.push(current);
        }
    }

    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_line_height() {
        assert!((line_height(10.0) - 3.5).abs() < 1e-5);
        assert!((line_height(16.0) - 5.6).abs() < 1e-5);
    }

    #[test]
    fn test_short_text_single_line() {
        assert_eq!(wrap_text("Contrato: ATLAS", 170.0, 12.0), vec!["Contrato: ATLAS"]);
    }

    #[test]
    fn test_empty_text_yields_one_blank_line() {
        assert_eq!(wrap_text("", 170.0, 12.0), vec![String::new()]);
    }

    #[test]
    fn test_explicit_newlines_preserved() {
        let lines = wrap_text("RQ: 1\nOS: 2\n\nPedido: 3", 170.0, 12.0);
        assert_eq!(lines, vec!["RQ: 1", "OS: 2", "", "Pedido: 3"]);
    }

    #[test]
    fn test_indentation_kept() {
        let lines = wrap_text("   Fig. 1: [Foto vinculada]", 170.0, 12.0);
        assert_eq!(lines, vec!["   Fig. 1: [Foto vinculada]"]);
    }

    #[test]
    fn test_wraps_on_word_boundaries() {
        let limit = chars_per_line(30.0, 12.0);
        let text = "instalação de tomadas e pontos elétricos no pavimento superior";
        let lines = wrap_text(text, 30.0, 12.0);

        assert!(lines.len() > 1);
        for line in &lines {
            assert!(line.chars().count() <= limit, "line too long: {:?}", line);
            assert!(!line.starts_with(' '));
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_long_word_is_hard_split() {
        let limit = chars_per_line(20.0, 12.0);
        let word = "x".repeat(limit * 2 + 3);
        let lines = wrap_text(&word, 20.0, 12.0);

        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].chars().count(), limit);
        assert_eq!(lines[1].chars().count(), limit);
        assert_eq!(lines[2].chars().count(), 3);
    }
}
