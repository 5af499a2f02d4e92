//! Static Helvetica width tables for report layout.
//!
//! Widths are the Adobe base-14 AFM advance widths in 1/1000 em, covering
//! ASCII 0x20..=0x7E. Index = byte - 32. Bytes outside that range (the
//! Latin-1 half of WinAnsi) use `FALLBACK_WIDTH`, which is close enough for
//! line breaking.

const FALLBACK_WIDTH: u16 = 556;

/// The two faces the report uses. Both are PDF base-14 fonts, so nothing
/// is embedded.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Face {
    Regular,
    Bold,
}

impl Face {
    pub fn base_font(self) -> &'static str {
        match self {
            Face::Regular => "Helvetica",
            Face::Bold => "Helvetica-Bold",
        }
    }

    /// Resource name in the page's font dictionary.
    pub fn resource(self) -> &'static str {
        match self {
            Face::Regular => "F1",
            Face::Bold => "F2",
        }
    }

    fn widths(self) -> &'static [u16; 95] {
        match self {
            Face::Regular => &HELVETICA,
            Face::Bold => &HELVETICA_BOLD,
        }
    }
}

#[rustfmt::skip]
static HELVETICA: [u16; 95] = [
    // sp   !    "    #    $    %    &    '    (    )    *    +    ,    -    .    /
    278, 278, 355, 556, 556, 889, 667, 191, 333, 333, 389, 584, 278, 333, 278, 278,
    // 0-9
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    // :    ;    <    =    >    ?    @
    278, 278, 584, 584, 584, 556, 1015,
    // A-M
    667, 667, 722, 722, 667, 611, 778, 722, 278, 500, 667, 556, 833,
    // N-Z
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    // [    \    ]    ^    _    `
    278, 278, 278, 469, 556, 333,
    // a-m
    556, 556, 500, 556, 556, 278, 556, 556, 222, 222, 500, 222, 833,
    // n-z
    556, 556, 556, 556, 333, 500, 278, 556, 500, 722, 500, 500, 500,
    // {    |    }    ~
    334, 260, 334, 584,
];

#[rustfmt::skip]
static HELVETICA_BOLD: [u16; 95] = [
    278, 333, 474, 556, 556, 889, 722, 238, 333, 333, 389, 584, 278, 333, 278, 278,
    556, 556, 556, 556, 556, 556, 556, 556, 556, 556,
    333, 333, 584, 584, 584, 611, 975,
    722, 722, 722, 722, 667, 611, 778, 722, 278, 556, 722, 611, 833,
    722, 778, 667, 778, 722, 667, 611, 722, 667, 944, 667, 667, 611,
    333, 278, 333, 584, 556, 333,
    556, 611, 556, 611, 556, 333, 611, 611, 278, 278, 556, 278, 889,
    611, 611, 611, 611, 389, 556, 333, 611, 556, 778, 556, 556, 500,
    389, 280, 389, 584,
];

/// Encodes text for a WinAnsi base-14 font. Typographic punctuation is folded
/// to ASCII, Latin-1 passes through, anything else becomes `?`.
pub fn to_win_ansi(text: &str) -> Vec<u8> {
    let mut out = Vec::with_capacity(text.len());
    for c in text.chars() {
        match c {
            '\u{2018}' | '\u{2019}' => out.push(b'\''),
            '\u{201C}' | '\u{201D}' => out.push(b'"'),
            '\u{2013}' | '\u{2014}' => out.push(b'-'),
            '\u{2022}' => out.push(b'*'),
            '\u{2026}' => out.extend_from_slice(b"..."),
            '\t' | '\n' | '\r' => out.push(b' '),
            c if (' '..='~').contains(&c) => out.push(c as u8),
            c if ('\u{A0}'..='\u{FF}').contains(&c) => out.push(c as u32 as u8),
            _ => out.push(b'?'),
        }
    }
    out
}

/// Width in points of already-encoded bytes.
fn encoded_width(bytes: &[u8], face: Face, size_pt: f32) -> f32 {
    let widths = face.widths();
    let units: u32 = bytes
        .iter()
        .map(|&b| match b {
            32..=126 => u32::from(widths[usize::from(b - 32)]),
            _ => u32::from(FALLBACK_WIDTH),
        })
        .sum();
    units as f32 * size_pt / 1000.0
}

/// Rendered width of `text` in points.
pub fn text_width(text: &str, face: Face, size_pt: f32) -> f32 {
    encoded_width(&to_win_ansi(text), face, size_pt)
}

/// Greedy word wrap at `max_width_pt`. A word wider than the line gets a
/// line of its own rather than being split.
pub fn wrap(text: &str, face: Face, size_pt: f32, max_width_pt: f32) -> Vec<String> {
    let space = text_width(" ", face, size_pt);
    let mut lines = Vec::new();
    let mut current = String::new();
    let mut current_width = 0.0_f32;

    for word in text.split_whitespace() {
        let word_width = text_width(word, face, size_pt);
        if current.is_empty() {
            current.push_str(word);
            current_width = word_width;
        } else if current_width + space + word_width > max_width_pt {
            lines.push(std::mem::take(&mut current));
            current.push_str(word);
            current_width = word_width;
        } else {
            current.push(' ');
            current.push_str(word);
            current_width += space + word_width;
        }
    }
    if !current.is_empty() {
        lines.push(current);
    }
    lines
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_widths() {
        // "Hi" = H(722) + i(222) at 10pt
        let w = text_width("Hi", Face::Regular, 10.0);
        assert!((w - 9.44).abs() < 1e-4);
        // Bold is wider
        assert!(text_width("resume", Face::Bold, 10.0) > text_width("resume", Face::Regular, 10.0));
    }

    #[test]
    fn test_win_ansi_folds_typographic_punctuation() {
        assert_eq!(to_win_ansi("“Lead” – 5 yrs’"), b"\"Lead\" - 5 yrs'".to_vec());
        assert_eq!(to_win_ansi("café"), vec![b'c', b'a', b'f', 0xE9]);
        assert_eq!(to_win_ansi("日本"), b"??".to_vec());
    }

    #[test]
    fn test_wrap_respects_width() {
        let text = "Quantify achievements with concrete metrics such as revenue, latency or team size";
        let lines = wrap(text, Face::Regular, 10.0, 150.0);
        assert!(lines.len() > 1);
        for line in &lines {
            assert!(text_width(line, Face::Regular, 10.0) <= 150.0, "{line}");
        }
        assert_eq!(lines.join(" "), text);
    }

    #[test]
    fn test_wrap_keeps_overlong_word_whole() {
        let lines = wrap("a supercalifragilisticexpialidocious b", Face::Regular, 10.0, 40.0);
        assert_eq!(lines, vec!["a", "supercalifragilisticexpialidocious", "b"]);
    }

    #[test]
    fn test_wrap_empty_text() {
        assert!(wrap("   ", Face::Bold, 12.0, 100.0).is_empty());
    }
}
