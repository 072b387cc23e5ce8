use crate::PdfEngineError;

// WinAnsiEncoding code points 0x80..=0x9F. Unlisted slots are undefined.
const HIGH_TABLE: [(char, u8); 27] = [
    ('€', 0x80),
    ('‚', 0x82),
    ('ƒ', 0x83),
    ('„', 0x84),
    ('…', 0x85),
    ('†', 0x86),
    ('‡', 0x87),
    ('ˆ', 0x88),
    ('‰', 0x89),
    ('Š', 0x8A),
    ('‹', 0x8B),
    ('Œ', 0x8C),
    ('Ž', 0x8E),
    ('‘', 0x91),
    ('’', 0x92),
    ('“', 0x93),
    ('”', 0x94),
    ('•', 0x95),
    ('–', 0x96),
    ('—', 0x97),
    ('˜', 0x98),
    ('™', 0x99),
    ('š', 0x9A),
    ('›', 0x9B),
    ('œ', 0x9C),
    ('ž', 0x9E),
    ('Ÿ', 0x9F),
];

/// Encode one line of text for a standard Type1 font using WinAnsiEncoding.
pub(crate) fn encode_win_ansi(line: &str) -> Result<Vec<u8>, PdfEngineError> {
    line.chars()
        .map(|ch| match ch {
            '\t' => Ok(b' '),
            ' '..='~' | '\u{A0}'..='\u{FF}' => Ok(ch as u8),
            _ => HIGH_TABLE
                .iter()
                .find(|(candidate, _)| *candidate == ch)
                .map(|(_, code)| *code)
                .ok_or(PdfEngineError::UnencodableText(ch)),
        })
        .collect()
}
