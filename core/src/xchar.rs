//! Character-type classification.
//!
//! The meta-word builder needs to know whether a character is a symbol
//! that should be absorbed into the preceding segment, a "part" character
//! (prolonged sound mark, iteration marks), punctuation, or a bracket.

use bitflags::bitflags;

bitflags! {
    /// Character type bits. A character may carry several.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct XCharType: u32 {
        const HIRA = 0x0001;
        const KATA = 0x0002;
        const ASCII = 0x0004;
        const NUM = 0x0008;
        const WIDENUM = 0x0010;
        const OPEN = 0x0020;
        const CLOSE = 0x0040;
        const SYMBOL = 0x0080;
        const KANJI = 0x0100;
        const PART = 0x0200;
        const PUNCTUATION = 0x0400;
    }
}

const OPEN_BRACKETS: &str = "(「『（［｛〔【〈《[{";
const CLOSE_BRACKETS: &str = ")」』）］｝〕】〉》]}";
const PUNCTUATIONS: &str = "、。，．,.！？!?";
const PART_CHARS: &str = "ーゝゞヽヾ々〃";

/// Classify a single character.
pub fn char_type(c: char) -> XCharType {
    if PART_CHARS.contains(c) {
        return XCharType::PART;
    }
    if PUNCTUATIONS.contains(c) {
        return XCharType::PUNCTUATION | XCharType::SYMBOL;
    }
    if OPEN_BRACKETS.contains(c) {
        return XCharType::OPEN | XCharType::SYMBOL;
    }
    if CLOSE_BRACKETS.contains(c) {
        return XCharType::CLOSE | XCharType::SYMBOL;
    }
    match c {
        'ぁ'..='ゖ' => XCharType::HIRA,
        'ァ'..='ヺ' => XCharType::KATA,
        '0'..='9' => XCharType::NUM | XCharType::ASCII,
        '０'..='９' => XCharType::WIDENUM,
        'a'..='z' | 'A'..='Z' => XCharType::ASCII,
        '\u{4e00}'..='\u{9fff}' | '\u{3400}'..='\u{4dbf}' => XCharType::KANJI,
        c if c.is_ascii_punctuation() => XCharType::SYMBOL | XCharType::ASCII,
        '\u{3000}'..='\u{303f}' | '\u{ff01}'..='\u{ff0f}' | '\u{ff1a}'..='\u{ff20}' => {
            XCharType::SYMBOL
        }
        '・' | '※' | '→' | '←' | '↑' | '↓' | '★' | '☆' | '○' | '●' => {
            XCharType::SYMBOL
        }
        _ => XCharType::empty(),
    }
}

/// Whether a character may be absorbed into the segment before it.
pub fn is_dependent_symbol(c: char) -> bool {
    let t = char_type(c);
    t.intersects(XCharType::SYMBOL | XCharType::PART) && !t.contains(XCharType::PUNCTUATION)
}
