//! Rune classification helpers used by the lexer.
//!
//! Rust strings are already validated UTF-8, so unlike the original
//! implementation there is no decode-failure sentinel here; an unrecognized
//! `char` is simply rejected by the lexer with `Unrecognized_Character`.

/// Musical-symbol-block runes used as note-length constant names (U+1D15D..U+1D164).
pub const NOTE_LENGTH_SYMBOL_START: u32 = 0x1D15D;
pub const NOTE_LENGTH_SYMBOL_END: u32 = 0x1D164;

/// Musical-symbol-block runes used as rest-length Note literals (U+1D13B..U+1D142).
pub const REST_LENGTH_SYMBOL_START: u32 = 0x1D13B;
pub const REST_LENGTH_SYMBOL_END: u32 = 0x1D142;

pub fn is_space(ch: char) -> bool {
    ch.is_whitespace()
}

pub fn is_digit(ch: char) -> bool {
    ch.is_ascii_digit()
}

fn is_musical_symbol(ch: char) -> bool {
    let c = ch as u32;
    (NOTE_LENGTH_SYMBOL_START..=NOTE_LENGTH_SYMBOL_END).contains(&c)
        || (REST_LENGTH_SYMBOL_START..=REST_LENGTH_SYMBOL_END).contains(&c)
}

/// First rune of a symbol: a Unicode letter, `_`, `'`, `#`, `$`, `@`, or a musical-symbol rune.
pub fn is_identifier_start(ch: char) -> bool {
    ch.is_alphabetic() || matches!(ch, '_' | '\'' | '#' | '$' | '@') || is_musical_symbol(ch)
}

/// Subsequent runes of a symbol: identifier-start runes plus digits.
pub fn is_identifier_continuation(ch: char) -> bool {
    is_identifier_start(ch) || is_digit(ch)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifies_ascii_identifiers() {
        assert!(is_identifier_start('a'));
        assert!(is_identifier_start('_'));
        assert!(is_identifier_start('\''));
        assert!(!is_identifier_start('1'));
        assert!(is_identifier_continuation('1'));
    }

    #[test]
    fn classifies_musical_symbols() {
        let note = char::from_u32(0x1D15D).unwrap();
        assert!(is_identifier_start(note));
        let rest = char::from_u32(0x1D13B).unwrap();
        assert!(is_identifier_start(rest));
    }

    #[test]
    fn classifies_space_and_digit() {
        assert!(is_space(' '));
        assert!(is_space('\t'));
        assert!(!is_space('a'));
        assert!(is_digit('5'));
        assert!(!is_digit('x'));
    }
}
