/// Encodes text for the standard Type1 fonts under `WinAnsiEncoding`.
///
/// Latin-1 maps directly. The cp1252 extras the report can produce (euro
/// sign, typographic quotes and dashes) get their code points in 0x80-0x9F.
/// Anything else becomes `?`.
pub fn encode_win_ansi(text: &str) -> Vec<u8> {
    text.chars()
        .map(|ch| match ch {
            ' '..='~' => ch as u8,
            '\u{a0}'..='\u{ff}' => ch as u32 as u8,
            '€' => 0x80,
            '…' => 0x85,
            '•' => 0x95,
            '–' => 0x96,
            '—' => 0x97,
            '‘' => 0x91,
            '’' => 0x92,
            '“' => 0x93,
            '”' => 0x94,
            _ => b'?',
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ascii_passes_through() {
        assert_eq!(encode_win_ansi("PKR 12,500"), b"PKR 12,500".to_vec());
    }

    #[test]
    fn test_currency_symbols() {
        assert_eq!(encode_win_ansi("€41"), vec![0x80, b'4', b'1']);
        assert_eq!(encode_win_ansi("£35"), vec![0xA3, b'3', b'5']);
    }

    #[test]
    fn test_unmapped_characters_are_replaced() {
        assert_eq!(encode_win_ansi("₨\t"), b"??".to_vec());
    }
}
