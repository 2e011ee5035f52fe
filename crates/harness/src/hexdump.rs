//! ROMバイト列の16進表示。
//!
//! 1バイトを小文字2桁で表し、空白1つで区切る（例: `80 01 a0`）。

/// バイト列を16進表示にする。
pub fn render_hex(bytes: &[u8]) -> String {
    bytes
        .iter()
        .map(|b| hex::encode([*b]))
        .collect::<Vec<_>>()
        .join(" ")
}

/// 16進表示をバイト列に戻す。空白は無視する。
pub fn parse_hex(text: &str) -> Result<Vec<u8>, hex::FromHexError> {
    let digits: String = text.split_whitespace().collect();
    hex::decode(digits)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_hex() {
        assert_eq!(render_hex(&[0x80, 0x01, 0xa0, 0x0f]), "80 01 a0 0f");
        assert_eq!(render_hex(&[0x00]), "00");
        assert_eq!(render_hex(&[]), "");
    }

    #[test]
    fn test_render_then_parse_restores_bytes() {
        let all: Vec<u8> = (0..=u8::MAX).collect();
        for bytes in [&[][..], &[0x00][..], &all[..]] {
            assert_eq!(parse_hex(&render_hex(bytes)).unwrap(), bytes);
        }
    }

    #[test]
    fn test_parse_hex_rejects_odd_digits() {
        assert!(parse_hex("80 0").is_err());
        assert!(parse_hex("zz").is_err());
    }
}
