use std::fmt;

use rand::Rng;

/// Rejected room code input
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("room code must be exactly 4 digits, got {0:?}")]
pub struct CodeError(pub String);

/// Four ASCII digit room code
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct RoomCode(String);

impl RoomCode {
    pub const LEN: usize = 4;

    /// Validate user input. Surrounding whitespace is ignored.
    pub fn parse(input: &str) -> Result<Self, CodeError> {
        let trimmed = input.trim();
        if trimmed.len() == Self::LEN && trimmed.bytes().all(|b| b.is_ascii_digit()) {
            Ok(Self(trimmed.to_string()))
        } else {
            Err(CodeError(input.to_string()))
        }
    }

    /// Random code in 1000..=9999 so it never starts with a zero
    pub fn generate<R: Rng + ?Sized>(rng: &mut R) -> Self {
        Self(rng.gen_range(1000..=9999u16).to_string())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Store key of the room record
    pub fn key(&self) -> String {
        format!("rooms/{}", self.0)
    }
}

impl fmt::Display for RoomCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for RoomCode {
    type Err = CodeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::SeedableRng;

    #[test]
    fn test_parse_accepts_four_digits() {
        let code = RoomCode::parse("0421").expect("valid code");
        assert_eq!(code.as_str(), "0421");
        assert_eq!(code.key(), "rooms/0421");
        assert_eq!(RoomCode::parse(" 1234\n").unwrap().as_str(), "1234");
    }

    #[test]
    fn test_parse_rejects_malformed() {
        for bad in ["", "123", "12345", "12a4", "abcd", "١٢٣٤", "12 4"] {
            assert!(RoomCode::parse(bad).is_err(), "{bad:?} should be rejected");
        }
    }

    #[test]
    fn test_generate_is_valid() {
        let mut rng = rand::rngs::StdRng::seed_from_u64(1);
        for _ in 0..200 {
            let code = RoomCode::generate(&mut rng);
            assert!(RoomCode::parse(code.as_str()).is_ok());
            assert_ne!(code.as_str().as_bytes()[0], b'0');
        }
    }
}
