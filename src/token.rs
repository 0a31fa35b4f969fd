use rand::rngs::OsRng;
use rand::RngCore;
use regex::Regex;
use std::sync::OnceLock;

const TOKEN_BYTES: usize = 4;

/// Eight lowercase hex characters from four bytes of OS randomness.
pub fn generate_token() -> String {
    let mut bytes = [0u8; TOKEN_BYTES];
    OsRng.fill_bytes(&mut bytes);
    hex::encode(bytes)
}

/// Where new session tokens come from.
pub trait TokenSource: Send + Sync {
    fn next_token(&self) -> String;
}

pub struct OsTokenSource;

impl TokenSource for OsTokenSource {
    fn next_token(&self) -> String {
        generate_token()
    }
}

pub fn is_well_formed(token: &str) -> bool {
    static TOKEN_RE: OnceLock<Regex> = OnceLock::new();
    TOKEN_RE
        .get_or_init(|| Regex::new(r"^[0-9a-f]{8}$").expect("token pattern compiles"))
        .is_match(token)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generated_tokens_are_well_formed() {
        for _ in 0..64 {
            let token = generate_token();
            assert_eq!(token.len(), 8);
            assert!(is_well_formed(&token), "{}", token);
        }
    }

    #[test]
    fn generated_tokens_differ() {
        assert_ne!(generate_token(), generate_token());
        assert_ne!(OsTokenSource.next_token(), OsTokenSource.next_token());
    }

    #[test]
    fn rejects_malformed_tokens() {
        assert!(!is_well_formed(""));
        assert!(!is_well_formed("DEADBEEF"));
        assert!(!is_well_formed("deadbee"));
        assert!(!is_well_formed("deadbeef0"));
        assert!(!is_well_formed("deadbeeg"));
        assert!(!is_well_formed("' OR 1=1"));
    }
}
