//! Random password generation.

use rand::Rng;

/// Characters a password is drawn from.
pub const PASSWORD_CHARSET: &str =
    "abcdefghijklmnopqrstuvwxyzABCDEFGHIJKLMNOPQRSTUVWXYZ0123456789!@#$%^&*()_+~`|}{[]:;?><,./-=";

/// Default length offered by the CLI.
pub const DEFAULT_PASSWORD_LENGTH: usize = 16;

/// Draw `length` characters uniformly from [`PASSWORD_CHARSET`] using the
/// thread-local CSPRNG.
pub fn generate_password(length: usize) -> String {
    let charset = PASSWORD_CHARSET.as_bytes();
    let mut rng = rand::rng();
    (0..length)
        .map(|_| charset[rng.random_range(0..charset.len())] as char)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn charset_is_ninety_one_ascii_chars() {
        assert_eq!(PASSWORD_CHARSET.len(), 91);
        assert!(PASSWORD_CHARSET.is_ascii());
    }

    #[test]
    fn length_and_alphabet() {
        assert_eq!(generate_password(0), "");
        let pw = generate_password(64);
        assert_eq!(pw.chars().count(), 64);
        assert!(pw.chars().all(|c| PASSWORD_CHARSET.contains(c)));
    }

    #[test]
    fn consecutive_passwords_differ() {
        assert_ne!(generate_password(32), generate_password(32));
    }
}
