use nanoid::nanoid;

use crate::constants::UID_LENGTH;

/// Mint an identifier in the "uid" scheme: 11 alphanumeric characters,
/// the first one a letter.
pub fn generate_uid() -> String {
    let letters: Vec<char> = ('a'..='z').chain('A'..='Z').collect();
    let mut alphanumeric = letters.clone();
    alphanumeric.extend('0'..='9');

    let mut uid = nanoid!(1, &letters);
    uid.push_str(&nanoid!((UID_LENGTH - 1), &alphanumeric));
    uid
}

/// Check an identifier against the "uid" scheme.
pub fn is_valid_uid(id: &str) -> bool {
    id.len() == UID_LENGTH
        && id.chars().next().is_some_and(|c| c.is_ascii_alphabetic())
        && id.chars().all(|c| c.is_ascii_alphanumeric())
}
