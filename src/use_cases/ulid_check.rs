// ULID validation (§4.1, §6): Crockford base-32, 26 characters.

use ulid::Ulid;

pub fn is_valid_ulid(candidate: &str) -> bool {
    candidate.len() == 26 && Ulid::from_string(candidate).is_ok()
}
