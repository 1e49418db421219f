//! Synthetic contact-field values.
//!
//! Checkout forms demand a phone number; the runner fills in a
//! phone-shaped placeholder instead of a real one. The value only has to
//! pass structural validation, nothing dials it.

use rand::Rng;

const LEAD_DIGITS: [char; 3] = ['9', '8', '7'];

/// A 10-character numeric string: a plausible leading digit followed by
/// nine independent uniform digits. Every call draws fresh; no seeding.
pub fn phone_like() -> String {
    let mut rng = rand::thread_rng();
    let mut out = String::with_capacity(10);
    out.push(LEAD_DIGITS[rng.gen_range(0..LEAD_DIGITS.len())]);
    for _ in 0..9 {
        out.push(char::from(b'0' + rng.gen_range(0..10u8)));
    }
    out
}
