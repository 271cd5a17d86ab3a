use std::cmp::Ordering;

/// Decimal places shown for landmark coordinates.
pub const COORDINATE_PLACES: usize = 2;

// Beyond this many places the scaled digits no longer fit comfortably in a u128.
const MAX_PLACES: usize = 17;

/// Rounds `value` to `places` decimals, half-up with ties going toward positive
/// infinity: 12.345 becomes 12.35 while -1.005 becomes -1.0.
///
/// Works on the shortest decimal representation of the value rather than its
/// binary expansion, so a literal like 12.345 counts as an exact tie.
pub fn round_half_ceiling(value: f64, places: usize) -> f64 {
    if !value.is_finite() || places > MAX_PLACES {
        return value;
    }

    let negative = value.is_sign_negative();
    let digits = format!("{}", value.abs());
    let (integer, fraction) = digits.split_once('.').unwrap_or((digits.as_str(), ""));
    if fraction.len() <= places {
        return value;
    }

    let (kept, dropped) = fraction.split_at(places);
    let first_dropped = dropped.as_bytes()[0] - b'0';
    let remainder_nonzero = dropped.bytes().skip(1).any(|digit| digit != b'0');
    let round_magnitude_up = match first_dropped.cmp(&5) {
        Ordering::Greater => true,
        Ordering::Less => false,
        // On the boundary the result moves toward +inf, which for a negative
        // value means keeping the truncated magnitude.
        Ordering::Equal => !negative || remainder_nonzero,
    };

    let mut scaled: u128 = match format!("{}{}", integer, kept).parse() {
        Ok(scaled) => scaled,
        Err(_) => return value,
    };
    if round_magnitude_up {
        scaled += 1;
    }

    let divisor = 10u128.pow(places as u32);
    let text = format!(
        "{}.{:0width$}",
        scaled / divisor,
        scaled % divisor,
        width = places
    );
    let magnitude: f64 = text.parse().unwrap_or(value.abs());
    if magnitude == 0.0 {
        0.0
    } else if negative {
        -magnitude
    } else {
        magnitude
    }
}

/// Coordinate formatted for the detail panel.
pub fn format_coordinate(value: f64) -> String {
    format!("{}", round_half_ceiling(value, COORDINATE_PLACES))
}
