//! Fixed-point log-power unit.
//!
//! `Db` is a small unsigned magnitude approximating `3*log2(power)`, used
//! everywhere a power quantity needs to be stored or compared cheaply. Zero
//! represents powers at or below 1.

/// A fixed-point magnitude, `db ~= 3*log2(power)`.
pub type Db = u8;

/// The integer power domain `Db` is derived from.
pub type DbInteger = u64;

/// Highest representable magnitude: `3 * bits_in_word`.
pub const DB_MAX: u32 = 3 * (std::mem::size_of::<DbInteger>() as u32 * 8);

/// Returns `y` such that `2^((y-2)/3) <= x <= 2^((y+2)/3)` for `x >= 4`.
pub fn db_from_integer(x: DbInteger) -> Db {
    match x {
        0 | 1 => return 0,
        2 => return 3,
        3 => return 5,
        4 => return 6,
        _ => {}
    }

    let mut k: u32 = 0;
    while k < DB_MAX / 3 - 1 && (x >> k) != 0 {
        k += 1;
    }

    let mantissa = x >> (k - 3);
    let mut y = (k - 1) * 3;

    if mantissa >= 6 {
        // 4 * 2^(2/3) = 6.35...
        y += 2;
    } else if mantissa >= 5 {
        // 4 * 2^(1/3) = 5.03...
        y += 1;
    }

    y as Db
}

/// Inverse of [`db_from_integer`], accurate to within ~30%.
pub fn db_to_integer(db: Db) -> DbInteger {
    const LOGTABLE_X100: [u64; 10] = [100, 126, 158, 200, 251, 316, 399, 501, 631, 794];

    let db = db as u32;
    let mut ret = LOGTABLE_X100[(db % 10) as usize];

    if db < 10 {
        ret = (ret + 50) / 100;
    } else if db < 20 {
        ret = (ret + 5) / 10;
    } else {
        let mut remaining = db;
        while remaining > 20 {
            ret *= 10;
            remaining -= 10;
        }
    }

    ret
}

#[cfg(test)]
mod tests {
    use super::*;

    const CALIBRATION: [(DbInteger, Db); 10] = [
        (1, 0),
        (2, 3),
        (10, 10),
        (16, 12),
        (20, 13),
        (25, 14),
        (32, 15),
        (40, 16),
        (50, 17),
        (100, 20),
    ];

    #[test]
    fn calibration_pairs_match_bit_for_bit() {
        for &(power, db) in &CALIBRATION {
            assert_eq!(db_from_integer(power), db, "db_from_integer({power})");
            assert_eq!(db_to_integer(db), power, "db_to_integer({db})");
        }
    }

    #[test]
    fn db_from_integer_is_monotone_non_decreasing() {
        let mut last = 0;
        for x in 4..100_000u64 {
            let y = db_from_integer(x);
            assert!(y >= last, "db_from_integer({x})={y} < previous {last}");
            last = y;
        }
    }

    #[test]
    fn round_trip_within_tolerance() {
        for x in 4..1_000_000u64 {
            let y = db_from_integer(x);
            let back = db_to_integer(y);
            let lo = (x as f64) * 0.7;
            let hi = (x as f64) * 1.3;
            assert!(
                (back as f64) >= lo && (back as f64) <= hi,
                "db_to_integer(db_from_integer({x})={y})={back} not within 30% of {x}"
            );
        }
    }

    #[test]
    fn forward_after_inverse_is_within_one_unit() {
        for y in 0..60u8 {
            let x = db_to_integer(y);
            if x == 0 {
                continue;
            }
            let back = db_from_integer(x);
            let diff = (back as i16 - y as i16).abs();
            assert!(diff <= 1, "db_from_integer(db_to_integer({y})={x})={back}");
        }
    }
}
