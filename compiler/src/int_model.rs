use protocol_schema::{Endianness, Sign};

/// The inclusive range of values representable by an integer of the given
/// width (in bytes) and sign.
pub fn representable_range(width: u8, sign: Sign) -> (i128, i128) {
    let bits = width as u32 * 8;
    representable_range_bits(bits, sign)
}

pub fn representable_range_bits(bits: u32, sign: Sign) -> (i128, i128) {
    match sign {
        Sign::Unsigned => (0, (1i128 << bits) - 1),
        Sign::Signed => (-(1i128 << (bits - 1)), (1i128 << (bits - 1)) - 1),
    }
}

pub fn in_range(value: i64, width: u8, sign: Sign) -> bool {
    let (lo, hi) = representable_range(width, sign);
    let value = value as i128;
    value >= lo && value <= hi
}

/// Valid widths, in bytes, for the two scalar kinds.
pub const VALID_INT_WIDTHS: [u8; 4] = [1, 2, 4, 8];
pub const VALID_FLOAT_WIDTHS: [u8; 2] = [4, 8];

pub fn endianness_short(e: Endianness) -> &'static str {
    match e {
        Endianness::Big => "b",
        Endianness::Little => "l",
    }
}

pub fn sign_short(s: Sign) -> &'static str {
    match s {
        Sign::Unsigned => "u",
        Sign::Signed => "i",
    }
}
