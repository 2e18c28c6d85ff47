use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Ticks are the atomic unit of facility time.
pub type Ticks = u64;

/// Fraction of `capacity` occupied by `amount`, in `[0, 1]`.
///
/// A zero capacity counts as full so an unusable store is never preferred.
#[inline]
pub fn fill_fraction(amount: u32, capacity: u32) -> Fixed64 {
    if capacity == 0 {
        return Fixed64::ONE;
    }
    let amount = i128::from(amount.min(capacity));
    // At most 1 << 32, so the bits always fit.
    Fixed64::from_bits(((amount << 32) / i128::from(capacity)) as i64)
}

/// Convert Fixed64 to f64. Use only for display.
#[inline]
pub fn fixed64_to_f64(v: Fixed64) -> f64 {
    v.to_num::<f64>()
}
