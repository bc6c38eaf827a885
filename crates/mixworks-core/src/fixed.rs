use fixed::types::I32F32;

/// Q32.32 fixed-point: 32 integer bits, 32 fractional bits.
pub type Fixed64 = I32F32;

/// Milliseconds on the session's virtual clock.
pub type Millis = u64;

/// Convert an f64 to Fixed64. Use only for initialization, never in hot paths.
#[inline]
pub fn f64_to_fixed64(v: f64) -> Fixed64 {
    Fixed64::from_num(v)
}

/// Scale a millisecond duration by a fixed-point factor, rounding to the
/// nearest millisecond (halves round up).
///
/// Saturates at `Millis::MAX` instead of overflowing.
pub fn scale_millis(ms: Millis, factor: Fixed64) -> Millis {
    if factor <= Fixed64::ZERO {
        return 0;
    }
    let Some(base) = Fixed64::checked_from_num(ms) else {
        return saturating_scale(ms, factor);
    };
    match base.checked_mul(factor) {
        Some(scaled) => scaled.round().to_num::<u64>(),
        None => saturating_scale(ms, factor),
    }
}

/// Fallback for durations outside the Q32.32 range: integer multiply by the
/// factor's raw bits, then shift the fractional part back out.
fn saturating_scale(ms: Millis, factor: Fixed64) -> Millis {
    let raw = factor.to_bits() as u128;
    let product = (ms as u128).saturating_mul(raw);
    let rounded = (product + (1u128 << 31)) >> 32;
    u64::try_from(rounded).unwrap_or(Millis::MAX)
}
