//! dB conversion helpers with explicit power/amplitude semantics.
//! Power uses 10*log10(·); amplitude uses 20*log10(·). A floor is applied
//! before the log to avoid log10(0).

/// Minimum power for log conversions.
pub const POWER_FLOOR: f32 = 1e-20;

/// Convert a power ratio to dB (10*log10).
pub fn power_to_db(p: f32) -> f32 {
    10.0 * p.max(POWER_FLOOR).log10()
}

/// Convert an amplitude ratio to dB (20*log10).
pub fn amp_to_db(a: f32) -> f32 {
    20.0 * a.max(POWER_FLOOR.sqrt()).log10()
}

/// Convert dB to a power ratio.
pub fn db_to_power_ratio(db: f32) -> f32 {
    10.0_f32.powf(db / 10.0)
}
