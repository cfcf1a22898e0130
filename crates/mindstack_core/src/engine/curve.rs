//! Pressure-to-travel curve.
//!
//! # Responsibility
//! - Map the continuous trackpad pressure value to a position along the
//!   card stack plus a discrete stage index.
//!
//! # Invariants
//! - Output position is always finite and non-negative; degenerate math
//!   collapses to position 0 instead of propagating NaN.
//! - The position curve is continuous across stage boundaries.
//! - Single-card stacks always report position 0, stage 0 (the stage count
//!   would be zero, so the curve is undefined there).

/// Discrete hardware-reported press depth, independent of the continuous
/// pressure value.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PressTick {
    /// Touch registered, below the first click threshold.
    Began,
    /// Primary click engaged.
    Engaged,
    /// Deep press (force click) engaged; triggers the insert affordance.
    DeepPress,
}

impl PressTick {
    /// Maps the raw 0|1|2 stage reported by the input source.
    ///
    /// Values above 2 clamp to `DeepPress`; the device never goes deeper.
    pub fn from_raw(raw: u8) -> Self {
        match raw {
            0 => Self::Began,
            1 => Self::Engaged,
            _ => Self::DeepPress,
        }
    }
}

/// Continuous travel position plus the discrete half-step stage it falls in.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Travel {
    /// Scalar position along the stack; card `i` is focused near `i.0`.
    pub position: f64,
    /// Half-step index within the travel range, for edge-triggered feedback.
    pub stage: u32,
}

impl Travel {
    pub const ZERO: Self = Self {
        position: 0.0,
        stage: 0,
    };
}

impl Default for Travel {
    fn default() -> Self {
        Self::ZERO
    }
}

/// Number of half-step stages for a stack of `card_count` cards.
pub fn stage_count(card_count: usize) -> u32 {
    2 * (card_count.saturating_sub(1)) as u32
}

/// Evaluates the travel curve for one pressure sample.
///
/// Pressure is clamped to `[0, 1]`. Each card occupies two stages; the
/// even stage eases the position in, the odd stage eases it out, so every
/// card gets a distinct settle point as pressure rises.
pub fn travel(pressure: f64, card_count: usize) -> Travel {
    let stages = stage_count(card_count);
    if stages == 0 {
        return Travel::ZERO;
    }

    let pressure = pressure.clamp(0.0, 1.0);
    let stride = 1.0 / f64::from(stages);
    let stage = (pressure / stride).floor() as u32;
    let x = (pressure - f64::from(stage) * stride) / (2.0 * stride);

    let fraction = if stage % 2 == 0 {
        (1.0 - (1.0 - (2.0 * x).powi(3)).cbrt()) / 2.0
    } else {
        (1.0 + (2.0 * x - 1.0).powi(3)).cbrt() / 2.0
    };

    let position = fraction + f64::from(stage) / 2.0;
    // Zero, subnormal, NaN and infinity all collapse to the rest position.
    let position = if position.is_normal() { position } else { 0.0 };

    Travel { position, stage }
}
