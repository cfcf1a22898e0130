//! Per-card render parameter math.
//!
//! # Responsibility
//! - Project a travel position onto offset, scale and opacity numbers for
//!   each card index.
//!
//! # Invariants
//! - All functions are pure and deterministic; they are re-evaluated on
//!   every position change, never cached here.
//! - `opacity` is the raw formula and may go negative; [`CardRender`]
//!   carries the clamped value the renderer needs.

/// Distance past a card at which its opacity starts to decay.
const OPACITY_GATE: f64 = 0.6;
/// Decay slope; opacity reaches zero 0.2 past the gate.
const OPACITY_FALLOFF: f64 = 5.0;
/// Vertical travel distance per position unit.
const OFFSET_UNIT: f64 = 20.0;
/// Scale gain per position unit.
const SCALE_GAIN: f64 = 0.1;

/// Raw opacity for the card at `index`.
///
/// Full strength while the focus is within [`OPACITY_GATE`] of the card,
/// then a linear decay. Negative past the fade-out point.
pub fn opacity(position: f64, index: usize) -> f64 {
    let distance = position - index as f64;
    if distance < OPACITY_GATE {
        1.0
    } else {
        1.0 - (distance - OPACITY_GATE) * OPACITY_FALLOFF
    }
}

/// Vertical offset for the card at `index`.
///
/// Cards at or behind the focused position pull back quadratically
/// (accelerating recession into the stack); unreached cards drift up
/// linearly.
pub fn vertical_offset(position: f64, index: usize) -> f64 {
    let distance = position - index as f64;
    if index as f64 <= position.floor() {
        -(distance * OFFSET_UNIT).powi(2)
    } else {
        distance * -OFFSET_UNIT
    }
}

/// Scale for the card at `index`; grows as the focus travels past it.
pub fn scale(position: f64, index: usize) -> f64 {
    1.0 + (position - index as f64) * SCALE_GAIN
}

/// Render parameters for one card, handed to the rendering collaborator.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CardRender {
    pub offset_x: f64,
    pub offset_y: f64,
    pub scale: f64,
    /// Clamped to `[0, 1]`.
    pub opacity: f64,
    /// Topmost card of the pinned group, for highlight styling.
    pub pinned_highlight: bool,
}

impl CardRender {
    /// Projects one card at `index` for the given travel position.
    ///
    /// `offset_x` starts at zero; the swipe tracker contributes it
    /// separately for the topmost card.
    pub fn at(position: f64, index: usize) -> Self {
        Self {
            offset_x: 0.0,
            offset_y: vertical_offset(position, index),
            scale: scale(position, index),
            opacity: opacity(position, index).clamp(0.0, 1.0),
            pinned_highlight: false,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{opacity, scale, vertical_offset, CardRender};

    #[test]
    fn opacity_holds_then_decays_linearly() {
        assert_eq!(opacity(0.0, 0), 1.0);
        assert_eq!(opacity(0.59, 0), 1.0);
        assert!((opacity(0.7, 0) - 0.5).abs() < 1e-9);
        assert!(opacity(0.8, 0).abs() < 1e-9);
        assert!(opacity(1.0, 0) < 0.0);
    }

    #[test]
    fn reached_cards_pull_back_quadratically() {
        // index 0 with focus at 0.5: -(0.5 * 20)^2 = -100
        assert!((vertical_offset(0.5, 0) + 100.0).abs() < 1e-9);
        // unreached card drifts linearly: (1.5 - 2) * -20 = 10
        assert!((vertical_offset(1.5, 2) - 10.0).abs() < 1e-9);
    }

    #[test]
    fn scale_grows_past_the_focus() {
        assert!((scale(0.0, 0) - 1.0).abs() < 1e-9);
        assert!((scale(1.0, 0) - 1.1).abs() < 1e-9);
        assert!((scale(0.0, 1) - 0.9).abs() < 1e-9);
    }

    #[test]
    fn render_parameters_clamp_opacity() {
        let render = CardRender::at(1.0, 0);
        assert_eq!(render.opacity, 0.0);
        assert!(render.offset_y < 0.0);
        assert!(!render.pinned_highlight);
    }
}
