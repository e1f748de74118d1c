//! Accumulates fractional scroll input into wire-legal scroll steps.
//!
//! Input devices report scroll in wildly different units; a precision touchpad
//! may send hundreds of tiny deltas per notch.  [`ScrollController`] keeps a
//! per-axis residual so that nothing below one wire quantum is ever lost:
//! each call adds the new delta, emits whatever the active layout can carry,
//! and keeps the remainder for the next call.
//!
//! * Integer layouts (before 1.25) carry whole steps only.
//! * The fixed-point layout (1.25+) carries `steps / 16` as a signed 16-bit
//!   fraction, so one quantum is `16 / 32768 = 1/2048` of a step and a single
//!   message can carry at most 16 steps per axis.  Larger amounts stay in the
//!   residual until [`ScrollController::flush`] drains them.

use tracing::trace;

use crate::protocol::control::{encode_scroll, InjectScrollControlMessage, ScrollLayout};

/// Residuals this close to a whole step snap to it.
const SNAP_EPSILON: f64 = 1e-9;

/// Fixed-point quanta per [`ScrollSteps::FIXED_POINT_RANGE`].
const FIXED_POINT_QUANTA: f64 = 32_768.0;

/// Upper bound on messages produced by one [`ScrollController::flush`].
const MAX_FLUSH_MESSAGES: usize = 64;

/// Scroll amounts actually emitted for one message.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ScrollSteps {
    pub x: f64,
    pub y: f64,
}

impl ScrollSteps {
    /// Largest step magnitude a fixed-point scroll message can carry.
    pub const FIXED_POINT_RANGE: f64 = 16.0;

    pub fn is_zero(&self) -> bool {
        self.x == 0.0 && self.y == 0.0
    }

    /// Quantises without keeping a residual.
    pub(crate) fn quantised(layout: ScrollLayout, x: f64, y: f64) -> ScrollSteps {
        let mut x = sanitize(x);
        let mut y = sanitize(y);
        ScrollSteps {
            x: take_step(layout, &mut x),
            y: take_step(layout, &mut y),
        }
    }
}

fn sanitize(delta: f64) -> f64 {
    if delta.is_finite() {
        delta
    } else {
        0.0
    }
}

/// Removes one message worth of `residual`, as `layout` quantises it, and returns it.
fn take_step(layout: ScrollLayout, residual: &mut f64) -> f64 {
    match layout {
        ScrollLayout::IntegerSteps | ScrollLayout::IntegerStepsWithButtons => {
            let nearest = residual.round();
            if (*residual - nearest).abs() < SNAP_EPSILON {
                *residual = nearest;
            }
            let step = residual
                .trunc()
                .clamp(i32::MIN as f64, i32::MAX as f64);
            *residual -= step;
            step
        }
        ScrollLayout::FixedPoint => {
            let range = ScrollSteps::FIXED_POINT_RANGE;
            let bounded = residual.clamp(-range, range);
            // +16 is one quantum past i16::MAX; the encoder saturates it.
            let quanta = (bounded / range * FIXED_POINT_QUANTA).round();
            let step = quanta * range / FIXED_POINT_QUANTA;
            *residual -= step;
            if step != 0.0 && residual.abs() < SNAP_EPSILON {
                *residual = 0.0;
            }
            step
        }
    }
}

/// Turns a stream of fractional scroll deltas into scroll messages.
///
/// One controller belongs to one control session; call [`reset`](Self::reset)
/// when the session restarts.
#[derive(Debug, Clone)]
pub struct ScrollController {
    ordinal: Option<u8>,
    layout: ScrollLayout,
    residual_x: f64,
    residual_y: f64,
}

impl ScrollController {
    /// `ordinal` is the inject-scroll type ordinal, `None` if unsupported.
    pub fn new(ordinal: Option<u8>, layout: ScrollLayout) -> Self {
        Self {
            ordinal,
            layout,
            residual_x: 0.0,
            residual_y: 0.0,
        }
    }

    /// Adds a delta and returns what should be sent now, if anything.
    ///
    /// Returns `None` when both axes are still below one quantum.
    pub fn accumulate(&mut self, delta_x: f64, delta_y: f64) -> Option<ScrollSteps> {
        self.residual_x += sanitize(delta_x);
        self.residual_y += sanitize(delta_y);

        let steps = ScrollSteps {
            x: take_step(self.layout, &mut self.residual_x),
            y: take_step(self.layout, &mut self.residual_y),
        };
        trace!(
            "scroll steps x={} y={} residual=({}, {})",
            steps.x,
            steps.y,
            self.residual_x,
            self.residual_y
        );

        if steps.is_zero() {
            None
        } else {
            Some(steps)
        }
    }

    /// Accumulates `message`'s scroll amounts and encodes what can be sent.
    ///
    /// Returns `None` when the version has no inject-scroll message or when
    /// the accumulated input has not yet reached one quantum.
    pub fn serialize_scroll_message(
        &mut self,
        message: &InjectScrollControlMessage,
    ) -> Option<Vec<u8>> {
        let ordinal = self.ordinal?;
        let steps = self.accumulate(message.scroll_x, message.scroll_y)?;
        Some(encode_scroll(ordinal, self.layout, message, steps))
    }

    /// Emits everything still held in the residual that the layout can carry.
    ///
    /// Needed on the fixed-point layout, where one message carries at most 16
    /// steps per axis.  Anything below one quantum stays held.  At most
    /// 64 chunks are produced per call; call again to continue.
    pub fn flush(&mut self) -> Vec<ScrollSteps> {
        let mut chunks = Vec::new();
        while chunks.len() < MAX_FLUSH_MESSAGES {
            match self.accumulate(0.0, 0.0) {
                Some(steps) => chunks.push(steps),
                None => break,
            }
        }
        chunks
    }

    /// Encodes every chunk [`flush`](Self::flush) drains, positioned at
    /// `message`'s pointer.  `message`'s own scroll amounts are ignored.
    pub fn serialize_pending_scroll_messages(
        &mut self,
        message: &InjectScrollControlMessage,
    ) -> Vec<Vec<u8>> {
        let Some(ordinal) = self.ordinal else {
            return Vec::new();
        };
        let layout = self.layout;
        self.flush()
            .into_iter()
            .map(|steps| encode_scroll(ordinal, layout, message, steps))
            .collect()
    }

    /// Zeroes both residuals.
    pub fn reset(&mut self) {
        self.residual_x = 0.0;
        self.residual_y = 0.0;
    }

    /// The amount accumulated but not yet emitted, per axis.
    pub fn residual(&self) -> (f64, f64) {
        (self.residual_x, self.residual_y)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(scroll_x: f64, scroll_y: f64) -> InjectScrollControlMessage {
        InjectScrollControlMessage {
            pointer_x: 10,
            pointer_y: 20,
            screen_width: 1080,
            screen_height: 1920,
            scroll_x,
            scroll_y,
            buttons: 0,
        }
    }

    #[test]
    fn test_small_deltas_accumulate_into_one_step() {
        // Arrange
        let mut controller = ScrollController::new(Some(3), ScrollLayout::IntegerSteps);

        // Act
        let first = controller.accumulate(0.0, 0.4);
        let second = controller.accumulate(0.0, 0.4);
        let third = controller.accumulate(0.0, 0.4);

        // Assert
        assert_eq!(first, None);
        assert_eq!(second, None);
        assert_eq!(third, Some(ScrollSteps { x: 0.0, y: 1.0 }));
        assert!((controller.residual().1 - 0.2).abs() < 1e-9);
    }

    #[test]
    fn test_tenths_add_up_to_exactly_one_step() {
        // 0.1 is not representable; ten of them sum to 0.9999999999999999.
        let mut controller = ScrollController::new(Some(3), ScrollLayout::IntegerSteps);
        let emitted: Vec<_> = (0..10).filter_map(|_| controller.accumulate(0.1, 0.0)).collect();
        assert_eq!(emitted, vec![ScrollSteps { x: 1.0, y: 0.0 }]);
        assert_eq!(controller.residual(), (0.0, 0.0));
    }

    #[test]
    fn test_negative_deltas_truncate_toward_zero() {
        let mut controller = ScrollController::new(Some(3), ScrollLayout::IntegerSteps);
        assert_eq!(
            controller.accumulate(-1.5, 0.0),
            Some(ScrollSteps { x: -1.0, y: 0.0 })
        );
        assert_eq!(controller.residual(), (-0.5, 0.0));
    }

    #[test]
    fn test_fixed_point_emits_sub_step_amounts() {
        // Arrange
        let mut controller = ScrollController::new(Some(3), ScrollLayout::FixedPoint);

        // Act
        let emitted: Vec<_> = (0..8).filter_map(|_| controller.accumulate(0.25, 0.0)).collect();

        // Assert
        assert_eq!(emitted.len(), 8);
        assert_eq!(emitted.iter().map(|s| s.x).sum::<f64>(), 2.0);
        assert_eq!(controller.residual(), (0.0, 0.0));
    }

    #[test]
    fn test_fixed_point_sixteen_steps_are_emitted_in_full() {
        // Arrange
        let mut controller = ScrollController::new(Some(3), ScrollLayout::FixedPoint);

        // Act
        let emitted = controller.accumulate(0.0, 16.0);

        // Assert
        assert_eq!(emitted, Some(ScrollSteps { x: 0.0, y: 16.0 }));
        assert_eq!(controller.residual(), (0.0, 0.0));
        assert!(controller.flush().is_empty());
    }

    #[test]
    fn test_fixed_point_clamps_to_range_and_keeps_the_excess() {
        // Arrange
        let mut controller = ScrollController::new(Some(3), ScrollLayout::FixedPoint);

        // Act
        let first = controller.accumulate(40.0, 0.0).unwrap();

        // Assert
        assert_eq!(first.x, ScrollSteps::FIXED_POINT_RANGE);
        assert_eq!(controller.residual(), (24.0, 0.0));
    }

    #[test]
    fn test_flush_drains_amounts_above_the_fixed_point_range() {
        // Arrange
        let mut controller = ScrollController::new(Some(3), ScrollLayout::FixedPoint);
        let first = controller.accumulate(40.0, -20.0).unwrap();

        // Act
        let rest = controller.flush();

        // Assert
        assert_eq!(rest.len(), 2);
        let total_x: f64 = first.x + rest.iter().map(|s| s.x).sum::<f64>();
        let total_y: f64 = first.y + rest.iter().map(|s| s.y).sum::<f64>();
        assert_eq!(total_x, 40.0);
        assert_eq!(total_y, -20.0);
        assert_eq!(controller.residual(), (0.0, 0.0));
    }

    #[test]
    fn test_fixed_point_rounds_to_the_nearest_quantum() {
        // Three quarters of a quantum rounds up; the overshoot is owed back.
        let quantum = ScrollSteps::FIXED_POINT_RANGE / FIXED_POINT_QUANTA;
        let mut controller = ScrollController::new(Some(3), ScrollLayout::FixedPoint);

        let emitted = controller.accumulate(quantum * 0.75, 0.0);

        assert_eq!(emitted, Some(ScrollSteps { x: quantum, y: 0.0 }));
        assert!((controller.residual().0 + quantum * 0.25).abs() < 1e-15);
    }

    #[test]
    fn test_fixed_point_tenths_sum_to_whole_steps() {
        let mut controller = ScrollController::new(Some(3), ScrollLayout::FixedPoint);
        let mut total = 0.0;
        for _ in 0..30 {
            if let Some(steps) = controller.accumulate(0.0, 0.1) {
                total += steps.y;
            }
        }
        for steps in controller.flush() {
            total += steps.y;
        }
        assert!((total - 3.0).abs() < 1e-12);
        assert!(controller.residual().1.abs() < ScrollSteps::FIXED_POINT_RANGE / FIXED_POINT_QUANTA);
    }

    #[test]
    fn test_flush_is_bounded_per_call() {
        let mut controller = ScrollController::new(Some(3), ScrollLayout::FixedPoint);
        controller.accumulate(1.0e6, 0.0);

        let chunks = controller.flush();

        assert_eq!(chunks.len(), MAX_FLUSH_MESSAGES);
        assert!(controller.residual().0 > 0.0);
    }

    #[test]
    fn test_integer_flush_has_nothing_to_drain() {
        let mut controller = ScrollController::new(Some(3), ScrollLayout::IntegerSteps);
        controller.accumulate(0.0, 2.5);
        assert!(controller.flush().is_empty());
        assert_eq!(controller.residual(), (0.0, 0.5));
    }

    #[test]
    fn test_serialize_pending_encodes_each_drained_chunk() {
        // Arrange
        let mut controller = ScrollController::new(Some(3), ScrollLayout::FixedPoint);
        controller.serialize_scroll_message(&message(0.0, 24.0)).unwrap();

        // Act
        let pending = controller.serialize_pending_scroll_messages(&message(0.0, 0.0));

        // Assert
        assert_eq!(pending.len(), 1);
        assert_eq!(&pending[0][15..17], &0x4000i16.to_be_bytes());
        assert_eq!(controller.residual(), (0.0, 0.0));
    }

    #[test]
    fn test_fixed_point_below_one_quantum_is_held() {
        let mut controller = ScrollController::new(Some(3), ScrollLayout::FixedPoint);
        assert_eq!(controller.accumulate(0.0001, 0.0), None);
        assert_eq!(controller.residual(), (0.0001, 0.0));
    }

    #[test]
    fn test_reset_zeroes_both_residuals() {
        // Arrange
        let mut controller = ScrollController::new(Some(3), ScrollLayout::IntegerSteps);
        controller.accumulate(0.5, -0.5);

        // Act
        controller.reset();

        // Assert
        assert_eq!(controller.residual(), (0.0, 0.0));
        assert_eq!(controller.accumulate(0.5, 0.0), None);
    }

    #[test]
    fn test_non_finite_input_is_ignored() {
        let mut controller = ScrollController::new(Some(3), ScrollLayout::IntegerSteps);
        assert_eq!(controller.accumulate(f64::NAN, f64::INFINITY), None);
        assert_eq!(controller.residual(), (0.0, 0.0));
    }

    #[test]
    fn test_serialize_integer_layout_without_buttons() {
        // Arrange
        let mut controller = ScrollController::new(Some(3), ScrollLayout::IntegerSteps);

        // Act
        let bytes = controller.serialize_scroll_message(&message(1.0, -2.0)).unwrap();

        // Assert
        assert_eq!(
            bytes,
            vec![
                3, 0, 0, 0, 10, 0, 0, 0, 20, 0x04, 0x38, 0x07, 0x80, 0, 0, 0, 1, 0xff, 0xff,
                0xff, 0xfe
            ]
        );
    }

    #[test]
    fn test_serialize_fixed_point_layout() {
        // Arrange
        let mut controller = ScrollController::new(Some(3), ScrollLayout::FixedPoint);

        // Act
        let bytes = controller.serialize_scroll_message(&message(8.0, -16.0)).unwrap();

        // Assert
        assert_eq!(bytes.len(), 1 + 4 + 4 + 2 + 2 + 2 + 2 + 4);
        assert_eq!(&bytes[13..15], &0x4000i16.to_be_bytes());
        assert_eq!(&bytes[15..17], &i16::MIN.to_be_bytes());
        assert_eq!(controller.residual(), (0.0, 0.0));
    }

    #[test]
    fn test_unsupported_scroll_does_not_accumulate() {
        let mut controller = ScrollController::new(None, ScrollLayout::IntegerSteps);
        assert_eq!(controller.serialize_scroll_message(&message(3.0, 0.0)), None);
        assert_eq!(controller.residual(), (0.0, 0.0));
    }
}
