//! Tilt gestures to debounced button transitions.
//!
//! Roll drives LEFT/RIGHT through a three-zone classifier. Pitch past a
//! one-sided threshold toggles the action button on every evaluation
//! (rapid fire); dropping back below the threshold releases it. The toggle
//! rate follows the evaluation rate, so it scales with the sample rate.

use crate::{Button, ButtonEvent, ButtonState};
use thiserror::Error;
use tilt_imu::orientation::EulerAngles;

#[derive(Debug, Clone, PartialEq, Error)]
pub enum GestureError {
    #[error("Threshold {0} must be positive and finite, got {1}")]
    InvalidThreshold(&'static str, f64),
}

/// Tilt thresholds in degrees.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GestureThresholds {
    /// Symmetric roll band for LEFT/RIGHT.
    pub roll_deg: f64,
    /// Pitch above which the action button fires.
    pub pitch_deg: f64,
    /// Symmetric pitch band for UP/DOWN. Disabled when `None`.
    pub vertical_pitch_deg: Option<f64>,
}

impl Default for GestureThresholds {
    fn default() -> Self {
        Self {
            roll_deg: 10.0,
            pitch_deg: 5.0,
            vertical_pitch_deg: None,
        }
    }
}

impl GestureThresholds {
    pub fn validate(&self) -> Result<(), GestureError> {
        let check = |name: &'static str, value: f64| {
            if value.is_finite() && value > 0.0 {
                Ok(())
            } else {
                Err(GestureError::InvalidThreshold(name, value))
            }
        };
        check("roll_deg", self.roll_deg)?;
        check("pitch_deg", self.pitch_deg)?;
        if let Some(vertical) = self.vertical_pitch_deg {
            check("vertical_pitch_deg", vertical)?;
        }
        Ok(())
    }
}

/// Position of an angle relative to a symmetric threshold.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Zone {
    Negative,
    Neutral,
    Positive,
}

impl Zone {
    /// Strict comparison: an angle exactly at the threshold is neutral.
    pub fn classify(value: f64, threshold: f64) -> Zone {
        if value < -threshold {
            Zone::Negative
        } else if value > threshold {
            Zone::Positive
        } else {
            Zone::Neutral
        }
    }
}

/// Transitions produced by a single evaluation, in emission order.
#[derive(Debug)]
pub struct Events {
    inner: std::vec::IntoIter<ButtonEvent>,
}

impl Iterator for Events {
    type Item = ButtonEvent;

    fn next(&mut self) -> Option<ButtonEvent> {
        self.inner.next()
    }

    fn size_hint(&self) -> (usize, Option<usize>) {
        self.inner.size_hint()
    }
}

impl ExactSizeIterator for Events {}

/// Collects the transitions of one evaluation.
struct Emitter<'a> {
    state: &'a mut ButtonState,
    events: Vec<ButtonEvent>,
}

impl Emitter<'_> {
    fn set(&mut self, button: Button, value: bool) {
        if let Some(event) = self.state.set(button, value) {
            tracing::trace!(%button, pressed = value, "Button transition");
            self.events.push(event);
        }
    }

    /// Drive a button pair from a zone. The opposite button is always
    /// released before the active one is pressed.
    fn axis(&mut self, zone: Zone, negative: Button, positive: Button) {
        match zone {
            Zone::Negative => {
                self.set(positive, false);
                self.set(negative, true);
            }
            Zone::Positive => {
                self.set(negative, false);
                self.set(positive, true);
            }
            Zone::Neutral => {
                self.set(negative, false);
                self.set(positive, false);
            }
        }
    }

    fn finish(self) -> Events {
        Events {
            inner: self.events.into_iter(),
        }
    }
}

/// Owns the button map and turns orientation angles into button events.
#[derive(Debug, Clone)]
pub struct GestureMapper {
    thresholds: GestureThresholds,
    state: ButtonState,
}

impl GestureMapper {
    pub fn new(thresholds: GestureThresholds) -> Result<Self, GestureError> {
        thresholds.validate()?;
        Ok(Self {
            thresholds,
            state: ButtonState::new(),
        })
    }

    pub fn thresholds(&self) -> &GestureThresholds {
        &self.thresholds
    }

    /// Evaluate one orientation. Only buttons whose value changes are returned.
    pub fn evaluate(&mut self, angles: &EulerAngles) -> Events {
        let roll = angles.roll_deg();
        let pitch = angles.pitch_deg();
        let thresholds = self.thresholds;

        let mut emitter = Emitter {
            state: &mut self.state,
            events: Vec::new(),
        };

        emitter.axis(
            Zone::classify(roll, thresholds.roll_deg),
            Button::Left,
            Button::Right,
        );

        let action = Button::PRIMARY_ACTION;
        if pitch > thresholds.pitch_deg {
            // Release between presses so the consumer sees repeated activations.
            let pressed = emitter.state.is_pressed(action);
            emitter.set(action, !pressed);
        } else {
            emitter.set(action, false);
        }

        if let Some(vertical) = thresholds.vertical_pitch_deg {
            emitter.axis(Zone::classify(pitch, vertical), Button::Down, Button::Up);
        }

        emitter.finish()
    }

    /// Release everything still held, e.g. when the sample stream ends.
    pub fn release_all(&mut self) -> Events {
        let mut emitter = Emitter {
            state: &mut self.state,
            events: Vec::new(),
        };
        for button in Button::ALL {
            emitter.set(button, false);
        }
        emitter.finish()
    }

    pub fn is_pressed(&self, button: Button) -> bool {
        self.state.is_pressed(button)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn roll(deg: f64) -> EulerAngles {
        EulerAngles::from_degrees(0.0, 0.0, deg)
    }

    fn pitch(deg: f64) -> EulerAngles {
        EulerAngles::from_degrees(0.0, deg, 0.0)
    }

    fn mapper() -> GestureMapper {
        GestureMapper::new(GestureThresholds::default()).unwrap()
    }

    #[test]
    fn roll_sequence_emits_edges_only() {
        let mut mapper = mapper();
        let per_step: Vec<Vec<ButtonEvent>> = [0.0, 15.0, 15.0, -15.0, 0.0]
            .iter()
            .map(|&deg| mapper.evaluate(&roll(deg)).collect())
            .collect();

        assert_eq!(
            per_step,
            vec![
                vec![],
                vec![ButtonEvent::press(Button::Right)],
                vec![],
                vec![
                    ButtonEvent::release(Button::Right),
                    ButtonEvent::press(Button::Left)
                ],
                vec![ButtonEvent::release(Button::Left)],
            ]
        );
    }

    #[test]
    fn pitch_held_past_threshold_toggles_action() {
        let mut mapper = mapper();
        let events: Vec<ButtonEvent> = [0.0, 8.0, 8.0, 8.0, 0.0]
            .iter()
            .flat_map(|&deg| mapper.evaluate(&pitch(deg)).collect::<Vec<_>>())
            .collect();

        assert_eq!(
            events,
            vec![
                ButtonEvent::press(Button::A),
                ButtonEvent::release(Button::A),
                ButtonEvent::press(Button::A),
                ButtonEvent::release(Button::A),
            ]
        );
    }

    #[test]
    fn release_below_threshold_is_silent_when_already_released() {
        let mut mapper = mapper();
        assert_eq!(mapper.evaluate(&pitch(8.0)).len(), 1);
        assert_eq!(mapper.evaluate(&pitch(8.0)).len(), 1);
        assert!(!mapper.is_pressed(Button::A));
        assert_eq!(mapper.evaluate(&pitch(0.0)).len(), 0);
    }

    #[test]
    fn neutral_band_never_emits() {
        let mut mapper = mapper();
        for _ in 0..1000 {
            assert_eq!(mapper.evaluate(&EulerAngles::from_degrees(30.0, 4.9, -9.9)).len(), 0);
        }
    }

    #[test]
    fn thresholds_are_strict() {
        assert_eq!(Zone::classify(10.0, 10.0), Zone::Neutral);
        assert_eq!(Zone::classify(-10.0, 10.0), Zone::Neutral);
        assert_eq!(Zone::classify(10.1, 10.0), Zone::Positive);
        assert_eq!(Zone::classify(-10.1, 10.0), Zone::Negative);
        assert_eq!(Zone::classify(f64::NAN, 10.0), Zone::Neutral);
    }

    #[test]
    fn roll_and_pitch_combine_in_order() {
        let mut mapper = mapper();
        let events: Vec<ButtonEvent> = mapper
            .evaluate(&EulerAngles::from_degrees(0.0, 20.0, -20.0))
            .collect();
        assert_eq!(
            events,
            vec![ButtonEvent::press(Button::Left), ButtonEvent::press(Button::A)]
        );
    }

    #[test]
    fn vertical_axis_is_opt_in() {
        let thresholds = GestureThresholds {
            vertical_pitch_deg: Some(45.0),
            ..GestureThresholds::default()
        };
        let mut vertical = GestureMapper::new(thresholds).unwrap();

        let events: Vec<ButtonEvent> = vertical.evaluate(&pitch(-50.0)).collect();
        assert_eq!(events, vec![ButtonEvent::press(Button::Down)]);

        let events: Vec<ButtonEvent> = vertical.evaluate(&pitch(50.0)).collect();
        assert_eq!(
            events,
            vec![
                ButtonEvent::press(Button::A),
                ButtonEvent::release(Button::Down),
                ButtonEvent::press(Button::Up),
            ]
        );

        let mut plain = mapper();
        assert!(plain
            .evaluate(&pitch(-50.0))
            .all(|e| e.button != Button::Down));
    }

    #[test]
    fn release_all_releases_held_buttons() {
        let mut mapper = mapper();
        mapper.evaluate(&EulerAngles::from_degrees(0.0, 20.0, 20.0)).count();

        let released: Vec<ButtonEvent> = mapper.release_all().collect();
        assert_eq!(
            released,
            vec![
                ButtonEvent::release(Button::A),
                ButtonEvent::release(Button::Right)
            ]
        );
        assert_eq!(mapper.release_all().len(), 0);
    }

    #[test]
    fn evaluations_are_independent() {
        let mut mapper = mapper();
        let first = mapper.evaluate(&roll(15.0));
        let second = mapper.evaluate(&roll(15.0));
        assert_eq!(first.len(), 1);
        assert_eq!(second.len(), 0);
    }

    #[test]
    fn rejects_bad_thresholds() {
        let thresholds = GestureThresholds {
            roll_deg: 0.0,
            ..GestureThresholds::default()
        };
        assert_eq!(
            GestureMapper::new(thresholds).unwrap_err(),
            GestureError::InvalidThreshold("roll_deg", 0.0)
        );

        let thresholds = GestureThresholds {
            vertical_pitch_deg: Some(f64::INFINITY),
            ..GestureThresholds::default()
        };
        assert!(GestureMapper::new(thresholds).is_err());
    }
}
