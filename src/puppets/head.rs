/*!
Head gestures and idle head motion.

Motions are lists of linear rotation segments. Several motions can run at
once and their rotations add up. The resulting pitch and yaw are written to a
[HeadSink] after every update that moved the head.
*/

use std::{collections::VecDeque, time::Duration};

use rand::{rngs::StdRng, Rng, SeedableRng};

use crate::{
    model::HeadSettings,
    scheduler::{random_interval, seconds, Scheduler},
    Logger,
};

use super::HeadSink;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Left,
    Right,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Axis {
    Pitch,
    Yaw,
}

#[derive(Debug, Clone, Copy)]
struct Segment {
    axis: Axis,
    /// Radians.
    delta: f32,
    duration: Duration,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum MotionKind {
    Idle,
    Gesture,
}

#[derive(Debug, Clone)]
struct Motion {
    kind: MotionKind,
    segments: VecDeque<Segment>,
    elapsed: Duration,
}

impl Motion {
    fn new(kind: MotionKind, segments: impl IntoIterator<Item = Segment>) -> Self {
        Self {
            kind,
            segments: segments.into_iter().collect(),
            elapsed: Duration::ZERO,
        }
    }

    /// Advance by `dt` and return the (pitch, yaw) change it caused.
    fn advance(&mut self, mut dt: Duration) -> (f32, f32) {
        let (mut pitch, mut yaw) = (0.0, 0.0);

        while let Some(segment) = self.segments.front().copied() {
            let remaining = segment.duration.saturating_sub(self.elapsed);
            let step = remaining.min(dt);

            let fraction = if segment.duration.is_zero() {
                1.0
            } else {
                (step.as_secs_f64() / segment.duration.as_secs_f64()) as f32
            };
            match segment.axis {
                Axis::Pitch => pitch += segment.delta * fraction,
                Axis::Yaw => yaw += segment.delta * fraction,
            }

            dt -= step;
            self.elapsed += step;

            if self.elapsed >= segment.duration {
                self.segments.pop_front();
                self.elapsed = Duration::ZERO;
            } else {
                break;
            }
        }

        (pitch, yaw)
    }

    fn is_finished(&self) -> bool {
        self.segments.is_empty()
    }
}

#[derive(Debug)]
enum Task {
    IdleStep,
}

#[derive(Debug)]
pub struct HeadAnimator<H: HeadSink> {
    logger: Logger,

    sink: H,
    enabled: bool,
    settings: HeadSettings,
    rng: StdRng,

    timers: Scheduler<Task>,
    motions: Vec<Motion>,

    pitch: f32,
    yaw: f32,
    /// Degrees of yaw added by idle motion so far.
    idle_yaw: f32,
}

impl<H: HeadSink> HeadAnimator<H> {
    pub fn new(sink: H, settings: HeadSettings, seed: Option<u64>) -> Self {
        let rng = match seed {
            Some(v) => StdRng::seed_from_u64(v),
            None => StdRng::from_entropy(),
        };

        let mut r = Self {
            logger: Logger::create("HeadAnimator"),

            sink,
            enabled: true,
            settings,
            rng,

            timers: Scheduler::new(),
            motions: vec![],

            pitch: 0.0,
            yaw: 0.0,
            idle_yaw: 0.0,
        };

        if r.settings.idle_motion {
            r.schedule_idle_step(Duration::ZERO);
        }

        r
    }

    /// A head animator for an avatar without a head node. Every call is a no-op.
    pub fn disabled(sink: H, settings: HeadSettings) -> Self {
        let mut r = Self::new(
            sink,
            HeadSettings {
                idle_motion: false,
                ..settings
            },
            Some(0),
        );
        r.enabled = false;

        r
    }

    pub fn is_enabled(&self) -> bool {
        self.enabled
    }

    /// Turn the head towards `direction`.
    pub fn turn(&mut self, direction: Direction) {
        let angle = match direction {
            Direction::Left => self.settings.turn_angle,
            Direction::Right => -self.settings.turn_angle,
        };
        let duration = seconds(self.settings.turn_duration);

        self.start(Motion::new(
            MotionKind::Gesture,
            [Segment {
                axis: Axis::Yaw,
                delta: angle.to_radians(),
                duration,
            }],
        ));
    }

    /// Nod up and down.
    pub fn nod(&mut self) {
        self.start(self.gesture(Axis::Pitch));
    }

    /// Shake the head from side to side.
    pub fn shake(&mut self) {
        self.start(self.gesture(Axis::Yaw));
    }

    pub fn update(&mut self, dt: Duration) {
        if !self.enabled {
            return;
        }

        let until = self.timers.now().saturating_add(dt);
        let mut moved = false;

        while let Some((due, task)) = self.timers.pop_due(until) {
            moved |= self.advance_motions(due.saturating_sub(self.timers.now()));
            self.timers.advance_to(due);

            match task {
                Task::IdleStep => self.idle_step(),
            }
        }

        moved |= self.advance_motions(until.saturating_sub(self.timers.now()));
        self.timers.advance_to(until);

        if moved {
            self.sink.set_head_rotation(self.pitch, self.yaw);
        }
    }

    /// Current (pitch, yaw) in radians.
    pub fn rotation(&self) -> (f32, f32) {
        (self.pitch, self.yaw)
    }

    /// Whether a gesture is still playing. Idle motion does not count.
    pub fn is_gesturing(&self) -> bool {
        self.motions.iter().any(|v| v.kind == MotionKind::Gesture)
    }

    pub fn sink(&self) -> &H {
        &self.sink
    }

    fn gesture(&self, axis: Axis) -> Motion {
        let delta = self.settings.gesture_angle.to_radians();
        let duration = seconds(self.settings.gesture_step_duration);

        let segments = (0..self.settings.gesture_repeats).flat_map(|_| {
            [
                Segment {
                    axis,
                    delta,
                    duration,
                },
                Segment {
                    axis,
                    delta: -delta,
                    duration,
                },
            ]
        });

        Motion::new(MotionKind::Gesture, segments)
    }

    fn start(&mut self, motion: Motion) {
        if !self.enabled {
            self.logger.debug("No head node, ignoring head motion");
            return;
        }

        self.motions.push(motion);
    }

    fn idle_step(&mut self) {
        let max_step = self.settings.idle_max_step.abs();
        let mut angle = if max_step > 0.0 && max_step.is_finite() {
            self.rng.gen_range(-max_step..=max_step)
        } else {
            0.0
        };
        if (self.idle_yaw + angle).abs() > self.settings.idle_max_angle {
            angle = -angle;
        }
        self.idle_yaw += angle;

        let duration = seconds(self.settings.idle_step_duration);
        self.motions.push(Motion::new(
            MotionKind::Idle,
            [Segment {
                axis: Axis::Yaw,
                delta: angle.to_radians(),
                duration,
            }],
        ));

        self.schedule_idle_step(duration);
    }

    /// Schedule the next idle step a random interval after `after`.
    fn schedule_idle_step(&mut self, after: Duration) {
        let delay = random_interval(
            &mut self.rng,
            self.settings.idle_interval_min,
            self.settings.idle_interval_max,
        );
        self.timers.schedule_after(after.saturating_add(delay), Task::IdleStep);
    }

    fn advance_motions(&mut self, dt: Duration) -> bool {
        if dt.is_zero() || self.motions.is_empty() {
            return false;
        }

        for motion in self.motions.iter_mut() {
            let (pitch, yaw) = motion.advance(dt);
            self.pitch += pitch;
            self.yaw += yaw;
        }
        self.motions.retain(|v| !v.is_finished());

        true
    }
}
