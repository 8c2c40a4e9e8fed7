//! Three dead-wheel odometry.
//!
//! `PoseEstimator` integrates the incremental travel of two parallel ("vertical")
//! wheels and one perpendicular ("strafe") wheel into a field-centric pose.
//! Each step is treated as a constant-curvature arc: the vertical wheels give the
//! heading change and the arc-chord displacement, the strafe wheel gives the
//! lateral travel once the spurious travel induced by turning is removed.
//!
//! Heading is in radians, unbounded, counter-clockwise positive with 0 rad along
//! the field +X axis.
//!
//! # Example
//! ```rust
//! use core::cell::Cell;
//! use dwo_core::utils::math::odometry::{Pose, PoseEstimator, RobotConfig};
//!
//! let (left, right, strafe) = (Cell::new(0.0), Cell::new(0.0), Cell::new(0.0));
//! let config = RobotConfig::new(10.0, 0.0).unwrap();
//! let mut odo = PoseEstimator::new(Pose::default(), &left, &right, &strafe, config);
//!
//! left.set(10.0);
//! right.set(10.0);
//! odo.update();
//! assert_eq!(odo.orientation(), 0.0);
//! assert_eq!(odo.location().y, 10.0);
//! ```

use core::{cell::Cell, f32::consts::PI};

use serde::{Deserialize, Serialize};

use super::rotation::{rotate_about_origin, Point2D};

/// Track width used when the caller does not supply one (same units as encoder distances).
pub const DEFAULT_TRACK_WIDTH: f32 = 0.3;
/// Strafe-wheel travel per full robot rotation used when the caller does not supply one.
pub const DEFAULT_STRAFE_PER_ROTATION: f32 = 0.0;

/// Rejected calibration values.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ConfigError {
    InvalidTrackWidth(f32),
    NonFiniteStrafePerRotation(f32),
}

/// Calibration constants of the dead-wheel layout. Fixed for the estimator's lifetime.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct RobotConfig {
    /// Perpendicular distance between the two vertical wheels.
    track_width: f32,
    /// Distance the strafe wheel reports during one full in-place rotation.
    strafe_per_rotation: f32,
}

impl RobotConfig {
    /// Validate and build a configuration.
    pub fn new(
        track_width: f32,
        strafe_per_rotation: f32,
    ) -> Result<Self, ConfigError> {
        if !track_width.is_finite() || track_width <= 0.0 {
            return Err(ConfigError::InvalidTrackWidth(track_width));
        }
        if !strafe_per_rotation.is_finite() {
            return Err(ConfigError::NonFiniteStrafePerRotation(strafe_per_rotation));
        }
        Ok(Self::new_unchecked(track_width, strafe_per_rotation))
    }

    /// Build a configuration without validation. A non-positive track width
    /// yields division by zero or sign-inverted headings on every update.
    pub const fn new_unchecked(
        track_width: f32,
        strafe_per_rotation: f32,
    ) -> Self {
        Self {
            track_width,
            strafe_per_rotation,
        }
    }

    pub fn track_width(&self) -> f32 {
        self.track_width
    }

    pub fn strafe_per_rotation(&self) -> f32 {
        self.strafe_per_rotation
    }
}

/// Snapshot of the estimated pose.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Pose {
    pub location: Point2D,
    /// Unwrapped heading (rad).
    pub heading: f32,
}

impl Pose {
    pub const fn new(
        location: Point2D,
        heading: f32,
    ) -> Self {
        Self { location, heading }
    }

    pub fn is_finite(&self) -> bool {
        self.location.is_finite() && self.heading.is_finite()
    }

    /// Heading folded into (-π, π]. For display; the estimator never wraps.
    pub fn wrapped_heading(&self) -> f32 {
        let wrapped = libm::atan2f(libm::sinf(self.heading), libm::cosf(self.heading));
        if wrapped <= -PI {
            PI
        } else {
            wrapped
        }
    }
}

/// A source of cumulative travelled distance.
///
/// Readings stay in the source's native unit so that increments are taken
/// before any lossy conversion.
pub trait DistanceSource {
    type Reading: Copy + core::fmt::Debug;

    /// Current cumulative reading.
    fn reading(&mut self) -> Self::Reading;

    /// Distance travelled going from reading `from` to reading `to`.
    fn travel(
        &self,
        from: Self::Reading,
        to: Self::Reading,
    ) -> f32;
}

impl DistanceSource for &Cell<f32> {
    type Reading = f32;

    fn reading(&mut self) -> f32 {
        self.get()
    }

    fn travel(
        &self,
        from: f32,
        to: f32,
    ) -> f32 {
        to - from
    }
}

impl<T: DistanceSource + ?Sized> DistanceSource for &mut T {
    type Reading = T::Reading;

    fn reading(&mut self) -> T::Reading {
        (**self).reading()
    }

    fn travel(
        &self,
        from: T::Reading,
        to: T::Reading,
    ) -> f32 {
        (**self).travel(from, to)
    }
}

/// Turns cumulative readings into per-call increments.
#[derive(Debug)]
pub struct DeltaTracker<S: DistanceSource> {
    source: S,
    last: S::Reading,
}

impl<S: DistanceSource> DeltaTracker<S> {
    /// Track `source`, taking its current reading as the baseline.
    pub fn new(mut source: S) -> Self {
        let last = source.reading();
        Self { source, last }
    }

    /// Track `source` from an explicit baseline.
    pub fn with_baseline(
        source: S,
        baseline: S::Reading,
    ) -> Self {
        Self {
            source,
            last: baseline,
        }
    }

    /// Distance travelled since the previous call. Moves the baseline, so a
    /// second call with no motion in between returns zero.
    pub fn delta(&mut self) -> f32 {
        let current = self.source.reading();
        let delta = self.source.travel(self.last, current);
        self.last = current;
        delta
    }

    pub fn baseline(&self) -> S::Reading {
        self.last
    }
}

/// Dead-reckoning pose estimator over left, right and strafe wheels.
///
/// Not synchronised: `update()` and the accessors must be called from one
/// context (or behind an external lock).
pub struct PoseEstimator<L: DistanceSource, R: DistanceSource, S: DistanceSource> {
    config: RobotConfig,
    location: Point2D,
    heading: f32,
    left: DeltaTracker<L>,
    right: DeltaTracker<R>,
    strafe: DeltaTracker<S>,
}

impl<L, R, S> PoseEstimator<L, R, S>
where
    L: DistanceSource,
    R: DistanceSource,
    S: DistanceSource,
{
    /// Start at `initial`. Each wheel's current reading becomes its baseline.
    pub fn new(
        initial: Pose,
        left: L,
        right: R,
        strafe: S,
        config: RobotConfig,
    ) -> Self {
        Self::from_trackers(
            initial,
            DeltaTracker::new(left),
            DeltaTracker::new(right),
            DeltaTracker::new(strafe),
            config,
        )
    }

    /// Start at `initial` with trackers the caller has already seeded.
    pub fn from_trackers(
        initial: Pose,
        left: DeltaTracker<L>,
        right: DeltaTracker<R>,
        strafe: DeltaTracker<S>,
        config: RobotConfig,
    ) -> Self {
        Self {
            config,
            location: initial.location,
            heading: initial.heading,
            left,
            right,
            strafe,
        }
    }

    /// Pull one delta from every wheel and integrate it.
    pub fn update(&mut self) {
        let d1 = self.left.delta();
        let d2 = self.right.delta();
        let d_strafe = self.strafe.delta();
        self.step(d1, d2, d_strafe);
    }

    /// Integrate one step of wheel travel: `d1` left, `d2` right, `d_strafe` strafe.
    pub fn step(
        &mut self,
        d1: f32,
        d2: f32,
        d_strafe: f32,
    ) {
        let straight = d1 == d2;
        let (vertical, d_theta) = if straight {
            // Straight line: the arc formula below is 0/0 here.
            (Point2D::new(0.0, d1), 0.0)
        } else {
            let d = (d1 + d2) / 2.0;
            let d_theta = (d2 - d1) / self.config.track_width;

            // Later rotation into the field frame uses the new heading.
            self.heading += d_theta;

            let r = d / d_theta;
            let start = Point2D::new(r, 0.0);
            (start - rotate_about_origin(start, d_theta), d_theta)
        };

        let corrected_strafe = d_strafe - d_theta * self.config.strafe_per_rotation;
        let lateral = Point2D::new(
            libm::cosf(d_theta) * corrected_strafe,
            libm::sinf(d_theta) * corrected_strafe,
        );

        let robot_centric = vertical + lateral;
        let field_centric = rotate_about_origin(robot_centric, self.heading);
        self.location += field_centric;

        tracing::trace!(
            d1,
            d2,
            d_strafe,
            d_theta,
            straight,
            x = self.location.x,
            y = self.location.y,
            heading = self.heading,
            "odometry step"
        );
    }

    /// Current position.
    pub fn location(&self) -> Point2D {
        self.location
    }

    /// Current unwrapped heading (rad).
    pub fn orientation(&self) -> f32 {
        self.heading
    }

    pub fn pose(&self) -> Pose {
        Pose::new(self.location, self.heading)
    }

    pub fn config(&self) -> &RobotConfig {
        &self.config
    }
}
