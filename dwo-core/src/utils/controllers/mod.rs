//! Module Exports
//!
//! This file exports the controller side of the odometry system.
//!
//! - `encoder`: dead-wheel encoder drivers feeding the estimator.
//! - `OdometryController`: periodic update loop publishing pose reports.

/// Module for encoder drivers.
pub mod encoder;

use embassy_sync::{blocking_mutex::raw::CriticalSectionRawMutex, channel::Channel};
use embassy_time::{Duration, Ticker};
use serde::{Deserialize, Serialize};

use crate::utils::math::{
    odometry::{
        ConfigError, DistanceSource, Pose, PoseEstimator, RobotConfig,
        DEFAULT_STRAFE_PER_ROTATION, DEFAULT_TRACK_WIDTH,
    },
    rotation::Point2D,
};

pub use encoder::{Encoder, QuadratureDecoder, QuadratureError, TickSource};

/// Channel used to receive odometry commands (`OdometryCommand` messages).
pub static ODOMETRY_CHANNEL: Channel<CriticalSectionRawMutex, OdometryCommand, 16> = Channel::new();

/// Channel the controller publishes `PoseReport`s on.
pub static POSE_CHANNEL: Channel<CriticalSectionRawMutex, PoseReport, 16> = Channel::new();

/// Odometry command variants.
///
/// Serialized as JSON with tag `"oc"`.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
#[serde(tag = "oc", rename_all = "snake_case")]
pub enum OdometryCommand {
    /// Stop integrating; wheel travel during the pause is applied on resume.
    Pause,
    /// Resume integrating.
    Resume,
    /// Publish the current pose immediately.
    Report,
}

impl OdometryCommand {
    pub fn from_json(bytes: &[u8]) -> Result<Self, serde_json::Error> {
        serde_json::from_slice(bytes)
    }
}

/// A pose snapshot tagged with the number of updates integrated so far.
#[derive(Debug, Serialize, Deserialize, Clone, Copy, PartialEq)]
pub struct PoseReport {
    pub seq: u32,
    pub pose: Pose,
}

/// Owns the estimator and runs it once per control cycle.
pub struct OdometryController<L: DistanceSource, R: DistanceSource, S: DistanceSource> {
    estimator: PoseEstimator<L, R, S>,
    running: bool,
    seq: u32,
    diverged: bool,
}

impl<L, R, S> OdometryController<L, R, S>
where
    L: DistanceSource,
    R: DistanceSource,
    S: DistanceSource,
{
    pub fn new(
        left: L,
        right: R,
        strafe: S,
        initial: Pose,
        track_width: Option<f32>,
        strafe_per_rotation: Option<f32>,
    ) -> Result<Self, ConfigError> {
        let config = RobotConfig::new(
            track_width.unwrap_or(DEFAULT_TRACK_WIDTH),
            strafe_per_rotation.unwrap_or(DEFAULT_STRAFE_PER_ROTATION),
        )?;
        tracing::info!(
            track_width = config.track_width(),
            strafe_per_rotation = config.strafe_per_rotation(),
            "odometry configured"
        );

        Ok(Self {
            estimator: PoseEstimator::new(initial, left, right, strafe, config),
            running: true,
            seq: 0,
            diverged: false,
        })
    }

    /// Apply a command. `Report` yields the current pose.
    pub fn handle(
        &mut self,
        command: OdometryCommand,
    ) -> Option<PoseReport> {
        tracing::debug!(?command, "odometry command");
        match command {
            OdometryCommand::Pause => {
                self.running = false;
                None
            }
            OdometryCommand::Resume => {
                self.running = true;
                None
            }
            OdometryCommand::Report => Some(self.report()),
        }
    }

    /// One control cycle. Returns the new pose, or `None` while paused.
    pub fn tick(&mut self) -> Option<PoseReport> {
        if !self.running {
            return None;
        }

        self.estimator.update();
        self.seq = self.seq.wrapping_add(1);

        let report = self.report();
        if !self.diverged && !report.pose.is_finite() {
            self.diverged = true;
            tracing::warn!(seq = report.seq, pose = ?report.pose, "pose is no longer finite");
        }
        Some(report)
    }

    /// Drive `tick()` every `period`, taking commands from `ODOMETRY_CHANNEL`
    /// and publishing to `POSE_CHANNEL`. Reports are dropped when nobody reads them.
    pub async fn run(
        &mut self,
        period: Duration,
    ) -> ! {
        let mut ticker = Ticker::every(period);
        loop {
            while let Ok(command) = ODOMETRY_CHANNEL.try_receive() {
                if let Some(report) = self.handle(command) {
                    Self::publish(report);
                }
            }
            if let Some(report) = self.tick() {
                Self::publish(report);
            }
            ticker.next().await;
        }
    }

    fn publish(report: PoseReport) {
        if POSE_CHANNEL.try_send(report).is_err() {
            tracing::trace!(seq = report.seq, "pose channel full, report dropped");
        }
    }

    fn report(&self) -> PoseReport {
        PoseReport {
            seq: self.seq,
            pose: self.estimator.pose(),
        }
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn location(&self) -> Point2D {
        self.estimator.location()
    }

    pub fn orientation(&self) -> f32 {
        self.estimator.orientation()
    }

    pub fn config(&self) -> &RobotConfig {
        self.estimator.config()
    }
}
