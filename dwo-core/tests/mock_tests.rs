use core::cell::Cell;
use core::sync::atomic::{AtomicI32, Ordering};

use dwo_core::utils::controllers::{Encoder, QuadratureDecoder, QuadratureError, TickSource};
use dwo_core::utils::math::odometry::{Pose, PoseEstimator, RobotConfig};
use dwo_core::utils::math::rotation::Point2D;
use embedded_hal_mock::eh1::digital::{Mock as PinMock, State, Transaction as PinTrans};

/// Build the pin transactions for a sequence of (A, B) levels.
pub fn levels(states: &[(bool, bool)]) -> (Vec<PinTrans>, Vec<PinTrans>) {
    let level = |high: bool| if high { State::High } else { State::Low };
    states
        .iter()
        .map(|&(a, b)| (PinTrans::get(level(a)), PinTrans::get(level(b))))
        .unzip()
}

#[test]
fn test_quadrature_counts_forward_and_back() {
    // initial sample, one forward cycle, then two steps back
    let (a_exp, b_exp) = levels(&[
        (false, false),
        (true, false),
        (true, true),
        (false, true),
        (false, false),
        (false, true),
        (true, true),
    ]);
    let a = PinMock::new(&a_exp);
    let b = PinMock::new(&b_exp);

    let counter = AtomicI32::new(0);
    let mut dec = QuadratureDecoder::new(a, b, &counter).unwrap();
    for _ in 0..4 {
        dec.poll().unwrap();
    }
    assert_eq!(dec.count(), 4);

    dec.poll().unwrap();
    dec.poll().unwrap();
    assert_eq!(dec.ticks(), 2);

    let (mut a, mut b) = dec.release();
    a.done();
    b.done();
}

#[test]
fn test_quadrature_reports_missed_edge() {
    let (a_exp, b_exp) = levels(&[(false, false), (true, true), (false, true)]);
    let a = PinMock::new(&a_exp);
    let b = PinMock::new(&b_exp);

    let counter = AtomicI32::new(0);
    let mut dec = QuadratureDecoder::new(a, b, &counter).unwrap();
    assert!(matches!(dec.poll(), Err(QuadratureError::InvalidTransition)));
    assert_eq!(dec.count(), 0);

    // the decoder resynchronises on the state it saw: 11 -> 01 is one step forward
    dec.poll().unwrap();
    assert_eq!(dec.count(), 1);

    let (mut a, mut b) = dec.release();
    a.done();
    b.done();
}

#[test]
fn test_idle_pins_do_not_count() {
    let (a_exp, b_exp) = levels(&[(true, false), (true, false), (true, false)]);
    let a = PinMock::new(&a_exp);
    let b = PinMock::new(&b_exp);

    let counter = AtomicI32::new(0);
    let mut dec = QuadratureDecoder::new(a, b, &counter).unwrap();
    dec.poll().unwrap();
    dec.poll().unwrap();
    assert_eq!(dec.count(), 0);

    let enc = Encoder::new(&dec, 0.01);
    assert_eq!(enc.distance(), 0.0);

    let (mut a, mut b) = dec.release();
    a.done();
    b.done();
}

#[test]
fn test_decoder_polled_between_updates() {
    // left wheel turns one full forward cycle; right and strafe stay idle
    let (a_exp, b_exp) = levels(&[
        (false, false),
        (true, false),
        (true, true),
        (false, true),
        (false, false),
    ]);
    let a = PinMock::new(&a_exp);
    let b = PinMock::new(&b_exp);

    let left = AtomicI32::new(0);
    let right = AtomicI32::new(0);
    let strafe = AtomicI32::new(0);
    let mut dec = QuadratureDecoder::new(a, b, &left).unwrap();

    let config = RobotConfig::new(4.0, 0.0).unwrap();
    let mut odo = PoseEstimator::new(
        Pose::default(),
        Encoder::new(&left, 0.5),
        Encoder::new(&right, 0.5),
        Encoder::new(&strafe, 0.5),
        config,
    );

    let mut expected_heading = 0.0f32;
    for _ in 0..4 {
        dec.poll().unwrap();
        odo.update();
        // one tick on the left only: (0 - 0.5) / 4
        expected_heading += -0.125;
        assert!((odo.orientation() - expected_heading).abs() < 1e-6);
    }
    assert_eq!(dec.count(), 4);
    assert!((odo.orientation() + 0.5).abs() < 1e-6);

    let (mut a, mut b) = dec.release();
    a.done();
    b.done();
}

/// Three wheels driven from a scripted body motion, read through `Cell`s.
struct Rig {
    left: Cell<f32>,
    right: Cell<f32>,
    strafe: Cell<f32>,
}

impl Rig {
    fn new() -> Self {
        Rig {
            left: Cell::new(0.0),
            right: Cell::new(0.0),
            strafe: Cell::new(0.0),
        }
    }

    fn drive(
        &self,
        d1: f32,
        d2: f32,
        ds: f32,
    ) {
        self.left.set(self.left.get() + d1);
        self.right.set(self.right.get() + d2);
        self.strafe.set(self.strafe.get() + ds);
    }
}

#[test]
fn test_straight_runs_follow_heading() {
    let rig = Rig::new();
    let config = RobotConfig::new(10.0, 0.0).unwrap();
    let mut odo = PoseEstimator::new(Pose::default(), &rig.left, &rig.right, &rig.strafe, config);

    for _ in 0..10 {
        rig.drive(1.5, 1.5, 0.0);
        odo.update();
    }
    let loc = odo.location();
    assert!(loc.x.abs() < 1e-5, "lateral drift {}", loc.x);
    assert!((loc.y - 15.0).abs() < 1e-4);
    assert_eq!(odo.orientation(), 0.0);
}

#[test]
fn test_two_step_scenario() {
    let rig = Rig::new();
    let config = RobotConfig::new(10.0, 0.0).unwrap();
    let mut odo = PoseEstimator::new(Pose::default(), &rig.left, &rig.right, &rig.strafe, config);

    rig.drive(10.0, 10.0, 0.0);
    odo.update();
    assert_eq!(odo.pose(), Pose::new(Point2D::new(0.0, 10.0), 0.0));

    rig.drive(5.0, 15.0, 0.0);
    odo.update();
    assert!((odo.orientation() - 1.0).abs() < 1e-6);

    // chord of the r = 10 arc, rotated by the updated heading
    let start = Point2D::new(10.0, 0.0);
    let chord = start - start.rotated(1.0);
    let expected = Point2D::new(0.0, 10.0) + chord.rotated(1.0);
    let loc = odo.location();
    assert!((loc.x - expected.x).abs() < 1e-4, "{:?} vs {:?}", loc, expected);
    assert!((loc.y - expected.y).abs() < 1e-4, "{:?} vs {:?}", loc, expected);

    // rotating by the old heading instead would land elsewhere
    let stale = Point2D::new(0.0, 10.0) + chord;
    assert!((loc.x - stale.x).abs() > 1e-2);
}

#[test]
fn test_encoders_feed_estimator() {
    let left = AtomicI32::new(0);
    let right = AtomicI32::new(0);
    let strafe = AtomicI32::new(0);
    let config = RobotConfig::new(8.0, 0.0).unwrap();
    let mut odo = PoseEstimator::new(
        Pose::default(),
        Encoder::new(&left, 0.5),
        Encoder::new(&right, 0.5),
        Encoder::new(&strafe, 0.5),
        config,
    );

    left.store(-8, Ordering::Relaxed);
    right.store(8, Ordering::Relaxed);
    odo.update();
    // (4 - -4) / 8
    assert!((odo.orientation() - 1.0).abs() < 1e-6);

    strafe.store(6, Ordering::Relaxed);
    odo.update();
    assert!((odo.orientation() - 1.0).abs() < 1e-6);
    let loc = odo.location();
    // 3 units of strafe along robot +X, rotated by 1 rad
    assert!((loc.x - 3.0 * 1.0f32.cos()).abs() < 1e-4);
    assert!((loc.y - 3.0 * 1.0f32.sin()).abs() < 1e-4);
}
