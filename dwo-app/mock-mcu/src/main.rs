use clap::Parser;
use core::sync::atomic::{AtomicU32, Ordering};
use dwo_core::mk_static;
use dwo_core::utils::controllers::{OdometryCommand, ODOMETRY_CHANNEL, POSE_CHANNEL};
use dwo_core::utils::math::odometry::DistanceSource;
use dwo_core::utils::{Duration, OdometryController, Pose, Ticker, Timer};
use embassy_executor::{Executor, Spawner};
use static_cell::StaticCell;
use std::io::BufRead;
use tracing::{error, info, warn};

#[derive(Parser)]
#[clap(version = "1.0")]
struct Opts
{
    /// distance between the two vertical wheels
    #[clap(long, default_value_t = 0.3)]
    track_width: f32,
    /// strafe wheel travel per full robot rotation
    #[clap(long, default_value_t = 0.0)]
    strafe_per_rotation: f32,
    /// control loop period in milliseconds
    #[clap(long, default_value_t = 20)]
    period_ms: u64,
    /// simulated forward speed (units/s)
    #[clap(long, default_value_t = 0.2)]
    forward: f32,
    /// simulated turn rate (rad/s, counter-clockwise positive)
    #[clap(long, default_value_t = 0.0)]
    turn: f32,
    /// simulated strafe speed (units/s)
    #[clap(long, default_value_t = 0.0)]
    strafe: f32,
    /// stop after this many control cycles, 0 runs forever
    #[clap(long, default_value_t = 0)]
    steps: u32,
}

/// Simulated dead wheel holding its cumulative distance as f32 bits.
struct SimWheel(AtomicU32);

impl SimWheel {
    const fn new() -> Self {
        SimWheel(AtomicU32::new(0))
    }

    fn advance(&self, delta: f32) {
        let current = f32::from_bits(self.0.load(Ordering::Relaxed));
        self.0.store((current + delta).to_bits(), Ordering::Relaxed);
    }
}

impl DistanceSource for &SimWheel {
    type Reading = f32;

    fn reading(&mut self) -> f32 {
        f32::from_bits(self.0.load(Ordering::Relaxed))
    }

    fn travel(&self, from: f32, to: f32) -> f32 {
        to - from
    }
}

type SimController = OdometryController<&'static SimWheel, &'static SimWheel, &'static SimWheel>;

/// Body motion commanded to the simulated robot.
#[derive(Clone, Copy)]
struct Motion {
    forward: f32,
    turn: f32,
    strafe: f32,
    track_width: f32,
    strafe_per_rotation: f32,
}

#[embassy_executor::task]
async fn plant_task(wheels: &'static [SimWheel; 3], motion: Motion, period: Duration) -> ! {
    let dt = period.as_micros() as f32 / 1_000_000.0;
    let mut ticker = Ticker::every(period);
    loop {
        let d_theta = motion.turn * dt;
        let half_turn = d_theta * motion.track_width / 2.0;
        let forward = motion.forward * dt;
        wheels[0].advance(forward - half_turn);
        wheels[1].advance(forward + half_turn);
        // the strafe wheel also picks up travel while turning
        wheels[2].advance(motion.strafe * dt + d_theta * motion.strafe_per_rotation);
        ticker.next().await;
    }
}

#[embassy_executor::task]
async fn odometry_task(mut ctrl: SimController, period: Duration) -> ! {
    ctrl.run(period).await
}

#[embassy_executor::task]
async fn telemetry_task() -> ! {
    loop {
        let report = POSE_CHANNEL.receiver().receive().await;
        match serde_json::to_string(&report) {
            Ok(json) => info!(
                heading_deg = report.pose.wrapped_heading().to_degrees(),
                "{}",
                json
            ),
            Err(e) => error!("failed to encode pose report: {:?}", e),
        }
    }
}

/// Forward JSON commands typed on stdin, e.g. `{"oc":"pause"}`.
fn spawn_stdin_reader() {
    std::thread::spawn(|| {
        for line in std::io::stdin().lock().lines() {
            let Ok(line) = line else { break };
            if line.trim().is_empty() {
                continue;
            }
            match OdometryCommand::from_json(line.as_bytes()) {
                Ok(cmd) => {
                    if ODOMETRY_CHANNEL.try_send(cmd).is_err() {
                        warn!("odometry command queue full, dropping {:?}", cmd);
                    }
                }
                Err(e) => error!("invalid command {:?}: {}", line, e),
            }
        }
    });
}

#[embassy_executor::task]
async fn main_task(spawner: Spawner) {
    let opts: Opts = Opts::parse();
    let period = Duration::from_millis(opts.period_ms.max(1));

    let wheels: &'static [SimWheel; 3] =
        mk_static!([SimWheel; 3], [SimWheel::new(), SimWheel::new(), SimWheel::new()]);

    let ctrl = match OdometryController::new(
        &wheels[0],
        &wheels[1],
        &wheels[2],
        Pose::default(),
        Some(opts.track_width),
        Some(opts.strafe_per_rotation),
    ) {
        Ok(ctrl) => ctrl,
        Err(e) => {
            error!("invalid calibration: {:?}", e);
            std::process::exit(2);
        }
    };

    let motion = Motion {
        forward: opts.forward,
        turn: opts.turn,
        strafe: opts.strafe,
        track_width: ctrl.config().track_width(),
        strafe_per_rotation: ctrl.config().strafe_per_rotation(),
    };

    spawner.spawn(telemetry_task()).unwrap();
    spawner.spawn(odometry_task(ctrl, period)).unwrap();
    spawner.spawn(plant_task(wheels, motion, period)).unwrap();
    spawn_stdin_reader();

    info!(
        "Simulating forward={} turn={} strafe={} every {}ms",
        opts.forward, opts.turn, opts.strafe, opts.period_ms
    );

    if opts.steps > 0 {
        Timer::after(period * opts.steps).await;
        info!("Finished {} control cycles", opts.steps);
        std::process::exit(0);
    }
}

static EXECUTOR: StaticCell<Executor> = StaticCell::new();

fn main() {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .init();
    let executor = EXECUTOR.init(Executor::new());
    executor.run(|spawner| {
        spawner.spawn(main_task(spawner)).unwrap();
    });
}
