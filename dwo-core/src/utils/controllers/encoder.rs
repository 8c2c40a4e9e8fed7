//! Dead-wheel encoder drivers.
//!
//! A `TickSource` counts encoder edges; `Encoder` scales the count into the
//! cumulative distance the odometry consumes. `QuadratureDecoder` is a polled
//! 4x decoder over two `embedded_hal` input pins.

use core::sync::atomic::{AtomicI32, Ordering};

use embedded_hal::digital::InputPin;

use crate::utils::math::odometry::DistanceSource;

/// Errors reported while decoding a quadrature signal.
#[derive(Debug)]
pub enum QuadratureError<E: core::fmt::Debug> {
    Pin(E),
    /// Both channels changed between two polls; at least one edge was missed.
    InvalidTransition,
}

/// A cumulative, signed encoder count.
pub trait TickSource {
    fn ticks(&self) -> i32;
}

impl<T: TickSource + ?Sized> TickSource for &T {
    fn ticks(&self) -> i32 {
        (**self).ticks()
    }
}

/// Counter fed from an interrupt handler.
impl TickSource for AtomicI32 {
    fn ticks(&self) -> i32 {
        self.load(Ordering::Relaxed)
    }
}

/// Scales a tick count into distance.
///
/// Increments are taken on the raw counts with wrapping arithmetic, so a
/// counter rolling over `i32` yields the true step and precision does not
/// degrade as the cumulative count grows.
#[derive(Debug)]
pub struct Encoder<T> {
    source: T,
    distance_per_tick: f32,
}

impl<T: TickSource> Encoder<T> {
    pub fn new(
        source: T,
        distance_per_tick: f32,
    ) -> Self {
        Self {
            source,
            distance_per_tick,
        }
    }

    /// Flip the counting direction for a wheel mounted mirrored.
    pub fn reversed(mut self) -> Self {
        self.distance_per_tick = -self.distance_per_tick;
        self
    }

    /// Cumulative distance, for display.
    pub fn distance(&self) -> f32 {
        self.source.ticks() as f32 * self.distance_per_tick
    }

    pub fn source(&self) -> &T {
        &self.source
    }
}

impl<T: TickSource> DistanceSource for Encoder<T> {
    type Reading = i32;

    fn reading(&mut self) -> i32 {
        self.source.ticks()
    }

    fn travel(
        &self,
        from: i32,
        to: i32,
    ) -> f32 {
        to.wrapping_sub(from) as f32 * self.distance_per_tick
    }
}

// Indexed by (previous << 2) | current, state = (A << 1) | B.
const TRANSITIONS: [i8; 16] = [0, -1, 1, 0, 1, 0, 0, -1, -1, 0, 0, 1, 0, 1, -1, 0];

/// Polled quadrature decoder counting every edge of both channels into a
/// shared counter.
///
/// The counter is borrowed rather than owned so an `Encoder` can read it while
/// the decoder keeps polling. Channel A leading B counts up.
pub struct QuadratureDecoder<'a, A, B> {
    a: A,
    b: B,
    state: u8,
    counter: &'a AtomicI32,
}

impl<'a, A, B, E> QuadratureDecoder<'a, A, B>
where
    A: InputPin<Error = E>,
    B: InputPin<Error = E>,
    E: core::fmt::Debug,
{
    /// Take the pins and sample their initial level. Counting continues from
    /// the counter's current value.
    pub fn new(
        mut a: A,
        mut b: B,
        counter: &'a AtomicI32,
    ) -> Result<Self, QuadratureError<E>> {
        let state = Self::sample(&mut a, &mut b)?;
        Ok(Self {
            a,
            b,
            state,
            counter,
        })
    }

    fn sample(
        a: &mut A,
        b: &mut B,
    ) -> Result<u8, QuadratureError<E>> {
        let a = a.is_high().map_err(QuadratureError::Pin)?;
        let b = b.is_high().map_err(QuadratureError::Pin)?;
        Ok(((a as u8) << 1) | b as u8)
    }

    /// Sample both channels and apply the transition since the previous poll.
    ///
    /// Must run faster than the edge rate; a skipped state is reported and not counted.
    pub fn poll(&mut self) -> Result<(), QuadratureError<E>> {
        let current = Self::sample(&mut self.a, &mut self.b)?;
        let previous = core::mem::replace(&mut self.state, current);

        if previous ^ current == 0b11 {
            tracing::warn!(previous, current, "quadrature edge missed");
            return Err(QuadratureError::InvalidTransition);
        }

        let step = TRANSITIONS[((previous << 2) | current) as usize];
        if step != 0 {
            // fetch_add wraps on overflow
            self.counter.fetch_add(step as i32, Ordering::Relaxed);
        }
        Ok(())
    }

    pub fn count(&self) -> i32 {
        self.counter.load(Ordering::Relaxed)
    }

    /// Give the pins back.
    pub fn release(self) -> (A, B) {
        (self.a, self.b)
    }
}

impl<A, B> TickSource for QuadratureDecoder<'_, A, B> {
    fn ticks(&self) -> i32 {
        self.counter.load(Ordering::Relaxed)
    }
}
