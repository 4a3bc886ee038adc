use common::{
    grid::Grid,
    interfaces::{Observable, SimulatorInterface},
    Float,
};

use crate::solution::ModeSolution;

/// The number of recent frames returned by [`FieldSimulator::get_observations`].
pub const HISTORY_DEPTH: usize = 3;

/// The observables of a [`ModeSolution`] sampled over a grid at one time.
#[derive(Debug, Clone, PartialEq)]
pub struct Frame<T> {
    /// The time of the frame.
    pub time: T,
    /// The field `y`.
    pub field: Box<[T]>,
    /// The velocity `ẏ`.
    pub velocity: Box<[T]>,
    /// The gradient `y'`.
    pub gradient: Box<[T]>,
    /// The energy density.
    pub energy_density: Box<[T]>,
    /// The energy density integrated over the grid.
    pub total_energy: T,
}

impl<T: Float> Frame<T> {
    /// Samples every observable of `solution` over `grid` at time `time`.
    pub fn capture(solution: &ModeSolution<T>, grid: &Grid<T>, time: T) -> Self {
        let points = grid.points();
        let energy_density: Box<[T]> = solution
            .par_sample(Observable::EnergyDensity, points, time)
            .into();

        Self {
            time,
            field: solution.par_sample(Observable::Field, points, time).into(),
            velocity: solution.par_sample(Observable::Velocity, points, time).into(),
            gradient: solution.par_sample(Observable::Gradient, points, time).into(),
            total_energy: grid.integrate(energy_density.iter().copied()),
            energy_density,
        }
    }
}

/// Steps a clock over a [`ModeSolution`] and keeps the last `[HISTORY_DEPTH] + 1` frames.
///
/// Every frame is evaluated from the closed-form solution, so there is no integration error to
/// accumulate between steps.
#[derive(Debug, Clone)]
pub struct FieldSimulator<T: Float> {
    /// The solution being sampled.
    solution: ModeSolution<T>,
    /// The sample positions.
    grid: Grid<T>,
    /// The last `[HISTORY_DEPTH] + 1` frames.
    frames: [Frame<T>; HISTORY_DEPTH + 1],
    /// The index of the current frame.
    offset: usize,
    /// The number of frames recorded so far, including the initial frame.
    recorded: usize,
}

impl<T: Float> FieldSimulator<T> {
    /// Creates a new [`FieldSimulator`] and records the frame at `t = 0`.
    pub fn new(solution: ModeSolution<T>, grid: Grid<T>) -> Self {
        let initial = Frame::capture(&solution, &grid, T::zero());
        let frames = std::array::from_fn(|_| initial.clone());

        Self {
            solution,
            grid,
            frames,
            offset: 0,
            recorded: 1,
        }
    }

    /// The solution being sampled.
    pub fn solution(&self) -> &ModeSolution<T> {
        &self.solution
    }

    /// The sample positions.
    pub fn grid(&self) -> &Grid<T> {
        &self.grid
    }

    /// The current frame.
    pub fn current(&self) -> &Frame<T> {
        &self.frames[self.offset]
    }

    /// The largest relative deviation of a retained frame's total energy from the exact energy.
    pub fn energy_drift(&self) -> T {
        let exact = self.solution.energy();
        let retained = self.recorded.min(HISTORY_DEPTH + 1);

        (0..retained)
            .map(|i| (self.offset + HISTORY_DEPTH + 1 - i) % (HISTORY_DEPTH + 1))
            .map(|i| ((self.frames[i].total_energy - exact) / exact).abs())
            .fold(T::zero(), T::max)
    }
}

impl<T: Float> SimulatorInterface<T> for FieldSimulator<T> {
    type Observation = Frame<T>;

    fn get_observations(&self) -> Vec<Frame<T>> {
        let available = self.recorded.min(HISTORY_DEPTH);

        (0..available)
            .rev()
            .map(|age| (self.offset + HISTORY_DEPTH + 1 - age) % (HISTORY_DEPTH + 1))
            .map(|i| self.frames[i].clone())
            .collect()
    }

    fn update(&mut self, dt: T) {
        let time = self.get_time() + dt;
        let next_offset = (self.offset + 1) % (HISTORY_DEPTH + 1);

        self.frames[next_offset] = Frame::capture(&self.solution, &self.grid, time);
        self.offset = next_offset;
        self.recorded += 1;

        log::trace!(
            "frame {} at t = {:?}, total energy {:?}",
            self.recorded,
            time,
            self.frames[self.offset].total_energy
        );
    }

    fn get_time(&self) -> T {
        self.frames[self.offset].time
    }
}
