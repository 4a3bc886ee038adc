use common::{
    cast,
    grid::Grid,
    interfaces::{energy_density, FieldInterface, Observable},
    Float,
};
use itertools::izip;
use num::{Complex, Zero};
use rayon::prelude::*;

use crate::{
    error::{check_lengths, KgError, Result},
    system::KleinGordon,
};

/// A classical solution of the [`KleinGordon`] system, stored as a finite superposition of
/// eigenmodes.
///
/// The positive-frequency complex solution is
/// $$ \psi(x, t) = \sum_i c_i e^{-i\omega_i t} \sqrt{2}\sin(k_i x), $$
/// and the physical field is its real part. Once built, a [`ModeSolution`] never changes.
#[derive(Debug, Clone, PartialEq)]
pub struct ModeSolution<T: Float> {
    /// The system the modes belong to.
    system: KleinGordon<T>,
    /// The mode indices `n_i`, in the order they were supplied.
    modes: Box<[T]>,
    /// The amplitudes `c_i`, normalized so that `Σ|c_i|² = 1`.
    amplitudes: Box<[Complex<T>]>,
    /// The wavenumbers `k_i = π·n_i`.
    wavenumbers: Box<[T]>,
    /// The frequencies `ω_i = sqrt(m² + k_i²)`.
    frequencies: Box<[T]>,
}

impl<T: Float> ModeSolution<T> {
    /// Builds a [`ModeSolution`] from mode indices, raw amplitudes, and the mass parameter `mu`.
    ///
    /// The amplitudes are rescaled to unit total weight `Σ|c_i|² = 1`. All-zero amplitudes cannot
    /// be rescaled and fail with [`KgError::DegenerateNormalization`].
    pub fn new(modes: Vec<T>, amplitudes: Vec<Complex<T>>, mu: T) -> Result<Self> {
        check_lengths("modes", modes.len(), "amplitudes", amplitudes.len())?;
        let system = KleinGordon::new(mu)?;

        if modes.is_empty() {
            return Err(KgError::EmptyModeSet);
        }
        if !modes.iter().all(|n| n.is_finite()) {
            return Err(KgError::NonFinite("modes"));
        }
        if !amplitudes.iter().all(is_finite) {
            return Err(KgError::NonFinite("amplitudes"));
        }

        // Scale by the largest component first so that the sum of squares neither underflows nor
        // overflows for finite amplitudes.
        let scale = amplitudes
            .iter()
            .fold(T::zero(), |acc, c| acc.max(c.re.abs()).max(c.im.abs()));
        if scale.is_zero() {
            return Err(KgError::DegenerateNormalization);
        }
        let scaled_norm = amplitudes
            .iter()
            .fold(T::zero(), |acc, c| acc + (c / scale).norm_sqr())
            .sqrt();
        let norm = scale * scaled_norm;

        let mut amplitudes = amplitudes;
        amplitudes
            .iter_mut()
            .for_each(|c| *c = *c / scale / scaled_norm);

        let wavenumbers = modes.iter().map(|&n| system.wavenumber(n)).collect();
        let frequencies = modes.iter().map(|&n| system.frequency(n)).collect();

        log::debug!(
            "built mode solution: {} modes, mass {:?}, raw norm {:?}",
            modes.len(),
            system.mass(),
            norm
        );

        Ok(Self {
            system,
            modes: modes.into_boxed_slice(),
            amplitudes: amplitudes.into_boxed_slice(),
            wavenumbers,
            frequencies,
        })
    }

    /// The system the modes belong to.
    pub fn system(&self) -> &KleinGordon<T> {
        &self.system
    }

    /// The mode indices.
    pub fn modes(&self) -> &[T] {
        &self.modes
    }

    /// The normalized amplitudes.
    pub fn amplitudes(&self) -> &[Complex<T>] {
        &self.amplitudes
    }

    /// The wavenumbers `k_i`.
    pub fn wavenumbers(&self) -> &[T] {
        &self.wavenumbers
    }

    /// The frequencies `ω_i`.
    pub fn frequencies(&self) -> &[T] {
        &self.frequencies
    }

    /// The number of modes.
    pub fn len(&self) -> usize {
        self.modes.len()
    }

    /// Checks if the [`ModeSolution`] has no modes.
    pub fn is_empty(&self) -> bool {
        self.modes.is_empty()
    }

    /// The total energy `½·Σ ω_i²·|c_i|²`.
    ///
    /// The cross terms between distinct modes integrate to zero, so this is the exact integral
    /// of [`FieldInterface::energy_density`] over the interval, at any time.
    pub fn energy(&self) -> T {
        let half = cast::<T, _>(0.5);
        izip!(self.frequencies.iter(), self.amplitudes.iter())
            .fold(T::zero(), |acc, (&w, c)| acc + half * w * w * c.norm_sqr())
    }

    /// Integrates the energy density over the grid at time `t` with the rectangle rule.
    pub fn total_energy(&self, grid: &Grid<T>, t: T) -> T {
        grid.integrate(self.sample(Observable::EnergyDensity, grid.points(), t))
    }

    /// Evaluates an [`Observable`] at every position in `xs` at time `t`.
    pub fn sample(&self, observable: Observable, xs: &[T], t: T) -> Vec<T> {
        let snapshot = Snapshot::new(self, t);
        xs.iter()
            .map(|&x| snapshot.observe(observable, x))
            .collect()
    }

    /// Evaluates an [`Observable`] at every position in `xs` at time `t` in parallel using
    /// [`rayon`]. Produces the same values as [`ModeSolution::sample`].
    pub fn par_sample(&self, observable: Observable, xs: &[T], t: T) -> Vec<T> {
        let snapshot = Snapshot::new(self, t);
        xs.par_iter()
            .map(|&x| snapshot.observe(observable, x))
            .collect()
    }

    /// Evaluates the complex counterpart of an [`Observable`] at every position in `xs` at time
    /// `t`.
    pub fn sample_complex(&self, observable: Observable, xs: &[T], t: T) -> Vec<Complex<T>> {
        let snapshot = Snapshot::new(self, t);
        xs.iter()
            .map(|&x| snapshot.observe_complex(observable, x))
            .collect()
    }

    /// Evaluates an [`Observable`] at the paired coordinates `(xs[j], ts[j])`.
    pub fn sample_points(&self, observable: Observable, xs: &[T], ts: &[T]) -> Result<Vec<T>> {
        check_lengths("xs", xs.len(), "ts", ts.len())?;

        Ok(izip!(xs, ts)
            .map(|(&x, &t)| Snapshot::new(self, t).observe(observable, x))
            .collect())
    }

    /// Evaluates an [`Observable`] at the paired coordinates `(xs[j], ts[j])` in parallel using
    /// [`rayon`].
    pub fn par_sample_points(
        &self,
        observable: Observable,
        xs: &[T],
        ts: &[T],
    ) -> Result<Vec<T>> {
        check_lengths("xs", xs.len(), "ts", ts.len())?;

        Ok(xs
            .par_iter()
            .zip(ts.par_iter())
            .map(|(&x, &t)| Snapshot::new(self, t).observe(observable, x))
            .collect())
    }
}

impl<T: Float> FieldInterface<T> for ModeSolution<T> {
    fn mass(&self) -> T {
        self.system.mass()
    }

    fn complex_field(&self, x: T, t: T) -> Complex<T> {
        Snapshot::new(self, t).field(x)
    }

    fn complex_velocity(&self, x: T, t: T) -> Complex<T> {
        Snapshot::new(self, t).velocity(x)
    }

    fn complex_gradient(&self, x: T, t: T) -> Complex<T> {
        Snapshot::new(self, t).gradient(x)
    }

    fn energy_density(&self, x: T, t: T) -> T {
        Snapshot::new(self, t).energy_density(x)
    }
}

/// A [`ModeSolution`] frozen at one time, with the time dependence folded into per-mode weights.
///
/// Every sum runs over the modes in their stored order, so repeated evaluation is reproducible
/// bit for bit regardless of how the points are distributed.
struct Snapshot<'a, T: Float> {
    /// The solution being evaluated.
    solution: &'a ModeSolution<T>,
    /// The field weights `c_i·e^{-iω_i t}`.
    field: Box<[Complex<T>]>,
    /// The velocity weights `-iω_i·c_i·e^{-iω_i t}`.
    velocity: Box<[Complex<T>]>,
    /// The gradient weights `k_i·c_i·e^{-iω_i t}`.
    gradient: Box<[Complex<T>]>,
}

impl<'a, T: Float> Snapshot<'a, T> {
    /// Folds the phase `e^{-iω_i t}` into each amplitude.
    fn new(solution: &'a ModeSolution<T>, t: T) -> Self {
        let field: Box<[Complex<T>]> =
            izip!(solution.amplitudes.iter(), solution.frequencies.iter())
                .map(|(&c, &w)| c * Complex::from_polar(T::one(), -w * t))
                .collect();
        let velocity = izip!(field.iter(), solution.frequencies.iter())
            .map(|(&z, &w)| Complex::new(T::zero(), -w) * z)
            .collect();
        let gradient = izip!(field.iter(), solution.wavenumbers.iter())
            .map(|(&z, &k)| z * k)
            .collect();

        Self {
            solution,
            field,
            velocity,
            gradient,
        }
    }

    /// Sums `Σ_i weight_i·sqrt(2)·sin(k_i·x)`.
    fn superpose_sin(&self, weights: &[Complex<T>], x: T) -> Complex<T> {
        izip!(weights, self.solution.wavenumbers.iter()).fold(
            Complex::zero(),
            |acc, (&z, &k)| acc + z * (T::SQRT_2() * (k * x).sin()),
        )
    }

    /// The field `ψ(x, t)`.
    fn field(&self, x: T) -> Complex<T> {
        self.superpose_sin(&self.field, x)
    }

    /// The velocity `∂ψ/∂t`.
    fn velocity(&self, x: T) -> Complex<T> {
        self.superpose_sin(&self.velocity, x)
    }

    /// The gradient `∂ψ/∂x`.
    fn gradient(&self, x: T) -> Complex<T> {
        izip!(self.gradient.iter(), self.solution.wavenumbers.iter()).fold(
            Complex::zero(),
            |acc, (&z, &k)| acc + z * (T::SQRT_2() * (k * x).cos()),
        )
    }

    /// The energy density, computing each mode's sine and cosine once.
    fn energy_density(&self, x: T) -> T {
        let mut field = Complex::zero();
        let mut velocity = Complex::zero();
        let mut gradient = Complex::zero();

        for (f, v, g, &k) in izip!(
            self.field.iter(),
            self.velocity.iter(),
            self.gradient.iter(),
            self.solution.wavenumbers.iter()
        ) {
            let (sin, cos) = (k * x).sin_cos();
            let (sin, cos) = (T::SQRT_2() * sin, T::SQRT_2() * cos);
            field = field + *f * sin;
            velocity = velocity + *v * sin;
            gradient = gradient + *g * cos;
        }

        energy_density(self.solution.mass(), field.re, velocity.re, gradient.re)
    }

    /// Evaluates a real [`Observable`].
    fn observe(&self, observable: Observable, x: T) -> T {
        match observable {
            Observable::Field => self.field(x).re,
            Observable::Velocity => self.velocity(x).re,
            Observable::Gradient => self.gradient(x).re,
            Observable::EnergyDensity => self.energy_density(x),
        }
    }

    /// Evaluates the complex counterpart of an [`Observable`].
    fn observe_complex(&self, observable: Observable, x: T) -> Complex<T> {
        match observable {
            Observable::Field => self.field(x),
            Observable::Velocity => self.velocity(x),
            Observable::Gradient => self.gradient(x),
            Observable::EnergyDensity => Complex::from(self.energy_density(x)),
        }
    }
}

/// Checks that both parts of a complex value are finite.
pub(crate) fn is_finite<T: Float>(c: &Complex<T>) -> bool {
    c.re.is_finite() && c.im.is_finite()
}
