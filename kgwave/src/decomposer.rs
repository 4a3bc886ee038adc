use common::{cast, grid::Grid, Float};
use itertools::izip;
use num::Complex;
use rayon::prelude::*;

use crate::{
    error::{check_lengths, KgError, Result},
    solution::{is_finite, ModeSolution},
    system::{KleinGordon, DEFAULT_NMAX},
};

/// The default mass parameter, `m = 2π`: one Compton wavelength per unit length.
pub const DEFAULT_MU: f64 = 2.0;

/// The environment variable overriding the mass parameter.
pub const MU_VAR: &str = "KGWAVE_MU";

/// The environment variable overriding the mode cutoff.
pub const NMAX_VAR: &str = "KGWAVE_NMAX";

/// Below this fraction of the input norm captured by the retained modes, a decomposition logs a
/// warning that the cutoff is too small.
const CAPTURE_WARNING_THRESHOLD: f64 = 0.99;

/// The configuration of a [`Decomposer`].
#[derive(Debug, Copy, Clone, PartialEq)]
pub struct DecompositionConfig<T: Float> {
    /// The mass parameter `mu`.
    mu: T,
    /// The mode cutoff. Modes `1..nmax` are retained.
    nmax: usize,
}

impl<T: Float> DecompositionConfig<T> {
    /// Starts building a [`DecompositionConfig`].
    pub fn build() -> DecompositionConfigBuilder<T> {
        DecompositionConfigBuilder {
            mu: None,
            nmax: None,
        }
    }

    /// Builds a [`DecompositionConfig`] from the defaults, overridden by the `KGWAVE_MU` and
    /// `KGWAVE_NMAX` environment variables when they are set.
    pub fn from_env() -> Result<Self> {
        Self::from_lookup(|name| std::env::var(name).ok())
    }

    /// Builds a [`DecompositionConfig`] from the defaults, overridden by whatever `lookup` returns
    /// for [`MU_VAR`] and [`NMAX_VAR`].
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self> {
        let mut builder = Self::build();

        if let Some(value) = lookup(MU_VAR) {
            let mu = value
                .trim()
                .parse::<f64>()
                .map_err(|_| KgError::InvalidEnvironment {
                    name: MU_VAR,
                    value: value.clone(),
                })?;
            builder = builder.mu(cast(mu));
        }
        if let Some(value) = lookup(NMAX_VAR) {
            let nmax = value
                .trim()
                .parse::<usize>()
                .map_err(|_| KgError::InvalidEnvironment {
                    name: NMAX_VAR,
                    value: value.clone(),
                })?;
            builder = builder.nmax(nmax);
        }

        builder.finalize()
    }

    /// The mass parameter `mu`.
    pub fn mu(&self) -> T {
        self.mu
    }

    /// The mode cutoff.
    pub fn nmax(&self) -> usize {
        self.nmax
    }
}

/// Builder for [`DecompositionConfig`].
#[derive(Debug, Copy, Clone)]
pub struct DecompositionConfigBuilder<T: Float> {
    /// The mass parameter, if set.
    mu: Option<T>,
    /// The mode cutoff, if set.
    nmax: Option<usize>,
}

impl<T: Float> DecompositionConfigBuilder<T> {
    /// Sets the mass parameter. Defaults to [`DEFAULT_MU`].
    pub fn mu(mut self, mu: T) -> Self {
        self.mu.replace(mu);

        self
    }

    /// Sets the mode cutoff. Defaults to [`DEFAULT_NMAX`].
    pub fn nmax(mut self, nmax: usize) -> Self {
        self.nmax.replace(nmax);

        self
    }

    /// Validates the settings and produces the [`DecompositionConfig`].
    pub fn finalize(self) -> Result<DecompositionConfig<T>> {
        let mu = self.mu.unwrap_or_else(|| cast(DEFAULT_MU));
        let nmax = self.nmax.unwrap_or(DEFAULT_NMAX);

        KleinGordon::new(mu)?;
        if nmax < 2 {
            return Err(KgError::InvalidModeCount(nmax));
        }

        Ok(DecompositionConfig { mu, nmax })
    }
}

/// Projects sampled data onto the eigenmodes of a [`KleinGordon`] system.
///
/// Every projection is the rectangle-rule quadrature `c_n = Σ_j ξ_n(x_j)·f_j·dx` with
/// `dx = 1 / len(x0)`, so the sample positions are assumed to cover `[0, 1)` uniformly.
#[derive(Debug, Clone)]
pub struct Decomposer<T: Float> {
    /// The system being decomposed into.
    system: KleinGordon<T>,
    /// The retained mode indices `1..nmax`.
    modes: Vec<T>,
    /// The frequencies of the retained modes.
    frequencies: Vec<T>,
}

impl<T: Float> Decomposer<T> {
    /// Creates an instance of [`Decomposer`] from a config: [`DecompositionConfig`].
    pub fn new(config: DecompositionConfig<T>) -> Result<Self> {
        let system = KleinGordon::new(config.mu)?;
        let modes = KleinGordon::<T>::mode_indices(config.nmax)?;
        let frequencies = modes.iter().map(|&n| system.frequency(n)).collect();

        Ok(Self {
            system,
            modes,
            frequencies,
        })
    }

    /// The system being decomposed into.
    pub fn system(&self) -> &KleinGordon<T> {
        &self.system
    }

    /// The retained mode indices.
    pub fn modes(&self) -> &[T] {
        &self.modes
    }

    /// Decomposes a field `y0` and its velocity `ydot0`, sampled at `x0`.
    ///
    /// Each mode projects `χ_n = y0 + i·ydot0/ω_n`, which is the positive-frequency data whose
    /// real part is `y0` and whose time derivative has real part `ydot0`.
    pub fn from_initial_data(&self, x0: &[T], y0: &[T], ydot0: &[T]) -> Result<ModeSolution<T>> {
        let grid = validate_initial_data(x0, y0, ydot0)?;
        let coefficients = izip!(self.modes.iter(), self.frequencies.iter())
            .map(|(&n, &w)| self.project_initial_data(&grid, y0, ydot0, n, w))
            .collect();

        self.finish_initial_data(&grid, y0, ydot0, coefficients)
    }

    /// Decomposes a field and its velocity in parallel across modes using [`rayon`]. Produces the
    /// same solution as [`Decomposer::from_initial_data`].
    pub fn par_from_initial_data(
        &self,
        x0: &[T],
        y0: &[T],
        ydot0: &[T],
    ) -> Result<ModeSolution<T>> {
        let grid = validate_initial_data(x0, y0, ydot0)?;
        let coefficients = self
            .modes
            .par_iter()
            .zip(self.frequencies.par_iter())
            .map(|(&n, &w)| self.project_initial_data(&grid, y0, ydot0, n, w))
            .collect();

        self.finish_initial_data(&grid, y0, ydot0, coefficients)
    }

    /// Decomposes a complex positive-frequency wavefunction `psi0`, sampled at `x0`.
    pub fn from_wavefunction(&self, x0: &[T], psi0: &[Complex<T>]) -> Result<ModeSolution<T>> {
        let grid = validate_wavefunction(x0, psi0)?;
        let coefficients = self
            .modes
            .iter()
            .map(|&n| self.project_wavefunction(&grid, psi0, n))
            .collect();

        self.finish_wavefunction(&grid, psi0, coefficients)
    }

    /// Decomposes a wavefunction in parallel across modes using [`rayon`]. Produces the same
    /// solution as [`Decomposer::from_wavefunction`].
    pub fn par_from_wavefunction(
        &self,
        x0: &[T],
        psi0: &[Complex<T>],
    ) -> Result<ModeSolution<T>> {
        let grid = validate_wavefunction(x0, psi0)?;
        let coefficients = self
            .modes
            .par_iter()
            .map(|&n| self.project_wavefunction(&grid, psi0, n))
            .collect();

        self.finish_wavefunction(&grid, psi0, coefficients)
    }

    /// The raw coefficient `Σ_j ξ_n(x_j)·(y0_j + i·ydot0_j/ω_n)·dx`.
    fn project_initial_data(
        &self,
        grid: &Grid<T>,
        y0: &[T],
        ydot0: &[T],
        n: T,
        w: T,
    ) -> Complex<T> {
        grid.integrate(
            izip!(grid.points(), y0, ydot0)
                .map(|(&x, &y, &v)| Complex::new(y, v / w) * self.system.eigenfunction(n, x)),
        )
    }

    /// The raw coefficient `Σ_j ξ_n(x_j)·psi0_j·dx`.
    fn project_wavefunction(&self, grid: &Grid<T>, psi0: &[Complex<T>], n: T) -> Complex<T> {
        grid.integrate(
            izip!(grid.points(), psi0).map(|(&x, &psi)| psi * self.system.eigenfunction(n, x)),
        )
    }

    /// Reports how much of the initial data the coefficients capture, then hands the coefficients
    /// over to a [`ModeSolution`].
    fn finish_initial_data(
        &self,
        grid: &Grid<T>,
        y0: &[T],
        ydot0: &[T],
        coefficients: Vec<Complex<T>>,
    ) -> Result<ModeSolution<T>> {
        let [field, velocity] = self.initial_data_capture(grid, y0, ydot0, &coefficients);
        self.report_capture("initial field", field);
        self.report_capture("initial velocity", velocity);

        ModeSolution::new(self.modes.clone(), coefficients, self.system.mu())
    }

    /// The fractions of `∫y0²` captured by `Σ Re(c_n)²` and of `∫ydot0²` captured by
    /// `Σ ω_n²·Im(c_n)²`. Either fraction is `None` when its input vanishes.
    fn initial_data_capture(
        &self,
        grid: &Grid<T>,
        y0: &[T],
        ydot0: &[T],
        coefficients: &[Complex<T>],
    ) -> [Option<T>; 2] {
        let field = grid.integrate(y0.iter().map(|&y| y * y));
        let velocity = grid.integrate(ydot0.iter().map(|&v| v * v));
        let (captured_field, captured_velocity) = izip!(coefficients, self.frequencies.iter())
            .fold((T::zero(), T::zero()), |(f, v), (c, &w)| {
                (f + c.re * c.re, v + w * w * c.im * c.im)
            });

        [
            capture_fraction(field, captured_field),
            capture_fraction(velocity, captured_velocity),
        ]
    }

    /// Reports how much of `∫|psi0|²` the coefficients capture, then hands the coefficients over
    /// to a [`ModeSolution`].
    fn finish_wavefunction(
        &self,
        grid: &Grid<T>,
        psi0: &[Complex<T>],
        coefficients: Vec<Complex<T>>,
    ) -> Result<ModeSolution<T>> {
        let input = grid.integrate(psi0.iter().map(|psi| psi.norm_sqr()));
        let captured = coefficients
            .iter()
            .fold(T::zero(), |acc, c| acc + c.norm_sqr());
        self.report_capture("wavefunction", capture_fraction(input, captured));

        ModeSolution::new(self.modes.clone(), coefficients, self.system.mu())
    }

    /// Logs the fraction of the input norm retained by the mode cutoff.
    fn report_capture(&self, source: &str, fraction: Option<T>) {
        let Some(fraction) = fraction else {
            return;
        };

        log::debug!(
            "decomposed {source} into {} modes, capturing {:?} of the input norm",
            self.modes.len(),
            fraction
        );
        if fraction < cast(CAPTURE_WARNING_THRESHOLD) {
            log::warn!(
                "{} modes capture only {:?} of the {source} norm; consider a larger cutoff",
                self.modes.len(),
                fraction
            );
        }
    }
}

/// The fraction of `input` that `captured` accounts for, or `None` if there is no input.
fn capture_fraction<T: Float>(input: T, captured: T) -> Option<T> {
    (input > T::zero()).then(|| captured / input)
}

/// Checks that the initial data share one non-empty, finite grid.
fn validate_initial_data<T: Float>(x0: &[T], y0: &[T], ydot0: &[T]) -> Result<Grid<T>> {
    check_lengths("x0", x0.len(), "y0", y0.len())?;
    check_lengths("x0", x0.len(), "ydot0", ydot0.len())?;
    if x0.is_empty() {
        return Err(KgError::EmptyGrid);
    }
    check_finite("x0", x0)?;
    check_finite("y0", y0)?;
    check_finite("ydot0", ydot0)?;

    Ok(Grid::from_samples(x0))
}

/// Checks that the wavefunction shares one non-empty, finite grid.
fn validate_wavefunction<T: Float>(x0: &[T], psi0: &[Complex<T>]) -> Result<Grid<T>> {
    check_lengths("x0", x0.len(), "psi0", psi0.len())?;
    if x0.is_empty() {
        return Err(KgError::EmptyGrid);
    }
    check_finite("x0", x0)?;
    if !psi0.iter().all(is_finite) {
        return Err(KgError::NonFinite("psi0"));
    }

    Ok(Grid::from_samples(x0))
}

/// Fails with [`KgError::NonFinite`] if any value is NaN or infinite.
fn check_finite<T: Float>(name: &'static str, values: &[T]) -> Result<()> {
    if values.iter().all(|v| v.is_finite()) {
        Ok(())
    } else {
        Err(KgError::NonFinite(name))
    }
}

/// Determines the mode amplitudes of initial data `(x0, y0, ydot0)` for modes `1..nmax` and builds
/// the resulting [`ModeSolution`].
pub fn from_initial_data<T: Float>(
    x0: &[T],
    y0: &[T],
    ydot0: &[T],
    mu: T,
    nmax: usize,
) -> Result<ModeSolution<T>> {
    let config = DecompositionConfig::build().mu(mu).nmax(nmax).finalize()?;
    Decomposer::new(config)?.from_initial_data(x0, y0, ydot0)
}

/// Determines the mode amplitudes of a wavefunction `(x0, psi0)` for modes `1..nmax` and builds
/// the resulting [`ModeSolution`].
pub fn from_wavefunction<T: Float>(
    x0: &[T],
    psi0: &[Complex<T>],
    mu: T,
    nmax: usize,
) -> Result<ModeSolution<T>> {
    let config = DecompositionConfig::build().mu(mu).nmax(nmax).finalize()?;
    Decomposer::new(config)?.from_wavefunction(x0, psi0)
}

#[cfg(test)]
mod tests {
    use std::f64::consts::{PI, SQRT_2};

    use common::{
        grid::Grid,
        interfaces::{FieldInterface, Observable},
    };
    use num::Complex;

    use super::{
        from_initial_data, from_wavefunction, Decomposer, DecompositionConfig, MU_VAR, NMAX_VAR,
    };
    use crate::error::KgError;

    /// The fundamental mode `sqrt(2)·sin(πx)` on a grid.
    fn fundamental(grid: &Grid<f64>) -> Vec<f64> {
        grid.points()
            .iter()
            .map(|x| SQRT_2 * (PI * x).sin())
            .collect()
    }

    #[test]
    fn test_builder_defaults() {
        let config = DecompositionConfig::<f64>::build().finalize().unwrap();

        assert_eq!(config.mu(), 2.0);
        assert_eq!(config.nmax(), 10);
    }

    #[test]
    fn test_builder_validation() {
        assert_eq!(
            DecompositionConfig::<f64>::build().mu(0.0).finalize(),
            Err(KgError::InvalidMass(0.0))
        );
        assert_eq!(
            DecompositionConfig::<f64>::build().nmax(1).finalize(),
            Err(KgError::InvalidModeCount(1))
        );
    }

    #[test]
    fn test_from_lookup() {
        let config = DecompositionConfig::<f64>::from_lookup(|name| match name {
            MU_VAR => Some("0.5".to_string()),
            NMAX_VAR => Some(" 4 ".to_string()),
            _ => None,
        })
        .unwrap();

        assert_eq!(config.mu(), 0.5);
        assert_eq!(config.nmax(), 4);

        let config = DecompositionConfig::<f64>::from_lookup(|_| None).unwrap();
        assert_eq!(config.nmax(), 10);
    }

    #[test]
    fn test_from_lookup_invalid() {
        let result = DecompositionConfig::<f64>::from_lookup(|name| {
            (name == NMAX_VAR).then(|| "lots".to_string())
        });

        assert_eq!(
            result,
            Err(KgError::InvalidEnvironment {
                name: NMAX_VAR,
                value: "lots".to_string()
            })
        );
    }

    #[test]
    fn test_round_trip_fundamental() {
        let grid = Grid::<f64>::uniform(200);
        let y0 = fundamental(&grid);
        let ydot0 = vec![0.0; grid.len()];
        let solution = from_initial_data(grid.points(), &y0, &ydot0, 1.0, 6).unwrap();

        assert_eq!(solution.len(), 5);
        assert!((solution.amplitudes()[0] - Complex::new(1.0, 0.0)).norm() < 1e-12);
        for c in &solution.amplitudes()[1..] {
            assert!(c.norm() < 1e-12, "spurious amplitude {c}");
        }

        let field = solution.sample(Observable::Field, grid.points(), 0.0);
        let velocity = solution.sample(Observable::Velocity, grid.points(), 0.0);
        for j in 0..grid.len() {
            assert!((field[j] - y0[j]).abs() < 1e-12);
            assert!(velocity[j].abs() < 1e-12);
        }
    }

    #[test]
    fn test_round_trip_velocity() {
        let grid = Grid::<f64>::uniform(128);
        let profile = fundamental(&grid);
        let zeros = vec![0.0; grid.len()];
        let solution = from_initial_data(grid.points(), &zeros, &profile, 1.5, 4).unwrap();
        let w = solution.frequencies()[0];

        // Unit normalization rescales the velocity by ω.
        assert!((solution.amplitudes()[0] - Complex::new(0.0, 1.0)).norm() < 1e-12);
        for (j, &x) in grid.points().iter().enumerate() {
            assert!(solution.real_field(x, 0.0).abs() < 1e-12);
            assert!((solution.real_velocity(x, 0.0) - w * profile[j]).abs() < 1e-9);
        }
    }

    #[test]
    fn test_paths_agree() {
        let grid = Grid::<f64>::uniform(150);
        let profile = fundamental(&grid);
        let (a, b) = (0.8, -2.5);
        let y0: Vec<f64> = profile.iter().map(|p| a * p).collect();
        let ydot0: Vec<f64> = profile.iter().map(|p| b * p).collect();

        let decomposer =
            Decomposer::new(DecompositionConfig::build().mu(2.0).nmax(5).finalize().unwrap())
                .unwrap();
        let w1 = decomposer.system().frequency(1.0);
        let psi0: Vec<Complex<f64>> = izip_psi(&y0, &ydot0, w1);

        let from_data = decomposer.from_initial_data(grid.points(), &y0, &ydot0).unwrap();
        let from_psi = decomposer.from_wavefunction(grid.points(), &psi0).unwrap();

        for (c1, c2) in from_data.amplitudes().iter().zip(from_psi.amplitudes()) {
            assert!((c1 - c2).norm() < 1e-12, "{c1} != {c2}");
        }
    }

    /// Packs `(y0, ydot0)` into `y0 + i·ydot0/ω`.
    fn izip_psi(y0: &[f64], ydot0: &[f64], w: f64) -> Vec<Complex<f64>> {
        y0.iter()
            .zip(ydot0)
            .map(|(&y, &v)| Complex::new(y, v / w))
            .collect()
    }

    #[test]
    fn test_wavefunction_superposition() {
        let grid = Grid::<f64>::uniform(64);
        let psi0: Vec<Complex<f64>> = grid
            .points()
            .iter()
            .map(|x| {
                Complex::new(SQRT_2 * (PI * x).sin(), 0.0)
                    + Complex::new(0.0, SQRT_2 * (3.0 * PI * x).sin())
            })
            .collect();
        let solution = from_wavefunction(grid.points(), &psi0, 2.0, 4).unwrap();
        let amplitude = std::f64::consts::FRAC_1_SQRT_2;

        assert!((solution.amplitudes()[0] - Complex::new(amplitude, 0.0)).norm() < 1e-12);
        assert!(solution.amplitudes()[1].norm() < 1e-12);
        assert!((solution.amplitudes()[2] - Complex::new(0.0, amplitude)).norm() < 1e-12);
    }

    #[test]
    fn test_parallel_is_identical() {
        let grid = Grid::<f64>::uniform(333);
        let y0: Vec<f64> = grid.points().iter().map(|x| x * (1.0 - x)).collect();
        let ydot0: Vec<f64> = grid.points().iter().map(|x| (7.0 * x).sin()).collect();
        let psi0: Vec<Complex<f64>> = izip_psi(&y0, &ydot0, 3.0);
        let decomposer = Decomposer::new(DecompositionConfig::build().nmax(12).finalize().unwrap())
            .unwrap();

        assert_eq!(
            decomposer.from_initial_data(grid.points(), &y0, &ydot0),
            decomposer.par_from_initial_data(grid.points(), &y0, &ydot0)
        );
        assert_eq!(
            decomposer.from_wavefunction(grid.points(), &psi0),
            decomposer.par_from_wavefunction(grid.points(), &psi0)
        );
    }

    #[test]
    fn test_deterministic() {
        let grid = Grid::<f64>::uniform(90);
        let y0: Vec<f64> = grid.points().iter().map(|x| x * x * (1.0 - x)).collect();
        let ydot0 = vec![0.0; grid.len()];

        assert_eq!(
            from_initial_data(grid.points(), &y0, &ydot0, 1.0, 8),
            from_initial_data(grid.points(), &y0, &ydot0, 1.0, 8)
        );
    }

    #[test]
    fn test_shape_mismatch() {
        let x0 = [0.0, 0.5];

        assert!(matches!(
            from_initial_data(&x0, &[1.0, 2.0], &[1.0], 1.0, 3),
            Err(KgError::DimensionMismatch {
                right: "ydot0",
                ..
            })
        ));
        assert!(matches!(
            from_initial_data(&x0, &[1.0], &[1.0, 2.0], 1.0, 3),
            Err(KgError::DimensionMismatch { right: "y0", .. })
        ));
        assert!(matches!(
            from_wavefunction(&x0, &[Complex::new(1.0, 0.0)], 1.0, 3),
            Err(KgError::DimensionMismatch { right: "psi0", .. })
        ));
    }

    #[test]
    fn test_invalid_parameters() {
        let x0 = [0.25, 0.5];
        let y0 = [1.0, 1.0];

        assert_eq!(
            from_initial_data(&x0, &y0, &y0, -2.0, 3),
            Err(KgError::InvalidMass(-2.0))
        );
        assert_eq!(
            from_initial_data(&x0, &y0, &y0, 1.0, 1),
            Err(KgError::InvalidModeCount(1))
        );
        assert_eq!(
            from_initial_data::<f64>(&[], &[], &[], 1.0, 3),
            Err(KgError::EmptyGrid)
        );
        assert_eq!(
            from_initial_data(&x0, &[1.0, f64::NAN], &y0, 1.0, 3),
            Err(KgError::NonFinite("y0"))
        );
    }

    #[test]
    fn test_zero_data_is_degenerate() {
        let grid = Grid::<f64>::uniform(16);
        let zeros = vec![0.0; grid.len()];

        assert_eq!(
            from_initial_data(grid.points(), &zeros, &zeros, 1.0, 4),
            Err(KgError::DegenerateNormalization)
        );
    }

    #[test]
    fn test_non_finite_wavefunction() {
        let x0 = [0.0, 0.5];
        let psi0 = [Complex::new(f64::NAN, 0.0), Complex::new(1.0, 0.0)];

        assert_eq!(
            from_wavefunction(&x0, &psi0, 1.0, 3),
            Err(KgError::NonFinite("psi0"))
        );
        assert_eq!(
            from_wavefunction(&x0, &[Complex::new(1.0, f64::INFINITY); 2], 1.0, 3),
            Err(KgError::NonFinite("psi0"))
        );
    }

    #[test]
    fn test_capture_of_pure_velocity() {
        let grid = Grid::<f64>::uniform(256);
        let zeros = vec![0.0; grid.len()];
        // A triangle has a slowly decaying sine series, so two modes miss a visible share of it.
        let ydot0: Vec<f64> = grid.points().iter().map(|x| 0.5 - (x - 0.5).abs()).collect();
        let decomposer = Decomposer::new(DecompositionConfig::build().nmax(3).finalize().unwrap())
            .unwrap();

        let coefficients: Vec<Complex<f64>> = decomposer
            .modes()
            .iter()
            .map(|&n| {
                let w = decomposer.system().frequency(n);
                decomposer.project_initial_data(&grid, &zeros, &ydot0, n, w)
            })
            .collect();
        let [field, velocity] =
            decomposer.initial_data_capture(&grid, &zeros, &ydot0, &coefficients);

        assert_eq!(field, None);
        let velocity = velocity.unwrap();
        assert!(velocity > 0.9 && velocity < 0.99, "captured {velocity}");
    }
}
