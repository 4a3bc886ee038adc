use common::{cast, Float};

use crate::error::{KgError, Result};

/// The default mode cutoff. Produces modes `1..=9`.
pub const DEFAULT_NMAX: usize = 10;

/// The definition of the (1+1)-dimensional massive Klein-Gordon system on a closed interval.
///
/// The real field obeys
/// $$ (\partial_t^2 - \partial_x^2 + m^2)\,\varphi = 0 $$
/// with $\varphi = 0$ at both ends. Space is rescaled so the interval is $[0, 1]$, and the mass is
/// $m = \pi\mu$. The eigenmodes are $\xi_n(x) = \sqrt{2}\sin(k_n x)$ with $k_n = \pi n$, which are
/// orthonormal under $\int_0^1 \mathrm{d}x$, and oscillate at $\omega_n = \sqrt{m^2 + k_n^2}$.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct KleinGordon<T: Float> {
    /// The dimensionless mass parameter.
    mu: T,
    /// The mass `π·mu`.
    mass: T,
}

impl<T: Float> KleinGordon<T> {
    /// Creates an instance of [`KleinGordon`] with mass `π·mu`.
    pub fn new(mu: T) -> Result<Self> {
        if !mu.is_finite() || mu <= T::zero() {
            return Err(KgError::InvalidMass(mu.to_f64().unwrap_or(f64::NAN)));
        }

        Ok(Self {
            mu,
            mass: T::PI() * mu,
        })
    }

    /// The dimensionless mass parameter.
    pub fn mu(&self) -> T {
        self.mu
    }

    /// The mass `m = π·mu`.
    pub fn mass(&self) -> T {
        self.mass
    }

    /// The wavenumber `k_n = π·n`.
    #[inline]
    pub fn wavenumber(&self, n: T) -> T {
        T::PI() * n
    }

    /// The frequency `ω_n = sqrt(m² + k_n²)`.
    #[inline]
    pub fn frequency(&self, n: T) -> T {
        let k = self.wavenumber(n);
        (self.mass * self.mass + k * k).sqrt()
    }

    /// The eigenfunction `ξ_n(x) = sqrt(2)·sin(k_n·x)`.
    #[inline]
    pub fn eigenfunction(&self, n: T, x: T) -> T {
        T::SQRT_2() * (self.wavenumber(n) * x).sin()
    }

    /// The derivative `ξ_n'(x) = k_n·sqrt(2)·cos(k_n·x)`.
    #[inline]
    pub fn eigenfunction_derivative(&self, n: T, x: T) -> T {
        let k = self.wavenumber(n);
        k * T::SQRT_2() * (k * x).cos()
    }

    /// The mode indices `1, 2, …, nmax - 1`.
    pub fn mode_indices(nmax: usize) -> Result<Vec<T>> {
        if nmax < 2 {
            return Err(KgError::InvalidModeCount(nmax));
        }

        Ok((1..nmax).map(cast::<T, usize>).collect())
    }
}
