use num::Complex;

use crate::{cast, Float};

/// A real, physically observable quantity of a field.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Observable {
    /// The field value `y(x, t)`.
    Field,
    /// The time derivative `∂y/∂t`.
    Velocity,
    /// The spatial derivative `∂y/∂x`.
    Gradient,
    /// The classical Hamiltonian density `½(ẏ² + y'² + m²y²)`.
    EnergyDensity,
}

/// The interface for evaluating a positive-frequency field solution at a single `(x, t)` point.
// ANCHOR: FieldInterface
pub trait FieldInterface<T: Float> {
    /// The mass `m` entering the dispersion relation `ω² = k² + m²`.
    fn mass(&self) -> T;

    /// The complex positive-frequency field `ψ(x, t)`.
    fn complex_field(&self, x: T, t: T) -> Complex<T>;

    /// The time derivative `∂ψ/∂t`.
    fn complex_velocity(&self, x: T, t: T) -> Complex<T>;

    /// The spatial derivative `∂ψ/∂x`.
    fn complex_gradient(&self, x: T, t: T) -> Complex<T>;

    /// The real field `y = Re ψ`.
    fn real_field(&self, x: T, t: T) -> T {
        self.complex_field(x, t).re
    }

    /// The real velocity `ẏ = Re ∂ψ/∂t`.
    fn real_velocity(&self, x: T, t: T) -> T {
        self.complex_velocity(x, t).re
    }

    /// The real gradient `y' = Re ∂ψ/∂x`.
    fn real_gradient(&self, x: T, t: T) -> T {
        self.complex_gradient(x, t).re
    }

    /// The energy density `½(ẏ² + y'² + m²y²)`. Never negative.
    fn energy_density(&self, x: T, t: T) -> T {
        energy_density(
            self.mass(),
            self.real_field(x, t),
            self.real_velocity(x, t),
            self.real_gradient(x, t),
        )
    }

    /// Evaluates the selected [`Observable`] at a point.
    fn observe(&self, observable: Observable, x: T, t: T) -> T {
        match observable {
            Observable::Field => self.real_field(x, t),
            Observable::Velocity => self.real_velocity(x, t),
            Observable::Gradient => self.real_gradient(x, t),
            Observable::EnergyDensity => self.energy_density(x, t),
        }
    }

    /// Evaluates the complex counterpart of the selected [`Observable`] at a point. The energy
    /// density is real and is returned on the real axis.
    fn observe_complex(&self, observable: Observable, x: T, t: T) -> Complex<T> {
        match observable {
            Observable::Field => self.complex_field(x, t),
            Observable::Velocity => self.complex_velocity(x, t),
            Observable::Gradient => self.complex_gradient(x, t),
            Observable::EnergyDensity => Complex::from(self.energy_density(x, t)),
        }
    }
}
// ANCHOR_END: FieldInterface

/// The interface for a simulator that advances a clock over a field and records frames.
// ANCHOR: SimulatorInterface
pub trait SimulatorInterface<T: Float> {
    /// A recorded frame of observables.
    type Observation;

    /// Gets the most recent frames, oldest first.
    fn get_observations(&self) -> Vec<Self::Observation>;

    /// Advances the clock by the given timestep and records a frame.
    fn update(&mut self, dt: T);

    /// Gets the current time of the simulator.
    fn get_time(&self) -> T;
}
// ANCHOR_END: SimulatorInterface

/// Computes the Hamiltonian density `½(ẏ² + y'² + m²y²)` from the real field values.
#[inline]
pub fn energy_density<T: Float>(mass: T, field: T, velocity: T, gradient: T) -> T {
    cast::<T, _>(0.5)
        * (velocity * velocity + gradient * gradient + mass * mass * field * field)
}

#[cfg(test)]
mod tests {
    use num::Complex;

    use super::{FieldInterface, Observable};

    /// A single standing wave `e^{-iωt} sin(kx)` with `ω = k`.
    struct Standing {
        /// The wavenumber.
        k: f64,
    }

    impl FieldInterface<f64> for Standing {
        fn mass(&self) -> f64 {
            0.0
        }

        fn complex_field(&self, x: f64, t: f64) -> Complex<f64> {
            Complex::new(0.0, -self.k * t).exp() * (self.k * x).sin()
        }

        fn complex_velocity(&self, x: f64, t: f64) -> Complex<f64> {
            Complex::new(0.0, -self.k) * self.complex_field(x, t)
        }

        fn complex_gradient(&self, x: f64, t: f64) -> Complex<f64> {
            Complex::new(0.0, -self.k * t).exp() * self.k * (self.k * x).cos()
        }
    }

    #[test]
    fn test_real_parts() {
        let wave = Standing { k: 2.0 };

        assert_eq!(wave.real_field(0.3, 0.0), (0.6f64).sin());
        assert!(wave.real_velocity(0.3, 0.0).abs() < 1e-15);
        assert_eq!(wave.observe(Observable::Gradient, 0.3, 0.0), 2.0 * (0.6f64).cos());
    }

    #[test]
    fn test_massless_energy_density() {
        let wave = Standing { k: 1.0 };
        let (x, t) = (0.4, 0.25);
        let expected = 0.5
            * (wave.real_velocity(x, t).powi(2) + wave.real_gradient(x, t).powi(2));

        assert!((wave.energy_density(x, t) - expected).abs() < 1e-15);
        assert_eq!(
            wave.observe_complex(Observable::EnergyDensity, x, t),
            Complex::from(wave.energy_density(x, t))
        );
    }
}
