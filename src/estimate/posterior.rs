//! Gamma–Poisson conjugate update over a trailing window.
//!
//! With prior `R ~ Gamma(a, scale b)` and `I(s) ~ Poisson(R · Λ(s))` for the
//! days `s` of the window:
//!
//! ```text
//! shape = a + Σ I(s)
//! rate  = 1/b + Σ Λ(s)
//! ```

use serde::{Deserialize, Serialize};

use crate::math::inverse_regularized_gamma_p;

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GammaPrior {
    pub shape: f64,
    pub scale: f64,
}

impl GammaPrior {
    pub fn rate(&self) -> f64 {
        1.0 / self.scale
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GammaPosterior {
    pub shape: f64,
    pub rate: f64,
}

impl GammaPosterior {
    pub fn mean(&self) -> f64 {
        self.shape / self.rate
    }

    pub fn quantile(&self, p: f64) -> f64 {
        inverse_regularized_gamma_p(self.shape, p) / self.rate
    }
}

/// Why a window has no defined reproduction number.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UndefinedWindow {
    /// No cases in the window.
    NoIncidence,
    /// No earlier cases that could have caused the window's cases.
    NoInfectiousPressure,
    /// At least one bootstrap resample left the window undefined.
    UndefinedResample,
}

impl UndefinedWindow {
    pub fn describe(self) -> &'static str {
        match self {
            UndefinedWindow::NoIncidence => "trailing window has zero incidence",
            UndefinedWindow::NoInfectiousPressure => "trailing window has zero infectious pressure",
            UndefinedWindow::UndefinedResample => "a bootstrap resample has an undefined trailing window",
        }
    }
}

/// Posterior for one window, or why it is undefined.
pub fn window_posterior(
    prior: &GammaPrior,
    incidence_sum: f64,
    pressure_sum: f64,
) -> Result<GammaPosterior, UndefinedWindow> {
    if incidence_sum <= 0.0 {
        return Err(UndefinedWindow::NoIncidence);
    }
    if pressure_sum <= 0.0 {
        return Err(UndefinedWindow::NoInfectiousPressure);
    }
    Ok(GammaPosterior {
        shape: prior.shape + incidence_sum,
        rate: prior.rate() + pressure_sum,
    })
}
