//! Power quantities and the per-unit system.
//!
//! Input data arrives in MW; everything inside the model is per-unit on a
//! system power base. [`PowerBase`] is the single place where the two meet.
//!
//! ```
//! use netprep_core::units::{Megawatts, PowerBase};
//!
//! let base = PowerBase::default();
//! let rating = base.to_pu(Megawatts(250.0));
//! assert!((rating.value() - 2.5).abs() < 1e-12);
//! assert!(base.is_unlimited(Megawatts(99_999.0)));
//! ```

use serde::{Deserialize, Serialize};
use std::ops::{Add, Div, Mul, Neg, Sub};

/// Ratings at or above this value mean "the line has no thermal limit".
pub const MAX_FLOW_MW: f64 = 99_999.0;

/// Default system power base.
pub const DEFAULT_POWER_BASE_MVA: f64 = 100.0;

macro_rules! impl_unit_ops {
    ($type:ty, $unit_name:literal) => {
        impl Add for $type {
            type Output = Self;
            fn add(self, rhs: Self) -> Self::Output {
                Self(self.0 + rhs.0)
            }
        }

        impl Sub for $type {
            type Output = Self;
            fn sub(self, rhs: Self) -> Self::Output {
                Self(self.0 - rhs.0)
            }
        }

        impl Neg for $type {
            type Output = Self;
            fn neg(self) -> Self::Output {
                Self(-self.0)
            }
        }

        impl Mul<f64> for $type {
            type Output = Self;
            fn mul(self, rhs: f64) -> Self::Output {
                Self(self.0 * rhs)
            }
        }

        impl Div<f64> for $type {
            type Output = Self;
            fn div(self, rhs: f64) -> Self::Output {
                Self(self.0 / rhs)
            }
        }

        impl std::fmt::Display for $type {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                write!(f, "{:.4} {}", self.0, $unit_name)
            }
        }

        impl $type {
            #[inline]
            pub const fn new(value: f64) -> Self {
                Self(value)
            }

            #[inline]
            pub const fn value(self) -> f64 {
                self.0
            }

            #[inline]
            pub fn abs(self) -> Self {
                Self(self.0.abs())
            }
        }
    };
}

/// Active power in megawatts (MW)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct Megawatts(pub f64);

impl_unit_ops!(Megawatts, "MW");

/// Dimensionless per-unit value on the system power base
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Default, Serialize, Deserialize)]
#[repr(transparent)]
pub struct PerUnit(pub f64);

impl_unit_ops!(PerUnit, "p.u.");

/// System power base in MVA.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PowerBase(f64);

impl Default for PowerBase {
    fn default() -> Self {
        PowerBase(DEFAULT_POWER_BASE_MVA)
    }
}

impl PowerBase {
    /// Returns `None` for a non-positive or non-finite base.
    pub fn new(mva: f64) -> Option<Self> {
        (mva.is_finite() && mva > 0.0).then_some(PowerBase(mva))
    }

    #[inline]
    pub fn mva(self) -> f64 {
        self.0
    }

    #[inline]
    pub fn to_pu(self, mw: Megawatts) -> PerUnit {
        PerUnit(mw.0 / self.0)
    }

    #[inline]
    pub fn to_mw(self, pu: PerUnit) -> Megawatts {
        Megawatts(pu.0 * self.0)
    }

    /// True when a rating is the "no limit" sentinel.
    #[inline]
    pub fn is_unlimited(self, rating: Megawatts) -> bool {
        rating.0 >= MAX_FLOW_MW
    }
}
