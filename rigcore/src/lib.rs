//! Transform-graph core for character rigs.
//!
//! A [`Rig`] is a flat, name-addressed node hierarchy whose nodes can be constrained toward other
//! nodes. Evaluation walks a dependency order built with Kahn's algorithm. The [`kinematics`]
//! solvers (two-bone IK, aim, spline IK) are pure functions; [`LimbControl`] and
//! [`SpineControl`] compose them with FK/IK chains, and [`ControlRig`] drives a whole frame.

#![forbid(unsafe_code)]

mod error;
pub mod kinematics;
mod model;
mod runtime;
mod spline;
mod transform;

#[cfg(feature = "json")]
pub mod json;

pub use error::*;
pub use kinematics::{SplineIkSettings, TwoBoneIkSettings};
pub use model::*;
pub use runtime::*;
pub use spline::*;
pub use transform::*;

#[cfg(test)]
mod spline_tests;
