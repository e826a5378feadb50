//! Stateless kinematic solvers. They work on plain positions and transforms and never touch a
//! [`crate::Rig`]; the limb and spine controls read the rig, call these and write the results
//! back.

mod aim;
mod spline_ik;
mod two_bone;

pub use aim::*;
pub use spline_ik::*;
pub use two_bone::*;
