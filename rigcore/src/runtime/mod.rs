mod binding;
mod constraint;
mod control_rig;
mod evaluation;
mod graph;
mod hierarchy;
mod limb;
mod solver;
mod spine;

pub use binding::*;
pub use constraint::*;
pub use control_rig::*;
pub use graph::*;
pub use hierarchy::*;
pub use limb::LimbControl;
pub use solver::*;
pub use spine::SpineControl;

#[cfg(test)]
mod hierarchy_tests;

#[cfg(test)]
mod graph_tests;



#[cfg(test)]
mod limb_tests;
