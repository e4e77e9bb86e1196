pub mod geometry;
pub mod landmark;
pub mod sequence;

pub use geometry::{distance, joint_angle};
pub use landmark::{Frame, Landmark, LandmarkIndex};
pub use sequence::Sequence;
