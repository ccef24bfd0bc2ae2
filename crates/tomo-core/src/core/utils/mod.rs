pub mod geometry;
pub mod paths;
pub mod program;
