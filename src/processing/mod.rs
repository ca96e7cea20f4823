pub mod binning;
pub mod evaluator;
pub mod kd_tree;
pub mod projection;
pub mod scales;
pub mod statistics;
