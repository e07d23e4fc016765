pub mod background_model;
pub mod ball;
pub mod contour;
pub mod mask;
pub mod particle;
pub mod particle_filter;
pub mod pixel;
pub mod point;
pub mod red_detector;
pub mod shape;
