pub mod point;
pub mod rect;

pub use point::{blend_direction, random_point_in, random_unit_vector, random_unit_vector_away};
pub use rect::Rect;
