pub mod deadlines;
pub mod portal;
