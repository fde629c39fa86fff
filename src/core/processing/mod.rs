pub mod grid;
pub mod mosaic;
