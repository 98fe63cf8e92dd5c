pub mod color_table_loader;
pub mod segment_evictor;
pub mod segment_loader;
