pub mod minimap2;
