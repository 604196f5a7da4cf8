pub mod constants;
pub mod elements;
