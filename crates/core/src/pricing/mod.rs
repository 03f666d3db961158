pub mod extract;
pub mod fx;
