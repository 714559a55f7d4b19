pub mod csv;
pub mod export;
