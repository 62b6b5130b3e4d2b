pub mod address;
pub mod csv;
