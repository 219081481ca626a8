pub mod currency;
pub mod fs;
