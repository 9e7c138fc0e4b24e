pub mod constants;
pub mod detection;
pub mod emotion;
pub mod frame;
pub mod region;
pub mod startup_error;
