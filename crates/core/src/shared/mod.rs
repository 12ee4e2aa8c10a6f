pub mod booth_error;
pub mod constants;
pub mod frame;
pub mod region;
