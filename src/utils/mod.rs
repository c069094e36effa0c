#[allow(dead_code)]
pub mod async_task;

#[allow(dead_code)]
pub mod convert;

#[allow(dead_code)]
pub mod file_io;

#[allow(dead_code)]
pub mod masking;

#[allow(dead_code)]
pub mod time;

#[allow(dead_code)]
pub mod uid;


#[cfg(test)]
mod utils_test;
