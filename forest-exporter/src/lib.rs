pub mod logging;
pub mod scoring;
pub mod trainer;
pub mod trainer_dump;
pub mod write_forest;
