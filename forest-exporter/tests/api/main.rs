mod forest_accuracy;
mod scoring;
mod serialization;
mod trainer;
