pub mod ensemble;
pub mod engine;
pub mod predictor;
