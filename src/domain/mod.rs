pub mod channel;
pub mod economic;
pub mod experiment;
pub mod hearing;
pub mod metrics;
