pub mod alpha_mask;
pub mod config;
pub mod energy;
pub mod engine;
pub mod gmm;
pub mod label;
pub mod maxflow;
pub mod region;
