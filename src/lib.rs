//! Co-occurrence recommendations for a food marketplace.
//!
//! Completed purchases are pivoted into a subject x actor interaction matrix
//! (listings or restaurants against users), rows are compared by cosine
//! similarity and the nearest rows are served as recommendations. Every
//! request rebuilds its matrix from the data source; nothing is cached
//! between requests.

pub mod catalog;
pub mod config;
pub mod engine;
pub mod error;
pub mod io;
pub mod knn;
pub mod stats;
pub mod stopwatch;
