pub mod clock;
pub mod engine;
pub mod geo;
pub mod qr;
pub mod reconcile;
pub mod repo;
pub mod report;
