pub mod alerts;
pub mod ws;
