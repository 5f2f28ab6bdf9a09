/// Database configuration and connection management
pub mod database;

/// Process settings from environment variables
pub mod settings;

/// Venue reference data loading from a TOML file
pub mod venue;
