pub mod csv_io;
pub mod loader;
pub mod model;
pub mod preprocess;
pub mod registry;
pub mod verify;
