pub mod load;
pub mod preprocess;
pub mod setup;
pub mod test_connection;
pub mod verify;
