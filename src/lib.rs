pub mod cli;
pub mod etl;

pub mod util {
    pub mod db;
    pub mod env;
}
