pub mod archiver;
pub mod compress;
pub mod config;
pub mod controller;
pub mod deployer;
pub mod logging;
pub mod sql;
pub mod util;
