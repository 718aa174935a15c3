pub mod auth;
pub mod doctor;
pub mod extract;
pub mod generate;
pub mod init;
pub mod serve;
