pub mod apply;
pub mod holes;
pub mod init;
pub mod scan;
pub mod show;
