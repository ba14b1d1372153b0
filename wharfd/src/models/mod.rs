pub mod credentials;
pub mod deployment;
pub mod url;
