pub mod bearer;
pub mod federated;
pub mod permissions;
pub mod resolver;
