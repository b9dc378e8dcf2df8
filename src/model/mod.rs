pub mod attendance;
pub mod leave;
pub mod office;
pub mod role;
