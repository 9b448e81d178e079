pub mod analyze;
pub mod check_skill;
pub mod fetch;
pub mod generate;
pub mod host_info;
pub mod validate;
