//! # Network
//!
//! Role and validator control.

mod role;
mod validator;

pub use self::role::{
    build_assign_role, build_get_role, build_has_role, build_revoke_role, parse_get_role,
    parse_has_role, Role,
};
pub use self::validator::{
    build_add_validator, build_get_validators, build_remove_validator, parse_get_validators,
};
