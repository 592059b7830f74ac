pub mod bits;
pub mod block_id;
pub mod config;
pub mod consts;
pub mod containers;
pub mod primitives;
pub mod validator_status;
