//! Services that sit beside the state containers.
//!
//! - `auth` - account sign-in and sign-up against an identity provider
pub mod auth;
