//! Call Validation Module
//! 
//! This module authenticates signed calls before they reach the registry.
//! Performs signature recovery against the claimed sender and nonce checking
//! for replay protection.

mod validator;
pub use validator::CallValidator;
