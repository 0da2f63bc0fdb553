pub mod face_identifier;
pub mod identity_key;
pub mod identity_resolver;
