//! Field validation: phone, email, name, and vagueness checks

pub mod email;
pub mod field;
pub mod phone;

pub use email::{DeliverabilityChecker, EmailValidation, EmailValidator, PermissiveChecker};
pub use field::{is_vague_pain_point, validate_name};
pub use phone::{
    detect_country_from_phone, extract_country_from_text, extract_phone_from_text,
    format_phone_for_display, PhoneError, PhoneValidator, ValidatedPhone,
};
