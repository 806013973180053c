//! Field-scoped form validation. Each form enumerates its checks and returns
//! every failure at once, so the caller can render the full set inline and
//! nothing is written on a partially valid submission.

use once_cell::sync::Lazy;
use regex::Regex;

use crate::complaints::{Category, NewComplaint, Priority};
use crate::error::FieldError;
use crate::identity::SignUpRequest;
use crate::profile::ProfileUpdate;
use crate::provisioning::AdminRegistration;

static EMAIL_RE: Lazy<Regex> =
    Lazy::new(|| Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex"));

fn field(name: &str, code: &str, message: &str) -> FieldError {
    FieldError::new(name, code, message)
}

fn all_digits(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_digit())
}

fn check_email(out: &mut Vec<FieldError>, email: &str) {
    if !EMAIL_RE.is_match(email.trim()) {
        out.push(field("email", "invalid", "invalid email address"));
    }
}

fn check_full_name(out: &mut Vec<FieldError>, full_name: &str) {
    let len = full_name.trim().chars().count();
    if len < 2 {
        out.push(field("full_name", "too_short", "full name must be at least 2 characters"));
    } else if len > 100 {
        out.push(field("full_name", "too_long", "full name must be less than 100 characters"));
    }
}

fn check_password(out: &mut Vec<FieldError>, password: &str) {
    let len = password.chars().count();
    if len < 6 {
        out.push(field("password", "too_short", "password must be at least 6 characters"));
    } else if len > 100 {
        out.push(field("password", "too_long", "password must be less than 100 characters"));
    }
}

fn check_phone(out: &mut Vec<FieldError>, phone: &str) {
    let phone = phone.trim();
    if phone.chars().count() != 10 || !all_digits(phone) {
        out.push(field("phone", "invalid", "phone number must be 10 digits"));
    }
}

pub fn signup(req: &SignUpRequest) -> Vec<FieldError> {
    let mut out = Vec::new();
    let aadhaar = req.aadhaar_number.trim();
    if aadhaar.chars().count() != 12 || !all_digits(aadhaar) {
        out.push(field("aadhaar_number", "invalid", "Aadhaar number must be 12 digits"));
    }
    check_full_name(&mut out, &req.full_name);
    check_email(&mut out, &req.email);
    check_phone(&mut out, &req.phone);
    check_password(&mut out, &req.password);
    out
}

pub fn complaint(req: &NewComplaint) -> Vec<FieldError> {
    let mut out = Vec::new();
    if req.title.trim().is_empty() {
        out.push(field("title", "required", "title is required"));
    }
    if Category::parse(req.category.trim()).is_none() {
        out.push(field("category", "unknown_value", "category is not one of the known values"));
    }
    if Priority::parse(req.priority.trim()).is_none() {
        out.push(field("priority", "unknown_value", "priority is not one of the known values"));
    }
    if req.description.trim().is_empty() {
        out.push(field("description", "required", "description is required"));
    }
    out
}

pub fn profile_update(req: &ProfileUpdate) -> Vec<FieldError> {
    let mut out = Vec::new();
    check_full_name(&mut out, &req.full_name);
    if let Some(phone) = req.phone.as_deref() {
        if !phone.trim().is_empty() {
            check_phone(&mut out, phone);
        }
    }
    out
}

pub fn admin_registration(req: &AdminRegistration) -> Vec<FieldError> {
    let mut out = Vec::new();
    check_email(&mut out, &req.email);
    check_password(&mut out, &req.password);
    check_full_name(&mut out, &req.full_name);
    check_phone(&mut out, &req.phone);
    if req.employee_id.trim().is_empty() {
        out.push(field("employee_id", "required", "employee id is required"));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn base_signup() -> SignUpRequest {
        SignUpRequest {
            email: "citizen@example.in".into(),
            password: "s3cr3t!".into(),
            aadhaar_number: "123456789012".into(),
            full_name: "Asha Rao".into(),
            phone: "9876543210".into(),
        }
    }

    #[test]
    fn valid_signup_passes() {
        assert!(signup(&base_signup()).is_empty());
    }

    #[test]
    fn aadhaar_must_be_twelve_digits() {
        let mut req = base_signup();
        req.aadhaar_number = "12345".into();
        let errs = signup(&req);
        assert_eq!(errs.len(), 1);
        assert_eq!(errs[0].field, "aadhaar_number");

        req.aadhaar_number = "12345678901a".into();
        assert_eq!(signup(&req)[0].code, "invalid");
    }

    #[test]
    fn every_failing_field_is_reported() {
        let req = SignUpRequest {
            email: "not-an-email".into(),
            password: "123".into(),
            aadhaar_number: "abc".into(),
            full_name: "A".into(),
            phone: "12".into(),
        };
        let errs = signup(&req);
        let fields: Vec<&str> = errs.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["aadhaar_number", "full_name", "email", "phone", "password"]);
    }

    #[test]
    fn complaint_rejects_unknown_enums() {
        let req = NewComplaint {
            title: "Pothole".into(),
            category: "potholes".into(),
            priority: "critical".into(),
            description: "Large pothole on Main St".into(),
            location: None,
        };
        let errs = complaint(&req);
        let fields: Vec<&str> = errs.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["category", "priority"]);
    }

    #[test]
    fn complaint_requires_title_and_description() {
        let req = NewComplaint {
            title: "  ".into(),
            category: "roads".into(),
            priority: "high".into(),
            description: "".into(),
            location: Some("Main St".into()),
        };
        let errs = complaint(&req);
        let fields: Vec<&str> = errs.iter().map(|e| e.field.as_str()).collect();
        assert_eq!(fields, vec!["title", "description"]);
    }

    #[test]
    fn profile_phone_is_optional_but_checked_when_present() {
        let ok = ProfileUpdate {
            full_name: "Asha Rao".into(),
            phone: None,
            email: None,
            aadhaar_number: None,
        };
        assert!(profile_update(&ok).is_empty());

        let bad = ProfileUpdate { phone: Some("12ab".into()), ..ok };
        assert_eq!(profile_update(&bad)[0].field, "phone");
    }
}
