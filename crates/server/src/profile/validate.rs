//! Input validation for profile payloads.
//!
//! All violations for a payload accumulate per field and render as the
//! 422 `errors` body; nothing is persisted when validation fails.

use std::collections::BTreeMap;

use serde::Serialize;

use super::models::{ImageUpload, ProfileInput};

/// Field-level validation messages, keyed by field name
#[derive(Debug, Default, Clone, Serialize)]
#[serde(transparent)]
pub struct ValidationErrors(BTreeMap<String, Vec<String>>);

impl ValidationErrors {
    pub fn add(&mut self, field: &str, message: impl Into<String>) {
        self.0
            .entry(field.to_string())
            .or_default()
            .push(message.into());
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Messages recorded for one field, if any
    pub fn field(&self, field: &str) -> Option<&[String]> {
        self.0.get(field).map(|v| v.as_slice())
    }
}

/// Check a decoded payload against the field rules. Absent fields pass;
/// empty strings pass (they clear the stored value).
pub fn validate_input(input: &ProfileInput, max_image_kib: usize) -> Result<(), ValidationErrors> {
    let mut errors = ValidationErrors::default();

    // Length caps for the optional text fields, in characters
    let text_rules = [
        ("phone_number", input.phone_number.as_deref(), 20),
        ("address", input.address.as_deref(), 255),
        ("city", input.city.as_deref(), 100),
        ("state", input.state.as_deref(), 100),
        ("postal_code", input.postal_code.as_deref(), 20),
        ("bio", input.bio.as_deref(), 1000),
    ];

    for (field, value, max_chars) in text_rules {
        if let Some(value) = value {
            if value.chars().count() > max_chars {
                errors.add(field, format!("must be at most {} characters", max_chars));
            }
        }
    }

    if let Some(prefs) = &input.preferences {
        if !prefs.is_empty() {
            match serde_json::from_str::<serde_json::Value>(prefs) {
                Ok(value) if value.is_object() => {}
                _ => errors.add("preferences", "must be a JSON object"),
            }
        }
    }

    if let Some(image) = &input.image {
        check_image(image, max_image_kib, &mut errors);
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(errors)
    }
}

fn check_image(image: &ImageUpload, max_kib: usize, errors: &mut ValidationErrors) {
    if sniff_image_ext(&image.data).is_none() {
        errors.add("profile_image", "must be a JPEG or PNG image");
    }
    if image.data.len() > max_kib * 1024 {
        errors.add(
            "profile_image",
            format!("must not be larger than {} kilobytes", max_kib),
        );
    }
}

/// Detect the image kind from its magic bytes, returning the canonical
/// file extension. Client-supplied names and content types are not trusted.
pub fn sniff_image_ext(data: &[u8]) -> Option<&'static str> {
    if data.starts_with(&[0xFF, 0xD8, 0xFF]) {
        Some("jpg")
    } else if data.starts_with(b"\x89PNG\r\n\x1a\n") {
        Some("png")
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use bytes::Bytes;

    fn input_with(field: &str, value: String) -> ProfileInput {
        let mut input = ProfileInput::default();
        let slot = match field {
            "phone_number" => &mut input.phone_number,
            "address" => &mut input.address,
            "city" => &mut input.city,
            "state" => &mut input.state,
            "postal_code" => &mut input.postal_code,
            "bio" => &mut input.bio,
            other => panic!("unknown text field {}", other),
        };
        *slot = Some(value);
        input
    }

    fn png_bytes(total_len: usize) -> Bytes {
        let mut data = b"\x89PNG\r\n\x1a\n".to_vec();
        data.resize(total_len, 0);
        Bytes::from(data)
    }

    #[test]
    fn test_empty_input_passes() {
        assert!(validate_input(&ProfileInput::default(), 2048).is_ok());
    }

    #[test]
    fn test_text_length_boundaries() {
        // Every capped field at its limit and one past it
        let caps = [
            ("phone_number", 20),
            ("address", 255),
            ("city", 100),
            ("state", 100),
            ("postal_code", 20),
            ("bio", 1000),
        ];

        for (field, cap) in caps {
            let at_cap = input_with(field, "x".repeat(cap));
            assert!(
                validate_input(&at_cap, 2048).is_ok(),
                "{} at its cap should pass",
                field
            );

            let over_cap = input_with(field, "x".repeat(cap + 1));
            let errors = validate_input(&over_cap, 2048).unwrap_err();
            assert_eq!(
                errors.field(field).unwrap(),
                &[format!("must be at most {} characters", cap)],
                "{} one past its cap should fail",
                field
            );
        }
    }

    #[test]
    fn test_lengths_count_characters_not_bytes() {
        // 20 three-byte characters is within the 20-char cap.
        let input = ProfileInput {
            phone_number: Some("☎".repeat(20)),
            ..Default::default()
        };
        assert!(validate_input(&input, 2048).is_ok());
    }

    #[test]
    fn test_empty_strings_pass_as_clears() {
        let input = ProfileInput {
            phone_number: Some(String::new()),
            bio: Some(String::new()),
            preferences: Some(String::new()),
            ..Default::default()
        };
        assert!(validate_input(&input, 2048).is_ok());
    }

    #[test]
    fn test_preferences_must_be_json_object() {
        let ok = ProfileInput {
            preferences: Some(r#"{"theme":"dark","notifications":true}"#.to_string()),
            ..Default::default()
        };
        assert!(validate_input(&ok, 2048).is_ok());

        for bad in [r#"[1,2,3]"#, r#""just a string""#, "not json at all", "42"] {
            let input = ProfileInput {
                preferences: Some(bad.to_string()),
                ..Default::default()
            };
            let errors = validate_input(&input, 2048).unwrap_err();
            assert!(errors.field("preferences").is_some(), "accepted {:?}", bad);
        }
    }

    #[test]
    fn test_image_magic_bytes() {
        let jpeg = ProfileInput {
            image: Some(ImageUpload {
                filename: "photo.jpg".to_string(),
                content_type: Some("image/jpeg".to_string()),
                data: Bytes::from_static(&[0xFF, 0xD8, 0xFF, 0xE0, 0x00]),
            }),
            ..Default::default()
        };
        assert!(validate_input(&jpeg, 2048).is_ok());

        let png = ProfileInput {
            image: Some(ImageUpload {
                filename: "photo.png".to_string(),
                content_type: Some("image/png".to_string()),
                data: png_bytes(64),
            }),
            ..Default::default()
        };
        assert!(validate_input(&png, 2048).is_ok());

        // A GIF header fails regardless of the claimed content type.
        let gif = ProfileInput {
            image: Some(ImageUpload {
                filename: "photo.png".to_string(),
                content_type: Some("image/png".to_string()),
                data: Bytes::from_static(b"GIF89a trailing"),
            }),
            ..Default::default()
        };
        let errors = validate_input(&gif, 2048).unwrap_err();
        assert!(errors.field("profile_image").is_some());
    }

    #[test]
    fn test_image_size_cap() {
        let at_cap = ProfileInput {
            image: Some(ImageUpload {
                filename: "photo.png".to_string(),
                content_type: None,
                data: png_bytes(1024),
            }),
            ..Default::default()
        };
        assert!(validate_input(&at_cap, 1).is_ok());

        let over_cap = ProfileInput {
            image: Some(ImageUpload {
                filename: "photo.png".to_string(),
                content_type: None,
                data: png_bytes(1025),
            }),
            ..Default::default()
        };
        let errors = validate_input(&over_cap, 1).unwrap_err();
        assert_eq!(
            errors.field("profile_image").unwrap(),
            &["must not be larger than 1 kilobytes".to_string()]
        );
    }

    #[test]
    fn test_violations_accumulate_across_fields() {
        let input = ProfileInput {
            phone_number: Some("5".repeat(30)),
            preferences: Some("[]".to_string()),
            ..Default::default()
        };
        let errors = validate_input(&input, 2048).unwrap_err();
        assert!(errors.field("phone_number").is_some());
        assert!(errors.field("preferences").is_some());
    }

    #[test]
    fn test_sniff_image_ext() {
        assert_eq!(sniff_image_ext(&[0xFF, 0xD8, 0xFF, 0xDB]), Some("jpg"));
        assert_eq!(sniff_image_ext(b"\x89PNG\r\n\x1a\nrest"), Some("png"));
        assert_eq!(sniff_image_ext(b"GIF89a"), None);
        assert_eq!(sniff_image_ext(b""), None);
        assert_eq!(sniff_image_ext(&[0xFF, 0xD8]), None);
    }
}
