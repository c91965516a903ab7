//! Field validators for registration and cargo input.
//!
//! Each validator returns the list of problems it found instead of stopping at
//! the first one, so callers can report everything in a single response.

use std::collections::{BTreeSet, HashSet};

use crate::error::FieldError;
use crate::models::{CargoItem, NewDrone};

/// Minimum battery percentage for a drone to take on cargo or be listed as available.
pub const MIN_LOAD_BATTERY: i32 = 25;
pub const MAX_WEIGHT_LIMIT: i64 = 500;
pub const MAX_BATTERY: i32 = 100;
pub const MAX_SERIAL_LEN: usize = 100;
pub const MAX_NAME_LEN: usize = 255;
pub const MAX_CODE_LEN: usize = 200;

/// Parses a raw cargo weight. Surrounding whitespace and a leading `+` are
/// tolerated; anything else that is not an integer >= 0 is rejected.
pub fn parse_weight(raw: &str) -> Option<i64> {
    raw.trim().parse::<i64>().ok().filter(|w| *w >= 0)
}

/// ASCII letters, digits, `-` and `_`.
pub fn validate_name(name: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if name.is_empty() {
        errors.push(FieldError::new("name", "this field may not be blank"));
    } else if name.chars().count() > MAX_NAME_LEN {
        errors.push(FieldError::new(
            "name",
            format!("ensure this field has no more than {} characters", MAX_NAME_LEN),
        ));
    }
    if !name.chars().all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_') {
        errors.push(FieldError::new(
            "name",
            "name can only contain letters, numbers, '-', and '_'",
        ));
    }
    errors
}

/// ASCII uppercase letters, digits and `_`.
pub fn validate_code(code: &str) -> Vec<FieldError> {
    let mut errors = Vec::new();
    if code.is_empty() {
        errors.push(FieldError::new("code", "this field may not be blank"));
    } else if code.chars().count() > MAX_CODE_LEN {
        errors.push(FieldError::new(
            "code",
            format!("ensure this field has no more than {} characters", MAX_CODE_LEN),
        ));
    }
    if !code.chars().all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_') {
        errors.push(FieldError::new(
            "code",
            "code can only contain uppercase letters, numbers, and '_'",
        ));
    }
    errors
}

/// Every item needs an image reference; its content is checked at upload time.
pub fn validate_image(image: &str) -> Vec<FieldError> {
    if image.trim().is_empty() {
        vec![FieldError::new("image", "no image was submitted")]
    } else {
        Vec::new()
    }
}

/// Name, code and image checks for every item, tagged with the item index.
pub fn validate_cargo_format(items: &[CargoItem]) -> Vec<FieldError> {
    items
        .iter()
        .enumerate()
        .flat_map(|(i, item)| {
            validate_name(&item.name)
                .into_iter()
                .chain(validate_code(&item.code))
                .chain(validate_image(&item.image))
                .map(move |e| e.at(i))
        })
        .collect()
}

/// Codes that appear more than once within the same request, sorted.
pub fn duplicate_codes(items: &[CargoItem]) -> BTreeSet<String> {
    let mut seen = HashSet::new();
    items
        .iter()
        .filter(|item| !seen.insert(item.code.as_str()))
        .map(|item| item.code.clone())
        .collect()
}

/// Range and presence checks for a drone registration.
pub fn validate_registration(drone: &NewDrone) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let serial = drone.serial_number.trim();
    if serial.is_empty() {
        errors.push(FieldError::new("serial_number", "this field may not be blank"));
    } else if serial.chars().count() > MAX_SERIAL_LEN {
        errors.push(FieldError::new(
            "serial_number",
            format!("ensure this field has no more than {} characters", MAX_SERIAL_LEN),
        ));
    }

    if !(0..=MAX_WEIGHT_LIMIT).contains(&drone.weight_limit) {
        errors.push(FieldError::new(
            "weight_limit",
            format!("ensure this value is between 0 and {}", MAX_WEIGHT_LIMIT),
        ));
    }

    if !(0..=MAX_BATTERY).contains(&drone.battery_capacity) {
        errors.push(FieldError::new(
            "battery_capacity",
            format!("ensure this value is between 0 and {}", MAX_BATTERY),
        ));
    }

    errors
}

pub fn validate_battery(battery_capacity: i32) -> Vec<FieldError> {
    if (0..=MAX_BATTERY).contains(&battery_capacity) {
        Vec::new()
    } else {
        vec![FieldError::new(
            "battery_capacity",
            format!("ensure this value is between 0 and {}", MAX_BATTERY),
        )]
    }
}
