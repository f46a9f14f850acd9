//! Identifier, color and label generation helpers.
//!
//! # Responsibility
//! - Mint stable IDs for new groups and items.
//! - Pick accent colors from the shared palette.
//! - Normalize device descriptions into a display label.

use rand::seq::SliceRandom;
use uuid::Uuid;

/// Accent colors assigned to new groups, as `#RRGGBB`.
pub const GROUP_PALETTE: [&str; 10] = [
    "#1A237E", "#00695C", "#C62828", "#EF6C00", "#6A1B9A", "#283593", "#2E7D32", "#AD1457",
    "#4527A0", "#00838F",
];

/// Mints a stable ID for a new group or item.
pub fn new_entry_id() -> Uuid {
    Uuid::new_v4()
}

/// Picks a random palette color for a new group.
pub fn random_palette_color() -> &'static str {
    GROUP_PALETTE
        .choose(&mut rand::thread_rng())
        .copied()
        .unwrap_or(GROUP_PALETTE[0])
}

/// Builds a human-readable device label from raw platform fields.
///
/// Combines a capitalized brand with the model name when both are known,
/// falls back to the bare model, then to a fixed placeholder.
pub fn format_device_label(brand: Option<&str>, model: Option<&str>) -> String {
    match (brand, model) {
        (Some(brand), Some(model)) if !brand.is_empty() && !model.is_empty() => {
            let mut chars = brand.chars();
            match chars.next() {
                Some(first) => format!("{}{} {model}", first.to_uppercase(), chars.as_str()),
                None => model.to_string(),
            }
        }
        (_, Some(model)) if !model.is_empty() => model.to_string(),
        _ => "Unknown Device".to_string(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::validate::validate_color;

    #[test]
    fn palette_colors_are_well_formed() {
        for color in GROUP_PALETTE {
            validate_color(color).unwrap();
        }
    }

    #[test]
    fn random_color_comes_from_palette() {
        for _ in 0..20 {
            let color = random_palette_color();
            assert!(GROUP_PALETTE.contains(&color));
        }
    }

    #[test]
    fn device_label_capitalizes_brand() {
        assert_eq!(
            format_device_label(Some("google"), Some("Pixel 7")),
            "Google Pixel 7"
        );
    }

    #[test]
    fn device_label_falls_back_to_model_then_placeholder() {
        assert_eq!(format_device_label(None, Some("Pixel 7")), "Pixel 7");
        assert_eq!(format_device_label(Some(""), Some("Pixel 7")), "Pixel 7");
        assert_eq!(format_device_label(None, None), "Unknown Device");
    }
}
