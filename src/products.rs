//! Product-id capability lookup.

use serde::{Deserialize, Serialize};

/// Feature flags derived from a bulb's product id.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Capabilities {
    pub supports_color: bool,
    pub supports_infrared: bool,
    pub supports_multizone: bool,
}

/// Static capability record for one product id.
#[derive(Debug, Clone)]
pub struct ProductInfo {
    pub id: u32,
    pub name: &'static str,
    pub capabilities: Capabilities,
}

const COLOR: Capabilities = Capabilities {
    supports_color: true,
    supports_infrared: false,
    supports_multizone: false,
};
const WHITE: Capabilities = Capabilities {
    supports_color: false,
    supports_infrared: false,
    supports_multizone: false,
};
const INFRARED: Capabilities = Capabilities {
    supports_color: true,
    supports_infrared: true,
    supports_multizone: false,
};
const MULTIZONE: Capabilities = Capabilities {
    supports_color: true,
    supports_infrared: false,
    supports_multizone: true,
};

// Subset of the LIFX product registry covering the bulbs the engine has been
// exercised against. Unknown ids fall back to a generic record.
const PRODUCTS: &[ProductInfo] = &[
    ProductInfo { id: 1, name: "LIFX Original 1000", capabilities: COLOR },
    ProductInfo { id: 3, name: "LIFX Color 650", capabilities: COLOR },
    ProductInfo { id: 10, name: "LIFX White 800 (Low Voltage)", capabilities: WHITE },
    ProductInfo { id: 11, name: "LIFX White 800 (High Voltage)", capabilities: WHITE },
    ProductInfo { id: 18, name: "LIFX White 900 BR30", capabilities: WHITE },
    ProductInfo { id: 20, name: "LIFX Color 1000 BR30", capabilities: COLOR },
    ProductInfo { id: 22, name: "LIFX Color 1000", capabilities: COLOR },
    ProductInfo { id: 27, name: "LIFX A19", capabilities: COLOR },
    ProductInfo { id: 28, name: "LIFX BR30", capabilities: COLOR },
    ProductInfo { id: 29, name: "LIFX A19 Night Vision", capabilities: INFRARED },
    ProductInfo { id: 30, name: "LIFX BR30 Night Vision", capabilities: INFRARED },
    ProductInfo { id: 31, name: "LIFX Z", capabilities: MULTIZONE },
    ProductInfo { id: 32, name: "LIFX Z 2", capabilities: MULTIZONE },
    ProductInfo { id: 36, name: "LIFX Downlight", capabilities: COLOR },
    ProductInfo { id: 38, name: "LIFX Beam", capabilities: MULTIZONE },
    ProductInfo { id: 43, name: "LIFX A19", capabilities: COLOR },
    ProductInfo { id: 44, name: "LIFX BR30", capabilities: COLOR },
    ProductInfo { id: 45, name: "LIFX A19 Night Vision", capabilities: INFRARED },
    ProductInfo { id: 46, name: "LIFX BR30 Night Vision", capabilities: INFRARED },
    ProductInfo { id: 49, name: "LIFX Mini Color", capabilities: COLOR },
    ProductInfo { id: 50, name: "LIFX Mini White to Warm", capabilities: WHITE },
    ProductInfo { id: 51, name: "LIFX Mini White", capabilities: WHITE },
    ProductInfo { id: 52, name: "LIFX GU10", capabilities: COLOR },
    ProductInfo { id: 57, name: "LIFX Candle", capabilities: COLOR },
    ProductInfo { id: 59, name: "LIFX Mini Color", capabilities: COLOR },
    ProductInfo { id: 60, name: "LIFX Mini White to Warm", capabilities: WHITE },
    ProductInfo { id: 61, name: "LIFX Mini White", capabilities: WHITE },
    ProductInfo { id: 66, name: "LIFX Mini White", capabilities: WHITE },
];

/// Look up the product record for a product id.
pub fn product_info(id: u32) -> Option<&'static ProductInfo> {
    PRODUCTS.iter().find(|p| p.id == id)
}

/// Display name for a product id, with a generic fallback for unknown ids.
pub fn product_name(id: u32) -> String {
    match product_info(id) {
        Some(info) => info.name.to_string(),
        None => format!("LIFX Device (product {id})"),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_known_product() {
        let info = product_info(29).unwrap();
        assert!(info.capabilities.supports_infrared);
        assert!(info.capabilities.supports_color);
        assert!(!info.capabilities.supports_multizone);
    }

    #[test]
    fn test_unknown_product_falls_back() {
        assert!(product_info(9999).is_none());
        assert_eq!(product_name(9999), "LIFX Device (product 9999)");
    }
}
