use std::fmt;
use std::str::FromStr;

use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::quote::TenantId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ProductId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ProductCategory {
    Curtain,
    Wallpaper,
    Wallcloth,
    Mattress,
    Other,
    CurtainFabric,
    CurtainSheer,
    CurtainTrack,
    Motor,
    CurtainAccessory,
    WallclothAccessory,
    Wallpanel,
    Windowpad,
    Standard,
    Service,
}

/// Category assigned to measurement rows whose window type is not in
/// [`WINDOW_TYPE_CATEGORIES`].
pub const DEFAULT_MEASURED_CATEGORY: ProductCategory = ProductCategory::CurtainFabric;

/// Window type (as recorded on a measurement sheet) to the quote item
/// category it is priced under. Extend here; matching code reads only this table.
pub const WINDOW_TYPE_CATEGORIES: &[(&str, ProductCategory)] = &[
    ("STRAIGHT", ProductCategory::CurtainFabric),
    ("L_SHAPE", ProductCategory::CurtainFabric),
    ("U_SHAPE", ProductCategory::CurtainFabric),
    ("ARC", ProductCategory::CurtainFabric),
    ("SHEER", ProductCategory::CurtainSheer),
    ("TRACK", ProductCategory::CurtainTrack),
    ("MOTOR", ProductCategory::Motor),
    ("WALLPAPER", ProductCategory::Wallpaper),
    ("WALLCLOTH", ProductCategory::Wallcloth),
    ("WALLPANEL", ProductCategory::Wallpanel),
    ("WINDOWPAD", ProductCategory::Windowpad),
];

pub fn infer_category(window_type: &str) -> ProductCategory {
    let window_type = window_type.trim();
    WINDOW_TYPE_CATEGORIES
        .iter()
        .find(|(key, _)| key.eq_ignore_ascii_case(window_type))
        .map(|(_, category)| *category)
        .unwrap_or(DEFAULT_MEASURED_CATEGORY)
}

impl ProductCategory {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Curtain => "CURTAIN",
            Self::Wallpaper => "WALLPAPER",
            Self::Wallcloth => "WALLCLOTH",
            Self::Mattress => "MATTRESS",
            Self::Other => "OTHER",
            Self::CurtainFabric => "CURTAIN_FABRIC",
            Self::CurtainSheer => "CURTAIN_SHEER",
            Self::CurtainTrack => "CURTAIN_TRACK",
            Self::Motor => "MOTOR",
            Self::CurtainAccessory => "CURTAIN_ACCESSORY",
            Self::WallclothAccessory => "WALLCLOTH_ACCESSORY",
            Self::Wallpanel => "WALLPANEL",
            Self::Windowpad => "WINDOWPAD",
            Self::Standard => "STANDARD",
            Self::Service => "SERVICE",
        }
    }
}

impl fmt::Display for ProductCategory {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ProductCategory {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        let category = match value {
            "CURTAIN" => Self::Curtain,
            "WALLPAPER" => Self::Wallpaper,
            "WALLCLOTH" => Self::Wallcloth,
            "MATTRESS" => Self::Mattress,
            "OTHER" => Self::Other,
            "CURTAIN_FABRIC" => Self::CurtainFabric,
            "CURTAIN_SHEER" => Self::CurtainSheer,
            "CURTAIN_TRACK" => Self::CurtainTrack,
            "MOTOR" => Self::Motor,
            "CURTAIN_ACCESSORY" => Self::CurtainAccessory,
            "WALLCLOTH_ACCESSORY" => Self::WallclothAccessory,
            "WALLPANEL" => Self::Wallpanel,
            "WINDOWPAD" => Self::Windowpad,
            "STANDARD" => Self::Standard,
            "SERVICE" => Self::Service,
            other => return Err(format!("unknown product category `{other}`")),
        };
        Ok(category)
    }
}

/// Catalog entry a quote item may be priced from.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct Product {
    pub id: ProductId,
    pub tenant_id: TenantId,
    pub name: String,
    pub category: ProductCategory,
    pub unit: Option<String>,
    pub unit_price: Decimal,
    pub active: bool,
}
