use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use crate::domain::quote::TenantId;

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeasureTaskId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeasureSheetId(pub String);

#[derive(Clone, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MeasureItemId(pub String);

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum InstallType {
    Top,
    Side,
}

impl InstallType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Top => "TOP",
            Self::Side => "SIDE",
        }
    }

    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "TOP" => Some(Self::Top),
            "SIDE" => Some(Self::Side),
            _ => None,
        }
    }
}

/// One revision of field measurements for a measurement task.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasureSheet {
    pub id: MeasureSheetId,
    pub tenant_id: TenantId,
    pub task_id: MeasureTaskId,
    pub round: i32,
    pub variant: String,
    pub created_at: DateTime<Utc>,
    pub items: Vec<MeasureItem>,
}

/// A measured opening. Dimensions are millimetres.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct MeasureItem {
    pub id: MeasureItemId,
    pub room_name: String,
    pub window_type: String,
    pub width: Decimal,
    pub height: Decimal,
    pub install_type: Option<InstallType>,
    pub bracket_dist: Option<Decimal>,
    pub wall_material: Option<String>,
    pub has_box: bool,
    pub box_depth: Option<Decimal>,
    pub is_electric: bool,
    pub remark: Option<String>,
}

impl MeasureItem {
    /// Provenance payload stored on quote items created from this row.
    pub fn provenance(&self) -> serde_json::Value {
        serde_json::json!({
            "source": "MEASUREMENT",
            "measureItemId": self.id.0,
            "windowType": self.window_type,
            "measuredWidth": self.width.to_string(),
            "measuredHeight": self.height.to_string(),
            "installType": self.install_type.map(|value| value.as_str()),
            "bracketDist": self.bracket_dist.map(|value| value.to_string()),
            "wallMaterial": self.wall_material,
            "hasBox": self.has_box,
            "boxDepth": self.box_depth.map(|value| value.to_string()),
            "isElectric": self.is_electric,
            "remark": self.remark,
        })
    }
}
