use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StoreCategory {
  Digital,
  Physical,
  Experience,
  Educational,
  MobileData,
}

impl StoreCategory {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Digital => "digital",
      Self::Physical => "physical",
      Self::Experience => "experience",
      Self::Educational => "educational",
      Self::MobileData => "mobile_data",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "digital" => Some(Self::Digital),
      "physical" => Some(Self::Physical),
      "experience" => Some(Self::Experience),
      "educational" => Some(Self::Educational),
      "mobile_data" => Some(Self::MobileData),
      _ => None,
    }
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ItemType {
  Airtime,
  DataBundle,
  Voucher,
  CourseAccess,
  Merchandise,
  Other,
}

impl ItemType {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Airtime => "airtime",
      Self::DataBundle => "data_bundle",
      Self::Voucher => "voucher",
      Self::CourseAccess => "course_access",
      Self::Merchandise => "merchandise",
      Self::Other => "other",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "airtime" => Some(Self::Airtime),
      "data_bundle" => Some(Self::DataBundle),
      "voucher" => Some(Self::Voucher),
      "course_access" => Some(Self::CourseAccess),
      "merchandise" => Some(Self::Merchandise),
      "other" => Some(Self::Other),
      _ => None,
    }
  }
}

/// Redeemable catalog item
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StoreItem {
  pub id: String,
  pub name: String,
  pub description: String,
  pub category: StoreCategory,
  pub points_cost: i64,
  /// Real-world value in ZAR
  pub cash_value: Option<f64>,
  pub is_available: bool,
  /// None means unlimited stock
  pub stock_quantity: Option<i64>,
  pub is_limited: bool,
  pub minimum_level: Option<i64>,
  pub required_badges: Vec<String>,
  pub image_url: String,
  pub item_type: ItemType,
  /// Item-type-specific payload
  pub item_data: serde_json::Value,
  pub provider: Option<String>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RedemptionStatus {
  Pending,
  Processing,
  Completed,
  Failed,
  Cancelled,
}

impl RedemptionStatus {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Pending => "pending",
      Self::Processing => "processing",
      Self::Completed => "completed",
      Self::Failed => "failed",
      Self::Cancelled => "cancelled",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "pending" => Some(Self::Pending),
      "processing" => Some(Self::Processing),
      "completed" => Some(Self::Completed),
      "failed" => Some(Self::Failed),
      "cancelled" => Some(Self::Cancelled),
      _ => None,
    }
  }

  /// Fulfillment lifecycle. A failed redemption may be retried by moving it back to processing.
  pub fn can_transition_to(&self, next: RedemptionStatus) -> bool {
    use RedemptionStatus::*;
    matches!(
      (self, next),
      (Pending, Processing)
        | (Pending, Failed)
        | (Pending, Cancelled)
        | (Processing, Completed)
        | (Processing, Failed)
        | (Processing, Cancelled)
        | (Failed, Processing)
    )
  }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeliveryMethod {
  Digital,
  Email,
  Sms,
  Physical,
  InApp,
}

impl DeliveryMethod {
  pub fn as_str(&self) -> &'static str {
    match self {
      Self::Digital => "digital",
      Self::Email => "email",
      Self::Sms => "sms",
      Self::Physical => "physical",
      Self::InApp => "in_app",
    }
  }

  pub fn from_str(s: &str) -> Option<Self> {
    match s {
      "digital" => Some(Self::Digital),
      "email" => Some(Self::Email),
      "sms" => Some(Self::Sms),
      "physical" => Some(Self::Physical),
      "in_app" => Some(Self::InApp),
      _ => None,
    }
  }

  pub fn for_category(category: StoreCategory) -> Self {
    match category {
      StoreCategory::Digital => Self::Digital,
      _ => Self::Email,
    }
  }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeliveryDetails {
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub phone_number: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub email: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub address: Option<String>,
  #[serde(default, skip_serializing_if = "Option::is_none")]
  pub tracking_number: Option<String>,
}

/// A redemption and its fulfillment state. Item fields are copied from the catalog at redeem time.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RedemptionRecord {
  pub id: String,
  pub uid: String,
  pub store_item_id: String,
  pub item_name: String,
  pub item_category: StoreCategory,
  pub points_spent: i64,
  pub cash_value: Option<f64>,
  pub status: RedemptionStatus,
  pub delivery_method: DeliveryMethod,
  pub delivery_details: Option<DeliveryDetails>,
  pub fulfillment_code: Option<String>,
  pub is_delivered: bool,
  pub delivered_at: Option<DateTime<Utc>>,
  pub error_message: Option<String>,
  pub retry_count: i64,
  pub redeemed_at: DateTime<Utc>,
  pub updated_at: DateTime<Utc>,
}
