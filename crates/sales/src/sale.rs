use core::str::FromStr;

use serde::{Deserialize, Serialize};

use bontez_core::{DomainError, DomainResult};

macro_rules! impl_server_id {
    ($t:ident, $name:literal) => {
        /// Server-assigned identifier (integer primary key on the backend).
        #[derive(Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $t(pub i64);

        impl $t {
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl core::fmt::Display for $t {
            fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
                core::fmt::Display::fmt(&self.0, f)
            }
        }

        impl From<i64> for $t {
            fn from(value: i64) -> Self {
                Self(value)
            }
        }

        impl FromStr for $t {
            type Err = DomainError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                s.parse::<i64>()
                    .map(Self)
                    .map_err(|e| DomainError::invalid_id(format!("{}: {}", $name, e)))
            }
        }
    };
}

impl_server_id!(ClientId, "ClientId");
impl_server_id!(SupplierId, "SupplierId");
impl_server_id!(ProductId, "ProductId");

/// How the client paid.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PaymentMethod {
    Cash,
    Mpesa,
    Installment,
}

impl PaymentMethod {
    pub fn as_str(&self) -> &'static str {
        match self {
            PaymentMethod::Cash => "cash",
            PaymentMethod::Mpesa => "mpesa",
            PaymentMethod::Installment => "installment",
        }
    }
}

impl core::fmt::Display for PaymentMethod {
    fn fmt(&self, f: &mut core::fmt::Formatter<'_>) -> core::fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for PaymentMethod {
    type Err = DomainError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "cash" => Ok(PaymentMethod::Cash),
            "mpesa" => Ok(PaymentMethod::Mpesa),
            "installment" => Ok(PaymentMethod::Installment),
            other => Err(DomainError::validation(format!(
                "unknown payment method '{other}'"
            ))),
        }
    }
}

/// Sale line: product, quantity, unit price.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaleLine {
    pub product_id: ProductId,
    pub quantity: u32,
    /// Price in smallest currency unit.
    pub unit_price: u64,
}

impl SaleLine {
    pub fn new(product_id: i64, quantity: u32, unit_price: u64) -> Self {
        Self {
            product_id: ProductId(product_id),
            quantity,
            unit_price,
        }
    }

    pub fn line_total(&self) -> u64 {
        u64::from(self.quantity).saturating_mul(self.unit_price)
    }
}

/// Where the sale happened, when the device could tell.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct GeoTag {
    pub latitude: f64,
    pub longitude: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub address: Option<String>,
}

/// A sale as entered on the sale form, before any local or server id exists.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SalePayload {
    pub client_id: ClientId,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub supplier_id: Option<SupplierId>,
    pub items: Vec<SaleLine>,
    pub payment_method: PaymentMethod,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub mpesa_code: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub notes: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub location: Option<GeoTag>,
    /// Number of installments; only meaningful for `PaymentMethod::Installment`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub installments: Option<u32>,
}

impl SalePayload {
    pub fn new(client_id: i64, payment_method: PaymentMethod, items: Vec<SaleLine>) -> Self {
        Self {
            client_id: ClientId(client_id),
            supplier_id: None,
            items,
            payment_method,
            mpesa_code: None,
            notes: None,
            location: None,
            installments: None,
        }
    }

    pub fn with_supplier(mut self, supplier_id: i64) -> Self {
        self.supplier_id = Some(SupplierId(supplier_id));
        self
    }

    pub fn with_mpesa_code(mut self, code: impl Into<String>) -> Self {
        self.mpesa_code = Some(code.into());
        self
    }

    pub fn with_notes(mut self, notes: impl Into<String>) -> Self {
        self.notes = Some(notes.into());
        self
    }

    pub fn with_location(mut self, location: GeoTag) -> Self {
        self.location = Some(location);
        self
    }

    pub fn with_installments(mut self, count: u32) -> Self {
        self.installments = Some(count);
        self
    }

    /// Sum of all line totals.
    pub fn total(&self) -> u64 {
        self.items
            .iter()
            .fold(0u64, |acc, line| acc.saturating_add(line.line_total()))
    }

    /// Check the rules the sale form enforces before a sale may be recorded.
    pub fn validate(&self) -> DomainResult<()> {
        if self.client_id.get() < 1 {
            return Err(DomainError::validation("a client must be selected"));
        }

        if self.items.is_empty() {
            return Err(DomainError::validation("a sale needs at least one item"));
        }

        if let Some(pos) = self.items.iter().position(|line| line.quantity == 0) {
            return Err(DomainError::validation(format!(
                "item {} quantity must be at least 1",
                pos + 1
            )));
        }

        if self.payment_method == PaymentMethod::Mpesa
            && self
                .mpesa_code
                .as_deref()
                .is_none_or(|code| code.trim().is_empty())
        {
            return Err(DomainError::validation(
                "an M-Pesa code is required for M-Pesa payments",
            ));
        }

        if self.installments == Some(0) {
            return Err(DomainError::validation(
                "installment count must be at least 1",
            ));
        }

        Ok(())
    }
}
