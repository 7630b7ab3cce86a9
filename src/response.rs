use serde::{Deserialize, Serialize};
use serde_json::{Number, Value};
use std::fmt;

/// Whatever zip-tax sent back, kept exactly as it arrived.
///
/// Nothing in here is checked when it's decoded. The accessors look things up when you ask and
/// hand back `None` if a field is absent or isn't the kind of value they expect. A body with no
/// `results` is fine, you find out when you go looking for a rate.
#[derive(Serialize, Deserialize, PartialEq, Debug, Clone, Default)]
#[serde(transparent)]
pub struct LookupResponse(Value);

impl LookupResponse {
    pub fn body(&self) -> &Value {
        &self.0
    }

    pub fn into_body(self) -> Value {
        self.0
    }

    pub fn version(&self) -> Option<&str> {
        self.0.get("version")?.as_str()
    }

    /// zip-tax's own result code. Accepts `100` or `"100"`.
    pub fn r_code(&self) -> Option<i64> {
        match self.0.get("rCode")? {
            Value::Number(n) => n.as_i64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn address_detail(&self) -> Option<AddressDetail<'_>> {
        self.0
            .get("addressDetail")
            .filter(|v| v.is_object())
            .map(AddressDetail)
    }

    /// Every entry of `results`, in order. `None` when there is no `results` array at all.
    pub fn results(&self) -> Option<Vec<TaxResult<'_>>> {
        let results = self.0.get("results")?.as_array()?;
        Some(results.iter().map(TaxResult).collect())
    }

    /// Sales tax of the first result, as a fraction (0.0775 is 7.75%)
    pub fn sales_tax_rate(&self) -> Option<f64> {
        self.results()?.first()?.tax_sales()
    }

    pub fn summary(&self) -> Result<Summary<'_>, SummaryError> {
        Summary::try_from(self)
    }
}

impl From<Value> for LookupResponse {
    fn from(body: Value) -> Self {
        Self(body)
    }
}

/// The address as zip-tax understood it
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AddressDetail<'a>(&'a Value);

impl<'a> AddressDetail<'a> {
    pub fn normalized_address(&self) -> Option<&'a str> {
        self.0.get("normalizedAddress")?.as_str()
    }

    /// Left as raw JSON, it has shown up as both `"true"` and `true`.
    pub fn incorporated(&self) -> Option<&'a Value> {
        self.0.get("incorporated")
    }

    pub fn geo_lat(&self) -> Option<Coordinate<'a>> {
        Coordinate::from_value(self.0.get("geoLat")?)
    }

    pub fn geo_lng(&self) -> Option<Coordinate<'a>> {
        Coordinate::from_value(self.0.get("geoLng")?)
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.0.get(key)
    }
}

/// One jurisdiction's rates. Anything without a named accessor (district1..5 and so on) is
/// reachable through [`TaxResult::rate`], [`TaxResult::text`] or [`TaxResult::get`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct TaxResult<'a>(&'a Value);

impl<'a> TaxResult<'a> {
    pub fn tax_sales(&self) -> Option<f64> {
        self.rate("taxSales")
    }

    pub fn tax_use(&self) -> Option<f64> {
        self.rate("taxUse")
    }

    pub fn state_sales_tax(&self) -> Option<f64> {
        self.rate("stateSalesTax")
    }

    pub fn city_sales_tax(&self) -> Option<f64> {
        self.rate("citySalesTax")
    }

    pub fn county_sales_tax(&self) -> Option<f64> {
        self.rate("countySalesTax")
    }

    pub fn district_sales_tax(&self) -> Option<f64> {
        self.rate("districtSalesTax")
    }

    pub fn geo_postal_code(&self) -> Option<&'a str> {
        self.text("geoPostalCode")
    }

    pub fn geo_city(&self) -> Option<&'a str> {
        self.text("geoCity")
    }

    pub fn geo_county(&self) -> Option<&'a str> {
        self.text("geoCounty")
    }

    pub fn geo_state(&self) -> Option<&'a str> {
        self.text("geoState")
    }

    /// A rate by its JSON key. Numbers and numeric strings both count.
    pub fn rate(&self, key: &str) -> Option<f64> {
        match self.0.get(key)? {
            Value::Number(n) => n.as_f64(),
            Value::String(s) => s.trim().parse().ok(),
            _ => None,
        }
    }

    pub fn text(&self, key: &str) -> Option<&'a str> {
        self.0.get(key)?.as_str()
    }

    pub fn get(&self, key: &str) -> Option<&'a Value> {
        self.0.get(key)
    }
}

/// Latitude or longitude. The API has been seen sending both numbers and strings.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Coordinate<'a> {
    Number(&'a Number),
    Text(&'a str),
}

impl<'a> Coordinate<'a> {
    fn from_value(value: &'a Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Coordinate::Number(n)),
            Value::String(s) => Some(Coordinate::Text(s)),
            _ => None,
        }
    }

    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Coordinate::Number(n) => n.as_f64(),
            Coordinate::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for Coordinate<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Coordinate::Number(n) => write!(f, "{}", n),
            Coordinate::Text(s) => f.write_str(s),
        }
    }
}

/// Why a [`Summary`] couldn't be built. The client never checks these, so they only show up here.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum SummaryError {
    #[error("response has no addressDetail")]
    MissingAddressDetail,
    #[error("response is missing {0}")]
    MissingField(&'static str),
    #[error("response has no tax results")]
    NoResults,
}

/// The three lines worth printing: normalized address, lat/lng and the first sales tax rate.
#[derive(Debug, Clone, PartialEq)]
pub struct Summary<'a> {
    pub normalized_address: &'a str,
    pub geo_lat: Coordinate<'a>,
    pub geo_lng: Coordinate<'a>,
    pub tax_sales: f64,
}

impl<'a> TryFrom<&'a LookupResponse> for Summary<'a> {
    type Error = SummaryError;

    fn try_from(response: &'a LookupResponse) -> Result<Self, Self::Error> {
        let detail = response
            .address_detail()
            .ok_or(SummaryError::MissingAddressDetail)?;
        let first = response
            .results()
            .and_then(|results| results.first().copied())
            .ok_or(SummaryError::NoResults)?;

        Ok(Summary {
            normalized_address: detail
                .normalized_address()
                .ok_or(SummaryError::MissingField("addressDetail.normalizedAddress"))?,
            geo_lat: detail
                .geo_lat()
                .ok_or(SummaryError::MissingField("addressDetail.geoLat"))?,
            geo_lng: detail
                .geo_lng()
                .ok_or(SummaryError::MissingField("addressDetail.geoLng"))?,
            tax_sales: first
                .tax_sales()
                .ok_or(SummaryError::MissingField("results[0].taxSales"))?,
        })
    }
}

impl fmt::Display for Summary<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        writeln!(f, "Normalized Address: {}", self.normalized_address)?;
        writeln!(f, "Address Lat/Lng: {}, {}", self.geo_lat, self.geo_lng)?;
        write!(f, "Rate: {}", format_rate(self.tax_sales))
    }
}

/// `0.0775` -> `"7.75%"`
pub fn format_rate(rate: f64) -> String {
    format!("{:.2}%", rate * 100.0)
}
