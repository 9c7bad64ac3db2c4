use crate::api::Endpoint;
use crate::error::ApiError;
use serde_json::{Map, Value};

/// Ordered query parameter set. Insertion order is preserved so built URLs
/// are stable; setting an existing key overwrites it in place.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct QueryParams {
    pairs: Vec<(String, String)>,
}

impl QueryParams {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&mut self, key: &str, value: impl ToString) {
        let value = value.to_string();
        match self.pairs.iter_mut().find(|(k, _)| k == key) {
            Some(pair) => pair.1 = value,
            None => self.pairs.push((key.to_string(), value)),
        }
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.pairs
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }

    pub fn len(&self) -> usize {
        self.pairs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.pairs.is_empty()
    }

    /// Key/value slice in insertion order, ready for `RequestBuilder::query`.
    pub fn as_pairs(&self) -> &[(String, String)] {
        &self.pairs
    }
}

/// Caller overrides for the per-endpoint query defaults.
#[derive(Debug, Clone)]
pub struct QueryOptions {
    pub radius: u32,
    pub propertytype: String,
    pub page: u32,
    pub pagesize: u32,
    pub min_sale_amt: u64,
    pub max_sale_amt: u64,
}

impl Default for QueryOptions {
    fn default() -> Self {
        Self {
            radius: 20,
            propertytype: "SFR".to_string(),
            page: 1,
            pagesize: 100,
            min_sale_amt: 100_000,
            max_sale_amt: 1_000_000,
        }
    }
}

/// Build the default query parameters for an endpoint.
///
/// `basic` and `detail` take no parameters; `address` and `sales` get the
/// radius/propertytype/page/pagesize defaults, and `sales` additionally gets
/// the sale amount bounds. `id` and `snapshot` take no defaults either; the
/// caller supplies identifiers through the address fields.
pub fn build_query(endpoint: Endpoint, options: &QueryOptions) -> QueryParams {
    let mut query = QueryParams::new();

    match endpoint {
        Endpoint::Basic | Endpoint::Detail | Endpoint::Id | Endpoint::Snapshot => {}
        Endpoint::Address | Endpoint::Sales => {
            query.set("radius", options.radius);
            query.set("propertytype", &options.propertytype);
            query.set("page", options.page);
            query.set("pagesize", options.pagesize);
            if endpoint == Endpoint::Sales {
                query.set("minsaleamt", options.min_sale_amt);
                query.set("maxsaleamt", options.max_sale_amt);
            }
        }
    }

    query
}

/// Lenient alias-keyed variant of [`build_query`]: an unknown alias warns
/// and yields an empty set instead of failing.
pub fn build_query_for_alias(alias: &str, options: &QueryOptions) -> QueryParams {
    match Endpoint::from_alias(alias) {
        Some(endpoint) => build_query(endpoint, options),
        None => {
            eprintln!("Warning: Missing or invalid query parameters: {:?}", alias);
            QueryParams::new()
        }
    }
}

/// Location fields for one lookup, validated at construction so the three
/// address shapes stay mutually exclusive.
#[derive(Debug, Clone, PartialEq)]
pub enum AddressSpec {
    OneLine {
        address: String,
    },
    TwoLine {
        address1: String,
        address2: String,
    },
    Coordinates {
        latitude: f64,
        longitude: f64,
    },
}

impl AddressSpec {
    /// Build a spec from a JSON object of location fields (one batch item).
    ///
    /// Accepted shapes: `{address}`, `{address1, address2}`, or
    /// `{latitude, longitude}`. Anything else is rejected.
    pub fn from_fields(fields: &Map<String, Value>) -> Result<Self, ApiError> {
        let text = |key: &str| -> Option<String> {
            fields.get(key).and_then(Value::as_str).map(str::to_string)
        };
        let number = |key: &str| -> Option<f64> { fields.get(key).and_then(Value::as_f64) };

        match fields.len() {
            1 => text("address")
                .map(|address| AddressSpec::OneLine { address })
                .ok_or_else(|| {
                    ApiError::InvalidAddress("single field must be a string \"address\"".into())
                }),
            2 => {
                if let (Some(address1), Some(address2)) = (text("address1"), text("address2")) {
                    Ok(AddressSpec::TwoLine { address1, address2 })
                } else if let (Some(latitude), Some(longitude)) =
                    (number("latitude"), number("longitude"))
                {
                    Ok(AddressSpec::Coordinates {
                        latitude,
                        longitude,
                    })
                } else {
                    Err(ApiError::InvalidAddress(
                        "two fields must be address1+address2 or latitude+longitude".into(),
                    ))
                }
            }
            n => Err(ApiError::InvalidAddress(format!(
                "expected 1 or 2 location fields, got {}",
                n
            ))),
        }
    }

    /// Merge this spec's fields into an existing query.
    pub fn apply_to(&self, query: &mut QueryParams) {
        match self {
            AddressSpec::OneLine { address } => query.set("address", address),
            AddressSpec::TwoLine { address1, address2 } => {
                query.set("address1", address1);
                query.set("address2", address2);
            }
            AddressSpec::Coordinates {
                latitude,
                longitude,
            } => {
                query.set("latitude", latitude);
                query.set("longitude", longitude);
            }
        }
    }
}

/// Lenient field merge: a recognized shape updates the query, anything
/// else warns and leaves it unchanged.
pub fn update_query(query: &mut QueryParams, fields: &Map<String, Value>) {
    match AddressSpec::from_fields(fields) {
        Ok(spec) => spec.apply_to(query),
        Err(e) => eprintln!("Warning: {}", e),
    }
}
