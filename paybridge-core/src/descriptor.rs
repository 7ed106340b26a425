//! Packing of product metadata into the single opaque string a gateway intent carries.
//!
//! Gateway notifications only echo the descriptor back, never the original
//! request, so the three names have to survive the round trip inside it.

use serde::{Deserialize, Serialize};

use crate::{CoreError, CoreResult};

/// Private-use code point; does not occur in ordinary product text.
pub const DELIMITER: char = '\u{E000}';

const FIELD_COUNT: usize = 3;

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductDescriptor {
    pub product_name: String,
    pub product_display_name: String,
    pub provider_name: String,
}

impl ProductDescriptor {
    pub fn new(product_name: &str, product_display_name: &str, provider_name: &str) -> Self {
        Self {
            product_name: product_name.to_string(),
            product_display_name: product_display_name.to_string(),
            provider_name: provider_name.to_string(),
        }
    }

    pub fn pack(&self) -> String {
        pack(self)
    }
}

/// Join product name, display name and provider name, in that order.
///
/// Any delimiter already present in a field is dropped so the result always
/// splits back into exactly three parts.
pub fn pack(descriptor: &ProductDescriptor) -> String {
    [
        descriptor.product_name.as_str(),
        descriptor.product_display_name.as_str(),
        descriptor.provider_name.as_str(),
    ]
    .iter()
    .map(|field| field.replace(DELIMITER, ""))
    .collect::<Vec<String>>()
    .join(&DELIMITER.to_string())
}

pub fn unpack(packed: &str) -> CoreResult<ProductDescriptor> {
    let parts: Vec<&str> = packed.split(DELIMITER).collect();
    if parts.len() != FIELD_COUNT {
        return Err(CoreError::MalformedDescriptor {
            expected: FIELD_COUNT,
            found: parts.len(),
        });
    }

    Ok(ProductDescriptor::new(parts[0], parts[1], parts[2]))
}
