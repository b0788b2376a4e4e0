/// Address formatting for display
use crate::registry::Address;

/// Shown when the registry has no usable address
pub const MISSING_ADDRESS: &str = "Ikke oppgitt";

/// Format an address as "street, street, 0150 OSLO"
pub fn format_address(address: Option<&Address>) -> String {
    let Some(address) = address else {
        return MISSING_ADDRESS.to_string();
    };

    let street = address
        .lines
        .iter()
        .map(|line| line.trim())
        .filter(|line| !line.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    let place = [address.postal_code.as_deref(), address.postal_place.as_deref()]
        .into_iter()
        .flatten()
        .map(str::trim)
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(" ");

    let formatted = [street, place]
        .into_iter()
        .filter(|part| !part.is_empty())
        .collect::<Vec<_>>()
        .join(", ");

    if formatted.is_empty() {
        MISSING_ADDRESS.to_string()
    } else {
        formatted
    }
}

/// True when the address has anything worth showing
pub fn has_address(address: Option<&Address>) -> bool {
    format_address(address) != MISSING_ADDRESS
}
