//! Phone number extraction from WhatsApp JIDs.

use std::sync::LazyLock;

use regex::Regex;

/// Leading digit run terminated by `@`, e.g. `5511999999999@s.whatsapp.net`.
static JID_PHONE: LazyLock<Option<Regex>> = LazyLock::new(|| Regex::new(r"^(\d+)@").ok());

/// Extract the phone number embedded in a WhatsApp JID.
///
/// Returns the leading digits when the identifier looks like `<digits>@<suffix>`,
/// and an empty string for anything else, including `None` and `""`.
pub fn extract_phone_number(identifier: Option<&str>) -> String {
    let Some(identifier) = identifier.filter(|s| !s.is_empty()) else {
        return String::new();
    };
    JID_PHONE
        .as_ref()
        .and_then(|re| re.captures(identifier))
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str().to_owned())
        .unwrap_or_default()
}
