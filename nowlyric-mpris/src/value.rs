//! Conversions from D-Bus variants to the plain types the session works with.

use crate::error::Result;
use nowlyric_core::{ChangedProperties, PlayerProperties};
use std::collections::HashMap;
use std::ops::Deref;
use zbus::zvariant::{OwnedValue, Value};

const METADATA: &str = "Metadata";
const PLAYBACK_STATUS: &str = "PlaybackStatus";
const XESAM_URL: &str = "xesam:url";

/// String content of a variant, looking through nested variants
pub(crate) fn value_as_string(value: &Value<'_>) -> Option<String> {
    match value {
        Value::Str(s) => Some(s.as_str().to_string()),
        Value::ObjectPath(p) => Some(p.as_str().to_string()),
        Value::Value(inner) => value_as_string(inner),
        _ => None,
    }
}

/// Integer content of a variant, widening any integer type to `i64`
pub(crate) fn value_as_i64(value: &Value<'_>) -> Option<i64> {
    match value {
        Value::I64(n) => Some(*n),
        Value::I32(n) => Some(i64::from(*n)),
        Value::I16(n) => Some(i64::from(*n)),
        Value::U32(n) => Some(i64::from(*n)),
        Value::U16(n) => Some(i64::from(*n)),
        Value::U8(n) => Some(i64::from(*n)),
        Value::U64(n) => i64::try_from(*n).ok(),
        Value::Value(inner) => value_as_i64(inner),
        _ => None,
    }
}

/// Pick the properties the session reacts to out of a `PropertiesChanged` map.
///
/// # Errors
///
/// Returns an error if `Metadata` is present but is not a dictionary.
pub(crate) fn changed_properties(
    mut changed: HashMap<String, OwnedValue>,
) -> Result<ChangedProperties> {
    let playback_status = changed
        .get(PLAYBACK_STATUS)
        .map(Deref::deref)
        .and_then(value_as_string);

    let metadata_url = match changed.remove(METADATA) {
        Some(metadata) => {
            let metadata = HashMap::<String, OwnedValue>::try_from(metadata)?;
            metadata
                .get(XESAM_URL)
                .map(Deref::deref)
                .and_then(value_as_string)
        }
        None => None,
    };

    Ok(ChangedProperties {
        metadata_url,
        playback_status,
    })
}

/// Flatten a `GetAll` reply into displayable strings
pub(crate) fn flatten_properties(properties: HashMap<String, OwnedValue>) -> PlayerProperties {
    properties
        .into_iter()
        .map(|(name, value)| {
            let rendered = value_as_string(&value).unwrap_or_else(|| format!("{:?}", *value));
            (name, rendered)
        })
        .collect()
}
