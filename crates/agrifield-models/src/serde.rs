use serde::{Deserialize, Deserializer};

#[derive(Deserialize)]
#[serde(untagged)]
enum StringOrNumber {
    String(String),
    Integer(i64),
    Float(f64),
}

/// Accepts `"42"`, `42` or `null`. Empty strings become `None`.
pub fn deserialize_optional_id<'de, D>(deserializer: D) -> Result<Option<String>, D::Error>
where
    D: Deserializer<'de>,
{
    let opt: Option<StringOrNumber> = Option::deserialize(deserializer)?;
    Ok(match opt {
        Some(StringOrNumber::String(s)) if s.trim().is_empty() => None,
        Some(StringOrNumber::String(s)) => Some(s.trim().to_string()),
        Some(StringOrNumber::Integer(n)) => Some(n.to_string()),
        Some(StringOrNumber::Float(f)) if f.fract() == 0.0 => Some((f as i64).to_string()),
        Some(StringOrNumber::Float(f)) => Some(f.to_string()),
        None => None,
    })
}

/// Accepts `true`, `false`, `null`, `0`/`1` and `"true"`/`"false"`.
/// Anything unrecognised is `false`.
pub fn deserialize_lenient_bool<'de, D>(deserializer: D) -> Result<bool, D::Error>
where
    D: Deserializer<'de>,
{
    #[derive(Deserialize)]
    #[serde(untagged)]
    enum Flag {
        Bool(bool),
        Number(i64),
        Text(String),
    }

    let opt: Option<Flag> = Option::deserialize(deserializer)?;
    Ok(match opt {
        Some(Flag::Bool(b)) => b,
        Some(Flag::Number(n)) => n != 0,
        Some(Flag::Text(s)) => s.eq_ignore_ascii_case("true") || s == "1",
        None => false,
    })
}
