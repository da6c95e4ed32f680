//! # Message Model
//! Normalized form of one channel post, the `Source` it came from, and the
//! flat record shape the delivery ledger stores on disk.
//!
//! Equality is structural over every field. Two renders of the same post that
//! differ in any field (say, a reformatted timestamp) are different messages
//! and will both be delivered.

use serde::de::Error as _;
use serde::{Deserialize, Deserializer, Serialize};

/// Largest value a display color may take (24-bit RGB).
pub const MAX_COLOR: u32 = 0xFF_FFFF;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub timestamp: i64, // unix seconds
    pub text: String,
    pub photo: Option<String>,
    pub author: Option<String>,
    pub profile_picture: Option<String>,
    pub source_id: String,
    pub color: u32,
}

/// A named channel to poll, with the color its posts render in.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Source {
    pub id: String,
    pub color: u32,
}

impl Source {
    /// Source with its color derived from the id.
    pub fn new(id: impl Into<String>) -> Self {
        let id = id.into();
        let color = derive_color(&id);
        Self { id, color }
    }

    /// Source with an explicit color; bits above 24 are dropped.
    pub fn with_color(id: impl Into<String>, color: u32) -> Self {
        Self {
            id: id.into(),
            color: color & MAX_COLOR,
        }
    }
}

/// Stable 24-bit color for a source id.
///
/// The id's UTF-8 bytes are read as one big-endian integer and reduced modulo
/// 2^24, which keeps the last three bytes. The same id always yields the same
/// color, across runs and across relays.
pub fn derive_color(id: &str) -> u32 {
    id.bytes()
        .fold(0u32, |acc, b| ((acc << 8) | u32::from(b)) & MAX_COLOR)
}

/// On-disk shape of one ledger entry.
///
/// Every key must be present (`null` for absent optionals) and unknown keys
/// are rejected, so a hand-edited or truncated ledger fails loudly instead of
/// silently defaulting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct MessageRecord {
    // older ledgers store whole seconds as a float (`1709294400.0`)
    #[serde(deserialize_with = "unix_seconds")]
    pub timestamp: i64,
    pub text: String,
    #[serde(deserialize_with = "required")]
    pub photo: Option<String>,
    #[serde(deserialize_with = "required")]
    pub author: Option<String>,
    #[serde(deserialize_with = "required")]
    pub profile_picture: Option<String>,
    // older ledgers call this `channel_id`
    #[serde(alias = "channel_id")]
    pub source_id: String,
    pub color: u32,
}

// Using a custom deserializer turns off serde's implicit `None` for missing
// `Option` fields, so the key itself stays mandatory.
fn required<'de, D, T>(de: D) -> Result<Option<T>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de)
}

#[derive(Deserialize)]
#[serde(untagged)]
enum Seconds {
    Int(i64),
    Float(f64),
}

/// Integer seconds, or a float with no fractional part.
fn unix_seconds<'de, D>(de: D) -> Result<i64, D::Error>
where
    D: Deserializer<'de>,
{
    match Seconds::deserialize(de)? {
        Seconds::Int(secs) => Ok(secs),
        Seconds::Float(f) if f.is_finite() && f.fract() == 0.0 && f.abs() < 9.0e15 => Ok(f as i64),
        Seconds::Float(f) => Err(D::Error::custom(format!(
            "timestamp {f} is not a whole number of seconds"
        ))),
    }
}

impl Message {
    pub fn to_record(&self) -> MessageRecord {
        MessageRecord {
            timestamp: self.timestamp,
            text: self.text.clone(),
            photo: self.photo.clone(),
            author: self.author.clone(),
            profile_picture: self.profile_picture.clone(),
            source_id: self.source_id.clone(),
            color: self.color,
        }
    }

    /// Rebuild a message from its stored record, rejecting values no reader
    /// could have produced.
    pub fn from_record(record: MessageRecord) -> Result<Self, String> {
        if record.color > MAX_COLOR {
            return Err(format!("color {:#x} exceeds 24 bits", record.color));
        }
        if record.source_id.is_empty() {
            return Err("empty source_id".to_string());
        }
        Ok(Self {
            timestamp: record.timestamp,
            text: record.text,
            photo: record.photo,
            author: record.author,
            profile_picture: record.profile_picture,
            source_id: record.source_id,
            color: record.color,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> Message {
        Message {
            timestamp: 1_700_000_000,
            text: "hello\n[click](https://example.com)".into(),
            photo: Some("https://cdn.example/p.jpg".into()),
            author: None,
            profile_picture: None,
            source_id: "durov".into(),
            color: derive_color("durov"),
        }
    }

    #[test]
    fn color_keeps_last_three_bytes() {
        assert_eq!(derive_color("abc"), 0x61_62_63);
        assert_eq!(derive_color("xabc"), 0x61_62_63);
        assert_eq!(derive_color("a"), 0x61);
        assert_eq!(derive_color(""), 0);
    }

    #[test]
    fn same_id_same_color() {
        assert_eq!(Source::new("telegram").color, Source::new("telegram").color);
        assert!(Source::new("telegram").color <= MAX_COLOR);
    }

    #[test]
    fn explicit_color_is_masked() {
        assert_eq!(Source::with_color("x", 0x1_2A_AB_EE).color, 0x2A_AB_EE);
    }

    #[test]
    fn equality_covers_every_field() {
        let a = sample();
        let mut b = sample();
        assert_eq!(a, b);
        b.timestamp += 1;
        assert_ne!(a, b);
        let mut c = sample();
        c.author = Some("Pavel".into());
        assert_ne!(a, c);
    }

    #[test]
    fn record_requires_every_key() {
        let missing_photo = "timestamp: 1\ntext: hi\nauthor: null\nprofile_picture: null\nsource_id: a\ncolor: 1\n";
        assert!(serde_yaml::from_str::<MessageRecord>(missing_photo).is_err());

        let full = "timestamp: 1\ntext: hi\nphoto: null\nauthor: null\nprofile_picture: null\nsource_id: a\ncolor: 1\n";
        let rec: MessageRecord = serde_yaml::from_str(full).unwrap();
        assert_eq!(rec.photo, None);
    }

    #[test]
    fn record_rejects_unknown_keys_and_accepts_legacy_channel_id() {
        let unknown = "timestamp: 1\ntext: hi\nphoto: null\nauthor: null\nprofile_picture: null\nsource_id: a\ncolor: 1\nextra: 2\n";
        assert!(serde_yaml::from_str::<MessageRecord>(unknown).is_err());

        let legacy = "timestamp: 1\ntext: hi\nphoto: null\nauthor: null\nprofile_picture: null\nchannel_id: a\ncolor: 1\n";
        let rec: MessageRecord = serde_yaml::from_str(legacy).unwrap();
        assert_eq!(rec.source_id, "a");
    }

    #[test]
    fn record_timestamp_accepts_whole_float_only() {
        let base = "text: hi\nphoto: null\nauthor: null\nprofile_picture: null\nsource_id: a\ncolor: 1\n";

        let whole: MessageRecord = serde_yaml::from_str(&format!("timestamp: 1709294400.0\n{base}")).unwrap();
        assert_eq!(whole.timestamp, 1_709_294_400);

        let int: MessageRecord = serde_yaml::from_str(&format!("timestamp: 1709294400\n{base}")).unwrap();
        assert_eq!(int.timestamp, 1_709_294_400);

        assert!(serde_yaml::from_str::<MessageRecord>(&format!("timestamp: 1709294400.5\n{base}")).is_err());
        assert!(serde_yaml::from_str::<MessageRecord>(&format!("timestamp: .nan\n{base}")).is_err());
    }

    #[test]
    fn from_record_rejects_wide_color() {
        let mut rec = sample().to_record();
        rec.color = 0x100_0000;
        assert!(Message::from_record(rec).is_err());
        assert_eq!(Message::from_record(sample().to_record()).unwrap(), sample());
    }
}
