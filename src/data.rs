//! Feed records: bet types, runners, race programs, results and the odds envelope.
//!
//! Field names follow the upstream feed's upper-case keys; the lower-case and English aliases seen
//! on other endpoints are accepted too. Every scalar goes through the tolerant decoders in
//! [decode](crate::decode), so a mismatched field degrades to `None` instead of failing the record.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::decode;

/// Label fragment identifying the win pool.
pub const WIN_POOL: &str = "GANYAN";

/// Meetings whose numeric code is at or above this value are not domestic race days.
pub const DOMESTIC_CUTOFF: u32 = 11;

/// Silks colours, indexed by saddle-cloth number.
pub const PALETTE: [&str; 12] = [
    "red", "white", "blue", "yellow", "green", "black", "orange", "pink", "turquoise", "purple",
    "grey", "lime",
];

/// One wagering pool for a single race. Entries are parallel across the pools of a race: the entry
/// at index _i_ in every pool refers to the same runner (or combination) row.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BetType {
    #[serde(
        rename = "TYPE",
        alias = "type",
        alias = "label",
        default,
        deserialize_with = "decode::opt_string"
    )]
    pub label: Option<String>,

    #[serde(
        rename = "BETS",
        alias = "bets",
        alias = "entries",
        default,
        deserialize_with = "decode::lenient_seq"
    )]
    pub entries: Vec<Option<BetEntry>>,
}
impl BetType {
    pub fn new(label: impl Into<String>, entries: Vec<BetEntry>) -> Self {
        Self {
            label: Some(label.into()),
            entries: entries.into_iter().map(Some).collect(),
        }
    }

    pub fn is_win_pool(&self) -> bool {
        self.label
            .as_deref()
            .map(|label| label.to_uppercase().contains(WIN_POOL))
            .unwrap_or(false)
    }

    pub fn entry(&self, index: usize) -> Option<&BetEntry> {
        self.entries.get(index).and_then(Option::as_ref)
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct BetEntry {
    #[serde(rename = "S1", alias = "s1", default, deserialize_with = "decode::opt_string")]
    pub primary_runner: Option<String>,

    #[serde(rename = "S2", alias = "s2", default, deserialize_with = "decode::opt_string")]
    pub secondary_runner: Option<String>,

    #[serde(
        rename = "GANYAN",
        alias = "ganyan",
        alias = "odds",
        default,
        deserialize_with = "decode::opt_string"
    )]
    pub odds_value: Option<String>,

    #[serde(
        rename = "K",
        alias = "k",
        alias = "nonRunner",
        default,
        deserialize_with = "decode::opt_bool"
    )]
    pub is_non_runner: Option<bool>,

    #[serde(
        rename = "A",
        alias = "a",
        alias = "favorite",
        default,
        deserialize_with = "decode::opt_bool"
    )]
    pub is_favorite: Option<bool>,

    #[serde(
        rename = "E",
        alias = "e",
        alias = "group",
        default,
        deserialize_with = "decode::opt_string"
    )]
    pub group_tag: Option<String>,
}
impl BetEntry {
    pub fn runner(primary: impl Into<String>, odds: impl Into<String>) -> Self {
        Self {
            primary_runner: Some(primary.into()),
            odds_value: Some(odds.into()),
            ..Self::default()
        }
    }

    pub fn combination(
        primary: impl Into<String>,
        secondary: impl Into<String>,
        odds: impl Into<String>,
    ) -> Self {
        Self {
            primary_runner: Some(primary.into()),
            secondary_runner: Some(secondary.into()),
            odds_value: Some(odds.into()),
            ..Self::default()
        }
    }

    pub fn with_favorite(mut self, favorite: bool) -> Self {
        self.is_favorite = Some(favorite);
        self
    }

    pub fn with_non_runner(mut self, non_runner: bool) -> Self {
        self.is_non_runner = Some(non_runner);
        self
    }

    pub fn with_group(mut self, tag: impl Into<String>) -> Self {
        self.group_tag = Some(tag.into());
        self
    }

    /// The coupled-entry tag, if this entry is part of a stable pairing. `"0"` means no coupling.
    pub fn coupling(&self) -> Option<&str> {
        self.group_tag
            .as_deref()
            .map(str::trim)
            .filter(|tag| !tag.is_empty() && *tag != "0")
    }
}

/// A declared entrant of a race.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Runner {
    #[serde(rename = "KOD", alias = "id", deserialize_with = "decode::string")]
    pub id: String,

    #[serde(rename = "NO", alias = "number", default, deserialize_with = "decode::string_or_empty")]
    pub number: String,

    #[serde(rename = "AD", alias = "name", default, deserialize_with = "decode::string_or_empty")]
    pub name: String,

    #[serde(
        rename = "JOKEYADI",
        alias = "jockey",
        default,
        deserialize_with = "decode::string_or_empty"
    )]
    pub jockey: String,

    /// Public favouritism as a percentage, e.g. `"23,45"`.
    #[serde(
        rename = "AGF",
        alias = "favoritism",
        default,
        deserialize_with = "decode::opt_string"
    )]
    pub favoritism_percent: Option<String>,

    #[serde(rename = "HP", alias = "handicap", default, deserialize_with = "decode::opt_string")]
    pub handicap: Option<String>,
}
impl Runner {
    pub fn new(id: impl Into<String>, number: impl Into<String>, name: impl Into<String>) -> Self {
        Self {
            id: id.into(),
            number: number.into(),
            name: name.into(),
            jockey: String::new(),
            favoritism_percent: None,
            handicap: None,
        }
    }

    pub fn with_favoritism(mut self, percent: impl Into<String>) -> Self {
        self.favoritism_percent = Some(percent.into());
        self
    }

    pub fn with_handicap(mut self, handicap: impl Into<String>) -> Self {
        self.handicap = Some(handicap.into());
        self
    }

    pub fn favoritism(&self) -> Option<f64> {
        self.favoritism_percent.as_deref().and_then(decode::parse_decimal)
    }

    pub fn handicap_points(&self) -> Option<f64> {
        self.handicap.as_deref().and_then(decode::parse_decimal)
    }

    /// Silks colour for this runner. Numbers that don't parse share the first colour.
    pub fn colour(&self) -> &'static str {
        let index = self
            .number
            .trim()
            .parse::<usize>()
            .ok()
            .and_then(|number| number.checked_sub(1))
            .unwrap_or(0);
        PALETTE[index % PALETTE.len()]
    }
}

/// Going and weather for a meeting. Partial records are rejected as a whole.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct WeatherInfo {
    #[serde(rename = "HAVA", alias = "condition", deserialize_with = "decode::string")]
    pub condition: String,

    #[serde(rename = "SICAKLIK", alias = "temperature", deserialize_with = "decode::string")]
    pub temperature: String,

    #[serde(rename = "NEM", alias = "humidity", deserialize_with = "decode::string")]
    pub humidity: String,

    #[serde(rename = "CIM", alias = "turf", deserialize_with = "decode::string")]
    pub track_turf: String,

    #[serde(rename = "KUM", alias = "dirt", deserialize_with = "decode::string")]
    pub track_dirt: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceProgramEntry {
    #[serde(rename = "KOD", alias = "code", deserialize_with = "decode::string")]
    pub code: String,

    #[serde(rename = "NO", alias = "number", default, deserialize_with = "decode::string_or_empty")]
    pub number: String,

    #[serde(rename = "SAAT", alias = "time", default, deserialize_with = "decode::opt_string")]
    pub time: Option<String>,

    #[serde(
        rename = "MESAFE",
        alias = "distance",
        default,
        deserialize_with = "decode::opt_string"
    )]
    pub distance: Option<String>,

    #[serde(rename = "PIST", alias = "track", default, deserialize_with = "decode::opt_string")]
    pub track: Option<String>,

    #[serde(rename = "ATLAR", alias = "runners", default, deserialize_with = "decode::lenient_vec")]
    pub runners: Vec<Runner>,
}

/// A city's race card for one day.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RaceProgram {
    #[serde(rename = "HAVA", alias = "weather", default, deserialize_with = "decode::lenient")]
    pub weather: Option<WeatherInfo>,

    #[serde(rename = "KOSULAR", alias = "races", default, deserialize_with = "decode::lenient_vec")]
    pub races: Vec<RaceProgramEntry>,

    /// Passed through untouched for the presentation layer.
    #[serde(
        rename = "AGF",
        alias = "favoritismTable",
        default,
        deserialize_with = "decode::lenient_values"
    )]
    pub favoritism_table: Vec<Value>,
}
impl RaceProgram {
    /// Looks up a race by its display number, falling back to its code.
    pub fn race(&self, number_or_code: &str) -> Option<&RaceProgramEntry> {
        self.races
            .iter()
            .find(|race| race.number == number_or_code)
            .or_else(|| self.races.iter().find(|race| race.code == number_or_code))
    }
}

/// An entry of the daily meetings feed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Meeting {
    #[serde(rename = "KOD", alias = "code", default, deserialize_with = "decode::opt_string")]
    pub code: Option<String>,

    #[serde(rename = "YER", alias = "city", deserialize_with = "decode::string")]
    pub city: String,
}
impl Meeting {
    pub fn numeric_code(&self) -> Option<u32> {
        self.code.as_deref().and_then(|code| code.trim().parse().ok())
    }

    pub fn is_domestic(&self, cutoff: u32) -> bool {
        self.numeric_code().map(|code| code < cutoff).unwrap_or(false)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Finisher {
    #[serde(rename = "SONUC", alias = "position", default, deserialize_with = "decode::opt_string")]
    pub position: Option<String>,

    #[serde(rename = "NO", alias = "number", default, deserialize_with = "decode::string_or_empty")]
    pub number: String,

    #[serde(rename = "AD", alias = "name", default, deserialize_with = "decode::string_or_empty")]
    pub name: String,

    #[serde(
        rename = "JOKEYADI",
        alias = "jockey",
        default,
        deserialize_with = "decode::string_or_empty"
    )]
    pub jockey: String,

    #[serde(rename = "DERECE", alias = "time", default, deserialize_with = "decode::opt_string")]
    pub time: Option<String>,

    #[serde(rename = "GANYAN", alias = "odds", default, deserialize_with = "decode::opt_string")]
    pub odds: Option<String>,
}

/// A settled race.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RaceResult {
    #[serde(rename = "KOD", alias = "code", deserialize_with = "decode::string")]
    pub code: String,

    #[serde(rename = "NO", alias = "number", default, deserialize_with = "decode::string_or_empty")]
    pub number: String,

    #[serde(
        rename = "SONUCLAR",
        alias = "finishers",
        default,
        deserialize_with = "decode::lenient_vec"
    )]
    pub finishers: Vec<Finisher>,
}

/// The probable-odds ("muhtemeller") envelope.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OddsPayload {
    #[serde(default, deserialize_with = "decode::opt_bool")]
    pub success: Option<bool>,

    #[serde(default, deserialize_with = "decode::lenient")]
    pub data: Option<OddsData>,
}
impl OddsPayload {
    /// The bet types of a successful payload; anything else yields none.
    pub fn into_bet_types(self) -> Vec<BetType> {
        match (self.success, self.data) {
            (Some(false), _) | (_, None) => vec![],
            (_, Some(data)) => data.bet_types,
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct OddsData {
    #[serde(
        rename = "betTypes",
        alias = "BETTYPES",
        default,
        deserialize_with = "decode::lenient_vec"
    )]
    pub bet_types: Vec<BetType>,

    #[serde(rename = "postTime", default, deserialize_with = "decode::opt_string")]
    pub post_time: Option<String>,

    #[serde(default, deserialize_with = "decode::opt_string")]
    pub status: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bet_type_tolerates_null_entries_and_numeric_odds() {
        let bet_type: BetType = serde_json::from_str(
            r#"{"TYPE": "GANYAN", "BETS": [{"S1": 1, "GANYAN": 2.5, "A": true}, null, {"S1": "3", "GANYAN": "-", "K": "1"}]}"#,
        )
        .unwrap();
        assert_eq!(Some("GANYAN"), bet_type.label.as_deref());
        assert_eq!(3, bet_type.entries.len());
        let first = bet_type.entry(0).unwrap();
        assert_eq!(Some("1"), first.primary_runner.as_deref());
        assert_eq!(Some("2.5"), first.odds_value.as_deref());
        assert_eq!(Some(true), first.is_favorite);
        assert_eq!(None, bet_type.entry(1));
        assert_eq!(Some(true), bet_type.entry(2).unwrap().is_non_runner);
        assert!(bet_type.is_win_pool());
    }

    #[test]
    fn float_odds_keep_their_form_and_float_flags_count() {
        let entry: BetEntry =
            serde_json::from_str(r#"{"S1": 4, "GANYAN": 14.0, "K": 1.0, "A": 0.0}"#).unwrap();
        assert_eq!(Some("14.0"), entry.odds_value.as_deref());
        assert_eq!(Some(true), entry.is_non_runner);
        assert_eq!(Some(false), entry.is_favorite);
    }

    #[test]
    fn bet_type_with_null_entries_is_empty() {
        let bet_type: BetType = serde_json::from_str(r#"{"type": "PLASE", "bets": null}"#).unwrap();
        assert!(bet_type.entries.is_empty());
        assert!(!bet_type.is_win_pool());
    }

    #[test]
    fn coupling_ignores_zero_and_blank() {
        assert_eq!(None, BetEntry::default().coupling());
        assert_eq!(None, BetEntry::default().with_group("0").coupling());
        assert_eq!(None, BetEntry::default().with_group(" ").coupling());
        assert_eq!(Some("2"), BetEntry::default().with_group("2").coupling());

        let numeric: BetEntry = serde_json::from_str(r#"{"E": 3}"#).unwrap();
        assert_eq!(Some("3"), numeric.coupling());
    }

    #[test]
    fn partial_weather_is_rejected_whole() {
        let program: RaceProgram = serde_json::from_str(
            r#"{"HAVA": {"HAVA": "Açık", "SICAKLIK": 21}, "KOSULAR": []}"#,
        )
        .unwrap();
        assert_eq!(None, program.weather);

        let program: RaceProgram = serde_json::from_str(
            r#"{"HAVA": {"HAVA": "Açık", "SICAKLIK": 21, "NEM": "%40", "CIM": "Çim: Normal", "KUM": "Kum: Normal"}}"#,
        )
        .unwrap();
        let weather = program.weather.unwrap();
        assert_eq!("21", weather.temperature);
        assert!(program.races.is_empty());
    }

    #[test]
    fn program_drops_runners_without_id() {
        let program: RaceProgram = serde_json::from_str(
            r#"{"KOSULAR": [{"KOD": 101, "NO": "1", "ATLAR": [
                {"KOD": "A1", "NO": 1, "AD": "BOLD RULER", "AGF": "31,2"},
                {"NO": 2, "AD": "NAMELESS"},
                {"KOD": "A3", "NO": "3", "AD": "SEA BIRD", "HP": 88}
            ]}]}"#,
        )
        .unwrap();
        let race = program.race("1").unwrap();
        assert_eq!("101", race.code);
        assert_eq!(2, race.runners.len());
        assert_eq!(Some(31.2), race.runners[0].favoritism());
        assert_eq!(Some(88.0), race.runners[1].handicap_points());
        assert!(program.race("101").is_some());
        assert!(program.race("9").is_none());
    }

    #[test]
    fn runner_colour_wraps_palette() {
        assert_eq!("red", Runner::new("a", "1", "").colour());
        assert_eq!("white", Runner::new("b", "2", "").colour());
        assert_eq!("red", Runner::new("c", "13", "").colour());
        assert_eq!("red", Runner::new("d", "1A", "").colour());
    }

    #[test]
    fn meeting_cutoff() {
        let meeting: Meeting = serde_json::from_str(r#"{"KOD": "3", "YER": "İstanbul"}"#).unwrap();
        assert!(meeting.is_domestic(DOMESTIC_CUTOFF));
        let meeting: Meeting = serde_json::from_str(r#"{"KOD": 11, "YER": "Abroad"}"#).unwrap();
        assert!(!meeting.is_domestic(DOMESTIC_CUTOFF));
        let meeting: Meeting = serde_json::from_str(r#"{"YER": "Unknown"}"#).unwrap();
        assert!(!meeting.is_domestic(DOMESTIC_CUTOFF));
    }

    #[test]
    fn odds_payload_degrades_to_empty() {
        let payload: OddsPayload =
            serde_json::from_str(r#"{"success": false, "data": null}"#).unwrap();
        assert!(payload.into_bet_types().is_empty());

        let payload: OddsPayload =
            serde_json::from_str(r#"{"success": true, "data": "garbage"}"#).unwrap();
        assert!(payload.into_bet_types().is_empty());

        let payload: OddsPayload = serde_json::from_str(
            r#"{"success": true, "data": {"betTypes": [null, {"TYPE": "GANYAN", "BETS": []}], "postTime": "14:30", "status": 1}}"#,
        )
        .unwrap();
        let data = payload.data.clone().unwrap();
        assert_eq!(Some("14:30"), data.post_time.as_deref());
        assert_eq!(Some("1"), data.status.as_deref());
        assert_eq!(1, payload.into_bet_types().len());
    }
}
