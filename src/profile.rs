use std::{fmt, str::FromStr};

use serde::{Deserialize, Serialize};

/// Rendering engine whose editing quirks the commands compensate for.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum EngineProfile {
    #[default]
    Standard,
    /// Block formatting merges the text of adjacent list items.
    MergeProneList,
    /// Block formatting drops direction and alignment of converted blocks.
    StyleLosingFormat,
    /// Smaller list indentation; list items with bare content are not formatted.
    LegacyList,
}

/// Per-profile constants and quirk switches.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Quirks {
    pub list_base: i32,
    pub list_step: i32,
    pub merge_prone_list_items: bool,
    pub style_losing_format: bool,
    /// Append the trailing group instead of prepending it.
    pub append_last_group: bool,
    /// List item margins are measured against the root direction, not the list's.
    pub root_relative_list_margins: bool,
    pub wraps_unformatted_list_items: bool,
}

impl EngineProfile {
    pub const ALL: [EngineProfile; 4] = [
        EngineProfile::Standard,
        EngineProfile::MergeProneList,
        EngineProfile::StyleLosingFormat,
        EngineProfile::LegacyList,
    ];

    pub fn quirks(self) -> Quirks {
        let standard = Quirks {
            list_base: 35,
            list_step: 40,
            merge_prone_list_items: false,
            style_losing_format: false,
            append_last_group: false,
            root_relative_list_margins: false,
            wraps_unformatted_list_items: false,
        };
        match self {
            EngineProfile::Standard => standard,
            EngineProfile::MergeProneList => Quirks {
                list_base: 45,
                merge_prone_list_items: true,
                ..standard
            },
            EngineProfile::StyleLosingFormat => Quirks {
                style_losing_format: true,
                append_last_group: true,
                root_relative_list_margins: true,
                ..standard
            },
            EngineProfile::LegacyList => Quirks {
                list_base: 25,
                wraps_unformatted_list_items: true,
                ..standard
            },
        }
    }

    pub fn as_str(self) -> &'static str {
        match self {
            EngineProfile::Standard => "standard",
            EngineProfile::MergeProneList => "merge-prone-list",
            EngineProfile::StyleLosingFormat => "style-losing-format",
            EngineProfile::LegacyList => "legacy-list",
        }
    }
}

impl fmt::Display for EngineProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EngineProfile {
    type Err = String;

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        EngineProfile::ALL
            .into_iter()
            .find(|profile| profile.as_str().eq_ignore_ascii_case(value.trim()))
            .ok_or_else(|| format!("unknown engine profile `{value}`"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn list_bases_follow_engine_table() {
        assert_eq!(EngineProfile::Standard.quirks().list_base, 35);
        assert_eq!(EngineProfile::MergeProneList.quirks().list_base, 45);
        assert_eq!(EngineProfile::StyleLosingFormat.quirks().list_base, 35);
        assert_eq!(EngineProfile::LegacyList.quirks().list_base, 25);
        for profile in EngineProfile::ALL {
            assert_eq!(profile.quirks().list_step, 40);
        }
    }

    #[test]
    fn only_style_losing_profile_appends_last_group() {
        for profile in EngineProfile::ALL {
            assert_eq!(
                profile.quirks().append_last_group,
                profile == EngineProfile::StyleLosingFormat
            );
        }
    }

    #[test]
    fn parses_profile_names() {
        assert_eq!("legacy-list".parse(), Ok(EngineProfile::LegacyList));
        assert_eq!(" Standard ".parse(), Ok(EngineProfile::Standard));
        assert!("gecko".parse::<EngineProfile>().is_err());
    }
}
