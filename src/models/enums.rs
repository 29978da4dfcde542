use serde::{Deserialize, Serialize};

/// Macro to generate an ordinal enum with as_str + lossy parsing.
///
/// Variants are declared lowest rank first; the first variant is the
/// fallback for any value outside the known set, so a malformed reading
/// never ranks above a real one.
macro_rules! ordinal_enum {
    ($name:ident { $first:ident => $first_s:literal $(, $variant:ident => $s:literal)+ $(,)? }) => {
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize,
        )]
        #[serde(from = "String", into = "String")]
        pub enum $name {
            $first,
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    Self::$first => $first_s,
                    $(Self::$variant => $s),+
                }
            }

            /// Parse a stored or wire value. Unknown values map to the
            /// lowest rank instead of failing.
            pub fn parse_lossy(s: &str) -> Self {
                match s.trim().to_ascii_uppercase().as_str() {
                    $($s => Self::$variant,)+
                    _ => Self::$first,
                }
            }
        }

        impl Default for $name {
            fn default() -> Self {
                Self::$first
            }
        }

        impl From<String> for $name {
            fn from(s: String) -> Self {
                Self::parse_lossy(&s)
            }
        }

        impl From<$name> for String {
            fn from(value: $name) -> Self {
                value.as_str().to_string()
            }
        }

        impl std::fmt::Display for $name {
            fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
                f.write_str(self.as_str())
            }
        }
    };
}

ordinal_enum!(PainSeverity {
    NotDefined => "NOT_DEFINED",
    WellControlled => "WELL_CONTROLLED",
    Moderate => "MODERATE",
    Severe => "SEVERE",
});

ordinal_enum!(EatingStatus {
    NotDefined => "NOT_DEFINED",
    Eating => "EATING",
    SomeEating => "SOME_EATING",
    NotEating => "NOT_EATING",
});

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pain_severity_round_trip() {
        for (variant, s) in [
            (PainSeverity::NotDefined, "NOT_DEFINED"),
            (PainSeverity::WellControlled, "WELL_CONTROLLED"),
            (PainSeverity::Moderate, "MODERATE"),
            (PainSeverity::Severe, "SEVERE"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(PainSeverity::parse_lossy(s), variant);
        }
    }

    #[test]
    fn eating_status_round_trip() {
        for (variant, s) in [
            (EatingStatus::NotDefined, "NOT_DEFINED"),
            (EatingStatus::Eating, "EATING"),
            (EatingStatus::SomeEating, "SOME_EATING"),
            (EatingStatus::NotEating, "NOT_EATING"),
        ] {
            assert_eq!(variant.as_str(), s);
            assert_eq!(EatingStatus::parse_lossy(s), variant);
        }
    }

    #[test]
    fn ordinal_ranks_follow_declaration_order() {
        assert!(PainSeverity::NotDefined < PainSeverity::WellControlled);
        assert!(PainSeverity::WellControlled < PainSeverity::Moderate);
        assert!(PainSeverity::Moderate < PainSeverity::Severe);
        assert!(EatingStatus::Eating < EatingStatus::SomeEating);
        assert!(EatingStatus::SomeEating < EatingStatus::NotEating);
    }

    #[test]
    fn malformed_values_fall_back_to_not_defined() {
        assert_eq!(PainSeverity::parse_lossy("excruciating"), PainSeverity::NotDefined);
        assert_eq!(PainSeverity::parse_lossy(""), PainSeverity::NotDefined);
        assert_eq!(EatingStatus::parse_lossy("fasting"), EatingStatus::NotDefined);
    }

    #[test]
    fn parsing_ignores_case_and_whitespace() {
        assert_eq!(PainSeverity::parse_lossy(" severe "), PainSeverity::Severe);
        assert_eq!(EatingStatus::parse_lossy("not_eating"), EatingStatus::NotEating);
    }

    #[test]
    fn serde_uses_wire_names_and_tolerates_unknowns() {
        let json = serde_json::to_string(&PainSeverity::Moderate).unwrap();
        assert_eq!(json, "\"MODERATE\"");

        let parsed: EatingStatus = serde_json::from_str("\"SOMETHING_ELSE\"").unwrap();
        assert_eq!(parsed, EatingStatus::NotDefined);
    }
}
