use crate::db::DatabaseError;
use serde::{Deserialize, Serialize};

/// Macro to generate enum with as_str + std::str::FromStr pattern
macro_rules! str_enum {
    ($name:ident { $($variant:ident => $s:literal),+ $(,)? }) => {
        #[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(&self) -> &'static str {
                match self {
                    $(Self::$variant => $s),+
                }
            }
        }

        impl std::str::FromStr for $name {
            type Err = DatabaseError;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($s => Ok(Self::$variant)),+,
                    _ => Err(DatabaseError::InvalidEnum {
                        field: stringify!($name).into(),
                        value: s.into(),
                    }),
                }
            }
        }
    };
}

str_enum!(BillStatus {
    Uploaded => "uploaded",
    Extracted => "extracted",
    Analyzed => "analyzed",
    Error => "error",
});

impl BillStatus {
    /// Whether the pipeline may move a bill from this status to `next`.
    /// `analyzed` and `error` are terminal; only in-flight bills may fail.
    pub fn can_transition_to(&self, next: &BillStatus) -> bool {
        matches!(
            (self, next),
            (BillStatus::Uploaded, BillStatus::Extracted)
                | (BillStatus::Extracted, BillStatus::Analyzed)
                | (BillStatus::Uploaded, BillStatus::Error)
                | (BillStatus::Extracted, BillStatus::Error)
        )
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, BillStatus::Analyzed | BillStatus::Error)
    }
}

str_enum!(CodeType {
    Cpt => "CPT",
    Rev => "REV",
    Ndc => "NDC",
});

str_enum!(FlagType {
    Duplicate => "duplicate",
    InvalidCode => "invalid_code",
    Overcharge => "overcharge",
});

str_enum!(FlagSeverity {
    Low => "low",
    Medium => "medium",
    High => "high",
});
