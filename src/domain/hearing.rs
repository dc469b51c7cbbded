use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum HearingStatus {
    #[serde(rename = "PROGRAMADO")]
    Scheduled,
    #[serde(rename = "EN_CURSO")]
    InProgress,
    #[serde(rename = "COMPLETADO")]
    Completed,
    #[serde(rename = "CANCELADO")]
    Cancelled,
    #[serde(rename = "REAGENDADO")]
    Rescheduled,
}

impl fmt::Display for HearingStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let label = match self {
            HearingStatus::Scheduled => "scheduled",
            HearingStatus::InProgress => "in progress",
            HearingStatus::Completed => "completed",
            HearingStatus::Cancelled => "cancelled",
            HearingStatus::Rescheduled => "rescheduled",
        };
        f.write_str(label)
    }
}

/// Detail view of a hearing as served by the scheduling backend.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Hearing {
    pub id: String,
    #[serde(rename = "numeroCaso")]
    pub case_number: String,
    #[serde(rename = "tipoJuicio")]
    pub hearing_type: String,
    #[serde(rename = "fecha")]
    pub date: String,
    #[serde(rename = "hora")]
    pub time: String,
    #[serde(rename = "sala")]
    pub room: String,
    #[serde(rename = "descripcion", default)]
    pub description: Option<String>,
    #[serde(rename = "estado")]
    pub status: HearingStatus,
}
