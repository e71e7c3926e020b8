//! Publishing institutions (gazette sources).

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Kind of publishing authority.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum InstitutionType {
    State,
    MunicipalAssociation,
    Municipality,
}

impl InstitutionType {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::State => "state",
            Self::MunicipalAssociation => "municipal_association",
            Self::Municipality => "municipality",
        }
    }

    pub fn from_str(s: &str) -> Option<Self> {
        match s {
            "state" => Some(Self::State),
            "municipal_association" => Some(Self::MunicipalAssociation),
            "municipality" => Some(Self::Municipality),
            _ => None,
        }
    }
}

/// A publisher of official gazettes.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Institution {
    pub id: i32,
    pub name: String,
    pub slug: String,
    pub institution_type: InstitutionType,
    pub state: String,
    pub city: Option<String>,
    pub source_url: Option<String>,
    pub active: bool,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Publishers with a built-in source adapter.
///
/// The discriminants are the stable institution ids stored on every gazette.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KnownInstitution {
    GovernoPiaui = 1,
    MunicipiosPiaui = 2,
}

impl KnownInstitution {
    pub const ALL: [KnownInstitution; 2] = [Self::GovernoPiaui, Self::MunicipiosPiaui];

    pub fn id(&self) -> i32 {
        *self as i32
    }

    /// Slug used for artifact keys and CLI selection.
    pub fn slug(&self) -> &'static str {
        match self {
            Self::GovernoPiaui => "governo-pi",
            Self::MunicipiosPiaui => "municipios-pi",
        }
    }

    pub fn from_slug(slug: &str) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.slug() == slug)
    }

    pub fn from_id(id: i32) -> Option<Self> {
        Self::ALL.into_iter().find(|i| i.id() == id)
    }

    /// Seed row for the institutions table.
    pub fn to_institution(&self, now: DateTime<Utc>) -> Institution {
        let (name, institution_type, source_url) = match self {
            Self::GovernoPiaui => (
                "Governo do Estado do Piauí",
                InstitutionType::State,
                "https://www.diario.pi.gov.br",
            ),
            Self::MunicipiosPiaui => (
                "Diário dos Municípios do Piauí",
                InstitutionType::MunicipalAssociation,
                "https://www.diarioficialdosmunicipios.org",
            ),
        };

        Institution {
            id: self.id(),
            name: name.to_string(),
            slug: self.slug().to_string(),
            institution_type,
            state: "PI".to_string(),
            city: None,
            source_url: Some(source_url.to_string()),
            active: true,
            created_at: now,
            updated_at: now,
        }
    }
}
