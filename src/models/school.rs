use serde::{Deserialize, Serialize};

/// Universidade (arquivo: us_universities.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct University {
    pub name: String,
    pub state: String,
    #[serde(default)]
    pub domains: Vec<String>,
    pub lat: f64,
    pub lng: f64,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub colors: Option<serde_json::Value>,
}

/// Cidade (arquivo: us_cities.json)
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct City {
    pub city: String,
    #[serde(default)]
    pub state_id: Option<String>,
    pub state_name: String,
    pub lat: f64,
    pub lng: f64,
    #[serde(default)]
    pub population: u64,
}

/// Cidade próxima a um campus
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize, utoipa::ToSchema)]
pub struct NearbyCity {
    pub city: String,
    pub state: String,
    pub population: u64,
    pub distance_km: f64,
}

impl NearbyCity {
    pub fn label(&self) -> String {
        format!("{}, {}", self.city, self.state)
    }
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SchoolSummary {
    pub name: String,
    /// Primeiro domínio de email (vazio se não houver)
    pub domain: String,
    pub state: String,
    pub colors: Option<serde_json::Value>,
}

impl From<&University> for SchoolSummary {
    fn from(u: &University) -> Self {
        SchoolSummary {
            name: u.name.clone(),
            domain: u.domains.first().cloned().unwrap_or_default(),
            state: u.state.clone(),
            colors: u.colors.clone(),
        }
    }
}

/// Cidades próximas de um campus (`GET /api/nearby/{name}`)
#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct NearbyResponse {
    pub university: String,
    pub radius_miles: f64,
    #[serde(rename = "nearbyCities")]
    pub nearby_cities: Vec<NearbyCity>,
}

#[derive(Debug, Serialize, utoipa::ToSchema)]
pub struct SchoolDomain {
    pub domain: String,
    pub colors: Option<serde_json::Value>,
}
