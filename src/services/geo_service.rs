use std::path::Path;

use crate::models::{City, NearbyCity, University};
use crate::utils::{get_cached_nearby, haversine_km, round_to, set_cached_nearby, AppError, KM_PER_MILE};

pub const DEFAULT_RADIUS_MILES: f64 = 100.0;
pub const DEFAULT_MIN_POPULATION: u64 = 50_000;
pub const DEFAULT_NEARBY_LIMIT: usize = 10;

/// Tabelas de escolas e cidades, carregadas uma vez na inicialização
pub struct GeoService {
    universities: Vec<University>,
    cities: Vec<City>,
}

#[derive(Debug, Clone, serde::Serialize, utoipa::ToSchema)]
pub struct Locations {
    pub from: Vec<String>,
    pub to: Vec<String>,
}

impl GeoService {
    pub fn new(universities: Vec<University>, cities: Vec<City>) -> Self {
        GeoService { universities, cities }
    }

    pub async fn load(universities_path: &Path, cities_path: &Path) -> Result<Self, AppError> {
        let universities: Vec<University> = read_json(universities_path).await?;
        let cities: Vec<City> = read_json(cities_path).await?;

        log::info!(
            "🗺️  Loaded {} universities and {} cities",
            universities.len(),
            cities.len()
        );

        Ok(GeoService::new(universities, cities))
    }

    pub fn find_university(&self, name: &str) -> Option<&University> {
        let name = name.trim();
        self.universities
            .iter()
            .find(|u| u.name.eq_ignore_ascii_case(name))
    }

    /// Cidade pelo trecho antes da primeira vírgula (`"Ogden, Utah"` -> `Ogden`)
    pub fn find_city(&self, label: &str) -> Option<&City> {
        let name = label.split(',').next().unwrap_or("").trim();
        if name.is_empty() {
            return None;
        }
        self.cities.iter().find(|c| c.city.eq_ignore_ascii_case(name))
    }

    pub fn schools_in_state(&self, state: &str) -> Vec<&University> {
        let state = state.trim();
        self.universities
            .iter()
            .filter(|u| u.state.eq_ignore_ascii_case(state))
            .collect()
    }

    pub fn universities(&self) -> &[University] {
        &self.universities
    }

    /// Siglas de estado distintas, em ordem alfabética
    pub fn states(&self) -> Vec<String> {
        let states: std::collections::BTreeSet<&str> = self
            .universities
            .iter()
            .map(|u| u.state.as_str())
            .filter(|s| !s.is_empty())
            .collect();
        states.into_iter().map(str::to_string).collect()
    }

    /// Cidades no raio, priorizando as populosas; sem nenhuma, qualquer cidade no raio
    pub fn find_nearby_cities(
        &self,
        lat: f64,
        lng: f64,
        miles: f64,
        min_population: u64,
        limit: usize,
    ) -> Vec<NearbyCity> {
        let radius_km = miles * KM_PER_MILE;

        let within = |min_pop: u64| -> Vec<NearbyCity> {
            let mut nearby: Vec<NearbyCity> = self
                .cities
                .iter()
                .filter(|c| c.population >= min_pop)
                .filter_map(|c| {
                    let km = haversine_km(lat, lng, c.lat, c.lng);
                    (km <= radius_km).then(|| NearbyCity {
                        city: c.city.clone(),
                        state: c.state_name.clone(),
                        population: c.population,
                        distance_km: round_to(km, 1),
                    })
                })
                .collect();
            nearby.sort_by(|a, b| a.distance_km.total_cmp(&b.distance_km));
            nearby.truncate(limit);
            nearby
        };

        let nearby = within(min_population);
        if nearby.is_empty() {
            within(0)
        } else {
            nearby
        }
    }

    /// Cidades próximas do campus; o raio padrão vem do cache
    pub fn nearby_for_school(&self, school: &University, miles: f64) -> Vec<NearbyCity> {
        let default_radius = miles == DEFAULT_RADIUS_MILES;
        if default_radius {
            if let Some(cached) = get_cached_nearby(&school.name) {
                return cached;
            }
        }

        let computed = self.find_nearby_cities(
            school.lat,
            school.lng,
            miles,
            DEFAULT_MIN_POPULATION,
            DEFAULT_NEARBY_LIMIT,
        );
        if default_radius {
            log::debug!("🗺️  Cached {} nearby cities for {}", computed.len(), school.name);
            set_cached_nearby(&school.name, computed.clone());
        }
        computed
    }

    /// Opções de origem/destino: o campus primeiro, depois as cidades próximas
    pub fn locations(&self, school: &str, miles: f64, query: Option<&str>) -> Result<Locations, AppError> {
        let university = self
            .find_university(school)
            .ok_or_else(|| AppError::NotFound("University not found".to_string()))?;

        let mut city_names: Vec<String> = self
            .nearby_for_school(university, miles)
            .iter()
            .map(NearbyCity::label)
            .collect();

        if let Some(q) = query.map(str::trim).filter(|q| !q.is_empty()) {
            let q = q.to_lowercase();
            city_names.retain(|name| name.to_lowercase().contains(&q));
        }

        let mut all = Vec::with_capacity(city_names.len() + 1);
        all.push(school.trim().to_string());
        all.extend(city_names);

        Ok(Locations {
            from: all.clone(),
            to: all,
        })
    }
}

async fn read_json<T: serde::de::DeserializeOwned>(path: &Path) -> Result<T, AppError> {
    let data = tokio::fs::read_to_string(path)
        .await
        .map_err(|e| AppError::DatabaseError(format!("Failed to read {}: {}", path.display(), e)))?;
    serde_json::from_str(&data)
        .map_err(|e| AppError::DatabaseError(format!("Failed to parse {}: {}", path.display(), e)))
}
